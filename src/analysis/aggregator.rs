//! Progressive aggregation and indicator statistics.
//!
//! [`AggregateState`] merges category results as they arrive and tracks the
//! lifecycle of every category of a run. The free functions compute the
//! summary figures shown in reports and document views.

use crate::error::TransitionError;
use crate::models::{Category, CategoryFailure, CategoryResult, Indicator, IndicatorEntry, ScoreBand};
use serde::Serialize;
use std::collections::{BTreeMap, HashSet};
use std::fmt;
use tracing::{debug, warn};

/// Lifecycle of one category within a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CategoryStatus {
    Pending,
    InProgress,
    Finished,
    Failed,
}

impl CategoryStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, CategoryStatus::Finished | CategoryStatus::Failed)
    }
}

impl fmt::Display for CategoryStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CategoryStatus::Pending => write!(f, "pending"),
            CategoryStatus::InProgress => write!(f, "in progress"),
            CategoryStatus::Finished => write!(f, "finished"),
            CategoryStatus::Failed => write!(f, "failed"),
        }
    }
}

/// Running view of an analysis.
///
/// Indicators are kept in arrival order. Each mutation updates the indicator
/// list, the total index and the category status together, so an observer
/// never sees one without the others.
#[derive(Debug, Clone)]
pub struct AggregateState {
    categories: Vec<Category>,
    statuses: BTreeMap<Category, CategoryStatus>,
    indicators: Vec<IndicatorEntry>,
    total_index: f64,
    failures: Vec<CategoryFailure>,
    document_ids: BTreeMap<Category, i64>,
}

impl AggregateState {
    /// Fresh state with every category pending.
    pub fn new(categories: &[Category]) -> Self {
        let mut unique = Vec::with_capacity(categories.len());
        for category in categories {
            if !unique.contains(category) {
                unique.push(*category);
            }
        }

        let statuses = unique
            .iter()
            .map(|c| (*c, CategoryStatus::Pending))
            .collect();

        Self {
            categories: unique,
            statuses,
            indicators: Vec::new(),
            total_index: 0.0,
            failures: Vec::new(),
            document_ids: BTreeMap::new(),
        }
    }

    /// Categories tracked by this run, in configured order.
    pub fn categories(&self) -> &[Category] {
        &self.categories
    }

    pub fn status(&self, category: Category) -> Option<CategoryStatus> {
        self.statuses.get(&category).copied()
    }

    fn transition(
        &mut self,
        category: Category,
        expected: CategoryStatus,
        to: CategoryStatus,
    ) -> Result<(), TransitionError> {
        let from = self.status(category).ok_or(TransitionError {
            category,
            from: CategoryStatus::Pending,
            to,
        })?;
        if from != expected {
            return Err(TransitionError { category, from, to });
        }
        self.statuses.insert(category, to);
        debug!("{}: {} -> {}", category, from, to);
        Ok(())
    }

    /// Mark a category's request as started.
    pub fn begin(&mut self, category: Category) -> Result<(), TransitionError> {
        self.transition(category, CategoryStatus::Pending, CategoryStatus::InProgress)
    }

    /// Mark every pending category as started.
    pub fn begin_all(&mut self) {
        let pending: Vec<Category> = self.with_status(CategoryStatus::Pending);
        for category in pending {
            // Pending was just checked, so the transition cannot fail.
            let _ = self.begin(category);
        }
    }

    /// Merge a successful category result.
    ///
    /// Appends the indicators, adds the partial index and finishes the
    /// category. Keys already contributed by another category are kept as
    /// separate entries, distinguished by their category.
    pub fn on_category_result(&mut self, result: CategoryResult) -> Result<(), TransitionError> {
        let category = result.category;
        self.transition(category, CategoryStatus::InProgress, CategoryStatus::Finished)?;

        let seen: HashSet<&str> = self.indicators.iter().map(|e| e.key.as_str()).collect();
        let duplicates: Vec<String> = result
            .indicators
            .iter()
            .filter(|e| seen.contains(e.key.as_str()))
            .map(|e| e.key.clone())
            .collect();
        if !duplicates.is_empty() {
            warn!(
                "{} returned indicator keys already present from another category: {}",
                category,
                duplicates.join(", ")
            );
        }

        self.indicators.extend(result.indicators);
        self.total_index += result.partial_index;
        if let Some(id) = result.document_id {
            self.document_ids.insert(category, id);
        }
        Ok(())
    }

    /// Record a category that exhausted its retries.
    pub fn on_category_failed(
        &mut self,
        category: Category,
        message: impl Into<String>,
    ) -> Result<(), TransitionError> {
        self.transition(category, CategoryStatus::InProgress, CategoryStatus::Failed)?;
        self.failures.push(CategoryFailure {
            category,
            message: message.into(),
        });
        Ok(())
    }

    /// Indicators in arrival order.
    pub fn indicators(&self) -> &[IndicatorEntry] {
        &self.indicators
    }

    /// Sum of the finished categories' partial indices.
    pub fn total_index(&self) -> f64 {
        self.total_index
    }

    fn with_status(&self, status: CategoryStatus) -> Vec<Category> {
        self.categories
            .iter()
            .copied()
            .filter(|c| self.statuses.get(c) == Some(&status))
            .collect()
    }

    pub fn finished(&self) -> Vec<Category> {
        self.with_status(CategoryStatus::Finished)
    }

    pub fn in_progress(&self) -> Vec<Category> {
        self.with_status(CategoryStatus::InProgress)
    }

    pub fn failed(&self) -> Vec<Category> {
        self.with_status(CategoryStatus::Failed)
    }

    pub fn failures(&self) -> &[CategoryFailure] {
        &self.failures
    }

    /// Stored document IDs reported by the finished categories.
    pub fn document_ids(&self) -> &BTreeMap<Category, i64> {
        &self.document_ids
    }

    /// Whether every category reached a terminal status.
    pub fn is_complete(&self) -> bool {
        self.statuses.values().all(CategoryStatus::is_terminal)
    }
}

/// Count indicators per indicator type.
pub fn count_by_type<'a, I>(indicators: I) -> BTreeMap<String, usize>
where
    I: IntoIterator<Item = &'a Indicator>,
{
    let mut counts: BTreeMap<String, usize> = BTreeMap::new();
    for indicator in indicators {
        let key = if indicator.indicator_type.is_empty() {
            "unknown".to_string()
        } else {
            indicator.indicator_type.to_lowercase()
        };
        *counts.entry(key).or_default() += 1;
    }
    counts
}

/// Keep the indicators of one type (case-insensitive).
pub fn filter_by_type<'a>(
    indicators: &'a BTreeMap<String, Indicator>,
    indicator_type: &str,
) -> Vec<(&'a String, &'a Indicator)> {
    indicators
        .iter()
        .filter(|(_, i)| i.indicator_type.eq_ignore_ascii_case(indicator_type))
        .collect()
}

/// Group entries by the category that produced them.
pub fn group_by_category(entries: &[IndicatorEntry]) -> BTreeMap<Category, Vec<&IndicatorEntry>> {
    let mut grouped: BTreeMap<Category, Vec<&IndicatorEntry>> = BTreeMap::new();
    for entry in entries {
        grouped.entry(entry.category).or_default().push(entry);
    }
    grouped
}

/// Number of entries in each score band.
pub fn band_distribution(entries: &[IndicatorEntry]) -> BTreeMap<ScoreBand, usize> {
    let mut dist: BTreeMap<ScoreBand, usize> = BTreeMap::new();
    for entry in entries {
        *dist.entry(entry.indicator.band()).or_default() += 1;
    }
    dist
}

/// The `n` lowest scoring entries, lowest first.
pub fn lowest_scoring(entries: &[IndicatorEntry], n: usize) -> Vec<&IndicatorEntry> {
    let mut sorted: Vec<&IndicatorEntry> = entries.iter().collect();
    sorted.sort_by_key(|e| e.indicator.score);
    sorted.truncate(n);
    sorted
}

/// Mean indicator score, `None` when there are no entries.
pub fn average_score(entries: &[IndicatorEntry]) -> Option<f64> {
    if entries.is_empty() {
        return None;
    }
    let total: u32 = entries.iter().map(|e| u32::from(e.indicator.score)).sum();
    Some(f64::from(total) / entries.len() as f64)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn indicator(score: u8, indicator_type: &str) -> Indicator {
        Indicator {
            score,
            reasoning: "reason".to_string(),
            title: "title".to_string(),
            indicator_type: indicator_type.to_string(),
            sub_type: String::new(),
            description: String::new(),
        }
    }

    fn result(category: Category, keys: &[(&str, u8)], partial_index: f64) -> CategoryResult {
        CategoryResult {
            category,
            document_id: Some(42),
            indicators: keys
                .iter()
                .map(|(key, score)| IndicatorEntry {
                    category,
                    key: key.to_string(),
                    indicator: indicator(*score, category.as_str()),
                })
                .collect(),
            partial_index,
            token_usage: None,
        }
    }

    #[test]
    fn test_new_state_is_pending() {
        let state = AggregateState::new(&Category::ALL);
        for category in Category::ALL {
            assert_eq!(state.status(category), Some(CategoryStatus::Pending));
        }
        assert!(!state.is_complete());
        assert!(state.indicators().is_empty());
        assert_eq!(state.total_index(), 0.0);
    }

    #[test]
    fn test_results_append_in_arrival_order() {
        let mut state = AggregateState::new(&Category::ALL);
        state.begin_all();

        state
            .on_category_result(result(Category::Social, &[("401-1", 3)], 12.0))
            .unwrap();
        state
            .on_category_result(result(Category::Governance, &[("2-9", 2), ("2-10", 4)], 8.5))
            .unwrap();

        let keys: Vec<_> = state.indicators().iter().map(|e| e.key.as_str()).collect();
        assert_eq!(keys, vec!["401-1", "2-9", "2-10"]);
        assert_eq!(state.total_index(), 20.5);
        assert_eq!(state.finished(), vec![Category::Governance, Category::Social]);
        assert_eq!(state.in_progress(), vec![Category::Economic, Category::Environmental]);
        assert_eq!(state.document_ids().get(&Category::Social), Some(&42));
    }

    #[test]
    fn test_partial_failure_sums_only_finished() {
        let mut state = AggregateState::new(&Category::ALL);
        state.begin_all();

        state
            .on_category_result(result(Category::Governance, &[("2-9", 2)], 10.0))
            .unwrap();
        state
            .on_category_result(result(Category::Economic, &[("201-1", 3)], 15.0))
            .unwrap();
        state.on_category_failed(Category::Social, "HTTP 503").unwrap();
        state
            .on_category_failed(Category::Environmental, "HTTP 503")
            .unwrap();

        assert!(state.is_complete());
        assert_eq!(state.total_index(), 25.0);
        assert_eq!(state.failed(), vec![Category::Social, Category::Environmental]);
        assert_eq!(state.failures().len(), 2);
    }

    #[test]
    fn test_category_leaves_in_progress_once() {
        let mut state = AggregateState::new(&Category::ALL);
        state.begin(Category::Economic).unwrap();
        state
            .on_category_result(result(Category::Economic, &[("201-1", 1)], 4.0))
            .unwrap();

        let err = state
            .on_category_failed(Category::Economic, "late failure")
            .unwrap_err();
        assert_eq!(err.from, CategoryStatus::Finished);
        assert_eq!(err.to, CategoryStatus::Failed);

        assert!(state
            .on_category_result(result(Category::Economic, &[("201-2", 1)], 4.0))
            .is_err());
        assert_eq!(state.indicators().len(), 1);
        assert_eq!(state.total_index(), 4.0);
    }

    #[test]
    fn test_result_for_pending_category_is_rejected() {
        let mut state = AggregateState::new(&Category::ALL);
        let err = state
            .on_category_result(result(Category::Social, &[("401-1", 3)], 1.0))
            .unwrap_err();
        assert_eq!(err.from, CategoryStatus::Pending);
        assert!(state.indicators().is_empty());
    }

    #[test]
    fn test_duplicate_keys_are_kept_per_category() {
        let mut state = AggregateState::new(&Category::ALL);
        state.begin_all();
        state
            .on_category_result(result(Category::Social, &[("3-3", 1)], 1.0))
            .unwrap();
        state
            .on_category_result(result(Category::Environmental, &[("3-3", 4)], 1.0))
            .unwrap();

        let entries: Vec<_> = state
            .indicators()
            .iter()
            .filter(|e| e.key == "3-3")
            .map(|e| e.category)
            .collect();
        assert_eq!(entries, vec![Category::Social, Category::Environmental]);
    }

    #[test]
    fn test_begin_all_only_starts_pending() {
        let mut state = AggregateState::new(&Category::ALL);
        state.begin(Category::Governance).unwrap();
        state
            .on_category_result(result(Category::Governance, &[("2-9", 2)], 3.0))
            .unwrap();

        state.begin_all();

        assert_eq!(state.status(Category::Governance), Some(CategoryStatus::Finished));
        assert_eq!(
            state.in_progress(),
            vec![Category::Economic, Category::Social, Category::Environmental]
        );
        assert!(state.begin(Category::Social).is_err());
        assert_eq!(state.total_index(), 3.0);
    }

    #[test]
    fn test_count_and_filter_by_type() {
        let mut indicators = BTreeMap::new();
        indicators.insert("2-9".to_string(), indicator(2, "Governance"));
        indicators.insert("2-10".to_string(), indicator(3, "governance"));
        indicators.insert("305-1".to_string(), indicator(1, "environmental"));
        indicators.insert("x".to_string(), indicator(0, ""));

        let counts = count_by_type(indicators.values());
        assert_eq!(counts.get("governance"), Some(&2));
        assert_eq!(counts.get("environmental"), Some(&1));
        assert_eq!(counts.get("unknown"), Some(&1));

        let governance = filter_by_type(&indicators, "GOVERNANCE");
        assert_eq!(governance.len(), 2);
    }

    #[test]
    fn test_statistics() {
        let entries = result(Category::Social, &[("a", 4), ("b", 0), ("c", 2)], 0.0).indicators;

        let lowest = lowest_scoring(&entries, 2);
        assert_eq!(lowest[0].key, "b");
        assert_eq!(lowest[1].key, "c");

        let dist = band_distribution(&entries);
        assert_eq!(dist.get(&ScoreBand::Excellent), Some(&1));
        assert_eq!(dist.get(&ScoreBand::Critical), Some(&1));

        assert_eq!(average_score(&entries), Some(2.0));
        assert_eq!(average_score(&[]), None);
        assert_eq!(group_by_category(&entries).len(), 1);
    }
}
