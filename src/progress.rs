//! Terminal progress for an analysis run: one spinner per category.

use esgscore::analysis::{AggregateState, AnalysisEvent};
use esgscore::models::Category;
use indicatif::{MultiProgress, ProgressBar, ProgressDrawTarget, ProgressStyle};
use std::collections::BTreeMap;
use std::time::Duration;

pub struct CategoryProgress {
    multi: MultiProgress,
    bars: BTreeMap<Category, ProgressBar>,
}

impl CategoryProgress {
    pub fn new(categories: &[Category], hidden: bool) -> Self {
        let multi = if hidden {
            MultiProgress::with_draw_target(ProgressDrawTarget::hidden())
        } else {
            MultiProgress::new()
        };

        let style = ProgressStyle::default_spinner()
            .template("{spinner:.green} {prefix:>14.bold} {msg} [{elapsed}]")
            .unwrap_or_else(|_| ProgressStyle::default_spinner());

        let bars = categories
            .iter()
            .map(|category| {
                let bar = multi.add(ProgressBar::new_spinner());
                bar.set_style(style.clone());
                bar.set_prefix(category.to_string());
                bar.set_message("pending");
                (*category, bar)
            })
            .collect();

        Self { multi, bars }
    }

    pub fn update(&self, event: &AnalysisEvent, state: &AggregateState) {
        match event {
            AnalysisEvent::Uploaded {
                file_index,
                reference,
            } => {
                let _ = self.multi.println(format!(
                    "   📤 Uploaded #{} {}",
                    file_index + 1,
                    reference.display_name
                ));
            }
            AnalysisEvent::CategoryStarted(category) => {
                if let Some(bar) = self.bars.get(category) {
                    bar.set_message("scoring...");
                    bar.enable_steady_tick(Duration::from_millis(120));
                }
            }
            AnalysisEvent::CategoryFinished {
                category,
                indicators,
                partial_index,
            } => {
                if let Some(bar) = self.bars.get(category) {
                    bar.finish_with_message(format!(
                        "✅ {} indicators, +{:.2} (running index {:.2})",
                        indicators,
                        partial_index,
                        state.total_index()
                    ));
                }
            }
            AnalysisEvent::CategoryFailed { category, message } => {
                if let Some(bar) = self.bars.get(category) {
                    bar.abandon_with_message(format!("❌ {}", message));
                }
            }
        }
    }

    /// Stop any spinner still running.
    pub fn finish(&self) {
        for bar in self.bars.values() {
            if !bar.is_finished() {
                bar.abandon();
            }
        }
    }
}
