//! Markdown and JSON rendering.
//!
//! This module renders analysis reports, stored documents, history pages
//! and account listings.

use crate::analysis::{
    average_score, band_distribution, count_by_type, filter_by_type, group_by_category,
    lowest_scoring, CategoryStatus,
};
use crate::models::{
    AnalysisReport, Category, DocumentDetail, DocumentPage, HistoryQuery, Indicator, IndicatorEntry,
    ReportMetadata, ScoreBand, ScoreScale, Summary, UserSummary,
};
use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use std::io::Write;
use std::path::Path;

/// Generate a complete Markdown analysis report.
pub fn generate_markdown_report(report: &AnalysisReport) -> String {
    let mut output = String::new();

    output.push_str("# ESG Scoring Report\n\n");

    output.push_str(&generate_metadata_section(&report.metadata));

    if let Some(ref warning) = report.warning {
        output.push_str(&format!("> ⚠️ **Partial results:** {}\n", warning));
        for failure in &warning.failures {
            output.push_str(&format!("> - `{}`: {}\n", failure.category, failure.message));
        }
        output.push('\n');
    }

    output.push_str(&generate_summary_section(report));
    output.push_str(&generate_indicators_section(&report.indicators));
    output.push_str(&generate_footer());

    output
}

/// Generate the metadata section.
fn generate_metadata_section(metadata: &ReportMetadata) -> String {
    let mut section = String::new();

    section.push_str("## Metadata\n\n");
    for (i, file) in metadata.files.iter().enumerate() {
        let doc_type = metadata
            .document_types
            .get(i)
            .map(|t| t.label())
            .unwrap_or("Unknown");
        section.push_str(&format!("- **Document:** {} ({})\n", file, doc_type));
    }
    section.push_str(&format!(
        "- **Analysis Date:** {}\n",
        metadata.analysis_date.format("%Y-%m-%d %H:%M:%S UTC")
    ));
    section.push_str(&format!("- **Scoring API:** `{}`\n", metadata.api_url));
    if !metadata.document_ids.is_empty() {
        section.push_str(&format!(
            "- **Stored Documents:** {}\n",
            format_document_ids(&metadata.document_ids)
        ));
    }
    section.push_str(&format!(
        "- **Categories Finished:** {}\n",
        join_or_none(&metadata.categories_finished)
    ));
    if !metadata.categories_failed.is_empty() {
        section.push_str(&format!(
            "- **Categories Failed:** {}\n",
            join_or_none(&metadata.categories_failed)
        ));
    }
    section.push_str(&format!(
        "- **Total Indicators:** {}\n",
        metadata.total_indicators
    ));
    section.push_str(&format!(
        "- **Analysis Duration:** {:.1}s\n",
        metadata.duration_seconds
    ));
    section.push('\n');

    section
}

/// Stored document IDs labelled by the category that produced them,
/// e.g. `governance #77, social #78`.
pub fn format_document_ids(ids: &BTreeMap<Category, i64>) -> String {
    ids.iter()
        .map(|(category, id)| format!("{} #{}", category, id))
        .collect::<Vec<_>>()
        .join(", ")
}

fn join_or_none<T: std::fmt::Display>(items: &[T]) -> String {
    if items.is_empty() {
        return "none".to_string();
    }
    items
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Generate the summary section.
fn generate_summary_section(report: &AnalysisReport) -> String {
    let mut section = String::new();

    section.push_str("## Summary\n\n");
    section.push_str(&format!(
        "**SPDI Index:** {}\n\n",
        format_index(Some(report.spdi_index))
    ));
    if let Some(average) = average_score(&report.indicators) {
        section.push_str(&format!("**Average Indicator Score:** {:.2}/4\n\n", average));
    }

    section.push_str("### Categories\n\n");
    section.push_str("| Category | Status | Indicators |\n");
    section.push_str("|:---|:---:|:---:|\n");
    let grouped = group_by_category(&report.indicators);
    for category in report
        .metadata
        .categories_finished
        .iter()
        .chain(&report.metadata.categories_failed)
    {
        let status = if report.metadata.categories_failed.contains(category) {
            CategoryStatus::Failed
        } else {
            CategoryStatus::Finished
        };
        let count = grouped.get(category).map(Vec::len).unwrap_or(0);
        section.push_str(&format!("| {} | {} | {} |\n", category, status, count));
    }
    section.push('\n');

    let dist = band_distribution(&report.indicators);
    if !dist.is_empty() {
        section.push_str("### Score Distribution\n\n");
        section.push_str("| Band | Indicators |\n");
        section.push_str("|:---|:---:|\n");
        for (band, count) in dist.iter().rev() {
            section.push_str(&format!("| {} {} | {} |\n", band.emoji(), band, count));
        }
        section.push('\n');
    }

    let lowest: Vec<_> = lowest_scoring(&report.indicators, 5)
        .into_iter()
        .filter(|e| e.indicator.band() <= ScoreBand::Poor)
        .collect();
    if !lowest.is_empty() {
        section.push_str("### Weakest Indicators\n\n");
        for entry in lowest {
            section.push_str(&format!(
                "- `{}` ({}) scored {}/4\n",
                entry.key, entry.category, entry.indicator.score
            ));
        }
        section.push('\n');
    }

    section
}

/// Generate the indicators section, grouped by category.
fn generate_indicators_section(entries: &[IndicatorEntry]) -> String {
    let mut section = String::new();

    section.push_str("## Indicators\n\n");

    if entries.is_empty() {
        section.push_str("No indicators were returned.\n\n");
        return section;
    }

    for (category, entries) in group_by_category(entries) {
        section.push_str(&format!("### {}\n\n", capitalize(category.as_str())));
        for entry in entries {
            section.push_str(&generate_indicator_block(&entry.key, &entry.indicator));
        }
    }

    section
}

/// Generate a single indicator block.
fn generate_indicator_block(key: &str, indicator: &Indicator) -> String {
    let mut block = String::new();
    let band = indicator.band();

    if indicator.title.is_empty() {
        block.push_str(&format!("#### `{}`\n\n", key));
    } else {
        block.push_str(&format!("#### `{}` {}\n\n", key, indicator.title));
    }
    block.push_str(&format!(
        "**Score:** {} {}/4 ({})\n\n",
        band.emoji(),
        indicator.score,
        band
    ));
    if !indicator.sub_type.is_empty() {
        block.push_str(&format!("*{}*\n\n", indicator.sub_type));
    }
    if !indicator.description.is_empty() {
        block.push_str(&format!("**Description:** {}\n\n", indicator.description));
    }
    if !indicator.reasoning.is_empty() {
        block.push_str(&format!("> {}\n\n", indicator.reasoning));
    }

    block
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Generate the report footer.
fn generate_footer() -> String {
    "---\n\n*Report generated by ESGScore*\n".to_string()
}

/// Render a stored document, optionally restricted to one indicator type.
pub fn generate_document_markdown(document: &DocumentDetail, type_filter: Option<&str>) -> String {
    let mut output = String::new();

    output.push_str(&format!("# {}\n\n", document.filename));
    output.push_str(&format!("- **ID:** {}\n", document.id));
    output.push_str(&format!(
        "- **Uploaded:** {}\n",
        format_date(document.upload_date.as_deref())
    ));
    output.push_str(&format!(
        "- **File Size:** {}\n",
        document
            .file_size
            .map(format_file_size)
            .unwrap_or_else(|| "Unknown".to_string())
    ));
    output.push_str(&format!(
        "- **SPDI Index:** {}\n\n",
        format_index(document.spdi_index())
    ));

    output.push_str(&generate_summary_scores(&document.summary));

    let counts = count_by_type(document.indicators.values());
    output.push_str(&format!("## Indicators ({})\n\n", document.indicators.len()));
    if !counts.is_empty() {
        output.push_str("| Type | Count |\n");
        output.push_str("|:---|:---:|\n");
        for (indicator_type, count) in &counts {
            output.push_str(&format!("| {} | {} |\n", indicator_type, count));
        }
        output.push('\n');
    }

    let shown: Vec<(&String, &Indicator)> = match type_filter {
        Some(t) => filter_by_type(&document.indicators, t),
        None => document.indicators.iter().collect(),
    };

    if shown.is_empty() {
        output.push_str("No indicators match.\n");
    }
    for (key, indicator) in shown {
        output.push_str(&generate_indicator_block(key, indicator));
    }

    output
}

/// Percentage summary scores of a stored document, empty when it has none.
fn generate_summary_scores(summary: &Summary) -> String {
    if !summary.has_scores() {
        return String::new();
    }

    let mut section = String::new();
    section.push_str("## Summary Scores\n\n");
    section.push_str("| Area | Score | Band |\n");
    section.push_str("|:---|:---:|:---|\n");

    let rows = std::iter::once(("Overall".to_string(), summary.overall)).chain(
        Category::ALL
            .iter()
            .map(|c| (capitalize(c.as_str()), summary.category_score(*c))),
    );
    for (area, score) in rows {
        match score {
            Some(score) => {
                let band = ScoreScale::Percent.band(score);
                section.push_str(&format!(
                    "| {} | {}/100 | {} {} |\n",
                    area,
                    format_index(Some(score)),
                    band.emoji(),
                    band
                ));
            }
            None => section.push_str(&format!("| {} | N/A | - |\n", area)),
        }
    }
    section.push('\n');

    section
}

/// Render one page of document history.
pub fn generate_history_markdown(page: &DocumentPage, query: &HistoryQuery) -> String {
    let mut output = String::new();

    output.push_str("# Document History\n\n");

    if page.documents.is_empty() {
        output.push_str("No documents found.\n");
        return output;
    }

    output.push_str("| ID | File | Uploaded | Size | SPDI Index |\n");
    output.push_str("|:---:|:---|:---|---:|---:|\n");
    for doc in &page.documents {
        output.push_str(&format!(
            "| {} | {} | {} | {} | {} |\n",
            doc.id,
            doc.filename,
            format_date(doc.created_at.as_deref()),
            doc.file_size
                .map(format_file_size)
                .unwrap_or_else(|| "-".to_string()),
            format_index(doc.spdi_index)
        ));
    }

    output.push_str(&format!(
        "\nPage {} of {} ({} documents)\n",
        query.page,
        query.total_pages(page.count).max(1),
        page.count
    ));

    output
}

/// Render an account listing with pending approvals first.
pub fn generate_users_markdown(users: &[UserSummary]) -> String {
    let mut output = String::new();

    let (pending, approved): (Vec<&UserSummary>, Vec<&UserSummary>) =
        users.iter().partition(|u| !u.is_approved);

    for (title, group) in [("Pending Approvals", pending), ("Approved Users", approved)] {
        output.push_str(&format!("## {}\n\n", title));
        if group.is_empty() {
            output.push_str("None.\n\n");
            continue;
        }
        output.push_str("| ID | Name | Email | Role | Joined |\n");
        output.push_str("|:---|:---|:---|:---|:---|\n");
        for user in group {
            let name = [user.first_name.as_deref(), user.last_name.as_deref()]
                .into_iter()
                .flatten()
                .collect::<Vec<_>>()
                .join(" ");
            let joined = DateTime::<Utc>::from_timestamp_millis(user.created_at)
                .map(|d| d.format("%Y-%m-%d").to_string())
                .unwrap_or_default();
            let role = user.role.map(|r| r.as_str()).unwrap_or("-");
            output.push_str(&format!(
                "| {} | {} | {} | {} | {} |\n",
                user.id, name, user.email_address, role, joined
            ));
        }
        output.push('\n');
    }

    output
}

/// Human readable size: bytes, then KB and MB with two decimals.
pub fn format_file_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = 1024 * 1024;

    if bytes < KB {
        format!("{} B", bytes)
    } else if bytes < MB {
        format!("{:.2} KB", bytes as f64 / KB as f64)
    } else {
        format!("{:.2} MB", bytes as f64 / MB as f64)
    }
}

/// SPDI index for display: whole numbers as-is, otherwise two decimals.
pub fn format_index(index: Option<f64>) -> String {
    match index {
        Some(value) if value.fract() == 0.0 => format!("{}", value as i64),
        Some(value) => format!("{:.2}", value),
        None => "N/A".to_string(),
    }
}

fn format_date(raw: Option<&str>) -> String {
    let Some(raw) = raw.filter(|s| !s.is_empty()) else {
        return "Unknown date".to_string();
    };
    match DateTime::parse_from_rfc3339(raw) {
        Ok(date) => date.format("%Y-%m-%d %H:%M").to_string(),
        Err(_) => raw.to_string(),
    }
}

/// Serialize any report value as pretty JSON.
pub fn generate_json_report<T: Serialize>(value: &T) -> Result<String> {
    serde_json::to_string_pretty(value).map_err(Into::into)
}

/// Write rendered output to a file.
pub fn write_report(content: &str, path: &Path) -> Result<()> {
    let mut file = std::fs::File::create(path)?;
    file.write_all(content.as_bytes())?;

    Ok(())
}
