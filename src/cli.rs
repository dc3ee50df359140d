//! Command-line interface argument parsing.
//!
//! This module handles all CLI argument parsing using clap,
//! including validation and default values.

use crate::models::{Category, DocumentType, Role, SortBy, SortOrder, MAX_INDICATOR_SCORE};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// ESGScore - command-line client for ESG report scoring
///
/// Upload sustainability, annual or financial reports, score them across
/// the governance, economic, social and environmental categories, and
/// browse, edit and administer the stored evaluations.
///
/// Examples:
///   esgscore analyze report.pdf
///   esgscore analyze annual.pdf financials.pdf --doc-type annual_report --doc-type financial_statement
///   esgscore history --min-score 40 --sort-by score
///   esgscore show 42 --type governance
///   esgscore edit 42 2-9-b --score 3 --reasoning "Board composition disclosed"
///   esgscore approve user_2abc
///   esgscore init-config
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,

    /// Path to configuration file
    ///
    /// If not specified, looks for .esgscore.toml in the current directory
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Base URL of the ESG scoring API
    #[arg(long, global = true, env = "ESG_API", value_name = "URL")]
    pub api_url: Option<String>,

    /// Enable verbose logging output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Run in quiet mode (minimal output)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Per-request timeout in seconds
    #[arg(long, global = true, value_name = "SECS")]
    pub timeout: Option<u64>,

    /// Retries after the first attempt of a category request
    #[arg(long, global = true, value_name = "N")]
    pub max_retries: Option<u32>,

    /// Delay before the first retry, doubled on each further retry
    #[arg(long, global = true, value_name = "MS")]
    pub base_delay_ms: Option<u64>,

    /// ID of the signed-in account
    #[arg(long, global = true, env = "ESG_USER_ID", value_name = "USER_ID")]
    pub user: Option<String>,

    /// Secret key for the identity provider's management API
    #[arg(long, global = true, env = "CLERK_SECRET_KEY", hide_env_values = true)]
    pub secret_key: Option<String>,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Upload documents and score them in every category
    Analyze(AnalyzeArgs),

    /// List previously analyzed documents
    History(HistoryArgs),

    /// Show a stored document with its indicators
    Show {
        id: i64,

        /// Only show indicators of this type
        #[arg(long = "type", value_name = "TYPE")]
        indicator_type: Option<String>,

        /// Output format (markdown, json)
        #[arg(long, value_name = "FORMAT")]
        format: Option<OutputFormat>,
    },

    /// Print the download URL of a stored document
    Pdf { id: i64 },

    /// Change the score and reasoning of an indicator
    Edit {
        id: i64,

        /// Indicator key, e.g. 2-9-b
        key: String,

        /// New score (0-4)
        #[arg(long)]
        score: u8,

        #[arg(long)]
        reasoning: String,
    },

    /// List or search accounts (admin only)
    Users {
        /// Search by name or email; without it the newest accounts are shown
        #[arg(long, value_name = "QUERY")]
        search: Option<String>,
    },

    /// Assign a role to an account (admin only)
    SetRole { user_id: String, role: Role },

    /// Remove the role of an account (admin only)
    RemoveRole { user_id: String },

    /// Approve a pending account (admin only)
    Approve { user_id: String },

    /// Apply an identity provider webhook event read from a JSON file
    Webhook {
        #[arg(value_name = "EVENT_JSON_FILE")]
        event: PathBuf,
    },

    /// Generate a default .esgscore.toml configuration file
    InitConfig,
}

#[derive(clap::Args, Debug, Clone)]
pub struct AnalyzeArgs {
    /// Documents to analyze
    #[arg(required = true, value_name = "FILE")]
    pub files: Vec<PathBuf>,

    /// Document type, once for all files or once per file
    ///
    /// Values: sustainability_report, annual_report, financial_statement
    #[arg(long = "doc-type", value_name = "TYPE")]
    pub doc_types: Vec<DocumentType>,

    /// Only score these categories (repeatable)
    #[arg(long = "category", value_name = "CATEGORY")]
    pub categories: Vec<Category>,

    /// Output file path for the report
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Output format (markdown, json)
    #[arg(long, value_name = "FORMAT")]
    pub format: Option<OutputFormat>,

    /// Exit with code 2 when some categories failed
    #[arg(long)]
    pub fail_on_partial: bool,
}

impl AnalyzeArgs {
    /// Document type of each file.
    pub fn document_types(&self, default: DocumentType) -> Vec<DocumentType> {
        match self.doc_types.as_slice() {
            [] => vec![default; self.files.len()],
            [single] => vec![*single; self.files.len()],
            many => many.to_vec(),
        }
    }
}

#[derive(clap::Args, Debug, Clone)]
pub struct HistoryArgs {
    /// Page number, starting at 1
    #[arg(long, default_value = "1")]
    pub page: u32,

    /// Documents per page
    #[arg(long, value_name = "N")]
    pub page_size: Option<u32>,

    /// Only documents uploaded on or after this date (YYYY-MM-DD)
    #[arg(long, value_name = "DATE")]
    pub start_date: Option<NaiveDate>,

    /// Only documents uploaded on or before this date (YYYY-MM-DD)
    #[arg(long, value_name = "DATE")]
    pub end_date: Option<NaiveDate>,

    /// Lowest SPDI index to include (0-100)
    #[arg(long, default_value = "0")]
    pub min_score: u32,

    /// Highest SPDI index to include (0-100)
    #[arg(long, default_value = "100")]
    pub max_score: u32,

    /// Sort key (date, name, score)
    #[arg(long, default_value = "date")]
    pub sort_by: SortBy,

    /// Sort direction (asc, desc)
    #[arg(long, default_value = "desc")]
    pub sort_order: SortOrder,

    /// Output format (markdown, json)
    #[arg(long, value_name = "FORMAT")]
    pub format: Option<OutputFormat>,
}

/// Output format for reports and listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Markdown format (default)
    #[default]
    Markdown,
    /// JSON format
    Json,
}

impl Command {
    /// Application route this command stands for, used for access checks.
    pub fn route(&self) -> String {
        match self {
            Command::Analyze(_) => "/results".to_string(),
            Command::History(_) => "/history".to_string(),
            Command::Show { id, .. } | Command::Pdf { id } | Command::Edit { id, .. } => {
                format!("/detail/{}", id)
            }
            Command::Users { .. } => "/api/admin/users".to_string(),
            Command::SetRole { .. } | Command::RemoveRole { .. } => "/admin".to_string(),
            Command::Approve { .. } => "/api/admin/approve-user".to_string(),
            Command::Webhook { .. } => "/api/clerk-webhooks".to_string(),
            Command::InitConfig => "/".to_string(),
        }
    }
}

impl Args {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Validate the parsed arguments.
    pub fn validate(&self) -> Result<(), String> {
        // Check for conflicting options
        if self.verbose && self.quiet {
            return Err("Cannot use both --verbose and --quiet".to_string());
        }

        if let Some(ref url) = self.api_url {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                return Err("API URL must start with 'http://' or 'https://'".to_string());
            }
        }

        if self.timeout == Some(0) {
            return Err("Timeout must be at least 1 second".to_string());
        }

        match &self.command {
            Command::Analyze(analyze) => {
                let types = analyze.doc_types.len();
                if types > 1 && types != analyze.files.len() {
                    return Err(format!(
                        "Got {} --doc-type values for {} files; give one for all files or one per file",
                        types,
                        analyze.files.len()
                    ));
                }
                for file in &analyze.files {
                    if !file.is_file() {
                        return Err(format!("File does not exist: {}", file.display()));
                    }
                }
            }
            Command::History(history) => {
                if history.page == 0 {
                    return Err("Page must be at least 1".to_string());
                }
                if history.page_size == Some(0) {
                    return Err("Page size must be at least 1".to_string());
                }
                if history.min_score > history.max_score {
                    return Err("--min-score cannot be greater than --max-score".to_string());
                }
                if history.max_score > 100 {
                    return Err("Scores must be between 0 and 100".to_string());
                }
                if let (Some(start), Some(end)) = (history.start_date, history.end_date) {
                    if start > end {
                        return Err("--start-date cannot be after --end-date".to_string());
                    }
                }
            }
            Command::Edit { score, reasoning, .. } => {
                if *score > MAX_INDICATOR_SCORE {
                    return Err(format!("Score must be between 0 and {}", MAX_INDICATOR_SCORE));
                }
                if reasoning.trim().is_empty() {
                    return Err("Reasoning cannot be empty".to_string());
                }
            }
            _ => {}
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Args {
        Args::try_parse_from(std::iter::once("esgscore").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn test_parse_analyze() {
        let args = parse(&[
            "analyze",
            "a.pdf",
            "b.pdf",
            "--doc-type",
            "annual_report",
            "--category",
            "social",
            "--fail-on-partial",
        ]);
        let Command::Analyze(analyze) = &args.command else {
            panic!("expected analyze");
        };
        assert_eq!(analyze.files.len(), 2);
        assert_eq!(analyze.categories, vec![Category::Social]);
        assert!(analyze.fail_on_partial);
        assert_eq!(
            analyze.document_types(DocumentType::SustainabilityReport),
            vec![DocumentType::AnnualReport, DocumentType::AnnualReport]
        );
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let args = parse(&["history", "--api-url", "https://esg.example.com", "--verbose"]);
        assert!(args.verbose);
        assert_eq!(args.api_url.as_deref(), Some("https://esg.example.com"));
        assert_eq!(args.command.route(), "/history");
    }

    #[test]
    fn test_unknown_role_is_rejected() {
        let result = Args::try_parse_from(["esgscore", "set-role", "user_1", "owner"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_validation_conflicting_options() {
        let mut args = parse(&["pdf", "1"]);
        args.verbose = true;
        args.quiet = true;
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_validation_invalid_url() {
        let mut args = parse(&["pdf", "1"]);
        args.api_url = Some("ftp://esg".to_string());
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_validation_edit_score() {
        let args = parse(&["edit", "7", "2-9", "--score", "5", "--reasoning", "x"]);
        assert!(args.validate().is_err());
        let args = parse(&["edit", "7", "2-9", "--score", "4", "--reasoning", "x"]);
        assert!(args.validate().is_ok());
    }

    #[test]
    fn test_validation_history() {
        let args = parse(&["history", "--min-score", "60", "--max-score", "40"]);
        assert!(args.validate().is_err());
        let args = parse(&["history", "--page", "0"]);
        assert!(args.validate().is_err());
        let args = parse(&["history", "--start-date", "2024-05-01", "--end-date", "2024-04-01"]);
        assert!(args.validate().is_err());
        let args = parse(&["history", "--sort-by", "score", "--sort-order", "asc"]);
        assert!(args.validate().is_ok());
    }

    #[test]
    fn test_validation_doc_type_count() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("a.pdf");
        let b = dir.path().join("b.pdf");
        let c = dir.path().join("c.pdf");
        for path in [&a, &b, &c] {
            std::fs::write(path, b"%PDF-1.4").unwrap();
        }
        let files: Vec<String> = [&a, &b, &c].iter().map(|p| p.display().to_string()).collect();

        let mut argv = vec!["analyze".to_string()];
        argv.extend(files.iter().cloned());
        argv.extend(["--doc-type", "annual", "--doc-type", "financial"].map(String::from));
        let refs: Vec<&str> = argv.iter().map(String::as_str).collect();
        assert!(parse(&refs).validate().is_err());

        let mut argv = vec!["analyze".to_string()];
        argv.extend(files);
        let refs: Vec<&str> = argv.iter().map(String::as_str).collect();
        assert!(parse(&refs).validate().is_ok());
    }

    #[test]
    fn test_routes() {
        assert_eq!(parse(&["show", "12"]).command.route(), "/detail/12");
        assert_eq!(parse(&["approve", "u"]).command.route(), "/api/admin/approve-user");
        assert_eq!(parse(&["init-config"]).command.route(), "/");
    }
}
