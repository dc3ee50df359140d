//! Data models for the ESG scoring client.
//!
//! This module contains the core data structures used throughout the
//! application: evaluation categories, uploaded document references,
//! scored indicators, the wire shapes of the scoring API, and the
//! account records of the identity provider.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Highest score an indicator can receive on the canonical point scale.
pub const MAX_INDICATOR_SCORE: u8 = 4;

/// Evaluation dimension used to partition scoring requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Governance,
    Economic,
    Social,
    Environmental,
}

impl Category {
    /// The fixed category set, in canonical order.
    pub const ALL: [Category; 4] = [
        Category::Governance,
        Category::Economic,
        Category::Social,
        Category::Environmental,
    ];

    /// Value sent as `gri_type` to the scoring API.
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Governance => "governance",
            Category::Economic => "economic",
            Category::Social => "social",
            Category::Environmental => "environmental",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Category::ALL
            .into_iter()
            .find(|c| c.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| {
                format!(
                    "unknown category '{}' (expected governance, economic, social or environmental)",
                    s
                )
            })
    }
}

/// Kind of report being uploaded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentType {
    #[default]
    SustainabilityReport,
    AnnualReport,
    FinancialStatement,
}

impl DocumentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentType::SustainabilityReport => "sustainability_report",
            DocumentType::AnnualReport => "annual_report",
            DocumentType::FinancialStatement => "financial_statement",
        }
    }

    /// Human readable label.
    pub fn label(&self) -> &'static str {
        match self {
            DocumentType::SustainabilityReport => "Sustainability Report",
            DocumentType::AnnualReport => "Annual Report",
            DocumentType::FinancialStatement => "Financial Statement",
        }
    }
}

impl fmt::Display for DocumentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DocumentType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "sustainability_report" | "sustainability" => Ok(DocumentType::SustainabilityReport),
            "annual_report" | "annual" => Ok(DocumentType::AnnualReport),
            "financial_statement" | "financial" => Ok(DocumentType::FinancialStatement),
            other => Err(format!(
                "unknown document type '{}' (expected sustainability_report, annual_report or financial_statement)",
                other
            )),
        }
    }
}

/// Durable reference to a file stored by the upload endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadReference {
    /// Opaque object-storage key returned by the API.
    pub object_key: String,
    /// Original file name of the uploaded document.
    pub display_name: String,
}

/// Response of `POST /upload`.
#[derive(Debug, Clone, Deserialize)]
pub struct UploadResponse {
    pub s3_object_key: String,
    #[serde(default)]
    pub filename: Option<String>,
}

/// Numeric scale a score is expressed on.
///
/// Indicator scores are points. The per-category summary scores of a stored
/// document are percentages. Values are never converted between the two.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScoreScale {
    /// 0 to 4.
    Points,
    /// 0 to 100.
    Percent,
}

impl ScoreScale {
    pub fn max(&self) -> f64 {
        match self {
            ScoreScale::Points => f64::from(MAX_INDICATOR_SCORE),
            ScoreScale::Percent => 100.0,
        }
    }

    pub fn contains(&self, score: f64) -> bool {
        score.is_finite() && (0.0..=self.max()).contains(&score)
    }

    /// Display band of a score on this scale.
    pub fn band(&self, score: f64) -> ScoreBand {
        match self {
            ScoreScale::Points => ScoreBand::from_score(score),
            ScoreScale::Percent => {
                if score >= 80.0 {
                    ScoreBand::Excellent
                } else if score >= 60.0 {
                    ScoreBand::Good
                } else if score >= 40.0 {
                    ScoreBand::Fair
                } else {
                    ScoreBand::Critical
                }
            }
        }
    }
}

/// Read a raw indicator score on the point scale.
///
/// Fractional values round to the nearest point. Anything outside 0-4 is
/// rejected, never reinterpreted as a percentage.
pub fn parse_points(raw: f64) -> Option<u8> {
    if !ScoreScale::Points.contains(raw) {
        return None;
    }
    Some(raw.round() as u8)
}

fn deserialize_score<'de, D>(deserializer: D) -> Result<u8, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = f64::deserialize(deserializer)?;
    parse_points(raw).ok_or_else(|| {
        serde::de::Error::custom(format!("indicator score {} is outside the 0-4 point scale", raw))
    })
}

/// A single scored line item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Indicator {
    /// Score on the canonical 0-4 point scale.
    #[serde(deserialize_with = "deserialize_score")]
    pub score: u8,
    /// Narrative explanation of the score.
    #[serde(default)]
    pub reasoning: String,
    #[serde(default)]
    pub title: String,
    /// Indicator family, e.g. "governance" or "environmental".
    #[serde(rename = "type", default)]
    pub indicator_type: String,
    #[serde(default, alias = "subtype")]
    pub sub_type: String,
    #[serde(default)]
    pub description: String,
}

impl Indicator {
    pub fn band(&self) -> ScoreBand {
        ScoreBand::from_score(f64::from(self.score))
    }
}

/// Flattened indicator as held by the aggregate.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IndicatorEntry {
    /// Category whose request produced this entry.
    pub category: Category,
    /// Short indicator code, e.g. "2-9-b".
    pub key: String,
    #[serde(flatten)]
    pub indicator: Indicator,
}

/// Display band of a score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScoreBand {
    Critical,
    Poor,
    Fair,
    Good,
    Excellent,
}

impl ScoreBand {
    pub fn from_score(score: f64) -> Self {
        if score >= 4.0 {
            ScoreBand::Excellent
        } else if score >= 3.0 {
            ScoreBand::Good
        } else if score >= 2.0 {
            ScoreBand::Fair
        } else if score >= 1.0 {
            ScoreBand::Poor
        } else {
            ScoreBand::Critical
        }
    }

    /// Returns an emoji representation of the band.
    pub fn emoji(&self) -> &'static str {
        match self {
            ScoreBand::Excellent => "🟢",
            ScoreBand::Good => "🔵",
            ScoreBand::Fair => "🟡",
            ScoreBand::Poor => "🟠",
            ScoreBand::Critical => "🔴",
        }
    }
}

impl fmt::Display for ScoreBand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScoreBand::Excellent => write!(f, "Excellent"),
            ScoreBand::Good => write!(f, "Good"),
            ScoreBand::Fair => write!(f, "Fair"),
            ScoreBand::Poor => write!(f, "Poor"),
            ScoreBand::Critical => write!(f, "Critical"),
        }
    }
}

/// Composite figures attached to an evaluation or a stored document.
///
/// `overall` and the per-category fields are percentages; stored documents
/// carry them, evaluation responses usually only have `spdi_index`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Summary {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub overall: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub governance: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub economic: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub social: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub environmental: Option<f64>,
    #[serde(default)]
    pub spdi_index: Option<f64>,
}

impl Summary {
    pub fn category_score(&self, category: Category) -> Option<f64> {
        match category {
            Category::Governance => self.governance,
            Category::Economic => self.economic,
            Category::Social => self.social,
            Category::Environmental => self.environmental,
        }
    }

    /// Whether any percentage score is present.
    pub fn has_scores(&self) -> bool {
        self.overall.is_some() || Category::ALL.iter().any(|c| self.category_score(*c).is_some())
    }
}

/// Body of an evaluation request.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum EvaluationBody {
    Single {
        s3_object_key: String,
        filename: String,
    },
    Multi {
        s3_object_keys: Vec<String>,
        filenames: Vec<String>,
        document_types: Vec<DocumentType>,
    },
}

/// One evaluation request, reused for every category of a run.
#[derive(Debug, Clone, PartialEq)]
pub struct EvaluationRequest {
    pub body: EvaluationBody,
    /// Sent as the `document_type` query parameter.
    pub document_type: DocumentType,
}

impl EvaluationRequest {
    /// Build a request from uploaded references and their document types.
    ///
    /// Returns `None` when there is nothing to evaluate. When fewer types
    /// than references are given, the last type (or the default) fills in.
    pub fn new(references: &[UploadReference], document_types: &[DocumentType]) -> Option<Self> {
        let fallback = document_types.last().copied().unwrap_or_default();
        let type_at = |i: usize| document_types.get(i).copied().unwrap_or(fallback);

        match references {
            [] => None,
            [single] => Some(Self {
                body: EvaluationBody::Single {
                    s3_object_key: single.object_key.clone(),
                    filename: single.display_name.clone(),
                },
                document_type: type_at(0),
            }),
            many => Some(Self {
                body: EvaluationBody::Multi {
                    s3_object_keys: many.iter().map(|r| r.object_key.clone()).collect(),
                    filenames: many.iter().map(|r| r.display_name.clone()).collect(),
                    document_types: (0..many.len()).map(type_at).collect(),
                },
                document_type: type_at(0),
            }),
        }
    }

    /// API path segment for this payload shape.
    pub fn endpoint(&self) -> &'static str {
        match self.body {
            EvaluationBody::Single { .. } => "evaluate",
            EvaluationBody::Multi { .. } => "evaluate-multi",
        }
    }
}

/// Response of `POST /evaluate` and `POST /evaluate-multi`.
#[derive(Debug, Clone, Deserialize)]
pub struct EvaluateResponse {
    #[serde(default)]
    pub id: Option<i64>,
    #[serde(default)]
    pub indicators: BTreeMap<String, Indicator>,
    #[serde(default)]
    pub summary: Summary,
    #[serde(default)]
    pub token_usage: Option<Value>,
}

/// Result of one successful category request.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryResult {
    pub category: Category,
    pub document_id: Option<i64>,
    pub indicators: Vec<IndicatorEntry>,
    /// This category's contribution to the composite index.
    pub partial_index: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token_usage: Option<Value>,
}

impl CategoryResult {
    pub fn from_response(category: Category, response: EvaluateResponse) -> Self {
        let indicators = response
            .indicators
            .into_iter()
            .map(|(key, indicator)| IndicatorEntry {
                category,
                key,
                indicator,
            })
            .collect();

        Self {
            category,
            document_id: response.id,
            indicators,
            partial_index: response.summary.spdi_index.unwrap_or(0.0),
            token_usage: response.token_usage,
        }
    }
}

/// A category that exhausted its retries.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryFailure {
    pub category: Category,
    pub message: String,
}

/// Raised when some, but not all, categories failed.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PartialResultsWarning {
    pub failures: Vec<CategoryFailure>,
}

impl PartialResultsWarning {
    pub fn failed_categories(&self) -> Vec<Category> {
        self.failures.iter().map(|f| f.category).collect()
    }
}

impl fmt::Display for PartialResultsWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<_> = self.failures.iter().map(|f| f.category.as_str()).collect();
        write!(
            f,
            "partial results: {} categor{} failed ({})",
            names.len(),
            if names.len() == 1 { "y" } else { "ies" },
            names.join(", ")
        )
    }
}

/// A stored document as listed by `GET /documents`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentSummary {
    pub id: i64,
    pub filename: String,
    #[serde(default, alias = "upload_date")]
    pub created_at: Option<String>,
    #[serde(default)]
    pub file_size: Option<u64>,
    #[serde(default)]
    pub indicators: BTreeMap<String, Indicator>,
    #[serde(default)]
    pub spdi_index: Option<f64>,
}

/// One page of document history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentPage {
    #[serde(default)]
    pub documents: Vec<DocumentSummary>,
    #[serde(default)]
    pub count: u64,
}

/// A stored document with its full evaluation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentDetail {
    pub id: i64,
    pub filename: String,
    #[serde(default, alias = "created_at")]
    pub upload_date: Option<String>,
    #[serde(default)]
    pub file_size: Option<u64>,
    #[serde(default)]
    pub indicators: BTreeMap<String, Indicator>,
    #[serde(default)]
    pub summary: Summary,
}

impl DocumentDetail {
    pub fn spdi_index(&self) -> Option<f64> {
        self.summary.spdi_index
    }

    /// Apply an accepted indicator edit to this copy of the document.
    ///
    /// The composite index becomes `updated_index` when the API returned
    /// one and is kept otherwise. Returns `false` if the key is unknown.
    pub fn apply_update(
        &mut self,
        key: &str,
        update: &IndicatorUpdate,
        updated_index: Option<f64>,
    ) -> bool {
        let Some(indicator) = self.indicators.get_mut(key) else {
            return false;
        };
        indicator.score = update.score;
        indicator.reasoning = update.reasoning.clone();
        if let Some(index) = updated_index {
            self.summary.spdi_index = Some(index);
        }
        true
    }
}

/// Response of `GET /documents/{id}/pdf`.
#[derive(Debug, Clone, Deserialize)]
pub struct PdfLink {
    pub url: String,
}

/// Body of `PATCH /documents/{id}/indicator/{key}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndicatorUpdate {
    pub score: u8,
    pub reasoning: String,
}

/// Response of an indicator edit.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct IndicatorUpdateResponse {
    #[serde(default)]
    pub updated_spdi_index: Option<f64>,
}

/// History sort key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortBy {
    #[default]
    Date,
    Name,
    Score,
}

impl SortBy {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortBy::Date => "date",
            SortBy::Name => "name",
            SortBy::Score => "score",
        }
    }
}

impl FromStr for SortBy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "date" => Ok(SortBy::Date),
            "name" => Ok(SortBy::Name),
            "score" => Ok(SortBy::Score),
            other => Err(format!("unknown sort key '{}' (expected date, name or score)", other)),
        }
    }
}

/// History sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

impl SortOrder {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortOrder::Asc => "asc",
            SortOrder::Desc => "desc",
        }
    }
}

impl FromStr for SortOrder {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "asc" => Ok(SortOrder::Asc),
            "desc" => Ok(SortOrder::Desc),
            other => Err(format!("unknown sort order '{}' (expected asc or desc)", other)),
        }
    }
}

/// Filters and pagination for `GET /documents`.
#[derive(Debug, Clone, PartialEq)]
pub struct HistoryQuery {
    /// 1-based page number.
    pub page: u32,
    pub page_size: u32,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    /// Bounds on the SPDI index, 0-100.
    pub min_score: u32,
    pub max_score: u32,
    pub sort_by: SortBy,
    pub sort_order: SortOrder,
}

impl Default for HistoryQuery {
    fn default() -> Self {
        Self {
            page: 1,
            page_size: 10,
            start_date: None,
            end_date: None,
            min_score: 0,
            max_score: 100,
            sort_by: SortBy::Date,
            sort_order: SortOrder::Desc,
        }
    }
}

impl HistoryQuery {
    pub fn offset(&self) -> u64 {
        u64::from(self.page.saturating_sub(1)) * u64::from(self.page_size)
    }

    /// Number of pages needed for `count` documents.
    pub fn total_pages(&self, count: u64) -> u64 {
        if self.page_size == 0 {
            return 0;
        }
        count.div_ceil(u64::from(self.page_size))
    }

    /// Query string pairs in the order the API expects them.
    pub fn to_query_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = vec![
            ("limit", self.page_size.to_string()),
            ("offset", self.offset().to_string()),
        ];
        if let Some(start) = self.start_date {
            pairs.push(("startDate", start.format("%Y-%m-%d").to_string()));
        }
        if let Some(end) = self.end_date {
            pairs.push(("endDate", end.format("%Y-%m-%d").to_string()));
        }
        pairs.push(("minScore", self.min_score.to_string()));
        pairs.push(("maxScore", self.max_score.to_string()));
        pairs.push(("sortBy", self.sort_by.as_str().to_string()));
        pairs.push(("sortOrder", self.sort_order.as_str().to_string()));
        pairs
    }
}

/// Account role stored in the identity provider's public metadata.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Admin,
    PromptAdmin,
    Member,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::PromptAdmin => "prompt_admin",
            Role::Member => "member",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Admin => write!(f, "Admin"),
            Role::PromptAdmin => write!(f, "Prompt Admin"),
            Role::Member => write!(f, "Member"),
        }
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "admin" => Ok(Role::Admin),
            "prompt_admin" => Ok(Role::PromptAdmin),
            "member" => Ok(Role::Member),
            other => Err(format!(
                "unknown role '{}' (expected admin, prompt_admin or member)",
                other
            )),
        }
    }
}

/// Public metadata of an account.
///
/// Unknown fields are preserved so that partial updates can merge into
/// whatever the provider already stores.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PublicMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<Role>,
    #[serde(rename = "isApproved", default, skip_serializing_if = "Option::is_none")]
    pub is_approved: Option<bool>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl PublicMetadata {
    pub fn is_admin(&self) -> bool {
        self.role == Some(Role::Admin)
    }

    pub fn is_approved(&self) -> bool {
        self.is_approved == Some(true)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmailAddress {
    pub id: String,
    pub email_address: String,
}

/// Account record of the identity provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub email_addresses: Vec<EmailAddress>,
    #[serde(default)]
    pub primary_email_address_id: Option<String>,
    /// Milliseconds since the Unix epoch.
    #[serde(default)]
    pub created_at: i64,
    #[serde(default)]
    pub public_metadata: PublicMetadata,
}

impl User {
    /// The primary email, falling back to the first one on record.
    pub fn primary_email(&self) -> Option<&str> {
        self.primary_email_address_id
            .as_deref()
            .and_then(|id| self.email_addresses.iter().find(|e| e.id == id))
            .or_else(|| self.email_addresses.first())
            .map(|e| e.email_address.as_str())
    }

    pub fn display_name(&self) -> String {
        let parts: Vec<&str> = [self.first_name.as_deref(), self.last_name.as_deref()]
            .into_iter()
            .flatten()
            .filter(|s| !s.is_empty())
            .collect();
        if parts.is_empty() {
            self.id.clone()
        } else {
            parts.join(" ")
        }
    }

    pub fn created(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp_millis(self.created_at)
    }
}

/// Condensed account listing used by the administration views.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UserSummary {
    pub id: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email_address: String,
    pub created_at: i64,
    pub role: Option<Role>,
    pub is_approved: bool,
}

impl From<&User> for UserSummary {
    fn from(user: &User) -> Self {
        Self {
            id: user.id.clone(),
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
            email_address: user
                .email_addresses
                .first()
                .map(|e| e.email_address.clone())
                .unwrap_or_default(),
            created_at: user.created_at,
            role: user.public_metadata.role,
            is_approved: user.public_metadata.is_approved(),
        }
    }
}

/// Metadata about an analysis report.
#[derive(Debug, Clone, Serialize)]
pub struct ReportMetadata {
    /// Display names of the analyzed documents.
    pub files: Vec<String>,
    pub document_types: Vec<DocumentType>,
    pub analysis_date: DateTime<Utc>,
    pub api_url: String,
    /// Stored document ID reported by each finished category.
    pub document_ids: BTreeMap<Category, i64>,
    pub categories_finished: Vec<Category>,
    pub categories_failed: Vec<Category>,
    pub total_indicators: usize,
    pub duration_seconds: f64,
}

/// The complete analysis report.
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisReport {
    pub metadata: ReportMetadata,
    /// Sum of the finished categories' partial indices.
    pub spdi_index: f64,
    pub indicators: Vec<IndicatorEntry>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<PartialResultsWarning>,
}
