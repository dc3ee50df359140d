//! HTTP client for the ESG scoring API.

use crate::analysis::{CategoryEvaluator, Uploader};
use crate::error::{AnalysisError, RequestError};
use crate::models::{
    Category, DocumentDetail, DocumentPage, EvaluateResponse, EvaluationRequest, HistoryQuery,
    IndicatorUpdate, IndicatorUpdateResponse, PdfLink, UploadReference, UploadResponse,
};
use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::{Response, Url};
use serde::de::DeserializeOwned;
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info};

/// Client for the scoring service.
#[derive(Debug, Clone)]
pub struct EsgApiClient {
    base_url: Url,
    http: reqwest::Client,
}

impl EsgApiClient {
    /// Create a client for `base_url`.
    ///
    /// `timeout` bounds each request; `None` leaves requests unbounded.
    pub fn new(base_url: &str, timeout: Option<Duration>) -> Result<Self, RequestError> {
        let base_url = Url::parse(base_url).map_err(|_| RequestError::InvalidUrl {
            url: base_url.to_string(),
        })?;
        if base_url.cannot_be_a_base() {
            return Err(RequestError::InvalidUrl {
                url: base_url.to_string(),
            });
        }

        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let http = builder
            .build()
            .map_err(|e| RequestError::from_reqwest(base_url.as_str(), e))?;

        Ok(Self { base_url, http })
    }

    pub fn base_url(&self) -> &str {
        self.base_url.as_str()
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url, RequestError> {
        join_segments(&self.base_url, segments)
    }

    /// Upload one document and return its object-storage reference.
    ///
    /// Upload failures are terminal for the file and never retried.
    pub async fn upload_file(
        &self,
        path: &Path,
        file_index: usize,
    ) -> Result<UploadReference, AnalysisError> {
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| path.display().to_string());

        let failure = |status: Option<u16>, reason: String| AnalysisError::UploadFailure {
            file_index,
            file_name: file_name.clone(),
            status,
            reason,
        };

        let bytes = tokio::fs::read(path)
            .await
            .map_err(|e| failure(None, format!("cannot read {}: {}", path.display(), e)))?;
        debug!("Uploading {} ({} bytes)", file_name, bytes.len());

        let part = Part::bytes(bytes)
            .file_name(file_name.clone())
            .mime_str(mime_for(path))
            .map_err(|e| failure(None, e.to_string()))?;
        let form = Form::new().part("file", part);

        let url = self
            .endpoint(&["upload"])
            .map_err(|e| failure(None, e.to_string()))?;
        let response = self
            .http
            .post(url)
            .multipart(form)
            .send()
            .await
            .map_err(|e| failure(None, RequestError::from_reqwest("upload", e).to_string()))?;

        let uploaded: UploadResponse = decode("upload", response)
            .await
            .map_err(|e| failure(e.status(), e.to_string()))?;

        info!("Uploaded {} as {}", file_name, uploaded.s3_object_key);
        Ok(UploadReference {
            object_key: uploaded.s3_object_key,
            display_name: file_name,
        })
    }

    /// Score one category of an uploaded document set.
    pub async fn evaluate_category(
        &self,
        request: &EvaluationRequest,
        category: Category,
    ) -> Result<EvaluateResponse, RequestError> {
        let endpoint = request.endpoint();
        let url = self.endpoint(&[endpoint])?;

        let response = self
            .http
            .post(url)
            .query(&[
                ("gri_type", category.as_str()),
                ("document_type", request.document_type.as_str()),
            ])
            .json(&request.body)
            .send()
            .await
            .map_err(|e| RequestError::from_reqwest(endpoint, e))?;

        decode(endpoint, response).await
    }

    /// Fetch one page of document history.
    pub async fn list_documents(&self, query: &HistoryQuery) -> Result<DocumentPage, RequestError> {
        let url = self.endpoint(&["documents"])?;
        let response = self
            .http
            .get(url)
            .query(&query.to_query_pairs())
            .send()
            .await
            .map_err(|e| RequestError::from_reqwest("documents", e))?;

        decode("documents", response).await
    }

    /// Fetch a stored document with its indicators.
    pub async fn get_document(&self, id: i64) -> Result<DocumentDetail, RequestError> {
        let id = id.to_string();
        let url = self.endpoint(&["documents", &id])?;
        let response = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|e| RequestError::from_reqwest("documents/{id}", e))?;

        decode("documents/{id}", response).await
    }

    /// Fetch the download URL of a stored source file.
    pub async fn pdf_url(&self, id: i64) -> Result<String, RequestError> {
        let id = id.to_string();
        let url = self.endpoint(&["documents", &id, "pdf"])?;
        let response = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|e| RequestError::from_reqwest("documents/{id}/pdf", e))?;

        let link: PdfLink = decode("documents/{id}/pdf", response).await?;
        Ok(link.url)
    }

    /// Overwrite an indicator's score and reasoning.
    pub async fn update_indicator(
        &self,
        id: i64,
        key: &str,
        update: &IndicatorUpdate,
    ) -> Result<IndicatorUpdateResponse, RequestError> {
        let id = id.to_string();
        let url = self.endpoint(&["documents", &id, "indicator", key])?;
        let response = self
            .http
            .patch(url)
            .json(update)
            .send()
            .await
            .map_err(|e| RequestError::from_reqwest("documents/{id}/indicator", e))?;

        decode("documents/{id}/indicator", response).await
    }
}

#[async_trait]
impl Uploader for EsgApiClient {
    async fn upload(&self, path: &Path, file_index: usize) -> Result<UploadReference, AnalysisError> {
        self.upload_file(path, file_index).await
    }
}

#[async_trait]
impl CategoryEvaluator for EsgApiClient {
    async fn evaluate(
        &self,
        request: &EvaluationRequest,
        category: Category,
    ) -> Result<EvaluateResponse, RequestError> {
        self.evaluate_category(request, category).await
    }
}

/// Build `base/segment/...`, escaping each segment.
pub(crate) fn join_segments(base: &Url, segments: &[&str]) -> Result<Url, RequestError> {
    let mut url = base.clone();
    url.path_segments_mut()
        .map_err(|_| RequestError::InvalidUrl {
            url: base.to_string(),
        })?
        .pop_if_empty()
        .extend(segments);
    Ok(url)
}

/// Check the status and parse a JSON body.
pub(crate) async fn decode<T: DeserializeOwned>(
    endpoint: &str,
    response: Response,
) -> Result<T, RequestError> {
    let status = response.status();
    let body = response
        .text()
        .await
        .map_err(|e| RequestError::from_reqwest(endpoint, e))?;

    if !status.is_success() {
        return Err(RequestError::Status {
            endpoint: endpoint.to_string(),
            status: status.as_u16(),
            body,
        });
    }

    serde_json::from_str(&body).map_err(|e| RequestError::Decode {
        endpoint: endpoint.to_string(),
        message: e.to_string(),
    })
}

fn mime_for(path: &Path) -> &'static str {
    match path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())
        .as_deref()
    {
        Some("pdf") => "application/pdf",
        Some("docx") => "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        _ => "application/octet-stream",
    }
}
