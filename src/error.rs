//! Error taxonomy shared by the API clients and the analysis pipeline.

use crate::analysis::CategoryStatus;
use crate::models::{Category, CategoryFailure};
use thiserror::Error;

/// Failure of a single HTTP exchange with an external service.
#[derive(Debug, Error)]
pub enum RequestError {
    #[error("{endpoint} returned HTTP {status}: {body}")]
    Status {
        endpoint: String,
        status: u16,
        body: String,
    },

    #[error("request to {endpoint} timed out")]
    Timeout { endpoint: String },

    #[error("cannot reach {endpoint}: {message}")]
    Network { endpoint: String, message: String },

    #[error("unexpected response from {endpoint}: {message}")]
    Decode { endpoint: String, message: String },

    #[error("invalid service URL: {url}")]
    InvalidUrl { url: String },

    #[error("request cancelled")]
    Cancelled,
}

impl RequestError {
    /// Map a transport error from reqwest.
    pub fn from_reqwest(endpoint: &str, err: reqwest::Error) -> Self {
        let endpoint = endpoint.to_string();
        if err.is_timeout() {
            RequestError::Timeout { endpoint }
        } else if err.is_decode() {
            RequestError::Decode {
                endpoint,
                message: err.to_string(),
            }
        } else {
            RequestError::Network {
                endpoint,
                message: err.to_string(),
            }
        }
    }

    /// Whether another attempt may succeed.
    ///
    /// Gateway and server errors (500, 502, 503, 504), timeouts, network
    /// failures and any error whose text reports a timeout are retryable.
    pub fn is_retryable(&self) -> bool {
        match self {
            RequestError::Status { status, body, .. } => {
                matches!(status, 500 | 502 | 503 | 504) || mentions_timeout(body)
            }
            RequestError::Timeout { .. } | RequestError::Network { .. } => true,
            RequestError::Decode { message, .. } => mentions_timeout(message),
            RequestError::InvalidUrl { .. } | RequestError::Cancelled => false,
        }
    }

    /// HTTP status, when a response was received.
    pub fn status(&self) -> Option<u16> {
        match self {
            RequestError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

fn mentions_timeout(text: &str) -> bool {
    let lower = text.to_lowercase();
    lower.contains("timeout") || lower.contains("timed out")
}

/// Failure of an analysis run as a whole.
#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("no documents to analyze")]
    NoFiles,

    #[error("upload of file #{} ({file_name}) failed: {reason}", .file_index + 1)]
    UploadFailure {
        /// 0-based position of the file in the submitted list.
        file_index: usize,
        file_name: String,
        status: Option<u16>,
        reason: String,
    },

    #[error("all categories failed")]
    AnalysisFailure { failures: Vec<CategoryFailure> },
}

/// Rejected category state change.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("category {category} cannot move from {from} to {to}")]
pub struct TransitionError {
    pub category: Category,
    pub from: CategoryStatus,
    pub to: CategoryStatus,
}

/// Failure of an administrative operation.
#[derive(Debug, Error)]
pub enum AdminError {
    #[error("not signed in: no acting user configured")]
    Unauthorized,

    #[error("user {0} is not an admin")]
    Forbidden(String),

    #[error("user ID is required")]
    MissingUserId,

    #[error(transparent)]
    Request(#[from] RequestError),
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status(code: u16, body: &str) -> RequestError {
        RequestError::Status {
            endpoint: "evaluate".to_string(),
            status: code,
            body: body.to_string(),
        }
    }

    #[test]
    fn test_server_errors_are_retryable() {
        for code in [500, 502, 503, 504] {
            assert!(status(code, "").is_retryable(), "{} should retry", code);
        }
        assert!(!status(501, "").is_retryable());
    }

    #[test]
    fn test_client_errors_are_not_retryable() {
        assert!(!status(400, "invalid gri_type").is_retryable());
        assert!(!status(404, "").is_retryable());
        assert!(!RequestError::Cancelled.is_retryable());
    }

    #[test]
    fn test_timeout_text_is_retryable() {
        assert!(status(400, "Upstream Timeout while scoring").is_retryable());
        assert!(RequestError::Decode {
            endpoint: "evaluate".to_string(),
            message: "model call timed out".to_string(),
        }
        .is_retryable());
        assert!(RequestError::Timeout {
            endpoint: "evaluate".to_string()
        }
        .is_retryable());
        assert!(RequestError::Network {
            endpoint: "evaluate".to_string(),
            message: "connection refused".to_string()
        }
        .is_retryable());
    }

    #[test]
    fn test_upload_failure_message_is_one_based() {
        let err = AnalysisError::UploadFailure {
            file_index: 0,
            file_name: "report.pdf".to_string(),
            status: Some(413),
            reason: "HTTP 413".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "upload of file #1 (report.pdf) failed: HTTP 413"
        );
    }
}
