//! Analysis orchestration.
//!
//! [`run_analysis`] uploads the documents, fans the evaluation out over the
//! configured categories and merges the results into an
//! [`AggregateState`] as they arrive.

pub mod aggregator;
pub mod dispatcher;

pub use aggregator::*;
pub use dispatcher::{CategoryEvaluator, CategoryOutcome, Dispatcher, OutcomeStream, Uploader};

use crate::api::RetryPolicy;
use crate::error::AnalysisError;
use crate::models::{
    Category, DocumentType, EvaluationRequest, PartialResultsWarning, UploadReference,
};
use futures::StreamExt;
use std::path::PathBuf;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// A local document and the kind of report it is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentInput {
    pub path: PathBuf,
    pub document_type: DocumentType,
}

/// Progress notification emitted while an analysis runs.
#[derive(Debug, Clone, PartialEq)]
pub enum AnalysisEvent {
    Uploaded {
        file_index: usize,
        reference: UploadReference,
    },
    CategoryStarted(Category),
    CategoryFinished {
        category: Category,
        indicators: usize,
        partial_index: f64,
    },
    CategoryFailed {
        category: Category,
        message: String,
    },
}

/// Result of a run in which at least one category finished.
#[derive(Debug, Clone)]
pub struct AnalysisOutcome {
    pub uploads: Vec<UploadReference>,
    pub request: EvaluationRequest,
    pub state: AggregateState,
    /// Present when some categories failed.
    pub warning: Option<PartialResultsWarning>,
}

/// Run a complete analysis.
///
/// Uploads stop at the first failure and no category is evaluated in that
/// case. `on_event` is called after every state change with the event and
/// the updated aggregate.
pub async fn run_analysis<C, F>(
    client: Arc<C>,
    documents: &[DocumentInput],
    retry: RetryPolicy,
    categories: &[Category],
    cancel: CancellationToken,
    mut on_event: F,
) -> Result<AnalysisOutcome, AnalysisError>
where
    C: Uploader + CategoryEvaluator + 'static,
    F: FnMut(&AnalysisEvent, &AggregateState),
{
    if documents.is_empty() {
        return Err(AnalysisError::NoFiles);
    }

    let mut state = AggregateState::new(categories);

    let mut uploads = Vec::with_capacity(documents.len());
    for (file_index, document) in documents.iter().enumerate() {
        let reference = client.upload(&document.path, file_index).await?;
        on_event(
            &AnalysisEvent::Uploaded {
                file_index,
                reference: reference.clone(),
            },
            &state,
        );
        uploads.push(reference);
    }

    let document_types: Vec<DocumentType> = documents.iter().map(|d| d.document_type).collect();
    let request = EvaluationRequest::new(&uploads, &document_types).ok_or(AnalysisError::NoFiles)?;

    let dispatcher = Dispatcher::new(client, retry, state.categories().to_vec());
    state.begin_all();
    for category in dispatcher.categories() {
        on_event(&AnalysisEvent::CategoryStarted(*category), &state);
    }

    let mut outcomes = dispatcher.dispatch(Arc::new(request.clone()), &cancel);
    while let Some(CategoryOutcome { category, result }) = outcomes.next().await {
        let event = match result {
            Ok(result) => {
                let indicators = result.indicators.len();
                let partial_index = result.partial_index;
                if let Err(e) = state.on_category_result(result) {
                    warn!("Ignoring result: {}", e);
                    continue;
                }
                info!(
                    "{} finished: {} indicators, partial index {}",
                    category, indicators, partial_index
                );
                AnalysisEvent::CategoryFinished {
                    category,
                    indicators,
                    partial_index,
                }
            }
            Err(err) => {
                let message = err.to_string();
                if let Err(e) = state.on_category_failed(category, message.clone()) {
                    warn!("Ignoring failure: {}", e);
                    continue;
                }
                warn!("{} failed: {}", category, message);
                AnalysisEvent::CategoryFailed { category, message }
            }
        };
        on_event(&event, &state);
    }

    if state.finished().is_empty() {
        return Err(AnalysisError::AnalysisFailure {
            failures: state.failures().to_vec(),
        });
    }

    let warning = if state.failures().is_empty() {
        None
    } else {
        Some(PartialResultsWarning {
            failures: state.failures().to_vec(),
        })
    };

    Ok(AnalysisOutcome {
        uploads,
        request,
        state,
        warning,
    })
}
