//! Category fan-out.
//!
//! One evaluation request per category is started at once; each is wrapped
//! by the retry policy and resolves independently, so a category that is
//! backing off never holds back the others.

use crate::api::RetryPolicy;
use crate::error::{AnalysisError, RequestError};
use crate::models::{Category, CategoryResult, EvaluateResponse, EvaluationRequest, UploadReference};
use async_trait::async_trait;
use futures::future::BoxFuture;
use futures::stream::FuturesUnordered;
use futures::FutureExt;
use std::path::Path;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Turns a local file into an upload reference.
#[async_trait]
pub trait Uploader: Send + Sync {
    async fn upload(&self, path: &Path, file_index: usize) -> Result<UploadReference, AnalysisError>;
}

/// Scores one category of an evaluation request.
#[async_trait]
pub trait CategoryEvaluator: Send + Sync {
    async fn evaluate(
        &self,
        request: &EvaluationRequest,
        category: Category,
    ) -> Result<EvaluateResponse, RequestError>;
}

/// Final result of one category, after any retries.
#[derive(Debug)]
pub struct CategoryOutcome {
    pub category: Category,
    pub result: Result<CategoryResult, RequestError>,
}

/// Category outcomes in settlement order.
pub type OutcomeStream = FuturesUnordered<BoxFuture<'static, CategoryOutcome>>;

/// Issues one retried evaluation per configured category.
pub struct Dispatcher<E> {
    evaluator: Arc<E>,
    retry: RetryPolicy,
    categories: Vec<Category>,
}

impl<E> Dispatcher<E>
where
    E: CategoryEvaluator + 'static,
{
    pub fn new(evaluator: Arc<E>, retry: RetryPolicy, categories: Vec<Category>) -> Self {
        Self {
            evaluator,
            retry,
            categories,
        }
    }

    pub fn categories(&self) -> &[Category] {
        &self.categories
    }

    /// Start every category and return their outcomes as they settle.
    ///
    /// Each category yields exactly one outcome. Dropping the stream
    /// abandons whatever is still in flight.
    pub fn dispatch(
        &self,
        request: Arc<EvaluationRequest>,
        cancel: &CancellationToken,
    ) -> OutcomeStream {
        info!(
            "Dispatching {} categories to {}",
            self.categories.len(),
            request.endpoint()
        );

        self.categories
            .iter()
            .map(|&category| {
                let evaluator = Arc::clone(&self.evaluator);
                let request = Arc::clone(&request);
                let retry = self.retry.clone();
                let cancel = cancel.clone();

                async move {
                    let label = format!("evaluate {}", category);
                    let result = retry
                        .run(&label, &cancel, |attempt| {
                            let evaluator = Arc::clone(&evaluator);
                            let request = Arc::clone(&request);
                            async move {
                                debug!("{}: attempt {}", category, attempt);
                                evaluator.evaluate(&request, category).await
                            }
                        })
                        .await
                        .map(|response| CategoryResult::from_response(category, response));

                    CategoryOutcome { category, result }
                }
                .boxed()
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{DocumentType, Indicator, Summary};
    use futures::StreamExt;
    use std::collections::BTreeMap;
    use std::sync::Mutex;
    use std::time::Duration;

    /// Answers each category after a fixed delay, failing the listed ones.
    struct ScriptedEvaluator {
        delays: BTreeMap<Category, u64>,
        failing: Vec<Category>,
        calls: Mutex<Vec<Category>>,
    }

    #[async_trait]
    impl CategoryEvaluator for ScriptedEvaluator {
        async fn evaluate(
            &self,
            _request: &EvaluationRequest,
            category: Category,
        ) -> Result<EvaluateResponse, RequestError> {
            self.calls.lock().unwrap().push(category);
            let delay = self.delays.get(&category).copied().unwrap_or(0);
            tokio::time::sleep(Duration::from_millis(delay)).await;

            if self.failing.contains(&category) {
                return Err(RequestError::Status {
                    endpoint: "evaluate".to_string(),
                    status: 422,
                    body: "unprocessable".to_string(),
                });
            }

            let mut indicators = BTreeMap::new();
            indicators.insert(
                format!("{}-1", category),
                Indicator {
                    score: 2,
                    reasoning: "ok".to_string(),
                    title: String::new(),
                    indicator_type: category.to_string(),
                    sub_type: String::new(),
                    description: String::new(),
                },
            );
            Ok(EvaluateResponse {
                id: Some(1),
                indicators,
                summary: Summary {
                    spdi_index: Some(10.0),
                    ..Summary::default()
                },
                token_usage: None,
            })
        }
    }

    fn request() -> Arc<EvaluationRequest> {
        let reference = UploadReference {
            object_key: "uploads/a.pdf".to_string(),
            display_name: "a.pdf".to_string(),
        };
        Arc::new(EvaluationRequest::new(&[reference], &[DocumentType::SustainabilityReport]).unwrap())
    }

    #[tokio::test(start_paused = true)]
    async fn test_outcomes_arrive_in_settlement_order() {
        let evaluator = Arc::new(ScriptedEvaluator {
            delays: [
                (Category::Governance, 400),
                (Category::Economic, 100),
                (Category::Social, 300),
                (Category::Environmental, 200),
            ]
            .into_iter()
            .collect(),
            failing: vec![],
            calls: Mutex::new(vec![]),
        });
        let dispatcher = Dispatcher::new(
            Arc::clone(&evaluator),
            RetryPolicy::default(),
            Category::ALL.to_vec(),
        );

        let order: Vec<Category> = dispatcher
            .dispatch(request(), &CancellationToken::new())
            .map(|outcome| outcome.category)
            .collect()
            .await;

        assert_eq!(
            order,
            vec![
                Category::Economic,
                Category::Environmental,
                Category::Social,
                Category::Governance
            ]
        );
        assert_eq!(evaluator.calls.lock().unwrap().len(), 4);
    }

    #[tokio::test]
    async fn test_each_category_yields_exactly_one_outcome() {
        let evaluator = Arc::new(ScriptedEvaluator {
            delays: BTreeMap::new(),
            failing: vec![Category::Social],
            calls: Mutex::new(vec![]),
        });
        let dispatcher = Dispatcher::new(evaluator, RetryPolicy::default(), Category::ALL.to_vec());

        let outcomes: Vec<CategoryOutcome> = dispatcher
            .dispatch(request(), &CancellationToken::new())
            .collect()
            .await;

        assert_eq!(outcomes.len(), 4);
        for category in Category::ALL {
            let matching: Vec<_> = outcomes.iter().filter(|o| o.category == category).collect();
            assert_eq!(matching.len(), 1);
            assert_eq!(matching[0].result.is_err(), category == Category::Social);
        }
    }

    #[tokio::test]
    async fn test_dispatches_only_configured_categories() {
        let evaluator = Arc::new(ScriptedEvaluator {
            delays: BTreeMap::new(),
            failing: vec![],
            calls: Mutex::new(vec![]),
        });
        let dispatcher = Dispatcher::new(
            Arc::clone(&evaluator),
            RetryPolicy::default(),
            vec![Category::Environmental],
        );

        let outcomes: Vec<CategoryOutcome> = dispatcher
            .dispatch(request(), &CancellationToken::new())
            .collect()
            .await;

        assert_eq!(outcomes.len(), 1);
        assert_eq!(dispatcher.categories(), &[Category::Environmental]);
        assert_eq!(*evaluator.calls.lock().unwrap(), vec![Category::Environmental]);
    }
}
