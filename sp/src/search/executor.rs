//! Collaborator traits consumed by the prefetch coordinator

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use super::{SearchError, SearchRequest};
use crate::domain::SearchResult;

/// Runs a search against the remote providers
///
/// Implementations must observe `cancel` and return [`SearchError::Cancelled`]
/// promptly once it fires. The coordinator also races the call against the
/// token, so a slow implementation only wastes its own work.
#[async_trait]
pub trait SearchExecutor: Send + Sync {
    async fn search(&self, request: SearchRequest, cancel: CancellationToken) -> Result<Vec<SearchResult>, SearchError>;
}

/// Best-effort recent-sales metric used to enrich results
///
/// Errors are absorbed by the implementation (returning 0 or a fallback);
/// the coordinator never sees them.
#[async_trait]
pub trait SalesLookup: Send + Sync {
    /// Reservations for the named accommodation over the last 30 days
    async fn monthly_sales(&self, name: &str) -> u64;
}

#[cfg(test)]
pub mod mock {
    use super::*;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::time::Duration;
    use tracing::debug;

    use crate::domain::ResultKind;

    /// Mock executor returning one result per destination after a fixed latency
    pub struct MockSearchExecutor {
        latency: Duration,
        fail: AtomicBool,
        call_count: AtomicUsize,
        requests: Mutex<Vec<SearchRequest>>,
    }

    impl MockSearchExecutor {
        pub fn new(latency: Duration) -> Self {
            debug!(?latency, "MockSearchExecutor::new: called");
            Self {
                latency,
                fail: AtomicBool::new(false),
                call_count: AtomicUsize::new(0),
                requests: Mutex::new(Vec::new()),
            }
        }

        /// Make subsequent searches fail with a provider error
        pub fn set_failing(&self, fail: bool) {
            self.fail.store(fail, Ordering::SeqCst);
        }

        pub fn call_count(&self) -> usize {
            self.call_count.load(Ordering::SeqCst)
        }

        pub fn last_request(&self) -> Option<SearchRequest> {
            self.requests.lock().unwrap().last().cloned()
        }
    }

    #[async_trait]
    impl SearchExecutor for MockSearchExecutor {
        async fn search(
            &self,
            request: SearchRequest,
            cancel: CancellationToken,
        ) -> Result<Vec<SearchResult>, SearchError> {
            self.call_count.fetch_add(1, Ordering::SeqCst);
            self.requests.lock().unwrap().push(request.clone());

            tokio::select! {
                _ = cancel.cancelled() => return Err(SearchError::Cancelled),
                _ = tokio::time::sleep(self.latency) => {}
            }

            if self.fail.load(Ordering::SeqCst) {
                return Err(SearchError::Provider {
                    provider: "mock".to_string(),
                    message: "upstream unavailable".to_string(),
                });
            }

            Ok(request
                .destinations
                .iter()
                .map(|d| SearchResult {
                    provider: "mock".to_string(),
                    kind: ResultKind::Hotel,
                    id: format!("r-{}", d.id),
                    name: format!("Hotel {}", d.id),
                    location: d.name.clone(),
                    price: 100.0,
                    currency: request.currency.clone(),
                    stars: None,
                    meal_plan: None,
                    images: vec![],
                    description: None,
                    original_data: serde_json::Value::Null,
                })
                .collect())
        }
    }

    /// Mock sales lookup returning the name length after a fixed latency
    pub struct MockSalesLookup {
        latency: Duration,
        call_count: AtomicUsize,
    }

    impl MockSalesLookup {
        pub fn new(latency: Duration) -> Self {
            Self {
                latency,
                call_count: AtomicUsize::new(0),
            }
        }

        pub fn call_count(&self) -> usize {
            self.call_count.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl SalesLookup for MockSalesLookup {
        async fn monthly_sales(&self, name: &str) -> u64 {
            self.call_count.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(self.latency).await;
            name.len() as u64
        }
    }
}
