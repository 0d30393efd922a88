//! Main prefetch coordinator task implementation

use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::config::PrefetchConfig;
use super::handle::PrefetchHandle;
use super::key::build_key;
use super::messages::{CoordinatorSnapshot, PrefetchMetrics, PrefetchRequest};
use super::subscriber::SubscriberRegistry;
use crate::domain::{EnrichedResult, SearchParams, SearchResult};
use crate::search::{SalesLookup, SearchError, SearchExecutor, SearchRequest};

/// A timer waiting to hand the latest request to the execution stage
struct PendingDebounce {
    ticket: u64,
    request: SearchRequest,
    key: String,
    timer: JoinHandle<()>,
}

/// The prefetch coordinator owns all prefetch bookkeeping
///
/// Construct exactly one per process, spawn [`run`](Self::run) (or use
/// [`spawn`](Self::spawn)) and pass the resulting [`PrefetchHandle`] to every
/// UI surface. All state transitions happen on this task, one request at a
/// time: timer fires, fetch resolutions and enrichment resolutions are posted
/// back into the mailbox instead of touching state from other tasks.
///
/// The coordinator only keeps a weak reference to its own mailbox, so the
/// task also stops once every [`PrefetchHandle`] is dropped. Work still armed
/// or in flight at that point is abandoned.
pub struct PrefetchCoordinator {
    config: PrefetchConfig,
    executor: Arc<dyn SearchExecutor>,
    lookup: Arc<dyn SalesLookup>,
    tx: mpsc::WeakUnboundedSender<PrefetchRequest>,
    rx: mpsc::UnboundedReceiver<PrefetchRequest>,

    current_key: String,
    fetching_key: String,
    debounce: Option<PendingDebounce>,
    cancel_token: Option<CancellationToken>,
    next_ticket: u64,
    registry: SubscriberRegistry,
    metrics: PrefetchMetrics,
}

impl PrefetchCoordinator {
    /// Create a new coordinator and the first handle to it
    pub fn new(
        config: PrefetchConfig,
        executor: Arc<dyn SearchExecutor>,
        lookup: Arc<dyn SalesLookup>,
    ) -> (Self, PrefetchHandle) {
        let (tx, rx) = mpsc::unbounded_channel();
        let coordinator = Self {
            config,
            executor,
            lookup,
            tx: tx.downgrade(),
            rx,
            current_key: String::new(),
            fetching_key: String::new(),
            debounce: None,
            cancel_token: None,
            next_ticket: 0,
            registry: SubscriberRegistry::default(),
            metrics: PrefetchMetrics::default(),
        };
        (coordinator, PrefetchHandle::new(tx))
    }

    /// Create the coordinator, spawn its task and return the shared handle
    pub fn spawn(config: PrefetchConfig, executor: Arc<dyn SearchExecutor>, lookup: Arc<dyn SalesLookup>) -> PrefetchHandle {
        let (coordinator, handle) = Self::new(config, executor, lookup);
        tokio::spawn(coordinator.run());
        handle
    }

    /// Mailbox sender for a spawned stage; `None` once every handle is gone
    fn sender(&self) -> Option<mpsc::UnboundedSender<PrefetchRequest>> {
        self.tx.upgrade()
    }

    /// Run the coordinator task
    ///
    /// This consumes the coordinator and runs until shutdown is requested or
    /// every handle has been dropped.
    pub async fn run(mut self) {
        info!(debounce_ms = self.config.debounce_ms, "Prefetch coordinator started");

        while let Some(req) = self.rx.recv().await {
            match req {
                PrefetchRequest::Schedule { params, debounce } => {
                    let debounce = debounce.unwrap_or_else(|| self.config.debounce());
                    self.schedule(params, debounce);
                }

                PrefetchRequest::Cancel => self.cancel(),

                PrefetchRequest::Subscribe { id, token, subscriber } => {
                    debug!(%id, "Subscribing");
                    self.registry.insert(id, token, subscriber);
                }

                PrefetchRequest::Unsubscribe { id, token } => {
                    let removed = self.registry.remove(&id, token);
                    debug!(%id, removed, "Unsubscribing");
                }

                PrefetchRequest::DebounceElapsed { ticket } => self.debounce_elapsed(ticket),

                PrefetchRequest::FetchSettled { key, outcome } => self.fetch_settled(key, outcome),

                PrefetchRequest::EnrichmentSettled { key, results } => self.enrichment_settled(key, results),

                PrefetchRequest::Snapshot { reply_tx } => {
                    let _ = reply_tx.send(self.snapshot());
                }

                PrefetchRequest::GetMetrics { reply_tx } => {
                    let _ = reply_tx.send(self.metrics.clone());
                }

                PrefetchRequest::Shutdown => {
                    info!("Prefetch coordinator shutting down");
                    self.cancel();
                    break;
                }
            }
        }

        info!("Prefetch coordinator stopped");
    }

    fn snapshot(&self) -> CoordinatorSnapshot {
        CoordinatorSnapshot {
            current_key: self.current_key.clone(),
            fetching_key: self.fetching_key.clone(),
            debounce_armed: self.debounce.is_some(),
            in_flight: self.cancel_token.is_some(),
            subscriber_count: self.registry.len(),
        }
    }

    fn schedule(&mut self, params: SearchParams, debounce: Duration) {
        self.metrics.schedules_received += 1;

        let request = match SearchRequest::build(&params, &self.config) {
            Ok(request) => request,
            Err(reason) => {
                debug!(%reason, "Schedule rejected");
                self.metrics.schedules_rejected += 1;
                return;
            }
        };

        let key = build_key(&params);

        if key == self.current_key && self.fetching_key.is_empty() {
            debug!("Schedule skipped: key already fetched");
            self.metrics.schedules_deduplicated += 1;
            return;
        }

        if key == self.fetching_key {
            debug!("Schedule skipped: key already in flight");
            self.metrics.schedules_deduplicated += 1;
            return;
        }

        let Some(tx) = self.sender() else {
            debug!("Schedule dropped: no handles left");
            return;
        };

        if let Some(pending) = self.debounce.take() {
            pending.timer.abort();
            self.metrics.debounces_superseded += 1;
        }

        let ticket = self.next_ticket;
        self.next_ticket += 1;

        let timer = tokio::spawn(async move {
            tokio::time::sleep(debounce).await;
            let _ = tx.send(PrefetchRequest::DebounceElapsed { ticket });
        });

        debug!(ticket, ?debounce, "Debounce armed");
        self.metrics.debounces_armed += 1;
        self.debounce = Some(PendingDebounce {
            ticket,
            request,
            key,
            timer,
        });
    }

    fn debounce_elapsed(&mut self, ticket: u64) {
        // A fire queued just before its timer was cleared carries an old ticket
        match self.debounce.take() {
            Some(pending) if pending.ticket == ticket => self.execute(pending.request, pending.key),
            other => {
                debug!(ticket, "Stale debounce fire ignored");
                self.debounce = other;
            }
        }
    }

    fn execute(&mut self, request: SearchRequest, key: String) {
        if self.fetching_key == key {
            debug!("Already fetching key, skipping duplicate");
            return;
        }

        let Some(tx) = self.sender() else {
            debug!("Fetch dropped: no handles left");
            return;
        };

        if let Some(previous) = self.cancel_token.take() {
            previous.cancel();
        }
        let token = CancellationToken::new();
        self.cancel_token = Some(token.clone());

        self.fetching_key = key.clone();
        self.metrics.fetches_started += 1;
        self.registry.notify_start();

        info!(key = %truncate(&key), "Starting prefetch");

        let executor = Arc::clone(&self.executor);
        tokio::spawn(async move {
            let outcome = tokio::select! {
                _ = token.cancelled() => Err(SearchError::Cancelled),
                outcome = executor.search(request, token.clone()) => outcome,
            };
            let _ = tx.send(PrefetchRequest::FetchSettled { key, outcome });
        });
    }

    fn fetch_settled(&mut self, key: String, outcome: Result<Vec<SearchResult>, SearchError>) {
        match outcome {
            Ok(results) => {
                if self.fetching_key != key {
                    debug!("Result superseded, discarding");
                    self.metrics.superseded_discards += 1;
                    return;
                }
                self.enrich(key, results);
            }

            Err(err) if err.is_cancelled() => {
                debug!("Fetch aborted");
                self.metrics.fetches_cancelled += 1;
                self.finish(&key);
            }

            Err(err) => {
                warn!(key = %truncate(&key), error = %err, "Prefetch failed");
                self.metrics.fetches_failed += 1;
                // Forget the cached key so the next identical schedule retries
                if self.fetching_key == key {
                    self.current_key.clear();
                }
                self.finish(&key);
            }
        }
    }

    fn enrich(&mut self, key: String, results: Vec<SearchResult>) {
        let (Some(token), Some(tx)) = (self.cancel_token.clone(), self.sender()) else {
            debug!("Enrichment skipped");
            self.finish(&key);
            return;
        };

        debug!(count = results.len(), "Enriching results");

        let lookup = Arc::clone(&self.lookup);
        let concurrency = self.config.lookup_concurrency();
        tokio::spawn(async move {
            let enrichment = futures::stream::iter(results)
                .map(|result| {
                    let lookup = Arc::clone(&lookup);
                    async move {
                        let sales_count = lookup.monthly_sales(&result.name).await;
                        EnrichedResult { result, sales_count }
                    }
                })
                .buffered(concurrency)
                .collect::<Vec<_>>();

            let results = tokio::select! {
                _ = token.cancelled() => None,
                enriched = enrichment => Some(enriched),
            };
            let _ = tx.send(PrefetchRequest::EnrichmentSettled { key, results });
        });
    }

    fn enrichment_settled(&mut self, key: String, results: Option<Vec<EnrichedResult>>) {
        if self.fetching_key != key {
            debug!("Enrichment superseded, discarding");
            self.metrics.superseded_discards += 1;
            return;
        }

        match results {
            Some(results) => {
                self.current_key = key.clone();
                self.metrics.fetches_completed += 1;
                info!(count = results.len(), "Prefetch complete");
                self.registry.notify_complete(results.into(), &key);
            }
            None => {
                debug!("Enrichment aborted");
                self.metrics.fetches_cancelled += 1;
            }
        }

        self.finish(&key);
    }

    /// Terminal path for `key`; only the authoritative operation resets state
    fn finish(&mut self, key: &str) {
        if self.fetching_key == key {
            self.fetching_key.clear();
            self.cancel_token = None;
            self.registry.notify_end();
        }
    }

    fn cancel(&mut self) {
        if let Some(pending) = self.debounce.take() {
            debug!(ticket = pending.ticket, "Clearing armed debounce");
            pending.timer.abort();
        }

        if let Some(token) = self.cancel_token.take() {
            token.cancel();
        }

        if !self.fetching_key.is_empty() {
            debug!(key = %truncate(&self.fetching_key), "Cancelling in-flight prefetch");
            self.fetching_key.clear();
            self.metrics.manual_cancels += 1;
            self.registry.notify_end();
        }
    }
}

fn truncate(key: &str) -> &str {
    match key.char_indices().nth(60) {
        Some((idx, _)) => &key[..idx],
        None => key,
    }
}
