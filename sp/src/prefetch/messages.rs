//! Message types for the prefetch coordinator

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::sync::oneshot;
use uuid::Uuid;

use super::subscriber::Subscriber;
use crate::domain::{EnrichedResult, SearchParams, SearchResult};
use crate::search::SearchError;

/// Events delivered to channel subscribers
#[derive(Debug, Clone)]
pub enum PrefetchEvent {
    /// A fetch began
    Started,

    /// A fetch and its enrichment finished while still authoritative
    Completed { results: Arc<[EnrichedResult]>, key: String },

    /// The authoritative operation reached a terminal state
    Ended,
}

/// Internal requests to the coordinator task
pub(crate) enum PrefetchRequest {
    /// Debounced request to prefetch `params`
    Schedule {
        params: SearchParams,
        debounce: Option<Duration>,
    },

    /// Drop the armed timer and abort in-flight work
    Cancel,

    /// Register (or replace) a subscriber under `id`
    Subscribe {
        id: String,
        token: Uuid,
        subscriber: Subscriber,
    },

    /// Remove `id` if `token` still identifies its registration
    Unsubscribe { id: String, token: Uuid },

    /// The debounce timer armed with `ticket` fired (internal)
    DebounceElapsed { ticket: u64 },

    /// The primary fetch for `key` resolved (internal)
    FetchSettled {
        key: String,
        outcome: Result<Vec<SearchResult>, SearchError>,
    },

    /// Enrichment for `key` resolved; `None` if it was cancelled (internal)
    EnrichmentSettled {
        key: String,
        results: Option<Vec<EnrichedResult>>,
    },

    /// Get the current bookkeeping state
    Snapshot {
        reply_tx: oneshot::Sender<CoordinatorSnapshot>,
    },

    /// Get current metrics
    GetMetrics {
        reply_tx: oneshot::Sender<PrefetchMetrics>,
    },

    /// Shutdown the coordinator
    Shutdown,
}

/// Point-in-time view of the coordinator's bookkeeping
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CoordinatorSnapshot {
    /// Last key whose fetch and enrichment completed un-superseded
    pub current_key: String,
    /// Key currently executing, empty when idle
    pub fetching_key: String,
    pub debounce_armed: bool,
    pub in_flight: bool,
    pub subscriber_count: usize,
}

/// Coordinator metrics for observability
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PrefetchMetrics {
    pub schedules_received: u64,
    pub schedules_rejected: u64,
    pub schedules_deduplicated: u64,
    pub debounces_armed: u64,
    pub debounces_superseded: u64,
    pub fetches_started: u64,
    pub fetches_completed: u64,
    pub fetches_failed: u64,
    pub fetches_cancelled: u64,
    pub manual_cancels: u64,
    pub superseded_discards: u64,
}
