//! In-process executor and sales lookup used by the `sp` binary
//!
//! Results are derived deterministically from the request so replays are
//! reproducible.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use super::{SalesLookup, SearchError, SearchExecutor, SearchRequest};
use crate::domain::{Destination, ResultKind, SearchResult, SearchType};

/// Simulation settings for the demo executor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Time the simulated provider takes to answer
    #[serde(rename = "latency-ms")]
    pub latency_ms: u64,

    /// Time each sales-count lookup takes
    #[serde(rename = "enrichment-latency-ms")]
    pub enrichment_latency_ms: u64,

    /// Offers generated for every destination
    #[serde(rename = "results-per-destination")]
    pub results_per_destination: usize,

    /// Destination ids whose searches fail with a provider error
    #[serde(rename = "failing-destinations")]
    pub failing_destinations: Vec<String>,

    /// Fixed monthly sales per accommodation name
    pub sales: HashMap<String, u64>,

    /// Monthly sales reported for names not in `sales`
    #[serde(rename = "default-sales")]
    pub default_sales: u64,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            latency_ms: 400,
            enrichment_latency_ms: 50,
            results_per_destination: 3,
            failing_destinations: Vec::new(),
            sales: HashMap::new(),
            default_sales: 0,
        }
    }
}

/// Executor that fabricates offers after a fixed latency
pub struct SimulatedExecutor {
    latency: Duration,
    results_per_destination: usize,
    failing: HashSet<String>,
    call_count: AtomicUsize,
}

impl SimulatedExecutor {
    pub fn new(config: &SimulationConfig) -> Self {
        debug!(latency_ms = config.latency_ms, "SimulatedExecutor::new: called");
        Self {
            latency: Duration::from_millis(config.latency_ms),
            results_per_destination: config.results_per_destination,
            failing: config.failing_destinations.iter().cloned().collect(),
            call_count: AtomicUsize::new(0),
        }
    }

    /// Number of searches started so far
    pub fn call_count(&self) -> usize {
        self.call_count.load(Ordering::SeqCst)
    }

    fn offer(&self, request: &SearchRequest, destination: &Destination, index: usize) -> SearchResult {
        let nightly = 70.0 + 12.5 * index as f64;
        let price = nightly * request.nights() as f64 * f64::from(request.total_adults().max(1));
        SearchResult {
            provider: "simulated".to_string(),
            kind: result_kind(request.search_type),
            id: format!("{}-{}", destination.id, index),
            name: format!("{} Resort {}", display_name(destination), index),
            location: display_name(destination).to_string(),
            price: (price * 100.0).round() / 100.0,
            currency: request.currency.clone(),
            stars: Some((3 + index % 3) as u8),
            meal_plan: (!request.meal_plan.is_empty()).then(|| request.meal_plan.clone()),
            images: Vec::new(),
            description: None,
            original_data: serde_json::json!({ "destination": destination.id, "index": index }),
        }
    }
}

#[async_trait]
impl SearchExecutor for SimulatedExecutor {
    async fn search(&self, request: SearchRequest, cancel: CancellationToken) -> Result<Vec<SearchResult>, SearchError> {
        self.call_count.fetch_add(1, Ordering::SeqCst);
        debug!(destinations = request.destinations.len(), "SimulatedExecutor::search: called");

        tokio::select! {
            _ = cancel.cancelled() => {
                debug!("SimulatedExecutor::search: cancelled");
                return Err(SearchError::Cancelled);
            }
            _ = tokio::time::sleep(self.latency) => {}
        }

        if let Some(dest) = request.destinations.iter().find(|d| self.failing.contains(&d.id)) {
            return Err(SearchError::Provider {
                provider: "simulated".to_string(),
                message: format!("destination {} unavailable", dest.id),
            });
        }

        Ok(request
            .destinations
            .iter()
            .flat_map(|d| (1..=self.results_per_destination).map(move |i| (d, i)))
            .map(|(d, i)| self.offer(&request, d, i))
            .collect())
    }
}

/// Sales lookup backed by a fixed table
pub struct StaticSalesLookup {
    counts: HashMap<String, u64>,
    default: u64,
    latency: Duration,
}

impl StaticSalesLookup {
    pub fn new(config: &SimulationConfig) -> Self {
        Self {
            counts: config.sales.clone(),
            default: config.default_sales,
            latency: Duration::from_millis(config.enrichment_latency_ms),
        }
    }
}

#[async_trait]
impl SalesLookup for StaticSalesLookup {
    async fn monthly_sales(&self, name: &str) -> u64 {
        tokio::time::sleep(self.latency).await;
        self.counts.get(name).copied().unwrap_or(self.default)
    }
}

fn result_kind(search_type: SearchType) -> ResultKind {
    match search_type {
        SearchType::Hotel => ResultKind::Hotel,
        SearchType::Flight => ResultKind::Flight,
        SearchType::Package => ResultKind::Package,
        SearchType::Transfer => ResultKind::Transfer,
        SearchType::Tour => ResultKind::Tour,
    }
}

fn display_name(destination: &Destination) -> &str {
    if destination.name.is_empty() {
        &destination.id
    } else {
        &destination.name
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{DestinationKind, RoomAllocation, SearchParams};
    use crate::prefetch::PrefetchConfig;
    use chrono::NaiveDate;

    fn request(ids: &[&str]) -> SearchRequest {
        let params = SearchParams {
            destinations: ids
                .iter()
                .map(|id| Destination::new(*id, format!("Place {}", id), DestinationKind::Destination))
                .collect(),
            check_in: NaiveDate::from_ymd_opt(2025, 7, 20),
            check_out: NaiveDate::from_ymd_opt(2025, 7, 22),
            allocations: vec![RoomAllocation::adults(2)],
            ..Default::default()
        };
        SearchRequest::build(&params, &PrefetchConfig::default()).unwrap()
    }

    #[tokio::test(start_paused = true)]
    async fn test_simulated_results() {
        let executor = SimulatedExecutor::new(&SimulationConfig::default());
        let results = executor
            .search(request(&["d1", "d2"]), CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(results.len(), 6);
        assert_eq!(results[0].name, "Place d1 Resort 1");
        assert_eq!(results[0].price, 82.5 * 2.0 * 2.0);
        assert_eq!(results[3].location, "Place d2");
        assert_eq!(executor.call_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_simulated_cancel() {
        let executor = SimulatedExecutor::new(&SimulationConfig::default());
        let token = CancellationToken::new();
        token.cancel();
        let result = executor.search(request(&["d1"]), token).await;
        assert_eq!(result, Err(SearchError::Cancelled));
    }

    #[tokio::test(start_paused = true)]
    async fn test_simulated_failure() {
        let config = SimulationConfig {
            failing_destinations: vec!["d2".to_string()],
            ..Default::default()
        };
        let executor = SimulatedExecutor::new(&config);
        let err = executor
            .search(request(&["d1", "d2"]), CancellationToken::new())
            .await
            .unwrap_err();
        assert!(!err.is_cancelled());
        assert!(err.to_string().contains("d2"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_static_sales_lookup() {
        let mut config = SimulationConfig {
            default_sales: 4,
            ..Default::default()
        };
        config.sales.insert("Sunrise Garden".to_string(), 17);
        let lookup = StaticSalesLookup::new(&config);

        assert_eq!(lookup.monthly_sales("Sunrise Garden").await, 17);
        assert_eq!(lookup.monthly_sales("Unknown").await, 4);
    }
}
