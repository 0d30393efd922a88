//! Timed scripts replayed against a live coordinator
//!
//! A scenario is the sequence of form edits a user would make, with the
//! pauses between them. Replaying one shows which edits get coalesced, which
//! fetches get superseded and what each subscriber ends up seeing.

use std::path::Path;
use std::time::Duration;

use eyre::{Context, Result};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info};

use crate::domain::SearchParams;
use crate::prefetch::{CoordinatorSnapshot, PrefetchEvent, PrefetchHandle, PrefetchMetrics};

/// A replayable script
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Scenario {
    /// Subscriber ids registered before the first step
    #[serde(default = "default_subscribers")]
    pub subscribers: Vec<String>,

    /// How long to keep listening after the last step
    #[serde(default = "default_settle_ms")]
    pub settle_ms: u64,

    pub steps: Vec<Step>,
}

fn default_subscribers() -> Vec<String> {
    vec!["smart-search".to_string()]
}

fn default_settle_ms() -> u64 {
    2000
}

/// One user action
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "kebab-case")]
pub enum Step {
    /// Submit a form state; `debounce-ms` overrides the configured quiet period
    Schedule {
        params: SearchParams,
        #[serde(rename = "debounce-ms", default, skip_serializing_if = "Option::is_none")]
        debounce_ms: Option<u64>,
    },

    /// Let time pass
    Wait { ms: u64 },

    /// Abandon the form
    Cancel,
}

impl Scenario {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).context(format!("Failed to read scenario file {}", path.display()))?;
        let scenario: Self = serde_yaml::from_str(&content).context("Failed to parse scenario file")?;
        debug!(steps = scenario.steps.len(), "Scenario::load: parsed");
        Ok(scenario)
    }
}

/// Condensed view of one enriched result
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResultSummary {
    pub name: String,
    pub price: f64,
    pub currency: String,
    pub sales_count: u64,
}

/// What a subscriber saw
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "kebab-case")]
pub enum Observed {
    Started,
    Completed { key: String, results: Vec<ResultSummary> },
    Ended,
}

impl From<PrefetchEvent> for Observed {
    fn from(event: PrefetchEvent) -> Self {
        match event {
            PrefetchEvent::Started => Self::Started,
            PrefetchEvent::Ended => Self::Ended,
            PrefetchEvent::Completed { results, key } => Self::Completed {
                key,
                results: results
                    .iter()
                    .map(|r| ResultSummary {
                        name: r.name.clone(),
                        price: r.price,
                        currency: r.currency.clone(),
                        sales_count: r.sales_count,
                    })
                    .collect(),
            },
        }
    }
}

/// A timestamped notification, relative to the start of the replay
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReplayEvent {
    pub at_ms: u64,
    pub subscriber: String,
    #[serde(flatten)]
    pub observed: Observed,
}

/// Everything a replay produced
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReplayReport {
    pub events: Vec<ReplayEvent>,
    pub snapshot: CoordinatorSnapshot,
    pub metrics: PrefetchMetrics,
}

impl ReplayReport {
    pub fn completed(&self) -> impl Iterator<Item = &ReplayEvent> {
        self.events
            .iter()
            .filter(|e| matches!(e.observed, Observed::Completed { .. }))
    }
}

fn collect(subscriber: String, mut rx: mpsc::UnboundedReceiver<PrefetchEvent>, start: Instant) -> JoinHandle<Vec<ReplayEvent>> {
    tokio::spawn(async move {
        let mut seen = Vec::new();
        while let Some(event) = rx.recv().await {
            seen.push(ReplayEvent {
                at_ms: start.elapsed().as_millis() as u64,
                subscriber: subscriber.clone(),
                observed: event.into(),
            });
        }
        seen
    })
}

/// Run `scenario` against `handle` and report what every subscriber observed
pub async fn replay(scenario: &Scenario, handle: &PrefetchHandle) -> Result<ReplayReport> {
    info!(steps = scenario.steps.len(), subscribers = scenario.subscribers.len(), "Replaying scenario");
    let start = Instant::now();

    let mut subscriptions = Vec::new();
    let mut collectors = Vec::new();
    for id in &scenario.subscribers {
        let (subscription, rx) = handle.subscribe_channel(id.clone())?;
        subscriptions.push(subscription);
        collectors.push(collect(id.clone(), rx, start));
    }

    for (index, step) in scenario.steps.iter().enumerate() {
        debug!(index, ?step, "replay: step");
        match step {
            Step::Schedule { params, debounce_ms } => match debounce_ms {
                Some(ms) => handle.schedule_with_debounce(params.clone(), Duration::from_millis(*ms))?,
                None => handle.schedule(params.clone())?,
            },
            Step::Wait { ms } => tokio::time::sleep(Duration::from_millis(*ms)).await,
            Step::Cancel => handle.cancel()?,
        }
    }

    tokio::time::sleep(Duration::from_millis(scenario.settle_ms)).await;

    let snapshot = handle.snapshot().await?;
    let metrics = handle.metrics().await?;

    // Dropping the registrations closes each channel and ends its collector
    for subscription in subscriptions {
        subscription.unsubscribe();
    }

    let mut events = Vec::new();
    for collector in collectors {
        events.extend(collector.await.context("Event collector panicked")?);
    }
    events.sort_by_key(|e| e.at_ms);

    Ok(ReplayReport {
        events,
        snapshot,
        metrics,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prefetch::{PrefetchConfig, PrefetchCoordinator};
    use crate::search::mock::{MockSalesLookup, MockSearchExecutor};
    use std::sync::Arc;

    const SCENARIO: &str = r#"
subscribers: [smart-search, hub]
settle-ms: 1000
steps:
  - action: schedule
    params:
      destinations: [{id: d1, name: Budva}]
      checkIn: "2025-07-20"
      checkOut: "2025-07-27"
      allocations: [{adults: 2}]
  - action: wait
    ms: 50
  - action: schedule
    params:
      destinations: [{id: d2, name: Kotor}]
      checkIn: "2025-07-20"
      checkOut: "2025-07-27"
      allocations: [{adults: 2}]
  - action: wait
    ms: 1000
  - action: schedule
    debounce-ms: 10
    params:
      destinations: [{id: d3, name: Bar}]
      checkIn: "2025-07-20"
      checkOut: "2025-07-27"
      allocations: [{adults: 2}]
  - action: wait
    ms: 20
  - action: cancel
"#;

    #[test]
    fn test_parse_scenario() {
        let scenario: Scenario = serde_yaml::from_str(SCENARIO).unwrap();
        assert_eq!(scenario.subscribers, vec!["smart-search", "hub"]);
        assert_eq!(scenario.settle_ms, 1000);
        assert_eq!(scenario.steps.len(), 6);
        assert!(matches!(scenario.steps[1], Step::Wait { ms: 50 }));
        assert!(matches!(scenario.steps[4], Step::Schedule { debounce_ms: Some(10), .. }));
        assert_eq!(scenario.steps[5], Step::Cancel);
    }

    #[test]
    fn test_parse_defaults() {
        let scenario: Scenario = serde_yaml::from_str("steps: []").unwrap();
        assert_eq!(scenario.subscribers, vec!["smart-search"]);
        assert_eq!(scenario.settle_ms, 2000);
    }

    #[test]
    fn test_unknown_action_rejected() {
        let result: Result<Scenario, _> = serde_yaml::from_str("steps: [{action: teleport}]");
        assert!(result.is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_replay() {
        let scenario: Scenario = serde_yaml::from_str(SCENARIO).unwrap();
        let executor = Arc::new(MockSearchExecutor::new(Duration::from_millis(100)));
        let lookup = Arc::new(MockSalesLookup::new(Duration::from_millis(10)));
        let handle = PrefetchCoordinator::spawn(PrefetchConfig::default(), executor.clone(), lookup);

        let report = replay(&scenario, &handle).await.unwrap();

        // d1 coalesced into d2; d3 cancelled in flight
        assert_eq!(executor.call_count(), 2);
        let completed: Vec<_> = report.completed().collect();
        assert_eq!(completed.len(), 2);
        for event in &completed {
            match &event.observed {
                Observed::Completed { key, results } => {
                    assert!(key.starts_with("d2|"));
                    assert_eq!(results[0].name, "Hotel d2");
                    assert_eq!(results[0].sales_count, 8);
                }
                other => panic!("Expected Completed, got {:?}", other),
            }
        }

        let hub: Vec<_> = report.events.iter().filter(|e| e.subscriber == "hub").collect();
        assert_eq!(hub.len(), 5);
        assert_eq!(hub.last().map(|e| &e.observed), Some(&Observed::Ended));

        assert!(report.snapshot.current_key.starts_with("d2|"));
        assert_eq!(report.snapshot.fetching_key, "");
        assert_eq!(report.metrics.manual_cancels, 1);
    }
}
