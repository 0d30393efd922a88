//! Subscriber callbacks and the registry that broadcasts to them

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::debug;
use uuid::Uuid;

use super::messages::{PrefetchEvent, PrefetchRequest};
use crate::domain::EnrichedResult;

type CompleteFn = dyn Fn(Arc<[EnrichedResult]>, &str) + Send + Sync;
type NotifyFn = dyn Fn() + Send + Sync;

/// Callbacks for one listener
///
/// Subscribers only listen: registering one never triggers a fetch.
pub struct Subscriber {
    on_complete: Box<CompleteFn>,
    on_start: Option<Box<NotifyFn>>,
    on_end: Option<Box<NotifyFn>>,
}

impl Subscriber {
    /// Create a subscriber that receives completed, enriched results
    pub fn on_complete<F>(f: F) -> Self
    where
        F: Fn(Arc<[EnrichedResult]>, &str) + Send + Sync + 'static,
    {
        Self {
            on_complete: Box::new(f),
            on_start: None,
            on_end: None,
        }
    }

    /// Also get told when a fetch begins
    pub fn with_on_start<F>(mut self, f: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.on_start = Some(Box::new(f));
        self
    }

    /// Also get told when the authoritative operation ends
    pub fn with_on_end<F>(mut self, f: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.on_end = Some(Box::new(f));
        self
    }

    /// Forward every notification into an unbounded channel
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<PrefetchEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let start_tx = tx.clone();
        let end_tx = tx.clone();
        let subscriber = Self::on_complete(move |results, key| {
            let _ = tx.send(PrefetchEvent::Completed {
                results,
                key: key.to_string(),
            });
        })
        .with_on_start(move || {
            let _ = start_tx.send(PrefetchEvent::Started);
        })
        .with_on_end(move || {
            let _ = end_tx.send(PrefetchEvent::Ended);
        });
        (subscriber, rx)
    }
}

impl std::fmt::Debug for Subscriber {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscriber")
            .field("on_start", &self.on_start.is_some())
            .field("on_end", &self.on_end.is_some())
            .finish_non_exhaustive()
    }
}

/// Receipt for a registration; consume it to unsubscribe
///
/// If the id has since been re-registered, unsubscribing through an older
/// receipt does nothing.
#[must_use = "dropping a Subscription keeps the subscriber registered"]
#[derive(Debug)]
pub struct Subscription {
    id: String,
    token: Uuid,
    tx: mpsc::WeakUnboundedSender<PrefetchRequest>,
}

impl Subscription {
    pub(crate) fn new(id: String, token: Uuid, tx: mpsc::WeakUnboundedSender<PrefetchRequest>) -> Self {
        Self { id, token, tx }
    }

    /// Remove this registration
    ///
    /// Safe to call from inside a subscriber callback; the removal is applied
    /// after the current broadcast finishes. A receipt never keeps the
    /// coordinator alive; once it has stopped this does nothing.
    pub fn unsubscribe(self) {
        debug!(id = %self.id, "Subscription::unsubscribe: called");
        if let Some(tx) = self.tx.upgrade() {
            let _ = tx.send(PrefetchRequest::Unsubscribe {
                id: self.id,
                token: self.token,
            });
        }
    }
}

struct Registration {
    token: Uuid,
    subscriber: Arc<Subscriber>,
}

/// id -> callbacks
#[derive(Default)]
pub(crate) struct SubscriberRegistry {
    entries: HashMap<String, Registration>,
}

impl SubscriberRegistry {
    /// Insert or replace the registration for `id`
    pub(crate) fn insert(&mut self, id: String, token: Uuid, subscriber: Subscriber) {
        let replaced = self
            .entries
            .insert(
                id.clone(),
                Registration {
                    token,
                    subscriber: Arc::new(subscriber),
                },
            )
            .is_some();
        debug!(%id, replaced, "SubscriberRegistry::insert");
    }

    /// Remove `id` only if it is still the registration identified by `token`
    pub(crate) fn remove(&mut self, id: &str, token: Uuid) -> bool {
        match self.entries.get(id) {
            Some(reg) if reg.token == token => {
                self.entries.remove(id);
                true
            }
            _ => false,
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }

    fn snapshot(&self) -> Vec<Arc<Subscriber>> {
        self.entries.values().map(|r| Arc::clone(&r.subscriber)).collect()
    }

    pub(crate) fn notify_start(&self) {
        for s in self.snapshot() {
            if let Some(f) = &s.on_start {
                f();
            }
        }
    }

    pub(crate) fn notify_end(&self) {
        for s in self.snapshot() {
            if let Some(f) = &s.on_end {
                f();
            }
        }
    }

    pub(crate) fn notify_complete(&self, results: Arc<[EnrichedResult]>, key: &str) {
        for s in self.snapshot() {
            (s.on_complete)(Arc::clone(&results), key);
        }
    }
}
