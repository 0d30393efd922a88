//! PrefetchHandle - client interface shared by every search surface

use std::time::Duration;

use tokio::sync::{mpsc, oneshot};
use tracing::debug;
use uuid::Uuid;

use super::error::PrefetchError;
use super::messages::{CoordinatorSnapshot, PrefetchEvent, PrefetchMetrics, PrefetchRequest};
use super::subscriber::{Subscriber, Subscription};
use crate::domain::SearchParams;

/// Handle for UI surfaces to drive the prefetch coordinator
///
/// Cloneable and cheap. Every method except [`snapshot`](Self::snapshot) and
/// [`metrics`](Self::metrics) is fire-and-forget, so it is safe to call from
/// inside a subscriber callback.
#[derive(Clone)]
pub struct PrefetchHandle {
    tx: mpsc::UnboundedSender<PrefetchRequest>,
}

impl PrefetchHandle {
    pub(crate) fn new(tx: mpsc::UnboundedSender<PrefetchRequest>) -> Self {
        debug!("PrefetchHandle::new: called");
        Self { tx }
    }

    fn send(&self, req: PrefetchRequest) -> Result<(), PrefetchError> {
        self.tx.send(req).map_err(|_| PrefetchError::ChannelClosed)
    }

    /// Request a debounced prefetch with the configured quiet period
    pub fn schedule(&self, params: SearchParams) -> Result<(), PrefetchError> {
        debug!(destinations = params.destinations.len(), "PrefetchHandle::schedule: called");
        self.send(PrefetchRequest::Schedule { params, debounce: None })
    }

    /// Request a debounced prefetch with an explicit quiet period
    pub fn schedule_with_debounce(&self, params: SearchParams, debounce: Duration) -> Result<(), PrefetchError> {
        debug!(?debounce, "PrefetchHandle::schedule_with_debounce: called");
        self.send(PrefetchRequest::Schedule {
            params,
            debounce: Some(debounce),
        })
    }

    /// Drop any armed timer and abort in-flight work
    ///
    /// Never surfaces a completion or an error for the aborted work.
    pub fn cancel(&self) -> Result<(), PrefetchError> {
        debug!("PrefetchHandle::cancel: called");
        self.send(PrefetchRequest::Cancel)
    }

    /// Register `subscriber` under `id`, replacing any existing registration
    pub fn subscribe(&self, id: impl Into<String>, subscriber: Subscriber) -> Result<Subscription, PrefetchError> {
        let id = id.into();
        debug!(%id, "PrefetchHandle::subscribe: called");
        let token = Uuid::now_v7();
        self.send(PrefetchRequest::Subscribe {
            id: id.clone(),
            token,
            subscriber,
        })?;
        Ok(Subscription::new(id, token, self.tx.downgrade()))
    }

    /// Register a subscriber that forwards every notification into a channel
    pub fn subscribe_channel(
        &self,
        id: impl Into<String>,
    ) -> Result<(Subscription, mpsc::UnboundedReceiver<PrefetchEvent>), PrefetchError> {
        let (subscriber, rx) = Subscriber::channel();
        let subscription = self.subscribe(id, subscriber)?;
        Ok((subscription, rx))
    }

    /// Current bookkeeping state
    pub async fn snapshot(&self) -> Result<CoordinatorSnapshot, PrefetchError> {
        debug!("PrefetchHandle::snapshot: called");
        let (reply_tx, reply_rx) = oneshot::channel();
        self.send(PrefetchRequest::Snapshot { reply_tx })?;
        reply_rx.await.map_err(|_| PrefetchError::ReplyDropped)
    }

    /// Counters accumulated since the coordinator started
    pub async fn metrics(&self) -> Result<PrefetchMetrics, PrefetchError> {
        debug!("PrefetchHandle::metrics: called");
        let (reply_tx, reply_rx) = oneshot::channel();
        self.send(PrefetchRequest::GetMetrics { reply_tx })?;
        reply_rx.await.map_err(|_| PrefetchError::ReplyDropped)
    }

    /// Stop the coordinator, aborting any pending or in-flight work
    pub fn shutdown(&self) -> Result<(), PrefetchError> {
        debug!("PrefetchHandle::shutdown: called");
        self.send(PrefetchRequest::Shutdown)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_closed_mailbox() {
        let (tx, rx) = mpsc::unbounded_channel();
        drop(rx);
        let handle = PrefetchHandle::new(tx);

        assert_eq!(handle.cancel(), Err(PrefetchError::ChannelClosed));
        assert_eq!(handle.snapshot().await, Err(PrefetchError::ChannelClosed));
        assert!(handle.subscribe_channel("ui").is_err());
    }

    #[tokio::test]
    async fn test_dropped_reply() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let handle = PrefetchHandle::new(tx);

        tokio::spawn(async move {
            // Receive and drop without answering
            while let Some(req) = rx.recv().await {
                drop(req);
            }
        });

        assert_eq!(handle.metrics().await, Err(PrefetchError::ReplyDropped));
    }
}
