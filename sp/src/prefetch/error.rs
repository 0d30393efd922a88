//! Errors surfaced by the prefetch handle

use thiserror::Error;

/// The coordinator task is no longer reachable
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum PrefetchError {
    #[error("prefetch coordinator channel closed")]
    ChannelClosed,

    #[error("prefetch coordinator dropped the reply")]
    ReplyDropped,
}
