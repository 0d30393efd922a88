//! Search prefetch coordinator
//!
//! Debounces search-form edits, runs at most one authoritative fetch at a
//! time, enriches the results with recent sales and broadcasts them to every
//! registered subscriber. Surfaces that later run the same search can look up
//! the broadcast results by key instead of searching again.

mod config;
mod core;
mod error;
mod handle;
mod key;
mod messages;
mod subscriber;

pub use config::PrefetchConfig;
pub use core::PrefetchCoordinator;
pub use error::PrefetchError;
pub use handle::PrefetchHandle;
pub use key::{Rejection, build_key, validate};
pub use messages::{CoordinatorSnapshot, PrefetchEvent, PrefetchMetrics};
pub use subscriber::{Subscriber, Subscription};
