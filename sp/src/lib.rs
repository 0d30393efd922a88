//! searchprefetch - speculative search prefetching for travel search forms
//!
//! While a user edits a search form, every change is handed to a single
//! [`PrefetchCoordinator`](prefetch::PrefetchCoordinator). It waits for the
//! edits to settle, runs one search for the latest parameters, enriches the
//! results with recent sales counts and broadcasts them to every subscriber.
//!
//! # Modules
//!
//! - [`domain`] - Search parameters and results
//! - [`prefetch`] - The coordinator, its handle and subscribers
//! - [`search`] - Executor and sales-lookup collaborators
//! - [`scenario`] - Timed replay scripts
//! - [`config`] - Configuration types and loading
//! - [`cli`] - Command-line interface

pub mod cli;
pub mod config;
pub mod domain;
pub mod prefetch;
pub mod scenario;
pub mod search;

pub use config::Config;
pub use domain::{EnrichedResult, SearchParams, SearchResult};
pub use prefetch::{PrefetchCoordinator, PrefetchEvent, PrefetchHandle, Subscriber, Subscription, build_key};
pub use search::{SalesLookup, SearchError, SearchExecutor, SearchRequest};
