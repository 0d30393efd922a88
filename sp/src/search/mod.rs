//! Search collaborators
//!
//! The coordinator never computes results itself. It hands a normalized
//! [`SearchRequest`] to a [`SearchExecutor`] and enriches each returned
//! [`SearchResult`](crate::domain::SearchResult) through a [`SalesLookup`].

mod error;
mod executor;
mod request;
mod simulated;

pub use error::SearchError;
pub use executor::{SalesLookup, SearchExecutor};
pub use request::SearchRequest;
pub use simulated::{SimulatedExecutor, SimulationConfig, StaticSalesLookup};

#[cfg(test)]
pub use executor::mock;
