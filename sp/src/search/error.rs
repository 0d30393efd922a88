//! Search executor error types

use thiserror::Error;

/// Errors a search executor can fail with
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SearchError {
    /// The cancellation token was triggered; an expected outcome, never reported
    #[error("Search cancelled")]
    Cancelled,

    #[error("Provider {provider} failed: {message}")]
    Provider { provider: String, message: String },

    #[error("Search failed: {0}")]
    Failed(String),
}

impl SearchError {
    /// Check if this is a cancellation rather than a real failure
    pub fn is_cancelled(&self) -> bool {
        matches!(self, SearchError::Cancelled)
    }
}
