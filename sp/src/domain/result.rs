//! Search results and their enriched form

use serde::{Deserialize, Serialize};

/// Product family of a single result
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ResultKind {
    #[default]
    Hotel,
    Flight,
    Package,
    Transfer,
    Tour,
}

/// One offer returned by the search executor
///
/// The coordinator treats this as opaque apart from `name`, which keys the
/// sales-count enrichment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResult {
    pub provider: String,

    #[serde(rename = "type")]
    pub kind: ResultKind,

    pub id: String,
    pub name: String,
    pub location: String,
    pub price: f64,
    pub currency: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stars: Option<u8>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meal_plan: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub images: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Provider payload, passed through untouched
    #[serde(default)]
    pub original_data: serde_json::Value,
}

/// A result after the sales-count enrichment pass
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnrichedResult {
    #[serde(flatten)]
    pub result: SearchResult,

    /// Reservations recorded for this accommodation in the last 30 days
    pub sales_count: u64,
}

impl std::ops::Deref for EnrichedResult {
    type Target = SearchResult;

    fn deref(&self) -> &Self::Target {
        &self.result
    }
}
