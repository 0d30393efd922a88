//! Cache key derivation and the schedule guard

use serde_json::{Value, json};
use thiserror::Error;

use crate::domain::SearchParams;

/// Why a parameter set is not worth prefetching
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum Rejection {
    #[error("no destinations selected")]
    NoDestinations,

    #[error("check-in or check-out missing")]
    MissingDates,

    #[error("no room has an adult")]
    NoActiveAllocation,

    /// Country-wide searches fan out too far to prefetch
    #[error("country-level destinations are not prefetched")]
    CountryScope,
}

/// Decide whether `params` may be prefetched at all
pub fn validate(params: &SearchParams) -> Result<(), Rejection> {
    if params.destinations.is_empty() {
        return Err(Rejection::NoDestinations);
    }
    if params.check_in.is_none() || params.check_out.is_none() {
        return Err(Rejection::MissingDates);
    }
    if !params.has_active_allocation() {
        return Err(Rejection::NoActiveAllocation);
    }
    if params.has_country_scope() {
        return Err(Rejection::CountryScope);
    }
    Ok(())
}

/// Derive the cache key for a parameter set
///
/// Layout: `ids|check-in|check-out|active-rooms-json|meal-plan|nationality|search-type`.
/// Destination ids are sorted so selection order does not matter, and rooms
/// without adults are dropped before serializing. Provider toggles do not
/// participate.
pub fn build_key(params: &SearchParams) -> String {
    let mut ids: Vec<&str> = params.destinations.iter().map(|d| d.id.as_str()).collect();
    ids.sort_unstable();

    let rooms = Value::Array(
        params
            .active_allocations()
            .map(|a| {
                json!({
                    "adults": a.adults,
                    "children": a.children,
                    "childrenAges": a.children_ages,
                })
            })
            .collect(),
    );

    let date = |d: Option<chrono::NaiveDate>| d.map(|d| d.format("%Y-%m-%d").to_string()).unwrap_or_default();

    [
        ids.join(","),
        date(params.check_in),
        date(params.check_out),
        rooms.to_string(),
        params.meal_plan.clone(),
        params.nationality.clone(),
        params.search_type.to_string(),
    ]
    .join("|")
}
