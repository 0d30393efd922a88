//! Normalized search request handed to the executor

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::domain::{Destination, RoomAllocation, SearchParams, SearchType};
use crate::prefetch::{PrefetchConfig, Rejection, validate};

/// Parameters in the shape the search executor expects
///
/// Only active rooms are kept, destination ids lose their provider-specific
/// prefixes, and blank form fields fall back to configured defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchRequest {
    pub search_type: SearchType,
    pub destinations: Vec<Destination>,
    pub check_in: NaiveDate,
    pub check_out: NaiveDate,
    pub rooms: Vec<RoomAllocation>,
    pub meal_plan: String,
    pub currency: String,
    pub nationality: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enabled_providers: Option<BTreeMap<String, bool>>,
}

impl SearchRequest {
    /// Validate `params` and normalize them for the executor
    pub fn build(params: &SearchParams, config: &PrefetchConfig) -> Result<Self, Rejection> {
        validate(params)?;
        let (Some(check_in), Some(check_out)) = (params.check_in, params.check_out) else {
            return Err(Rejection::MissingDates);
        };

        let destinations = params
            .destinations
            .iter()
            .map(|d| Destination {
                id: strip_provider_prefix(&d.id, &config.strip_id_prefixes).to_string(),
                name: d.name.clone(),
                kind: d.kind,
                provider: d.provider.clone(),
            })
            .collect();

        let nationality = if params.nationality.trim().is_empty() {
            config.default_nationality.clone()
        } else {
            params.nationality.clone()
        };

        Ok(Self {
            search_type: params.search_type,
            destinations,
            check_in,
            check_out,
            rooms: params.active_allocations().cloned().collect(),
            meal_plan: params.meal_plan.clone(),
            currency: config.default_currency.clone(),
            nationality,
            enabled_providers: params.enabled_providers.clone(),
        })
    }

    /// Nights between check-in and check-out, at least one
    pub fn nights(&self) -> i64 {
        (self.check_out - self.check_in).num_days().max(1)
    }

    pub fn total_adults(&self) -> u32 {
        self.rooms.iter().map(|r| r.adults).sum()
    }
}

fn strip_provider_prefix<'a>(id: &'a str, prefixes: &[String]) -> &'a str {
    prefixes
        .iter()
        .find_map(|p| id.strip_prefix(p.as_str()))
        .unwrap_or(id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::DestinationKind;

    fn params() -> SearchParams {
        SearchParams {
            destinations: vec![
                Destination::new("solvex-c-68", "Hurghada", DestinationKind::Destination),
                Destination::new("h-991", "Sunrise Garden", DestinationKind::Hotel),
            ],
            check_in: NaiveDate::from_ymd_opt(2025, 7, 20),
            check_out: NaiveDate::from_ymd_opt(2025, 7, 27),
            allocations: vec![
                RoomAllocation::adults(2),
                RoomAllocation::adults(0),
                RoomAllocation {
                    adults: 1,
                    children: 1,
                    children_ages: vec![5],
                },
            ],
            meal_plan: "HB".to_string(),
            nationality: String::new(),
            search_type: SearchType::Hotel,
            enabled_providers: None,
        }
    }

    #[test]
    fn test_build_normalizes() {
        let request = SearchRequest::build(&params(), &PrefetchConfig::default()).unwrap();

        assert_eq!(request.destinations[0].id, "68");
        assert_eq!(request.destinations[1].id, "h-991");
        assert_eq!(request.rooms.len(), 2);
        assert_eq!(request.total_adults(), 3);
        assert_eq!(request.currency, "EUR");
        assert_eq!(request.nationality, "RS");
        assert_eq!(request.nights(), 7);
    }

    #[test]
    fn test_build_keeps_explicit_nationality() {
        let mut p = params();
        p.nationality = "DE".to_string();
        let request = SearchRequest::build(&p, &PrefetchConfig::default()).unwrap();
        assert_eq!(request.nationality, "DE");
    }

    #[test]
    fn test_build_rejects_invalid() {
        let mut p = params();
        p.check_out = None;
        assert_eq!(
            SearchRequest::build(&p, &PrefetchConfig::default()),
            Err(Rejection::MissingDates)
        );
    }

    #[test]
    fn test_strip_only_prefix() {
        let prefixes = vec!["solvex-c-".to_string()];
        assert_eq!(strip_provider_prefix("solvex-c-12", &prefixes), "12");
        assert_eq!(strip_provider_prefix("x-solvex-c-12", &prefixes), "x-solvex-c-12");
        assert_eq!(strip_provider_prefix("12", &[]), "12");
    }
}
