//! Search parameters as submitted by the UI surfaces

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize};

/// What a destination reference points at
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum DestinationKind {
    #[default]
    Destination,
    Hotel,
    Country,
}

/// A location reference picked in the search form
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Destination {
    pub id: String,

    #[serde(default)]
    pub name: String,

    #[serde(rename = "type", default)]
    pub kind: DestinationKind,

    /// Provider that owns the id, if the id is provider-specific
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider: Option<String>,
}

impl Destination {
    pub fn new(id: impl Into<String>, name: impl Into<String>, kind: DestinationKind) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            kind,
            provider: None,
        }
    }
}

/// Occupancy of a single room
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct RoomAllocation {
    pub adults: u32,

    #[serde(default)]
    pub children: u32,

    #[serde(default)]
    pub children_ages: Vec<u32>,
}

impl RoomAllocation {
    pub fn adults(adults: u32) -> Self {
        Self {
            adults,
            ..Default::default()
        }
    }

    /// A room only counts towards a search when somebody adult is in it
    pub fn is_active(&self) -> bool {
        self.adults > 0
    }
}

/// Which product family to search
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SearchType {
    #[default]
    Hotel,
    Flight,
    Package,
    Transfer,
    Tour,
}

impl std::fmt::Display for SearchType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Hotel => write!(f, "hotel"),
            Self::Flight => write!(f, "flight"),
            Self::Package => write!(f, "package"),
            Self::Transfer => write!(f, "transfer"),
            Self::Tour => write!(f, "tour"),
        }
    }
}

impl std::str::FromStr for SearchType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "hotel" => Ok(Self::Hotel),
            "flight" => Ok(Self::Flight),
            "package" => Ok(Self::Package),
            "transfer" => Ok(Self::Transfer),
            "tour" => Ok(Self::Tour),
            _ => Err(format!("Unknown search type: {}", s)),
        }
    }
}

/// Full parameter set of one search form state
///
/// Immutable value: callers build a fresh one on every change and hand it to
/// [`PrefetchHandle::schedule`](crate::prefetch::PrefetchHandle::schedule).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct SearchParams {
    #[serde(default)]
    pub destinations: Vec<Destination>,

    #[serde(default, deserialize_with = "deserialize_optional_date")]
    pub check_in: Option<NaiveDate>,

    #[serde(default, deserialize_with = "deserialize_optional_date")]
    pub check_out: Option<NaiveDate>,

    #[serde(default)]
    pub allocations: Vec<RoomAllocation>,

    #[serde(default)]
    pub meal_plan: String,

    #[serde(default)]
    pub nationality: String,

    #[serde(default)]
    pub search_type: SearchType,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enabled_providers: Option<BTreeMap<String, bool>>,
}

impl SearchParams {
    /// Rooms with at least one adult
    pub fn active_allocations(&self) -> impl Iterator<Item = &RoomAllocation> {
        self.allocations.iter().filter(|a| a.is_active())
    }

    pub fn has_active_allocation(&self) -> bool {
        self.allocations.iter().any(RoomAllocation::is_active)
    }

    pub fn has_country_scope(&self) -> bool {
        self.destinations.iter().any(|d| d.kind == DestinationKind::Country)
    }
}

/// Form fields arrive as "" while unset
fn deserialize_optional_date<'de, D>(deserializer: D) -> Result<Option<NaiveDate>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    match raw.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(s) => NaiveDate::parse_from_str(s, "%Y-%m-%d")
            .map(Some)
            .map_err(serde::de::Error::custom),
    }
}
