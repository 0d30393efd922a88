//! Domain types shared by the coordinator, the executors and the CLI

mod params;
mod result;

pub use params::{Destination, DestinationKind, RoomAllocation, SearchParams, SearchType};
pub use result::{EnrichedResult, ResultKind, SearchResult};
