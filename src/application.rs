//! Application layer module
//!
//! Link enumeration, detail harvesting, the bounded fan-out between them,
//! and the end-to-end use cases the binary calls.

pub mod detail_harvester;
pub mod harvest_coordinator;
pub mod harvest_use_cases;
pub mod link_enumerator;

pub use detail_harvester::DetailHarvester;
pub use harvest_coordinator::HarvestCoordinator;
pub use harvest_use_cases::{HarvestUseCases, RunSummary, resolve_profile};
pub use link_enumerator::{LinkCollector, LinkEnumerator, extract_listing_links};
