//! RefStat - match schedule and referee harvester
//!
//! Discovers match pages on a federation statistics portal for a date and
//! federation range, then visits each page under a concurrency ceiling and
//! extracts date, teams, venue and referees into CSV records.

// Module declarations
pub mod application;
pub mod domain;
pub mod infrastructure;

pub use application::{HarvestUseCases, RunSummary};
pub use domain::{DateRange, FederationId, LinkTask, MatchRecord};
pub use infrastructure::{HarvestConfig, HarvestError, HarvestResult};
