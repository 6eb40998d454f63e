//! Domain module - Core harvesting entities
//!
//! This module contains the value types that flow through the harvesting
//! pipeline: discovered links, harvested match records and the calendar
//! range that drives enumeration.
//!
//! Modern Rust module organization (Rust 2018+ style):
//! - Each module is its own file in the domain/ directory
//! - Public exports are defined here for convenience

pub mod date_range;
pub mod link_task;
pub mod match_record;

pub use date_range::{DateRange, date_range};
pub use link_task::{FederationId, LinkTask};
pub use match_record::MatchRecord;
