//! HTML parsing infrastructure
//!
//! Declarative field specs, the generic extractor that interprets them, date
//! normalization, and the per-portal profiles that hold the selector tables.

pub mod date_normalizer;
pub mod field_extractor;
pub mod field_spec;
pub mod site_profile;

// Re-export public types
pub use date_normalizer::{normalize as normalize_date, normalize_to_iso};
pub use field_extractor::{FieldExtractor, clean_text, extract_all_from_html, extract_from_html};
pub use field_spec::{CompiledFieldSpec, FieldIndex, FieldSpec};
pub use site_profile::{CompiledProfile, DetailFields, ListingStrategy, SiteProfile};
