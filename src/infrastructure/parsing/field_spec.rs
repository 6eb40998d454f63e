//! Declarative field locations.
//!
//! A [`FieldSpec`] is plain data: site markup knowledge lives in tables of
//! specs (see `site_profile`), and one generic routine interprets them.

use scraper::Selector;
use serde::{Deserialize, Serialize};

use crate::infrastructure::harvest_error::{HarvestError, HarvestResult};

/// Which of several matching nodes holds the value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FieldIndex {
    Nth(usize),
    Last,
}

impl Default for FieldIndex {
    fn default() -> Self {
        Self::Nth(0)
    }
}

impl FieldIndex {
    /// Position within `len` matches, if one exists
    pub const fn resolve(self, len: usize) -> Option<usize> {
        match self {
            Self::Nth(n) if n < len => Some(n),
            Self::Last if len > 0 => Some(len - 1),
            _ => None,
        }
    }
}

/// Where one record field lives on a page
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldSpec {
    /// CSS selector for the candidate nodes
    pub selector: String,
    /// Which candidate to read when no label is given
    #[serde(default)]
    pub index: FieldIndex,
    /// Case-insensitive prefix of the node text ("Matchdatum: ...")
    #[serde(default)]
    pub label_prefix: Option<String>,
    /// Child holding the value, separate from the label text
    #[serde(default)]
    pub sub_selector: Option<String>,
}

impl FieldSpec {
    pub fn new(selector: impl Into<String>) -> Self {
        Self {
            selector: selector.into(),
            index: FieldIndex::Nth(0),
            label_prefix: None,
            sub_selector: None,
        }
    }

    pub fn nth(mut self, index: usize) -> Self {
        self.index = FieldIndex::Nth(index);
        self
    }

    pub fn last(mut self) -> Self {
        self.index = FieldIndex::Last;
        self
    }

    pub fn labeled(mut self, prefix: impl Into<String>) -> Self {
        self.label_prefix = Some(prefix.into());
        self
    }

    pub fn sub(mut self, selector: impl Into<String>) -> Self {
        self.sub_selector = Some(selector.into());
        self
    }

    /// Parse the selectors once so extraction never re-parses them
    pub fn compile(&self) -> HarvestResult<CompiledFieldSpec> {
        let selector = parse_selector(&self.selector)?;
        let sub_selector = self
            .sub_selector
            .as_deref()
            .map(parse_selector)
            .transpose()?;

        Ok(CompiledFieldSpec {
            selector,
            sub_selector,
            index: self.index,
            label_prefix: self.label_prefix.as_ref().map(|l| l.to_lowercase()),
            source: self.selector.clone(),
        })
    }
}

pub(crate) fn parse_selector(selector: &str) -> HarvestResult<Selector> {
    Selector::parse(selector).map_err(|e| HarvestError::invalid_selector(selector, format!("{:?}", e)))
}

/// A [`FieldSpec`] with parsed selectors
#[derive(Debug, Clone)]
pub struct CompiledFieldSpec {
    pub(crate) selector: Selector,
    pub(crate) sub_selector: Option<Selector>,
    pub(crate) index: FieldIndex,
    /// Lowercased label prefix
    pub(crate) label_prefix: Option<String>,
    /// Selector text, for logs
    pub(crate) source: String,
}

impl CompiledFieldSpec {
    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn selector(&self) -> &Selector {
        &self.selector
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_index_resolution() {
        assert_eq!(FieldIndex::Nth(0).resolve(0), None);
        assert_eq!(FieldIndex::Nth(2).resolve(3), Some(2));
        assert_eq!(FieldIndex::Nth(3).resolve(3), None);
        assert_eq!(FieldIndex::Last.resolve(4), Some(3));
        assert_eq!(FieldIndex::Last.resolve(0), None);
    }

    #[test]
    fn test_compile_rejects_bad_selector() {
        assert!(FieldSpec::new("span.d6aBe").sub("strong").compile().is_ok());
        let err = FieldSpec::new("div[").compile().unwrap_err();
        assert!(matches!(err, HarvestError::InvalidSelector { .. }));
        assert!(FieldSpec::new("h1").sub("::nope(").compile().is_err());
    }

    #[test]
    fn test_label_is_lowercased_when_compiled() {
        let spec = FieldSpec::new("span").labeled("Matchdatum").compile().unwrap();
        assert_eq!(spec.label_prefix.as_deref(), Some("matchdatum"));
    }
}
