use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Regional federation identifier used in listing page paths (`/forbund/{id}/...`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FederationId(pub u16);

impl FederationId {
    /// Every federation published by the portal, in the order the sweep visits them
    pub const ALL: [FederationId; 24] = [
        FederationId(3),
        FederationId(13),
        FederationId(18),
        FederationId(19),
        FederationId(20),
        FederationId(22),
        FederationId(23),
        FederationId(24),
        FederationId(4),
        FederationId(44),
        FederationId(6),
        FederationId(7),
        FederationId(8),
        FederationId(1),
        FederationId(9),
        FederationId(10),
        FederationId(11),
        FederationId(12),
        FederationId(14),
        FederationId(17),
        FederationId(15),
        FederationId(21),
        FederationId(5),
        FederationId(16),
    ];

    pub const fn get(self) -> u16 {
        self.0
    }

    /// Whether the id belongs to the portal's known federation table
    pub fn is_known(self) -> bool {
        Self::ALL.contains(&self)
    }
}

impl fmt::Display for FederationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for FederationId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim().parse::<u16>().map(FederationId)
    }
}

/// One discovered detail page, together with where it was first found.
///
/// Created by the link enumerator and consumed exactly once by the
/// harvest coordinator. `detail_url` is unique within a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkTask {
    /// Listing date the link was discovered under
    pub date: Option<NaiveDate>,
    /// Federation whose listing surfaced the link
    pub federation_id: Option<FederationId>,
    /// Absolute detail page URL, detail suffix included
    pub detail_url: String,
}

impl LinkTask {
    pub fn new(date: NaiveDate, federation_id: FederationId, detail_url: String) -> Self {
        Self {
            date: Some(date),
            federation_id: Some(federation_id),
            detail_url,
        }
    }

    /// A task read back from a plain links file, without discovery metadata
    pub fn from_url(detail_url: impl Into<String>) -> Self {
        Self {
            date: None,
            federation_id: None,
            detail_url: detail_url.into(),
        }
    }

    /// Detail URL with a trailing `suffix` path segment removed, if present
    pub fn canonical_url(&self, suffix: &str) -> String {
        strip_detail_suffix(&self.detail_url, suffix)
    }
}

impl fmt::Display for LinkTask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.date, self.federation_id) {
            (Some(date), Some(fed)) => write!(f, "{} ({}, federation {})", self.detail_url, date, fed),
            _ => write!(f, "{}", self.detail_url),
        }
    }
}

/// Remove `suffix` from the end of `url` (ignoring one trailing slash).
pub fn strip_detail_suffix(url: &str, suffix: &str) -> String {
    let trimmed = url.trim().trim_end_matches('/');
    if suffix.is_empty() {
        return trimmed.to_string();
    }
    trimmed
        .strip_suffix(suffix)
        .unwrap_or(trimmed)
        .to_string()
}

/// Append `suffix` to `url` unless it already ends with it.
pub fn append_detail_suffix(url: &str, suffix: &str) -> String {
    let trimmed = url.trim().trim_end_matches('/');
    if suffix.is_empty() || trimmed.ends_with(suffix) {
        trimmed.to_string()
    } else {
        format!("{trimmed}{suffix}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SUFFIX: &str = "/laguppstallning";

    #[test]
    fn test_suffix_append_is_idempotent() {
        let base = "https://stats.innebandy.se/sasong/43/serie/41140/match/1628521";
        let once = append_detail_suffix(base, SUFFIX);
        assert_eq!(once, format!("{base}{SUFFIX}"));
        assert_eq!(append_detail_suffix(&once, SUFFIX), once);
    }

    #[test]
    fn test_suffix_strip() {
        let task = LinkTask::from_url(
            "https://stats.innebandy.se/sasong/43/serie/41140/match/1628521/laguppstallning",
        );
        assert_eq!(
            task.canonical_url(SUFFIX),
            "https://stats.innebandy.se/sasong/43/serie/41140/match/1628521"
        );
        // Without the suffix the URL is returned as is
        assert_eq!(
            strip_detail_suffix("https://stats.innebandy.se/sasong/43/serie/1/match/2", SUFFIX),
            "https://stats.innebandy.se/sasong/43/serie/1/match/2"
        );
    }

    #[test]
    fn test_federation_table() {
        assert_eq!(FederationId::ALL.len(), 24);
        assert!(FederationId(21).is_known());
        assert!(!FederationId(2).is_known());
        assert_eq!(" 44 ".parse::<FederationId>().unwrap(), FederationId(44));
    }
}
