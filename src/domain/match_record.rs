use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::link_task::FederationId;

/// One detail page's extracted data.
///
/// `source_url` is always present; every other field is independently
/// optional and the absence of one never invalidates the record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchRecord {
    /// Canonical detail page URL, detail suffix stripped
    #[serde(rename = "sourceUrl")]
    pub source_url: String,
    pub date: Option<NaiveDate>,
    /// Local kick-off time exactly as printed by the portal
    pub time: Option<String>,
    #[serde(rename = "competitionName")]
    pub competition: Option<String>,
    #[serde(rename = "homeTeam")]
    pub home_team: Option<String>,
    #[serde(rename = "awayTeam")]
    pub away_team: Option<String>,
    pub venue: Option<String>,
    #[serde(rename = "matchNumber")]
    pub match_number: Option<String>,
    pub referee1: Option<String>,
    pub referee2: Option<String>,
    #[serde(rename = "federationId")]
    pub federation_id: Option<FederationId>,
}

impl MatchRecord {
    /// Record carrying only its link, produced when the page could not be loaded
    pub fn stub(source_url: impl Into<String>) -> Self {
        Self {
            source_url: source_url.into(),
            date: None,
            time: None,
            competition: None,
            home_team: None,
            away_team: None,
            venue: None,
            match_number: None,
            referee1: None,
            referee2: None,
            federation_id: None,
        }
    }

    pub fn with_federation(mut self, federation_id: Option<FederationId>) -> Self {
        self.federation_id = federation_id;
        self
    }

    /// True when no page data at all was extracted
    pub fn is_stub(&self) -> bool {
        self.date.is_none()
            && self.time.is_none()
            && self.competition.is_none()
            && self.home_team.is_none()
            && self.away_team.is_none()
            && self.venue.is_none()
            && self.match_number.is_none()
            && self.referee1.is_none()
            && self.referee2.is_none()
    }

    pub fn has_referees(&self) -> bool {
        self.referee1.is_some() || self.referee2.is_some()
    }

    /// Date in canonical `YYYY-MM-DD` form
    pub fn date_iso(&self) -> Option<String> {
        self.date.map(|d| d.format("%Y-%m-%d").to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stub_record_has_only_url() {
        let record = MatchRecord::stub("https://stats.innebandy.se/sasong/43/serie/1/match/2");
        assert!(record.is_stub());
        assert!(!record.has_referees());
        assert!(!record.source_url.is_empty());
        assert_eq!(record.date_iso(), None);
    }

    #[test]
    fn test_single_field_makes_record_non_stub() {
        let mut record = MatchRecord::stub("https://example.se/match/1");
        record.referee2 = Some("Anna Domare".to_string());
        assert!(!record.is_stub());
        assert!(record.has_referees());
    }

    #[test]
    fn test_serialized_field_names() {
        let mut record = MatchRecord::stub("u").with_federation(Some(FederationId(21)));
        record.date = NaiveDate::from_ymd_opt(2025, 11, 17);
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["sourceUrl"], "u");
        assert_eq!(json["federationId"], 21);
        assert_eq!(json["date"], "2025-11-17");
    }
}
