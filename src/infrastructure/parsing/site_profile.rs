//! Site profiles: everything that ties the pipeline to one portal's markup.
//!
//! The two profiles share the URL layout of the statistics portal and differ
//! in how listing pages expose match links and where detail fields live.

use chrono::NaiveDate;
use regex::Regex;
use scraper::Selector;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::field_spec::{CompiledFieldSpec, FieldSpec, parse_selector};
use crate::domain::FederationId;
use crate::infrastructure::config::stats_portal;
use crate::infrastructure::harvest_error::{HarvestError, HarvestResult};

/// How match links are found on a listing page
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ListingStrategy {
    /// Anchors inside a class-scoped container
    ContainerScoped { anchor_selector: String },
    /// Anchors selected by an `href` prefix
    HrefPrefix { anchor_selector: String },
}

impl ListingStrategy {
    pub fn anchor_selector(&self) -> &str {
        match self {
            Self::ContainerScoped { anchor_selector } | Self::HrefPrefix { anchor_selector } => {
                anchor_selector
            }
        }
    }
}

/// Field table for a detail page
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DetailFields {
    pub date: FieldSpec,
    pub time: FieldSpec,
    pub competition: FieldSpec,
    pub home_team: FieldSpec,
    pub away_team: FieldSpec,
    pub venue: FieldSpec,
    pub match_number: FieldSpec,
    /// List field; the first two non-empty names are the referees
    pub referees: FieldSpec,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SiteProfile {
    pub name: String,
    pub base_url: String,
    /// `{federation}` and `{date}` are substituted
    pub listing_path_template: String,
    pub listing: ListingStrategy,
    /// Regex over the path of a resolved link, detail suffix removed
    pub match_path_pattern: String,
    /// Path segment leading from a match page to its lineup page
    pub detail_suffix: String,
    /// Signal that a detail page has rendered its data
    pub detail_ready_selector: String,
    pub default_federations: Vec<FederationId>,
    /// Use the listing date when the detail page shows none
    pub date_from_listing: bool,
    pub fields: DetailFields,
}

fn labeled_span(label: &str) -> FieldSpec {
    FieldSpec::new("span.d6aBe").labeled(label).sub("strong")
}

impl SiteProfile {
    pub const NAMES: [&'static str; 2] = ["refstat", "sweep"];

    /// Single-federation scan with class-scoped listing links and labeled detail spans
    pub fn refstat() -> Self {
        Self {
            name: "refstat".to_string(),
            base_url: stats_portal::BASE_URL.to_string(),
            listing_path_template: stats_portal::LISTING_PATH_TEMPLATE.to_string(),
            listing: ListingStrategy::ContainerScoped {
                anchor_selector: "div.x9FBF a".to_string(),
            },
            match_path_pattern: stats_portal::MATCH_PATH_PATTERN.to_string(),
            detail_suffix: stats_portal::DETAIL_SUFFIX.to_string(),
            detail_ready_selector: "span.d6aBe".to_string(),
            default_federations: vec![FederationId(stats_portal::REFSTAT_FEDERATION)],
            date_from_listing: false,
            fields: DetailFields {
                date: labeled_span("matchdatum"),
                time: labeled_span("matchstart"),
                competition: FieldSpec::new("div.zrccf h1"),
                home_team: FieldSpec::new("h3.QmXlT").nth(0),
                away_team: FieldSpec::new("h3.QmXlT").nth(1),
                venue: labeled_span("arena"),
                match_number: FieldSpec::new("div.FMsFg strong").last(),
                referees: FieldSpec::new("td.wMqhM a"),
            },
        }
    }

    /// All-federation sweep with href-prefix listing links and positional header fields
    pub fn sweep() -> Self {
        Self {
            name: "sweep".to_string(),
            base_url: stats_portal::BASE_URL.to_string(),
            listing_path_template: stats_portal::LISTING_PATH_TEMPLATE.to_string(),
            listing: ListingStrategy::HrefPrefix {
                anchor_selector: r#"a[href^="/sasong/"]"#.to_string(),
            },
            match_path_pattern: stats_portal::MATCH_PATH_PATTERN.to_string(),
            detail_suffix: stats_portal::DETAIL_SUFFIX.to_string(),
            detail_ready_selector: "div.FMsFg".to_string(),
            default_federations: FederationId::ALL.to_vec(),
            date_from_listing: true,
            fields: DetailFields {
                date: labeled_span("matchdatum"),
                time: labeled_span("matchstart"),
                competition: FieldSpec::new("h1"),
                home_team: FieldSpec::new("h3.QmXlT").nth(0),
                away_team: FieldSpec::new("h3.QmXlT").nth(1),
                venue: FieldSpec::new("div.FMsFg strong").nth(2),
                match_number: FieldSpec::new("div.FMsFg strong").last(),
                referees: FieldSpec::new("div.Vsp4o table tbody tr td a"),
            },
        }
    }

    pub fn by_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "refstat" => Some(Self::refstat()),
            "sweep" => Some(Self::sweep()),
            _ => None,
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Listing page for one federation and day
    pub fn listing_url(&self, federation: FederationId, date: NaiveDate) -> String {
        let path = self
            .listing_path_template
            .replace("{federation}", &federation.to_string())
            .replace("{date}", &date.format("%Y-%m-%d").to_string());
        format!("{}{}", self.base_url.trim_end_matches('/'), path)
    }

    /// Parse every selector and pattern up front
    pub fn compile(self) -> HarvestResult<CompiledProfile> {
        let base_url = url::Url::parse(&self.base_url).map_err(|e| HarvestError::UrlResolution {
            url: self.base_url.clone(),
            reason: e.to_string(),
        })?;
        let match_path = Regex::new(&self.match_path_pattern).map_err(|e| HarvestError::Config {
            message: format!("Invalid match path pattern {}: {}", self.match_path_pattern, e),
        })?;
        let fields = &self.fields;

        Ok(CompiledProfile {
            anchor: parse_selector(self.listing.anchor_selector())?,
            detail_ready: parse_selector(&self.detail_ready_selector)?,
            match_path,
            base_url,
            fields: CompiledFields {
                date: fields.date.compile()?,
                time: fields.time.compile()?,
                competition: fields.competition.compile()?,
                home_team: fields.home_team.compile()?,
                away_team: fields.away_team.compile()?,
                venue: fields.venue.compile()?,
                match_number: fields.match_number.compile()?,
                referees: fields.referees.compile()?,
            },
            profile: Arc::new(self),
        })
    }
}

#[derive(Debug, Clone)]
pub struct CompiledFields {
    pub date: CompiledFieldSpec,
    pub time: CompiledFieldSpec,
    pub competition: CompiledFieldSpec,
    pub home_team: CompiledFieldSpec,
    pub away_team: CompiledFieldSpec,
    pub venue: CompiledFieldSpec,
    pub match_number: CompiledFieldSpec,
    pub referees: CompiledFieldSpec,
}

/// A [`SiteProfile`] ready for use, shared read-only across tasks
#[derive(Debug, Clone)]
pub struct CompiledProfile {
    pub profile: Arc<SiteProfile>,
    pub base_url: url::Url,
    pub anchor: Selector,
    pub match_path: Regex,
    pub detail_ready: Selector,
    pub fields: CompiledFields,
}

impl CompiledProfile {
    pub fn name(&self) -> &str {
        &self.profile.name
    }

    pub fn detail_suffix(&self) -> &str {
        &self.profile.detail_suffix
    }

    /// Whether an absolute URL points at a match page on this portal
    pub fn is_match_url(&self, url: &url::Url) -> bool {
        if url.host_str() != self.base_url.host_str() {
            return false;
        }
        let path = url.path().trim_end_matches('/');
        let path = path.strip_suffix(self.detail_suffix()).unwrap_or(path);
        self.match_path.is_match(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_profiles_compile() {
        for name in SiteProfile::NAMES {
            let profile = SiteProfile::by_name(name).unwrap();
            assert!(profile.compile().is_ok(), "profile {} failed to compile", name);
        }
        assert!(SiteProfile::by_name("hockey").is_none());
    }

    #[test]
    fn test_default_federations() {
        assert_eq!(SiteProfile::refstat().default_federations, vec![FederationId(21)]);
        let sweep = SiteProfile::sweep().default_federations;
        assert_eq!(sweep.len(), 24);
        assert_eq!(sweep.first(), Some(&FederationId(3)));
        assert_eq!(sweep.last(), Some(&FederationId(16)));
    }

    #[test]
    fn test_listing_url() {
        let profile = SiteProfile::refstat().with_base_url("https://stats.example.se/");
        let date = NaiveDate::from_ymd_opt(2025, 11, 17).unwrap();
        assert_eq!(
            profile.listing_url(FederationId(21), date),
            "https://stats.example.se/forbund/21/livematches/2025-11-17"
        );
    }

    #[test]
    fn test_match_url_recognition() {
        let compiled = SiteProfile::sweep()
            .with_base_url("https://stats.example.se")
            .compile()
            .unwrap();
        let check = |u: &str| compiled.is_match_url(&url::Url::parse(u).unwrap());

        assert!(check("https://stats.example.se/sasong/43/serie/41140/match/1628521"));
        assert!(check("https://stats.example.se/sasong/43/serie/41140/match/1628521/laguppstallning"));
        assert!(!check("https://stats.example.se/sasong/43/serie/41140"));
        assert!(!check("https://stats.example.se/sasong/43/serie/41140/match/1628521/handelser"));
        assert!(!check("https://other.example.se/sasong/43/serie/41140/match/1628521"));
    }
}
