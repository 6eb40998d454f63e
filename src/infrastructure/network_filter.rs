//! Sub-resource request filter.
//!
//! Pages are loaded with trackers, images, fonts and media suppressed; the
//! document itself and its scripts are always allowed through.

use serde::{Deserialize, Serialize};

/// Kind of resource a page is requesting
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ResourceKind {
    Document,
    Script,
    Stylesheet,
    Xhr,
    Image,
    Media,
    Font,
    Other,
}

/// An outbound request as seen by the filter
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestInfo {
    pub url: String,
    pub kind: ResourceKind,
}

impl RequestInfo {
    pub fn new(url: impl Into<String>, kind: ResourceKind) -> Self {
        Self {
            url: url.into(),
            kind,
        }
    }
}

/// Tracker hosts and heavy-asset extensions that are never needed for text extraction
pub const DEFAULT_BLOCK_PATTERNS: &[&str] = &[
    "googletagmanager",
    "google-analytics",
    "hotjar",
    "doubleclick",
    ".png",
    ".jpg",
    ".jpeg",
    ".gif",
    ".svg",
    ".webp",
    ".woff",
    ".woff2",
    ".ttf",
    ".otf",
    ".mp4",
    ".mp3",
];

/// Resource kinds dropped regardless of URL
pub const DEFAULT_BLOCKED_KINDS: &[ResourceKind] =
    &[ResourceKind::Image, ResourceKind::Media, ResourceKind::Font];

/// Decides which sub-resource requests are aborted
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetworkFilter {
    patterns: Vec<String>,
    blocked_kinds: Vec<ResourceKind>,
}

impl Default for NetworkFilter {
    fn default() -> Self {
        Self::new(
            DEFAULT_BLOCK_PATTERNS.iter().map(|p| p.to_string()).collect(),
            DEFAULT_BLOCKED_KINDS.to_vec(),
        )
    }
}

impl NetworkFilter {
    /// Patterns are matched case-insensitively as substrings of the URL
    pub fn new(patterns: Vec<String>, blocked_kinds: Vec<ResourceKind>) -> Self {
        Self {
            patterns: patterns.into_iter().map(|p| p.to_lowercase()).collect(),
            blocked_kinds,
        }
    }

    /// A filter that lets everything through
    pub fn allow_all() -> Self {
        Self::new(Vec::new(), Vec::new())
    }

    /// Block when the kind is blocked or the URL contains any pattern
    pub fn should_block(&self, request: &RequestInfo) -> bool {
        if self.blocked_kinds.contains(&request.kind) {
            return true;
        }
        let url = request.url.to_lowercase();
        self.patterns.iter().any(|p| url.contains(p.as_str()))
    }

    pub fn patterns(&self) -> &[String] {
        &self.patterns
    }
}
