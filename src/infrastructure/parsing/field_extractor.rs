//! Generic field extraction driven by [`FieldSpec`](super::field_spec::FieldSpec).
//!
//! Every operation here returns an optional value; a missing node, an
//! unreadable page or a timeout all collapse to `None`.

use scraper::{ElementRef, Html, Selector};
use std::time::Duration;
use tokio::time::{sleep, timeout};
use tracing::debug;

use super::field_spec::CompiledFieldSpec;
use crate::infrastructure::browser::BrowserPage;
use crate::infrastructure::config::TimingConfig;

/// Trim, turn line breaks into spaces, drop double quotes and collapse whitespace
pub fn clean_text(raw: &str) -> String {
    raw.split(|c: char| c.is_whitespace() || c == '"')
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

fn non_empty(text: String) -> Option<String> {
    if text.is_empty() { None } else { Some(text) }
}

fn node_text(node: &ElementRef<'_>) -> String {
    clean_text(&node.text().collect::<String>())
}

/// Value part of a "label: value" text; the whole text when there is no separator
fn strip_label(text: &str, label: &str) -> Option<String> {
    let value = match text.split_once(':') {
        Some((_, value)) => value,
        None => text.get(label.len()..).unwrap_or(""),
    };
    non_empty(value.trim().to_string())
}

fn read_node(node: &ElementRef<'_>, spec: &CompiledFieldSpec) -> Option<String> {
    if let Some(sub) = &spec.sub_selector {
        if let Some(child) = node.select(sub).next() {
            if let Some(value) = non_empty(node_text(&child)) {
                return Some(value);
            }
        }
    }

    let text = node_text(node);
    match &spec.label_prefix {
        Some(label) => strip_label(&text, label),
        None => non_empty(text),
    }
}

/// Look a field up in a parsed document.
///
/// Returns `None` when the selector matches nothing (the caller may keep
/// waiting), `Some(None)` when it matches but the field has no value.
pub fn lookup_in_document(document: &Html, spec: &CompiledFieldSpec) -> Option<Option<String>> {
    let nodes: Vec<ElementRef<'_>> = document.select(&spec.selector).collect();
    if nodes.is_empty() {
        return None;
    }

    let target = match &spec.label_prefix {
        Some(label) => nodes
            .iter()
            .find(|node| node_text(node).to_lowercase().starts_with(label.as_str())),
        None => spec.index.resolve(nodes.len()).and_then(|i| nodes.get(i)),
    };

    Some(target.and_then(|node| read_node(node, spec)))
}

/// Extract a field from a serialized page
pub fn extract_from_html(html: &str, spec: &CompiledFieldSpec) -> Option<String> {
    let document = Html::parse_document(html);
    lookup_in_document(&document, spec).flatten()
}

/// Every non-empty match of the field's selector, cleaned, in document order
pub fn extract_all_from_html(html: &str, spec: &CompiledFieldSpec) -> Vec<String> {
    let document = Html::parse_document(html);
    document
        .select(&spec.selector)
        .filter_map(|node| read_node(&node, spec))
        .collect()
}

/// Whether any node in `html` matches `selector`
pub fn has_match(html: &str, selector: &Selector) -> bool {
    Html::parse_document(html).select(selector).next().is_some()
}

/// Reads fields from a live page, waiting a bounded time for them to render
#[derive(Debug, Clone, Copy)]
pub struct FieldExtractor {
    selector_timeout: Duration,
    poll_interval: Duration,
}

impl FieldExtractor {
    pub const fn new(selector_timeout: Duration, poll_interval: Duration) -> Self {
        Self {
            selector_timeout,
            poll_interval,
        }
    }

    pub const fn from_timing(timing: &TimingConfig) -> Self {
        Self::new(timing.selector_timeout(), timing.poll_interval())
    }

    pub const fn selector_timeout(&self) -> Duration {
        self.selector_timeout
    }

    /// Poll the page until `check` decides, or the selector timeout passes.
    ///
    /// `check` gets each DOM snapshot and returns `None` to keep waiting.
    /// A failed content read ends the wait at once.
    async fn poll<T, F>(&self, page: &dyn BrowserPage, wait: Duration, check: F) -> Option<T>
    where
        F: Fn(&str) -> Option<T> + Send + Sync,
        T: Send,
    {
        let attempt = async {
            loop {
                let html = match page.content().await {
                    Ok(html) => html,
                    Err(e) => {
                        debug!("Page content unavailable: {}", e);
                        return None;
                    }
                };
                if let Some(found) = check(&html) {
                    return Some(found);
                }
                sleep(self.poll_interval).await;
            }
        };

        timeout(wait, attempt).await.ok().flatten()
    }

    /// Wait until `selector` matches something; `false` after the timeout
    pub async fn wait_for_selector(&self, page: &dyn BrowserPage, selector: &Selector, wait: Duration) -> bool {
        self.poll(page, wait, |html| has_match(html, selector).then_some(()))
            .await
            .is_some()
    }

    /// Extract one field, waiting for its selector to appear
    pub async fn extract(&self, page: &dyn BrowserPage, spec: &CompiledFieldSpec) -> Option<String> {
        let value = self
            .poll(page, self.selector_timeout, |html| {
                let document = Html::parse_document(html);
                lookup_in_document(&document, spec)
            })
            .await
            .flatten();

        if value.is_none() {
            debug!("Field absent: {}", spec.source());
        }
        value
    }

    /// Extract every match of a list field, waiting for the first to appear
    pub async fn extract_all(&self, page: &dyn BrowserPage, spec: &CompiledFieldSpec) -> Vec<String> {
        self.poll(page, self.selector_timeout, |html| {
            let values = extract_all_from_html(html, spec);
            (!values.is_empty()).then_some(values)
        })
        .await
        .unwrap_or_default()
    }
}
