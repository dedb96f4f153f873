use std::collections::{BTreeMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::crawler::url::NormalizedUrl;

/// Heading levels captured in [`Metadata::headers`].
pub const HEADING_LEVELS: [&str; 6] = ["h1", "h2", "h3", "h4", "h5", "h6"];

/// An anchor discovered on a rendered page
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Link {
    /// Resolved and normalized target
    pub url: NormalizedUrl,

    /// Trimmed anchor text
    pub anchor_text: String,

    /// Target host equals the seed host
    pub is_internal: bool,
}

/// Page-level metadata extracted after rendering
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Metadata {
    /// Document title
    pub title: String,

    /// `name`/`property` -> `content` for every meta element carrying both
    pub meta_tags: BTreeMap<String, String>,

    /// `h1`..`h6` -> non-empty heading texts in document order
    pub headers: BTreeMap<String, Vec<String>>,
}

/// Structured result for one successfully visited page
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRecord {
    /// Normalized URL of the page
    pub url: NormalizedUrl,

    /// Title, meta tags and headings
    pub metadata: Metadata,

    /// Visible body text, trimmed
    pub content_text: String,

    /// Serialized markup after rendering
    pub content_html: String,

    /// Distinct internal link targets in discovery order
    pub internal_links: Vec<NormalizedUrl>,

    /// Distinct external link targets in discovery order
    pub external_links: Vec<NormalizedUrl>,
}

impl PageRecord {
    /// Build a record, splitting the page's links into internal and
    /// external sets.
    pub fn new(
        url: NormalizedUrl,
        metadata: Metadata,
        content_text: String,
        content_html: String,
        links: &[Link],
    ) -> Self {
        let mut seen = HashSet::new();
        let mut internal_links = Vec::new();
        let mut external_links = Vec::new();

        for link in links {
            if !seen.insert(&link.url) {
                continue;
            }
            if link.is_internal {
                internal_links.push(link.url.clone());
            } else {
                external_links.push(link.url.clone());
            }
        }

        Self {
            url,
            metadata,
            content_text,
            content_html,
            internal_links,
            external_links,
        }
    }
}
