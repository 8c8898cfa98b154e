//! Core data types passed between fetchers, pipelines, and the crawl engine.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::DocsweepError;

// ---------------------------------------------------------------------------
// RawContent
// ---------------------------------------------------------------------------

/// The raw payload of a single fetched page, as produced by a [`Fetcher`].
///
/// Consumed exactly once by pipeline selection; the declared MIME type and
/// charset come from the transport (Content-Type header or file extension)
/// and may disagree with the actual bytes.
///
/// [`Fetcher`]: crate::Fetcher
#[derive(Debug, Clone)]
pub struct RawContent {
    /// Undecoded response body.
    pub bytes: Vec<u8>,
    /// Declared MIME type, without parameters (e.g. `text/html`).
    pub mime_type: String,
    /// Declared charset label, if the transport provided one.
    pub charset: Option<String>,
    /// Final URL the content was fetched from (after redirects).
    pub source_url: String,
}

// ---------------------------------------------------------------------------
// ProcessedContent
// ---------------------------------------------------------------------------

/// The immutable result of running one pipeline over a fetched page.
///
/// The page title, when one was extracted, travels in `metadata["title"]`.
#[derive(Debug, Clone, Default)]
pub struct ProcessedContent {
    /// Normalized text content (Markdown for HTML pages, cleaned Markdown
    /// for Markdown pages, the original text for JSON).
    pub content: String,
    /// Format-specific metadata populated by the stages.
    pub metadata: HashMap<String, serde_json::Value>,
    /// Discovered links, in document order, de-duplicated.
    pub links: Vec<String>,
    /// Errors accumulated during processing. Non-empty does not mean the
    /// content is unusable; fail-open stages degrade instead of aborting.
    pub errors: Vec<DocsweepError>,
}

impl ProcessedContent {
    /// The extracted page title, if any stage recorded one.
    pub fn title(&self) -> Option<&str> {
        self.metadata.get("title").and_then(|v| v.as_str())
    }
}

// ---------------------------------------------------------------------------
// RenderMode
// ---------------------------------------------------------------------------

/// How HTML pages are obtained before parsing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RenderMode {
    /// Use the fetched bytes as-is.
    #[default]
    Static,
    /// Run the page through the shared renderer first so script-generated
    /// markup is visible to the later stages.
    Scripted,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn title_reads_from_metadata() {
        let mut processed = ProcessedContent::default();
        assert_eq!(processed.title(), None);

        processed
            .metadata
            .insert("title".into(), serde_json::json!("Getting Started"));
        assert_eq!(processed.title(), Some("Getting Started"));
    }

    #[test]
    fn render_mode_deserializes_lowercase() {
        let mode: RenderMode = serde_json::from_str("\"scripted\"").expect("parse");
        assert_eq!(mode, RenderMode::Scripted);
    }
}
