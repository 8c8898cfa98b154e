//! The mutable record threaded through one pipeline run.

use std::collections::HashMap;
use std::sync::Arc;

use docsweep_shared::{DocsweepError, Fetcher, ProcessedContent, RenderMode};

/// Options a pipeline run needs from the caller.
#[derive(Debug, Clone, Default)]
pub struct PipelineOptions {
    /// How HTML pages are obtained before parsing.
    pub render_mode: RenderMode,
}

/// Mutable state shared by all stages of one pipeline invocation.
///
/// Exclusively owned by that invocation — never shared across concurrent
/// fetches, so stages need no locking. Created at pipeline entry and
/// consumed into a [`ProcessedContent`] when the run finishes.
pub struct ProcessingContext {
    /// Page content, mutated in place by the stages (HTML in, Markdown out).
    pub content: String,
    /// The URL the content was fetched from; links resolve against this.
    pub source_url: String,
    /// Format-specific metadata accumulated by the stages.
    pub metadata: HashMap<String, serde_json::Value>,
    /// Discovered links in document order, de-duplicated on insert.
    pub links: Vec<String>,
    /// Errors accumulated by fail-open stages and the dispatcher boundary.
    pub errors: Vec<DocsweepError>,
    /// Caller options.
    pub options: PipelineOptions,
    /// Transport handle for stages that need follow-up fetches.
    pub fetcher: Option<Arc<dyn Fetcher>>,
}

impl ProcessingContext {
    /// Create a context for one pipeline run.
    pub fn new(content: String, source_url: impl Into<String>, options: PipelineOptions) -> Self {
        Self {
            content,
            source_url: source_url.into(),
            metadata: HashMap::new(),
            links: Vec::new(),
            errors: Vec::new(),
            options,
            fetcher: None,
        }
    }

    /// Record a discovered link, keeping document order and dropping
    /// duplicates.
    pub fn add_link(&mut self, link: impl Into<String>) {
        let link = link.into();
        if !self.links.iter().any(|l| *l == link) {
            self.links.push(link);
        }
    }

    /// Record an error without aborting the run (fail-open convention).
    pub fn record_error(&mut self, error: DocsweepError) {
        tracing::debug!(url = %self.source_url, %error, "stage recorded error");
        self.errors.push(error);
    }

    /// Consume the context into the immutable result.
    pub fn into_processed(self) -> ProcessedContent {
        ProcessedContent {
            content: self.content,
            metadata: self.metadata,
            links: self.links,
            errors: self.errors,
        }
    }
}
