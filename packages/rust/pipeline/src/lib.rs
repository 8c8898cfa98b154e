//! Format-specific processing pipelines over a shared middleware dispatcher.
//!
//! Each pipeline declares the MIME types it handles via [`ContentPipeline::can_process`],
//! decodes raw bytes charset-aware, and runs its fixed stage list over one
//! [`ProcessingContext`] per page. The crawl engine holds an ordered
//! [`PipelineRegistry`] and picks the first pipeline that accepts a page's
//! declared MIME type.

mod cleanup;
mod context;
mod decode;
mod dispatcher;
mod html;
mod json;
mod markdown;
mod render;

pub use context::{PipelineOptions, ProcessingContext};
pub use decode::{charset_from_content_type, decode_bytes, mime_from_content_type};
pub use dispatcher::{Next, Stage, dispatch};
pub use html::HtmlPipeline;
pub use json::JsonPipeline;
pub use markdown::MarkdownPipeline;
pub use render::{PageRenderer, RendererFactory, SharedRenderer};

use std::sync::Arc;

use docsweep_shared::{Fetcher, ProcessedContent, RawContent};

// ---------------------------------------------------------------------------
// Trait
// ---------------------------------------------------------------------------

/// A format-specific processing pipeline.
#[async_trait::async_trait]
pub trait ContentPipeline: Send + Sync {
    /// Pipeline name for tracing and error messages.
    fn name(&self) -> &'static str;

    /// Whether this pipeline handles the declared MIME type.
    fn can_process(&self, mime_type: &str) -> bool;

    /// Decode and process one fetched page into a [`ProcessedContent`].
    ///
    /// Stage failures are contained in the result's `errors` list; this
    /// never fails outright.
    async fn process(
        &self,
        raw: &RawContent,
        options: &PipelineOptions,
        fetcher: Option<Arc<dyn Fetcher>>,
    ) -> ProcessedContent;

    /// Release any long-lived resources (e.g. a shared rendering engine).
    async fn close(&self) {}
}

// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

/// Holds pipelines in priority order; the first `can_process` match wins.
pub struct PipelineRegistry {
    pipelines: Vec<Arc<dyn ContentPipeline>>,
}

impl PipelineRegistry {
    /// Create a registry with the built-in pipelines (HTML, Markdown, JSON).
    ///
    /// `renderer` enables the HTML pipeline's scripted render stage when the
    /// caller asks for it.
    pub fn new(renderer: Option<Arc<SharedRenderer>>) -> Self {
        Self {
            pipelines: vec![
                Arc::new(HtmlPipeline::new(renderer)),
                Arc::new(MarkdownPipeline::new()),
                Arc::new(JsonPipeline::new()),
            ],
        }
    }

    /// Create a registry from an explicit pipeline list, in priority order.
    pub fn with_pipelines(pipelines: Vec<Arc<dyn ContentPipeline>>) -> Self {
        Self { pipelines }
    }

    /// Select the first pipeline accepting the MIME type.
    pub fn select(&self, mime_type: &str) -> Option<&Arc<dyn ContentPipeline>> {
        self.pipelines.iter().find(|p| p.can_process(mime_type))
    }

    /// Close every pipeline, releasing shared resources.
    pub async fn close_all(&self) {
        for pipeline in &self.pipelines {
            pipeline.close().await;
        }
    }
}

impl Default for PipelineRegistry {
    fn default() -> Self {
        Self::new(None)
    }
}

/// Decode a raw page and run a stage list over it — the shared body of every
/// pipeline's `process`.
pub(crate) async fn run_stages(
    stages: &[Arc<dyn Stage>],
    raw: &RawContent,
    options: &PipelineOptions,
    fetcher: Option<Arc<dyn Fetcher>>,
) -> ProcessedContent {
    let text = decode::decode_bytes(&raw.bytes, raw.charset.as_deref());
    let mut ctx = ProcessingContext::new(text, raw.source_url.clone(), options.clone());
    ctx.fetcher = fetcher;

    dispatch(stages, &mut ctx).await;
    ctx.into_processed()
}
