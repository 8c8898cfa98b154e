//! Markdown processing pipeline: title → links → cleanup.

use std::sync::Arc;
use std::sync::LazyLock;

use regex::Regex;
use url::Url;

use docsweep_shared::{DocsweepError, Fetcher, ProcessedContent, RawContent, Result};

use crate::ContentPipeline;
use crate::cleanup;
use crate::context::{PipelineOptions, ProcessingContext};
use crate::dispatcher::{Next, Stage};

/// Pipeline for `text/markdown` and plain-text pages.
pub struct MarkdownPipeline {
    stages: Vec<Arc<dyn Stage>>,
}

impl MarkdownPipeline {
    pub fn new() -> Self {
        Self {
            stages: vec![
                Arc::new(MarkdownTitleStage),
                Arc::new(MarkdownLinkStage),
                Arc::new(MarkdownCleanupStage),
            ],
        }
    }
}

impl Default for MarkdownPipeline {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl ContentPipeline for MarkdownPipeline {
    fn name(&self) -> &'static str {
        "markdown"
    }

    fn can_process(&self, mime_type: &str) -> bool {
        matches!(
            mime_type,
            "text/markdown" | "text/x-markdown" | "text/plain"
        )
    }

    async fn process(
        &self,
        raw: &RawContent,
        options: &PipelineOptions,
        fetcher: Option<Arc<dyn Fetcher>>,
    ) -> ProcessedContent {
        crate::run_stages(&self.stages, raw, options, fetcher).await
    }
}

// ---------------------------------------------------------------------------
// Title stage
// ---------------------------------------------------------------------------

/// Takes the page title from the first H1. Fail-open: a heading-less page
/// simply has no title.
struct MarkdownTitleStage;

#[async_trait::async_trait]
impl Stage for MarkdownTitleStage {
    fn name(&self) -> &'static str {
        "markdown-title"
    }

    async fn process(&self, ctx: &mut ProcessingContext, next: &mut Next) -> Result<()> {
        static H1_RE: LazyLock<Regex> =
            LazyLock::new(|| Regex::new(r"(?m)^#\s+(.+)$").expect("valid regex"));

        if let Some(caps) = H1_RE.captures(&ctx.content) {
            let title = caps[1].trim().to_string();
            ctx.metadata.insert("title".into(), serde_json::json!(title));
        }
        next.proceed()
    }
}

// ---------------------------------------------------------------------------
// Link stage
// ---------------------------------------------------------------------------

/// Extracts inline links and autolinks, resolved against the page URL.
/// Image embeds are not navigation targets and are skipped. Fail-open: an
/// unresolvable page URL degrades to zero links.
struct MarkdownLinkStage;

#[async_trait::async_trait]
impl Stage for MarkdownLinkStage {
    fn name(&self) -> &'static str {
        "markdown-links"
    }

    async fn process(&self, ctx: &mut ProcessingContext, next: &mut Next) -> Result<()> {
        let base = match Url::parse(&ctx.source_url) {
            Ok(base) => base,
            Err(err) => {
                ctx.record_error(DocsweepError::stage(
                    self.name(),
                    format!("invalid page URL '{}': {err}", ctx.source_url),
                ));
                return next.proceed();
            }
        };

        for target in link_targets(&ctx.content) {
            if let Ok(mut resolved) = base.join(&target) {
                resolved.set_fragment(None);
                ctx.add_link(resolved.to_string());
            }
        }
        next.proceed()
    }
}

/// Raw link targets in document order: `[text](target)` inline links (image
/// embeds excluded) and `<scheme://...>` autolinks.
fn link_targets(md: &str) -> Vec<String> {
    static INLINE_RE: LazyLock<Regex> = LazyLock::new(|| {
        Regex::new(r"(!?)\[[^\]]*\]\(\s*<?([^)<>\s]+)>?[^)]*\)").expect("valid regex")
    });
    static AUTO_RE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"<(https?://[^>\s]+)>").expect("valid regex"));

    let mut targets = Vec::new();

    for caps in INLINE_RE.captures_iter(md) {
        if &caps[1] == "!" {
            continue;
        }
        let target = &caps[2];
        if target.starts_with('#') || target.starts_with("mailto:") {
            continue;
        }
        targets.push(target.to_string());
    }

    for caps in AUTO_RE.captures_iter(md) {
        targets.push(caps[1].to_string());
    }

    targets
}

// ---------------------------------------------------------------------------
// Cleanup stage
// ---------------------------------------------------------------------------

/// Applies the Markdown cleanup passes. Fail-open by construction: the
/// passes are total functions over the text. Shared with the HTML pipeline,
/// which runs it after conversion.
pub(crate) struct MarkdownCleanupStage;

#[async_trait::async_trait]
impl Stage for MarkdownCleanupStage {
    fn name(&self) -> &'static str {
        "markdown-cleanup"
    }

    async fn process(&self, ctx: &mut ProcessingContext, next: &mut Next) -> Result<()> {
        ctx.content = cleanup::run_passes(&ctx.content);
        next.proceed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(md: &str) -> RawContent {
        RawContent {
            bytes: md.as_bytes().to_vec(),
            mime_type: "text/markdown".into(),
            charset: None,
            source_url: "https://docs.example.com/guide/intro.md".into(),
        }
    }

    async fn process(md: &str) -> ProcessedContent {
        let pipeline = MarkdownPipeline::new();
        pipeline
            .process(&raw(md), &PipelineOptions::default(), None)
            .await
    }

    #[tokio::test]
    async fn extracts_title_from_first_h1() {
        let result = process("# Getting Started\n\nSome intro text.\n").await;
        assert!(result.errors.is_empty());
        assert_eq!(result.title(), Some("Getting Started"));
    }

    #[tokio::test]
    async fn no_heading_means_no_title() {
        let result = process("Just a paragraph.\n").await;
        assert_eq!(result.title(), None);
        assert!(result.errors.is_empty());
    }

    #[tokio::test]
    async fn resolves_relative_links() {
        let md = "# T\n\nSee [the next page](next.md) and [the API](/api/reference).\n";
        let result = process(md).await;

        assert_eq!(
            result.links,
            vec![
                "https://docs.example.com/guide/next.md",
                "https://docs.example.com/api/reference",
            ]
        );
    }

    #[tokio::test]
    async fn skips_images_and_fragments() {
        let md = "![diagram](arch.png)\n[anchor](#section)\n[ok](page.md)\n";
        let result = process(md).await;
        assert_eq!(result.links, vec!["https://docs.example.com/guide/page.md"]);
    }

    #[tokio::test]
    async fn collects_autolinks() {
        let md = "Visit <https://example.org/docs> for more.\n";
        let result = process(md).await;
        assert_eq!(result.links, vec!["https://example.org/docs"]);
    }

    #[tokio::test]
    async fn link_with_title_attribute() {
        let md = "[ref](page.md \"The page\")\n";
        let result = process(md).await;
        assert_eq!(result.links, vec!["https://docs.example.com/guide/page.md"]);
    }

    #[tokio::test]
    async fn cleanup_normalizes_blank_runs() {
        let result = process("# T\n\n\n\n\n\ntext\n\n\n").await;
        assert_eq!(result.content, "# T\n\n\ntext\n");
    }

    #[tokio::test]
    async fn plain_text_is_accepted() {
        let pipeline = MarkdownPipeline::new();
        assert!(pipeline.can_process("text/plain"));
        assert!(pipeline.can_process("text/markdown"));
        assert!(!pipeline.can_process("text/html"));
    }
}
