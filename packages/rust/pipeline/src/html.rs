//! HTML processing pipeline: render → links → extract → Markdown → cleanup.

use std::sync::Arc;

use scraper::{Html, Selector};
use url::Url;

use docsweep_shared::{DocsweepError, Fetcher, ProcessedContent, RawContent, RenderMode, Result};

use crate::ContentPipeline;
use crate::context::{PipelineOptions, ProcessingContext};
use crate::dispatcher::{Next, Stage};
use crate::markdown::MarkdownCleanupStage;
use crate::render::SharedRenderer;

/// Pipeline for `text/html` and `application/xhtml+xml` pages.
pub struct HtmlPipeline {
    renderer: Option<Arc<SharedRenderer>>,
    stages: Vec<Arc<dyn Stage>>,
}

impl HtmlPipeline {
    /// Build the pipeline; `renderer` backs the scripted render stage.
    pub fn new(renderer: Option<Arc<SharedRenderer>>) -> Self {
        Self {
            renderer,
            stages: vec![
                Arc::new(HtmlLinkStage),
                Arc::new(HtmlExtractStage),
                Arc::new(HtmlToMarkdownStage),
                Arc::new(MarkdownCleanupStage),
            ],
        }
    }

    fn stage_list(&self, options: &PipelineOptions) -> Vec<Arc<dyn Stage>> {
        let mut stages: Vec<Arc<dyn Stage>> = Vec::with_capacity(self.stages.len() + 1);
        if options.render_mode == RenderMode::Scripted {
            if let Some(renderer) = &self.renderer {
                stages.push(Arc::new(RenderStage {
                    renderer: renderer.clone(),
                }));
            }
        }
        stages.extend(self.stages.iter().cloned());
        stages
    }
}

#[async_trait::async_trait]
impl ContentPipeline for HtmlPipeline {
    fn name(&self) -> &'static str {
        "html"
    }

    fn can_process(&self, mime_type: &str) -> bool {
        matches!(mime_type, "text/html" | "application/xhtml+xml")
    }

    async fn process(
        &self,
        raw: &RawContent,
        options: &PipelineOptions,
        fetcher: Option<Arc<dyn Fetcher>>,
    ) -> ProcessedContent {
        let stages = self.stage_list(options);
        crate::run_stages(&stages, raw, options, fetcher).await
    }

    async fn close(&self) {
        if let Some(renderer) = &self.renderer {
            renderer.close().await;
        }
    }
}

// ---------------------------------------------------------------------------
// Render stage (scripted mode only)
// ---------------------------------------------------------------------------

/// Runs the page through the shared renderer so script-generated markup is
/// visible downstream. Fail-open: a failed render leaves the static markup
/// in place.
struct RenderStage {
    renderer: Arc<SharedRenderer>,
}

#[async_trait::async_trait]
impl Stage for RenderStage {
    fn name(&self) -> &'static str {
        "html-render"
    }

    async fn process(&self, ctx: &mut ProcessingContext, next: &mut Next) -> Result<()> {
        let rendered = match self.renderer.get().await {
            Ok(renderer) => renderer.render(&ctx.source_url, &ctx.content).await,
            Err(err) => Err(err),
        };

        match rendered {
            Ok(html) => ctx.content = html,
            Err(err) => {
                ctx.record_error(DocsweepError::stage(self.name(), err.to_string()));
            }
        }
        next.proceed()
    }
}

// ---------------------------------------------------------------------------
// Link extraction stage
// ---------------------------------------------------------------------------

/// Extracts anchors from the full document, resolved against the page URL.
/// Fail-open: an unresolvable base URL degrades to zero links.
struct HtmlLinkStage;

#[async_trait::async_trait]
impl Stage for HtmlLinkStage {
    fn name(&self) -> &'static str {
        "html-links"
    }

    async fn process(&self, ctx: &mut ProcessingContext, next: &mut Next) -> Result<()> {
        match Url::parse(&ctx.source_url) {
            Ok(base) => {
                for link in extract_links(&ctx.content, &base) {
                    ctx.add_link(link);
                }
            }
            Err(err) => {
                ctx.record_error(DocsweepError::stage(
                    self.name(),
                    format!("invalid page URL '{}': {err}", ctx.source_url),
                ));
            }
        }
        next.proceed()
    }
}

/// Extract all anchor targets from a document, resolved against the base URL.
fn extract_links(html: &str, base_url: &Url) -> Vec<String> {
    let doc = Html::parse_document(html);
    let link_sel = Selector::parse("a[href]").expect("valid selector");
    let mut links = Vec::new();

    for el in doc.select(&link_sel) {
        if let Some(href) = el.value().attr("href") {
            // Skip anchors, javascript:, mailto:
            if href.starts_with('#')
                || href.starts_with("javascript:")
                || href.starts_with("mailto:")
            {
                continue;
            }

            if let Ok(mut resolved) = base_url.join(href) {
                resolved.set_fragment(None);
                links.push(resolved.to_string());
            }
        }
    }

    links
}

// ---------------------------------------------------------------------------
// Content extraction stage
// ---------------------------------------------------------------------------

/// Extracts the main content container and the page title, stripping
/// nav/header/footer chrome. Fail-closed: with no content to extract, every
/// later stage is meaningless.
struct HtmlExtractStage;

#[async_trait::async_trait]
impl Stage for HtmlExtractStage {
    fn name(&self) -> &'static str {
        "html-extract"
    }

    async fn process(&self, ctx: &mut ProcessingContext, next: &mut Next) -> Result<()> {
        let (content, title) = extract_content(&ctx.content)
            .ok_or_else(|| DocsweepError::stage(self.name(), "document has no content"))?;

        ctx.content = content;
        if let Some(title) = title {
            ctx.metadata.insert("title".into(), serde_json::json!(title));
        }
        next.proceed()
    }
}

/// Extract the main content HTML and title from a full document.
///
/// Tries known documentation content containers in priority order, falling
/// back to `<body>`. Returns `None` when there is nothing to extract.
fn extract_content(html: &str) -> Option<(String, Option<String>)> {
    let doc = Html::parse_document(html);

    let title = extract_title(&doc);

    // Known content containers in priority order
    let selectors = [
        "article .markdown",  // Docusaurus
        ".vp-doc",            // VitePress
        ".markdown-section",  // GitBook
        "[role=\"main\"]",    // ReadTheDocs / generic
        "article",            // Common
        "main",               // HTML5 semantic
        ".content",           // Generic
    ];

    for sel_str in &selectors {
        if let Ok(selector) = Selector::parse(sel_str) {
            if let Some(el) = doc.select(&selector).next() {
                return Some((el.inner_html(), title));
            }
        }
    }

    let body_sel = Selector::parse("body").expect("valid selector");
    let body = doc.select(&body_sel).next()?;

    let content = body.inner_html();
    if content.trim().is_empty() && title.is_none() {
        return None;
    }
    Some((content, title))
}

/// First H1 text, falling back to the `<title>` element.
fn extract_title(doc: &Html) -> Option<String> {
    let h1_sel = Selector::parse("h1").expect("valid selector");
    if let Some(el) = doc.select(&h1_sel).next() {
        let text = el.text().collect::<String>().trim().to_string();
        if !text.is_empty() {
            return Some(text);
        }
    }

    let title_sel = Selector::parse("title").expect("valid selector");
    doc.select(&title_sel)
        .next()
        .map(|el| el.text().collect::<String>().trim().to_string())
        .filter(|t| !t.is_empty())
}

// ---------------------------------------------------------------------------
// Markdown conversion stage
// ---------------------------------------------------------------------------

/// Converts the extracted content HTML to Markdown via `htmd`, with tables
/// pre-converted to Markdown syntax. Fail-closed: a failed conversion leaves
/// nothing for cleanup to work on.
struct HtmlToMarkdownStage;

#[async_trait::async_trait]
impl Stage for HtmlToMarkdownStage {
    fn name(&self) -> &'static str {
        "html-to-markdown"
    }

    async fn process(&self, ctx: &mut ProcessingContext, next: &mut Next) -> Result<()> {
        let content = preprocess_tables(&ctx.content);

        let converter = htmd::HtmlToMarkdown::builder()
            .skip_tags(vec!["script", "style", "nav", "iframe", "noscript", "svg"])
            .build();

        ctx.content = converter
            .convert(&content)
            .map_err(|e| DocsweepError::stage(self.name(), format!("conversion failed: {e}")))?;

        next.proceed()
    }
}

/// Convert HTML `<table>` elements to Markdown table syntax before the htmd
/// conversion, which does not handle tables itself.
fn preprocess_tables(html: &str) -> String {
    let doc = Html::parse_fragment(html);
    let table_sel = Selector::parse("table").expect("valid selector");

    if doc.select(&table_sel).next().is_none() {
        return html.to_string();
    }

    let mut result = html.to_string();
    for table_el in doc.select(&table_sel) {
        let table_html = table_el.html();
        let md_table = html_table_to_markdown(&table_el);
        result = result.replacen(&table_html, &md_table, 1);
    }

    result
}

/// Convert a single HTML table element to a Markdown table string.
fn html_table_to_markdown(table: &scraper::ElementRef) -> String {
    let tr_sel = Selector::parse("tr").expect("valid selector");
    let th_sel = Selector::parse("th").expect("valid selector");
    let td_sel = Selector::parse("td").expect("valid selector");

    let mut rows: Vec<Vec<String>> = Vec::new();
    let mut has_header = false;

    for tr in table.select(&tr_sel) {
        let ths: Vec<String> = tr
            .select(&th_sel)
            .map(|cell| cell.text().collect::<String>().trim().to_string())
            .collect();

        if !ths.is_empty() {
            has_header = true;
            rows.push(ths);
            continue;
        }

        let tds: Vec<String> = tr
            .select(&td_sel)
            .map(|cell| cell.text().collect::<String>().trim().to_string())
            .collect();

        if !tds.is_empty() {
            rows.push(tds);
        }
    }

    if rows.is_empty() {
        return String::new();
    }

    let col_count = rows.iter().map(|r| r.len()).max().unwrap_or(0);
    if col_count == 0 {
        return String::new();
    }

    for row in &mut rows {
        while row.len() < col_count {
            row.push(String::new());
        }
    }

    let mut md = String::from("\n\n");

    md.push_str("| ");
    md.push_str(&rows[0].join(" | "));
    md.push_str(" |\n");

    md.push_str("| ");
    md.push_str(&(0..col_count).map(|_| "---").collect::<Vec<_>>().join(" | "));
    md.push_str(" |\n");

    let data_start = if has_header { 1 } else { 0 };
    for row in &rows[data_start..] {
        md.push_str("| ");
        md.push_str(&row.join(" | "));
        md.push_str(" |\n");
    }

    md.push('\n');
    md
}
