//! The crawl engine: frontier management, bounded concurrency, pipeline
//! selection, and result aggregation.
//!
//! Each URL moves through queued → fetching → processing → completed or
//! failed; the engine as a whole runs until the frontier drains, a limit is
//! reached, or the cancellation token fires, then drains in-flight work and
//! returns whatever completed.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;
use std::time::{Duration, Instant};

use sha2::{Digest, Sha256};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};
use url::Url;

use docsweep_filter::PatternFilter;
use docsweep_pipeline::{PipelineOptions, PipelineRegistry};
use docsweep_shared::{
    DocsweepError, FetchOptions, Fetcher, ProcessedContent, Result, ScrapeOptions,
};

use crate::fetcher::DefaultFetcher;
use crate::scope::CrawlScope;

// ---------------------------------------------------------------------------
// Results
// ---------------------------------------------------------------------------

/// One crawled page in the aggregated result.
#[derive(Debug, Clone)]
pub struct PageRecord {
    /// Final page URL (after redirects).
    pub url: String,
    /// Crawl depth the page was discovered at (seed = 0).
    pub depth: u32,
    /// Extracted page title, if any.
    pub title: Option<String>,
    /// Normalized text content.
    pub content: String,
    /// SHA-256 hash of the content, hex encoded.
    pub content_hash: String,
    /// Links discovered on the page (absolute, document order).
    pub links: Vec<String>,
    /// Pipeline metadata for the page.
    pub metadata: HashMap<String, serde_json::Value>,
    /// Errors recorded while fetching or processing the page.
    pub errors: Vec<DocsweepError>,
}

/// Summary of a completed (or cancelled) crawl.
#[derive(Debug, Clone)]
pub struct ScrapeResult {
    /// Per-page results in completion order.
    pub pages: Vec<PageRecord>,
    /// Number of pages successfully fetched (processing errors included).
    pub pages_fetched: usize,
    /// Number of pages whose fetch failed.
    pub pages_failed: usize,
    /// Discovered links dropped by scheme, scope, patterns, or depth.
    pub links_skipped: usize,
    /// Whether the crawl stopped on cancellation.
    pub cancelled: bool,
    /// Total crawl duration.
    pub duration: Duration,
}

// ---------------------------------------------------------------------------
// Progress
// ---------------------------------------------------------------------------

/// Progress callback invoked after every fetch attempt.
pub trait ProgressReporter: Send + Sync {
    /// A page was fetched (successfully). `completed` and `discovered` are
    /// the running totals.
    fn page_fetched(&self, url: &str, completed: usize, discovered: usize);

    /// A page's fetch failed.
    fn page_failed(&self, url: &str, error: &DocsweepError, completed: usize, discovered: usize);
}

/// No-op progress reporter for headless/test usage.
pub struct SilentProgress;

impl ProgressReporter for SilentProgress {
    fn page_fetched(&self, _url: &str, _completed: usize, _discovered: usize) {}
    fn page_failed(
        &self,
        _url: &str,
        _error: &DocsweepError,
        _completed: usize,
        _discovered: usize,
    ) {
    }
}

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

/// Outcome of one fetch+process task.
enum TaskOutcome {
    Fetched {
        depth: u32,
        final_url: String,
        processed: ProcessedContent,
    },
    FetchFailed {
        url: Url,
        depth: u32,
        error: DocsweepError,
    },
}

/// Concurrent, scope-aware crawl driver.
pub struct CrawlEngine {
    fetcher: Arc<dyn Fetcher>,
    registry: Arc<PipelineRegistry>,
    cancel: CancellationToken,
}

impl CrawlEngine {
    /// Engine with the default transports and built-in pipelines.
    pub fn new() -> Self {
        Self::with_parts(
            Arc::new(DefaultFetcher::new()),
            Arc::new(PipelineRegistry::default()),
        )
    }

    /// Engine with an explicit transport and pipeline set.
    pub fn with_parts(fetcher: Arc<dyn Fetcher>, registry: Arc<PipelineRegistry>) -> Self {
        Self {
            fetcher,
            registry,
            cancel: CancellationToken::new(),
        }
    }

    /// Token that cancels this engine's crawls when fired.
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Release pipeline resources (e.g. a shared renderer).
    pub async fn close(&self) {
        self.registry.close_all().await;
    }

    /// Crawl from `seed`, reporting progress after every fetch attempt.
    ///
    /// Configuration problems (malformed patterns, an unreachable seed) fail
    /// the whole run; everything else is contained in per-page error lists.
    /// Cancellation stops admission, drains in-flight work, and returns the
    /// partial result.
    #[instrument(skip_all, fields(seed = %seed))]
    pub async fn run(
        &self,
        seed: &Url,
        options: &ScrapeOptions,
        progress: &dyn ProgressReporter,
    ) -> Result<ScrapeResult> {
        let start = Instant::now();

        let filter = PatternFilter::new(&options.include_patterns, &options.exclude_patterns)?;
        let scope = CrawlScope::new(seed, options.scope);
        let pipe_opts = PipelineOptions {
            render_mode: options.render_mode,
        };

        let mut frontier: VecDeque<(Url, u32)> = VecDeque::from([(seed.clone(), 0)]);
        let mut visited: HashSet<String> = HashSet::from([normalize_url(seed)]);

        let mut tasks: JoinSet<TaskOutcome> = JoinSet::new();
        let mut pages: Vec<PageRecord> = Vec::new();
        let mut fetched = 0usize;
        let mut failed = 0usize;
        let mut links_skipped = 0usize;
        let mut cancelled = false;

        info!(
            max_depth = options.max_depth,
            max_pages = options.max_pages,
            concurrency = options.concurrency,
            scope = %options.scope,
            "starting crawl"
        );

        loop {
            if self.cancel.is_cancelled() {
                cancelled = true;
            }

            // Admit new work up to the concurrency bound; any completed task
            // immediately frees a slot for the next frontier entry.
            if !cancelled {
                while tasks.len() < options.concurrency
                    && fetched + tasks.len() < options.max_pages
                {
                    let Some((url, depth)) = frontier.pop_front() else {
                        break;
                    };
                    self.spawn_task(&mut tasks, url, depth, options, &pipe_opts);
                }
            }

            let Some(joined) = tasks.join_next().await else {
                break;
            };
            let outcome = match joined {
                Ok(outcome) => outcome,
                Err(err) => {
                    warn!(error = %err, "crawl task panicked");
                    continue;
                }
            };

            match outcome {
                TaskOutcome::Fetched {
                    depth,
                    final_url,
                    processed,
                } => {
                    fetched += 1;

                    let page_base = Url::parse(&final_url).ok();
                    for link in &processed.links {
                        match resolve_link(link, page_base.as_ref()) {
                            Some(resolved) => {
                                if !self.admit_link(
                                    resolved,
                                    depth,
                                    options,
                                    &scope,
                                    &filter,
                                    &mut visited,
                                    &mut frontier,
                                ) {
                                    links_skipped += 1;
                                }
                            }
                            None => links_skipped += 1,
                        }
                    }

                    progress.page_fetched(&final_url, fetched, visited.len());
                    pages.push(page_record(final_url, depth, processed));
                }

                TaskOutcome::FetchFailed { url, depth, error } => {
                    if error == DocsweepError::Cancelled {
                        continue;
                    }
                    // An unreachable seed fails the whole operation.
                    if depth == 0 {
                        return Err(error);
                    }

                    failed += 1;
                    progress.page_failed(url.as_str(), &error, fetched, visited.len());
                    pages.push(PageRecord {
                        url: url.to_string(),
                        depth,
                        title: None,
                        content: String::new(),
                        content_hash: compute_hash(""),
                        links: Vec::new(),
                        metadata: HashMap::new(),
                        errors: vec![error],
                    });
                }
            }
        }

        let result = ScrapeResult {
            pages,
            pages_fetched: fetched,
            pages_failed: failed,
            links_skipped,
            cancelled,
            duration: start.elapsed(),
        };

        info!(
            pages_fetched = result.pages_fetched,
            pages_failed = result.pages_failed,
            links_skipped = result.links_skipped,
            cancelled = result.cancelled,
            duration_ms = result.duration.as_millis(),
            "crawl finished"
        );

        Ok(result)
    }

    /// Scheme, dedup, scope, pattern, and depth checks for one resolved
    /// link. Survivors are marked visited *before* they enter the frontier,
    /// so concurrent discovery enqueues a URL at most once. Returns whether
    /// the link was accepted (an already-visited link counts as accepted —
    /// it is not a skip).
    #[allow(clippy::too_many_arguments)]
    fn admit_link(
        &self,
        resolved: Url,
        depth: u32,
        options: &ScrapeOptions,
        scope: &CrawlScope,
        filter: &PatternFilter,
        visited: &mut HashSet<String>,
        frontier: &mut VecDeque<(Url, u32)>,
    ) -> bool {
        if !options.scheme_allowed(resolved.scheme()) {
            return false;
        }

        let normalized = normalize_url(&resolved);
        if visited.contains(&normalized) {
            return true;
        }

        if !scope.in_scope(&resolved) {
            debug!(url = %resolved, "out of scope");
            return false;
        }
        if !filter.should_include(&resolved) {
            debug!(url = %resolved, "rejected by patterns");
            return false;
        }

        visited.insert(normalized);
        if depth + 1 <= options.max_depth {
            frontier.push_back((resolved, depth + 1));
            true
        } else {
            false
        }
    }

    fn spawn_task(
        &self,
        tasks: &mut JoinSet<TaskOutcome>,
        url: Url,
        depth: u32,
        options: &ScrapeOptions,
        pipe_opts: &PipelineOptions,
    ) {
        let fetcher = self.fetcher.clone();
        let registry = self.registry.clone();
        let pipe_opts = pipe_opts.clone();
        let fetch_options = FetchOptions {
            follow_redirects: options.follow_redirects,
            timeout: options.request_timeout,
            cancel: self.cancel.child_token(),
        };

        tasks.spawn(async move {
            debug!(%url, depth, "fetching page");
            match fetcher.fetch(url.as_str(), &fetch_options).await {
                Ok(raw) => {
                    let processed = match registry.select(&raw.mime_type) {
                        Some(pipeline) => {
                            pipeline.process(&raw, &pipe_opts, Some(fetcher.clone())).await
                        }
                        None => {
                            debug!(%url, mime = %raw.mime_type, "no pipeline for content type");
                            ProcessedContent {
                                errors: vec![DocsweepError::UnsupportedContent(
                                    raw.mime_type.clone(),
                                )],
                                ..Default::default()
                            }
                        }
                    };
                    TaskOutcome::Fetched {
                        depth,
                        final_url: raw.source_url,
                        processed,
                    }
                }
                Err(error) => TaskOutcome::FetchFailed { url, depth, error },
            }
        });
    }
}

impl Default for CrawlEngine {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Parse a discovered link, falling back to resolution against the page's
/// own URL for relative targets.
fn resolve_link(link: &str, page_base: Option<&Url>) -> Option<Url> {
    match Url::parse(link) {
        Ok(url) => Some(url),
        Err(url::ParseError::RelativeUrlWithoutBase) => {
            page_base.and_then(|base| base.join(link).ok())
        }
        Err(_) => None,
    }
}

/// Normalize a URL for deduplication (strip fragment, trailing slash,
/// except at the root).
fn normalize_url(url: &Url) -> String {
    let mut normalized = url.clone();
    normalized.set_fragment(None);
    let mut s = normalized.to_string();
    if s.ends_with('/') && s.matches('/').count() > 3 {
        s.pop();
    }
    s
}

fn page_record(final_url: String, depth: u32, processed: ProcessedContent) -> PageRecord {
    let title = processed.title().map(|t| t.to_string());
    let content_hash = compute_hash(&processed.content);

    PageRecord {
        url: final_url,
        depth,
        title,
        content: processed.content,
        content_hash,
        links: processed.links,
        metadata: processed.metadata,
        errors: processed.errors,
    }
}

/// SHA-256 hash of content, hex encoded.
fn compute_hash(content: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    format!("{:x}", hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_url_strips_fragment_and_trailing_slash() {
        let url = Url::parse("https://docs.example.com/guide/intro/#section-1").unwrap();
        assert_eq!(
            normalize_url(&url),
            "https://docs.example.com/guide/intro"
        );

        // Root keeps its slash.
        let root = Url::parse("https://docs.example.com/").unwrap();
        assert_eq!(normalize_url(&root), "https://docs.example.com/");
    }

    #[test]
    fn resolve_link_handles_absolute_and_relative() {
        let base = Url::parse("https://example.com/docs/page").unwrap();

        let abs = resolve_link("https://example.com/other", Some(&base)).unwrap();
        assert_eq!(abs.as_str(), "https://example.com/other");

        let rel = resolve_link("/docs/relative", Some(&base)).unwrap();
        assert_eq!(rel.as_str(), "https://example.com/docs/relative");

        assert!(resolve_link("/nowhere", None).is_none());
    }

    #[test]
    fn compute_hash_is_stable() {
        let hash = compute_hash("hello world");
        assert_eq!(hash.len(), 64);
        assert_eq!(
            hash,
            "b94d27b9934d3e08a52e52d7da7dabfac484efe37a5380ee9088f7ace2efcde9"
        );
    }
}
