//! CLI command definitions, routing, and tracing setup.

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use color_eyre::eyre::{Result, eyre};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;
use url::Url;

use docsweep_crawler::{CrawlEngine, ProgressReporter, ScrapeResult};
use docsweep_shared::{
    AppConfig, DocsweepError, RenderMode, ScopeMode, ScrapeOptions, init_config, load_config,
};
use docsweep_splitter::{Chunk, SplitOptions};

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// docsweep — turn documentation sites into normalized Markdown.
#[derive(Parser)]
#[command(
    name = "docsweep",
    version,
    about = "Crawl a documentation site or local tree into normalized Markdown pages.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

/// Top-level CLI subcommands.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// Crawl from a seed URL and write normalized pages.
    Scrape {
        /// Seed URL (http(s)://... or file:///...; a local path also works).
        url: String,

        /// Output directory for pages and the manifest.
        #[arg(short, long, default_value = "./docsweep-out")]
        out: PathBuf,

        /// Maximum crawl depth from the seed.
        #[arg(long)]
        max_depth: Option<u32>,

        /// Maximum number of pages to fetch.
        #[arg(long)]
        max_pages: Option<usize>,

        /// Maximum concurrent fetches.
        #[arg(long)]
        concurrency: Option<usize>,

        /// Link scope relative to the seed: subpages, hostname, or domain.
        #[arg(long)]
        scope: Option<ScopeMode>,

        /// Include pattern (repeatable; glob, or /regex/).
        #[arg(long = "include")]
        include_patterns: Vec<String>,

        /// Exclude pattern (repeatable; always wins over includes).
        #[arg(long = "exclude")]
        exclude_patterns: Vec<String>,

        /// Do not follow HTTP redirects.
        #[arg(long)]
        no_follow_redirects: bool,

        /// Render pages with scripts before processing (needs a renderer).
        #[arg(long)]
        scripted: bool,

        /// Split page content larger than this many bytes into chunk files.
        #[arg(long)]
        max_chunk_size: Option<usize>,
    },

    /// Split a local file into size-bounded chunks.
    Split {
        /// File to split.
        file: PathBuf,

        /// Maximum chunk size in bytes.
        #[arg(long, default_value_t = docsweep_splitter::DEFAULT_MAX_CHUNK_SIZE)]
        max_chunk_size: usize,

        /// Directory to write chunks into (prints a summary either way).
        #[arg(short, long)]
        out: Option<PathBuf>,
    },

    /// Configuration management.
    Config {
        /// Config subcommand.
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Config subcommands.
#[derive(Subcommand)]
pub(crate) enum ConfigAction {
    /// Initialize config file with defaults.
    Init,
    /// Show resolved configuration.
    Show,
}

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

/// Initialize tracing based on CLI flags.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "docsweep=info",
        1 => "docsweep=debug",
        _ => "docsweep=trace",
    };

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .init();
        }
        LogFormat::Json => {
            fmt().json().with_env_filter(env_filter).init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command.
pub(crate) async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Command::Scrape {
            url,
            out,
            max_depth,
            max_pages,
            concurrency,
            scope,
            include_patterns,
            exclude_patterns,
            no_follow_redirects,
            scripted,
            max_chunk_size,
        } => {
            let flags = ScrapeFlags {
                max_depth,
                max_pages,
                concurrency,
                scope,
                include_patterns,
                exclude_patterns,
                no_follow_redirects,
                scripted,
            };
            cmd_scrape(&url, &out, flags, max_chunk_size).await
        }
        Command::Split {
            file,
            max_chunk_size,
            out,
        } => cmd_split(&file, max_chunk_size, out.as_deref()),
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init(),
            ConfigAction::Show => cmd_config_show(),
        },
    }
}

/// Scrape flags that override config file values.
struct ScrapeFlags {
    max_depth: Option<u32>,
    max_pages: Option<usize>,
    concurrency: Option<usize>,
    scope: Option<ScopeMode>,
    include_patterns: Vec<String>,
    exclude_patterns: Vec<String>,
    no_follow_redirects: bool,
    scripted: bool,
}

// ---------------------------------------------------------------------------
// scrape
// ---------------------------------------------------------------------------

async fn cmd_scrape(
    url: &str,
    out: &Path,
    flags: ScrapeFlags,
    max_chunk_size: Option<usize>,
) -> Result<()> {
    let seed = parse_seed(url)?;

    let config = load_config()?;
    let mut options = ScrapeOptions::from(&config);
    if let Some(depth) = flags.max_depth {
        options.max_depth = depth;
    }
    if let Some(pages) = flags.max_pages {
        options.max_pages = pages;
    }
    if let Some(concurrency) = flags.concurrency {
        options.concurrency = concurrency.max(1);
    }
    if let Some(scope) = flags.scope {
        options.scope = scope;
    }
    if !flags.include_patterns.is_empty() {
        options.include_patterns = flags.include_patterns;
    }
    if !flags.exclude_patterns.is_empty() {
        options.exclude_patterns = flags.exclude_patterns;
    }
    if flags.no_follow_redirects {
        options.follow_redirects = false;
    }
    if flags.scripted {
        options.render_mode = RenderMode::Scripted;
    }

    info!(seed = %seed, out = %out.display(), "starting scrape");

    let engine = CrawlEngine::new();

    // Ctrl-C cancels cooperatively; partial results are still written.
    let token = engine.cancel_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("interrupt received, draining in-flight work");
            token.cancel();
        }
    });

    let reporter = CliProgress::new();
    let result = engine.run(&seed, &options, &reporter).await?;
    reporter.finish();
    engine.close().await;

    let written = write_results(out, &result, max_chunk_size)?;

    println!();
    if result.cancelled {
        println!("  Crawl cancelled — partial results written.");
    } else {
        println!("  Crawl complete!");
    }
    println!("  Pages:   {} fetched, {} failed", result.pages_fetched, result.pages_failed);
    println!("  Skipped: {} links out of scope", result.links_skipped);
    println!("  Files:   {written} written to {}", out.display());
    println!("  Time:    {:.1}s", result.duration.as_secs_f64());
    println!();

    Ok(())
}

/// Accept an URL or a local filesystem path as the seed.
fn parse_seed(url: &str) -> Result<Url> {
    if let Ok(parsed) = Url::parse(url) {
        return Ok(parsed);
    }

    let path = std::fs::canonicalize(url)
        .map_err(|_| eyre!("'{url}' is neither a valid URL nor an existing path"))?;
    Url::from_file_path(&path).map_err(|_| eyre!("cannot express '{}' as a file URL", path.display()))
}

/// Write one Markdown file per page, chunk files for oversized pages, and a
/// manifest of everything.
fn write_results(
    out: &Path,
    result: &ScrapeResult,
    max_chunk_size: Option<usize>,
) -> Result<usize> {
    std::fs::create_dir_all(out)?;
    let mut written = 0usize;

    let mut manifest_pages = Vec::new();
    for page in &result.pages {
        let rel_path = page_path(&page.url);
        let mut files = Vec::new();

        if page.content.is_empty() {
            // Fetch failures have no content to write.
        } else if let Some(limit) = max_chunk_size.filter(|l| page.content.len() > *l) {
            let chunks = docsweep_splitter::split(
                &page.content,
                &SplitOptions {
                    max_chunk_size: limit,
                },
            )
            .map_err(|e| eyre!("splitting {}: {e}", page.url))?;
            files = write_chunks(out, &rel_path, &chunks)?;
        } else {
            let file = format!("{rel_path}.md");
            write_file(out, &file, &page.content)?;
            files.push(file);
        }
        written += files.len();

        manifest_pages.push(serde_json::json!({
            "url": page.url,
            "depth": page.depth,
            "title": page.title,
            "content_hash": page.content_hash,
            "files": files,
            "links": page.links,
            "errors": page.errors.iter().map(|e| e.to_string()).collect::<Vec<_>>(),
        }));
    }

    let manifest = serde_json::json!({
        "pages": manifest_pages,
        "pages_fetched": result.pages_fetched,
        "pages_failed": result.pages_failed,
        "links_skipped": result.links_skipped,
        "cancelled": result.cancelled,
        "duration_ms": result.duration.as_millis() as u64,
    });
    std::fs::write(
        out.join("manifest.json"),
        serde_json::to_string_pretty(&manifest)?,
    )?;

    Ok(written + 1)
}

fn write_chunks(out: &Path, rel_path: &str, chunks: &[Chunk]) -> Result<Vec<String>> {
    let mut files = Vec::with_capacity(chunks.len());
    for (i, chunk) in chunks.iter().enumerate() {
        let file = format!("{rel_path}.part{:02}.md", i + 1);
        write_file(out, &file, &chunk.content)?;
        files.push(file);
    }
    Ok(files)
}

fn write_file(out: &Path, rel_path: &str, content: &str) -> Result<()> {
    let path = out.join(rel_path);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(&path, content)?;
    Ok(())
}

/// Convert a page URL to a filesystem-safe relative path.
fn page_path(url: &str) -> String {
    let path = Url::parse(url)
        .map(|u| u.path().to_string())
        .unwrap_or_else(|_| url.to_string());

    let cleaned = path
        .trim_start_matches('/')
        .trim_end_matches('/')
        .trim_end_matches(".html")
        .trim_end_matches(".htm")
        .trim_end_matches(".md");

    if cleaned.is_empty() {
        "index".to_string()
    } else {
        cleaned.replace(
            |c: char| !(c.is_ascii_alphanumeric() || matches!(c, '/' | '-' | '_' | '.')),
            "-",
        )
    }
}

// ---------------------------------------------------------------------------
// split
// ---------------------------------------------------------------------------

fn cmd_split(file: &Path, max_chunk_size: usize, out: Option<&Path>) -> Result<()> {
    let content = std::fs::read_to_string(file)
        .map_err(|e| eyre!("cannot read {}: {e}", file.display()))?;

    let chunks = docsweep_splitter::split(&content, &SplitOptions { max_chunk_size })?;

    if let Some(out) = out {
        std::fs::create_dir_all(out)?;
        let stem = file
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("chunk");
        let ext = file.extension().and_then(|s| s.to_str()).unwrap_or("txt");
        for (i, chunk) in chunks.iter().enumerate() {
            let path = out.join(format!("{stem}.part{:02}.{ext}", i + 1));
            std::fs::write(&path, &chunk.content)?;
        }
        println!(
            "Wrote {} chunks (max {} bytes) to {}",
            chunks.len(),
            max_chunk_size,
            out.display()
        );
    } else {
        let largest = chunks.iter().map(Chunk::len).max().unwrap_or(0);
        println!(
            "{} would split into {} chunks (largest {largest} bytes; pass --out to write them)",
            file.display(),
            chunks.len()
        );
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// config
// ---------------------------------------------------------------------------

fn cmd_config_init() -> Result<()> {
    let path = init_config()?;
    println!("Config initialized at: {}", path.display());
    Ok(())
}

fn cmd_config_show() -> Result<()> {
    let config: AppConfig = load_config()?;
    let toml_str = toml::to_string_pretty(&config)?;
    println!("{toml_str}");
    Ok(())
}

// ---------------------------------------------------------------------------
// CLI progress reporter
// ---------------------------------------------------------------------------

/// Spinner-based progress display for crawls.
struct CliProgress {
    spinner: ProgressBar,
}

impl CliProgress {
    fn new() -> Self {
        let spinner = ProgressBar::new_spinner();
        spinner.set_style(
            ProgressStyle::with_template("{spinner:.cyan} {msg}")
                .expect("valid template")
                .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]),
        );
        spinner.enable_steady_tick(std::time::Duration::from_millis(80));
        Self { spinner }
    }

    fn finish(&self) {
        self.spinner.finish_and_clear();
    }
}

impl ProgressReporter for CliProgress {
    fn page_fetched(&self, url: &str, completed: usize, discovered: usize) {
        self.spinner
            .set_message(format!("Fetched [{completed}/{discovered}] {url}"));
    }

    fn page_failed(&self, url: &str, error: &DocsweepError, completed: usize, discovered: usize) {
        self.spinner
            .set_message(format!("Failed  [{completed}/{discovered}] {url}: {error}"));
    }
}
