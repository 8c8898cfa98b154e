//! Application configuration for docsweep.
//!
//! User config lives at `~/.docsweep/docsweep.toml`.
//! CLI flags override config file values, which override defaults.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{DocsweepError, Result};
use crate::types::RenderMode;

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "docsweep.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".docsweep";

// ---------------------------------------------------------------------------
// Config structs (matching docsweep.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Crawl defaults.
    #[serde(default)]
    pub defaults: CrawlDefaultsConfig,

    /// URL pattern policies.
    #[serde(default)]
    pub patterns: PatternsConfig,
}

/// `[defaults]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrawlDefaultsConfig {
    /// Maximum crawl depth from the seed URL.
    #[serde(default = "default_max_depth")]
    pub max_depth: u32,

    /// Maximum number of pages fetched per crawl.
    #[serde(default = "default_max_pages")]
    pub max_pages: usize,

    /// Maximum concurrent fetch+process tasks.
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,

    /// Which discovered links are eligible relative to the seed.
    #[serde(default)]
    pub scope: ScopeMode,

    /// Whether HTTP redirects are followed.
    #[serde(default = "default_true")]
    pub follow_redirects: bool,

    /// Per-request timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub request_timeout_secs: u64,

    /// URL schemes accepted for discovered links.
    #[serde(default = "default_schemes")]
    pub allowed_schemes: Vec<String>,
}

impl Default for CrawlDefaultsConfig {
    fn default() -> Self {
        Self {
            max_depth: default_max_depth(),
            max_pages: default_max_pages(),
            concurrency: default_concurrency(),
            scope: ScopeMode::default(),
            follow_redirects: true,
            request_timeout_secs: default_timeout_secs(),
            allowed_schemes: default_schemes(),
        }
    }
}

fn default_max_depth() -> u32 {
    3
}
fn default_max_pages() -> usize {
    1000
}
fn default_concurrency() -> usize {
    4
}
fn default_true() -> bool {
    true
}
fn default_timeout_secs() -> u64 {
    30
}
fn default_schemes() -> Vec<String> {
    vec!["http".into(), "https".into(), "file".into()]
}

/// `[patterns]` section.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PatternsConfig {
    /// URL include patterns (glob, or regex when wrapped in `/.../`).
    #[serde(default)]
    pub include: Vec<String>,

    /// URL exclude patterns. Exclusions always win over inclusions.
    #[serde(default)]
    pub exclude: Vec<String>,
}

// ---------------------------------------------------------------------------
// Scope mode
// ---------------------------------------------------------------------------

/// The rule deciding whether a discovered link is eligible, relative to the
/// seed URL.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScopeMode {
    /// Same host and scheme as the seed, path under the seed's base path.
    #[default]
    Subpages,
    /// Exact hostname match, any path.
    Hostname,
    /// Registrable-domain match: the seed's hostname minus one optional
    /// leading subdomain label, so sibling subdomains and the apex qualify.
    Domain,
}

impl std::fmt::Display for ScopeMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ScopeMode::Subpages => "subpages",
            ScopeMode::Hostname => "hostname",
            ScopeMode::Domain => "domain",
        };
        write!(f, "{s}")
    }
}

impl std::str::FromStr for ScopeMode {
    type Err = DocsweepError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "subpages" => Ok(ScopeMode::Subpages),
            "hostname" => Ok(ScopeMode::Hostname),
            "domain" => Ok(ScopeMode::Domain),
            other => Err(DocsweepError::config(format!(
                "unknown scope '{other}': expected subpages, hostname, or domain"
            ))),
        }
    }
}

// ---------------------------------------------------------------------------
// Scrape options (runtime, merged from config + CLI flags)
// ---------------------------------------------------------------------------

/// Runtime crawl options — merged from config file + CLI flags.
#[derive(Debug, Clone)]
pub struct ScrapeOptions {
    /// Maximum crawl depth from the seed URL.
    pub max_depth: u32,
    /// Maximum number of pages fetched.
    pub max_pages: usize,
    /// Maximum concurrent fetch+process tasks.
    pub concurrency: usize,
    /// Scope policy relative to the seed.
    pub scope: ScopeMode,
    /// URL include patterns.
    pub include_patterns: Vec<String>,
    /// URL exclude patterns.
    pub exclude_patterns: Vec<String>,
    /// Whether HTTP redirects are followed.
    pub follow_redirects: bool,
    /// Per-request timeout.
    pub request_timeout: Duration,
    /// URL schemes accepted for discovered links.
    pub allowed_schemes: Vec<String>,
    /// How HTML pages are obtained before parsing.
    pub render_mode: RenderMode,
}

impl Default for ScrapeOptions {
    fn default() -> Self {
        Self::from(&AppConfig::default())
    }
}

impl From<&AppConfig> for ScrapeOptions {
    fn from(config: &AppConfig) -> Self {
        Self {
            max_depth: config.defaults.max_depth,
            max_pages: config.defaults.max_pages,
            concurrency: config.defaults.concurrency.max(1),
            scope: config.defaults.scope,
            include_patterns: config.patterns.include.clone(),
            exclude_patterns: config.patterns.exclude.clone(),
            follow_redirects: config.defaults.follow_redirects,
            request_timeout: Duration::from_secs(config.defaults.request_timeout_secs),
            allowed_schemes: config.defaults.allowed_schemes.clone(),
            render_mode: RenderMode::Static,
        }
    }
}

impl ScrapeOptions {
    /// Whether a link with the given scheme may enter the frontier.
    pub fn scheme_allowed(&self, scheme: &str) -> bool {
        self.allowed_schemes.iter().any(|s| s == scheme)
    }
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.docsweep/`).
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| DocsweepError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.docsweep/docsweep.toml`).
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Load the application config from disk. Returns defaults if the file does not exist.
pub fn load_config() -> Result<AppConfig> {
    let path = config_file_path()?;

    if !path.exists() {
        tracing::debug!(?path, "config file not found, using defaults");
        return Ok(AppConfig::default());
    }

    load_config_from(&path)
}

/// Load the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| DocsweepError::io(path, e))?;

    toml::from_str(&content)
        .map_err(|e| DocsweepError::config(format!("failed to parse {}: {e}", path.display())))
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| DocsweepError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let config = AppConfig::default();
    let content =
        toml::to_string_pretty(&config).map_err(|e| DocsweepError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| DocsweepError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}
