//! Shared types, errors, and configuration for the docsweep workspace.

mod config;
mod error;
mod fetch;
mod types;

pub use config::{
    AppConfig, CrawlDefaultsConfig, PatternsConfig, ScopeMode, ScrapeOptions, config_dir,
    config_file_path, init_config, load_config, load_config_from,
};
pub use error::{DocsweepError, Result};
pub use fetch::{FetchOptions, Fetcher};
pub use types::{ProcessedContent, RawContent, RenderMode};
