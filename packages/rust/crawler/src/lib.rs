//! Concurrent, scope-aware documentation crawler.
//!
//! The engine starts from a seed URL, performs a bounded, deduplicated
//! traversal within scope, runs each fetched page through the first matching
//! content pipeline, and aggregates per-page results.

mod engine;
mod fetcher;
mod scope;

pub use engine::{
    CrawlEngine, PageRecord, ProgressReporter, ScrapeResult, SilentProgress,
};
pub use fetcher::{DefaultFetcher, FileFetcher, HttpFetcher};
pub use scope::CrawlScope;
