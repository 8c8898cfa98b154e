//! The fetch transport capability consumed by the crawl engine and pipelines.

use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::error::Result;
use crate::types::RawContent;

/// Per-request options threaded from the crawl engine into the transport.
#[derive(Debug, Clone)]
pub struct FetchOptions {
    /// Whether HTTP redirects are followed.
    pub follow_redirects: bool,
    /// Per-request timeout.
    pub timeout: Duration,
    /// Cooperative cancellation; transports should abort promptly when set.
    pub cancel: CancellationToken,
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self {
            follow_redirects: true,
            timeout: Duration::from_secs(30),
            cancel: CancellationToken::new(),
        }
    }
}

/// Transport abstraction: turn a URL into [`RawContent`] or fail with a
/// terminal per-page error.
///
/// Retry policy, if any, belongs to the implementation — callers treat every
/// failure as final for that page.
#[async_trait::async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch(&self, url: &str, options: &FetchOptions) -> Result<RawContent>;
}
