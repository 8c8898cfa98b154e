//! Default fetch transports: HTTP via reqwest and local trees via `file:`.

use std::path::Path;

use reqwest::header::CONTENT_TYPE;
use url::Url;

use docsweep_pipeline::{charset_from_content_type, mime_from_content_type};
use docsweep_shared::{DocsweepError, FetchOptions, Fetcher, RawContent, Result};

/// User-Agent string for crawl requests.
const USER_AGENT: &str = concat!("docsweep/", env!("CARGO_PKG_VERSION"));

/// Redirect hop limit when redirects are followed.
const REDIRECT_LIMIT: usize = 5;

// ---------------------------------------------------------------------------
// HTTP
// ---------------------------------------------------------------------------

/// HTTP(S) transport backed by reqwest.
#[derive(Debug, Clone, Default)]
pub struct HttpFetcher;

impl HttpFetcher {
    pub fn new() -> Self {
        Self
    }

    fn build_client(&self, options: &FetchOptions) -> Result<reqwest::Client> {
        let redirect = if options.follow_redirects {
            reqwest::redirect::Policy::limited(REDIRECT_LIMIT)
        } else {
            reqwest::redirect::Policy::none()
        };

        reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .redirect(redirect)
            .timeout(options.timeout)
            .build()
            .map_err(|e| DocsweepError::fetch(format!("failed to build HTTP client: {e}")))
    }

    async fn fetch_http(&self, url: &str, options: &FetchOptions) -> Result<RawContent> {
        let client = self.build_client(options)?;

        let response = client
            .get(url)
            .send()
            .await
            .map_err(|e| map_reqwest_error(url, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(DocsweepError::fetch(format!("{url}: HTTP {status}")));
        }

        let final_url = response.url().to_string();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(|value| value.to_string());

        let bytes = response
            .bytes()
            .await
            .map_err(|e| map_reqwest_error(url, e))?;

        let (mime_type, charset) = match content_type.as_deref() {
            Some(ct) => (mime_from_content_type(ct), charset_from_content_type(ct)),
            None => ("text/html".to_string(), None),
        };

        Ok(RawContent {
            bytes: bytes.to_vec(),
            mime_type,
            charset,
            source_url: final_url,
        })
    }
}

#[async_trait::async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, url: &str, options: &FetchOptions) -> Result<RawContent> {
        tokio::select! {
            _ = options.cancel.cancelled() => Err(DocsweepError::Cancelled),
            result = self.fetch_http(url, options) => result,
        }
    }
}

fn map_reqwest_error(url: &str, err: reqwest::Error) -> DocsweepError {
    if err.is_timeout() {
        return DocsweepError::fetch(format!("{url}: request timed out"));
    }
    if err.is_redirect() {
        return DocsweepError::fetch(format!("{url}: redirect limit exceeded"));
    }
    DocsweepError::fetch(format!("{url}: {err}"))
}

// ---------------------------------------------------------------------------
// Local files
// ---------------------------------------------------------------------------

/// `file:` transport for crawling local documentation trees.
#[derive(Debug, Clone, Default)]
pub struct FileFetcher;

impl FileFetcher {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait::async_trait]
impl Fetcher for FileFetcher {
    async fn fetch(&self, url: &str, options: &FetchOptions) -> Result<RawContent> {
        if options.cancel.is_cancelled() {
            return Err(DocsweepError::Cancelled);
        }

        let parsed = Url::parse(url)
            .map_err(|e| DocsweepError::fetch(format!("{url}: invalid URL: {e}")))?;
        let path = parsed
            .to_file_path()
            .map_err(|_| DocsweepError::fetch(format!("{url}: not a local file path")))?;

        let bytes = tokio::fs::read(&path)
            .await
            .map_err(|e| DocsweepError::fetch(format!("{}: {e}", path.display())))?;

        Ok(RawContent {
            bytes,
            mime_type: mime_from_extension(&path),
            charset: None,
            source_url: url.to_string(),
        })
    }
}

/// Infer a MIME type from a file extension.
fn mime_from_extension(path: &Path) -> String {
    match path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .as_deref()
    {
        Some("html" | "htm" | "xhtml") => "text/html",
        Some("md" | "markdown") => "text/markdown",
        Some("json") => "application/json",
        Some("txt") => "text/plain",
        _ => "application/octet-stream",
    }
    .to_string()
}

// ---------------------------------------------------------------------------
// Scheme routing
// ---------------------------------------------------------------------------

/// Routes fetches to the HTTP or file transport by URL scheme.
#[derive(Debug, Clone, Default)]
pub struct DefaultFetcher {
    http: HttpFetcher,
    file: FileFetcher,
}

impl DefaultFetcher {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait]
impl Fetcher for DefaultFetcher {
    async fn fetch(&self, url: &str, options: &FetchOptions) -> Result<RawContent> {
        let scheme = url.split(':').next().unwrap_or("");
        match scheme {
            "http" | "https" => self.http.fetch(url, options).await,
            "file" => self.file.fetch(url, options).await,
            other => Err(DocsweepError::fetch(format!(
                "{url}: unsupported scheme '{other}'"
            ))),
        }
    }
}
