//! Seed-relative scope policy for discovered links.

use url::Url;

use docsweep_shared::ScopeMode;

/// Determines which resolved absolute URLs are eligible for the frontier,
/// relative to the seed URL.
#[derive(Debug, Clone)]
pub struct CrawlScope {
    mode: ScopeMode,
    seed: Url,
    /// Directory prefix for subpages mode: the seed path as given when it
    /// ends with `/`, else its parent directory up to and including the
    /// last `/`.
    base_path: String,
}

impl CrawlScope {
    pub fn new(seed: &Url, mode: ScopeMode) -> Self {
        let path = seed.path();
        let base_path = if path.ends_with('/') {
            path.to_string()
        } else {
            match path.rfind('/') {
                Some(idx) => path[..=idx].to_string(),
                None => "/".to_string(),
            }
        };

        Self {
            mode,
            seed: seed.clone(),
            base_path,
        }
    }

    /// Whether a resolved absolute link is in scope.
    pub fn in_scope(&self, url: &Url) -> bool {
        match self.mode {
            ScopeMode::Subpages => {
                url.scheme() == self.seed.scheme()
                    && url.host_str() == self.seed.host_str()
                    && url.port_or_known_default() == self.seed.port_or_known_default()
                    && url.path().starts_with(&self.base_path)
            }
            ScopeMode::Hostname => url.host_str() == self.seed.host_str(),
            ScopeMode::Domain => match (url.host_str(), self.seed.host_str()) {
                (Some(link_host), Some(seed_host)) => {
                    registrable_domain(link_host) == registrable_domain(seed_host)
                }
                _ => false,
            },
        }
    }
}

/// The hostname minus one optional leading subdomain label, so sibling
/// subdomains and the apex compare equal.
fn registrable_domain(host: &str) -> &str {
    // Strip one leading label only when what remains is itself a dotted
    // domain; "example.com" keeps both labels.
    match host.split_once('.') {
        Some((_, rest)) if rest.contains('.') => rest,
        _ => host,
    }
}
