//! URL pattern filtering for crawl scoping.
//!
//! Patterns come in two syntaxes, decided once at construction: a pattern
//! wrapped in `/.../` is a regular expression (unanchored search); anything
//! else is a glob in which `*` matches any run of characters within one path
//! segment. Exclusions always win over inclusions.

use regex::Regex;
use url::Url;

use docsweep_shared::{DocsweepError, Result};

// ---------------------------------------------------------------------------
// Pattern
// ---------------------------------------------------------------------------

/// A single compiled include/exclude pattern.
///
/// The syntax is sniffed once here, never per match.
#[derive(Debug, Clone)]
enum PatternKind {
    /// `/.../`-wrapped pattern, compiled as-is and matched as a search.
    Regex(Regex),
    /// Glob pattern compiled to a fully anchored regex. The second regex is
    /// the same glob with any leading `/` stripped, used for basename
    /// matching on `file:` URLs.
    Glob { full: Regex, bare: Regex },
}

#[derive(Debug, Clone)]
struct Pattern {
    raw: String,
    kind: PatternKind,
}

impl Pattern {
    fn compile(raw: &str) -> Result<Self> {
        let kind = if raw.len() >= 2 && raw.starts_with('/') && raw.ends_with('/') && raw != "/" {
            let body = &raw[1..raw.len() - 1];
            let re = Regex::new(body)
                .map_err(|e| DocsweepError::invalid_pattern(raw, e.to_string()))?;
            PatternKind::Regex(re)
        } else {
            let full = glob_to_regex(raw)
                .map_err(|e| DocsweepError::invalid_pattern(raw, e.to_string()))?;
            let bare = glob_to_regex(raw.trim_start_matches('/'))
                .map_err(|e| DocsweepError::invalid_pattern(raw, e.to_string()))?;
            PatternKind::Glob { full, bare }
        };

        Ok(Self {
            raw: raw.to_string(),
            kind,
        })
    }

    /// Test the pattern against the path+query target, and against the
    /// basename for `file:` URLs.
    fn matches(&self, target: &str, basename: Option<&str>) -> bool {
        match &self.kind {
            PatternKind::Regex(re) => {
                re.is_match(target) || basename.is_some_and(|b| re.is_match(b))
            }
            PatternKind::Glob { full, bare } => {
                full.is_match(target) || basename.is_some_and(|b| bare.is_match(b))
            }
        }
    }
}

/// Convert a glob to the equivalent anchored regex.
///
/// `*` matches any run of characters except `/` (no cross-segment
/// matching); `**` is not distinguished from `*`. Everything else is
/// escaped literally.
fn glob_to_regex(pattern: &str) -> std::result::Result<Regex, regex::Error> {
    let mut re = String::with_capacity(pattern.len() + 8);
    re.push('^');
    for ch in pattern.chars() {
        if ch == '*' {
            re.push_str("[^/]*");
        } else {
            re.push_str(&regex::escape(&ch.to_string()));
        }
    }
    re.push('$');
    Regex::new(&re)
}

// ---------------------------------------------------------------------------
// PatternFilter
// ---------------------------------------------------------------------------

/// Decides whether a discovered URL passes the configured include/exclude
/// patterns.
#[derive(Debug, Clone, Default)]
pub struct PatternFilter {
    include: Vec<Pattern>,
    exclude: Vec<Pattern>,
}

impl PatternFilter {
    /// Compile the configured patterns. Malformed patterns fail here, never
    /// during a crawl.
    pub fn new(include: &[String], exclude: &[String]) -> Result<Self> {
        let include = include
            .iter()
            .map(|p| Pattern::compile(p))
            .collect::<Result<Vec<_>>>()?;
        let exclude = exclude
            .iter()
            .map(|p| Pattern::compile(p))
            .collect::<Result<Vec<_>>>()?;

        Ok(Self { include, exclude })
    }

    /// Whether any patterns are configured at all.
    pub fn is_empty(&self) -> bool {
        self.include.is_empty() && self.exclude.is_empty()
    }

    /// Apply the decision rule to a URL.
    ///
    /// Exclusions win: any exclude match rejects the URL regardless of
    /// includes. With no include patterns everything not excluded passes;
    /// otherwise at least one include must match.
    pub fn should_include(&self, url: &Url) -> bool {
        let target = match_target(url);
        let base = basename(url);
        let base = base.as_deref();

        if self.exclude.iter().any(|p| p.matches(&target, base)) {
            tracing::trace!(%url, "rejected by exclude pattern");
            return false;
        }

        if self.include.is_empty() {
            return true;
        }

        let included = self.include.iter().any(|p| p.matches(&target, base));
        if !included {
            tracing::trace!(%url, "no include pattern matched");
        }
        included
    }

    /// The raw pattern strings, for diagnostics.
    pub fn describe(&self) -> (Vec<&str>, Vec<&str>) {
        (
            self.include.iter().map(|p| p.raw.as_str()).collect(),
            self.exclude.iter().map(|p| p.raw.as_str()).collect(),
        )
    }
}

/// The matching target: path + query, scheme and host stripped, always
/// starting with `/`.
fn match_target(url: &Url) -> String {
    let mut target = url.path().to_string();
    if !target.starts_with('/') {
        target.insert(0, '/');
    }
    if let Some(query) = url.query() {
        target.push('?');
        target.push_str(query);
    }
    target
}

/// The final path segment, tried independently for `file:` URLs so
/// basename-only globs work on local documentation trees.
fn basename(url: &Url) -> Option<String> {
    if url.scheme() != "file" {
        return None;
    }
    url.path_segments()
        .and_then(|mut segments| segments.next_back().map(|s| s.to_string()))
        .filter(|s| !s.is_empty())
}
