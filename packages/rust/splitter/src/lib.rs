//! Size-bounded content chunking with structure-aware strategies.
//!
//! Oversized normalized content is divided along the largest structural
//! boundary its shape offers: top-level member boundaries for JSON, row
//! boundaries for Markdown tables, blank-line block boundaries for everything
//! else. Chunks are filled greedily and each carries whatever decoration its
//! format needs to stay independently valid (table header + separator, JSON
//! brackets).
//!
//! The only error a split can produce is [`DocsweepError::MinimumChunkSize`]:
//! a single atomic unit plus its mandatory decoration does not fit the
//! budget. That is a configuration problem and is surfaced, never truncated.

mod json;
mod table;
mod text;

pub use json::split_json;
pub use table::split_table;
pub use text::split_text;

use docsweep_shared::{DocsweepError, Result};

/// Default chunk budget in bytes.
pub const DEFAULT_MAX_CHUNK_SIZE: usize = 4096;

// ---------------------------------------------------------------------------
// Chunk
// ---------------------------------------------------------------------------

/// A size-bounded, independently valid fragment of normalized content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    /// The chunk text, including any structural decoration.
    pub content: String,
}

impl Chunk {
    /// Construct a chunk, enforcing the size invariant.
    pub(crate) fn new(content: String, max_chunk_size: usize) -> Result<Self> {
        if content.len() > max_chunk_size {
            return Err(DocsweepError::MinimumChunkSize {
                required: content.len(),
                budget: max_chunk_size,
            });
        }
        Ok(Self { content })
    }

    /// Construct without the size check.
    ///
    /// Only for the single-chunk passthrough cases (whole input fits, or an
    /// indivisible top-level JSON scalar that is returned as-is).
    pub(crate) fn passthrough(content: String) -> Self {
        Self { content }
    }

    /// Byte length of the chunk content.
    pub fn len(&self) -> usize {
        self.content.len()
    }

    /// Whether the chunk is empty.
    pub fn is_empty(&self) -> bool {
        self.content.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Options and entry point
// ---------------------------------------------------------------------------

/// Options controlling a split.
#[derive(Debug, Clone)]
pub struct SplitOptions {
    /// Maximum chunk size in bytes, decoration included.
    pub max_chunk_size: usize,
}

impl Default for SplitOptions {
    fn default() -> Self {
        Self {
            max_chunk_size: DEFAULT_MAX_CHUNK_SIZE,
        }
    }
}

/// Split content along the largest structural boundary its shape offers.
///
/// Shape detection runs once: content parsing as a top-level JSON array or
/// object uses the JSON strategy, content opening with a Markdown table
/// header + separator uses the table strategy, everything else is treated
/// as generic text. Each strategy is also callable directly.
pub fn split(content: &str, options: &SplitOptions) -> Result<Vec<Chunk>> {
    let max = options.max_chunk_size;

    if looks_like_json(content) {
        return split_json(content, max);
    }
    if looks_like_table(content) {
        return split_table(content, max);
    }
    split_text(content, max)
}

/// JSON shape: first significant byte opens a container and the whole input
/// parses. Bare scalars are left to the text strategy.
fn looks_like_json(content: &str) -> bool {
    let trimmed = content.trim_start();
    if !(trimmed.starts_with('{') || trimmed.starts_with('[')) {
        return false;
    }
    serde_json::from_str::<serde_json::Value>(content).is_ok()
}

/// Table shape: the first non-empty line is a `|`-delimited row and the
/// second is a separator row of dashes.
fn looks_like_table(content: &str) -> bool {
    let mut lines = content.lines().filter(|l| !l.trim().is_empty());
    let Some(header) = lines.next() else {
        return false;
    };
    let Some(separator) = lines.next() else {
        return false;
    };

    header.trim_start().starts_with('|') && table::is_separator_row(separator)
}
