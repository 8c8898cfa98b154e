//! Generic text chunking on block, line, and character boundaries.

use docsweep_shared::{DocsweepError, Result};

use crate::Chunk;

/// Split plain text into chunks of at most `max_chunk_size` bytes.
///
/// Units are blank-line-delimited blocks with their separators kept attached,
/// so concatenating all chunks in order reproduces the input exactly. A block
/// that alone exceeds the budget is re-split on line boundaries, then on
/// `char` boundaries, so arbitrary text always fits — the only failure is a
/// budget too small to hold one character.
pub fn split_text(content: &str, max_chunk_size: usize) -> Result<Vec<Chunk>> {
    if content.len() <= max_chunk_size {
        return Ok(vec![Chunk::passthrough(content.to_string())]);
    }

    let mut chunks: Vec<Chunk> = Vec::new();
    let mut current = String::new();

    for block in block_units(content) {
        for piece in fit_units(block, max_chunk_size)? {
            if !current.is_empty() && current.len() + piece.len() > max_chunk_size {
                chunks.push(Chunk::new(std::mem::take(&mut current), max_chunk_size)?);
            }
            current.push_str(piece);
        }
    }

    if !current.is_empty() {
        chunks.push(Chunk::new(current, max_chunk_size)?);
    }

    tracing::debug!(
        input_len = content.len(),
        chunk_count = chunks.len(),
        "split text content"
    );

    Ok(chunks)
}

/// Partition text into blocks at blank-line boundaries.
///
/// The newline run that terminates a block stays attached to it, so the
/// units concatenate back to the original input byte-for-byte.
fn block_units(s: &str) -> Vec<&str> {
    let bytes = s.as_bytes();
    let mut units = Vec::new();
    let mut start = 0;
    let mut i = 0;

    while i + 1 < bytes.len() {
        if bytes[i] == b'\n' && bytes[i + 1] == b'\n' {
            let mut end = i + 2;
            while end < bytes.len() && bytes[end] == b'\n' {
                end += 1;
            }
            units.push(&s[start..end]);
            start = end;
            i = end;
        } else {
            i += 1;
        }
    }

    if start < s.len() {
        units.push(&s[start..]);
    }
    units
}

/// Break one unit into pieces that each fit the budget: the unit itself when
/// it fits, otherwise its lines, otherwise raw character runs.
fn fit_units(unit: &str, max_chunk_size: usize) -> Result<Vec<&str>> {
    if unit.len() <= max_chunk_size {
        return Ok(vec![unit]);
    }

    let mut pieces = Vec::new();
    for line in unit.split_inclusive('\n') {
        if line.len() <= max_chunk_size {
            pieces.push(line);
        } else {
            char_pieces(line, max_chunk_size, &mut pieces)?;
        }
    }
    Ok(pieces)
}

/// Hard-split a single overlong line on `char` boundaries.
fn char_pieces<'a>(
    line: &'a str,
    max_chunk_size: usize,
    out: &mut Vec<&'a str>,
) -> Result<()> {
    let mut start = 0;
    while start < line.len() {
        let mut end = (start + max_chunk_size).min(line.len());
        while end > start && !line.is_char_boundary(end) {
            end -= 1;
        }
        if end == start {
            // One character is wider than the whole budget.
            let ch_len = line[start..].chars().next().map_or(1, |c| c.len_utf8());
            return Err(DocsweepError::MinimumChunkSize {
                required: ch_len,
                budget: max_chunk_size,
            });
        }
        out.push(&line[start..end]);
        start = end;
    }
    Ok(())
}
