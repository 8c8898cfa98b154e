//! Markdown table chunking that keeps every chunk a complete table.

use docsweep_shared::{DocsweepError, Result};

use crate::Chunk;

/// Split a Markdown table into chunks that each re-parse as a valid table.
///
/// Every chunk opens with the original header row verbatim followed by a
/// normalized separator of `|---|` per column, with the column count taken
/// from the header. The decoration is charged against every chunk's budget
/// before any rows are added; a data row that cannot fit alongside it raises
/// [`DocsweepError::MinimumChunkSize`].
///
/// Data rows are carried verbatim and, concatenated across chunks in order,
/// reproduce the original row sequence exactly.
pub fn split_table(content: &str, max_chunk_size: usize) -> Result<Vec<Chunk>> {
    if content.len() <= max_chunk_size {
        return Ok(vec![Chunk::passthrough(content.to_string())]);
    }

    let lines: Vec<&str> = content.lines().collect();
    let Some(header_idx) = lines.iter().position(|l| !l.trim().is_empty()) else {
        return Ok(vec![Chunk::passthrough(String::new())]);
    };
    let header = lines[header_idx];

    let mut rows: Vec<&str> = lines[header_idx + 1..].to_vec();
    if rows.first().is_some_and(|r| is_separator_row(r)) {
        rows.remove(0);
    }

    let decoration = format!("{header}\n{}", separator_row(column_count(header)));
    if decoration.len() > max_chunk_size {
        return Err(DocsweepError::MinimumChunkSize {
            required: decoration.len(),
            budget: max_chunk_size,
        });
    }

    let mut chunks: Vec<Chunk> = Vec::new();
    let mut current = decoration.clone();
    let mut current_has_rows = false;

    for row in rows {
        // +1 for the newline that joins the row on.
        let required = decoration.len() + 1 + row.len();
        if required > max_chunk_size {
            return Err(DocsweepError::MinimumChunkSize {
                required,
                budget: max_chunk_size,
            });
        }

        if current.len() + 1 + row.len() > max_chunk_size {
            chunks.push(Chunk::new(current, max_chunk_size)?);
            current = decoration.clone();
        }
        current.push('\n');
        current.push_str(row);
        current_has_rows = true;
    }

    if current_has_rows || chunks.is_empty() {
        chunks.push(Chunk::new(current, max_chunk_size)?);
    }

    tracing::debug!(
        input_len = content.len(),
        chunk_count = chunks.len(),
        "split table content"
    );

    Ok(chunks)
}

/// Number of columns declared by the header row.
fn column_count(header: &str) -> usize {
    let trimmed = header.trim().trim_start_matches('|').trim_end_matches('|');
    trimmed.split('|').count().max(1)
}

/// The normalized separator row: `|---|` repeated once per column.
fn separator_row(columns: usize) -> String {
    let mut row = String::with_capacity(4 * columns + 1);
    row.push('|');
    for _ in 0..columns {
        row.push_str("---|");
    }
    row
}

/// Whether a line is a table separator row (pipes, dashes, colons, spaces).
pub(crate) fn is_separator_row(line: &str) -> bool {
    let trimmed = line.trim();
    !trimmed.is_empty()
        && trimmed.contains('-')
        && trimmed
            .chars()
            .all(|c| matches!(c, '|' | '-' | ':' | ' '))
}
