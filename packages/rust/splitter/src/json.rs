//! JSON chunking on top-level member boundaries.

use serde_json::Value;

use docsweep_shared::{DocsweepError, Result};

use crate::{Chunk, text};

/// Split a JSON document into independently parseable chunks.
///
/// A top-level array becomes disjoint, ordered sub-arrays; a top-level
/// object becomes objects whose key sets partition the original keys with
/// insertion order preserved. A single member that cannot fit with its
/// enclosing brackets raises [`DocsweepError::MinimumChunkSize`]. Other
/// top-level values are indivisible and come back as one chunk.
///
/// Input that does not parse as JSON degrades to the generic text strategy
/// rather than failing the split.
pub fn split_json(content: &str, max_chunk_size: usize) -> Result<Vec<Chunk>> {
    if content.len() <= max_chunk_size {
        return Ok(vec![Chunk::passthrough(content.to_string())]);
    }

    let value: Value = match serde_json::from_str(content) {
        Ok(v) => v,
        Err(err) => {
            tracing::debug!(%err, "content is not valid JSON, splitting as text");
            return text::split_text(content, max_chunk_size);
        }
    };

    let chunks = match value {
        Value::Array(items) => {
            let members = items
                .iter()
                .map(|item| serde_json::to_string(item).expect("value reserializes"))
                .collect::<Vec<_>>();
            pack_members(members, max_chunk_size, '[', ']')?
        }
        Value::Object(map) => {
            let members = map
                .iter()
                .map(|(key, val)| {
                    format!(
                        "{}:{}",
                        serde_json::to_string(key).expect("key reserializes"),
                        serde_json::to_string(val).expect("value reserializes")
                    )
                })
                .collect::<Vec<_>>();
            pack_members(members, max_chunk_size, '{', '}')?
        }
        // A bare scalar has no member boundary to divide along.
        _ => vec![Chunk::passthrough(content.to_string())],
    };

    tracing::debug!(
        input_len = content.len(),
        chunk_count = chunks.len(),
        "split json content"
    );

    Ok(chunks)
}

/// Greedily pack serialized members into bracket-decorated chunks.
fn pack_members(
    members: Vec<String>,
    max_chunk_size: usize,
    open: char,
    close: char,
) -> Result<Vec<Chunk>> {
    // Opening and closing bracket are charged against every chunk.
    const BRACKETS: usize = 2;

    if members.is_empty() {
        let empty = format!("{open}{close}");
        return Ok(vec![Chunk::new(empty, max_chunk_size)?]);
    }

    let mut chunks: Vec<Chunk> = Vec::new();
    let mut current: Vec<String> = Vec::new();
    let mut current_len = BRACKETS;

    for member in members {
        let alone = member.len() + BRACKETS;
        if alone > max_chunk_size {
            return Err(DocsweepError::MinimumChunkSize {
                required: alone,
                budget: max_chunk_size,
            });
        }

        // +1 for the comma separating it from the previous member.
        let added = member.len() + if current.is_empty() { 0 } else { 1 };
        if current_len + added > max_chunk_size {
            chunks.push(assemble(&current, open, close, max_chunk_size)?);
            current.clear();
            current_len = BRACKETS + member.len();
        } else {
            current_len += added;
        }
        current.push(member);
    }

    if !current.is_empty() {
        chunks.push(assemble(&current, open, close, max_chunk_size)?);
    }

    Ok(chunks)
}

fn assemble(members: &[String], open: char, close: char, max_chunk_size: usize) -> Result<Chunk> {
    let mut out = String::with_capacity(2 + members.iter().map(|m| m.len() + 1).sum::<usize>());
    out.push(open);
    out.push_str(&members.join(","));
    out.push(close);
    Chunk::new(out, max_chunk_size)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn array_roundtrips_through_chunks() {
        let items: Vec<u64> = (0..100).collect();
        let content = serde_json::to_string(&items).unwrap();

        let chunks = split_json(&content, 64).unwrap();
        assert!(chunks.len() > 1);

        let mut collected: Vec<u64> = Vec::new();
        for chunk in &chunks {
            assert!(chunk.len() <= 64);
            let parsed: Vec<u64> =
                serde_json::from_str(&chunk.content).expect("chunk parses as array");
            collected.extend(parsed);
        }
        assert_eq!(collected, items);
    }

    #[test]
    fn object_keys_partition_in_insertion_order() {
        let mut content = String::from("{");
        for i in 0..40 {
            if i > 0 {
                content.push(',');
            }
            content.push_str(&format!("\"key_{i:02}\":\"value number {i}\""));
        }
        content.push('}');

        let chunks = split_json(&content, 96).unwrap();
        assert!(chunks.len() > 1);

        let mut collected: Vec<String> = Vec::new();
        for chunk in &chunks {
            assert!(chunk.len() <= 96);
            let parsed: serde_json::Map<String, Value> =
                serde_json::from_str(&chunk.content).expect("chunk parses as object");
            collected.extend(parsed.keys().cloned());
        }

        let expected: Vec<String> = (0..40).map(|i| format!("key_{i:02}")).collect();
        assert_eq!(collected, expected);
    }

    #[test]
    fn small_input_is_returned_verbatim() {
        let content = "[1, 2, 3]";
        let chunks = split_json(content, 64).unwrap();
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].content, content);
    }

    #[test]
    fn single_oversized_member_fails() {
        let content = format!("[\"{}\",\"b\"]", "a".repeat(100));
        let err = split_json(&content, 32).unwrap_err();
        match err {
            DocsweepError::MinimumChunkSize { required, budget } => {
                assert_eq!(budget, 32);
                assert!(required > 32);
            }
            other => panic!("expected MinimumChunkSize, got {other:?}"),
        }
    }

    #[test]
    fn oversized_scalar_is_one_chunk() {
        let content = format!("\"{}\"", "s".repeat(100));
        let chunks = split_json(&content, 16).unwrap();
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].content, content);
    }

    #[test]
    fn nested_members_stay_intact() {
        let content =
            r#"[{"name":"alpha","tags":[1,2]},{"name":"beta","tags":[3,4]},{"name":"gamma","tags":[5,6]}]"#;
        let chunks = split_json(content, 48).unwrap();

        let mut names: Vec<String> = Vec::new();
        for chunk in &chunks {
            let parsed: Vec<Value> = serde_json::from_str(&chunk.content).unwrap();
            names.extend(
                parsed
                    .iter()
                    .map(|v| v["name"].as_str().unwrap().to_string()),
            );
        }
        assert_eq!(names, vec!["alpha", "beta", "gamma"]);
    }

    #[test]
    fn invalid_json_degrades_to_text() {
        let content = "{broken json ".repeat(10);
        let chunks = split_json(&content, 32).unwrap();
        assert!(chunks.len() > 1);
        let rejoined: String = chunks.iter().map(|c| c.content.as_str()).collect();
        assert_eq!(rejoined, content);
    }
}
