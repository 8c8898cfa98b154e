//! Cleanup passes applied to normalized Markdown output.
//!
//! Each pass is a function `&str -> String` applied in sequence.

use std::sync::LazyLock;

use regex::Regex;

/// Run the cleanup passes on normalized Markdown.
pub(crate) fn run_passes(md: &str) -> String {
    let mut result = md.to_string();

    result = collapse_blank_lines(&result);
    result = fix_code_block_languages(&result);
    result = ensure_trailing_newline(&result);

    result
}

/// Collapse runs of 3+ blank lines into exactly 2.
fn collapse_blank_lines(md: &str) -> String {
    static MULTI_BLANK_RE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"\n{4,}").expect("valid regex"));

    MULTI_BLANK_RE.replace_all(md, "\n\n\n").to_string()
}

/// Normalize code fence language hints that carry class-name prefixes
/// (`language-js`, `lang-python`, `highlight-rust`).
fn fix_code_block_languages(md: &str) -> String {
    static LANG_PREFIX_RE: LazyLock<Regex> = LazyLock::new(|| {
        Regex::new(r"(?m)^```(?:language-|lang-|highlight-)(\w+)").expect("valid regex")
    });

    LANG_PREFIX_RE.replace_all(md, "```$1").to_string()
}

/// End the document with exactly one newline.
fn ensure_trailing_newline(md: &str) -> String {
    let trimmed = md.trim_end_matches('\n');
    if trimmed.is_empty() {
        return String::new();
    }
    format!("{trimmed}\n")
}
