//! Line-level terminals of the document grammar.
//!
//! Each rule matches the content of a single line, without its newline.

use once_cell::sync::Lazy;
use regex::Regex;

/// `---` header delimiter.
static HEADER_SEPARATOR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^---\s*$").expect("header separator pattern"));

/// Opening fence of an executable block: up to three whitespace characters,
/// three backticks or tildes, the `python:testflows` tag.
static EXEC_CODE_START: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s?\s?\s?[`~][`~][`~]python:testflows\s*$").expect("fence start pattern")
});

/// Closing fence of an executable block.
static EXEC_CODE_END: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s?\s?\s?[`~][`~][`~]\s*$").expect("fence end pattern"));

/// `## Title`
static ATX_HEADING: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*(#+)\s+(\S.*)$").expect("atx heading pattern"));

/// `====` or `----` under a setext heading title.
static SETEXT_UNDERLINE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^([-=])[-=]*\s*$").expect("setext underline pattern"));

pub(crate) fn is_header_separator(line: &str) -> bool {
    HEADER_SEPARATOR.is_match(line)
}

pub(crate) fn is_exec_code_start(line: &str) -> bool {
    EXEC_CODE_START.is_match(line)
}

pub(crate) fn is_exec_code_end(line: &str) -> bool {
    EXEC_CODE_END.is_match(line)
}

pub(crate) fn is_blank(line: &str) -> bool {
    line.trim().is_empty()
}

/// Level and raw title of an ATX heading line.
pub(crate) fn atx_heading(line: &str) -> Option<(usize, &str)> {
    let captures = ATX_HEADING.captures(line)?;
    let level = captures.get(1)?.as_str().len();
    let title = captures.get(2)?.as_str();
    Some((level, title))
}

/// Level implied by a setext underline: `=` is 1, `-` is 2.
pub(crate) fn setext_underline(line: &str) -> Option<usize> {
    let captures = SETEXT_UNDERLINE.captures(line)?;
    match captures.get(1)?.as_str() {
        "=" => Some(1),
        _ => Some(2),
    }
}
