use std::ops::Range;

use codespan_reporting::files::line_starts;

/// The complete text of one executable document.
///
/// The buffer is immutable for the lifetime of a run; parse trees borrow
/// their raw text slices from it.
#[derive(Debug, Clone)]
pub struct SourceDocument {
    name: String,
    text: String,
    /// Source file ID (for error reporting with codespan-reporting).
    file_id: usize,
    /// Byte offset of the first character of every line.
    line_starts: Vec<usize>,
}

impl SourceDocument {
    pub fn new(name: impl Into<String>, text: impl Into<String>) -> Self {
        let text = text.into();
        let line_starts = line_starts(&text).collect();
        SourceDocument {
            name: name.into(),
            text,
            file_id: 0,
            line_starts,
        }
    }

    pub fn with_file_id(mut self, file_id: usize) -> Self {
        self.file_id = file_id;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn file_id(&self) -> usize {
        self.file_id
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    /// Number of newline characters strictly before `offset`.
    pub fn line_offset(&self, offset: usize) -> usize {
        match self.line_starts.binary_search(&offset) {
            Ok(index) => index,
            Err(index) => index.saturating_sub(1),
        }
    }

    /// 1-based line number containing `offset`.
    pub fn line_number(&self, offset: usize) -> usize {
        self.line_offset(offset) + 1
    }

    pub fn line_count(&self) -> usize {
        self.line_starts.len()
    }

    /// Byte range of the 1-based `line`, excluding its newline.
    pub fn line_span(&self, line: usize) -> Option<Range<usize>> {
        let start = *self.line_starts.get(line.checked_sub(1)?)?;
        let end = self
            .line_starts
            .get(line)
            .map(|next| next - 1)
            .unwrap_or(self.text.len());
        Some(start..end)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn line_offset_counts_preceding_newlines() {
        let source = SourceDocument::new("doc", "a\nbc\n\nd");
        assert_eq!(source.line_offset(0), 0);
        assert_eq!(source.line_offset(1), 0);
        assert_eq!(source.line_offset(2), 1);
        assert_eq!(source.line_offset(4), 1);
        assert_eq!(source.line_offset(5), 2);
        assert_eq!(source.line_offset(6), 3);
        assert_eq!(source.line_number(6), 4);
    }

    #[test]
    fn line_span_excludes_newline() {
        let source = SourceDocument::new("doc", "first\nsecond\n");
        assert_eq!(source.line_span(1), Some(0..5));
        assert_eq!(source.line_span(2), Some(6..12));
        assert_eq!(source.line_span(3), Some(13..13));
        assert_eq!(source.line_span(4), None);
        assert_eq!(source.line_span(0), None);
    }
}
