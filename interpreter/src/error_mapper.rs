use std::fmt;
use std::ops::Range;

use codespan_reporting::diagnostic::{Diagnostic, Label};
use tfd::SourceDocument;

use crate::error::{FailureKind, FragmentFailure};
use crate::unit::ExecutionUnit;

/// A fragment failure placed back into the document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FragmentError {
    pub kind: FailureKind,
    pub exception: String,
    /// The exception's own message.
    pub detail: String,
    /// Synthetic name of the failing unit.
    pub unit: String,
    /// 1-based document line of the failing statement.
    pub line: usize,
    /// Every line of the origin node, numbered with document lines.
    pub listing: String,
    /// Byte range of the failing line.
    pub span: Range<usize>,
    pub file_id: usize,
}

impl FragmentError {
    /// `runtime error: ValueError: bad value`
    pub fn summary(&self) -> String {
        if self.detail.is_empty() {
            format!("{}: {}", self.kind, self.exception)
        } else {
            format!("{}: {}: {}", self.kind, self.exception, self.detail)
        }
    }

    /// Summary, location and listing.
    pub fn message(&self) -> String {
        format!(
            "{} (line {} of {})\n\nCode block (in document):\n{}",
            self.summary(),
            self.line,
            self.unit,
            self.listing
        )
    }

    /// Convert to a codespan-reporting Diagnostic for display.
    pub fn to_diagnostic(&self) -> Diagnostic<usize> {
        Diagnostic::error()
            .with_message(self.summary())
            .with_labels(vec![
                Label::primary(self.file_id, self.span.clone())
                    .with_message(format!("{} raised here", self.exception)),
            ])
            .with_notes(vec![format!(
                "Code block (in document):\n{}",
                self.listing
            )])
    }
}

impl fmt::Display for FragmentError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message())
    }
}

impl std::error::Error for FragmentError {}

/// Translate a runner failure into document terms.
///
/// The failing document line is
/// `line_offset + fragment line + code_offset`, clamped to the origin's
/// lines.
pub fn map_failure(
    unit: &ExecutionUnit<'_, '_>,
    failure: &FragmentFailure,
    source: &SourceDocument,
) -> FragmentError {
    let lines: Vec<&str> = unit.origin.raw_text().lines().collect();
    let first = unit.first_line();
    let last = first + lines.len().saturating_sub(1);
    let line = (unit.line_offset + failure.line + unit.code_offset).clamp(first, last);

    let span = source
        .line_span(line)
        .unwrap_or_else(|| unit.origin.span().clone());

    FragmentError {
        kind: failure.kind,
        exception: failure.exception.clone(),
        detail: failure.message.clone(),
        unit: unit.name.clone(),
        line,
        listing: numbered_listing(&lines, first, line),
        span,
        file_id: source.file_id(),
    }
}

/// `  41|  code` for each line, `  42|> code` for the failing one.
fn numbered_listing(lines: &[&str], first: usize, marked: usize) -> String {
    let last = first + lines.len().saturating_sub(1);
    let width = last.to_string().len();
    lines
        .iter()
        .enumerate()
        .map(|(i, text)| {
            let number = first + i;
            let marker = if number == marked { "|>" } else { "| " };
            format!("  {:>width$}{} {}", number, marker, text, width = width)
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tfd::{Content, ParseNode, Parser};

    fn failure(kind: FailureKind, line: usize) -> FragmentFailure {
        FragmentFailure {
            kind,
            exception: "ValueError".into(),
            message: "x".into(),
            line,
        }
    }

    #[test]
    fn code_failure_maps_to_document_line() {
        let mut text = "filler\n".repeat(39);
        text.push_str("```python:testflows\nx = 1\nraise ValueError(\"x\")\n```\n");
        let source = SourceDocument::new("doc.tfd", text);
        let doc = Parser::new(source.text(), 0).parse().unwrap();
        let code = doc
            .intro
            .children
            .iter()
            .find_map(|c| match c {
                Content::ExecCode(code) => Some(code),
                Content::TextRun(_) => None,
            })
            .unwrap();

        let unit = ExecutionUnit::code(code, &source);
        assert_eq!(unit.first_line(), 40);
        let error = map_failure(&unit, &failure(FailureKind::Runtime, 2), &source);

        assert_eq!(error.line, 42);
        assert_eq!(
            error.listing,
            [
                "  40|  ```python:testflows",
                "  41|  x = 1",
                "  42|> raise ValueError(\"x\")",
                "  43|  ```",
            ]
            .join("\n")
        );
        assert_eq!(&source.text()[error.span.clone()], "raise ValueError(\"x\")");
        assert_eq!(error.summary(), "runtime error: ValueError: x");
    }

    #[test]
    fn listing_pads_to_widest_number() {
        let listing = numbered_listing(&["a", "b", "c"], 8, 10);
        assert_eq!(listing, "   8|  a\n   9|  b\n  10|> c");
    }

    #[test]
    fn text_failure_stays_on_the_text_line() {
        let source = SourceDocument::new("doc.tfd", "# A\nsome text\n");
        let doc = Parser::new(source.text(), 0).parse().unwrap();
        let Content::TextRun(run) = &doc.sections[0].children[0] else {
            panic!("expected text run");
        };
        let unit = ExecutionUnit::text(ParseNode::TextRun(run), run.raw, &source);
        let error = map_failure(&unit, &failure(FailureKind::Syntax, 1), &source);
        assert_eq!(error.line, 2);
        assert_eq!(error.listing, "  2|> some text");
        assert!(error.message().starts_with("syntax error: ValueError: x (line 2 of <doc.tfd:2>)"));
    }

    #[test]
    fn out_of_range_lines_are_clamped() {
        let source = SourceDocument::new("doc.tfd", "```python:testflows\npass\n```\n");
        let doc = Parser::new(source.text(), 0).parse().unwrap();
        let Content::ExecCode(code) = &doc.intro.children[0] else {
            panic!("expected exec code");
        };
        let unit = ExecutionUnit::code(code, &source);
        let error = map_failure(&unit, &failure(FailureKind::Runtime, 99), &source);
        assert_eq!(error.line, 3);
    }
}
