use std::ops::Range;

use codespan_reporting::diagnostic::{Diagnostic, Label};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseErrorKind {
    /// The source has zero length; parsing was not attempted.
    EmptyInput,
    /// A `---` header was opened but never closed.
    UnterminatedHeader,
    /// A `python:testflows` fence was opened but never closed.
    UnterminatedFence,
}

/// Structural parse errors with source location information.
///
/// All of these are fatal for the document: nothing is executed.
#[derive(Debug, Clone, thiserror::Error)]
#[error("{message}")]
pub struct ParseError {
    pub kind: ParseErrorKind,
    pub message: String,
    pub span: Range<usize>,
    pub file_id: usize,
    pub notes: Vec<String>,
}

impl ParseError {
    pub fn new(
        kind: ParseErrorKind,
        message: impl Into<String>,
        span: Range<usize>,
        file_id: usize,
    ) -> Self {
        ParseError {
            kind,
            message: message.into(),
            span,
            file_id,
            notes: Vec::new(),
        }
    }

    pub fn empty_input(file_id: usize) -> Self {
        ParseError::new(ParseErrorKind::EmptyInput, "empty document", 0..0, file_id)
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.notes.push(note.into());
        self
    }

    /// Convert to a codespan-reporting Diagnostic for display.
    pub fn to_diagnostic(&self) -> Diagnostic<usize> {
        let labels = if self.kind == ParseErrorKind::EmptyInput {
            Vec::new()
        } else {
            vec![Label::primary(self.file_id, self.span.clone()).with_message("opened here")]
        };
        Diagnostic::error()
            .with_message(&self.message)
            .with_labels(labels)
            .with_notes(self.notes.clone())
    }
}
