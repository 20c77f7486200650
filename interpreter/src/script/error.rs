use crate::error::{FailureKind, FragmentFailure};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyntaxErrorKind {
    Syntax,
    Indentation,
}

impl SyntaxErrorKind {
    pub fn exception(self) -> &'static str {
        match self {
            SyntaxErrorKind::Syntax => "SyntaxError",
            SyntaxErrorKind::Indentation => "IndentationError",
        }
    }
}

/// A fragment that could not be parsed. `line` is 1-based within the fragment.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message} (line {line})")]
pub struct SyntaxError {
    pub kind: SyntaxErrorKind,
    pub message: String,
    pub line: usize,
}

impl SyntaxError {
    pub fn new(message: impl Into<String>, line: usize) -> Self {
        SyntaxError {
            kind: SyntaxErrorKind::Syntax,
            message: message.into(),
            line,
        }
    }

    pub fn indentation(message: impl Into<String>, line: usize) -> Self {
        SyntaxError {
            kind: SyntaxErrorKind::Indentation,
            message: message.into(),
            line,
        }
    }
}

impl From<SyntaxError> for FragmentFailure {
    fn from(error: SyntaxError) -> Self {
        FragmentFailure {
            kind: FailureKind::Syntax,
            exception: error.kind.exception().to_string(),
            message: error.message,
            line: error.line,
        }
    }
}
