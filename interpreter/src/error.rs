use std::fmt;

use codespan_reporting::diagnostic::Diagnostic;
use tfd::ParseError;

use crate::error_mapper::FragmentError;
use crate::host::HostError;
use crate::scope_stack::ScopeError;

/// Everything that can stop a document run.
#[derive(Debug, thiserror::Error)]
pub enum ExecutionError {
    /// The source has zero length.
    #[error("empty document")]
    EmptyInput,
    #[error(transparent)]
    Parse(#[from] ParseError),
    /// Internal consistency failure while reconciling heading levels.
    #[error("scope reconciliation failed: {0}")]
    Scope(ScopeError),
    /// The host could not write output.
    #[error("output error: {0}")]
    Output(#[from] HostError),
    /// A fragment failure the host chose to halt on.
    #[error("{0}")]
    Fragment(Box<FragmentError>),
}

impl From<ScopeError> for ExecutionError {
    fn from(error: ScopeError) -> Self {
        match error {
            ScopeError::Host(host) => ExecutionError::Output(host),
            other => ExecutionError::Scope(other),
        }
    }
}

impl ExecutionError {
    /// Convert to a codespan-reporting Diagnostic for display.
    pub fn to_diagnostic(&self) -> Diagnostic<usize> {
        match self {
            ExecutionError::Parse(error) => error.to_diagnostic(),
            ExecutionError::Fragment(error) => error.to_diagnostic(),
            other => Diagnostic::error().with_message(other.to_string()),
        }
    }

    /// True for failures raised by fragment code rather than by the run itself.
    pub fn is_fragment(&self) -> bool {
        matches!(self, ExecutionError::Fragment(_))
    }
}

/// Whether a fragment failed before or while running.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// The fragment could not be parsed; no statement ran.
    Syntax,
    /// An exception was raised by a running statement.
    Runtime,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureKind::Syntax => write!(f, "syntax error"),
            FailureKind::Runtime => write!(f, "runtime error"),
        }
    }
}

/// A structured fragment failure as reported by a runner.
///
/// `line` is 1-based and relative to the fragment's own text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FragmentFailure {
    pub kind: FailureKind,
    pub exception: String,
    pub message: String,
    pub line: usize,
}

impl fmt::Display for FragmentFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.message.is_empty() {
            write!(f, "{}", self.exception)
        } else {
            write!(f, "{}: {}", self.exception, self.message)
        }
    }
}

impl From<RuntimeError> for FragmentFailure {
    fn from(error: RuntimeError) -> Self {
        FragmentFailure {
            kind: FailureKind::Runtime,
            exception: error.exception,
            message: error.message,
            line: error.line,
        }
    }
}

/// Result of handing one unit to a runner.
#[derive(Debug, thiserror::Error)]
pub enum RunError {
    #[error("{0}")]
    Failure(FragmentFailure),
    #[error(transparent)]
    Host(#[from] HostError),
}

/// An exception raised while evaluating fragment code.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{exception}: {message}")]
pub struct RuntimeError {
    pub exception: String,
    pub message: String,
    /// Line of the innermost statement being executed; 0 until known.
    pub line: usize,
}

impl RuntimeError {
    pub fn new(exception: impl Into<String>, message: impl Into<String>) -> Self {
        RuntimeError {
            exception: exception.into(),
            message: message.into(),
            line: 0,
        }
    }

    pub fn type_error(message: impl Into<String>) -> Self {
        RuntimeError::new("TypeError", message)
    }

    pub fn value_error(message: impl Into<String>) -> Self {
        RuntimeError::new("ValueError", message)
    }

    pub fn name_error(name: &str) -> Self {
        RuntimeError::new("NameError", format!("name '{}' is not defined", name))
    }

    pub fn zero_division(message: impl Into<String>) -> Self {
        RuntimeError::new("ZeroDivisionError", message)
    }

    /// Attach the statement line unless an inner statement already did.
    pub fn at_line(mut self, line: usize) -> Self {
        if self.line == 0 {
            self.line = line;
        }
        self
    }
}
