use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error_mapper::FragmentError;

/// What the executor tells the host about a scope it opens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScopeInfo {
    pub name: String,
    /// Heading level; 0 for the header scope.
    pub level: usize,
    /// `/`-separated names of the real scopes from the root, this one included.
    pub path: String,
    /// The heading as written, when the scope comes from a heading.
    pub heading: Option<String>,
}

/// Opaque token identifying a scope opened by a host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ScopeHandle(pub usize);

/// The host's answer to a reported fragment error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ErrorAction {
    /// Stop the run; the error propagates to the caller.
    #[default]
    Halt,
    /// Skip the remaining content of the current section (or intro).
    SkipSection,
    /// Carry on with the next node.
    Continue,
}

impl fmt::Display for ErrorAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorAction::Halt => write!(f, "halt"),
            ErrorAction::SkipSection => write!(f, "skip-section"),
            ErrorAction::Continue => write!(f, "continue"),
        }
    }
}

impl FromStr for ErrorAction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "halt" => Ok(ErrorAction::Halt),
            "skip-section" => Ok(ErrorAction::SkipSection),
            "continue" => Ok(ErrorAction::Continue),
            other => Err(format!(
                "unknown error action '{}' (expected halt, skip-section or continue)",
                other
            )),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum HostError {
    #[error("{0}")]
    Io(#[from] std::io::Error),
    /// The host refused a request, e.g. closing a handle it never issued.
    #[error("{0}")]
    Rejected(String),
}

/// The environment a document runs in.
///
/// The executor opens and closes scopes in strictly nested order and
/// routes all fragment output through [`Host::emit_text`].
pub trait Host {
    fn open_scope(&mut self, info: &ScopeInfo) -> Result<ScopeHandle, HostError>;

    fn close_scope(&mut self, handle: ScopeHandle) -> Result<(), HostError>;

    fn emit_text(&mut self, text: &str) -> Result<(), HostError>;

    /// Receive a fragment error with its document context and decide how
    /// the run goes on.
    fn report_recoverable_error(&mut self, error: &FragmentError) -> ErrorAction;

    fn report_fatal_error(&mut self, message: &str);
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("halt", ErrorAction::Halt)]
    #[case("skip-section", ErrorAction::SkipSection)]
    #[case("continue", ErrorAction::Continue)]
    fn error_action_round_trips_through_text(#[case] text: &str, #[case] action: ErrorAction) {
        assert_eq!(text.parse::<ErrorAction>(), Ok(action));
        assert_eq!(action.to_string(), text);
    }

    #[test]
    fn unknown_error_action() {
        assert!("stop".parse::<ErrorAction>().is_err());
    }
}
