//! The fragment language: a small Python subset run by [`ScriptRunner`].
//!
//! [`ScriptRunner`]: crate::runner::ScriptRunner

pub mod ast;
pub mod error;
pub mod lexer;
pub mod parser;

pub use error::{SyntaxError, SyntaxErrorKind};
pub use parser::{parse_expression, parse_program};
