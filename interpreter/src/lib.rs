pub mod builtins;
pub mod environment;
pub mod error;
pub mod error_mapper;
pub mod evaluator;
pub mod executor;
pub mod host;
pub mod runner;
pub mod runtime_value;
pub mod scope_stack;
pub mod script;
pub mod unit;
pub mod writer;

pub use environment::Environment;
pub use error::{ExecutionError, FailureKind, FragmentFailure, RunError, RuntimeError};
pub use error_mapper::{FragmentError, map_failure};
pub use executor::{RunSummary, execute, execute_source, execute_source_with};
pub use host::{ErrorAction, Host, HostError, ScopeHandle, ScopeInfo};
pub use runner::{FragmentRunner, ScriptRunner};
pub use runtime_value::{RuntimeValue, ScopeRef};
pub use scope_stack::{ScopeEntry, ScopeError, ScopeStack};
pub use unit::ExecutionUnit;
pub use writer::MarkdownWriter;
