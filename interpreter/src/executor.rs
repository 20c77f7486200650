use tfd::{Content, Document, Header, ParseNode, SourceDocument};

use crate::environment::Environment;
use crate::error::{ExecutionError, RunError};
use crate::error_mapper::map_failure;
use crate::host::{ErrorAction, Host, ScopeInfo};
use crate::runner::{FragmentRunner, ScriptRunner};
use crate::runtime_value::ScopeRef;
use crate::scope_stack::ScopeStack;
use crate::unit::ExecutionUnit;

/// Counts gathered over one run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// Units dispatched, text and code.
    pub units: usize,
    pub code_units: usize,
    pub sections: usize,
    /// Fragment errors the host chose to recover from.
    pub errors: usize,
}

/// Parse and run `source` with a fresh environment and the script runner.
pub fn execute_source(
    source: &SourceDocument,
    host: &mut dyn Host,
) -> Result<RunSummary, ExecutionError> {
    let mut env = Environment::new();
    execute_source_with(source, &mut env, host, &mut ScriptRunner)
}

/// Parse and run `source`, reporting empty input and parse failures to the
/// host as fatal errors.
pub fn execute_source_with(
    source: &SourceDocument,
    env: &mut Environment,
    host: &mut dyn Host,
    runner: &mut dyn FragmentRunner,
) -> Result<RunSummary, ExecutionError> {
    if source.is_empty() {
        let error = ExecutionError::EmptyInput;
        host.report_fatal_error(&error.to_string());
        return Err(error);
    }

    let document = match tfd::parse(source) {
        Ok(document) => document,
        Err(error) => {
            host.report_fatal_error(&error.to_string());
            return Err(error.into());
        }
    };

    execute(&document, source, env, host, runner)
}

/// Run a parsed document.
///
/// Every scope the run opens is closed before this returns, whether the
/// run succeeded or not.
pub fn execute(
    document: &Document<'_>,
    source: &SourceDocument,
    env: &mut Environment,
    host: &mut dyn Host,
    runner: &mut dyn FragmentRunner,
) -> Result<RunSummary, ExecutionError> {
    let mut executor = Executor {
        source,
        env,
        host,
        runner,
        stack: ScopeStack::new(),
        summary: RunSummary::default(),
    };

    let result = executor.run(document);
    let closed = executor.stack.close_all(executor.host);
    let result = match (result, closed) {
        (Err(error), _) => Err(error),
        (Ok(()), Err(error)) => Err(error.into()),
        (Ok(()), Ok(())) => Ok(executor.summary),
    };

    if let Err(error) = &result
        && !error.is_fragment()
    {
        host.report_fatal_error(&error.to_string());
    }
    result
}

/// What to do with the rest of the current section after a unit.
enum Step {
    Next,
    SkipSection,
}

struct Executor<'e> {
    source: &'e SourceDocument,
    env: &'e mut Environment,
    host: &'e mut dyn Host,
    runner: &'e mut dyn FragmentRunner,
    stack: ScopeStack,
    summary: RunSummary,
}

impl Executor<'_> {
    fn run(&mut self, document: &Document<'_>) -> Result<(), ExecutionError> {
        if let Some(header) = &document.header {
            self.header(header)?;
        }

        self.contents(&document.intro.children)?;

        for section in &document.sections {
            self.summary.sections += 1;
            self.stack.enter(
                section.level(),
                section.title(),
                Some(section.heading.raw),
                self.host,
            )?;
            self.contents(&section.children)?;
        }
        Ok(())
    }

    /// The header runs in its own scope, outside the heading stack.
    fn header(&mut self, header: &Header<'_>) -> Result<(), ExecutionError> {
        let info = ScopeInfo {
            name: "header".to_string(),
            level: 0,
            path: "/header".to_string(),
            heading: None,
        };
        let handle = self.host.open_scope(&info)?;
        log::debug!("open scope {}", info.path);

        let scope = ScopeRef {
            name: info.name,
            level: info.level,
            path: info.path,
        };
        let unit = ExecutionUnit::text(ParseNode::Header(header), header.raw, self.source);
        let result = self.dispatch(unit, scope);

        let closed = self.host.close_scope(handle);
        log::debug!("close scope /header");
        result?;
        closed?;
        Ok(())
    }

    fn contents(&mut self, children: &[Content<'_>]) -> Result<(), ExecutionError> {
        for child in children {
            let unit = match child {
                Content::TextRun(run) => {
                    ExecutionUnit::text(ParseNode::TextRun(run), run.raw, self.source)
                }
                Content::ExecCode(code) => ExecutionUnit::code(code, self.source),
            };
            let scope = self.current_scope();
            if let Step::SkipSection = self.dispatch(unit, scope)? {
                log::debug!("skipping rest of section");
                break;
            }
        }
        Ok(())
    }

    /// The innermost real scope, or the document itself before any heading.
    fn current_scope(&self) -> ScopeRef {
        match self.stack.current() {
            Some(info) => ScopeRef {
                name: info.name.clone(),
                level: info.level,
                path: info.path.clone(),
            },
            None => ScopeRef {
                name: self.source.name().to_string(),
                level: 0,
                path: "/".to_string(),
            },
        }
    }

    /// Run one unit and settle any failure with the host.
    ///
    /// The unit is consumed; it is dropped when this returns.
    fn dispatch(
        &mut self,
        unit: ExecutionUnit<'_, '_>,
        scope: ScopeRef,
    ) -> Result<Step, ExecutionError> {
        self.env.bind_unit(scope, &unit.name);
        self.summary.units += 1;
        if unit.is_code() {
            self.summary.code_units += 1;
        }
        log::debug!(
            "running {} ({})",
            unit.name,
            if unit.is_code() { "code" } else { "text" }
        );

        let failure = match self.runner.run_fragment(&unit, self.env, self.host) {
            Ok(()) => return Ok(Step::Next),
            Err(RunError::Host(error)) => return Err(error.into()),
            Err(RunError::Failure(failure)) => failure,
        };

        let error = map_failure(&unit, &failure, self.source);
        match self.host.report_recoverable_error(&error) {
            ErrorAction::Halt => Err(ExecutionError::Fragment(Box::new(error))),
            ErrorAction::SkipSection => {
                self.summary.errors += 1;
                Ok(Step::SkipSection)
            }
            ErrorAction::Continue => {
                self.summary.errors += 1;
                Ok(Step::Next)
            }
        }
    }
}
