use crate::environment::Environment;
use crate::error::{FragmentFailure, RunError};
use crate::evaluator::{Evaluator, Interrupt};
use crate::host::Host;
use crate::script::parse_program;
use crate::unit::ExecutionUnit;

/// Runs one unit against the shared environment.
///
/// Failures come back structured; the executor maps them to document
/// lines without looking inside the runner.
pub trait FragmentRunner {
    fn run_fragment(
        &mut self,
        unit: &ExecutionUnit<'_, '_>,
        env: &mut Environment,
        host: &mut dyn Host,
    ) -> Result<(), RunError>;
}

/// The in-tree runner for the fragment language.
#[derive(Debug, Default)]
pub struct ScriptRunner;

impl FragmentRunner for ScriptRunner {
    fn run_fragment(
        &mut self,
        unit: &ExecutionUnit<'_, '_>,
        env: &mut Environment,
        host: &mut dyn Host,
    ) -> Result<(), RunError> {
        let program = parse_program(&unit.source_text)
            .map_err(|error| RunError::Failure(FragmentFailure::from(error)))?;
        log::trace!("{}: {} statements", unit.name, program.body.len());

        match Evaluator::new(env, host).run(&program) {
            Ok(()) => Ok(()),
            Err(Interrupt::Raise(error)) => Err(RunError::Failure(error.into())),
            Err(Interrupt::Host(error)) => Err(RunError::Host(error)),
        }
    }
}
