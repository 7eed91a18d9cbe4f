//! Passes that misbehave on request, for testing the driver.

use eyre::{Result, bail};
use sable_core::Severity;
use sable_ir::{Context, Operation, Region};

use crate::{
    pass::Pass,
    registry::{OptionError, PassOptions},
};

/// Fails without emitting anything, leaving the runner to report it.
#[derive(Debug, Clone, Copy, Default)]
pub struct FailPass;

impl FailPass {
    pub const NAME: &'static str = "test-fail";

    pub(crate) fn from_options(_: &mut PassOptions) -> Result<Box<dyn Pass>, OptionError> {
        Ok(Box::new(Self))
    }
}

impl Pass for FailPass {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn run(&self, _op: &mut Operation, _ctx: &Context<'_>) -> Result<()> {
        bail!("pass failure requested")
    }
}

/// Removes every terminator, leaving function bodies invalid.
#[derive(Debug, Clone, Copy, Default)]
pub struct DropTerminators;

impl DropTerminators {
    pub const NAME: &'static str = "test-drop-terminators";

    pub(crate) fn from_options(_: &mut PassOptions) -> Result<Box<dyn Pass>, OptionError> {
        Ok(Box::new(Self))
    }
}

impl Pass for DropTerminators {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn run(&self, op: &mut Operation, ctx: &Context<'_>) -> Result<()> {
        let registry = ctx.dialects();
        op.walk_regions_mut(&mut |region: &mut Region| {
            region
                .operations
                .retain(|op| !registry.lookup(&op.name).is_some_and(|d| d.terminator));
        });
        Ok(())
    }
}

/// Emits a diagnostic for every `test.error`, `test.warning`, `test.remark`
/// or `test.note` string attribute, at the op carrying it. Fails if any
/// error was emitted.
#[derive(Debug, Clone, Copy, Default)]
pub struct EmitDiagnostics;

impl EmitDiagnostics {
    pub const NAME: &'static str = "test-emit-diagnostics";

    pub(crate) fn from_options(_: &mut PassOptions) -> Result<Box<dyn Pass>, OptionError> {
        Ok(Box::new(Self))
    }
}

const REQUESTS: [(&str, Severity); 4] = [
    ("test.error", Severity::Error),
    ("test.warning", Severity::Warning),
    ("test.remark", Severity::Remark),
    ("test.note", Severity::Note),
];

impl Pass for EmitDiagnostics {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn run(&self, op: &mut Operation, ctx: &Context<'_>) -> Result<()> {
        let mut errors = 0;
        op.walk(&mut |nested| {
            for (key, severity) in REQUESTS {
                if let Some(message) = nested.attribute(key).and_then(|a| a.as_str()) {
                    ctx.emit_at(nested, severity, message);
                    errors += usize::from(severity.is_error());
                }
            }
        });
        if errors > 0 {
            bail!("{errors} error diagnostic(s) requested");
        }
        Ok(())
    }
}
