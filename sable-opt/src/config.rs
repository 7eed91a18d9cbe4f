//! Driver configuration.

use std::sync::Arc;

use sable_core::{Diagnostic, DiagnosticFormat};
use sable_ir::{Context, ContextOptions, DialectRegistry};
use sable_pass::{BuildError, PassRegistry, PipelineRunner};

/// Everything that controls a run, fixed before the first chunk is read.
///
/// Built once from the command line and passed by reference; nothing in
/// the driver reads option state from anywhere else.
#[derive(Debug, Clone)]
pub struct OptConfig {
    /// Dialects every chunk context is created with.
    pub dialects: Arc<DialectRegistry>,
    /// Passes the pipeline text may name.
    pub passes: Arc<PassRegistry>,
    /// Textual pass pipeline, possibly empty.
    pub pass_pipeline: String,
    /// Split the input at separator lines and process each chunk alone.
    pub split_input_file: bool,
    /// Check emitted diagnostics against `expected-*` annotations.
    pub verify_diagnostics: bool,
    /// Verify the IR after every pass.
    pub verify_each: bool,
    /// Accept operations from unregistered dialects.
    pub allow_unregistered: bool,
    /// Let nested pipelines run functions in parallel.
    pub threading: bool,
    /// Dump the IR to the error stream after every pass.
    pub print_ir_after_all: bool,
    /// Report per-pass timing at the end of the run.
    pub pass_timing: bool,
    /// Print output in generic form.
    pub print_generic: bool,
    /// How plain-mode diagnostics are rendered.
    pub diagnostics_format: DiagnosticFormat,
}

impl Default for OptConfig {
    fn default() -> Self {
        Self {
            dialects: Arc::new(DialectRegistry::with_defaults()),
            passes: Arc::new(PassRegistry::with_builtins()),
            pass_pipeline: String::new(),
            split_input_file: false,
            verify_diagnostics: false,
            verify_each: true,
            allow_unregistered: false,
            threading: true,
            print_ir_after_all: false,
            pass_timing: false,
            print_generic: false,
            diagnostics_format: DiagnosticFormat::Text,
        }
    }
}

impl OptConfig {
    /// Context options for one chunk. Operations are attached to
    /// diagnostics only when they are printed for a person to read.
    pub fn context_options(&self) -> ContextOptions {
        ContextOptions {
            allow_unregistered: self.allow_unregistered,
            print_op_on_diagnostic: !self.verify_diagnostics,
            multithreading: self.threading,
        }
    }

    /// Resolve the pipeline text once, without a module, so a bad
    /// pipeline can be reported before any input is processed.
    ///
    /// # Errors
    ///
    /// Returns the same [`BuildError`] every chunk would hit.
    pub fn validate_pipeline(&self) -> Result<(), Box<BuildError>> {
        let mut scratch: Vec<Diagnostic> = Vec::new();
        let ctx = Context::new(
            Arc::clone(&self.dialects),
            self.context_options(),
            &mut scratch,
        );
        PipelineRunner::build(&self.pass_pipeline, &self.passes, &ctx).map(|_| ())
    }
}
