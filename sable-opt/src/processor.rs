//! Processing one chunk: parse, run the pipeline, print.

use std::{io::Write, sync::Arc};

use sable_core::{Chunk, Diagnostic, DiagnosticSink, Location, PrintingSink};
use sable_ir::{Context, PrintOptions, parse, print};
use sable_pass::{IrPrinter, PassTiming, PipelineRunner};

use crate::{
    config::OptConfig,
    error::{OptError, Result},
    verifier::DiagnosticVerifier,
};

/// What processing one chunk produced.
#[derive(Debug)]
pub struct ChunkResult {
    /// Printed IR with a trailing newline, or empty if nothing was printed.
    pub output: String,
    pub success: bool,
    /// Why the chunk failed, when it did.
    pub error: Option<OptError>,
}

/// Runs the configured action on chunks of one input buffer.
///
/// In plain mode diagnostics go straight to the error stream and any
/// failure fails the chunk. With `verify_diagnostics` they go to a
/// [`DiagnosticVerifier`] instead, and the chunk's verdict is the
/// verifier's alone.
pub struct BufferProcessor<'c> {
    config: &'c OptConfig,
    origin: String,
    runner: PipelineRunner,
    printer: Option<Arc<IrPrinter>>,
    timing: Option<Arc<PassTiming>>,
}

impl<'c> BufferProcessor<'c> {
    /// Create a processor for the buffer named `origin`.
    pub fn new(config: &'c OptConfig, origin: impl Into<String>) -> Self {
        let print_options = PrintOptions {
            generic: config.print_generic,
        };
        let printer = config
            .print_ir_after_all
            .then(|| Arc::new(IrPrinter::new(print_options)));
        let timing = config.pass_timing.then(|| Arc::new(PassTiming::new()));

        let mut runner = PipelineRunner::new().verify_each(config.verify_each);
        if let Some(printer) = &printer {
            runner = runner.instrument(Arc::clone(printer));
        }
        if let Some(timing) = &timing {
            runner = runner.instrument(Arc::clone(timing));
        }

        Self {
            config,
            origin: origin.into(),
            runner,
            printer,
            timing,
        }
    }

    /// Process one chunk, writing diagnostics and instrumentation output
    /// to `errors`.
    pub fn process<W: Write + Send>(&self, chunk: &Chunk<'_>, errors: &mut W) -> ChunkResult {
        let span = tracing::info_span!(
            "chunk",
            index = chunk.index(),
            start_line = chunk.start_line()
        );
        let _entered = span.enter();

        let result = if self.config.verify_diagnostics {
            self.process_verified(chunk, errors)
        } else {
            self.process_plain(chunk, errors)
        };

        if let Some(printer) = &self.printer {
            write_or_warn(errors, &printer.take());
        }
        tracing::debug!(success = result.success, "chunk processed");
        result
    }

    /// The accumulated timing report, if timing was requested.
    pub fn timing_report(&self) -> Option<String> {
        self.timing.as_ref().map(|timing| timing.report())
    }

    fn process_plain<W: Write + Send>(&self, chunk: &Chunk<'_>, errors: &mut W) -> ChunkResult {
        let mut sink = PrintingSink::new(&mut *errors, self.origin.as_str(), chunk.start_line())
            .format(self.config.diagnostics_format);
        match self.run_action(chunk.text(), &mut sink) {
            Ok(output) => ChunkResult {
                output,
                success: true,
                error: None,
            },
            Err(error) => ChunkResult {
                output: String::new(),
                success: false,
                error: Some(error),
            },
        }
    }

    fn process_verified<W: Write + Send>(&self, chunk: &Chunk<'_>, errors: &mut W) -> ChunkResult {
        let mut verifier = DiagnosticVerifier::new(chunk.text());
        let action = self.run_action(chunk.text(), &mut verifier);
        if let Err(error) = &action {
            tracing::debug!(%error, "action failed under diagnostic verification");
        }

        let outcome = verifier.verify();
        let mut sink = PrintingSink::new(&mut *errors, self.origin.as_str(), chunk.start_line())
            .format(self.config.diagnostics_format);
        for discrepancy in outcome.discrepancies() {
            sink.emit(discrepancy);
        }

        let success = outcome.is_success();
        ChunkResult {
            output: action.unwrap_or_default(),
            success,
            error: (!success).then(|| OptError::VerificationMismatch {
                missing: outcome.missing.len(),
                unexpected: outcome.unexpected.len(),
                malformed: outcome.malformed.len(),
            }),
        }
    }

    /// Parse, build and run the pipeline, then print. Every failure has
    /// been reported through `sink` by the time this returns.
    fn run_action(&self, text: &str, sink: &mut (dyn DiagnosticSink + Send)) -> Result<String> {
        let ctx = Context::new(
            Arc::clone(&self.config.dialects),
            self.config.context_options(),
            sink,
        );

        let parsed = {
            let _serial = ctx.disable_multithreading();
            parse(text, &ctx)
        };
        let mut module = parsed?;

        let pipeline =
            PipelineRunner::build(&self.config.pass_pipeline, &self.config.passes, &ctx)
                .inspect_err(|error| {
                    ctx.emit(Diagnostic::error(Location::Unknown, error.to_string()));
                })?;
        self.runner.run(&pipeline, &mut module, &ctx)?;

        let options = PrintOptions {
            generic: self.config.print_generic,
        };
        Ok(format!("{}\n", print(&module, ctx.dialects(), options)))
    }
}

fn write_or_warn<W: Write>(errors: &mut W, text: &str) {
    if text.is_empty() {
        return;
    }
    if let Err(error) = errors.write_all(text.as_bytes()) {
        tracing::warn!(%error, "failed to write to the error stream");
    }
}
