//! Processing context.
//!
//! One context is created per chunk. It carries the dialect registry, the
//! policies that govern parsing and diagnostics, and the diagnostic engine
//! wrapping whatever sink the caller injected.

use std::{cell::Cell, sync::Arc};

use sable_core::{Diagnostic, DiagnosticEngine, DiagnosticSink, Severity};

use crate::{dialect::DialectRegistry, operation::Operation, printer};

/// Policies fixed at context creation.
#[derive(Debug, Clone, Copy, Default)]
pub struct ContextOptions {
    /// Accept operations whose dialect is not registered.
    pub allow_unregistered: bool,
    /// Attach the offending operation to diagnostics as a note.
    pub print_op_on_diagnostic: bool,
    /// Allow nested pass pipelines to run in parallel.
    pub multithreading: bool,
}

/// An isolated environment for processing one chunk.
#[derive(Debug)]
pub struct Context<'s> {
    dialects: Arc<DialectRegistry>,
    options: ContextOptions,
    multithreading: Cell<bool>,
    diagnostics: DiagnosticEngine<'s>,
}

impl<'s> Context<'s> {
    /// Create a context whose diagnostics go to `sink`.
    pub fn new(
        dialects: Arc<DialectRegistry>,
        options: ContextOptions,
        sink: &'s mut (dyn DiagnosticSink + Send),
    ) -> Self {
        Self {
            dialects,
            options,
            multithreading: Cell::new(options.multithreading),
            diagnostics: DiagnosticEngine::new(sink),
        }
    }

    /// Create a single-threaded child context with its own sink, sharing
    /// this context's registry and policies.
    pub fn fork<'c>(&self, sink: &'c mut (dyn DiagnosticSink + Send)) -> Context<'c> {
        Context::new(
            Arc::clone(&self.dialects),
            ContextOptions {
                multithreading: false,
                ..self.options
            },
            sink,
        )
    }

    pub fn dialects(&self) -> &DialectRegistry {
        &self.dialects
    }

    pub fn allows_unregistered(&self) -> bool {
        self.options.allow_unregistered
    }

    pub fn is_multithreading_enabled(&self) -> bool {
        self.multithreading.get()
    }

    pub fn enable_multithreading(&self, enable: bool) {
        self.multithreading.set(enable);
    }

    /// Disable multithreading until the returned guard is dropped.
    ///
    /// The previous setting is restored on every exit path, including
    /// early returns through `?`.
    #[must_use = "multithreading is restored as soon as the guard is dropped"]
    pub fn disable_multithreading(&self) -> ThreadingGuard<'_, 's> {
        let previous = self.multithreading.replace(false);
        ThreadingGuard {
            context: self,
            previous,
        }
    }

    /// Emit a diagnostic.
    pub fn emit(&self, diagnostic: Diagnostic) {
        self.diagnostics.emit(diagnostic);
    }

    /// Number of errors emitted through this context so far.
    pub fn error_count(&self) -> usize {
        self.diagnostics.error_count()
    }

    /// Build a diagnostic located at `op`.
    pub fn op_diagnostic(
        &self,
        op: &Operation,
        severity: Severity,
        message: impl Into<String>,
    ) -> Diagnostic {
        let mut diagnostic = Diagnostic::new(severity, op.location, message);
        if self.options.print_op_on_diagnostic {
            diagnostic.attach_note(
                op.location,
                format!(
                    "see current operation: {}",
                    printer::summarize(op, &self.dialects)
                ),
            );
        }
        diagnostic
    }

    /// Build an error located at `op`.
    pub fn op_error(&self, op: &Operation, message: impl Into<String>) -> Diagnostic {
        self.op_diagnostic(op, Severity::Error, message)
    }

    /// Emit a diagnostic located at `op`.
    pub fn emit_at(&self, op: &Operation, severity: Severity, message: impl Into<String>) {
        self.emit(self.op_diagnostic(op, severity, message));
    }
}

/// Restores a context's multithreading setting when dropped.
#[derive(Debug)]
pub struct ThreadingGuard<'a, 's> {
    context: &'a Context<'s>,
    previous: bool,
}

impl Drop for ThreadingGuard<'_, '_> {
    fn drop(&mut self) {
        self.context.enable_multithreading(self.previous);
    }
}
