//! Diagnostic sinks and the engine that routes into them.
//!
//! A [`DiagnosticSink`] is the capability injected into a processing
//! context. Plain runs use a [`PrintingSink`]; verification runs use a
//! collecting sink that reconciles diagnostics against expectations.

use std::{
    cell::{Cell, RefCell},
    io::Write,
};

use serde::Serialize;

use crate::diagnostic::{Diagnostic, Location};

/// Receives every diagnostic emitted while processing a chunk.
pub trait DiagnosticSink {
    /// Handle one diagnostic, including its attached notes.
    fn emit(&mut self, diagnostic: Diagnostic);
}

/// Buffering sink, used to hold diagnostics from parallel workers until
/// they can be replayed in order.
impl DiagnosticSink for Vec<Diagnostic> {
    fn emit(&mut self, diagnostic: Diagnostic) {
        self.push(diagnostic);
    }
}

/// Routes diagnostics into a sink and keeps count of emitted errors.
///
/// The engine is shared by reference through a processing context, so the
/// sink sits behind a `RefCell`.
pub struct DiagnosticEngine<'s> {
    sink: RefCell<&'s mut (dyn DiagnosticSink + Send)>,
    errors: Cell<usize>,
}

impl<'s> DiagnosticEngine<'s> {
    /// Create an engine that forwards into `sink`.
    pub fn new(sink: &'s mut (dyn DiagnosticSink + Send)) -> Self {
        Self {
            sink: RefCell::new(sink),
            errors: Cell::new(0),
        }
    }

    /// Emit a diagnostic.
    pub fn emit(&self, diagnostic: Diagnostic) {
        if diagnostic.severity.is_error() {
            self.errors.set(self.errors.get() + 1);
        }
        tracing::trace!(%diagnostic, "diagnostic emitted");
        self.sink.borrow_mut().emit(diagnostic);
    }

    /// Number of error diagnostics emitted so far.
    pub fn error_count(&self) -> usize {
        self.errors.get()
    }
}

impl std::fmt::Debug for DiagnosticEngine<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DiagnosticEngine")
            .field("errors", &self.errors.get())
            .finish_non_exhaustive()
    }
}

/// How a [`PrintingSink`] renders diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DiagnosticFormat {
    /// `file:line:col: severity: message`, one line per diagnostic and note.
    #[default]
    Text,
    /// One JSON object per diagnostic, notes nested.
    Json,
}

/// Sink that prints diagnostics as they arrive.
///
/// Lines are translated from chunk-relative to buffer-absolute using the
/// chunk's starting line.
pub struct PrintingSink<W> {
    writer: W,
    origin: String,
    line_offset: usize,
    format: DiagnosticFormat,
}

impl<W: Write> PrintingSink<W> {
    /// Create a printing sink for a chunk starting at `line_offset`
    /// (0-based) in the buffer named `origin`.
    pub fn new(writer: W, origin: impl Into<String>, line_offset: usize) -> Self {
        Self {
            writer,
            origin: origin.into(),
            line_offset,
            format: DiagnosticFormat::Text,
        }
    }

    /// Select the output format.
    pub fn format(mut self, format: DiagnosticFormat) -> Self {
        self.format = format;
        self
    }

    fn write_text(&mut self, diagnostic: &Diagnostic) -> std::io::Result<()> {
        match diagnostic.location.offset_lines(self.line_offset) {
            Location::Unknown => writeln!(
                self.writer,
                "{}: {}: {}",
                self.origin, diagnostic.severity, diagnostic.message
            )?,
            Location::At { line, column } => writeln!(
                self.writer,
                "{}:{}:{}: {}: {}",
                self.origin, line, column, diagnostic.severity, diagnostic.message
            )?,
        }
        for note in &diagnostic.notes {
            self.write_text(note)?;
        }
        Ok(())
    }

    fn write_json(&mut self, diagnostic: &Diagnostic) -> std::io::Result<()> {
        #[derive(Serialize)]
        struct Record<'a> {
            file: &'a str,
            #[serde(flatten)]
            diagnostic: &'a Diagnostic,
        }

        let shifted = shift(diagnostic, self.line_offset);
        let record = Record {
            file: &self.origin,
            diagnostic: &shifted,
        };
        serde_json::to_writer(&mut self.writer, &record)?;
        writeln!(self.writer)
    }
}

fn shift(diagnostic: &Diagnostic, offset: usize) -> Diagnostic {
    Diagnostic {
        severity: diagnostic.severity,
        location: diagnostic.location.offset_lines(offset),
        message: diagnostic.message.clone(),
        notes: diagnostic.notes.iter().map(|n| shift(n, offset)).collect(),
    }
}

impl<W: Write> DiagnosticSink for PrintingSink<W> {
    fn emit(&mut self, diagnostic: Diagnostic) {
        let result = match self.format {
            DiagnosticFormat::Text => self.write_text(&diagnostic),
            DiagnosticFormat::Json => self.write_json(&diagnostic),
        };
        if let Err(error) = result {
            tracing::warn!(%error, "failed to write diagnostic");
        }
    }
}
