//! Core types shared by the sable IR driver.
//!
//! This crate holds the pieces every other sable crate leans on:
//!
//! - [`source`] - input buffers and the chunk splitter
//! - [`diagnostic`] - located, severity-tagged messages
//! - [`sink`] - where diagnostics go once emitted
//! - [`output`] - output files that are only committed on success

// miette's derive assigns fields that only the rendered report reads
#![allow(unused_assignments)]

pub mod diagnostic;
mod error;
pub mod output;
pub mod sink;
pub mod source;

pub use diagnostic::{Diagnostic, Location, Severity};
pub use error::{Error, Result};
pub use output::OutputFile;
pub use sink::{DiagnosticEngine, DiagnosticFormat, DiagnosticSink, PrintingSink};
pub use source::{Chunk, ChunkSplitter, SPLIT_MARKER, SourceBuffer};
