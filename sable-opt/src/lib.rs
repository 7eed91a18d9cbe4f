//! The driver core behind `sable-opt`.
//!
//! - [`BufferProcessor`] runs parse, pipeline and print on one chunk, in
//!   plain mode or diagnostic verification mode
//! - [`DiagnosticVerifier`] reconciles emitted diagnostics with inline
//!   `expected-*` annotations
//! - [`OutputAggregator`] splits a buffer into chunks, processes each one
//!   and stitches the outputs back together
//!
//! All behavior is driven by an immutable [`OptConfig`].

mod aggregator;
mod config;
mod error;
mod processor;
mod verifier;

pub use aggregator::{OutputAggregator, RunOutcome};
pub use config::OptConfig;
pub use error::{OptError, Result};
pub use processor::{BufferProcessor, ChunkResult};
pub use verifier::{DiagnosticVerifier, ExpectedDiagnostic, VerificationOutcome};
