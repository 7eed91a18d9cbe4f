//! Passes and pass pipelines for the sable IR driver.
//!
//! A pipeline is described by a short textual grammar:
//!
//! ```text
//! canonicalize{max-iterations=4},func(dce,print-op-stats),symbol-dce
//! ```
//!
//! [`PipelineRunner::build`] resolves that text against a [`PassRegistry`]
//! into an immutable [`PassPipeline`], failing before anything runs if a
//! pass, option or anchor is wrong. [`PipelineRunner::run`] then executes
//! it on a module, calling [`Instrumentation`] hooks around every pass.

// miette's derive assigns fields that only the rendered report reads
#![allow(unused_assignments)]

mod error;
mod instrument;
mod pass;
pub mod passes;
mod pipeline;
mod registry;
mod spec;

pub use error::{BuildError, RunError};
pub use instrument::{Instrumentation, IrPrinter, PassTiming};
pub use pass::Pass;
pub use pipeline::{PassPipeline, PipelineRunner};
pub use registry::{OptionError, PassFactory, PassInfo, PassOptionInfo, PassOptions, PassRegistry};
