//! Listings printed instead of processing input.
//!
//! Reports collect what to show; an [`Output`] decides how it looks.

mod dialects;
mod output;
mod passes;

pub(crate) use dialects::DialectsReport;
pub(crate) use output::{Report, TerminalOutput};
pub(crate) use passes::PassesReport;
