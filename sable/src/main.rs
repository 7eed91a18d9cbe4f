mod cli;
mod reports;
mod telemetry;

use std::{process::ExitCode, sync::Arc};

use eyre::Result;
use sable_ir::DialectRegistry;

use crate::cli::Cli;

fn main() -> Result<ExitCode> {
    color_eyre::install()?;

    let dialects = Arc::new(DialectRegistry::with_defaults());
    let cli = Cli::parse_with_dialects(&dialects);
    telemetry::initialise(&cli.log_filter, cli.log_format)?;
    cli.run(dialects)
}
