use std::{io::Write, path::PathBuf, process::ExitCode, sync::Arc};

use clap::{ArgAction, CommandFactory, FromArgMatches, Parser, ValueEnum};
use eyre::{Result, WrapErr};
use sable_core::{DiagnosticFormat, OutputFile, SourceBuffer};
use sable_ir::DialectRegistry;
use sable_opt::{OptConfig, OutputAggregator};
use sable_pass::PassRegistry;

use crate::{
    reports::{DialectsReport, PassesReport, Report, TerminalOutput},
    telemetry::LogFormat,
};

/// Extension trait for exiting on user-facing errors with pretty formatting
pub(crate) trait UnwrapOrExit<T> {
    fn unwrap_or_exit(self) -> T;
}

impl<T, E> UnwrapOrExit<T> for std::result::Result<T, Box<E>>
where
    E: miette::Diagnostic + Send + Sync + 'static,
{
    fn unwrap_or_exit(self) -> T {
        match self {
            Ok(v) => v,
            Err(e) => {
                eprintln!("{:?}", miette::Report::new(*e));
                std::process::exit(1);
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub(crate) enum DiagnosticsFormat {
    Text,
    Json,
}

impl From<DiagnosticsFormat> for DiagnosticFormat {
    fn from(format: DiagnosticsFormat) -> Self {
        match format {
            DiagnosticsFormat::Text => DiagnosticFormat::Text,
            DiagnosticsFormat::Json => DiagnosticFormat::Json,
        }
    }
}

#[derive(Debug, Parser)]
#[command(name = "sable-opt")]
#[command(version)]
#[command(about = "Parse sable IR, run a pass pipeline over it and print the result")]
pub(crate) struct Cli {
    /// Input file, or `-` for stdin
    #[arg(default_value = "-")]
    input: PathBuf,

    /// Output file, or `-` for stdout
    #[arg(short, long, default_value = "-")]
    output: PathBuf,

    /// Pass pipeline to run, e.g. `func(canonicalize),symbol-dce`
    #[arg(short, long, default_value = "")]
    pass_pipeline: String,

    /// Split the input at `// ---` lines and process each chunk on its own
    #[arg(long)]
    split_input_file: bool,

    /// Check diagnostics against `expected-*` annotations instead of printing them
    #[arg(long)]
    verify_diagnostics: bool,

    /// Verify the IR after every pass
    #[arg(
        long,
        action = ArgAction::Set,
        num_args = 0..=1,
        require_equals = true,
        default_value_t = true,
        default_missing_value = "true"
    )]
    verify_each: bool,

    /// Accept operations from unregistered dialects
    #[arg(long)]
    allow_unregistered: bool,

    /// Never run nested pipelines in parallel
    #[arg(long)]
    disable_threading: bool,

    /// Print the IR to stderr after every pass
    #[arg(long)]
    print_ir_after_all: bool,

    /// Report per-pass wall-clock time on stderr
    #[arg(long)]
    pass_timing: bool,

    /// Print every operation in generic form
    #[arg(long)]
    print_generic: bool,

    /// How diagnostics are printed
    #[arg(long, value_enum, default_value_t = DiagnosticsFormat::Text)]
    diagnostics_format: DiagnosticsFormat,

    /// List the registered dialects and exit
    #[arg(long)]
    show_dialects: bool,

    /// List the registered passes and exit
    #[arg(long)]
    list_passes: bool,

    /// Log filter directives, used when RUST_LOG is unset
    #[arg(long, default_value = "warn")]
    pub log_filter: String,

    /// Log record format
    #[arg(long, value_enum, default_value_t = LogFormat::Compact)]
    pub log_format: LogFormat,
}

impl Cli {
    /// Parse the command line. The help header names the dialects in
    /// `dialects`.
    pub fn parse_with_dialects(dialects: &DialectRegistry) -> Self {
        let matches = Self::command()
            .before_help(DialectsReport::header(dialects))
            .get_matches();
        Self::from_arg_matches(&matches).unwrap_or_else(|error| error.exit())
    }

    pub fn run(self, dialects: Arc<DialectRegistry>) -> Result<ExitCode> {
        let passes = Arc::new(PassRegistry::with_builtins());

        if self.show_dialects {
            DialectsReport::new(&dialects).render(&mut TerminalOutput::new(std::io::stdout()));
            return Ok(ExitCode::SUCCESS);
        }
        if self.list_passes {
            PassesReport::new(&passes).render(&mut TerminalOutput::new(std::io::stdout()));
            return Ok(ExitCode::SUCCESS);
        }

        let config = self.config(dialects, passes);
        config.validate_pipeline().unwrap_or_exit();

        let buffer = SourceBuffer::open(&self.input).unwrap_or_exit();
        let mut output = OutputFile::create(&self.output).unwrap_or_exit();
        tracing::info!(input = buffer.name(), pipeline = %config.pass_pipeline, "processing input");

        let outcome = OutputAggregator::new(&config).run(&buffer, &mut std::io::stderr());
        output
            .write_all(outcome.output.as_bytes())
            .wrap_err("failed to write output")?;
        if !outcome.success {
            // A file target is discarded when dropped uncommitted.
            output.flush().wrap_err("failed to write output")?;
            return Ok(ExitCode::FAILURE);
        }
        output.keep().unwrap_or_exit();
        Ok(ExitCode::SUCCESS)
    }

    fn config(&self, dialects: Arc<DialectRegistry>, passes: Arc<PassRegistry>) -> OptConfig {
        OptConfig {
            dialects,
            passes,
            pass_pipeline: self.pass_pipeline.clone(),
            split_input_file: self.split_input_file,
            verify_diagnostics: self.verify_diagnostics,
            verify_each: self.verify_each,
            allow_unregistered: self.allow_unregistered,
            threading: !self.disable_threading,
            print_ir_after_all: self.print_ir_after_all,
            pass_timing: self.pass_timing,
            print_generic: self.print_generic,
            diagnostics_format: self.diagnostics_format.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("sable-opt").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn test_cli_is_well_formed() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_defaults() {
        let cli = parse(&[]);
        assert_eq!(cli.input, PathBuf::from("-"));
        assert_eq!(cli.output, PathBuf::from("-"));
        let config = cli.config(
            Arc::new(DialectRegistry::with_defaults()),
            Arc::new(PassRegistry::with_builtins()),
        );
        assert!(config.verify_each);
        assert!(config.threading);
        assert!(!config.verify_diagnostics);
        assert_eq!(config.diagnostics_format, DiagnosticFormat::Text);
    }

    #[test]
    fn test_verify_each_takes_an_optional_value() {
        assert!(parse(&["--verify-each"]).verify_each);
        assert!(!parse(&["--verify-each=false"]).verify_each);
        let cli = parse(&["--verify-each", "input.sbl"]);
        assert!(cli.verify_each);
        assert_eq!(cli.input, PathBuf::from("input.sbl"));
    }

    #[test]
    fn test_flags_reach_the_config() {
        let cli = parse(&[
            "in.sbl",
            "-o",
            "out.sbl",
            "-p",
            "func(dce)",
            "--split-input-file",
            "--verify-diagnostics",
            "--allow-unregistered",
            "--disable-threading",
            "--print-generic",
            "--diagnostics-format",
            "json",
        ]);
        let config = cli.config(
            Arc::new(DialectRegistry::with_defaults()),
            Arc::new(PassRegistry::with_builtins()),
        );
        assert_eq!(config.pass_pipeline, "func(dce)");
        assert!(config.split_input_file);
        assert!(config.verify_diagnostics);
        assert!(config.allow_unregistered);
        assert!(!config.threading);
        assert!(config.print_generic);
        assert_eq!(config.diagnostics_format, DiagnosticFormat::Json);
    }
}
