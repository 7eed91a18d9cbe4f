//! Running a whole buffer, chunk by chunk.

use std::io::Write;

use sable_core::{Chunk, SPLIT_MARKER, SourceBuffer};

use crate::{config::OptConfig, processor::BufferProcessor};

/// Final output and verdict for one buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunOutcome {
    pub output: String,
    /// True only if every chunk succeeded.
    pub success: bool,
}

/// Drives a [`BufferProcessor`] over a buffer and joins the results.
#[derive(Debug, Clone, Copy)]
pub struct OutputAggregator<'c> {
    config: &'c OptConfig,
}

impl<'c> OutputAggregator<'c> {
    pub fn new(config: &'c OptConfig) -> Self {
        Self { config }
    }

    /// Process `buffer`, writing diagnostics to `errors`.
    ///
    /// With `split_input_file` each chunk is processed on its own and the
    /// outputs are joined with the separator marker, so the result splits
    /// the same way. A failing chunk never stops later chunks.
    pub fn run<W: Write + Send>(&self, buffer: &SourceBuffer, errors: &mut W) -> RunOutcome {
        let processor = BufferProcessor::new(self.config, buffer.name());
        let chunks: Box<dyn Iterator<Item = Chunk<'_>> + '_> = if self.config.split_input_file {
            Box::new(buffer.chunks())
        } else {
            Box::new(std::iter::once(buffer.whole()))
        };

        let mut outputs = Vec::new();
        let mut success = true;
        let mut failed = 0;
        for chunk in chunks {
            let result = processor.process(&chunk, errors);
            if let Some(error) = &result.error {
                tracing::debug!(index = chunk.index(), %error, "chunk failed");
                failed += 1;
            }
            success &= result.success;
            outputs.push(result.output);
        }

        if let Some(report) = processor.timing_report()
            && let Err(error) = errors.write_all(report.as_bytes())
        {
            tracing::warn!(%error, "failed to write the timing report");
        }

        tracing::info!(chunks = outputs.len(), failed, success, "input processed");
        RunOutcome {
            output: outputs.join(&format!("{SPLIT_MARKER}\n")),
            success,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(config: &OptConfig, text: &str) -> (RunOutcome, String) {
        let buffer = SourceBuffer::new("input.sbl", text);
        let mut errors = Vec::new();
        let outcome = OutputAggregator::new(config).run(&buffer, &mut errors);
        (outcome, String::from_utf8(errors).unwrap())
    }

    fn split() -> OptConfig {
        OptConfig {
            split_input_file: true,
            ..OptConfig::default()
        }
    }

    #[test]
    fn test_split_output_resplits() {
        let text = "func @f() {}\n// ---\nfunc @g() {}\n";
        let (outcome, errors) = run(&split(), text);
        assert!(outcome.success);
        assert_eq!(outcome.output, text);
        assert_eq!(errors, "");
    }

    #[test]
    fn test_without_split_separators_are_comments() {
        let (outcome, _) = run(&OptConfig::default(), "func @f() {}\n// ---\nfunc @g() {}\n");
        assert!(outcome.success);
        assert_eq!(outcome.output, "func @f() {}\nfunc @g() {}\n");
    }

    #[test]
    fn test_failing_chunk_does_not_stop_later_chunks() {
        let text = "%a = op.bad\n// ---\n%b = op.worse\n// ---\nfunc @g() {}\n";
        let (outcome, errors) = run(&split(), text);
        assert!(!outcome.success);
        assert_eq!(outcome.output, "// ---\n// ---\nfunc @g() {}\n");
        let lines: Vec<_> = errors.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("input.sbl:1:6: error: "));
        assert!(lines[1].starts_with("input.sbl:3:6: error: "));
    }

    #[test]
    fn test_timing_report_is_written_once() {
        let config = OptConfig {
            pass_pipeline: "dce".to_string(),
            pass_timing: true,
            ..split()
        };
        let (outcome, errors) = run(&config, "func @f() {}\n// ---\nfunc @g() {}\n");
        assert!(outcome.success);
        assert_eq!(errors.matches("Pass execution timing report").count(), 1);
        assert!(errors.contains("2x  dce\n"));
    }
}
