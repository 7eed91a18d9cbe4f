use std::io::Write;

/// Target output for reports.
pub(crate) trait Output {
    /// Start a new section with a heading.
    fn section(&mut self, name: &str);

    /// Render an indented key-value pair.
    fn key_value_indented(&mut self, key: &str, value: &str);

    /// Render a bullet list item.
    fn list_item(&mut self, text: &str);

    fn newline(&mut self);
}

/// A report that can render itself to an output.
pub(crate) trait Report {
    fn render(&self, out: &mut dyn Output);
}

/// Plain text output.
pub(crate) struct TerminalOutput<W> {
    writer: W,
}

impl<W: Write> TerminalOutput<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    fn line(&mut self, text: std::fmt::Arguments<'_>) {
        if let Err(error) = writeln!(self.writer, "{text}") {
            tracing::warn!(%error, "failed to write report");
        }
    }
}

impl<W: Write> Output for TerminalOutput<W> {
    fn section(&mut self, name: &str) {
        self.line(format_args!("{name}:"));
    }

    fn key_value_indented(&mut self, key: &str, value: &str) {
        self.line(format_args!("  {key}: {value}"));
    }

    fn list_item(&mut self, text: &str) {
        self.line(format_args!("    - {text}"));
    }

    fn newline(&mut self) {
        self.line(format_args!(""));
    }
}
