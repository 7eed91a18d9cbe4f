//! Diagnostic types.
//!
//! Diagnostics are produced as a side effect of parsing and running passes.
//! They never abort anything on their own; whoever emits an error decides
//! whether the surrounding action fails.

use serde::Serialize;

/// Severity level for a diagnostic message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Something is wrong; the action that emitted it normally fails.
    Error,
    /// Something is suspicious but processing continues.
    Warning,
    /// Supplementary information attached to another diagnostic.
    Note,
    /// Informational output requested by a pass.
    Remark,
}

impl Severity {
    /// Returns true if this is an error severity.
    pub fn is_error(&self) -> bool {
        matches!(self, Severity::Error)
    }

    /// Parse the keyword used in `expected-<severity>` annotations.
    pub fn from_keyword(keyword: &str) -> Option<Self> {
        match keyword {
            "error" => Some(Severity::Error),
            "warning" => Some(Severity::Warning),
            "note" => Some(Severity::Note),
            "remark" => Some(Severity::Remark),
            _ => None,
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Severity::Error => write!(f, "error"),
            Severity::Warning => write!(f, "warning"),
            Severity::Note => write!(f, "note"),
            Severity::Remark => write!(f, "remark"),
        }
    }
}

/// A 1-based line/column position, or unknown.
///
/// Lines are relative to the chunk being processed, not the whole input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(untagged)]
pub enum Location {
    /// No source position, e.g. for errors in the pass pipeline text.
    #[default]
    Unknown,
    /// A position in the chunk source.
    At { line: usize, column: usize },
}

impl Location {
    /// Create a known location.
    pub fn new(line: usize, column: usize) -> Self {
        Location::At { line, column }
    }

    /// The line, if known.
    pub fn line(&self) -> Option<usize> {
        match self {
            Location::Unknown => None,
            Location::At { line, .. } => Some(*line),
        }
    }

    /// Shift the line by `offset`, used to report chunk diagnostics
    /// against the whole buffer.
    pub fn offset_lines(self, offset: usize) -> Self {
        match self {
            Location::Unknown => Location::Unknown,
            Location::At { line, column } => Location::At {
                line: line + offset,
                column,
            },
        }
    }
}

/// A located, severity-tagged message with optional attached notes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    /// The severity level of this diagnostic.
    pub severity: Severity,
    /// Where the diagnostic points.
    pub location: Location,
    /// The diagnostic message.
    pub message: String,
    /// Notes attached to this diagnostic.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub notes: Vec<Diagnostic>,
}

impl Diagnostic {
    /// Create a diagnostic with the given severity.
    pub fn new(severity: Severity, location: Location, message: impl Into<String>) -> Self {
        Self {
            severity,
            location,
            message: message.into(),
            notes: Vec::new(),
        }
    }

    /// Create a new error diagnostic.
    pub fn error(location: Location, message: impl Into<String>) -> Self {
        Self::new(Severity::Error, location, message)
    }

    /// Create a new warning diagnostic.
    pub fn warning(location: Location, message: impl Into<String>) -> Self {
        Self::new(Severity::Warning, location, message)
    }

    /// Create a new note diagnostic.
    pub fn note(location: Location, message: impl Into<String>) -> Self {
        Self::new(Severity::Note, location, message)
    }

    /// Create a new remark diagnostic.
    pub fn remark(location: Location, message: impl Into<String>) -> Self {
        Self::new(Severity::Remark, location, message)
    }

    /// Attach a note to this diagnostic.
    pub fn with_note(mut self, location: Location, message: impl Into<String>) -> Self {
        self.notes.push(Diagnostic::note(location, message));
        self
    }

    /// Attach a note to an already-built diagnostic.
    pub fn attach_note(&mut self, location: Location, message: impl Into<String>) {
        self.notes.push(Diagnostic::note(location, message));
    }
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.location {
            Location::Unknown => write!(f, "{}: {}", self.severity, self.message),
            Location::At { line, column } => {
                write!(f, "{}:{}: {}: {}", line, column, self.severity, self.message)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_diagnostic_error() {
        let diag = Diagnostic::error(Location::new(3, 7), "use of undefined value '%x'");
        assert!(diag.severity.is_error());
        assert_eq!(diag.location.line(), Some(3));
        assert!(diag.notes.is_empty());
    }

    #[test]
    fn test_diagnostic_with_note() {
        let diag = Diagnostic::error(Location::new(4, 1), "redefinition of symbol '@f'")
            .with_note(Location::new(1, 1), "previous definition here");
        assert_eq!(diag.notes.len(), 1);
        assert_eq!(diag.notes[0].severity, Severity::Note);
        assert_eq!(diag.notes[0].location.line(), Some(1));
    }

    #[test]
    fn test_severity_display() {
        assert_eq!(Severity::Error.to_string(), "error");
        assert_eq!(Severity::Warning.to_string(), "warning");
        assert_eq!(Severity::Note.to_string(), "note");
        assert_eq!(Severity::Remark.to_string(), "remark");
    }

    #[test]
    fn test_severity_keywords_round_trip() {
        for severity in [
            Severity::Error,
            Severity::Warning,
            Severity::Note,
            Severity::Remark,
        ] {
            assert_eq!(Severity::from_keyword(&severity.to_string()), Some(severity));
        }
        assert_eq!(Severity::from_keyword("info"), None);
    }

    #[test]
    fn test_location_offset() {
        assert_eq!(Location::new(2, 5).offset_lines(10), Location::new(12, 5));
        assert_eq!(Location::Unknown.offset_lines(10), Location::Unknown);
    }

    #[test]
    fn test_display() {
        let diag = Diagnostic::warning(Location::new(1, 2), "careful");
        assert_eq!(diag.to_string(), "1:2: warning: careful");
        let diag = Diagnostic::error(Location::Unknown, "no position");
        assert_eq!(diag.to_string(), "error: no position");
    }
}
