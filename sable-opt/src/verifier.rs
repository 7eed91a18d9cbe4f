//! Checking emitted diagnostics against inline expectations.
//!
//! A chunk under test carries annotations next to the code they describe:
//!
//! ```text
//! %x = op.bad   // expected-error {{unregistered operation 'op.bad'}}
//! // expected-warning@below {{unused}}
//! %y = test.source
//! ```
//!
//! [`DiagnosticVerifier`] is installed as the chunk's diagnostic sink.
//! Every diagnostic it receives either consumes a matching expectation or
//! is recorded as unexpected. [`DiagnosticVerifier::verify`] then reports
//! what is left over.

use sable_core::{Diagnostic, DiagnosticSink, Location, Severity};

const PREFIX: &str = "expected-";

/// A diagnostic the chunk says it should produce.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExpectedDiagnostic {
    pub severity: Severity,
    /// Chunk-relative line the diagnostic must be reported on.
    pub line: usize,
    /// Substring the diagnostic message must contain.
    pub message: String,
    /// Where the annotation itself was written.
    pub annotation: Location,
}

impl ExpectedDiagnostic {
    fn matches(&self, diagnostic: &Diagnostic) -> bool {
        diagnostic.severity == self.severity
            && diagnostic.location.line() == Some(self.line)
            && diagnostic.message.contains(&self.message)
    }
}

/// Collects diagnostics for one chunk and reconciles them with the
/// chunk's `expected-*` annotations.
#[derive(Debug, Default)]
pub struct DiagnosticVerifier {
    expected: Vec<(ExpectedDiagnostic, bool)>,
    unexpected: Vec<Diagnostic>,
    malformed: Vec<Diagnostic>,
}

impl DiagnosticVerifier {
    /// Scan `source` for annotations.
    pub fn new(source: &str) -> Self {
        let mut verifier = Self::default();
        for (index, line) in source.lines().enumerate() {
            verifier.scan_line(index + 1, line);
        }
        tracing::debug!(
            expected = verifier.expected.len(),
            malformed = verifier.malformed.len(),
            "scanned diagnostic annotations"
        );
        verifier
    }

    /// The expectations found in the source, in source order.
    pub fn expectations(&self) -> impl Iterator<Item = &ExpectedDiagnostic> {
        self.expected.iter().map(|(expected, _)| expected)
    }

    fn scan_line(&mut self, line_no: usize, line: &str) {
        let mut cursor = 0;
        while let Some(found) = line[cursor..].find(PREFIX) {
            let start = cursor + found;
            let location = Location::new(line_no, start + 1);
            let rest = &line[start + PREFIX.len()..];
            cursor = start + PREFIX.len();

            let keyword_len = rest
                .find(|c: char| !c.is_ascii_lowercase())
                .unwrap_or(rest.len());
            let keyword = &rest[..keyword_len];
            let Some(severity) = Severity::from_keyword(keyword) else {
                continue;
            };
            let directive = format!("{PREFIX}{keyword}");

            match parse_annotation(&rest[keyword_len..], line_no) {
                Ok((target, message, consumed)) => {
                    cursor += keyword_len + consumed;
                    self.expected.push((
                        ExpectedDiagnostic {
                            severity,
                            line: target,
                            message: message.to_string(),
                            annotation: location,
                        },
                        false,
                    ));
                }
                Err(problem) => {
                    cursor += keyword_len;
                    self.malformed.push(Diagnostic::error(
                        location,
                        format!("{directive} annotation {problem}"),
                    ));
                }
            }
        }
    }

    /// Match one diagnostic, without its notes.
    fn consume(&mut self, diagnostic: Diagnostic) {
        let matched = self
            .expected
            .iter_mut()
            .find(|(expected, consumed)| !*consumed && expected.matches(&diagnostic));
        match matched {
            Some((_, consumed)) => *consumed = true,
            None => self.unexpected.push(diagnostic),
        }
    }

    /// Compare what was emitted with what was expected.
    pub fn verify(self) -> VerificationOutcome {
        let missing: Vec<ExpectedDiagnostic> = self
            .expected
            .into_iter()
            .filter(|(_, consumed)| !consumed)
            .map(|(expected, _)| expected)
            .collect();
        let outcome = VerificationOutcome {
            missing,
            unexpected: self.unexpected,
            malformed: self.malformed,
        };
        tracing::debug!(
            missing = outcome.missing.len(),
            unexpected = outcome.unexpected.len(),
            malformed = outcome.malformed.len(),
            "diagnostic verification finished"
        );
        outcome
    }
}

impl DiagnosticSink for DiagnosticVerifier {
    fn emit(&mut self, mut diagnostic: Diagnostic) {
        let notes = std::mem::take(&mut diagnostic.notes);
        self.consume(diagnostic);
        for note in notes {
            self.emit(note);
        }
    }
}

/// Parse what follows `expected-<severity>`: an optional `@target`, then
/// `{{message}}`. Returns the target line, the message and the number of
/// bytes consumed.
fn parse_annotation(text: &str, line_no: usize) -> Result<(usize, &str, usize), String> {
    let (target, after_target) = match text.strip_prefix('@') {
        Some(rest) => {
            let len = rest
                .find(|c: char| c.is_whitespace() || c == '{')
                .unwrap_or(rest.len());
            let target = resolve_target(&rest[..len], line_no)?;
            (target, 1 + len)
        }
        None => (line_no, 0),
    };

    let rest = &text[after_target..];
    let trimmed = rest.trim_start();
    let Some(body) = trimmed.strip_prefix("{{") else {
        return Err("is missing '{{'".to_string());
    };
    let Some(end) = body.find("}}") else {
        return Err("is missing '}}'".to_string());
    };
    let consumed = after_target + (rest.len() - trimmed.len()) + 2 + end + 2;
    Ok((target, body[..end].trim(), consumed))
}

fn resolve_target(target: &str, line_no: usize) -> Result<usize, String> {
    let invalid = || format!("has invalid target '@{target}'");
    let line = match target {
        "above" => line_no.checked_sub(1),
        "below" => line_no.checked_add(1),
        _ => {
            if let Some(offset) = target.strip_prefix('+') {
                let offset: usize = offset.parse().map_err(|_| invalid())?;
                Some(line_no.checked_add(offset).ok_or_else(invalid)?)
            } else if let Some(offset) = target.strip_prefix('-') {
                let offset: usize = offset.parse().map_err(|_| invalid())?;
                line_no.checked_sub(offset)
            } else {
                Some(target.parse::<usize>().map_err(|_| invalid())?)
            }
        }
    };
    match line {
        Some(line) if line >= 1 => Ok(line),
        _ => Err(format!("target '@{target}' is before the first line")),
    }
}

/// Result of [`DiagnosticVerifier::verify`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VerificationOutcome {
    /// Expectations no diagnostic matched.
    pub missing: Vec<ExpectedDiagnostic>,
    /// Diagnostics no expectation matched.
    pub unexpected: Vec<Diagnostic>,
    /// Annotations that could not be parsed.
    pub malformed: Vec<Diagnostic>,
}

impl VerificationOutcome {
    pub fn is_success(&self) -> bool {
        self.missing.is_empty() && self.unexpected.is_empty() && self.malformed.is_empty()
    }

    /// One error per discrepancy, located where a maintainer has to look.
    pub fn discrepancies(&self) -> Vec<Diagnostic> {
        let missing = self.missing.iter().map(|expected| {
            Diagnostic::error(
                expected.annotation,
                format!(
                    "expected {} \"{}\" was not produced",
                    expected.severity, expected.message
                ),
            )
        });
        let unexpected = self.unexpected.iter().map(|diagnostic| {
            Diagnostic::error(
                diagnostic.location,
                format!("unexpected {}: {}", diagnostic.severity, diagnostic.message),
            )
        });
        self.malformed
            .iter()
            .cloned()
            .chain(missing)
            .chain(unexpected)
            .collect()
    }
}
