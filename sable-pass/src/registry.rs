//! Pass registry and pass options.

use std::str::FromStr;

use indexmap::IndexMap;
use miette::SourceSpan;

use crate::{pass::Pass, passes};

/// Builds a pass from its options.
pub type PassFactory = fn(&mut PassOptions) -> Result<Box<dyn Pass>, OptionError>;

/// An option a pass accepts.
#[derive(Debug, Clone, Copy)]
pub struct PassOptionInfo {
    pub name: &'static str,
    pub description: &'static str,
}

/// Registration entry for a pass.
#[derive(Debug, Clone, Copy)]
pub struct PassInfo {
    /// Name used in pipeline text.
    pub name: &'static str,
    /// One-line description shown by `--list-passes`.
    pub summary: &'static str,
    /// Operation the pass must be scheduled on, if restricted.
    pub anchor: Option<&'static str>,
    pub options: &'static [PassOptionInfo],
    pub factory: PassFactory,
}

impl PassInfo {
    /// Names of the accepted options.
    pub fn option_names(&self) -> Vec<&'static str> {
        self.options.iter().map(|o| o.name).collect()
    }
}

/// The set of passes a pipeline can name.
#[derive(Debug, Clone, Default)]
pub struct PassRegistry {
    passes: IndexMap<&'static str, PassInfo>,
}

impl PassRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with every built-in pass.
    pub fn with_builtins() -> Self {
        passes::BUILTIN
            .iter()
            .fold(Self::new(), |registry, info| registry.register(*info))
    }

    /// Add a pass, replacing any pass with the same name.
    pub fn register(mut self, info: PassInfo) -> Self {
        self.passes.insert(info.name, info);
        self
    }

    pub fn get(&self, name: &str) -> Option<&PassInfo> {
        self.passes.get(name)
    }

    /// Registered passes in registration order.
    pub fn passes(&self) -> impl Iterator<Item = &PassInfo> {
        self.passes.values()
    }
}

/// A problem with one option of a pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OptionError {
    Unknown { option: String, span: SourceSpan },
    Invalid { option: String, reason: String, span: SourceSpan },
}

#[derive(Debug, Clone)]
struct OptionValue {
    value: Option<String>,
    span: SourceSpan,
}

/// Options given to one pass in the pipeline text.
///
/// Factories take the options they understand; whatever remains when
/// [`PassOptions::finish`] is called is reported as unknown.
#[derive(Debug, Clone, Default)]
pub struct PassOptions {
    values: IndexMap<String, OptionValue>,
}

impl PassOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an option. A repeated key replaces the earlier value.
    pub fn insert(&mut self, key: impl Into<String>, value: Option<String>, span: SourceSpan) {
        self.values.insert(key.into(), OptionValue { value, span });
    }

    /// Take an option that must carry a value parseable as `T`.
    pub fn take_parsed<T>(&mut self, key: &str) -> Result<Option<T>, OptionError>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        let Some(entry) = self.values.shift_remove(key) else {
            return Ok(None);
        };
        let Some(value) = entry.value else {
            return Err(OptionError::Invalid {
                option: key.to_string(),
                reason: "a value is required".to_string(),
                span: entry.span,
            });
        };
        value.parse().map(Some).map_err(|e: T::Err| OptionError::Invalid {
            option: key.to_string(),
            reason: format!("'{value}': {e}"),
            span: entry.span,
        })
    }

    /// Take a boolean flag. A bare key means `true`.
    pub fn take_flag(&mut self, key: &str) -> Result<bool, OptionError> {
        let Some(entry) = self.values.get(key) else {
            return Ok(false);
        };
        if entry.value.is_none() {
            self.values.shift_remove(key);
            return Ok(true);
        }
        Ok(self.take_parsed::<bool>(key)?.unwrap_or(false))
    }

    /// Fail on the first option nobody took.
    pub fn finish(self) -> Result<(), OptionError> {
        match self.values.into_iter().next() {
            Some((option, entry)) => Err(OptionError::Unknown {
                option,
                span: entry.span,
            }),
            None => Ok(()),
        }
    }

    /// Where `key` was written, if it was given.
    pub fn span(&self, key: &str) -> Option<SourceSpan> {
        self.values.get(key).map(|entry| entry.span)
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}
