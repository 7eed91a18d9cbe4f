use miette::{Diagnostic, NamedSource, SourceSpan};
use thiserror::Error;

/// Name used for the pipeline text in rendered reports.
const PIPELINE_SOURCE: &str = "pass-pipeline";

/// Wraps the pipeline text so build errors can point into it.
#[derive(Debug, Clone)]
pub(crate) struct PipelineSource {
    text: String,
}

impl PipelineSource {
    pub(crate) fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }

    fn named_source(&self) -> NamedSource<String> {
        NamedSource::new(PIPELINE_SOURCE, self.text.clone())
    }

    pub(crate) fn syntax_error(
        &self,
        message: impl Into<String>,
        span: SourceSpan,
    ) -> Box<BuildError> {
        Box::new(BuildError::Syntax {
            src: self.named_source(),
            span,
            message: message.into(),
        })
    }

    pub(crate) fn unknown_pass(
        &self,
        name: impl Into<String>,
        span: SourceSpan,
    ) -> Box<BuildError> {
        Box::new(BuildError::UnknownPass {
            src: self.named_source(),
            span,
            name: name.into(),
        })
    }

    pub(crate) fn unknown_option(
        &self,
        pass: impl Into<String>,
        option: impl Into<String>,
        accepted: &[&str],
        span: SourceSpan,
    ) -> Box<BuildError> {
        let help = if accepted.is_empty() {
            "this pass takes no options".to_string()
        } else {
            format!("accepted options: {}", accepted.join(", "))
        };
        Box::new(BuildError::UnknownOption {
            src: self.named_source(),
            span,
            pass: pass.into(),
            option: option.into(),
            help,
        })
    }

    pub(crate) fn invalid_option(
        &self,
        pass: impl Into<String>,
        option: impl Into<String>,
        reason: impl Into<String>,
        span: SourceSpan,
    ) -> Box<BuildError> {
        Box::new(BuildError::InvalidOption {
            src: self.named_source(),
            span,
            pass: pass.into(),
            option: option.into(),
            reason: reason.into(),
        })
    }

    pub(crate) fn anchor_mismatch(
        &self,
        pass: impl Into<String>,
        required: impl Into<String>,
        actual: impl Into<String>,
        span: SourceSpan,
    ) -> Box<BuildError> {
        Box::new(BuildError::AnchorMismatch {
            src: self.named_source(),
            span,
            pass: pass.into(),
            required: required.into(),
            actual: actual.into(),
        })
    }

    pub(crate) fn unknown_anchor(
        &self,
        anchor: impl Into<String>,
        span: SourceSpan,
    ) -> Box<BuildError> {
        Box::new(BuildError::UnknownAnchor {
            src: self.named_source(),
            span,
            anchor: anchor.into(),
        })
    }
}

/// The pipeline text could not be turned into a runnable pipeline.
#[derive(Debug, Error, Diagnostic)]
pub enum BuildError {
    #[error("invalid pass pipeline: {message}")]
    #[diagnostic(code(sable::pipeline::syntax))]
    Syntax {
        #[source_code]
        src: NamedSource<String>,
        #[label("here")]
        span: SourceSpan,
        message: String,
    },

    #[error("unknown pass '{name}'")]
    #[diagnostic(
        code(sable::pipeline::unknown_pass),
        help("run with --list-passes to see the registered passes")
    )]
    UnknownPass {
        #[source_code]
        src: NamedSource<String>,
        #[label("not a registered pass")]
        span: SourceSpan,
        name: String,
    },

    #[error("unknown option '{option}' for pass '{pass}'")]
    #[diagnostic(code(sable::pipeline::unknown_option))]
    UnknownOption {
        #[source_code]
        src: NamedSource<String>,
        #[label("unknown option")]
        span: SourceSpan,
        pass: String,
        option: String,
        #[help]
        help: String,
    },

    #[error("invalid value for option '{option}' of pass '{pass}': {reason}")]
    #[diagnostic(code(sable::pipeline::invalid_option))]
    InvalidOption {
        #[source_code]
        src: NamedSource<String>,
        #[label("invalid value")]
        span: SourceSpan,
        pass: String,
        option: String,
        reason: String,
    },

    #[error("pass '{pass}' must run on '{required}' operations, but is scheduled on '{actual}'")]
    #[diagnostic(
        code(sable::pipeline::anchor_mismatch),
        help("move the pass out of the nested pipeline")
    )]
    AnchorMismatch {
        #[source_code]
        src: NamedSource<String>,
        #[label("scheduled here")]
        span: SourceSpan,
        pass: String,
        required: String,
        actual: String,
    },

    #[error("cannot nest a pipeline on '{anchor}'")]
    #[diagnostic(
        code(sable::pipeline::unknown_anchor),
        help("nested pipelines must be anchored on a registered operation with regions, such as 'func'")
    )]
    UnknownAnchor {
        #[source_code]
        src: NamedSource<String>,
        #[label("not a valid anchor")]
        span: SourceSpan,
        anchor: String,
    },
}

/// A pipeline stopped while running.
///
/// Details have already been emitted as diagnostics through the context.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RunError {
    #[error("pass '{pass}' failed: {reason}")]
    PassFailed { pass: String, reason: String },

    #[error("verification failed after running pass '{pass}'")]
    VerificationFailed { pass: String },
}

impl RunError {
    /// The pass the failure is attributed to.
    pub fn pass(&self) -> &str {
        match self {
            RunError::PassFailed { pass, .. } | RunError::VerificationFailed { pass } => pass,
        }
    }
}
