use sable_ir::ParseError;
use sable_pass::{BuildError, RunError};
use thiserror::Error;

/// Result type for sable-opt operations.
pub type Result<T> = std::result::Result<T, OptError>;

/// Why a chunk, or the whole run, failed.
#[derive(Debug, Error)]
pub enum OptError {
    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    PipelineBuild(#[from] Box<BuildError>),

    #[error(transparent)]
    PassExecution(#[from] RunError),

    #[error(
        "diagnostic verification failed: {missing} expected not produced, \
         {unexpected} unexpected, {malformed} malformed annotations"
    )]
    VerificationMismatch {
        missing: usize,
        unexpected: usize,
        malformed: usize,
    },
}
