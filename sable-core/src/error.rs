use std::path::PathBuf;

use miette::Diagnostic;
use thiserror::Error;

/// Result type for sable-core operations (boxed to reduce size on stack)
pub type Result<T> = std::result::Result<T, Box<Error>>;

#[derive(Debug, Error, Diagnostic)]
pub enum Error {
    #[error("failed to read '{path}'")]
    #[diagnostic(
        code(sable::io),
        help("pass an existing file, or '-' to read from stdin")
    )]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to open output file '{path}'")]
    #[diagnostic(
        code(sable::output),
        help("check that the parent directory exists and is writable")
    )]
    Output {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to commit output file '{path}'")]
    #[diagnostic(code(sable::output))]
    Commit {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
