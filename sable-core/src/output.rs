//! Output files that only appear once the run has succeeded.
//!
//! Output is written to a temporary file next to the destination. Calling
//! [`OutputFile::keep`] moves it into place; dropping it without keeping
//! discards it, so a failed run never leaves a half-written output behind.

use std::{
    io::{self, Write},
    path::{Path, PathBuf},
};

use tempfile::NamedTempFile;

use crate::{Error, Result};

enum Target {
    Stdout(io::Stdout),
    File { path: PathBuf, temp: NamedTempFile },
}

/// Destination for the final output text.
pub struct OutputFile {
    target: Target,
}

impl OutputFile {
    /// Open `path` for writing, or stdout when `path` is `-`.
    pub fn create(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if path == Path::new("-") {
            return Ok(Self {
                target: Target::Stdout(io::stdout()),
            });
        }

        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        let temp = NamedTempFile::new_in(dir).map_err(|source| {
            Box::new(Error::Output {
                path: path.to_path_buf(),
                source,
            })
        })?;
        Ok(Self {
            target: Target::File {
                path: path.to_path_buf(),
                temp,
            },
        })
    }

    /// Commit the output.
    pub fn keep(self) -> Result<()> {
        match self.target {
            Target::Stdout(mut stdout) => stdout.flush().map_err(|source| {
                Box::new(Error::Commit {
                    path: PathBuf::from("-"),
                    source,
                })
            }),
            Target::File { path, temp } => {
                temp.persist(&path).map_err(|e| {
                    Box::new(Error::Commit {
                        path: path.clone(),
                        source: e.error,
                    })
                })?;
                tracing::debug!(path = %path.display(), "output committed");
                Ok(())
            }
        }
    }
}

impl Write for OutputFile {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match &mut self.target {
            Target::Stdout(stdout) => stdout.write(buf),
            Target::File { temp, .. } => temp.write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match &mut self.target {
            Target::Stdout(stdout) => stdout.flush(),
            Target::File { temp, .. } => temp.flush(),
        }
    }
}
