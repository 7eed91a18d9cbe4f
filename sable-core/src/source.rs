//! Source buffers and chunk splitting.
//!
//! With `--split-input-file`, an input is cut into independent chunks at
//! separator lines (`// ---`). Each chunk is processed on its own, so a
//! malformed case cannot hide failures in its siblings.

use std::{io::Read, path::Path};

use crate::{Error, Result};

/// Canonical separator line, used when re-joining chunk output.
pub const SPLIT_MARKER: &str = "// ---";

/// An input buffer plus the name used when reporting locations in it.
#[derive(Debug, Clone)]
pub struct SourceBuffer {
    name: String,
    text: String,
}

impl SourceBuffer {
    /// Create a buffer from in-memory text.
    pub fn new(name: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            text: text.into(),
        }
    }

    /// Read a buffer from `path`, or from stdin when `path` is `-`.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if path == Path::new("-") {
            let mut text = String::new();
            std::io::stdin()
                .read_to_string(&mut text)
                .map_err(|source| {
                    Box::new(Error::Io {
                        path: path.to_path_buf(),
                        source,
                    })
                })?;
            return Ok(Self::new("<stdin>", text));
        }

        let text = std::fs::read_to_string(path).map_err(|source| {
            Box::new(Error::Io {
                path: path.to_path_buf(),
                source,
            })
        })?;
        Ok(Self::new(path.display().to_string(), text))
    }

    /// The buffer name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The buffer contents.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// The whole buffer as a single chunk.
    pub fn whole(&self) -> Chunk<'_> {
        Chunk {
            index: 0,
            text: &self.text,
            start_line: 0,
            separator: None,
        }
    }

    /// Lazily split the buffer at separator lines.
    pub fn chunks(&self) -> ChunkSplitter<'_> {
        ChunkSplitter::new(&self.text)
    }
}

/// A contiguous piece of a [`SourceBuffer`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Chunk<'a> {
    index: usize,
    text: &'a str,
    start_line: usize,
    separator: Option<&'a str>,
}

impl<'a> Chunk<'a> {
    /// Position of this chunk among its siblings.
    pub fn index(&self) -> usize {
        self.index
    }

    /// The chunk text, without the separator line that ended it.
    pub fn text(&self) -> &'a str {
        self.text
    }

    /// 0-based line in the buffer where this chunk starts.
    pub fn start_line(&self) -> usize {
        self.start_line
    }

    /// The separator line (including its line break) that ended this
    /// chunk, or `None` for the last chunk.
    pub fn separator(&self) -> Option<&'a str> {
        self.separator
    }
}

/// Returns true if `line` is a chunk separator: `//` followed by three or
/// more dashes and nothing else.
pub fn is_separator(line: &str) -> bool {
    let Some(rest) = line.trim().strip_prefix("//") else {
        return false;
    };
    let dashes = rest.trim_start();
    dashes.len() >= 3 && dashes.bytes().all(|b| b == b'-')
}

/// Iterator over the chunks of a buffer, in source order.
///
/// Chunks are found one at a time as the iterator advances; the full
/// partition is never materialized up front.
#[derive(Debug, Clone)]
pub struct ChunkSplitter<'a> {
    rest: &'a str,
    next_line: usize,
    next_index: usize,
    done: bool,
}

impl<'a> ChunkSplitter<'a> {
    /// Split `text`.
    pub fn new(text: &'a str) -> Self {
        Self {
            rest: text,
            next_line: 0,
            next_index: 0,
            done: false,
        }
    }
}

impl<'a> Iterator for ChunkSplitter<'a> {
    type Item = Chunk<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        let mut offset = 0;
        for line in self.rest.split_inclusive('\n') {
            if is_separator(line) {
                let text = &self.rest[..offset];
                let separator = &self.rest[offset..offset + line.len()];
                let chunk = Chunk {
                    index: self.next_index,
                    text,
                    start_line: self.next_line,
                    separator: Some(separator),
                };
                self.next_line += text.matches('\n').count() + 1;
                self.next_index += 1;
                self.rest = &self.rest[offset + line.len()..];
                return Some(chunk);
            }
            offset += line.len();
        }

        self.done = true;
        Some(Chunk {
            index: self.next_index,
            text: self.rest,
            start_line: self.next_line,
            separator: None,
        })
    }
}

impl std::iter::FusedIterator for ChunkSplitter<'_> {}
