//! Statement sources
//!
//! A program is a flat, `;`-delimited sequence of statements. There is no
//! block structure at this level: the engine asks for statements one ordinal
//! at a time and discovers blocks while running.

use crate::error::{Error, Result};
use serde::Serialize;
use std::fmt;
use std::ops::Range;
use std::path::Path;

/// Statement terminator character
pub const TERMINATOR: char = ';';

/// Instruction pointer: ordinal of a statement in its program
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize)]
#[serde(transparent)]
pub struct Cursor(usize);

impl Cursor {
    pub const fn new(ordinal: usize) -> Self {
        Cursor(ordinal)
    }

    pub fn ordinal(self) -> usize {
        self.0
    }

    /// Fall-through address
    pub fn next(self) -> Self {
        Cursor(self.0 + 1)
    }
}

impl fmt::Display for Cursor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Source of statements, fetched by ordinal.
pub trait Program {
    /// Statement at `cursor`, whitespace-trimmed, or `None` past the end.
    fn fetch(&self, cursor: Cursor) -> Option<String>;

    /// Byte range of the statement at `cursor` in the program text, if known.
    fn span(&self, _cursor: Cursor) -> Option<Range<usize>> {
        None
    }
}

/// Program held as raw text.
///
/// Every fetch rescans the text from the start, so fetching is linear in the
/// program length.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextProgram {
    text: String,
}

impl TextProgram {
    pub fn new(text: impl Into<String>) -> Self {
        TextProgram { text: text.into() }
    }

    /// Load a program file. The caller must handle the IO error before any
    /// engine is built.
    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|source| Error::Io {
            path: path.display().to_string(),
            source,
        })?;
        Ok(TextProgram::new(text))
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    /// Number of statements in the program
    pub fn statement_count(&self) -> usize {
        self.segments().count()
    }

    /// Raw segments with their byte offsets. A blank segment after the final
    /// terminator is not a statement.
    fn segments(&self) -> impl Iterator<Item = (usize, &str)> + '_ {
        let mut offset = 0;
        let mut pieces = self.text.split(TERMINATOR).peekable();
        std::iter::from_fn(move || {
            let segment = pieces.next()?;
            let is_tail = pieces.peek().is_none();
            if is_tail && segment.trim().is_empty() {
                return None;
            }
            let start = offset;
            offset += segment.len() + TERMINATOR.len_utf8();
            Some((start, segment))
        })
    }

    fn locate(&self, cursor: Cursor) -> Option<(usize, &str)> {
        self.segments().nth(cursor.ordinal())
    }
}

impl Program for TextProgram {
    fn fetch(&self, cursor: Cursor) -> Option<String> {
        self.locate(cursor)
            .map(|(_, segment)| segment.trim().to_string())
    }

    fn span(&self, cursor: Cursor) -> Option<Range<usize>> {
        let (offset, segment) = self.locate(cursor)?;
        let leading = segment.len() - segment.trim_start().len();
        let start = offset + leading;
        Some(start..start + segment.trim().len())
    }
}
