//! Classified units of source text.

use std::fmt;
use std::hash::{Hash, Hasher};

use serde::Serialize;

use crate::invocation::{MacroInvocation, ParsedLine};

/// Identity of the source file a chunk came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize)]
pub struct FileId(pub u32);

impl fmt::Display for FileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "file#{}", self.0)
    }
}

/// What a chunk of source is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ChunkKind {
    /// A `;` comment line.
    Comment,
    /// A macro definition header or body line.
    MacroDefinition,
    /// A code line.
    Line,
}

/// One classified line of source.
///
/// Chunks never change after classification. Two chunks are equal when they
/// cover the same bytes of the same file.
#[derive(Debug, Clone, Serialize)]
pub struct Chunk {
    kind: ChunkKind,
    file: FileId,
    offset: usize,
    line: usize,
    length: usize,
    text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    parsed: Option<ParsedLine>,
}

impl Chunk {
    /// Create a chunk. `parsed` is only kept for [`ChunkKind::Line`].
    pub fn new(
        kind: ChunkKind,
        file: FileId,
        offset: usize,
        line: usize,
        length: usize,
        text: impl Into<String>,
        parsed: Option<ParsedLine>,
    ) -> Self {
        Self {
            kind,
            file,
            offset,
            line,
            length,
            text: text.into(),
            parsed: parsed.filter(|_| kind == ChunkKind::Line),
        }
    }

    /// Build a code-line chunk straight from text, for callers that
    /// synthesize source.
    pub fn line(file: FileId, offset: usize, line: usize, text: &str) -> Self {
        let parsed = crate::invocation::parse_line(text);
        Self::new(
            ChunkKind::Line,
            file,
            offset,
            line,
            text.len(),
            text,
            Some(parsed),
        )
    }

    /// Chunk kind.
    pub fn kind(&self) -> ChunkKind {
        self.kind
    }

    /// Owning file.
    pub fn file(&self) -> FileId {
        self.file
    }

    /// Byte offset of the line start.
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Line number (1-indexed).
    pub fn line_number(&self) -> usize {
        self.line
    }

    /// Length in bytes, including the line terminator.
    pub fn len(&self) -> usize {
        self.length
    }

    /// Whether the chunk covers no bytes.
    pub fn is_empty(&self) -> bool {
        self.length == 0
    }

    /// Decoded text, with escape artifacts removed.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Label defined on this line, if any.
    pub fn label(&self) -> Option<&str> {
        self.parsed.as_ref()?.label.as_deref()
    }

    /// Macro invocation on this line, if any.
    pub fn invocation(&self) -> Option<&MacroInvocation> {
        self.parsed.as_ref()?.invocation.as_ref()
    }

    /// One-line description for diagnostics.
    pub fn describe(&self) -> String {
        format!(
            "{:?} {} line {} @{:#x}+{}: {}",
            self.kind,
            self.file,
            self.line,
            self.offset,
            self.length,
            self.text.trim()
        )
    }
}

impl PartialEq for Chunk {
    fn eq(&self, other: &Self) -> bool {
        self.file == other.file && self.offset == other.offset && self.length == other.length
    }
}

impl Eq for Chunk {}

impl Hash for Chunk {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.file.hash(state);
        self.offset.hash(state);
        self.length.hash(state);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_equality_is_positional() {
        let a = Chunk::line(FileId(1), 10, 2, "\tpb 1,2,3");
        let b = Chunk::new(ChunkKind::Comment, FileId(1), 10, 7, 9, "; other", None);
        assert_eq!(a, b);
        let c = Chunk::line(FileId(2), 10, 2, "\tpb 1,2,3");
        assert_ne!(a, c);
    }

    #[test]
    fn test_parsed_dropped_for_non_lines() {
        let parsed = crate::invocation::parse_line("\tpb 1,2,3");
        let chunk = Chunk::new(ChunkKind::Comment, FileId(0), 0, 1, 9, "; pb", Some(parsed));
        assert!(chunk.invocation().is_none());
    }

    #[test]
    fn test_describe() {
        let chunk = Chunk::line(FileId(0), 16, 3, "\tpw 1,2,3");
        let d = chunk.describe();
        assert!(d.contains("line 3"), "{d}");
        assert!(d.contains("pw 1,2,3"), "{d}");
    }
}
