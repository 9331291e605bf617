//! Line-by-line chunk classifier.

use std::path::Path;

use tracing::{debug, warn};

use crate::chunk::{Chunk, ChunkKind, FileId};
use crate::encoding::{detect_declaration, TextEncoding};
use crate::error::SourceError;
use crate::invocation::parse_line;

/// Characters dropped from every decoded line before classification.
const ESCAPE_ARTIFACTS: [char; 3] = ['\u{FEFF}', '\u{1A}', '\r'];

/// Classifier over one file's bytes.
///
/// Each call to [`Classifier::next_chunk`] consumes one line. The encoding is
/// fixed when the classifier is created; see [`classify_source`] for the
/// restart-on-mismatch driver.
pub struct Classifier<'a> {
    input: &'a [u8],
    file: FileId,
    encoding: TextEncoding,
    pos: usize,
    line: usize,
    /// Line that opened the macro definition being skipped.
    macro_start: Option<usize>,
}

impl<'a> Classifier<'a> {
    /// Create a classifier reading `input` as `encoding`.
    pub fn new(input: &'a [u8], file: FileId, encoding: TextEncoding) -> Self {
        Self {
            input,
            file,
            encoding,
            pos: 0,
            line: 0,
            macro_start: None,
        }
    }

    /// Classify every remaining line.
    pub fn classify_all(&mut self) -> Result<Vec<Chunk>, SourceError> {
        let mut chunks = Vec::new();
        while let Some(chunk) = self.next_chunk()? {
            chunks.push(chunk);
        }
        Ok(chunks)
    }

    /// Classify the next non-empty line, or `None` at end of input.
    pub fn next_chunk(&mut self) -> Result<Option<Chunk>, SourceError> {
        loop {
            if self.pos >= self.input.len() {
                if let Some(start) = self.macro_start.take() {
                    warn!(file = %self.file, line = start, "macro definition has no endm before end of file");
                }
                return Ok(None);
            }

            let offset = self.pos;
            let (content, length) = self.read_line();
            self.line += 1;

            let decoded = self.encoding.decode(content);
            if decoded.contains('\u{FFFD}') {
                return Err(SourceError::encoding_mismatch(
                    self.line,
                    self.encoding,
                    self.encoding.fallback(),
                ));
            }
            let text: String = decoded
                .chars()
                .filter(|c| !ESCAPE_ARTIFACTS.contains(c))
                .collect();

            if let Some(kind) = self.classify(&text)? {
                let parsed = match kind {
                    ChunkKind::Line => {
                        let parsed = parse_line(&text);
                        if parsed.is_empty() {
                            continue;
                        }
                        Some(parsed)
                    }
                    _ => None,
                };
                return Ok(Some(Chunk::new(
                    kind, self.file, offset, self.line, length, text, parsed,
                )));
            }
        }
    }

    /// Returns the line's bytes (without terminator) and its full length.
    fn read_line(&mut self) -> (&'a [u8], usize) {
        let input: &'a [u8] = self.input;
        let rest = &input[self.pos..];
        let (content, length) = match rest.iter().position(|&b| b == b'\n') {
            Some(nl) => (&rest[..nl], nl + 1),
            None => (rest, rest.len()),
        };
        self.pos += length;
        (content, length)
    }

    /// `None` means the line is blank and produces no chunk.
    fn classify(&mut self, text: &str) -> Result<Option<ChunkKind>, SourceError> {
        let trimmed = text.trim_start();

        if trimmed.is_empty() {
            return Ok(None);
        }

        if self.macro_start.is_some() {
            if is_macro_end(trimmed) {
                self.macro_start = None;
            }
            return Ok(Some(ChunkKind::MacroDefinition));
        }

        if trimmed.starts_with(';') {
            if let Some(declared) = detect_declaration(trimmed) {
                if declared != self.encoding {
                    return Err(SourceError::encoding_mismatch(
                        self.line,
                        self.encoding,
                        declared,
                    ));
                }
            }
            return Ok(Some(ChunkKind::Comment));
        }

        if is_macro_start(trimmed) {
            self.macro_start = Some(self.line);
            return Ok(Some(ChunkKind::MacroDefinition));
        }

        Ok(Some(ChunkKind::Line))
    }
}

/// First two words of a line, ignoring any `;` comment.
fn leading_words(trimmed: &str) -> impl Iterator<Item = &str> {
    trimmed
        .split(';')
        .next()
        .unwrap_or("")
        .split_whitespace()
        .take(2)
}

/// `name macro ...` or `macro name ...`.
fn is_macro_start(trimmed: &str) -> bool {
    leading_words(trimmed).any(|t| t.trim_end_matches(':').eq_ignore_ascii_case("macro"))
}

fn is_macro_end(trimmed: &str) -> bool {
    leading_words(trimmed).any(|t| t.eq_ignore_ascii_case("endm") || t.eq_ignore_ascii_case("endmacro"))
}

/// Result of classifying a whole file.
#[derive(Debug, Clone)]
pub struct ClassifiedSource {
    /// Chunks in source order.
    pub chunks: Vec<Chunk>,
    /// Encoding that classified the file without a mismatch.
    pub encoding: TextEncoding,
    /// Number of restarts from offset 0.
    pub restarts: usize,
}

/// Classify `input`, restarting from the beginning whenever the encoding
/// guess turns out wrong.
///
/// Each encoding is tried at most once; a mismatch that points back at an
/// encoding already tried is returned as an error.
pub fn classify_source(
    input: &[u8],
    file: FileId,
    initial: TextEncoding,
) -> Result<ClassifiedSource, SourceError> {
    let mut encoding = initial;
    let mut tried = vec![encoding];

    loop {
        let mut classifier = Classifier::new(input, file, encoding);
        match classifier.classify_all() {
            Ok(chunks) => {
                debug!(%file, %encoding, chunks = chunks.len(), "classified source");
                return Ok(ClassifiedSource {
                    chunks,
                    encoding,
                    restarts: tried.len() - 1,
                });
            }
            Err(SourceError::EncodingMismatch {
                line, suggested, ..
            }) if !tried.contains(&suggested) => {
                warn!(%file, line, from = %encoding, to = %suggested, "restarting with corrected encoding");
                encoding = suggested;
                tried.push(encoding);
            }
            Err(e) => return Err(e),
        }
    }
}

/// Read and classify a file from disk.
pub fn classify_file(
    path: impl AsRef<Path>,
    file: FileId,
    initial: TextEncoding,
) -> Result<ClassifiedSource, SourceError> {
    let data = std::fs::read(path)?;
    classify_source(&data, file, initial)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classify(src: &[u8]) -> Vec<Chunk> {
        Classifier::new(src, FileId(0), TextEncoding::Utf8)
            .classify_all()
            .unwrap()
    }

    #[test]
    fn test_kinds_and_positions() {
        let src = b"; header\n\n\tpointsb\r\n\tpb 1,2,3\n";
        let chunks = classify(src);
        assert_eq!(chunks.len(), 3);

        assert_eq!(chunks[0].kind(), ChunkKind::Comment);
        assert_eq!(chunks[0].offset(), 0);
        assert_eq!(chunks[0].line_number(), 1);
        assert_eq!(chunks[0].len(), 9);

        assert_eq!(chunks[1].kind(), ChunkKind::Line);
        assert_eq!(chunks[1].offset(), 10);
        assert_eq!(chunks[1].line_number(), 3);
        assert_eq!(chunks[1].text(), "\tpointsb");

        assert_eq!(chunks[2].offset(), 20);
        assert_eq!(chunks[2].invocation().unwrap().param_count(), 3);
    }

    #[test]
    fn test_escape_artifacts_stripped() {
        let src = "\u{FEFF}\tfend\u{1A}\n".as_bytes();
        let chunks = classify(src);
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].text(), "\tfend");
        assert!(chunks[0].invocation().unwrap().is("fend"));
    }

    #[test]
    fn test_macro_definition_body() {
        let src = b"pb\tmacro\n\tdb \\1,\\2,\\3\n\tendm\n\tpb 1,2,3\n";
        let chunks = classify(src);
        assert_eq!(chunks.len(), 4);
        assert!(chunks[..3]
            .iter()
            .all(|c| c.kind() == ChunkKind::MacroDefinition));
        assert!(chunks[0].invocation().is_none());
        assert_eq!(chunks[3].kind(), ChunkKind::Line);
    }

    #[test]
    fn test_macro_body_blank_lines_and_commented_end() {
        let src = b"pw\tmacro\n\n\tdw \\1\n   \n\tendm;done\n\tpw 1,2,3\n";
        let chunks = classify(src);
        let kinds: Vec<ChunkKind> = chunks.iter().map(Chunk::kind).collect();
        assert_eq!(
            kinds,
            vec![
                ChunkKind::MacroDefinition,
                ChunkKind::MacroDefinition,
                ChunkKind::MacroDefinition,
                ChunkKind::Line,
            ]
        );
        assert_eq!(chunks[1].line_number(), 3);
        assert_eq!(chunks[3].line_number(), 6);
    }

    #[test]
    fn test_unterminated_macro_swallows_rest() {
        let chunks = classify(b"pb macro\n\tdb 1\n\tpb 1,2,3\n");
        assert_eq!(chunks.len(), 3);
        assert!(chunks.iter().all(|c| c.kind() == ChunkKind::MacroDefinition));
    }

    #[test]
    fn test_comment_only_code_line_discarded() {
        let chunks = classify(b"   \t  \n\t  ; trailing\n");
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].kind(), ChunkKind::Comment);
    }

    #[test]
    fn test_invalid_utf8_is_mismatch() {
        let src = b"\tpb 1,2,3\n; caf\xe9\n";
        let err = Classifier::new(src, FileId(0), TextEncoding::Utf8)
            .classify_all()
            .unwrap_err();
        assert!(matches!(
            err,
            SourceError::EncodingMismatch {
                line: 2,
                active: TextEncoding::Utf8,
                suggested: TextEncoding::Latin1,
            }
        ));
    }

    #[test]
    fn test_restart_with_fallback() {
        let src = b"\tpb 1,2,3\n; caf\xe9\n";
        let classified = classify_source(src, FileId(0), TextEncoding::Utf8).unwrap();
        assert_eq!(classified.encoding, TextEncoding::Latin1);
        assert_eq!(classified.restarts, 1);
        assert_eq!(classified.chunks[1].text(), "; caf\u{e9}");
    }

    #[test]
    fn test_restart_from_declaration() {
        let src = b"; -*- coding: latin-1 -*-\n\tpb 1,2,3\n";
        let classified = classify_source(src, FileId(0), TextEncoding::Utf8).unwrap();
        assert_eq!(classified.encoding, TextEncoding::Latin1);
        assert_eq!(classified.restarts, 1);
        assert_eq!(classified.chunks.len(), 2);
    }

    #[test]
    fn test_conflicting_declarations_fail() {
        let src = b"; coding: latin-1\n; charset=utf-8\n";
        let err = classify_source(src, FileId(0), TextEncoding::Utf8).unwrap_err();
        assert!(matches!(err, SourceError::EncodingMismatch { .. }));
    }
}
