//! Character encodings of shape source files.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Byte encoding used to decode a source file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum TextEncoding {
    /// UTF-8 (ASCII-compatible).
    #[default]
    #[serde(rename = "utf-8", alias = "utf8")]
    Utf8,
    /// ISO-8859-1: every byte maps to the code point of the same value.
    #[serde(rename = "latin-1", alias = "latin1", alias = "iso-8859-1")]
    Latin1,
}

impl TextEncoding {
    /// Canonical lowercase name.
    pub fn canonical_name(self) -> &'static str {
        match self {
            TextEncoding::Utf8 => "utf-8",
            TextEncoding::Latin1 => "latin-1",
        }
    }

    /// Resolve an encoding name as written in a declaration comment.
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "utf-8" | "utf8" => Some(TextEncoding::Utf8),
            "latin-1" | "latin1" | "iso-8859-1" | "iso8859-1" | "l1" => Some(TextEncoding::Latin1),
            _ => None,
        }
    }

    /// Decode one line of bytes.
    ///
    /// Invalid UTF-8 decodes to `U+FFFD`, which the classifier treats as a
    /// wrong guess.
    pub fn decode(self, bytes: &[u8]) -> String {
        match self {
            TextEncoding::Utf8 => String::from_utf8_lossy(bytes).into_owned(),
            TextEncoding::Latin1 => bytes.iter().map(|&b| b as char).collect(),
        }
    }

    /// Encoding to fall back to when this one fails to decode a line.
    pub fn fallback(self) -> Self {
        match self {
            TextEncoding::Utf8 => TextEncoding::Latin1,
            TextEncoding::Latin1 => TextEncoding::Utf8,
        }
    }
}

impl fmt::Display for TextEncoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.canonical_name())
    }
}

const DECLARATION_PHRASES: [&str; 2] = ["coding:", "charset="];

/// Find an encoding declaration (`coding: <name>` or `charset=<name>`) in a
/// comment line.
pub fn detect_declaration(comment: &str) -> Option<TextEncoding> {
    let lower = comment.to_ascii_lowercase();
    DECLARATION_PHRASES.iter().find_map(|phrase| {
        let start = lower.find(phrase)? + phrase.len();
        let name: String = lower[start..]
            .trim_start()
            .chars()
            .take_while(|c| c.is_ascii_alphanumeric() || *c == '-' || *c == '_')
            .collect();
        TextEncoding::from_name(&name)
    })
}
