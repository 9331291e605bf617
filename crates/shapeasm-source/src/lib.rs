#![warn(missing_docs)]

//! Source classification for hand-written shape assembly.
//!
//! Splits a source file into [`Chunk`]s (comments, macro definitions and code
//! lines), recognizes macro invocations on code lines, and detects the
//! character encoding the file was written in. Classification is all or
//! nothing per encoding: when a line shows the guess was wrong, the whole file
//! is classified again from the start.
//!
//! # Example
//!
//! ```
//! use shapeasm_source::{classify_source, ChunkKind, FileId, TextEncoding};
//!
//! let src = b"; ship\n\tpointsb\n\tpb 1,2,3\n";
//! let classified = classify_source(src, FileId(0), TextEncoding::Utf8).unwrap();
//! assert_eq!(classified.chunks.len(), 3);
//! assert_eq!(classified.chunks[0].kind(), ChunkKind::Comment);
//! assert_eq!(classified.chunks[2].invocation().unwrap().name(), "pb");
//! ```

mod chunk;
mod classifier;
mod constants;
mod encoding;
mod error;
mod invocation;

pub use chunk::{Chunk, ChunkKind, FileId};
pub use classifier::{classify_file, classify_source, ClassifiedSource, Classifier};
pub use constants::harvest_constants;
pub use encoding::{detect_declaration, TextEncoding};
pub use error::SourceError;
pub use invocation::{parse_line, MacroInvocation, MacroParam, ParsedLine};
