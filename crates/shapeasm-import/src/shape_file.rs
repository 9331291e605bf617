//! Import result for one source file.

use std::collections::BTreeSet;
use std::fmt::Write as _;

use serde::Serialize;

use crate::model::Shape;

/// Everything recovered from one source file.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ShapeFile {
    /// Finished shapes in the order they were completed.
    pub shapes: Vec<Shape>,
    /// Blank shapes the post-pass could not resolve.
    pub blanks: Vec<Shape>,
    /// Every header name seen in the source.
    pub declared_names: BTreeSet<String>,
    /// Human-readable log of recovered errors.
    pub error_log: String,
}

impl ShapeFile {
    /// Create an empty file.
    pub fn new() -> Self {
        Self::default()
    }

    /// Shape by unique name.
    pub fn shape(&self, name: &str) -> Option<&Shape> {
        self.shapes.iter().find(|s| s.header.unique_name == name)
    }

    /// Declared names that produced no finished shape.
    pub fn missing_declarations(&self) -> Vec<&str> {
        self.declared_names
            .iter()
            .filter(|n| !self.shapes.iter().any(|s| &s.header.name == *n))
            .map(String::as_str)
            .collect()
    }

    /// Whether any errors were logged.
    pub fn has_errors(&self) -> bool {
        !self.error_log.is_empty()
    }

    /// Append one line to the error log.
    pub fn log_line(&mut self, line: impl AsRef<str>) {
        let _ = writeln!(self.error_log, "{}", line.as_ref());
    }

    /// Append a structured error block.
    pub fn log_block(&mut self, shape: &str, chunk: &str, frame: usize, error: &str) {
        let _ = writeln!(
            self.error_log,
            "=== import error ===\nshape: {shape}\nchunk: {chunk}\nframe: {frame}\nerror: {error}"
        );
    }
}
