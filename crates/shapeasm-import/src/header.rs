//! Shape-header recognition.

use shapeasm_expr::Resolver;
use shapeasm_source::{Chunk, MacroInvocation};

use crate::error::{ImportError, Result};
use crate::model::ShapeHeader;

/// Default macro name of a shape header line.
pub const DEFAULT_HEADER_MACRO: &str = "shapehdr";

/// Decides whether a code line opens a new shape.
pub trait HeaderRecognizer {
    /// Return the header described by `chunk`, or `None` if the line is not
    /// a header.
    fn recognize(&self, chunk: &Chunk, resolver: &Resolver<'_>) -> Result<Option<ShapeHeader>>;
}

/// Recognizes `<label> <macro> <pointsPtr>,<sizeShift>,<facesPtr>[,<name>[,<pointsTo>]]`.
#[derive(Debug, Clone)]
pub struct MacroHeaderRecognizer {
    macro_name: String,
}

impl MacroHeaderRecognizer {
    /// Recognize headers written with `macro_name`.
    pub fn new(macro_name: impl Into<String>) -> Self {
        Self {
            macro_name: macro_name.into(),
        }
    }

    fn required<'a>(&self, inv: &'a MacroInvocation, index: usize) -> Result<&'a str> {
        inv.param(index)
            .map(|p| p.raw())
            .ok_or_else(|| ImportError::missing_parameter(inv.name(), index))
    }
}

impl Default for MacroHeaderRecognizer {
    fn default() -> Self {
        Self::new(DEFAULT_HEADER_MACRO)
    }
}

impl HeaderRecognizer for MacroHeaderRecognizer {
    fn recognize(&self, chunk: &Chunk, resolver: &Resolver<'_>) -> Result<Option<ShapeHeader>> {
        let Some(inv) = chunk.invocation().filter(|inv| inv.is(&self.macro_name)) else {
            return Ok(None);
        };

        let point_ptr = self.required(inv, 0)?;
        let size_text = inv.param_text(1);
        let size_shift = resolver
            .resolve(size_text)
            .map_err(|e| ImportError::expression(size_text, e))?;
        let face_ptr = self.required(inv, 2)?;

        let label = chunk.label().map(str::to_string);
        let name = inv
            .param(3)
            .map(|p| unquote(p.raw()).to_string())
            .or_else(|| label.clone())
            .unwrap_or_else(|| point_ptr.to_string());

        Ok(Some(ShapeHeader {
            unique_name: name.clone(),
            name,
            point_ptr: point_ptr.to_string(),
            face_ptr: face_ptr.to_string(),
            inline_label: label,
            points_to: inv.param(4).map(|p| p.raw().to_string()),
            size_shift,
            source_offset: chunk.offset(),
            source_line: chunk.line_number(),
        }))
    }
}

fn unquote(text: &str) -> &str {
    let t = text.trim();
    for q in ['"', '\''] {
        if let Some(inner) = t.strip_prefix(q).and_then(|r| r.strip_suffix(q)) {
            return inner;
        }
    }
    t
}
