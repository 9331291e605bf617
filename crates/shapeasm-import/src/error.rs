//! Error types for shape import.

use shapeasm_expr::ExprError;
use shapeasm_source::SourceError;
use shapeasm_tessellate::TriangulationError;
use thiserror::Error;

use crate::instruction::PointMode;

/// Errors raised while importing shape source.
///
/// Instruction-level variants are caught at the per-chunk boundary and turned
/// into error-log entries; only `Io`, `Source` and `Config` reach callers of
/// the file-level entry points.
#[derive(Error, Debug)]
pub enum ImportError {
    /// I/O error reading a file.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Source classification failed.
    #[error(transparent)]
    Source(#[from] SourceError),

    /// Configuration file could not be parsed.
    #[error("config error: {0}")]
    Config(#[from] toml::de::Error),

    /// A point was pushed outside a points region.
    #[error("{instruction}: not in a points region")]
    NotInPointsMode {
        /// Instruction name as written.
        instruction: String,
    },

    /// A point instruction's width disagrees with the active points region.
    #[error("{instruction}: point width does not match points mode {mode:?}")]
    PointWidthMismatch {
        /// Instruction name as written.
        instruction: String,
        /// Active points mode.
        mode: PointMode,
    },

    /// A parameter expression could not be evaluated.
    #[error("cannot evaluate \"{text}\": {source}")]
    Expression {
        /// Parameter text.
        text: String,
        /// Evaluation failure.
        #[source]
        source: ExprError,
    },

    /// A required parameter is absent.
    #[error("{instruction}: missing parameter {index}")]
    MissingParameter {
        /// Instruction name as written.
        instruction: String,
        /// Zero-based parameter slot.
        index: usize,
    },

    /// A face line is malformed.
    #[error("invalid face: {0}")]
    InvalidFace(String),

    /// A coordinate or normal component cannot be negated or scaled
    /// without overflowing.
    #[error("{instruction}: value {value} out of range")]
    OutOfRange {
        /// Instruction name as written.
        instruction: String,
        /// Offending value, before the failing operation.
        value: i64,
    },

    /// A face references a point the shape does not define.
    #[error("face references undefined point {index}")]
    MissingPoint {
        /// Point index.
        index: usize,
    },

    /// A face could not be triangulated in either winding.
    #[error("triangulation failed: {0}")]
    Triangulation(#[from] TriangulationError),
}

impl ImportError {
    /// Create an expression error.
    pub fn expression(text: impl Into<String>, source: ExprError) -> Self {
        Self::Expression {
            text: text.into(),
            source,
        }
    }

    /// Create an out-of-range error.
    pub fn out_of_range(instruction: impl Into<String>, value: i64) -> Self {
        Self::OutOfRange {
            instruction: instruction.into(),
            value,
        }
    }

    /// Create a missing-parameter error.
    pub fn missing_parameter(instruction: impl Into<String>, index: usize) -> Self {
        Self::MissingParameter {
            instruction: instruction.into(),
            index,
        }
    }
}

/// Result type for import operations.
pub type Result<T> = std::result::Result<T, ImportError>;
