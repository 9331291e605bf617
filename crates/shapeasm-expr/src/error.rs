//! Error types for expression evaluation.

use thiserror::Error;

/// Errors that can occur while evaluating a parameter expression.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ExprError {
    /// An arithmetic expression did not split into exactly two operands.
    #[error("expected 2 operands around '{op}' in \"{text}\", found {found}")]
    OperandCount {
        /// Operator the text was split on.
        op: char,
        /// The full expression text.
        text: String,
        /// Number of operands found.
        found: usize,
    },

    /// An operand is not an integer.
    #[error("invalid operand \"{0}\"")]
    InvalidOperand(String),

    /// Division with a zero divisor.
    #[error("division by zero in \"{0}\"")]
    DivisionByZero(String),

    /// A `$` literal that is not valid hexadecimal.
    #[error("invalid hex literal \"{0}\"")]
    InvalidHex(String),

    /// The result does not fit in 64 bits.
    #[error("arithmetic overflow in \"{0}\"")]
    Overflow(String),

    /// A `deg` literal whose magnitude is not a number.
    #[error("invalid angle \"{0}\"")]
    InvalidAngle(String),
}

impl ExprError {
    /// Create an operand-count error.
    pub fn operand_count(op: char, text: impl Into<String>, found: usize) -> Self {
        Self::OperandCount {
            op,
            text: text.into(),
            found,
        }
    }
}
