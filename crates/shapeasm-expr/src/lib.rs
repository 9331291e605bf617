#![warn(missing_docs)]

//! Expression evaluation for shape-macro parameters.
//!
//! Macro parameters in shape source are raw text: plain integers, `$hex`
//! literals, angles written as `<n>deg`, simple two-operand arithmetic, and
//! names of constants defined in include files. This crate turns that text
//! into integers.
//!
//! # Example
//!
//! ```
//! use shapeasm_expr::{ConstantTable, ConstantsContext};
//!
//! let mut table = ConstantTable::new();
//! table.define("RADIUS", "10");
//!
//! let mut ctx = ConstantsContext::new();
//! let scope = ctx.begin(table);
//! assert_eq!(scope.resolver().resolve("-RADIUS").unwrap(), -10);
//! ```

mod constants;
mod error;
mod eval;

pub use constants::{ConstantTable, ConstantsContext, ConstantsScope};
pub use error::ExprError;
pub use eval::{evaluate, resolve_hex, Resolver, DEFAULT_MAX_PASSES};
