//! Parameter expression evaluation.
//!
//! Evaluation happens in two stages. A [`Resolver`] first substitutes
//! constant names token by token until nothing changes, then hands the text
//! to [`evaluate`], which understands the handful of literal forms that
//! appear in shape source.

use std::f64::consts::PI;

use tracing::warn;

use crate::constants::ConstantTable;
use crate::error::ExprError;

/// Default upper bound on constant-substitution passes.
pub const DEFAULT_MAX_PASSES: usize = 64;

/// Divisor applied to `deg` angles (`degrees * PI / ANGLE_DIVISOR`).
const ANGLE_DIVISOR: f64 = 1800.0;

/// Resolves parameter text against a stack of active constant tables.
///
/// Later tables shadow earlier ones. An empty stack means no substitution.
#[derive(Debug, Clone, Copy)]
pub struct Resolver<'a> {
    tables: &'a [ConstantTable],
    max_passes: usize,
}

impl<'a> Resolver<'a> {
    /// Create a resolver over `tables` (last table wins on name collision).
    pub fn new(tables: &'a [ConstantTable]) -> Self {
        Self {
            tables,
            max_passes: DEFAULT_MAX_PASSES,
        }
    }

    /// Resolver that performs no constant substitution.
    pub fn plain() -> Resolver<'static> {
        Resolver {
            tables: &[],
            max_passes: DEFAULT_MAX_PASSES,
        }
    }

    /// Override the substitution pass limit.
    pub fn with_max_passes(mut self, max_passes: usize) -> Self {
        self.max_passes = max_passes.max(1);
        self
    }

    /// Whether any constant table is active.
    pub fn is_active(&self) -> bool {
        !self.tables.is_empty()
    }

    /// Look up a constant in the active tables.
    pub fn lookup(&self, name: &str) -> Option<&'a str> {
        self.tables.iter().rev().find_map(|t| t.get(name))
    }

    /// Resolve `text` to an integer.
    pub fn resolve(&self, text: &str) -> Result<i64, ExprError> {
        if text.trim().is_empty() {
            return Ok(0);
        }
        if !self.is_active() {
            return evaluate(text);
        }
        evaluate(&self.substitute(text))
    }

    /// Substitute constant names in `text` until a pass changes nothing.
    ///
    /// Tokens are split on spaces. Integer tokens are kept, `-NAME` becomes
    /// `-VALUE`, and anything unresolvable is left untouched.
    pub fn substitute(&self, text: &str) -> String {
        let mut current = text.trim().to_string();
        for _ in 0..self.max_passes {
            let mut changed = false;
            let tokens: Vec<String> = current
                .split(' ')
                .filter(|t| !t.is_empty())
                .map(|token| {
                    if token.parse::<i64>().is_ok() {
                        return token.to_string();
                    }
                    let (negate, name) = match token.strip_prefix('-') {
                        Some(rest) => (true, rest),
                        None => (false, token),
                    };
                    match self.lookup(name) {
                        Some(value) => {
                            changed = true;
                            let value = value.trim();
                            if negate {
                                format!("-{value}")
                            } else {
                                value.to_string()
                            }
                        }
                        None => token.to_string(),
                    }
                })
                .collect();
            current = tokens.join(" ");
            if !changed {
                return current;
            }
        }
        warn!(
            text,
            passes = self.max_passes,
            "constant substitution did not converge; using last expansion"
        );
        current
    }
}

impl Default for Resolver<'static> {
    fn default() -> Self {
        Resolver::plain()
    }
}

/// Evaluate literal expression text with no constant substitution.
///
/// Forms are tried in order: `<n>deg`, plain integer, `a/b`, `a*b`,
/// infix `+`/`-`, `$hex`. Text matching none of them evaluates to 0.
///
/// The `+`/`-` form is evaluated by splitting on `/`, exactly as existing
/// shape data expects, so it only succeeds when the text also divides.
pub fn evaluate(text: &str) -> Result<i64, ExprError> {
    let text = text.trim();
    if text.is_empty() {
        return Ok(0);
    }

    if text.contains("deg") {
        let magnitude = text.replace("deg", "");
        let degrees: f64 = magnitude
            .trim()
            .parse()
            .map_err(|_| ExprError::InvalidAngle(text.to_string()))?;
        return Ok(((degrees * PI) / ANGLE_DIVISOR) as i64);
    }

    if let Ok(value) = text.parse::<i64>() {
        return Ok(value);
    }

    if text.contains('/') {
        return divide(text);
    }

    if text.contains('*') {
        let (a, b) = operands(text, '*')?;
        return a
            .checked_mul(b)
            .ok_or_else(|| ExprError::Overflow(text.to_string()));
    }

    if has_infix_sign(text) {
        return divide(text);
    }

    if text.contains('$') {
        return parse_hex(&text.replacen('$', "", 1), text);
    }

    Ok(0)
}

/// Resolve a value known to be hexadecimal (`$1F` or `1F`).
pub fn resolve_hex(text: &str) -> Result<i64, ExprError> {
    let trimmed = text.trim();
    parse_hex(trimmed.strip_prefix('$').unwrap_or(trimmed), text)
}

fn parse_hex(digits: &str, original: &str) -> Result<i64, ExprError> {
    i64::from_str_radix(digits.trim(), 16)
        .map_err(|_| ExprError::InvalidHex(original.trim().to_string()))
}

fn divide(text: &str) -> Result<i64, ExprError> {
    let (a, b) = operands(text, '/')?;
    if b == 0 {
        return Err(ExprError::DivisionByZero(text.to_string()));
    }
    // Integer division truncates toward zero, like the real quotient would.
    a.checked_div(b)
        .ok_or_else(|| ExprError::Overflow(text.to_string()))
}

fn operands(text: &str, op: char) -> Result<(i64, i64), ExprError> {
    let parts: Vec<&str> = text.split(op).collect();
    if parts.len() != 2 {
        return Err(ExprError::operand_count(op, text, parts.len()));
    }
    let parse = |s: &str| {
        s.trim()
            .parse::<i64>()
            .map_err(|_| ExprError::InvalidOperand(s.trim().to_string()))
    };
    Ok((parse(parts[0])?, parse(parts[1])?))
}

/// `+` or `-` anywhere past the first character.
fn has_infix_sign(text: &str) -> bool {
    text.char_indices()
        .skip(1)
        .any(|(_, c)| c == '+' || c == '-')
}
