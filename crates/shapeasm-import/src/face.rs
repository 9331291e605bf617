//! Face-line recognition.

use shapeasm_expr::Resolver;
use shapeasm_source::MacroInvocation;

use crate::error::{ImportError, Result};

/// A face as written in source, before triangulation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawFace {
    /// Color / material index.
    pub color: i64,
    /// Face id.
    pub id: i64,
    /// Normal, X and Y already inverted.
    pub normal: [i64; 3],
    /// Point indices in ring order.
    pub points: Vec<usize>,
}

/// Decides whether an invocation describes a face.
pub trait FaceRecognizer {
    /// Parse `inv` as a face, or return `None` if it is not one.
    fn recognize(&self, inv: &MacroInvocation, resolver: &Resolver<'_>) -> Result<Option<RawFace>>;
}

/// Recognizes `face<N> <color>,<id>,<nx>,<ny>,<nz>,<p0>,...,<pN-1>` and the
/// unnumbered `face` form.
#[derive(Debug, Clone, Copy, Default)]
pub struct MacroFaceRecognizer;

const FACE_PREFIX: &str = "face";
const FIXED_PARAMS: usize = 5;

impl MacroFaceRecognizer {
    /// Declared point count from the macro name: `Some(None)` for bare
    /// `face`, `None` if the name is not a face macro.
    fn declared_count(name: &str) -> Option<Option<usize>> {
        let lower = name.to_ascii_lowercase();
        let suffix = lower.strip_prefix(FACE_PREFIX)?;
        if suffix.is_empty() {
            return Some(None);
        }
        suffix.parse::<usize>().ok().map(Some)
    }
}

impl FaceRecognizer for MacroFaceRecognizer {
    fn recognize(&self, inv: &MacroInvocation, resolver: &Resolver<'_>) -> Result<Option<RawFace>> {
        let Some(declared) = Self::declared_count(inv.name()) else {
            return Ok(None);
        };

        let eval = |idx: usize| -> Result<i64> {
            let text = inv
                .param(idx)
                .ok_or_else(|| ImportError::missing_parameter(inv.name(), idx))?
                .raw();
            resolver
                .resolve(text)
                .map_err(|e| ImportError::expression(text, e))
        };

        let color = eval(0)?;
        let id = eval(1)?;
        let negate = |idx: usize| -> Result<i64> {
            let v = eval(idx)?;
            v.checked_neg()
                .ok_or_else(|| ImportError::out_of_range(inv.name(), v))
        };
        let normal = [negate(2)?, negate(3)?, eval(4)?];

        let count = inv.param_count().saturating_sub(FIXED_PARAMS);
        if count < 2 {
            return Err(ImportError::InvalidFace(format!(
                "{}: needs at least 2 points, found {count}",
                inv.name()
            )));
        }
        if let Some(n) = declared.filter(|&n| n != count) {
            return Err(ImportError::InvalidFace(format!(
                "{}: declares {n} points but lists {count}",
                inv.name()
            )));
        }

        let points = (FIXED_PARAMS..FIXED_PARAMS + count)
            .map(|idx| {
                let v = eval(idx)?;
                usize::try_from(v).map_err(|_| {
                    ImportError::InvalidFace(format!("{}: negative point index {v}", inv.name()))
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Some(RawFace {
            color,
            id,
            normal,
            points,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shapeasm_source::parse_line;

    fn recognize(line: &str) -> Result<Option<RawFace>> {
        let inv = parse_line(line).invocation.unwrap();
        MacroFaceRecognizer.recognize(&inv, &Resolver::plain())
    }

    #[test]
    fn test_triangle_face() {
        let face = recognize("\tface3 7,1,0,0,$40,0,1,2").unwrap().unwrap();
        assert_eq!(face.color, 7);
        assert_eq!(face.id, 1);
        assert_eq!(face.normal, [0, 0, 64]);
        assert_eq!(face.points, vec![0, 1, 2]);
    }

    #[test]
    fn test_normal_xy_inverted() {
        let face = recognize("\tface 1,0,5,-6,7,3,4").unwrap().unwrap();
        assert_eq!(face.normal, [-5, 6, 7]);
        assert_eq!(face.points, vec![3, 4]);
    }

    #[test]
    fn test_normal_out_of_range() {
        let err = recognize("\tface 1,0,-9223372036854775808,0,1,0,1").unwrap_err();
        assert!(
            matches!(err, ImportError::OutOfRange { value: i64::MIN, .. }),
            "{err}"
        );
        let err = recognize("\tface 1,0,0,-9223372036854775808,1,0,1").unwrap_err();
        assert!(matches!(err, ImportError::OutOfRange { .. }), "{err}");
    }

    #[test]
    fn test_count_must_match_name() {
        let err = recognize("\tface4 1,0,0,0,1,0,1,2").unwrap_err();
        assert!(matches!(err, ImportError::InvalidFace(_)), "{err}");
    }

    #[test]
    fn test_rejects_single_point_and_negative_index() {
        assert!(recognize("\tface 1,0,0,0,1,4").is_err());
        assert!(recognize("\tface 1,0,0,0,1,0,-1").is_err());
    }

    #[test]
    fn test_other_macros_ignored() {
        assert!(recognize("\tpb 1,2,3").unwrap().is_none());
        assert!(recognize("\tfend").unwrap().is_none());
        assert!(recognize("\tfaces 1,2").unwrap().is_none());
    }
}
