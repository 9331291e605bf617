//! Error types for face triangulation.

use thiserror::Error;

/// Reasons a face could not be triangulated.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TriangulationError {
    /// Fewer than three points were supplied.
    #[error("need at least 3 points, got {0}")]
    TooFewPoints(usize),

    /// No ear was found in a full pass over the remaining ring.
    #[error("no valid ear among {remaining} remaining vertices")]
    NoEar {
        /// Vertices left in the ring when clipping stalled.
        remaining: usize,
    },

    /// Neither the supplied normal nor the polygon itself defines a plane.
    #[error("face normal is degenerate")]
    DegenerateNormal,
}
