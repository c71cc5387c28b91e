//! Setup errors.
//!
//! Only construction can fail. Once a solver exists, every tick completes and
//! degenerate geometry degrades to "no correction" instead of erroring.

use thiserror::Error;

use crate::types::Side;

/// Which segment of a two-bone leg a setup error refers to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Segment {
    /// Hip to knee.
    Upper,
    /// Knee to ankle.
    Lower,
}

/// Errors that prevent a solver from being built.
#[derive(Debug, Error, PartialEq)]
pub enum SetupError {
    /// A leg's rest pose was never provided.
    #[error("no rest pose provided for the {0:?} leg")]
    MissingLeg(Side),

    /// A leg segment has (near) zero length, so no knee can be placed.
    #[error("{side:?} leg {segment:?} segment is degenerate ({length} m)")]
    DegenerateLimb {
        side: Side,
        segment: Segment,
        length: f32,
    },

    /// A rest position contained NaN or infinity.
    #[error("non-finite rest value: {0}")]
    NonFinite(&'static str),
}
