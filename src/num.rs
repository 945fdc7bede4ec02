//! Float comparison helpers for the sweeps.

use std::hash::Hash;

/// A wrapper for `f64` that implements `Ord`.
///
/// Unlike the more principled wrappers in the `ordered_float` crate, this
/// one doesn't order NaNs, nor does it guard against them on construction.
/// Every float that reaches a sweep has already been checked for finiteness,
/// so all we need is something `min_by_key` will accept.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(transparent)]
pub struct CheapOrderedFloat(f64);

impl Hash for CheapOrderedFloat {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.0.to_bits().hash(state)
    }
}

impl CheapOrderedFloat {
    /// Retrieve the inner `f64`.
    pub fn into_inner(self) -> f64 {
        self.0
    }
}

// Now comes the fishy stuff.
impl Eq for CheapOrderedFloat {}

impl PartialOrd for CheapOrderedFloat {
    #[inline(always)]
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for CheapOrderedFloat {
    #[inline(always)]
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        if self.0 < other.0 {
            std::cmp::Ordering::Less
        } else if self.0 > other.0 {
            std::cmp::Ordering::Greater
        } else {
            std::cmp::Ordering::Equal
        }
    }
}

impl From<f64> for CheapOrderedFloat {
    fn from(value: f64) -> Self {
        CheapOrderedFloat(value)
    }
}

/// How far apart two sweep distances can be and still count as a tie.
///
/// Intersections computed in `f64` drift by a few ulps of the largest
/// coordinate involved, so the threshold scales with the extent of the
/// sweep window.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Tolerance {
    eps: f64,
}

impl Tolerance {
    /// Angular slack for comparing directions, which are always in radians.
    pub const ANGLE: f64 = 1e-12;

    /// A tolerance suitable for coordinates no larger than `extent` in magnitude.
    pub fn for_extent(extent: f64) -> Self {
        let eps = extent.abs() * (f64::EPSILON * 64.0);
        Tolerance {
            eps: eps.max(1e-9),
        }
    }

    /// The raw threshold.
    pub fn eps(self) -> f64 {
        self.eps
    }

    /// Is `a` smaller than `b` by more than the tolerance?
    pub fn less(self, a: f64, b: f64) -> bool {
        a < b - self.eps
    }

    /// Are `a` and `b` within the tolerance of one another?
    pub fn close(self, a: f64, b: f64) -> bool {
        (a - b).abs() <= self.eps
    }
}
