//! Shade points: the per-frame endpoint snapshot that a sweep runs over.

use kurbo::{Line, Point};

/// An index into [`ShadePoints`].
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PointIdx(pub usize);

/// One endpoint of an occluder segment, in light-local coordinates.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ShadePoint {
    /// Position relative to the light.
    pub pos: Point,
    /// The quantized sweep coordinate of `pos`.
    pub key: u32,
    /// The other endpoint of the same segment.
    pub pair: PointIdx,
}

/// An arena of shade points, always holding complete pairs.
#[derive(Clone)]
pub struct ShadePoints {
    inner: Vec<ShadePoint>,
}

impl_typed_vec!(ShadePoints, ShadePoint, PointIdx, "p");

impl ShadePoints {
    /// Adds both endpoints of a segment, returning their indices.
    pub(crate) fn push_pair(&mut self, a: Point, a_key: u32, b: Point, b_key: u32) -> (PointIdx, PointIdx) {
        let ia = PointIdx(self.len());
        let ib = PointIdx(ia.0 + 1);
        self.push(ShadePoint {
            pos: a,
            key: a_key,
            pair: ib,
        });
        self.push(ShadePoint {
            pos: b,
            key: b_key,
            pair: ia,
        });
        (ia, ib)
    }

    /// The other endpoint of `idx`'s segment.
    pub fn pair(&self, idx: PointIdx) -> PointIdx {
        self[idx].pair
    }

    /// The segment from `idx` to its pair.
    pub fn segment(&self, idx: PointIdx) -> Line {
        Line::new(self[idx].pos, self[self[idx].pair].pos)
    }

    /// A dense per-segment slot number, shared by both endpoints and smaller than `len()`.
    pub fn slot(&self, idx: PointIdx) -> usize {
        idx.0.min(self[idx].pair.0)
    }

    /// Do `a` and `b` belong to the same segment?
    pub fn same_segment(&self, a: PointIdx, b: PointIdx) -> bool {
        self.slot(a) == self.slot(b)
    }

    /// The number of segments.
    pub fn segment_count(&self) -> usize {
        self.len() / 2
    }

    #[cfg(any(test, feature = "slow-asserts"))]
    pub(crate) fn check_invariants(&self) {
        assert!(self.len() % 2 == 0);
        for (idx, p) in self.iter() {
            assert_ne!(p.pair, idx, "{idx:?} is paired with itself");
            assert_eq!(self[p.pair].pair, idx, "{idx:?} has an asymmetric pair");
        }
    }

    #[cfg(not(any(test, feature = "slow-asserts")))]
    pub(crate) fn check_invariants(&self) {}
}
