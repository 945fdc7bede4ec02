//! The shadow sweeps.
//!
//! Both sweeps run the same alpha-line state machine (see [`sweep_line`])
//! over a per-frame snapshot of occluder endpoints. The *alpha line* is the
//! occluder nearest the light at the current sweep position; every time it
//! changes, the visible stretch of the old one is emitted as a draw segment.
//!
//! They differ only in how a probe is cast. [`RadialSweep`] casts rays from a
//! light at the origin and sweeps the angle through a full turn, while
//! [`LinearSweep`] drops vertical lines from above and sweeps `x` across a
//! window.

use kurbo::{Line, Point};

use crate::{
    order::RadixSort,
    shade_point::{PointIdx, ShadePoints},
};

#[cfg(any(test, feature = "arbitrary"))]
pub mod arbtests;
mod linear;
mod radial;
mod sweep_line;

pub use linear::{LinearSweep, ABOVE_BLOCKER_Y, BOUND_OFF, LINE_CHECK_OFF};
pub use radial::{RadialSweep, BOUND_INSET};

/// The output of a sweep: the visible stretch of each alpha line, in sweep order.
///
/// For a radial sweep, consecutive segments share sweep positions, so the
/// triangles `(light, p0, p1)` tile the lit area. For a linear sweep each
/// segment bounds the lit column above it.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct DrawPoints {
    lines: Vec<Line>,
}

impl DrawPoints {
    /// The segments, in sweep order.
    pub fn lines(&self) -> &[Line] {
        &self.lines
    }

    /// The number of segments.
    pub fn len(&self) -> usize {
        self.lines.len()
    }

    /// Is there nothing to draw?
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// The segments as a flat `x1, y1, x2, y2` sequence.
    pub fn flat(&self) -> impl Iterator<Item = f64> + '_ {
        self.lines
            .iter()
            .flat_map(|l| [l.p0.x, l.p0.y, l.p1.x, l.p1.y])
    }

    /// The lit triangles of a radial sweep, fanning out from `origin`.
    pub fn fan(&self, origin: Point) -> impl Iterator<Item = [Point; 3]> + '_ {
        let off = origin.to_vec2();
        self.lines
            .iter()
            .map(move |l| [origin, l.p0 + off, l.p1 + off])
    }

    pub(crate) fn clear(&mut self) {
        self.lines.clear();
    }

    pub(crate) fn push(&mut self, p0: Point, p1: Point) {
        self.lines.push(Line::new(p0, p1));
    }

    /// Renders the lit fan around `origin` along with the emitted segments.
    #[cfg(feature = "debug-svg")]
    pub fn to_svg(&self, origin: Point) -> svg::Document {
        use svg::node::element::{path::Data, Path};

        let mut min = origin;
        let mut max = origin;
        for l in &self.lines {
            for p in [l.p0, l.p1] {
                let p = p + origin.to_vec2();
                min = Point::new(min.x.min(p.x), min.y.min(p.y));
                max = Point::new(max.x.max(p.x), max.y.max(p.y));
            }
        }
        let pad = 1.0 + (max - min).hypot() / 32.0;
        let stroke_width = (max - min).hypot() / 512.0;
        let mut document = svg::Document::new().set(
            "viewBox",
            (
                min.x - pad,
                min.y - pad,
                max.x - min.x + 2.0 * pad,
                max.y - min.y + 2.0 * pad,
            ),
        );

        for [a, b, c] in self.fan(origin) {
            let data = Data::new()
                .move_to((a.x, a.y))
                .line_to((b.x, b.y))
                .line_to((c.x, c.y))
                .close();
            let path = Path::new()
                .set("fill", "gold")
                .set("opacity", 0.5)
                .set("stroke", "none")
                .set("d", data);
            document = document.add(path);
        }
        for l in &self.lines {
            let (p0, p1) = (l.p0 + origin.to_vec2(), l.p1 + origin.to_vec2());
            let data = Data::new().move_to((p0.x, p0.y)).line_to((p1.x, p1.y));
            let path = Path::new()
                .set("stroke", "black")
                .set("stroke-width", stroke_width)
                .set("stroke-linecap", "round")
                .set("fill", "none")
                .set("d", data);
            document = document.add(path);
        }
        document
    }
}

/// Counters describing the work done by one sweep (or a sum of several).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct SweepStats {
    /// Shade points visited.
    pub points: u64,
    /// Probes cast against the cast set.
    pub probes: u64,
    /// Cast-set members examined by those probes.
    pub cast_visits: u64,
    /// Draw segments emitted.
    pub segments: u64,
}

impl std::ops::AddAssign for SweepStats {
    fn add_assign(&mut self, rhs: Self) {
        self.points += rhs.points;
        self.probes += rhs.probes;
        self.cast_visits += rhs.cast_visits;
        self.segments += rhs.segments;
    }
}

/// The endpoint snapshot a sweep runs over.
///
/// Built once per frame from the shared occluders; after that the sweep
/// never looks at the scene again.
#[derive(Clone, Debug, Default)]
pub struct Snapshot {
    points: ShadePoints,
    order: Vec<PointIdx>,
    seeds: Vec<PointIdx>,
}

impl Snapshot {
    /// Every shade point.
    pub fn points(&self) -> &ShadePoints {
        &self.points
    }

    /// Shade points in sweep order.
    pub fn order(&self) -> &[PointIdx] {
        &self.order
    }

    /// Points whose segments are already under the sweep line when it starts.
    pub fn seeds(&self) -> &[PointIdx] {
        &self.seeds
    }

    pub(crate) fn clear(&mut self) {
        self.points.clear();
        self.order.clear();
        self.seeds.clear();
    }

    pub(crate) fn push_segment(&mut self, a: Point, a_key: u32, b: Point, b_key: u32) -> PointIdx {
        self.points.push_pair(a, a_key, b, b_key).0
    }

    pub(crate) fn seed(&mut self, p: PointIdx) {
        self.seeds.push(p);
    }

    pub(crate) fn sort(&mut self, sorter: &mut RadixSort) {
        self.points.check_invariants();
        sorter.sort(&self.points, &mut self.order);
    }
}

/// How a particular sweep casts its probes.
pub(crate) trait SweepGeometry {
    /// Does the sweep wrap around to where it started?
    const WRAPS: bool;

    /// A point on the first probe.
    fn start(&self) -> Point;

    /// A point on the last probe.
    fn end(&self) -> Point;

    /// Where the probe through `through` meets `line`, if it does.
    fn hit(&self, line: Line, through: Point) -> Option<Point>;

    /// How far `p` is from the light along its probe. Smaller is nearer.
    fn depth(&self, p: Point) -> f64;

    /// Does `p`'s segment continue ahead of the sweep from `p`?
    fn is_opening(&self, points: &ShadePoints, p: PointIdx) -> bool;

    /// Breaks distance ties between segments starting at the same place:
    /// the larger value is the one that stays nearer just after.
    fn facing(&self, points: &ShadePoints, p: PointIdx) -> f64;

    /// A probe position strictly between the sweep positions of `a` and `b`.
    #[cfg(any(test, feature = "slow-asserts"))]
    fn between(&self, a: Point, b: Point) -> Point;
}
