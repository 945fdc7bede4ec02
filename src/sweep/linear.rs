//! Sweeping left to right under a light from directly above.
//!
//! Probes are vertical lines, and "nearer" means higher up (smaller `y`).
//! The window runs [`BOUND_OFF`] past the scene on either side, and a floor
//! segment [`BOUND_OFF`] below the scene catches everything that no occluder
//! blocks.

use kurbo::{Line, Point, Rect};

use super::{sweep_line, DrawPoints, Snapshot, SweepGeometry, SweepStats};
use crate::{
    cast_set::CastSet,
    geom,
    num::Tolerance,
    order::{LinearQuantizer, RadixSort, LINEAR_KEY_BITS, LINEAR_RADIX_BITS},
    shade_point::{PointIdx, ShadePoints},
};

/// How far the window extends past the scene, horizontally and below.
pub const BOUND_OFF: f64 = 400.0;
/// Height above the scene that probes start from.
pub const LINE_CHECK_OFF: f64 = 2000.0;
/// The height of overhead blockers.
pub const ABOVE_BLOCKER_Y: f64 = -30.0;

#[derive(Clone, Copy, Debug)]
struct Linear {
    quantizer: LinearQuantizer,
    min_x: f64,
    max_x: f64,
}

impl SweepGeometry for Linear {
    const WRAPS: bool = false;

    fn start(&self) -> Point {
        Point::new(self.min_x, -LINE_CHECK_OFF)
    }

    fn end(&self) -> Point {
        Point::new(self.max_x, -LINE_CHECK_OFF)
    }

    fn hit(&self, line: Line, through: Point) -> Option<Point> {
        geom::vertical_hit(line, through.x)
    }

    fn depth(&self, p: Point) -> f64 {
        p.y
    }

    fn is_opening(&self, points: &ShadePoints, p: PointIdx) -> bool {
        points[points.pair(p)].key > points[p].key
    }

    fn facing(&self, points: &ShadePoints, p: PointIdx) -> f64 {
        let a = points[p].pos;
        let b = points[points.pair(p)].pos;
        // Rising (negative slope) segments stay nearer.
        (a.y - b.y) / (b.x - a.x)
    }

    #[cfg(any(test, feature = "slow-asserts"))]
    fn between(&self, a: Point, b: Point) -> Point {
        Point::new((a.x + b.x) / 2.0, -LINE_CHECK_OFF)
    }
}

/// The shadow sweep for overhead light.
#[derive(Clone, Debug)]
pub struct LinearSweep {
    geom: Linear,
    floor: f64,
    tol: Tolerance,
    sorter: RadixSort,
    snapshot: Snapshot,
    cast: CastSet,
    draw: DrawPoints,
}

impl LinearSweep {
    /// A sweep over a `width` by `height` scene.
    pub fn new(width: f64, height: f64) -> Self {
        let min_x = -BOUND_OFF;
        let max_x = width + BOUND_OFF;
        let floor = height + BOUND_OFF;
        LinearSweep {
            geom: Linear {
                quantizer: LinearQuantizer::new(min_x, max_x, LINEAR_KEY_BITS),
                min_x,
                max_x,
            },
            floor,
            tol: Tolerance::for_extent(max_x.max(floor).max(LINE_CHECK_OFF)),
            sorter: RadixSort::new(LINEAR_KEY_BITS, LINEAR_RADIX_BITS),
            snapshot: Snapshot::default(),
            cast: CastSet::default(),
            draw: DrawPoints::default(),
        }
    }

    /// The horizontal extent of the sweep.
    pub fn window(&self) -> (f64, f64) {
        (self.geom.min_x, self.geom.max_x)
    }

    /// The height of the floor segment.
    pub fn floor(&self) -> f64 {
        self.floor
    }

    /// The width of one key bucket. Events closer together than this are
    /// treated as simultaneous.
    pub fn resolution(&self) -> f64 {
        let q = self.geom.quantizer;
        q.coord(1) - q.coord(0)
    }

    /// Replaces the snapshot with the given occluders and overhead spans.
    pub fn snapshot(
        &mut self,
        occluders: impl IntoIterator<Item = Line>,
        above: impl IntoIterator<Item = (f64, f64)>,
    ) {
        self.snapshot.clear();
        let (min_x, max_x) = self.window();
        self.push(Line::new((min_x, self.floor), (max_x, self.floor)));
        for line in occluders {
            self.push(line);
        }
        for (x0, x1) in above {
            self.push(Line::new((x0, ABOVE_BLOCKER_Y), (x1, ABOVE_BLOCKER_Y)));
        }
        self.snapshot.sort(&mut self.sorter);
    }

    fn push(&mut self, line: Line) {
        let (min_x, max_x) = self.window();
        let strip = Rect::new(min_x, f64::NEG_INFINITY, max_x, f64::INFINITY);
        let Some(mut line) = geom::clip_line(line, strip) else {
            return;
        };
        for p in [&mut line.p0, &mut line.p1] {
            if self.tol.close(p.x, min_x) {
                p.x = min_x;
            } else if self.tol.close(p.x, max_x) {
                p.x = max_x;
            }
        }

        let (a, b) = if line.p0.x <= line.p1.x {
            (line.p0, line.p1)
        } else {
            (line.p1, line.p0)
        };
        let q = self.geom.quantizer;
        let (a_key, b_key) = (q.key(a.x), q.key(b.x));
        // Vertical segments cast no shadow of their own.
        if a_key == b_key {
            return;
        }
        let start = self.snapshot.push_segment(a, a_key, b, b_key);
        if a.x == min_x {
            self.snapshot.seed(start);
        }
    }

    /// Sweeps the current snapshot, replacing the draw points.
    pub fn run(&mut self) -> SweepStats {
        let stats = sweep_line::run(
            &self.geom,
            &self.snapshot,
            self.tol,
            &mut self.cast,
            &mut self.draw,
        );
        log::trace!(
            "linear sweep over {} points: {} segments, {} probes",
            stats.points,
            stats.segments,
            stats.probes
        );
        stats
    }

    /// The output of the last sweep: the lower edge of each lit column.
    pub fn draw_points(&self) -> &DrawPoints {
        &self.draw
    }

    /// The current snapshot.
    pub fn shade_points(&self) -> &Snapshot {
        &self.snapshot
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sweep::arbtests;

    fn assert_lines_close(actual: &[Line], expected: &[((f64, f64), (f64, f64))]) {
        assert_eq!(actual.len(), expected.len(), "{actual:?}");
        for (a, &(p0, p1)) in actual.iter().zip(expected) {
            let close = |p: Point, q: (f64, f64)| (p - Point::from(q)).hypot() < 1e-9;
            assert!(close(a.p0, p0) && close(a.p1, p1), "{a:?} != {p0:?} -> {p1:?}");
        }
    }

    #[test]
    fn no_occluders() {
        let mut sweep = LinearSweep::new(800.0, 600.0);
        sweep.snapshot([], []);
        sweep.run();
        assert_lines_close(
            sweep.draw_points().lines(),
            &[((-400.0, 1000.0), (1200.0, 1000.0))],
        );
        arbtests::check_profile(&sweep);
    }

    #[test]
    fn flat_occluder() {
        let mut sweep = LinearSweep::new(800.0, 600.0);
        sweep.snapshot([Line::new((200.0, 50.0), (100.0, 50.0))], []);
        sweep.run();
        assert_lines_close(
            sweep.draw_points().lines(),
            &[
                ((-400.0, 1000.0), (100.0, 1000.0)),
                ((100.0, 50.0), (200.0, 50.0)),
                ((200.0, 1000.0), (1200.0, 1000.0)),
            ],
        );
        arbtests::check_profile(&sweep);
    }

    #[test]
    fn overhead_blocker() {
        let mut sweep = LinearSweep::new(800.0, 600.0);
        sweep.snapshot([Line::new((0.0, 100.0), (30.0, 120.0))], [(-50.0, 50.0)]);
        sweep.run();
        assert_lines_close(
            sweep.draw_points().lines(),
            &[
                ((-400.0, 1000.0), (-50.0, 1000.0)),
                ((-50.0, -30.0), (50.0, -30.0)),
                ((50.0, 1000.0), (1200.0, 1000.0)),
            ],
        );
    }

    #[test]
    fn clipped_at_left_edge() {
        let mut sweep = LinearSweep::new(800.0, 600.0);
        sweep.snapshot([Line::new((-600.0, 100.0), (0.0, 100.0))], []);
        assert_eq!(sweep.shade_points().seeds().len(), 2);
        sweep.run();
        assert_lines_close(
            sweep.draw_points().lines(),
            &[
                ((-400.0, 100.0), (0.0, 100.0)),
                ((0.0, 1000.0), (1200.0, 1000.0)),
            ],
        );
    }

    #[test]
    fn clipped_at_right_edge() {
        let mut sweep = LinearSweep::new(800.0, 600.0);
        sweep.snapshot([Line::new((1000.0, 200.0), (1500.0, 200.0))], []);
        sweep.run();
        assert_lines_close(
            sweep.draw_points().lines(),
            &[
                ((-400.0, 1000.0), (1000.0, 1000.0)),
                ((1000.0, 200.0), (1200.0, 200.0)),
            ],
        );
        arbtests::check_profile(&sweep);
    }

    #[test]
    fn shared_start_prefers_rising() {
        let mut sweep = LinearSweep::new(800.0, 600.0);
        sweep.snapshot(
            [
                Line::new((100.0, 100.0), (200.0, 150.0)),
                Line::new((100.0, 100.0), (200.0, 50.0)),
            ],
            [],
        );
        sweep.run();
        assert_lines_close(
            sweep.draw_points().lines(),
            &[
                ((-400.0, 1000.0), (100.0, 1000.0)),
                ((100.0, 100.0), (200.0, 50.0)),
                ((200.0, 1000.0), (1200.0, 1000.0)),
            ],
        );
    }

    #[test]
    fn nearer_segment_cuts_in() {
        let mut sweep = LinearSweep::new(800.0, 600.0);
        sweep.snapshot(
            [
                Line::new((0.0, 300.0), (400.0, 300.0)),
                Line::new((100.0, 100.0), (200.0, 100.0)),
            ],
            [],
        );
        sweep.run();
        assert_lines_close(
            sweep.draw_points().lines(),
            &[
                ((-400.0, 1000.0), (0.0, 1000.0)),
                ((0.0, 300.0), (100.0, 300.0)),
                ((100.0, 100.0), (200.0, 100.0)),
                ((200.0, 300.0), (400.0, 300.0)),
                ((400.0, 1000.0), (1200.0, 1000.0)),
            ],
        );
        arbtests::check_profile(&sweep);
    }

    #[test]
    fn random_scenes() {
        arbtest::arbtest(arbtests::linear_profile);
    }
}
