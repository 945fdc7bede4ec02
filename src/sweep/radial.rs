//! Sweeping a full turn around a point light.

use std::f64::consts::{PI, TAU};

use kurbo::{Line, Point, Rect, Vec2};

use super::{sweep_line, DrawPoints, Snapshot, SweepGeometry, SweepStats};
use crate::{
    cast_set::CastSet,
    geom,
    num::Tolerance,
    order::{AngleQuantizer, RadixSort, ANGLE_KEY_BITS, ANGLE_RADIX_BITS},
    shade_point::{PointIdx, ShadePoints},
};

/// Occluders are clipped to the light's square this far inside its edge, so
/// they never coincide with the bounding square.
pub const BOUND_INSET: f64 = 1.0;

#[derive(Clone, Copy, Debug)]
struct Radial {
    quantizer: AngleQuantizer,
    radius: f64,
}

impl Radial {
    fn crosses_zero(&self, a_key: u32, b_key: u32) -> bool {
        (self.quantizer.angle(a_key) - self.quantizer.angle(b_key)).abs() > PI
    }
}

impl SweepGeometry for Radial {
    const WRAPS: bool = true;

    fn start(&self) -> Point {
        Point::new(self.radius, 0.0)
    }

    fn end(&self) -> Point {
        self.start()
    }

    fn hit(&self, line: Line, through: Point) -> Option<Point> {
        geom::ray_hit(through.to_vec2(), line)
    }

    fn depth(&self, p: Point) -> f64 {
        p.to_vec2().hypot()
    }

    fn is_opening(&self, points: &ShadePoints, p: PointIdx) -> bool {
        let key = points[p].key;
        let pair_key = points[points.pair(p)].key;
        (pair_key > key) != self.crosses_zero(key, pair_key)
    }

    fn facing(&self, points: &ShadePoints, p: PointIdx) -> f64 {
        let pos = points[p].pos;
        let along = points[points.pair(p)].pos - pos;
        (geom::angle_of(along) - geom::angle_of(pos.to_vec2())).rem_euclid(TAU)
    }

    #[cfg(any(test, feature = "slow-asserts"))]
    fn between(&self, a: Point, b: Point) -> Point {
        let ta = geom::angle_of(a.to_vec2());
        let tb = geom::angle_of(b.to_vec2());
        let mid = ta + geom::signed_turn(ta, tb) / 2.0;
        (Vec2::from_angle(mid) * self.radius).to_point()
    }
}

/// The shadow sweep for a point light.
///
/// The light sits at the origin of its own coordinate system and lights the
/// square `[-radius, radius]²`. The edges of that square are added as
/// occluders, so every ray hits something and the output always closes up.
#[derive(Clone, Debug)]
pub struct RadialSweep {
    geom: Radial,
    tol: Tolerance,
    sorter: RadixSort,
    snapshot: Snapshot,
    cast: CastSet,
    draw: DrawPoints,
}

impl RadialSweep {
    /// A sweep for a light reaching `radius` in each axis direction.
    pub fn new(radius: f64) -> Self {
        debug_assert!(radius > BOUND_INSET && radius.is_finite());
        RadialSweep {
            geom: Radial {
                quantizer: AngleQuantizer::new(ANGLE_KEY_BITS),
                radius,
            },
            tol: Tolerance::for_extent(2.0 * radius),
            sorter: RadixSort::new(ANGLE_KEY_BITS, ANGLE_RADIX_BITS),
            snapshot: Snapshot::default(),
            cast: CastSet::default(),
            draw: DrawPoints::default(),
        }
    }

    /// Half the side length of the lit square.
    pub fn radius(&self) -> f64 {
        self.geom.radius
    }

    /// Replaces the snapshot with the occluders as seen from a light at `origin`.
    pub fn snapshot(&mut self, origin: Point, occluders: impl IntoIterator<Item = Line>) {
        self.snapshot.clear();

        let r = self.geom.radius;
        let corners = [
            Point::new(r, r),
            Point::new(-r, r),
            Point::new(-r, -r),
            Point::new(r, -r),
        ];
        for (k, &corner) in corners.iter().enumerate() {
            self.push(corner, corners[(k + 1) % 4]);
        }

        let inner = Rect::new(
            -r + BOUND_INSET,
            -r + BOUND_INSET,
            r - BOUND_INSET,
            r - BOUND_INSET,
        );
        let off = origin.to_vec2();
        for line in occluders {
            let local = Line::new(line.p0 - off, line.p1 - off);
            if let Some(clipped) = geom::clip_line(local, inner) {
                self.push(clipped.p0, clipped.p1);
            }
        }

        self.snapshot.sort(&mut self.sorter);
    }

    fn push(&mut self, a: Point, b: Point) {
        let (va, vb) = (a.to_vec2(), b.to_vec2());
        // Lines through the light cast no shadow.
        if va.cross(vb).abs() <= self.tol.eps() * (va.hypot() + vb.hypot()) {
            return;
        }
        let q = self.geom.quantizer;
        let a_key = q.key(geom::angle_of(va));
        let b_key = q.key(geom::angle_of(vb));
        if a_key == b_key {
            return;
        }

        // A segment across the zero ray is under the sweep line from the
        // start. Its first point is the one the sweep reaches last.
        let crosses = self.geom.crosses_zero(a_key, b_key);
        let start = if crosses && a_key < b_key {
            self.snapshot.push_segment(b, b_key, a, a_key)
        } else {
            self.snapshot.push_segment(a, a_key, b, b_key)
        };
        if crosses {
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
            "radial sweep over {} points: {} segments, {} probes",
            stats.points,
            stats.segments,
            stats.probes
        );
        stats
    }

    /// The output of the last sweep, in light-local coordinates.
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
    fn single_occluder() {
        let mut sweep = RadialSweep::new(100.0);
        sweep.snapshot(Point::ZERO, [Line::new((10.0, 0.0), (10.0, 50.0))]);
        let stats = sweep.run();

        assert_lines_close(
            sweep.draw_points().lines(),
            &[
                ((10.0, 0.0), (10.0, 50.0)),
                ((20.0, 100.0), (-100.0, 100.0)),
                ((-100.0, 100.0), (-100.0, -100.0)),
                ((-100.0, -100.0), (100.0, -100.0)),
                ((100.0, -100.0), (100.0, 0.0)),
                ((100.0, 0.0), (10.0, 0.0)),
            ],
        );
        assert_eq!(stats.points, 10);
        assert_eq!(stats.segments, 6);
        arbtests::check_fan(&sweep);
    }

    #[test]
    fn no_occluders() {
        let mut sweep = RadialSweep::new(100.0);
        sweep.snapshot(Point::new(5.0, 5.0), []);
        sweep.run();

        assert_lines_close(
            sweep.draw_points().lines(),
            &[
                ((100.0, 0.0), (100.0, 100.0)),
                ((100.0, 100.0), (-100.0, 100.0)),
                ((-100.0, 100.0), (-100.0, -100.0)),
                ((-100.0, -100.0), (100.0, -100.0)),
                ((100.0, -100.0), (100.0, 0.0)),
            ],
        );
        arbtests::check_fan(&sweep);
    }

    #[test]
    fn enclosed_light_sees_walls() {
        let mut sweep = RadialSweep::new(100.0);
        let walls = [
            Line::new((20.0, 20.0), (-20.0, 20.0)),
            Line::new((-20.0, 20.0), (-20.0, -20.0)),
            Line::new((-20.0, -20.0), (20.0, -20.0)),
            Line::new((20.0, -20.0), (20.0, 20.0)),
        ];
        sweep.snapshot(Point::ZERO, walls);
        sweep.run();

        assert_lines_close(
            sweep.draw_points().lines(),
            &[
                ((20.0, 0.0), (20.0, 20.0)),
                ((20.0, 20.0), (-20.0, 20.0)),
                ((-20.0, 20.0), (-20.0, -20.0)),
                ((-20.0, -20.0), (20.0, -20.0)),
                ((20.0, -20.0), (20.0, 0.0)),
            ],
        );
    }

    #[test]
    fn occluder_in_global_coordinates() {
        // The same shadow as `single_occluder`, with the light moved.
        let mut sweep = RadialSweep::new(100.0);
        sweep.snapshot(Point::new(300.0, 200.0), [Line::new((310.0, 200.0), (310.0, 250.0))]);
        sweep.run();
        assert_eq!(sweep.draw_points().len(), 6);
        let first = sweep.draw_points().lines()[0];
        assert!((first.p0 - Point::new(10.0, 0.0)).hypot() < 1e-9);
    }

    #[test]
    fn degenerate_occluders_are_dropped() {
        let mut sweep = RadialSweep::new(100.0);
        sweep.snapshot(
            Point::ZERO,
            [
                // Pointing straight at the light.
                Line::new((10.0, 10.0), (30.0, 30.0)),
                // Through the light.
                Line::new((-10.0, 0.0), (10.0, 0.0)),
                // Entirely outside the square.
                Line::new((200.0, 0.0), (200.0, 50.0)),
            ],
        );
        assert_eq!(sweep.shade_points().points().segment_count(), 4);
        sweep.run();
        assert_eq!(sweep.draw_points().len(), 5);
    }

    #[test]
    fn crossing_zero_is_seeded() {
        let mut sweep = RadialSweep::new(100.0);
        sweep.snapshot(Point::ZERO, [Line::new((30.0, 10.0), (30.0, -10.0))]);
        let snapshot = sweep.shade_points();
        // The right edge of the square, and the occluder.
        assert_eq!(snapshot.seeds().len(), 2);
        for &seed in snapshot.seeds() {
            let points = snapshot.points();
            assert!(points[seed].key > points[points.pair(seed)].key);
        }

        sweep.run();
        let lines = sweep.draw_points().lines();
        assert!((lines[0].p0 - Point::new(30.0, 0.0)).hypot() < 1e-9);
        assert!((lines[0].p1 - Point::new(30.0, 10.0)).hypot() < 1e-9);
        arbtests::check_fan(&sweep);
    }

    #[test]
    fn occluder_ending_on_the_zero_ray() {
        // The left side ends on the zero ray and is nearest all the way up
        // to it, so the fan has to follow it there before closing.
        let mut sweep = RadialSweep::new(90.0);
        sweep.snapshot(
            Point::ZERO,
            [
                Line::new((20.0, -30.0), (20.0, 0.0)),
                Line::new((20.0, 0.0), (50.0, 0.0)),
                Line::new((50.0, 0.0), (50.0, -30.0)),
                Line::new((50.0, -30.0), (20.0, -30.0)),
            ],
        );
        sweep.run();

        assert_lines_close(
            sweep.draw_points().lines(),
            &[
                ((90.0, 0.0), (90.0, 90.0)),
                ((90.0, 90.0), (-90.0, 90.0)),
                ((-90.0, 90.0), (-90.0, -90.0)),
                ((-90.0, -90.0), (60.0, -90.0)),
                ((20.0, -30.0), (20.0, 0.0)),
                ((20.0, 0.0), (90.0, 0.0)),
            ],
        );
        arbtests::check_fan(&sweep);
        arbtests::check_fan_visibility(&sweep);
    }

    #[test]
    fn lights_level_with_box_corners() {
        // Boxes span [10, 30], [50, 70] and [90, 110] on each axis, so
        // lights on the rows y = 10, 30, ... have corners on the zero ray.
        let boxes = crate::generators::box_grid(Point::new(10.0, 10.0), 3, 20.0, 40.0);
        let inside = |v: f64| [10.0, 50.0, 90.0].iter().any(|&lo| (lo..=lo + 20.0).contains(&v));
        let mut sweep = RadialSweep::new(90.0);
        for i in 0..=24u32 {
            for j in 0..=24u32 {
                let origin = Point::new(5.0 * f64::from(i), 5.0 * f64::from(j));
                if inside(origin.x) && inside(origin.y) {
                    continue;
                }
                sweep.snapshot(origin, boxes.iter().copied());
                sweep.run();
                arbtests::check_fan(&sweep);
                arbtests::check_fan_visibility(&sweep);
            }
        }
    }

    #[test]
    fn sweeping_twice_is_idempotent() {
        let mut sweep = RadialSweep::new(50.0);
        sweep.snapshot(
            Point::ZERO,
            [
                Line::new((10.0, -5.0), (12.0, 8.0)),
                Line::new((-20.0, 3.0), (-4.0, 30.0)),
                Line::new((5.0, -30.0), (-25.0, -15.0)),
            ],
        );
        let first_stats = sweep.run();
        let first = sweep.draw_points().clone();
        let second_stats = sweep.run();
        assert_eq!(&first, sweep.draw_points());
        assert_eq!(first_stats, second_stats);
    }

    #[test]
    fn random_scenes() {
        arbtest::arbtest(arbtests::radial_fan);
    }
}
