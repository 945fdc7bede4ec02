//! Randomized checks of both sweeps, shared by unit tests and fuzz targets.
//!
//! Scenes are built from pairwise-disjoint segments: the sweeps never look
//! for crossings, so the nearest segment can only change at an endpoint.

use arbitrary::Unstructured;
use kurbo::{Line, Point, Rect, Vec2};

use super::{LinearSweep, RadialSweep};
use crate::{
    arbitrary::{disjoint_lines, float_in_range, keep_clear_of},
    geom::{self, angle_of, signed_turn},
    num::CheapOrderedFloat,
};

/// Angular slack for comparing fan edges: a few key buckets.
const ANGLE_SLACK: f64 = 1e-6;

/// Asserts that a radial sweep's output is a closed fan: it starts on the
/// zero ray, each segment starts on the ray where the last one ended, it
/// turns monotonically through exactly one full turn, and it ends where it
/// started.
pub fn check_fan(sweep: &RadialSweep) {
    let lines = sweep.draw_points().lines();
    assert!(!lines.is_empty());

    let first = lines[0].p0;
    let last = lines[lines.len() - 1].p1;
    assert!((first - last).hypot() < 1e-9, "fan doesn't close: {first:?} vs {last:?}");
    let start = angle_of(first.to_vec2());
    assert!(
        start < ANGLE_SLACK || start > std::f64::consts::TAU - ANGLE_SLACK,
        "fan starts off the zero ray at {first:?}"
    );

    let mut total = 0.0;
    let mut prev_end: Option<f64> = None;
    for line in lines {
        let a0 = angle_of(line.p0.to_vec2());
        let a1 = angle_of(line.p1.to_vec2());
        if let Some(prev) = prev_end {
            assert!(
                signed_turn(prev, a0).abs() < ANGLE_SLACK,
                "gap in the fan before {line:?}"
            );
        }
        let turn = signed_turn(a0, a1);
        assert!(turn >= -ANGLE_SLACK, "{line:?} runs backwards");
        total += turn;
        prev_end = Some(a1);
    }
    assert!(
        (total - std::f64::consts::TAU).abs() < 1e-5,
        "fan covers {total} radians"
    );
}

/// Asserts that every emitted fan segment is the nearest thing to the light
/// along the ray through its middle.
pub fn check_fan_visibility(sweep: &RadialSweep) {
    let points = sweep.shade_points().points();
    for line in sweep.draw_points().lines() {
        let a0 = angle_of(line.p0.to_vec2());
        let turn = signed_turn(a0, angle_of(line.p1.to_vec2()));
        if turn < 1e-4 {
            continue;
        }
        let dir = Vec2::from_angle(a0 + turn / 2.0);
        let Some(on_line) = geom::ray_hit(dir, *line) else {
            panic!("mid ray misses {line:?}");
        };
        let nearest = points
            .indices()
            .filter_map(|idx| geom::ray_hit(dir, points.segment(idx)))
            .map(|p| CheapOrderedFloat::from(p.to_vec2().hypot()))
            .min()
            .map(CheapOrderedFloat::into_inner)
            .unwrap_or(f64::INFINITY);
        let emitted = on_line.to_vec2().hypot();
        assert!(
            (emitted - nearest).abs() <= 1e-6 * (1.0 + nearest),
            "{line:?} is at {emitted} but something is at {nearest}"
        );
    }
}

/// Asserts that a linear sweep's output covers the window left to right,
/// without gaps wider than one key bucket.
pub fn check_profile(sweep: &LinearSweep) {
    let (min_x, max_x) = sweep.window();
    let slack = 2.0 * sweep.resolution();
    let lines = sweep.draw_points().lines();
    assert!(!lines.is_empty());
    assert!((lines[0].p0.x - min_x).abs() < 1e-9);
    assert!((lines[lines.len() - 1].p1.x - max_x).abs() < 1e-9);

    let mut prev_end: Option<f64> = None;
    for line in lines {
        assert!(line.p0.x <= line.p1.x + slack, "{line:?} runs backwards");
        if let Some(prev) = prev_end {
            assert!((line.p0.x - prev).abs() <= slack, "gap before {line:?}");
        }
        prev_end = Some(line.p1.x);
    }
}

/// Asserts that every emitted profile segment is the highest thing in the
/// column through its middle.
pub fn check_profile_visibility(sweep: &LinearSweep) {
    let points = sweep.shade_points().points();
    let min_width = 4.0 * sweep.resolution();
    for line in sweep.draw_points().lines() {
        if line.p1.x - line.p0.x < min_width {
            continue;
        }
        let x = (line.p0.x + line.p1.x) / 2.0;
        let Some(on_line) = geom::vertical_hit(*line, x) else {
            panic!("mid column misses {line:?}");
        };
        let highest = points
            .indices()
            .filter_map(|idx| geom::vertical_hit(points.segment(idx), x))
            .map(|p| CheapOrderedFloat::from(p.y))
            .min()
            .map(CheapOrderedFloat::into_inner)
            .unwrap_or(f64::INFINITY);
        assert!(
            (on_line.y - highest).abs() <= 1e-6 * (1.0 + highest.abs()),
            "{line:?} is at {} but something is at {highest}",
            on_line.y
        );
    }
}

/// Sweeps a random scene around a point light and checks the fan.
///
/// Sometimes the light is moved level with an endpoint, putting that
/// endpoint exactly on the zero ray.
pub fn radial_fan(u: &mut Unstructured<'_>) -> arbitrary::Result<()> {
    let radius = float_in_range(20.0, 200.0, u)?;
    let reach = radius * 1.2;
    let mut origin = Point::new(float_in_range(-50.0, 50.0, u)?, float_in_range(-50.0, 50.0, u)?);
    let bounds = Rect::new(-reach, -reach, reach, reach) + origin.to_vec2();
    let mut global = disjoint_lines(bounds, 16, radius / 100.0, u)?;
    if !global.is_empty() && u.arbitrary()? {
        let line = global[u.choose_index(global.len())?];
        origin.y = if u.arbitrary()? { line.p0.y } else { line.p1.y };
    }
    keep_clear_of(&mut global, origin, radius / 50.0);

    let mut sweep = RadialSweep::new(radius);
    sweep.snapshot(origin, global);
    let stats = sweep.run();
    assert_eq!(stats.points as usize, sweep.shade_points().points().len());
    check_fan(&sweep);
    check_fan_visibility(&sweep);

    let first = sweep.draw_points().clone();
    assert_eq!(sweep.run(), stats);
    assert_eq!(&first, sweep.draw_points());
    Ok(())
}

/// Sweeps a random scene under overhead light and checks the profile.
pub fn linear_profile(u: &mut Unstructured<'_>) -> arbitrary::Result<()> {
    let width = float_in_range(100.0, 1000.0, u)?;
    let height = float_in_range(100.0, 1000.0, u)?;
    let bounds = Rect::new(-600.0, 0.0, width + 600.0, height);
    let lines = disjoint_lines(bounds, 16, 1.0, u)?;
    let above = if u.arbitrary()? {
        let x0 = float_in_range(-500.0, width + 500.0, u)?;
        vec![(x0, x0 + float_in_range(1.0, 200.0, u)?)]
    } else {
        Vec::new()
    };

    let mut sweep = LinearSweep::new(width, height);
    sweep.snapshot(lines, above);
    let stats = sweep.run();
    check_profile(&sweep);
    check_profile_visibility(&sweep);

    let first = sweep.draw_points().clone();
    assert_eq!(sweep.run(), stats);
    assert_eq!(&first, sweep.draw_points());
    Ok(())
}
