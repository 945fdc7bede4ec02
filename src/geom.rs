//! Geometric primitives: probes, clipping and angles.
//!
//! Everything here is in light-local coordinates. For the radial sweep the
//! light sits at the origin; for the linear sweep probes are vertical lines.

use std::f64::consts::TAU;

use kurbo::{Line, Point, Rect, Vec2};

/// How far outside `[0, 1]` a segment parameter may land and still count as a hit.
///
/// Probes through a segment's own endpoint must find that segment.
const HIT_SLOP: f64 = 1e-9;

/// The angle of `v`, normalized to `[0, 2π)`.
pub fn angle_of(v: Vec2) -> f64 {
    let theta = v.y.atan2(v.x).rem_euclid(TAU);
    // rem_euclid can round up to exactly TAU for tiny negative angles.
    if theta >= TAU {
        0.0
    } else {
        theta
    }
}

/// The counter-clockwise angle from `from` to `to`, in `(-π, π]`.
pub fn signed_turn(from: f64, to: f64) -> f64 {
    let d = (to - from).rem_euclid(TAU);
    if d > std::f64::consts::PI {
        d - TAU
    } else {
        d
    }
}

/// Rotates `v` counter-clockwise by `rads`.
pub fn rotate(v: Vec2, rads: f64) -> Vec2 {
    let (sin, cos) = rads.sin_cos();
    Vec2::new(v.x * cos - v.y * sin, v.x * sin + v.y * cos)
}

/// Where the ray from the origin in direction `dir` meets `line`.
///
/// Returns `None` if the ray is parallel to the line, misses it, or would
/// have to travel backwards to reach it.
pub fn ray_hit(dir: Vec2, line: Line) -> Option<Point> {
    let s = line.p1 - line.p0;
    let denom = dir.cross(s);
    if denom.abs() <= f64::EPSILON * dir.hypot() * s.hypot() {
        return None;
    }
    let p0 = line.p0.to_vec2();
    let t = p0.cross(s) / denom;
    let u = p0.cross(dir) / denom;
    if t < 0.0 || !(-HIT_SLOP..=1.0 + HIT_SLOP).contains(&u) {
        return None;
    }
    Some((dir * t).to_point())
}

/// Where the vertical line through `x` meets `line`.
pub fn vertical_hit(line: Line, x: f64) -> Option<Point> {
    let dx = line.p1.x - line.p0.x;
    if dx.abs() <= f64::EPSILON * line.p0.x.abs().max(line.p1.x.abs()).max(1.0) {
        return None;
    }
    let t = (x - line.p0.x) / dx;
    if !(-HIT_SLOP..=1.0 + HIT_SLOP).contains(&t) {
        return None;
    }
    Some(Point::new(x, line.p0.y + t * (line.p1.y - line.p0.y)))
}

/// Clips `line` to `rect`, keeping its direction.
///
/// The bounds of `rect` may be infinite, which is how the linear sweep clips
/// in `x` alone. Unclipped endpoints come back bit-for-bit unchanged.
pub fn clip_line(line: Line, rect: Rect) -> Option<Line> {
    let d = line.p1 - line.p0;
    let mut t0 = 0.0f64;
    let mut t1 = 1.0f64;
    let edges = [
        (-d.x, line.p0.x - rect.x0),
        (d.x, rect.x1 - line.p0.x),
        (-d.y, line.p0.y - rect.y0),
        (d.y, rect.y1 - line.p0.y),
    ];
    for (p, q) in edges {
        if p == 0.0 {
            if q < 0.0 {
                return None;
            }
            continue;
        }
        let r = q / p;
        if p < 0.0 {
            if r > t1 {
                return None;
            }
            t0 = t0.max(r);
        } else {
            if r < t0 {
                return None;
            }
            t1 = t1.min(r);
        }
    }
    if t0 > t1 {
        return None;
    }
    let p0 = if t0 > 0.0 { line.p0 + d * t0 } else { line.p0 };
    let p1 = if t1 < 1.0 { line.p0 + d * t1 } else { line.p1 };
    Some(Line::new(p0, p1))
}

/// Do the closed segments `a` and `b` share any point?
#[cfg(any(test, feature = "arbitrary"))]
pub fn segments_touch(a: Line, b: Line) -> bool {
    fn orient(p: Point, q: Point, r: Point) -> f64 {
        (q - p).cross(r - p)
    }
    fn on_segment(p: Point, q: Point, r: Point) -> bool {
        r.x >= p.x.min(q.x) && r.x <= p.x.max(q.x) && r.y >= p.y.min(q.y) && r.y <= p.y.max(q.y)
    }

    let d1 = orient(b.p0, b.p1, a.p0);
    let d2 = orient(b.p0, b.p1, a.p1);
    let d3 = orient(a.p0, a.p1, b.p0);
    let d4 = orient(a.p0, a.p1, b.p1);
    if ((d1 > 0.0 && d2 < 0.0) || (d1 < 0.0 && d2 > 0.0))
        && ((d3 > 0.0 && d4 < 0.0) || (d3 < 0.0 && d4 > 0.0))
    {
        return true;
    }
    (d1 == 0.0 && on_segment(b.p0, b.p1, a.p0))
        || (d2 == 0.0 && on_segment(b.p0, b.p1, a.p1))
        || (d3 == 0.0 && on_segment(a.p0, a.p1, b.p0))
        || (d4 == 0.0 && on_segment(a.p0, a.p1, b.p1))
}
