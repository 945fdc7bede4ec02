//! Utilities for fuzz and/or property testing using `arbitrary`.

use arbitrary::Unstructured;
use kurbo::{Line, ParamCurveNearest, Point, Rect};

use crate::geom;

/// Generate an arbitrary float in some range.
pub fn float_in_range(
    start: f64,
    end: f64,
    u: &mut Unstructured<'_>,
) -> Result<f64, arbitrary::Error> {
    let num: u32 = u.arbitrary()?;
    let t = num as f64 / u32::MAX as f64;
    Ok((1.0 - t) * start + t * end)
}

/// Generate a point inside `bounds`.
pub fn point_in(bounds: Rect, u: &mut Unstructured<'_>) -> Result<Point, arbitrary::Error> {
    Ok(Point::new(
        float_in_range(bounds.x0, bounds.x1, u)?,
        float_in_range(bounds.y0, bounds.y1, u)?,
    ))
}

/// Generate a segment with both endpoints inside `bounds`.
pub fn line_in(bounds: Rect, u: &mut Unstructured<'_>) -> Result<Line, arbitrary::Error> {
    Ok(Line::new(point_in(bounds, u)?, point_in(bounds, u)?))
}

/// Generate up to `max` segments inside `bounds` that don't touch one another.
///
/// Candidates that would touch an earlier segment, or that are shorter than
/// `min_len`, are dropped rather than retried.
pub fn disjoint_lines(
    bounds: Rect,
    max: usize,
    min_len: f64,
    u: &mut Unstructured<'_>,
) -> Result<Vec<Line>, arbitrary::Error> {
    let count = u.int_in_range(0..=max)?;
    let mut lines: Vec<Line> = Vec::with_capacity(count);
    for _ in 0..count {
        let line = line_in(bounds, u)?;
        if (line.p1 - line.p0).hypot() < min_len {
            continue;
        }
        if lines.iter().any(|&other| geom::segments_touch(other, line)) {
            continue;
        }
        lines.push(line);
    }
    Ok(lines)
}

/// Drops the segments that pass within `clearance` of `center`.
pub fn keep_clear_of(lines: &mut Vec<Line>, center: Point, clearance: f64) {
    lines.retain(|line| line.nearest(center, 1e-9).distance_sq >= clearance * clearance);
}
