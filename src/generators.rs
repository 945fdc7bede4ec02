//! Utilities for generating scenes for demos, benchmarks, and tests.

use kurbo::{Line, Point, Vec2};

/// The four sides of the `size` by `size` box with top-left corner `p`.
///
/// If `slant` is non-zero, the right-hand side is moved down by `slant`,
/// giving a parallelogram without horizontal edges.
fn square(p: Point, size: f64, slant: f64) -> [Line; 4] {
    let corners = [
        p,
        p + Vec2::new(0.0, size),
        p + Vec2::new(size, size + slant),
        p + Vec2::new(size, slant),
    ];
    std::array::from_fn(|i| Line::new(corners[i], corners[(i + 1) % 4]))
}

/// An `n` by `n` grid of boxes, `size` wide and `offset` apart, starting at `origin`.
///
/// The boxes don't touch as long as `offset > size`.
pub fn box_grid(origin: Point, n: usize, size: f64, offset: f64) -> Vec<Line> {
    grid(origin, n, size, offset, 0.0)
}

/// Like [`box_grid`], but with no exactly-horizontal lines.
///
/// Segments with both endpoints in one key bucket are dropped from linear
/// sweeps, so their presence or absence can affect performance.
pub fn slanted_grid(origin: Point, n: usize, size: f64, offset: f64) -> Vec<Line> {
    grid(origin, n, size, offset, size / 8.0)
}

fn grid(origin: Point, n: usize, size: f64, offset: f64, slant: f64) -> Vec<Line> {
    let mut ret = Vec::with_capacity(4 * n * n);
    for i in 0..n {
        for j in 0..n {
            let p = origin + Vec2::new(i as f64 * offset, j as f64 * offset);
            ret.extend(square(p, size, slant));
        }
    }
    ret
}

/// A box grid centered on `center`, covering roughly `radius` in each direction.
///
/// Handy for putting a point light in the middle of a crowd of occluders.
/// The box nearest the center is left out so that the light isn't boxed in.
pub fn grid_around(center: Point, radius: f64, n: usize) -> Vec<Line> {
    if n == 0 {
        return Vec::new();
    }
    let offset = 2.0 * radius / n as f64;
    let size = offset / 2.0;
    let origin = center - Vec2::new(radius - size / 2.0, radius - size / 2.0);
    let mut lines = box_grid(origin, n, size, offset);
    let inside = |p: Point| (p - center).hypot() < size;
    lines.retain(|l| !inside(l.p0) && !inside(l.p1));
    lines
}

/// `n` horizontal ledges stepping down left to right across `width`.
///
/// A sunlight benchmark: every ledge shadows part of the one below it.
pub fn staircase(width: f64, height: f64, n: usize) -> Vec<Line> {
    let step_x = width / (n as f64 + 1.0);
    let step_y = height / (n as f64 + 1.0);
    (0..n)
        .map(|i| {
            let x = i as f64 * step_x;
            let y = (i + 1) as f64 * step_y;
            Line::new((x, y), (x + 1.5 * step_x, y + step_y / 4.0))
        })
        .collect()
}
