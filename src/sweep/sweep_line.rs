//! The alpha-line state machine shared by both sweeps.
//!
//! The sweep visits shade points in key order, keeping the cast set up to
//! date and tracking the alpha line together with its *contact* (where the
//! current visible stretch of it began). There are three kinds of event:
//!
//! - the alpha line ends: emit up to its end, then find the next nearest
//!   segment, either among the segments starting right here or by probing;
//! - a segment starts nearer than the alpha line: emit up to the point on
//!   the alpha line behind it, and switch;
//! - anything else just updates the cast set.
//!
//! Points that share a key form a group and are always resolved together,
//! so a segment ending and another starting at the same place never leave a
//! gap between them.

use kurbo::Point;

use super::{DrawPoints, Snapshot, SweepGeometry, SweepStats};
use crate::{
    cast_set::CastSet,
    num::{CheapOrderedFloat, Tolerance},
    shade_point::{PointIdx, ShadePoints},
};

#[derive(Clone, Copy, Debug)]
struct Hit {
    // The endpoint that put the segment into the cast set.
    idx: PointIdx,
    point: Point,
}

/// Runs a complete sweep over `snapshot`, replacing the contents of `out`.
///
/// `cast` is scratch space; it's reset from the snapshot's seeds first, so
/// sweeping the same snapshot twice gives the same output.
pub(crate) fn run<G: SweepGeometry>(
    geom: &G,
    snapshot: &Snapshot,
    tol: Tolerance,
    cast: &mut CastSet,
    out: &mut DrawPoints,
) -> SweepStats {
    out.clear();
    cast.reset(&snapshot.points);
    for &p in &snapshot.seeds {
        cast.insert(&snapshot.points, p);
    }

    let mut sweeper = Sweeper {
        geom,
        points: &snapshot.points,
        order: &snapshot.order,
        cast,
        out,
        tol,
        stats: SweepStats::default(),
    };
    sweeper.sweep();
    sweeper.stats
}

struct Sweeper<'a, G> {
    geom: &'a G,
    points: &'a ShadePoints,
    order: &'a [PointIdx],
    cast: &'a mut CastSet,
    out: &'a mut DrawPoints,
    tol: Tolerance,
    stats: SweepStats,
}

impl<G: SweepGeometry> Sweeper<'_, G> {
    fn sweep(&mut self) {
        let n = self.order.len();
        if n == 0 {
            return;
        }

        let start = self.geom.start();
        let (winner, mut i) = if self.key_at(0) == 0 {
            self.resolve_group(0)
        } else {
            (None, 0)
        };
        let (mut alpha, mut contact) = match (winner, self.probe(start, winner)) {
            (Some(w), Some(hit)) if self.nearer(hit.point, self.pos(w)) => (hit.idx, hit.point),
            (Some(w), _) => (w, self.pos(w)),
            (None, Some(hit)) => (hit.idx, hit.point),
            (None, None) => {
                self.stuck(start);
                return;
            }
        };
        let first = contact;

        while i < n {
            self.check_invariants(i);

            let p = self.order[i];
            let alpha_end = self.points.pair(alpha);
            if self.points[p].key == self.points[alpha_end].key {
                let end = self.pos(alpha_end);
                self.emit(contact, end);
                let (winner, next) = self.resolve_group(i);
                i = next;
                match self.successor(alpha, end, winner) {
                    Some(hit) => {
                        alpha = hit.idx;
                        contact = hit.point;
                    }
                    // Everything ended together at the far edge of the window.
                    None if i == n => return,
                    None => {
                        self.stuck(end);
                        return;
                    }
                }
            } else if let Some(cut) = self.cut_in_front(alpha, p) {
                self.emit(contact, cut);
                let (winner, next) = self.resolve_group(i);
                i = next;
                alpha = winner.unwrap_or(p);
                contact = self.pos(alpha);
            } else {
                self.visit(p);
                i += 1;
            }
        }

        self.finish(alpha, contact, first);
    }

    /// Picks the alpha line after `old` ended at `end`.
    fn successor(&mut self, old: PointIdx, end: Point, winner: Option<PointIdx>) -> Option<Hit> {
        let Some(w) = winner else {
            return self.probe(end, Some(old));
        };
        let at = self.pos(w);
        // A segment starting farther away than the old one ended might be
        // hidden behind something that was already under the sweep line.
        if self.nearer(end, at) {
            if let Some(hit) = self.probe(at, Some(w)) {
                if self.nearer(hit.point, at) {
                    return Some(hit);
                }
            }
        }
        Some(Hit { idx: w, point: at })
    }

    /// If `p` starts a segment nearer than the alpha line, the point on the
    /// alpha line directly behind it.
    fn cut_in_front(&self, alpha: PointIdx, p: PointIdx) -> Option<Point> {
        if !self.geom.is_opening(self.points, p) {
            return None;
        }
        let at = self.pos(p);
        let cut = self.geom.hit(self.points.segment(alpha), at)?;
        self.nearer(at, cut).then_some(cut)
    }

    /// Visits every point sharing `order[i]`'s key, returning the nearest
    /// segment that starts there and the index of the next group.
    fn resolve_group(&mut self, i: usize) -> (Option<PointIdx>, usize) {
        let key = self.key_at(i);
        let mut best: Option<PointIdx> = None;
        let mut j = i;
        while j < self.order.len() && self.key_at(j) == key {
            let p = self.order[j];
            let opening = self.geom.is_opening(self.points, p);
            self.cast.update(self.points, p, opening);
            self.stats.points += 1;
            if opening && best.map_or(true, |b| self.beats(p, b)) {
                best = Some(p);
            }
            j += 1;
        }
        (best, j)
    }

    fn beats(&self, p: PointIdx, incumbent: PointIdx) -> bool {
        let dp = self.geom.depth(self.pos(p));
        let di = self.geom.depth(self.pos(incumbent));
        if self.tol.less(dp, di) {
            true
        } else if self.tol.less(di, dp) {
            false
        } else {
            self.geom.facing(self.points, p)
                > self.geom.facing(self.points, incumbent) + Tolerance::ANGLE
        }
    }

    fn visit(&mut self, p: PointIdx) {
        let opening = self.geom.is_opening(self.points, p);
        self.cast.update(self.points, p, opening);
        self.stats.points += 1;
    }

    /// The nearest cast-set member along the probe through `at`, skipping `except`'s segment.
    fn probe(&mut self, at: Point, except: Option<PointIdx>) -> Option<Hit> {
        let points = self.points;
        self.stats.probes += 1;
        let mut best: Option<(CheapOrderedFloat, Hit)> = None;
        for idx in self.cast.iter() {
            self.stats.cast_visits += 1;
            if except.is_some_and(|e| points.same_segment(e, idx)) {
                continue;
            }
            if let Some(point) = self.geom.hit(points.segment(idx), at) {
                let depth = CheapOrderedFloat::from(self.geom.depth(point));
                if best.map_or(true, |(d, _)| depth < d) {
                    best = Some((depth, Hit { idx, point }));
                }
            }
        }
        best.map(|(_, hit)| hit)
    }

    fn finish(&mut self, alpha: PointIdx, contact: Point, first: Point) {
        let alpha_line = self.points.segment(alpha);
        if G::WRAPS {
            // Close along the alpha line, then along the probe. The two
            // differ when a segment ends on the starting probe, or when the
            // first contact was an endpoint there.
            let last = self.geom.hit(alpha_line, self.geom.end()).unwrap_or(first);
            self.emit(contact, last);
            self.emit(last, first);
        } else {
            let last = self.geom.hit(alpha_line, self.geom.end()).unwrap_or(contact);
            self.emit(contact, last);
        }
    }

    fn emit(&mut self, p0: Point, p1: Point) {
        if (p1 - p0).hypot() > self.tol.eps() {
            self.out.push(p0, p1);
            self.stats.segments += 1;
        }
    }

    fn stuck(&self, at: Point) {
        log::error!("nothing under the sweep line at {at:?}, shadow output is incomplete");
        if cfg!(debug_assertions) {
            panic!("nothing under the sweep line at {at:?}");
        }
    }

    fn nearer(&self, a: Point, b: Point) -> bool {
        self.tol.less(self.geom.depth(a), self.geom.depth(b))
    }

    fn key_at(&self, i: usize) -> u32 {
        self.points[self.order[i]].key
    }

    fn pos(&self, p: PointIdx) -> Point {
        self.points[p].pos
    }

    /// Checks that the cast set sees everything: just past the group before
    /// `order[i]`, the nearest cast-set member must be as near as the nearest
    /// segment overall.
    #[cfg(any(test, feature = "slow-asserts"))]
    fn check_invariants(&self, i: usize) {
        if i == 0 || self.key_at(i) == self.key_at(i - 1) {
            return;
        }
        let at = self
            .geom
            .between(self.pos(self.order[i - 1]), self.pos(self.order[i]));
        let from_cast = self.nearest(self.cast.iter(), at);
        let from_all = self.nearest(self.points.indices(), at);
        match (from_cast, from_all) {
            (Some(c), Some(a)) => assert!(
                (c - a).abs() <= 1e-6 * (1.0 + a.abs()),
                "cast set is missing a segment at {at:?}: nearest member at {c}, nearest segment at {a}"
            ),
            (None, None) => {}
            (c, a) => panic!("cast set disagrees at {at:?}: {c:?} vs {a:?}"),
        }
    }

    #[cfg(not(any(test, feature = "slow-asserts")))]
    fn check_invariants(&self, _i: usize) {}

    #[cfg(any(test, feature = "slow-asserts"))]
    fn nearest(&self, candidates: impl Iterator<Item = PointIdx>, at: Point) -> Option<f64> {
        candidates
            .filter_map(|idx| self.geom.hit(self.points.segment(idx), at))
            .map(|p| CheapOrderedFloat::from(self.geom.depth(p)))
            .min()
            .map(CheapOrderedFloat::into_inner)
    }
}
