//! Sweep keys, and putting shade points in sweep order in linear time.
//!
//! Each shade point gets an integer key by quantizing its sweep coordinate
//! (an angle for the radial sweep, `x` for the linear one). Points are then
//! ordered with a least-significant-digit radix sort over the keys. The sort
//! is stable, so points with equal keys keep their insertion order and the
//! sweep visits them deterministically.

use std::f64::consts::TAU;

use crate::shade_point::{PointIdx, ShadePoints};

/// Key width for angles.
pub const ANGLE_KEY_BITS: u8 = 24;
/// Digit width used when sorting angle keys.
pub const ANGLE_RADIX_BITS: u8 = 8;
/// Key width for horizontal positions.
pub const LINEAR_KEY_BITS: u8 = 16;
/// Digit width used when sorting horizontal keys.
pub const LINEAR_RADIX_BITS: u8 = 4;

/// Maps angles onto `2^bits` equal buckets of the full turn.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AngleQuantizer {
    buckets: u32,
}

impl AngleQuantizer {
    /// A quantizer with `bits`-bit keys. `bits` must be less than 32.
    pub fn new(bits: u8) -> Self {
        debug_assert!(bits > 0 && bits < 32);
        AngleQuantizer {
            buckets: 1 << bits,
        }
    }

    /// The bucket of `rads`, which is normalized to `[0, 2π)` first.
    pub fn key(&self, rads: f64) -> u32 {
        let turn = rads.rem_euclid(TAU) / TAU;
        ((turn * self.buckets as f64) as u32).min(self.max_key())
    }

    /// The angle at the start of bucket `key`.
    pub fn angle(&self, key: u32) -> f64 {
        key as f64 * TAU / self.buckets as f64
    }

    /// The width of one bucket, in radians.
    pub fn bucket_width(&self) -> f64 {
        TAU / self.buckets as f64
    }

    /// The largest key.
    pub fn max_key(&self) -> u32 {
        self.buckets - 1
    }
}

impl Default for AngleQuantizer {
    fn default() -> Self {
        AngleQuantizer::new(ANGLE_KEY_BITS)
    }
}

/// Maps `[min, max]` onto the keys `0..=2^bits - 1`, with both ends landing exactly
/// on the extreme keys.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LinearQuantizer {
    min: f64,
    max: f64,
    max_key: u32,
}

impl LinearQuantizer {
    /// A quantizer over `min..=max` with `bits`-bit keys.
    pub fn new(min: f64, max: f64, bits: u8) -> Self {
        debug_assert!(min < max);
        debug_assert!(bits > 0 && bits < 32);
        LinearQuantizer {
            min,
            max,
            max_key: (1 << bits) - 1,
        }
    }

    /// The key of `x`. Values outside the range clamp to the nearest end.
    pub fn key(&self, x: f64) -> u32 {
        let frac = (x.clamp(self.min, self.max) - self.min) / (self.max - self.min);
        ((frac * self.max_key as f64) as u32).min(self.max_key)
    }

    /// The smallest coordinate in bucket `key`.
    pub fn coord(&self, key: u32) -> f64 {
        self.min + key as f64 / self.max_key as f64 * (self.max - self.min)
    }

    /// The largest key.
    pub fn max_key(&self) -> u32 {
        self.max_key
    }
}

/// A reusable least-significant-digit radix sorter over shade point keys.
#[derive(Clone, Debug)]
pub struct RadixSort {
    key_bits: u8,
    radix_bits: u8,
    counts: Vec<usize>,
    scratch: Vec<PointIdx>,
}

impl RadixSort {
    /// A sorter for `key_bits`-bit keys that handles `radix_bits` bits per pass.
    pub fn new(key_bits: u8, radix_bits: u8) -> Self {
        debug_assert!(radix_bits > 0 && radix_bits <= key_bits);
        RadixSort {
            key_bits,
            radix_bits,
            counts: Vec::new(),
            scratch: Vec::new(),
        }
    }

    /// Fills `order` with every index of `points`, sorted by key.
    ///
    /// Runs `ceil(key_bits / radix_bits)` counting passes, each linear in the
    /// number of points.
    pub fn sort(&mut self, points: &ShadePoints, order: &mut Vec<PointIdx>) {
        order.clear();
        order.extend(points.indices());

        let base = 1usize << self.radix_bits;
        let mask = (base - 1) as u32;
        let mut shift = 0;
        while shift < self.key_bits {
            let digit = |idx: PointIdx| ((points[idx].key >> shift) & mask) as usize;

            self.counts.clear();
            self.counts.resize(base, 0);
            for &idx in order.iter() {
                self.counts[digit(idx)] += 1;
            }
            let mut start = 0;
            for count in &mut self.counts {
                let n = *count;
                *count = start;
                start += n;
            }

            self.scratch.clear();
            self.scratch.resize(order.len(), PointIdx(0));
            for &idx in order.iter() {
                let slot = &mut self.counts[digit(idx)];
                self.scratch[*slot] = idx;
                *slot += 1;
            }
            std::mem::swap(order, &mut self.scratch);
            shift += self.radix_bits;
        }
    }
}

#[cfg(test)]
mod tests {
    use kurbo::Point;
    use proptest::prelude::*;

    use super::*;

    fn points_with_keys(keys: &[u32]) -> ShadePoints {
        let mut points = ShadePoints::default();
        for pair in keys.chunks(2) {
            let b = pair.get(1).copied().unwrap_or(pair[0]);
            points.push_pair(Point::ZERO, pair[0], Point::ZERO, b);
        }
        points
    }

    #[test]
    fn angle_buckets() {
        let q = AngleQuantizer::new(ANGLE_KEY_BITS);
        assert_eq!(q.key(0.0), 0);
        assert_eq!(q.key(-0.0), 0);
        assert_eq!(q.key(TAU), 0);
        assert_eq!(q.key(TAU - 1e-15), q.max_key());
        assert_eq!(q.key(std::f64::consts::PI), 1 << 23);
        let quarter_back = -std::f64::consts::FRAC_PI_2 + q.bucket_width() / 2.0;
        assert_eq!(q.key(quarter_back), 3 << 22);
    }

    #[test]
    fn linear_ends_hit_extreme_keys() {
        let q = LinearQuantizer::new(-400.0, 1200.0, LINEAR_KEY_BITS);
        assert_eq!(q.key(-400.0), 0);
        assert_eq!(q.key(1200.0), 65535);
        assert_eq!(q.key(-1e9), 0);
        assert_eq!(q.key(1e9), 65535);
        assert_eq!(q.coord(0), -400.0);
        assert_eq!(q.coord(65535), 1200.0);
    }

    #[test]
    fn stable_within_ties() {
        let points = points_with_keys(&[5, 3, 5, 3, 0, 5]);
        let mut order = Vec::new();
        RadixSort::new(8, 4).sort(&points, &mut order);
        let idx: Vec<_> = order.iter().map(|p| p.0).collect();
        assert_eq!(idx, vec![4, 1, 3, 0, 2, 5]);
    }

    proptest! {
        #[test]
        fn sorts_angle_keys(keys in prop::collection::vec(0u32..(1 << ANGLE_KEY_BITS), 0..200)) {
            let points = points_with_keys(&keys);
            let mut order = Vec::new();
            RadixSort::new(ANGLE_KEY_BITS, ANGLE_RADIX_BITS).sort(&points, &mut order);

            prop_assert_eq!(order.len(), points.len());
            for w in order.windows(2) {
                let (a, b) = (points[w[0]].key, points[w[1]].key);
                prop_assert!(a < b || (a == b && w[0] < w[1]));
            }
        }

        #[test]
        fn angle_key_is_monotone(a in 0.0..TAU, b in 0.0..TAU) {
            let q = AngleQuantizer::default();
            if a <= b {
                prop_assert!(q.key(a) <= q.key(b));
            }
            let key = q.key(a);
            prop_assert!(q.angle(key) <= a + 1e-12);
            prop_assert_eq!(q.key(q.angle(key) + q.bucket_width() / 2.0), key);
        }
    }
}
