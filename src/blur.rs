//! Kernel data for the light map's blur pass.
//!
//! The blur itself runs on the canvas backend. What we compute here is a
//! 1D Gaussian with adjacent taps merged into a single bilinear sample, so a
//! backend can do a `size`-wide blur with about half as many texture reads.

use crate::Error;

/// The widest kernel [`GaussianKernel::new`] accepts, in pixels.
pub const MAX_WIDTH: u32 = 1024;

/// Parameters for a [`GaussianKernel`], as they appear in configuration.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct KernelConfig {
    /// The requested kernel width, in pixels.
    pub width: u32,
    /// The standard deviation, in pixels.
    pub sigma: f64,
}

impl KernelConfig {
    /// Builds the kernel.
    pub fn build(&self) -> Result<GaussianKernel, Error> {
        GaussianKernel::new(self.width, self.sigma)
    }
}

/// A separable Gaussian blur kernel in (offset, weight) form.
///
/// Tap 0 is the center pixel. Every other tap stands for a pair of pixels
/// on each side of the center, sampled in between them.
#[derive(Clone, Debug, PartialEq)]
pub struct GaussianKernel {
    size: u32,
    sigma: f64,
    offsets: Vec<f64>,
    weights: Vec<f64>,
}

impl GaussianKernel {
    /// Builds a kernel about `width` pixels wide.
    ///
    /// The width is rounded down to a multiple of 4 and then made odd, so
    /// the pixels on each side of the center pair up exactly. It must be
    /// between 1 and [`MAX_WIDTH`].
    pub fn new(width: u32, sigma: f64) -> Result<Self, Error> {
        if width == 0 || width > MAX_WIDTH || !sigma.is_finite() || sigma <= 0.0 {
            return Err(Error::InvalidKernel { width, sigma });
        }
        let size = (width / 4) * 4 + 1;
        let n = size as usize;
        let mean = (n / 2) as f64;

        // A 2D Gaussian summed over one axis is the 1D Gaussian again.
        let mut line: Vec<f64> = (0..n)
            .map(|x| {
                let d = (x as f64 - mean) / sigma;
                (-0.5 * d * d).exp()
            })
            .collect();
        let total: f64 = line.iter().sum();
        for v in &mut line {
            *v /= total;
        }

        let half = n / 2;
        let mut offsets = vec![0.0];
        let mut weights = vec![line[half]];
        for i in (1..half).step_by(2) {
            let (w0, w1) = (line[half + i], line[half + i + 1]);
            let (o0, o1) = (i as f64, (i + 1) as f64);
            offsets.push((o0 * w0 + o1 * w1) / (w0 + w1));
            weights.push(w0 + w1);
        }
        log::debug!(
            "blur kernel of size {size} (sigma {sigma}) has {} taps",
            weights.len()
        );

        Ok(GaussianKernel {
            size,
            sigma,
            offsets,
            weights,
        })
    }

    /// The number of pixels the kernel covers along one axis.
    pub fn size(&self) -> u32 {
        self.size
    }

    /// The standard deviation.
    pub fn sigma(&self) -> f64 {
        self.sigma
    }

    /// Sample offsets from the center pixel, starting with 0.
    pub fn offsets(&self) -> &[f64] {
        &self.offsets
    }

    /// The weight of each sample.
    pub fn weights(&self) -> &[f64] {
        &self.weights
    }

    /// `(offset, weight)` pairs.
    pub fn taps(&self) -> impl Iterator<Item = (f64, f64)> + '_ {
        self.offsets.iter().copied().zip(self.weights.iter().copied())
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    #[test]
    fn rejects_degenerate() {
        assert_matches!(GaussianKernel::new(0, 1.0), Err(Error::InvalidKernel { width: 0, .. }));
        assert_matches!(GaussianKernel::new(9, 0.0), Err(Error::InvalidKernel { .. }));
        assert_matches!(GaussianKernel::new(9, -2.0), Err(Error::InvalidKernel { .. }));
        assert_matches!(GaussianKernel::new(9, f64::NAN), Err(Error::InvalidKernel { .. }));
        assert_matches!(
            GaussianKernel::new(100_000, 2.0),
            Err(Error::InvalidKernel { width: 100_000, .. })
        );
    }

    #[test]
    fn widest_kernel() {
        let k = GaussianKernel::new(MAX_WIDTH, 200.0).unwrap();
        assert_eq!(k.size(), MAX_WIDTH + 1);
        let total = k.weights()[0] + 2.0 * k.weights()[1..].iter().sum::<f64>();
        assert!((total - 1.0).abs() < 1e-9, "{total}");
    }

    #[test]
    fn matches_a_collapsed_2d_gaussian() {
        let (n, sigma) = (9usize, 1.5);
        let mean = (n / 2) as f64;
        let g = |x: usize, y: usize| {
            let (dx, dy) = ((x as f64 - mean) / sigma, (y as f64 - mean) / sigma);
            (-0.5 * (dx * dx + dy * dy)).exp()
        };
        let total: f64 = (0..n).flat_map(|x| (0..n).map(move |y| (x, y))).map(|(x, y)| g(x, y)).sum();
        let center: f64 = (0..n).map(|y| g(n / 2, y)).sum::<f64>() / total;

        let k = GaussianKernel::new(8, sigma).unwrap();
        assert!((k.weights()[0] - center).abs() < 1e-12);
    }

    #[test]
    fn sizes() {
        assert_eq!(GaussianKernel::new(1, 1.0).unwrap().size(), 1);
        assert_eq!(GaussianKernel::new(8, 1.0).unwrap().size(), 9);
        assert_eq!(GaussianKernel::new(11, 1.0).unwrap().size(), 9);
        assert_eq!(GaussianKernel::new(12, 1.0).unwrap().size(), 13);
    }

    #[test]
    fn weights_sum_to_one() {
        for (width, sigma) in [(1, 1.0), (8, 1.5), (20, 4.0), (33, 10.0)] {
            let k = GaussianKernel::new(width, sigma).unwrap();
            let total = k.weights()[0] + 2.0 * k.weights()[1..].iter().sum::<f64>();
            assert!((total - 1.0).abs() < 1e-12, "{width}/{sigma}: {total}");
            assert_eq!(k.weights().len(), (k.size() as usize / 2).div_ceil(2) + 1);
        }
    }

    #[test]
    fn offsets_sit_between_pixels() {
        let k = GaussianKernel::new(16, 3.0).unwrap();
        assert_eq!(k.offsets()[0], 0.0);
        for (i, &o) in k.offsets().iter().enumerate().skip(1) {
            let lo = (2 * i - 1) as f64;
            assert!(o > lo && o < lo + 1.0, "{i}: {o}");
        }
        // Weights fall off away from the center.
        assert!(k.weights().windows(2).skip(1).all(|w| w[0] > w[1]));
    }
}
