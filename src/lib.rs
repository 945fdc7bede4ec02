#![deny(missing_docs)]
#![doc = include_str!("../README.md")]

#[macro_use]
mod typed_vec;

#[cfg(any(test, feature = "arbitrary"))]
pub mod arbitrary;
pub mod blur;
pub mod canvas;
pub mod cast_set;
mod geom;
pub mod layer;
pub mod light;
mod num;
pub mod occluder;
pub mod order;
pub mod schedule;
pub mod shade_point;
pub mod sweep;
mod worker;

#[cfg(any(test, feature = "generators"))]
pub mod generators;

pub use blur::{GaussianKernel, KernelConfig};
pub use canvas::{BlendMode, Canvas, Color, Recording, SurfaceId};
pub use layer::{LayerConfig, LightLayer};
pub use light::{ConeLight, LightHandle, LightId, LightSource, RadialLight, SunLight};
pub use num::CheapOrderedFloat;
pub use occluder::{AboveBlocker, Occluder, OccluderGroup, Occluders, Scene};
pub use sweep::{DrawPoints, LinearSweep, RadialSweep, SweepStats};
pub use worker::CycleReport;

/// Everything that can go wrong when setting up lights and layers.
///
/// Problems found mid-sweep are bugs rather than errors, and never show up
/// here.
#[derive(Clone, Debug, PartialEq, thiserror::Error)]
pub enum Error {
    /// A layer or sunlight was given an empty or non-finite size.
    #[error("invalid dimensions {width}x{height}")]
    InvalidDimensions {
        /// The requested width.
        width: f64,
        /// The requested height.
        height: f64,
    },
    /// The light-map scale was not a positive finite number.
    #[error("invalid light-map scale {0}")]
    InvalidScale(f64),
    /// Blur kernel parameters that don't describe a kernel.
    #[error("invalid blur kernel (width {width}, sigma {sigma})")]
    InvalidKernel {
        /// The requested width.
        width: u32,
        /// The requested standard deviation.
        sigma: f64,
    },
    /// A point light was too small to hold its own bounding square.
    #[error("invalid light radius {0}")]
    InvalidRadius(f64),
    /// The canvas couldn't load a required asset.
    #[error("missing asset {0:?}")]
    MissingAsset(String),
    /// The layer was configured with no workers.
    #[error("a light layer needs at least one worker")]
    ZeroWorkers,
    /// A coordinate was infinite or NaN.
    #[error("one of the inputs was infinite or NaN")]
    NonFinite,
    /// The operating system refused to start a worker thread.
    #[error("couldn't start a worker thread: {0}")]
    Spawn(String),
}
