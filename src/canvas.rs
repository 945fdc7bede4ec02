//! The drawing sink that lights render into.
//!
//! Surface allocation, rasterization and blending all live on the other side
//! of the [`Canvas`] trait. Lights only describe what to draw.

use std::collections::HashMap;

use kurbo::{Affine, Point, Rect};

use crate::blur::GaussianKernel;

/// An opaque handle to a surface owned by a [`Canvas`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct SurfaceId(pub usize);

/// An 8-bit RGBA color.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct Color {
    /// Red.
    pub r: u8,
    /// Green.
    pub g: u8,
    /// Blue.
    pub b: u8,
    /// Alpha.
    pub a: u8,
}

impl Color {
    /// Fully transparent black.
    pub const TRANSPARENT: Color = Color::rgba(0, 0, 0, 0);
    /// Opaque black.
    pub const BLACK: Color = Color::rgba(0, 0, 0, 255);
    /// Opaque white.
    pub const WHITE: Color = Color::rgba(255, 255, 255, 255);

    /// A color from its four channels.
    pub const fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Color { r, g, b, a }
    }

    /// An opaque color.
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Color::rgba(r, g, b, 255)
    }
}

impl Default for Color {
    fn default() -> Self {
        Color::WHITE
    }
}

/// How a drawing operation combines with what is already on the target.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum BlendMode {
    /// Ordinary "source over" blending.
    Alpha,
    /// Channels are summed and saturate.
    Add,
    /// Channels are multiplied.
    Multiply,
    /// The source replaces the target, alpha included.
    Replace,
}

/// A 2D drawing backend.
///
/// Only the thread that calls [`LightLayer::draw`](crate::LightLayer::draw)
/// ever touches the canvas, so it needn't be `Send`.
pub trait Canvas {
    /// Allocates a new transparent surface.
    fn create_surface(&mut self, width: u32, height: u32) -> SurfaceId;

    /// Loads a named image asset, or `None` if it doesn't exist.
    fn load_surface(&mut self, name: &str) -> Option<SurfaceId>;

    /// The pixel size of a surface.
    fn surface_size(&self, surface: SurfaceId) -> Option<(u32, u32)>;

    /// Fills the whole of `target` with `color`, ignoring blending.
    fn clear(&mut self, target: SurfaceId, color: Color);

    /// Fills a simple polygon.
    fn fill_polygon(&mut self, target: SurfaceId, points: &[Point], color: Color, blend: BlendMode);

    /// Fills an axis-aligned rectangle.
    fn fill_rect(&mut self, target: SurfaceId, rect: Rect, color: Color, blend: BlendMode);

    /// Draws `src` onto `dst`, mapping `src` pixel coordinates through `transform`.
    fn composite(&mut self, src: SurfaceId, dst: SurfaceId, transform: Affine, blend: BlendMode);

    /// Blurs `target` in place with a separable Gaussian.
    ///
    /// The default does nothing, for backends without a blur pass.
    fn blur(&mut self, target: SurfaceId, kernel: &GaussianKernel) {
        let _ = (target, kernel);
    }
}

/// One call made against a [`Recording`] canvas.
#[derive(Clone, Debug, PartialEq)]
pub enum Command {
    /// [`Canvas::create_surface`].
    CreateSurface {
        /// The new surface.
        id: SurfaceId,
        /// Its width.
        width: u32,
        /// Its height.
        height: u32,
    },
    /// [`Canvas::clear`].
    Clear {
        /// The cleared surface.
        target: SurfaceId,
        /// The fill color.
        color: Color,
    },
    /// [`Canvas::fill_polygon`].
    FillPolygon {
        /// The surface drawn on.
        target: SurfaceId,
        /// The polygon's vertices.
        points: Vec<Point>,
        /// The fill color.
        color: Color,
        /// The blend mode.
        blend: BlendMode,
    },
    /// [`Canvas::fill_rect`].
    FillRect {
        /// The surface drawn on.
        target: SurfaceId,
        /// The rectangle.
        rect: Rect,
        /// The fill color.
        color: Color,
        /// The blend mode.
        blend: BlendMode,
    },
    /// [`Canvas::composite`].
    Composite {
        /// The surface drawn.
        src: SurfaceId,
        /// The surface drawn on.
        dst: SurfaceId,
        /// Source-to-destination transform.
        transform: Affine,
        /// The blend mode.
        blend: BlendMode,
    },
    /// [`Canvas::blur`].
    Blur {
        /// The blurred surface.
        target: SurfaceId,
        /// The number of (offset, weight) taps in the kernel.
        taps: usize,
    },
}

impl Command {
    /// The surface this command draws on, if it draws.
    pub fn target(&self) -> Option<SurfaceId> {
        match self {
            Command::CreateSurface { .. } => None,
            Command::Clear { target, .. }
            | Command::FillPolygon { target, .. }
            | Command::FillRect { target, .. }
            | Command::Blur { target, .. } => Some(*target),
            Command::Composite { dst, .. } => Some(*dst),
        }
    }
}

/// A canvas that draws nothing and remembers every call.
///
/// Useful for tests, and for driving the pipeline without a real backend.
#[derive(Clone, Debug, Default)]
pub struct Recording {
    sizes: Vec<(u32, u32)>,
    assets: HashMap<String, SurfaceId>,
    commands: Vec<Command>,
}

impl Recording {
    /// A canvas with no surfaces and no assets.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a loadable asset of the given size.
    pub fn with_asset(mut self, name: &str, width: u32, height: u32) -> Self {
        let id = self.alloc(width, height);
        self.assets.insert(name.to_owned(), id);
        self
    }

    /// Every call made so far, oldest first.
    pub fn commands(&self) -> &[Command] {
        &self.commands
    }

    /// Returns the recorded calls and starts a fresh recording.
    pub fn take_commands(&mut self) -> Vec<Command> {
        std::mem::take(&mut self.commands)
    }

    /// The number of surfaces allocated so far, assets included.
    pub fn surface_count(&self) -> usize {
        self.sizes.len()
    }

    fn alloc(&mut self, width: u32, height: u32) -> SurfaceId {
        self.sizes.push((width, height));
        SurfaceId(self.sizes.len() - 1)
    }
}

impl Canvas for Recording {
    fn create_surface(&mut self, width: u32, height: u32) -> SurfaceId {
        let id = self.alloc(width, height);
        self.commands.push(Command::CreateSurface { id, width, height });
        id
    }

    fn load_surface(&mut self, name: &str) -> Option<SurfaceId> {
        self.assets.get(name).copied()
    }

    fn surface_size(&self, surface: SurfaceId) -> Option<(u32, u32)> {
        self.sizes.get(surface.0).copied()
    }

    fn clear(&mut self, target: SurfaceId, color: Color) {
        self.commands.push(Command::Clear { target, color });
    }

    fn fill_polygon(&mut self, target: SurfaceId, points: &[Point], color: Color, blend: BlendMode) {
        self.commands.push(Command::FillPolygon {
            target,
            points: points.to_vec(),
            color,
            blend,
        });
    }

    fn fill_rect(&mut self, target: SurfaceId, rect: Rect, color: Color, blend: BlendMode) {
        self.commands.push(Command::FillRect {
            target,
            rect,
            color,
            blend,
        });
    }

    fn composite(&mut self, src: SurfaceId, dst: SurfaceId, transform: Affine, blend: BlendMode) {
        self.commands.push(Command::Composite {
            src,
            dst,
            transform,
            blend,
        });
    }

    fn blur(&mut self, target: SurfaceId, kernel: &GaussianKernel) {
        self.commands.push(Command::Blur {
            target,
            taps: kernel.weights().len(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recording() {
        let mut canvas = Recording::new().with_asset("light.png", 64, 32);
        let mask = canvas.load_surface("light.png").unwrap();
        assert_eq!(canvas.surface_size(mask), Some((64, 32)));
        assert_eq!(canvas.load_surface("missing.png"), None);

        let s = canvas.create_surface(10, 10);
        assert_ne!(s, mask);
        canvas.clear(s, Color::BLACK);
        canvas.fill_rect(s, Rect::new(0.0, 0.0, 1.0, 1.0), Color::WHITE, BlendMode::Add);
        assert_eq!(canvas.surface_count(), 2);

        let commands = canvas.take_commands();
        assert_eq!(commands.len(), 3);
        assert!(commands[1..].iter().all(|c| c.target() == Some(s)));
        assert!(canvas.commands().is_empty());
    }
}
