//! Light sources.
//!
//! Every light goes through the same four steps each frame. A worker thread
//! runs the first two, and the thread that owns the canvas runs the last two:
//!
//! 1. [`LightSource::create_shade_points`] copies the occluders it can see
//!    into a private snapshot,
//! 2. [`LightSource::map_shade_points`] sweeps that snapshot,
//! 3. [`LightSource::draw_local`] renders the result onto the light's own
//!    surface,
//! 4. [`LightSource::draw_to_map`] adds that surface onto the shared light map.
//!
//! Position and angle are *held*: callers write them through a
//! [`LightHandle`] at any time, but the light only picks them up in
//! [`LightSource::transfer_held`], which runs while no worker is busy.

use std::{f64::consts::TAU, sync::Arc};

use arrayvec::ArrayVec;
use kurbo::{Affine, Point, Rect, Vec2};
use parking_lot::Mutex;

use crate::{
    canvas::{BlendMode, Canvas, Color, SurfaceId},
    geom,
    occluder::Occluders,
    sweep::{DrawPoints, LinearSweep, RadialSweep, SweepStats, BOUND_INSET},
    Error, LayerConfig,
};

/// Identifies a light within its [`LightLayer`](crate::LightLayer).
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct LightId(pub u64);

/// The externally settable attributes of a light.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct HeldState {
    /// Where the light is, in scene coordinates.
    pub position: Point,
    /// The direction it points, in radians. Only cone lights care.
    pub angle: f64,
    /// The color it draws with.
    pub color: Color,
}

impl HeldState {
    fn new(color: Color) -> Self {
        HeldState {
            position: Point::ZERO,
            angle: 0.0,
            color,
        }
    }
}

/// Shared storage for a light's [`HeldState`].
#[derive(Clone, Debug)]
pub struct Held(Arc<Mutex<HeldState>>);

impl Held {
    /// Fresh storage holding `state`.
    pub fn new(state: HeldState) -> Self {
        Held(Arc::new(Mutex::new(state)))
    }

    /// A copy of the current values.
    pub fn get(&self) -> HeldState {
        *self.0.lock()
    }

    /// Changes the held values.
    pub fn update(&self, f: impl FnOnce(&mut HeldState)) {
        f(&mut self.0.lock());
    }
}

/// The caller's side of a light added to a layer.
///
/// Changes made here take effect at the next
/// [`LightLayer::detach`](crate::LightLayer::detach).
#[derive(Clone, Debug)]
pub struct LightHandle {
    id: LightId,
    held: Held,
}

impl LightHandle {
    pub(crate) fn new(id: LightId, held: Held) -> Self {
        LightHandle { id, held }
    }

    /// The light this handle controls.
    pub fn id(&self) -> LightId {
        self.id
    }

    /// The held values, including changes not yet transferred.
    pub fn held(&self) -> HeldState {
        self.held.get()
    }

    /// Moves the light.
    pub fn set_position(&self, position: Point) {
        self.held.update(|h| h.position = position);
    }

    /// Points the light at `rads`.
    pub fn set_angle(&self, rads: f64) {
        self.held.update(|h| h.angle = rads.rem_euclid(TAU));
    }

    /// Turns the light by `rads`.
    pub fn rotate_by(&self, rads: f64) {
        self.held.update(|h| h.angle = (h.angle + rads).rem_euclid(TAU));
    }

    /// Points the light at `degrees`.
    pub fn set_degrees(&self, degrees: f64) {
        self.set_angle(degrees.to_radians());
    }

    /// Turns the light by `degrees`.
    pub fn rotate_by_degrees(&self, degrees: f64) {
        self.rotate_by(degrees.to_radians());
    }

    /// Changes the light's color.
    pub fn set_color(&self, color: Color) {
        self.held.update(|h| h.color = color);
    }
}

/// The layer-wide surfaces and scale that lights draw with.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DrawContext {
    /// The shared light map.
    pub light_map: SurfaceId,
    /// The mask multiplied over each point light's surface.
    pub mask: SurfaceId,
    /// The mask's pixel size.
    pub mask_size: (u32, u32),
    /// Light-map pixels per scene unit.
    pub scale: f64,
}

/// A light that can be scheduled on a [`LightLayer`](crate::LightLayer).
pub trait LightSource: Send {
    /// The light's held-value storage.
    fn held(&self) -> &Held;

    /// Copies the held values into the ones the next frame will use.
    fn transfer_held(&mut self);

    /// Snapshots the occluders relevant to this light.
    fn create_shade_points(&mut self, occluders: &Occluders);

    /// Sweeps the snapshot.
    fn map_shade_points(&mut self) -> SweepStats;

    /// Renders the sweep onto the light's own surface, if it has one.
    fn draw_local(&mut self, canvas: &mut dyn Canvas, ctx: &DrawContext);

    /// Adds the light's contribution onto `ctx.light_map`.
    fn draw_to_map(&self, canvas: &mut dyn Canvas, ctx: &DrawContext);
}

/// A point light lighting a square around itself.
#[derive(Clone, Debug)]
pub struct RadialLight {
    held: Held,
    current: HeldState,
    sweep: RadialSweep,
    surface: Option<SurfaceId>,
}

impl RadialLight {
    /// A light reaching `radius` scene units in each axis direction.
    pub fn new(radius: f64, color: Color) -> Result<Self, Error> {
        if !radius.is_finite() || radius <= BOUND_INSET {
            return Err(Error::InvalidRadius(radius));
        }
        let current = HeldState::new(color);
        Ok(RadialLight {
            held: Held::new(current),
            current,
            sweep: RadialSweep::new(radius),
            surface: None,
        })
    }

    /// The half-width of the lit square.
    pub fn radius(&self) -> f64 {
        self.sweep.radius()
    }

    /// The values in effect for the current frame.
    pub fn current(&self) -> HeldState {
        self.current
    }

    /// The last sweep's output, relative to the light.
    pub fn draw_points(&self) -> &DrawPoints {
        self.sweep.draw_points()
    }

    fn side(&self, scale: f64) -> u32 {
        (2.0 * self.radius() * scale).ceil() as u32
    }

    /// Maps light-local coordinates to the light's surface.
    fn to_surface(&self, scale: f64) -> Affine {
        let r = self.radius() * scale;
        Affine::translate((r, r)) * Affine::scale(scale)
    }
}

impl LightSource for RadialLight {
    fn held(&self) -> &Held {
        &self.held
    }

    fn transfer_held(&mut self) {
        self.current = self.held.get();
    }

    fn create_shade_points(&mut self, occluders: &Occluders) {
        self.sweep.snapshot(self.current.position, occluders.lines());
    }

    fn map_shade_points(&mut self) -> SweepStats {
        self.sweep.run()
    }

    fn draw_local(&mut self, canvas: &mut dyn Canvas, ctx: &DrawContext) {
        let side = self.side(ctx.scale);
        let surface = *self
            .surface
            .get_or_insert_with(|| canvas.create_surface(side, side));
        canvas.clear(surface, Color::TRANSPARENT);

        let to_surface = self.to_surface(ctx.scale);
        let center = to_surface * Point::ZERO;
        for line in self.sweep.draw_points().lines() {
            canvas.fill_polygon(
                surface,
                &[center, to_surface * line.p0, to_surface * line.p1],
                self.current.color,
                BlendMode::Replace,
            );
        }

        let (mask_w, mask_h) = ctx.mask_size;
        if mask_w > 0 && mask_h > 0 {
            let fit = Affine::scale_non_uniform(
                f64::from(side) / f64::from(mask_w),
                f64::from(side) / f64::from(mask_h),
            );
            canvas.composite(ctx.mask, surface, fit, BlendMode::Multiply);
        }
    }

    fn draw_to_map(&self, canvas: &mut dyn Canvas, ctx: &DrawContext) {
        let Some(surface) = self.surface else {
            return;
        };
        let r = self.radius();
        let corner = (self.current.position - Vec2::new(r, r)).to_vec2() * ctx.scale;
        canvas.composite(surface, ctx.light_map, Affine::translate(corner), BlendMode::Add);
    }
}

/// Corners this close to a beam edge are already covered by the edge itself.
const CORNER_SLACK: f64 = 1e-9;

/// A point light that only shines within `spread` radians of its angle.
#[derive(Clone, Debug)]
pub struct ConeLight {
    inner: RadialLight,
    spread: f64,
}

impl ConeLight {
    /// A flashlight reaching `radius`, with a beam `spread` radians wide.
    ///
    /// Spreads of a full turn or more light everything around, like a
    /// [`RadialLight`].
    pub fn new(radius: f64, spread: f64, color: Color) -> Result<Self, Error> {
        if !spread.is_finite() {
            return Err(Error::NonFinite);
        }
        Ok(ConeLight {
            inner: RadialLight::new(radius, color)?,
            spread: spread.clamp(0.0, TAU),
        })
    }

    /// The beam width, in radians.
    pub fn spread(&self) -> f64 {
        self.spread
    }

    /// The underlying point light.
    pub fn radial(&self) -> &RadialLight {
        &self.inner
    }

    /// The unlit part of the light's square, as a fan from the light,
    /// in light-local coordinates.
    fn dark_region(&self) -> ArrayVec<Point, 8> {
        let mut poly = ArrayVec::new();
        let r = self.inner.radius();
        let dark = TAU - self.spread;
        if dark <= 0.0 {
            return poly;
        }
        let start = self.inner.current.angle + self.spread / 2.0;
        let square_hit = |theta: f64| {
            let dir = Vec2::from_angle(theta);
            (dir * (r / dir.x.abs().max(dir.y.abs()))).to_point()
        };

        let mut corners: ArrayVec<(f64, Point), 4> = (0..4)
            .map(|k| {
                let theta = TAU / 8.0 + k as f64 * TAU / 4.0;
                ((theta - start).rem_euclid(TAU), square_hit(theta))
            })
            .filter(|&(rel, _)| rel > CORNER_SLACK && rel < dark - CORNER_SLACK)
            .collect();
        corners.sort_by(|a, b| a.0.total_cmp(&b.0));

        poly.push(Point::ZERO);
        poly.push(square_hit(start));
        poly.extend(corners.into_iter().map(|(_, p)| p));
        poly.push(square_hit(start + dark));
        poly
    }
}

impl LightSource for ConeLight {
    fn held(&self) -> &Held {
        self.inner.held()
    }

    fn transfer_held(&mut self) {
        self.inner.transfer_held();
    }

    fn create_shade_points(&mut self, occluders: &Occluders) {
        self.inner.create_shade_points(occluders);
    }

    fn map_shade_points(&mut self) -> SweepStats {
        self.inner.map_shade_points()
    }

    fn draw_local(&mut self, canvas: &mut dyn Canvas, ctx: &DrawContext) {
        self.inner.draw_local(canvas, ctx);
        let dark = self.dark_region();
        if let (Some(surface), false) = (self.inner.surface, dark.is_empty()) {
            let to_surface = self.inner.to_surface(ctx.scale);
            let points: ArrayVec<Point, 8> = dark.iter().map(|p| to_surface * *p).collect();
            canvas.fill_polygon(surface, &points, Color::TRANSPARENT, BlendMode::Replace);
        }
    }

    fn draw_to_map(&self, canvas: &mut dyn Canvas, ctx: &DrawContext) {
        self.inner.draw_to_map(canvas, ctx);
    }
}

/// Light falling straight down from above the whole scene.
///
/// Its position and angle are ignored.
#[derive(Clone, Debug)]
pub struct SunLight {
    held: Held,
    current: HeldState,
    sweep: LinearSweep,
    y_offset: f64,
}

impl SunLight {
    /// Sunlight over a `width` by `height` scene.
    ///
    /// `y_offset` is added to the height of everything the light hits, so
    /// light can spill a little way down the faces of occluders.
    pub fn new(width: f64, height: f64, y_offset: f64, color: Color) -> Result<Self, Error> {
        if !(width.is_finite() && height.is_finite() && width > 0.0 && height > 0.0) {
            return Err(Error::InvalidDimensions { width, height });
        }
        if !y_offset.is_finite() {
            return Err(Error::NonFinite);
        }
        let current = HeldState::new(color);
        Ok(SunLight {
            held: Held::new(current),
            current,
            sweep: LinearSweep::new(width, height),
            y_offset,
        })
    }

    /// Sunlight covering a layer's whole target.
    pub fn for_layer(config: &LayerConfig, y_offset: f64, color: Color) -> Result<Self, Error> {
        SunLight::new(
            f64::from(config.width),
            f64::from(config.height),
            y_offset,
            color,
        )
    }

    /// How far below each hit the light reaches.
    pub fn y_offset(&self) -> f64 {
        self.y_offset
    }

    /// The last sweep's output, in scene coordinates.
    pub fn draw_points(&self) -> &DrawPoints {
        self.sweep.draw_points()
    }
}

impl LightSource for SunLight {
    fn held(&self) -> &Held {
        &self.held
    }

    fn transfer_held(&mut self) {
        self.current = self.held.get();
    }

    fn create_shade_points(&mut self, occluders: &Occluders) {
        self.sweep.snapshot(occluders.lines(), occluders.above_spans());
    }

    fn map_shade_points(&mut self) -> SweepStats {
        self.sweep.run()
    }

    fn draw_local(&mut self, _canvas: &mut dyn Canvas, _ctx: &DrawContext) {}

    fn draw_to_map(&self, canvas: &mut dyn Canvas, ctx: &DrawContext) {
        let s = ctx.scale;
        let color = self.current.color;
        for line in self.sweep.draw_points().lines() {
            let (x0, y0) = (line.p0.x * s, (line.p0.y + self.y_offset) * s);
            let (x1, y1) = (line.p1.x * s, (line.p1.y + self.y_offset) * s);
            if line.p0.y == line.p1.y {
                canvas.fill_rect(ctx.light_map, Rect::new(x0, 0.0, x1, y0), color, BlendMode::Add);
            } else {
                canvas.fill_polygon(
                    ctx.light_map,
                    &[
                        Point::new(x0, 0.0),
                        Point::new(x0, y0),
                        Point::new(x1, y1),
                        Point::new(x1, 0.0),
                    ],
                    color,
                    BlendMode::Add,
                );
            }
        }
    }
}

/// The angle of `p` about a light, for callers aiming cone lights.
pub fn bearing(from: Point, to: Point) -> f64 {
    geom::angle_of(to - from)
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use kurbo::Line;

    use super::*;
    use crate::canvas::{Command, Recording};

    fn context(canvas: &mut Recording) -> DrawContext {
        let mask = canvas.load_surface("light.png").unwrap();
        DrawContext {
            light_map: canvas.create_surface(800, 600),
            mask,
            mask_size: canvas.surface_size(mask).unwrap(),
            scale: 0.5,
        }
    }

    fn occluders(lines: &[Line]) -> Occluders {
        let mut occluders = Occluders::new();
        for line in lines {
            occluders.insert_line(*line).unwrap();
        }
        occluders
    }

    #[test]
    fn rejects_bad_parameters() {
        assert_matches!(RadialLight::new(0.0, Color::WHITE), Err(Error::InvalidRadius(_)));
        assert_matches!(RadialLight::new(f64::NAN, Color::WHITE), Err(Error::InvalidRadius(_)));
        assert_matches!(ConeLight::new(100.0, f64::INFINITY, Color::WHITE), Err(Error::NonFinite));
        assert_matches!(
            SunLight::new(0.0, 600.0, 0.0, Color::WHITE),
            Err(Error::InvalidDimensions { .. })
        );
    }

    #[test]
    fn held_values_wait_for_transfer() {
        let mut light = RadialLight::new(100.0, Color::WHITE).unwrap();
        let handle = LightHandle::new(LightId(0), light.held().clone());
        handle.set_position(Point::new(50.0, 60.0));
        handle.rotate_by_degrees(450.0);
        assert_eq!(light.current().position, Point::ZERO);

        light.transfer_held();
        assert_eq!(light.current().position, Point::new(50.0, 60.0));
        assert!((light.current().angle - TAU / 4.0).abs() < 1e-12);
    }

    #[test]
    fn radial_draws_a_fan() {
        let mut canvas = Recording::new().with_asset("light.png", 256, 256);
        let ctx = context(&mut canvas);
        let mut light = RadialLight::new(100.0, Color::WHITE).unwrap();
        light.held().update(|h| h.position = Point::new(200.0, 200.0));
        light.transfer_held();

        light.create_shade_points(&occluders(&[Line::new((210.0, 200.0), (210.0, 250.0))]));
        light.map_shade_points();
        canvas.take_commands();
        light.draw_local(&mut canvas, &ctx);
        light.draw_to_map(&mut canvas, &ctx);

        let commands = canvas.take_commands();
        assert_matches!(commands[0], Command::CreateSurface { width: 100, height: 100, .. });
        let triangles: Vec<_> = commands
            .iter()
            .filter_map(|c| match c {
                Command::FillPolygon { points, .. } => Some(points.clone()),
                _ => None,
            })
            .collect();
        assert_eq!(triangles.len(), 6);
        // The first triangle is the lit sliver in front of the occluder,
        // scaled by half and centered on the surface.
        assert_eq!(triangles[0][0], Point::new(50.0, 50.0));
        assert!((triangles[0][1] - Point::new(55.0, 50.0)).hypot() < 1e-9);
        assert!((triangles[0][2] - Point::new(55.0, 75.0)).hypot() < 1e-9);

        assert_matches!(
            commands[commands.len() - 2],
            Command::Composite { blend: BlendMode::Multiply, .. }
        );
        let Command::Composite { dst, transform, blend, .. } = commands[commands.len() - 1] else {
            panic!("expected a composite, got {commands:?}");
        };
        assert_eq!(dst, ctx.light_map);
        assert_eq!(blend, BlendMode::Add);
        assert_eq!(transform, Affine::translate((50.0, 50.0)));
    }

    #[test]
    fn cone_clears_outside_the_beam() {
        let mut light = ConeLight::new(100.0, TAU / 4.0, Color::WHITE).unwrap();
        let dark = light.dark_region();
        // The beam edges land on two corners, leaving two more in between.
        assert_eq!(dark.len(), 5);
        assert_eq!(dark[0], Point::ZERO);
        assert!((dark[1] - Point::new(100.0, 100.0)).hypot() < 1e-9);
        assert!((dark[2] - Point::new(-100.0, 100.0)).hypot() < 1e-9);
        assert!((dark[4] - Point::new(100.0, -100.0)).hypot() < 1e-9);

        light.held().update(|h| h.angle = TAU / 8.0);
        light.transfer_held();
        let dark = light.dark_region();
        // Center, two beam edges, and the three corners the beam misses.
        assert_eq!(dark.len(), 6);
        assert!((dark[1] - Point::new(0.0, 100.0)).hypot() < 1e-9);
        assert!((dark[5] - Point::new(100.0, 0.0)).hypot() < 1e-9);

        let full = ConeLight::new(100.0, 7.0, Color::WHITE).unwrap();
        assert!(full.dark_region().is_empty());
    }

    #[test]
    fn sun_draws_columns() {
        let mut canvas = Recording::new().with_asset("light.png", 256, 256);
        let mut ctx = context(&mut canvas);
        ctx.scale = 1.0;
        let mut light = SunLight::new(800.0, 600.0, 5.0, Color::WHITE).unwrap();
        light.create_shade_points(&occluders(&[Line::new((100.0, 50.0), (200.0, 100.0))]));
        light.map_shade_points();
        canvas.take_commands();
        light.draw_to_map(&mut canvas, &ctx);

        let commands = canvas.take_commands();
        assert_eq!(commands.len(), 3);
        assert_matches!(
            &commands[0],
            Command::FillRect { rect, blend: BlendMode::Add, .. } if *rect == Rect::new(-400.0, 0.0, 100.0, 1005.0)
        );
        assert_matches!(
            &commands[1],
            Command::FillPolygon { points, .. } if points[1] == Point::new(100.0, 55.0) && points[2] == Point::new(200.0, 105.0)
        );
        assert_matches!(&commands[2], Command::FillRect { .. });
    }

    #[test]
    fn bearings() {
        assert!((bearing(Point::new(1.0, 1.0), Point::new(1.0, 5.0)) - TAU / 4.0).abs() < 1e-12);
    }
}
