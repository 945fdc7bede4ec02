//! The shared scene: line occluders, overhead blockers and groups of occluders.

use std::{collections::BTreeMap, sync::Arc};

use kurbo::{Line, Point, Vec2};
use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::{geom, Error};

/// Identifies an occluder within its [`Occluders`] collection.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct OccluderId(pub usize);

/// Identifies an [`AboveBlocker`] within its [`Occluders`] collection.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct AboveBlockerId(pub usize);

/// A line segment that blocks light.
///
/// Each endpoint is `anchor + offset + rotation`, where the rotation part is
/// whatever turning the endpoint about some pivot added to it. Moving the
/// anchor keeps the rotation, so a rotated group can be dragged around.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Occluder {
    anchor: Point,
    offsets: [Vec2; 2],
    rotation: [Vec2; 2],
}

impl Occluder {
    /// An occluder whose endpoints sit at `anchor + ep0` and `anchor + ep1`.
    pub fn new(anchor: Point, ep0: Vec2, ep1: Vec2) -> Self {
        Occluder {
            anchor,
            offsets: [ep0, ep1],
            rotation: [Vec2::ZERO; 2],
        }
    }

    /// An occluder covering `line`, anchored at the origin.
    pub fn from_line(line: Line) -> Self {
        Occluder::new(Point::ZERO, line.p0.to_vec2(), line.p1.to_vec2())
    }

    /// The segment in global coordinates.
    pub fn line(&self) -> Line {
        let ep = |i: usize| self.anchor + self.offsets[i] + self.rotation[i];
        Line::new(ep(0), ep(1))
    }

    /// The point that the endpoint offsets are relative to.
    pub fn anchor(&self) -> Point {
        self.anchor
    }

    /// Moves the occluder, keeping its shape and rotation.
    pub fn set_position(&mut self, anchor: Point) {
        self.anchor = anchor;
    }

    /// Sets the rotation to `rads` about `pivot`, which is relative to the anchor.
    ///
    /// This replaces any earlier rotation rather than adding to it.
    pub fn set_rotation(&mut self, pivot: Vec2, rads: f64) {
        for (offset, rotation) in self.offsets.iter().zip(&mut self.rotation) {
            let rotated = geom::rotate(*offset - pivot, rads) + pivot;
            *rotation = rotated - *offset;
        }
    }

    fn is_finite(&self) -> bool {
        let line = self.line();
        line.p0.is_finite() && line.p1.is_finite()
    }
}

/// A horizontal blocker for overhead light, at a fixed height above the scene.
///
/// It covers `x + ep0 ..= x + ep1`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AboveBlocker {
    /// Horizontal position.
    pub x: f64,
    /// Left endpoint offset.
    pub ep0: f64,
    /// Right endpoint offset.
    pub ep1: f64,
}

impl AboveBlocker {
    /// A blocker covering `x0..=x1`.
    pub fn spanning(x0: f64, x1: f64) -> Self {
        AboveBlocker {
            x: 0.0,
            ep0: x0,
            ep1: x1,
        }
    }

    /// Moves the blocker horizontally.
    pub fn set_x(&mut self, x: f64) {
        self.x = x;
    }

    /// The covered horizontal range, in global coordinates.
    pub fn span(&self) -> (f64, f64) {
        (self.x + self.ep0, self.x + self.ep1)
    }
}

/// Every occluder in a scene.
///
/// Iteration order is insertion order, which keeps sweeps deterministic.
#[derive(Clone, Debug, Default)]
pub struct Occluders {
    next_occluder: usize,
    occluders: BTreeMap<OccluderId, Occluder>,
    next_above: usize,
    above: BTreeMap<AboveBlockerId, AboveBlocker>,
}

impl Occluders {
    /// An empty scene.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an occluder, rejecting non-finite endpoints.
    pub fn insert(&mut self, occluder: Occluder) -> Result<OccluderId, Error> {
        if !occluder.is_finite() {
            return Err(Error::NonFinite);
        }
        let id = OccluderId(self.next_occluder);
        self.next_occluder += 1;
        self.occluders.insert(id, occluder);
        Ok(id)
    }

    /// Adds an occluder covering `line`.
    pub fn insert_line(&mut self, line: Line) -> Result<OccluderId, Error> {
        self.insert(Occluder::from_line(line))
    }

    /// Adds the four sides of the `width` by `height` box whose top-left corner
    /// is at `anchor`.
    pub fn insert_box(
        &mut self,
        anchor: Point,
        width: f64,
        height: f64,
    ) -> Result<[OccluderId; 4], Error> {
        let corners = [
            Vec2::ZERO,
            Vec2::new(width, 0.0),
            Vec2::new(width, height),
            Vec2::new(0.0, height),
        ];
        let mut ids = [OccluderId(0); 4];
        for (i, id) in ids.iter_mut().enumerate() {
            *id = self.insert(Occluder::new(anchor, corners[i], corners[(i + 1) % 4]))?;
        }
        Ok(ids)
    }

    /// Removes an occluder, returning it if it was present.
    pub fn remove(&mut self, id: OccluderId) -> Option<Occluder> {
        self.occluders.remove(&id)
    }

    /// Looks up an occluder.
    pub fn get(&self, id: OccluderId) -> Option<&Occluder> {
        self.occluders.get(&id)
    }

    /// Looks up an occluder for modification.
    pub fn get_mut(&mut self, id: OccluderId) -> Option<&mut Occluder> {
        self.occluders.get_mut(&id)
    }

    /// The number of line occluders.
    pub fn len(&self) -> usize {
        self.occluders.len()
    }

    /// Are there no line occluders?
    pub fn is_empty(&self) -> bool {
        self.occluders.is_empty()
    }

    /// All occluder segments, in global coordinates.
    pub fn lines(&self) -> impl Iterator<Item = Line> + '_ {
        self.occluders.values().map(Occluder::line)
    }

    /// Adds an overhead blocker.
    pub fn insert_above(&mut self, blocker: AboveBlocker) -> Result<AboveBlockerId, Error> {
        let (x0, x1) = blocker.span();
        if !x0.is_finite() || !x1.is_finite() {
            return Err(Error::NonFinite);
        }
        let id = AboveBlockerId(self.next_above);
        self.next_above += 1;
        self.above.insert(id, blocker);
        Ok(id)
    }

    /// Removes an overhead blocker.
    pub fn remove_above(&mut self, id: AboveBlockerId) -> Option<AboveBlocker> {
        self.above.remove(&id)
    }

    /// Looks up an overhead blocker for modification.
    pub fn above_mut(&mut self, id: AboveBlockerId) -> Option<&mut AboveBlocker> {
        self.above.get_mut(&id)
    }

    /// The horizontal spans of every overhead blocker.
    pub fn above_spans(&self) -> impl Iterator<Item = (f64, f64)> + '_ {
        self.above.values().map(AboveBlocker::span)
    }
}

/// A handle to the occluders shared by every light.
///
/// Workers take the read lock while they copy endpoints; the owning thread
/// takes the write lock between frames.
#[derive(Clone, Debug, Default)]
pub struct Scene {
    inner: Arc<RwLock<Occluders>>,
}

impl Scene {
    /// An empty scene.
    pub fn new() -> Self {
        Self::default()
    }

    /// Shared access.
    pub fn read(&self) -> RwLockReadGuard<'_, Occluders> {
        self.inner.read()
    }

    /// Exclusive access. Don't hold this across a frame boundary: workers
    /// block on it while snapshotting.
    pub fn write(&self) -> RwLockWriteGuard<'_, Occluders> {
        self.inner.write()
    }
}

/// A set of occluders that move and rotate together.
#[derive(Clone, Debug)]
pub struct OccluderGroup {
    scene: Scene,
    ids: Vec<OccluderId>,
    anchor: Point,
    pivot: Vec2,
    rads: f64,
}

impl OccluderGroup {
    /// An empty group anchored at `anchor`.
    pub fn new(scene: Scene, anchor: Point) -> Self {
        OccluderGroup {
            scene,
            ids: Vec::new(),
            anchor,
            pivot: Vec2::ZERO,
            rads: 0.0,
        }
    }

    /// A group holding the outline of a `width` by `height` box, pivoting about its center.
    pub fn new_box(scene: Scene, anchor: Point, width: f64, height: f64) -> Result<Self, Error> {
        let mut group = OccluderGroup::new(scene, anchor);
        group.add_rect(width, height)?;
        group.center_pivot();
        Ok(group)
    }

    /// Adds the four sides of a `width` by `height` box with its corner at the anchor.
    pub fn add_rect(&mut self, width: f64, height: f64) -> Result<[OccluderId; 4], Error> {
        Ok([
            self.add_line(Vec2::ZERO, Vec2::new(width, 0.0))?,
            self.add_line(Vec2::new(width, 0.0), Vec2::new(width, height))?,
            self.add_line(Vec2::new(width, height), Vec2::new(0.0, height))?,
            self.add_line(Vec2::new(0.0, height), Vec2::ZERO)?,
        ])
    }

    /// Adds a segment, with endpoints relative to the group's anchor.
    pub fn add_line(&mut self, ep0: Vec2, ep1: Vec2) -> Result<OccluderId, Error> {
        let mut occluder = Occluder::new(self.anchor, ep0, ep1);
        occluder.set_rotation(self.pivot, self.rads);
        let id = self.scene.write().insert(occluder)?;
        self.ids.push(id);
        Ok(id)
    }

    /// The members of this group.
    pub fn ids(&self) -> &[OccluderId] {
        &self.ids
    }

    /// Sets the rotation pivot, relative to the anchor. Takes effect on the next rotation.
    pub fn set_pivot(&mut self, pivot: Vec2) {
        self.pivot = pivot;
    }

    /// Pivots about the average of the members' endpoint offsets.
    pub fn center_pivot(&mut self) {
        let scene = self.scene.read();
        let offsets: Vec<Vec2> = self
            .ids
            .iter()
            .filter_map(|id| scene.get(*id))
            .flat_map(|occ| occ.offsets)
            .collect();
        drop(scene);
        if !offsets.is_empty() {
            let sum = offsets.iter().fold(Vec2::ZERO, |acc, v| acc + *v);
            self.pivot = sum / offsets.len() as f64;
        }
    }

    /// Moves every member.
    pub fn set_position(&mut self, anchor: Point) {
        self.anchor = anchor;
        let mut scene = self.scene.write();
        for id in &self.ids {
            if let Some(occluder) = scene.get_mut(*id) {
                occluder.set_position(anchor);
            }
        }
    }

    /// Rotates every member to `rads` about the pivot.
    pub fn set_rotation(&mut self, rads: f64) {
        self.rads = rads;
        let mut scene = self.scene.write();
        for id in &self.ids {
            if let Some(occluder) = scene.get_mut(*id) {
                occluder.set_rotation(self.pivot, rads);
            }
        }
    }

    /// Rotates by `rads` relative to the current rotation.
    pub fn rotate_by(&mut self, rads: f64) {
        self.set_rotation(self.rads + rads);
    }

    /// Rotates every member to `degrees` about the pivot.
    pub fn set_degrees(&mut self, degrees: f64) {
        self.set_rotation(degrees.to_radians());
    }

    /// Rotates by `degrees` relative to the current rotation.
    pub fn rotate_by_degrees(&mut self, degrees: f64) {
        self.rotate_by(degrees.to_radians());
    }

    /// The current rotation, in radians.
    pub fn rotation(&self) -> f64 {
        self.rads
    }

    /// Takes every member out of the scene.
    pub fn remove_all(&mut self) {
        let mut scene = self.scene.write();
        for id in self.ids.drain(..) {
            scene.remove(id);
        }
    }
}
