//! The cast set: every segment the sweep line currently crosses.
//!
//! Membership is per segment, not per endpoint, so inserting either end of a
//! segment twice (or removing a segment that isn't there) does nothing.
//! Iteration order only depends on the sequence of inserts and removes.

use crate::shade_point::{PointIdx, ShadePoints};

/// The set of segments crossing the current sweep position.
#[derive(Clone, Debug, Default)]
pub struct CastSet {
    members: Vec<PointIdx>,
    // Position in `members`, indexed by segment slot.
    slots: Vec<Option<usize>>,
}

impl CastSet {
    /// Empties the set and sizes it for `points`.
    pub fn reset(&mut self, points: &ShadePoints) {
        self.members.clear();
        self.slots.clear();
        self.slots.resize(points.len(), None);
    }

    /// Adds the segment that `p` belongs to.
    pub fn insert(&mut self, points: &ShadePoints, p: PointIdx) {
        let slot = &mut self.slots[points.slot(p)];
        if slot.is_none() {
            *slot = Some(self.members.len());
            self.members.push(p);
        }
    }

    /// Removes the segment that `p` belongs to.
    pub fn remove(&mut self, points: &ShadePoints, p: PointIdx) {
        if let Some(pos) = self.slots[points.slot(p)].take() {
            self.members.swap_remove(pos);
            if let Some(&moved) = self.members.get(pos) {
                self.slots[points.slot(moved)] = Some(pos);
            }
        }
    }

    /// Applies the visit of `p`: its segment joins if it continues ahead of
    /// the sweep and leaves otherwise.
    pub fn update(&mut self, points: &ShadePoints, p: PointIdx, opening: bool) {
        if opening {
            self.insert(points, p);
        } else {
            self.remove(points, p);
        }
    }

    /// Is `p`'s segment a member?
    pub fn contains(&self, points: &ShadePoints, p: PointIdx) -> bool {
        self.slots
            .get(points.slot(p))
            .is_some_and(|slot| slot.is_some())
    }

    /// One endpoint of each member segment: whichever endpoint inserted it.
    pub fn iter(&self) -> impl Iterator<Item = PointIdx> + '_ {
        self.members.iter().copied()
    }

    /// The number of member segments.
    pub fn len(&self) -> usize {
        self.members.len()
    }

    /// Is the set empty?
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}
