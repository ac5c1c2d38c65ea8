//! Producer-owned cache slots.
//!
//! A `DrawBuffer` lets a producer that re-emits the same content every frame
//! skip the work. The buffer remembers the sequence of content hashes it was
//! last built with; while the producer replays that sequence against an
//! unchanged pool, every `add` is a no-op.

use std::cell::RefCell;
use std::rc::Rc;

use tessera_core::geometry::Pos;

use crate::pool::coords::CoordsBuffer;
use crate::pool::types::{CallLocation, DrawOrder};

/// Shared handle to a [`DrawBuffer`], held by the producer and by the calls
/// built through it.
pub type DrawBufferRef = Rc<RefCell<DrawBuffer>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Identity {
    Invalid,
    Temporary,
    Valid,
}

/// Where one recorded emission landed: its call and its method slot in it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Placement {
    pub location: CallLocation,
    pub slot: usize,
}

#[derive(Debug)]
pub struct DrawBuffer {
    identity: Identity,
    agroup: bool,
    order: DrawOrder,
    reference: Option<Pos<i32>>,
    hashes: Vec<u64>,
    /// Parallel to `hashes`.
    placements: Vec<Placement>,
    cursor: usize,
    /// Pool frame the cursor belongs to.
    frame: u64,
    coords: CoordsBuffer,
    coords_for: Option<CallLocation>,
}

impl DrawBuffer {
    pub fn new(order: DrawOrder) -> Self {
        Self {
            identity: Identity::Invalid,
            agroup: true,
            order,
            reference: None,
            hashes: Vec::new(),
            placements: Vec::new(),
            cursor: 0,
            frame: 0,
            coords: CoordsBuffer::new(),
            coords_for: None,
        }
    }

    /// A one-frame scratch slot. Never cached.
    pub fn temporary(order: DrawOrder) -> Self {
        Self {
            identity: Identity::Temporary,
            ..Self::new(order)
        }
    }

    pub fn shared(self) -> DrawBufferRef {
        Rc::new(RefCell::new(self))
    }

    pub fn is_temporary(&self) -> bool {
        self.identity == Identity::Temporary
    }

    pub fn is_valid(&self) -> bool {
        self.identity == Identity::Valid
    }

    /// Check the buffer against the producer's reference point.
    ///
    /// A changed reference drops everything the buffer recorded and returns
    /// `false`; otherwise returns [`is_valid`](Self::is_valid).
    pub fn validate(&mut self, reference: Pos<i32>) -> bool {
        if self.reference != Some(reference) {
            self.reference = Some(reference);
            self.invalidate();
            return false;
        }
        self.is_valid()
    }

    /// Forget the recorded content.
    pub fn invalidate(&mut self) {
        if self.identity != Identity::Temporary {
            self.identity = Identity::Invalid;
        }
        self.hashes.clear();
        self.placements.clear();
        self.cursor = 0;
        self.coords.clear();
        self.coords_for = None;
    }

    pub fn agroup(&self) -> bool {
        self.agroup
    }

    /// Buffers with `agroup` unset never take the replay fast path.
    pub fn set_agroup(&mut self, agroup: bool) {
        self.agroup = agroup;
    }

    pub fn order(&self) -> DrawOrder {
        self.order
    }

    pub fn set_order(&mut self, order: DrawOrder) {
        self.order = order;
    }

    pub fn reference(&self) -> Option<Pos<i32>> {
        self.reference
    }

    /// Hash sequence of the last build.
    pub fn hashes(&self) -> &[u64] {
        &self.hashes
    }

    /// Location of the call the last recorded emission went into.
    pub fn anchor(&self) -> Option<CallLocation> {
        self.placements.last().map(|placement| placement.location)
    }

    /// Geometry cached for the anchored call, possibly empty.
    pub fn coords(&self) -> &CoordsBuffer {
        &self.coords
    }

    /// Rewind the replay cursor when a new pool frame starts using the buffer.
    pub(crate) fn enter_frame(&mut self, frame: u64) {
        if self.frame != frame {
            self.frame = frame;
            self.cursor = 0;
        }
    }

    /// Whether the next expected emission is `hash` and its call still exists.
    pub(crate) fn is_replaying(&self, hash: u64, epoch: u64) -> bool {
        self.agroup
            && self.is_valid()
            && self.hashes.get(self.cursor) == Some(&hash)
            && self
                .placements
                .get(self.cursor)
                .is_some_and(|placement| placement.location.epoch == epoch)
    }

    pub(crate) fn cursor(&self) -> usize {
        self.cursor
    }

    pub(crate) fn placement(&self, entry: usize) -> Option<Placement> {
        self.placements.get(entry).copied()
    }

    pub(crate) fn advance(&mut self) {
        self.cursor += 1;
    }

    /// Point an already recorded emission at the call it was moved to.
    pub(crate) fn relocate(&mut self, entry: usize, placement: Placement) {
        if let Some(slot) = self.placements.get_mut(entry) {
            *slot = placement;
        }
        self.coords.clear();
        self.coords_for = None;
    }

    /// Record a freshly built emission, discarding the stale tail of the
    /// sequence.
    pub(crate) fn record(&mut self, hash: u64, placement: Placement) {
        self.coords.clear();
        self.coords_for = None;
        if self.is_temporary() {
            return;
        }

        self.hashes.truncate(self.cursor);
        self.placements.truncate(self.cursor);
        self.hashes.push(hash);
        self.placements.push(placement);
        self.cursor += 1;
        self.identity = Identity::Valid;
    }

    /// Cached geometry for the call at `location`, rebuilt with `build` when
    /// missing or built for another call.
    pub(crate) fn coords_for(
        &mut self,
        location: CallLocation,
        build: impl FnOnce(&mut CoordsBuffer),
    ) -> &CoordsBuffer {
        if self.is_temporary() || self.coords_for != Some(location) || self.coords.is_empty() {
            self.coords.clear();
            build(&mut self.coords);
            self.coords_for = Some(location);
        }
        &self.coords
    }
}

impl Default for DrawBuffer {
    fn default() -> Self {
        Self::new(DrawOrder::First)
    }
}
