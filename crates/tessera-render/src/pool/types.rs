use std::fmt;

use crate::error::PoolError;

/// Highest floor index a pool can address.
pub const MAX_Z: usize = 15;

/// Number of floors per pool.
pub const FLOORS: usize = MAX_Z + 1;

/// Number of draw orders per floor.
pub const ORDERS: usize = DrawOrder::ALL.len();

/// The fixed set of pools, in composition order.
///
/// Pools are composited onto the final surface in the order of this
/// enumeration: the map first, then creature information, light, text and
/// finally the foreground UI.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum DrawPoolType {
    Map = 0,
    CreatureInformation = 1,
    Light = 2,
    Text = 3,
    Foreground = 4,
}

impl DrawPoolType {
    pub const ALL: [DrawPoolType; 5] = [
        DrawPoolType::Map,
        DrawPoolType::CreatureInformation,
        DrawPoolType::Light,
        DrawPoolType::Text,
        DrawPoolType::Foreground,
    ];

    pub const COUNT: usize = Self::ALL.len();

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn name(self) -> &'static str {
        match self {
            DrawPoolType::Map => "map",
            DrawPoolType::CreatureInformation => "creature_information",
            DrawPoolType::Light => "light",
            DrawPoolType::Text => "text",
            DrawPoolType::Foreground => "foreground",
        }
    }
}

impl fmt::Display for DrawPoolType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl TryFrom<u8> for DrawPoolType {
    type Error = PoolError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::ALL
            .get(value as usize)
            .copied()
            .ok_or(PoolError::UnknownPoolType(value))
    }
}

/// Sub-layer within a floor. Lower orders are replayed first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub enum DrawOrder {
    #[default]
    First = 0,
    Second = 1,
    Third = 2,
    Fourth = 3,
    Fifth = 4,
}

impl DrawOrder {
    pub const ALL: [DrawOrder; 5] = [
        DrawOrder::First,
        DrawOrder::Second,
        DrawOrder::Third,
        DrawOrder::Fourth,
        DrawOrder::Fifth,
    ];

    pub fn index(self) -> usize {
        self as usize
    }
}

/// Where a pool stands in its frame cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PoolPhase {
    /// Never begun a frame.
    #[default]
    Idle,
    /// Content was cleared at frame start and is being re-emitted.
    Rebuilding,
    /// Content from the previous build is kept; emissions are expected to hit the cache.
    ReplayCached,
    /// Content has been submitted to the rasterizer this frame.
    Flushed,
}

/// Result of a single `add`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddOutcome {
    /// The draw buffer already holds this exact content; nothing changed.
    Cached,
    /// The method was appended to an existing call.
    Merged,
    /// A new call was opened.
    Opened,
    /// Nothing was recorded: the pool is disabled or the geometry is empty.
    Skipped,
}

/// Address of a call inside a pool, stamped with the pool epoch it belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CallLocation {
    pub epoch: u64,
    pub floor: usize,
    pub order: DrawOrder,
    pub index: usize,
}

/// Per-frame emission counters of one pool.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PoolStats {
    /// Calls opened.
    pub opened: u32,
    /// Methods merged into an existing call.
    pub merged: u32,
    /// Emissions elided by a valid draw buffer.
    pub cached: u32,
    /// Calls replayed into the rasterizer by the last `submit`.
    pub submitted: u32,
    /// State changes actually pushed to the rasterizer by the last `submit`.
    pub state_changes: u32,
}

impl PoolStats {
    pub fn record(&mut self, outcome: AddOutcome) {
        match outcome {
            AddOutcome::Cached => self.cached += 1,
            AddOutcome::Merged => self.merged += 1,
            AddOutcome::Opened => self.opened += 1,
            AddOutcome::Skipped => {}
        }
    }
}

/// Aggregate statistics of one `PoolManager::draw`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameStats {
    /// Pools composited onto the surface.
    pub pools_drawn: u32,
    /// Framed pools whose offscreen target was re-rendered.
    pub framebuffers_rendered: u32,
    /// Framed pools composited from an unchanged target.
    pub framebuffers_reused: u32,
    pub calls_submitted: u32,
    pub state_changes: u32,
}

impl fmt::Display for FrameStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} pools, {} calls, {} state changes, {} targets rendered, {} reused",
            self.pools_drawn,
            self.calls_submitted,
            self.state_changes,
            self.framebuffers_rendered,
            self.framebuffers_reused
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pool_type_round_trip_through_u8() {
        for ty in DrawPoolType::ALL {
            assert_eq!(DrawPoolType::try_from(ty as u8).ok(), Some(ty));
        }
    }

    #[test]
    fn test_unknown_pool_type_rejected() {
        assert_eq!(
            DrawPoolType::try_from(5),
            Err(PoolError::UnknownPoolType(5))
        );
    }

    #[test]
    fn test_floor_constants() {
        assert_eq!(FLOORS, 16);
        assert_eq!(ORDERS, 5);
    }

    #[test]
    fn test_stats_record() {
        let mut stats = PoolStats::default();
        stats.record(AddOutcome::Opened);
        stats.record(AddOutcome::Merged);
        stats.record(AddOutcome::Merged);
        assert_eq!(stats.opened, 1);
        assert_eq!(stats.merged, 2);
        assert_eq!(stats.cached, 0);
    }
}
