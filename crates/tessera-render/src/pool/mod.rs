//! Cache-aware draw batching.
//!
//! Producers emit primitives into a [`Pool`] through the [`PoolManager`];
//! the pool coalesces them into few [`DrawCall`]s, layered by floor and draw
//! order, and replays them into a [`Rasterizer`](crate::Rasterizer). Pools
//! marked cached keep their content between frames; producers holding a
//! [`DrawBuffer`] re-emit identical content for free.

mod buffer;
mod call;
mod coords;
mod draw_pool;
mod framed;
mod hash;
mod manager;
mod method;
mod state;
mod types;

pub use buffer::{DrawBuffer, DrawBufferRef};
pub use call::{DrawCall, Geometry, GeometryCall, Methods};
pub use coords::{CoordsBuffer, Vertex};
pub use draw_pool::Pool;
pub use framed::{DrawHook, FramedTarget, PoolKind};
pub use hash::{hash_combine, state_hash};
pub use manager::{PoolManager, PoolScope};
pub use method::DrawMethod;
pub use state::{Action, PaintState, StateChanges};
pub use types::{
    AddOutcome, CallLocation, DrawOrder, DrawPoolType, FLOORS, FrameStats, MAX_Z, ORDERS,
    PoolPhase, PoolStats,
};
