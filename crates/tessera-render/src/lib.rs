//! Tessera Render
//!
//! Layered, cache-aware draw batching between a retained scene and an
//! immediate-mode rasterizer.
//!
//! ```
//! use std::rc::Rc;
//! use tessera_core::geometry::Rect;
//! use tessera_core::time::SystemClock;
//! use tessera_render::{Color, DrawPoolType, PoolConfig, PoolManager};
//!
//! let mut pools = PoolManager::new(&PoolConfig::default(), Rc::new(SystemClock::new()));
//! pools.begin_frame();
//! pools.select(DrawPoolType::Text);
//! pools.add_filled_rect(Rect::new(0, 0, 32, 8), Color::BLACK, None).unwrap();
//! pools.add_filled_rect(Rect::new(0, 8, 32, 8), Color::BLACK, None).unwrap();
//! // Both rects share one call.
//! assert_eq!(pools.pool(DrawPoolType::Text).call_count(), 1);
//! ```

pub mod blend;
pub mod color;
pub mod config;
pub mod error;
pub mod framebuffer;
pub mod pool;
pub mod raster;
pub mod texture;

pub use blend::{BlendEquation, CompositionMode};
pub use color::Color;
pub use config::{PoolConfig, PoolSettings};
pub use error::PoolError;
pub use framebuffer::{FRAMEBUFFER_FORMAT, Framebuffer, FramebufferBuilder};
pub use pool::{
    AddOutcome, CoordsBuffer, DrawBuffer, DrawBufferRef, DrawCall, DrawMethod, DrawOrder,
    DrawPoolType, FrameStats, PaintState, Pool, PoolManager, PoolScope, Vertex,
};
pub use raster::{DrawMode, FramebufferId, RasterError, Rasterizer};
pub use texture::{ShaderId, ShaderProgram, Texture, TextureId};
