//! Test utilities for Tessera.
//!
//! - [`MockRasterizer`] records every rasterizer call instead of touching a GPU.
//! - [`ManualClock`] is a clock tests advance by hand, for refresh timers.
//!
//! # Example
//!
//! ```rust
//! use std::rc::Rc;
//! use tessera_core::geometry::Rect;
//! use tessera_render::{Color, DrawPoolType, PoolConfig, PoolManager};
//! use tessera_test_utils::{ManualClock, MockRasterizer};
//!
//! let raster = MockRasterizer::new();
//! let mut pools = PoolManager::new(&PoolConfig::default(), Rc::new(ManualClock::new()));
//! pools.init(&raster).unwrap();
//!
//! pools.begin_frame();
//! pools.select(DrawPoolType::Text);
//! pools.add_filled_rect(Rect::new(0, 0, 4, 4), Color::RED, None).unwrap();
//! pools.draw(&raster);
//!
//! assert_eq!(raster.count_draws(), 1);
//! ```

mod clock;
mod mock_raster;

pub use clock::ManualClock;
pub use mock_raster::{MockRasterizer, RasterCall};
