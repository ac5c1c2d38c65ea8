//! Tessera Core
//!
//! Shared building blocks for the Tessera draw pool: integer geometry,
//! math re-exports, hashed collections, logging, profiling and frame clocks.

pub mod alloc;
pub mod geometry;
pub mod logging;
pub mod math;
pub mod profiling;
pub mod time;
