//! The narrow rasterizer interface the draw pools replay into.
//!
//! The pool decides *what* to submit and in which order; a `Rasterizer` owns
//! the GPU side (pipelines, uploads, texture binding). The trait is object
//! safe and takes `&self` so a backend can be shared by the pools and by
//! custom draw actions at the same time.

use std::fmt;

use glam::Mat3;
use tessera_core::geometry::{Rect, Size};

use crate::blend::{BlendEquation, CompositionMode};
use crate::color::Color;
use crate::pool::CoordsBuffer;
use crate::texture::{ShaderProgram, Texture};

/// Primitive assembly for a draw call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum DrawMode {
    /// Indexed triangle list.
    #[default]
    Triangles,
    /// Triangle strip, used for single quads.
    TriangleStrip,
    /// Line list.
    Lines,
}

impl DrawMode {
    /// Whether several methods in this mode can share one call.
    ///
    /// A strip cannot hold two disjoint quads, but a strip call is promoted to
    /// a triangle list when a second method arrives, so both triangle modes
    /// batch.
    pub fn is_batchable(self) -> bool {
        matches!(self, DrawMode::Triangles | DrawMode::TriangleStrip)
    }

    pub fn topology(self) -> wgpu::PrimitiveTopology {
        match self {
            DrawMode::Triangles => wgpu::PrimitiveTopology::TriangleList,
            DrawMode::TriangleStrip => wgpu::PrimitiveTopology::TriangleStrip,
            DrawMode::Lines => wgpu::PrimitiveTopology::LineList,
        }
    }
}

/// Handle to an offscreen target owned by the rasterizer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FramebufferId(pub u32);

/// Errors reported by a rasterizer backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RasterError {
    /// The backend could not allocate a render target of this size.
    OutOfMemory { requested: Size<u32> },

    /// Zero-sized or over-limit target.
    InvalidSize { size: Size<u32>, max_dimension: u32 },

    /// The framebuffer was destroyed or never existed.
    UnknownFramebuffer(FramebufferId),

    /// Backend-specific failure.
    Backend(String),
}

impl fmt::Display for RasterError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RasterError::OutOfMemory { requested } => write!(
                f,
                "Out of memory allocating a {}x{} render target",
                requested.width, requested.height
            ),
            RasterError::InvalidSize {
                size,
                max_dimension,
            } => write!(
                f,
                "Invalid render target size {}x{} (max dimension {})",
                size.width, size.height, max_dimension
            ),
            RasterError::UnknownFramebuffer(id) => write!(f, "Unknown framebuffer {}", id.0),
            RasterError::Backend(msg) => write!(f, "Rasterizer backend error: {}", msg),
        }
    }
}

impl std::error::Error for RasterError {}

/// Immediate-mode rasterizer consumed by the draw pools.
///
/// State setters apply to every following `draw_coords` until changed again.
/// The pool only calls a setter when the value differs from the previous
/// call's, so backends may treat each setter as a real state change.
pub trait Rasterizer {
    fn set_transform(&self, transform: &Mat3);

    fn set_color(&self, color: Color);

    fn set_opacity(&self, opacity: f32);

    fn set_blend(&self, mode: CompositionMode, equation: BlendEquation);

    /// `None` disables scissoring.
    fn set_clip_rect(&self, clip: Option<Rect<i32>>);

    /// `None` selects the backend's default textured/solid program.
    fn bind_shader(&self, shader: Option<&ShaderProgram>);

    /// `None` draws untextured (solid color) geometry.
    fn bind_texture(&self, texture: Option<&Texture>);

    /// Upload `coords` and issue one indexed draw.
    fn draw_coords(&self, coords: &CoordsBuffer, mode: DrawMode);

    // Offscreen targets

    fn create_framebuffer(&self, size: Size<u32>) -> Result<FramebufferId, RasterError>;

    fn resize_framebuffer(&self, id: FramebufferId, size: Size<u32>) -> Result<(), RasterError>;

    fn set_framebuffer_smooth(&self, id: FramebufferId, smooth: bool);

    /// Redirect subsequent draws into the framebuffer, clearing it to `clear` if given.
    fn bind_framebuffer(&self, id: FramebufferId, clear: Option<Color>);

    /// Restore drawing to the previously bound target.
    fn release_framebuffer(&self, id: FramebufferId);

    /// Composite the framebuffer's `src` region onto `dest` of the current target.
    fn draw_framebuffer(&self, id: FramebufferId, dest: Rect<i32>, src: Rect<i32>);

    fn destroy_framebuffer(&self, id: FramebufferId);
}
