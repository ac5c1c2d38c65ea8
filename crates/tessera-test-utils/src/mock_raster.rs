//! Mock implementation of `Rasterizer` for testing.
//!
//! The mock records every call it receives, hands out framebuffer ids, and
//! can be told to fail framebuffer allocation.

use glam::Mat3;
use parking_lot::Mutex;
use tessera_core::geometry::{Rect, Size};
use tessera_render::{
    BlendEquation, Color, CompositionMode, CoordsBuffer, DrawMode, FramebufferId, RasterError,
    Rasterizer, ShaderId, ShaderProgram, Texture, TextureId,
};

/// Records a rasterizer call for verification in tests.
#[derive(Debug, Clone, PartialEq)]
pub enum RasterCall {
    SetTransform(Mat3),
    SetColor(Color),
    SetOpacity(f32),
    SetBlend(CompositionMode, BlendEquation),
    SetClipRect(Option<Rect<i32>>),
    BindShader(Option<ShaderId>),
    BindTexture(Option<TextureId>),
    DrawCoords {
        vertices: usize,
        indices: usize,
        mode: DrawMode,
    },
    CreateFramebuffer {
        id: FramebufferId,
        size: Size<u32>,
    },
    ResizeFramebuffer {
        id: FramebufferId,
        size: Size<u32>,
    },
    SetFramebufferSmooth {
        id: FramebufferId,
        smooth: bool,
    },
    BindFramebuffer {
        id: FramebufferId,
        clear: Option<Color>,
    },
    ReleaseFramebuffer(FramebufferId),
    DrawFramebuffer {
        id: FramebufferId,
        dest: Rect<i32>,
        src: Rect<i32>,
    },
    DestroyFramebuffer(FramebufferId),
}

impl RasterCall {
    /// Whether this call changes paint state.
    pub fn is_state_change(&self) -> bool {
        matches!(
            self,
            RasterCall::SetTransform(_)
                | RasterCall::SetColor(_)
                | RasterCall::SetOpacity(_)
                | RasterCall::SetBlend(..)
                | RasterCall::SetClipRect(_)
                | RasterCall::BindShader(_)
                | RasterCall::BindTexture(_)
        )
    }
}

/// Mock implementation of `Rasterizer` for testing.
///
/// Methods take `&self`, so the call log lives behind a `Mutex`.
///
/// # Example
///
/// ```rust
/// use tessera_core::geometry::Size;
/// use tessera_render::Rasterizer;
/// use tessera_test_utils::MockRasterizer;
///
/// let mock = MockRasterizer::new();
/// mock.set_fail_framebuffer_allocation(true);
/// assert!(mock.create_framebuffer(Size::new(64, 64)).is_err());
/// ```
pub struct MockRasterizer {
    /// Recorded calls for verification
    calls: Mutex<Vec<RasterCall>>,

    live_framebuffers: Mutex<Vec<FramebufferId>>,
    next_framebuffer_id: Mutex<u32>,
    fail_framebuffer_allocation: Mutex<bool>,
    max_framebuffer_dimension: u32,
}

impl MockRasterizer {
    /// Largest framebuffer dimension accepted by default.
    pub const DEFAULT_MAX_DIMENSION: u32 = 8192;

    pub fn new() -> Self {
        Self::with_max_dimension(Self::DEFAULT_MAX_DIMENSION)
    }

    /// A mock that rejects framebuffers larger than `max_dimension`.
    pub fn with_max_dimension(max_dimension: u32) -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            live_framebuffers: Mutex::new(Vec::new()),
            next_framebuffer_id: Mutex::new(1),
            fail_framebuffer_allocation: Mutex::new(false),
            max_framebuffer_dimension: max_dimension,
        }
    }

    /// Make every following `create_framebuffer` fail with `OutOfMemory`.
    pub fn set_fail_framebuffer_allocation(&self, fail: bool) {
        *self.fail_framebuffer_allocation.lock() = fail;
    }

    /// Get a copy of all recorded calls (for test assertions).
    pub fn calls(&self) -> Vec<RasterCall> {
        self.calls.lock().clone()
    }

    /// Clear recorded calls (useful between frames).
    pub fn clear_calls(&self) {
        self.calls.lock().clear();
    }

    /// Get total number of recorded calls.
    pub fn call_count(&self) -> usize {
        self.calls.lock().len()
    }

    pub fn count(&self, predicate: impl Fn(&RasterCall) -> bool) -> usize {
        self.calls.lock().iter().filter(|call| predicate(call)).count()
    }

    /// Count `draw_coords` calls.
    pub fn count_draws(&self) -> usize {
        self.count(|call| matches!(call, RasterCall::DrawCoords { .. }))
    }

    pub fn count_state_changes(&self) -> usize {
        self.count(RasterCall::is_state_change)
    }

    pub fn count_framebuffer_binds(&self) -> usize {
        self.count(|call| matches!(call, RasterCall::BindFramebuffer { .. }))
    }

    pub fn count_framebuffer_draws(&self) -> usize {
        self.count(|call| matches!(call, RasterCall::DrawFramebuffer { .. }))
    }

    /// Framebuffers created and not yet destroyed.
    pub fn live_framebuffers(&self) -> Vec<FramebufferId> {
        self.live_framebuffers.lock().clone()
    }

    fn record(&self, call: RasterCall) {
        self.calls.lock().push(call);
    }

    fn check_size(&self, size: Size<u32>) -> Result<(), RasterError> {
        if !size.is_valid()
            || size.width > self.max_framebuffer_dimension
            || size.height > self.max_framebuffer_dimension
        {
            return Err(RasterError::InvalidSize {
                size,
                max_dimension: self.max_framebuffer_dimension,
            });
        }
        Ok(())
    }
}

impl Default for MockRasterizer {
    fn default() -> Self {
        Self::new()
    }
}

impl Rasterizer for MockRasterizer {
    fn set_transform(&self, transform: &Mat3) {
        self.record(RasterCall::SetTransform(*transform));
    }

    fn set_color(&self, color: Color) {
        self.record(RasterCall::SetColor(color));
    }

    fn set_opacity(&self, opacity: f32) {
        self.record(RasterCall::SetOpacity(opacity));
    }

    fn set_blend(&self, mode: CompositionMode, equation: BlendEquation) {
        self.record(RasterCall::SetBlend(mode, equation));
    }

    fn set_clip_rect(&self, clip: Option<Rect<i32>>) {
        self.record(RasterCall::SetClipRect(clip));
    }

    fn bind_shader(&self, shader: Option<&ShaderProgram>) {
        self.record(RasterCall::BindShader(shader.map(ShaderProgram::id)));
    }

    fn bind_texture(&self, texture: Option<&Texture>) {
        self.record(RasterCall::BindTexture(texture.map(Texture::id)));
    }

    fn draw_coords(&self, coords: &CoordsBuffer, mode: DrawMode) {
        self.record(RasterCall::DrawCoords {
            vertices: coords.vertex_count(),
            indices: coords.index_count(),
            mode,
        });
    }

    fn create_framebuffer(&self, size: Size<u32>) -> Result<FramebufferId, RasterError> {
        if *self.fail_framebuffer_allocation.lock() {
            return Err(RasterError::OutOfMemory { requested: size });
        }
        self.check_size(size)?;

        let id = {
            let mut next = self.next_framebuffer_id.lock();
            let id = FramebufferId(*next);
            *next += 1;
            id
        };
        self.live_framebuffers.lock().push(id);
        self.record(RasterCall::CreateFramebuffer { id, size });
        Ok(id)
    }

    fn resize_framebuffer(&self, id: FramebufferId, size: Size<u32>) -> Result<(), RasterError> {
        if !self.live_framebuffers.lock().contains(&id) {
            return Err(RasterError::UnknownFramebuffer(id));
        }
        self.check_size(size)?;
        self.record(RasterCall::ResizeFramebuffer { id, size });
        Ok(())
    }

    fn set_framebuffer_smooth(&self, id: FramebufferId, smooth: bool) {
        self.record(RasterCall::SetFramebufferSmooth { id, smooth });
    }

    fn bind_framebuffer(&self, id: FramebufferId, clear: Option<Color>) {
        self.record(RasterCall::BindFramebuffer { id, clear });
    }

    fn release_framebuffer(&self, id: FramebufferId) {
        self.record(RasterCall::ReleaseFramebuffer(id));
    }

    fn draw_framebuffer(&self, id: FramebufferId, dest: Rect<i32>, src: Rect<i32>) {
        self.record(RasterCall::DrawFramebuffer { id, dest, src });
    }

    fn destroy_framebuffer(&self, id: FramebufferId) {
        self.live_framebuffers.lock().retain(|live| *live != id);
        self.record(RasterCall::DestroyFramebuffer(id));
    }
}
