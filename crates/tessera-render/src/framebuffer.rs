//! Offscreen render target owned by a framed pool.

use tessera_core::geometry::Size;

use crate::raster::{FramebufferId, RasterError, Rasterizer};

/// Color format of framed pool targets.
pub const FRAMEBUFFER_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8UnormSrgb;

/// An offscreen render target allocated through a [`Rasterizer`].
///
/// The handle is exclusively owned; dropping it does not free the GPU side,
/// call [`Framebuffer::destroy`] for that.
#[derive(Debug)]
pub struct Framebuffer {
    id: FramebufferId,
    size: Size<u32>,
    smooth: bool,
}

impl Framebuffer {
    /// Create a new framebuffer builder.
    pub fn builder(size: Size<u32>) -> FramebufferBuilder {
        FramebufferBuilder::new(size)
    }

    pub fn id(&self) -> FramebufferId {
        self.id
    }

    /// Get the framebuffer size.
    pub fn size(&self) -> Size<u32> {
        self.size
    }

    /// Whether the target is sampled with linear filtering when composited.
    pub fn is_smooth(&self) -> bool {
        self.smooth
    }

    pub fn set_smooth(&mut self, raster: &dyn Rasterizer, smooth: bool) {
        if self.smooth == smooth {
            return;
        }
        self.smooth = smooth;
        raster.set_framebuffer_smooth(self.id, smooth);
    }

    /// Resize the target. A no-op when the size is unchanged.
    pub fn resize(&mut self, raster: &dyn Rasterizer, size: Size<u32>) -> Result<(), RasterError> {
        if self.size == size {
            return Ok(());
        }

        raster.resize_framebuffer(self.id, size)?;
        self.size = size;
        Ok(())
    }

    pub fn destroy(self, raster: &dyn Rasterizer) {
        raster.destroy_framebuffer(self.id);
    }

    /// Texture descriptor a wgpu backend uses to back this target.
    pub fn texture_descriptor(&self) -> wgpu::TextureDescriptor<'static> {
        wgpu::TextureDescriptor {
            label: Some("Draw Pool Framebuffer"),
            size: wgpu::Extent3d {
                width: self.size.width,
                height: self.size.height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: FRAMEBUFFER_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::TEXTURE_BINDING,
            view_formats: &[],
        }
    }
}

/// Builder for creating framebuffers.
pub struct FramebufferBuilder {
    size: Size<u32>,
    smooth: bool,
}

impl FramebufferBuilder {
    pub fn new(size: Size<u32>) -> Self {
        Self { size, smooth: true }
    }

    pub fn smooth(mut self, smooth: bool) -> Self {
        self.smooth = smooth;
        self
    }

    /// Allocate the target. Fails if the rasterizer cannot back it.
    pub fn build(self, raster: &dyn Rasterizer) -> Result<Framebuffer, RasterError> {
        let id = raster.create_framebuffer(self.size)?;
        if !self.smooth {
            raster.set_framebuffer_smooth(id, false);
        }

        tracing::debug!(
            "Allocated framebuffer {} ({}x{})",
            id.0,
            self.size.width,
            self.size.height
        );

        Ok(Framebuffer {
            id,
            size: self.size,
            smooth: self.smooth,
        })
    }
}
