use std::fmt;

use tessera_core::geometry::{Rect, Size};

use crate::color::Color;
use crate::framebuffer::Framebuffer;
use crate::raster::{RasterError, Rasterizer};

/// Hook run around the composite of a framed pool.
pub type DrawHook = Box<dyn FnMut(&dyn Rasterizer)>;

/// Offscreen state of a framed pool.
pub struct FramedTarget {
    framebuffer: Option<Framebuffer>,
    size: Size<u32>,
    smooth: bool,
    clear_color: Color,
    dest: Option<Rect<i32>>,
    src: Option<Rect<i32>>,
    before_draw: Option<DrawHook>,
    after_draw: Option<DrawHook>,
    /// The target holds the content of the latest build.
    rendered: bool,
}

impl FramedTarget {
    pub fn new(size: Size<u32>, smooth: bool) -> Self {
        Self {
            framebuffer: None,
            size,
            smooth,
            clear_color: Color::ALPHA,
            dest: None,
            src: None,
            before_draw: None,
            after_draw: None,
            rendered: false,
        }
    }

    pub fn framebuffer(&self) -> Option<&Framebuffer> {
        self.framebuffer.as_ref()
    }

    pub fn size(&self) -> Size<u32> {
        self.size
    }

    pub fn is_smooth(&self) -> bool {
        self.smooth
    }

    pub fn clear_color(&self) -> Color {
        self.clear_color
    }

    pub fn set_clear_color(&mut self, color: Color) {
        self.clear_color = color;
    }

    pub fn set_composite_rects(&mut self, dest: Rect<i32>, src: Rect<i32>) {
        self.dest = Some(dest);
        self.src = Some(src);
    }

    pub fn on_before_draw(&mut self, hook: impl FnMut(&dyn Rasterizer) + 'static) {
        self.before_draw = Some(Box::new(hook));
    }

    pub fn on_after_draw(&mut self, hook: impl FnMut(&dyn Rasterizer) + 'static) {
        self.after_draw = Some(Box::new(hook));
    }

    pub(crate) fn allocate(&mut self, raster: &dyn Rasterizer) -> Result<(), RasterError> {
        if self.framebuffer.is_some() {
            return Ok(());
        }

        let framebuffer = Framebuffer::builder(self.size)
            .smooth(self.smooth)
            .build(raster)?;
        self.framebuffer = Some(framebuffer);
        self.rendered = false;
        Ok(())
    }

    pub(crate) fn resize(
        &mut self,
        raster: &dyn Rasterizer,
        size: Size<u32>,
    ) -> Result<(), RasterError> {
        if let Some(framebuffer) = &mut self.framebuffer {
            framebuffer.resize(raster, size)?;
        }
        if self.size != size {
            self.rendered = false;
        }
        self.size = size;
        Ok(())
    }

    pub(crate) fn set_smooth(&mut self, raster: &dyn Rasterizer, smooth: bool) {
        self.smooth = smooth;
        if let Some(framebuffer) = &mut self.framebuffer {
            framebuffer.set_smooth(raster, smooth);
        }
    }

    pub(crate) fn is_rendered(&self) -> bool {
        self.rendered
    }

    pub(crate) fn mark_rendered(&mut self) {
        self.rendered = true;
    }

    pub(crate) fn release(&mut self, raster: &dyn Rasterizer) {
        if let Some(framebuffer) = self.framebuffer.take() {
            framebuffer.destroy(raster);
        }
        self.rendered = false;
    }

    /// Whole target unless composite rects were set.
    fn composite_rects(&self) -> (Rect<i32>, Rect<i32>) {
        let full = Rect::new(0, 0, self.size.width as i32, self.size.height as i32);
        (self.dest.unwrap_or(full), self.src.unwrap_or(full))
    }

    /// Draw the target onto the current surface between the hooks.
    pub(crate) fn composite(&mut self, raster: &dyn Rasterizer) -> bool {
        let Some(id) = self.framebuffer.as_ref().map(Framebuffer::id) else {
            return false;
        };

        if let Some(hook) = &mut self.before_draw {
            hook(raster);
        }
        let (dest, src) = self.composite_rects();
        raster.draw_framebuffer(id, dest, src);
        if let Some(hook) = &mut self.after_draw {
            hook(raster);
        }
        true
    }
}

impl fmt::Debug for FramedTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FramedTarget")
            .field("framebuffer", &self.framebuffer)
            .field("size", &self.size)
            .field("smooth", &self.smooth)
            .field("clear_color", &self.clear_color)
            .field("dest", &self.dest)
            .field("src", &self.src)
            .field("rendered", &self.rendered)
            .finish_non_exhaustive()
    }
}

/// Whether a pool draws straight to the surface or through an offscreen target.
#[derive(Debug)]
pub enum PoolKind {
    Plain,
    Framed(FramedTarget),
}
