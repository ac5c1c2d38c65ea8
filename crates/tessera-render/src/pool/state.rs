use std::fmt;
use std::rc::Rc;
use std::sync::Arc;

use bitflags::bitflags;
use glam::Mat3;
use tessera_core::geometry::Rect;
use tessera_core::math::mat3_bits;

use crate::blend::{BlendEquation, CompositionMode};
use crate::color::Color;
use crate::raster::Rasterizer;
use crate::texture::{ShaderProgram, Texture};

/// Custom work run against the rasterizer during replay.
pub type Action = Rc<dyn Fn(&dyn Rasterizer)>;

/// The full paint state a draw call is replayed with.
///
/// Equality compares every field except `on_apply`; textures and shaders
/// compare by id.
#[derive(Clone)]
pub struct PaintState {
    pub transform: Mat3,
    pub color: Color,
    pub opacity: f32,
    pub composition_mode: CompositionMode,
    pub blend_equation: BlendEquation,
    pub clip_rect: Option<Rect<i32>>,
    pub texture: Option<Arc<Texture>>,
    pub shader: Option<Arc<ShaderProgram>>,
    /// Runs after the state is applied and before the call's geometry is drawn.
    pub on_apply: Option<Action>,
}

impl Default for PaintState {
    fn default() -> Self {
        Self {
            transform: Mat3::IDENTITY,
            color: Color::WHITE,
            opacity: 1.0,
            composition_mode: CompositionMode::default(),
            blend_equation: BlendEquation::default(),
            clip_rect: None,
            texture: None,
            shader: None,
            on_apply: None,
        }
    }
}

impl fmt::Debug for PaintState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PaintState")
            .field("transform", &self.transform)
            .field("color", &self.color)
            .field("opacity", &self.opacity)
            .field("composition_mode", &self.composition_mode)
            .field("blend_equation", &self.blend_equation)
            .field("clip_rect", &self.clip_rect)
            .field("texture", &self.texture.as_ref().map(|t| t.id()))
            .field("shader", &self.shader.as_ref().map(|s| s.id()))
            .field("on_apply", &self.on_apply.is_some())
            .finish()
    }
}

impl PartialEq for PaintState {
    fn eq(&self, other: &Self) -> bool {
        self.diff(other).is_empty()
    }
}

bitflags! {
    /// State groups that differ between two paint states.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct StateChanges: u8 {
        const TRANSFORM = 1 << 0;
        const COLOR     = 1 << 1;
        const OPACITY   = 1 << 2;
        /// Composition mode or blend equation.
        const BLEND     = 1 << 3;
        const CLIP      = 1 << 4;
        const SHADER    = 1 << 5;
        const TEXTURE   = 1 << 6;
    }
}

impl PaintState {
    pub fn diff(&self, other: &PaintState) -> StateChanges {
        let mut changes = StateChanges::empty();
        if mat3_bits(&self.transform) != mat3_bits(&other.transform) {
            changes |= StateChanges::TRANSFORM;
        }
        if self.color.to_bits() != other.color.to_bits() {
            changes |= StateChanges::COLOR;
        }
        if self.opacity.to_bits() != other.opacity.to_bits() {
            changes |= StateChanges::OPACITY;
        }
        if self.composition_mode != other.composition_mode
            || self.blend_equation != other.blend_equation
        {
            changes |= StateChanges::BLEND;
        }
        if self.clip_rect != other.clip_rect {
            changes |= StateChanges::CLIP;
        }
        if self.shader.as_ref().map(|s| s.id()) != other.shader.as_ref().map(|s| s.id()) {
            changes |= StateChanges::SHADER;
        }
        if self.texture.as_ref().map(|t| t.id()) != other.texture.as_ref().map(|t| t.id()) {
            changes |= StateChanges::TEXTURE;
        }
        changes
    }

    /// Push the selected state groups to the rasterizer.
    pub fn apply(&self, raster: &dyn Rasterizer, changes: StateChanges) {
        if changes.contains(StateChanges::TRANSFORM) {
            raster.set_transform(&self.transform);
        }
        if changes.contains(StateChanges::COLOR) {
            raster.set_color(self.color);
        }
        if changes.contains(StateChanges::OPACITY) {
            raster.set_opacity(self.opacity);
        }
        if changes.contains(StateChanges::BLEND) {
            raster.set_blend(self.composition_mode, self.blend_equation);
        }
        if changes.contains(StateChanges::CLIP) {
            raster.set_clip_rect(self.clip_rect);
        }
        if changes.contains(StateChanges::SHADER) {
            raster.bind_shader(self.shader.as_deref());
        }
        if changes.contains(StateChanges::TEXTURE) {
            raster.bind_texture(self.texture.as_deref());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tessera_core::geometry::Size;

    #[test]
    fn test_equality_ignores_action() {
        let mut a = PaintState::default();
        let b = PaintState::default();
        a.on_apply = Some(Rc::new(|_| {}));
        assert_eq!(a, b);
    }

    #[test]
    fn test_texture_compares_by_identity() {
        let atlas = Texture::new(Size::new(64, 64));
        let other = Texture::new(Size::new(64, 64));

        let mut a = PaintState::default();
        a.texture = Some(atlas.clone());
        let mut b = PaintState::default();
        b.texture = Some(atlas);
        assert_eq!(a, b);

        b.texture = Some(other);
        assert_eq!(a.diff(&b), StateChanges::TEXTURE);
    }

    #[test]
    fn test_diff_collects_groups() {
        let mut a = PaintState::default();
        a.opacity = 0.5;
        a.blend_equation = BlendEquation::Max;
        let changes = a.diff(&PaintState::default());
        assert_eq!(changes, StateChanges::OPACITY | StateChanges::BLEND);
    }
}
