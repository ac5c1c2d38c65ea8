//! Ownership and frame orchestration of the fixed pool set.

use std::ops::{Deref, DerefMut};
use std::rc::Rc;
use std::sync::Arc;

use glam::Mat3;
use tessera_core::geometry::{Pos, Rect, Size};
use tessera_core::profiling::{self, profile_function, profile_scope};
use tessera_core::time::{Clock, SystemClock};

use crate::blend::{BlendEquation, CompositionMode};
use crate::color::Color;
use crate::config::PoolConfig;
use crate::error::PoolError;
use crate::framebuffer::Framebuffer;
use crate::pool::buffer::DrawBufferRef;
use crate::pool::coords::CoordsBuffer;
use crate::pool::draw_pool::Pool;
use crate::pool::state::Action;
use crate::pool::types::{AddOutcome, DrawOrder, DrawPoolType, FrameStats, PoolPhase};
use crate::raster::Rasterizer;
use crate::texture::{ShaderProgram, Texture};

/// Owns one [`Pool`] per [`DrawPoolType`] and routes emissions to the
/// selected one.
///
/// # Frame cycle
///
/// ```text
/// begin_frame()            every enabled pool rebuilds or keeps its content
/// select(type) / scope()   producers emit into the selected pool
/// draw(raster)             framed pools that rebuilt re-render offscreen,
///                          then every enabled pool is composited in
///                          DrawPoolType order
/// ```
pub struct PoolManager {
    pools: [Pool; DrawPoolType::COUNT],
    active: Option<DrawPoolType>,
    clock: Rc<dyn Clock>,
    last_stats: FrameStats,
}

impl PoolManager {
    pub fn new(config: &PoolConfig, clock: Rc<dyn Clock>) -> Self {
        let pools = std::array::from_fn(|index| {
            let pool_type = DrawPoolType::ALL[index];
            Pool::new(pool_type, config.get(pool_type), clock.clone())
        });

        Self {
            pools,
            active: None,
            clock,
            last_stats: FrameStats::default(),
        }
    }

    pub fn with_system_clock(config: &PoolConfig) -> Self {
        Self::new(config, Rc::new(SystemClock::new()))
    }

    /// Allocate the offscreen targets of framed pools.
    ///
    /// A pool whose target cannot be allocated is disabled; the others are
    /// still initialized. The first failure is returned.
    pub fn init(&mut self, raster: &dyn Rasterizer) -> Result<(), PoolError> {
        let mut first_error = None;
        for pool in &mut self.pools {
            if let Err(err) = pool.allocate_target(raster) {
                first_error.get_or_insert(err);
            }
        }

        match first_error {
            Some(err) => Err(err),
            None => {
                tracing::info!("Draw pools initialized");
                Ok(())
            }
        }
    }

    /// Free every offscreen target.
    pub fn terminate(&mut self, raster: &dyn Rasterizer) {
        for pool in &mut self.pools {
            pool.release_target(raster);
        }
        self.active = None;
        tracing::debug!("Draw pools terminated");
    }

    pub fn clock(&self) -> &dyn Clock {
        self.clock.as_ref()
    }

    pub fn pool(&self, pool_type: DrawPoolType) -> &Pool {
        &self.pools[pool_type.index()]
    }

    pub fn pool_mut(&mut self, pool_type: DrawPoolType) -> &mut Pool {
        &mut self.pools[pool_type.index()]
    }

    pub fn pools(&self) -> impl Iterator<Item = &Pool> {
        self.pools.iter()
    }

    // Selection

    pub fn select(&mut self, pool_type: DrawPoolType) {
        self.active = Some(pool_type);
    }

    pub fn deselect(&mut self) {
        self.active = None;
    }

    pub fn active(&self) -> Option<DrawPoolType> {
        self.active
    }

    pub fn active_pool(&mut self) -> Result<&mut Pool, PoolError> {
        let pool_type = self.active.ok_or(PoolError::NoActivePool)?;
        Ok(&mut self.pools[pool_type.index()])
    }

    /// Select `pool_type` until the returned guard is dropped, then restore
    /// the previous selection.
    ///
    /// ```
    /// # use tessera_render::{Color, PoolConfig, PoolManager, DrawPoolType};
    /// # use tessera_core::geometry::Rect;
    /// let mut manager = PoolManager::with_system_clock(&PoolConfig::default());
    /// manager.begin_frame();
    /// {
    ///     let mut text = manager.scope(DrawPoolType::Text);
    ///     text.add_filled_rect(Rect::new(0, 0, 8, 8), Color::WHITE, None);
    /// }
    /// assert_eq!(manager.active(), None);
    /// ```
    pub fn scope(&mut self, pool_type: DrawPoolType) -> PoolScope<'_> {
        let previous = self.active.replace(pool_type);
        PoolScope {
            manager: self,
            pool_type,
            previous,
        }
    }

    pub fn set_enabled(&mut self, pool_type: DrawPoolType, enabled: bool) {
        self.pool_mut(pool_type).set_enabled(enabled);
    }

    pub fn repaint(&mut self, pool_type: DrawPoolType) {
        self.pool_mut(pool_type).repaint();
    }

    pub fn resize(
        &mut self,
        pool_type: DrawPoolType,
        raster: &dyn Rasterizer,
        size: Size<u32>,
    ) -> Result<(), PoolError> {
        self.pool_mut(pool_type).resize(raster, size)
    }

    // Delegation to the active pool

    pub fn flush(&mut self) -> Result<(), PoolError> {
        self.active_pool()?.flush();
        Ok(())
    }

    pub fn set_draw_order(&mut self, order: DrawOrder) -> Result<(), PoolError> {
        self.active_pool()?.set_draw_order(order);
        Ok(())
    }

    pub fn set_floor(&mut self, floor: usize) -> Result<(), PoolError> {
        self.active_pool()?.set_floor(floor);
        Ok(())
    }

    pub fn set_transform_matrix(&mut self, transform: Mat3, on_last: bool) -> Result<(), PoolError> {
        self.active_pool()?.set_transform_matrix(transform, on_last);
        Ok(())
    }

    pub fn set_color(&mut self, color: Color, on_last: bool) -> Result<(), PoolError> {
        self.active_pool()?.set_color(color, on_last);
        Ok(())
    }

    pub fn set_opacity(&mut self, opacity: f32, on_last: bool) -> Result<(), PoolError> {
        self.active_pool()?.set_opacity(opacity, on_last);
        Ok(())
    }

    pub fn set_composition_mode(
        &mut self,
        mode: CompositionMode,
        on_last: bool,
    ) -> Result<(), PoolError> {
        self.active_pool()?.set_composition_mode(mode, on_last);
        Ok(())
    }

    pub fn set_blend_equation(
        &mut self,
        equation: BlendEquation,
        on_last: bool,
    ) -> Result<(), PoolError> {
        self.active_pool()?.set_blend_equation(equation, on_last);
        Ok(())
    }

    pub fn set_clip_rect(&mut self, clip_rect: Option<Rect<i32>>, on_last: bool) -> Result<(), PoolError> {
        self.active_pool()?.set_clip_rect(clip_rect, on_last);
        Ok(())
    }

    pub fn set_shader_program(
        &mut self,
        shader: Option<Arc<ShaderProgram>>,
        on_last: bool,
        action: Option<Action>,
    ) -> Result<(), PoolError> {
        self.active_pool()?.set_shader_program(shader, on_last, action);
        Ok(())
    }

    pub fn reset_state(&mut self) -> Result<(), PoolError> {
        self.active_pool()?.reset_state();
        Ok(())
    }

    pub fn opacity(&mut self, last_drawing: bool) -> Result<f32, PoolError> {
        Ok(self.active_pool()?.opacity(last_drawing))
    }

    pub fn clip_rect(&mut self, last_drawing: bool) -> Result<Option<Rect<i32>>, PoolError> {
        Ok(self.active_pool()?.clip_rect(last_drawing))
    }

    pub fn push_transform_matrix(&mut self) -> Result<(), PoolError> {
        self.active_pool()?.push_transform_matrix();
        Ok(())
    }

    pub fn pop_transform_matrix(&mut self) -> Result<(), PoolError> {
        self.active_pool()?.pop_transform_matrix();
        Ok(())
    }

    pub fn translate(&mut self, x: f32, y: f32) -> Result<(), PoolError> {
        self.active_pool()?.translate(x, y);
        Ok(())
    }

    pub fn rotate(&mut self, center: Pos<i32>, radians: f32) -> Result<(), PoolError> {
        self.active_pool()?.rotate(center, radians);
        Ok(())
    }

    pub fn scale(&mut self, factor: f32) -> Result<(), PoolError> {
        self.active_pool()?.scale(factor);
        Ok(())
    }

    pub fn add_textured_rect(
        &mut self,
        dest: Rect<i32>,
        texture: &Arc<Texture>,
        src: Rect<i32>,
        color: Color,
        draw_buffer: Option<&DrawBufferRef>,
    ) -> Result<AddOutcome, PoolError> {
        Ok(self
            .active_pool()?
            .add_textured_rect(dest, texture, src, color, draw_buffer))
    }

    pub fn add_upside_down_textured_rect(
        &mut self,
        dest: Rect<i32>,
        texture: &Arc<Texture>,
        src: Rect<i32>,
        color: Color,
    ) -> Result<AddOutcome, PoolError> {
        Ok(self
            .active_pool()?
            .add_upside_down_textured_rect(dest, texture, src, color))
    }

    pub fn add_textured_repeated_rect(
        &mut self,
        dest: Rect<i32>,
        texture: &Arc<Texture>,
        src: Rect<i32>,
        color: Color,
        draw_buffer: Option<&DrawBufferRef>,
    ) -> Result<AddOutcome, PoolError> {
        Ok(self
            .active_pool()?
            .add_textured_repeated_rect(dest, texture, src, color, draw_buffer))
    }

    pub fn add_filled_rect(
        &mut self,
        dest: Rect<i32>,
        color: Color,
        draw_buffer: Option<&DrawBufferRef>,
    ) -> Result<AddOutcome, PoolError> {
        Ok(self.active_pool()?.add_filled_rect(dest, color, draw_buffer))
    }

    pub fn add_filled_triangle(
        &mut self,
        a: Pos<i32>,
        b: Pos<i32>,
        c: Pos<i32>,
        color: Color,
    ) -> Result<AddOutcome, PoolError> {
        Ok(self.active_pool()?.add_filled_triangle(a, b, c, color))
    }

    pub fn add_bounding_rect(
        &mut self,
        dest: Rect<i32>,
        color: Color,
        inner_line_width: u16,
    ) -> Result<AddOutcome, PoolError> {
        Ok(self
            .active_pool()?
            .add_bounding_rect(dest, color, inner_line_width))
    }

    pub fn add_textured_coords_buffer(
        &mut self,
        texture: &Arc<Texture>,
        coords: Rc<CoordsBuffer>,
        color: Color,
        draw_buffer: Option<&DrawBufferRef>,
    ) -> Result<AddOutcome, PoolError> {
        Ok(self
            .active_pool()?
            .add_textured_coords_buffer(texture, coords, color, draw_buffer))
    }

    pub fn add_action(
        &mut self,
        action: impl Fn(&dyn Rasterizer) + 'static,
    ) -> Result<(), PoolError> {
        self.active_pool()?.add_action(action);
        Ok(())
    }

    // Frame cycle

    /// Start a frame on every enabled pool and clear the selection.
    pub fn begin_frame(&mut self) {
        profiling::new_frame();
        profile_function!();
        for pool in &mut self.pools {
            if pool.is_enabled() {
                pool.begin_frame();
            }
        }
        self.active = None;
    }

    /// Render and composite every enabled pool.
    pub fn draw(&mut self, raster: &dyn Rasterizer) -> FrameStats {
        profile_function!();
        let mut stats = FrameStats::default();

        for pool in &mut self.pools {
            if !pool.is_enabled() {
                continue;
            }
            let Some(target) = pool.framed() else {
                continue;
            };
            let Some(id) = target.framebuffer().map(Framebuffer::id) else {
                continue;
            };

            if pool.phase() != PoolPhase::Rebuilding && target.is_rendered() {
                stats.framebuffers_reused += 1;
                continue;
            }

            profile_scope!("render_framebuffer");
            raster.bind_framebuffer(id, Some(target.clear_color()));
            stats.calls_submitted += pool.submit(raster);
            stats.state_changes += pool.stats().state_changes;
            raster.release_framebuffer(id);
            if let Some(target) = pool.framed_mut() {
                target.mark_rendered();
            }
            stats.framebuffers_rendered += 1;
        }

        for pool in &mut self.pools {
            if !pool.is_enabled() {
                continue;
            }
            match pool.framed_mut() {
                Some(target) => {
                    if target.composite(raster) {
                        stats.pools_drawn += 1;
                    }
                }
                None => {
                    stats.calls_submitted += pool.submit(raster);
                    stats.state_changes += pool.stats().state_changes;
                    stats.pools_drawn += 1;
                }
            }
        }

        tracing::trace!("Frame drawn: {}", stats);
        self.last_stats = stats;
        stats
    }

    /// Statistics of the last `draw`.
    pub fn last_stats(&self) -> FrameStats {
        self.last_stats
    }
}

/// Scoped selection of one pool. Derefs to the pool; restores the previous
/// selection on drop.
pub struct PoolScope<'a> {
    manager: &'a mut PoolManager,
    pool_type: DrawPoolType,
    previous: Option<DrawPoolType>,
}

impl PoolScope<'_> {
    pub fn pool_type(&self) -> DrawPoolType {
        self.pool_type
    }
}

impl Deref for PoolScope<'_> {
    type Target = Pool;

    fn deref(&self) -> &Pool {
        self.manager.pool(self.pool_type)
    }
}

impl DerefMut for PoolScope<'_> {
    fn deref_mut(&mut self) -> &mut Pool {
        self.manager.pool_mut(self.pool_type)
    }
}

impl Drop for PoolScope<'_> {
    fn drop(&mut self) {
        self.manager.active = self.previous;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manager() -> PoolManager {
        PoolManager::with_system_clock(&PoolConfig::default())
    }

    #[test]
    fn test_emission_without_selection_fails() {
        let mut manager = manager();
        manager.begin_frame();
        assert_eq!(
            manager.add_filled_rect(Rect::new(0, 0, 1, 1), Color::WHITE, None),
            Err(PoolError::NoActivePool)
        );
    }

    #[test]
    fn test_select_routes_emission() {
        let mut manager = manager();
        manager.begin_frame();
        manager.select(DrawPoolType::Text);
        manager
            .add_filled_rect(Rect::new(0, 0, 1, 1), Color::WHITE, None)
            .expect("text pool selected");
        assert_eq!(manager.pool(DrawPoolType::Text).call_count(), 1);
        assert_eq!(manager.pool(DrawPoolType::Map).call_count(), 0);
    }

    #[test]
    fn test_scope_restores_previous_selection() {
        let mut manager = manager();
        manager.select(DrawPoolType::Map);
        {
            let mut scope = manager.scope(DrawPoolType::Foreground);
            assert_eq!(scope.pool_type(), DrawPoolType::Foreground);
            scope.set_opacity(0.5, false);
        }
        assert_eq!(manager.active(), Some(DrawPoolType::Map));
        assert_eq!(manager.pool(DrawPoolType::Foreground).opacity(false), 0.5);
    }

    #[test]
    fn test_begin_frame_clears_selection() {
        let mut manager = manager();
        manager.select(DrawPoolType::Light);
        manager.begin_frame();
        assert_eq!(manager.active(), None);
    }

    #[test]
    fn test_default_pools_framed_as_configured() {
        let manager = manager();
        assert!(manager.pool(DrawPoolType::Map).has_frame_buffer());
        assert!(!manager.pool(DrawPoolType::Text).has_frame_buffer());
        assert_eq!(manager.pools().count(), DrawPoolType::COUNT);
    }
}
