use std::fmt;
use std::rc::Rc;
use std::sync::Arc;
use std::time::Duration;

use glam::{Mat3, Vec2};
use tessera_core::alloc::HashMap;
use tessera_core::geometry::{Pos, Rect, Size};
use tessera_core::profiling::profile_function;
use tessera_core::time::{Clock, Timer};

use crate::blend::{BlendEquation, CompositionMode};
use crate::color::Color;
use crate::config::PoolSettings;
use crate::error::PoolError;
use crate::pool::buffer::{DrawBufferRef, Placement};
use crate::pool::call::{DrawCall, Geometry, GeometryCall, Methods};
use crate::pool::coords::CoordsBuffer;
use crate::pool::framed::{FramedTarget, PoolKind};
use crate::pool::hash::{coords_hash, hash_combine, method_hash, state_hash};
use crate::pool::method::DrawMethod;
use crate::pool::state::{Action, PaintState, StateChanges};
use crate::pool::types::{
    AddOutcome, CallLocation, DrawOrder, DrawPoolType, FLOORS, MAX_Z, ORDERS, PoolPhase,
    PoolStats,
};
use crate::raster::{DrawMode, Rasterizer};
use crate::texture::{ShaderProgram, Texture};

/// Coalescing repaint requests.
///
/// Every `repaint` bumps `requested`; acknowledging catches `built` up, so any
/// number of requests between two acknowledgements causes one rebuild.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct Generation {
    built: u64,
    requested: u64,
}

impl Generation {
    fn is_pending(&self) -> bool {
        self.built != self.requested
    }

    fn request(&mut self) {
        self.requested = self.requested.wrapping_add(1);
    }

    fn acknowledge(&mut self) {
        self.built = self.requested;
    }
}

#[derive(Debug, Clone, Copy)]
struct RefreshTimer {
    delay: Duration,
    timer: Timer,
}

type Buckets = [[Vec<DrawCall>; ORDERS]; FLOORS];

fn empty_buckets() -> Buckets {
    std::array::from_fn(|_| std::array::from_fn(|_| Vec::new()))
}

/// A retained, layered list of draw calls.
///
/// Producers emit into the pool every frame; the pool batches compatible
/// emissions into few calls, skips emissions a
/// [`DrawBuffer`](crate::pool::DrawBuffer) already holds, and replays the
/// result into a [`Rasterizer`]. A cached pool keeps its calls between
/// frames until an emission misses its buffer, which rebuilds the frame from
/// the emissions seen so far.
pub struct Pool {
    pool_type: DrawPoolType,
    kind: PoolKind,
    buckets: Buckets,
    /// State hash to the call equal states group into. Cleared on flush.
    group_index: HashMap<u64, CallLocation>,

    state: PaintState,
    transform_stack: Vec<Mat3>,
    floor: usize,
    order: DrawOrder,
    last: Option<CallLocation>,
    /// Buffer entries served from the cache this frame, in emission order.
    replayed: Vec<(DrawBufferRef, usize)>,

    enabled: bool,
    always_group: bool,
    auto_update: bool,
    generation: Generation,
    refresh: Option<RefreshTimer>,
    clock: Rc<dyn Clock>,

    epoch: u64,
    frame: u64,
    phase: PoolPhase,
    stats: PoolStats,
    scratch: CoordsBuffer,
}

impl Pool {
    pub fn new(pool_type: DrawPoolType, settings: &PoolSettings, clock: Rc<dyn Clock>) -> Self {
        let kind = if settings.framed {
            PoolKind::Framed(FramedTarget::new(settings.initial_size, settings.smooth))
        } else {
            PoolKind::Plain
        };
        let refresh = settings.refresh_delay.map(|delay| RefreshTimer {
            delay,
            timer: Timer::started(clock.as_ref()),
        });

        Self {
            pool_type,
            kind,
            buckets: empty_buckets(),
            group_index: HashMap::new(),
            state: PaintState::default(),
            transform_stack: Vec::new(),
            floor: 0,
            order: DrawOrder::First,
            last: None,
            replayed: Vec::new(),
            enabled: true,
            always_group: settings.always_group,
            auto_update: settings.auto_update,
            // Nothing is built yet: the first frame must rebuild.
            generation: Generation {
                built: 0,
                requested: 1,
            },
            refresh,
            clock,
            epoch: 0,
            frame: 0,
            phase: PoolPhase::Idle,
            stats: PoolStats::default(),
            scratch: CoordsBuffer::new(),
        }
    }

    pub fn pool_type(&self) -> DrawPoolType {
        self.pool_type
    }

    pub fn kind(&self) -> &PoolKind {
        &self.kind
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Disabled pools ignore emissions and are not drawn. Disabling drops
    /// the pool content.
    pub fn set_enabled(&mut self, enabled: bool) {
        if self.enabled != enabled {
            self.enabled = enabled;
            if !enabled {
                self.clear();
            }
            self.repaint();
        }
    }

    pub fn is_auto_update(&self) -> bool {
        self.auto_update
    }

    pub fn phase(&self) -> PoolPhase {
        self.phase
    }

    pub fn stats(&self) -> PoolStats {
        self.stats
    }

    /// Incremented each time the pool content is cleared.
    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    pub fn frame(&self) -> u64 {
        self.frame
    }

    // Cursor

    pub fn floor(&self) -> usize {
        self.floor
    }

    /// Move the floor cursor. Clamped to `MAX_Z`.
    pub fn set_floor(&mut self, floor: usize) {
        self.floor = floor.min(MAX_Z);
    }

    pub fn draw_order(&self) -> DrawOrder {
        self.order
    }

    pub fn set_draw_order(&mut self, order: DrawOrder) {
        self.order = order;
    }

    // Content access

    /// Calls of one bucket in submission order. Empty for floors past `MAX_Z`.
    pub fn bucket(&self, floor: usize, order: DrawOrder) -> &[DrawCall] {
        self.buckets
            .get(floor)
            .map(|orders| orders[order.index()].as_slice())
            .unwrap_or_default()
    }

    pub fn call_count(&self) -> usize {
        self.buckets.iter().flatten().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.call_count() == 0
    }

    /// The call the most recent emission landed in.
    pub fn last_call(&self) -> Option<&DrawCall> {
        self.last_location().and_then(|location| self.call_at(location))
    }

    fn last_location(&self) -> Option<CallLocation> {
        if let Some(last) = self.last.filter(|last| last.epoch == self.epoch) {
            return Some(last);
        }

        let floor = self.floor;
        let order = self.order;
        self.buckets[floor][order.index()]
            .len()
            .checked_sub(1)
            .map(|index| CallLocation {
                epoch: self.epoch,
                floor,
                order,
                index,
            })
    }

    fn call_at(&self, location: CallLocation) -> Option<&DrawCall> {
        if location.epoch != self.epoch {
            return None;
        }
        self.buckets
            .get(location.floor)?
            .get(location.order.index())?
            .get(location.index)
    }

    fn call_at_mut(&mut self, location: CallLocation) -> Option<&mut DrawCall> {
        if location.epoch != self.epoch {
            return None;
        }
        self.buckets
            .get_mut(location.floor)?
            .get_mut(location.order.index())?
            .get_mut(location.index)
    }

    // Emission

    /// Record `geometry` under the pending paint state.
    ///
    /// `color` tints the pending color and `texture` is bound for this
    /// emission only. A valid `draw_buffer` replaying its last build makes
    /// the emission a no-op. Any other emission while the pool replays
    /// cached content turns the frame into a rebuild.
    pub fn add(
        &mut self,
        color: Color,
        texture: Option<&Arc<Texture>>,
        geometry: impl Into<Geometry>,
        mode: DrawMode,
        draw_buffer: Option<&DrawBufferRef>,
    ) -> AddOutcome {
        let geometry = geometry.into();
        if !self.enabled {
            return AddOutcome::Skipped;
        }

        let (content_hash, mode) = match &geometry {
            Geometry::Method(method) => {
                if method.is_empty() {
                    return AddOutcome::Skipped;
                }
                let mode = if mode == DrawMode::TriangleStrip && !method.supports_strip() {
                    DrawMode::Triangles
                } else {
                    mode
                };
                (method_hash(method), mode)
            }
            Geometry::Coords(coords) => {
                if coords.is_empty() {
                    return AddOutcome::Skipped;
                }
                (coords_hash(coords), mode)
            }
        };

        let mut state = self.state.clone();
        state.color = self.state.color * color;
        state.texture = texture.cloned();
        let state_hash = state_hash(&state);
        let hash = hash_combine(state_hash, content_hash);

        if let Some(shared) = draw_buffer {
            let mut buffer = shared.borrow_mut();
            buffer.enter_frame(self.frame);
            let entry = buffer.cursor();
            if buffer.is_replaying(hash, self.epoch)
                && let Some(placement) = buffer.placement(entry)
            {
                buffer.advance();
                drop(buffer);
                self.last = Some(placement.location);
                if self.phase == PoolPhase::ReplayCached {
                    self.replayed.push((shared.clone(), entry));
                }
                self.stats.record(AddOutcome::Cached);
                return AddOutcome::Cached;
            }
        }

        self.rebuild_if_replaying();

        let order = draw_buffer.map_or(self.order, |buffer| buffer.borrow().order());
        let floor = self.floor;
        let (outcome, placement) =
            self.place(state, state_hash, geometry, mode, floor, order, draw_buffer);
        if let Some(buffer) = draw_buffer {
            buffer.borrow_mut().record(hash, placement);
        }

        self.last = Some(placement.location);
        self.stats.record(outcome);
        outcome
    }

    /// Turn a replayed frame into a rebuild: the emissions served from the
    /// cache so far this frame are placed again into emptied buckets, and
    /// everything else of the previous build is dropped.
    fn rebuild_if_replaying(&mut self) {
        if self.phase != PoolPhase::ReplayCached {
            return;
        }
        profile_function!();
        tracing::debug!(
            "Pool '{}' content changed during replay, rebuilding from {} cached emissions",
            self.pool_type,
            self.replayed.len()
        );

        let stale = std::mem::replace(&mut self.buckets, empty_buckets());
        let replayed = std::mem::take(&mut self.replayed);
        self.clear();
        self.phase = PoolPhase::Rebuilding;

        for (buffer, entry) in replayed {
            let Some(previous) = buffer.borrow().placement(entry) else {
                continue;
            };
            let location = previous.location;
            let Some(call) = stale
                .get(location.floor)
                .and_then(|orders| orders.get(location.order.index()))
                .and_then(|calls| calls.get(location.index))
                .and_then(DrawCall::as_geometry)
            else {
                continue;
            };
            let geometry = match &call.coords {
                Some(coords) => Geometry::Coords(coords.clone()),
                None => match call.methods.as_slice().get(previous.slot) {
                    Some(method) => Geometry::Method(*method),
                    None => continue,
                },
            };

            let state = call.state.clone();
            let hash = state_hash(&state);
            let (_, placement) = self.place(
                state,
                hash,
                geometry,
                call.mode,
                location.floor,
                location.order,
                Some(&buffer),
            );
            buffer.borrow_mut().relocate(entry, placement);
            self.last = Some(placement.location);
        }
    }

    /// Merge into a compatible call or open a new one.
    fn place(
        &mut self,
        state: PaintState,
        state_hash: u64,
        geometry: Geometry,
        mode: DrawMode,
        floor: usize,
        order: DrawOrder,
        buffer: Option<&DrawBufferRef>,
    ) -> (AddOutcome, Placement) {
        let epoch = self.epoch;

        if let Geometry::Method(method) = &geometry {
            let candidate = if self.always_group {
                self.group_index
                    .get(&state_hash)
                    .copied()
                    .filter(|location| location.floor == floor && location.order == order)
            } else {
                self.buckets[floor][order.index()]
                    .len()
                    .checked_sub(1)
                    .map(|index| CallLocation {
                        epoch,
                        floor,
                        order,
                        index,
                    })
            };

            if let Some(location) = candidate
                && let Some(call) = self
                    .call_at_mut(location)
                    .and_then(DrawCall::as_geometry_mut)
                && call.accepts(&state, mode, buffer)
            {
                call.merge(*method);
                let slot = call.methods.len() - 1;
                return (AddOutcome::Merged, Placement { location, slot });
            }
        }

        let (methods, coords) = match geometry {
            Geometry::Method(method) => (Methods::Single(method), None),
            Geometry::Coords(coords) => (Methods::Batched(Vec::new()), Some(coords)),
        };
        let groupable = coords.is_none() && mode.is_batchable();

        let bucket = &mut self.buckets[floor][order.index()];
        let location = CallLocation {
            epoch,
            floor,
            order,
            index: bucket.len(),
        };
        bucket.push(DrawCall::Geometry(GeometryCall {
            mode,
            state,
            methods,
            buffer: buffer.cloned(),
            coords,
        }));

        if self.always_group && groupable {
            self.group_index.insert(state_hash, location);
        }
        (AddOutcome::Opened, Placement { location, slot: 0 })
    }

    pub fn add_textured_rect(
        &mut self,
        dest: Rect<i32>,
        texture: &Arc<Texture>,
        src: Rect<i32>,
        color: Color,
        draw_buffer: Option<&DrawBufferRef>,
    ) -> AddOutcome {
        if !src.is_valid() {
            return AddOutcome::Skipped;
        }
        self.add(
            color,
            Some(texture),
            DrawMethod::Rect { src, dst: dest },
            DrawMode::TriangleStrip,
            draw_buffer,
        )
    }

    pub fn add_upside_down_textured_rect(
        &mut self,
        dest: Rect<i32>,
        texture: &Arc<Texture>,
        src: Rect<i32>,
        color: Color,
    ) -> AddOutcome {
        if !src.is_valid() {
            return AddOutcome::Skipped;
        }
        self.add(
            color,
            Some(texture),
            DrawMethod::UpsideDownRect { src, dst: dest },
            DrawMode::Triangles,
            None,
        )
    }

    pub fn add_textured_repeated_rect(
        &mut self,
        dest: Rect<i32>,
        texture: &Arc<Texture>,
        src: Rect<i32>,
        color: Color,
        draw_buffer: Option<&DrawBufferRef>,
    ) -> AddOutcome {
        self.add(
            color,
            Some(texture),
            DrawMethod::RepeatedRect { src, dst: dest },
            DrawMode::Triangles,
            draw_buffer,
        )
    }

    pub fn add_filled_rect(
        &mut self,
        dest: Rect<i32>,
        color: Color,
        draw_buffer: Option<&DrawBufferRef>,
    ) -> AddOutcome {
        self.add(
            color,
            None,
            DrawMethod::filled(dest),
            DrawMode::Triangles,
            draw_buffer,
        )
    }

    pub fn add_filled_triangle(
        &mut self,
        a: Pos<i32>,
        b: Pos<i32>,
        c: Pos<i32>,
        color: Color,
    ) -> AddOutcome {
        self.add(
            color,
            None,
            DrawMethod::Triangle { a, b, c },
            DrawMode::Triangles,
            None,
        )
    }

    pub fn add_bounding_rect(
        &mut self,
        dest: Rect<i32>,
        color: Color,
        inner_line_width: u16,
    ) -> AddOutcome {
        if inner_line_width == 0 {
            return AddOutcome::Skipped;
        }
        self.add(
            color,
            None,
            DrawMethod::BoundingRect {
                dst: dest,
                inner_line_width,
            },
            DrawMode::Triangles,
            None,
        )
    }

    /// Draw geometry the producer expanded itself.
    pub fn add_textured_coords_buffer(
        &mut self,
        texture: &Arc<Texture>,
        coords: Rc<CoordsBuffer>,
        color: Color,
        draw_buffer: Option<&DrawBufferRef>,
    ) -> AddOutcome {
        self.add(
            color,
            Some(texture),
            coords,
            DrawMode::Triangles,
            draw_buffer,
        )
    }

    /// Queue custom work at the current position of the current bucket.
    pub fn add_action(&mut self, action: impl Fn(&dyn Rasterizer) + 'static) {
        if !self.enabled {
            return;
        }
        self.rebuild_if_replaying();

        let floor = self.floor;
        let order = self.order;
        let bucket = &mut self.buckets[floor][order.index()];
        self.last = Some(CallLocation {
            epoch: self.epoch,
            floor,
            order,
            index: bucket.len(),
        });
        let action: Action = Rc::new(action);
        bucket.push(DrawCall::Action(action));
        self.stats.record(AddOutcome::Opened);
    }

    /// Expand one method without touching pool state.
    pub fn add_coords(method: &DrawMethod, coords: &mut CoordsBuffer, mode: DrawMode) {
        method.expand(mode, coords);
    }

    // Paint state

    /// Apply `patch` to the state of the most recent call.
    fn patch_last(&mut self, patch: impl FnOnce(&mut PaintState)) {
        let Some(location) = self.last_location() else {
            return;
        };
        let Some(call) = self
            .call_at_mut(location)
            .and_then(DrawCall::as_geometry_mut)
        else {
            return;
        };

        let before = call.state.clone();
        patch(&mut call.state);
        if call.state != before && self.phase == PoolPhase::ReplayCached {
            tracing::debug!(
                "Pool '{}' cached call patched during replay, requesting repaint",
                self.pool_type
            );
            self.repaint();
        }
    }

    pub fn set_transform_matrix(&mut self, transform: Mat3, on_last_drawing: bool) {
        if on_last_drawing {
            self.patch_last(|state| state.transform = transform);
        } else {
            self.state.transform = transform;
        }
    }

    /// Set the pool-wide tint every following emission's color is multiplied by.
    /// With `on_last_drawing` the last call's color is replaced instead.
    pub fn set_color(&mut self, color: Color, on_last_drawing: bool) {
        if on_last_drawing {
            self.patch_last(|state| state.color = color);
        } else {
            self.state.color = color;
        }
    }

    /// Opacity is clamped to `0.0..=1.0`.
    pub fn set_opacity(&mut self, opacity: f32, on_last_drawing: bool) {
        let opacity = opacity.clamp(0.0, 1.0);
        if on_last_drawing {
            self.patch_last(|state| state.opacity = opacity);
        } else {
            self.state.opacity = opacity;
        }
    }

    pub fn set_composition_mode(&mut self, mode: CompositionMode, on_last_drawing: bool) {
        if on_last_drawing {
            self.patch_last(|state| state.composition_mode = mode);
        } else {
            self.state.composition_mode = mode;
        }
    }

    pub fn set_blend_equation(&mut self, equation: BlendEquation, on_last_drawing: bool) {
        if on_last_drawing {
            self.patch_last(|state| state.blend_equation = equation);
        } else {
            self.state.blend_equation = equation;
        }
    }

    pub fn set_clip_rect(&mut self, clip_rect: Option<Rect<i32>>, on_last_drawing: bool) {
        if on_last_drawing {
            self.patch_last(|state| state.clip_rect = clip_rect);
        } else {
            self.state.clip_rect = clip_rect;
        }
    }

    /// Bind `shader` for following emissions; `action` runs each time a call
    /// using it is replayed, after the state is applied.
    pub fn set_shader_program(
        &mut self,
        shader: Option<Arc<ShaderProgram>>,
        on_last_drawing: bool,
        action: Option<Action>,
    ) {
        if on_last_drawing {
            self.patch_last(|state| {
                state.shader = shader;
                state.on_apply = action;
            });
        } else {
            self.state.shader = shader;
            self.state.on_apply = action;
        }
    }

    pub fn transform_matrix(&self) -> Mat3 {
        self.state.transform
    }

    pub fn color(&self) -> Color {
        self.state.color
    }

    pub fn composition_mode(&self) -> CompositionMode {
        self.state.composition_mode
    }

    pub fn blend_equation(&self) -> BlendEquation {
        self.state.blend_equation
    }

    pub fn shader_program(&self) -> Option<&Arc<ShaderProgram>> {
        self.state.shader.as_ref()
    }

    /// The pending opacity, or the last call's when `last_drawing` is set and
    /// such a call exists.
    pub fn opacity(&self, last_drawing: bool) -> f32 {
        if last_drawing && let Some(state) = self.last_call().and_then(DrawCall::state) {
            return state.opacity;
        }
        self.state.opacity
    }

    /// The pending clip rect, or the last call's when `last_drawing` is set
    /// and such a call exists.
    pub fn clip_rect(&self, last_drawing: bool) -> Option<Rect<i32>> {
        if last_drawing && let Some(state) = self.last_call().and_then(DrawCall::state) {
            return state.clip_rect;
        }
        self.state.clip_rect
    }

    pub fn reset_opacity(&mut self) {
        self.state.opacity = 1.0;
    }

    pub fn reset_clip_rect(&mut self) {
        self.state.clip_rect = None;
    }

    pub fn reset_shader_program(&mut self) {
        self.state.shader = None;
        self.state.on_apply = None;
    }

    pub fn reset_composition_mode(&mut self) {
        self.state.composition_mode = CompositionMode::default();
    }

    pub fn reset_blend_equation(&mut self) {
        self.state.blend_equation = BlendEquation::default();
    }

    pub fn reset_transform_matrix(&mut self) {
        self.state.transform = Mat3::IDENTITY;
    }

    /// Restore the default paint state and drop the transform stack.
    pub fn reset_state(&mut self) {
        self.state = PaintState::default();
        self.transform_stack.clear();
    }

    // Transform stack

    pub fn push_transform_matrix(&mut self) {
        self.transform_stack.push(self.state.transform);
    }

    pub fn pop_transform_matrix(&mut self) {
        match self.transform_stack.pop() {
            Some(transform) => self.state.transform = transform,
            None => tracing::warn!(
                "Pool '{}': pop_transform_matrix on an empty stack",
                self.pool_type
            ),
        }
    }

    pub fn translate(&mut self, x: f32, y: f32) {
        self.state.transform *= Mat3::from_translation(Vec2::new(x, y));
    }

    /// Rotate following emissions by `radians` around `center`.
    pub fn rotate(&mut self, center: Pos<i32>, radians: f32) {
        let center = Vec2::new(center.x as f32, center.y as f32);
        self.state.transform *= Mat3::from_translation(center)
            * Mat3::from_angle(radians)
            * Mat3::from_translation(-center);
    }

    pub fn scale(&mut self, factor: f32) {
        self.state.transform *= Mat3::from_scale(Vec2::splat(factor));
    }

    // Frame cycle

    /// Request a rebuild at the next frame start. Requests coalesce.
    pub fn repaint(&mut self) {
        self.generation.request();
        tracing::trace!("Pool '{}' repaint requested", self.pool_type);
    }

    /// Whether the pool needs a rebuild: a repaint is pending or the refresh
    /// delay has elapsed. With `auto_update` the request is acknowledged and
    /// the refresh timer restarts.
    pub fn can_repaint(&mut self, auto_update: bool) -> bool {
        let pending = self.generation.is_pending();
        let expired = self
            .refresh
            .is_some_and(|refresh| refresh.timer.ticks_elapsed(self.clock.as_ref()) >= refresh.delay);
        if !pending && !expired {
            return false;
        }

        if auto_update {
            self.generation.acknowledge();
            if let Some(refresh) = &mut self.refresh {
                refresh.timer.restart(self.clock.as_ref());
            }
        }
        true
    }

    /// Close the current floor: grouping stops at this point and the cursor
    /// moves one floor up.
    pub fn flush(&mut self) {
        self.group_index.clear();
        if self.floor < MAX_Z {
            self.floor += 1;
        }
    }

    /// Drop all content. Invalidates every draw buffer anchored in this pool.
    pub fn clear(&mut self) {
        for calls in self.buckets.iter_mut().flatten() {
            calls.clear();
        }
        self.group_index.clear();
        self.last = None;
        self.replayed.clear();
        self.epoch += 1;
    }

    /// Start a frame: reset the paint state and cursor, then either clear for
    /// a rebuild or keep the previous content for replay.
    pub fn begin_frame(&mut self) {
        profile_function!();
        self.frame += 1;
        self.reset_state();
        self.floor = 0;
        self.order = DrawOrder::First;
        self.last = None;
        self.replayed.clear();
        self.group_index.clear();
        self.stats = PoolStats::default();

        let requested = self.can_repaint(true);
        if self.auto_update || requested {
            self.clear();
            self.phase = PoolPhase::Rebuilding;
            tracing::trace!("Pool '{}' rebuilding (frame {})", self.pool_type, self.frame);
        } else {
            self.phase = PoolPhase::ReplayCached;
            tracing::trace!("Pool '{}' replaying cached content", self.pool_type);
        }
    }

    /// Replay every call into `raster`: floors ascending, then draw orders,
    /// then submission order. Returns the number of geometry calls drawn.
    pub fn submit(&mut self, raster: &dyn Rasterizer) -> u32 {
        profile_function!();
        let Self {
            buckets,
            scratch,
            stats,
            epoch,
            phase,
            ..
        } = self;

        let mut applied: Option<&PaintState> = None;
        let mut submitted = 0;
        let mut state_changes = 0;

        for (floor, orders) in buckets.iter().enumerate() {
            for (order, calls) in DrawOrder::ALL.into_iter().zip(orders.iter()) {
                for (index, call) in calls.iter().enumerate() {
                    let call = match call {
                        DrawCall::Action(action) => {
                            action(raster);
                            // The action may have changed any state.
                            applied = None;
                            continue;
                        }
                        DrawCall::Geometry(call) => call,
                    };

                    let changes = applied.map_or(StateChanges::all(), |prev| call.state.diff(prev));
                    call.state.apply(raster, changes);
                    state_changes += changes.bits().count_ones();
                    applied = Some(&call.state);
                    if let Some(on_apply) = &call.state.on_apply {
                        on_apply(raster);
                    }

                    let location = CallLocation {
                        epoch: *epoch,
                        floor,
                        order,
                        index,
                    };
                    draw_geometry(raster, call, location, scratch);
                    submitted += 1;
                }
            }
        }

        stats.submitted = submitted;
        stats.state_changes = state_changes;
        *phase = PoolPhase::Flushed;
        tracing::trace!(
            "Pool '{}' submitted {} calls, {} state changes",
            self.pool_type,
            submitted,
            state_changes
        );
        submitted
    }

    // Framed target

    pub fn has_frame_buffer(&self) -> bool {
        matches!(self.kind, PoolKind::Framed(_))
    }

    pub fn framed(&self) -> Option<&FramedTarget> {
        match &self.kind {
            PoolKind::Framed(target) => Some(target),
            PoolKind::Plain => None,
        }
    }

    pub fn framed_mut(&mut self) -> Option<&mut FramedTarget> {
        match &mut self.kind {
            PoolKind::Framed(target) => Some(target),
            PoolKind::Plain => None,
        }
    }

    fn framed_or_err(&mut self) -> Result<&mut FramedTarget, PoolError> {
        let pool_type = self.pool_type;
        self.framed_mut().ok_or(PoolError::NoFramebuffer(pool_type))
    }

    /// Size of the offscreen target.
    pub fn size(&self) -> Option<Size<u32>> {
        self.framed().map(FramedTarget::size)
    }

    pub fn on_before_draw(
        &mut self,
        hook: impl FnMut(&dyn Rasterizer) + 'static,
    ) -> Result<(), PoolError> {
        self.framed_or_err()?.on_before_draw(hook);
        Ok(())
    }

    pub fn on_after_draw(
        &mut self,
        hook: impl FnMut(&dyn Rasterizer) + 'static,
    ) -> Result<(), PoolError> {
        self.framed_or_err()?.on_after_draw(hook);
        Ok(())
    }

    pub fn set_composite_rects(&mut self, dest: Rect<i32>, src: Rect<i32>) -> Result<(), PoolError> {
        self.framed_or_err()?.set_composite_rects(dest, src);
        Ok(())
    }

    pub fn set_clear_color(&mut self, color: Color) -> Result<(), PoolError> {
        self.framed_or_err()?.set_clear_color(color);
        self.repaint();
        Ok(())
    }

    pub fn set_smooth(&mut self, raster: &dyn Rasterizer, smooth: bool) -> Result<(), PoolError> {
        self.framed_or_err()?.set_smooth(raster, smooth);
        Ok(())
    }

    /// Resize the offscreen target and request a rebuild.
    pub fn resize(&mut self, raster: &dyn Rasterizer, size: Size<u32>) -> Result<(), PoolError> {
        self.framed_or_err()?.resize(raster, size)?;
        self.repaint();
        Ok(())
    }

    /// Allocate the offscreen target. On failure the pool is disabled.
    pub(crate) fn allocate_target(&mut self, raster: &dyn Rasterizer) -> Result<(), PoolError> {
        let pool_type = self.pool_type;
        let Some(target) = self.framed_mut() else {
            return Ok(());
        };

        if let Err(source) = target.allocate(raster) {
            tracing::error!(
                "Failed to allocate framebuffer for pool '{}': {}; pool disabled",
                pool_type,
                source
            );
            self.enabled = false;
            return Err(PoolError::FramebufferAllocation {
                pool: pool_type,
                source,
            });
        }
        Ok(())
    }

    pub(crate) fn release_target(&mut self, raster: &dyn Rasterizer) {
        if let Some(target) = self.framed_mut() {
            target.release(raster);
        }
    }
}

fn expand_methods(methods: &Methods, mode: DrawMode, coords: &mut CoordsBuffer) {
    for method in methods.as_slice() {
        method.expand(mode, coords);
    }
}

fn draw_geometry(
    raster: &dyn Rasterizer,
    call: &GeometryCall,
    location: CallLocation,
    scratch: &mut CoordsBuffer,
) {
    if let Some(coords) = &call.coords {
        raster.draw_coords(coords, call.mode);
        return;
    }

    if let Some(buffer) = &call.buffer {
        let mut buffer = buffer.borrow_mut();
        let coords = buffer.coords_for(location, |out| expand_methods(&call.methods, call.mode, out));
        if !coords.is_empty() {
            raster.draw_coords(coords, call.mode);
        }
        return;
    }

    scratch.clear();
    expand_methods(&call.methods, call.mode, scratch);
    if !scratch.is_empty() {
        raster.draw_coords(scratch, call.mode);
    }
}

impl fmt::Debug for Pool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pool")
            .field("pool_type", &self.pool_type)
            .field("kind", &self.kind)
            .field("calls", &self.call_count())
            .field("floor", &self.floor)
            .field("order", &self.order)
            .field("enabled", &self.enabled)
            .field("epoch", &self.epoch)
            .field("phase", &self.phase)
            .finish_non_exhaustive()
    }
}
