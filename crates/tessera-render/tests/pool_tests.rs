//! Emission, caching and replay behavior of a single pool.

use std::rc::Rc;
use std::sync::Arc;

use tessera_core::geometry::{Pos, Rect, Size};
use tessera_render::pool::{Methods, PoolPhase};
use tessera_render::{
    AddOutcome, Color, CoordsBuffer, DrawBuffer, DrawBufferRef, DrawMethod, DrawMode, DrawOrder,
    DrawPoolType, Pool, PoolSettings, Rasterizer, ShaderProgram, Texture,
};
use tessera_test_utils::{ManualClock, MockRasterizer, RasterCall};

fn pool_with(settings: PoolSettings) -> Pool {
    Pool::new(DrawPoolType::Map, &settings, Rc::new(ManualClock::new()))
}

/// Rebuilt every frame, drawn straight to the target.
fn plain_pool() -> Pool {
    pool_with(PoolSettings::plain())
}

/// Keeps its content between frames unless asked to repaint.
fn cached_pool() -> Pool {
    pool_with(PoolSettings::plain().with_auto_update(false))
}

fn tile(x: i32, y: i32) -> Rect<i32> {
    Rect::new(x * 32, y * 32, 32, 32)
}

fn emit_tiles(pool: &mut Pool, atlas: &Arc<Texture>, buffer: &DrawBufferRef) -> Vec<AddOutcome> {
    (0..4)
        .map(|x| {
            pool.add_textured_rect(tile(x, 0), atlas, Rect::new(0, 0, 32, 32), Color::WHITE, Some(buffer))
        })
        .collect()
}

#[test]
fn test_identical_replay_opens_no_calls() {
    let mut pool = cached_pool();
    let atlas = Texture::new(Size::new(256, 256));
    let buffer = DrawBuffer::new(DrawOrder::First).shared();
    let reference = Pos::new(100, 100);

    pool.begin_frame();
    assert!(!buffer.borrow_mut().validate(reference));
    let first = emit_tiles(&mut pool, &atlas, &buffer);
    assert_eq!(first[0], AddOutcome::Opened);
    assert!(first[1..].iter().all(|outcome| *outcome == AddOutcome::Merged));
    let calls_after_build = pool.call_count();

    pool.begin_frame();
    assert_eq!(pool.phase(), PoolPhase::ReplayCached);
    assert!(buffer.borrow_mut().validate(reference));
    let second = emit_tiles(&mut pool, &atlas, &buffer);

    assert!(second.iter().all(|outcome| *outcome == AddOutcome::Cached));
    assert_eq!(pool.stats().opened, 0);
    assert_eq!(pool.stats().merged, 0);
    assert_eq!(pool.call_count(), calls_after_build);

    // Nothing was requested, so the following frame still replays.
    pool.begin_frame();
    assert_eq!(pool.phase(), PoolPhase::ReplayCached);
}

#[test]
fn test_moved_reference_misses_cache() {
    let mut pool = cached_pool();
    let atlas = Texture::new(Size::new(256, 256));
    let buffer = DrawBuffer::new(DrawOrder::First).shared();

    pool.begin_frame();
    buffer.borrow_mut().validate(Pos::new(0, 0));
    emit_tiles(&mut pool, &atlas, &buffer);

    pool.begin_frame();
    assert!(buffer.borrow_mut().validate(Pos::new(0, 0)));
    assert!(!buffer.borrow_mut().validate(Pos::new(1, 0)));
    assert!(!buffer.borrow().is_valid());

    let outcome = pool.add_textured_rect(tile(0, 0), &atlas, Rect::new(0, 0, 32, 32), Color::WHITE, Some(&buffer));
    assert_ne!(outcome, AddOutcome::Cached);

    // The miss turned this frame into a rebuild holding only the new emission.
    assert_eq!(pool.phase(), PoolPhase::Rebuilding);
    assert_eq!(pool.call_count(), 1);
    pool.begin_frame();
    assert_eq!(pool.phase(), PoolPhase::ReplayCached);
}

#[test]
fn test_changed_content_misses_from_the_changed_item() {
    let mut pool = cached_pool();
    let buffer = DrawBuffer::new(DrawOrder::First).shared();

    pool.begin_frame();
    buffer.borrow_mut().validate(Pos::new(0, 0));
    for x in 0..3 {
        pool.add_filled_rect(tile(x, 0), Color::RED, Some(&buffer));
    }

    pool.begin_frame();
    buffer.borrow_mut().validate(Pos::new(0, 0));
    assert_eq!(pool.add_filled_rect(tile(0, 0), Color::RED, Some(&buffer)), AddOutcome::Cached);
    assert_ne!(pool.add_filled_rect(tile(5, 5), Color::RED, Some(&buffer)), AddOutcome::Cached);
    // The tail of the old sequence is gone.
    assert_ne!(pool.add_filled_rect(tile(2, 0), Color::RED, Some(&buffer)), AddOutcome::Cached);
    assert_eq!(buffer.borrow().hashes().len(), 3);

    // Only this frame's rects are drawn, in emission order.
    let bucket = pool.bucket(0, DrawOrder::First);
    assert_eq!(bucket.len(), 1);
    let call = bucket[0].as_geometry().expect("geometry call");
    assert_eq!(
        call.methods,
        Methods::Batched(vec![
            DrawMethod::filled(tile(0, 0)),
            DrawMethod::filled(tile(5, 5)),
            DrawMethod::filled(tile(2, 0)),
        ])
    );
}

#[test]
fn test_change_during_replay_keeps_precedence() {
    let mut pool = cached_pool();
    let ground = DrawBuffer::new(DrawOrder::First).shared();
    let item = DrawBuffer::new(DrawOrder::First).shared();

    let emit = |pool: &mut Pool, top: Color| {
        ground.borrow_mut().validate(Pos::new(0, 0));
        item.borrow_mut().validate(Pos::new(0, 0));
        let first = pool.add_filled_rect(tile(0, 0), Color::RED, Some(&ground));
        let middle = pool.add_filled_rect(tile(0, 0), Color::GREEN, Some(&item));
        let last = pool.add_filled_rect(tile(1, 0), top, Some(&ground));
        [first, middle, last]
    };
    let colors = |pool: &Pool| -> Vec<Color> {
        pool.bucket(0, DrawOrder::First)
            .iter()
            .filter_map(|call| call.state().map(|state| state.color))
            .collect()
    };

    pool.begin_frame();
    emit(&mut pool, Color::RED);
    assert_eq!(colors(&pool), vec![Color::RED, Color::GREEN, Color::RED]);

    pool.begin_frame();
    let outcomes = emit(&mut pool, Color::BLUE);
    assert_eq!(outcomes[..2], [AddOutcome::Cached, AddOutcome::Cached]);
    assert_eq!(outcomes[2], AddOutcome::Opened);
    assert_eq!(colors(&pool), vec![Color::RED, Color::GREEN, Color::BLUE]);

    let raster = MockRasterizer::new();
    assert_eq!(pool.submit(&raster), 3);
    assert_eq!(raster.count_draws(), 3);

    // The rebuilt content replays on the next frame.
    pool.begin_frame();
    assert_eq!(pool.phase(), PoolPhase::ReplayCached);
    assert!(emit(&mut pool, Color::BLUE).iter().all(|o| *o == AddOutcome::Cached));
    assert_eq!(colors(&pool), vec![Color::RED, Color::GREEN, Color::BLUE]);
}

#[test]
fn test_patch_after_cached_emission_targets_that_emission() {
    let mut pool = cached_pool();
    let buffer = DrawBuffer::new(DrawOrder::First).shared();

    for frame in 0..4 {
        pool.begin_frame();
        buffer.borrow_mut().validate(Pos::new(0, 0));
        pool.add_filled_rect(tile(0, 0), Color::RED, Some(&buffer));
        pool.set_opacity(0.5, true);
        pool.add_filled_rect(tile(1, 0), Color::BLUE, Some(&buffer));

        let opacities: Vec<f32> = pool
            .bucket(0, DrawOrder::First)
            .iter()
            .filter_map(|call| call.state().map(|state| state.opacity))
            .collect();
        assert_eq!(opacities, vec![0.5, 1.0], "frame {frame}");
        let expected = if frame == 0 {
            PoolPhase::Rebuilding
        } else {
            PoolPhase::ReplayCached
        };
        assert_eq!(pool.phase(), expected, "frame {frame}");
    }
}

#[test]
fn test_temporary_buffer_never_caches() {
    let mut pool = cached_pool();
    let buffer = DrawBuffer::temporary(DrawOrder::First).shared();

    pool.begin_frame();
    pool.add_filled_rect(tile(0, 0), Color::RED, Some(&buffer));
    pool.begin_frame();
    assert_ne!(pool.add_filled_rect(tile(0, 0), Color::RED, Some(&buffer)), AddOutcome::Cached);
    assert!(buffer.borrow().is_temporary());
}

#[test]
fn test_opacity_on_last_drawing_patches_one_call() {
    let mut pool = plain_pool();
    pool.begin_frame();
    pool.add_filled_rect(tile(0, 0), Color::RED, None);
    pool.add_filled_rect(tile(1, 0), Color::GREEN, None);
    pool.add_filled_rect(tile(2, 0), Color::BLUE, None);
    pool.set_opacity(0.3, true);

    let opacities: Vec<f32> = pool
        .bucket(0, DrawOrder::First)
        .iter()
        .filter_map(|call| call.state().map(|state| state.opacity))
        .collect();
    assert_eq!(opacities, vec![1.0, 1.0, 0.3]);
    assert_eq!(pool.opacity(false), 1.0);
}

#[test]
fn test_compatible_methods_batch_into_one_call() {
    let mut pool = plain_pool();
    let atlas = Texture::new(Size::new(64, 64));
    let m1 = Rect::new(0, 0, 16, 16);
    let m2 = Rect::new(16, 0, 16, 16);

    pool.begin_frame();
    pool.add_textured_rect(m1, &atlas, Rect::new(0, 0, 16, 16), Color::WHITE, None);
    pool.add_textured_rect(m2, &atlas, Rect::new(16, 0, 16, 16), Color::WHITE, None);

    let bucket = pool.bucket(0, DrawOrder::First);
    assert_eq!(bucket.len(), 1);
    let call = bucket[0].as_geometry().expect("geometry call");
    assert_eq!(call.mode, DrawMode::Triangles);
    assert_eq!(
        call.methods,
        Methods::Batched(vec![
            DrawMethod::Rect { src: Rect::new(0, 0, 16, 16), dst: m1 },
            DrawMethod::Rect { src: Rect::new(16, 0, 16, 16), dst: m2 },
        ])
    );
}

#[test]
fn test_different_textures_do_not_batch() {
    let mut pool = plain_pool();
    let a = Texture::new(Size::new(64, 64));
    let b = Texture::new(Size::new(64, 64));

    pool.begin_frame();
    pool.add_textured_rect(tile(0, 0), &a, Rect::new(0, 0, 16, 16), Color::WHITE, None);
    pool.add_textured_rect(tile(1, 0), &b, Rect::new(0, 0, 16, 16), Color::WHITE, None);
    assert_eq!(pool.call_count(), 2);
}

#[test]
fn test_single_rect_scenario() {
    let mut pool = plain_pool();
    let atlas = Texture::new(Size::new(64, 64));

    pool.begin_frame();
    pool.add_textured_rect(Rect::new(10, 10, 32, 32), &atlas, Rect::new(0, 0, 32, 32), Color::WHITE, None);

    assert_eq!(pool.call_count(), 1);
    let call = pool.bucket(0, DrawOrder::First)[0]
        .as_geometry()
        .expect("geometry call");
    assert_eq!(call.methods.len(), 1);
    assert_eq!(call.state.opacity, 1.0);
    assert_eq!(call.state.texture.as_ref().map(|t| t.id()), Some(atlas.id()));
}

#[test]
fn test_buckets_replay_in_floor_then_order() {
    let mut pool = plain_pool();
    let raster = MockRasterizer::new();

    let colors = [
        Color::rgb(0.1, 0.0, 0.0),
        Color::rgb(0.2, 0.0, 0.0),
        Color::rgb(0.3, 0.0, 0.0),
        Color::rgb(0.4, 0.0, 0.0),
        Color::rgb(0.5, 0.0, 0.0),
    ];

    pool.begin_frame();
    // floor 0, submitted out of order
    pool.set_draw_order(DrawOrder::Third);
    pool.add_filled_rect(tile(0, 0), colors[2], None);
    pool.set_draw_order(DrawOrder::First);
    pool.add_filled_rect(tile(0, 0), colors[0], None);
    pool.set_draw_order(DrawOrder::Fifth);
    pool.add_filled_rect(tile(0, 0), colors[4], None);
    pool.set_draw_order(DrawOrder::Second);
    pool.add_filled_rect(tile(0, 0), colors[1], None);
    // floor 1 is drawn after every order of floor 0
    pool.flush();
    pool.set_draw_order(DrawOrder::First);
    pool.add_filled_rect(tile(0, 0), colors[3], None);

    pool.submit(&raster);

    let drawn: Vec<Color> = raster
        .calls()
        .into_iter()
        .filter_map(|call| match call {
            RasterCall::SetColor(color) => Some(color),
            _ => None,
        })
        .collect();
    assert_eq!(drawn, vec![colors[0], colors[1], colors[2], colors[4], colors[3]]);
    assert_eq!(pool.phase(), PoolPhase::Flushed);
}

#[test]
fn test_submit_elides_unchanged_state() {
    let mut pool = plain_pool();
    let raster = MockRasterizer::new();
    let a = Texture::new(Size::new(64, 64));
    let b = Texture::new(Size::new(64, 64));

    pool.begin_frame();
    pool.add_textured_rect(tile(0, 0), &a, Rect::new(0, 0, 16, 16), Color::WHITE, None);
    pool.add_textured_rect(tile(1, 0), &b, Rect::new(0, 0, 16, 16), Color::WHITE, None);
    let submitted = pool.submit(&raster);

    assert_eq!(submitted, 2);
    assert_eq!(raster.count_draws(), 2);
    // Full state for the first call, the texture alone for the second.
    assert_eq!(raster.count_state_changes(), 8);
    assert_eq!(pool.stats().state_changes, 8);
    let calls = raster.calls();
    assert_eq!(calls[calls.len() - 2], RasterCall::BindTexture(Some(b.id())));
}

#[test]
fn test_strip_rect_draws_four_vertices() {
    let mut pool = plain_pool();
    let raster = MockRasterizer::new();
    let atlas = Texture::new(Size::new(64, 64));

    pool.begin_frame();
    pool.add_textured_rect(tile(0, 0), &atlas, Rect::new(0, 0, 16, 16), Color::WHITE, None);
    pool.submit(&raster);

    assert!(raster.calls().contains(&RasterCall::DrawCoords {
        vertices: 4,
        indices: 4,
        mode: DrawMode::TriangleStrip,
    }));
}

#[test]
fn test_action_runs_in_place_and_resets_state_tracking() {
    let mut pool = plain_pool();
    let raster = MockRasterizer::new();

    pool.begin_frame();
    pool.add_filled_rect(tile(0, 0), Color::RED, None);
    pool.add_action(|raster: &dyn Rasterizer| raster.set_opacity(0.125));
    pool.add_filled_rect(tile(1, 0), Color::RED, None);
    pool.submit(&raster);

    let calls = raster.calls();
    let marker = calls
        .iter()
        .position(|call| *call == RasterCall::SetOpacity(0.125))
        .expect("action ran");
    let draws_before = calls[..marker]
        .iter()
        .filter(|call| matches!(call, RasterCall::DrawCoords { .. }))
        .count();
    assert_eq!(draws_before, 1);
    // The call after the action re-applies its full state.
    assert_eq!(
        calls[marker + 1..]
            .iter()
            .filter(|call| call.is_state_change())
            .count(),
        7
    );
}

#[test]
fn test_shader_action_runs_before_geometry() {
    let mut pool = plain_pool();
    let raster = MockRasterizer::new();
    let shader = ShaderProgram::new("outline");

    pool.begin_frame();
    pool.set_shader_program(
        Some(shader.clone()),
        false,
        Some(Rc::new(|raster: &dyn Rasterizer| raster.set_opacity(0.75))),
    );
    pool.add_filled_rect(tile(0, 0), Color::WHITE, None);
    pool.submit(&raster);

    let calls = raster.calls();
    let draw = calls
        .iter()
        .position(|call| matches!(call, RasterCall::DrawCoords { .. }))
        .expect("geometry drawn");
    assert_eq!(calls[draw - 1], RasterCall::SetOpacity(0.75));
    assert!(calls[..draw].contains(&RasterCall::BindShader(Some(shader.id()))));
}

#[test]
fn test_buffer_caches_expanded_geometry() {
    let mut pool = cached_pool();
    let raster = MockRasterizer::new();
    let buffer = DrawBuffer::new(DrawOrder::First).shared();

    pool.begin_frame();
    buffer.borrow_mut().validate(Pos::new(0, 0));
    pool.add_filled_rect(tile(0, 0), Color::RED, Some(&buffer));
    pool.add_filled_rect(tile(1, 0), Color::RED, Some(&buffer));
    assert!(buffer.borrow().coords().is_empty());

    pool.submit(&raster);
    assert_eq!(buffer.borrow().coords().vertex_count(), 8);

    pool.begin_frame();
    buffer.borrow_mut().validate(Pos::new(0, 0));
    pool.add_filled_rect(tile(0, 0), Color::RED, Some(&buffer));
    pool.add_filled_rect(tile(1, 0), Color::RED, Some(&buffer));
    // Replay keeps the expanded geometry.
    assert_eq!(buffer.borrow().coords().vertex_count(), 8);
}

#[test]
fn test_external_coords_are_drawn_as_given() {
    let mut pool = plain_pool();
    let raster = MockRasterizer::new();
    let atlas = Texture::new(Size::new(64, 64));

    let mut coords = CoordsBuffer::new();
    for x in 0..3 {
        Pool::add_coords(&DrawMethod::filled(tile(x, 0)), &mut coords, DrawMode::Triangles);
    }
    let coords = Rc::new(coords);

    pool.begin_frame();
    pool.add_textured_coords_buffer(&atlas, coords.clone(), Color::WHITE, None);
    // Never merged with anything.
    assert_eq!(
        pool.add_textured_coords_buffer(&atlas, coords, Color::WHITE, None),
        AddOutcome::Opened
    );
    pool.submit(&raster);

    assert_eq!(
        raster.count(|call| *call
            == RasterCall::DrawCoords {
                vertices: 12,
                indices: 18,
                mode: DrawMode::Triangles,
            }),
        2
    );
}

#[test]
fn test_clip_rect_getter_prefers_last_call() {
    let mut pool = plain_pool();
    let clip = Rect::new(0, 0, 100, 100);

    pool.begin_frame();
    pool.set_clip_rect(Some(clip), false);
    pool.add_filled_rect(tile(0, 0), Color::RED, None);
    pool.set_clip_rect(Some(Rect::new(0, 0, 10, 10)), false);

    assert_eq!(pool.clip_rect(true), Some(clip));
    assert_eq!(pool.clip_rect(false), Some(Rect::new(0, 0, 10, 10)));
}

#[test]
fn test_begin_frame_resets_state_and_cursor() {
    let mut pool = plain_pool();
    pool.begin_frame();
    pool.set_opacity(0.5, false);
    pool.set_draw_order(DrawOrder::Fourth);
    pool.flush();
    pool.push_transform_matrix();

    pool.begin_frame();
    assert_eq!(pool.opacity(false), 1.0);
    assert_eq!(pool.draw_order(), DrawOrder::First);
    assert_eq!(pool.floor(), 0);
}
