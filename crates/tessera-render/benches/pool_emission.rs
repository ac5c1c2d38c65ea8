//! Benchmarks for pool emission, cached replay and submission.

use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};
use std::rc::Rc;
use tessera_core::geometry::{Pos, Rect, Size};
use tessera_render::{
    Color, DrawBuffer, DrawOrder, DrawPoolType, Pool, PoolSettings, Texture,
};
use tessera_test_utils::{ManualClock, MockRasterizer};

fn cached_pool() -> Pool {
    let settings = PoolSettings::plain().with_auto_update(false);
    Pool::new(DrawPoolType::Map, &settings, Rc::new(ManualClock::new()))
}

fn tile(i: i32) -> Rect<i32> {
    Rect::new((i % 64) * 32, (i / 64) * 32, 32, 32)
}

fn bench_emission(c: &mut Criterion) {
    let mut group = c.benchmark_group("pool_emission");
    let atlas = Texture::new(Size::new(1024, 1024));
    let src = Rect::new(0, 0, 32, 32);

    for size in [100, 1000, 10000] {
        group.throughput(Throughput::Elements(size as u64));

        group.bench_with_input(BenchmarkId::new("rebuild", size), &size, |b, &size| {
            let mut pool = cached_pool();
            b.iter(|| {
                pool.repaint();
                pool.begin_frame();
                for i in 0..size {
                    black_box(pool.add_textured_rect(tile(i), &atlas, src, Color::WHITE, None));
                }
            });
        });

        group.bench_with_input(BenchmarkId::new("replay", size), &size, |b, &size| {
            let mut pool = cached_pool();
            let buffer = DrawBuffer::new(DrawOrder::First).shared();
            pool.begin_frame();
            buffer.borrow_mut().validate(Pos::new(0, 0));
            for i in 0..size {
                pool.add_textured_rect(tile(i), &atlas, src, Color::WHITE, Some(&buffer));
            }

            b.iter(|| {
                pool.begin_frame();
                buffer.borrow_mut().validate(Pos::new(0, 0));
                for i in 0..size {
                    black_box(pool.add_textured_rect(
                        tile(i),
                        &atlas,
                        src,
                        Color::WHITE,
                        Some(&buffer),
                    ));
                }
            });
        });
    }

    group.finish();
}

fn bench_submit(c: &mut Criterion) {
    let mut group = c.benchmark_group("pool_submit");
    let atlases = [Texture::new(Size::new(512, 512)), Texture::new(Size::new(512, 512))];
    let src = Rect::new(0, 0, 32, 32);

    for size in [100, 1000] {
        group.throughput(Throughput::Elements(size as u64));

        let mut pool = cached_pool();
        pool.begin_frame();
        for i in 0..size {
            let atlas = &atlases[(i % 2) as usize];
            pool.add_textured_rect(tile(i), atlas, src, Color::WHITE, None);
        }

        group.bench_with_input(BenchmarkId::new("alternating_textures", size), &size, |b, _| {
            let raster = MockRasterizer::new();
            b.iter(|| {
                raster.clear_calls();
                black_box(pool.submit(&raster))
            });
        });
    }

    group.finish();
}

criterion_group!(benches, bench_emission, bench_submit);
criterion_main!(benches);
