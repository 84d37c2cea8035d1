// Run with:  cargo bench --bench set_pixel

use criterion::{criterion_group, criterion_main, Criterion, Throughput};
use hub75_refresh::{Color, FrameBuffer};
use std::hint::black_box;

const ROWS: usize = 32;
const COLS: usize = 64;

fn set_pixel(c: &mut Criterion) {
    let mut group = c.benchmark_group("set_pixel");
    group.throughput(Throughput::Elements((ROWS * COLS) as u64));

    group.bench_function("framebuffer", |b| {
        let mut fb = FrameBuffer::<ROWS, COLS>::new();

        b.iter(|| {
            for y in 0..ROWS {
                for x in 0..COLS {
                    black_box(&mut fb)
                        .set(black_box(x), black_box(y), black_box(Color::new(255, 0, 0)))
                        .unwrap();
                }
            }
        });
    });

    group.finish();
}

criterion_group!(benches, set_pixel);
criterion_main!(benches);
