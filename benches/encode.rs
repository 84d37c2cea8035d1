// Run with:  cargo bench --bench encode

use criterion::{criterion_group, criterion_main, Criterion, Throughput};
use hub75_refresh::{compute_planes, compute_rows, BitPlaneEncoder, Color, FrameBuffer};
use std::hint::black_box;

const ROWS: usize = 32;
const COLS: usize = 64;
const BITS: u8 = 4;
const NROWS: usize = compute_rows(ROWS);
const PLANES: usize = compute_planes(BITS);

fn encode(c: &mut Criterion) {
    let mut group = c.benchmark_group("encode");
    group.throughput(Throughput::Elements((ROWS * COLS) as u64));

    group.bench_function("bitplane_encoder", |b| {
        let mut fb = FrameBuffer::<ROWS, COLS>::new();
        for y in 0..ROWS {
            for x in 0..COLS {
                fb.set(x, y, Color::new((x * 4) as u8, (y * 8) as u8, (x + y) as u8))
                    .unwrap();
            }
        }
        let mut encoder = BitPlaneEncoder::<ROWS, COLS, NROWS, BITS, PLANES>::new();

        b.iter(|| {
            black_box(&mut encoder).encode(black_box(&fb));
        });
    });

    group.finish();
}

criterion_group!(benches, encode);
criterion_main!(benches);
