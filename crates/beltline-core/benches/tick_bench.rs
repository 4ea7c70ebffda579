//! Tick throughput over a long, fully loaded belt line.

use beltline_core::Coord;
use beltline_core::engine::Engine;
use beltline_core::test_utils::*;
use criterion::{Criterion, criterion_group, criterion_main};

fn loaded_belt(len: i32) -> Engine {
    let mut engine = Engine::new();
    belt_line(&mut engine, Coord::new(0, 0), len);
    for x in 0..len {
        engine.deposit(Coord::new(x, 0), number(x as f64));
    }
    engine
}

fn bench_tick(c: &mut Criterion) {
    let mut engine = loaded_belt(256);
    c.bench_function("tick_256_belt", |b| {
        b.iter(|| {
            std::hint::black_box(engine.step());
        })
    });

    let mut sparse = loaded_belt(16);
    c.bench_function("tick_16_belt", |b| {
        b.iter(|| {
            std::hint::black_box(sparse.step());
        })
    });
}

criterion_group!(benches, bench_tick);
criterion_main!(benches);
