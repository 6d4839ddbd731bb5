//! Criterion benchmarks for per-scene metrics and the worker pool.

use std::hint::black_box;

use criterion::{criterion_group, criterion_main, Criterion};
use crowdnce_metrics::{evaluate_scene, MetricsPool, PoolConfig, SceneRollout};
use ndarray::{Array2, Array3, Array4};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// A scene with `agents` pedestrians and 20 noisy draws around the truth.
fn make_scene(index: usize, agents: usize, rng: &mut ChaCha8Rng) -> SceneRollout {
    let truth = Array3::from_shape_fn((12, agents, 2), |(t, a, c)| {
        if c == 0 { t as f32 * 0.4 } else { a as f32 * 0.8 }
    });
    let predictions = Array4::from_shape_fn((20, 12, agents, 2), |(_, t, a, c)| {
        truth[[t, a, c]] + (rng.random::<f32>() - 0.5) * 0.6
    });
    SceneRollout {
        scene_index: index,
        predictions,
        truth,
        neighbours: Array2::from_elem((agents, agents), true),
    }
}

fn bench_single_scene(c: &mut Criterion) {
    let mut rng = ChaCha8Rng::seed_from_u64(42);
    let scene = make_scene(0, 16, &mut rng);
    c.bench_function("evaluate_scene_16_agents", |b| {
        b.iter(|| evaluate_scene(black_box(&scene), true))
    });
}

fn bench_pool(c: &mut Criterion) {
    let mut rng = ChaCha8Rng::seed_from_u64(7);
    let scenes: Vec<_> = (0..32).map(|i| make_scene(i, 8, &mut rng)).collect();
    let pool = MetricsPool::new(&PoolConfig::default());
    c.bench_function("pool_32_scenes_8_agents", |b| {
        b.iter(|| pool.evaluate(black_box(&scenes), false))
    });
}

criterion_group!(benches, bench_single_scene, bench_pool);
criterion_main!(benches);
