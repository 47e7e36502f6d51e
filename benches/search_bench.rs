//! Benchmarks for the discrimination oracle and the global phase.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use fedig::config::Preset;
use fedig::data::Instance;
use fedig::model::{Mlp, OutputHead};
use fedig::search::{global_search_seed, is_discriminatory, similar_set, GlobalParams, SearchContext};

fn census_seed() -> Instance {
    Instance::new(vec![
        4.0, 3.0, 20.0, 9.0, 2.0, 5.0, 1.0, 2.0, 1.0, 0.0, 0.0, 40.0, 20.0,
    ])
    .unwrap()
}

/// Oracle cost over the census similar set (5 × 9 × 2 - 1 members)
fn bench_oracle(c: &mut Criterion) {
    let config = Preset::Census.fairness_config().unwrap();
    let x = census_seed();
    let similar = similar_set(&x, &config.protected_attrs, &config.constraint).unwrap();

    let mut group = c.benchmark_group("Oracle");
    for hidden in [8, 32, 128] {
        let model = Mlp::random(&[13, hidden, 1], OutputHead::Sigmoid, 7).unwrap();
        group.bench_with_input(BenchmarkId::new("is_discriminatory", hidden), &hidden, |b, _| {
            b.iter(|| black_box(is_discriminatory(&x, &similar, &model).unwrap()));
        });
    }
    group.finish();
}

/// One seed through the global phase, all non-protected attributes optimal
fn bench_global_seed(c: &mut Criterion) {
    let config = Preset::Census.fairness_config().unwrap();
    let model = Mlp::random(&[13, 32, 16, 1], OutputHead::Sigmoid, 7).unwrap();
    let ctx = SearchContext::new(&model, &config);
    let optimal: Vec<usize> = (0..13).filter(|a| !config.protected_attrs.contains(a)).collect();
    let x = census_seed();

    let mut group = c.benchmark_group("GlobalSearch");
    for max_iter in [1, 5, 10] {
        let params = GlobalParams {
            decay: 0.2,
            max_iter,
            step: 1.0,
        };
        group.bench_with_input(BenchmarkId::new("seed", max_iter), &params, |b, params| {
            b.iter(|| black_box(global_search_seed(&x, &ctx, &optimal, params).unwrap()));
        });
    }
    group.finish();
}

criterion_group!(benches, bench_oracle, bench_global_seed);
criterion_main!(benches);
