//! Benchmark edge cost evaluation over the shipped two-box scene.

use criterion::{BatchSize, BenchmarkId, Criterion, criterion_group, criterion_main};
use std::hint::black_box;
use std::path::Path;
use std::sync::Arc;

use drishti::{
    DrishtiConfig, ObjectRecognitionEnv, Observation, PlanarIcp, RaycastRenderer,
    SearchEnvironment,
};

fn load_config() -> DrishtiConfig {
    let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("configs/drishti.toml");
    DrishtiConfig::load(&path).unwrap()
}

fn build_env(config: &DrishtiConfig) -> ObjectRecognitionEnv {
    let models = Arc::new(config.build_model_bank().unwrap());
    let renderer = Arc::new(RaycastRenderer::new(
        config.camera().unwrap(),
        Arc::clone(&models),
        config.scene.table_height,
    ));
    let truth = config.ground_truth(&models).unwrap();
    let observation = Observation::synthesize(renderer.as_ref(), &truth).unwrap();
    ObjectRecognitionEnv::new(
        config.to_env_config(),
        Arc::clone(&models),
        config.scene_model_ids(&models).unwrap(),
        renderer,
        Arc::new(PlanarIcp::new(config.refinement.icp_config())),
        observation,
    )
    .unwrap()
}

/// Full and lazy expansion of the root with varying worker counts.
fn bench_root_expansion(c: &mut Criterion) {
    let mut group = c.benchmark_group("root_expansion");
    group.sample_size(10);

    for workers in [1, 2, 4] {
        let mut config = load_config();
        config.dispatch.num_workers = workers;

        group.bench_with_input(BenchmarkId::new("full", workers), &config, |b, config| {
            b.iter_batched(
                || build_env(config),
                |mut env| {
                    let start = env.start_state_id();
                    black_box(env.get_succs(start).unwrap())
                },
                BatchSize::LargeInput,
            )
        });

        group.bench_with_input(BenchmarkId::new("lazy", workers), &config, |b, config| {
            b.iter_batched(
                || build_env(config),
                |mut env| {
                    let start = env.start_state_id();
                    black_box(env.get_lazy_succs(start).unwrap())
                },
                BatchSize::LargeInput,
            )
        });
    }

    group.finish();
}

/// Complete greedy run, single worker.
fn bench_greedy(c: &mut Criterion) {
    let config = load_config();
    let mut group = c.benchmark_group("greedy");
    group.sample_size(10);
    group.bench_function("two_boxes", |b| {
        b.iter_batched(
            || build_env(&config),
            |mut env| black_box(env.compute_greedy_poses().unwrap()),
            BatchSize::LargeInput,
        )
    });
    group.finish();
}

criterion_group!(benches, bench_root_expansion, bench_greedy);
criterion_main!(benches);
