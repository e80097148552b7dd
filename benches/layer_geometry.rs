use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use foveated_renderer::config::{LayerConfig, RenderConfig};
use foveated_renderer::foveation::geometry::compute_geometry;

/// Benchmark: geometry for the reference 3-layer configuration
fn bench_reference_layers(c: &mut Criterion) {
    let config = RenderConfig::default_for_screen(1920, 1080);

    c.bench_function("geometry_reference_3_layers", |b| {
        b.iter(|| compute_geometry(black_box((1920, 1080)), black_box(&config.layers)))
    });
}

/// Benchmark: geometry scaling with layer count
fn bench_layer_counts(c: &mut Criterion) {
    let mut group = c.benchmark_group("geometry_layer_count");

    for count in [2usize, 4, 8, 16] {
        let mut layers = vec![LayerConfig::new((1920, 1080), (640, 360))];
        for i in 1..count {
            let size = (900 / i as u32).max(64);
            layers.push(LayerConfig::new((size, size), (size, size)));
        }

        group.bench_with_input(BenchmarkId::from_parameter(count), &layers, |b, layers| {
            b.iter(|| compute_geometry(black_box((1920, 1080)), black_box(layers)))
        });
    }

    group.finish();
}

criterion_group!(benches, bench_reference_layers, bench_layer_counts);
criterion_main!(benches);
