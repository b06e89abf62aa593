use criterion::{criterion_group, criterion_main, Criterion, black_box};

use grassfield::grass::{
    dispatch_for, generate_records, FieldConfig, HeightMap, KernelInputs, RecordLayout,
    TerrainSampler,
};

use glam::Vec3;

fn bench_place_10k(c: &mut Criterion) {
    let config = FieldConfig::default();
    let inputs = KernelInputs::from_config(&config, None);

    c.bench_function("place_10k", |b| {
        b.iter(|| generate_records(black_box(&inputs)));
    });
}

fn bench_place_100k_shaded(c: &mut Criterion) {
    let config = FieldConfig {
        instance_count: 100_000,
        layout: RecordLayout::Shaded,
        ..Default::default()
    };
    let inputs = KernelInputs::from_config(&config, None);

    c.bench_function("place_100k_shaded", |b| {
        b.iter(|| generate_records(black_box(&inputs)));
    });
}

fn bench_place_terrain(c: &mut Criterion) {
    let config = FieldConfig::default();
    let terrain = TerrainSampler {
        height_map: HeightMap::from_fbm(256, 256, 1, 64.0, 5),
        displacement_strength: 8.0,
        position: Vec3::new(-30.0, 0.0, -30.0),
        size: Vec3::new(60.0, 8.0, 60.0),
    };
    let inputs = KernelInputs::from_config(&config, Some(&terrain));

    c.bench_function("place_10k_terrain", |b| {
        b.iter(|| generate_records(black_box(&inputs)));
    });
}

fn bench_encode_records(c: &mut Criterion) {
    let config = FieldConfig::default();
    let records = generate_records(&KernelInputs::from_config(&config, None));

    c.bench_function("encode_10k_basic", |b| {
        b.iter(|| RecordLayout::Basic.encode(black_box(&records)));
    });
}

fn bench_dispatch_sizing(c: &mut Criterion) {
    c.bench_function("dispatch_for_sweep", |b| {
        b.iter(|| {
            let mut groups = 0u64;
            for n in (0..5_000_000u32).step_by(9_973) {
                if let Some(d) = dispatch_for(black_box(n)) {
                    groups += d.x as u64 * d.y as u64;
                }
            }
            groups
        });
    });
}

criterion_group!(
    benches,
    bench_place_10k,
    bench_place_100k_shaded,
    bench_place_terrain,
    bench_encode_records,
    bench_dispatch_sizing,
);
criterion_main!(benches);
