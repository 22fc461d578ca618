use std::hint::black_box;

use atlas_toolbox_core::prelude::*;
use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use rand::{Rng, SeedableRng, rngs::StdRng};

fn generate_sizes(count: usize, min_size: u32, max_size: u32) -> Vec<(String, u32, u32)> {
    let mut rng = StdRng::seed_from_u64(count as u64);
    (0..count)
        .map(|i| {
            let w = rng.gen_range(min_size..=max_size);
            let h = rng.gen_range(min_size..=max_size);
            (format!("tex_{i}"), w, h)
        })
        .collect()
}

fn bench_packers(c: &mut Criterion) {
    let mut group = c.benchmark_group("packers");

    for count in [50, 100, 200] {
        let sizes = generate_sizes(count, 16, 64);
        group.throughput(Throughput::Elements(count as u64));

        for packer in PackerKind::REGISTRY_ORDER {
            let cfg = AtlasConfig::builder().packer(packer).build();
            group.bench_with_input(
                BenchmarkId::new(packer.as_str(), count),
                &sizes,
                |b, sizes| b.iter(|| black_box(pack_layout(sizes.clone(), &cfg))),
            );
        }
    }
    group.finish();
}

fn bench_automatic(c: &mut Criterion) {
    let mut group = c.benchmark_group("automatic");
    group.sample_size(20);

    let sizes = generate_sizes(150, 8, 96);
    for (label, sizing) in [
        ("auto", SizingPolicy::Automatic),
        (
            "minmax",
            SizingPolicy::MinMax {
                min: (64, 64),
                max: (512, 512),
            },
        ),
    ] {
        let cfg = AtlasConfig::builder().sizing(sizing).build();
        group.bench_function(label, |b| {
            b.iter(|| black_box(pack_layout(sizes.clone(), &cfg)))
        });
    }
    group.finish();
}

criterion_group!(benches, bench_packers, bench_automatic);
criterion_main!(benches);
