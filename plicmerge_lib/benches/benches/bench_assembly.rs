use super::bench_shard::generate_shard_text;
use criterion::{Criterion, criterion_group};
use plicmerge_lib::naming::shard_file_name;
use plicmerge_lib::{Dimension, Parameters, assemble_iteration};
use std::time::Duration;

pub fn assemble_iteration_64_shards(c: &mut Criterion) {
    let dir = tempfile::tempdir().unwrap();
    for process in 0..64 {
        std::fs::write(
            dir.path().join(shard_file_name(1, process)),
            generate_shard_text(5_000, process as f32),
        )
        .unwrap();
    }

    let mut group = c.benchmark_group("assembly");
    group.sample_size(20);
    group.warm_up_time(Duration::from_secs(3));
    group.measurement_time(Duration::from_secs(10));

    for enable_multi_threading in [false, true] {
        let parameters = Parameters {
            enable_multi_threading,
            ..Parameters::new(Dimension::Three)
        };
        let name = if enable_multi_threading {
            "assemble_iteration_64_shards_parallel"
        } else {
            "assemble_iteration_64_shards"
        };

        group.bench_function(name, |b| {
            b.iter(|| {
                let (table, _) = assemble_iteration(dir.path(), 1, &parameters).unwrap();
                std::hint::black_box(table)
            })
        });
    }

    group.finish();
}

criterion_group!(bench_assembly, assemble_iteration_64_shards);
