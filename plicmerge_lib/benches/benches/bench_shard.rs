use criterion::{Criterion, Throughput, criterion_group};
use plicmerge_lib::shard::parse_shard;
use plicmerge_lib::{Dimension, MalformedRowPolicy};
use std::fmt::Write;
use std::time::Duration;

/// Generates the text of a shard with `num_facets` triangles separated by blank lines
pub fn generate_shard_text(num_facets: usize, offset: f32) -> String {
    let mut text = String::new();
    for i in 0..num_facets {
        let x = offset + i as f32 * 0.01;
        for (dx, dy, dz) in [(0.0, 0.0, 0.5), (0.01, 0.0, 0.5), (0.0, 0.01, 0.5)] {
            writeln!(text, "{} {} {}", x + dx, 0.25 + dy, dz).unwrap();
        }
        text.push('\n');
    }
    text
}

pub fn parse_shard_3d(c: &mut Criterion) {
    let text = generate_shard_text(100_000, 0.0);

    let mut group = c.benchmark_group("shard");
    group.sample_size(20);
    group.warm_up_time(Duration::from_secs(3));
    group.measurement_time(Duration::from_secs(10));
    group.throughput(Throughput::Bytes(text.len() as u64));

    group.bench_function("parse_shard_3d", |b| {
        b.iter(|| {
            let rows = parse_shard(text.as_bytes(), Dimension::Three, MalformedRowPolicy::Drop)
                .unwrap();
            std::hint::black_box(rows.drop_incomplete_rows())
        })
    });

    group.finish();
}

criterion_group!(bench_shard, parse_shard_3d);
