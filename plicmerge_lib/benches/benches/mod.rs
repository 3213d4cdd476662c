pub mod bench_assembly;
pub mod bench_shard;
