use plicmerge_lib::naming::shard_file_name;
use plicmerge_lib::{DiscoveryMode, IterationRange, discover_iterations};
use std::fs;

#[test]
fn test_discovery_completeness() {
    let dir = tempfile::tempdir().unwrap();
    for iteration in [20, 0, 10] {
        for process in 0..4 {
            fs::write(dir.path().join(shard_file_name(iteration, process)), "").unwrap();
        }
    }

    let iterations = discover_iterations(dir.path(), DiscoveryMode::FirstProcess, IterationRange::all());
    assert_eq!(iterations, vec![0, 10, 20]);
}

#[test]
fn test_discovery_ignores_foreign_entries() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join(shard_file_name(3, 0)), "").unwrap();
    fs::write(dir.path().join("points_000004_n000.txt.tmp"), "").unwrap();
    fs::write(dir.path().join("plic_000005.ptab"), "").unwrap();
    fs::write(dir.path().join("notes.txt"), "").unwrap();
    // Directories with shard-like names are not shards
    fs::create_dir(dir.path().join(shard_file_name(6, 0))).unwrap();
    // Neither are shards in subdirectories
    fs::create_dir(dir.path().join("nested")).unwrap();
    fs::write(dir.path().join("nested").join(shard_file_name(7, 0)), "").unwrap();

    let iterations = discover_iterations(dir.path(), DiscoveryMode::AllProcesses, IterationRange::all());
    assert_eq!(iterations, vec![3]);
}

#[test]
fn test_discovery_modes_on_sample_data() {
    let first = discover_iterations("../data/plic_3d", DiscoveryMode::FirstProcess, IterationRange::all());
    assert_eq!(first, vec![10]);

    let all = discover_iterations("../data/plic_3d", DiscoveryMode::AllProcesses, IterationRange::all());
    assert_eq!(all, vec![10, 20]);

    let range = IterationRange::try_new(Some(11), None).unwrap();
    let filtered = discover_iterations("../data/plic_3d", DiscoveryMode::AllProcesses, range);
    assert_eq!(filtered, vec![20]);
}
