use plicmerge_lib::io::read_table;
use plicmerge_lib::naming::shard_file_name;
use plicmerge_lib::{
    Dimension, MalformedRowPolicy, Parameters, TableFormat, assemble_iteration, merge_iteration,
};
use std::fs;
use std::path::Path;

fn write_shard(dir: &Path, iteration: usize, process: usize, content: &str) {
    fs::write(dir.join(shard_file_name(iteration, process)), content).unwrap();
}

fn file_names(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}

#[test]
fn test_merge_sample_iteration() {
    let target = tempfile::tempdir().unwrap();
    let parameters = Parameters::new(Dimension::Two);

    let report = merge_iteration("../data/plic_2d", target.path(), 120, &parameters).unwrap();
    assert_eq!(report.num_shards, 2);
    assert_eq!(report.num_rows, 4);
    assert_eq!(report.num_dropped_rows, 0);

    let table = read_table(target.path().join("plic_000120.ptab")).unwrap();
    assert_eq!(table.column_names(), &["px", "py"]);
    assert_eq!(table.column("px").unwrap(), &[0.1, 0.3, 0.5, 0.7]);
    assert_eq!(table.column("py").unwrap(), &[0.2, 0.4, 0.6, 0.8]);

    assert_eq!(file_names(target.path()), vec!["plic_000120.ptab"]);
}

#[test]
fn test_merge_is_idempotent() {
    let target = tempfile::tempdir().unwrap();
    let output = target.path().join("plic_000120.ptab");

    for enable_compression in [false, true] {
        let parameters = Parameters {
            enable_compression,
            ..Parameters::new(Dimension::Two)
        };

        merge_iteration("../data/plic_2d", target.path(), 120, &parameters).unwrap();
        let first = fs::read(&output).unwrap();
        merge_iteration("../data/plic_2d", target.path(), 120, &parameters).unwrap();
        let second = fs::read(&output).unwrap();

        assert_eq!(first, second);
    }
}

#[test]
fn test_blank_line_neutrality() {
    let source = tempfile::tempdir().unwrap();
    let content = "\n1 2 3\n2 3 4\n3 4 5\n\n\n4 5 6\n   \n5 6 7\n6 7 8\n\t\n";
    write_shard(source.path(), 1, 0, content);

    let (table, report) =
        assemble_iteration(source.path(), 1, &Parameters::new(Dimension::Three)).unwrap();
    let non_blank_lines = content.lines().filter(|l| !l.trim().is_empty()).count();
    assert_eq!(table.num_rows(), non_blank_lines);
    assert_eq!(report.num_dropped_rows, 0);
}

#[test]
fn test_dimension_of_sample_data() {
    let (table, report) =
        assemble_iteration("../data/plic_3d", 10, &Parameters::new(Dimension::Three)).unwrap();
    assert_eq!(table.num_columns(), 3);
    assert_eq!(table.num_rows(), 8);
    assert_eq!(report.num_dropped_rows, 1);
    assert_eq!(table.row(5), Some(vec![1.25, 0.5, 0.125]));

    let (table, report) =
        assemble_iteration("../data/plic_2d", 120, &Parameters::new(Dimension::Three)).unwrap();
    assert_eq!(table.num_columns(), 3);
    assert!(table.is_empty());
    assert_eq!(report.num_dropped_rows, 4);
}

#[test]
fn test_strict_parsing_fails_on_malformed_rows() {
    let parameters = Parameters {
        malformed_rows: MalformedRowPolicy::Fail,
        ..Parameters::new(Dimension::Three)
    };

    let err = assemble_iteration("../data/plic_3d", 20, &parameters).unwrap_err();
    assert!(format!("{:?}", err).contains("points_000020_n001.txt"));

    let clean_parameters = Parameters {
        malformed_rows: MalformedRowPolicy::Fail,
        ..Parameters::new(Dimension::Two)
    };
    assert!(assemble_iteration("../data/plic_2d", 120, &clean_parameters).is_ok());
}

#[test]
fn test_merge_without_shards_writes_empty_table() {
    let source = tempfile::tempdir().unwrap();
    let target = tempfile::tempdir().unwrap();
    write_shard(source.path(), 2, 0, "1 2\n");

    for format in [TableFormat::Ptab, TableFormat::Json] {
        let parameters = Parameters {
            output_format: format,
            ..Parameters::new(Dimension::Two)
        };
        let report = merge_iteration(source.path(), target.path(), 3, &parameters).unwrap();
        assert_eq!(report.num_rows, 0);

        let path = target
            .path()
            .join(format!("plic_000003.{}", format.extension()));
        let table = read_table(&path).unwrap();
        assert!(table.is_empty());
        assert_eq!(table.dimension(), Dimension::Two);
    }

    assert_eq!(
        file_names(target.path()),
        vec!["plic_000003.json", "plic_000003.ptab"]
    );
}

#[test]
fn test_merge_into_missing_target_fails() {
    let target = tempfile::tempdir().unwrap();
    let missing = target.path().join("missing");
    let parameters = Parameters::new(Dimension::Two);

    assert!(merge_iteration("../data/plic_2d", &missing, 120, &parameters).is_err());
    assert!(!missing.exists());
}

#[test]
fn test_surplus_fields_are_dropped_not_truncated() {
    let source = tempfile::tempdir().unwrap();
    let target = tempfile::tempdir().unwrap();
    write_shard(source.path(), 4, 0, "0.1 0.2\n0.3 0.4 0.5\n");
    write_shard(source.path(), 4, 1, "1 2 3\n0.6 0.7\n");

    let report =
        merge_iteration(source.path(), target.path(), 4, &Parameters::new(Dimension::Two))
            .unwrap();
    assert_eq!(report.num_shards, 2);
    assert_eq!(report.num_rows, 2);
    assert_eq!(report.num_dropped_rows, 2);

    let table = read_table(target.path().join("plic_000004.ptab")).unwrap();
    assert_eq!(table.column("px").unwrap(), &[0.1, 0.6]);
    assert_eq!(table.column("py").unwrap(), &[0.2, 0.7]);

    let parameters = Parameters {
        malformed_rows: MalformedRowPolicy::Fail,
        ..Parameters::new(Dimension::Two)
    };
    let err = assemble_iteration(source.path(), 4, &parameters).unwrap_err();
    assert!(format!("{:?}", err).contains("points_000004_n000.txt"));
}

#[test]
fn test_invalid_utf8_only_drops_the_affected_row() {
    let source = tempfile::tempdir().unwrap();
    let target = tempfile::tempdir().unwrap();
    fs::write(
        source.path().join(shard_file_name(5, 0)),
        b"0.1 0.2\n0.3 \xff\xfe\n0.5 0.6\n",
    )
    .unwrap();
    write_shard(source.path(), 5, 1, "0.7 0.8\n");

    let report =
        merge_iteration(source.path(), target.path(), 5, &Parameters::new(Dimension::Two))
            .unwrap();
    assert_eq!(report.num_shards, 2);
    assert_eq!(report.num_rows, 3);
    assert_eq!(report.num_dropped_rows, 1);

    let table = read_table(target.path().join("plic_000005.ptab")).unwrap();
    assert_eq!(table.column("px").unwrap(), &[0.1, 0.5, 0.7]);
    assert_eq!(table.column("py").unwrap(), &[0.2, 0.6, 0.8]);
}
