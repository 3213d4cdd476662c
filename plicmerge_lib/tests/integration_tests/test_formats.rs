use plicmerge_lib::io::{read_table, write_table};
use plicmerge_lib::{Dimension, IterationTable, TableFormat};

fn sample_table() -> IterationTable {
    let mut table = IterationTable::new(Dimension::Three);
    table.push_row(&[0.1, 0.2, 0.3]);
    table.push_row(&[-1.0e-20, 3.5, f32::MAX]);
    table.push_row(&[0.0, -0.0, 7.25]);
    table
}

#[test]
fn test_convert_between_formats() {
    let dir = tempfile::tempdir().unwrap();
    let table = sample_table();

    let ptab = dir.path().join("plic_000001.ptab");
    let json = dir.path().join("plic_000001.json");
    let ptab_again = dir.path().join("plic_000001_converted.ptab");

    write_table(&table, &ptab, TableFormat::Ptab, true).unwrap();
    write_table(&read_table(&ptab).unwrap(), &json, TableFormat::Json, false).unwrap();
    write_table(&read_table(&json).unwrap(), &ptab_again, TableFormat::Ptab, true).unwrap();

    let converted = read_table(&ptab_again).unwrap();
    assert_eq!(converted.column_names(), &["px", "py", "pz"]);
    for (a, b) in table.columns().iter().zip(converted.columns()) {
        let a: Vec<u32> = a.iter().map(|v| v.to_bits()).collect();
        let b: Vec<u32> = b.iter().map(|v| v.to_bits()).collect();
        assert_eq!(a, b);
    }
}

#[test]
fn test_read_invalid_files() {
    let dir = tempfile::tempdir().unwrap();

    let not_ptab = dir.path().join("garbage.ptab");
    std::fs::write(&not_ptab, b"BgeoV\x00\x01").unwrap();
    assert!(read_table(&not_ptab).is_err());

    let not_json = dir.path().join("garbage.json");
    std::fs::write(&not_json, b"{\"columns\": [").unwrap();
    assert!(read_table(&not_json).is_err());

    assert!(read_table(dir.path().join("missing.ptab")).is_err());
}
