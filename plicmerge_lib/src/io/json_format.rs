//! Helper functions for the JSON file format
//!
//! Tables are stored as an object with the column names in storage order and one array of values per column:
//! ```json
//! {"columns": ["px", "py"], "data": {"px": [0.1, 0.3], "py": [0.2, 0.4]}}
//! ```

use crate::table::{Dimension, IterationTable};
use crate::utils::{IteratorExt, write_atomically};
use anyhow::{Context, anyhow};
use serde_json::{Map, Value, json};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

/// Convenience function for loading an iteration table from a JSON file
pub fn table_from_json<P: AsRef<Path>>(json_file: P) -> Result<IterationTable, anyhow::Error> {
    let path = json_file.as_ref();
    let file = File::open(path).context("Cannot open file for JSON parsing")?;
    let reader = BufReader::new(file);

    let json: Value = serde_json::from_reader(reader)
        .context("Reading of file to JSON structure failed. Not a valid JSON file.")?;
    table_from_json_value(&json)
}

/// Converts a parsed JSON value into an iteration table
pub fn table_from_json_value(json: &Value) -> Result<IterationTable, anyhow::Error> {
    let expected_layout = r#"Expected a JSON object like e.g. '{"columns": ["px", "py"], "data": {"px": [0.1], "py": [0.2]}}'."#;

    let names: Vec<&str> = json
        .get("columns")
        .and_then(Value::as_array)
        .ok_or_else(|| anyhow!("Missing \"columns\" array. {}", expected_layout))?
        .iter()
        .map(|name| {
            name.as_str()
                .ok_or_else(|| anyhow!("Column names have to be strings. {}", expected_layout))
        })
        .try_collect_with_capacity(3)?;

    let dimension = Dimension::from_column_names(names.as_slice())
        .ok_or_else(|| anyhow!("Unsupported column set {:?} in JSON file", names))?;

    let data = json
        .get("data")
        .and_then(Value::as_object)
        .ok_or_else(|| anyhow!("Missing \"data\" object. {}", expected_layout))?;

    let columns = names
        .iter()
        .map(|&name| -> Result<Vec<f32>, anyhow::Error> {
            let values = data
                .get(name)
                .and_then(Value::as_array)
                .ok_or_else(|| anyhow!("Missing values of column \"{}\"", name))?;
            values
                .iter()
                .map(|v| {
                    // Values were written from f32, so the conversion back is exact
                    v.as_f64().map(|v| v as f32).ok_or_else(|| {
                        anyhow!("Value {} of column \"{}\" is not a number", v, name)
                    })
                })
                .try_collect_with_capacity(values.len())
        })
        .try_collect_with_capacity(names.len())?;

    IterationTable::from_columns(dimension, columns)
}

/// Converts an iteration table into its JSON representation
pub fn table_to_json_value(table: &IterationTable) -> Result<Value, anyhow::Error> {
    let mut data = Map::new();
    for (name, values) in table.column_names().iter().zip(table.columns()) {
        if let Some(row) = values.iter().position(|v| !v.is_finite()) {
            return Err(anyhow!(
                "Non-finite value {} in row {} of column \"{}\" cannot be stored as JSON",
                values[row],
                row,
                name
            ));
        }
        data.insert(name.to_string(), json!(values));
    }

    Ok(json!({
        "columns": table.column_names(),
        "data": data,
    }))
}

/// Writes an iteration table to a JSON file, the file is replaced atomically
pub fn table_to_json<P: AsRef<Path>>(
    table: &IterationTable,
    json_file: P,
) -> Result<(), anyhow::Error> {
    let json = table_to_json_value(table)?;
    write_atomically(json_file, |writer| {
        serde_json::to_writer(writer, &json).context("Failed to serialize table to JSON")
    })
}
