//! Parser for the whitespace delimited text format of the shard files
//!
//! Every line of a shard file is either blank (separating two facets) or contains the coordinates
//! of one facet vertex, e.g. for a 2D case:
//! ```text
//! 0.1 0.2
//! 0.3 0.4
//! 0.5 0.6
//!
//! 0.7 0.8
//! ```
//! There is no header. Blank lines never produce a row. Lines that do not consist of exactly one
//! coordinate per column of the configured [`Dimension`] (missing, surplus, non-numeric or non-UTF-8
//! fields) produce an incomplete row, these rows are removed when the rows are converted into an
//! [`IterationTable`].

use crate::table::{Dimension, IterationTable};
use anyhow::Context;
use log::trace;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use std::str::FromStr;
use thiserror::Error as ThisError;

/// Treatment of rows with missing, surplus or non-numeric fields
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum MalformedRowPolicy {
    /// Keep the row with missing values, it is dropped when converting to a table
    #[default]
    Drop,
    /// Abort parsing of the shard with a [`ShardParseError::MalformedRow`]
    Fail,
}

/// Error type returned when parsing a shard fails
#[non_exhaustive]
#[derive(Debug, ThisError)]
pub enum ShardParseError {
    /// A line that is neither blank nor a complete row (only with [`MalformedRowPolicy::Fail`])
    #[error("malformed row in line {line}: \"{content}\" (expected {expected} numeric fields)")]
    MalformedRow {
        /// One-based line number
        line: usize,
        content: String,
        expected: usize,
    },
    /// Reading a line from the underlying reader failed
    #[error("failed to read line {line}")]
    Io {
        /// One-based line number
        line: usize,
        #[source]
        source: std::io::Error,
    },
}

/// Rows read from one or more shards that may still contain missing values
///
/// Values are stored row by row, a missing value is `None`. A row is complete if its line had exactly
/// one valid value per column.
#[derive(Clone, Debug, PartialEq)]
pub struct ShardRows {
    dimension: Dimension,
    values: Vec<Option<f32>>,
    complete: Vec<bool>,
}

/// Kind of a single parsed line
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum LineKind {
    Blank,
    Complete,
    Incomplete,
}

impl ShardRows {
    /// Returns an empty set of rows for the given dimension
    pub fn new(dimension: Dimension) -> Self {
        Self {
            dimension,
            values: Vec::new(),
            complete: Vec::new(),
        }
    }

    pub fn dimension(&self) -> Dimension {
        self.dimension
    }

    pub fn num_rows(&self) -> usize {
        self.complete.len()
    }

    /// Iterator over all rows in order, missing values are `None`
    pub fn rows(&self) -> impl Iterator<Item = &[Option<f32>]> {
        self.values.chunks_exact(self.dimension.num_columns())
    }

    /// Appends all rows of `other`, panics if the dimensions differ
    pub fn append(&mut self, mut other: ShardRows) {
        assert_eq!(
            self.dimension, other.dimension,
            "cannot concatenate shard rows of different dimensions"
        );
        self.values.append(&mut other.values);
        self.complete.append(&mut other.complete);
    }

    /// Converts the rows into a table, dropping every incomplete row
    ///
    /// Returns the table and the number of dropped rows. Complete rows are never dropped and keep
    /// their relative order.
    pub fn drop_incomplete_rows(self) -> (IterationTable, usize) {
        let num_rows = self.num_rows();
        let mut table = IterationTable::with_capacity(self.dimension, num_rows);
        let mut row_buffer = Vec::with_capacity(self.dimension.num_columns());

        for (row, _) in self
            .rows()
            .zip(&self.complete)
            .filter(|(_, complete)| **complete)
        {
            row_buffer.clear();
            row_buffer.extend(row.iter().flatten());
            table.push_row(&row_buffer);
        }

        let num_dropped = num_rows - table.num_rows();
        (table, num_dropped)
    }

    /// Parses a single line and appends the resulting row (if any)
    fn parse_line(&mut self, line: &str) -> LineKind {
        let num_columns = self.dimension.num_columns();
        let mut tokens = line.split_ascii_whitespace().peekable();
        if tokens.peek().is_none() {
            return LineKind::Blank;
        }

        let row_start = self.values.len();
        let mut num_tokens = 0;
        for token in tokens {
            if num_tokens < num_columns {
                self.values.push(parse_coordinate(token));
            }
            num_tokens += 1;
        }
        self.values.resize(row_start + num_columns, None);

        // Surplus fields make a row incomplete as well, they indicate a wrong column schema
        let complete =
            num_tokens == num_columns && self.values[row_start..].iter().all(Option::is_some);
        self.complete.push(complete);

        if complete {
            LineKind::Complete
        } else {
            LineKind::Incomplete
        }
    }
}

/// Parses a single coordinate, NaN is treated like a missing value
fn parse_coordinate(token: &str) -> Option<f32> {
    f32::from_str(token).ok().filter(|v| !v.is_nan())
}

/// Parses shard rows from a buffered reader
///
/// Bytes that are not valid UTF-8 make the affected field a missing value, only failures of the
/// reader itself are returned as [`ShardParseError::Io`].
pub fn parse_shard<R: BufRead>(
    mut reader: R,
    dimension: Dimension,
    policy: MalformedRowPolicy,
) -> Result<ShardRows, ShardParseError> {
    let mut rows = ShardRows::new(dimension);
    let mut buffer = Vec::new();
    let mut line_number = 0;

    loop {
        buffer.clear();
        let num_bytes = reader
            .read_until(b'\n', &mut buffer)
            .map_err(|source| ShardParseError::Io {
                line: line_number + 1,
                source,
            })?;
        if num_bytes == 0 {
            break;
        }
        line_number += 1;

        let line = String::from_utf8_lossy(trim_line_ending(&buffer));
        if rows.parse_line(&line) == LineKind::Incomplete {
            trace!("Incomplete row in line {}: \"{}\"", line_number, line);
            if policy == MalformedRowPolicy::Fail {
                return Err(ShardParseError::MalformedRow {
                    line: line_number,
                    content: line.into_owned(),
                    expected: dimension.num_columns(),
                });
            }
        }
    }

    Ok(rows)
}

fn trim_line_ending(line: &[u8]) -> &[u8] {
    let line = line.strip_suffix(b"\n").unwrap_or(line);
    line.strip_suffix(b"\r").unwrap_or(line)
}

/// Convenience function for parsing the shard file at the given path
pub fn read_shard_file<P: AsRef<Path>>(
    shard_file: P,
    dimension: Dimension,
    policy: MalformedRowPolicy,
) -> Result<ShardRows, anyhow::Error> {
    let path = shard_file.as_ref();
    let file = File::open(path)
        .with_context(|| format!("Unable to open shard file \"{}\"", path.display()))?;
    parse_shard(BufReader::new(file), dimension, policy)
        .with_context(|| format!("Failed to parse shard file \"{}\"", path.display()))
}
