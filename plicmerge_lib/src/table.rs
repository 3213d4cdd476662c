use anyhow::anyhow;
use std::fmt;

/// Column schema of the point records of a run
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Dimension {
    /// Two coordinate columns `px, py`
    Two,
    /// Three coordinate columns `px, py, pz`
    Three,
}

impl Dimension {
    const COLUMN_NAMES: [&'static str; 3] = ["px", "py", "pz"];

    /// Returns the number of coordinate columns
    pub fn num_columns(self) -> usize {
        match self {
            Dimension::Two => 2,
            Dimension::Three => 3,
        }
    }

    /// Returns the names of the coordinate columns in storage order
    pub fn column_names(self) -> &'static [&'static str] {
        &Self::COLUMN_NAMES[..self.num_columns()]
    }

    /// Returns the dimension whose column names match the given names exactly (including order)
    pub fn from_column_names<S: AsRef<str>>(names: &[S]) -> Option<Self> {
        [Dimension::Two, Dimension::Three]
            .into_iter()
            .find(|dim| {
                dim.num_columns() == names.len()
                    && dim
                        .column_names()
                        .iter()
                        .zip(names)
                        .all(|(expected, name)| *expected == name.as_ref())
            })
    }
}

impl fmt::Display for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Dimension::Two => write!(f, "2D"),
            Dimension::Three => write!(f, "3D"),
        }
    }
}

/// The merged point records of one iteration, stored column by column
///
/// Every column has the same length. Rows are addressed by their position, i.e. the row index is
/// always the contiguous range `0..num_rows()`.
#[derive(Clone, Debug, PartialEq)]
pub struct IterationTable {
    dimension: Dimension,
    columns: Vec<Vec<f32>>,
}

impl IterationTable {
    /// Returns an empty table with the columns of the given dimension
    pub fn new(dimension: Dimension) -> Self {
        Self::with_capacity(dimension, 0)
    }

    /// Returns an empty table with space reserved for `capacity` rows
    pub fn with_capacity(dimension: Dimension, capacity: usize) -> Self {
        Self {
            dimension,
            columns: (0..dimension.num_columns())
                .map(|_| Vec::with_capacity(capacity))
                .collect(),
        }
    }

    /// Constructs a table from complete columns, returns an error if the number of columns does not match the dimension or the columns differ in length
    pub fn from_columns(dimension: Dimension, columns: Vec<Vec<f32>>) -> Result<Self, anyhow::Error> {
        if columns.len() != dimension.num_columns() {
            return Err(anyhow!(
                "a {} table requires {} columns but {} were given",
                dimension,
                dimension.num_columns(),
                columns.len()
            ));
        }

        let num_rows = columns[0].len();
        if let Some(col) = columns.iter().position(|c| c.len() != num_rows) {
            return Err(anyhow!(
                "column \"{}\" has {} values but column \"{}\" has {}",
                dimension.column_names()[col],
                columns[col].len(),
                dimension.column_names()[0],
                num_rows
            ));
        }

        Ok(Self { dimension, columns })
    }

    pub fn dimension(&self) -> Dimension {
        self.dimension
    }

    pub fn num_rows(&self) -> usize {
        self.columns[0].len()
    }

    pub fn num_columns(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.num_rows() == 0
    }

    pub fn column_names(&self) -> &'static [&'static str] {
        self.dimension.column_names()
    }

    /// Returns all columns in storage order
    pub fn columns(&self) -> &[Vec<f32>] {
        &self.columns
    }

    /// Returns the values of the column with the given name
    pub fn column(&self, name: &str) -> Option<&[f32]> {
        self.column_names()
            .iter()
            .position(|n| *n == name)
            .map(|i| self.columns[i].as_slice())
    }

    /// Appends a row, panics if its length does not match the number of columns
    pub fn push_row(&mut self, row: &[f32]) {
        assert_eq!(
            row.len(),
            self.num_columns(),
            "row length does not match the number of columns of the table"
        );
        for (column, &value) in self.columns.iter_mut().zip(row) {
            column.push(value);
        }
    }

    /// Returns the values of the row at the given index
    pub fn row(&self, index: usize) -> Option<Vec<f32>> {
        (index < self.num_rows()).then(|| self.columns.iter().map(|c| c[index]).collect())
    }

    /// Iterator over all rows in order
    pub fn rows(&self) -> impl Iterator<Item = Vec<f32>> + '_ {
        (0..self.num_rows()).map(|i| self.columns.iter().map(|c| c[i]).collect())
    }
}
