//! Helper functions for the binary PTAB table format
//!
//! A PTAB file stores a table of named `f32` columns. All numbers are big-endian:
//! ```text
//! magic bytes  "PTab"                  4 bytes
//! version      u8                      currently 1
//! num_columns  u16
//! num_rows     u64
//! per column:  name length u16, UTF-8 name, column type i32 (0 = f32)
//! per column:  num_rows values of the column type
//! end bytes    0x00 0xff
//! ```
//! The whole stream may be gzip compressed, compression is detected when loading a file.

use crate::table::{Dimension, IterationTable};
use crate::utils::{IteratorExt, write_atomically};
use anyhow::{Context, anyhow};
use flate2::Compression;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use nom::{Finish, Parser};
use num_traits::ToPrimitive;
use parser::ptab_parser;
use std::fs::File;
use std::io;
use std::io::Read;
use std::path::Path;

const MAGIC_BYTES: [u8; 4] = *b"PTab";
const FORMAT_VERSION: u8 = 1;
const END_BYTES: [u8; 2] = [0x00, 0xff];
const GZIP_MAGIC_BYTES: [u8; 2] = [0x1f, 0x8b];

/// Convenience function for loading an iteration table from a PTAB file path
pub fn table_from_ptab<P: AsRef<Path>>(ptab_file: P) -> Result<IterationTable, anyhow::Error> {
    let ptab_file = load_ptab_file(ptab_file).context("Error while loading PTAB file")?;
    table_from_ptab_file(&ptab_file)
}

/// Converts a loaded PTAB file into an iteration table, the column names have to match one of the supported [`Dimension`]s
pub fn table_from_ptab_file(ptab_file: &PtabFile) -> Result<IterationTable, anyhow::Error> {
    let names: Vec<&str> = ptab_file
        .column_definitions
        .iter()
        .map(|def| def.name.as_str())
        .collect();
    let dimension = Dimension::from_column_names(names.as_slice()).ok_or_else(|| {
        anyhow!(
            "Unsupported column set {:?} in PTAB file, expected {:?} or {:?}",
            names,
            Dimension::Two.column_names(),
            Dimension::Three.column_names()
        )
    })?;

    let columns = ptab_file
        .column_data
        .iter()
        .map(|storage| match storage {
            ColumnStorage::Float32(values) => values.clone(),
        })
        .collect();

    IterationTable::from_columns(dimension, columns)
}

/// Loads and parses a PTAB file to memory
pub fn load_ptab_file<P: AsRef<Path>>(ptab_file: P) -> Result<PtabFile, anyhow::Error> {
    let mut buf = Vec::new();
    File::open(ptab_file.as_ref())
        .context("Unable to open file for reading")?
        .read_to_end(&mut buf)
        .context("Error while loading the file content")?;

    if buf.starts_with(&GZIP_MAGIC_BYTES) {
        let mut decompressed = Vec::new();
        GzDecoder::new(buf.as_slice())
            .read_to_end(&mut decompressed)
            .context("Error during gzip decompression")?;
        buf = decompressed;
    }

    parse_ptab_bytes(&buf)
}

/// Parses the (uncompressed) content of a PTAB file
pub fn parse_ptab_bytes(bytes: &[u8]) -> Result<PtabFile, anyhow::Error> {
    let (_, file) = ptab_parser()
        .parse(bytes)
        .finish()
        .map_err(|err| err.into_anyhow())
        .context("Error while parsing the PTAB file contents")?;
    Ok(file)
}

/// Writes an iteration table to a PTAB file, the file is replaced atomically
pub fn table_to_ptab<P: AsRef<Path>>(
    table: &IterationTable,
    ptab_file: P,
    enable_compression: bool,
) -> Result<(), anyhow::Error> {
    let ptab = ptab_file_from_table(table)?;
    write_atomically(ptab_file, |writer| {
        write_ptab_file(&ptab, writer, enable_compression)
    })
}

/// Converts an iteration table into the PTAB file representation
pub fn ptab_file_from_table(table: &IterationTable) -> Result<PtabFile, anyhow::Error> {
    let num_columns = table.num_columns().to_u16().ok_or_else(|| {
        anyhow!(
            "number of columns ({}) is too large for PTAB format (max {})",
            table.num_columns(),
            u16::MAX
        )
    })?;
    let num_rows = table.num_rows().to_u64().ok_or_else(|| {
        anyhow!(
            "number of rows ({}) is too large for PTAB format (max {})",
            table.num_rows(),
            u64::MAX
        )
    })?;

    let column_definitions = table
        .column_names()
        .iter()
        .map(|name| {
            name.len()
                .to_u16()
                .map(|_| ColumnDefinition {
                    name: name.to_string(),
                    column_type: ColumnType::Float32,
                })
                .ok_or_else(|| anyhow!("column name \"{}\" is too long for PTAB format", name))
        })
        .try_collect_with_capacity(table.num_columns())?;

    Ok(PtabFile {
        header: PtabHeader {
            magic_bytes: MAGIC_BYTES,
            version: FORMAT_VERSION,
            num_columns,
            num_rows,
        },
        column_definitions,
        column_data: table
            .columns()
            .iter()
            .map(|values| ColumnStorage::Float32(values.clone()))
            .collect(),
    })
}

pub fn write_ptab_file<W: io::Write>(
    ptab: &PtabFile,
    writer: W,
    enable_compression: bool,
) -> Result<(), anyhow::Error> {
    fn write_ptab<W2: io::Write>(ptab: &PtabFile, mut writer: W2) -> Result<W2, anyhow::Error> {
        writer.write_all(&ptab.header.magic_bytes)?;
        writer.write_all(&ptab.header.version.to_be_bytes())?;
        writer.write_all(&ptab.header.num_columns.to_be_bytes())?;
        writer.write_all(&ptab.header.num_rows.to_be_bytes())?;

        for column in &ptab.column_definitions {
            writer.write_all(&(column.name.len() as u16).to_be_bytes())?;
            writer.write_all(column.name.as_bytes())?;
            writer.write_all(&column.column_type.to_i32().to_be_bytes())?;
        }

        for storage in &ptab.column_data {
            match storage {
                ColumnStorage::Float32(values) => {
                    for v in values {
                        writer.write_all(&v.to_be_bytes())?;
                    }
                }
            }
        }

        writer.write_all(&END_BYTES)?;
        Ok(writer)
    }

    if enable_compression {
        write_ptab(ptab, GzEncoder::new(writer, Compression::fast()))?
            .finish()
            .context("Error during gzip compression")?;
    } else {
        write_ptab(ptab, writer)?;
    }

    Ok(())
}

/// Struct representing a parsed PTAB file
#[derive(Clone, Debug, PartialEq)]
pub struct PtabFile {
    /// Header data of the PTAB file
    pub header: PtabHeader,
    /// Names and types of all columns
    pub column_definitions: Vec<ColumnDefinition>,
    /// Data of all columns, in the same order as the definitions
    pub column_data: Vec<ColumnStorage>,
}

/// The header data of a PTAB file
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PtabHeader {
    pub magic_bytes: [u8; 4],
    pub version: u8,
    pub num_columns: u16,
    pub num_rows: u64,
}

/// The value type of a PTAB column
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum ColumnType {
    Float32,
}

impl ColumnType {
    fn from_i32(value: i32) -> Option<Self> {
        match value {
            0 => Some(ColumnType::Float32),
            _ => None,
        }
    }

    fn to_i32(self) -> i32 {
        match self {
            ColumnType::Float32 => 0,
        }
    }

    /// Size of a single value in bytes
    fn value_size(self) -> usize {
        match self {
            ColumnType::Float32 => 4,
        }
    }
}

/// Definition of a PTAB column
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ColumnDefinition {
    pub name: String,
    pub column_type: ColumnType,
}

/// Storage for the values of a PTAB column
#[derive(Clone, Debug, PartialEq)]
pub enum ColumnStorage {
    Float32(Vec<f32>),
}

/// Parsers used to parse the PTAB format
mod parser {
    use nom::bytes::complete::{tag, take};
    use nom::combinator::{map, map_opt, map_res, verify};
    use nom::multi::count;
    use nom::number::complete as number;
    use nom::{IResult, Parser};
    use num_traits::ToPrimitive;

    use super::error::{PtabParserError, PtabParserErrorKind, make_ptab_error, ptab_error};
    use super::{
        ColumnDefinition, ColumnStorage, ColumnType, END_BYTES, FORMAT_VERSION, MAGIC_BYTES,
        PtabFile, PtabHeader,
    };

    pub fn ptab_parser<'a>()
    -> impl Parser<&'a [u8], Output = PtabFile, Error = PtabParserError<&'a [u8]>> {
        move |input: &'a [u8]| -> IResult<&'a [u8], PtabFile, PtabParserError<&'a [u8]>> {
            let (input, header) = parse_header(input)?;
            let (input, column_definitions) =
                count(parse_column_def, header.num_columns as usize).parse(input)?;

            let num_rows = header.num_rows.to_usize().ok_or_else(|| {
                make_ptab_error(input, PtabParserErrorKind::TruncatedColumnData)
            })?;

            let mut input = input;
            let mut column_data = Vec::with_capacity(column_definitions.len());
            for column in &column_definitions {
                let (i, storage) = parse_column_data(input, column.column_type, num_rows)?;
                column_data.push(storage);
                input = i;
            }

            let (input, _) =
                ptab_error(PtabParserErrorKind::MissingEndBytes, tag(&END_BYTES[..]))(input)?;
            if !input.is_empty() {
                return Err(make_ptab_error(input, PtabParserErrorKind::TrailingBytes));
            }

            let file = PtabFile {
                header,
                column_definitions,
                column_data,
            };

            Ok((input, file))
        }
    }

    /// Parses and validates the magic bytes of a PTAB file header
    fn parse_header_magic(input: &[u8]) -> IResult<&[u8], &[u8], PtabParserError<&[u8]>> {
        ptab_error(
            PtabParserErrorKind::MagicBytesNotFound,
            tag(&MAGIC_BYTES[..]),
        )(input)
    }

    #[test]
    fn test_ptab_header_magic_parser() {
        assert_eq!(
            parse_header_magic(b"PTabxx"),
            Ok(("xx".as_bytes(), "PTab".as_bytes()))
        );

        if let nom::Err::Error(e) = parse_header_magic(b"Bgeo").unwrap_err() {
            assert_eq!(
                e.first_ptab_error().unwrap(),
                PtabParserErrorKind::MagicBytesNotFound
            );
        } else {
            panic!();
        }
    }

    /// Parses the full PTAB file header
    fn parse_header(input: &[u8]) -> IResult<&[u8], PtabHeader, PtabParserError<&[u8]>> {
        let (input, magic_bytes) = parse_header_magic(input)?;
        let (input, version) = ptab_error(
            PtabParserErrorKind::UnsupportedFormatVersion,
            verify(number::be_u8, |v: &u8| *v == FORMAT_VERSION),
        )(input)?;
        let (input, num_columns) = number::be_u16(input)?;
        let (input, num_rows) = number::be_u64(input)?;

        let header = PtabHeader {
            magic_bytes: [
                magic_bytes[0],
                magic_bytes[1],
                magic_bytes[2],
                magic_bytes[3],
            ],
            version,
            num_columns,
            num_rows,
        };

        Ok((input, header))
    }

    /// Parses a single PTAB column definition
    fn parse_column_def(
        input: &[u8],
    ) -> IResult<&[u8], ColumnDefinition, PtabParserError<&[u8]>> {
        let (input, name_length) = number::be_u16(input)?;
        let (input, name) = map_res(take(name_length as usize), |input: &[u8]| {
            std::str::from_utf8(input).map_err(|_| PtabParserErrorKind::InvalidColumnName)
        })
        .parse(input)?;

        let (input, column_type) = ptab_error(
            PtabParserErrorKind::UnknownColumnType,
            map_opt(number::be_i32, ColumnType::from_i32),
        )(input)?;

        Ok((
            input,
            ColumnDefinition {
                name: name.to_string(),
                column_type,
            },
        ))
    }

    /// Parses all values of a single column
    fn parse_column_data(
        input: &[u8],
        column_type: ColumnType,
        num_rows: usize,
    ) -> IResult<&[u8], ColumnStorage, PtabParserError<&[u8]>> {
        let num_bytes = num_rows
            .checked_mul(column_type.value_size())
            .filter(|&n| n <= input.len())
            .ok_or_else(|| make_ptab_error(input, PtabParserErrorKind::TruncatedColumnData))?;

        match column_type {
            ColumnType::Float32 => map(take(num_bytes), |bytes: &[u8]| {
                ColumnStorage::Float32(
                    bytes
                        .chunks_exact(4)
                        .map(|b| f32::from_be_bytes([b[0], b[1], b[2], b[3]]))
                        .collect(),
                )
            })
            .parse(input),
        }
    }
}

/// Error types and traits used by the PTAB parser
mod error {
    use anyhow::anyhow;
    use nom::error::{ErrorKind, FromExternalError, ParseError};
    use nom::{IResult, Parser};

    #[derive(Clone, Debug, Eq, PartialEq)]
    pub enum PtabParserErrorKind {
        MagicBytesNotFound,
        UnsupportedFormatVersion,
        InvalidColumnName,
        UnknownColumnType,
        TruncatedColumnData,
        MissingEndBytes,
        TrailingBytes,
        NomError(ErrorKind),
    }

    impl PtabParserErrorKind {
        /// Returns whether the variant is an internal nom error
        pub fn is_nom_error(&self) -> bool {
            matches!(self, PtabParserErrorKind::NomError(_))
        }
    }

    #[derive(Clone, Debug, PartialEq)]
    pub struct PtabParserError<I> {
        pub backtrace: Vec<(I, PtabParserErrorKind)>,
    }

    impl<I> PtabParserError<I> {
        /// Construct a new error with the given input and error kind
        pub fn from_error_kind(input: I, kind: PtabParserErrorKind) -> Self {
            Self {
                backtrace: vec![(input, kind)],
            }
        }

        /// Appends an error to the backtrace with the given input and error kind and returns self
        pub fn with_append(mut self, input: I, kind: PtabParserErrorKind) -> Self {
            self.backtrace.push((input, kind));
            self
        }

        /// Wraps the error into a (recoverable) nom::Err::Error
        pub fn into_nom_error(self) -> nom::Err<Self> {
            nom::Err::Error(self)
        }

        /// Returns the kind of the first error in the backtrace that is an actual PTAB format error kind (i.e. skips internal nom parser errors)
        pub fn first_ptab_error(&self) -> Option<PtabParserErrorKind> {
            self.backtrace
                .iter()
                .map(|(_, ek)| ek)
                .find(|ek| !ek.is_nom_error())
                .cloned()
        }

        /// Convert this error into an anyhow error
        pub fn into_anyhow(self) -> anyhow::Error {
            if let Some((_, first)) = self.backtrace.first() {
                let mut err = anyhow!("{:?}", first);
                for (_, kind) in self.backtrace.iter().skip(1) {
                    err = err.context(format!("{:?}", kind));
                }
                err
            } else {
                anyhow!("Unknown")
            }
        }
    }

    impl<I> ParseError<I> for PtabParserError<I> {
        fn from_error_kind(input: I, kind: ErrorKind) -> Self {
            Self::from_error_kind(input, PtabParserErrorKind::NomError(kind))
        }

        fn append(input: I, kind: ErrorKind, other: Self) -> Self {
            other.with_append(input, PtabParserErrorKind::NomError(kind))
        }
    }

    impl<I> FromExternalError<I, PtabParserErrorKind> for PtabParserError<I> {
        fn from_external_error(input: I, _kind: ErrorKind, e: PtabParserErrorKind) -> Self {
            Self::from_error_kind(input, e)
        }
    }

    /// Creates a new [PtabParserError] wrapped into a [nom::Err::Error] variant
    pub fn make_ptab_error<I>(input: I, kind: PtabParserErrorKind) -> nom::Err<PtabParserError<I>> {
        PtabParserError::from_error_kind(input, kind).into_nom_error()
    }

    /// Parser that attaches an error of the given [PtabParserErrorKind] if the inner parser fails
    pub fn ptab_error<I: Clone, F, O>(
        kind: PtabParserErrorKind,
        mut f: F,
    ) -> impl FnMut(I) -> IResult<I, O, PtabParserError<I>>
    where
        F: Parser<I, Output = O, Error = PtabParserError<I>>,
    {
        use nom::Err;
        move |i: I| match f.parse(i.clone()) {
            Ok(o) => Ok(o),
            Err(Err::Incomplete(i)) => Err(Err::Incomplete(i)),
            Err(Err::Error(e)) => Err(Err::Error(e.with_append(i, kind.clone()))),
            Err(Err::Failure(e)) => Err(Err::Failure(e.with_append(i, kind.clone()))),
        }
    }
}
