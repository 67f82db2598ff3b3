//! Matrix Market reader.
//!
//! Supports the `matrix coordinate real general|symmetric` format for
//! matrices and both the `array` and `coordinate` formats for vectors.
//! Duplicate coordinate entries are summed, the way a stamp would add them.

use std::io::BufRead;

use crate::error::{Error, Result};
use crate::matrix::SparseMatrix;

/// A square matrix as read from a file: 1-based triplets.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CoordinateMatrix {
    pub size: usize,
    pub entries: Vec<(usize, usize, f64)>,
}

impl CoordinateMatrix {
    /// Number of stored triplets.
    pub fn nnz(&self) -> usize {
        self.entries.len()
    }

    /// Stamp the triplets into a sparse matrix.
    pub fn to_sparse(&self) -> SparseMatrix<f64> {
        let mut matrix = SparseMatrix::with_size(self.size);
        for &(row, column, value) in &self.entries {
            let id = matrix.get_element(row, column);
            matrix.add_value(id, value);
        }
        matrix
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Format {
    Coordinate,
    Array,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Symmetry {
    General,
    Symmetric,
}

struct Header {
    format: Format,
    symmetry: Symmetry,
}

fn parse_error(line: usize, message: impl Into<String>) -> Error {
    Error::Parse {
        line,
        message: message.into(),
    }
}

fn parse_header(line: &str, number: usize) -> Result<Header> {
    let fields: Vec<String> = line.split_whitespace().map(str::to_lowercase).collect();
    if fields.len() < 4 || fields[0] != "%%matrixmarket" || fields[1] != "matrix" {
        return Err(parse_error(number, "expected '%%MatrixMarket matrix' header"));
    }
    let format = match fields[2].as_str() {
        "coordinate" => Format::Coordinate,
        "array" => Format::Array,
        other => return Err(parse_error(number, format!("unsupported format '{other}'"))),
    };
    match fields[3].as_str() {
        "real" | "integer" | "double" => {}
        other => return Err(parse_error(number, format!("unsupported field '{other}'"))),
    }
    let symmetry = match fields.get(4).map(String::as_str) {
        None | Some("general") => Symmetry::General,
        Some("symmetric") => Symmetry::Symmetric,
        Some(other) => {
            return Err(parse_error(number, format!("unsupported symmetry '{other}'")));
        }
    };
    Ok(Header { format, symmetry })
}

/// Data lines of a file, skipping comments and blank lines.
struct DataLines<R> {
    lines: std::io::Lines<R>,
    number: usize,
}

impl<R: BufRead> DataLines<R> {
    fn next_line(&mut self) -> Result<Option<(usize, String)>> {
        for line in self.lines.by_ref() {
            let line = line?;
            self.number += 1;
            let trimmed = line.trim();
            if trimmed.is_empty() || trimmed.starts_with('%') {
                continue;
            }
            return Ok(Some((self.number, trimmed.to_string())));
        }
        Ok(None)
    }
}

fn open<R: BufRead>(reader: R) -> Result<(Header, DataLines<R>)> {
    let mut lines = reader.lines();
    let first = match lines.next() {
        Some(line) => line?,
        None => return Err(parse_error(1, "empty input")),
    };
    let header = parse_header(&first, 1)?;
    Ok((header, DataLines { lines, number: 1 }))
}

fn parse_usize(token: Option<&str>, line: usize, what: &str) -> Result<usize> {
    token
        .ok_or_else(|| parse_error(line, format!("missing {what}")))?
        .parse()
        .map_err(|_| parse_error(line, format!("invalid {what}")))
}

fn parse_f64(token: Option<&str>, line: usize) -> Result<f64> {
    token
        .ok_or_else(|| parse_error(line, "missing value"))?
        .parse()
        .map_err(|_| parse_error(line, "invalid value"))
}

/// Read a square sparse matrix in coordinate format.
pub fn read_matrix<R: BufRead>(reader: R) -> Result<CoordinateMatrix> {
    let (header, mut lines) = open(reader)?;
    if header.format != Format::Coordinate {
        return Err(parse_error(1, "matrices must use the coordinate format"));
    }

    let (number, size_line) = lines
        .next_line()?
        .ok_or_else(|| parse_error(lines.number, "missing size line"))?;
    let mut tokens = size_line.split_whitespace();
    let rows = parse_usize(tokens.next(), number, "row count")?;
    let columns = parse_usize(tokens.next(), number, "column count")?;
    let nnz = parse_usize(tokens.next(), number, "entry count")?;
    if rows != columns {
        return Err(parse_error(
            number,
            format!("matrix must be square, got {rows}x{columns}"),
        ));
    }

    let mut entries = Vec::with_capacity(nnz);
    while let Some((number, line)) = lines.next_line()? {
        let mut tokens = line.split_whitespace();
        let row = parse_usize(tokens.next(), number, "row")?;
        let column = parse_usize(tokens.next(), number, "column")?;
        let value = parse_f64(tokens.next(), number)?;
        if row == 0 || column == 0 || row > rows || column > columns {
            return Err(parse_error(
                number,
                format!("entry ({row}, {column}) outside {rows}x{columns}"),
            ));
        }
        entries.push((row, column, value));
        if header.symmetry == Symmetry::Symmetric && row != column {
            entries.push((column, row, value));
        }
    }

    let stored = match header.symmetry {
        Symmetry::General => entries.len(),
        Symmetry::Symmetric => entries.iter().filter(|(r, c, _)| r >= c).count(),
    };
    if stored != nnz {
        return Err(parse_error(
            lines.number,
            format!("expected {nnz} entries, found {stored}"),
        ));
    }

    Ok(CoordinateMatrix {
        size: rows,
        entries,
    })
}

/// Read a dense vector (array format, or coordinate format with one column).
pub fn read_vector<R: BufRead>(reader: R) -> Result<Vec<f64>> {
    let (header, mut lines) = open(reader)?;
    let (number, size_line) = lines
        .next_line()?
        .ok_or_else(|| parse_error(lines.number, "missing size line"))?;
    let mut tokens = size_line.split_whitespace();
    let length = parse_usize(tokens.next(), number, "row count")?;
    let columns = parse_usize(tokens.next(), number, "column count")?;
    if columns != 1 {
        return Err(parse_error(number, "vectors must have a single column"));
    }

    let mut values = vec![0.0; length];
    match header.format {
        Format::Array => {
            let mut index = 0;
            while let Some((number, line)) = lines.next_line()? {
                if index >= length {
                    return Err(parse_error(number, "too many values"));
                }
                values[index] = parse_f64(line.split_whitespace().next(), number)?;
                index += 1;
            }
            if index != length {
                return Err(parse_error(
                    lines.number,
                    format!("expected {length} values, found {index}"),
                ));
            }
        }
        Format::Coordinate => {
            while let Some((number, line)) = lines.next_line()? {
                let mut tokens = line.split_whitespace();
                let row = parse_usize(tokens.next(), number, "row")?;
                let column = parse_usize(tokens.next(), number, "column")?;
                let value = parse_f64(tokens.next(), number)?;
                if row == 0 || row > length || column != 1 {
                    return Err(parse_error(number, format!("entry ({row}, {column}) out of range")));
                }
                values[row - 1] += value;
            }
        }
    }
    Ok(values)
}
