//! Dense 2-D matrix container.
//!
//! The matrix is a shape-validated carrier of values; the numeric algorithms
//! that operate on it live in consumer crates. Storage is row-major.

use crate::error::ValueError;
use crate::value::Value;
use std::fmt;

/// A dense rows x cols container of values
#[derive(Debug, Clone, PartialEq)]
pub struct Matrix {
    data: Vec<Value>,
    rows: usize,
    cols: usize,
}

impl Matrix {
    /// Create a matrix from row-major data, validating the shape
    pub fn new(data: Vec<Value>, rows: usize, cols: usize) -> Result<Self, ValueError> {
        if rows * cols != data.len() {
            return Err(ValueError::ShapeMismatch {
                len: data.len(),
                rows,
                cols,
            });
        }
        Ok(Self { data, rows, cols })
    }

    /// Create a matrix from nested rows, validating that rows are rectangular
    pub fn from_rows(rows: Vec<Vec<Value>>) -> Result<Self, ValueError> {
        let row_count = rows.len();
        let col_count = rows.first().map(|r| r.len()).unwrap_or(0);
        let mut data = Vec::with_capacity(row_count * col_count);
        for (index, row) in rows.into_iter().enumerate() {
            if row.len() != col_count {
                return Err(ValueError::RaggedRows {
                    row: index,
                    expected: col_count,
                    found: row.len(),
                });
            }
            data.extend(row);
        }
        Ok(Self {
            data,
            rows: row_count,
            cols: col_count,
        })
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn data(&self) -> &[Value] {
        &self.data
    }

    /// Access a single element by (row, col)
    pub fn get(&self, row: usize, col: usize) -> Result<&Value, ValueError> {
        if row >= self.rows || col >= self.cols {
            return Err(ValueError::IndexOutOfBounds {
                row,
                col,
                rows: self.rows,
                cols: self.cols,
            });
        }
        Ok(&self.data[row * self.cols + col])
    }

    /// Convert back to nested row arrays
    pub fn to_nested_rows(&self) -> Vec<Value> {
        (0..self.rows)
            .map(|r| {
                Value::Array(
                    self.data[r * self.cols..(r + 1) * self.cols].to_vec(),
                )
            })
            .collect()
    }

    /// Apply a fallible element-wise transformation, preserving the shape
    pub fn try_map<F, E>(&self, mut f: F) -> Result<Matrix, E>
    where
        F: FnMut(&Value) -> Result<Value, E>,
    {
        let mut data = Vec::with_capacity(self.data.len());
        for value in &self.data {
            data.push(f(value)?);
        }
        Ok(Matrix {
            data,
            rows: self.rows,
            cols: self.cols,
        })
    }
}

impl fmt::Display for Matrix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[")?;
        for r in 0..self.rows {
            if r > 0 {
                write!(f, "; ")?;
            }
            for c in 0..self.cols {
                if c > 0 {
                    write!(f, " ")?;
                }
                write!(f, "{}", self.data[r * self.cols + c])?;
            }
        }
        write!(f, "]")
    }
}
