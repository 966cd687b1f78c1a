//! Error types for value construction and access.
//!
//! Follows the same miette diagnostic conventions as the rest of the
//! workspace so value-level failures render consistently.

use miette::Diagnostic;
use thiserror::Error;

/// Errors raised while constructing or indexing values
#[derive(Error, Diagnostic, Debug, Clone, PartialEq)]
pub enum ValueError {
    #[error("matrix data length {len} doesn't match dimensions {rows}x{cols}")]
    #[diagnostic(
        code(numera::values::shape_mismatch),
        help("provide exactly rows * cols elements")
    )]
    ShapeMismatch { len: usize, rows: usize, cols: usize },

    #[error("row {row} has {found} elements, expected {expected}")]
    #[diagnostic(
        code(numera::values::ragged_rows),
        help("all rows of a matrix must have the same length")
    )]
    RaggedRows {
        row: usize,
        expected: usize,
        found: usize,
    },

    #[error("index ({row}, {col}) out of bounds for {rows}x{cols} matrix")]
    #[diagnostic(
        code(numera::values::index_out_of_bounds),
        help("valid indices are (0..{rows}, 0..{cols})")
    )]
    IndexOutOfBounds {
        row: usize,
        col: usize,
        rows: usize,
        cols: usize,
    },

    #[error("cannot convert {found} to {target}")]
    #[diagnostic(
        code(numera::values::extraction),
        help("check the value's runtime type before extracting")
    )]
    Extraction { found: String, target: String },
}

impl ValueError {
    /// Create an extraction error from a runtime type name and a target type
    pub fn extraction(found: &str, target: &str) -> Self {
        Self::Extraction {
            found: found.to_string(),
            target: target.to_string(),
        }
    }
}
