//! Runtime value model for the Numera numeric library.
//!
//! This crate defines the concrete values the typed dispatch layer inspects:
//! scalars (boolean, number, big number, fraction, complex), strings, and the
//! array/matrix containers. It deliberately carries no arithmetic — numeric
//! algorithms are registered as typed functions by consumer crates.

pub mod error;
pub mod matrix;
pub mod value;

pub use error::ValueError;
pub use matrix::Matrix;
pub use value::Value;

// Re-export the numeric component types so consumers construct values
// without naming the num-* crates directly.
pub use num_bigint::BigInt;
pub use num_complex::Complex64;
pub use num_rational::Ratio;
