//! Runtime value representation for the Numera numeric library.
//!
//! This module defines the Value enum that represents all runtime values the
//! dispatch layer can inspect, along with type tagging, display formatting,
//! and conversions to and from native Rust types. Capability checks such as
//! "is this a collection" are explicit methods resolved from the variant tag.

use crate::error::ValueError;
use crate::matrix::Matrix;
use num_bigint::BigInt;
use num_complex::Complex64;
use num_rational::Ratio;
use std::fmt;

/// Runtime values in the Numera library
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Boolean value
    Boolean(bool),
    /// 64-bit floating point number
    Number(f64),
    /// Arbitrary-precision integer
    BigNumber(BigInt),
    /// Exact rational number
    Fraction(Ratio<i64>),
    /// Complex number with f64 components
    Complex(Complex64),
    /// UTF-8 string
    Str(String),
    /// Ordered, possibly nested array of values
    Array(Vec<Value>),
    /// Dense 2-D matrix of values
    Matrix(Matrix),
}

impl Value {
    /// Get the runtime type name of this value, matching the names used by
    /// the standard type registry
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Boolean(_) => "boolean",
            Value::Number(_) => "number",
            Value::BigNumber(_) => "BigNumber",
            Value::Fraction(_) => "Fraction",
            Value::Complex(_) => "Complex",
            Value::Str(_) => "string",
            Value::Array(_) => "Array",
            Value::Matrix(_) => "Matrix",
        }
    }

    /// Check whether this value is an element container (array or matrix)
    pub fn is_collection(&self) -> bool {
        matches!(self, Value::Array(_) | Value::Matrix(_))
    }

    /// Check whether this value is one of the scalar numeric variants
    pub fn is_numeric(&self) -> bool {
        matches!(
            self,
            Value::Boolean(_)
                | Value::Number(_)
                | Value::BigNumber(_)
                | Value::Fraction(_)
                | Value::Complex(_)
        )
    }
}

// From implementations for Value

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Boolean(b)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<BigInt> for Value {
    fn from(b: BigInt) -> Self {
        Value::BigNumber(b)
    }
}

impl From<Ratio<i64>> for Value {
    fn from(r: Ratio<i64>) -> Self {
        Value::Fraction(r)
    }
}

impl From<Complex64> for Value {
    fn from(c: Complex64) -> Self {
        Value::Complex(c)
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(s)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(s.to_string())
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::Array(items)
    }
}

impl From<Matrix> for Value {
    fn from(m: Matrix) -> Self {
        Value::Matrix(m)
    }
}

// TryFrom implementations for extracting native types in implementation bodies

impl TryFrom<&Value> for f64 {
    type Error = ValueError;
    fn try_from(v: &Value) -> Result<Self, Self::Error> {
        match v {
            Value::Number(n) => Ok(*n),
            Value::Boolean(b) => Ok(if *b { 1.0 } else { 0.0 }),
            other => Err(ValueError::extraction(other.type_name(), "f64")),
        }
    }
}

impl TryFrom<&Value> for bool {
    type Error = ValueError;
    fn try_from(v: &Value) -> Result<Self, Self::Error> {
        match v {
            Value::Boolean(b) => Ok(*b),
            other => Err(ValueError::extraction(other.type_name(), "bool")),
        }
    }
}

impl TryFrom<&Value> for String {
    type Error = ValueError;
    fn try_from(v: &Value) -> Result<Self, Self::Error> {
        match v {
            Value::Str(s) => Ok(s.clone()),
            other => Err(ValueError::extraction(other.type_name(), "String")),
        }
    }
}

impl TryFrom<&Value> for Complex64 {
    type Error = ValueError;
    fn try_from(v: &Value) -> Result<Self, Self::Error> {
        match v {
            Value::Complex(c) => Ok(*c),
            Value::Number(n) => Ok(Complex64::new(*n, 0.0)),
            other => Err(ValueError::extraction(other.type_name(), "Complex64")),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Boolean(b) => write!(f, "{b}"),
            Value::Number(n) => write!(f, "{n}"),
            Value::BigNumber(b) => write!(f, "{b}"),
            Value::Fraction(r) => write!(f, "{}/{}", r.numer(), r.denom()),
            Value::Complex(c) => {
                if c.im < 0.0 {
                    write!(f, "{} - {}i", c.re, -c.im)
                } else {
                    write!(f, "{} + {}i", c.re, c.im)
                }
            }
            Value::Str(s) => write!(f, "\"{s}\""),
            Value::Array(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{item}")?;
                }
                write!(f, "]")
            }
            Value::Matrix(m) => write!(f, "{m}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_type_names() {
        assert_eq!(Value::Boolean(true).type_name(), "boolean");
        assert_eq!(Value::Number(1.5).type_name(), "number");
        assert_eq!(Value::BigNumber(BigInt::from(7)).type_name(), "BigNumber");
        assert_eq!(Value::Fraction(Ratio::new(1, 3)).type_name(), "Fraction");
        assert_eq!(
            Value::Complex(Complex64::new(1.0, -2.0)).type_name(),
            "Complex"
        );
        assert_eq!(Value::Str("x".to_string()).type_name(), "string");
        assert_eq!(Value::Array(vec![]).type_name(), "Array");
    }

    #[test]
    fn test_collection_tagging() {
        assert!(Value::Array(vec![Value::Number(1.0)]).is_collection());
        assert!(!Value::Number(1.0).is_collection());
        assert!(Value::Number(1.0).is_numeric());
        assert!(!Value::Str("1".to_string()).is_numeric());
    }

    #[test]
    fn test_native_extraction() {
        assert_eq!(f64::try_from(&Value::Number(2.5)).unwrap(), 2.5);
        assert_eq!(f64::try_from(&Value::Boolean(true)).unwrap(), 1.0);
        assert!(f64::try_from(&Value::Str("x".to_string())).is_err());
    }

    #[test]
    fn test_display() {
        assert_eq!(Value::Number(3.0).to_string(), "3");
        assert_eq!(Value::Fraction(Ratio::new(2, 3)).to_string(), "2/3");
        assert_eq!(
            Value::Complex(Complex64::new(1.0, -2.0)).to_string(),
            "1 - 2i"
        );
        assert_eq!(
            Value::Array(vec![Value::Number(1.0), Value::Str("a".to_string())]).to_string(),
            "[1, \"a\"]"
        );
    }
}
