//! Standard numeric types and conversions.
//!
//! Registers the runtime types of the value model at fixed specificity ranks
//! and the automatic conversions between them. Conversion costs are chosen so
//! that staying in the real-number tower is always cheaper than widening to
//! Complex, and exact widenings are cheaper than lossy-prone ones.

use crate::conversion::ConversionGraph;
use crate::error::CallError;
use crate::registry::TypeRegistry;
use num_traits::ToPrimitive;
use numera_values::{BigInt, Complex64, Matrix, Ratio, Value};

pub const BOOLEAN_RANK: u32 = 10;
pub const NUMBER_RANK: u32 = 20;
pub const BIGNUMBER_RANK: u32 = 30;
pub const FRACTION_RANK: u32 = 40;
pub const COMPLEX_RANK: u32 = 50;
pub const STRING_RANK: u32 = 60;
pub const ARRAY_RANK: u32 = 70;
pub const MATRIX_RANK: u32 = 80;

// Largest f64 magnitude whose integer value survives an i64 round trip.
const MAX_SAFE_INTEGER: f64 = 9_007_199_254_740_992.0;

fn is_boolean(value: &Value) -> bool {
    matches!(value, Value::Boolean(_))
}

fn is_number(value: &Value) -> bool {
    matches!(value, Value::Number(_))
}

fn is_bignumber(value: &Value) -> bool {
    matches!(value, Value::BigNumber(_))
}

fn is_fraction(value: &Value) -> bool {
    matches!(value, Value::Fraction(_))
}

fn is_complex(value: &Value) -> bool {
    matches!(value, Value::Complex(_))
}

fn is_string(value: &Value) -> bool {
    matches!(value, Value::Str(_))
}

fn is_array(value: &Value) -> bool {
    matches!(value, Value::Array(_))
}

fn is_matrix(value: &Value) -> bool {
    matches!(value, Value::Matrix(_))
}

/// Registry with the standard types installed at their specificity ranks
pub fn standard_registry() -> TypeRegistry {
    let mut registry = TypeRegistry::new();
    let types: &[(&str, fn(&Value) -> bool, u32)] = &[
        ("boolean", is_boolean, BOOLEAN_RANK),
        ("number", is_number, NUMBER_RANK),
        ("BigNumber", is_bignumber, BIGNUMBER_RANK),
        ("Fraction", is_fraction, FRACTION_RANK),
        ("Complex", is_complex, COMPLEX_RANK),
        ("string", is_string, STRING_RANK),
        ("Array", is_array, ARRAY_RANK),
        ("Matrix", is_matrix, MATRIX_RANK),
    ];
    for &(name, test, rank) in types {
        registry
            .register(name, test, rank)
            .expect("standard types register once into a fresh registry");
    }
    registry
}

fn unexpected(from: &str, to: &str, value: &Value) -> CallError {
    CallError::conversion_failed(from, to, format!("value is {}", value.type_name()))
}

fn boolean_to_number(value: &Value) -> Result<Value, CallError> {
    match value {
        Value::Boolean(b) => Ok(Value::Number(if *b { 1.0 } else { 0.0 })),
        other => Err(unexpected("boolean", "number", other)),
    }
}

fn boolean_to_bignumber(value: &Value) -> Result<Value, CallError> {
    match value {
        Value::Boolean(b) => Ok(Value::BigNumber(BigInt::from(if *b { 1 } else { 0 }))),
        other => Err(unexpected("boolean", "BigNumber", other)),
    }
}

fn boolean_to_fraction(value: &Value) -> Result<Value, CallError> {
    match value {
        Value::Boolean(b) => Ok(Value::Fraction(Ratio::new(if *b { 1 } else { 0 }, 1))),
        other => Err(unexpected("boolean", "Fraction", other)),
    }
}

fn number_to_bignumber(value: &Value) -> Result<Value, CallError> {
    match value {
        Value::Number(n) => {
            if !n.is_finite() || n.fract() != 0.0 || n.abs() > MAX_SAFE_INTEGER {
                return Err(CallError::conversion_failed(
                    "number",
                    "BigNumber",
                    format!("{n} is not an exactly representable integer"),
                ));
            }
            Ok(Value::BigNumber(BigInt::from(*n as i64)))
        }
        other => Err(unexpected("number", "BigNumber", other)),
    }
}

fn number_to_fraction(value: &Value) -> Result<Value, CallError> {
    match value {
        Value::Number(n) => rational_form(*n)
            .map(|(numer, denom)| Value::Fraction(Ratio::new(numer, denom)))
            .ok_or_else(|| {
                CallError::conversion_failed(
                    "number",
                    "Fraction",
                    format!("{n} has no exact small-denominator form"),
                )
            }),
        other => Err(unexpected("number", "Fraction", other)),
    }
}

fn number_to_complex(value: &Value) -> Result<Value, CallError> {
    match value {
        Value::Number(n) => Ok(Value::Complex(Complex64::new(*n, 0.0))),
        other => Err(unexpected("number", "Complex", other)),
    }
}

fn bignumber_to_complex(value: &Value) -> Result<Value, CallError> {
    match value {
        Value::BigNumber(b) => match b.to_f64().filter(|f| f.is_finite()) {
            Some(real) => Ok(Value::Complex(Complex64::new(real, 0.0))),
            None => Err(CallError::conversion_failed(
                "BigNumber",
                "Complex",
                format!("{b} exceeds the f64 range"),
            )),
        },
        other => Err(unexpected("BigNumber", "Complex", other)),
    }
}

fn array_to_matrix(value: &Value) -> Result<Value, CallError> {
    match value {
        Value::Array(items) => {
            let mut rows = Vec::with_capacity(items.len());
            let mut nested = !items.is_empty();
            for item in items {
                if let Value::Array(row) = item {
                    rows.push(row.clone());
                } else {
                    nested = false;
                    break;
                }
            }
            let matrix = if nested {
                Matrix::from_rows(rows)?
            } else {
                Matrix::new(items.clone(), 1, items.len())?
            };
            Ok(Value::Matrix(matrix))
        }
        other => Err(unexpected("Array", "Matrix", other)),
    }
}

fn matrix_to_array(value: &Value) -> Result<Value, CallError> {
    match value {
        Value::Matrix(matrix) => Ok(Value::Array(matrix.to_nested_rows())),
        other => Err(unexpected("Matrix", "Array", other)),
    }
}

/// Continued-fraction form of a float with a bounded denominator. Succeeds
/// only when some convergent p/q with q <= 1e6 rounds to exactly `n`, so the
/// conversion never changes the value it widens.
fn rational_form(n: f64) -> Option<(i64, i64)> {
    const MAX_DENOMINATOR: i64 = 1_000_000;
    if !n.is_finite() {
        return None;
    }
    let negative = n < 0.0;
    let mut x = n.abs();
    let (mut p0, mut q0, mut p1, mut q1): (i64, i64, i64, i64) = (0, 1, 1, 0);
    for _ in 0..64 {
        if x.floor() > i64::MAX as f64 {
            return None;
        }
        let whole = x.floor() as i64;
        let p2 = whole.checked_mul(p1)?.checked_add(p0)?;
        let q2 = whole.checked_mul(q1)?.checked_add(q0)?;
        if q2 > MAX_DENOMINATOR {
            return None;
        }
        p0 = p1;
        q0 = q1;
        p1 = p2;
        q1 = q2;
        if p1 as f64 / q1 as f64 == n.abs() {
            let numer = if negative { -p1 } else { p1 };
            return Some((numer, q1));
        }
        let fractional = x - x.floor();
        if fractional == 0.0 {
            return None;
        }
        x = 1.0 / fractional;
    }
    None
}

/// Conversion graph with the standard edges installed
pub fn standard_conversions(registry: &TypeRegistry) -> ConversionGraph {
    let mut graph = ConversionGraph::new();
    let edges: &[(&str, &str, fn(&Value) -> Result<Value, CallError>, u32)] = &[
        ("boolean", "number", boolean_to_number, 1),
        ("boolean", "BigNumber", boolean_to_bignumber, 2),
        ("boolean", "Fraction", boolean_to_fraction, 2),
        ("number", "BigNumber", number_to_bignumber, 1),
        ("number", "Fraction", number_to_fraction, 3),
        ("number", "Complex", number_to_complex, 2),
        ("BigNumber", "Complex", bignumber_to_complex, 3),
        ("Array", "Matrix", array_to_matrix, 1),
        ("Matrix", "Array", matrix_to_array, 2),
    ];
    for &(from, to, convert, cost) in edges {
        graph
            .add_conversion(registry, from, to, convert, cost)
            .expect("standard conversions register once over the standard types");
    }
    graph
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_standard_classification_order() {
        let registry = standard_registry();
        let names: Vec<&str> = registry
            .classify(&Value::Number(2.0))
            .iter()
            .map(|d| d.name.as_str())
            .collect();
        assert_eq!(names, vec!["number", "any"]);
    }

    #[test]
    fn test_boolean_widens_exactly() {
        assert_eq!(
            boolean_to_number(&Value::Boolean(true)).unwrap(),
            Value::Number(1.0)
        );
        assert_eq!(
            boolean_to_bignumber(&Value::Boolean(false)).unwrap(),
            Value::BigNumber(BigInt::from(0))
        );
    }

    #[test]
    fn test_number_to_bignumber_requires_integer() {
        assert_eq!(
            number_to_bignumber(&Value::Number(42.0)).unwrap(),
            Value::BigNumber(BigInt::from(42))
        );
        assert!(matches!(
            number_to_bignumber(&Value::Number(2.5)),
            Err(CallError::ConversionFailed { .. })
        ));
        assert!(matches!(
            number_to_bignumber(&Value::Number(f64::NAN)),
            Err(CallError::ConversionFailed { .. })
        ));
    }

    #[test]
    fn test_number_to_fraction_exact_forms_only() {
        assert_eq!(
            number_to_fraction(&Value::Number(0.75)).unwrap(),
            Value::Fraction(Ratio::new(3, 4))
        );
        assert_eq!(
            number_to_fraction(&Value::Number(-2.5)).unwrap(),
            Value::Fraction(Ratio::new(-5, 2))
        );
        // The double closest to 1/3 converts back to the small fraction it
        // came from; pi has no small-denominator form and must fail.
        assert_eq!(
            number_to_fraction(&Value::Number(1.0 / 3.0)).unwrap(),
            Value::Fraction(Ratio::new(1, 3))
        );
        assert!(number_to_fraction(&Value::Number(std::f64::consts::PI)).is_err());
    }

    #[test]
    fn test_array_matrix_round_trip() {
        let nested = Value::Array(vec![
            Value::Array(vec![Value::Number(1.0), Value::Number(2.0)]),
            Value::Array(vec![Value::Number(3.0), Value::Number(4.0)]),
        ]);
        let matrix = array_to_matrix(&nested).unwrap();
        match &matrix {
            Value::Matrix(m) => {
                assert_eq!(m.rows(), 2);
                assert_eq!(m.cols(), 2);
            }
            other => panic!("expected a matrix, got {other}"),
        }
        assert_eq!(matrix_to_array(&matrix).unwrap(), nested);

        let flat = Value::Array(vec![Value::Number(1.0), Value::Number(2.0)]);
        match array_to_matrix(&flat).unwrap() {
            Value::Matrix(m) => {
                assert_eq!(m.rows(), 1);
                assert_eq!(m.cols(), 2);
            }
            other => panic!("expected a matrix, got {other}"),
        }
    }

    #[test]
    fn test_ragged_array_fails_with_shape_error() {
        let ragged = Value::Array(vec![
            Value::Array(vec![Value::Number(1.0), Value::Number(2.0)]),
            Value::Array(vec![Value::Number(3.0)]),
        ]);
        assert!(matches!(
            array_to_matrix(&ragged),
            Err(CallError::Value(_))
        ));
    }

    #[test]
    fn test_standard_graph_edges() {
        let registry = standard_registry();
        let graph = standard_conversions(&registry);
        assert_eq!(graph.len(), 9);

        let number = registry.id_of("number").unwrap();
        let complex = registry.id_of("Complex").unwrap();
        assert!(graph.find_conversion(number, complex).is_some());
        assert!(graph.find_conversion(complex, number).is_none());
    }
}
