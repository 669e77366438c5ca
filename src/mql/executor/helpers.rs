//! Operator semantics shared by expressions and restrictions.
//!
//! - add_values: `+` as string concatenation or numeric sum
//! - compare_values: `<`, `<=`, `>`, `>=`, `==`, `!=`
//! - to_bool: truthiness for `and`/`or`/`not` and bare restriction leaves

use std::cmp::Ordering;

use crate::error::{MqlError, MqlResult};
use crate::mql::ast::ComparisonOp;
use crate::mql::value::Value;

/// String concatenation when either side is text, otherwise numeric sum.
pub fn add_values(left: &Value, right: &Value) -> MqlResult<Value> {
    match (left, right) {
        (Value::String(_), _) | (_, Value::String(_)) => {
            Ok(Value::String(format!("{}{}", left, right)))
        }
        (Value::Int(a), Value::Int(b)) => Ok(a
            .checked_add(*b)
            .map(Value::Int)
            .unwrap_or(Value::Float(*a as f64 + *b as f64))),
        (l, r) if l.is_numeric() && r.is_numeric() => {
            let (a, b) = (l.as_f64().unwrap_or_default(), r.as_f64().unwrap_or_default());
            Ok(Value::Float(a + b))
        }
        _ => Err(MqlError::type_mismatch(format!(
            "cannot add {} and {}",
            left.type_name(),
            right.type_name()
        ))),
    }
}

pub fn compare_values(op: ComparisonOp, left: &Value, right: &Value) -> MqlResult<bool> {
    let ordering = match (left, right) {
        (Value::Null, _) | (_, Value::Null) => {
            if op.is_ordering() {
                return Err(MqlError::type_mismatch(format!(
                    "cannot order {} {} {}",
                    left.type_name(),
                    op.symbol(),
                    right.type_name()
                )));
            }
            let equal = left.is_null() && right.is_null();
            return Ok(if op == ComparisonOp::Eq { equal } else { !equal });
        }
        (Value::Int(a), Value::Int(b)) => Some(a.cmp(b)),
        (l, r) if l.is_numeric() && r.is_numeric() => {
            let (a, b) = (l.as_f64().unwrap_or_default(), r.as_f64().unwrap_or_default());
            a.partial_cmp(&b)
        }
        (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
        (Value::Bool(a), Value::Bool(b)) => {
            if op.is_ordering() {
                return Err(MqlError::type_mismatch(format!(
                    "booleans only support == and !=, got {}",
                    op.symbol()
                )));
            }
            Some(a.cmp(b))
        }
        _ => {
            return Err(MqlError::type_mismatch(format!(
                "cannot compare {} {} {}",
                left.type_name(),
                op.symbol(),
                right.type_name()
            )))
        }
    };

    // NaN compares unequal to everything
    let Some(ordering) = ordering else {
        return Ok(op == ComparisonOp::Neq);
    };

    Ok(match op {
        ComparisonOp::Lt => ordering == Ordering::Less,
        ComparisonOp::Lte => ordering != Ordering::Greater,
        ComparisonOp::Gt => ordering == Ordering::Greater,
        ComparisonOp::Gte => ordering != Ordering::Less,
        ComparisonOp::Eq => ordering == Ordering::Equal,
        ComparisonOp::Neq => ordering != Ordering::Equal,
    })
}

/// Only booleans have truthiness; null counts as false.
pub fn to_bool(value: &Value) -> MqlResult<bool> {
    match value {
        Value::Bool(b) => Ok(*b),
        Value::Null => Ok(false),
        other => Err(MqlError::type_mismatch(format!(
            "expected boolean, got {}",
            other.type_name()
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_concatenates_when_either_side_is_text() {
        let joined = add_values(&Value::from("Joe"), &Value::from(" ")).unwrap();
        assert_eq!(joined, Value::from("Joe "));
        assert_eq!(
            add_values(&Value::Int(4), &Value::from(" tweets")).unwrap(),
            Value::from("4 tweets")
        );
        assert_eq!(
            add_values(&Value::from("id-"), &Value::Null).unwrap(),
            Value::from("id-null")
        );
    }

    #[test]
    fn test_add_widens_numbers() {
        assert_eq!(add_values(&Value::Int(2), &Value::Int(3)).unwrap(), Value::Int(5));
        assert_eq!(
            add_values(&Value::Int(2), &Value::Float(0.5)).unwrap(),
            Value::Float(2.5)
        );
        assert_eq!(
            add_values(&Value::Int(i64::MAX), &Value::Int(1)).unwrap(),
            Value::Float(i64::MAX as f64 + 1.0)
        );
    }

    #[test]
    fn test_add_type_mismatch() {
        assert!(matches!(
            add_values(&Value::Int(1), &Value::Bool(true)),
            Err(MqlError::TypeMismatch(_))
        ));
        assert!(matches!(
            add_values(&Value::Null, &Value::Int(1)),
            Err(MqlError::TypeMismatch(_))
        ));
    }

    #[test]
    fn test_compare_numbers_and_strings() {
        assert!(compare_values(ComparisonOp::Lt, &Value::Int(4), &Value::Int(5)).unwrap());
        assert!(!compare_values(ComparisonOp::Lt, &Value::Int(5), &Value::Int(5)).unwrap());
        assert!(compare_values(ComparisonOp::Lte, &Value::Int(5), &Value::Float(5.0)).unwrap());
        assert!(compare_values(ComparisonOp::Eq, &Value::Int(2), &Value::Float(2.0)).unwrap());
        assert!(compare_values(ComparisonOp::Gt, &Value::from("b"), &Value::from("a")).unwrap());
        assert!(compare_values(ComparisonOp::Neq, &Value::from("a"), &Value::from("b")).unwrap());
    }

    #[test]
    fn test_compare_null_semantics() {
        assert!(compare_values(ComparisonOp::Eq, &Value::Null, &Value::Null).unwrap());
        assert!(!compare_values(ComparisonOp::Eq, &Value::Null, &Value::Int(1)).unwrap());
        assert!(compare_values(ComparisonOp::Neq, &Value::from("x"), &Value::Null).unwrap());
        assert!(matches!(
            compare_values(ComparisonOp::Lt, &Value::Null, &Value::Int(1)),
            Err(MqlError::TypeMismatch(_))
        ));
        assert!(matches!(
            compare_values(ComparisonOp::Gte, &Value::Null, &Value::Null),
            Err(MqlError::TypeMismatch(_))
        ));
    }

    #[test]
    fn test_compare_booleans_equality_only() {
        assert!(compare_values(ComparisonOp::Eq, &Value::Bool(true), &Value::Bool(true)).unwrap());
        assert!(compare_values(ComparisonOp::Lt, &Value::Bool(false), &Value::Bool(true)).is_err());
    }

    #[test]
    fn test_compare_incompatible_types() {
        assert!(matches!(
            compare_values(ComparisonOp::Eq, &Value::from("4"), &Value::Int(4)),
            Err(MqlError::TypeMismatch(_))
        ));
    }

    #[test]
    fn test_compare_nan() {
        let nan = Value::Float(f64::NAN);
        assert!(!compare_values(ComparisonOp::Eq, &nan, &nan).unwrap());
        assert!(compare_values(ComparisonOp::Neq, &nan, &Value::Int(1)).unwrap());
    }

    #[test]
    fn test_to_bool() {
        assert!(to_bool(&Value::Bool(true)).unwrap());
        assert!(!to_bool(&Value::Null).unwrap());
        assert!(matches!(to_bool(&Value::Int(1)), Err(MqlError::TypeMismatch(_))));
        assert!(matches!(to_bool(&Value::from("yes")), Err(MqlError::TypeMismatch(_))));
    }
}
