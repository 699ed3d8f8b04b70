use crate::coercion::type_name;
use crate::errors::{EvalError, Result};
use serde_json::{Number, Value};
use std::cmp::Ordering;

/// Equality used by `==` / `!=`: numbers compare by value, everything else structurally.
pub fn values_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(na), Value::Number(nb)) => compare_numbers(na, nb) == Some(Ordering::Equal),
        (Value::Array(xa), Value::Array(xb)) => {
            xa.len() == xb.len() && xa.iter().zip(xb).all(|(x, y)| values_equal(x, y))
        }
        (Value::Object(ma), Value::Object(mb)) => {
            ma.len() == mb.len()
                && ma
                    .iter()
                    .all(|(k, v)| mb.get(k).is_some_and(|w| values_equal(v, w)))
        }
        _ => a == b,
    }
}

/// Ordering used by the relational operators. Null sorts below every other value.
pub fn compare_values(op: &'static str, a: &Value, b: &Value) -> Result<Ordering> {
    let ord = match (a, b) {
        (Value::Null, Value::Null) => Some(Ordering::Equal),
        (Value::Null, _) => Some(Ordering::Less),
        (_, Value::Null) => Some(Ordering::Greater),
        (Value::Number(na), Value::Number(nb)) => compare_numbers(na, nb),
        (Value::String(sa), Value::String(sb)) => Some(sa.cmp(sb)),
        (Value::Bool(ba), Value::Bool(bb)) => Some(ba.cmp(bb)),
        _ => None,
    };
    ord.ok_or(EvalError::TypeMismatch {
        op,
        left: type_name(a),
        right: type_name(b),
    })
}

fn compare_numbers(a: &Number, b: &Number) -> Option<Ordering> {
    if let (Some(ia), Some(ib)) = (a.as_i64(), b.as_i64()) {
        return Some(ia.cmp(&ib));
    }
    if let (Some(ua), Some(ub)) = (a.as_u64(), b.as_u64()) {
        return Some(ua.cmp(&ub));
    }
    a.as_f64()?.partial_cmp(&b.as_f64()?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn numbers_compare_across_integer_and_decimal() {
        assert!(values_equal(&json!(2), &json!(2.0)));
        assert_eq!(compare_values("<", &json!(1), &json!(1.5)).unwrap(), Ordering::Less);
        assert_eq!(
            compare_values(">", &json!(u64::MAX), &json!(1)).unwrap(),
            Ordering::Greater
        );
    }

    #[test]
    fn null_sorts_first() {
        assert_eq!(compare_values("<", &json!(null), &json!(0)).unwrap(), Ordering::Less);
        assert_eq!(compare_values(">", &json!("a"), &json!(null)).unwrap(), Ordering::Greater);
    }

    #[test]
    fn mismatched_types_do_not_order() {
        assert_eq!(
            compare_values(">", &json!("10"), &json!(5)).unwrap_err(),
            EvalError::TypeMismatch {
                op: ">",
                left: "string",
                right: "integer"
            }
        );
        assert!(!values_equal(&json!("10"), &json!(10)));
    }
}
