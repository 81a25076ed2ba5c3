//! Value coercion between raw input and schema-typed JSON values.
//!
//! Every parser runs incoming values through [`coerce`] (or one of its
//! building blocks). The functions here are pure and total: any JSON value,
//! or no value at all, is accepted and mapped to something sensible for the
//! target type.
//!
//! A missing value (`None`) plays the role of "undefined": the field has not
//! been given a value yet.

use serde_json::{Map, Number, Value};

/// Largest integer an `f64` represents exactly.
const MAX_SAFE_INTEGER: f64 = 9_007_199_254_740_991.0;

/// Coerce `raw` into the JSON type named by `target`.
///
/// | target | result |
/// |---|---|
/// | `boolean` | `true` iff raw is `true` or `"true"` |
/// | `number` | numeric value, `None` if raw is missing or not numeric |
/// | `integer` | as `number`, truncated toward zero |
/// | `string` | textual form, `None` if raw is missing |
/// | `array` | raw if it is an array, else `[]` |
/// | `object` | raw if it is an object, else `{}` |
/// | anything else | raw unchanged |
pub fn coerce(raw: Option<&Value>, target: Option<&str>) -> Option<Value> {
    match target {
        Some("boolean") => Some(Value::Bool(raw.is_some_and(to_boolean))),
        Some("number") => raw.and_then(to_number).and_then(number),
        Some("integer") => raw.and_then(to_number).map(f64::trunc).and_then(number),
        Some("string") => raw.map(|v| Value::String(to_js_string(v))),
        Some("array") => Some(Value::Array(array(raw))),
        Some("object") => Some(Value::Object(object(raw))),
        _ => raw.cloned(),
    }
}

/// Truthiness used by checkbox inputs.
pub fn to_boolean(raw: &Value) -> bool {
    match raw {
        Value::Bool(b) => *b,
        Value::String(s) => s == "true",
        _ => false,
    }
}

/// Numeric reading of a raw value.
///
/// Empty strings and `null` read as missing rather than zero, so a cleared
/// number input does not turn into `0`.
pub fn to_number(raw: &Value) -> Option<f64> {
    match raw {
        Value::Null => None,
        Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
        Value::Number(n) => n.as_f64(),
        Value::String(s) => {
            let s = s.trim();
            if s.is_empty() {
                return None;
            }
            s.parse::<f64>().ok().filter(|f| f.is_finite())
        }
        Value::Array(_) | Value::Object(_) => None,
    }
}

/// Build a JSON number, normalizing integral floats to integers.
pub fn number(f: f64) -> Option<Value> {
    if !f.is_finite() {
        return None;
    }
    if f.fract() == 0.0 && f.abs() <= MAX_SAFE_INTEGER {
        return Some(Value::Number(Number::from(f as i64)));
    }
    Number::from_f64(f).map(Value::Number)
}

/// Textual form of a value, following the rules browsers use when a value
/// lands in a DOM attribute.
pub fn to_js_string(raw: &Value) -> String {
    match raw {
        Value::Null => "null".to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => match (n.as_i64(), n.as_u64()) {
            (Some(i), _) => i.to_string(),
            (_, Some(u)) => u.to_string(),
            _ => n
                .as_f64()
                .and_then(number)
                .map(|v| match v {
                    Value::Number(n) => n.to_string(),
                    other => other.to_string(),
                })
                .unwrap_or_default(),
        },
        Value::String(s) => s.clone(),
        Value::Array(items) => items
            .iter()
            .map(|item| match item {
                Value::Null => String::new(),
                other => to_js_string(other),
            })
            .collect::<Vec<_>>()
            .join(","),
        Value::Object(_) => "[object Object]".to_string(),
    }
}

/// Raw array items, or an empty list for anything that is not an array.
pub fn array(raw: Option<&Value>) -> Vec<Value> {
    match raw {
        Some(Value::Array(items)) => items.clone(),
        _ => Vec::new(),
    }
}

/// Raw object members, or an empty map for anything that is not an object.
pub fn object(raw: Option<&Value>) -> Map<String, Value> {
    match raw {
        Some(Value::Object(map)) => map.clone(),
        _ => Map::new(),
    }
}

/// Whether a value counts as "not filled in".
///
/// Missing, `null`, `""`, `[]`, `{}` and `false` are empty. Numbers never are.
pub fn is_empty(raw: Option<&Value>) -> bool {
    match raw {
        None | Some(Value::Null) => true,
        Some(Value::Bool(b)) => !b,
        Some(Value::Number(_)) => false,
        Some(Value::String(s)) => s.is_empty(),
        Some(Value::Array(items)) => items.is_empty(),
        Some(Value::Object(map)) => map.is_empty(),
    }
}

/// Equality that treats `1` and `1.0` as the same number.
pub fn same(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.as_f64() == y.as_f64(),
        _ => a == b,
    }
}

/// Equality over optional values, see [`same`].
pub fn same_opt(a: Option<&Value>, b: Option<&Value>) -> bool {
    match (a, b) {
        (Some(a), Some(b)) => same(a, b),
        (None, None) => true,
        _ => false,
    }
}
