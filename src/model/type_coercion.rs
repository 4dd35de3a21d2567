//! Truthiness and conversion rules shared by the evaluator and helpers

use super::value::{Number, Value};
use std::borrow::Cow;

/// Template truthiness.
///
/// False for `Null`, `false`, zero, NaN, the empty string and empty
/// containers. Non-empty containers are truthy whatever they hold; host
/// objects decide through [`Object::is_truthy`](super::value::Object::is_truthy).
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Boolean(b) => *b,
        Value::Number(n) => !n.is_zero() && !n.is_nan(),
        Value::String(s) => !s.is_empty(),
        Value::Array(items) => !items.is_empty(),
        Value::Map(map) => !map.is_empty(),
        Value::Opaque(object) => object.is_truthy(),
    }
}

/// Whether a value counts as empty for `if`/`unless` with `includeZero=true`
pub fn is_truthy_including_zero(value: &Value) -> bool {
    match value {
        Value::Number(n) => !n.is_nan(),
        other => is_truthy(other),
    }
}

/// Canonical text of a value as written into the output.
///
/// Arrays join their elements with `,`; maps produce nothing.
pub fn to_display_string(value: &Value) -> Cow<'_, str> {
    match value {
        Value::Null => Cow::Borrowed(""),
        Value::Boolean(true) => Cow::Borrowed("true"),
        Value::Boolean(false) => Cow::Borrowed("false"),
        Value::Number(n) => Cow::Owned(n.to_string()),
        Value::String(s) => Cow::Borrowed(s),
        Value::Array(items) => {
            let parts: Vec<Cow<'_, str>> = items.iter().map(to_display_string).collect();
            Cow::Owned(parts.join(","))
        }
        Value::Map(_) => Cow::Borrowed(""),
        Value::Opaque(object) => Cow::Owned(object.display_string()),
    }
}

/// Integer view of a number, `None` for any other variant or a fractional number
pub fn as_i64(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64(),
        _ => None,
    }
}

/// Float view of a number, `None` for any other variant
pub fn as_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => Some(n.as_f64()),
        _ => None,
    }
}

/// Numeric view of a number, `None` for any other variant
pub fn as_number(value: &Value) -> Option<Number> {
    value.as_number()
}
