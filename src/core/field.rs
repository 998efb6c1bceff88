//! Field access and comparison over stored JSON documents

use regex::Regex;
use serde_json::Value;
use std::cmp::Ordering;
use std::sync::OnceLock;

/// Resolve a dotted field path (`client.name`) inside a JSON document
///
/// Returns `None` when any segment is missing or traverses a non-object.
pub fn lookup_path<'a>(value: &'a Value, path: &str) -> Option<&'a Value> {
    path.split('.')
        .try_fold(value, |current, segment| current.as_object()?.get(segment))
}

/// Equality as the document store understands it
///
/// Numbers compare numerically regardless of integer/float encoding.
pub fn values_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.as_f64() == y.as_f64(),
        _ => a == b,
    }
}

/// Ordering between two values of the same kind
///
/// Numbers order numerically, strings lexicographically, booleans
/// `false < true`. Values of different kinds are not comparable.
pub fn compare_values(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.as_f64()?.partial_cmp(&y.as_f64()?),
        (Value::String(x), Value::String(y)) => Some(x.cmp(y)),
        (Value::Bool(x), Value::Bool(y)) => Some(x.cmp(y)),
        (Value::Null, Value::Null) => Some(Ordering::Equal),
        _ => None,
    }
}

/// Total ordering used for sorting mixed documents
///
/// Missing values sort first, then by [`compare_values`], falling back
/// to equality for incomparable kinds so sorts stay stable.
pub fn sort_order(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    match (a, b) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        (Some(x), Some(y)) => compare_values(x, y).unwrap_or(Ordering::Equal),
    }
}

/// Case-insensitive substring match on a string value
pub fn contains_ignore_case(value: Option<&Value>, needle_lower: &str) -> bool {
    value
        .and_then(Value::as_str)
        .is_some_and(|s| s.to_lowercase().contains(needle_lower))
}

const EMAIL_PATTERN: &str = r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$";

static EMAIL_REGEX: OnceLock<Option<Regex>> = OnceLock::new();

/// Whether `value` looks like an e-mail address
pub fn is_email(value: &str) -> bool {
    EMAIL_REGEX
        .get_or_init(|| Regex::new(EMAIL_PATTERN).ok())
        .as_ref()
        .is_some_and(|regex| regex.is_match(value))
}
