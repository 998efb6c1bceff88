//! Reusable field validators
//!
//! Validators other than `required` let values of an unexpected type
//! through; a type mismatch is reported by deserialization instead.

use crate::core::field::is_email;
use serde_json::Value;

/// Validator: field is required (present and not null)
pub fn required() -> impl Fn(&str, &Value) -> Result<(), String> + Send + Sync + Clone {
    |field: &str, value: &Value| {
        if value.is_null() {
            Err(format!("'{field}' is required"))
        } else {
            Ok(())
        }
    }
}

/// Validator: number must be zero or more
pub fn non_negative() -> impl Fn(&str, &Value) -> Result<(), String> + Send + Sync + Clone {
    |field: &str, value: &Value| match value.as_f64() {
        Some(num) if num < 0.0 => Err(format!("'{field}' must not be negative (got {num})")),
        _ => Ok(()),
    }
}

/// Validator: string length (in characters) must be within range
pub fn string_length(
    min: usize,
    max: usize,
) -> impl Fn(&str, &Value) -> Result<(), String> + Send + Sync + Clone {
    move |field: &str, value: &Value| {
        let Some(s) = value.as_str() else {
            return Ok(());
        };
        let len = s.chars().count();
        if len < min {
            Err(format!("'{field}' must be at least {min} characters (got {len})"))
        } else if len > max {
            Err(format!("'{field}' must be at most {max} characters (got {len})"))
        } else {
            Ok(())
        }
    }
}

/// Validator: string must look like an e-mail address
///
/// Empty strings pass, so blank contact fields are accepted.
pub fn email() -> impl Fn(&str, &Value) -> Result<(), String> + Send + Sync + Clone {
    |field: &str, value: &Value| match value.as_str() {
        Some(s) if !s.is_empty() && !is_email(s) => {
            Err(format!("'{field}' must be a valid e-mail address"))
        }
        _ => Ok(()),
    }
}

/// Validator: value must be in allowed list
///
/// Arrays are checked element by element.
pub fn in_list(
    allowed: Vec<String>,
) -> impl Fn(&str, &Value) -> Result<(), String> + Send + Sync + Clone {
    move |field: &str, value: &Value| {
        let check = |s: &str| {
            if allowed.iter().any(|a| a == s) {
                Ok(())
            } else {
                Err(format!(
                    "'{field}' must be one of {allowed:?} (got '{s}')"
                ))
            }
        };
        match value {
            Value::String(s) => check(s),
            Value::Array(items) => items
                .iter()
                .filter_map(Value::as_str)
                .try_for_each(check),
            _ => Ok(()),
        }
    }
}
