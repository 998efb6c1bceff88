//! Business records mirrored from the document store
//!
//! Field names on the wire are camelCase, as stored. Numeric fields read
//! leniently: a missing or null amount is 0.

pub mod client;
pub mod employee;
pub mod invoice;
pub mod macros;
pub mod product;
pub mod user;

pub use client::Client;
pub use employee::{Employee, Permission};
pub use invoice::{Invoice, InvoiceDraft, InvoiceRequest, LineItem, LineItemRequest};
pub use product::Product;
pub use user::User;

/// Serde helpers for loosely typed stored numbers
pub(crate) mod lenient {
    use serde::{Deserialize, Deserializer};
    use serde_json::Value;

    fn as_f64(value: Value) -> f64 {
        match value {
            Value::Number(n) => n.as_f64().unwrap_or(0.0),
            Value::String(s) => s.trim().parse().unwrap_or(0.0),
            _ => 0.0,
        }
    }

    /// Number, numeric string, null or missing → f64 (0 when unusable)
    pub fn f64<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
        Ok(as_f64(Value::deserialize(deserializer)?))
    }

    /// Same as [`f64`], truncated to an integer
    pub fn i64<'de, D: Deserializer<'de>>(deserializer: D) -> Result<i64, D::Error> {
        Ok(as_f64(Value::deserialize(deserializer)?) as i64)
    }
}

/// "client" → "Client"
pub(crate) fn display_name(singular: &str) -> String {
    let mut chars = singular.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
