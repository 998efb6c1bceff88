//! Document trait defining the core abstraction for stored records

use crate::core::field;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

/// A flat record mirrored from a collection of the document store.
///
/// Every record carries a string id assigned by the store. A record that
/// has not been stored yet has an empty id. The id is not part of the
/// stored fields: backends strip it on write and inject it on read.
///
/// Implementations are usually generated by [`impl_document!`](crate::impl_document).
pub trait Document: Clone + Serialize + DeserializeOwned + Send + Sync + 'static {
    /// The collection name in the store (e.g., "clients", "invoices")
    fn collection() -> &'static str;

    /// The singular name used in messages (e.g., "client", "invoice")
    fn singular() -> &'static str;

    /// The store-assigned id, empty before the record is stored
    fn id(&self) -> &str;

    /// Replace the id (used by backends after creation)
    fn set_id(&mut self, id: String);

    /// Fields matched by free-text search on list endpoints
    fn searchable_fields() -> &'static [&'static str];

    /// Get the value of a field (dotted paths address nested maps)
    fn field_value(&self, path: &str) -> Option<Value> {
        let value = serde_json::to_value(self).ok()?;
        field::lookup_path(&value, path).cloned()
    }

    /// Case-insensitive substring search over the searchable fields
    ///
    /// An empty term matches everything.
    fn matches_search(&self, term: &str) -> bool {
        let needle = term.trim().to_lowercase();
        if needle.is_empty() {
            return true;
        }
        let Ok(value) = serde_json::to_value(self) else {
            return false;
        };
        Self::searchable_fields()
            .iter()
            .any(|path| field::contains_ignore_case(field::lookup_path(&value, path), &needle))
    }
}
