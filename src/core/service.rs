//! Remote-collection accessor
//!
//! [`CollectionService`] is the single seam between handlers and the
//! document store. Backends in [`crate::storage`] implement it once,
//! generically over every [`Document`] type.

use crate::core::document::Document;
use crate::core::error::{AppResult, StorageError, ValidationError};
use crate::core::query::Query;
use async_trait::async_trait;
use serde_json::{Map, Value};
use std::collections::HashSet;

/// CRUD and query access to one named collection
///
/// The store is authoritative: there is no cache, every call is a round
/// trip, and records are independent documents without referential
/// integrity.
#[async_trait]
pub trait CollectionService<T: Document>: Send + Sync {
    /// Every document of the collection, in the store's order
    ///
    /// Documents sharing an id are reported once (first occurrence wins).
    async fn fetch_all(&self) -> AppResult<Vec<T>>;

    /// One document, `None` when it does not exist
    async fn fetch_one(&self, id: &str) -> AppResult<Option<T>>;

    /// Store a new document; the store assigns the id
    async fn add(&self, document: T) -> AppResult<T>;

    /// Create or overwrite the document under a caller-chosen id
    async fn set(&self, id: &str, document: T) -> AppResult<T>;

    /// Merge the top-level fields of `patch` into an existing document
    ///
    /// Fails with a not-found error when the document does not exist.
    async fn update(&self, id: &str, patch: Value) -> AppResult<T>;

    /// Delete a document; deleting a missing document succeeds
    async fn remove(&self, id: &str) -> AppResult<()>;

    /// Documents matching every constraint of `query`
    async fn query(&self, query: &Query) -> AppResult<Vec<T>>;
}

/// Keep the first document for each id, preserving order
pub fn dedupe_by_id<T: Document>(documents: Vec<T>) -> Vec<T> {
    let mut seen = HashSet::new();
    documents
        .into_iter()
        .filter(|d| seen.insert(d.id().to_string()))
        .collect()
}

/// Serialize a document into its stored fields (the id is not stored)
pub fn to_fields<T: Document>(document: &T) -> AppResult<Map<String, Value>> {
    match serde_json::to_value(document).map_err(serialization_error)? {
        Value::Object(mut fields) => {
            fields.remove("id");
            Ok(fields)
        }
        other => Err(StorageError::Serialization {
            message: format!("{} serialized to a non-object: {other}", T::singular()),
        }
        .into()),
    }
}

/// Rebuild a document from its id and stored fields
pub fn from_fields<T: Document>(id: &str, mut fields: Map<String, Value>) -> AppResult<T> {
    fields.insert("id".to_string(), Value::String(id.to_string()));
    serde_json::from_value(Value::Object(fields)).map_err(serialization_error)
}

/// Validate an update payload and return its top-level fields
///
/// The `id` key is ignored: ids are immutable.
pub fn patch_fields(patch: Value) -> AppResult<Map<String, Value>> {
    match patch {
        Value::Object(mut fields) => {
            fields.remove("id");
            Ok(fields)
        }
        _ => Err(ValidationError::InvalidJson {
            message: "update payload must be a JSON object".to_string(),
        }
        .into()),
    }
}

/// Shallow merge: every top-level key of `patch` replaces the stored one
pub fn merge_fields(target: &mut Map<String, Value>, patch: Map<String, Value>) {
    for (key, value) in patch {
        target.insert(key, value);
    }
}

/// Merge `patch` into a copy of `stored` and decode the result
///
/// The stored fields are untouched. A patch that would leave the document
/// undecodable is rejected with a field error naming the offending key,
/// so backends only commit merges that still read back as `T`.
pub fn merge_checked<T: Document>(
    id: &str,
    stored: &Map<String, Value>,
    patch: &Map<String, Value>,
) -> AppResult<(Map<String, Value>, T)> {
    let mut merged = stored.clone();
    merge_fields(&mut merged, patch.clone());
    match from_fields::<T>(id, merged.clone()) {
        Ok(document) => Ok((merged, document)),
        Err(_) => Err(rejected_patch_field::<T>(id, stored, patch).into()),
    }
}

fn rejected_patch_field<T: Document>(
    id: &str,
    stored: &Map<String, Value>,
    patch: &Map<String, Value>,
) -> ValidationError {
    for (key, value) in patch {
        let mut single = stored.clone();
        single.insert(key.clone(), value.clone());
        if let Err(err) = from_fields::<T>(id, single) {
            return ValidationError::FieldError {
                field: key.clone(),
                message: err.to_string(),
            };
        }
    }
    ValidationError::FieldError {
        field: "_root".to_string(),
        message: format!("patch does not fit a {}", T::singular()),
    }
}

fn serialization_error(err: serde_json::Error) -> crate::core::error::AppError {
    StorageError::Serialization {
        message: err.to_string(),
    }
    .into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::{Deserialize, Serialize};
    use serde_json::json;

    #[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
    struct Tag {
        #[serde(default, skip_serializing_if = "String::is_empty")]
        id: String,
        label: String,
        #[serde(default)]
        weight: f64,
    }

    impl Document for Tag {
        fn collection() -> &'static str {
            "tags"
        }
        fn singular() -> &'static str {
            "tag"
        }
        fn id(&self) -> &str {
            &self.id
        }
        fn set_id(&mut self, id: String) {
            self.id = id;
        }
        fn searchable_fields() -> &'static [&'static str] {
            &["label"]
        }
    }

    fn tag(id: &str, label: &str) -> Tag {
        Tag {
            id: id.to_string(),
            label: label.to_string(),
            weight: 0.0,
        }
    }

    #[test]
    fn test_dedupe_keeps_first_occurrence() {
        let docs = vec![tag("1", "first"), tag("2", "other"), tag("1", "second")];
        let deduped = dedupe_by_id(docs);
        assert_eq!(deduped.len(), 2);
        assert_eq!(deduped[0].label, "first");
        assert_eq!(deduped[1].id, "2");
    }

    #[test]
    fn test_fields_strip_and_restore_id() {
        let fields = to_fields(&tag("t1", "red")).unwrap();
        assert!(!fields.contains_key("id"));
        let restored: Tag = from_fields("t1", fields).unwrap();
        assert_eq!(restored, tag("t1", "red"));
    }

    #[test]
    fn test_patch_must_be_object() {
        assert!(patch_fields(json!([1, 2])).is_err());
        let fields = patch_fields(json!({"id": "x", "label": "blue"})).unwrap();
        assert!(!fields.contains_key("id"));
    }

    #[test]
    fn test_merge_checked_leaves_stored_fields_alone() {
        let stored = to_fields(&tag("t1", "red")).unwrap();

        let (merged, updated) =
            merge_checked::<Tag>("t1", &stored, &patch_fields(json!({"weight": 1.5})).unwrap())
                .unwrap();
        assert_eq!(updated.weight, 1.5);
        assert_eq!(merged["weight"], json!(1.5));
        assert_eq!(stored["weight"], json!(0.0));

        let err = merge_checked::<Tag>(
            "t1",
            &stored,
            &patch_fields(json!({"label": "blue", "weight": "heavy"})).unwrap(),
        )
        .unwrap_err();
        assert_eq!(err.status_code(), axum::http::StatusCode::UNPROCESSABLE_ENTITY);
        assert!(matches!(
            err,
            crate::core::error::AppError::Validation(ValidationError::FieldError { ref field, .. })
                if field == "weight"
        ));
        assert_eq!(stored["label"], json!("red"));
    }

    #[test]
    fn test_merge_is_shallow() {
        let mut stored = to_fields(&Tag {
            id: String::new(),
            label: "red".to_string(),
            weight: 2.0,
        })
        .unwrap();
        merge_fields(&mut stored, patch_fields(json!({"weight": 3.5})).unwrap());
        assert_eq!(stored["label"], json!("red"));
        assert_eq!(stored["weight"], json!(3.5));
    }
}
