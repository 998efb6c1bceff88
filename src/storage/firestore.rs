//! Firestore REST v1 implementation of CollectionService

use crate::core::document::Document;
use crate::core::error::{AppError, AppResult, EntityError, StorageError};
use crate::core::query::{Direction, Operator, Query, QueryConstraint};
use crate::core::service::{
    CollectionService, dedupe_by_id, from_fields, merge_checked, patch_fields, to_fields,
};
use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde_json::{Map, Number, Value, json};
use std::marker::PhantomData;
use std::sync::Arc;

const BACKEND: &str = "firestore";
const DEFAULT_BASE_URL: &str = "https://firestore.googleapis.com/v1";
const PAGE_SIZE: &str = "300";

/// HTTP client bound to one Firestore database
pub struct FirestoreClient {
    http: reqwest::Client,
    base_url: String,
    project_id: String,
    database: String,
    api_key: Option<SecretString>,
    access_token: Option<SecretString>,
}

impl FirestoreClient {
    pub fn new(project_id: impl Into<String>, database: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: DEFAULT_BASE_URL.to_string(),
            project_id: project_id.into(),
            database: database.into(),
            api_key: None,
            access_token: None,
        }
    }

    pub fn with_api_key(mut self, api_key: SecretString) -> Self {
        self.api_key = Some(api_key);
        self
    }

    /// OAuth bearer token sent with every request
    pub fn with_access_token(mut self, token: SecretString) -> Self {
        self.access_token = Some(token);
        self
    }

    /// Point at another endpoint (the local emulator, usually)
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// `.../projects/{p}/databases/{d}/documents`
    pub fn documents_root(&self) -> String {
        format!(
            "{}/projects/{}/databases/{}/documents",
            self.base_url, self.project_id, self.database
        )
    }

    /// Typed accessor for the collection of `T`
    pub fn collection<T: Document>(self: &Arc<Self>) -> FirestoreCollection<T> {
        FirestoreCollection {
            client: Arc::clone(self),
            _marker: PhantomData,
        }
    }

    fn request(&self, method: reqwest::Method, url: &str) -> reqwest::RequestBuilder {
        let mut builder = self.http.request(method, url);
        if let Some(key) = &self.api_key {
            builder = builder.query(&[("key", key.expose_secret())]);
        }
        if let Some(token) = &self.access_token {
            builder = builder.bearer_auth(token.expose_secret());
        }
        builder
    }

    async fn send(&self, builder: reqwest::RequestBuilder) -> AppResult<Option<Value>> {
        let response = builder.send().await.map_err(|e| StorageError::Unavailable {
            backend: BACKEND.to_string(),
            message: e.to_string(),
        })?;
        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let body: Value = response.json().await.unwrap_or(Value::Null);
        if !status.is_success() {
            tracing::warn!(%status, "firestore request failed");
            return Err(error_from_body(&body, status.as_u16()).into());
        }
        Ok(Some(body))
    }
}

/// [`CollectionService`] over one Firestore collection
pub struct FirestoreCollection<T> {
    client: Arc<FirestoreClient>,
    _marker: PhantomData<T>,
}

impl<T> Clone for FirestoreCollection<T> {
    fn clone(&self) -> Self {
        Self {
            client: Arc::clone(&self.client),
            _marker: PhantomData,
        }
    }
}

impl<T: Document> FirestoreCollection<T> {
    fn collection_url(&self) -> String {
        format!("{}/{}", self.client.documents_root(), T::collection())
    }

    fn document_url(&self, id: &str) -> String {
        format!("{}/{}", self.collection_url(), id)
    }

    fn missing(&self, id: &str) -> AppError {
        EntityError::not_found(T::singular(), id).into()
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListResponse {
    #[serde(default)]
    documents: Vec<Value>,
    next_page_token: Option<String>,
}

#[async_trait]
impl<T: Document> CollectionService<T> for FirestoreCollection<T> {
    async fn fetch_all(&self) -> AppResult<Vec<T>> {
        let mut documents = Vec::new();
        let mut page_token: Option<String> = None;
        loop {
            let mut builder = self
                .client
                .request(reqwest::Method::GET, &self.collection_url())
                .query(&[("pageSize", PAGE_SIZE)]);
            if let Some(token) = &page_token {
                builder = builder.query(&[("pageToken", token.as_str())]);
            }
            let Some(body) = self.client.send(builder).await? else {
                break;
            };
            let page: ListResponse =
                serde_json::from_value(body).map_err(|e| StorageError::Serialization {
                    message: e.to_string(),
                })?;
            for document in &page.documents {
                documents.push(decode_document(document)?);
            }
            match page.next_page_token.filter(|t| !t.is_empty()) {
                Some(next) => page_token = Some(next),
                None => break,
            }
        }
        tracing::debug!(collection = T::collection(), count = documents.len(), "fetched collection");
        Ok(dedupe_by_id(documents))
    }

    async fn fetch_one(&self, id: &str) -> AppResult<Option<T>> {
        let builder = self.client.request(reqwest::Method::GET, &self.document_url(id));
        match self.client.send(builder).await? {
            Some(document) => decode_document(&document).map(Some),
            None => Ok(None),
        }
    }

    async fn add(&self, document: T) -> AppResult<T> {
        let body = json!({ "fields": encode_fields(&to_fields(&document)?) });
        let builder = self
            .client
            .request(reqwest::Method::POST, &self.collection_url())
            .json(&body);
        let created = self
            .client
            .send(builder)
            .await?
            .ok_or_else(|| AppError::internal(format!("collection {} not found", T::collection())))?;
        let created: T = decode_document(&created)?;
        tracing::debug!(collection = T::collection(), id = created.id(), "document added");
        Ok(created)
    }

    async fn set(&self, id: &str, document: T) -> AppResult<T> {
        let body = json!({ "fields": encode_fields(&to_fields(&document)?) });
        let builder = self
            .client
            .request(reqwest::Method::PATCH, &self.document_url(id))
            .json(&body);
        let stored = self.client.send(builder).await?.ok_or_else(|| self.missing(id))?;
        tracing::debug!(collection = T::collection(), %id, "document set");
        decode_document(&stored)
    }

    async fn update(&self, id: &str, patch: Value) -> AppResult<T> {
        let patch = patch_fields(patch)?;
        let current = self.fetch_one(id).await?.ok_or_else(|| self.missing(id))?;
        merge_checked::<T>(id, &to_fields(&current)?, &patch)?;

        let mut params: Vec<(&str, String)> = patch
            .keys()
            .map(|key| ("updateMask.fieldPaths", quote_field_path(key)))
            .collect();
        params.push(("currentDocument.exists", "true".to_string()));

        let builder = self
            .client
            .request(reqwest::Method::PATCH, &self.document_url(id))
            .query(&params)
            .json(&json!({ "fields": encode_fields(&patch) }));
        let merged = self.client.send(builder).await?.ok_or_else(|| self.missing(id))?;
        tracing::debug!(collection = T::collection(), %id, "document updated");
        decode_document(&merged)
    }

    async fn remove(&self, id: &str) -> AppResult<()> {
        let builder = self.client.request(reqwest::Method::DELETE, &self.document_url(id));
        self.client.send(builder).await?;
        tracing::debug!(collection = T::collection(), %id, "document removed");
        Ok(())
    }

    async fn query(&self, query: &Query) -> AppResult<Vec<T>> {
        let url = format!("{}:runQuery", self.client.documents_root());
        let builder = self
            .client
            .request(reqwest::Method::POST, &url)
            .json(&structured_query(T::collection(), query));
        let Some(body) = self.client.send(builder).await? else {
            return Ok(Vec::new());
        };
        body.as_array()
            .map(|rows| rows.iter().filter_map(|row| row.get("document")).collect::<Vec<_>>())
            .unwrap_or_default()
            .into_iter()
            .map(decode_document)
            .collect()
    }
}

/// Build the `:runQuery` request body
pub fn structured_query(collection: &str, query: &Query) -> Value {
    let mut structured = Map::new();
    structured.insert("from".to_string(), json!([{ "collectionId": collection }]));

    let mut filters: Vec<Value> = query.filters.iter().map(field_filter).collect();
    match filters.len() {
        0 => {}
        1 => {
            structured.insert("where".to_string(), filters.remove(0));
        }
        _ => {
            structured.insert(
                "where".to_string(),
                json!({ "compositeFilter": { "op": "AND", "filters": filters } }),
            );
        }
    }

    if !query.order_by.is_empty() {
        let order: Vec<Value> = query
            .order_by
            .iter()
            .map(|o| {
                json!({
                    "field": { "fieldPath": quote_field_path(&o.field) },
                    "direction": match o.direction {
                        Direction::Asc => "ASCENDING",
                        Direction::Desc => "DESCENDING",
                    },
                })
            })
            .collect();
        structured.insert("orderBy".to_string(), Value::Array(order));
    }
    if let Some(limit) = query.limit {
        structured.insert("limit".to_string(), json!(limit));
    }
    json!({ "structuredQuery": structured })
}

fn field_filter(constraint: &QueryConstraint) -> Value {
    let op = match constraint.op {
        Operator::Equal => "EQUAL",
        Operator::NotEqual => "NOT_EQUAL",
        Operator::LessThan => "LESS_THAN",
        Operator::LessThanOrEqual => "LESS_THAN_OR_EQUAL",
        Operator::GreaterThan => "GREATER_THAN",
        Operator::GreaterThanOrEqual => "GREATER_THAN_OR_EQUAL",
        Operator::ArrayContains => "ARRAY_CONTAINS",
        Operator::In => "IN",
    };
    json!({
        "fieldFilter": {
            "field": { "fieldPath": quote_field_path(&constraint.field) },
            "op": op,
            "value": encode_value(&constraint.value),
        }
    })
}

/// Quote each segment of a dotted path that is not a simple identifier
pub fn quote_field_path(path: &str) -> String {
    path.split('.')
        .map(|segment| {
            let simple = segment
                .chars()
                .next()
                .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
                && segment.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');
            if simple {
                segment.to_string()
            } else {
                format!("`{}`", segment.replace('\\', "\\\\").replace('`', "\\`"))
            }
        })
        .collect::<Vec<_>>()
        .join(".")
}

/// JSON → Firestore typed value
pub fn encode_value(value: &Value) -> Value {
    match value {
        Value::Null => json!({ "nullValue": null }),
        Value::Bool(b) => json!({ "booleanValue": b }),
        Value::Number(n) => match n.as_i64() {
            Some(i) => json!({ "integerValue": i.to_string() }),
            None => json!({ "doubleValue": n.as_f64().unwrap_or_default() }),
        },
        Value::String(s) => json!({ "stringValue": s }),
        Value::Array(items) => {
            json!({ "arrayValue": { "values": items.iter().map(encode_value).collect::<Vec<_>>() } })
        }
        Value::Object(fields) => json!({ "mapValue": { "fields": encode_fields(fields) } }),
    }
}

fn encode_fields(fields: &Map<String, Value>) -> Map<String, Value> {
    fields
        .iter()
        .map(|(k, v)| (k.clone(), encode_value(v)))
        .collect()
}

/// Firestore typed value → JSON
///
/// Timestamps, references and bytes decode to their string form.
pub fn decode_value(value: &Value) -> Value {
    let Some((kind, inner)) = value.as_object().and_then(|o| o.iter().next()) else {
        return Value::Null;
    };
    match kind.as_str() {
        "booleanValue" => inner.as_bool().map_or(Value::Null, Value::Bool),
        "integerValue" => inner
            .as_str()
            .and_then(|s| s.parse::<i64>().ok())
            .or_else(|| inner.as_i64())
            .map_or(Value::Null, |i| Value::Number(i.into())),
        "doubleValue" => inner
            .as_f64()
            .and_then(Number::from_f64)
            .map_or(Value::Null, Value::Number),
        "stringValue" | "timestampValue" | "referenceValue" | "bytesValue" => inner.clone(),
        "geoPointValue" => json!({
            "latitude": inner.get("latitude").cloned().unwrap_or(json!(0.0)),
            "longitude": inner.get("longitude").cloned().unwrap_or(json!(0.0)),
        }),
        "arrayValue" => Value::Array(
            inner
                .get("values")
                .and_then(Value::as_array)
                .map(|items| items.iter().map(decode_value).collect())
                .unwrap_or_default(),
        ),
        "mapValue" => Value::Object(decode_fields(inner.get("fields"))),
        _ => Value::Null,
    }
}

fn decode_fields(fields: Option<&Value>) -> Map<String, Value> {
    fields
        .and_then(Value::as_object)
        .map(|f| f.iter().map(|(k, v)| (k.clone(), decode_value(v))).collect())
        .unwrap_or_default()
}

/// Last segment of a document resource name
pub fn document_id(name: &str) -> &str {
    name.rsplit('/').next().unwrap_or(name)
}

fn decode_document<T: Document>(document: &Value) -> AppResult<T> {
    let name = document.get("name").and_then(Value::as_str).unwrap_or_default();
    from_fields(document_id(name), decode_fields(document.get("fields")))
}

/// Map an error body (`{"error": {"code", "status", "message"}}`) to a
/// storage error through the backend code table
pub fn error_from_body(body: &Value, http_status: u16) -> StorageError {
    let error = body.get("error");
    let status = error
        .and_then(|e| e.get("status"))
        .and_then(Value::as_str)
        .unwrap_or_default();
    let message = error
        .and_then(|e| e.get("message"))
        .and_then(Value::as_str)
        .map(str::to_string)
        .unwrap_or_else(|| format!("HTTP {http_status}"));
    let code = match status {
        "" => match http_status {
            403 => "permission-denied".to_string(),
            409 => "already-exists".to_string(),
            503 => "unavailable".to_string(),
            _ => "unknown".to_string(),
        },
        other => other.to_ascii_lowercase().replace('_', "-"),
    };
    StorageError::from_backend_code(BACKEND, &code, message)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::Product;

    #[test]
    fn test_encode_scalars() {
        assert_eq!(encode_value(&json!(null)), json!({"nullValue": null}));
        assert_eq!(encode_value(&json!(true)), json!({"booleanValue": true}));
        assert_eq!(encode_value(&json!(7)), json!({"integerValue": "7"}));
        assert_eq!(encode_value(&json!(2.5)), json!({"doubleValue": 2.5}));
        assert_eq!(encode_value(&json!("x")), json!({"stringValue": "x"}));
    }

    #[test]
    fn test_encode_nested() {
        let encoded = encode_value(&json!({"items": [{"quantity": 2}]}));
        assert_eq!(
            encoded,
            json!({"mapValue": {"fields": {"items": {"arrayValue": {"values": [
                {"mapValue": {"fields": {"quantity": {"integerValue": "2"}}}}
            ]}}}}})
        );
    }

    #[test]
    fn test_decode_values() {
        assert_eq!(decode_value(&json!({"integerValue": "42"})), json!(42));
        assert_eq!(decode_value(&json!({"doubleValue": 1.25})), json!(1.25));
        assert_eq!(
            decode_value(&json!({"timestampValue": "2024-03-01T10:00:00Z"})),
            json!("2024-03-01T10:00:00Z")
        );
        assert_eq!(decode_value(&json!({"arrayValue": {}})), json!([]));
        assert_eq!(decode_value(&json!({"mapValue": {}})), json!({}));
        assert_eq!(decode_value(&json!({"nullValue": null})), json!(null));
    }

    #[test]
    fn test_decode_document_takes_id_from_name() {
        let document = json!({
            "name": "projects/p/databases/(default)/documents/products/abc123",
            "fields": {
                "name": {"stringValue": "Oil"},
                "price": {"doubleValue": 30.5},
                "stock": {"integerValue": "4"}
            }
        });
        let product: Product = decode_document(&document).unwrap();
        assert_eq!(product.id, "abc123");
        assert_eq!(product.stock, 4);
        assert_eq!(product.reorder_point, 0);
    }

    #[test]
    fn test_quote_field_path() {
        assert_eq!(quote_field_path("client.name"), "client.name");
        assert_eq!(quote_field_path("my-field"), "`my-field`");
        assert_eq!(quote_field_path("1st"), "`1st`");
    }

    #[test]
    fn test_structured_query_single_filter() {
        let body = structured_query("products", &Query::new().where_eq("barcode", "123"));
        assert_eq!(body["structuredQuery"]["from"][0]["collectionId"], "products");
        let filter = &body["structuredQuery"]["where"]["fieldFilter"];
        assert_eq!(filter["op"], "EQUAL");
        assert_eq!(filter["value"], json!({"stringValue": "123"}));
    }

    #[test]
    fn test_structured_query_composite_and_order() {
        let query = Query::new()
            .filter("stock", Operator::LessThanOrEqual, 5)
            .where_eq("name", "Oil")
            .order_by("stock", Direction::Desc)
            .limit(3);
        let body = structured_query("products", &query);
        let sq = &body["structuredQuery"];
        assert_eq!(sq["where"]["compositeFilter"]["op"], "AND");
        assert_eq!(sq["where"]["compositeFilter"]["filters"].as_array().unwrap().len(), 2);
        assert_eq!(sq["orderBy"][0]["direction"], "DESCENDING");
        assert_eq!(sq["limit"], 3);
    }

    #[test]
    fn test_error_mapping() {
        let denied = error_from_body(
            &json!({"error": {"code": 403, "status": "PERMISSION_DENIED", "message": "no"}}),
            403,
        );
        assert!(matches!(denied, StorageError::PermissionDenied { .. }));

        let exists = error_from_body(&json!({"error": {"status": "ALREADY_EXISTS"}}), 409);
        assert!(matches!(exists, StorageError::AlreadyExists { .. }));

        let other = error_from_body(&json!(null), 500);
        assert_eq!(other.error_code(), "INTERNAL_ERROR");
    }

    #[test]
    fn test_documents_root() {
        let client = FirestoreClient::new("shop", "(default)").with_base_url("http://localhost:8080/v1/");
        assert_eq!(
            client.documents_root(),
            "http://localhost:8080/v1/projects/shop/databases/(default)/documents"
        );
    }
}
