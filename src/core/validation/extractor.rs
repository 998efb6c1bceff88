//! Axum extractor for validated payloads
//!
//! `Validated<T>` validates and filters request bodies with the rules of
//! `T` before they reach handlers.

use super::config::EntityValidationConfig;
use axum::{
    Json,
    extract::{FromRequest, Request},
    http::{Method, StatusCode},
    response::{IntoResponse, Response},
};
use serde_json::{Value, json};
use std::marker::PhantomData;

/// Trait for documents that declare validation rules
///
/// Implemented by the validation arm of `impl_document!`.
pub trait ValidatableEntity {
    /// Get the validation configuration for an operation (`create` / `update`)
    fn validation_config(operation: &str) -> EntityValidationConfig;
}

/// Axum extractor that validates and filters a JSON payload
///
/// # Usage
///
/// ```rust,ignore
/// pub async fn create_client(
///     Validated(payload, _): Validated<Client>,
/// ) -> AppResult<Json<Client>> {
///     // payload is already trimmed and checked
/// }
/// ```
pub struct Validated<T>(pub Value, pub PhantomData<T>);

impl<T> Validated<T> {
    pub fn new(payload: Value) -> Self {
        Self(payload, PhantomData)
    }

    pub fn into_inner(self) -> Value {
        self.0
    }
}

impl<T> std::ops::Deref for Validated<T> {
    type Target = Value;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

/// Operation name for a request method
pub fn operation_for(method: &Method) -> &'static str {
    match *method {
        Method::PUT | Method::PATCH => "update",
        _ => "create",
    }
}

impl<S, T> FromRequest<S> for Validated<T>
where
    S: Send + Sync,
    T: ValidatableEntity + Send + Sync,
{
    type Rejection = Response;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let operation = operation_for(req.method());

        let Json(payload): Json<Value> = Json::from_request(req, state).await.map_err(|e| {
            (
                StatusCode::BAD_REQUEST,
                Json(json!({
                    "error": "Invalid JSON",
                    "details": e.body_text(),
                })),
            )
                .into_response()
        })?;

        let config = T::validation_config(operation);
        config
            .validate_and_filter(payload)
            .map(Validated::new)
            .map_err(|errors| {
                tracing::debug!(
                    entity = config.entity_type,
                    operation,
                    errors = errors.len(),
                    "payload rejected"
                );
                (
                    StatusCode::UNPROCESSABLE_ENTITY,
                    Json(json!({
                        "error": "Validation failed",
                        "errors": errors,
                    })),
                )
                    .into_response()
            })
    }
}
