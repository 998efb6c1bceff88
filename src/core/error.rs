//! Typed error handling for shopdesk
//!
//! Every fallible operation in the crate returns [`AppResult`], so handlers
//! can match on concrete failures instead of opaque `anyhow::Error`s and
//! the HTTP layer can map them to stable status codes.
//!
//! # Error Categories
//!
//! - [`EntityError`]: a record is missing or already exists
//! - [`ValidationError`]: rejected input (field errors, bad JSON, incomplete invoices)
//! - [`StorageError`]: failures reported by the collection backend
//! - [`RequestError`]: authentication, authorization and malformed requests
//! - [`ConfigError`]: configuration loading problems
//!
//! # Example
//!
//! ```rust,ignore
//! let client = clients
//!     .fetch_one(&id)
//!     .await?
//!     .ok_or_else(|| EntityError::not_found("client", &id))?;
//! ```

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use thiserror::Error;

/// The main error type for shopdesk
#[derive(Debug, Error)]
pub enum AppError {
    /// Record-level errors (missing / duplicate documents)
    #[error(transparent)]
    Entity(#[from] EntityError),

    /// Input validation errors
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Collection backend errors
    #[error(transparent)]
    Storage(#[from] StorageError),

    /// Authentication / authorization / request shape errors
    #[error(transparent)]
    Request(#[from] RequestError),

    /// Configuration errors
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Internal errors (should not happen in normal operation)
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Error response structure for HTTP responses
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// Error code for programmatic handling
    pub code: String,
    /// Human-readable error message
    pub message: String,
    /// Optional additional details
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl AppError {
    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::Entity(e) => e.status_code(),
            AppError::Validation(e) => e.status_code(),
            AppError::Storage(e) => e.status_code(),
            AppError::Request(e) => e.status_code(),
            AppError::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Get the error code for this error
    pub fn error_code(&self) -> &'static str {
        match self {
            AppError::Entity(e) => e.error_code(),
            AppError::Validation(e) => e.error_code(),
            AppError::Storage(e) => e.error_code(),
            AppError::Request(e) => e.error_code(),
            AppError::Config(_) => "CONFIG_ERROR",
            AppError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Convert to an error response
    pub fn to_response(&self) -> ErrorResponse {
        ErrorResponse {
            code: self.error_code().to_string(),
            message: self.to_string(),
            details: self.details(),
        }
    }

    fn details(&self) -> Option<serde_json::Value> {
        match self {
            AppError::Entity(EntityError::NotFound { entity_type, id })
            | AppError::Entity(EntityError::AlreadyExists { entity_type, id }) => {
                Some(serde_json::json!({
                    "entity_type": entity_type,
                    "id": id,
                }))
            }
            AppError::Validation(ValidationError::FieldErrors(errors)) => {
                Some(serde_json::json!({ "fields": errors }))
            }
            AppError::Validation(ValidationError::FieldError { field, .. }) => {
                Some(serde_json::json!({ "field": field }))
            }
            _ => None,
        }
    }

    /// Shorthand for an internal error
    pub fn internal(message: impl Into<String>) -> Self {
        AppError::Internal(message.into())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(error = %self, code = self.error_code(), "request failed");
        } else {
            tracing::debug!(error = %self, code = self.error_code(), "request rejected");
        }
        let body = Json(self.to_response());
        (status, body).into_response()
    }
}

// =============================================================================
// Entity Errors
// =============================================================================

/// Errors related to individual records
#[derive(Debug, Error)]
pub enum EntityError {
    /// Record was not found
    #[error("{entity_type} with id '{id}' not found")]
    NotFound { entity_type: String, id: String },

    /// Record already exists (conflict)
    #[error("{entity_type} with id '{id}' already exists")]
    AlreadyExists { entity_type: String, id: String },
}

impl EntityError {
    pub fn not_found(entity_type: &str, id: &str) -> Self {
        EntityError::NotFound {
            entity_type: entity_type.to_string(),
            id: id.to_string(),
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            EntityError::NotFound { .. } => StatusCode::NOT_FOUND,
            EntityError::AlreadyExists { .. } => StatusCode::CONFLICT,
        }
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            EntityError::NotFound { .. } => "ENTITY_NOT_FOUND",
            EntityError::AlreadyExists { .. } => "ENTITY_ALREADY_EXISTS",
        }
    }
}

// =============================================================================
// Validation Errors
// =============================================================================

/// Errors related to input validation
#[derive(Debug, Error)]
pub enum ValidationError {
    /// Single field validation error
    #[error("Validation error for field '{field}': {message}")]
    FieldError { field: String, message: String },

    /// Multiple field validation errors
    #[error("Validation errors: {}", join_field_errors(.0))]
    FieldErrors(Vec<FieldValidationError>),

    /// Invalid JSON format
    #[error("Invalid JSON: {message}")]
    InvalidJson { message: String },

    /// A draft is missing something required before submission
    #[error("{message}")]
    MissingDetails { message: String },

    /// Malformed query constraint or query parameter
    #[error("Invalid query: {message}")]
    InvalidQuery { message: String },
}

/// A single field validation error
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct FieldValidationError {
    pub field: String,
    pub message: String,
}

fn join_field_errors(errors: &[FieldValidationError]) -> String {
    errors
        .iter()
        .map(|e| format!("{}: {}", e.field, e.message))
        .collect::<Vec<_>>()
        .join(", ")
}

impl ValidationError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ValidationError::FieldError { .. } | ValidationError::FieldErrors(_) => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            ValidationError::InvalidJson { .. }
            | ValidationError::MissingDetails { .. }
            | ValidationError::InvalidQuery { .. } => StatusCode::BAD_REQUEST,
        }
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            ValidationError::FieldError { .. } | ValidationError::FieldErrors(_) => {
                "VALIDATION_ERROR"
            }
            ValidationError::InvalidJson { .. } => "INVALID_JSON",
            ValidationError::MissingDetails { .. } => "MISSING_DETAILS",
            ValidationError::InvalidQuery { .. } => "INVALID_QUERY",
        }
    }
}

impl From<validator::ValidationErrors> for ValidationError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let mut fields = Vec::new();
        flatten_validation_errors(&errors, "", &mut fields);
        fields.sort_by(|a, b| a.field.cmp(&b.field));
        ValidationError::FieldErrors(fields)
    }
}

/// Collect nested `validator` errors as `items[0].quantity`-style paths
fn flatten_validation_errors(
    errors: &validator::ValidationErrors,
    prefix: &str,
    out: &mut Vec<FieldValidationError>,
) {
    use validator::ValidationErrorsKind;

    for (field, kind) in errors.errors() {
        let path = if prefix.is_empty() {
            field.to_string()
        } else {
            format!("{prefix}.{field}")
        };
        match kind {
            ValidationErrorsKind::Field(errs) => {
                out.extend(errs.iter().map(|e| FieldValidationError {
                    field: path.clone(),
                    message: e
                        .message
                        .as_ref()
                        .map(|m| m.to_string())
                        .unwrap_or_else(|| e.code.to_string()),
                }));
            }
            ValidationErrorsKind::Struct(inner) => flatten_validation_errors(inner, &path, out),
            ValidationErrorsKind::List(items) => {
                for (index, inner) in items {
                    flatten_validation_errors(inner, &format!("{path}[{index}]"), out);
                }
            }
        }
    }
}

// =============================================================================
// Storage Errors
// =============================================================================

/// Errors reported by a collection backend
#[derive(Debug, Error)]
pub enum StorageError {
    /// The backend refused the operation
    #[error("You do not have permission to perform this action: {message}")]
    PermissionDenied { message: String },

    /// The backend reports the resource as missing
    #[error("The requested resource does not exist: {message}")]
    NotFound { message: String },

    /// The backend reports a conflicting resource
    #[error("The resource already exists: {message}")]
    AlreadyExists { message: String },

    /// The backend could not be reached
    #[error("Storage backend '{backend}' is unavailable: {message}")]
    Unavailable { backend: String, message: String },

    /// The backend rejected or failed a request
    #[error("{backend} request failed: {message}")]
    QueryError { backend: String, message: String },

    /// A stored document could not be (de)serialized
    #[error("Failed to convert document: {message}")]
    Serialization { message: String },

    /// A lock around in-memory data was poisoned
    #[error("Storage lock poisoned: {message}")]
    LockPoisoned { message: String },
}

impl StorageError {
    /// Map a backend error code (`permission-denied`, `not-found`,
    /// `already-exists`, ...) to a storage error
    pub fn from_backend_code(backend: &str, code: &str, message: impl Into<String>) -> Self {
        let message = message.into();
        match code {
            "permission-denied" => StorageError::PermissionDenied { message },
            "not-found" => StorageError::NotFound { message },
            "already-exists" => StorageError::AlreadyExists { message },
            "unavailable" => StorageError::Unavailable {
                backend: backend.to_string(),
                message,
            },
            _ => StorageError::QueryError {
                backend: backend.to_string(),
                message,
            },
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            StorageError::PermissionDenied { .. } => StatusCode::FORBIDDEN,
            StorageError::NotFound { .. } => StatusCode::NOT_FOUND,
            StorageError::AlreadyExists { .. } => StatusCode::CONFLICT,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            StorageError::PermissionDenied { .. } => "PERMISSION_DENIED",
            StorageError::NotFound { .. } => "NOT_FOUND",
            StorageError::AlreadyExists { .. } => "ALREADY_EXISTS",
            _ => "INTERNAL_ERROR",
        }
    }
}

// =============================================================================
// Request Errors
// =============================================================================

/// Errors related to HTTP requests
#[derive(Debug, Error)]
pub enum RequestError {
    /// Missing or invalid credentials
    #[error("Unauthorized: {message}")]
    Unauthorized { message: String },

    /// Authenticated but not allowed
    #[error("Forbidden: {message}")]
    Forbidden { message: String },

    /// Invalid query-string or path parameter
    #[error("Invalid parameter '{name}': {message}")]
    InvalidParameter { name: String, message: String },
}

impl RequestError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            RequestError::Unauthorized { .. } => StatusCode::UNAUTHORIZED,
            RequestError::Forbidden { .. } => StatusCode::FORBIDDEN,
            RequestError::InvalidParameter { .. } => StatusCode::BAD_REQUEST,
        }
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            RequestError::Unauthorized { .. } => "UNAUTHORIZED",
            RequestError::Forbidden { .. } => "FORBIDDEN",
            RequestError::InvalidParameter { .. } => "INVALID_PARAMETER",
        }
    }
}

// =============================================================================
// Config Errors
// =============================================================================

/// Errors related to configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to parse configuration
    #[error("Failed to parse config{}: {message}", .file.as_ref().map(|f| format!(" file '{f}'")).unwrap_or_default())]
    ParseError {
        file: Option<String>,
        message: String,
    },

    /// Missing required setting
    #[error("Missing required setting '{field}'")]
    MissingField { field: String },

    /// Invalid value in configuration
    #[error("Invalid value '{value}' for '{field}': {message}")]
    InvalidValue {
        field: String,
        value: String,
        message: String,
    },

    /// Configuration file not found
    #[error("Configuration file not found: {path}")]
    FileNotFound { path: String },

    /// IO error while reading configuration
    #[error("IO error: {message}")]
    IoError { message: String },
}

// =============================================================================
// Conversions from external errors
// =============================================================================

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Validation(ValidationError::InvalidJson {
            message: err.to_string(),
        })
    }
}

impl From<serde_yaml::Error> for AppError {
    fn from(err: serde_yaml::Error) -> Self {
        AppError::Config(ConfigError::ParseError {
            file: None,
            message: err.to_string(),
        })
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::Config(ConfigError::IoError {
            message: err.to_string(),
        })
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(errors: validator::ValidationErrors) -> Self {
        AppError::Validation(errors.into())
    }
}

/// A specialized Result type for shopdesk operations
pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entity_error_display() {
        let err = EntityError::not_found("client", "abc");
        assert!(err.to_string().contains("client"));
        assert!(err.to_string().contains("not found"));
        assert_eq!(err.status_code(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_backend_code_mapping() {
        let err = StorageError::from_backend_code("firestore", "permission-denied", "rules");
        assert_eq!(err.status_code(), StatusCode::FORBIDDEN);
        assert_eq!(err.error_code(), "PERMISSION_DENIED");

        let err = StorageError::from_backend_code("firestore", "not-found", "gone");
        assert_eq!(err.status_code(), StatusCode::NOT_FOUND);
        assert_eq!(err.error_code(), "NOT_FOUND");

        let err = StorageError::from_backend_code("firestore", "already-exists", "dup");
        assert_eq!(err.status_code(), StatusCode::CONFLICT);
        assert_eq!(err.error_code(), "ALREADY_EXISTS");

        let err = StorageError::from_backend_code("firestore", "deadline-exceeded", "slow");
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.error_code(), "INTERNAL_ERROR");
    }

    #[test]
    fn test_validation_error_multiple_fields() {
        let err = ValidationError::FieldErrors(vec![
            FieldValidationError {
                field: "name".to_string(),
                message: "required".to_string(),
            },
            FieldValidationError {
                field: "email".to_string(),
                message: "invalid format".to_string(),
            },
        ]);
        let display = err.to_string();
        assert!(display.contains("name: required"));
        assert!(display.contains("email: invalid format"));
        assert_eq!(err.status_code(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[test]
    fn test_error_response_carries_details() {
        let err: AppError = EntityError::not_found("product", "p1").into();
        let response = err.to_response();
        assert_eq!(response.code, "ENTITY_NOT_FOUND");
        assert_eq!(
            response.details,
            Some(serde_json::json!({"entity_type": "product", "id": "p1"}))
        );
    }

    #[test]
    fn test_field_error_names_the_field() {
        let err: AppError = ValidationError::FieldError {
            field: "phone".to_string(),
            message: "invalid type".to_string(),
        }
        .into();
        assert_eq!(err.status_code(), StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(
            err.to_response().details,
            Some(serde_json::json!({"field": "phone"}))
        );

        let err: AppError = EntityError::AlreadyExists {
            entity_type: "user".to_string(),
            id: "admin".to_string(),
        }
        .into();
        assert_eq!(err.status_code(), StatusCode::CONFLICT);
        assert_eq!(err.error_code(), "ENTITY_ALREADY_EXISTS");
    }

    #[test]
    fn test_request_error_status_codes() {
        let unauthorized = RequestError::Unauthorized {
            message: "no token".to_string(),
        };
        assert_eq!(unauthorized.status_code(), StatusCode::UNAUTHORIZED);

        let forbidden = RequestError::Forbidden {
            message: "admin only".to_string(),
        };
        assert_eq!(forbidden.status_code(), StatusCode::FORBIDDEN);
    }

    #[test]
    fn test_config_error_display_with_file() {
        let err = ConfigError::ParseError {
            file: Some("shopdesk.yaml".to_string()),
            message: "bad indent".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Failed to parse config file 'shopdesk.yaml': bad indent"
        );
    }

    #[test]
    fn test_from_serde_json_error() {
        let json_err = serde_json::from_str::<serde_json::Value>("invalid json").unwrap_err();
        let err: AppError = json_err.into();
        assert!(matches!(
            err,
            AppError::Validation(ValidationError::InvalidJson { .. })
        ));
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
    }
}
