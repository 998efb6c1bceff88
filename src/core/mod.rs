//! Core module containing the fundamental traits and types

pub mod auth;
pub mod document;
pub mod error;
pub mod events;
pub mod field;
pub mod query;
pub mod service;
pub mod validation;

pub use auth::{AuthContext, AuthPolicy, AuthProvider, Identity, Role, StaticTokenProvider};
pub use document::Document;
pub use error::{AppError, AppResult};
pub use events::{AppEvent, EntityEvent, EventBus, EventEnvelope, NoticeLevel};
pub use query::{Direction, Operator, PaginatedResponse, Query, QueryConstraint, QueryParams};
pub use service::CollectionService;
