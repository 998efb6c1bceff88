//! # shopdesk
//!
//! Business-management API for a small shop: inventory, clients,
//! invoicing, employees, users and reporting, stored in a hosted document
//! database and served as JSON over HTTP.
//!
//! ## Features
//!
//! - **Remote collections**: one [`CollectionService`](core::service::CollectionService)
//!   per collection, backed by an in-memory store or Firestore (feature `firebase`)
//! - **Declarative records**: [`impl_document!`] wires a struct to its
//!   collection, search fields and validation rules
//! - **Reports**: pure aggregation over fetched records (sales per day, top
//!   products and customers, low stock, dashboard figures)
//! - **Role-based access**: bearer tokens resolved to user profiles, route
//!   groups guarded by [`AuthPolicy`](core::auth::AuthPolicy)
//! - **Live notices**: every mutation is published on an event bus and
//!   streamed as Server-Sent Events
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use shopdesk::prelude::*;
//!
//! let app = ServerBuilder::new()
//!     .with_collections(Collections::in_memory())
//!     .with_auth_provider(StaticTokenProvider::new().with_token(
//!         "dev-token",
//!         Identity { uid: "u1".into(), email: None, display_name: Some("Dev".into()) },
//!     ))
//!     .build()?;
//!
//! let listener = tokio::net::TcpListener::bind("127.0.0.1:3000").await?;
//! axum::serve(listener, app).await?;
//! ```

pub mod config;
pub mod core;
pub mod entities;
pub mod reports;
pub mod server;
pub mod storage;

/// Re-exports of commonly used types and traits
pub mod prelude {
    // === Core ===
    pub use crate::core::{
        AppError, AppEvent, AppResult, AuthContext, AuthPolicy, AuthProvider, CollectionService,
        Document, EventBus, Identity, Query, QueryParams, Role, StaticTokenProvider,
    };

    // === Macros ===
    pub use crate::impl_document;

    // === Records ===
    pub use crate::entities::{
        Client, Employee, Invoice, InvoiceDraft, LineItem, Permission, Product, User,
    };

    // === Storage ===
    pub use crate::storage::{Collections, InMemoryStore};

    // === Config ===
    pub use crate::config::AppConfig;

    // === Server ===
    pub use crate::server::{EntityDescriptor, EntityRegistry, ServerBuilder};

    // === External dependencies ===
    pub use async_trait::async_trait;
    pub use chrono::{DateTime, Utc};
    pub use serde::{Deserialize, Serialize};
}
