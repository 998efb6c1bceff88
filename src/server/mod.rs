//! HTTP server: host state, route registration and the REST exposure
//!
//! `ServerBuilder` assembles a [`ServerHost`] from the configuration;
//! `RestExposure` turns the host into an Axum router. Every record type
//! contributes its routes through an [`EntityDescriptor`].

pub mod auth;
pub mod builder;
pub mod entity_registry;
pub mod exposure;
pub mod handlers;
pub mod host;

pub use builder::ServerBuilder;
pub use entity_registry::{EntityDescriptor, EntityRegistry};
pub use exposure::RestExposure;
pub use host::{AppState, ServerHost};
