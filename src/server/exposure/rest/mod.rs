//! REST API exposure
//!
//! Consumes a [`ServerHost`] and produces the Axum `Router`: public health
//! routes, then every protected route group behind the authentication
//! middleware, with request tracing and CORS on top.

use crate::server::auth::authenticate;
use crate::server::handlers::{events, insights};
use crate::server::host::ServerHost;
use axum::middleware;
use axum::{Json, Router, routing::get};
use serde_json::{Value, json};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub struct RestExposure;

impl RestExposure {
    /// Build the REST router from a host
    ///
    /// Custom routes sit behind the authentication middleware: their
    /// handlers can extract the caller's `AuthContext`, but no policy is
    /// applied to them.
    pub fn build_router(host: Arc<ServerHost>, custom_routes: Vec<Router>) -> Router {
        let state = host.state.clone();

        let protected = custom_routes.into_iter().fold(
            host.entity_registry
                .build_routes()
                .merge(insights::routes(state.clone()))
                .merge(events::routes(state.clone())),
            |app: Router, routes: Router| app.merge(routes),
        );
        let protected = protected.layer(middleware::from_fn_with_state(state, authenticate));

        Self::health_routes()
            .merge(protected)
            .layer(TraceLayer::new_for_http())
            .layer(CorsLayer::permissive())
    }

    fn health_routes() -> Router {
        Router::new()
            .route("/health", get(Self::health_check))
            .route("/healthz", get(Self::health_check))
    }

    async fn health_check() -> Json<Value> {
        Json(json!({
            "status": "ok",
            "service": env!("CARGO_PKG_NAME"),
            "version": env!("CARGO_PKG_VERSION"),
        }))
    }
}
