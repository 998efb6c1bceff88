//! ServerBuilder for fluent API to build the HTTP server

use super::entity_registry::EntityRegistry;
use super::exposure::RestExposure;
use super::handlers::clients::ClientDescriptor;
use super::handlers::crud::CrudDescriptor;
use super::handlers::invoices::InvoiceDescriptor;
use super::handlers::products::ProductDescriptor;
use super::host::{AppState, ServerHost};
use crate::config::AppConfig;
use crate::core::auth::{AuthPolicy, AuthProvider};
use crate::core::error::AppResult;
use crate::core::events::EventBus;
use crate::entities::{Employee, User};
use crate::storage::Collections;
use axum::Router;
use std::sync::Arc;
use tokio::net::TcpListener;

/// Builder assembling collections, the token verifier, the event bus and
/// the entity routes
///
/// Anything not supplied explicitly is built from the configuration.
///
/// # Example
///
/// ```ignore
/// ServerBuilder::new()
///     .with_config(AppConfig::load(None)?)
///     .serve()
///     .await?;
/// ```
pub struct ServerBuilder {
    config: AppConfig,
    collections: Option<Collections>,
    auth_provider: Option<Arc<dyn AuthProvider>>,
    event_bus: Option<Arc<EventBus>>,
    custom_routes: Vec<Router>,
}

impl ServerBuilder {
    pub fn new() -> Self {
        Self {
            config: AppConfig::default(),
            collections: None,
            auth_provider: None,
            event_bus: None,
            custom_routes: Vec::new(),
        }
    }

    pub fn with_config(mut self, config: AppConfig) -> Self {
        self.config = config;
        self
    }

    /// Use these collections instead of the configured backend
    pub fn with_collections(mut self, collections: Collections) -> Self {
        self.collections = Some(collections);
        self
    }

    /// Use this token verifier instead of the configured provider
    pub fn with_auth_provider(mut self, provider: impl AuthProvider + 'static) -> Self {
        self.auth_provider = Some(Arc::new(provider));
        self
    }

    /// Share an existing event bus (to watch events from outside the server)
    pub fn with_event_bus(mut self, event_bus: Arc<EventBus>) -> Self {
        self.event_bus = Some(event_bus);
        self
    }

    /// Add routes that don't fit the entity pattern
    ///
    /// They are served behind the authentication middleware, so handlers
    /// can extract the caller's `AuthContext`.
    pub fn with_custom_routes(mut self, routes: Router) -> Self {
        self.custom_routes.push(routes);
        self
    }

    /// Build the transport-agnostic host
    pub fn build_host(self) -> AppResult<ServerHost> {
        let collections = match self.collections {
            Some(collections) => collections,
            None => self.config.build_collections()?,
        };
        let auth = match self.auth_provider {
            Some(provider) => provider,
            None => self.config.build_auth_provider()?,
        };
        let events = self
            .event_bus
            .unwrap_or_else(|| Arc::new(EventBus::new(self.config.server.event_capacity)));

        let state = AppState {
            config: Arc::new(self.config),
            collections,
            auth,
            events,
        };

        let mut registry = EntityRegistry::new();
        registry.register(Box::new(ProductDescriptor::new(state.clone())));
        registry.register(Box::new(ClientDescriptor::new(state.clone())));
        registry.register(Box::new(InvoiceDescriptor::new(state.clone())));
        registry.register(Box::new(CrudDescriptor::<Employee>::new(
            state.clone(),
            AuthPolicy::AdminOnly,
        )));
        registry.register(Box::new(CrudDescriptor::<User>::new(
            state.clone(),
            AuthPolicy::AdminOnly,
        )));

        tracing::info!(
            auth = state.auth.name(),
            entities = ?registry.entity_types(),
            "server host ready"
        );
        Ok(ServerHost::new(state, registry))
    }

    /// Build the REST router
    pub fn build(mut self) -> AppResult<Router> {
        let custom_routes = std::mem::take(&mut self.custom_routes);
        let host = Arc::new(self.build_host()?);
        Ok(RestExposure::build_router(host, custom_routes))
    }

    /// Serve the application with graceful shutdown
    ///
    /// Ensures the bootstrap admin profile, binds the configured address
    /// and serves until SIGTERM or Ctrl+C.
    pub async fn serve(mut self) -> anyhow::Result<()> {
        let addr = self.config.server.addr();
        let custom_routes = std::mem::take(&mut self.custom_routes);
        let host = Arc::new(self.build_host()?);

        if let Some(admin) = host.ensure_bootstrap_admin().await? {
            tracing::info!(uid = %admin.id, "bootstrap admin ready");
        }

        let app = RestExposure::build_router(host, custom_routes);
        let listener = TcpListener::bind(addr).await?;
        tracing::info!("Server listening on {}", addr);

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        tracing::info!("Server shutdown complete");
        Ok(())
    }
}

impl Default for ServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

async fn shutdown_signal() {
    use tokio::signal;

    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C signal, initiating graceful shutdown...");
        },
        _ = terminate => {
            tracing::info!("Received SIGTERM signal, initiating graceful shutdown...");
        },
    }
}
