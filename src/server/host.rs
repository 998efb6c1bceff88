//! Server host holding the framework state
//!
//! `ServerHost` is the single source of truth for the running service:
//! configuration, collections, the token verifier, the event bus and the
//! registered entity descriptors. Exposures turn it into a router.

use crate::config::AppConfig;
use crate::core::auth::AuthProvider;
use crate::core::error::AppResult;
use crate::core::events::EventBus;
use crate::entities::User;
use crate::entities::user::ensure_admin;
use crate::server::entity_registry::EntityRegistry;
use crate::storage::Collections;
use std::sync::Arc;

/// State shared by every handler
///
/// Cheap to clone: every field is reference counted.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub collections: Collections,
    pub auth: Arc<dyn AuthProvider>,
    pub events: Arc<EventBus>,
}

/// Host context containing all framework state
pub struct ServerHost {
    pub state: AppState,

    /// Entity registry for CRUD routes
    pub entity_registry: EntityRegistry,
}

impl ServerHost {
    pub fn new(state: AppState, entity_registry: EntityRegistry) -> Self {
        Self {
            state,
            entity_registry,
        }
    }

    /// Entity types registered in the host
    pub fn entity_types(&self) -> Vec<&str> {
        self.entity_registry.entity_types()
    }

    pub fn config(&self) -> &AppConfig {
        &self.state.config
    }

    pub fn collections(&self) -> &Collections {
        &self.state.collections
    }

    pub fn event_bus(&self) -> &Arc<EventBus> {
        &self.state.events
    }

    /// Create or promote the configured bootstrap admin profile
    pub async fn ensure_bootstrap_admin(&self) -> AppResult<Option<User>> {
        let Some(admin) = &self.state.config.bootstrap_admin else {
            return Ok(None);
        };
        let user = ensure_admin(
            self.state.collections.users.as_ref(),
            &admin.uid,
            &admin.name,
            &admin.email,
        )
        .await?;
        Ok(Some(user))
    }
}
