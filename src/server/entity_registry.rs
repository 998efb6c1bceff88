//! Entity registry collecting the route descriptors of every record type

use crate::core::auth::AuthPolicy;
use crate::server::auth::guarded;
use axum::Router;
use indexmap::IndexMap;

/// Trait that describes how to build routes for an entity
///
/// Each record type (client, product, invoice, ...) implements this trait
/// to contribute its CRUD routes and any entity-specific routes.
pub trait EntityDescriptor: Send + Sync {
    /// The entity type name (singular, e.g., "invoice")
    fn entity_type(&self) -> &str;

    /// The collection name, used as the route prefix (e.g., "invoices")
    fn plural(&self) -> &str;

    /// Who may call the routes of this entity
    fn policy(&self) -> AuthPolicy {
        AuthPolicy::Authenticated
    }

    /// Build the routes for this entity
    ///
    /// Should return a Router with routes like:
    /// - GET /{plural}
    /// - POST /{plural}
    /// - GET /{plural}/{id}
    fn build_routes(&self) -> Router;
}

/// Registry for all entities served by the application
#[derive(Default)]
pub struct EntityRegistry {
    descriptors: IndexMap<String, Box<dyn EntityDescriptor>>,
}

impl EntityRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an entity descriptor
    ///
    /// The entity type name is the key: registering it again replaces the
    /// previous descriptor.
    pub fn register(&mut self, descriptor: Box<dyn EntityDescriptor>) {
        let entity_type = descriptor.entity_type().to_string();
        tracing::debug!(entity = %entity_type, plural = descriptor.plural(), "entity registered");
        self.descriptors.insert(entity_type, descriptor);
    }

    /// Build a router with all registered entity routes, each group
    /// behind its descriptor's policy
    pub fn build_routes(&self) -> Router {
        self.descriptors
            .values()
            .fold(Router::new(), |router, descriptor| {
                router.merge(guarded(descriptor.build_routes(), descriptor.policy()))
            })
    }

    /// Registered entity types, in registration order
    pub fn entity_types(&self) -> Vec<&str> {
        self.descriptors.keys().map(|s| s.as_str()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::routing::get;
    use axum_test::TestServer;

    /// Minimal descriptor serving `GET /{plural}`
    struct MockDescriptor {
        entity_type: String,
        plural: String,
        policy: AuthPolicy,
    }

    impl MockDescriptor {
        fn new(entity_type: &str, plural: &str) -> Self {
            Self {
                entity_type: entity_type.to_string(),
                plural: plural.to_string(),
                policy: AuthPolicy::Public,
            }
        }

        fn with_policy(mut self, policy: AuthPolicy) -> Self {
            self.policy = policy;
            self
        }
    }

    impl EntityDescriptor for MockDescriptor {
        fn entity_type(&self) -> &str {
            &self.entity_type
        }

        fn plural(&self) -> &str {
            &self.plural
        }

        fn policy(&self) -> AuthPolicy {
            self.policy.clone()
        }

        fn build_routes(&self) -> Router {
            Router::new().route(&format!("/{}", self.plural), get(|| async { "ok" }))
        }
    }

    #[test]
    fn test_new_registry_is_empty() {
        assert!(EntityRegistry::new().entity_types().is_empty());
    }

    #[test]
    fn test_register_keeps_order() {
        let mut registry = EntityRegistry::new();
        registry.register(Box::new(MockDescriptor::new("product", "products")));
        registry.register(Box::new(MockDescriptor::new("client", "clients")));
        registry.register(Box::new(MockDescriptor::new("invoice", "invoices")));
        assert_eq!(registry.entity_types(), vec!["product", "client", "invoice"]);
    }

    #[test]
    fn test_register_duplicate_replaces() {
        let mut registry = EntityRegistry::new();
        registry.register(Box::new(MockDescriptor::new("client", "clients")));
        registry.register(Box::new(MockDescriptor::new("client", "customers")));
        assert_eq!(registry.entity_types().len(), 1);
    }

    #[tokio::test]
    async fn test_build_routes_applies_policies() {
        let mut registry = EntityRegistry::new();
        registry.register(Box::new(MockDescriptor::new("product", "products")));
        registry.register(Box::new(
            MockDescriptor::new("employee", "employees").with_policy(AuthPolicy::AdminOnly),
        ));
        let server = TestServer::new(registry.build_routes());

        server.get("/products").await.assert_status_ok();
        server
            .get("/employees")
            .await
            .assert_status(axum::http::StatusCode::UNAUTHORIZED);
    }
}
