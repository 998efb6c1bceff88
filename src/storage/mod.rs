//! Storage backends implementing [`CollectionService`]

#[cfg(feature = "firebase")]
pub mod firestore;
pub mod in_memory;

#[cfg(feature = "firebase")]
pub use firestore::{FirestoreClient, FirestoreCollection};
pub use in_memory::{InMemoryCollection, InMemoryStore};

use crate::core::service::CollectionService;
use crate::entities::{Client, Employee, Invoice, Product, User};
use std::sync::Arc;

/// One accessor per collection, shared by every handler
#[derive(Clone)]
pub struct Collections {
    pub clients: Arc<dyn CollectionService<Client>>,
    pub products: Arc<dyn CollectionService<Product>>,
    pub invoices: Arc<dyn CollectionService<Invoice>>,
    pub employees: Arc<dyn CollectionService<Employee>>,
    pub users: Arc<dyn CollectionService<User>>,
}

impl Collections {
    /// Fresh, empty in-memory store
    pub fn in_memory() -> Self {
        Self::from_store(&InMemoryStore::new())
    }

    /// Collections backed by an existing in-memory store
    pub fn from_store(store: &InMemoryStore) -> Self {
        Self {
            clients: Arc::new(store.collection::<Client>()),
            products: Arc::new(store.collection::<Product>()),
            invoices: Arc::new(store.collection::<Invoice>()),
            employees: Arc::new(store.collection::<Employee>()),
            users: Arc::new(store.collection::<User>()),
        }
    }

    #[cfg(feature = "firebase")]
    pub fn firestore(client: FirestoreClient) -> Self {
        let client = Arc::new(client);
        Self {
            clients: Arc::new(client.collection::<Client>()),
            products: Arc::new(client.collection::<Product>()),
            invoices: Arc::new(client.collection::<Invoice>()),
            employees: Arc::new(client.collection::<Employee>()),
            users: Arc::new(client.collection::<User>()),
        }
    }
}

impl Default for Collections {
    fn default() -> Self {
        Self::in_memory()
    }
}
