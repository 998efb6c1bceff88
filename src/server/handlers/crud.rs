//! Generic CRUD handlers over any stored record type
//!
//! Every mutation publishes an entity event and a notice on the
//! [`EventBus`]. Failed writes publish an error notice before the error
//! is returned to the caller.

use crate::core::auth::AuthPolicy;
use crate::core::document::Document;
use crate::core::error::{AppResult, EntityError};
use crate::core::events::{AppEvent, EntityEvent, EventBus};
use crate::core::query::{PaginatedResponse, QueryParams};
use crate::core::service::CollectionService;
use crate::core::validation::{ValidatableEntity, Validated};
use crate::entities::{Client, Employee, Invoice, Product, User, display_name};
use crate::server::entity_registry::EntityDescriptor;
use crate::server::host::AppState;
use crate::storage::Collections;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use serde_json::Value;
use std::marker::PhantomData;
use std::sync::Arc;

/// A record type served by the CRUD handlers
pub trait Managed: Document + ValidatableEntity {
    /// The collection holding records of this type
    fn service(collections: &Collections) -> &Arc<dyn CollectionService<Self>>;
}

impl Managed for Client {
    fn service(collections: &Collections) -> &Arc<dyn CollectionService<Self>> {
        &collections.clients
    }
}

impl Managed for Product {
    fn service(collections: &Collections) -> &Arc<dyn CollectionService<Self>> {
        &collections.products
    }
}

impl Managed for Invoice {
    fn service(collections: &Collections) -> &Arc<dyn CollectionService<Self>> {
        &collections.invoices
    }
}

impl Managed for Employee {
    fn service(collections: &Collections) -> &Arc<dyn CollectionService<Self>> {
        &collections.employees
    }
}

impl Managed for User {
    fn service(collections: &Collections) -> &Arc<dyn CollectionService<Self>> {
        &collections.users
    }
}

/// `GET /{plural}` and `GET|PUT|DELETE /{plural}/{id}` plus `POST /{plural}`
pub fn crud_routes<T: Managed>(state: AppState) -> Router {
    Router::new()
        .route(&collection_path::<T>(), get(list::<T>).post(create::<T>))
        .route(
            &item_path::<T>(),
            get(get_one::<T>).put(update::<T>).delete(remove::<T>),
        )
        .with_state(state)
}

/// Descriptor for record types served by the plain CRUD routes
pub struct CrudDescriptor<T> {
    state: AppState,
    policy: AuthPolicy,
    _marker: PhantomData<fn() -> T>,
}

impl<T: Managed> CrudDescriptor<T> {
    pub fn new(state: AppState, policy: AuthPolicy) -> Self {
        Self {
            state,
            policy,
            _marker: PhantomData,
        }
    }
}

impl<T: Managed> EntityDescriptor for CrudDescriptor<T> {
    fn entity_type(&self) -> &str {
        T::singular()
    }

    fn plural(&self) -> &str {
        T::collection()
    }

    fn policy(&self) -> AuthPolicy {
        self.policy.clone()
    }

    fn build_routes(&self) -> Router {
        crud_routes::<T>(self.state.clone())
    }
}

pub fn collection_path<T: Document>() -> String {
    format!("/{}", T::collection())
}

pub fn item_path<T: Document>() -> String {
    format!("/{}/{{id}}", T::collection())
}

pub async fn list<T: Managed>(
    State(state): State<AppState>,
    Query(params): Query<QueryParams>,
) -> AppResult<Json<PaginatedResponse<T>>> {
    let documents = T::service(&state.collections).fetch_all().await?;
    Ok(Json(params.apply(documents)))
}

pub async fn get_one<T: Managed>(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<Json<T>> {
    T::service(&state.collections)
        .fetch_one(&id)
        .await?
        .map(Json)
        .ok_or_else(|| EntityError::not_found(T::singular(), &id).into())
}

pub async fn create<T: Managed>(
    State(state): State<AppState>,
    Validated(payload, _): Validated<T>,
) -> AppResult<(StatusCode, Json<T>)> {
    let document: T = serde_json::from_value(payload)?;
    let service = T::service(&state.collections);
    // A payload carrying an id (a user's auth uid, typically) is stored under it
    let id = document.id().trim().to_string();
    let result = if id.is_empty() {
        service.add(document).await
    } else if service.fetch_one(&id).await?.is_some() {
        return Err(EntityError::AlreadyExists {
            entity_type: T::singular().to_string(),
            id,
        }
        .into());
    } else {
        service.set(&id, document).await
    };
    let created = saved::<T, _>(&state.events, result)?;
    publish_created(&state.events, &created);
    Ok((StatusCode::CREATED, Json(created)))
}

pub async fn update<T: Managed>(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Validated(payload, _): Validated<T>,
) -> AppResult<Json<T>> {
    let updated = saved::<T, _>(
        &state.events,
        T::service(&state.collections).update(&id, payload).await,
    )?;
    publish_updated(&state.events, &updated);
    Ok(Json(updated))
}

pub async fn remove<T: Managed>(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<StatusCode> {
    let result = T::service(&state.collections).remove(&id).await;
    if result.is_err() {
        state
            .events
            .error(format!("Error deleting {}", T::singular()));
    }
    result?;

    state.events.publish(AppEvent::Entity(EntityEvent::Deleted {
        entity_type: T::singular().to_string(),
        entity_id: id,
    }));
    state
        .events
        .success(format!("{} deleted successfully", display_name(T::singular())));
    Ok(StatusCode::NO_CONTENT)
}

/// Pass a write result through, publishing "Error saving ..." on failure
pub(crate) fn saved<T: Document, R>(events: &EventBus, result: AppResult<R>) -> AppResult<R> {
    result.inspect_err(|e| {
        tracing::warn!(entity = T::singular(), error = %e, "write failed");
        events.error(format!("Error saving {}", T::singular()));
    })
}

pub(crate) fn publish_created<T: Document>(events: &EventBus, document: &T) {
    events.publish(AppEvent::Entity(EntityEvent::Created {
        entity_type: T::singular().to_string(),
        entity_id: document.id().to_string(),
        data: serde_json::to_value(document).unwrap_or(Value::Null),
    }));
    events.success(format!("{} added successfully", display_name(T::singular())));
}

pub(crate) fn publish_updated<T: Document>(events: &EventBus, document: &T) {
    events.publish(AppEvent::Entity(EntityEvent::Updated {
        entity_type: T::singular().to_string(),
        entity_id: document.id().to_string(),
        data: serde_json::to_value(document).unwrap_or(Value::Null),
    }));
    events.success(format!("{} updated successfully", display_name(T::singular())));
}
