//! Client routes: CRUD, search and account statements

use super::crud::{self, Managed};
use crate::core::document::Document;
use crate::core::error::{AppResult, EntityError};
use crate::core::query::{PaginatedResponse, QueryParams};
use crate::entities::Client;
use crate::reports::{ClientStatement, DateRange, client_statement, search_clients};
use crate::server::entity_registry::EntityDescriptor;
use crate::server::host::AppState;
use axum::extract::{Path, Query, State};
use axum::routing::get;
use axum::{Json, Router};
use chrono::Utc;
use serde::Deserialize;

pub struct ClientDescriptor {
    state: AppState,
}

impl ClientDescriptor {
    pub fn new(state: AppState) -> Self {
        Self { state }
    }
}

impl EntityDescriptor for ClientDescriptor {
    fn entity_type(&self) -> &str {
        Client::singular()
    }

    fn plural(&self) -> &str {
        Client::collection()
    }

    fn build_routes(&self) -> Router {
        Router::new()
            .route(
                &crud::collection_path::<Client>(),
                get(list_clients).post(crud::create::<Client>),
            )
            .route(
                &crud::item_path::<Client>(),
                get(crud::get_one::<Client>)
                    .put(crud::update::<Client>)
                    .delete(crud::remove::<Client>),
            )
            .route("/clients/{id}/statement", get(statement))
            .with_state(self.state.clone())
    }
}

/// Search on name, e-mail and phone, then sort and paginate
async fn list_clients(
    State(state): State<AppState>,
    Query(mut params): Query<QueryParams>,
) -> AppResult<Json<PaginatedResponse<Client>>> {
    let clients = Client::service(&state.collections).fetch_all().await?;
    let clients = match params.search.take() {
        Some(term) => search_clients(&clients, &term),
        None => clients,
    };
    Ok(Json(params.apply(clients)))
}

#[derive(Debug, Default, Deserialize)]
pub struct StatementParams {
    pub search: Option<String>,
    pub from: Option<String>,
    pub to: Option<String>,
}

async fn statement(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(params): Query<StatementParams>,
) -> AppResult<Json<ClientStatement>> {
    if state.collections.clients.fetch_one(&id).await?.is_none() {
        return Err(EntityError::not_found(Client::singular(), &id).into());
    }

    let range = if params.from.is_some() || params.to.is_some() {
        Some(DateRange::parse(
            params.from.as_deref(),
            params.to.as_deref(),
            Utc::now(),
        )?)
    } else {
        None
    };

    let invoices = state.collections.invoices.fetch_all().await?;
    Ok(Json(client_statement(
        &id,
        &invoices,
        params.search.as_deref(),
        range.as_ref(),
    )))
}
