//! Invoice routes
//!
//! Creation goes through [`InvoiceDraft`]: the server resolves the client
//! snapshot and the product names and prices, then numbers and totals the
//! invoice. Updates keep the total consistent with the line items.

use super::crud::{self, publish_created, publish_updated, saved};
use crate::core::document::Document;
use crate::core::error::{AppResult, EntityError, ValidationError};
use crate::core::service::patch_fields;
use crate::core::validation::Validated;
use crate::entities::invoice::NO_ITEMS_MESSAGE;
use crate::entities::{Client, Invoice, InvoiceDraft, InvoiceRequest, LineItemRequest, Product};
use crate::server::entity_registry::EntityDescriptor;
use crate::server::host::AppState;
use crate::storage::Collections;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use serde_json::{Map, Value};
use validator::Validate;

pub struct InvoiceDescriptor {
    state: AppState,
}

impl InvoiceDescriptor {
    pub fn new(state: AppState) -> Self {
        Self { state }
    }
}

impl EntityDescriptor for InvoiceDescriptor {
    fn entity_type(&self) -> &str {
        Invoice::singular()
    }

    fn plural(&self) -> &str {
        Invoice::collection()
    }

    fn build_routes(&self) -> Router {
        Router::new()
            .route(
                &crud::collection_path::<Invoice>(),
                get(crud::list::<Invoice>).post(create_invoice),
            )
            .route(
                &crud::item_path::<Invoice>(),
                get(crud::get_one::<Invoice>)
                    .put(update_invoice)
                    .delete(crud::remove::<Invoice>),
            )
            .with_state(self.state.clone())
    }
}

/// Resolve a request into a finalized, unsaved invoice
pub async fn build_invoice(
    collections: &Collections,
    request: &InvoiceRequest,
    now: DateTime<Utc>,
) -> AppResult<Invoice> {
    request.validate().map_err(ValidationError::from)?;

    let mut draft = InvoiceDraft::new();
    if !request.client_id.trim().is_empty() {
        let client = collections
            .clients
            .fetch_one(&request.client_id)
            .await?
            .ok_or_else(|| EntityError::not_found(Client::singular(), &request.client_id))?;
        draft.select_client(client);
    }

    add_requested_lines(collections, &request.items, &mut draft).await?;
    draft.finalize(now)
}

/// Resolve each requested line against the catalogue and add it to `draft`
async fn add_requested_lines(
    collections: &Collections,
    items: &[LineItemRequest],
    draft: &mut InvoiceDraft,
) -> AppResult<()> {
    for item in items {
        let product = collections
            .products
            .fetch_one(&item.product_id)
            .await?
            .ok_or_else(|| EntityError::not_found(Product::singular(), &item.product_id))?;
        draft.add_line(&product, item.quantity, item.price)?;
    }
    Ok(())
}

async fn create_invoice(
    State(state): State<AppState>,
    Json(body): Json<Value>,
) -> AppResult<(StatusCode, Json<Invoice>)> {
    let request: InvoiceRequest = serde_json::from_value(body)?;
    let invoice = build_invoice(&state.collections, &request, Utc::now()).await?;
    tracing::info!(
        number = %invoice.invoice_number,
        client = %invoice.client_id,
        total = invoice.total,
        "creating invoice"
    );

    let created = saved::<Invoice, _>(&state.events, state.collections.invoices.add(invoice).await)?;
    publish_created(&state.events, &created);
    Ok((StatusCode::CREATED, Json(created)))
}

/// Derive the stored items, total and client snapshot from an update payload
///
/// A caller-supplied `total` is ignored. Replacement items go through the
/// same checks as creation (at least one line, quantities of 1 or more,
/// known products) and are re-resolved against the catalogue; the total is
/// recomputed from them. Without `items` the stored total is kept.
pub async fn normalize_update(
    collections: &Collections,
    payload: Value,
) -> AppResult<Map<String, Value>> {
    let mut patch = patch_fields(payload)?;
    patch.remove("total");

    if let Some(items) = patch.remove("items") {
        let request = InvoiceRequest {
            client_id: String::new(),
            items: serde_json::from_value(items)?,
        };
        if request.items.is_empty() {
            return Err(ValidationError::MissingDetails {
                message: NO_ITEMS_MESSAGE.to_string(),
            }
            .into());
        }
        request.validate().map_err(ValidationError::from)?;

        let mut draft = InvoiceDraft::new();
        add_requested_lines(collections, &request.items, &mut draft).await?;
        patch.insert("total".to_string(), Value::from(draft.total()));
        patch.insert("items".to_string(), serde_json::to_value(draft.items())?);
    }

    if let Some(Value::String(client_id)) = patch.get("clientId").cloned() {
        let client = collections
            .clients
            .fetch_one(&client_id)
            .await?
            .ok_or_else(|| EntityError::not_found(Client::singular(), &client_id))?;
        let snapshot = serde_json::to_value(&client)?;
        patch.insert("client".to_string(), snapshot);
    }

    Ok(patch)
}

async fn update_invoice(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Validated(payload, _): Validated<Invoice>,
) -> AppResult<Json<Invoice>> {
    let patch = normalize_update(&state.collections, payload).await?;
    let updated = saved::<Invoice, _>(
        &state.events,
        state
            .collections
            .invoices
            .update(&id, Value::Object(patch))
            .await,
    )?;
    publish_updated(&state.events, &updated);
    Ok(Json(updated))
}
