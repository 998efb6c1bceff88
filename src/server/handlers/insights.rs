//! Account, dashboard and report routes

use crate::core::auth::{AuthContext, AuthPolicy};
use crate::core::error::{AppResult, EntityError, RequestError};
use crate::entities::User;
use crate::reports::{DashboardView, DateRange, ReportData, TrendRange, generate_report};
use crate::server::auth::guarded;
use crate::server::host::AppState;
use axum::extract::{Query, State};
use axum::routing::get;
use axum::{Json, Router};
use chrono::Utc;
use serde::Deserialize;

/// `/me` and `/dashboard` for any signed-in user, `/reports` for admins
pub fn routes(state: AppState) -> Router {
    let signed_in = Router::new()
        .route("/me", get(me))
        .route("/dashboard", get(dashboard))
        .with_state(state.clone());
    let admin = Router::new()
        .route("/reports", get(reports))
        .with_state(state);

    guarded(signed_in, AuthPolicy::Authenticated).merge(guarded(admin, AuthPolicy::AdminOnly))
}

/// The caller's own profile
async fn me(State(state): State<AppState>, context: AuthContext) -> AppResult<Json<User>> {
    let uid = context.uid().ok_or_else(|| RequestError::Unauthorized {
        message: "a valid bearer token is required".to_string(),
    })?;
    state
        .collections
        .users
        .fetch_one(uid)
        .await?
        .map(Json)
        .ok_or_else(|| EntityError::not_found("user", uid).into())
}

#[derive(Debug, Default, Deserialize)]
pub struct DashboardParams {
    pub range: Option<String>,
}

async fn dashboard(
    State(state): State<AppState>,
    Query(params): Query<DashboardParams>,
) -> AppResult<Json<DashboardView>> {
    let range = match params.range.as_deref() {
        Some(raw) => TrendRange::parse(raw)?,
        None => TrendRange::default(),
    };
    let collections = &state.collections;
    let (products, clients, invoices) = tokio::try_join!(
        collections.products.fetch_all(),
        collections.clients.fetch_all(),
        collections.invoices.fetch_all(),
    )?;

    Ok(Json(DashboardView::build(
        &products,
        &clients,
        &invoices,
        range,
        state.config.inventory.low_stock_threshold,
        state.config.reports.recent_items,
        Utc::now(),
    )))
}

#[derive(Debug, Default, Deserialize)]
pub struct ReportParams {
    pub from: Option<String>,
    pub to: Option<String>,
}

async fn reports(
    State(state): State<AppState>,
    Query(params): Query<ReportParams>,
) -> AppResult<Json<ReportData>> {
    let range = DateRange::parse(params.from.as_deref(), params.to.as_deref(), Utc::now())?;
    let collections = &state.collections;
    let (invoices, products, clients) = tokio::try_join!(
        collections.invoices.fetch_all(),
        collections.products.fetch_all(),
        collections.clients.fetch_all(),
    )?;
    tracing::debug!(from = %range.from, to = %range.to, invoices = invoices.len(), "generating report");

    Ok(Json(generate_report(
        &range,
        &invoices,
        &products,
        &clients,
        &state.config.reports,
    )))
}
