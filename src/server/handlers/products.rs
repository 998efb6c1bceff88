//! Product routes: catalogue CRUD, barcode lookup, low stock and categories

use super::crud::{self, Managed};
use crate::core::document::Document;
use crate::core::error::{AppResult, EntityError};
use crate::core::query::{PaginatedResponse, Query, QueryParams};
use crate::entities::Product;
use crate::reports::{CategoryCount, category_counts, low_stock, search_products};
use crate::server::entity_registry::EntityDescriptor;
use crate::server::host::AppState;
use axum::extract::{self, Path, State};
use axum::routing::get;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};

pub struct ProductDescriptor {
    state: AppState,
}

impl ProductDescriptor {
    pub fn new(state: AppState) -> Self {
        Self { state }
    }
}

impl EntityDescriptor for ProductDescriptor {
    fn entity_type(&self) -> &str {
        Product::singular()
    }

    fn plural(&self) -> &str {
        Product::collection()
    }

    fn build_routes(&self) -> Router {
        Router::new()
            .route(
                &crud::collection_path::<Product>(),
                get(list_products).post(crud::create::<Product>),
            )
            .route(
                &crud::item_path::<Product>(),
                get(crud::get_one::<Product>)
                    .put(crud::update::<Product>)
                    .delete(crud::remove::<Product>),
            )
            .route("/products/barcode/{code}", get(by_barcode))
            .route("/products/low-stock", get(low_stock_products))
            .route("/products/categories", get(categories))
            .with_state(self.state.clone())
    }
}

/// List parameters: the usual page/limit/search/sort plus a category
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ProductListParams {
    pub page: usize,
    pub limit: usize,
    pub search: Option<String>,
    pub sort: Option<String>,
    pub category: Option<String>,
}

impl Default for ProductListParams {
    fn default() -> Self {
        let defaults = QueryParams::default();
        Self {
            page: defaults.page,
            limit: defaults.limit,
            search: None,
            sort: None,
            category: None,
        }
    }
}

async fn list_products(
    State(state): State<AppState>,
    extract::Query(params): extract::Query<ProductListParams>,
) -> AppResult<Json<PaginatedResponse<Product>>> {
    let products = Product::service(&state.collections).fetch_all().await?;
    let matched = search_products(
        &products,
        params.search.as_deref(),
        params.category.as_deref(),
    );
    let paging = QueryParams {
        page: params.page,
        limit: params.limit,
        search: None,
        sort: params.sort,
    };
    Ok(Json(paging.apply(matched)))
}

/// Resolve a scanned barcode to its product
async fn by_barcode(
    State(state): State<AppState>,
    Path(code): Path<String>,
) -> AppResult<Json<Product>> {
    let code = code.trim();
    let query = Query::new().where_eq("barcode", code).limit(1);
    let found = state.collections.products.query(&query).await?;
    tracing::debug!(barcode = code, matches = found.len(), "barcode lookup");
    found
        .into_iter()
        .next()
        .map(Json)
        .ok_or_else(|| EntityError::not_found("product with barcode", code).into())
}

#[derive(Debug, Default, Deserialize)]
pub struct LowStockParams {
    pub threshold: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct LowStockResponse {
    pub threshold: i64,
    pub data: Vec<Product>,
}

async fn low_stock_products(
    State(state): State<AppState>,
    extract::Query(params): extract::Query<LowStockParams>,
) -> AppResult<Json<LowStockResponse>> {
    let threshold = params
        .threshold
        .unwrap_or(state.config.inventory.low_stock_threshold);
    let products = state.collections.products.fetch_all().await?;
    Ok(Json(LowStockResponse {
        threshold,
        data: low_stock(&products, threshold),
    }))
}

async fn categories(State(state): State<AppState>) -> AppResult<Json<Vec<CategoryCount>>> {
    let products = state.collections.products.fetch_all().await?;
    Ok(Json(category_counts(
        &products,
        &state.config.inventory.categories,
    )))
}
