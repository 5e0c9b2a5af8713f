use super::extract::AuthContext;
use super::response::ApiResponse;
use crate::catalog::{ImportReport, ImportRow};
use crate::error::AppResult;
use crate::models::{Company, Product, ProductInput};
use crate::services::catalog_service::{ProductPage, SearchQuery};
use crate::SharedState;
use axum::extract::{Path, Query, State};
use axum::Json;
use serde::Deserialize;
use uuid::Uuid;

/// Body of a catalog import: spreadsheet rows already converted by the client
#[derive(Debug, Deserialize)]
pub struct ImportRequest {
    pub rows: Vec<ImportRow>,
}

pub async fn search(
    State(state): State<SharedState>,
    AuthContext(_claims): AuthContext,
    Query(query): Query<SearchQuery>,
) -> AppResult<ApiResponse<ProductPage>> {
    Ok(ApiResponse::ok(state.catalog.search(query).await?))
}

pub async fn create(
    State(state): State<SharedState>,
    AuthContext(claims): AuthContext,
    Json(input): Json<ProductInput>,
) -> AppResult<ApiResponse<Product>> {
    let product = state.catalog.create_product(&claims, input).await?;
    Ok(ApiResponse::created(product))
}

pub async fn mine(
    State(state): State<SharedState>,
    AuthContext(claims): AuthContext,
) -> AppResult<ApiResponse<Vec<Product>>> {
    Ok(ApiResponse::ok(state.catalog.own_products(&claims).await?))
}

pub async fn get(
    State(state): State<SharedState>,
    AuthContext(claims): AuthContext,
    Path(id): Path<Uuid>,
) -> AppResult<ApiResponse<Product>> {
    Ok(ApiResponse::ok(state.catalog.get_product(&claims, id).await?))
}

pub async fn update(
    State(state): State<SharedState>,
    AuthContext(claims): AuthContext,
    Path(id): Path<Uuid>,
    Json(input): Json<ProductInput>,
) -> AppResult<ApiResponse<Product>> {
    Ok(ApiResponse::ok(
        state.catalog.update_product(&claims, id, input).await?,
    ))
}

pub async fn delete(
    State(state): State<SharedState>,
    AuthContext(claims): AuthContext,
    Path(id): Path<Uuid>,
) -> AppResult<ApiResponse<()>> {
    state.catalog.delete_product(&claims, id).await?;
    Ok(ApiResponse::message("Product deactivated"))
}

pub async fn import(
    State(state): State<SharedState>,
    AuthContext(claims): AuthContext,
    Json(req): Json<ImportRequest>,
) -> AppResult<ApiResponse<ImportReport>> {
    let report = state.catalog.import_products(&claims, req.rows).await?;
    Ok(ApiResponse::ok(report))
}

pub async fn providers(
    State(state): State<SharedState>,
    AuthContext(_claims): AuthContext,
) -> AppResult<ApiResponse<Vec<Company>>> {
    Ok(ApiResponse::ok(state.catalog.list_providers().await?))
}
