//! Platform administration: company moderation and a global view of requests.

use super::extract::PlatformAdmin;
use super::response::ApiResponse;
use super::parse_status;
use crate::error::{AppError, AppResult};
use crate::models::{AccountType, Company, RentalJob, RentalJobStatus};
use crate::services::catalog_service::{page_bounds, page_offset};
use crate::SharedState;
use axum::extract::{Path, Query, State};
use axum::Json;
use serde::Deserialize;
use tracing::info;
use uuid::Uuid;

#[derive(Debug, Default, Deserialize)]
pub struct CompanyQuery {
    pub account_type: Option<String>,
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}

#[derive(Debug, Default, Deserialize)]
pub struct RentalJobQuery {
    pub status: Option<String>,
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct SetActiveRequest {
    pub is_active: bool,
}

pub async fn companies(
    State(state): State<SharedState>,
    PlatformAdmin(_admin): PlatformAdmin,
    Query(query): Query<CompanyQuery>,
) -> AppResult<ApiResponse<Vec<Company>>> {
    let account_type = parse_status(query.account_type.as_deref(), AccountType::from_str)?;
    let (page, per_page) = page_bounds(query.page, query.per_page);
    let companies = state
        .company_repo
        .list(account_type, per_page, page_offset(page, per_page))
        .await?;
    Ok(ApiResponse::ok(companies))
}

pub async fn set_company_active(
    State(state): State<SharedState>,
    PlatformAdmin(admin): PlatformAdmin,
    Path(id): Path<Uuid>,
    Json(req): Json<SetActiveRequest>,
) -> AppResult<ApiResponse<Company>> {
    let company = state
        .company_repo
        .set_active(id, req.is_active)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Company {} not found", id)))?;

    info!(
        "Company {} {} by platform admin {}",
        company.id,
        if company.is_active { "activated" } else { "deactivated" },
        admin.sub
    );
    Ok(ApiResponse::ok(company))
}

pub async fn rental_jobs(
    State(state): State<SharedState>,
    PlatformAdmin(_admin): PlatformAdmin,
    Query(query): Query<RentalJobQuery>,
) -> AppResult<ApiResponse<Vec<RentalJob>>> {
    let status = parse_status(query.status.as_deref(), RentalJobStatus::from_str)?;
    let (page, per_page) = page_bounds(query.page, query.per_page);
    let jobs = state
        .negotiation
        .admin_list_rental_jobs(status, per_page, page_offset(page, per_page))
        .await?;
    Ok(ApiResponse::ok(jobs))
}
