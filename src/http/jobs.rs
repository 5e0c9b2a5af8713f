use super::extract::AuthContext;
use super::response::ApiResponse;
use super::{parse_status, StatusQuery};
use crate::error::AppResult;
use crate::models::{JobOffer, JobRating, RentalJob, RentalJobStatus, SupplyJob, SupplyJobStatus};
use crate::services::negotiation_service::{
    CancelRequest, CreateRentalRequest, HandshakeOutcome, OfferRequest, RentalJobDetail,
    SupplyJobDetail,
};
use crate::services::rating_service::{CompanyRatings, RatingRequest};
use crate::SharedState;
use axum::extract::{Path, Query, State};
use axum::Json;
use uuid::Uuid;

pub async fn create_rental_job(
    State(state): State<SharedState>,
    AuthContext(claims): AuthContext,
    Json(req): Json<CreateRentalRequest>,
) -> AppResult<ApiResponse<RentalJobDetail>> {
    let detail = state.negotiation.create_rental_request(&claims, req).await?;
    Ok(ApiResponse::created(detail))
}

pub async fn list_rental_jobs(
    State(state): State<SharedState>,
    AuthContext(claims): AuthContext,
    Query(query): Query<StatusQuery>,
) -> AppResult<ApiResponse<Vec<RentalJob>>> {
    let status = parse_status(query.status.as_deref(), RentalJobStatus::from_str)?;
    Ok(ApiResponse::ok(
        state.negotiation.list_rental_jobs(&claims, status).await?,
    ))
}

pub async fn rental_job_detail(
    State(state): State<SharedState>,
    AuthContext(claims): AuthContext,
    Path(id): Path<Uuid>,
) -> AppResult<ApiResponse<RentalJobDetail>> {
    Ok(ApiResponse::ok(
        state.negotiation.rental_job_detail(&claims, id).await?,
    ))
}

pub async fn cancel_rental_job(
    State(state): State<SharedState>,
    AuthContext(claims): AuthContext,
    Path(id): Path<Uuid>,
) -> AppResult<ApiResponse<RentalJob>> {
    let rental_job = state.negotiation.cancel_rental_job(&claims, id).await?;
    Ok(ApiResponse::ok(rental_job).with_message("Rental request cancelled"))
}

pub async fn list_supply_jobs(
    State(state): State<SharedState>,
    AuthContext(claims): AuthContext,
    Query(query): Query<StatusQuery>,
) -> AppResult<ApiResponse<Vec<SupplyJob>>> {
    let status = parse_status(query.status.as_deref(), SupplyJobStatus::from_str)?;
    Ok(ApiResponse::ok(
        state.negotiation.list_supply_jobs(&claims, status).await?,
    ))
}

pub async fn supply_job_detail(
    State(state): State<SharedState>,
    AuthContext(claims): AuthContext,
    Path(id): Path<Uuid>,
) -> AppResult<ApiResponse<SupplyJobDetail>> {
    Ok(ApiResponse::ok(
        state.negotiation.supply_job_detail(&claims, id).await?,
    ))
}

pub async fn send_offer(
    State(state): State<SharedState>,
    AuthContext(claims): AuthContext,
    Path(id): Path<Uuid>,
    Json(req): Json<OfferRequest>,
) -> AppResult<ApiResponse<JobOffer>> {
    let offer = state.negotiation.send_offer(&claims, id, req).await?;
    Ok(ApiResponse::created(offer))
}

pub async fn handshake(
    State(state): State<SharedState>,
    AuthContext(claims): AuthContext,
    Path(id): Path<Uuid>,
) -> AppResult<ApiResponse<HandshakeOutcome>> {
    let outcome = state.negotiation.handshake(&claims, id).await?;
    Ok(ApiResponse::ok(outcome).with_message("Handshake confirmed"))
}

/// The body is optional; an empty POST cancels without a reason
pub async fn cancel_negotiation(
    State(state): State<SharedState>,
    AuthContext(claims): AuthContext,
    Path(id): Path<Uuid>,
    body: Option<Json<CancelRequest>>,
) -> AppResult<ApiResponse<SupplyJob>> {
    let reason = body.and_then(|Json(req)| req.reason);
    let supply_job = state
        .negotiation
        .cancel_negotiation(&claims, id, reason)
        .await?;
    Ok(ApiResponse::ok(supply_job).with_message("Negotiation cancelled"))
}

pub async fn start_supply_job(
    State(state): State<SharedState>,
    AuthContext(claims): AuthContext,
    Path(id): Path<Uuid>,
) -> AppResult<ApiResponse<SupplyJob>> {
    Ok(ApiResponse::ok(
        state.negotiation.start_supply_job(&claims, id).await?,
    ))
}

pub async fn complete_supply_job(
    State(state): State<SharedState>,
    AuthContext(claims): AuthContext,
    Path(id): Path<Uuid>,
) -> AppResult<ApiResponse<SupplyJob>> {
    Ok(ApiResponse::ok(
        state.negotiation.complete_supply_job(&claims, id).await?,
    ))
}

pub async fn rate_supply_job(
    State(state): State<SharedState>,
    AuthContext(claims): AuthContext,
    Path(id): Path<Uuid>,
    Json(req): Json<RatingRequest>,
) -> AppResult<ApiResponse<JobRating>> {
    let rating = state.ratings.rate_supply_job(&claims, id, req).await?;
    Ok(ApiResponse::created(rating))
}

pub async fn supply_job_rating(
    State(state): State<SharedState>,
    AuthContext(_claims): AuthContext,
    Path(id): Path<Uuid>,
) -> AppResult<ApiResponse<Option<JobRating>>> {
    Ok(ApiResponse::ok(state.ratings.rating_for_supply_job(id).await?))
}

pub async fn company_ratings(
    State(state): State<SharedState>,
    AuthContext(_claims): AuthContext,
    Path(company_id): Path<Uuid>,
) -> AppResult<ApiResponse<CompanyRatings>> {
    Ok(ApiResponse::ok(
        state.ratings.company_rating_summary(company_id).await?,
    ))
}
