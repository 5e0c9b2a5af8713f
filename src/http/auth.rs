use super::extract::AuthContext;
use super::response::ApiResponse;
use crate::error::AppResult;
use crate::models::{Company, User};
use crate::services::auth_service::{AuthSession, NewMemberRequest, RegisterRequest};
use crate::SharedState;
use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct Profile {
    pub user: User,
    pub company: Company,
}

pub async fn register(
    State(state): State<SharedState>,
    Json(req): Json<RegisterRequest>,
) -> AppResult<ApiResponse<AuthSession>> {
    let session = state.auth.register(req).await?;
    Ok(ApiResponse::created(session))
}

pub async fn login(
    State(state): State<SharedState>,
    Json(req): Json<LoginRequest>,
) -> AppResult<ApiResponse<AuthSession>> {
    let session = state.auth.login(&req.email, &req.password).await?;
    Ok(ApiResponse::ok(session))
}

pub async fn me(
    State(state): State<SharedState>,
    AuthContext(claims): AuthContext,
) -> AppResult<ApiResponse<Profile>> {
    let (user, company) = state.auth.me(claims.sub).await?;
    Ok(ApiResponse::ok(Profile { user, company }))
}

pub async fn members(
    State(state): State<SharedState>,
    AuthContext(claims): AuthContext,
) -> AppResult<ApiResponse<Vec<User>>> {
    Ok(ApiResponse::ok(state.auth.members(claims.company_id).await?))
}

pub async fn add_member(
    State(state): State<SharedState>,
    AuthContext(claims): AuthContext,
    Json(req): Json<NewMemberRequest>,
) -> AppResult<ApiResponse<User>> {
    let user = state.auth.add_member(&claims, req).await?;
    Ok(ApiResponse::created(user))
}
