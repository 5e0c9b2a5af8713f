use crate::auth::{bearer_token, verify_token, Claims};
use crate::error::AppError;
use crate::SharedState;
use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;

fn claims_from_header(parts: &Parts, state: &SharedState) -> Result<Claims, AppError> {
    let header = parts
        .headers
        .get(AUTHORIZATION)
        .ok_or_else(|| AppError::Unauthorized("Missing Authorization header".to_string()))?
        .to_str()
        .map_err(|_| AppError::Unauthorized("Malformed Authorization header".to_string()))?;

    let token = bearer_token(header)?;
    verify_token(token, &state.config.auth.jwt_secret)
}

/// Verified caller of an `/api/*` route.
///
/// Tokens stay valid until they expire, so the caller's company is looked up
/// on every request and a deactivated company is turned away.
#[derive(Debug, Clone)]
pub struct AuthContext(pub Claims);

#[async_trait]
impl FromRequestParts<SharedState> for AuthContext {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &SharedState) -> Result<Self, Self::Rejection> {
        let claims = claims_from_header(parts, state)?;

        let company = state
            .company_repo
            .find_by_id(claims.company_id)
            .await?
            .ok_or_else(|| AppError::Unauthorized("Company no longer exists".to_string()))?;
        if !company.is_active {
            return Err(AppError::Forbidden("Company is deactivated".to_string()));
        }
        Ok(AuthContext(claims))
    }
}

/// Caller whose token carries the platform-admin claim.
///
/// The claim comes from the configured admin emails, not from the company,
/// so the company's active flag is not consulted.
#[derive(Debug, Clone)]
pub struct PlatformAdmin(pub Claims);

#[async_trait]
impl FromRequestParts<SharedState> for PlatformAdmin {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &SharedState) -> Result<Self, Self::Rejection> {
        let claims = claims_from_header(parts, state)?;
        if !claims.platform_admin {
            return Err(AppError::Forbidden("Platform administrators only".to_string()));
        }
        Ok(PlatformAdmin(claims))
    }
}
