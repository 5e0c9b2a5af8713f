use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

/// Envelope shared by every JSON endpoint.
///
/// Errors produce the same shape through `AppError`'s `IntoResponse`,
/// with `success: false` and no `data`.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip)]
    status: StatusCode,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            message: None,
            status: StatusCode::OK,
        }
    }

    pub fn created(data: T) -> Self {
        Self {
            status: StatusCode::CREATED,
            ..Self::ok(data)
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }
}

impl ApiResponse<()> {
    /// Success without a payload
    pub fn message(message: impl Into<String>) -> Self {
        Self {
            success: true,
            data: None,
            message: Some(message.into()),
            status: StatusCode::OK,
        }
    }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        let status = self.status;
        (status, Json(self)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_envelope_skips_empty_fields() {
        let body = serde_json::to_value(ApiResponse::ok(42)).unwrap();
        assert_eq!(body, serde_json::json!({"success": true, "data": 42}));

        let body = serde_json::to_value(ApiResponse::message("done")).unwrap();
        assert_eq!(body, serde_json::json!({"success": true, "message": "done"}));
    }

    #[test]
    fn test_created_status() {
        let response = ApiResponse::created("x").into_response();
        assert_eq!(response.status(), StatusCode::CREATED);
    }
}
