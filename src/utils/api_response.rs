use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use chrono::Utc;
use serde::{Deserialize, Serialize};

/// Uniform response envelope used by every handler. Business failures map
/// onto it directly: InvalidRequest → 400, Forbidden → 403, NotFound → 404,
/// Conflict → 409, InternalError → 500.
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub status_code: u16,
    pub message: String,
    pub timestamp: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub errors: Option<serde_json::Value>,
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> axum::response::Response {
        let status =
            StatusCode::from_u16(self.status_code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, Json(self)).into_response()
    }
}

impl<T: Serialize> ApiResponse<T> {
    /// Create a success response
    pub fn success(status: StatusCode, message: impl Into<String>, data: T) -> Self {
        ApiResponse {
            success: true,
            status_code: status.as_u16(),
            message: message.into(),
            timestamp: Utc::now().to_rfc3339(),
            data: Some(data),
            errors: None,
        }
    }

    /// Create an error response
    pub fn error(
        status: StatusCode,
        message: impl Into<String>,
        errors: Option<serde_json::Value>,
    ) -> Self {
        ApiResponse {
            success: false,
            status_code: status.as_u16(),
            message: message.into(),
            timestamp: Utc::now().to_rfc3339(),
            data: None,
            errors,
        }
    }
}

impl ApiResponse<()> {
    /// Shorthand for a database failure surfaced as a 500.
    pub fn db_error(message: impl Into<String>, e: sqlx::Error) -> Self {
        ApiResponse::error(
            StatusCode::INTERNAL_SERVER_ERROR,
            message,
            Some(serde_json::json!({ "db_error": e.to_string() })),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn success_carries_data_and_code() {
        let resp = ApiResponse::success(StatusCode::CREATED, "created", 7);
        assert!(resp.success);
        assert_eq!(resp.status_code, 201);
        assert_eq!(resp.data, Some(7));
        assert!(resp.errors.is_none());
    }

    #[test]
    fn error_carries_detail() {
        let resp = ApiResponse::<()>::error(
            StatusCode::CONFLICT,
            "already processed",
            Some(serde_json::json!({ "state": "approved" })),
        );
        assert!(!resp.success);
        assert_eq!(resp.status_code, 409);
        assert!(resp.data.is_none());
        assert_eq!(resp.errors.unwrap()["state"], "approved");
    }
}
