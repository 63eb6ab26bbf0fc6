//! API error classification and the `{success, data|error}` envelope.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;
use tracing::error;

use vibex_gateway::GatewayError;
use vibex_memory::MemoryError;
use vibex_store::StoreError;

/// One field-level validation problem
#[derive(Debug, Clone, Serialize)]
pub struct FieldIssue {
    pub field: String,
    pub message: String,
}

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("validation failed")]
    Validation(Vec<FieldIssue>),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Conflict(String),
    #[error("{0}")]
    Upstream(String),
    #[error("internal error")]
    Internal(#[from] anyhow::Error),
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::Upstream(_) => StatusCode::BAD_GATEWAY,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn code(&self) -> &'static str {
        match self {
            ApiError::Validation(_) => "validation_error",
            ApiError::NotFound(_) => "not_found",
            ApiError::Conflict(_) => "conflict",
            ApiError::Upstream(_) => "upstream_error",
            ApiError::Internal(_) => "internal_error",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();

        // The generic message hides internals; the log line keeps them
        let message = match &self {
            ApiError::Internal(e) => {
                error!("Internal error: {e:#}");
                "internal server error".to_string()
            }
            other => other.to_string(),
        };

        let mut body = serde_json::json!({
            "success": false,
            "error": {
                "code": self.code(),
                "message": message,
            }
        });
        if let ApiError::Validation(issues) = &self {
            body["error"]["issues"] =
                serde_json::to_value(issues).unwrap_or(serde_json::Value::Null);
        }

        (status, Json(body)).into_response()
    }
}

impl From<StoreError> for ApiError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::NotFound(_) => ApiError::NotFound(e.to_string()),
            StoreError::WipLimitReached { .. } => ApiError::Conflict(e.to_string()),
            other => ApiError::Internal(other.into()),
        }
    }
}

impl From<MemoryError> for ApiError {
    fn from(e: MemoryError) -> Self {
        match e {
            MemoryError::NotFound(_) => ApiError::NotFound(e.to_string()),
            other => ApiError::Internal(other.into()),
        }
    }
}

impl From<GatewayError> for ApiError {
    fn from(e: GatewayError) -> Self {
        match e {
            GatewayError::BudgetExceeded(_) => ApiError::Conflict(e.to_string()),
            GatewayError::NoProvider | GatewayError::Upstream { .. } => {
                ApiError::Upstream(e.to_string())
            }
        }
    }
}

/// Success envelope: serializes as `{"success": true, "data": <T>}`
pub struct ApiOk<T>(pub T);

impl<T: Serialize> IntoResponse for ApiOk<T> {
    fn into_response(self) -> Response {
        Json(serde_json::json!({
            "success": true,
            "data": self.0,
        }))
        .into_response()
    }
}

pub type ApiResult<T> = Result<ApiOk<T>, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_error_mapping() {
        let not_found: ApiError = StoreError::NotFound("t1".into()).into();
        assert_eq!(not_found.status(), StatusCode::NOT_FOUND);

        let conflict: ApiError = StoreError::WipLimitReached {
            column: "review".into(),
            limit: 3,
        }
        .into();
        assert_eq!(conflict.status(), StatusCode::CONFLICT);
        assert_eq!(conflict.code(), "conflict");
    }

    #[test]
    fn test_memory_error_mapping() {
        let err: ApiError = MemoryError::NotFound("planner/k".into()).into();
        assert_eq!(err.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_gateway_error_mapping() {
        let upstream: ApiError = GatewayError::Upstream {
            provider: "openai".into(),
            message: "503".into(),
        }
        .into();
        assert_eq!(upstream.status(), StatusCode::BAD_GATEWAY);

        let budget: ApiError = GatewayError::BudgetExceeded("spent".into()).into();
        assert_eq!(budget.status(), StatusCode::CONFLICT);
    }

    #[test]
    fn test_validation_status() {
        let err = ApiError::Validation(vec![FieldIssue {
            field: "title".into(),
            message: "must not be empty".into(),
        }]);
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert_eq!(err.code(), "validation_error");
    }
}
