use axum::Json;
use axum::{
    extract::rejection::{JsonRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

use crate::database::StoreError;
use crate::utils::{ApiResponse, error_codes, error_to_api_response};

#[derive(Debug, Error)]
pub enum AppError {
    /// 实体不存在，或不属于调用者
    #[error("{0}")]
    NotFound(String),

    /// 唯一性约束冲突
    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    InvalidOperation(String),

    #[error("{0}")]
    ValidationFailed(String),

    /// 外部图书检索失败
    #[error("{0}")]
    UpstreamUnavailable(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("internal error: {0}")]
    Internal(String),
}

pub type AppResult<T> = Result<T, AppError>;

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::InvalidOperation(_) | AppError::ValidationFailed(_) => {
                StatusCode::BAD_REQUEST
            }
            AppError::UpstreamUnavailable(_) => StatusCode::BAD_GATEWAY,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn code(&self) -> i32 {
        match self {
            AppError::NotFound(_) => error_codes::NOT_FOUND,
            AppError::Conflict(_) => error_codes::CONFLICT,
            AppError::InvalidOperation(_) => error_codes::INVALID_OPERATION,
            AppError::ValidationFailed(_) => error_codes::VALIDATION_ERROR,
            AppError::UpstreamUnavailable(_) => error_codes::UPSTREAM_ERROR,
            AppError::Unauthorized(_) => error_codes::AUTH_FAILED,
            AppError::Forbidden(_) => error_codes::PERMISSION_DENIED,
            AppError::Internal(_) => error_codes::INTERNAL_ERROR,
        }
    }

    /// 转换为统一的API错误响应，与成功分支的类型一致
    pub fn to_api_response<T>(&self) -> (StatusCode, Json<ApiResponse<T>>) {
        let msg = match self {
            AppError::Internal(detail) => {
                tracing::error!("Internal error: {}", detail);
                "Server error".to_string()
            }
            other => other.to_string(),
        };
        (self.status(), error_to_api_response(self.code(), msg))
    }
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::UniqueViolation(constraint) => {
                AppError::Conflict(format!("Duplicate value violates {}", constraint))
            }
            other => AppError::Internal(other.to_string()),
        }
    }
}

/// 请求体缺字段或类型不符
impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::ValidationFailed(rejection.body_text())
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        AppError::ValidationFailed(rejection.body_text())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        self.to_api_response::<()>().into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn taxonomy_maps_to_statuses() {
        assert_eq!(AppError::NotFound("x".into()).status(), StatusCode::NOT_FOUND);
        assert_eq!(AppError::Conflict("x".into()).status(), StatusCode::CONFLICT);
        assert_eq!(
            AppError::InvalidOperation("x".into()).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AppError::UpstreamUnavailable("x".into()).status(),
            StatusCode::BAD_GATEWAY
        );
    }

    #[test]
    fn unique_violation_becomes_conflict() {
        let err: AppError = StoreError::UniqueViolation("accounts_email_key".into()).into();
        assert!(matches!(err, AppError::Conflict(_)));
    }

    #[test]
    fn internal_detail_is_not_exposed() {
        let (status, Json(body)) =
            AppError::Internal("connection refused".into()).to_api_response::<()>();
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body.msg, "Server error");
        assert_eq!(body.code, error_codes::INTERNAL_ERROR);
    }
}
