pub mod book;
pub mod bookshelf;
pub mod community;
pub mod group;
pub mod topic;
pub mod user;

use axum::{
    extract::{FromRequest, FromRequestParts, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde::Serialize;
use uuid::Uuid;

use crate::AppState;
use crate::error::AppError;
use crate::utils::success_to_api_response;

/// 只携带提示信息的响应
#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: &str) -> Self {
        Self {
            message: message.to_string(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}

/// JSON 请求体，解析失败时返回统一的校验错误
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct ValidJson<T>(pub T);

/// 查询参数，解析失败时返回统一的校验错误
#[derive(Debug, FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(AppError))]
pub struct ValidQuery<T>(pub T);

/// 路径中的ID无法解析时视为目标不存在
pub(crate) fn parse_id(raw: &str, not_found: &str) -> Result<Uuid, AppError> {
    Uuid::parse_str(raw).map_err(|_| AppError::NotFound(not_found.to_string()))
}

#[axum::debug_handler]
pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
    match state.store.health_check().await {
        Ok(()) => (
            StatusCode::OK,
            success_to_api_response(HealthResponse { status: "ok" }),
        ),
        Err(e) => AppError::from(e).to_api_response(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn malformed_ids_are_not_found() {
        let err = parse_id("not-a-uuid", "Book not found").unwrap_err();
        assert!(matches!(err, AppError::NotFound(msg) if msg == "Book not found"));

        let id = Uuid::new_v4();
        assert_eq!(parse_id(&id.to_string(), "Book not found").unwrap(), id);
    }
}
