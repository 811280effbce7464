use axum::{
    extract::{Request, State},
    http::HeaderMap,
    middleware::Next,
    response::Response,
};
use axum_extra::{
    extract::CookieJar,
    headers::{Authorization, HeaderMapExt, authorization::Bearer},
};
use tracing::debug;

use crate::AppState;
use crate::error::AppError;
use crate::utils::verify_token;

pub const TOKEN_COOKIE: &str = "token";

/// 优先读取 Authorization 头，其次读取 token cookie
fn extract_token(headers: &HeaderMap) -> Option<String> {
    if let Some(auth) = headers.typed_get::<Authorization<Bearer>>() {
        return Some(auth.token().to_string());
    }
    CookieJar::from_headers(headers)
        .get(TOKEN_COOKIE)
        .map(|cookie| cookie.value().to_string())
        .filter(|token| !token.is_empty())
}

/// 校验令牌，并把 Claims 放入请求扩展供处理函数使用
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let Some(token) = extract_token(request.headers()) else {
        return Err(AppError::Unauthorized("Access token required".into()));
    };

    let claims = verify_token(&token, &state.config).map_err(|e| {
        debug!("令牌校验失败: {}", e);
        AppError::Forbidden("Invalid or expired token".into())
    })?;

    request.extensions_mut().insert(claims);
    Ok(next.run(request).await)
}
