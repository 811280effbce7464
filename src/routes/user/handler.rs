use axum::{
    extract::{Extension, Path, State},
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use tracing::error;

use crate::{
    AppState,
    config::Config,
    database::models::Account,
    error::AppError,
    middleware::TOKEN_COOKIE,
    routes::{MessageResponse, ValidJson, parse_id},
    utils::{Claims, generate_token, success_to_api_response},
};

use super::model::{AuthResponse, LoginRequest, RegisterRequest, UpdateProfileRequest};

fn session_cookie(config: &Config, token: &str, max_age: u64) -> String {
    let same_site = if config.cookie_secure {
        "Secure; SameSite=None"
    } else {
        "SameSite=Lax"
    };
    format!(
        "{}={}; HttpOnly; Path=/; Max-Age={}; {}",
        TOKEN_COOKIE, token, max_age, same_site
    )
}

/// 签发令牌并写入 cookie
fn authenticated(state: &AppState, status: StatusCode, message: &str, user: Account) -> Response {
    let (token, expires_at) = match generate_token(&user.id, &state.config) {
        Ok(issued) => issued,
        Err(e) => {
            error!("生成令牌失败: {}", e);
            return AppError::Internal(format!("token generation failed: {}", e)).into_response();
        }
    };

    let cookie = session_cookie(&state.config, &token, state.config.jwt_expiration().as_secs());
    let mut response = (
        status,
        success_to_api_response(AuthResponse {
            message: message.to_string(),
            token,
            expires_at,
            user,
        }),
    )
        .into_response();
    match HeaderValue::from_str(&cookie) {
        Ok(value) => {
            response.headers_mut().insert(header::SET_COOKIE, value);
        }
        Err(e) => error!("无法设置 cookie: {}", e),
    }
    response
}

#[axum::debug_handler]
pub async fn register(
    State(state): State<AppState>,
    ValidJson(req): ValidJson<RegisterRequest>,
) -> Response {
    match state.users().register(req.into()).await {
        Ok(user) => authenticated(&state, StatusCode::CREATED, "User created successfully", user),
        Err(e) => e.into_response(),
    }
}

#[axum::debug_handler]
pub async fn login(
    State(state): State<AppState>,
    ValidJson(req): ValidJson<LoginRequest>,
) -> Response {
    match state.users().login(&req.email, &req.password).await {
        Ok(user) => authenticated(&state, StatusCode::OK, "Login successful", user),
        Err(e) => e.into_response(),
    }
}

#[axum::debug_handler]
pub async fn logout(State(state): State<AppState>) -> impl IntoResponse {
    let cookie = session_cookie(&state.config, "", 0);
    (
        StatusCode::OK,
        [(header::SET_COOKIE, cookie)],
        success_to_api_response(MessageResponse::new("Logged out successfully")),
    )
}

#[axum::debug_handler]
pub async fn get_profile(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> impl IntoResponse {
    let user_id = match claims.user_id() {
        Ok(id) => id,
        Err(e) => return e.to_api_response(),
    };
    match state.users().profile(user_id).await {
        Ok(profile) => (StatusCode::OK, success_to_api_response(profile)),
        Err(e) => e.to_api_response(),
    }
}

#[axum::debug_handler]
pub async fn update_profile(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    ValidJson(req): ValidJson<UpdateProfileRequest>,
) -> impl IntoResponse {
    let user_id = match claims.user_id() {
        Ok(id) => id,
        Err(e) => return e.to_api_response(),
    };
    match state.users().update_profile(user_id, req.into()).await {
        Ok(profile) => (StatusCode::OK, success_to_api_response(profile)),
        Err(e) => e.to_api_response(),
    }
}

#[axum::debug_handler]
pub async fn public_profile(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    let user_id = match parse_id(&id, "User not found") {
        Ok(id) => id,
        Err(e) => return e.to_api_response(),
    };
    match state.users().public_profile(user_id).await {
        Ok(profile) => (StatusCode::OK, success_to_api_response(profile)),
        Err(e) => e.to_api_response(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(cookie_secure: bool) -> Config {
        Config {
            database_url: "postgres://localhost/test".into(),
            database_max_connections: 1,
            database_min_connections: 1,
            database_acquire_timeout_secs: 1,
            jwt_secret: "secret".into(),
            jwt_expiration_secs: 3600,
            server_host: "127.0.0.1".into(),
            server_port: 0,
            api_base_uri: "/api".into(),
            google_books_api_url: "http://127.0.0.1:9".into(),
            external_lookup_timeout_secs: 1,
            cors_origins: vec![],
            cookie_secure,
            bcrypt_cost: 4,
        }
    }

    #[test]
    fn cookie_attributes_follow_config() {
        let lax = session_cookie(&config(false), "abc", 3600);
        assert_eq!(lax, "token=abc; HttpOnly; Path=/; Max-Age=3600; SameSite=Lax");

        let secure = session_cookie(&config(true), "", 0);
        assert!(secure.starts_with("token=; "));
        assert!(secure.ends_with("Max-Age=0; Secure; SameSite=None"));
    }
}
