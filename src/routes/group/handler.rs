use axum::{
    extract::{Extension, Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use tracing::info;

use crate::{
    AppState,
    database::models::PageQuery,
    routes::{MessageResponse, ValidJson, ValidQuery, parse_id},
    utils::{Claims, success_to_api_response},
};

use super::model::CreateGroupRequest;

const GROUP_NOT_FOUND: &str = "Group not found";

#[axum::debug_handler]
pub async fn list_groups(
    State(state): State<AppState>,
    ValidQuery(query): ValidQuery<PageQuery>,
) -> impl IntoResponse {
    match state.groups().list(query).await {
        Ok(page) => (StatusCode::OK, success_to_api_response(page)),
        Err(e) => e.to_api_response(),
    }
}

#[axum::debug_handler]
pub async fn create_group(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    ValidJson(req): ValidJson<CreateGroupRequest>,
) -> impl IntoResponse {
    let user_id = match claims.user_id() {
        Ok(id) => id,
        Err(e) => return e.to_api_response(),
    };
    info!("用户 {} 正在创建群组", user_id);

    match state.groups().create(user_id, req.into()).await {
        Ok(group) => (StatusCode::CREATED, success_to_api_response(group)),
        Err(e) => e.to_api_response(),
    }
}

#[axum::debug_handler]
pub async fn get_group(State(state): State<AppState>, Path(id): Path<String>) -> impl IntoResponse {
    let group_id = match parse_id(&id, GROUP_NOT_FOUND) {
        Ok(id) => id,
        Err(e) => return e.to_api_response(),
    };
    match state.groups().get(group_id).await {
        Ok(group) => (StatusCode::OK, success_to_api_response(group)),
        Err(e) => e.to_api_response(),
    }
}

#[axum::debug_handler]
pub async fn join_group(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    let parsed = claims
        .user_id()
        .and_then(|user| Ok((user, parse_id(&id, GROUP_NOT_FOUND)?)));
    let (user_id, group_id) = match parsed {
        Ok(parsed) => parsed,
        Err(e) => return e.to_api_response(),
    };
    match state.groups().join(group_id, user_id).await {
        Ok(()) => (
            StatusCode::OK,
            success_to_api_response(MessageResponse::new("Joined group")),
        ),
        Err(e) => e.to_api_response(),
    }
}

#[axum::debug_handler]
pub async fn leave_group(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    let parsed = claims
        .user_id()
        .and_then(|user| Ok((user, parse_id(&id, GROUP_NOT_FOUND)?)));
    let (user_id, group_id) = match parsed {
        Ok(parsed) => parsed,
        Err(e) => return e.to_api_response(),
    };
    match state.groups().leave(group_id, user_id).await {
        Ok(()) => (
            StatusCode::OK,
            success_to_api_response(MessageResponse::new("Left group")),
        ),
        Err(e) => e.to_api_response(),
    }
}
