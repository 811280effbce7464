use axum::{
    extract::{Extension, Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use tracing::debug;

use crate::{
    AppState,
    routes::{MessageResponse, ValidJson, ValidQuery, parse_id},
    utils::{Claims, success_to_api_response},
};

use super::model::{AddToShelfRequest, StatusQuery, UpdateShelfRequest};

const ITEM_NOT_FOUND: &str = "Bookshelf item not found";

#[axum::debug_handler]
pub async fn list_own_shelf(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> impl IntoResponse {
    let user_id = match claims.user_id() {
        Ok(id) => id,
        Err(e) => return e.to_api_response(),
    };
    match state.shelf().list_for_owner(user_id).await {
        Ok(items) => (StatusCode::OK, success_to_api_response(items)),
        Err(e) => e.to_api_response(),
    }
}

#[axum::debug_handler]
pub async fn add_to_shelf(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    ValidJson(req): ValidJson<AddToShelfRequest>,
) -> impl IntoResponse {
    let parsed = claims
        .user_id()
        .and_then(|user| Ok((user, req.book_id()?, req.status()?)));
    let (user_id, book_id, status) = match parsed {
        Ok(parsed) => parsed,
        Err(e) => return e.to_api_response(),
    };
    debug!("用户 {} 添加图书 {} 到书架", user_id, book_id);

    match state
        .shelf()
        .add(user_id, book_id, status, req.rating, req.review)
        .await
    {
        Ok(entry) => (StatusCode::CREATED, success_to_api_response(entry)),
        Err(e) => e.to_api_response(),
    }
}

#[axum::debug_handler]
pub async fn update_shelf_entry(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<String>,
    ValidJson(req): ValidJson<UpdateShelfRequest>,
) -> impl IntoResponse {
    let parsed = claims
        .user_id()
        .and_then(|user| Ok((user, parse_id(&id, ITEM_NOT_FOUND)?, req.into_update()?)));
    let (user_id, entry_id, update) = match parsed {
        Ok(parsed) => parsed,
        Err(e) => return e.to_api_response(),
    };

    match state.shelf().update(entry_id, user_id, update).await {
        Ok(entry) => (StatusCode::OK, success_to_api_response(entry)),
        Err(e) => e.to_api_response(),
    }
}

#[axum::debug_handler]
pub async fn remove_from_shelf(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    let parsed = claims
        .user_id()
        .and_then(|user| Ok((user, parse_id(&id, ITEM_NOT_FOUND)?)));
    let (user_id, entry_id) = match parsed {
        Ok(parsed) => parsed,
        Err(e) => return e.to_api_response(),
    };

    match state.shelf().remove(entry_id, user_id).await {
        Ok(()) => (
            StatusCode::OK,
            success_to_api_response(MessageResponse::new("Book removed from shelf")),
        ),
        Err(e) => e.to_api_response(),
    }
}

#[axum::debug_handler]
pub async fn list_user_shelf(
    State(state): State<AppState>,
    Path(id): Path<String>,
    ValidQuery(query): ValidQuery<StatusQuery>,
) -> impl IntoResponse {
    let parsed = parse_id(&id, "User not found").and_then(|user| Ok((user, query.status()?)));
    let (user_id, status) = match parsed {
        Ok(parsed) => parsed,
        Err(e) => return e.to_api_response(),
    };
    match state.shelf().list_by_status_for_subject(user_id, status).await {
        Ok(items) => (StatusCode::OK, success_to_api_response(items)),
        Err(e) => e.to_api_response(),
    }
}

#[axum::debug_handler]
pub async fn shelf_stats(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    let user_id = match parse_id(&id, "User not found") {
        Ok(id) => id,
        Err(e) => return e.to_api_response(),
    };
    match state.shelf().stats_for_subject(user_id).await {
        Ok(stats) => (StatusCode::OK, success_to_api_response(stats)),
        Err(e) => e.to_api_response(),
    }
}
