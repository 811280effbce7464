use axum::{
    extract::{Extension, Path, State},
    http::StatusCode,
    response::IntoResponse,
};

use crate::{
    AppState,
    routes::{MessageResponse, parse_id},
    utils::{Claims, success_to_api_response},
};

use super::model::FollowStatusResponse;

const USER_NOT_FOUND: &str = "User not found";

#[axum::debug_handler]
pub async fn followers(State(state): State<AppState>, Path(id): Path<String>) -> impl IntoResponse {
    let user_id = match parse_id(&id, USER_NOT_FOUND) {
        Ok(id) => id,
        Err(e) => return e.to_api_response(),
    };
    match state.social().followers(user_id).await {
        Ok(users) => (StatusCode::OK, success_to_api_response(users)),
        Err(e) => e.to_api_response(),
    }
}

#[axum::debug_handler]
pub async fn following(State(state): State<AppState>, Path(id): Path<String>) -> impl IntoResponse {
    let user_id = match parse_id(&id, USER_NOT_FOUND) {
        Ok(id) => id,
        Err(e) => return e.to_api_response(),
    };
    match state.social().following(user_id).await {
        Ok(users) => (StatusCode::OK, success_to_api_response(users)),
        Err(e) => e.to_api_response(),
    }
}

#[axum::debug_handler]
pub async fn follow_status(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    let parsed = claims
        .user_id()
        .and_then(|actor| Ok((actor, parse_id(&id, USER_NOT_FOUND)?)));
    let (actor, target) = match parsed {
        Ok(parsed) => parsed,
        Err(e) => return e.to_api_response(),
    };
    match state.social().follow_status(actor, target).await {
        Ok(is_following) => (
            StatusCode::OK,
            success_to_api_response(FollowStatusResponse { is_following }),
        ),
        Err(e) => e.to_api_response(),
    }
}

#[axum::debug_handler]
pub async fn follow(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    let parsed = claims
        .user_id()
        .and_then(|actor| Ok((actor, parse_id(&id, USER_NOT_FOUND)?)));
    let (actor, target) = match parsed {
        Ok(parsed) => parsed,
        Err(e) => return e.to_api_response(),
    };
    match state.social().follow(actor, target).await {
        Ok(()) => (
            StatusCode::OK,
            success_to_api_response(MessageResponse::new("Successfully followed user")),
        ),
        Err(e) => e.to_api_response(),
    }
}

#[axum::debug_handler]
pub async fn unfollow(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    let parsed = claims
        .user_id()
        .and_then(|actor| Ok((actor, parse_id(&id, USER_NOT_FOUND)?)));
    let (actor, target) = match parsed {
        Ok(parsed) => parsed,
        Err(e) => return e.to_api_response(),
    };
    match state.social().unfollow(actor, target).await {
        Ok(()) => (
            StatusCode::OK,
            success_to_api_response(MessageResponse::new("Successfully unfollowed user")),
        ),
        Err(e) => e.to_api_response(),
    }
}
