use axum::{
    extract::{Extension, Path, State},
    http::StatusCode,
    response::IntoResponse,
};

use crate::{
    AppState,
    routes::{ValidJson, parse_id},
    utils::{Claims, success_to_api_response},
};

use super::model::{CreateTopicRequest, ReplyRequest};

const TOPIC_NOT_FOUND: &str = "Topic not found";

/// 群组下的话题列表；群组ID无效时返回空列表
#[axum::debug_handler]
pub async fn list_topics(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    let group_id = match parse_id(&id, "Group not found") {
        Ok(id) => id,
        Err(e) => return e.to_api_response(),
    };
    match state.topics().list(group_id).await {
        Ok(topics) => (StatusCode::OK, success_to_api_response(topics)),
        Err(e) => e.to_api_response(),
    }
}

#[axum::debug_handler]
pub async fn create_topic(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<String>,
    ValidJson(req): ValidJson<CreateTopicRequest>,
) -> impl IntoResponse {
    let parsed = claims
        .user_id()
        .and_then(|user| Ok((user, parse_id(&id, "Group not found")?)));
    let (user_id, group_id) = match parsed {
        Ok(parsed) => parsed,
        Err(e) => return e.to_api_response(),
    };
    match state
        .topics()
        .create(group_id, user_id, req.title, req.content)
        .await
    {
        Ok(topic) => (StatusCode::CREATED, success_to_api_response(topic)),
        Err(e) => e.to_api_response(),
    }
}

#[axum::debug_handler]
pub async fn get_topic(State(state): State<AppState>, Path(id): Path<String>) -> impl IntoResponse {
    let topic_id = match parse_id(&id, TOPIC_NOT_FOUND) {
        Ok(id) => id,
        Err(e) => return e.to_api_response(),
    };
    match state.topics().get(topic_id).await {
        Ok(topic) => (StatusCode::OK, success_to_api_response(topic)),
        Err(e) => e.to_api_response(),
    }
}

#[axum::debug_handler]
pub async fn reply_topic(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<String>,
    ValidJson(req): ValidJson<ReplyRequest>,
) -> impl IntoResponse {
    let parsed = claims
        .user_id()
        .and_then(|user| Ok((user, parse_id(&id, TOPIC_NOT_FOUND)?)));
    let (user_id, topic_id) = match parsed {
        Ok(parsed) => parsed,
        Err(e) => return e.to_api_response(),
    };
    match state.topics().reply(topic_id, user_id, req.content).await {
        Ok(topic) => (StatusCode::OK, success_to_api_response(topic)),
        Err(e) => e.to_api_response(),
    }
}
