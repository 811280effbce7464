use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};

use crate::{
    AppState,
    database::models::{BookImport, NewBook, PageQuery},
    routes::{ValidJson, ValidQuery, parse_id},
    utils::success_to_api_response,
};

use super::model::ExternalSearchQuery;

#[axum::debug_handler]
pub async fn list_books(
    State(state): State<AppState>,
    ValidQuery(query): ValidQuery<PageQuery>,
) -> impl IntoResponse {
    match state.books().list(query).await {
        Ok(page) => (StatusCode::OK, success_to_api_response(page)),
        Err(e) => e.to_api_response(),
    }
}

#[axum::debug_handler]
pub async fn create_book(
    State(state): State<AppState>,
    ValidJson(req): ValidJson<NewBook>,
) -> impl IntoResponse {
    match state.books().create(req).await {
        Ok(book) => (StatusCode::CREATED, success_to_api_response(book)),
        Err(e) => e.to_api_response(),
    }
}

/// 已存在时返回 200，新建时返回 201
#[axum::debug_handler]
pub async fn import_book(
    State(state): State<AppState>,
    ValidJson(req): ValidJson<BookImport>,
) -> impl IntoResponse {
    match state.books().import(req).await {
        Ok((book, true)) => (StatusCode::CREATED, success_to_api_response(book)),
        Ok((book, false)) => (StatusCode::OK, success_to_api_response(book)),
        Err(e) => e.to_api_response(),
    }
}

#[axum::debug_handler]
pub async fn get_book(State(state): State<AppState>, Path(id): Path<String>) -> impl IntoResponse {
    let book_id = match parse_id(&id, "Book not found") {
        Ok(id) => id,
        Err(e) => return e.to_api_response(),
    };
    match state.books().get(book_id).await {
        Ok(book) => (StatusCode::OK, success_to_api_response(book)),
        Err(e) => e.to_api_response(),
    }
}

#[axum::debug_handler]
pub async fn search_external(
    State(state): State<AppState>,
    ValidQuery(query): ValidQuery<ExternalSearchQuery>,
) -> impl IntoResponse {
    match state.books().search_external(&query.q).await {
        Ok(books) => (StatusCode::OK, success_to_api_response(books)),
        Err(e) => e.to_api_response(),
    }
}
