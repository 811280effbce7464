use axum::{
    Router,
    http::{HeaderValue, Method, header},
    routing::{get, post, put},
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::warn;

use crate::{
    AppState,
    config::Config,
    middleware::{auth_middleware, log_errors},
    routes,
};

/// 配置了来源列表时只允许这些来源携带凭证访问；
/// 未配置时调试构建放开所有来源，发布构建不添加 CORS
fn cors_layer(config: &Config) -> Option<CorsLayer> {
    let origins: Vec<HeaderValue> = config
        .cors_origins
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(_) => {
                warn!("忽略无效的 CORS 来源: {}", origin);
                None
            }
        })
        .collect();

    if !origins.is_empty() {
        return Some(
            CorsLayer::new()
                .allow_origin(origins)
                .allow_credentials(true)
                .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
                .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE]),
        );
    }

    if cfg!(debug_assertions) {
        tracing::debug!("Adding permissive CORS layer for development mode");
        Some(CorsLayer::permissive())
    } else {
        None
    }
}

pub fn create_router(state: AppState) -> Router {
    // 将路由分为公开路由和受保护路由
    let public_routes = Router::new()
        .route("/health", get(routes::health))
        // 账户
        .route("/users/register", post(routes::user::register))
        .route("/users/login", post(routes::user::login))
        .route("/users/logout", post(routes::user::logout))
        .route("/users/{id}", get(routes::user::public_profile))
        // 他人书架
        .route("/users/{id}/bookshelf", get(routes::bookshelf::list_user_shelf))
        .route("/users/{id}/bookshelf/stats", get(routes::bookshelf::shelf_stats))
        // 关注关系
        .route("/users/{id}/followers", get(routes::community::followers))
        .route("/users/{id}/following", get(routes::community::following))
        // 图书目录
        .route(
            "/books",
            get(routes::book::list_books).post(routes::book::create_book),
        )
        .route("/books/import", post(routes::book::import_book))
        .route("/books/search/external", get(routes::book::search_external))
        .route("/books/{id}", get(routes::book::get_book))
        // 群组与话题
        .route("/groups", get(routes::group::list_groups))
        .route("/groups/{id}", get(routes::group::get_group))
        .route("/groups/{id}/topics", get(routes::topic::list_topics))
        .route("/topics/{id}", get(routes::topic::get_topic));

    let protected_routes = Router::new()
        .route(
            "/users/profile",
            get(routes::user::get_profile).put(routes::user::update_profile),
        )
        .route(
            "/users/bookshelf",
            get(routes::bookshelf::list_own_shelf).post(routes::bookshelf::add_to_shelf),
        )
        .route(
            "/users/bookshelf/{id}",
            put(routes::bookshelf::update_shelf_entry)
                .delete(routes::bookshelf::remove_from_shelf),
        )
        .route(
            "/users/{id}/follow-status",
            get(routes::community::follow_status),
        )
        .route(
            "/users/{id}/follow",
            post(routes::community::follow).delete(routes::community::unfollow),
        )
        .route("/groups", post(routes::group::create_group))
        .route("/groups/{id}/join", post(routes::group::join_group))
        .route("/groups/{id}/leave", post(routes::group::leave_group))
        .route("/groups/{id}/topics", post(routes::topic::create_topic))
        .route("/topics/{id}/reply", post(routes::topic::reply_topic))
        // 应用认证中间件，仅作用于以上路由
        .route_layer(axum::middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    let api = Router::new().merge(public_routes).merge(protected_routes);
    let base = state.config.api_base_uri.trim_end_matches('/');
    let router = if base.is_empty() {
        api
    } else {
        Router::new().nest(base, api)
    };

    let router = router
        .layer(axum::middleware::from_fn(log_errors))
        .layer(TraceLayer::new_for_http());

    let router = match cors_layer(&state.config) {
        Some(cors) => router.layer(cors),
        None => router,
    };

    router.with_state(state)
}
