mod handlers;
mod middleware;

pub use middleware::SecurityConfig;

use axum::{
    middleware::from_fn_with_state,
    routing::{delete, get, post},
    Router,
};
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

use crate::workspace::Workspace;

pub fn create_router(workspace: Workspace, security: SecurityConfig) -> Router {
    let ai = Router::new()
        .route("/create", post(handlers::create_article))
        .route("/refine", post(handlers::refine_article))
        .route("/sessions", get(handlers::list_sessions))
        .route("/session/{id}", get(handlers::get_session))
        .route("/session/{id}", delete(handlers::reset_session))
        .route("/preview/{id}", get(handlers::preview_article))
        .route("/publish/{id}", post(handlers::publish_article));

    let documents = Router::new()
        .route("/{doc_id}/blocks", get(handlers::get_document_blocks))
        .route("/image/{doc_id}/{token}", get(handlers::get_document_image));

    let protected = Router::new()
        .nest("/ai", ai)
        .nest("/documents", documents)
        .layer(from_fn_with_state(security.clone(), middleware::auth_middleware));

    let api = Router::new()
        .merge(protected)
        .route("/health", get(handlers::health));

    Router::new()
        .nest("/api", api)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(security.cors_layer()),
        )
        .with_state(workspace)
}
