use axum::{
    routing::{get, post},
    Router,
};
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, TraceLayer},
};

use crate::handlers;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    // Public routes
    let public_routes = Router::new()
        .route("/health", get(handlers::health::health_check))
        .route("/health/ready", get(handlers::health::readiness_check));

    // Bearer-authenticated routes
    let chat_routes = Router::new()
        .route("/send", post(handlers::chat::send_message))
        .route("/sessions", get(handlers::chat::list_sessions))
        .route("/session/{token}", get(handlers::chat::get_session))
        .route("/session/{token}/end", post(handlers::chat::end_session))
        .route("/faqs", get(handlers::faq::list_faqs))
        .route("/faqs/categories", get(handlers::faq::list_categories))
        .route("/faqs/{id}", get(handlers::faq::get_faq));

    Router::new()
        .merge(public_routes)
        .nest("/api/chat", chat_routes)
        .layer(CorsLayer::permissive())
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::default().include_headers(false)),
        )
        .with_state(state)
}
