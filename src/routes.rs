use std::sync::Arc;

use axum::{
    http::StatusCode, middleware, response::IntoResponse, routing::get, Extension, Json, Router,
};
use tower_http::trace::TraceLayer;

use crate::{
    handler::{bookings::bookings_handler, chat::chat_handler},
    AppState,
};

pub fn create_router(app_state: Arc<AppState>) -> Router {
    let api_route = Router::new()
        .nest("/bookings", bookings_handler())
        .nest("/chat", chat_handler())
        .layer(middleware::from_fn(crate::middleware::auth))
        .route("/healthcheck", get(health_check));

    Router::new()
        .nest("/api", api_route)
        .layer(TraceLayer::new_for_http())
        .layer(Extension(app_state))
}

pub async fn health_check() -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(serde_json::json!({"status": "success"})),
    )
}
