use axum::{
    Router,
    middleware::from_fn_with_state,
    routing::{get, post},
};
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::middleware::require_auth;
use crate::state::AppState;

pub fn router(state: AppState) -> Router {
    let protected = Router::new()
        .route("/me", get(handlers::me))
        .route_layer(from_fn_with_state(state.clone(), require_auth));

    let auth = Router::new()
        .route("/login", post(handlers::login))
        .route("/refresh-token", post(handlers::refresh))
        .route("/register", post(handlers::register))
        .route("/confirm-email", get(handlers::confirm_email))
        .route("/forgot-password", post(handlers::forgot_password))
        .route("/reset-password", post(handlers::reset_password))
        .route("/change-password", post(handlers::change_password))
        .merge(protected);

    Router::new()
        .nest("/api/auth", auth)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
