mod dto;
pub mod handlers;
pub mod repo;
pub mod services;

use crate::state::AppState;
use axum::{
    routing::{get, patch, post, put},
    Router,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/register", post(handlers::register))
        .route("/login", post(handlers::login))
        .route("/logout", post(handlers::logout))
        .route("/loggedin", get(handlers::logged_in))
        .route(
            "/profile",
            get(handlers::get_profile)
                .patch(handlers::update_profile)
                .put(handlers::update_profile),
        )
        .route("/password", patch(handlers::change_password))
        .route("/forgot-password", post(handlers::forgot_password))
        .route("/reset-password/:reset_token", put(handlers::reset_password))
}
