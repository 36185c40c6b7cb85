mod dto;
pub mod handlers;
pub mod repo;
pub mod services;

use crate::state::AppState;
use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post, put},
    Router,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/create", post(handlers::create_product))
        .route("/all-products", get(handlers::get_products))
        .route(
            "/:id",
            get(handlers::get_product).delete(handlers::delete_product),
        )
        .route("/:id/image", get(handlers::get_product_image))
        .route("/update/:id", put(handlers::update_product))
        .layer(DefaultBodyLimit::max(20 * 1024 * 1024)) // 20MB uploads
}
