use crate::db::queries::swap::*;
use axum::{
    routing::{get, put},
    Router,
};
use sqlx::PgPool;

pub fn swap_routes() -> Router<PgPool> {
    Router::new()
        .route("/swaps", get(get_all_swaps).post(create_swap))
        .route("/swaps/{id}", get(get_swap))
        .route("/swaps/{id}/respond", put(respond_to_swap))
        .route("/swaps/{id}/approve", put(approve_swap))
        .route("/swaps/{id}/cancel", put(cancel_swap))
}
