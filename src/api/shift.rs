use crate::db::queries::shift::*;
use axum::{routing::get, Router};
use sqlx::PgPool;

pub fn shift_routes() -> Router<PgPool> {
    Router::new()
        .route("/shifts", get(get_all_shifts).post(create_shift))
        .route(
            "/shifts/{id}",
            get(get_shift).put(update_shift).delete(delete_shift),
        )
}
