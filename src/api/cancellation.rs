use crate::db::queries::cancellation::*;
use axum::{
    routing::{get, put},
    Router,
};
use sqlx::PgPool;

pub fn cancellation_routes() -> Router<PgPool> {
    Router::new()
        .route(
            "/cancellations",
            get(get_all_cancellations).post(request_cancellation),
        )
        .route("/cancellations/history/{user_id}", get(get_cancellation_history))
        .route("/cancellations/{id}/respond", put(respond_to_cancellation))
}
