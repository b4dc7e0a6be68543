use crate::db::queries::agency::*;
use axum::{routing::get, Router};
use sqlx::PgPool;

pub fn agency_routes() -> Router<PgPool> {
    Router::new()
        .route("/agencies", get(get_all_agencies).post(create_agency))
        .route(
            "/agencies/{id}",
            get(get_agency).put(update_agency).delete(delete_agency),
        )
}
