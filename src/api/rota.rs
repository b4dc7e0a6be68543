use crate::db::queries::rota::*;
use axum::{
    routing::{get, post, put},
    Router,
};
use sqlx::PgPool;

pub fn rota_routes() -> Router<PgPool> {
    Router::new()
        // `/rotas/my` and `/rotas/team` must be registered before `/rotas/{id}`
        .route("/rotas/my", get(get_my_rota))
        .route("/rotas/team", get(get_team_rota))
        .route("/rotas", get(get_all_rotas).post(create_rota))
        .route("/rotas/bulk", post(create_bulk_rotas))
        .route(
            "/rotas/{id}",
            get(get_rota).put(update_rota).delete(delete_rota),
        )
        .route("/rotas/{id}/cancel", put(cancel_rota))
        .route("/rotas/{id}/restore", put(restore_rota))
}
