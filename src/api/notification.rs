// src/api/notification.rs
use crate::db::queries::notification::*;
use axum::{
    routing::{delete, get, put},
    Router,
};
use sqlx::PgPool;

pub fn notification_routes() -> Router<PgPool> {
    Router::new()
        .route("/notifications", get(get_notifications))
        .route("/notifications/read-all", put(mark_all_notifications_read))
        .route("/notifications/{id}/read", put(mark_notification_read))
        .route("/notifications/{id}", delete(delete_notification))
}
