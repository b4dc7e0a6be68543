// src/db/queries/notification.rs
use axum::{
    extract::{Extension, Path, Query, State},
    http::StatusCode,
};
use sqlx::PgPool;
use uuid::Uuid;

use crate::db::models::notification::{Notification, NotificationFilter, NotificationList};
use crate::middleware::auth::CurrentUser;
use crate::utils::api_response::ApiResponse;

/// List the caller's inbox, most recent first, capped at 50 entries.
#[utoipa::path(
    get,
    path = "/notifications",
    params(NotificationFilter),
    responses(
        (status = 200, description = "The caller's notifications", body = NotificationList),
        (status = 500, description = "Failed to retrieve notifications")
    ),
    tag = "Notifications",
    security(("bearerAuth" = []))
)]
pub async fn get_notifications(
    State(pool): State<PgPool>,
    Extension(current_user): Extension<CurrentUser>,
    Query(filter): Query<NotificationFilter>,
) -> Result<ApiResponse<NotificationList>, ApiResponse<()>> {
    let unread_only = filter.unread_only.unwrap_or(false);

    let notifications = sqlx::query_as::<_, Notification>(
        r#"
        SELECT * FROM notifications
        WHERE user_id = $1 AND (NOT $2 OR read = FALSE)
        ORDER BY created_at DESC
        LIMIT 50
        "#,
    )
    .bind(current_user.id)
    .bind(unread_only)
    .fetch_all(&pool)
    .await
    .map_err(|e| ApiResponse::db_error("Failed to retrieve Notifications", e))?;

    let unread_count: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM notifications WHERE user_id = $1 AND read = FALSE",
    )
    .bind(current_user.id)
    .fetch_one(&pool)
    .await
    .map_err(|e| ApiResponse::db_error("Failed to count unread notifications", e))?;

    Ok(ApiResponse::success(
        StatusCode::OK,
        "Notifications retrieved successfully",
        NotificationList {
            notifications,
            unread_count,
        },
    ))
}

/// Mark one notification read. Only the recipient may do this.
#[utoipa::path(
    put,
    path = "/notifications/{id}/read",
    params(
        ("id" = Uuid, Path, description = "Notification ID")
    ),
    responses(
        (status = 200, description = "Notification marked as read"),
        (status = 403, description = "Caller is not the recipient"),
        (status = 404, description = "Notification not found"),
        (status = 500, description = "Failed to update notification")
    ),
    tag = "Notifications",
    security(("bearerAuth" = []))
)]
pub async fn mark_notification_read(
    State(pool): State<PgPool>,
    Extension(current_user): Extension<CurrentUser>,
    Path(id): Path<Uuid>,
) -> Result<ApiResponse<()>, ApiResponse<()>> {
    let recipient: Option<Uuid> =
        sqlx::query_scalar("SELECT user_id FROM notifications WHERE id = $1")
            .bind(id)
            .fetch_optional(&pool)
            .await
            .map_err(|e| ApiResponse::db_error("Failed to retrieve Notification", e))?;

    let Some(recipient) = recipient else {
        return Err(ApiResponse::<()>::error(
            StatusCode::NOT_FOUND,
            "Notification not found",
            None,
        ));
    };
    if recipient != current_user.id {
        return Err(ApiResponse::<()>::error(
            StatusCode::FORBIDDEN,
            "Not authorized",
            None,
        ));
    }

    sqlx::query("UPDATE notifications SET read = TRUE, updated_at = NOW() WHERE id = $1")
        .bind(id)
        .execute(&pool)
        .await
        .map_err(|e| ApiResponse::db_error("Failed to update Notification", e))?;

    Ok(ApiResponse::success(
        StatusCode::OK,
        "Notification marked as read",
        (),
    ))
}

/// Mark every unread notification of the caller read.
#[utoipa::path(
    put,
    path = "/notifications/read-all",
    responses(
        (status = 200, description = "All notifications marked as read"),
        (status = 500, description = "Failed to update notifications")
    ),
    tag = "Notifications",
    security(("bearerAuth" = []))
)]
pub async fn mark_all_notifications_read(
    State(pool): State<PgPool>,
    Extension(current_user): Extension<CurrentUser>,
) -> Result<ApiResponse<()>, ApiResponse<()>> {
    sqlx::query(
        "UPDATE notifications SET read = TRUE, updated_at = NOW() WHERE user_id = $1 AND read = FALSE",
    )
    .bind(current_user.id)
    .execute(&pool)
    .await
    .map_err(|e| ApiResponse::db_error("Failed to update Notifications", e))?;

    Ok(ApiResponse::success(
        StatusCode::OK,
        "All notifications marked as read",
        (),
    ))
}

/// Delete one notification. Only the recipient may do this.
#[utoipa::path(
    delete,
    path = "/notifications/{id}",
    params(
        ("id" = Uuid, Path, description = "Notification ID")
    ),
    responses(
        (status = 200, description = "Notification deleted"),
        (status = 403, description = "Caller is not the recipient"),
        (status = 404, description = "Notification not found"),
        (status = 500, description = "Failed to delete notification")
    ),
    tag = "Notifications",
    security(("bearerAuth" = []))
)]
pub async fn delete_notification(
    State(pool): State<PgPool>,
    Extension(current_user): Extension<CurrentUser>,
    Path(id): Path<Uuid>,
) -> Result<ApiResponse<()>, ApiResponse<()>> {
    let result = sqlx::query("DELETE FROM notifications WHERE id = $1 AND user_id = $2")
        .bind(id)
        .bind(current_user.id)
        .execute(&pool)
        .await
        .map_err(|e| ApiResponse::db_error("Failed to delete Notification", e))?;

    if result.rows_affected() == 0 {
        // Either absent or someone else's inbox
        let exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM notifications WHERE id = $1)",
        )
        .bind(id)
        .fetch_one(&pool)
        .await
        .map_err(|e| ApiResponse::db_error("Failed to check Notification", e))?;
        return Err(if exists {
            ApiResponse::<()>::error(StatusCode::FORBIDDEN, "Not authorized", None)
        } else {
            ApiResponse::<()>::error(StatusCode::NOT_FOUND, "Notification not found", None)
        });
    }

    Ok(ApiResponse::success(
        StatusCode::OK,
        "Notification deleted",
        (),
    ))
}

use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    paths(
        get_notifications,
        mark_notification_read,
        mark_all_notifications_read,
        delete_notification,
    ),
    components(schemas(Notification, NotificationList)),
    tags(
        (name = "Notifications", description = "Per-user notification inbox")
    )
)]
pub struct NotificationDoc;
