use serde_json::Value;
use sqlx::PgPool;
use uuid::Uuid;

/// Result type for notification operations
pub type NotificationResult<T> = Result<T, NotificationError>;

/// Errors that can occur in notification operations
#[derive(Debug, thiserror::Error)]
pub enum NotificationError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Notification kinds emitted by the workflow engines
pub mod kinds {
    pub const SWAP_REQUEST: &str = "swap_request";
    pub const SWAP_RESPONSE: &str = "swap_response";
    pub const SWAP_APPROVAL_NEEDED: &str = "swap_approval_needed";
    pub const SWAP_FINAL: &str = "swap_final";
    pub const CANCELLATION_REQUEST: &str = "cancellation_request";
    pub const CANCELLATION_RESPONSE: &str = "cancellation_response";
    pub const GENERAL: &str = "general";
}

/// Append one notification to a user's inbox. Fire-and-forget from the
/// workflow engines' point of view: callers log failures instead of
/// propagating them, so a dead notification never rolls back the business
/// write that triggered it.
pub async fn notify(
    pool: &PgPool,
    user_id: Uuid,
    title: &str,
    message: &str,
    kind: &str,
    data: Option<Value>,
) -> NotificationResult<Uuid> {
    let id: Uuid = sqlx::query_scalar(
        r#"
        INSERT INTO notifications (user_id, title, message, kind, data)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING id
        "#,
    )
    .bind(user_id)
    .bind(title)
    .bind(message)
    .bind(kind)
    .bind(data)
    .fetch_one(pool)
    .await?;

    Ok(id)
}

/// Utility to get admins
pub async fn get_admin_user_ids(pool: &PgPool) -> Result<Vec<Uuid>, sqlx::Error> {
    sqlx::query_scalar("SELECT id FROM users WHERE role = 'admin'")
        .fetch_all(pool)
        .await
}

/// Broadcast one message to every admin. The recipient list is computed from
/// the current admin set at call time; there is no persistent subscription.
pub async fn notify_admins(
    pool: &PgPool,
    title: &str,
    message: &str,
    kind: &str,
    data: Option<Value>,
) -> NotificationResult<usize> {
    let admins = get_admin_user_ids(pool).await?;
    let count = admins.len();
    for admin_id in admins {
        notify(pool, admin_id, title, message, kind, data.clone()).await?;
    }
    Ok(count)
}
