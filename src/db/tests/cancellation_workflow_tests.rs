//! Cancellation workflow tests against a live PostgreSQL database: the
//! single-stage request/approve flow, its audit snapshot, and the pending
//! guard.

use axum::extract::{Path, State};
use axum::{Extension, Json};
use sqlx::PgPool;
use uuid::Uuid;

use crate::db::models::cancellation::{
    CancellationDecision, CancellationDetail, CancellationReason, CancellationStatus,
    NewCancellation,
};
use crate::db::models::rota::{Rota, RotaStatus};
use crate::db::models::user::UserRole;
use crate::db::queries::cancellation::{
    get_cancellation_history, request_cancellation, respond_to_cancellation,
};
use crate::middleware::auth::CurrentUser;
use crate::utils::api_response::ApiResponse;
use crate::utils::notification::kinds;

use super::support::{data, date, fetch_rota, notification_count, seed_rota, seed_shift, seed_user, test_pool};

struct CancellationFixture {
    pool: PgPool,
    admin: CurrentUser,
    staff: CurrentUser,
    rota: Rota,
    shift_name: String,
}

async fn fixture() -> CancellationFixture {
    let pool = test_pool().await;
    let admin = seed_user(&pool, UserRole::Admin).await;
    let staff = seed_user(&pool, UserRole::Staff).await;
    let shift = seed_shift(&pool, "Night", (23, 0), (7, 0)).await;
    let rota = seed_rota(&pool, &staff, &shift, date("2025-07-14"), &admin).await;
    CancellationFixture { pool, admin, staff, rota, shift_name: shift.name }
}

async fn request(fx: &CancellationFixture, reason: CancellationReason) -> CancellationDetail {
    data(
        request_cancellation(
            State(fx.pool.clone()),
            Extension(fx.staff.clone()),
            Json(NewCancellation {
                rota_id: fx.rota.id,
                reason,
                reason_details: Some("can't make it".into()),
            }),
        )
        .await
        .expect("request should succeed"),
    )
}

async fn respond(
    fx: &CancellationFixture,
    caller: &CurrentUser,
    id: Uuid,
    response: CancellationStatus,
) -> Result<ApiResponse<CancellationDetail>, ApiResponse<()>> {
    respond_to_cancellation(
        State(fx.pool.clone()),
        Extension(caller.clone()),
        Path(id),
        Json(CancellationDecision { response }),
    )
    .await
}

#[tokio::test]
#[ignore]
async fn approval_cancels_the_roster_entry_and_keeps_the_snapshot() {
    let fx = fixture().await;
    let created = request(&fx, CancellationReason::Sick).await;
    assert_eq!(created.cancellation.status, CancellationStatus::Pending);
    assert_eq!(created.cancellation.original_date, fx.rota.date);
    assert_eq!(created.cancellation.original_shift_name.as_deref(), Some(fx.shift_name.as_str()));

    let resolved = data(
        respond(&fx, &fx.admin, created.cancellation.id, CancellationStatus::Approved)
            .await
            .expect("approval should succeed"),
    );
    assert_eq!(resolved.cancellation.status, CancellationStatus::Approved);
    assert_eq!(resolved.cancellation.approved_by, Some(fx.admin.id));
    assert!(resolved.cancellation.approved_at.is_some());

    let rota = fetch_rota(&fx.pool, fx.rota.id).await;
    assert_eq!(rota.status, RotaStatus::Cancelled);
    // The snapshot survives independent of the entry's later state
    assert_eq!(resolved.cancellation.original_date, fx.rota.date);

    assert_eq!(
        notification_count(&fx.pool, fx.staff.id, kinds::CANCELLATION_RESPONSE).await,
        1
    );
}

#[tokio::test]
#[ignore]
async fn rejection_leaves_the_roster_entry_active_and_may_be_reraised() {
    let fx = fixture().await;
    let created = request(&fx, CancellationReason::Personal).await;

    let resolved = data(
        respond(&fx, &fx.admin, created.cancellation.id, CancellationStatus::Rejected)
            .await
            .expect("rejection should succeed"),
    );
    assert_eq!(resolved.cancellation.status, CancellationStatus::Rejected);

    let rota = fetch_rota(&fx.pool, fx.rota.id).await;
    assert_eq!(rota.status, RotaStatus::Active);

    // A rejected request does not block a new one for the same entry
    request(&fx, CancellationReason::Emergency).await;
}

#[tokio::test]
#[ignore]
async fn duplicate_pending_request_is_rejected() {
    let fx = fixture().await;
    request(&fx, CancellationReason::Sick).await;

    let err = request_cancellation(
        State(fx.pool.clone()),
        Extension(fx.staff.clone()),
        Json(NewCancellation {
            rota_id: fx.rota.id,
            reason: CancellationReason::Other,
            reason_details: None,
        }),
    )
    .await
    .expect_err("second pending request must conflict");
    assert_eq!(err.status_code, 409);
}

#[tokio::test]
#[ignore]
async fn only_the_owner_may_request() {
    let fx = fixture().await;
    let other = seed_user(&fx.pool, UserRole::Staff).await;

    let err = request_cancellation(
        State(fx.pool.clone()),
        Extension(other),
        Json(NewCancellation {
            rota_id: fx.rota.id,
            reason: CancellationReason::Sick,
            reason_details: None,
        }),
    )
    .await
    .expect_err("foreign roster entry must be forbidden");
    assert_eq!(err.status_code, 403);
}

#[tokio::test]
#[ignore]
async fn only_an_admin_decides_and_only_once() {
    let fx = fixture().await;
    let created = request(&fx, CancellationReason::Sick).await;

    let err = respond(&fx, &fx.staff, created.cancellation.id, CancellationStatus::Approved)
        .await
        .expect_err("staff caller must be forbidden");
    assert_eq!(err.status_code, 403);

    let err = respond(&fx, &fx.admin, created.cancellation.id, CancellationStatus::Pending)
        .await
        .expect_err("pending is not a decision");
    assert_eq!(err.status_code, 400);

    let err = respond(&fx, &fx.admin, Uuid::new_v4(), CancellationStatus::Approved)
        .await
        .expect_err("unknown id");
    assert_eq!(err.status_code, 404);

    respond(&fx, &fx.admin, created.cancellation.id, CancellationStatus::Approved)
        .await
        .expect("first decision should succeed");

    let err = respond(&fx, &fx.admin, created.cancellation.id, CancellationStatus::Rejected)
        .await
        .expect_err("second decision must conflict");
    assert_eq!(err.status_code, 409);
}

#[tokio::test]
#[ignore]
async fn history_is_scoped_and_tallied() {
    let fx = fixture().await;
    let created = request(&fx, CancellationReason::Sick).await;
    respond(&fx, &fx.admin, created.cancellation.id, CancellationStatus::Rejected)
        .await
        .expect("rejection should succeed");
    let second = request(&fx, CancellationReason::Emergency).await;
    respond(&fx, &fx.admin, second.cancellation.id, CancellationStatus::Approved)
        .await
        .expect("approval should succeed");

    let history = data(
        get_cancellation_history(
            State(fx.pool.clone()),
            Extension(fx.staff.clone()),
            Path(fx.staff.id),
        )
        .await
        .expect("own history should succeed"),
    );
    assert_eq!(history.stats.total, 2);
    assert_eq!(history.stats.approved, 1);
    assert_eq!(history.stats.rejected, 1);
    assert_eq!(history.stats.sick, 1);
    assert_eq!(history.stats.emergency, 1);

    let other = seed_user(&fx.pool, UserRole::Staff).await;
    let err = get_cancellation_history(
        State(fx.pool.clone()),
        Extension(other),
        Path(fx.staff.id),
    )
    .await
    .expect_err("staff may not read a colleague's history");
    assert_eq!(err.status_code, 403);
}
