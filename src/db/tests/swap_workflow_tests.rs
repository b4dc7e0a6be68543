//! Swap workflow tests against a live PostgreSQL database. They drive the
//! handlers directly, from proposal through target response to admin
//! decision, and check the roster exchange on the way out.

use axum::extract::{Path, Query, State};
use axum::{Extension, Json};
use sqlx::PgPool;
use uuid::Uuid;

use crate::db::models::rota::Rota;
use crate::db::models::swap::{
    AdminResponse, NewSwapRequest, SwapApprovalPayload, SwapFilter, SwapRequestDetail,
    SwapResponsePayload, SwapStatus, TargetResponse,
};
use crate::db::models::user::UserRole;
use crate::db::queries::swap::{
    approve_swap, cancel_swap, create_swap, get_all_swaps, get_swap, respond_to_swap,
};
use crate::middleware::auth::CurrentUser;
use crate::utils::api_response::ApiResponse;
use crate::utils::notification::kinds;

use super::support::{
    data, date, fetch_rota, notification_count, rota_count_for, seed_rota, seed_shift, seed_user,
    test_pool,
};

struct SwapFixture {
    pool: PgPool,
    admin: CurrentUser,
    requester: CurrentUser,
    target: CurrentUser,
    requester_rota: Rota,
    target_rota: Rota,
}

async fn fixture(requester_date: &str, target_date: &str) -> SwapFixture {
    let pool = test_pool().await;
    let admin = seed_user(&pool, UserRole::Admin).await;
    let requester = seed_user(&pool, UserRole::Staff).await;
    let target = seed_user(&pool, UserRole::Staff).await;
    let early = seed_shift(&pool, "Early", (7, 0), (15, 0)).await;
    let late = seed_shift(&pool, "Late", (15, 0), (23, 0)).await;
    let requester_rota = seed_rota(&pool, &requester, &early, date(requester_date), &admin).await;
    let target_rota = seed_rota(&pool, &target, &late, date(target_date), &admin).await;
    SwapFixture { pool, admin, requester, target, requester_rota, target_rota }
}

async fn propose(fx: &SwapFixture) -> SwapRequestDetail {
    data(
        create_swap(
            State(fx.pool.clone()),
            Extension(fx.requester.clone()),
            Json(NewSwapRequest {
                target_id: fx.target.id,
                requester_rota_id: fx.requester_rota.id,
                target_rota_id: fx.target_rota.id,
                reason: Some("childcare clash".into()),
            }),
        )
        .await
        .expect("create should succeed"),
    )
}

async fn accept(fx: &SwapFixture, id: Uuid) -> SwapRequestDetail {
    data(
        respond_to_swap(
            State(fx.pool.clone()),
            Extension(fx.target.clone()),
            Path(id),
            Json(SwapResponsePayload { response: TargetResponse::Accepted }),
        )
        .await
        .expect("target acceptance should succeed"),
    )
}

async fn decide(
    fx: &SwapFixture,
    caller: &CurrentUser,
    id: Uuid,
    response: AdminResponse,
) -> Result<ApiResponse<SwapRequestDetail>, ApiResponse<()>> {
    approve_swap(
        State(fx.pool.clone()),
        Extension(caller.clone()),
        Path(id),
        Json(SwapApprovalPayload { response }),
    )
    .await
}

#[tokio::test]
#[ignore]
async fn same_date_approval_trades_shifts_only() {
    let fx = fixture("2025-06-02", "2025-06-02").await;
    let created = propose(&fx).await;
    assert_eq!(created.swap.status, SwapStatus::Pending);

    let accepted = accept(&fx, created.swap.id).await;
    assert_eq!(accepted.swap.target_response, TargetResponse::Accepted);
    assert_eq!(accepted.swap.status, SwapStatus::Pending);

    let approved = data(
        decide(&fx, &fx.admin, created.swap.id, AdminResponse::Approved)
            .await
            .expect("approval should succeed"),
    );
    assert_eq!(approved.swap.status, SwapStatus::Approved);
    assert_eq!(approved.swap.admin_response, AdminResponse::Approved);

    let r = fetch_rota(&fx.pool, fx.requester_rota.id).await;
    let t = fetch_rota(&fx.pool, fx.target_rota.id).await;
    assert_eq!(r.date, fx.requester_rota.date);
    assert_eq!(t.date, fx.target_rota.date);
    assert_eq!(r.shift_id, fx.target_rota.shift_id);
    assert_eq!(t.shift_id, fx.requester_rota.shift_id);

    // The exchange mutates in place: nothing created, nothing deleted
    assert_eq!(rota_count_for(&fx.pool, &[fx.requester.id, fx.target.id]).await, 2);
}

#[tokio::test]
#[ignore]
async fn cross_date_approval_trades_dates_and_shifts() {
    let fx = fixture("2025-06-02", "2025-06-05").await;
    let created = propose(&fx).await;
    accept(&fx, created.swap.id).await;
    decide(&fx, &fx.admin, created.swap.id, AdminResponse::Approved)
        .await
        .expect("approval should succeed");

    let r = fetch_rota(&fx.pool, fx.requester_rota.id).await;
    let t = fetch_rota(&fx.pool, fx.target_rota.id).await;
    assert_eq!(r.date, fx.target_rota.date);
    assert_eq!(r.shift_id, fx.target_rota.shift_id);
    assert_eq!(t.date, fx.requester_rota.date);
    assert_eq!(t.shift_id, fx.requester_rota.shift_id);
    assert_eq!(rota_count_for(&fx.pool, &[fx.requester.id, fx.target.id]).await, 2);
}

#[tokio::test]
#[ignore]
async fn create_rejects_roster_entries_with_wrong_owners() {
    let fx = fixture("2025-06-02", "2025-06-03").await;

    // Requester pointing at the target's entry as their own
    let err = create_swap(
        State(fx.pool.clone()),
        Extension(fx.requester.clone()),
        Json(NewSwapRequest {
            target_id: fx.target.id,
            requester_rota_id: fx.target_rota.id,
            target_rota_id: fx.target_rota.id,
            reason: None,
        }),
    )
    .await
    .expect_err("foreign requester rota must be rejected");
    assert_eq!(err.status_code, 400);

    // Target entry that belongs to somebody else
    let stranger = seed_user(&fx.pool, UserRole::Staff).await;
    let err = create_swap(
        State(fx.pool.clone()),
        Extension(fx.requester.clone()),
        Json(NewSwapRequest {
            target_id: stranger.id,
            requester_rota_id: fx.requester_rota.id,
            target_rota_id: fx.target_rota.id,
            reason: None,
        }),
    )
    .await
    .expect_err("mismatched target rota must be rejected");
    assert_eq!(err.status_code, 400);
}

#[tokio::test]
#[ignore]
async fn pending_swap_blocks_a_second_request_until_resolved() {
    let fx = fixture("2025-06-02", "2025-06-03").await;
    let first = propose(&fx).await;

    // A colleague proposing against the same target entry
    let other = seed_user(&fx.pool, UserRole::Staff).await;
    let early = seed_shift(&fx.pool, "Early", (7, 0), (15, 0)).await;
    let other_rota = seed_rota(&fx.pool, &other, &early, date("2025-06-04"), &fx.admin).await;

    let err = create_swap(
        State(fx.pool.clone()),
        Extension(other.clone()),
        Json(NewSwapRequest {
            target_id: fx.target.id,
            requester_rota_id: other_rota.id,
            target_rota_id: fx.target_rota.id,
            reason: None,
        }),
    )
    .await
    .expect_err("entry already on a pending swap must conflict");
    assert_eq!(err.status_code, 409);

    // Resolving the first request frees the entry
    cancel_swap(
        State(fx.pool.clone()),
        Extension(fx.requester.clone()),
        Path(first.swap.id),
    )
    .await
    .expect("requester cancel should succeed");

    create_swap(
        State(fx.pool.clone()),
        Extension(other.clone()),
        Json(NewSwapRequest {
            target_id: fx.target.id,
            requester_rota_id: other_rota.id,
            target_rota_id: fx.target_rota.id,
            reason: None,
        }),
    )
    .await
    .expect("entry freed by cancellation should be swappable again");
}

#[tokio::test]
#[ignore]
async fn only_the_target_may_respond_and_only_once() {
    let fx = fixture("2025-06-02", "2025-06-03").await;
    let created = propose(&fx).await;

    let err = respond_to_swap(
        State(fx.pool.clone()),
        Extension(fx.requester.clone()),
        Path(created.swap.id),
        Json(SwapResponsePayload { response: TargetResponse::Accepted }),
    )
    .await
    .expect_err("requester is not the target");
    assert_eq!(err.status_code, 403);

    let err = respond_to_swap(
        State(fx.pool.clone()),
        Extension(fx.target.clone()),
        Path(Uuid::new_v4()),
        Json(SwapResponsePayload { response: TargetResponse::Accepted }),
    )
    .await
    .expect_err("unknown swap id");
    assert_eq!(err.status_code, 404);

    accept(&fx, created.swap.id).await;

    let err = respond_to_swap(
        State(fx.pool.clone()),
        Extension(fx.target.clone()),
        Path(created.swap.id),
        Json(SwapResponsePayload { response: TargetResponse::Declined }),
    )
    .await
    .expect_err("second answer must conflict");
    assert_eq!(err.status_code, 409);
}

#[tokio::test]
#[ignore]
async fn admin_cannot_decide_before_the_target_accepts() {
    let fx = fixture("2025-06-02", "2025-06-03").await;
    let created = propose(&fx).await;

    let err = decide(&fx, &fx.admin, created.swap.id, AdminResponse::Approved)
        .await
        .expect_err("approval before acceptance must conflict");
    assert_eq!(err.status_code, 409);

    // No roster mutation happened
    let r = fetch_rota(&fx.pool, fx.requester_rota.id).await;
    let t = fetch_rota(&fx.pool, fx.target_rota.id).await;
    assert_eq!(r.shift_id, fx.requester_rota.shift_id);
    assert_eq!(r.date, fx.requester_rota.date);
    assert_eq!(t.shift_id, fx.target_rota.shift_id);
    assert_eq!(t.date, fx.target_rota.date);
}

#[tokio::test]
#[ignore]
async fn declined_swap_is_terminal() {
    let fx = fixture("2025-06-02", "2025-06-03").await;
    let created = propose(&fx).await;

    let declined = data(
        respond_to_swap(
            State(fx.pool.clone()),
            Extension(fx.target.clone()),
            Path(created.swap.id),
            Json(SwapResponsePayload { response: TargetResponse::Declined }),
        )
        .await
        .expect("decline should succeed"),
    );
    assert_eq!(declined.swap.status, SwapStatus::Rejected);
    assert_eq!(declined.swap.target_response, TargetResponse::Declined);

    let err = decide(&fx, &fx.admin, created.swap.id, AdminResponse::Approved)
        .await
        .expect_err("declined swap accepts no admin decision");
    assert_eq!(err.status_code, 409);
}

#[tokio::test]
#[ignore]
async fn admin_rejection_leaves_the_roster_alone() {
    let fx = fixture("2025-06-02", "2025-06-03").await;
    let created = propose(&fx).await;
    accept(&fx, created.swap.id).await;

    let rejected = data(
        decide(&fx, &fx.admin, created.swap.id, AdminResponse::Rejected)
            .await
            .expect("rejection should succeed"),
    );
    assert_eq!(rejected.swap.status, SwapStatus::Rejected);

    let r = fetch_rota(&fx.pool, fx.requester_rota.id).await;
    let t = fetch_rota(&fx.pool, fx.target_rota.id).await;
    assert_eq!(r.shift_id, fx.requester_rota.shift_id);
    assert_eq!(t.shift_id, fx.target_rota.shift_id);
}

#[tokio::test]
#[ignore]
async fn staff_cannot_take_the_admin_decision() {
    let fx = fixture("2025-06-02", "2025-06-03").await;
    let created = propose(&fx).await;
    accept(&fx, created.swap.id).await;

    let err = decide(&fx, &fx.target, created.swap.id, AdminResponse::Approved)
        .await
        .expect_err("staff caller must be forbidden");
    assert_eq!(err.status_code, 403);
}

#[tokio::test]
#[ignore]
async fn concurrent_approvals_perform_exactly_one_exchange() {
    let fx = fixture("2025-06-02", "2025-06-05").await;
    let created = propose(&fx).await;
    accept(&fx, created.swap.id).await;
    let second_admin = seed_user(&fx.pool, UserRole::Admin).await;

    let (a, b) = tokio::join!(
        decide(&fx, &fx.admin, created.swap.id, AdminResponse::Approved),
        decide(&fx, &second_admin, created.swap.id, AdminResponse::Approved),
    );

    let winners = [&a, &b].iter().filter(|r| r.is_ok()).count();
    assert_eq!(winners, 1, "exactly one admin wins the race");
    let loser = if a.is_err() { a.unwrap_err() } else { b.unwrap_err() };
    assert_eq!(loser.status_code, 409);

    // One exchange, not two: a double swap would restore the originals
    let r = fetch_rota(&fx.pool, fx.requester_rota.id).await;
    let t = fetch_rota(&fx.pool, fx.target_rota.id).await;
    assert_eq!(r.date, fx.target_rota.date);
    assert_eq!(r.shift_id, fx.target_rota.shift_id);
    assert_eq!(t.date, fx.requester_rota.date);
    assert_eq!(t.shift_id, fx.requester_rota.shift_id);
}

#[tokio::test]
#[ignore]
async fn cancel_is_requester_only_and_pending_only() {
    let fx = fixture("2025-06-02", "2025-06-03").await;
    let created = propose(&fx).await;

    let err = cancel_swap(
        State(fx.pool.clone()),
        Extension(fx.target.clone()),
        Path(created.swap.id),
    )
    .await
    .expect_err("target may not cancel");
    assert_eq!(err.status_code, 403);

    cancel_swap(
        State(fx.pool.clone()),
        Extension(fx.requester.clone()),
        Path(created.swap.id),
    )
    .await
    .expect("requester cancel should succeed");

    let err = cancel_swap(
        State(fx.pool.clone()),
        Extension(fx.requester.clone()),
        Path(created.swap.id),
    )
    .await
    .expect_err("cancelled swap cannot be cancelled again");
    assert_eq!(err.status_code, 409);

    let err = respond_to_swap(
        State(fx.pool.clone()),
        Extension(fx.target.clone()),
        Path(created.swap.id),
        Json(SwapResponsePayload { response: TargetResponse::Accepted }),
    )
    .await
    .expect_err("cancelled swap accepts no response");
    assert_eq!(err.status_code, 409);

    let detail = data(
        get_swap(
            State(fx.pool.clone()),
            Extension(fx.requester.clone()),
            Path(created.swap.id),
        )
        .await
        .expect("parties can still fetch it"),
    );
    assert_eq!(detail.swap.status, SwapStatus::Cancelled);
}

#[tokio::test]
#[ignore]
async fn listing_is_scoped_to_the_caller() {
    let fx = fixture("2025-06-02", "2025-06-03").await;
    let created = propose(&fx).await;
    let outsider = seed_user(&fx.pool, UserRole::Staff).await;

    let mine = data(
        get_all_swaps(
            State(fx.pool.clone()),
            Extension(fx.requester.clone()),
            Query(SwapFilter::default()),
        )
        .await
        .expect("list should succeed"),
    );
    assert!(mine.iter().any(|d| d.swap.id == created.swap.id));

    let theirs = data(
        get_all_swaps(
            State(fx.pool.clone()),
            Extension(outsider.clone()),
            Query(SwapFilter::default()),
        )
        .await
        .expect("list should succeed"),
    );
    assert!(theirs.iter().all(|d| d.swap.id != created.swap.id));

    let err = get_swap(
        State(fx.pool.clone()),
        Extension(outsider),
        Path(created.swap.id),
    )
    .await
    .expect_err("outsiders cannot fetch a swap they are not party to");
    assert_eq!(err.status_code, 403);

    let all = data(
        get_all_swaps(
            State(fx.pool.clone()),
            Extension(fx.admin.clone()),
            Query(SwapFilter { status: Some(SwapStatus::Pending) }),
        )
        .await
        .expect("admin list should succeed"),
    );
    assert!(all.iter().any(|d| d.swap.id == created.swap.id));
}

#[tokio::test]
#[ignore]
async fn workflow_notifies_the_right_people_at_each_step() {
    let fx = fixture("2025-06-02", "2025-06-03").await;
    let created = propose(&fx).await;
    assert_eq!(notification_count(&fx.pool, fx.target.id, kinds::SWAP_REQUEST).await, 1);

    accept(&fx, created.swap.id).await;
    assert_eq!(notification_count(&fx.pool, fx.requester.id, kinds::SWAP_RESPONSE).await, 1);
    // Admin broadcast: other concurrently-running tests also fan out to every
    // admin, so only a lower bound is stable here.
    assert!(notification_count(&fx.pool, fx.admin.id, kinds::SWAP_APPROVAL_NEEDED).await >= 1);

    decide(&fx, &fx.admin, created.swap.id, AdminResponse::Approved)
        .await
        .expect("approval should succeed");
    assert_eq!(notification_count(&fx.pool, fx.requester.id, kinds::SWAP_FINAL).await, 1);
    assert_eq!(notification_count(&fx.pool, fx.target.id, kinds::SWAP_FINAL).await, 1);
}
