//! Swap workflow engine: a three-stage state machine (requester proposes,
//! target accepts or declines, admin approves or rejects) whose approval leg
//! exchanges two roster entries inside a single transaction.

use axum::{
    extract::{Extension, Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde_json::json;
use sqlx::{FromRow, PgPool, Postgres, QueryBuilder, Transaction};
use tracing::warn;
use uuid::Uuid;

use crate::db::models::rota::{Rota, RotaStatus};
use crate::db::models::shift::Shift;
use crate::db::models::swap::{
    plan_exchange, AdminResponse, NewSwapRequest, RotaSlot, SwapApprovalPayload, SwapFilter,
    SwapRequest, SwapRequestDetail, SwapResponsePayload, SwapRotaDetail, SwapStatus,
    TargetResponse,
};
use crate::db::models::user::UserBrief;
use crate::middleware::auth::CurrentUser;
use crate::utils::api_response::ApiResponse;
use crate::utils::notification::{self, kinds};

#[derive(FromRow)]
struct SwapDetailRow {
    id: Uuid,
    requester_id: Uuid,
    target_id: Uuid,
    requester_rota_id: Uuid,
    target_rota_id: Uuid,
    status: SwapStatus,
    target_response: TargetResponse,
    admin_response: AdminResponse,
    reason: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    requester_name: String,
    requester_email: String,
    target_name: String,
    target_email: String,
    rr_user_id: Option<Uuid>,
    rr_agency_id: Option<Uuid>,
    rr_shift_id: Uuid,
    rr_date: NaiveDate,
    rr_notes: Option<String>,
    rr_status: RotaStatus,
    rr_created_by: Uuid,
    rr_created_at: DateTime<Utc>,
    rr_updated_at: DateTime<Utc>,
    rrs_name: String,
    rrs_start_time: NaiveTime,
    rrs_end_time: NaiveTime,
    rrs_color: String,
    rrs_created_at: DateTime<Utc>,
    rrs_updated_at: DateTime<Utc>,
    tr_user_id: Option<Uuid>,
    tr_agency_id: Option<Uuid>,
    tr_shift_id: Uuid,
    tr_date: NaiveDate,
    tr_notes: Option<String>,
    tr_status: RotaStatus,
    tr_created_by: Uuid,
    tr_created_at: DateTime<Utc>,
    tr_updated_at: DateTime<Utc>,
    trs_name: String,
    trs_start_time: NaiveTime,
    trs_end_time: NaiveTime,
    trs_color: String,
    trs_created_at: DateTime<Utc>,
    trs_updated_at: DateTime<Utc>,
}

impl SwapDetailRow {
    fn into_detail(self) -> SwapRequestDetail {
        SwapRequestDetail {
            swap: SwapRequest {
                id: self.id,
                requester_id: self.requester_id,
                target_id: self.target_id,
                requester_rota_id: self.requester_rota_id,
                target_rota_id: self.target_rota_id,
                status: self.status,
                target_response: self.target_response,
                admin_response: self.admin_response,
                reason: self.reason,
                created_at: self.created_at,
                updated_at: self.updated_at,
            },
            requester: UserBrief {
                id: self.requester_id,
                name: self.requester_name,
                email: self.requester_email,
            },
            target: UserBrief {
                id: self.target_id,
                name: self.target_name,
                email: self.target_email,
            },
            requester_rota: SwapRotaDetail {
                rota: Rota {
                    id: self.requester_rota_id,
                    user_id: self.rr_user_id,
                    agency_id: self.rr_agency_id,
                    shift_id: self.rr_shift_id,
                    date: self.rr_date,
                    notes: self.rr_notes,
                    status: self.rr_status,
                    created_by: self.rr_created_by,
                    created_at: self.rr_created_at,
                    updated_at: self.rr_updated_at,
                },
                shift: Shift {
                    id: self.rr_shift_id,
                    name: self.rrs_name,
                    start_time: self.rrs_start_time,
                    end_time: self.rrs_end_time,
                    color: self.rrs_color,
                    created_at: self.rrs_created_at,
                    updated_at: self.rrs_updated_at,
                },
            },
            target_rota: SwapRotaDetail {
                rota: Rota {
                    id: self.target_rota_id,
                    user_id: self.tr_user_id,
                    agency_id: self.tr_agency_id,
                    shift_id: self.tr_shift_id,
                    date: self.tr_date,
                    notes: self.tr_notes,
                    status: self.tr_status,
                    created_by: self.tr_created_by,
                    created_at: self.tr_created_at,
                    updated_at: self.tr_updated_at,
                },
                shift: Shift {
                    id: self.tr_shift_id,
                    name: self.trs_name,
                    start_time: self.trs_start_time,
                    end_time: self.trs_end_time,
                    color: self.trs_color,
                    created_at: self.trs_created_at,
                    updated_at: self.trs_updated_at,
                },
            },
        }
    }
}

const SWAP_DETAIL_SELECT: &str = r#"
SELECT sw.id, sw.requester_id, sw.target_id, sw.requester_rota_id, sw.target_rota_id,
       sw.status, sw.target_response, sw.admin_response, sw.reason,
       sw.created_at, sw.updated_at,
       req.name AS requester_name, req.email AS requester_email,
       tgt.name AS target_name, tgt.email AS target_email,
       rr.user_id AS rr_user_id, rr.agency_id AS rr_agency_id,
       rr.shift_id AS rr_shift_id, rr.date AS rr_date, rr.notes AS rr_notes,
       rr.status AS rr_status, rr.created_by AS rr_created_by,
       rr.created_at AS rr_created_at, rr.updated_at AS rr_updated_at,
       rrs.name AS rrs_name, rrs.start_time AS rrs_start_time,
       rrs.end_time AS rrs_end_time, rrs.color AS rrs_color,
       rrs.created_at AS rrs_created_at, rrs.updated_at AS rrs_updated_at,
       tr.user_id AS tr_user_id, tr.agency_id AS tr_agency_id,
       tr.shift_id AS tr_shift_id, tr.date AS tr_date, tr.notes AS tr_notes,
       tr.status AS tr_status, tr.created_by AS tr_created_by,
       tr.created_at AS tr_created_at, tr.updated_at AS tr_updated_at,
       trs.name AS trs_name, trs.start_time AS trs_start_time,
       trs.end_time AS trs_end_time, trs.color AS trs_color,
       trs.created_at AS trs_created_at, trs.updated_at AS trs_updated_at
FROM swap_requests sw
JOIN users req ON req.id = sw.requester_id
JOIN users tgt ON tgt.id = sw.target_id
JOIN rotas rr ON rr.id = sw.requester_rota_id
JOIN shifts rrs ON rrs.id = rr.shift_id
JOIN rotas tr ON tr.id = sw.target_rota_id
JOIN shifts trs ON trs.id = tr.shift_id
"#;

async fn fetch_swap_detail(
    pool: &PgPool,
    id: Uuid,
) -> Result<Option<SwapRequestDetail>, sqlx::Error> {
    let row = sqlx::query_as::<_, SwapDetailRow>(&format!("{SWAP_DETAIL_SELECT} WHERE sw.id = $1"))
        .bind(id)
        .fetch_optional(pool)
        .await?;
    Ok(row.map(SwapDetailRow::into_detail))
}

async fn fetch_swap(pool: &PgPool, id: Uuid) -> Result<Option<SwapRequest>, sqlx::Error> {
    sqlx::query_as::<_, SwapRequest>("SELECT * FROM swap_requests WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await
}

/// Admin sees every swap request, staff sees those they sent or received.
#[utoipa::path(
    get,
    path = "/swaps",
    params(SwapFilter),
    responses(
        (status = 200, description = "Swap requests", body = [SwapRequestDetail]),
        (status = 500, description = "Failed to retrieve swap requests")
    ),
    tag = "Swaps",
    security(("bearerAuth" = []))
)]
pub async fn get_all_swaps(
    State(pool): State<PgPool>,
    Extension(current_user): Extension<CurrentUser>,
    Query(filter): Query<SwapFilter>,
) -> Result<ApiResponse<Vec<SwapRequestDetail>>, ApiResponse<()>> {
    let mut query_builder = QueryBuilder::new(SWAP_DETAIL_SELECT);
    query_builder.push(" WHERE TRUE");
    if let Some(status) = filter.status {
        query_builder.push(" AND sw.status = ").push_bind(status);
    }
    if !current_user.is_admin() {
        query_builder
            .push(" AND (sw.requester_id = ")
            .push_bind(current_user.id)
            .push(" OR sw.target_id = ")
            .push_bind(current_user.id)
            .push(")");
    }
    query_builder.push(" ORDER BY sw.created_at DESC");

    let rows = query_builder
        .build_query_as::<SwapDetailRow>()
        .fetch_all(&pool)
        .await
        .map_err(|e| ApiResponse::db_error("Failed to retrieve swap requests", e))?;

    Ok(ApiResponse::success(
        StatusCode::OK,
        "Swap requests retrieved successfully",
        rows.into_iter().map(SwapDetailRow::into_detail).collect(),
    ))
}

#[utoipa::path(
    get,
    path = "/swaps/{id}",
    params(
        ("id" = Uuid, Path, description = "Swap request ID")
    ),
    responses(
        (status = 200, description = "Swap request", body = SwapRequestDetail),
        (status = 403, description = "Caller is not a party to this swap"),
        (status = 404, description = "Swap request not found"),
        (status = 500, description = "Failed to retrieve swap request")
    ),
    tag = "Swaps",
    security(("bearerAuth" = []))
)]
pub async fn get_swap(
    State(pool): State<PgPool>,
    Extension(current_user): Extension<CurrentUser>,
    Path(id): Path<Uuid>,
) -> Result<ApiResponse<SwapRequestDetail>, ApiResponse<()>> {
    let detail = fetch_swap_detail(&pool, id)
        .await
        .map_err(|e| ApiResponse::db_error("Failed to retrieve swap request", e))?
        .ok_or_else(|| {
            ApiResponse::<()>::error(StatusCode::NOT_FOUND, "Swap request not found", None)
        })?;

    if !current_user.is_admin()
        && detail.swap.requester_id != current_user.id
        && detail.swap.target_id != current_user.id
    {
        return Err(ApiResponse::<()>::error(
            StatusCode::FORBIDDEN,
            "Not authorized",
            None,
        ));
    }

    Ok(ApiResponse::success(
        StatusCode::OK,
        "Swap request retrieved successfully",
        detail,
    ))
}

/// Staff proposes to exchange one of their roster entries with a colleague's.
///
/// Preconditions: the requester owns `requester_rota_id`, the named target
/// owns `target_rota_id`, and neither entry is already on a pending swap.
#[utoipa::path(
    post,
    path = "/swaps",
    request_body = NewSwapRequest,
    responses(
        (status = 201, description = "Swap request created", body = SwapRequestDetail),
        (status = 400, description = "A referenced roster entry is invalid"),
        (status = 409, description = "One of these shifts already has a pending swap request"),
        (status = 500, description = "Failed to create swap request")
    ),
    tag = "Swaps",
    security(("bearerAuth" = []))
)]
pub async fn create_swap(
    State(pool): State<PgPool>,
    Extension(current_user): Extension<CurrentUser>,
    Json(payload): Json<NewSwapRequest>,
) -> Result<ApiResponse<SwapRequestDetail>, ApiResponse<()>> {
    // Verify the requester owns the requester rota
    let requester_rota = sqlx::query_as::<_, Rota>("SELECT * FROM rotas WHERE id = $1")
        .bind(payload.requester_rota_id)
        .fetch_optional(&pool)
        .await
        .map_err(|e| ApiResponse::db_error("Failed to retrieve roster entry", e))?;
    if requester_rota.map(|r| r.user_id) != Some(Some(current_user.id)) {
        return Err(ApiResponse::<()>::error(
            StatusCode::BAD_REQUEST,
            "Invalid requester rota",
            None,
        ));
    }

    // Verify the target owns the target rota
    let target_rota = sqlx::query_as::<_, Rota>("SELECT * FROM rotas WHERE id = $1")
        .bind(payload.target_rota_id)
        .fetch_optional(&pool)
        .await
        .map_err(|e| ApiResponse::db_error("Failed to retrieve roster entry", e))?;
    if target_rota.map(|r| r.user_id) != Some(Some(payload.target_id)) {
        return Err(ApiResponse::<()>::error(
            StatusCode::BAD_REQUEST,
            "Invalid target rota",
            None,
        ));
    }

    let mut tx = pool
        .begin()
        .await
        .map_err(|e| ApiResponse::db_error("Failed to start transaction", e))?;

    // Row locks on both entries serialize concurrent creates referencing
    // them, so the pending check below cannot race another insert.
    sqlx::query("SELECT id FROM rotas WHERE id IN ($1, $2) FOR UPDATE")
        .bind(payload.requester_rota_id)
        .bind(payload.target_rota_id)
        .execute(&mut *tx)
        .await
        .map_err(|e| ApiResponse::db_error("Failed to lock roster entries", e))?;

    let pending_exists = sqlx::query_scalar::<_, bool>(
        r#"
        SELECT EXISTS(
            SELECT 1 FROM swap_requests
            WHERE status = 'pending'
              AND (requester_rota_id IN ($1, $2) OR target_rota_id IN ($1, $2))
        )
        "#,
    )
    .bind(payload.requester_rota_id)
    .bind(payload.target_rota_id)
    .fetch_one(&mut *tx)
    .await
    .map_err(|e| ApiResponse::db_error("Failed to check pending swaps", e))?;

    if pending_exists {
        return Err(ApiResponse::<()>::error(
            StatusCode::CONFLICT,
            "One of these shifts already has a pending swap request",
            None,
        ));
    }

    let created = sqlx::query_as::<_, SwapRequest>(
        r#"
        INSERT INTO swap_requests (requester_id, target_id, requester_rota_id, target_rota_id, reason)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING *
        "#,
    )
    .bind(current_user.id)
    .bind(payload.target_id)
    .bind(payload.requester_rota_id)
    .bind(payload.target_rota_id)
    .bind(&payload.reason)
    .fetch_one(&mut *tx)
    .await
    .map_err(|e| {
        if let Some(db_err) = e.as_database_error() {
            if db_err.code().map(|code| code == "23505").unwrap_or(false) {
                return ApiResponse::<()>::error(
                    StatusCode::CONFLICT,
                    "One of these shifts already has a pending swap request",
                    None,
                );
            }
        }
        ApiResponse::db_error("Failed to create swap request", e)
    })?;

    tx.commit()
        .await
        .map_err(|e| ApiResponse::db_error("Failed to commit transaction", e))?;

    if let Err(e) = notification::notify(
        &pool,
        payload.target_id,
        "New Swap Request",
        &format!("{} wants to swap shifts with you", current_user.name),
        kinds::SWAP_REQUEST,
        Some(json!({ "swapRequestId": created.id })),
    )
    .await
    {
        warn!("Failed to notify swap target: {e}");
    }

    let detail = fetch_swap_detail(&pool, created.id)
        .await
        .map_err(|e| ApiResponse::db_error("Failed to load swap request", e))?
        .ok_or_else(|| {
            ApiResponse::<()>::error(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Created swap request vanished",
                None,
            )
        })?;

    Ok(ApiResponse::success(
        StatusCode::CREATED,
        "Swap request created successfully",
        detail,
    ))
}

/// The target accepts or declines. Declining ends the workflow; accepting
/// hands it to the admins.
#[utoipa::path(
    put,
    path = "/swaps/{id}/respond",
    request_body = SwapResponsePayload,
    params(
        ("id" = Uuid, Path, description = "Swap request ID")
    ),
    responses(
        (status = 200, description = "Response recorded", body = SwapRequestDetail),
        (status = 400, description = "Response must be accepted or declined"),
        (status = 403, description = "Only the target can respond"),
        (status = 404, description = "Swap request not found"),
        (status = 409, description = "Already responded"),
        (status = 500, description = "Failed to update swap request")
    ),
    tag = "Swaps",
    security(("bearerAuth" = []))
)]
pub async fn respond_to_swap(
    State(pool): State<PgPool>,
    Extension(current_user): Extension<CurrentUser>,
    Path(id): Path<Uuid>,
    Json(payload): Json<SwapResponsePayload>,
) -> Result<ApiResponse<SwapRequestDetail>, ApiResponse<()>> {
    if payload.response == TargetResponse::Pending {
        return Err(ApiResponse::<()>::error(
            StatusCode::BAD_REQUEST,
            "Response must be accepted or declined",
            None,
        ));
    }

    let swap = fetch_swap(&pool, id)
        .await
        .map_err(|e| ApiResponse::db_error("Failed to retrieve swap request", e))?
        .ok_or_else(|| {
            ApiResponse::<()>::error(StatusCode::NOT_FOUND, "Swap request not found", None)
        })?;

    // Only target can respond
    if swap.target_id != current_user.id {
        return Err(ApiResponse::<()>::error(
            StatusCode::FORBIDDEN,
            "Only the target can respond",
            None,
        ));
    }

    let new_status = SwapStatus::derive(payload.response, AdminResponse::Pending, false);

    // The pending guard and the transition are a single statement, so a
    // double answer (or an answer racing a cancel) loses cleanly.
    let updated = sqlx::query_as::<_, SwapRequest>(
        r#"
        UPDATE swap_requests
        SET target_response = $1, status = $2, updated_at = NOW()
        WHERE id = $3 AND target_response = 'pending' AND status = 'pending'
        RETURNING *
        "#,
    )
    .bind(payload.response)
    .bind(new_status)
    .bind(id)
    .fetch_optional(&pool)
    .await
    .map_err(|e| ApiResponse::db_error("Failed to update swap request", e))?;

    if updated.is_none() {
        return Err(ApiResponse::<()>::error(
            StatusCode::CONFLICT,
            "Already responded",
            None,
        ));
    }

    let status_text = if payload.response == TargetResponse::Accepted {
        "accepted"
    } else {
        "declined"
    };

    if let Err(e) = notification::notify(
        &pool,
        swap.requester_id,
        "Swap Response",
        &format!("{} has {} your swap request", current_user.name, status_text),
        kinds::SWAP_RESPONSE,
        Some(json!({ "swapRequestId": id })),
    )
    .await
    {
        warn!("Failed to notify swap requester: {e}");
    }

    // Acceptance pulls every current admin into the loop
    if payload.response == TargetResponse::Accepted {
        if let Err(e) = notification::notify_admins(
            &pool,
            "Swap Awaiting Approval",
            "A swap request needs your approval",
            kinds::SWAP_APPROVAL_NEEDED,
            Some(json!({ "swapRequestId": id })),
        )
        .await
        {
            warn!("Failed to notify admins of accepted swap: {e}");
        }
    }

    let detail = fetch_swap_detail(&pool, id)
        .await
        .map_err(|e| ApiResponse::db_error("Failed to load swap request", e))?
        .ok_or_else(|| {
            ApiResponse::<()>::error(StatusCode::NOT_FOUND, "Swap request not found", None)
        })?;

    Ok(ApiResponse::success(
        StatusCode::OK,
        format!("Swap request {status_text}"),
        detail,
    ))
}

/// Admin approves or rejects an accepted swap. Approval performs the atomic
/// exchange: the guarded state transition and both roster writes commit or
/// roll back together, and the two-row write is one bulk statement so no
/// half-swapped state is ever visible.
#[utoipa::path(
    put,
    path = "/swaps/{id}/approve",
    request_body = SwapApprovalPayload,
    params(
        ("id" = Uuid, Path, description = "Swap request ID")
    ),
    responses(
        (status = 200, description = "Swap resolved", body = SwapRequestDetail),
        (status = 400, description = "Response must be approved or rejected"),
        (status = 403, description = "Caller is not an admin"),
        (status = 404, description = "Swap request not found"),
        (status = 409, description = "Target has not accepted or already processed"),
        (status = 500, description = "Exchange failed and was rolled back")
    ),
    tag = "Swaps",
    security(("bearerAuth" = []))
)]
pub async fn approve_swap(
    State(pool): State<PgPool>,
    Extension(current_user): Extension<CurrentUser>,
    Path(id): Path<Uuid>,
    Json(payload): Json<SwapApprovalPayload>,
) -> Result<ApiResponse<SwapRequestDetail>, ApiResponse<()>> {
    if !current_user.is_admin() {
        return Err(ApiResponse::<()>::error(
            StatusCode::FORBIDDEN,
            "Admin role required",
            None,
        ));
    }

    if payload.response == AdminResponse::Pending {
        return Err(ApiResponse::<()>::error(
            StatusCode::BAD_REQUEST,
            "Response must be approved or rejected",
            None,
        ));
    }

    let new_status = SwapStatus::derive(TargetResponse::Accepted, payload.response, false);

    let mut tx = pool
        .begin()
        .await
        .map_err(|e| ApiResponse::db_error("Failed to start transaction", e))?;

    // Precondition check and transition are one guarded statement: of two
    // racing admins exactly one sees a row here, the other gets Conflict.
    let updated = sqlx::query_as::<_, SwapRequest>(
        r#"
        UPDATE swap_requests
        SET admin_response = $1, status = $2, updated_at = NOW()
        WHERE id = $3
          AND target_response = 'accepted'
          AND admin_response = 'pending'
          AND status <> 'cancelled'
        RETURNING *
        "#,
    )
    .bind(payload.response)
    .bind(new_status)
    .bind(id)
    .fetch_optional(&mut *tx)
    .await
    .map_err(|e| ApiResponse::db_error("Failed to update swap request", e))?;

    let Some(updated) = updated else {
        drop(tx);
        let swap = fetch_swap(&pool, id)
            .await
            .map_err(|e| ApiResponse::db_error("Failed to retrieve swap request", e))?
            .ok_or_else(|| {
                ApiResponse::<()>::error(StatusCode::NOT_FOUND, "Swap request not found", None)
            })?;
        let message = if swap.target_response != TargetResponse::Accepted {
            "Target must accept first"
        } else {
            "Already processed"
        };
        return Err(ApiResponse::<()>::error(StatusCode::CONFLICT, message, None));
    };

    if payload.response == AdminResponse::Approved {
        if let Err(resp) = execute_exchange(&mut tx, &updated).await {
            // The transaction is dropped here, rolling back the admin_response
            // write along with any partial roster state.
            return Err(resp);
        }
    }

    tx.commit().await.map_err(|e| {
        ApiResponse::<()>::error(
            StatusCode::INTERNAL_SERVER_ERROR,
            "Swap approval failed and was rolled back",
            Some(json!({ "db_error": e.to_string() })),
        )
    })?;

    let status_text = if payload.response == AdminResponse::Approved {
        "approved"
    } else {
        "rejected"
    };
    let title = if payload.response == AdminResponse::Approved {
        "Swap Approved"
    } else {
        "Swap Rejected"
    };

    // Best-effort: the exchange is already committed
    if let Err(e) = notification::notify(
        &pool,
        updated.requester_id,
        title,
        &format!("Your swap request has been {status_text} by admin"),
        kinds::SWAP_FINAL,
        Some(json!({ "swapRequestId": id })),
    )
    .await
    {
        warn!("Failed to notify swap requester: {e}");
    }
    if let Err(e) = notification::notify(
        &pool,
        updated.target_id,
        title,
        &format!("The swap request has been {status_text} by admin"),
        kinds::SWAP_FINAL,
        Some(json!({ "swapRequestId": id })),
    )
    .await
    {
        warn!("Failed to notify swap target: {e}");
    }

    let detail = fetch_swap_detail(&pool, id)
        .await
        .map_err(|e| ApiResponse::db_error("Failed to load swap request", e))?
        .ok_or_else(|| {
            ApiResponse::<()>::error(StatusCode::NOT_FOUND, "Swap request not found", None)
        })?;

    Ok(ApiResponse::success(
        StatusCode::OK,
        format!("Swap request {status_text}"),
        detail,
    ))
}

/// The atomic exchange. Locks both entries, computes their post-swap slots
/// (same date: trade shifts; different dates: trade date + shift), then
/// writes both rows with one bulk UPDATE so the per-user-per-date uniqueness
/// invariant never sees an intermediate state.
async fn execute_exchange(
    tx: &mut Transaction<'_, Postgres>,
    swap: &SwapRequest,
) -> Result<(), ApiResponse<()>> {
    let rotas = sqlx::query_as::<_, Rota>(
        "SELECT * FROM rotas WHERE id IN ($1, $2) FOR UPDATE",
    )
    .bind(swap.requester_rota_id)
    .bind(swap.target_rota_id)
    .fetch_all(&mut **tx)
    .await
    .map_err(|e| ApiResponse::db_error("Failed to lock roster entries", e))?;

    let requester_rota = rotas.iter().find(|r| r.id == swap.requester_rota_id);
    let target_rota = rotas.iter().find(|r| r.id == swap.target_rota_id);
    let (Some(requester_rota), Some(target_rota)) = (requester_rota, target_rota) else {
        return Err(ApiResponse::<()>::error(
            StatusCode::INTERNAL_SERVER_ERROR,
            "Roster entries for this swap no longer exist",
            None,
        ));
    };

    let (new_requester, new_target) =
        plan_exchange(RotaSlot::of(requester_rota), RotaSlot::of(target_rota));

    let result = sqlx::query(
        r#"
        UPDATE rotas
        SET date = CASE id WHEN $1 THEN $3 WHEN $2 THEN $5 END,
            shift_id = CASE id WHEN $1 THEN $4 WHEN $2 THEN $6 END,
            updated_at = NOW()
        WHERE id IN ($1, $2)
        "#,
    )
    .bind(swap.requester_rota_id)
    .bind(swap.target_rota_id)
    .bind(new_requester.date)
    .bind(new_requester.shift_id)
    .bind(new_target.date)
    .bind(new_target.shift_id)
    .execute(&mut **tx)
    .await
    .map_err(|e| {
        ApiResponse::<()>::error(
            StatusCode::INTERNAL_SERVER_ERROR,
            "Exchange failed and was rolled back",
            Some(json!({ "db_error": e.to_string() })),
        )
    })?;

    if result.rows_affected() != 2 {
        return Err(ApiResponse::<()>::error(
            StatusCode::INTERNAL_SERVER_ERROR,
            "Exchange failed and was rolled back",
            Some(json!({ "rows_affected": result.rows_affected() })),
        ));
    }

    Ok(())
}

/// The requester withdraws a still-pending swap request.
#[utoipa::path(
    put,
    path = "/swaps/{id}/cancel",
    params(
        ("id" = Uuid, Path, description = "Swap request ID")
    ),
    responses(
        (status = 200, description = "Swap request cancelled"),
        (status = 403, description = "Only the requester can cancel"),
        (status = 404, description = "Swap request not found"),
        (status = 409, description = "Cannot cancel processed request"),
        (status = 500, description = "Failed to cancel swap request")
    ),
    tag = "Swaps",
    security(("bearerAuth" = []))
)]
pub async fn cancel_swap(
    State(pool): State<PgPool>,
    Extension(current_user): Extension<CurrentUser>,
    Path(id): Path<Uuid>,
) -> Result<ApiResponse<()>, ApiResponse<()>> {
    let swap = fetch_swap(&pool, id)
        .await
        .map_err(|e| ApiResponse::db_error("Failed to retrieve swap request", e))?
        .ok_or_else(|| {
            ApiResponse::<()>::error(StatusCode::NOT_FOUND, "Swap request not found", None)
        })?;

    // Only requester can cancel
    if swap.requester_id != current_user.id {
        return Err(ApiResponse::<()>::error(
            StatusCode::FORBIDDEN,
            "Only requester can cancel",
            None,
        ));
    }

    let result = sqlx::query(
        r#"
        UPDATE swap_requests
        SET status = 'cancelled', updated_at = NOW()
        WHERE id = $1 AND status = 'pending'
        "#,
    )
    .bind(id)
    .execute(&pool)
    .await
    .map_err(|e| ApiResponse::db_error("Failed to cancel swap request", e))?;

    if result.rows_affected() == 0 {
        return Err(ApiResponse::<()>::error(
            StatusCode::CONFLICT,
            "Cannot cancel processed request",
            None,
        ));
    }

    Ok(ApiResponse::success(
        StatusCode::OK,
        "Swap request cancelled",
        (),
    ))
}

use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    paths(
        get_all_swaps,
        get_swap,
        create_swap,
        respond_to_swap,
        approve_swap,
        cancel_swap,
    ),
    components(schemas(
        SwapRequest, SwapRequestDetail, SwapRotaDetail, NewSwapRequest,
        SwapResponsePayload, SwapApprovalPayload,
        SwapStatus, TargetResponse, AdminResponse
    )),
    tags(
        (name = "Swaps", description = "Shift swap workflow")
    )
)]
pub struct SwapDoc;
