use axum::{
    extract::{Extension, Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde_json::json;
use sqlx::{FromRow, PgPool, QueryBuilder};
use tracing::warn;
use uuid::Uuid;

use crate::db::models::cancellation::{
    CancellationDecision, CancellationDetail, CancellationFilter, CancellationReason,
    CancellationStats, CancellationStatus, NewCancellation, ShiftCancellation,
};
use crate::db::models::rota::{Rota, RotaStatus};
use crate::db::models::shift::Shift;
use crate::db::models::swap::SwapRotaDetail;
use crate::db::models::user::UserBrief;
use crate::middleware::auth::CurrentUser;
use crate::utils::api_response::ApiResponse;
use crate::utils::notification::{self, kinds};

#[derive(FromRow)]
struct CancellationDetailRow {
    id: Uuid,
    rota_id: Uuid,
    user_id: Uuid,
    reason: CancellationReason,
    reason_details: Option<String>,
    status: CancellationStatus,
    approved_by: Option<Uuid>,
    approved_at: Option<DateTime<Utc>>,
    original_date: NaiveDate,
    original_shift_name: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    user_name: String,
    user_email: String,
    approver_name: Option<String>,
    approver_email: Option<String>,
    r_user_id: Option<Uuid>,
    r_agency_id: Option<Uuid>,
    r_shift_id: Uuid,
    r_date: NaiveDate,
    r_notes: Option<String>,
    r_status: RotaStatus,
    r_created_by: Uuid,
    r_created_at: DateTime<Utc>,
    r_updated_at: DateTime<Utc>,
    shift_name: String,
    shift_start_time: NaiveTime,
    shift_end_time: NaiveTime,
    shift_color: String,
    shift_created_at: DateTime<Utc>,
    shift_updated_at: DateTime<Utc>,
}

impl CancellationDetailRow {
    fn into_detail(self) -> CancellationDetail {
        let approver = match (self.approved_by, self.approver_name, self.approver_email) {
            (Some(id), Some(name), Some(email)) => Some(UserBrief { id, name, email }),
            _ => None,
        };

        CancellationDetail {
            cancellation: ShiftCancellation {
                id: self.id,
                rota_id: self.rota_id,
                user_id: self.user_id,
                reason: self.reason,
                reason_details: self.reason_details,
                status: self.status,
                approved_by: self.approved_by,
                approved_at: self.approved_at,
                original_date: self.original_date,
                original_shift_name: self.original_shift_name,
                created_at: self.created_at,
                updated_at: self.updated_at,
            },
            user: UserBrief {
                id: self.user_id,
                name: self.user_name,
                email: self.user_email,
            },
            rota: Some(SwapRotaDetail {
                rota: Rota {
                    id: self.rota_id,
                    user_id: self.r_user_id,
                    agency_id: self.r_agency_id,
                    shift_id: self.r_shift_id,
                    date: self.r_date,
                    notes: self.r_notes,
                    status: self.r_status,
                    created_by: self.r_created_by,
                    created_at: self.r_created_at,
                    updated_at: self.r_updated_at,
                },
                shift: Shift {
                    id: self.r_shift_id,
                    name: self.shift_name,
                    start_time: self.shift_start_time,
                    end_time: self.shift_end_time,
                    color: self.shift_color,
                    created_at: self.shift_created_at,
                    updated_at: self.shift_updated_at,
                },
            }),
            approver,
        }
    }
}

const CANCELLATION_DETAIL_SELECT: &str = r#"
SELECT c.id, c.rota_id, c.user_id, c.reason, c.reason_details, c.status,
       c.approved_by, c.approved_at, c.original_date, c.original_shift_name,
       c.created_at, c.updated_at,
       u.name AS user_name, u.email AS user_email,
       ap.name AS approver_name, ap.email AS approver_email,
       r.user_id AS r_user_id, r.agency_id AS r_agency_id,
       r.shift_id AS r_shift_id, r.date AS r_date, r.notes AS r_notes,
       r.status AS r_status, r.created_by AS r_created_by,
       r.created_at AS r_created_at, r.updated_at AS r_updated_at,
       s.name AS shift_name, s.start_time AS shift_start_time,
       s.end_time AS shift_end_time, s.color AS shift_color,
       s.created_at AS shift_created_at, s.updated_at AS shift_updated_at
FROM shift_cancellations c
JOIN users u ON u.id = c.user_id
LEFT JOIN users ap ON ap.id = c.approved_by
JOIN rotas r ON r.id = c.rota_id
JOIN shifts s ON s.id = r.shift_id
"#;

async fn fetch_cancellation_detail(
    pool: &PgPool,
    id: Uuid,
) -> Result<Option<CancellationDetail>, sqlx::Error> {
    let row = sqlx::query_as::<_, CancellationDetailRow>(&format!(
        "{CANCELLATION_DETAIL_SELECT} WHERE c.id = $1"
    ))
    .bind(id)
    .fetch_optional(pool)
    .await?;
    Ok(row.map(CancellationDetailRow::into_detail))
}

/// Staff requests cancellation of one of their own rostered shifts. The
/// original date and shift name are snapshotted so the audit trail survives
/// later roster changes.
#[utoipa::path(
    post,
    path = "/cancellations",
    request_body = NewCancellation,
    responses(
        (status = 201, description = "Cancellation request submitted", body = CancellationDetail),
        (status = 403, description = "Caller does not own the roster entry"),
        (status = 404, description = "Roster entry not found"),
        (status = 409, description = "Cancellation already requested for this shift"),
        (status = 500, description = "Failed to create cancellation request")
    ),
    tag = "Cancellations",
    security(("bearerAuth" = []))
)]
pub async fn request_cancellation(
    State(pool): State<PgPool>,
    Extension(current_user): Extension<CurrentUser>,
    Json(payload): Json<NewCancellation>,
) -> Result<ApiResponse<CancellationDetail>, ApiResponse<()>> {
    #[derive(FromRow)]
    struct RotaWithShiftName {
        user_id: Option<Uuid>,
        date: NaiveDate,
        shift_name: String,
    }

    let rota = sqlx::query_as::<_, RotaWithShiftName>(
        r#"
        SELECT r.user_id, r.date, s.name AS shift_name
        FROM rotas r
        JOIN shifts s ON s.id = r.shift_id
        WHERE r.id = $1
        "#,
    )
    .bind(payload.rota_id)
    .fetch_optional(&pool)
    .await
    .map_err(|e| ApiResponse::db_error("Failed to retrieve Rota", e))?
    .ok_or_else(|| ApiResponse::<()>::error(StatusCode::NOT_FOUND, "Shift not found", None))?;

    if rota.user_id != Some(current_user.id) {
        return Err(ApiResponse::<()>::error(
            StatusCode::FORBIDDEN,
            "You can only cancel your own shifts",
            None,
        ));
    }

    // A rejected request may be re-raised; a pending or approved one may not.
    let already_requested = sqlx::query_scalar::<_, bool>(
        r#"
        SELECT EXISTS(
            SELECT 1 FROM shift_cancellations
            WHERE rota_id = $1 AND status <> 'rejected'
        )
        "#,
    )
    .bind(payload.rota_id)
    .fetch_one(&pool)
    .await
    .map_err(|e| ApiResponse::db_error("Failed to check cancellations", e))?;

    if already_requested {
        return Err(ApiResponse::<()>::error(
            StatusCode::CONFLICT,
            "Cancellation already requested for this shift",
            None,
        ));
    }

    let created = sqlx::query_as::<_, ShiftCancellation>(
        r#"
        INSERT INTO shift_cancellations
            (rota_id, user_id, reason, reason_details, original_date, original_shift_name)
        VALUES ($1, $2, $3, $4, $5, $6)
        RETURNING *
        "#,
    )
    .bind(payload.rota_id)
    .bind(current_user.id)
    .bind(payload.reason)
    .bind(&payload.reason_details)
    .bind(rota.date)
    .bind(&rota.shift_name)
    .fetch_one(&pool)
    .await
    .map_err(|e| ApiResponse::db_error("Failed to create cancellation request", e))?;

    // Best-effort admin fan-out; a notification failure never undoes the request
    if let Err(e) = notification::notify_admins(
        &pool,
        "Shift Cancellation Request",
        &format!(
            "{} requested to cancel their {} shift on {}",
            current_user.name, rota.shift_name, rota.date
        ),
        kinds::CANCELLATION_REQUEST,
        Some(json!({ "cancellationId": created.id })),
    )
    .await
    {
        warn!("Failed to notify admins of cancellation request: {e}");
    }

    let detail = fetch_cancellation_detail(&pool, created.id)
        .await
        .map_err(|e| ApiResponse::db_error("Failed to load cancellation", e))?
        .ok_or_else(|| {
            ApiResponse::<()>::error(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Created cancellation vanished",
                None,
            )
        })?;

    Ok(ApiResponse::success(
        StatusCode::CREATED,
        "Cancellation request submitted",
        detail,
    ))
}

/// Admin sees all cancellation requests, staff sees only their own.
#[utoipa::path(
    get,
    path = "/cancellations",
    params(CancellationFilter),
    responses(
        (status = 200, description = "Cancellation requests", body = [CancellationDetail]),
        (status = 500, description = "Failed to retrieve cancellations")
    ),
    tag = "Cancellations",
    security(("bearerAuth" = []))
)]
pub async fn get_all_cancellations(
    State(pool): State<PgPool>,
    Extension(current_user): Extension<CurrentUser>,
    Query(filter): Query<CancellationFilter>,
) -> Result<ApiResponse<Vec<CancellationDetail>>, ApiResponse<()>> {
    let mut query_builder = QueryBuilder::new(CANCELLATION_DETAIL_SELECT);
    query_builder.push(" WHERE TRUE");
    if let Some(status) = filter.status {
        query_builder.push(" AND c.status = ").push_bind(status);
    }
    if !current_user.is_admin() {
        query_builder.push(" AND c.user_id = ").push_bind(current_user.id);
    }
    query_builder.push(" ORDER BY c.created_at DESC");

    let rows = query_builder
        .build_query_as::<CancellationDetailRow>()
        .fetch_all(&pool)
        .await
        .map_err(|e| ApiResponse::db_error("Failed to retrieve cancellations", e))?;

    Ok(ApiResponse::success(
        StatusCode::OK,
        "Cancellations retrieved successfully",
        rows.into_iter().map(CancellationDetailRow::into_detail).collect(),
    ))
}

/// Admin approves or rejects a pending cancellation. Approval also flips the
/// referenced roster entry to cancelled; both writes share one transaction.
#[utoipa::path(
    put,
    path = "/cancellations/{id}/respond",
    request_body = CancellationDecision,
    params(
        ("id" = Uuid, Path, description = "Cancellation request ID")
    ),
    responses(
        (status = 200, description = "Cancellation resolved", body = CancellationDetail),
        (status = 400, description = "Response must be approved or rejected"),
        (status = 403, description = "Caller is not an admin"),
        (status = 404, description = "Cancellation request not found"),
        (status = 409, description = "Already processed"),
        (status = 500, description = "Failed to update cancellation request")
    ),
    tag = "Cancellations",
    security(("bearerAuth" = []))
)]
pub async fn respond_to_cancellation(
    State(pool): State<PgPool>,
    Extension(current_user): Extension<CurrentUser>,
    Path(id): Path<Uuid>,
    Json(decision): Json<CancellationDecision>,
) -> Result<ApiResponse<CancellationDetail>, ApiResponse<()>> {
    if !current_user.is_admin() {
        return Err(ApiResponse::<()>::error(
            StatusCode::FORBIDDEN,
            "Admin role required",
            None,
        ));
    }

    if decision.response == CancellationStatus::Pending {
        return Err(ApiResponse::<()>::error(
            StatusCode::BAD_REQUEST,
            "Response must be approved or rejected",
            None,
        ));
    }

    let mut tx = pool
        .begin()
        .await
        .map_err(|e| ApiResponse::db_error("Failed to start transaction", e))?;

    // The pending guard and the resolution are one statement, so concurrent
    // admins cannot both win.
    let resolved = sqlx::query_as::<_, ShiftCancellation>(
        r#"
        UPDATE shift_cancellations
        SET status = $1, approved_by = $2, approved_at = NOW(), updated_at = NOW()
        WHERE id = $3 AND status = 'pending'
        RETURNING *
        "#,
    )
    .bind(decision.response)
    .bind(current_user.id)
    .bind(id)
    .fetch_optional(&mut *tx)
    .await
    .map_err(|e| ApiResponse::db_error("Failed to update cancellation", e))?;

    let Some(resolved) = resolved else {
        let exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM shift_cancellations WHERE id = $1)",
        )
        .bind(id)
        .fetch_one(&pool)
        .await
        .map_err(|e| ApiResponse::db_error("Failed to check cancellation", e))?;
        return Err(if exists {
            ApiResponse::<()>::error(StatusCode::CONFLICT, "Already processed", None)
        } else {
            ApiResponse::<()>::error(StatusCode::NOT_FOUND, "Cancellation request not found", None)
        });
    };

    if decision.response == CancellationStatus::Approved {
        sqlx::query("UPDATE rotas SET status = $1, updated_at = NOW() WHERE id = $2")
            .bind(RotaStatus::Cancelled)
            .bind(resolved.rota_id)
            .execute(&mut *tx)
            .await
            .map_err(|e| ApiResponse::db_error("Failed to cancel roster entry", e))?;
    }

    tx.commit()
        .await
        .map_err(|e| ApiResponse::db_error("Failed to commit transaction", e))?;

    let status_text = match decision.response {
        CancellationStatus::Approved => "approved",
        CancellationStatus::Rejected => "rejected",
        CancellationStatus::Pending => unreachable!(),
    };

    if let Err(e) = notification::notify(
        &pool,
        resolved.user_id,
        &format!(
            "Cancellation {}",
            if decision.response == CancellationStatus::Approved { "Approved" } else { "Rejected" }
        ),
        &format!(
            "Your shift cancellation request for {} has been {}",
            resolved.original_date, status_text
        ),
        kinds::CANCELLATION_RESPONSE,
        Some(json!({ "cancellationId": resolved.id })),
    )
    .await
    {
        warn!("Failed to notify staff of cancellation decision: {e}");
    }

    let detail = fetch_cancellation_detail(&pool, id)
        .await
        .map_err(|e| ApiResponse::db_error("Failed to load cancellation", e))?
        .ok_or_else(|| {
            ApiResponse::<()>::error(StatusCode::NOT_FOUND, "Cancellation request not found", None)
        })?;

    Ok(ApiResponse::success(
        StatusCode::OK,
        format!("Cancellation {status_text}"),
        detail,
    ))
}

#[derive(Debug, serde::Serialize, utoipa::ToSchema)]
pub struct CancellationHistory {
    pub cancellations: Vec<CancellationDetail>,
    pub stats: CancellationStats,
}

/// A user's cancellation history plus aggregate counts. Staff may only see
/// their own; admins may see anyone's.
#[utoipa::path(
    get,
    path = "/cancellations/history/{user_id}",
    params(
        ("user_id" = Uuid, Path, description = "User ID")
    ),
    responses(
        (status = 200, description = "Cancellation history", body = CancellationHistory),
        (status = 403, description = "Staff may only view their own history"),
        (status = 500, description = "Failed to retrieve history")
    ),
    tag = "Cancellations",
    security(("bearerAuth" = []))
)]
pub async fn get_cancellation_history(
    State(pool): State<PgPool>,
    Extension(current_user): Extension<CurrentUser>,
    Path(user_id): Path<Uuid>,
) -> Result<ApiResponse<CancellationHistory>, ApiResponse<()>> {
    if !current_user.is_admin() && user_id != current_user.id {
        return Err(ApiResponse::<()>::error(
            StatusCode::FORBIDDEN,
            "Not authorized",
            None,
        ));
    }

    let rows = sqlx::query_as::<_, CancellationDetailRow>(&format!(
        "{CANCELLATION_DETAIL_SELECT} WHERE c.user_id = $1 ORDER BY c.created_at DESC"
    ))
    .bind(user_id)
    .fetch_all(&pool)
    .await
    .map_err(|e| ApiResponse::db_error("Failed to retrieve history", e))?;

    let cancellations: Vec<CancellationDetail> =
        rows.into_iter().map(CancellationDetailRow::into_detail).collect();
    let stats = CancellationStats::tally(cancellations.iter().map(|c| &c.cancellation));

    Ok(ApiResponse::success(
        StatusCode::OK,
        "Cancellation history retrieved",
        CancellationHistory { cancellations, stats },
    ))
}

use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    paths(
        request_cancellation,
        get_all_cancellations,
        respond_to_cancellation,
        get_cancellation_history,
    ),
    components(schemas(
        ShiftCancellation, CancellationDetail, NewCancellation, CancellationDecision,
        CancellationReason, CancellationStatus, CancellationStats, CancellationHistory
    )),
    tags(
        (name = "Cancellations", description = "Shift cancellation workflow")
    )
)]
pub struct CancellationDoc;
