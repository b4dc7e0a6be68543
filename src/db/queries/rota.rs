use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use sqlx::{FromRow, PgPool, QueryBuilder};
use uuid::Uuid;

use crate::db::models::agency::AgencyBrief;
use crate::db::models::rota::{
    BulkRotaEntry, BulkRotaError, BulkRotaRequest, BulkRotaResult, NewRota, Rota, RotaDetail,
    RotaFilter, RotaStatus, UpdateRota,
};
use crate::db::models::shift::Shift;
use crate::db::models::user::UserBrief;
use crate::middleware::auth::CurrentUser;
use crate::utils::api_response::ApiResponse;

/// Flattened JOIN row, reassembled into the nested [`RotaDetail`] shape.
#[derive(FromRow)]
struct RotaDetailRow {
    id: Uuid,
    user_id: Option<Uuid>,
    agency_id: Option<Uuid>,
    shift_id: Uuid,
    date: NaiveDate,
    notes: Option<String>,
    status: RotaStatus,
    created_by: Uuid,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    user_name: Option<String>,
    user_email: Option<String>,
    shift_name: String,
    shift_start_time: NaiveTime,
    shift_end_time: NaiveTime,
    shift_color: String,
    shift_created_at: DateTime<Utc>,
    shift_updated_at: DateTime<Utc>,
    creator_name: Option<String>,
    creator_email: Option<String>,
    agency_name: Option<String>,
}

impl RotaDetailRow {
    fn into_detail(self) -> RotaDetail {
        let user = match (self.user_id, self.user_name, self.user_email) {
            (Some(id), Some(name), Some(email)) => Some(UserBrief { id, name, email }),
            _ => None,
        };
        let creator = match (self.creator_name, self.creator_email) {
            (Some(name), Some(email)) => Some(UserBrief {
                id: self.created_by,
                name,
                email,
            }),
            _ => None,
        };
        let agency = match (self.agency_id, self.agency_name) {
            (Some(id), Some(name)) => Some(AgencyBrief { id, name }),
            _ => None,
        };

        RotaDetail {
            rota: Rota {
                id: self.id,
                user_id: self.user_id,
                agency_id: self.agency_id,
                shift_id: self.shift_id,
                date: self.date,
                notes: self.notes,
                status: self.status,
                created_by: self.created_by,
                created_at: self.created_at,
                updated_at: self.updated_at,
            },
            user,
            shift: Shift {
                id: self.shift_id,
                name: self.shift_name,
                start_time: self.shift_start_time,
                end_time: self.shift_end_time,
                color: self.shift_color,
                created_at: self.shift_created_at,
                updated_at: self.shift_updated_at,
            },
            creator,
            agency,
        }
    }
}

const ROTA_DETAIL_SELECT: &str = r#"
SELECT r.id, r.user_id, r.agency_id, r.shift_id, r.date, r.notes, r.status,
       r.created_by, r.created_at, r.updated_at,
       u.name  AS user_name,  u.email AS user_email,
       s.name  AS shift_name, s.start_time AS shift_start_time,
       s.end_time AS shift_end_time, s.color AS shift_color,
       s.created_at AS shift_created_at, s.updated_at AS shift_updated_at,
       c.name  AS creator_name, c.email AS creator_email,
       a.name  AS agency_name
FROM rotas r
JOIN shifts s ON s.id = r.shift_id
LEFT JOIN users u ON u.id = r.user_id
LEFT JOIN users c ON c.id = r.created_by
LEFT JOIN agencies a ON a.id = r.agency_id
"#;

async fn fetch_rota_detail(pool: &PgPool, id: Uuid) -> Result<Option<RotaDetail>, sqlx::Error> {
    let row = sqlx::query_as::<_, RotaDetailRow>(&format!("{ROTA_DETAIL_SELECT} WHERE r.id = $1"))
        .bind(id)
        .fetch_optional(pool)
        .await?;
    Ok(row.map(RotaDetailRow::into_detail))
}

/// Checks the per-user-per-date uniqueness invariant: at most one active
/// roster entry per (user, date), optionally ignoring one entry (for moves).
async fn active_rota_exists(
    pool: &PgPool,
    user_id: Uuid,
    date: NaiveDate,
    exclude: Option<Uuid>,
) -> Result<bool, sqlx::Error> {
    sqlx::query_scalar::<_, bool>(
        r#"
        SELECT EXISTS(
            SELECT 1 FROM rotas
            WHERE user_id = $1 AND date = $2 AND status = 'active'
              AND ($3::uuid IS NULL OR id <> $3)
        )
        "#,
    )
    .bind(user_id)
    .bind(date)
    .bind(exclude)
    .fetch_one(pool)
    .await
}

#[utoipa::path(
    get,
    path = "/rotas",
    params(RotaFilter),
    responses(
        (status = 200, description = "List roster entries", body = [RotaDetail]),
        (status = 403, description = "Caller is not an admin"),
        (status = 500, description = "Failed to retrieve rotas")
    ),
    tag = "Rotas",
    security(("bearerAuth" = []))
)]
pub async fn get_all_rotas(
    State(pool): State<PgPool>,
    Extension(current_user): Extension<CurrentUser>,
    Query(filter): Query<RotaFilter>,
) -> Result<ApiResponse<Vec<RotaDetail>>, ApiResponse<()>> {
    if !current_user.is_admin() {
        return Err(ApiResponse::<()>::error(
            StatusCode::FORBIDDEN,
            "Admin role required",
            None,
        ));
    }

    let mut query_builder = QueryBuilder::new(ROTA_DETAIL_SELECT);
    query_builder.push(" WHERE TRUE");
    if let Some(start) = filter.start_date {
        query_builder.push(" AND r.date >= ").push_bind(start);
    }
    if let Some(end) = filter.end_date {
        query_builder.push(" AND r.date <= ").push_bind(end);
    }
    if let Some(user_id) = filter.user_id {
        query_builder.push(" AND r.user_id = ").push_bind(user_id);
    }
    query_builder.push(" ORDER BY r.date ASC");

    let rows = query_builder
        .build_query_as::<RotaDetailRow>()
        .fetch_all(&pool)
        .await
        .map_err(|e| ApiResponse::db_error("Failed to retrieve Rotas", e))?;

    Ok(ApiResponse::success(
        StatusCode::OK,
        "Rotas retrieved successfully",
        rows.into_iter().map(RotaDetailRow::into_detail).collect(),
    ))
}

#[utoipa::path(
    get,
    path = "/rotas/my",
    params(RotaFilter),
    responses(
        (status = 200, description = "The caller's roster entries", body = [RotaDetail]),
        (status = 500, description = "Failed to retrieve rotas")
    ),
    tag = "Rotas",
    security(("bearerAuth" = []))
)]
pub async fn get_my_rota(
    State(pool): State<PgPool>,
    Extension(current_user): Extension<CurrentUser>,
    Query(filter): Query<RotaFilter>,
) -> Result<ApiResponse<Vec<RotaDetail>>, ApiResponse<()>> {
    let mut query_builder = QueryBuilder::new(ROTA_DETAIL_SELECT);
    query_builder.push(" WHERE r.user_id = ").push_bind(current_user.id);
    if let Some(start) = filter.start_date {
        query_builder.push(" AND r.date >= ").push_bind(start);
    }
    if let Some(end) = filter.end_date {
        query_builder.push(" AND r.date <= ").push_bind(end);
    }
    query_builder.push(" ORDER BY r.date ASC");

    let rows = query_builder
        .build_query_as::<RotaDetailRow>()
        .fetch_all(&pool)
        .await
        .map_err(|e| ApiResponse::db_error("Failed to retrieve Rotas", e))?;

    Ok(ApiResponse::success(
        StatusCode::OK,
        "Rotas retrieved successfully",
        rows.into_iter().map(RotaDetailRow::into_detail).collect(),
    ))
}

#[utoipa::path(
    get,
    path = "/rotas/team",
    params(RotaFilter),
    responses(
        (status = 200, description = "All roster entries in the range", body = [RotaDetail]),
        (status = 500, description = "Failed to retrieve rotas")
    ),
    tag = "Rotas",
    security(("bearerAuth" = []))
)]
pub async fn get_team_rota(
    State(pool): State<PgPool>,
    Query(filter): Query<RotaFilter>,
) -> Result<ApiResponse<Vec<RotaDetail>>, ApiResponse<()>> {
    let mut query_builder = QueryBuilder::new(ROTA_DETAIL_SELECT);
    query_builder.push(" WHERE TRUE");
    if let Some(start) = filter.start_date {
        query_builder.push(" AND r.date >= ").push_bind(start);
    }
    if let Some(end) = filter.end_date {
        query_builder.push(" AND r.date <= ").push_bind(end);
    }
    query_builder.push(" ORDER BY r.date ASC, r.user_id ASC");

    let rows = query_builder
        .build_query_as::<RotaDetailRow>()
        .fetch_all(&pool)
        .await
        .map_err(|e| ApiResponse::db_error("Failed to retrieve Rotas", e))?;

    Ok(ApiResponse::success(
        StatusCode::OK,
        "Rotas retrieved successfully",
        rows.into_iter().map(RotaDetailRow::into_detail).collect(),
    ))
}

#[utoipa::path(
    get,
    path = "/rotas/{id}",
    params(
        ("id" = Uuid, Path, description = "Rota ID")
    ),
    responses(
        (status = 200, description = "Retrieve a single roster entry", body = RotaDetail),
        (status = 404, description = "Rota entry not found")
    ),
    tag = "Rotas",
    security(("bearerAuth" = []))
)]
pub async fn get_rota(
    State(pool): State<PgPool>,
    Path(id): Path<Uuid>,
) -> Result<ApiResponse<RotaDetail>, ApiResponse<()>> {
    let rota = fetch_rota_detail(&pool, id)
        .await
        .map_err(|e| ApiResponse::db_error("Failed to retrieve Rota", e))?
        .ok_or_else(|| {
            ApiResponse::<()>::error(StatusCode::NOT_FOUND, "Rota entry not found", None)
        })?;

    Ok(ApiResponse::success(
        StatusCode::OK,
        "Rota retrieved successfully",
        rota,
    ))
}

#[utoipa::path(
    post,
    path = "/rotas",
    request_body = NewRota,
    responses(
        (status = 201, description = "Rota entry created successfully", body = RotaDetail),
        (status = 400, description = "Missing or invalid references"),
        (status = 403, description = "Caller is not an admin"),
        (status = 409, description = "User already has a shift on this date"),
        (status = 500, description = "Failed to create rota entry")
    ),
    tag = "Rotas",
    security(("bearerAuth" = []))
)]
pub async fn create_rota(
    State(pool): State<PgPool>,
    Extension(current_user): Extension<CurrentUser>,
    Json(payload): Json<NewRota>,
) -> Result<ApiResponse<RotaDetail>, ApiResponse<()>> {
    if !current_user.is_admin() {
        return Err(ApiResponse::<()>::error(
            StatusCode::FORBIDDEN,
            "Admin role required",
            None,
        ));
    }

    // Must have either a staff member or an agency
    if payload.user_id.is_none() && payload.agency_id.is_none() {
        return Err(ApiResponse::<()>::error(
            StatusCode::BAD_REQUEST,
            "Either user or agency is required",
            None,
        ));
    }

    if let Some(user_id) = payload.user_id {
        let user_exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM users WHERE id = $1)",
        )
        .bind(user_id)
        .fetch_one(&pool)
        .await
        .map_err(|e| ApiResponse::db_error("Failed to verify user", e))?;
        if !user_exists {
            return Err(ApiResponse::<()>::error(
                StatusCode::BAD_REQUEST,
                "User not found",
                None,
            ));
        }

        let taken = active_rota_exists(&pool, user_id, payload.date, None)
            .await
            .map_err(|e| ApiResponse::db_error("Failed to check roster", e))?;
        if taken {
            return Err(ApiResponse::<()>::error(
                StatusCode::CONFLICT,
                "User already has a shift assigned on this date",
                None,
            ));
        }
    }

    if let Some(agency_id) = payload.agency_id {
        let agency_exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM agencies WHERE id = $1)",
        )
        .bind(agency_id)
        .fetch_one(&pool)
        .await
        .map_err(|e| ApiResponse::db_error("Failed to verify agency", e))?;
        if !agency_exists {
            return Err(ApiResponse::<()>::error(
                StatusCode::BAD_REQUEST,
                "Agency not found",
                None,
            ));
        }
    }

    let shift_exists =
        sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM shifts WHERE id = $1)")
            .bind(payload.shift_id)
            .fetch_one(&pool)
            .await
            .map_err(|e| ApiResponse::db_error("Failed to verify shift", e))?;
    if !shift_exists {
        return Err(ApiResponse::<()>::error(
            StatusCode::BAD_REQUEST,
            "Shift not found",
            None,
        ));
    }

    let created = sqlx::query_as::<_, Rota>(
        r#"
        INSERT INTO rotas (user_id, agency_id, shift_id, date, notes, created_by)
        VALUES ($1, $2, $3, $4, $5, $6)
        RETURNING *
        "#,
    )
    .bind(payload.user_id)
    .bind(payload.agency_id)
    .bind(payload.shift_id)
    .bind(payload.date)
    .bind(&payload.notes)
    .bind(current_user.id)
    .fetch_one(&pool)
    .await
    .map_err(|e| {
        if let Some(db_err) = e.as_database_error() {
            // Partial unique index on (user_id, date) closes the check-then-insert race
            if db_err.code().map(|code| code == "23505").unwrap_or(false) {
                return ApiResponse::<()>::error(
                    StatusCode::CONFLICT,
                    "User already has a shift assigned on this date",
                    None,
                );
            }
        }
        ApiResponse::db_error("Failed to create Rota", e)
    })?;

    let detail = fetch_rota_detail(&pool, created.id)
        .await
        .map_err(|e| ApiResponse::db_error("Failed to load created rota", e))?
        .ok_or_else(|| {
            ApiResponse::<()>::error(StatusCode::INTERNAL_SERVER_ERROR, "Created rota vanished", None)
        })?;

    Ok(ApiResponse::success(
        StatusCode::CREATED,
        "Rota entry created successfully",
        detail,
    ))
}

#[utoipa::path(
    post,
    path = "/rotas/bulk",
    request_body = BulkRotaRequest,
    responses(
        (status = 201, description = "Bulk creation result", body = BulkRotaResult),
        (status = 400, description = "Empty entries array"),
        (status = 403, description = "Caller is not an admin"),
        (status = 500, description = "Failed to create rota entries")
    ),
    tag = "Rotas",
    security(("bearerAuth" = []))
)]
pub async fn create_bulk_rotas(
    State(pool): State<PgPool>,
    Extension(current_user): Extension<CurrentUser>,
    Json(payload): Json<BulkRotaRequest>,
) -> Result<ApiResponse<BulkRotaResult>, ApiResponse<()>> {
    if !current_user.is_admin() {
        return Err(ApiResponse::<()>::error(
            StatusCode::FORBIDDEN,
            "Admin role required",
            None,
        ));
    }

    if payload.entries.is_empty() {
        return Err(ApiResponse::<()>::error(
            StatusCode::BAD_REQUEST,
            "Entries array required",
            None,
        ));
    }

    let mut created = 0usize;
    let mut errors = Vec::new();

    // Per-entry failures are collected, not fatal: a clash on one line of an
    // import must not discard the rest.
    for entry in &payload.entries {
        let taken = active_rota_exists(&pool, entry.user_id, entry.date, None)
            .await
            .map_err(|e| ApiResponse::db_error("Failed to check roster", e))?;
        if taken {
            errors.push(BulkRotaError {
                user_id: entry.user_id,
                date: entry.date,
                message: "Already assigned".to_string(),
            });
            continue;
        }

        let result = sqlx::query(
            r#"
            INSERT INTO rotas (user_id, shift_id, date, notes, created_by)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(entry.user_id)
        .bind(entry.shift_id)
        .bind(entry.date)
        .bind(&entry.notes)
        .bind(current_user.id)
        .execute(&pool)
        .await;

        match result {
            Ok(_) => created += 1,
            Err(e) => errors.push(BulkRotaError {
                user_id: entry.user_id,
                date: entry.date,
                message: e.to_string(),
            }),
        }
    }

    Ok(ApiResponse::success(
        StatusCode::CREATED,
        format!("Created {created} entries"),
        BulkRotaResult { created, errors },
    ))
}

#[utoipa::path(
    put,
    path = "/rotas/{id}",
    request_body = UpdateRota,
    params(
        ("id" = Uuid, Path, description = "Rota ID")
    ),
    responses(
        (status = 200, description = "Rota entry updated successfully", body = RotaDetail),
        (status = 403, description = "Caller is not an admin"),
        (status = 404, description = "Rota entry not found"),
        (status = 409, description = "User already has a shift on this date"),
        (status = 500, description = "Failed to update rota entry")
    ),
    tag = "Rotas",
    security(("bearerAuth" = []))
)]
pub async fn update_rota(
    State(pool): State<PgPool>,
    Extension(current_user): Extension<CurrentUser>,
    Path(id): Path<Uuid>,
    Json(update): Json<UpdateRota>,
) -> Result<ApiResponse<RotaDetail>, ApiResponse<()>> {
    if !current_user.is_admin() {
        return Err(ApiResponse::<()>::error(
            StatusCode::FORBIDDEN,
            "Admin role required",
            None,
        ));
    }

    let rota = sqlx::query_as::<_, Rota>("SELECT * FROM rotas WHERE id = $1")
        .bind(id)
        .fetch_optional(&pool)
        .await
        .map_err(|e| ApiResponse::db_error("Failed to retrieve Rota", e))?
        .ok_or_else(|| {
            ApiResponse::<()>::error(StatusCode::NOT_FOUND, "Rota entry not found", None)
        })?;

    // Moving the entry to a new date re-checks the one-active-per-day rule
    if let (Some(new_date), Some(user_id)) = (update.date, rota.user_id) {
        if new_date != rota.date {
            let taken = active_rota_exists(&pool, user_id, new_date, Some(rota.id))
                .await
                .map_err(|e| ApiResponse::db_error("Failed to check roster", e))?;
            if taken {
                return Err(ApiResponse::<()>::error(
                    StatusCode::CONFLICT,
                    "User already has a shift on this date",
                    None,
                ));
            }
        }
    }

    let mut query_builder = QueryBuilder::new("UPDATE rotas SET ");
    let mut first = true;

    if let Some(shift_id) = update.shift_id {
        if !first { query_builder.push(", "); }
        query_builder.push("shift_id = ").push_bind(shift_id);
        first = false;
    }
    if let Some(date) = update.date {
        if !first { query_builder.push(", "); }
        query_builder.push("date = ").push_bind(date);
        first = false;
    }
    if let Some(notes) = &update.notes {
        if !first { query_builder.push(", "); }
        query_builder.push("notes = ").push_bind(notes);
        first = false;
    }

    if !first { query_builder.push(", "); }
    query_builder.push("updated_at = NOW()");
    query_builder.push(" WHERE id = ").push_bind(id);

    query_builder
        .build()
        .execute(&pool)
        .await
        .map_err(|e| ApiResponse::db_error("Failed to update Rota", e))?;

    let detail = fetch_rota_detail(&pool, id)
        .await
        .map_err(|e| ApiResponse::db_error("Failed to load updated rota", e))?
        .ok_or_else(|| {
            ApiResponse::<()>::error(StatusCode::NOT_FOUND, "Rota entry not found", None)
        })?;

    Ok(ApiResponse::success(
        StatusCode::OK,
        "Rota entry updated successfully",
        detail,
    ))
}

#[utoipa::path(
    delete,
    path = "/rotas/{id}",
    params(
        ("id" = Uuid, Path, description = "Rota ID")
    ),
    responses(
        (status = 200, description = "Rota entry deleted successfully"),
        (status = 403, description = "Caller is not an admin"),
        (status = 404, description = "Rota entry not found"),
        (status = 500, description = "Failed to delete rota entry")
    ),
    tag = "Rotas",
    security(("bearerAuth" = []))
)]
pub async fn delete_rota(
    State(pool): State<PgPool>,
    Extension(current_user): Extension<CurrentUser>,
    Path(id): Path<Uuid>,
) -> Result<ApiResponse<()>, ApiResponse<()>> {
    if !current_user.is_admin() {
        return Err(ApiResponse::<()>::error(
            StatusCode::FORBIDDEN,
            "Admin role required",
            None,
        ));
    }

    let result = sqlx::query("DELETE FROM rotas WHERE id = $1")
        .bind(id)
        .execute(&pool)
        .await
        .map_err(|e| ApiResponse::db_error("Failed to delete Rota", e))?;

    if result.rows_affected() == 0 {
        return Err(ApiResponse::<()>::error(
            StatusCode::NOT_FOUND,
            "Rota entry not found",
            None,
        ));
    }

    Ok(ApiResponse::success(
        StatusCode::OK,
        "Rota entry deleted successfully",
        (),
    ))
}

#[utoipa::path(
    put,
    path = "/rotas/{id}/cancel",
    params(
        ("id" = Uuid, Path, description = "Rota ID")
    ),
    responses(
        (status = 200, description = "Shift cancelled successfully", body = RotaDetail),
        (status = 403, description = "Caller is not an admin"),
        (status = 404, description = "Rota entry not found"),
        (status = 409, description = "Shift is already cancelled"),
        (status = 500, description = "Failed to cancel shift")
    ),
    tag = "Rotas",
    security(("bearerAuth" = []))
)]
pub async fn cancel_rota(
    State(pool): State<PgPool>,
    Extension(current_user): Extension<CurrentUser>,
    Path(id): Path<Uuid>,
) -> Result<ApiResponse<RotaDetail>, ApiResponse<()>> {
    set_rota_status(
        &pool,
        &current_user,
        id,
        RotaStatus::Cancelled,
        RotaStatus::Active,
        "Shift is already cancelled",
        "Shift cancelled successfully",
    )
    .await
}

#[utoipa::path(
    put,
    path = "/rotas/{id}/restore",
    params(
        ("id" = Uuid, Path, description = "Rota ID")
    ),
    responses(
        (status = 200, description = "Shift restored successfully", body = RotaDetail),
        (status = 403, description = "Caller is not an admin"),
        (status = 404, description = "Rota entry not found"),
        (status = 409, description = "Shift is not cancelled"),
        (status = 500, description = "Failed to restore shift")
    ),
    tag = "Rotas",
    security(("bearerAuth" = []))
)]
pub async fn restore_rota(
    State(pool): State<PgPool>,
    Extension(current_user): Extension<CurrentUser>,
    Path(id): Path<Uuid>,
) -> Result<ApiResponse<RotaDetail>, ApiResponse<()>> {
    set_rota_status(
        &pool,
        &current_user,
        id,
        RotaStatus::Active,
        RotaStatus::Cancelled,
        "Shift is not cancelled",
        "Shift restored successfully",
    )
    .await
}

/// Status flip with an already-in-state guard, shared by cancel/restore.
async fn set_rota_status(
    pool: &PgPool,
    current_user: &CurrentUser,
    id: Uuid,
    to: RotaStatus,
    expected: RotaStatus,
    wrong_state_msg: &str,
    ok_msg: &str,
) -> Result<ApiResponse<RotaDetail>, ApiResponse<()>> {
    if !current_user.is_admin() {
        return Err(ApiResponse::<()>::error(
            StatusCode::FORBIDDEN,
            "Admin role required",
            None,
        ));
    }

    let result = sqlx::query(
        "UPDATE rotas SET status = $1, updated_at = NOW() WHERE id = $2 AND status = $3",
    )
    .bind(to)
    .bind(id)
    .bind(expected)
    .execute(pool)
    .await
    .map_err(|e| ApiResponse::db_error("Failed to update Rota status", e))?;

    if result.rows_affected() == 0 {
        // Distinguish a missing entry from one in the wrong state
        let exists =
            sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM rotas WHERE id = $1)")
                .bind(id)
                .fetch_one(pool)
                .await
                .map_err(|e| ApiResponse::db_error("Failed to check Rota", e))?;
        return Err(if exists {
            ApiResponse::<()>::error(StatusCode::CONFLICT, wrong_state_msg, None)
        } else {
            ApiResponse::<()>::error(StatusCode::NOT_FOUND, "Rota entry not found", None)
        });
    }

    let detail = fetch_rota_detail(pool, id)
        .await
        .map_err(|e| ApiResponse::db_error("Failed to load rota", e))?
        .ok_or_else(|| {
            ApiResponse::<()>::error(StatusCode::NOT_FOUND, "Rota entry not found", None)
        })?;

    Ok(ApiResponse::success(StatusCode::OK, ok_msg, detail))
}

use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    paths(
        get_all_rotas,
        get_my_rota,
        get_team_rota,
        get_rota,
        create_rota,
        create_bulk_rotas,
        update_rota,
        delete_rota,
        cancel_rota,
        restore_rota,
    ),
    components(schemas(
        Rota, RotaDetail, NewRota, UpdateRota, RotaStatus,
        BulkRotaRequest, BulkRotaEntry, BulkRotaResult, BulkRotaError
    )),
    tags(
        (name = "Rotas", description = "Roster management endpoints")
    )
)]
pub struct RotaDoc;
