use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use sqlx::{PgPool, QueryBuilder};
use uuid::Uuid;

use crate::db::models::shift::{is_valid_color, NewShift, Shift, UpdateShift};
use crate::middleware::auth::CurrentUser;
use crate::utils::api_response::ApiResponse;

#[utoipa::path(
    get,
    path = "/shifts",
    responses(
        (status = 200, description = "List all shift definitions", body = [Shift]),
        (status = 500, description = "Failed to retrieve shifts")
    ),
    tag = "Shifts",
    security(("bearerAuth" = []))
)]
pub async fn get_all_shifts(
    State(pool): State<PgPool>,
) -> Result<ApiResponse<Vec<Shift>>, ApiResponse<()>> {
    let shifts = sqlx::query_as::<_, Shift>("SELECT * FROM shifts ORDER BY start_time ASC")
        .fetch_all(&pool)
        .await
        .map_err(|e| ApiResponse::db_error("Failed to retrieve Shifts", e))?;

    Ok(ApiResponse::success(
        StatusCode::OK,
        "Shifts retrieved successfully",
        shifts,
    ))
}

#[utoipa::path(
    get,
    path = "/shifts/{id}",
    params(
        ("id" = Uuid, Path, description = "Shift ID")
    ),
    responses(
        (status = 200, description = "Retrieve a single shift", body = Shift),
        (status = 404, description = "Shift not found")
    ),
    tag = "Shifts",
    security(("bearerAuth" = []))
)]
pub async fn get_shift(
    State(pool): State<PgPool>,
    Path(id): Path<Uuid>,
) -> Result<ApiResponse<Shift>, ApiResponse<()>> {
    let shift = sqlx::query_as::<_, Shift>("SELECT * FROM shifts WHERE id = $1")
        .bind(id)
        .fetch_optional(&pool)
        .await
        .map_err(|e| ApiResponse::db_error("Failed to retrieve Shift", e))?
        .ok_or_else(|| ApiResponse::<()>::error(StatusCode::NOT_FOUND, "Shift not found", None))?;

    Ok(ApiResponse::success(
        StatusCode::OK,
        "Shift retrieved successfully",
        shift,
    ))
}

#[utoipa::path(
    post,
    path = "/shifts",
    request_body = NewShift,
    responses(
        (status = 201, description = "Shift created successfully", body = Shift),
        (status = 400, description = "Invalid color"),
        (status = 403, description = "Caller is not an admin"),
        (status = 500, description = "Failed to create shift")
    ),
    tag = "Shifts",
    security(("bearerAuth" = []))
)]
pub async fn create_shift(
    State(pool): State<PgPool>,
    Extension(current_user): Extension<CurrentUser>,
    Json(payload): Json<NewShift>,
) -> Result<ApiResponse<Shift>, ApiResponse<()>> {
    if !current_user.is_admin() {
        return Err(ApiResponse::<()>::error(
            StatusCode::FORBIDDEN,
            "Admin role required",
            None,
        ));
    }

    if let Some(color) = &payload.color {
        if !is_valid_color(color) {
            return Err(ApiResponse::<()>::error(
                StatusCode::BAD_REQUEST,
                "Color must be a #rrggbb hex value",
                None,
            ));
        }
    }

    let shift = sqlx::query_as::<_, Shift>(
        r#"
        INSERT INTO shifts (name, start_time, end_time, color)
        VALUES ($1, $2, $3, COALESCE($4, '#3498db'))
        RETURNING *
        "#,
    )
    .bind(&payload.name)
    .bind(payload.start_time)
    .bind(payload.end_time)
    .bind(&payload.color)
    .fetch_one(&pool)
    .await
    .map_err(|e| ApiResponse::db_error("Failed to create Shift", e))?;

    Ok(ApiResponse::success(
        StatusCode::CREATED,
        "Shift created successfully",
        shift,
    ))
}

#[utoipa::path(
    put,
    path = "/shifts/{id}",
    request_body = UpdateShift,
    params(
        ("id" = Uuid, Path, description = "Shift ID")
    ),
    responses(
        (status = 200, description = "Shift updated successfully", body = Shift),
        (status = 403, description = "Caller is not an admin"),
        (status = 404, description = "Shift not found"),
        (status = 500, description = "Failed to update shift")
    ),
    tag = "Shifts",
    security(("bearerAuth" = []))
)]
pub async fn update_shift(
    State(pool): State<PgPool>,
    Extension(current_user): Extension<CurrentUser>,
    Path(id): Path<Uuid>,
    Json(update): Json<UpdateShift>,
) -> Result<ApiResponse<Shift>, ApiResponse<()>> {
    if !current_user.is_admin() {
        return Err(ApiResponse::<()>::error(
            StatusCode::FORBIDDEN,
            "Admin role required",
            None,
        ));
    }

    if let Some(color) = &update.color {
        if !is_valid_color(color) {
            return Err(ApiResponse::<()>::error(
                StatusCode::BAD_REQUEST,
                "Color must be a #rrggbb hex value",
                None,
            ));
        }
    }

    let mut query_builder = QueryBuilder::new("UPDATE shifts SET ");
    let mut first = true;

    if let Some(name) = &update.name {
        if !first { query_builder.push(", "); }
        query_builder.push("name = ").push_bind(name);
        first = false;
    }
    if let Some(start_time) = update.start_time {
        if !first { query_builder.push(", "); }
        query_builder.push("start_time = ").push_bind(start_time);
        first = false;
    }
    if let Some(end_time) = update.end_time {
        if !first { query_builder.push(", "); }
        query_builder.push("end_time = ").push_bind(end_time);
        first = false;
    }
    if let Some(color) = &update.color {
        if !first { query_builder.push(", "); }
        query_builder.push("color = ").push_bind(color);
        first = false;
    }

    if !first { query_builder.push(", "); }
    query_builder.push("updated_at = NOW()");
    query_builder.push(" WHERE id = ").push_bind(id);
    query_builder.push(" RETURNING *");

    let shift = query_builder
        .build_query_as::<Shift>()
        .fetch_optional(&pool)
        .await
        .map_err(|e| ApiResponse::db_error("Failed to update Shift", e))?
        .ok_or_else(|| ApiResponse::<()>::error(StatusCode::NOT_FOUND, "Shift not found", None))?;

    Ok(ApiResponse::success(
        StatusCode::OK,
        "Shift updated successfully",
        shift,
    ))
}

#[utoipa::path(
    delete,
    path = "/shifts/{id}",
    params(
        ("id" = Uuid, Path, description = "Shift ID")
    ),
    responses(
        (status = 200, description = "Shift deleted successfully"),
        (status = 403, description = "Caller is not an admin"),
        (status = 404, description = "Shift not found"),
        (status = 500, description = "Failed to delete shift")
    ),
    tag = "Shifts",
    security(("bearerAuth" = []))
)]
pub async fn delete_shift(
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

    let result = sqlx::query("DELETE FROM shifts WHERE id = $1")
        .bind(id)
        .execute(&pool)
        .await
        .map_err(|e| ApiResponse::db_error("Failed to delete Shift", e))?;

    if result.rows_affected() == 0 {
        return Err(ApiResponse::<()>::error(
            StatusCode::NOT_FOUND,
            "Shift not found",
            None,
        ));
    }

    Ok(ApiResponse::success(
        StatusCode::OK,
        "Shift deleted successfully",
        (),
    ))
}

use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    paths(get_all_shifts, get_shift, create_shift, update_shift, delete_shift),
    components(schemas(Shift, NewShift, UpdateShift)),
    tags(
        (name = "Shifts", description = "Shift definition endpoints")
    )
)]
pub struct ShiftDoc;
