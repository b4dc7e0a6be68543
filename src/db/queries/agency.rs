use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use serde::Deserialize;
use sqlx::{PgPool, QueryBuilder};
use utoipa::IntoParams;
use uuid::Uuid;

use crate::db::models::agency::{Agency, AgencyBrief, NewAgency, UpdateAgency};
use crate::middleware::auth::CurrentUser;
use crate::utils::api_response::ApiResponse;

#[derive(Debug, Deserialize, Default, IntoParams)]
pub struct AgencyFilter {
    pub active_only: Option<bool>,
}

#[utoipa::path(
    get,
    path = "/agencies",
    params(AgencyFilter),
    responses(
        (status = 200, description = "List agencies", body = [Agency]),
        (status = 500, description = "Failed to retrieve agencies")
    ),
    tag = "Agencies",
    security(("bearerAuth" = []))
)]
pub async fn get_all_agencies(
    State(pool): State<PgPool>,
    Query(filter): Query<AgencyFilter>,
) -> Result<ApiResponse<Vec<Agency>>, ApiResponse<()>> {
    let mut query_builder = QueryBuilder::new("SELECT * FROM agencies");
    if filter.active_only.unwrap_or(false) {
        query_builder.push(" WHERE is_active = TRUE");
    }
    query_builder.push(" ORDER BY name ASC");

    let agencies = query_builder
        .build_query_as::<Agency>()
        .fetch_all(&pool)
        .await
        .map_err(|e| ApiResponse::db_error("Failed to retrieve Agencies", e))?;

    Ok(ApiResponse::success(
        StatusCode::OK,
        "Agencies retrieved successfully",
        agencies,
    ))
}

#[utoipa::path(
    get,
    path = "/agencies/{id}",
    params(
        ("id" = Uuid, Path, description = "Agency ID")
    ),
    responses(
        (status = 200, description = "Retrieve a single agency", body = Agency),
        (status = 404, description = "Agency not found")
    ),
    tag = "Agencies",
    security(("bearerAuth" = []))
)]
pub async fn get_agency(
    State(pool): State<PgPool>,
    Path(id): Path<Uuid>,
) -> Result<ApiResponse<Agency>, ApiResponse<()>> {
    let agency = sqlx::query_as::<_, Agency>("SELECT * FROM agencies WHERE id = $1")
        .bind(id)
        .fetch_optional(&pool)
        .await
        .map_err(|e| ApiResponse::db_error("Failed to retrieve Agency", e))?
        .ok_or_else(|| {
            ApiResponse::<()>::error(StatusCode::NOT_FOUND, "Agency not found", None)
        })?;

    Ok(ApiResponse::success(
        StatusCode::OK,
        "Agency retrieved successfully",
        agency,
    ))
}

#[utoipa::path(
    post,
    path = "/agencies",
    request_body = NewAgency,
    responses(
        (status = 201, description = "Agency created successfully", body = Agency),
        (status = 403, description = "Caller is not an admin"),
        (status = 500, description = "Failed to create agency")
    ),
    tag = "Agencies",
    security(("bearerAuth" = []))
)]
pub async fn create_agency(
    State(pool): State<PgPool>,
    Extension(current_user): Extension<CurrentUser>,
    Json(payload): Json<NewAgency>,
) -> Result<ApiResponse<Agency>, ApiResponse<()>> {
    if !current_user.is_admin() {
        return Err(ApiResponse::<()>::error(
            StatusCode::FORBIDDEN,
            "Admin role required",
            None,
        ));
    }

    if payload.name.trim().is_empty() {
        return Err(ApiResponse::<()>::error(
            StatusCode::BAD_REQUEST,
            "Agency name required",
            None,
        ));
    }

    let agency = sqlx::query_as::<_, Agency>(
        r#"
        INSERT INTO agencies (name, contact_person, email, phone, address, notes)
        VALUES ($1, $2, $3, $4, $5, $6)
        RETURNING *
        "#,
    )
    .bind(&payload.name)
    .bind(&payload.contact_person)
    .bind(&payload.email)
    .bind(&payload.phone)
    .bind(&payload.address)
    .bind(&payload.notes)
    .fetch_one(&pool)
    .await
    .map_err(|e| ApiResponse::db_error("Failed to create Agency", e))?;

    Ok(ApiResponse::success(
        StatusCode::CREATED,
        "Agency created successfully",
        agency,
    ))
}

#[utoipa::path(
    put,
    path = "/agencies/{id}",
    request_body = UpdateAgency,
    params(
        ("id" = Uuid, Path, description = "Agency ID")
    ),
    responses(
        (status = 200, description = "Agency updated successfully", body = Agency),
        (status = 403, description = "Caller is not an admin"),
        (status = 404, description = "Agency not found"),
        (status = 500, description = "Failed to update agency")
    ),
    tag = "Agencies",
    security(("bearerAuth" = []))
)]
pub async fn update_agency(
    State(pool): State<PgPool>,
    Extension(current_user): Extension<CurrentUser>,
    Path(id): Path<Uuid>,
    Json(update): Json<UpdateAgency>,
) -> Result<ApiResponse<Agency>, ApiResponse<()>> {
    if !current_user.is_admin() {
        return Err(ApiResponse::<()>::error(
            StatusCode::FORBIDDEN,
            "Admin role required",
            None,
        ));
    }

    let mut query_builder = QueryBuilder::new("UPDATE agencies SET ");
    let mut first = true;

    if let Some(name) = &update.name {
        if !first { query_builder.push(", "); }
        query_builder.push("name = ").push_bind(name);
        first = false;
    }
    if let Some(contact_person) = &update.contact_person {
        if !first { query_builder.push(", "); }
        query_builder.push("contact_person = ").push_bind(contact_person);
        first = false;
    }
    if let Some(email) = &update.email {
        if !first { query_builder.push(", "); }
        query_builder.push("email = ").push_bind(email);
        first = false;
    }
    if let Some(phone) = &update.phone {
        if !first { query_builder.push(", "); }
        query_builder.push("phone = ").push_bind(phone);
        first = false;
    }
    if let Some(address) = &update.address {
        if !first { query_builder.push(", "); }
        query_builder.push("address = ").push_bind(address);
        first = false;
    }
    if let Some(notes) = &update.notes {
        if !first { query_builder.push(", "); }
        query_builder.push("notes = ").push_bind(notes);
        first = false;
    }
    if let Some(is_active) = update.is_active {
        if !first { query_builder.push(", "); }
        query_builder.push("is_active = ").push_bind(is_active);
        first = false;
    }

    if !first { query_builder.push(", "); }
    query_builder.push("updated_at = NOW()");
    query_builder.push(" WHERE id = ").push_bind(id);
    query_builder.push(" RETURNING *");

    let agency = query_builder
        .build_query_as::<Agency>()
        .fetch_optional(&pool)
        .await
        .map_err(|e| ApiResponse::db_error("Failed to update Agency", e))?
        .ok_or_else(|| {
            ApiResponse::<()>::error(StatusCode::NOT_FOUND, "Agency not found", None)
        })?;

    Ok(ApiResponse::success(
        StatusCode::OK,
        "Agency updated successfully",
        agency,
    ))
}

#[utoipa::path(
    delete,
    path = "/agencies/{id}",
    params(
        ("id" = Uuid, Path, description = "Agency ID")
    ),
    responses(
        (status = 200, description = "Agency deleted successfully"),
        (status = 403, description = "Caller is not an admin"),
        (status = 404, description = "Agency not found"),
        (status = 500, description = "Failed to delete agency")
    ),
    tag = "Agencies",
    security(("bearerAuth" = []))
)]
pub async fn delete_agency(
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

    let result = sqlx::query("DELETE FROM agencies WHERE id = $1")
        .bind(id)
        .execute(&pool)
        .await
        .map_err(|e| ApiResponse::db_error("Failed to delete Agency", e))?;

    if result.rows_affected() == 0 {
        return Err(ApiResponse::<()>::error(
            StatusCode::NOT_FOUND,
            "Agency not found",
            None,
        ));
    }

    Ok(ApiResponse::success(
        StatusCode::OK,
        "Agency deleted successfully",
        (),
    ))
}

use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    paths(get_all_agencies, get_agency, create_agency, update_agency, delete_agency),
    components(schemas(Agency, AgencyBrief, NewAgency, UpdateAgency)),
    tags(
        (name = "Agencies", description = "Agency cover endpoints")
    )
)]
pub struct AgencyDoc;
