use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};

use bcrypt::{hash, DEFAULT_COST};
use serde_json::json;
use sqlx::{PgPool, QueryBuilder};
use uuid::Uuid;

use crate::db::models::user::{NewUser, UpdateUser, User, UserBrief, UserFilter, UserRole};
use crate::middleware::auth::CurrentUser;
use crate::utils::api_response::ApiResponse;

fn require_admin(current_user: &CurrentUser) -> Result<(), ApiResponse<()>> {
    if current_user.is_admin() {
        Ok(())
    } else {
        Err(ApiResponse::<()>::error(
            StatusCode::FORBIDDEN,
            "Admin role required",
            None,
        ))
    }
}

#[utoipa::path(
    get,
    path = "/users",
    params(UserFilter),
    responses(
        (status = 200, description = "List all users", body = [User]),
        (status = 403, description = "Caller is not an admin"),
        (status = 500, description = "Failed to retrieve users")
    ),
    tag = "Users",
    security(("bearerAuth" = []))
)]
pub async fn get_all_users(
    State(pool): State<PgPool>,
    Extension(current_user): Extension<CurrentUser>,
    Query(filter): Query<UserFilter>,
) -> Result<ApiResponse<Vec<User>>, ApiResponse<()>> {
    require_admin(&current_user)?;

    let mut query_builder = QueryBuilder::new("SELECT * FROM users WHERE TRUE");
    if let Some(role) = filter.role {
        query_builder.push(" AND role = ").push_bind(role);
    }
    if let Some(search) = &filter.search {
        let pattern = format!("%{}%", search);
        query_builder
            .push(" AND (name ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR email ILIKE ")
            .push_bind(pattern)
            .push(")");
    }
    query_builder.push(" ORDER BY name ASC");

    let users = query_builder
        .build_query_as::<User>()
        .fetch_all(&pool)
        .await
        .map_err(|e| ApiResponse::db_error("Failed to retrieve Users", e))?;

    Ok(ApiResponse::success(
        StatusCode::OK,
        "Users retrieved successfully",
        users,
    ))
}

#[utoipa::path(
    get,
    path = "/users/{id}",
    params(
        ("id" = Uuid, Path, description = "User ID")
    ),
    responses(
        (status = 200, description = "Retrieve a single user", body = User),
        (status = 404, description = "User not found")
    ),
    tag = "Users",
    security(("bearerAuth" = []))
)]
pub async fn get_user(
    State(pool): State<PgPool>,
    Extension(current_user): Extension<CurrentUser>,
    Path(id): Path<Uuid>,
) -> Result<ApiResponse<User>, ApiResponse<()>> {
    require_admin(&current_user)?;

    let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
        .bind(id)
        .fetch_optional(&pool)
        .await
        .map_err(|e| ApiResponse::db_error("Failed to retrieve User", e))?
        .ok_or_else(|| ApiResponse::<()>::error(StatusCode::NOT_FOUND, "User not found", None))?;

    Ok(ApiResponse::success(
        StatusCode::OK,
        "User retrieved successfully",
        user,
    ))
}

#[utoipa::path(
    post,
    path = "/users",
    request_body = NewUser,
    responses(
        (status = 201, description = "User created successfully", body = User),
        (status = 403, description = "Caller is not an admin"),
        (status = 409, description = "Email already registered"),
        (status = 500, description = "Failed to create user")
    ),
    tag = "Users",
    security(("bearerAuth" = []))
)]
pub async fn create_user(
    State(pool): State<PgPool>,
    Extension(current_user): Extension<CurrentUser>,
    Json(payload): Json<NewUser>,
) -> Result<ApiResponse<User>, ApiResponse<()>> {
    require_admin(&current_user)?;

    if !payload.email.contains('@') {
        return Err(ApiResponse::<()>::error(
            StatusCode::BAD_REQUEST,
            "Valid email required",
            None,
        ));
    }
    if payload.password.len() < 6 {
        return Err(ApiResponse::<()>::error(
            StatusCode::BAD_REQUEST,
            "Password must be at least 6 characters",
            None,
        ));
    }

    let password_hash = hash(&payload.password, DEFAULT_COST).map_err(|e| {
        ApiResponse::<()>::error(
            StatusCode::INTERNAL_SERVER_ERROR,
            "Password hashing failed",
            Some(json!({ "error": e.to_string() })),
        )
    })?;

    let result = sqlx::query_as::<_, User>(
        r#"
        INSERT INTO users (email, password_hash, name, role, phone)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING *
        "#,
    )
    .bind(&payload.email)
    .bind(&password_hash)
    .bind(&payload.name)
    .bind(payload.role.unwrap_or(UserRole::Staff))
    .bind(&payload.phone)
    .fetch_one(&pool)
    .await;

    match result {
        Ok(user) => Ok(ApiResponse::success(
            StatusCode::CREATED,
            "User created successfully",
            user,
        )),
        Err(e) => {
            if let Some(db_err) = e.as_database_error() {
                if db_err.code().map(|code| code == "23505").unwrap_or(false) {
                    return Err(ApiResponse::<()>::error(
                        StatusCode::CONFLICT,
                        "Email already registered",
                        None,
                    ));
                }
            }
            Err(ApiResponse::db_error("Failed to create User", e))
        }
    }
}

#[utoipa::path(
    put,
    path = "/users/{id}",
    request_body = UpdateUser,
    params(
        ("id" = Uuid, Path, description = "User ID")
    ),
    responses(
        (status = 200, description = "User updated successfully"),
        (status = 400, description = "No fields provided for update"),
        (status = 404, description = "User not found"),
        (status = 409, description = "Email already in use"),
        (status = 500, description = "Failed to update user")
    ),
    tag = "Users",
    security(("bearerAuth" = []))
)]
pub async fn update_user(
    State(pool): State<PgPool>,
    Extension(current_user): Extension<CurrentUser>,
    Path(id): Path<Uuid>,
    Json(update): Json<UpdateUser>,
) -> Result<ApiResponse<()>, ApiResponse<()>> {
    require_admin(&current_user)?;

    if update.is_empty() {
        return Err(ApiResponse::<()>::error(
            StatusCode::BAD_REQUEST,
            "No fields provided for update",
            None,
        ));
    }

    let mut query_builder = QueryBuilder::new("UPDATE users SET ");
    let mut first = true; // Controls comma placement

    if let Some(name) = &update.name {
        if !first { query_builder.push(", "); }
        query_builder.push("name = ").push_bind(name);
        first = false;
    }
    if let Some(email) = &update.email {
        if !first { query_builder.push(", "); }
        query_builder.push("email = ").push_bind(email);
        first = false;
    }
    if let Some(password) = &update.password {
        let password_hash = hash(password, DEFAULT_COST).map_err(|e| {
            ApiResponse::<()>::error(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Password hashing failed",
                Some(json!({ "error": e.to_string() })),
            )
        })?;
        if !first { query_builder.push(", "); }
        query_builder.push("password_hash = ").push_bind(password_hash);
        first = false;
    }
    if let Some(phone) = &update.phone {
        if !first { query_builder.push(", "); }
        query_builder.push("phone = ").push_bind(phone);
        first = false;
    }
    if let Some(role) = update.role {
        if !first { query_builder.push(", "); }
        query_builder.push("role = ").push_bind(role);
        first = false;
    }
    if let Some(position) = &update.position {
        if !first { query_builder.push(", "); }
        query_builder.push("position = ").push_bind(position);
        first = false;
    }
    if let Some(department) = &update.department {
        if !first { query_builder.push(", "); }
        query_builder.push("department = ").push_bind(department);
        first = false;
    }

    // Always update timestamp
    if !first { query_builder.push(", "); }
    query_builder.push("updated_at = NOW()");

    // WHERE clause
    query_builder.push(" WHERE id = ").push_bind(id);

    let result = query_builder.build().execute(&pool).await.map_err(|e| {
        if let Some(db_err) = e.as_database_error() {
            if db_err.code().map(|code| code == "23505").unwrap_or(false) {
                return ApiResponse::<()>::error(
                    StatusCode::CONFLICT,
                    "Email already in use",
                    None,
                );
            }
        }
        ApiResponse::db_error("Failed to update User", e)
    })?;

    if result.rows_affected() == 0 {
        return Err(ApiResponse::<()>::error(
            StatusCode::NOT_FOUND,
            "User not found",
            None,
        ));
    }

    Ok(ApiResponse::success(
        StatusCode::OK,
        "User updated successfully",
        (),
    ))
}

#[utoipa::path(
    delete,
    path = "/users/{id}",
    params(
        ("id" = Uuid, Path, description = "User ID")
    ),
    responses(
        (status = 200, description = "User deleted successfully"),
        (status = 400, description = "Cannot delete yourself"),
        (status = 404, description = "User not found"),
        (status = 500, description = "Failed to delete user")
    ),
    tag = "Users",
    security(("bearerAuth" = []))
)]
pub async fn delete_user(
    State(pool): State<PgPool>,
    Extension(current_user): Extension<CurrentUser>,
    Path(id): Path<Uuid>,
) -> Result<ApiResponse<()>, ApiResponse<()>> {
    require_admin(&current_user)?;

    if id == current_user.id {
        return Err(ApiResponse::<()>::error(
            StatusCode::BAD_REQUEST,
            "Cannot delete yourself",
            None,
        ));
    }

    let result = sqlx::query("DELETE FROM users WHERE id = $1")
        .bind(id)
        .execute(&pool)
        .await
        .map_err(|e| ApiResponse::db_error("Failed to delete User", e))?;

    if result.rows_affected() == 0 {
        return Err(ApiResponse::<()>::error(
            StatusCode::NOT_FOUND,
            "User not found",
            None,
        ));
    }

    Ok(ApiResponse::success(
        StatusCode::OK,
        "User deleted successfully",
        (),
    ))
}

use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    paths(
        get_all_users,
        get_user,
        create_user,
        update_user,
        delete_user,
    ),
    components(
        schemas(User, UserBrief, NewUser, UpdateUser, UserRole)
    ),
    tags(
        (name = "Users", description = "User Management API")
    )
)]
pub struct UserDoc;
