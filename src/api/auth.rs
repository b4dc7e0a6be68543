use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Extension, Json, Router,
};
use bcrypt::{hash, verify, DEFAULT_COST};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use serde_json::json;
use sqlx::PgPool;
use tracing::{info, warn};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::db::models::user::{User, UserRole};
use crate::middleware::auth::CurrentUser;
use crate::{config::Config, utils::api_response::ApiResponse};

/// JWT Claims used for authentication.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    /// Subject - User ID as String
    pub sub: String,
    /// Display name of the authenticated user.
    pub name: String,
    /// the role assigned to the user
    pub role: String,
    /// Expiration timestamp (UNIX TIME)
    pub exp: usize,
    /// "refresh" on refresh tokens, absent on access tokens
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token_type: Option<String>,
}

impl Claims {
    /// Converts `sub` (user ID) to `Uuid`, or returns a descriptive error.
    pub fn user_id(&self) -> Result<Uuid, ApiResponse<()>> {
        self.sub.parse::<Uuid>().map_err(|_| {
            ApiResponse::error(StatusCode::BAD_REQUEST, "Invalid user ID format in token", None)
        })
    }
}

/// Represents a request to log in
#[derive(Serialize, Debug, Deserialize, ToSchema)]
pub struct LoginRequest {
    /// Email for authentication
    pub email: String,
    /// Password for authentication
    pub password: String,
}

/// Represents a successful login response returning the token pair.
#[derive(Serialize, ToSchema)]
pub struct TokenResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub user: User,
}

/// Represents a request to register a new user (admin only).
#[derive(Deserialize, ToSchema)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    pub name: String,
    pub role: Option<UserRole>,
    pub phone: Option<String>,
}

#[derive(Deserialize, ToSchema)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

#[derive(Serialize, ToSchema)]
pub struct RefreshResponse {
    pub access_token: String,
    pub refresh_token: String,
}

fn issue_token(user: &User, ttl_secs: i64, token_type: Option<&str>) -> Result<String, jsonwebtoken::errors::Error> {
    let claims = Claims {
        sub: user.id.to_string(),
        name: user.name.clone(),
        role: match user.role {
            UserRole::Admin => "admin".to_string(),
            UserRole::Staff => "staff".to_string(),
        },
        exp: (chrono::Utc::now().timestamp() + ttl_secs) as usize,
        token_type: token_type.map(|t| t.to_string()),
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(Config::get().jwt_secret.as_bytes()),
    )
}

/// Access + refresh pair for one user.
fn issue_token_pair(user: &User) -> Result<(String, String), jsonwebtoken::errors::Error> {
    let config = Config::get();
    let access = issue_token(user, config.access_token_ttl_secs, None)?;
    let refresh = issue_token(user, config.refresh_token_ttl_secs, Some("refresh"))?;
    Ok((access, refresh))
}

async fn fetch_user_by_id(pool: &PgPool, id: Uuid) -> Result<Option<User>, sqlx::Error> {
    sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await
}

/// Handles user login.
///
/// # Returns
/// * `200 OK` - Returns an access/refresh token pair if authentication succeeds.
/// * `401 Unauthorized` - If credentials are incorrect.
/// * `500 Internal Server Error` - If a database or token generation error occurs.
#[utoipa::path(
    post,
    path = "/auth/login",
    tag = "Authentication",
    request_body(
        content = LoginRequest,
        description = "User login details",
    ),
    responses(
        (status = 200, description = "Successful login", body = TokenResponse),
        (status = 401, description = "Invalid email or password"),
        (status = 500, description = "Internal Server Error")
    )
)]
pub async fn login(
    State(pool): State<PgPool>,
    Json(payload): Json<LoginRequest>,
) -> Result<ApiResponse<TokenResponse>, ApiResponse<()>> {
    let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE email = $1")
        .bind(&payload.email)
        .fetch_optional(&pool)
        .await
        .map_err(|e| ApiResponse::db_error("Database error", e))?;

    let Some(user) = user else {
        warn!("❌ Login attempt for non-existent user: {}", payload.email);
        return Err(ApiResponse::<()>::error(
            StatusCode::UNAUTHORIZED,
            "Invalid email or password.",
            None,
        ));
    };

    match verify(&payload.password, &user.password_hash) {
        Ok(true) => {}
        Ok(false) => {
            warn!("❌ Invalid password attempt for user: {}", payload.email);
            return Err(ApiResponse::<()>::error(
                StatusCode::UNAUTHORIZED,
                "Invalid email or password.",
                None,
            ));
        }
        Err(e) => {
            return Err(ApiResponse::<()>::error(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Password verification error",
                Some(json!({ "error": e.to_string() })),
            ));
        }
    }

    let (access_token, refresh_token) = issue_token_pair(&user).map_err(|e| {
        ApiResponse::<()>::error(
            StatusCode::INTERNAL_SERVER_ERROR,
            "Token generation failed",
            Some(json!({ "error": e.to_string() })),
        )
    })?;

    info!("✅ Login successful for user: {}", payload.email);
    Ok(ApiResponse::success(
        StatusCode::OK,
        "Login successful",
        TokenResponse { access_token, refresh_token, user },
    ))
}

/// Handles user registration. Admin only; new accounts default to staff.
///
/// # Returns
/// * `201 Created` - If registration is successful.
/// * `400 Bad Request` - If the payload fails validation.
/// * `409 Conflict` - If the email is already registered.
#[utoipa::path(
    post,
    path = "/auth/register",
    request_body = RegisterRequest,
    tag = "Authentication",
    responses(
        (status = 201, description = "User registered", body = User),
        (status = 400, description = "Invalid payload"),
        (status = 403, description = "Caller is not an admin"),
        (status = 409, description = "Email already registered"),
        (status = 500, description = "Internal Server Error")
    ),
    security(("bearerAuth" = []))
)]
pub async fn register(
    State(pool): State<PgPool>,
    Extension(current_user): Extension<CurrentUser>,
    Json(payload): Json<RegisterRequest>,
) -> Result<ApiResponse<User>, ApiResponse<()>> {
    if !current_user.is_admin() {
        return Err(ApiResponse::<()>::error(
            StatusCode::FORBIDDEN,
            "Only admins can register users",
            None,
        ));
    }

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
    if payload.name.trim().is_empty() {
        return Err(ApiResponse::<()>::error(StatusCode::BAD_REQUEST, "Name required", None));
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
        Ok(user) => Ok(ApiResponse::success(StatusCode::CREATED, "User registered", user)),
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
            Err(ApiResponse::db_error("Database error", e))
        }
    }
}

/// Exchanges a refresh token for a fresh token pair.
#[utoipa::path(
    post,
    path = "/auth/refresh",
    tag = "Authentication",
    request_body = RefreshRequest,
    responses(
        (status = 200, description = "Tokens refreshed", body = RefreshResponse),
        (status = 401, description = "Invalid or expired refresh token"),
        (status = 500, description = "Internal Server Error")
    )
)]
pub async fn refresh(
    State(pool): State<PgPool>,
    Json(payload): Json<RefreshRequest>,
) -> Result<ApiResponse<RefreshResponse>, ApiResponse<()>> {
    let token_data = decode::<Claims>(
        &payload.refresh_token,
        &DecodingKey::from_secret(Config::get().jwt_secret.as_bytes()),
        &Validation::default(),
    )
    .map_err(|e| {
        ApiResponse::<()>::error(
            StatusCode::UNAUTHORIZED,
            "Invalid refresh token",
            Some(json!({ "error": e.to_string() })),
        )
    })?;

    if token_data.claims.token_type.as_deref() != Some("refresh") {
        return Err(ApiResponse::<()>::error(
            StatusCode::UNAUTHORIZED,
            "Invalid refresh token",
            None,
        ));
    }

    let user_id = token_data.claims.user_id()?;
    let user = fetch_user_by_id(&pool, user_id)
        .await
        .map_err(|e| ApiResponse::db_error("Database error", e))?
        .ok_or_else(|| {
            ApiResponse::<()>::error(StatusCode::UNAUTHORIZED, "User not found", None)
        })?;

    let (access_token, refresh_token) = issue_token_pair(&user).map_err(|e| {
        ApiResponse::<()>::error(
            StatusCode::INTERNAL_SERVER_ERROR,
            "Token generation failed",
            Some(json!({ "error": e.to_string() })),
        )
    })?;

    Ok(ApiResponse::success(
        StatusCode::OK,
        "Tokens refreshed",
        RefreshResponse { access_token, refresh_token },
    ))
}

/// Returns the authenticated caller's profile.
#[utoipa::path(
    get,
    path = "/auth/me",
    tag = "Authentication",
    responses(
        (status = 200, description = "Current authenticated user", body = User),
        (status = 401, description = "Unauthorized")
    ),
    security(("bearerAuth" = []))
)]
pub async fn me(
    State(pool): State<PgPool>,
    Extension(current_user): Extension<CurrentUser>,
) -> Result<ApiResponse<User>, ApiResponse<()>> {
    let user = fetch_user_by_id(&pool, current_user.id)
        .await
        .map_err(|e| ApiResponse::db_error("Database error", e))?
        .ok_or_else(|| ApiResponse::<()>::error(StatusCode::NOT_FOUND, "User not found", None))?;

    Ok(ApiResponse::success(StatusCode::OK, "Authenticated user info", user))
}

/// Registers the public authentication routes for the API.
///
/// These routes **do not require authentication** and are publicly accessible.
///
/// # Routes
/// - `POST /auth/login` → Authenticate a user and return a JWT token pair.
/// - `POST /auth/refresh` → Exchange a refresh token for a fresh pair.
pub fn auth_routes() -> Router<PgPool> {
    Router::new()
        .route("/auth/login", post(login))
        .route("/auth/refresh", post(refresh))
}

/// Registers the **protected** authentication routes for the API.
///
/// # Routes
/// - `POST /auth/register` → Admin creates a new account.
/// - `GET /auth/me` → Current caller's profile.
pub fn secure_auth_routes() -> Router<PgPool> {
    Router::new()
        .route("/auth/register", post(register))
        .route("/auth/me", get(me))
}

use utoipa::openapi::security::{Http, HttpAuthScheme, SecurityScheme};
use utoipa::openapi::Components;
use utoipa::Modify;
use utoipa::OpenApi;

pub struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let mut components = openapi.components.clone().unwrap_or(Components::default());
        components.add_security_scheme(
            "bearerAuth",
            SecurityScheme::Http(Http::new(HttpAuthScheme::Bearer)),
        );
        openapi.components = Some(components);
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(login, register, refresh, me),
    components(
        schemas(
            LoginRequest, TokenResponse,
            RegisterRequest, RefreshRequest, RefreshResponse
        )
    ),
    tags(
        (name = "Authentication", description = "User Auth Endpoints")
    ),
    modifiers(&SecurityAddon)
)]
pub struct AuthDoc;
