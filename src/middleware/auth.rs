use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Body,
    extract::{Extension, Request, State},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
};
use jsonwebtoken::{decode, DecodingKey, Validation};
use moka::sync::Cache; // ✅ High-performance TTL Cache
use serde::{Deserialize, Serialize};
use serde_json::json;
use sqlx::PgPool;
use tracing::error;
use uuid::Uuid;

use crate::api::auth::Claims;
use crate::config::Config;
use crate::db::models::user::UserRole;
use crate::utils::api_response::ApiResponse;

/// ✅ **Identity Cache Using `moka`**
///
/// Role changes take effect within the TTL without a DB hit per request.
pub type IdentityCache = Arc<Cache<Uuid, CurrentUser>>;

/// ✅ **Initialize the `moka` Cache**
pub fn create_identity_cache() -> IdentityCache {
    Arc::new(
        Cache::builder()
            .time_to_live(Duration::from_secs(600)) // ✅ TTL = 10 minutes
            .build(),
    )
}

/// The authenticated caller, resolved from the database (not just the token)
/// so role demotions and deletions are honored.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct CurrentUser {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub role: UserRole,
}

impl CurrentUser {
    pub fn is_admin(&self) -> bool {
        self.role == UserRole::Admin
    }
}

/// ✅ **JWT Middleware** (Handles Token Authentication)
pub async fn jwt_middleware(mut req: Request<Body>, next: Next) -> Result<Response, Response> {
    // Step 1: Extract Authorization header
    let auth_header = req.headers().get("Authorization").ok_or_else(|| {
        ApiResponse::<()>::error(StatusCode::UNAUTHORIZED, "Missing Authorization header", None)
            .into_response()
    })?;

    // Step 2: Convert header to string
    let token_str = auth_header.to_str().map_err(|_| {
        ApiResponse::<()>::error(
            StatusCode::BAD_REQUEST,
            "Invalid Authorization header format",
            None,
        )
        .into_response()
    })?;

    // Step 3: Strip "Bearer " prefix
    let token = token_str.strip_prefix("Bearer ").ok_or_else(|| {
        ApiResponse::<()>::error(
            StatusCode::BAD_REQUEST,
            "Invalid token format (missing 'Bearer ' prefix)",
            None,
        )
        .into_response()
    })?;

    // Step 4: Decode the JWT token
    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(Config::get().jwt_secret.as_bytes()),
        &Validation::default(),
    )
    .map_err(|e| {
        ApiResponse::<()>::error(
            StatusCode::UNAUTHORIZED,
            "Invalid token",
            Some(json!({ "error": e.to_string() })),
        )
        .into_response()
    })?;

    // Refresh tokens are for the /auth/refresh exchange only
    if token_data.claims.token_type.as_deref() == Some("refresh") {
        return Err(ApiResponse::<()>::error(
            StatusCode::UNAUTHORIZED,
            "Refresh token cannot be used for API access",
            None,
        )
        .into_response());
    }

    // Step 5: Insert claims into request extensions
    req.extensions_mut().insert(token_data.claims);

    // Step 6: Proceed to the next middleware
    Ok(next.run(req).await)
}

/// ✅ **Identity Middleware with `moka`**
///
/// Resolves the JWT subject to a [`CurrentUser`] row and attaches it for
/// handlers to make role/ownership decisions against.
pub async fn identity_middleware(
    State(db_pool): State<PgPool>,
    Extension(identity_cache): Extension<IdentityCache>, // ✅ Uses Axum **Extension**
    mut req: Request<Body>,
    next: Next,
) -> Result<Response, Response> {
    let claims = req.extensions().get::<Claims>().cloned().ok_or_else(|| {
        error!("Missing JWT claims in request");
        ApiResponse::<()>::error(StatusCode::UNAUTHORIZED, "Missing JWT claims in request", None)
            .into_response()
    })?;

    let user_id: Uuid = claims.sub.parse().map_err(|_| {
        error!("Invalid user ID format in JWT claims");
        ApiResponse::<()>::error(
            StatusCode::UNAUTHORIZED,
            "Invalid user ID format in JWT claims",
            None,
        )
        .into_response()
    })?;

    // ✅ **Check cache first before querying DB**
    if let Some(cached) = identity_cache.get(&user_id) {
        req.extensions_mut().insert(cached);
        return Ok(next.run(req).await);
    }

    // ❌ **If not cached, query database**
    let current_user = match fetch_current_user(user_id, &db_pool).await {
        Ok(Some(user)) => user,
        Ok(None) => {
            return Err(ApiResponse::<()>::error(
                StatusCode::UNAUTHORIZED,
                "User no longer exists",
                None,
            )
            .into_response());
        }
        Err(err) => {
            error!("Database query failed: {:?}", err);
            return Err(ApiResponse::<()>::error(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to load user identity",
                Some(json!({ "error": err.to_string() })),
            )
            .into_response());
        }
    };

    // ✅ **Cache the retrieved identity**
    identity_cache.insert(user_id, current_user.clone());

    // ✅ **Attach to request & continue**
    req.extensions_mut().insert(current_user);
    Ok(next.run(req).await)
}

async fn fetch_current_user(
    user_id: Uuid,
    pool: &PgPool,
) -> Result<Option<CurrentUser>, sqlx::Error> {
    #[derive(sqlx::FromRow)]
    struct Row {
        id: Uuid,
        name: String,
        email: String,
        role: UserRole,
    }

    let row = sqlx::query_as::<_, Row>("SELECT id, name, email, role FROM users WHERE id = $1")
        .bind(user_id)
        .fetch_optional(pool)
        .await?;

    Ok(row.map(|r| CurrentUser {
        id: r.id,
        name: r.name,
        email: r.email,
        role: r.role,
    }))
}
