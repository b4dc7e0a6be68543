//! Shared fixtures for the workflow tests. Every helper seeds rows under
//! fresh UUIDs so the tests can share one database and still run in
//! parallel.

use chrono::{NaiveDate, NaiveTime};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use uuid::Uuid;

use crate::db::models::rota::Rota;
use crate::db::models::shift::Shift;
use crate::db::models::user::UserRole;
use crate::middleware::auth::CurrentUser;
use crate::utils::api_response::ApiResponse;

pub async fn test_pool() -> PgPool {
    let url = std::env::var("DATABASE_URL").expect("DATABASE_URL must point at a test database");
    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&url)
        .await
        .expect("failed to connect to test database");
    sqlx::migrate!().run(&pool).await.expect("migrations failed");
    pool
}

pub fn date(s: &str) -> NaiveDate {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").expect("bad test date")
}

/// Unwraps the data payload of a success response.
pub fn data<T>(resp: ApiResponse<T>) -> T {
    assert!(resp.success, "expected a success response: {}", resp.message);
    resp.data.expect("success response carries data")
}

pub async fn seed_user(pool: &PgPool, role: UserRole) -> CurrentUser {
    let tag = Uuid::new_v4().simple().to_string();
    let name = format!("Test User {}", &tag[..8]);
    let email = format!("{tag}@example.test");

    let id: Uuid = sqlx::query_scalar(
        r#"
        INSERT INTO users (email, password_hash, name, role)
        VALUES ($1, 'unusable-hash', $2, $3)
        RETURNING id
        "#,
    )
    .bind(&email)
    .bind(&name)
    .bind(role)
    .fetch_one(pool)
    .await
    .expect("failed to seed user");

    CurrentUser { id, name, email, role }
}

pub async fn seed_shift(pool: &PgPool, name: &str, start: (u32, u32), end: (u32, u32)) -> Shift {
    sqlx::query_as::<_, Shift>(
        r#"
        INSERT INTO shifts (name, start_time, end_time)
        VALUES ($1, $2, $3)
        RETURNING *
        "#,
    )
    .bind(name)
    .bind(NaiveTime::from_hms_opt(start.0, start.1, 0).expect("bad start time"))
    .bind(NaiveTime::from_hms_opt(end.0, end.1, 0).expect("bad end time"))
    .fetch_one(pool)
    .await
    .expect("failed to seed shift")
}

pub async fn seed_rota(
    pool: &PgPool,
    user: &CurrentUser,
    shift: &Shift,
    on: NaiveDate,
    created_by: &CurrentUser,
) -> Rota {
    sqlx::query_as::<_, Rota>(
        r#"
        INSERT INTO rotas (user_id, shift_id, date, created_by)
        VALUES ($1, $2, $3, $4)
        RETURNING *
        "#,
    )
    .bind(user.id)
    .bind(shift.id)
    .bind(on)
    .bind(created_by.id)
    .fetch_one(pool)
    .await
    .expect("failed to seed rota")
}

pub async fn fetch_rota(pool: &PgPool, id: Uuid) -> Rota {
    sqlx::query_as::<_, Rota>("SELECT * FROM rotas WHERE id = $1")
        .bind(id)
        .fetch_one(pool)
        .await
        .expect("rota should exist")
}

/// Roster entries belonging to the given users, regardless of status.
pub async fn rota_count_for(pool: &PgPool, users: &[Uuid]) -> i64 {
    sqlx::query_scalar("SELECT COUNT(*) FROM rotas WHERE user_id = ANY($1)")
        .bind(users)
        .fetch_one(pool)
        .await
        .expect("failed to count rotas")
}

pub async fn notification_count(pool: &PgPool, user_id: Uuid, kind: &str) -> i64 {
    sqlx::query_scalar("SELECT COUNT(*) FROM notifications WHERE user_id = $1 AND kind = $2")
        .bind(user_id)
        .bind(kind)
        .fetch_one(pool)
        .await
        .expect("failed to count notifications")
}
