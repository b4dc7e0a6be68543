use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, sqlx::Type, ToSchema)]
#[sqlx(type_name = "user_role", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    Admin,
    Staff,
}

#[derive(Serialize, Deserialize, Debug, Clone, FromRow, ToSchema)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub name: String,
    pub role: UserRole,
    pub phone: Option<String>,
    pub position: Option<String>,
    pub department: Option<String>,
    pub employee_id: Option<String>,
    pub hire_date: Option<NaiveDate>,
    pub emergency_contact: Option<String>,
    pub emergency_phone: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct NewUser {
    pub email: String,
    pub password: String, // Raw password, will be hashed
    pub name: String,
    pub role: Option<UserRole>,
    pub phone: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateUser {
    pub name: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>, // Raw password, will be hashed
    pub phone: Option<String>,
    pub role: Option<UserRole>,
    pub position: Option<String>,
    pub department: Option<String>,
}

impl UpdateUser {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.email.is_none()
            && self.password.is_none()
            && self.phone.is_none()
            && self.role.is_none()
            && self.position.is_none()
            && self.department.is_none()
    }
}

#[derive(Debug, Deserialize, Default, utoipa::IntoParams, ToSchema)]
pub struct UserFilter {
    pub role: Option<UserRole>,
    pub search: Option<String>,
}

/// Slim user shape embedded in expanded rota/swap/cancellation payloads.
#[derive(Serialize, Deserialize, Debug, Clone, FromRow, ToSchema)]
pub struct UserBrief {
    pub id: Uuid,
    pub name: String,
    pub email: String,
}
