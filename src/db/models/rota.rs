use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::db::models::agency::AgencyBrief;
use crate::db::models::shift::Shift;
use crate::db::models::user::UserBrief;

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, sqlx::Type, ToSchema)]
#[sqlx(type_name = "rota_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum RotaStatus {
    Active,
    Cancelled,
    Swapped,
}

/// One roster entry: a staff member (or agency) assigned to one shift on one
/// date. At most one active entry may exist per (user, date).
#[derive(Serialize, Deserialize, Debug, Clone, FromRow, ToSchema)]
pub struct Rota {
    pub id: Uuid,
    pub user_id: Option<Uuid>,
    pub agency_id: Option<Uuid>,
    pub shift_id: Uuid,
    pub date: NaiveDate,
    pub notes: Option<String>,
    pub status: RotaStatus,
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct NewRota {
    pub user_id: Option<Uuid>,
    pub agency_id: Option<Uuid>,
    pub shift_id: Uuid,
    pub date: NaiveDate,
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct BulkRotaRequest {
    pub entries: Vec<BulkRotaEntry>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct BulkRotaEntry {
    pub user_id: Uuid,
    pub shift_id: Uuid,
    pub date: NaiveDate,
    pub notes: Option<String>,
}

/// Per-entry failure reported by bulk creation; failed entries are skipped,
/// the rest are still created.
#[derive(Debug, Serialize, ToSchema)]
pub struct BulkRotaError {
    pub user_id: Uuid,
    pub date: NaiveDate,
    pub message: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct BulkRotaResult {
    pub created: usize,
    pub errors: Vec<BulkRotaError>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateRota {
    pub shift_id: Option<Uuid>,
    pub date: Option<NaiveDate>,
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize, Default, IntoParams, ToSchema)]
pub struct RotaFilter {
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub user_id: Option<Uuid>,
}

/// Roster entry with its references expanded for client display.
#[derive(Serialize, Deserialize, Debug, Clone, ToSchema)]
pub struct RotaDetail {
    #[serde(flatten)]
    pub rota: Rota,
    pub user: Option<UserBrief>,
    pub shift: Shift,
    pub creator: Option<UserBrief>,
    pub agency: Option<AgencyBrief>,
}
