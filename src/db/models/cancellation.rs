use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::db::models::swap::SwapRotaDetail;
use crate::db::models::user::UserBrief;

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, sqlx::Type, ToSchema)]
#[sqlx(type_name = "cancellation_reason", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum CancellationReason {
    Sick,
    Emergency,
    Personal,
    Other,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, sqlx::Type, ToSchema)]
#[sqlx(type_name = "cancellation_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum CancellationStatus {
    Pending,
    Approved,
    Rejected,
}

/// A staff request to drop one rostered shift, resolved once by an admin.
/// `original_date` and `original_shift_name` snapshot the entry at request
/// time so the audit trail survives later roster mutation.
#[derive(Serialize, Deserialize, Debug, Clone, FromRow, ToSchema)]
pub struct ShiftCancellation {
    pub id: Uuid,
    pub rota_id: Uuid,
    pub user_id: Uuid,
    pub reason: CancellationReason,
    pub reason_details: Option<String>,
    pub status: CancellationStatus,
    pub approved_by: Option<Uuid>,
    pub approved_at: Option<DateTime<Utc>>,
    pub original_date: NaiveDate,
    pub original_shift_name: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct NewCancellation {
    pub rota_id: Uuid,
    pub reason: CancellationReason,
    pub reason_details: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CancellationDecision {
    pub response: CancellationStatus,
}

#[derive(Debug, Deserialize, Default, IntoParams, ToSchema)]
pub struct CancellationFilter {
    pub status: Option<CancellationStatus>,
}

#[derive(Serialize, Deserialize, Debug, Clone, ToSchema)]
pub struct CancellationDetail {
    #[serde(flatten)]
    pub cancellation: ShiftCancellation,
    pub user: UserBrief,
    pub rota: Option<SwapRotaDetail>,
    pub approver: Option<UserBrief>,
}

/// Aggregate counts returned alongside a user's cancellation history.
#[derive(Debug, Default, Serialize, PartialEq, Eq, ToSchema)]
pub struct CancellationStats {
    pub total: usize,
    pub approved: usize,
    pub rejected: usize,
    pub pending: usize,
    pub sick: usize,
    pub emergency: usize,
    pub personal: usize,
    pub other: usize,
}

impl CancellationStats {
    pub fn tally<'a>(items: impl IntoIterator<Item = &'a ShiftCancellation>) -> Self {
        let mut stats = Self::default();
        for c in items {
            stats.total += 1;
            match c.status {
                CancellationStatus::Approved => stats.approved += 1,
                CancellationStatus::Rejected => stats.rejected += 1,
                CancellationStatus::Pending => stats.pending += 1,
            }
            match c.reason {
                CancellationReason::Sick => stats.sick += 1,
                CancellationReason::Emergency => stats.emergency += 1,
                CancellationReason::Personal => stats.personal += 1,
                CancellationReason::Other => stats.other += 1,
            }
        }
        stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cancellation(
        status: CancellationStatus,
        reason: CancellationReason,
    ) -> ShiftCancellation {
        ShiftCancellation {
            id: Uuid::new_v4(),
            rota_id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            reason,
            reason_details: None,
            status,
            approved_by: None,
            approved_at: None,
            original_date: chrono::NaiveDate::from_ymd_opt(2025, 6, 2).unwrap(),
            original_shift_name: Some("Early".into()),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn tally_counts_status_and_reason() {
        let items = vec![
            cancellation(CancellationStatus::Approved, CancellationReason::Sick),
            cancellation(CancellationStatus::Approved, CancellationReason::Personal),
            cancellation(CancellationStatus::Rejected, CancellationReason::Other),
            cancellation(CancellationStatus::Pending, CancellationReason::Sick),
        ];

        let stats = CancellationStats::tally(&items);
        assert_eq!(stats.total, 4);
        assert_eq!(stats.approved, 2);
        assert_eq!(stats.rejected, 1);
        assert_eq!(stats.pending, 1);
        assert_eq!(stats.sick, 2);
        assert_eq!(stats.personal, 1);
        assert_eq!(stats.other, 1);
        assert_eq!(stats.emergency, 0);
    }

    #[test]
    fn tally_of_nothing_is_zero() {
        assert_eq!(CancellationStats::tally(&[]), CancellationStats::default());
    }
}
