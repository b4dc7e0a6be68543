use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::db::models::rota::Rota;
use crate::db::models::shift::Shift;
use crate::db::models::user::UserBrief;

/// Overall swap lifecycle state. Stored as a column for querying, but the
/// column is only ever written with the value computed by
/// [`SwapStatus::derive`] so the three fields cannot disagree.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, sqlx::Type, ToSchema)]
#[sqlx(type_name = "swap_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum SwapStatus {
    Pending,
    Accepted,
    Rejected,
    Approved,
    Cancelled,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, sqlx::Type, ToSchema)]
#[sqlx(type_name = "swap_target_response", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum TargetResponse {
    Pending,
    Accepted,
    Declined,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, sqlx::Type, ToSchema)]
#[sqlx(type_name = "swap_admin_response", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum AdminResponse {
    Pending,
    Approved,
    Rejected,
}

impl SwapStatus {
    /// The overall status is a pure function of the two response fields and
    /// the requester-cancelled flag. Every write of the status column goes
    /// through here.
    pub fn derive(target: TargetResponse, admin: AdminResponse, cancelled: bool) -> Self {
        if cancelled {
            return SwapStatus::Cancelled;
        }
        match (target, admin) {
            (TargetResponse::Declined, _) => SwapStatus::Rejected,
            (TargetResponse::Pending, _) => SwapStatus::Pending,
            (TargetResponse::Accepted, AdminResponse::Pending) => SwapStatus::Pending,
            (TargetResponse::Accepted, AdminResponse::Approved) => SwapStatus::Approved,
            (TargetResponse::Accepted, AdminResponse::Rejected) => SwapStatus::Rejected,
        }
    }

    /// Terminal states accept no further transitions.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            SwapStatus::Rejected | SwapStatus::Approved | SwapStatus::Cancelled
        )
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, FromRow, ToSchema)]
pub struct SwapRequest {
    pub id: Uuid,
    pub requester_id: Uuid,
    pub target_id: Uuid,
    pub requester_rota_id: Uuid,
    pub target_rota_id: Uuid,
    pub status: SwapStatus,
    pub target_response: TargetResponse,
    pub admin_response: AdminResponse,
    pub reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl SwapRequest {
    /// The target may answer exactly once, and only while the requester has
    /// not cancelled.
    pub fn target_may_respond(&self) -> bool {
        self.target_response == TargetResponse::Pending && self.status == SwapStatus::Pending
    }

    /// An admin may decide only after the target accepted and before any
    /// admin decision landed.
    pub fn admin_may_respond(&self) -> bool {
        self.target_response == TargetResponse::Accepted
            && self.admin_response == AdminResponse::Pending
            && self.status != SwapStatus::Cancelled
    }

    /// The requester may withdraw only while the request is still pending.
    pub fn requester_may_cancel(&self) -> bool {
        self.status == SwapStatus::Pending
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct NewSwapRequest {
    pub target_id: Uuid,
    pub requester_rota_id: Uuid,
    pub target_rota_id: Uuid,
    pub reason: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct SwapResponsePayload {
    pub response: TargetResponse,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct SwapApprovalPayload {
    pub response: AdminResponse,
}

#[derive(Debug, Deserialize, Default, IntoParams, ToSchema)]
pub struct SwapFilter {
    pub status: Option<SwapStatus>,
}

/// Roster entry with its shift expanded, as embedded in swap payloads.
#[derive(Serialize, Deserialize, Debug, Clone, ToSchema)]
pub struct SwapRotaDetail {
    #[serde(flatten)]
    pub rota: Rota,
    pub shift: Shift,
}

/// Swap request with both parties and both roster entries expanded.
#[derive(Serialize, Deserialize, Debug, Clone, ToSchema)]
pub struct SwapRequestDetail {
    #[serde(flatten)]
    pub swap: SwapRequest,
    pub requester: UserBrief,
    pub target: UserBrief,
    pub requester_rota: SwapRotaDetail,
    pub target_rota: SwapRotaDetail,
}

/// The (date, shift) slot a roster entry occupies; the unit the exchange
/// operates on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RotaSlot {
    pub date: NaiveDate,
    pub shift_id: Uuid,
}

impl RotaSlot {
    pub fn of(rota: &Rota) -> Self {
        Self {
            date: rota.date,
            shift_id: rota.shift_id,
        }
    }
}

/// Computes the post-exchange slots for the two roster entries of an approved
/// swap. Same date: the two staff members trade shifts and keep their date.
/// Different dates: each fully takes over the other's slot (date + shift).
pub fn plan_exchange(requester: RotaSlot, target: RotaSlot) -> (RotaSlot, RotaSlot) {
    if requester.date == target.date {
        (
            RotaSlot {
                date: requester.date,
                shift_id: target.shift_id,
            },
            RotaSlot {
                date: target.date,
                shift_id: requester.shift_id,
            },
        )
    } else {
        (target, requester)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn swap_with(
        target: TargetResponse,
        admin: AdminResponse,
        cancelled: bool,
    ) -> SwapRequest {
        let status = SwapStatus::derive(target, admin, cancelled);
        SwapRequest {
            id: Uuid::new_v4(),
            requester_id: Uuid::new_v4(),
            target_id: Uuid::new_v4(),
            requester_rota_id: Uuid::new_v4(),
            target_rota_id: Uuid::new_v4(),
            status,
            target_response: target,
            admin_response: admin,
            reason: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn status_derivation_matches_transition_table() {
        use AdminResponse as A;
        use TargetResponse as T;

        assert_eq!(
            SwapStatus::derive(T::Pending, A::Pending, false),
            SwapStatus::Pending
        );
        assert_eq!(
            SwapStatus::derive(T::Declined, A::Pending, false),
            SwapStatus::Rejected
        );
        assert_eq!(
            SwapStatus::derive(T::Accepted, A::Pending, false),
            SwapStatus::Pending
        );
        assert_eq!(
            SwapStatus::derive(T::Accepted, A::Approved, false),
            SwapStatus::Approved
        );
        assert_eq!(
            SwapStatus::derive(T::Accepted, A::Rejected, false),
            SwapStatus::Rejected
        );
    }

    #[test]
    fn status_is_defined_for_every_combination() {
        use AdminResponse as A;
        use TargetResponse as T;

        let targets = [T::Pending, T::Accepted, T::Declined];
        let admins = [A::Pending, A::Approved, A::Rejected];
        for t in targets {
            for a in admins {
                // Total function: every combination yields some status, and
                // cancellation dominates everything.
                let _ = SwapStatus::derive(t, a, false);
                assert_eq!(SwapStatus::derive(t, a, true), SwapStatus::Cancelled);
            }
        }
    }

    #[test]
    fn declined_is_terminal_for_admin() {
        let swap = swap_with(TargetResponse::Declined, AdminResponse::Pending, false);
        assert_eq!(swap.status, SwapStatus::Rejected);
        assert!(swap.status.is_terminal());
        assert!(!swap.admin_may_respond());
    }

    #[test]
    fn admin_cannot_act_before_target_accepts() {
        let swap = swap_with(TargetResponse::Pending, AdminResponse::Pending, false);
        assert!(!swap.admin_may_respond());
        assert!(swap.target_may_respond());
    }

    #[test]
    fn admin_acts_exactly_once() {
        let swap = swap_with(TargetResponse::Accepted, AdminResponse::Pending, false);
        assert!(swap.admin_may_respond());

        let approved = swap_with(TargetResponse::Accepted, AdminResponse::Approved, false);
        assert!(!approved.admin_may_respond());
        assert!(approved.status.is_terminal());

        let rejected = swap_with(TargetResponse::Accepted, AdminResponse::Rejected, false);
        assert!(!rejected.admin_may_respond());
        assert!(rejected.status.is_terminal());
    }

    #[test]
    fn target_cannot_respond_twice_or_after_cancel() {
        let answered = swap_with(TargetResponse::Accepted, AdminResponse::Pending, false);
        assert!(!answered.target_may_respond());

        let cancelled = swap_with(TargetResponse::Pending, AdminResponse::Pending, true);
        assert_eq!(cancelled.status, SwapStatus::Cancelled);
        assert!(!cancelled.target_may_respond());
        assert!(!cancelled.admin_may_respond());
    }

    #[test]
    fn cancel_only_while_pending() {
        assert!(swap_with(TargetResponse::Pending, AdminResponse::Pending, false)
            .requester_may_cancel());
        // Target acceptance keeps the overall status pending, so the
        // requester can still withdraw before the admin decides.
        assert!(swap_with(TargetResponse::Accepted, AdminResponse::Pending, false)
            .requester_may_cancel());
        assert!(!swap_with(TargetResponse::Declined, AdminResponse::Pending, false)
            .requester_may_cancel());
        assert!(!swap_with(TargetResponse::Accepted, AdminResponse::Approved, false)
            .requester_may_cancel());
        assert!(!swap_with(TargetResponse::Pending, AdminResponse::Pending, true)
            .requester_may_cancel());
    }

    #[test]
    fn same_date_exchange_trades_shifts_only() {
        let shift_x = Uuid::new_v4();
        let shift_y = Uuid::new_v4();
        let d = date("2025-06-02");

        let a = RotaSlot { date: d, shift_id: shift_x };
        let b = RotaSlot { date: d, shift_id: shift_y };

        let (new_a, new_b) = plan_exchange(a, b);
        assert_eq!(new_a, RotaSlot { date: d, shift_id: shift_y });
        assert_eq!(new_b, RotaSlot { date: d, shift_id: shift_x });
    }

    #[test]
    fn cross_date_exchange_trades_full_slots() {
        let shift_x = Uuid::new_v4();
        let shift_y = Uuid::new_v4();
        let d1 = date("2025-06-02");
        let d2 = date("2025-06-05");

        let a = RotaSlot { date: d1, shift_id: shift_x };
        let b = RotaSlot { date: d2, shift_id: shift_y };

        let (new_a, new_b) = plan_exchange(a, b);
        assert_eq!(new_a, RotaSlot { date: d2, shift_id: shift_y });
        assert_eq!(new_b, RotaSlot { date: d1, shift_id: shift_x });
    }

    #[test]
    fn exchange_is_an_involution() {
        let a = RotaSlot {
            date: date("2025-06-02"),
            shift_id: Uuid::new_v4(),
        };
        let b = RotaSlot {
            date: date("2025-06-05"),
            shift_id: Uuid::new_v4(),
        };

        let (swapped_a, swapped_b) = plan_exchange(a, b);
        let (back_a, back_b) = plan_exchange(swapped_a, swapped_b);
        assert_eq!((back_a, back_b), (a, b));
    }
}
