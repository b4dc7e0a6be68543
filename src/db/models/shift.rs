use chrono::{DateTime, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

/// A shift definition: a named time window staff can be rostered into.
#[derive(Serialize, Deserialize, Debug, Clone, FromRow, ToSchema)]
pub struct Shift {
    pub id: Uuid,
    pub name: String,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub color: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct NewShift {
    pub name: String,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub color: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateShift {
    pub name: Option<String>,
    pub start_time: Option<NaiveTime>,
    pub end_time: Option<NaiveTime>,
    pub color: Option<String>,
}

pub fn is_valid_color(color: &str) -> bool {
    color.len() == 7
        && color.starts_with('#')
        && color[1..].chars().all(|c| c.is_ascii_hexdigit())
}

#[cfg(test)]
mod tests {
    use super::is_valid_color;

    #[test]
    fn accepts_hex_colors() {
        assert!(is_valid_color("#3498db"));
        assert!(is_valid_color("#FFFFFF"));
    }

    #[test]
    fn rejects_malformed_colors() {
        assert!(!is_valid_color("3498db"));
        assert!(!is_valid_color("#3498d"));
        assert!(!is_valid_color("#3498dg"));
        assert!(!is_valid_color("#3498db00"));
    }
}
