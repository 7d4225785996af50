//! Project model.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

/// Lifecycle status of a project
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "project_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ProjectStatus {
    Planning,
    Active,
    OnHold,
    Completed,
    Cancelled,
}

/// Project entity
#[derive(Debug, Clone, FromRow, Serialize, ToSchema)]
pub struct Project {
    pub id: Uuid,
    pub code: String,
    pub name: String,
    pub description: Option<String>,
    pub status: ProjectStatus,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub created_by: Option<Uuid>,
    /// Number of catalog products assigned to the project
    pub product_count: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Returns false when both dates are set and the end precedes the start.
pub fn dates_are_ordered(start: Option<NaiveDate>, end: Option<NaiveDate>) -> bool {
    match (start, end) {
        (Some(start), Some(end)) => end >= start,
        _ => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_snake_case() {
        assert_eq!(serde_json::to_value(ProjectStatus::OnHold).unwrap(), "on_hold");
        let s: ProjectStatus = serde_json::from_str("\"completed\"").unwrap();
        assert_eq!(s, ProjectStatus::Completed);
    }

    #[test]
    fn test_dates_are_ordered() {
        let jan = NaiveDate::from_ymd_opt(2026, 1, 1);
        let dec = NaiveDate::from_ymd_opt(2026, 12, 31);
        assert!(dates_are_ordered(jan, dec));
        assert!(dates_are_ordered(jan, jan));
        assert!(!dates_are_ordered(dec, jan));
        assert!(dates_are_ordered(None, jan));
        assert!(dates_are_ordered(dec, None));
    }
}
