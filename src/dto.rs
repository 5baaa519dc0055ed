//! # Timesheeter: Request DTOs
//!
//! Request bodies accepted by the API. Keys are camelCase to match the web
//! client.
//!
//! Conventions:
//! - `*Request` → deserialized from client JSON body
//! - Field-level rules are expressed via `validator` derive macros; rules that
//!   span fields live in the handlers

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::{Validate, ValidationError};

// ============================================================================
// Common
// ============================================================================

/// Standard delete confirmation
#[derive(Debug, Serialize)]
pub struct DeleteResponse {
    pub deleted: bool,
    pub id: Uuid,
}

/// `#rgb` or `#rrggbb`
pub fn validate_color_hex(color: &str) -> Result<(), ValidationError> {
    let digits = color.strip_prefix('#').unwrap_or("");
    let ok = matches!(digits.len(), 3 | 6) && digits.chars().all(|c| c.is_ascii_hexdigit());
    if ok {
        Ok(())
    } else {
        let mut err = ValidationError::new("color_hex");
        err.message = Some("Color must be a hex code like #6366f1".into());
        Err(err)
    }
}

fn validate_not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        let mut err = ValidationError::new("blank");
        err.message = Some("Must not be blank".into());
        return Err(err);
    }
    Ok(())
}

// ============================================================================
// Projects
// ============================================================================

/// POST /api/projects
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateProjectRequest {
    #[validate(
        length(min = 1, max = 200, message = "Project name must be 1-200 characters"),
        custom = "validate_not_blank"
    )]
    pub project_name: String,

    #[validate(custom = "validate_color_hex")]
    pub color_hex: String,

    #[validate(length(max = 2000, message = "Description must be under 2000 characters"))]
    pub description: Option<String>,
}

// ============================================================================
// Time logs
// ============================================================================

/// POST /api/timelogs
///
/// Manual entries carry `durationMinutes`; timed entries carry `startTime`
/// and `endTime` and the duration is derived from them.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateTimeLogRequest {
    pub project_id: Uuid,

    #[serde(default)]
    pub is_manual_entry: bool,

    #[validate(range(min = 0, message = "Duration must not be negative"))]
    pub duration_minutes: Option<i32>,

    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,

    #[validate(length(max = 2000, message = "Note must be under 2000 characters"))]
    pub note: Option<String>,

    pub goal_id: Option<Uuid>,
}

// ============================================================================
// Goals
// ============================================================================

/// POST /api/goals
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateGoalRequest {
    pub project_id: Uuid,
    pub period_id: Uuid,

    #[validate(length(min = 1, max = 200, message = "Title must be 1-200 characters"))]
    pub title: String,

    pub target_hours: f64,
}

/// PATCH /api/goals
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateGoalRequest {
    pub goal_id: Uuid,
    pub period_id: Uuid,
    pub target_hours: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_color_hex_rules() {
        assert!(validate_color_hex("#6366f1").is_ok());
        assert!(validate_color_hex("#ABC").is_ok());
        assert!(validate_color_hex("6366f1").is_err());
        assert!(validate_color_hex("#6366f").is_err());
        assert!(validate_color_hex("#gggggg").is_err());
        assert!(validate_color_hex("").is_err());
    }

    #[test]
    fn test_project_request_uses_client_keys() {
        let json = r##"{"projectName":"Thesis","colorHex":"#ff8800","description":"Chapter 3"}"##;
        let req: CreateProjectRequest = serde_json::from_str(json).unwrap();
        assert_eq!(req.project_name, "Thesis");
        assert!(req.validate().is_ok());
    }

    #[test]
    fn test_blank_project_name_rejected() {
        let req = CreateProjectRequest {
            project_name: "   ".into(),
            color_hex: "#ff8800".into(),
            description: None,
        };
        assert!(req.validate().is_err());
    }

    #[test]
    fn test_bad_color_rejected() {
        let req = CreateProjectRequest {
            project_name: "Thesis".into(),
            color_hex: "orange".into(),
            description: None,
        };
        let errors = req.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("color_hex"));
    }

    #[test]
    fn test_negative_manual_duration_rejected() {
        let json = format!(
            r#"{{"projectId":"{}","isManualEntry":true,"durationMinutes":-5}}"#,
            Uuid::new_v4()
        );
        let req: CreateTimeLogRequest = serde_json::from_str(&json).unwrap();
        assert!(req.is_manual_entry);
        assert!(req.validate().is_err());
    }

    #[test]
    fn test_timed_log_request_parses_timestamps() {
        let json = serde_json::json!({
            "projectId": Uuid::new_v4(),
            "startTime": "2026-02-09T09:00:00Z",
            "endTime": "2026-02-09T10:30:00Z",
        });
        let req: CreateTimeLogRequest = serde_json::from_value(json).unwrap();
        assert!(!req.is_manual_entry);
        assert!(req.start_time.is_some() && req.end_time.is_some());
        assert!(req.validate().is_ok());
    }
}
