use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use chrono::{DateTime, Duration, NaiveDate, Utc};
use sqlx::PgPool;
use uuid::Uuid;
use validator::Validate;

use crate::auth::middleware::AuthUser;
use crate::dto::CreateTimeLogRequest;
use crate::error::{AppError, AppResult};
use crate::handlers::{ensure_owner, Owned};
use crate::models::time_log::{TimeLog, TimeLogQuery};
use crate::AppState;

/// Interval and minutes to store for a new log.
#[derive(Debug, PartialEq)]
pub struct ResolvedDuration {
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    pub duration_minutes: i32,
}

/// Manual entries keep the supplied minutes and no interval. Timed entries
/// need both ends; the duration is the whole minutes between them.
pub fn resolve_duration(body: &CreateTimeLogRequest) -> AppResult<ResolvedDuration> {
    if body.is_manual_entry {
        let minutes = body.duration_minutes.ok_or_else(|| {
            AppError::Validation("durationMinutes is required for manual entries".into())
        })?;
        if minutes < 0 {
            return Err(AppError::Validation("Duration must not be negative".into()));
        }
        return Ok(ResolvedDuration {
            start_time: None,
            end_time: None,
            duration_minutes: minutes,
        });
    }

    let (start, end) = match (body.start_time, body.end_time) {
        (Some(start), Some(end)) => (start, end),
        _ => {
            return Err(AppError::Validation(
                "startTime and endTime are required for timed entries".into(),
            ))
        }
    };
    if end < start {
        return Err(AppError::Validation("endTime must not be before startTime".into()));
    }

    let minutes = i32::try_from((end - start).num_minutes())
        .map_err(|_| AppError::Validation("Interval is too long".into()))?;

    Ok(ResolvedDuration {
        start_time: Some(start),
        end_time: Some(end),
        duration_minutes: minutes,
    })
}

/// UTC bounds `[start, end)` of a calendar day. The last representable
/// date has no end and is rejected.
pub fn day_bounds(date: NaiveDate) -> AppResult<(DateTime<Utc>, DateTime<Utc>)> {
    let start = date.and_time(chrono::NaiveTime::MIN).and_utc();
    let end = start
        .checked_add_signed(Duration::days(1))
        .ok_or_else(|| AppError::BadRequest("Date out of range".into()))?;
    Ok((start, end))
}

/// Logs created inside `bounds`. Used for one dashboard day-bucket.
pub async fn fetch_day(
    db: &PgPool,
    user_id: Uuid,
    (start, end): (DateTime<Utc>, DateTime<Utc>),
) -> Result<Vec<TimeLog>, sqlx::Error> {
    sqlx::query_as::<_, TimeLog>(
        r#"
        SELECT * FROM time_logs
        WHERE user_id = $1 AND created_at >= $2 AND created_at < $3
        ORDER BY created_at ASC
        "#,
    )
    .bind(user_id)
    .bind(start)
    .bind(end)
    .fetch_all(db)
    .await
}

pub async fn list_for_day(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Query(query): Query<TimeLogQuery>,
) -> AppResult<Json<Vec<TimeLog>>> {
    let date = query
        .date
        .ok_or_else(|| AppError::BadRequest("Please supply a date (YYYY-MM-DD)".into()))?;

    let logs = fetch_day(&state.db, auth_user.id, day_bounds(date)?).await?;
    Ok(Json(logs))
}

pub async fn list_for_project(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Path(project_id): Path<Uuid>,
) -> AppResult<Json<Vec<TimeLog>>> {
    ensure_owner(&state.db, Owned::Project, project_id, auth_user.id).await?;

    let logs = sqlx::query_as::<_, TimeLog>(
        r#"
        SELECT * FROM time_logs
        WHERE user_id = $1 AND project_id = $2
        ORDER BY created_at DESC
        "#,
    )
    .bind(auth_user.id)
    .bind(project_id)
    .fetch_all(&state.db)
    .await?;

    Ok(Json(logs))
}

pub async fn create_time_log(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Json(body): Json<CreateTimeLogRequest>,
) -> AppResult<(StatusCode, Json<TimeLog>)> {
    body.validate()?;
    let resolved = resolve_duration(&body)?;

    ensure_owner(&state.db, Owned::Project, body.project_id, auth_user.id).await?;

    if let Some(goal_id) = body.goal_id {
        let goal_project = sqlx::query_scalar::<_, Uuid>(
            "SELECT project_id FROM goals WHERE id = $1 AND user_id = $2",
        )
        .bind(goal_id)
        .bind(auth_user.id)
        .fetch_optional(&state.db)
        .await?
        .ok_or(AppError::NotFound("Goal not found".into()))?;

        if goal_project != body.project_id {
            return Err(AppError::Validation(
                "Goal belongs to a different project".into(),
            ));
        }
    }

    let log = sqlx::query_as::<_, TimeLog>(
        r#"
        INSERT INTO time_logs
            (id, user_id, project_id, goal_id, start_time, end_time, duration_minutes, note)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(auth_user.id)
    .bind(body.project_id)
    .bind(body.goal_id)
    .bind(resolved.start_time)
    .bind(resolved.end_time)
    .bind(resolved.duration_minutes)
    .bind(&body.note)
    .fetch_one(&state.db)
    .await?;

    Ok((StatusCode::CREATED, Json(log)))
}

pub async fn delete_time_log(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Path(time_log_id): Path<Uuid>,
) -> AppResult<Json<TimeLog>> {
    ensure_owner(&state.db, Owned::TimeLog, time_log_id, auth_user.id).await?;

    let log = sqlx::query_as::<_, TimeLog>(
        "DELETE FROM time_logs WHERE id = $1 AND user_id = $2 RETURNING *",
    )
    .bind(time_log_id)
    .bind(auth_user.id)
    .fetch_optional(&state.db)
    .await?
    .ok_or(AppError::NotFound("Time log not found".into()))?;

    Ok(Json(log))
}
