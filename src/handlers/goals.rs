use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use chrono::Utc;
use sqlx::PgPool;
use uuid::Uuid;
use validator::Validate;

use crate::auth::middleware::AuthUser;
use crate::dto::{CreateGoalRequest, DeleteResponse, UpdateGoalRequest};
use crate::error::{AppError, AppResult};
use crate::handlers::{ensure_owner, Owned};
use crate::models::goal::{Goal, GoalPeriod, GoalPeriodView, GoalSummaryQuery};
use crate::services::aggregator::{summarize_targets, TargetSummary};
use crate::AppState;

fn check_target_hours(hours: f64) -> AppResult<()> {
    if !hours.is_finite() || hours <= 0.0 {
        return Err(AppError::Validation(
            "Target hours must be a positive number".into(),
        ));
    }
    Ok(())
}

pub async fn fetch_goals(db: &PgPool, user_id: Uuid) -> Result<Vec<Goal>, sqlx::Error> {
    sqlx::query_as::<_, Goal>(
        "SELECT * FROM goals WHERE user_id = $1 ORDER BY created_at ASC",
    )
    .bind(user_id)
    .fetch_all(db)
    .await
}

pub async fn fetch_periods(db: &PgPool) -> Result<Vec<GoalPeriod>, sqlx::Error> {
    sqlx::query_as::<_, GoalPeriod>("SELECT id, period FROM goal_periods ORDER BY days ASC")
        .fetch_all(db)
        .await
}

async fn ensure_period_exists(db: &PgPool, period_id: Uuid) -> AppResult<()> {
    let exists = sqlx::query_scalar::<_, bool>(
        "SELECT EXISTS(SELECT 1 FROM goal_periods WHERE id = $1)",
    )
    .bind(period_id)
    .fetch_one(db)
    .await?;

    if !exists {
        return Err(AppError::Validation("Unknown goal period".into()));
    }
    Ok(())
}

pub async fn list_goals(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
) -> AppResult<Json<Vec<Goal>>> {
    Ok(Json(fetch_goals(&state.db, auth_user.id).await?))
}

pub async fn list_periods(
    State(state): State<AppState>,
) -> AppResult<Json<Vec<GoalPeriodView>>> {
    let periods = fetch_periods(&state.db).await?;
    Ok(Json(periods.into_iter().map(GoalPeriodView::from).collect()))
}

/// Canonical goals rescaled into the requested display period (default weekly).
pub async fn get_summary(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Query(query): Query<GoalSummaryQuery>,
) -> AppResult<Json<TargetSummary>> {
    let (goals, periods) = tokio::try_join!(
        fetch_goals(&state.db, auth_user.id),
        fetch_periods(&state.db),
    )?;

    let display = query.period.unwrap_or_default();
    Ok(Json(summarize_targets(&goals, &periods, display)))
}

pub async fn create_goal(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Json(body): Json<CreateGoalRequest>,
) -> AppResult<(StatusCode, Json<Goal>)> {
    body.validate()?;
    check_target_hours(body.target_hours)?;

    ensure_owner(&state.db, Owned::Project, body.project_id, auth_user.id).await?;
    ensure_period_exists(&state.db, body.period_id).await?;

    let now = Utc::now();
    let goal = sqlx::query_as::<_, Goal>(
        r#"
        INSERT INTO goals
            (id, user_id, project_id, period_id, title, target_hours, created_at, updated_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $7)
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(auth_user.id)
    .bind(body.project_id)
    .bind(body.period_id)
    .bind(body.title.trim())
    .bind(body.target_hours)
    .bind(now)
    .fetch_one(&state.db)
    .await?;

    Ok((StatusCode::CREATED, Json(goal)))
}

pub async fn update_goal(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Json(body): Json<UpdateGoalRequest>,
) -> AppResult<Json<Goal>> {
    check_target_hours(body.target_hours)?;

    ensure_owner(&state.db, Owned::Goal, body.goal_id, auth_user.id).await?;
    ensure_period_exists(&state.db, body.period_id).await?;

    let goal = sqlx::query_as::<_, Goal>(
        r#"
        UPDATE goals SET
            period_id = $3,
            target_hours = $4,
            updated_at = NOW()
        WHERE id = $1 AND user_id = $2
        RETURNING *
        "#,
    )
    .bind(body.goal_id)
    .bind(auth_user.id)
    .bind(body.period_id)
    .bind(body.target_hours)
    .fetch_optional(&state.db)
    .await?
    .ok_or(AppError::NotFound("Goal not found".into()))?;

    Ok(Json(goal))
}

pub async fn delete_goal(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Path(goal_id): Path<Uuid>,
) -> AppResult<Json<DeleteResponse>> {
    ensure_owner(&state.db, Owned::Goal, goal_id, auth_user.id).await?;

    // Logs keep their time; only the link to the goal goes.
    sqlx::query("DELETE FROM goals WHERE id = $1 AND user_id = $2")
        .bind(goal_id)
        .bind(auth_user.id)
        .execute(&state.db)
        .await?;

    Ok(Json(DeleteResponse {
        deleted: true,
        id: goal_id,
    }))
}
