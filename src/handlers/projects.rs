use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Extension, Json,
};
use sqlx::PgPool;
use uuid::Uuid;
use validator::Validate;

use crate::auth::middleware::AuthUser;
use crate::dto::CreateProjectRequest;
use crate::error::{AppError, AppResult};
use crate::handlers::{ensure_owner, Owned};
use crate::models::project::{Project, ProjectQuery, ProjectWithTotal};
use crate::AppState;

pub async fn fetch_projects(db: &PgPool, user_id: Uuid) -> Result<Vec<Project>, sqlx::Error> {
    sqlx::query_as::<_, Project>(
        "SELECT * FROM projects WHERE user_id = $1 ORDER BY created_at DESC",
    )
    .bind(user_id)
    .fetch_all(db)
    .await
}

pub async fn list_projects(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Query(query): Query<ProjectQuery>,
) -> AppResult<Response> {
    if !query.include_total_time {
        let projects = fetch_projects(&state.db, auth_user.id).await?;
        return Ok(Json(projects).into_response());
    }

    let projects = sqlx::query_as::<_, ProjectWithTotal>(
        r#"
        SELECT p.*, COALESCE(SUM(t.duration_minutes), 0)::BIGINT AS total_minutes
        FROM projects p
        LEFT JOIN time_logs t ON t.project_id = p.id
        WHERE p.user_id = $1
        GROUP BY p.id
        ORDER BY p.created_at DESC
        "#,
    )
    .bind(auth_user.id)
    .fetch_all(&state.db)
    .await?;

    Ok(Json(projects).into_response())
}

pub async fn create_project(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Json(body): Json<CreateProjectRequest>,
) -> AppResult<(StatusCode, Json<Project>)> {
    body.validate()?;

    let project = sqlx::query_as::<_, Project>(
        r#"
        INSERT INTO projects (id, user_id, name, description, color_hex)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(auth_user.id)
    .bind(body.project_name.trim())
    .bind(&body.description)
    .bind(&body.color_hex)
    .fetch_one(&state.db)
    .await?;

    Ok((StatusCode::CREATED, Json(project)))
}

/// Deletes the project together with its time logs and goals.
pub async fn delete_project(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Path(project_id): Path<Uuid>,
) -> AppResult<Json<Project>> {
    ensure_owner(&state.db, Owned::Project, project_id, auth_user.id).await?;

    let mut tx = state.db.begin().await?;

    let logs = sqlx::query("DELETE FROM time_logs WHERE project_id = $1 AND user_id = $2")
        .bind(project_id)
        .bind(auth_user.id)
        .execute(&mut *tx)
        .await?;
    let goals = sqlx::query("DELETE FROM goals WHERE project_id = $1 AND user_id = $2")
        .bind(project_id)
        .bind(auth_user.id)
        .execute(&mut *tx)
        .await?;
    let project = sqlx::query_as::<_, Project>(
        "DELETE FROM projects WHERE id = $1 AND user_id = $2 RETURNING *",
    )
    .bind(project_id)
    .bind(auth_user.id)
    .fetch_optional(&mut *tx)
    .await?
    .ok_or(AppError::NotFound("Project not found".into()))?;

    tx.commit().await?;

    tracing::info!(
        user_id = %auth_user.id,
        project_id = %project_id,
        time_logs = logs.rows_affected(),
        goals = goals.rows_affected(),
        "Project deleted"
    );

    Ok(Json(project))
}
