pub mod auth;
pub mod dashboard;
pub mod goals;
pub mod health;
pub mod projects;
pub mod time_logs;

use sqlx::PgPool;
use uuid::Uuid;

use crate::error::{AppError, AppResult};

/// Tables whose rows carry a `user_id` owner column.
#[derive(Debug, Clone, Copy)]
pub enum Owned {
    Project,
    TimeLog,
    Goal,
}

impl Owned {
    fn table(self) -> &'static str {
        match self {
            Owned::Project => "projects",
            Owned::TimeLog => "time_logs",
            Owned::Goal => "goals",
        }
    }

    fn label(self) -> &'static str {
        match self {
            Owned::Project => "Project",
            Owned::TimeLog => "Time log",
            Owned::Goal => "Goal",
        }
    }
}

/// Missing rows are 404; rows owned by someone else are 403.
pub fn check_owner(kind: Owned, owner: Option<Uuid>, user_id: Uuid) -> AppResult<()> {
    match owner {
        None => Err(AppError::NotFound(format!("{} not found", kind.label()))),
        Some(owner) if owner != user_id => Err(AppError::Forbidden),
        Some(_) => Ok(()),
    }
}

/// Ownership check run before every mutation.
pub async fn ensure_owner(db: &PgPool, kind: Owned, id: Uuid, user_id: Uuid) -> AppResult<()> {
    let owner = sqlx::query_scalar::<_, Uuid>(&format!(
        "SELECT user_id FROM {} WHERE id = $1",
        kind.table()
    ))
    .bind(id)
    .fetch_optional(db)
    .await?;

    check_owner(kind, owner, user_id)
}
