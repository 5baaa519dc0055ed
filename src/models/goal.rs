use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::services::periods::{days_in_period, Period};

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Goal {
    pub id: Uuid,
    pub user_id: Uuid,
    pub project_id: Uuid,
    pub period_id: Uuid,
    pub title: String,
    pub target_hours: f64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Stored period label. Labels are free-form text in the database; use
/// [`GoalPeriod::kind`] for arithmetic.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct GoalPeriod {
    pub id: Uuid,
    pub period: String,
}

impl GoalPeriod {
    pub fn kind(&self) -> Period {
        Period::parse(&self.period)
    }
}

/// Period as listed to clients, with the day count used for conversions.
#[derive(Debug, Serialize)]
pub struct GoalPeriodView {
    pub id: Uuid,
    pub period: String,
    pub days: u32,
}

impl From<GoalPeriod> for GoalPeriodView {
    fn from(p: GoalPeriod) -> Self {
        Self {
            days: days_in_period(&p.period),
            id: p.id,
            period: p.period,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct GoalSummaryQuery {
    pub period: Option<Period>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_period_view_carries_day_count() {
        let view = GoalPeriodView::from(GoalPeriod {
            id: Uuid::new_v4(),
            period: "Quarterly".into(),
        });
        assert_eq!(view.days, 90);
        assert_eq!(view.period, "Quarterly");
    }
}
