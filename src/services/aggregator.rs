//! Weekly and daily time aggregation.
//!
//! Everything here works on records that were already fetched. Nothing in this
//! module performs I/O or returns an error: partial inputs produce partial
//! totals, and missing targets produce zero progress.

use std::collections::HashMap;

use chrono::{Days, NaiveDate};
use serde::Serialize;
use uuid::Uuid;

use crate::models::goal::{Goal, GoalPeriod};
use crate::models::project::Project;
use crate::models::time_log::TimeLog;
use crate::services::periods::{rescale, Period};

pub const WINDOW_DAYS: usize = 7;

/// Seven day-buckets of time logs; index 0 is the window start.
#[derive(Debug, Clone, Default)]
pub struct WeekBuckets {
    days: [Vec<TimeLog>; WINDOW_DAYS],
}

impl WeekBuckets {
    #[cfg(test)]
    pub fn new(days: [Vec<TimeLog>; WINDOW_DAYS]) -> Self {
        Self { days }
    }

    /// Build buckets from per-day fetch results. A failed fetch contributes an
    /// empty day; results beyond the seventh are ignored.
    pub fn from_fetches<E, I>(fetches: I) -> Self
    where
        E: std::fmt::Display,
        I: IntoIterator<Item = Result<Vec<TimeLog>, E>>,
    {
        let mut buckets = Self::default();
        for (index, fetch) in fetches.into_iter().take(WINDOW_DAYS).enumerate() {
            match fetch {
                Ok(logs) => buckets.days[index] = logs,
                Err(e) => {
                    tracing::warn!(
                        day_index = index,
                        error = %e,
                        "Day bucket unavailable, treating as empty"
                    );
                }
            }
        }
        buckets
    }

    #[cfg(test)]
    pub fn day(&self, index: usize) -> &[TimeLog] {
        self.days.get(index).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn iter(&self) -> impl Iterator<Item = &[TimeLog]> {
        self.days.iter().map(Vec::as_slice)
    }
}

fn sum_minutes<'a>(logs: impl IntoIterator<Item = &'a TimeLog>) -> i64 {
    logs.into_iter()
        .map(|log| i64::from(log.duration_minutes.max(0)))
        .sum()
}

pub fn daily_totals(buckets: &WeekBuckets) -> [i64; WINDOW_DAYS] {
    let mut totals = [0i64; WINDOW_DAYS];
    for (total, logs) in totals.iter_mut().zip(buckets.iter()) {
        *total = sum_minutes(logs);
    }
    totals
}

pub fn project_daily_minutes(buckets: &WeekBuckets, project_id: Uuid) -> [i64; WINDOW_DAYS] {
    let mut totals = [0i64; WINDOW_DAYS];
    for (total, logs) in totals.iter_mut().zip(buckets.iter()) {
        *total = sum_minutes(logs.iter().filter(|log| log.project_id == project_id));
    }
    totals
}

/// Latest goal per project. Storage allows several goals for one project;
/// the most recently updated one wins.
pub fn canonical_goals(goals: &[Goal]) -> HashMap<Uuid, &Goal> {
    let mut by_project: HashMap<Uuid, &Goal> = HashMap::new();
    for goal in goals {
        by_project
            .entry(goal.project_id)
            .and_modify(|current| {
                if (goal.updated_at, goal.created_at) > (current.updated_at, current.created_at) {
                    *current = goal;
                }
            })
            .or_insert(goal);
    }
    by_project
}

fn period_of(goal: &Goal, periods: &[GoalPeriod]) -> Period {
    periods
        .iter()
        .find(|p| p.id == goal.period_id)
        .map(GoalPeriod::kind)
        .unwrap_or_default()
}

/// Minutes per day needed to stay on track for `goal`.
pub fn daily_target_minutes(goal: &Goal, period: &Period) -> f64 {
    rescale(goal.target_hours, period, &Period::Daily) * 60.0
}

/// Unrounded progress clamped to 100; 0 for a non-positive or unusable target.
fn progress(minutes_today: i64, daily_target_minutes: f64) -> f64 {
    if !daily_target_minutes.is_finite() || daily_target_minutes <= 0.0 {
        return 0.0;
    }
    (minutes_today as f64 / daily_target_minutes * 100.0).min(100.0)
}

pub fn today_percentage(minutes_today: i64, daily_target_minutes: f64) -> i64 {
    progress(minutes_today, daily_target_minutes).round() as i64
}

/// Mean of the positive progress values, rounded. Projects without progress
/// are left out of the mean rather than counted as zero.
pub fn goals_completed(progress_values: &[f64]) -> i64 {
    let positive: Vec<f64> = progress_values
        .iter()
        .copied()
        .filter(|p| *p > 0.0)
        .collect();
    if positive.is_empty() {
        return 0;
    }
    (positive.iter().sum::<f64>() / positive.len() as f64).round() as i64
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectWeek {
    pub project_id: Uuid,
    pub name: String,
    pub color_hex: String,
    pub daily_minutes: [i64; WINDOW_DAYS],
    pub weekly_total: i64,
    pub goal_id: Option<Uuid>,
    pub daily_target_minutes: f64,
    pub today_minutes: i64,
    pub today_percentage: i64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WeeklySummary {
    pub week_start: NaiveDate,
    pub days: Vec<NaiveDate>,
    pub today_index: Option<usize>,
    pub daily_totals: [i64; WINDOW_DAYS],
    pub week_total: i64,
    pub projects: Vec<ProjectWeek>,
    pub goals_completed: i64,
}

/// Dashboard payload for one window. `today_index` is `None` when today falls
/// outside the window, in which case no project has progress.
pub fn summarize_week(
    week_start: NaiveDate,
    today_index: Option<usize>,
    buckets: &WeekBuckets,
    projects: &[Project],
    goals: &[Goal],
    periods: &[GoalPeriod],
) -> WeeklySummary {
    let goals_by_project = canonical_goals(goals);
    let daily_totals = daily_totals(buckets);

    let mut progress_values = Vec::with_capacity(projects.len());
    let mut rows = Vec::with_capacity(projects.len());

    for project in projects {
        let daily_minutes = project_daily_minutes(buckets, project.id);
        let goal = goals_by_project.get(&project.id).copied();

        let target = goal
            .map(|g| daily_target_minutes(g, &period_of(g, periods)))
            .unwrap_or(0.0);
        let today_minutes = today_index
            .and_then(|i| daily_minutes.get(i).copied())
            .unwrap_or(0);
        // A project without a goal has a zero target and therefore no progress.
        progress_values.push(progress(today_minutes, target));

        rows.push(ProjectWeek {
            project_id: project.id,
            name: project.name.clone(),
            color_hex: project.color_hex.clone(),
            daily_minutes,
            weekly_total: daily_minutes.iter().sum(),
            goal_id: goal.map(|g| g.id),
            daily_target_minutes: target,
            today_minutes,
            today_percentage: today_percentage(today_minutes, target),
        });
    }

    WeeklySummary {
        week_start,
        days: (0..WINDOW_DAYS as u64)
            .filter_map(|offset| week_start.checked_add_days(Days::new(offset)))
            .collect(),
        today_index,
        daily_totals,
        week_total: daily_totals.iter().sum(),
        projects: rows,
        goals_completed: goals_completed(&progress_values),
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GoalTarget {
    pub goal_id: Uuid,
    pub project_id: Uuid,
    pub title: String,
    pub stored_period: Period,
    pub stored_hours: f64,
    pub target_hours: f64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TargetSummary {
    pub period: Period,
    pub days_in_period: u32,
    pub goals: Vec<GoalTarget>,
    pub total_target_hours: f64,
    pub daily_average: f64,
}

/// Express every canonical goal in `display` units, with the total and the
/// hours per day that total amounts to.
pub fn summarize_targets(goals: &[Goal], periods: &[GoalPeriod], display: Period) -> TargetSummary {
    let mut targets: Vec<GoalTarget> = canonical_goals(goals)
        .into_values()
        .map(|goal| {
            let stored_period = period_of(goal, periods);
            GoalTarget {
                goal_id: goal.id,
                project_id: goal.project_id,
                title: goal.title.clone(),
                target_hours: rescale(goal.target_hours, &stored_period, &display),
                stored_hours: goal.target_hours,
                stored_period,
            }
        })
        .collect();
    targets.sort_by(|a, b| a.title.cmp(&b.title).then(a.goal_id.cmp(&b.goal_id)));

    let total_target_hours: f64 = targets.iter().map(|t| t.target_hours).sum();
    let days = display.days();

    TargetSummary {
        daily_average: total_target_hours / f64::from(days),
        days_in_period: days,
        period: display,
        goals: targets,
        total_target_hours,
    }
}
