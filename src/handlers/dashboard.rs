use axum::{
    extract::{Query, State},
    Extension, Json,
};
use chrono::{DateTime, Datelike, Days, Duration, NaiveDate, Utc};
use futures_util::future::join_all;
use serde::Deserialize;

use crate::auth::middleware::AuthUser;
use crate::error::{AppError, AppResult};
use crate::handlers::{goals, projects, time_logs};
use crate::services::aggregator::{summarize_week, WeekBuckets, WeeklySummary, WINDOW_DAYS};
use crate::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WeeklyQuery {
    pub week_start: Option<NaiveDate>,
}

/// Sunday on or before `date`.
pub fn find_sunday(date: NaiveDate) -> NaiveDate {
    date - Duration::days(i64::from(date.weekday().num_days_from_sunday()))
}

/// Position of `today` inside the 7-day window starting at `week_start`.
pub fn today_index(week_start: NaiveDate, today: NaiveDate) -> Option<usize> {
    let offset = (today - week_start).num_days();
    usize::try_from(offset).ok().filter(|i| *i < WINDOW_DAYS)
}

/// UTC bounds of each day in the window starting at `week_start`. Fails when
/// the window runs past the last representable date.
pub fn window_bounds(week_start: NaiveDate) -> AppResult<Vec<(DateTime<Utc>, DateTime<Utc>)>> {
    (0..WINDOW_DAYS as u64)
        .map(|offset| {
            let day = week_start
                .checked_add_days(Days::new(offset))
                .ok_or_else(|| AppError::BadRequest("Date out of range".into()))?;
            time_logs::day_bounds(day)
        })
        .collect()
}

pub async fn get_weekly(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Query(query): Query<WeeklyQuery>,
) -> AppResult<Json<WeeklySummary>> {
    let today = Utc::now().date_naive();
    let week_start = query.week_start.unwrap_or_else(|| find_sunday(today));
    let bounds = window_bounds(week_start)?;

    let (projects, goals, periods) = tokio::try_join!(
        projects::fetch_projects(&state.db, auth_user.id),
        goals::fetch_goals(&state.db, auth_user.id),
        goals::fetch_periods(&state.db),
    )?;

    let day_fetches = bounds
        .into_iter()
        .map(|day| time_logs::fetch_day(&state.db, auth_user.id, day));
    let buckets = WeekBuckets::from_fetches(join_all(day_fetches).await);

    let summary = summarize_week(
        week_start,
        today_index(week_start, today),
        &buckets,
        &projects,
        &goals,
        &periods,
    );

    tracing::debug!(
        user_id = %auth_user.id,
        week_start = %week_start,
        week_total = summary.week_total,
        "Weekly summary computed"
    );

    Ok(Json(summary))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_find_sunday_midweek() {
        // Wednesday
        assert_eq!(find_sunday(date(2026, 2, 11)), date(2026, 2, 8));
    }

    #[test]
    fn test_find_sunday_is_sunday() {
        assert_eq!(find_sunday(date(2026, 2, 8)), date(2026, 2, 8));
    }

    #[test]
    fn test_find_sunday_saturday() {
        assert_eq!(find_sunday(date(2026, 2, 14)), date(2026, 2, 8));
    }

    #[test]
    fn test_today_index_inside_window() {
        assert_eq!(today_index(date(2026, 2, 8), date(2026, 2, 8)), Some(0));
        assert_eq!(today_index(date(2026, 2, 8), date(2026, 2, 14)), Some(6));
    }

    #[test]
    fn test_window_bounds_cover_seven_days() {
        let bounds = window_bounds(date(2026, 2, 8)).unwrap();
        assert_eq!(bounds.len(), 7);
        assert_eq!(bounds[0].0.date_naive(), date(2026, 2, 8));
        assert_eq!(bounds[6].1.date_naive(), date(2026, 2, 15));
    }

    #[test]
    fn test_window_past_last_date_rejected() {
        let late = NaiveDate::MAX - Days::new(3);
        assert!(matches!(window_bounds(late), Err(AppError::BadRequest(_))));
        assert!(window_bounds(NaiveDate::MAX).is_err());
    }

    #[test]
    fn test_today_index_outside_window() {
        assert_eq!(today_index(date(2026, 2, 8), date(2026, 2, 15)), None);
        assert_eq!(today_index(date(2026, 2, 8), date(2026, 2, 7)), None);
    }
}
