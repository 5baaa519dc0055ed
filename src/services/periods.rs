//! Goal period normalization.
//!
//! Targets are stored in the unit of the period they were set for. To show a
//! target under a different period, it is first brought to a daily base
//! (hours per day) and then scaled up to the requested period.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Day count used for any label that is not one of the known periods.
pub const FALLBACK_DAYS: u32 = 7;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Period {
    Daily,
    Weekly,
    Monthly,
    Quarterly,
    Yearly,
    /// Label stored at the boundary that matches no known period.
    /// Counts as a week.
    Unrecognized(String),
}

impl Period {
    /// Case-insensitive, whitespace-tolerant. Never fails.
    pub fn parse(label: &str) -> Self {
        match label.trim().to_ascii_lowercase().as_str() {
            "daily" => Self::Daily,
            "weekly" => Self::Weekly,
            "monthly" => Self::Monthly,
            "quarterly" => Self::Quarterly,
            "yearly" => Self::Yearly,
            _ => Self::Unrecognized(label.to_string()),
        }
    }

    pub fn days(&self) -> u32 {
        match self {
            Self::Daily => 1,
            Self::Weekly => 7,
            Self::Monthly => 30,
            Self::Quarterly => 90,
            Self::Yearly => 365,
            Self::Unrecognized(_) => FALLBACK_DAYS,
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Daily => "daily",
            Self::Weekly => "weekly",
            Self::Monthly => "monthly",
            Self::Quarterly => "quarterly",
            Self::Yearly => "yearly",
            Self::Unrecognized(label) => label,
        }
    }
}

impl Default for Period {
    fn default() -> Self {
        Self::Weekly
    }
}

impl From<String> for Period {
    fn from(label: String) -> Self {
        Self::parse(&label)
    }
}

impl From<Period> for String {
    fn from(period: Period) -> Self {
        period.as_str().to_string()
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Number of days a period label spans, falling back to a week.
pub fn days_in_period(label: &str) -> u32 {
    Period::parse(label).days()
}

pub fn to_daily_base(hours: f64, from: &Period) -> f64 {
    hours / f64::from(from.days())
}

pub fn from_daily_base(daily_hours: f64, to: &Period) -> f64 {
    daily_hours * f64::from(to.days())
}

/// Convert `hours` expressed per `from` into hours per `to`.
///
/// Sign and magnitude are not checked here; a same-period call returns the
/// input unchanged.
pub fn rescale(hours: f64, from: &Period, to: &Period) -> f64 {
    if from.days() == to.days() {
        return hours;
    }
    from_daily_base(to_daily_base(hours, from), to)
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL: [Period; 5] = [
        Period::Daily,
        Period::Weekly,
        Period::Monthly,
        Period::Quarterly,
        Period::Yearly,
    ];

    #[test]
    fn test_days_table() {
        assert_eq!(days_in_period("daily"), 1);
        assert_eq!(days_in_period("weekly"), 7);
        assert_eq!(days_in_period("monthly"), 30);
        assert_eq!(days_in_period("quarterly"), 90);
        assert_eq!(days_in_period("yearly"), 365);
    }

    #[test]
    fn test_days_case_insensitive() {
        assert_eq!(days_in_period("WEEKLY"), days_in_period("weekly"));
        assert_eq!(days_in_period(" Monthly "), 30);
    }

    #[test]
    fn test_unknown_falls_back_to_weekly() {
        assert_eq!(days_in_period("unknown"), 7);
        assert_eq!(days_in_period(""), 7);
        assert_eq!(
            Period::parse("fortnightly"),
            Period::Unrecognized("fortnightly".into())
        );
    }

    #[test]
    fn test_rescale_identity() {
        for p in ALL.iter() {
            for h in [0.0, 1.5, 21.0, 1234.567, -3.0] {
                assert_eq!(rescale(h, p, p), h, "identity failed for {p}");
            }
        }
    }

    #[test]
    fn test_rescale_round_trip() {
        for from in ALL.iter() {
            for to in ALL.iter() {
                let h = 13.75;
                let back = rescale(rescale(h, from, to), to, from);
                assert!((back - h).abs() < 1e-9, "{from} -> {to} -> {from}: {back}");
            }
        }
    }

    #[test]
    fn test_weekly_21_hours() {
        assert_eq!(rescale(21.0, &Period::Weekly, &Period::Daily), 3.0);
        assert_eq!(rescale(21.0, &Period::Weekly, &Period::Monthly), 90.0);
    }

    #[test]
    fn test_negative_and_zero_pass_through() {
        assert_eq!(rescale(0.0, &Period::Daily, &Period::Yearly), 0.0);
        assert_eq!(rescale(-7.0, &Period::Weekly, &Period::Daily), -1.0);
    }

    #[test]
    fn test_unrecognized_scales_like_weekly() {
        let odd = Period::parse("sprint");
        assert_eq!(rescale(14.0, &odd, &Period::Daily), 2.0);
    }

    #[test]
    fn test_serde_uses_plain_labels() {
        let json = serde_json::to_value(Period::Quarterly).unwrap();
        assert_eq!(json, "quarterly");

        let parsed: Period = serde_json::from_str("\"Yearly\"").unwrap();
        assert_eq!(parsed, Period::Yearly);

        let odd: Period = serde_json::from_str("\"biweekly\"").unwrap();
        assert_eq!(odd.days(), 7);
        assert_eq!(serde_json::to_value(odd).unwrap(), "biweekly");
    }
}
