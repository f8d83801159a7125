//! Goal/progress aggregation over date ranges.
//!
//! Sums logged check-ins over a calendar range and compares the totals
//! against a daily goal, producing balance/surplus figures and per-bucket
//! day/week/month rollups for charting.

use crate::types::{CheckIn, UserGoal};
use chrono::{Datelike, Duration, NaiveDate, Weekday};
use std::collections::BTreeMap;

/// Calendar bucketing granularity. Weeks run Monday through Sunday.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Period {
    Day,
    Week,
    Month,
}

/// Toggles adjusting the consumed-calorie total
#[derive(Clone, Debug, Default)]
pub struct ProgressOptions {
    /// Subtract exercise calories burned in range from net consumed
    pub include_exercise: bool,
    /// Externally computed thermic-effect bonus to subtract, if enabled
    pub tef_bonus: Option<f64>,
}

/// Aggregated totals for a date range measured against a goal
#[derive(Clone, Debug)]
pub struct ProgressSummary {
    pub days: i64,
    pub consumed: f64,
    pub burned: f64,
    pub net_consumed: f64,
    pub period_goal: f64,
    /// Positive = under goal (allowance remaining), negative = over goal
    pub balance: f64,
}

/// One charting bucket: a calendar day, ISO week, or calendar month
#[derive(Clone, Debug, PartialEq)]
pub struct Bucket {
    /// First day of the bucket (the day itself, the week's Monday,
    /// or the first of the month)
    pub start: NaiveDate,
    pub consumed: f64,
    pub burned: f64,
}

fn in_range(date: NaiveDate, start: NaiveDate, end: NaiveDate) -> bool {
    date >= start && date <= end
}

/// Compute consumed/burned totals and the goal balance for a date range
///
/// Both ends of the range are inclusive. Check-ins outside the range do
/// not contribute.
pub fn summarize(
    check_ins: &[CheckIn],
    goal: &UserGoal,
    start: NaiveDate,
    end: NaiveDate,
    options: &ProgressOptions,
) -> ProgressSummary {
    let mut consumed = 0.0;
    let mut burned = 0.0;

    for check_in in check_ins {
        let date = check_in.timestamp().date_naive();
        if !in_range(date, start, end) {
            continue;
        }
        match check_in {
            CheckIn::Meal(ci) => consumed += ci.total_calories as f64,
            CheckIn::Exercise(log) => burned += log.calories_burned,
        }
    }

    let mut net_consumed = consumed;
    if options.include_exercise {
        net_consumed -= burned;
    }
    if let Some(tef) = options.tef_bonus {
        net_consumed -= tef;
    }

    let days = (end - start).num_days() + 1;
    let period_goal = goal.calories_goal * days as f64;
    let balance = period_goal - net_consumed;

    tracing::debug!(
        days,
        consumed,
        burned,
        balance,
        "summarized {} check-ins",
        check_ins.len()
    );

    ProgressSummary {
        days,
        consumed,
        burned,
        net_consumed,
        period_goal,
        balance,
    }
}

/// Start of the calendar bucket containing `date`
fn bucket_start(date: NaiveDate, period: Period) -> NaiveDate {
    match period {
        Period::Day => date,
        Period::Week => {
            let offset = date.weekday().num_days_from_monday() as i64;
            date - Duration::days(offset)
        }
        // First of the month always exists
        Period::Month => NaiveDate::from_ymd_opt(date.year(), date.month(), 1).unwrap_or(date),
    }
}

/// Group check-ins by calendar boundary and sum per-bucket totals
///
/// Returns buckets sorted ascending by start date. Empty buckets between
/// occupied ones are not emitted.
pub fn bucket(check_ins: &[CheckIn], period: Period) -> Vec<Bucket> {
    let mut buckets: BTreeMap<NaiveDate, (f64, f64)> = BTreeMap::new();

    for check_in in check_ins {
        let key = bucket_start(check_in.timestamp().date_naive(), period);
        let entry = buckets.entry(key).or_insert((0.0, 0.0));
        match check_in {
            CheckIn::Meal(ci) => entry.0 += ci.total_calories as f64,
            CheckIn::Exercise(log) => entry.1 += log.calories_burned,
        }
    }

    buckets
        .into_iter()
        .map(|(start, (consumed, burned))| Bucket {
            start,
            consumed,
            burned,
        })
        .collect()
}

/// The Monday of the week containing `date` (exposed for display code)
pub fn week_start(date: NaiveDate) -> NaiveDate {
    debug_assert_eq!(bucket_start(date, Period::Week).weekday(), Weekday::Mon);
    bucket_start(date, Period::Week)
}
