//! Conversion of absolute durations into study days and weeks.
//!
//! Study time has no day 0 and no week 0: the global anchor visit is Day 1,
//! the day before it is Day -1.

use crate::domain::study_visit::value_objects::{SECONDS_PER_DAY, SECONDS_PER_WEEK};

/// Whole days elapsed since study time zero, rounded towards minus infinity
pub fn study_duration_days(seconds: i64) -> i64 {
    seconds.div_euclid(SECONDS_PER_DAY)
}

/// Study day number for a duration given in whole days
pub fn day_number_from_days(days: i64) -> i64 {
    if days >= 0 {
        days + 1
    } else {
        days
    }
}

/// Study day number of an absolute duration
///
/// # Example
/// ```
/// use clinical_mdr_api::domain::timeline::study_time::study_day_number;
///
/// assert_eq!(study_day_number(0), 1);
/// assert_eq!(study_day_number(-86_400), -1);
/// ```
pub fn study_day_number(seconds: i64) -> i64 {
    day_number_from_days(study_duration_days(seconds))
}

/// Study week number of an absolute duration
pub fn study_week_number(seconds: i64) -> i64 {
    let weeks = seconds.div_euclid(SECONDS_PER_WEEK);
    if weeks >= 0 {
        weeks + 1
    } else {
        weeks
    }
}

pub fn day_label(day: i64) -> String {
    format!("Day {}", day)
}

pub fn week_label(week: i64) -> String {
    format!("Week {}", week)
}
