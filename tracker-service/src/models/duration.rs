//! Working-hours duration accounting for completed orders.

use chrono::{DateTime, Duration, NaiveTime, Utc};

/// Start of the working window (hour of day).
pub const WORK_START_HOUR: u32 = 8;

/// End of the working window (hour of day, exclusive).
pub const WORK_END_HOUR: u32 = 17;

/// Minutes between two instants counting only the [08:00, 17:00) window of
/// each day. Returns 0 when the end precedes the start.
pub fn working_minutes_between(started: DateTime<Utc>, completed: DateTime<Utc>) -> i64 {
    if completed <= started {
        return 0;
    }

    let window_start = NaiveTime::from_hms_opt(WORK_START_HOUR, 0, 0).unwrap_or(NaiveTime::MIN);
    let window_end = NaiveTime::from_hms_opt(WORK_END_HOUR, 0, 0).unwrap_or(NaiveTime::MIN);

    let mut total_seconds = 0i64;
    let mut day = started.date_naive();
    let end_day = completed.date_naive();

    while day <= end_day {
        let day_start = day.and_time(window_start).and_utc();
        let day_end = day.and_time(window_end).and_utc();

        let interval_start = started.max(day_start);
        let interval_end = completed.min(day_end);

        if interval_end > interval_start {
            total_seconds += (interval_end - interval_start).num_seconds();
        }

        day = match day.succ_opt() {
            Some(next) => next,
            None => break,
        };
    }

    total_seconds / 60
}

/// Format fractional hours as "2h 15m" style text.
pub fn format_hours(hours: f64) -> String {
    if hours < 0.0 {
        return "0h".to_string();
    }

    let total_minutes = (hours * 60.0) as i64;
    let hours_part = total_minutes / 60;
    let minutes_part = total_minutes % 60;

    match (hours_part, minutes_part) {
        (0, 0) => "0h".to_string(),
        (0, m) => format!("{}m", m),
        (h, 0) => format!("{}h", h),
        (h, m) => format!("{}h {}m", h, m),
    }
}

/// Naive end-of-job estimate: start plus the estimated duration (defaults
/// to the overdue threshold when no estimate was recorded).
pub fn estimated_completion(
    started: DateTime<Utc>,
    estimated_minutes: Option<i64>,
) -> DateTime<Utc> {
    let minutes =
        estimated_minutes.unwrap_or(super::order::OVERDUE_THRESHOLD_HOURS * 60);
    started + Duration::minutes(minutes)
}
