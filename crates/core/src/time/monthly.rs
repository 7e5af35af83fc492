use chrono::{DateTime, Datelike, FixedOffset, NaiveDate, TimeZone, Utc};

/// Offset in minutes east of UTC; out-of-range values fall back to UTC.
pub fn schedule_offset(minutes: i32) -> FixedOffset {
    minutes
        .checked_mul(60)
        .and_then(FixedOffset::east_opt)
        .unwrap_or_else(|| {
            tracing::warn!(minutes, "invalid schedule offset; using UTC");
            FixedOffset::east_opt(0).expect("zero offset is valid")
        })
}

/// Next first-of-month 00:00 in `offset` that is strictly after `now`.
pub fn next_monthly_run(now: DateTime<Utc>, offset: FixedOffset) -> DateTime<Utc> {
    let local = now.with_timezone(&offset);
    let (year, month) = if local.month() == 12 {
        (local.year() + 1, 1)
    } else {
        (local.year(), local.month() + 1)
    };
    // The current month's boundary is never after `now`, so the next run is always next month.
    first_of_month(year, month, offset)
}

fn first_of_month(year: i32, month: u32, offset: FixedOffset) -> DateTime<Utc> {
    let midnight = NaiveDate::from_ymd_opt(year, month, 1)
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .expect("first day of a month is a valid date");
    offset
        .from_local_datetime(&midnight)
        .single()
        .expect("fixed offsets have no ambiguous local times")
        .with_timezone(&Utc)
}
