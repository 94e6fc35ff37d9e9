use chrono::{DateTime, Datelike, Utc};

/// 获取当前 UTC 时间戳（毫秒）
pub fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}

/// ISO week (year, week number) containing the given Unix-millisecond
/// timestamp.
///
/// The ISO year can differ from the calendar year around January 1st,
/// which is why counters are keyed on both values.
pub fn iso_week_of(millis: i64) -> (i32, u32) {
    let dt: DateTime<Utc> = DateTime::from_timestamp_millis(millis).unwrap_or_else(Utc::now);
    let week = dt.iso_week();
    (week.year(), week.week())
}
