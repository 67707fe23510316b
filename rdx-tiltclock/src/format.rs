//! Pure formatters turning durations and timestamps into fixed-width text.

use chrono::{NaiveDateTime, NaiveTime, Timelike};

/// Formats stopwatch time as `HH:MM:SS.CC`.
///
/// Every field comes from integer division of `elapsed_ms`, so the output
/// never drifts from the counter.
pub fn stopwatch(elapsed_ms: u64) -> String {
    let hours = elapsed_ms / 3_600_000;
    let minutes = (elapsed_ms % 3_600_000) / 60_000;
    let seconds = (elapsed_ms % 60_000) / 1000;
    let centis = (elapsed_ms % 1000) / 10;
    format!("{hours:02}:{minutes:02}:{seconds:02}.{centis:02}")
}

/// Formats a countdown as `MM:SS`. Minutes are not wrapped into hours.
pub fn countdown(remaining_ms: u64) -> String {
    let total_secs = remaining_ms / 1000;
    format!("{:02}:{:02}", total_secs / 60, total_secs % 60)
}

/// Formats the clock panel time as `HH:MM:SS`.
pub fn clock_time(now: NaiveDateTime) -> String {
    now.format("%H:%M:%S").to_string()
}

/// Formats the clock panel date, e.g. `Saturday, 17 October 2026`.
pub fn clock_date(now: NaiveDateTime) -> String {
    now.format("%A, %-d %B %Y").to_string()
}

/// Formats an alarm time as `HH:MM`.
pub fn time_of_day(time: NaiveTime) -> String {
    format!("{:02}:{:02}", time.hour(), time.minute())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn stopwatch_pads_every_field() {
        assert_eq!(stopwatch(0), "00:00:00.00");
        assert_eq!(stopwatch(1_230), "00:00:01.23");
        assert_eq!(stopwatch(61_005), "00:01:01.00");
        assert_eq!(stopwatch(3_723_450), "01:02:03.45");
    }

    #[test]
    fn countdown_keeps_minutes_unbounded() {
        assert_eq!(countdown(90_000), "01:30");
        assert_eq!(countdown(0), "00:00");
        assert_eq!(countdown(5_400_000), "90:00");
    }

    #[test]
    fn clock_lines() {
        let now = NaiveDate::from_ymd_opt(2026, 10, 17)
            .unwrap()
            .and_hms_opt(7, 5, 9)
            .unwrap();
        assert_eq!(clock_time(now), "07:05:09");
        assert_eq!(clock_date(now), "Saturday, 17 October 2026");
        assert_eq!(time_of_day(now.time()), "07:05");
    }
}
