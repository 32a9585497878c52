use crate::query::timeseries::{Mode, TimeRange};
use serde::Serialize;

/// Per-day and per-hour user rates over the active window.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeStats {
    pub days: u64,
    pub users_per_day: f64,
    pub users_per_hour: f64,
}

/// Compute user rates for `unique_devices` seen in `window`.
///
/// Historical windows use the inclusive day count. A live window always sits
/// inside one day, so it counts as a single day and the hourly rate scales
/// from the window length instead.
#[allow(clippy::cast_precision_loss)]
pub fn time_stats(mode: Mode, window: &TimeRange, unique_devices: u64) -> TimeStats {
    let users = unique_devices as f64;
    match mode {
        Mode::Historical => {
            let days = window.days();
            let users_per_day = users / days as f64;
            TimeStats {
                days,
                users_per_day,
                users_per_hour: users_per_day / 24.0,
            }
        }
        Mode::Live => {
            let hours = (window.end - window.start).num_seconds() as f64 / 3600.0;
            let users_per_hour = if hours > 0.0 { users / hours } else { users };
            TimeStats {
                days: 1,
                users_per_day: users,
                users_per_hour,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeDelta, TimeZone, Utc};

    #[test]
    fn test_historical_rates() {
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let end = Utc.with_ymd_and_hms(2024, 1, 4, 0, 0, 0).unwrap();
        let stats = time_stats(Mode::Historical, &TimeRange::new(start, end), 96);
        assert_eq!(stats.days, 4);
        assert!((stats.users_per_day - 24.0).abs() < f64::EPSILON);
        assert!((stats.users_per_hour - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_live_rates_scale_from_window() {
        let now = Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap();
        let window = TimeRange::live_window(now, TimeDelta::minutes(30));
        let stats = time_stats(Mode::Live, &window, 15);
        assert_eq!(stats.days, 1);
        assert!((stats.users_per_day - 15.0).abs() < f64::EPSILON);
        assert!((stats.users_per_hour - 30.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_empty_live_window() {
        let now = Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap();
        let stats = time_stats(Mode::Live, &TimeRange::new(now, now), 5);
        assert!((stats.users_per_hour - 5.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_zero_users() {
        let now = Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap();
        let stats = time_stats(Mode::Historical, &TimeRange::new(now, now), 0);
        assert_eq!(stats.days, 1);
        assert!(stats.users_per_day.abs() < f64::EPSILON);
    }
}
