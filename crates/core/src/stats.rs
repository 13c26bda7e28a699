//! Request statistics helpers.

use crate::types::Timestamp;

/// Mean wall-clock hours between creation and first resolution.
///
/// Only requests that were resolved at least once should be passed in.
/// Returns `None` for an empty input.
pub fn average_resolution_hours(intervals: &[(Timestamp, Timestamp)]) -> Option<f64> {
    if intervals.is_empty() {
        return None;
    }
    let total_secs: i64 = intervals
        .iter()
        .map(|(created, resolved)| (*resolved - *created).num_seconds())
        .sum();
    Some(total_secs as f64 / intervals.len() as f64 / 3600.0)
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone, Utc};

    use super::*;

    #[test]
    fn empty_is_none() {
        assert_eq!(average_resolution_hours(&[]), None);
    }

    #[test]
    fn averages_intervals() {
        let t0 = Utc.with_ymd_and_hms(2026, 3, 1, 8, 0, 0).unwrap();
        let intervals = [
            (t0, t0 + Duration::hours(2)),
            (t0, t0 + Duration::hours(4)),
        ];
        assert_eq!(average_resolution_hours(&intervals), Some(3.0));
    }
}
