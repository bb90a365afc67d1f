// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Shared helpers for date/time formatting and elapsed-time arithmetic.

use chrono::{DateTime, SecondsFormat, Utc};

/// Format a UTC timestamp as RFC3339 using a `Z` suffix.
pub fn format_utc_rfc3339(date: DateTime<Utc>) -> String {
    date.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Whole minutes elapsed between two instants, floored.
///
/// Returns 0 if `end` is before `start`.
pub fn whole_minutes_between(start: DateTime<Utc>, end: DateTime<Utc>) -> i64 {
    end.signed_duration_since(start).num_minutes().max(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    #[test]
    fn test_format_uses_z_suffix() {
        let date = Utc.with_ymd_and_hms(2024, 3, 1, 8, 30, 0).unwrap();
        assert_eq!(format_utc_rfc3339(date), "2024-03-01T08:30:00Z");
    }

    #[test]
    fn test_whole_minutes_floors_partial_minutes() {
        let start = Utc.with_ymd_and_hms(2024, 3, 1, 8, 0, 0).unwrap();
        let end = start + Duration::seconds(59 * 60 + 59);
        assert_eq!(whole_minutes_between(start, end), 59);
    }

    #[test]
    fn test_whole_minutes_never_negative() {
        let start = Utc.with_ymd_and_hms(2024, 3, 1, 8, 0, 0).unwrap();
        assert_eq!(whole_minutes_between(start, start - Duration::minutes(5)), 0);
    }
}
