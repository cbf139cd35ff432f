//! Certificate expiry classification
//!
//! Pure read-time classification of a certificate's `valid_until` against
//! today and the warning/report horizons. The persisted status column is
//! refreshed with the same classifier on every write but reads never
//! trust it.

use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};

/// Default warning horizon (days)
pub const DEFAULT_WARNING_DAYS: i64 = 30;
/// Default report horizon (days)
pub const DEFAULT_REPORT_DAYS: i64 = 90;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExpiryStatus {
    /// valid_until has passed
    Expired,
    /// Expires within the warning horizon
    ExpiringSoon,
    /// Expires after the warning horizon but within the report horizon
    Upcoming,
    Valid,
}

impl ExpiryStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExpiryStatus::Expired => "expired",
            ExpiryStatus::ExpiringSoon => "expiring_soon",
            ExpiryStatus::Upcoming => "upcoming",
            ExpiryStatus::Valid => "valid",
        }
    }
}

/// Classify a certificate by expiry date.
///
/// expired if valid_until < today; expiring_soon if < today + warning;
/// upcoming if <= today + report horizon; valid otherwise.
pub fn classify(
    valid_until: NaiveDate,
    today: NaiveDate,
    warning_days: i64,
    report_days: i64,
) -> ExpiryStatus {
    if valid_until < today {
        ExpiryStatus::Expired
    } else if valid_until < today + Duration::days(warning_days) {
        ExpiryStatus::ExpiringSoon
    } else if valid_until <= today + Duration::days(report_days) {
        ExpiryStatus::Upcoming
    } else {
        ExpiryStatus::Valid
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    fn classify_default(valid_until: &str, today: &str) -> ExpiryStatus {
        classify(date(valid_until), date(today), DEFAULT_WARNING_DAYS, DEFAULT_REPORT_DAYS)
    }

    #[test]
    fn yesterday_is_expired() {
        assert_eq!(classify_default("2025-06-01", "2025-06-02"), ExpiryStatus::Expired);
    }

    #[test]
    fn today_is_expiring_soon_not_expired() {
        assert_eq!(classify_default("2025-06-02", "2025-06-02"), ExpiryStatus::ExpiringSoon);
    }

    #[test]
    fn day_29_is_expiring_soon_day_30_is_upcoming() {
        // warning boundary is exclusive: today + 30 falls outside
        assert_eq!(classify_default("2025-07-01", "2025-06-02"), ExpiryStatus::ExpiringSoon);
        assert_eq!(classify_default("2025-07-02", "2025-06-02"), ExpiryStatus::Upcoming);
    }

    #[test]
    fn day_90_is_upcoming_day_91_is_valid() {
        // report boundary is inclusive
        assert_eq!(classify_default("2025-08-31", "2025-06-02"), ExpiryStatus::Upcoming);
        assert_eq!(classify_default("2025-09-01", "2025-06-02"), ExpiryStatus::Valid);
    }
}
