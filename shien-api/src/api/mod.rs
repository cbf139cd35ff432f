//! HTTP API handlers for shien-api

pub mod attendance;
pub mod auth;
pub mod certificates;
pub mod clients;
pub mod health;
pub mod payroll;
pub mod sessions;
pub mod wage_rules;
pub mod work_logs;

pub use auth::{auth_middleware, login, Actor};
pub use health::health_routes;

use crate::error::ApiError;
use chrono::NaiveDate;

/// Resolve a calendar month into its `[first day, last day]` period
pub(crate) fn month_period(year: i32, month: u32) -> Result<(NaiveDate, NaiveDate), ApiError> {
    let start = NaiveDate::from_ymd_opt(year, month, 1)
        .ok_or_else(|| ApiError::BadRequest(format!("invalid year/month: {}/{}", year, month)))?;

    let next_month = if month == 12 {
        NaiveDate::from_ymd_opt(year + 1, 1, 1)
    } else {
        NaiveDate::from_ymd_opt(year, month + 1, 1)
    }
    .ok_or_else(|| ApiError::BadRequest(format!("invalid year/month: {}/{}", year, month)))?;

    let end = next_month.pred_opt().unwrap_or(start);

    Ok((start, end))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn month_period_covers_whole_month() {
        let (start, end) = month_period(2025, 6).unwrap();
        assert_eq!(start, "2025-06-01".parse::<NaiveDate>().unwrap());
        assert_eq!(end, "2025-06-30".parse::<NaiveDate>().unwrap());
    }

    #[test]
    fn december_rolls_into_next_year() {
        let (start, end) = month_period(2025, 12).unwrap();
        assert_eq!(start, "2025-12-01".parse::<NaiveDate>().unwrap());
        assert_eq!(end, "2025-12-31".parse::<NaiveDate>().unwrap());
    }

    #[test]
    fn month_zero_is_rejected() {
        assert!(month_period(2025, 0).is_err());
        assert!(month_period(2025, 13).is_err());
    }
}
