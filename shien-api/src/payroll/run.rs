//! Payroll run status lifecycle
//!
//! `calculating` is transient while lines are computed; `draft` awaits
//! review; `confirmed` and `paid` are explicit staff actions. Linear, no
//! cycles - correcting a period means creating a new run.

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Calculating,
    Draft,
    Confirmed,
    Paid,
}

impl RunStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunStatus::Calculating => "calculating",
            RunStatus::Draft => "draft",
            RunStatus::Confirmed => "confirmed",
            RunStatus::Paid => "paid",
        }
    }

    pub fn parse(s: &str) -> Option<RunStatus> {
        match s {
            "calculating" => Some(RunStatus::Calculating),
            "draft" => Some(RunStatus::Draft),
            "confirmed" => Some(RunStatus::Confirmed),
            "paid" => Some(RunStatus::Paid),
            _ => None,
        }
    }

    /// Legal forward steps
    pub fn can_advance_to(self, next: RunStatus) -> bool {
        matches!(
            (self, next),
            (RunStatus::Calculating, RunStatus::Draft)
                | (RunStatus::Draft, RunStatus::Confirmed)
                | (RunStatus::Confirmed, RunStatus::Paid)
        )
    }
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lifecycle_is_linear() {
        assert!(RunStatus::Calculating.can_advance_to(RunStatus::Draft));
        assert!(RunStatus::Draft.can_advance_to(RunStatus::Confirmed));
        assert!(RunStatus::Confirmed.can_advance_to(RunStatus::Paid));
    }

    #[test]
    fn no_skipping_or_reversing() {
        assert!(!RunStatus::Calculating.can_advance_to(RunStatus::Confirmed));
        assert!(!RunStatus::Draft.can_advance_to(RunStatus::Paid));
        assert!(!RunStatus::Confirmed.can_advance_to(RunStatus::Draft));
        assert!(!RunStatus::Paid.can_advance_to(RunStatus::Confirmed));
        assert!(!RunStatus::Paid.can_advance_to(RunStatus::Draft));
    }

    #[test]
    fn parse_round_trips() {
        for status in [
            RunStatus::Calculating,
            RunStatus::Draft,
            RunStatus::Confirmed,
            RunStatus::Paid,
        ] {
            assert_eq!(RunStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(RunStatus::parse("cancelled"), None);
    }
}
