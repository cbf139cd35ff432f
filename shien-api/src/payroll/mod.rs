//! Payroll computation engine
//!
//! Pure wage-rule resolution and per-client line computation, plus the
//! payroll-run status lifecycle. Persistence lives in `crate::db::payroll`.

pub mod calc;
pub mod rules;
pub mod run;

pub use calc::{compute_line, AttendanceInput, Breakdown, LineComputation, WorkLogInput};
pub use rules::{resolve_rule, CalculationType, Deduction, DeductionKind, PieceRates, WageRule};
pub use run::RunStatus;
