//! Database repositories for shien-api

pub mod attendance;
pub mod audit;
pub mod certificates;
pub mod clients;
pub mod organizations;
pub mod payroll;
pub mod sessions;
pub mod staff;
pub mod wage_rules;
pub mod work_logs;
