//! CSV report assembly
//!
//! Structured payroll data shaped into CSV for export. Fields containing
//! separators or quotes are quoted per RFC 4180.

use crate::db::payroll::{PayrollLine, PayrollRun};

fn csv_field(value: &str) -> String {
    if value.contains(',') || value.contains('"') || value.contains('\n') {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

fn csv_row(fields: &[String]) -> String {
    fields
        .iter()
        .map(|f| csv_field(f))
        .collect::<Vec<_>>()
        .join(",")
}

/// Render a payroll run and its lines as CSV.
///
/// `lines` pairs each line with the client's display name.
pub fn payroll_csv(run: &PayrollRun, lines: &[(PayrollLine, String)]) -> String {
    let mut out = String::new();

    out.push_str(&csv_row(&[
        "run_id".to_string(),
        "period_start".to_string(),
        "period_end".to_string(),
        "status".to_string(),
    ]));
    out.push('\n');
    out.push_str(&csv_row(&[
        run.guid.clone(),
        run.period_start.to_string(),
        run.period_end.to_string(),
        run.status.to_string(),
    ]));
    out.push('\n');
    out.push('\n');

    out.push_str(&csv_row(&[
        "client_id".to_string(),
        "client_name".to_string(),
        "work_days".to_string(),
        "total_minutes".to_string(),
        "base_amount".to_string(),
        "piece_amount".to_string(),
        "deductions_amount".to_string(),
        "net_amount".to_string(),
    ]));
    out.push('\n');

    for (line, client_name) in lines {
        out.push_str(&csv_row(&[
            line.client_id.clone(),
            client_name.clone(),
            line.work_days.to_string(),
            line.total_minutes.to_string(),
            line.base_amount.to_string(),
            line.piece_amount.to_string(),
            line.deductions_amount.to_string(),
            line.net_amount.to_string(),
        ]));
        out.push('\n');
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::payroll::RunStatus;
    use chrono::Utc;

    fn sample_run() -> PayrollRun {
        PayrollRun {
            guid: "run-1".to_string(),
            organization_id: "org-1".to_string(),
            period_start: "2025-06-01".parse().unwrap(),
            period_end: "2025-06-30".parse().unwrap(),
            status: RunStatus::Draft,
            confirmed_by: None,
            confirmed_at: None,
            paid_at: None,
            created_at: Utc::now(),
        }
    }

    fn sample_line(client_id: &str, net: i64) -> PayrollLine {
        PayrollLine {
            guid: format!("line-{}", client_id),
            run_id: "run-1".to_string(),
            client_id: client_id.to_string(),
            work_days: 20,
            total_minutes: 9600,
            base_amount: net,
            piece_amount: 0,
            deductions_amount: 0,
            net_amount: net,
            breakdown: serde_json::Value::Null,
        }
    }

    #[test]
    fn csv_has_header_and_one_row_per_line() {
        let run = sample_run();
        let lines = vec![
            (sample_line("cli-1", 8000), "Tanaka".to_string()),
            (sample_line("cli-2", 9000), "Sato".to_string()),
        ];

        let csv = payroll_csv(&run, &lines);
        let rows: Vec<&str> = csv.lines().collect();

        assert_eq!(rows[0], "run_id,period_start,period_end,status");
        assert_eq!(rows[1], "run-1,2025-06-01,2025-06-30,draft");
        assert_eq!(rows[3], "client_id,client_name,work_days,total_minutes,base_amount,piece_amount,deductions_amount,net_amount");
        assert_eq!(rows[4], "cli-1,Tanaka,20,9600,8000,0,0,8000");
        assert_eq!(rows.len(), 6);
    }

    #[test]
    fn fields_with_commas_are_quoted() {
        let run = sample_run();
        let lines = vec![(sample_line("cli-1", 100), "Suzuki, Hana".to_string())];

        let csv = payroll_csv(&run, &lines);
        assert!(csv.contains("\"Suzuki, Hana\""));
    }

    #[test]
    fn quotes_are_doubled() {
        assert_eq!(csv_field("a\"b"), "\"a\"\"b\"");
        assert_eq!(csv_field("plain"), "plain");
    }
}
