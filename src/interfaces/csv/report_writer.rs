use crate::application::reminders::ReminderReport;
use crate::domain::installment::{InstallmentSchedule, InstallmentState};
use crate::domain::report::IncomeReport;
use crate::error::Result;
use std::io::Write;

fn state_label(state: InstallmentState) -> &'static str {
    match state {
        InstallmentState::Paid => "paid",
        InstallmentState::AwaitingReview => "awaiting_review",
        InstallmentState::Unpaid => "unpaid",
    }
}

/// Writes engine results as CSV, amounts in major currency units.
pub struct ReportWriter<W: Write> {
    writer: csv::Writer<W>,
}

impl<W: Write> ReportWriter<W> {
    pub fn new(sink: W) -> Self {
        Self {
            writer: csv::Writer::from_writer(sink),
        }
    }

    /// One row per installment number followed by a `total` row.
    pub fn write_income_report(&mut self, report: &IncomeReport) -> Result<()> {
        self.writer
            .write_record(["installment", "collected", "outstanding"])?;
        for (number, totals) in &report.by_installment {
            self.writer.write_record([
                number.to_string(),
                totals.collected.to_string(),
                totals.outstanding.to_string(),
            ])?;
        }
        self.writer.write_record([
            "total".to_string(),
            report.collected.to_string(),
            report.outstanding.to_string(),
        ])?;
        self.writer.flush()?;
        Ok(())
    }

    pub fn write_schedule(&mut self, schedule: &InstallmentSchedule) -> Result<()> {
        self.writer
            .write_record(["installment", "expected", "state", "payment", "method"])?;
        for installment in &schedule.installments {
            let (payment, method) = match &installment.payment {
                Some(p) => (p.id.to_string(), p.method.to_string()),
                None => (String::new(), String::new()),
            };
            self.writer.write_record([
                installment.number.to_string(),
                installment.expected_amount.to_string(),
                state_label(installment.state).to_string(),
                payment,
                method,
            ])?;
        }
        self.writer.flush()?;
        Ok(())
    }

    pub fn write_reminders(&mut self, report: &ReminderReport) -> Result<()> {
        self.writer
            .write_record(["registration", "name", "email", "exito", "error"])?;
        for outcome in &report.results {
            self.writer.write_record([
                outcome.registration_id.to_string(),
                outcome.name.clone(),
                outcome.email.clone(),
                outcome.success.to_string(),
                outcome.error.clone().unwrap_or_default(),
            ])?;
        }
        self.writer.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::reminders::ReminderOutcome;
    use crate::domain::money::Total;
    use crate::domain::report::InstallmentTotals;

    #[test]
    fn test_write_income_report() {
        let mut report = IncomeReport {
            collected: Total(10000),
            outstanding: Total(5000),
            ..IncomeReport::default()
        };
        report.by_installment.insert(
            1,
            InstallmentTotals {
                collected: Total(5000),
                outstanding: Total::ZERO,
            },
        );

        let mut buffer = Vec::new();
        ReportWriter::new(&mut buffer)
            .write_income_report(&report)
            .unwrap();
        let output = String::from_utf8(buffer).unwrap();

        assert_eq!(
            output,
            "installment,collected,outstanding\n1,50.00,0.00\ntotal,100.00,50.00\n"
        );
    }

    #[test]
    fn test_write_reminders() {
        let report = ReminderReport {
            sent: 0,
            failed: 1,
            results: vec![ReminderOutcome {
                registration_id: 3,
                name: "Ana Pérez".to_string(),
                email: "ana@example".to_string(),
                success: false,
                error: Some("bounced".to_string()),
            }],
        };

        let mut buffer = Vec::new();
        ReportWriter::new(&mut buffer).write_reminders(&report).unwrap();
        let output = String::from_utf8(buffer).unwrap();

        assert!(output.contains("3,Ana Pérez,ana@example,false,bounced"));
    }
}
