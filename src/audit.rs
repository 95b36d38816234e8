//! Audit reports: one CSV per applied plan branch.
//!
//! Each successful branch writes the rows the statement returned, tagged
//! with entity, operation, and timestamp in the filename:
//! `{operation}_{entity}_{DD.MM.YYYY__HH-MM}.csv`. Files are append-only
//! artifacts - written once, never rewritten by the runner.

use crate::error::SyncError;
use crate::executor::Operation;
use chrono::{DateTime, Utc};
use reconcile_core::RowSet;
use std::path::{Path, PathBuf};

pub struct AuditReporter {
    reports_dir: PathBuf,
}

impl AuditReporter {
    pub fn new(reports_dir: impl Into<PathBuf>) -> Self {
        AuditReporter {
            reports_dir: reports_dir.into(),
        }
    }

    pub fn reports_dir(&self) -> &Path {
        &self.reports_dir
    }

    /// Persist one applied branch. Nulls serialize as empty cells, the way
    /// the report files have always encoded them.
    pub fn write(
        &self,
        entity: &str,
        operation: Operation,
        rows: &RowSet,
        timestamp: DateTime<Utc>,
    ) -> Result<PathBuf, SyncError> {
        std::fs::create_dir_all(&self.reports_dir)?;

        let filename = format!(
            "{}_{}_{}.csv",
            operation,
            entity,
            timestamp.format("%d.%m.%Y__%H-%M")
        );
        let path = self.reports_dir.join(filename);

        let mut writer = csv::Writer::from_path(&path)?;
        writer.write_record(&rows.columns)?;
        for row in &rows.rows {
            writer.write_record(row.iter().map(|v| v.to_string()))?;
        }
        writer.flush()?;

        tracing::debug!("audit report written to {}", path.display());
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use reconcile_core::Value;

    fn sample_rows() -> RowSet {
        let mut rows = RowSet::new(vec!["id".into(), "name".into(), "mindat_id".into()]);
        rows.push(vec![
            Value::Int(1),
            Value::Text("Quartz".into()),
            Value::Int(101),
        ]);
        rows.push(vec![Value::Int(2), Value::Text("Opal".into()), Value::Null]);
        rows
    }

    #[test]
    fn test_report_filename_and_content() {
        let dir = tempfile::tempdir().unwrap();
        let reporter = AuditReporter::new(dir.path());
        let timestamp = Utc.with_ymd_and_hms(2024, 3, 7, 14, 30, 0).unwrap();

        let path = reporter
            .write("mineral_log", Operation::Insert, &sample_rows(), timestamp)
            .unwrap();

        assert_eq!(
            path.file_name().unwrap().to_str().unwrap(),
            "insert_mineral_log_07.03.2024__14-30.csv"
        );

        let content = std::fs::read_to_string(&path).unwrap();
        let mut lines = content.lines();
        assert_eq!(lines.next(), Some("id,name,mindat_id"));
        assert_eq!(lines.next(), Some("1,Quartz,101"));
        // null renders as an empty cell, not a placeholder string
        assert_eq!(lines.next(), Some("2,Opal,"));
    }

    #[test]
    fn test_reports_dir_created_on_demand() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("db").join("reports");
        let reporter = AuditReporter::new(&nested);
        let timestamp = Utc.with_ymd_and_hms(2024, 3, 7, 14, 30, 0).unwrap();

        reporter
            .write("mineral_history", Operation::Update, &sample_rows(), timestamp)
            .unwrap();
        assert!(nested.is_dir());
    }
}
