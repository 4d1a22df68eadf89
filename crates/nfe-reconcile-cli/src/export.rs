//! Writing the report to an `.xlsx` workbook.

use std::io;
use std::path::{Path, PathBuf};

use nfe_reconcile::reconcile::{COLUMNS, ReconciliationReport};
use rust_xlsxwriter::{Format, Workbook, XlsxError};
use thiserror::Error;

use crate::Mode;

pub const SHEET_NAME: &str = "Missing invoices";

#[derive(Debug, Error)]
pub enum SinkWriteError {
    #[error("could not create output directory {}", path.display())]
    CreateDir {
        path: PathBuf,
        #[source]
        error: io::Error,
    },

    #[error("could not write report {}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        error: XlsxError,
    },

    #[error("could not remove stale report {}", path.display())]
    RemoveStale {
        path: PathBuf,
        #[source]
        error: io::Error,
    },
}

/// What happened to the report file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SinkOutcome {
    Written(PathBuf),
    RemovedStale(PathBuf),
    Skipped,
}

/// Persist `report` at `path` following the run mode.
///
/// Attended runs always write a workbook, header only when nothing is
/// missing. Unattended runs write only when something is missing and
/// otherwise delete a leftover workbook from an earlier run.
pub fn persist(
    report: &ReconciliationReport,
    path: &Path,
    mode: Mode,
) -> Result<SinkOutcome, SinkWriteError> {
    if mode == Mode::Unattended && report.is_empty() {
        return remove_stale(path);
    }

    if let Some(dir) = path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir).map_err(|error| SinkWriteError::CreateDir {
            path: dir.to_owned(),
            error,
        })?;
    }
    write_workbook(report, path).map_err(|error| SinkWriteError::Write {
        path: path.to_owned(),
        error,
    })?;
    tracing::info!("wrote {} row(s) to {}", report.rows.len(), path.display());

    Ok(SinkOutcome::Written(path.to_owned()))
}

fn remove_stale(path: &Path) -> Result<SinkOutcome, SinkWriteError> {
    match std::fs::remove_file(path) {
        Ok(()) => {
            tracing::info!("removed stale report {}", path.display());
            Ok(SinkOutcome::RemovedStale(path.to_owned()))
        }
        Err(error) if error.kind() == io::ErrorKind::NotFound => Ok(SinkOutcome::Skipped),
        Err(error) => Err(SinkWriteError::RemoveStale {
            path: path.to_owned(),
            error,
        }),
    }
}

/// Every cell is written as text so zero-padded codes keep their padding.
fn write_workbook(report: &ReconciliationReport, path: &Path) -> Result<(), XlsxError> {
    let mut workbook = Workbook::new();
    let worksheet = workbook.add_worksheet();
    worksheet.set_name(SHEET_NAME)?;

    let header = Format::new().set_bold();
    for (col, name) in COLUMNS.iter().enumerate() {
        worksheet.write_string_with_format(0, col as u16, *name, &header)?;
    }

    for (row_idx, row) in report.rows.iter().enumerate() {
        let excel_row = (row_idx + 1) as u32;
        for (col, cell) in row.cells().iter().enumerate() {
            worksheet.write_string(excel_row, col as u16, cell)?;
        }
    }
    worksheet.autofit();

    workbook.save(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use calamine::{Data, Reader, Xlsx, open_workbook};
    use chrono::NaiveDate;
    use nfe_reconcile::DateWindow;
    use nfe_reconcile::EmissionDate;
    use nfe_reconcile::reconcile::ReportRow;
    use std::collections::BTreeSet;

    fn report(rows: Vec<ReportRow>) -> ReconciliationReport {
        ReconciliationReport {
            window: DateWindow::single_day(NaiveDate::from_ymd_opt(2025, 3, 1).unwrap()),
            missing: rows.iter().map(|row| row.invoice_number.clone()).collect::<BTreeSet<_>>(),
            rows,
            anomalies: Vec::new(),
        }
    }

    fn row(invoice_number: &str) -> ReportRow {
        ReportRow {
            store: "0101005".to_owned(),
            series: "005".to_owned(),
            invoice_number: invoice_number.to_owned(),
            receipt: String::new(),
            emission_date: EmissionDate::Date(NaiveDate::from_ymd_opt(2025, 3, 1).unwrap()),
        }
    }

    fn read_back(path: &Path) -> Vec<Vec<String>> {
        let mut workbook: Xlsx<_> = open_workbook(path).unwrap();
        assert_eq!(workbook.sheet_names(), [SHEET_NAME]);
        let range = workbook.worksheet_range(SHEET_NAME).unwrap();
        range
            .rows()
            .map(|cells| {
                cells
                    .iter()
                    .map(|cell| match cell {
                        Data::Empty => String::new(),
                        other => other.to_string(),
                    })
                    .collect()
            })
            .collect()
    }

    #[test]
    fn attended_writes_rows_as_text() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("missing.xlsx");

        let outcome = persist(&report(vec![row("000000007")]), &path, Mode::Attended).unwrap();

        assert_eq!(outcome, SinkOutcome::Written(path.clone()));
        assert_eq!(
            read_back(&path),
            [
                vec!["Store", "Series", "InvoiceNumber", "Receipt", "EmissionDate"],
                vec!["0101005", "005", "000000007", "", "2025-03-01"],
            ]
        );
    }

    #[test]
    fn attended_writes_header_only_when_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing.xlsx");

        let outcome = persist(&report(Vec::new()), &path, Mode::Attended).unwrap();

        assert_eq!(outcome, SinkOutcome::Written(path.clone()));
        assert_eq!(
            read_back(&path),
            [vec!["Store", "Series", "InvoiceNumber", "Receipt", "EmissionDate"]]
        );
    }

    #[test]
    fn unattended_removes_stale_report_when_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing.xlsx");
        persist(&report(vec![row("000000001")]), &path, Mode::Unattended).unwrap();
        assert!(path.exists());

        let outcome = persist(&report(Vec::new()), &path, Mode::Unattended).unwrap();

        assert_eq!(outcome, SinkOutcome::RemovedStale(path.clone()));
        assert!(!path.exists());
    }

    #[test]
    fn unattended_without_stale_report_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing.xlsx");

        let outcome = persist(&report(Vec::new()), &path, Mode::Unattended).unwrap();

        assert_eq!(outcome, SinkOutcome::Skipped);
        assert!(!path.exists());
    }

    #[test]
    fn unwritable_path_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("file");
        std::fs::write(&blocker, "not a directory").unwrap();
        let path = blocker.join("missing.xlsx");

        let error = persist(&report(vec![row("000000001")]), &path, Mode::Attended).unwrap_err();

        assert!(matches!(error, SinkWriteError::CreateDir { .. }));
    }

    #[test]
    fn unattended_fails_when_stale_report_cannot_be_removed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing.xlsx");
        std::fs::create_dir(&path).unwrap();

        let error = persist(&report(Vec::new()), &path, Mode::Unattended).unwrap_err();

        assert!(matches!(error, SinkWriteError::RemoveStale { .. }));
        assert!(path.is_dir());
    }

    #[test]
    fn directory_at_report_path_is_a_write_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing.xlsx");
        std::fs::create_dir(&path).unwrap();

        let error = persist(&report(vec![row("000000001")]), &path, Mode::Attended).unwrap_err();

        assert!(matches!(error, SinkWriteError::Write { .. }));
    }
}
