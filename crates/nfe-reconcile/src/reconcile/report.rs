use crate::normalize::MalformedRecordError;
use crate::{DateWindow, EmissionDate, NormalizedRecord, Source};
use std::collections::BTreeSet;
use std::fmt;

/// Column headers, in report order.
pub const COLUMNS: [&str; 5] = ["Store", "Series", "InvoiceNumber", "Receipt", "EmissionDate"];

/// One POS invoice that has no ERP counterpart.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportRow {
    pub store: String,
    pub series: String,
    pub invoice_number: String,
    pub receipt: String,
    pub emission_date: EmissionDate,
}

impl ReportRow {
    /// Cell values in [`COLUMNS`] order.
    pub fn cells(&self) -> [String; 5] {
        [
            self.store.clone(),
            self.series.clone(),
            self.invoice_number.clone(),
            self.receipt.clone(),
            self.emission_date.to_string(),
        ]
    }
}

impl From<&NormalizedRecord> for ReportRow {
    fn from(record: &NormalizedRecord) -> Self {
        ReportRow {
            store: record.store.clone(),
            series: record.series.clone(),
            invoice_number: record.invoice_number.clone(),
            receipt: record.receipt.clone(),
            emission_date: record.emission_date.clone(),
        }
    }
}

/// Something odd in the input that did not stop the run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Anomaly {
    UnparsedEmissionDate {
        side: Source,
        invoice_number: String,
        raw: String,
    },
    DroppedRecord(MalformedRecordError),
}

impl fmt::Display for Anomaly {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Anomaly::UnparsedEmissionDate {
                side,
                invoice_number,
                raw,
            } => write!(
                f,
                "{side} invoice {invoice_number}: emission date '{raw}' could not be parsed"
            ),
            Anomaly::DroppedRecord(error) => write!(f, "{error}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconciliationReport {
    pub window: DateWindow,
    /// Distinct missing invoice numbers, ascending.
    pub missing: BTreeSet<String>,
    /// Every POS row carrying a missing number, ordered by invoice number.
    pub rows: Vec<ReportRow>,
    pub anomalies: Vec<Anomaly>,
}

impl ReconciliationReport {
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn missing_count(&self) -> usize {
        self.missing.len()
    }
}

/// Select the POS rows whose invoice number is missing on the ERP side.
///
/// Rows are kept individually, so a number issued twice on the POS side shows
/// up twice. The sort is stable: rows with the same number keep POS order.
pub fn project(pos: &[NormalizedRecord], missing: &BTreeSet<String>) -> Vec<ReportRow> {
    let mut rows: Vec<ReportRow> = pos
        .iter()
        .filter(|record| missing.contains(&record.invoice_number))
        .map(ReportRow::from)
        .collect();
    rows.sort_by(|a, b| a.invoice_number.cmp(&b.invoice_number));
    rows
}
