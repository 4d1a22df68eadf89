//! Finding POS invoices that have no ERP document.

mod missing;
mod report;

pub use missing::missing_invoice_numbers;
pub use report::{Anomaly, COLUMNS, ReconciliationReport, ReportRow, project};

use crate::normalize::{NormalizedBatch, normalize_all};
use crate::{DateWindow, EmissionDate, RawErpRecord, RawPosRecord};

/// Both sources' rows for one date window, fully read.
#[derive(Debug, Clone)]
pub struct ReconcileState {
    pub window: DateWindow,
    pub pos: Vec<RawPosRecord>,
    pub erp: Vec<RawErpRecord>,
}

impl ReconcileState {
    pub fn new(window: DateWindow, pos: Vec<RawPosRecord>, erp: Vec<RawErpRecord>) -> Self {
        ReconcileState { window, pos, erp }
    }

    /// Normalize both sides and list the POS rows missing from the ERP.
    pub fn reconcile(&self) -> ReconciliationReport {
        let pos = normalize_all(&self.pos);
        let erp = normalize_all(&self.erp);

        let missing = missing_invoice_numbers(&pos.records, &erp.records);
        let rows = project(&pos.records, &missing);
        tracing::info!(
            "{} POS and {} ERP records for {}: {} invoice(s) missing",
            pos.records.len(),
            erp.records.len(),
            self.window,
            missing.len()
        );

        ReconciliationReport {
            window: self.window,
            missing,
            rows,
            anomalies: collect_anomalies(pos, erp),
        }
    }
}

fn collect_anomalies(pos: NormalizedBatch, erp: NormalizedBatch) -> Vec<Anomaly> {
    let mut anomalies = Vec::new();
    for batch in [pos, erp] {
        anomalies.extend(batch.records.into_iter().filter_map(|record| {
            match record.emission_date {
                EmissionDate::Unparsed(raw) => Some(Anomaly::UnparsedEmissionDate {
                    side: record.source,
                    invoice_number: record.invoice_number,
                    raw,
                }),
                EmissionDate::Date(_) => None,
            }
        }));
        anomalies.extend(batch.dropped.into_iter().map(Anomaly::DroppedRecord));
    }
    anomalies
}
