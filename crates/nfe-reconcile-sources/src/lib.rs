//! Readers for the two systems being reconciled.
//!
//! - [`MySqlPosReader`] reads issued invoices from the point-of-sale database.
//! - [`SqlServerErpReader`] reads fiscal documents from the Protheus ERP.
//!
//! Both return every column as text; interpretation happens in
//! [`nfe_reconcile::normalize`].

mod error;
mod erp;
mod pos;

pub use erp::{ErpSettings, SqlServerErpReader};
pub use error::SourceError;
pub use pos::{MySqlPosReader, PosSettings};

use async_trait::async_trait;
use nfe_reconcile::reconcile::ReconcileState;
use nfe_reconcile::{DateWindow, RawErpRecord, RawPosRecord};

/// A read-only query over one system for a date window.
///
/// An empty result is a normal outcome and comes back as an empty `Vec`.
#[async_trait]
pub trait InvoiceSource: Send {
    type Record: Send;

    /// Human readable name used in logs and errors.
    fn name(&self) -> &'static str;

    async fn fetch(&mut self, window: &DateWindow) -> Result<Vec<Self::Record>, SourceError>;
}

/// Read both sources for `window`, concurrently, and hold on to all rows.
pub async fn read_window<P, E>(
    window: DateWindow,
    pos: &mut P,
    erp: &mut E,
) -> Result<ReconcileState, SourceError>
where
    P: InvoiceSource<Record = RawPosRecord>,
    E: InvoiceSource<Record = RawErpRecord>,
{
    tracing::info!("reading {} and {} for {window}", pos.name(), erp.name());
    let (pos_rows, erp_rows) = tokio::try_join!(pos.fetch(&window), erp.fetch(&window))?;
    tracing::info!(
        "read {} rows from {} and {} rows from {}",
        pos_rows.len(),
        pos.name(),
        erp_rows.len(),
        erp.name()
    );
    Ok(ReconcileState::new(window, pos_rows, erp_rows))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    struct Fixed<R> {
        name: &'static str,
        rows: Vec<R>,
        fail: bool,
    }

    #[async_trait]
    impl<R: Clone + Send + Sync> InvoiceSource for Fixed<R> {
        type Record = R;

        fn name(&self) -> &'static str {
            self.name
        }

        async fn fetch(&mut self, _window: &DateWindow) -> Result<Vec<R>, SourceError> {
            if self.fail {
                return Err(SourceError::connection(self.name, "unreachable"));
            }
            Ok(self.rows.clone())
        }
    }

    fn window() -> DateWindow {
        DateWindow::single_day(NaiveDate::from_ymd_opt(2025, 3, 1).unwrap())
    }

    #[tokio::test]
    async fn read_window_collects_both_sides() {
        let mut pos = Fixed {
            name: "pos",
            rows: vec![RawPosRecord {
                invoice_number: Some("1".to_owned()),
                ..Default::default()
            }],
            fail: false,
        };
        let mut erp: Fixed<RawErpRecord> = Fixed {
            name: "erp",
            rows: Vec::new(),
            fail: false,
        };

        let state = read_window(window(), &mut pos, &mut erp).await.unwrap();
        assert_eq!(state.window, window());
        assert_eq!(state.pos.len(), 1);
        assert!(state.erp.is_empty());
    }

    #[tokio::test]
    async fn read_window_fails_when_one_side_fails() {
        let mut pos: Fixed<RawPosRecord> = Fixed {
            name: "pos",
            rows: Vec::new(),
            fail: false,
        };
        let mut erp: Fixed<RawErpRecord> = Fixed {
            name: "erp",
            rows: Vec::new(),
            fail: true,
        };

        let error = read_window(window(), &mut pos, &mut erp)
            .await
            .unwrap_err();
        assert_eq!(error.source_name(), "erp");
    }
}
