use crate::{InvoiceSource, SourceError};
use async_trait::async_trait;
use nfe_reconcile::{DateWindow, RawPosRecord};
use sqlx::mysql::MySqlConnectOptions;
use sqlx::{Connection, MySqlConnection};
use std::time::Duration;

const NAME: &str = "MySQL POS";

/// Issued invoices whose emission falls on the given days. Rows without an
/// invoice number are left out here so they never reach normalization.
const QUERY: &str = r#"
SELECT
    CAST(numero_nfe AS CHAR) AS invoice_number,
    CAST(NroCupom AS CHAR) AS receipt_ref,
    CAST(Pdv AS CHAR) AS terminal,
    CAST(nroloja AS CHAR) AS store,
    CAST(dthr_emit_nfe AS CHAR) AS emission_ts
FROM nfce
WHERE DATE(dthr_emit_nfe) BETWEEN ? AND ?
  AND numero_nfe IS NOT NULL
"#;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PosSettings {
    pub host: String,
    pub port: u16,
    pub database: String,
    pub user: String,
    pub password: String,
    pub connect_timeout: Duration,
}

#[derive(sqlx::FromRow)]
struct PosRow {
    invoice_number: Option<String>,
    receipt_ref: Option<String>,
    terminal: Option<String>,
    store: Option<String>,
    emission_ts: Option<String>,
}

impl From<PosRow> for RawPosRecord {
    fn from(row: PosRow) -> Self {
        RawPosRecord {
            invoice_number: row.invoice_number,
            receipt_ref: row.receipt_ref,
            terminal: row.terminal,
            store: row.store,
            emission_ts: row.emission_ts,
        }
    }
}

pub struct MySqlPosReader {
    settings: PosSettings,
}

impl MySqlPosReader {
    pub fn new(settings: PosSettings) -> Self {
        MySqlPosReader { settings }
    }

    fn connect_options(&self) -> MySqlConnectOptions {
        MySqlConnectOptions::new()
            .host(&self.settings.host)
            .port(self.settings.port)
            .database(&self.settings.database)
            .username(&self.settings.user)
            .password(&self.settings.password)
    }

    async fn connect(&self) -> Result<MySqlConnection, SourceError> {
        let timeout = self.settings.connect_timeout;
        let options = self.connect_options();
        match tokio::time::timeout(timeout, MySqlConnection::connect_with(&options)).await {
            Ok(connection) => connection.map_err(|error| SourceError::connection(NAME, error)),
            Err(_) => Err(SourceError::ConnectTimeout {
                source_name: NAME,
                seconds: timeout.as_secs(),
            }),
        }
    }
}

#[async_trait]
impl InvoiceSource for MySqlPosReader {
    type Record = RawPosRecord;

    fn name(&self) -> &'static str {
        NAME
    }

    async fn fetch(&mut self, window: &DateWindow) -> Result<Vec<RawPosRecord>, SourceError> {
        let mut connection = self.connect().await?;
        tracing::debug!(
            "connected to {NAME} at {}:{}",
            self.settings.host,
            self.settings.port
        );

        let (from, to) = window.iso_bounds();
        let rows: Vec<PosRow> = sqlx::query_as(QUERY)
            .bind(from)
            .bind(to)
            .fetch_all(&mut connection)
            .await
            .map_err(|error| SourceError::query(NAME, error))?;

        if let Err(error) = connection.close().await {
            tracing::debug!("closing {NAME} connection: {error}");
        }

        Ok(rows.into_iter().map(RawPosRecord::from).collect())
    }
}
