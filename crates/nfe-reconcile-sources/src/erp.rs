use crate::{InvoiceSource, SourceError};
use async_trait::async_trait;
use nfe_reconcile::{DateWindow, RawErpRecord};
use std::time::Duration;
use tiberius::{AuthMethod, Client, Config, EncryptionLevel, Row};
use tokio::net::TcpStream;
use tokio_util::compat::{Compat, TokioAsyncWriteCompatExt};

const NAME: &str = "SQL Server ERP";

/// Outgoing fiscal documents (SF2) with their optional sale header (SL1).
/// Only series codes of exactly three characters are relevant.
const QUERY: &str = r#"
SELECT
    SF2.F2_DOC AS document_number,
    SL1.L1_XXARIUS AS aux_ref,
    SF2.F2_SERIE AS series,
    SF2.F2_FILIAL AS branch,
    SF2.F2_EMISSAO AS emission_date
FROM SF2010 AS SF2
LEFT JOIN SL1010 AS SL1
    ON SF2.F2_DOC = SL1.L1_DOC
   AND SF2.F2_SERIE = SL1.L1_SERIE
   AND SF2.F2_FILIAL = SL1.L1_FILIAL
WHERE SF2.F2_EMISSAO BETWEEN @P1 AND @P2
  AND LEN(SF2.F2_SERIE) = 3
"#;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErpSettings {
    pub host: String,
    pub port: u16,
    pub database: String,
    pub user: String,
    pub password: String,
    pub trust_certificate: bool,
    pub encrypt: bool,
    pub application_name: String,
    /// Log in with `ApplicationIntent=ReadOnly`.
    pub read_only: bool,
    pub connect_timeout: Duration,
}

pub struct SqlServerErpReader {
    settings: ErpSettings,
}

impl SqlServerErpReader {
    pub fn new(settings: ErpSettings) -> Self {
        SqlServerErpReader { settings }
    }

    fn config(&self) -> Config {
        let settings = &self.settings;
        let mut config = Config::new();
        config.host(&settings.host);
        config.port(settings.port);
        config.database(&settings.database);
        config.authentication(AuthMethod::sql_server(&settings.user, &settings.password));
        config.application_name(&settings.application_name);
        config.readonly(settings.read_only);
        if settings.trust_certificate {
            config.trust_cert();
        }
        config.encryption(if settings.encrypt {
            EncryptionLevel::Required
        } else {
            EncryptionLevel::Off
        });
        config
    }

    async fn connect(&self) -> Result<Client<Compat<TcpStream>>, SourceError> {
        let config = self.config();
        let connect = async {
            let tcp = TcpStream::connect(config.get_addr())
                .await
                .map_err(|error| SourceError::connection(NAME, error))?;
            tcp.set_nodelay(true)
                .map_err(|error| SourceError::connection(NAME, error))?;
            Client::connect(config, tcp.compat_write())
                .await
                .map_err(|error| SourceError::connection(NAME, error))
        };

        let timeout = self.settings.connect_timeout;
        tokio::time::timeout(timeout, connect)
            .await
            .unwrap_or(Err(SourceError::ConnectTimeout {
                source_name: NAME,
                seconds: timeout.as_secs(),
            }))
    }
}

fn text(row: &Row, column: &str) -> Result<Option<String>, SourceError> {
    row.try_get::<&str, _>(column)
        .map(|value| value.map(ToOwned::to_owned))
        .map_err(|error| SourceError::query(NAME, error))
}

fn erp_record(row: &Row) -> Result<RawErpRecord, SourceError> {
    Ok(RawErpRecord {
        document_number: text(row, "document_number")?,
        aux_ref: text(row, "aux_ref")?,
        series: text(row, "series")?,
        branch: text(row, "branch")?,
        emission_date: text(row, "emission_date")?,
    })
}

#[async_trait]
impl InvoiceSource for SqlServerErpReader {
    type Record = RawErpRecord;

    fn name(&self) -> &'static str {
        NAME
    }

    async fn fetch(&mut self, window: &DateWindow) -> Result<Vec<RawErpRecord>, SourceError> {
        let mut client = self.connect().await?;
        tracing::debug!(
            "connected to {NAME} at {}:{}",
            self.settings.host,
            self.settings.port
        );

        let (from, to) = window.compact_bounds();
        let rows = client
            .query(QUERY, &[&from, &to])
            .await
            .map_err(|error| SourceError::query(NAME, error))?
            .into_first_result()
            .await
            .map_err(|error| SourceError::query(NAME, error))?;

        let records = rows.iter().map(erp_record).collect::<Result<Vec<_>, _>>()?;

        if let Err(error) = client.close().await {
            tracing::debug!("closing {NAME} connection: {error}");
        }

        Ok(records)
    }
}
