//! Bringing POS and ERP rows into the common [`NormalizedRecord`] shape.
//!
//! Every field rule is a small pure function so it can be checked on its own.

use crate::{EmissionDate, NormalizedRecord, RawErpRecord, RawPosRecord, Source};
use chrono::{DateTime, NaiveDate, NaiveDateTime};

pub const INVOICE_NUMBER_WIDTH: usize = 9;
pub const SERIES_WIDTH: usize = 3;
pub const STORE_WIDTH: usize = 7;
/// Fixed prefix of every store code synthesized on the POS side.
pub const POS_STORE_PREFIX: &str = "0101";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MalformedRecordError {
    #[error("{side} record without invoice number (receipt '{receipt}')")]
    MissingInvoiceNumber { side: Source, receipt: String },
}

/// Left-pad `value` with zeroes up to `width` characters.
///
/// A leading `+` or `-` stays in front of the zeroes. Values that are already
/// `width` characters or longer are returned unchanged, never truncated.
pub fn zero_pad(value: &str, width: usize) -> String {
    let len = value.chars().count();
    if len >= width {
        return value.to_owned();
    }
    let zeroes = "0".repeat(width - len);
    match value.strip_prefix(['+', '-']) {
        Some(rest) => {
            let sign = &value[..1];
            format!("{sign}{zeroes}{rest}")
        }
        None => format!("{zeroes}{value}"),
    }
}

/// Invoice number as a 9-character key. Non-numeric input is padded the same way.
pub fn pad_invoice_number(raw: &str) -> String {
    zero_pad(raw.trim(), INVOICE_NUMBER_WIDTH)
}

/// Series code padded to 3 characters.
pub fn pad_series(raw: &str) -> String {
    zero_pad(raw.trim(), SERIES_WIDTH)
}

/// ERP branch code padded to 7 characters, no prefix.
pub fn pad_branch(raw: &str) -> String {
    zero_pad(raw.trim(), STORE_WIDTH)
}

/// Store code synthesized from a POS terminal number.
///
/// An integer terminal of any length becomes [`POS_STORE_PREFIX`] followed by
/// the number padded to 3 digits (`"5"` gives `"0101005"`, `"0042"` gives
/// `"0101042"`). Anything else falls back to the raw text padded to 7
/// characters, which is a different shape from the synthesized code.
pub fn pos_store_code(terminal: &str) -> String {
    let terminal = terminal.trim();
    match canonical_integer(terminal) {
        Some(number) => format!("{POS_STORE_PREFIX}{}", zero_pad(&number, 3)),
        None => zero_pad(terminal, STORE_WIDTH),
    }
}

/// Decimal integer text without a `+` sign or leading zeroes, or `None` if
/// `value` is not an optionally signed run of ASCII digits.
fn canonical_integer(value: &str) -> Option<String> {
    let (negative, digits) = match value.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, value.strip_prefix('+').unwrap_or(value)),
    };
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let digits = digits.trim_start_matches('0');
    Some(match (digits.is_empty(), negative) {
        (true, _) => "0".to_owned(),
        (false, true) => format!("-{digits}"),
        (false, false) => digits.to_owned(),
    })
}

const DATE_TIME_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"];

/// Calendar date of a timestamp or date value; the time of day and any offset
/// are dropped. Unrecognized input is kept verbatim as [`EmissionDate::Unparsed`].
pub fn parse_emission_date(raw: &str) -> EmissionDate {
    let value = raw.trim();

    for format in DATE_TIME_FORMATS {
        if let Ok(datetime) = NaiveDateTime::parse_from_str(value, format) {
            return EmissionDate::Date(datetime.date());
        }
    }
    if let Ok(datetime) = DateTime::parse_from_rfc3339(value) {
        return EmissionDate::Date(datetime.date_naive());
    }
    if let Ok(date) = NaiveDate::parse_from_str(value, "%Y-%m-%d") {
        return EmissionDate::Date(date);
    }
    // Protheus keeps dates as YYYYMMDD strings
    if value.len() == 8
        && value.bytes().all(|b| b.is_ascii_digit())
        && let Ok(date) = NaiveDate::parse_from_str(value, "%Y%m%d")
    {
        return EmissionDate::Date(date);
    }

    EmissionDate::Unparsed(raw.to_owned())
}

/// A source row that can be brought into the common shape.
pub trait RawRecord {
    const SOURCE: Source;

    fn normalize(&self) -> Result<NormalizedRecord, MalformedRecordError>;
}

impl RawRecord for RawPosRecord {
    const SOURCE: Source = Source::Pos;

    fn normalize(&self) -> Result<NormalizedRecord, MalformedRecordError> {
        let receipt = self.receipt_ref.as_deref().unwrap_or_default().trim();
        let invoice_number = self.invoice_number.as_deref().ok_or_else(|| {
            MalformedRecordError::MissingInvoiceNumber {
                side: Source::Pos,
                receipt: receipt.to_owned(),
            }
        })?;
        let terminal = self.terminal.as_deref().unwrap_or_default();

        Ok(NormalizedRecord {
            source: Source::Pos,
            store: pos_store_code(terminal),
            series: pad_series(terminal),
            invoice_number: pad_invoice_number(invoice_number),
            receipt: receipt.to_owned(),
            emission_date: parse_emission_date(self.emission_ts.as_deref().unwrap_or_default()),
        })
    }
}

impl RawRecord for RawErpRecord {
    const SOURCE: Source = Source::Erp;

    fn normalize(&self) -> Result<NormalizedRecord, MalformedRecordError> {
        let receipt = self.aux_ref.as_deref().unwrap_or_default().trim();
        let invoice_number = self.document_number.as_deref().ok_or_else(|| {
            MalformedRecordError::MissingInvoiceNumber {
                side: Source::Erp,
                receipt: receipt.to_owned(),
            }
        })?;

        Ok(NormalizedRecord {
            source: Source::Erp,
            store: pad_branch(self.branch.as_deref().unwrap_or_default()),
            series: pad_series(self.series.as_deref().unwrap_or_default()),
            invoice_number: pad_invoice_number(invoice_number),
            receipt: receipt.to_owned(),
            emission_date: parse_emission_date(self.emission_date.as_deref().unwrap_or_default()),
        })
    }
}

/// Result of normalizing one source's rows.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct NormalizedBatch {
    pub records: Vec<NormalizedRecord>,
    pub dropped: Vec<MalformedRecordError>,
}

/// Normalize every row, setting aside the ones that cannot carry a key.
pub fn normalize_all<R: RawRecord>(rows: &[R]) -> NormalizedBatch {
    let mut batch = NormalizedBatch::default();
    for row in rows {
        match row.normalize() {
            Ok(record) => {
                if let EmissionDate::Unparsed(raw) = &record.emission_date {
                    tracing::warn!(
                        "{} invoice {} has unparseable emission date '{}'",
                        R::SOURCE,
                        record.invoice_number,
                        raw
                    );
                }
                batch.records.push(record);
            }
            Err(error) => {
                tracing::warn!("dropping record: {error}");
                batch.dropped.push(error);
            }
        }
    }
    tracing::debug!(
        "normalized {} {} records, dropped {}",
        batch.records.len(),
        R::SOURCE,
        batch.dropped.len()
    );
    batch
}
