use chrono::NaiveDate;
use std::fmt;

/// Which system a record was read from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Source {
    Pos,
    Erp,
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Source::Pos => f.write_str("POS"),
            Source::Erp => f.write_str("ERP"),
        }
    }
}

/// One row of the point-of-sale invoice table, every column rendered as text.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawPosRecord {
    pub invoice_number: Option<String>,
    pub receipt_ref: Option<String>,
    pub terminal: Option<String>,
    pub store: Option<String>,
    pub emission_ts: Option<String>,
}

/// One ERP document row. `aux_ref` comes from a left join and is often absent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawErpRecord {
    pub document_number: Option<String>,
    pub aux_ref: Option<String>,
    pub series: Option<String>,
    pub branch: Option<String>,
    pub emission_date: Option<String>,
}

/// Calendar date of emission, or the source text when it could not be parsed.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum EmissionDate {
    Date(NaiveDate),
    Unparsed(String),
}

impl fmt::Display for EmissionDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EmissionDate::Date(date) => write!(f, "{}", date.format("%Y-%m-%d")),
            EmissionDate::Unparsed(raw) => f.write_str(raw),
        }
    }
}

/// The shape both sources are brought into before comparison.
///
/// Only `invoice_number` takes part in the comparison; the other fields are
/// carried along for the report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedRecord {
    pub source: Source,
    pub store: String,
    pub series: String,
    pub invoice_number: String,
    pub receipt: String,
    pub emission_date: EmissionDate,
}
