use anyhow::{Context, Result, bail};
use chrono::{Local, NaiveDate};
use std::fmt;

/// Inclusive range of emission dates a run looks at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateWindow {
    from: NaiveDate,
    to: NaiveDate,
}

impl DateWindow {
    pub fn new(from: NaiveDate, to: NaiveDate) -> Result<Self> {
        if from > to {
            bail!("start date {from} is after end date {to}");
        }
        Ok(DateWindow { from, to })
    }

    pub fn single_day(day: NaiveDate) -> Self {
        DateWindow { from: day, to: day }
    }

    /// The day before `today`, as both bounds.
    pub fn day_before(today: NaiveDate) -> Result<Self> {
        let yesterday = today
            .pred_opt()
            .with_context(|| format!("no day before {today}"))?;
        Ok(DateWindow::single_day(yesterday))
    }

    /// Yesterday in local time, the window of the unattended run.
    pub fn yesterday() -> Result<Self> {
        DateWindow::day_before(Local::now().date_naive())
    }

    /// Parse two `YYYY-MM-DD` dates.
    pub fn parse(from: &str, to: &str) -> Result<Self> {
        DateWindow::new(parse_iso_date(from)?, parse_iso_date(to)?)
    }

    pub fn from(&self) -> NaiveDate {
        self.from
    }

    pub fn to(&self) -> NaiveDate {
        self.to
    }

    /// Bounds as `YYYY-MM-DD`.
    pub fn iso_bounds(&self) -> (String, String) {
        (
            self.from.format("%Y-%m-%d").to_string(),
            self.to.format("%Y-%m-%d").to_string(),
        )
    }

    /// Bounds as `YYYYMMDD`, the way Protheus stores dates.
    pub fn compact_bounds(&self) -> (String, String) {
        (
            self.from.format("%Y%m%d").to_string(),
            self.to.format("%Y%m%d").to_string(),
        )
    }
}

impl fmt::Display for DateWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.from == self.to {
            write!(f, "{}", self.from)
        } else {
            write!(f, "{} to {}", self.from, self.to)
        }
    }
}

fn parse_iso_date(value: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d")
        .with_context(|| format!("invalid date '{}', expected YYYY-MM-DD", value.trim()))
}
