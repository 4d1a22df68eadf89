use std::io::{self, Write};

use anstyle::{AnsiColor, Color, Style};
use nfe_reconcile::reconcile::{COLUMNS, ReconciliationReport};

use crate::export::SinkOutcome;

#[derive(Debug, Clone, Copy)]
pub struct Styles {
    missing: Style,
    anomaly: Style,
    ok: Style,
    bold: Style,
}

impl Styles {
    pub fn colored() -> Self {
        Styles {
            missing: Style::new().fg_color(Some(Color::Ansi(AnsiColor::Red))),
            anomaly: Style::new().fg_color(Some(Color::Ansi(AnsiColor::Yellow))),
            ok: Style::new().fg_color(Some(Color::Ansi(AnsiColor::Green))),
            bold: Style::new().bold(),
        }
    }

    pub fn plain() -> Self {
        Styles {
            missing: Style::new(),
            anomaly: Style::new(),
            ok: Style::new(),
            bold: Style::new(),
        }
    }
}

const RULE: &str = "---------------------------------";

pub fn print_report(
    out: &mut impl Write,
    report: &ReconciliationReport,
    styles: &Styles,
) -> io::Result<()> {
    let Styles {
        missing,
        anomaly,
        ok,
        bold,
    } = *styles;

    writeln!(
        out,
        "Found {missing}{}{missing:#} invoice(s) missing from the ERP for {}.",
        report.missing_count(),
        report.window
    )?;
    writeln!(out)?;
    writeln!(out, "{bold}━━━ Missing invoices, please check ━━━{bold:#}")?;
    writeln!(out)?;

    if report.is_empty() {
        writeln!(out, "{ok}--- no skipped invoices for the given dates ---{ok:#}")?;
    } else {
        write_table(out, report)?;
    }

    if !report.anomalies.is_empty() {
        writeln!(out)?;
        writeln!(out, "{anomaly}━━━ Anomalies ━━━{anomaly:#}")?;
        for item in &report.anomalies {
            writeln!(out, "  {item}")?;
        }
    }

    writeln!(out)?;
    writeln!(out, "{RULE}")?;
    Ok(())
}

fn write_table(out: &mut impl Write, report: &ReconciliationReport) -> io::Result<()> {
    let rows: Vec<[String; 5]> = report.rows.iter().map(|row| row.cells()).collect();

    let mut widths = COLUMNS.map(str::len);
    for cells in &rows {
        for (width, cell) in widths.iter_mut().zip(cells) {
            *width = (*width).max(cell.chars().count());
        }
    }

    let header = COLUMNS.map(str::to_owned);
    for cells in std::iter::once(&header).chain(&rows) {
        let line = cells
            .iter()
            .zip(widths)
            .map(|(cell, width)| format!("{cell:<width$}"))
            .collect::<Vec<_>>()
            .join("  ");
        writeln!(out, "{}", line.trim_end())?;
    }
    Ok(())
}

pub fn print_outcome(
    out: &mut impl Write,
    report: &ReconciliationReport,
    outcome: &SinkOutcome,
) -> io::Result<()> {
    match outcome {
        SinkOutcome::Written(path) => {
            writeln!(out, "Report with the missing invoices saved to: {}", path.display())?
        }
        SinkOutcome::RemovedStale(path) => writeln!(
            out,
            "No pending invoices found. Removed the previous report at: {}",
            path.display()
        )?,
        SinkOutcome::Skipped => writeln!(
            out,
            "No pending invoices found. The report was not generated."
        )?,
    }
    writeln!(out, "Total missing rows: {}", report.rows.len())?;
    writeln!(out, "{RULE}")?;
    Ok(())
}
