pub mod config;
pub mod export;
mod prompt;
pub mod show;

use std::io::{IsTerminal as _, Write};
use std::path::PathBuf;

use anyhow::{Context as _, Result};
use clap::{CommandFactory as _, Parser, Subcommand};
use nfe_reconcile::reconcile::ReconciliationReport;
use nfe_reconcile::{DateWindow, RawErpRecord, RawPosRecord};
use nfe_reconcile_sources::{InvoiceSource, MySqlPosReader, SqlServerErpReader};

use config::Config;
use export::SinkOutcome;
use show::Styles;

#[derive(Parser)]
#[command(
    name = "nfe-reconcile",
    about = "Find point-of-sale invoices that are missing from the ERP"
)]
#[command(disable_help_subcommand = true)]
struct Args {
    /// Config file. Defaults to nfe-reconcile.toml in the working directory
    /// or next to the executable.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Reconcile a date range, asking for any date not given (default)
    Check {
        /// First emission date, YYYY-MM-DD
        #[arg(long)]
        from: Option<String>,
        /// Last emission date, YYYY-MM-DD
        #[arg(long)]
        to: Option<String>,
    },
    /// Reconcile yesterday without prompting, for scheduled runs
    Daily,
}

/// Whether someone is watching the run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Always leaves a workbook behind, empty or not.
    Attended,
    /// Leaves a workbook only when something is missing.
    Unattended,
}

pub struct RunOutput {
    pub report: ReconciliationReport,
    pub outcome: SinkOutcome,
}

/// One full reconciliation: read both sources, compare, print, persist.
pub async fn reconcile_window<P, E>(
    mode: Mode,
    window: DateWindow,
    pos: &mut P,
    erp: &mut E,
    report_path: &std::path::Path,
    out: &mut impl Write,
    styles: &Styles,
) -> Result<RunOutput>
where
    P: InvoiceSource<Record = RawPosRecord>,
    E: InvoiceSource<Record = RawErpRecord>,
{
    let state = nfe_reconcile_sources::read_window(window, pos, erp).await?;
    let report = state.reconcile();

    show::print_report(out, &report, styles)?;
    let outcome = export::persist(&report, report_path, mode)?;
    show::print_outcome(out, &report, &outcome)?;

    Ok(RunOutput { report, outcome })
}

pub async fn run(args: impl IntoIterator<Item = String>) -> Result<()> {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "nfe_reconcile=info".into());
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();

    clap_complete::CompleteEnv::with_factory(Args::command).complete();

    let args = Args::parse_from(args);
    let command = args.command.unwrap_or(Commands::Check {
        from: None,
        to: None,
    });

    config::load_dotenv();
    let env = |var: &str| std::env::var(var).ok();
    let config = Config::resolve(args.config.as_deref(), env)?;

    let (mode, window) = match command {
        Commands::Check { from, to } => (Mode::Attended, prompt::date_window(from, to)?),
        Commands::Daily => (Mode::Unattended, DateWindow::yesterday()?),
    };

    let mut pos = MySqlPosReader::new(config.pos_settings(env)?);
    let mut erp = SqlServerErpReader::new(config.erp_settings(env)?);

    let styles = if std::io::stdout().is_terminal() {
        Styles::colored()
    } else {
        Styles::plain()
    };
    let report_path = config.report_path();
    let mut stdout = std::io::stdout().lock();

    reconcile_window(
        mode,
        window,
        &mut pos,
        &mut erp,
        &report_path,
        &mut stdout,
        &styles,
    )
    .await
    .with_context(|| format!("reconciliation for {window} failed"))?;

    Ok(())
}
