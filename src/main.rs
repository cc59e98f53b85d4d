//! Forecast CLI
//!
//! Projects a scenario from JSON and prints per-period balances with
//! per-account summaries, optionally exporting the full table to CSV.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{anyhow, Context};
use chrono::NaiveDate;
use clap::Parser;

use forecast_engine::projection::{ProjectionEngine, ProjectionOptions, ProjectionTable};
use forecast_engine::schedule::Periodicity;
use forecast_engine::Scenario;

#[derive(Parser)]
#[command(name = "forecast", about = "Project account balances for a scenario")]
struct Args {
    /// Path to the scenario JSON file
    #[arg(long)]
    scenario: PathBuf,

    /// Override the reporting cadence: day, week, month, quarter, or year
    #[arg(long)]
    periodicity: Option<String>,

    /// Override the projection window start (YYYY-MM-DD)
    #[arg(long)]
    start: Option<NaiveDate>,

    /// Override the projection window end (YYYY-MM-DD)
    #[arg(long)]
    end: Option<NaiveDate>,

    /// Write the full projection table to this CSV path
    #[arg(long)]
    csv: Option<PathBuf>,
}

fn main() -> ExitCode {
    env_logger::init();
    match run(Args::parse()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(args: Args) -> anyhow::Result<()> {
    let scenario = Scenario::from_json_path(&args.scenario)
        .with_context(|| format!("loading scenario from {}", args.scenario.display()))?;

    let periodicity = args
        .periodicity
        .as_deref()
        .map(|raw| Periodicity::parse(raw).ok_or_else(|| anyhow!("unknown periodicity: {raw}")))
        .transpose()?;
    let options = ProjectionOptions {
        start_date: args.start,
        end_date: args.end,
        periodicity,
    };

    let engine = ProjectionEngine::new();
    let table = ProjectionTable::new(engine.generate(&scenario, &options)?);

    println!("Scenario: {} ({} accounts)", scenario.name, scenario.accounts.len());
    println!(
        "{:>10} {:<20} {:>12} {:>12} {:>12} {:>12} {:>12} {:>12}",
        "Date", "Account", "Balance", "Income", "Expenses", "Net", "Interest", "Period"
    );
    println!("{}", "-".repeat(108));
    for row in &table.records {
        println!(
            "{:>10} {:<20} {:>12.2} {:>12.2} {:>12.2} {:>12.2} {:>12.2} {:>12}",
            row.date.to_string(),
            row.account,
            row.balance,
            row.income,
            row.expenses,
            row.net_change,
            row.interest,
            row.period,
        );
    }

    println!("\nSummary:");
    for summary in table.summaries() {
        println!(
            "  {:<20} open {:>12.2}  close {:>12.2}  income {:>12.2}  expenses {:>12.2}  interest {:>10.2}",
            summary.account,
            summary.opening_balance,
            summary.closing_balance,
            summary.total_income,
            summary.total_expenses,
            summary.total_interest,
        );
    }

    if let Some(path) = &args.csv {
        let mut writer = csv::Writer::from_path(path)
            .with_context(|| format!("creating {}", path.display()))?;
        for row in &table.records {
            writer.serialize(row)?;
        }
        writer.flush()?;
        println!("\nFull results written to: {}", path.display());
    }

    Ok(())
}
