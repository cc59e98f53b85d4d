//! Goal solver CLI
//!
//! Loads a scenario plus solver settings, runs the advanced goal solver,
//! and prints the explanation, warnings, issues, and suggested monthly
//! transactions. Exits non-zero when no feasible plan exists.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;

use forecast_engine::model::SolverSettings;
use forecast_engine::solver::GoalSolver;
use forecast_engine::Scenario;

#[derive(Parser)]
#[command(name = "solve_goals", about = "Suggest monthly contributions for prioritized goals")]
struct Args {
    /// Path to the scenario JSON file
    #[arg(long)]
    scenario: PathBuf,

    /// Path to the solver settings JSON file (goals + constraints)
    #[arg(long)]
    settings: PathBuf,

    /// Print the raw result as JSON instead of formatted text
    #[arg(long)]
    json: bool,
}

fn main() -> ExitCode {
    env_logger::init();
    match run(Args::parse()) {
        Ok(feasible) => {
            if feasible {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            }
        }
        Err(err) => {
            eprintln!("error: {err:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(args: Args) -> anyhow::Result<bool> {
    let scenario = Scenario::from_json_path(&args.scenario)
        .with_context(|| format!("loading scenario from {}", args.scenario.display()))?;
    let settings = SolverSettings::from_json_path(&args.settings)
        .with_context(|| format!("loading solver settings from {}", args.settings.display()))?;

    let result = GoalSolver::production().solve(&scenario, &settings);

    if args.json {
        println!("{}", serde_json::to_string_pretty(&result)?);
        return Ok(result.is_feasible);
    }

    for line in &result.explanation {
        println!("{line}");
    }
    if !result.warnings.is_empty() {
        println!("\nWarnings:");
        for warning in &result.warnings {
            println!("  - {warning}");
        }
    }
    if !result.issues.is_empty() {
        println!("\nIssues:");
        for issue in &result.issues {
            println!("  - {issue}");
        }
    }

    if !result.suggested_transactions.is_empty() {
        println!("\nSuggested monthly transactions:");
        for tx in &result.suggested_transactions {
            let window = tx
                .recurrence
                .as_ref()
                .and_then(|r| Some((r.start_date?, r.end_date?)))
                .map(|(s, e)| format!("{s} to {e}"))
                .unwrap_or_else(|| "open-ended".to_string());
            println!("  {:<40} {:>10.2}/month  ({window})", tx.description, tx.amount);
        }
    }

    println!(
        "\nFeasible: {}",
        if result.is_feasible { "yes" } else { "no" }
    );
    Ok(result.is_feasible)
}
