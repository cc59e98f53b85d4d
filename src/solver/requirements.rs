//! Goal requirement construction
//!
//! Turns goal declarations into per-goal required monthly contributions
//! using closed-form annuity math, and surfaces precondition issues as
//! strings. Maintain-floor goals produce no contribution requirement; they
//! merge into the constraint set's balance floors instead.

use std::collections::HashMap;

use chrono::NaiveDate;

use crate::growth::tvm;
use crate::model::{DateRange, Goal, GoalKind, Scenario, SolverConstraints};

/// A contribution-bearing goal with its resolved dates and the monthly
/// amount needed to satisfy it analytically.
#[derive(Debug, Clone, PartialEq)]
pub struct GoalRequirement {
    pub goal: Goal,
    pub account_name: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub months: i32,
    pub required_monthly: f64,
}

/// Requirements plus any precondition issues found along the way.
#[derive(Debug, Clone, Default)]
pub struct RequirementSet {
    pub requirements: Vec<GoalRequirement>,
    pub issues: Vec<String>,
}

/// Stable solve order: priority ascending, then goal id.
pub fn sort_goals(goals: &[Goal]) -> Vec<Goal> {
    let mut sorted: Vec<Goal> = goals.iter().cloned().map(Goal::normalized).collect();
    sorted.sort_by(|a, b| a.priority.cmp(&b.priority).then_with(|| a.id.cmp(&b.id)));
    sorted
}

/// Combine explicit per-account floors with maintain-floor goals, keeping
/// the highest floor per account.
pub fn merge_floor_constraints(
    goals: &[Goal],
    constraints: &SolverConstraints,
) -> HashMap<i64, f64> {
    let mut floors = constraints.min_balance_floors_by_account_id.clone();
    for goal in goals {
        if goal.kind != GoalKind::MaintainFloor {
            continue;
        }
        let Some(floor) = goal.floor_amount else { continue };
        floors
            .entry(goal.account_id)
            .and_modify(|existing| *existing = existing.max(floor))
            .or_insert(floor);
    }
    floors
}

/// Build requirements for every contribution-bearing goal, validating each
/// against the solver window. Violations become issues and the offending
/// goal is skipped; callers fail closed when any issue exists.
pub fn build_requirements(
    scenario: &Scenario,
    goals: &[Goal],
    window: DateRange,
) -> RequirementSet {
    let mut set = RequirementSet::default();

    for goal in goals {
        if goal.kind == GoalKind::MaintainFloor {
            continue;
        }
        let Some(account) = scenario.account(goal.account_id) else {
            set.issues.push(format!("Goal account not found: account_id={}", goal.account_id));
            continue;
        };

        let start_date = goal.start_date.unwrap_or(window.start_date);
        let end_date = goal.end_date.unwrap_or(window.end_date);

        // Goals must be solvable within the window; projections cannot
        // validate dates outside it.
        if start_date < window.start_date {
            set.issues.push(format!(
                "Goal start date ({start_date}) is before the solver window start ({}) for account: {}",
                window.start_date, account.name
            ));
            continue;
        }
        if end_date > window.end_date {
            set.issues.push(format!(
                "Goal end date ({end_date}) is after the solver window end ({}) for account: {}",
                window.end_date, account.name
            ));
            continue;
        }

        let months = tvm::whole_months_between(start_date, end_date);
        if months <= 0 {
            set.issues
                .push(format!("Goal end date must be after start date for account: {}", account.name));
            continue;
        }

        let starting_balance = account.starting_balance;
        let annual_rate = account.annual_rate();

        let required_monthly = match goal.kind {
            GoalKind::ReachBalanceByDate => {
                let Some(target) = goal.target_amount else {
                    set.issues.push(format!(
                        "Reach-balance goal missing target amount for account: {}",
                        account.name
                    ));
                    continue;
                };
                tvm::contribution_amount(starting_balance, target, months as f64, annual_rate)
            }
            GoalKind::IncreaseByDelta => {
                let Some(delta) = goal.delta_amount else {
                    set.issues.push(format!(
                        "Increase-by-delta goal missing delta amount for account: {}",
                        account.name
                    ));
                    continue;
                };
                tvm::contribution_amount(
                    starting_balance,
                    starting_balance + delta,
                    months as f64,
                    annual_rate,
                )
            }
            GoalKind::PayDownByDate => {
                // Liabilities are often modeled as negative balances;
                // pay-down moves the balance toward the target from
                // whichever side it starts on, independent of compounding.
                let target = goal.target_amount.unwrap_or(0.0);
                (starting_balance - target).abs() / months as f64
            }
            GoalKind::MaintainFloor => unreachable!("floor goals are filtered above"),
        };

        if !required_monthly.is_finite() || required_monthly < 0.0 {
            set.issues.push(format!(
                "Failed to compute a required monthly amount for: {}",
                account.name
            ));
            continue;
        }

        set.requirements.push(GoalRequirement {
            goal: goal.clone(),
            account_name: account.name.clone(),
            start_date,
            end_date,
            months,
            required_monthly,
        });
    }

    set
}
