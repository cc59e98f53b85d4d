//! Projection-based solution refinement
//!
//! The LP solve works from closed-form monthly requirements; refinement
//! splices the candidate transactions into a scenario copy, runs the real
//! projection, and checks every goal and balance floor against it. The
//! loop is an explicit bounded state machine so its termination guarantee
//! is auditable: at most `MAX_ITERATIONS` validation passes, each followed
//! by either a floor-driven scale-down or a shortfall-driven re-solve.

use std::collections::HashMap;

use chrono::NaiveDate;
use log::debug;

use crate::model::{DateRange, Goal, GoalKind, Scenario, SolverConstraints};
use crate::projection::ProjectionRecord;
use crate::solver::requirements::GoalRequirement;
use crate::solver::{
    build_suggested_transactions, solve_contributions, solver_projection_options, LpSolver,
    Projector, SolveError,
};

/// Validation passes before the refiner gives up.
pub const MAX_ITERATIONS: u32 = 5;

/// Bisection steps when searching for a floor-safe scale factor.
const FLOOR_SCALE_STEPS: u32 = 10;

/// Slack applied to all balance comparisons.
const TOLERANCE: f64 = 1e-6;

/// States of the refinement machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefineState {
    /// Solve the LP from the current per-goal requirements.
    Solve,
    /// Project the candidate and evaluate goals and floors.
    Validate,
    /// Scale all contributions down until floors hold.
    ScaleForFloors,
    /// Raise failed goals' requirements by their shortfall and re-solve.
    BumpAndResolve,
    /// Every check passed.
    Done,
    /// Iteration budget exhausted or the LP became infeasible.
    GaveUp,
}

/// One unmet goal or floor after projection.
#[derive(Debug, Clone, PartialEq)]
pub struct GoalFailure {
    pub goal_id: String,
    /// Human-readable category: a goal kind tag or "floor".
    pub label: String,
    pub is_floor: bool,
    pub shortfall: f64,
}

/// Final refinement output: the contribution amounts to materialize, any
/// remaining failures, and warnings gathered along the way.
#[derive(Debug, Clone)]
pub struct RefineOutcome {
    pub amounts: HashMap<String, f64>,
    pub failures: Vec<GoalFailure>,
    pub warnings: Vec<String>,
    pub final_state: RefineState,
}

/// Group projection records per account, preserving period order.
pub fn index_projections(records: Vec<ProjectionRecord>) -> HashMap<i64, Vec<ProjectionRecord>> {
    let mut by_account: HashMap<i64, Vec<ProjectionRecord>> = HashMap::new();
    for record in records {
        by_account.entry(record.account_id).or_default().push(record);
    }
    for list in by_account.values_mut() {
        list.sort_by_key(|r| r.date);
    }
    by_account
}

/// Balance of the last record at or before `date`, or `fallback` when no
/// record precedes it.
pub fn balance_at_or_before(records: &[ProjectionRecord], date: NaiveDate, fallback: f64) -> f64 {
    records
        .iter()
        .take_while(|r| r.date <= date)
        .last()
        .map(|r| r.balance)
        .unwrap_or(fallback)
}

fn minimum_balance(records: &[ProjectionRecord], starting_balance: f64) -> f64 {
    records
        .iter()
        .map(|r| r.balance)
        .fold(starting_balance, f64::min)
}

/// Evaluate goals and explicit floors against projected balances. Pass an
/// empty goal slice to check floors alone.
pub fn evaluate_goals(
    scenario: &Scenario,
    goals: &[Goal],
    floors: &HashMap<i64, f64>,
    by_account: &HashMap<i64, Vec<ProjectionRecord>>,
    window: DateRange,
) -> Vec<GoalFailure> {
    let empty: Vec<ProjectionRecord> = Vec::new();
    let mut failures = Vec::new();

    for goal in goals {
        let starting_balance = scenario
            .account(goal.account_id)
            .map(|a| a.starting_balance)
            .unwrap_or(0.0);
        let records = by_account.get(&goal.account_id).unwrap_or(&empty);
        let start_date = goal.start_date.unwrap_or(window.start_date);
        let end_date = goal.end_date.unwrap_or(window.end_date);
        let start_bal = balance_at_or_before(records, start_date, starting_balance);
        let end_bal = balance_at_or_before(records, end_date, starting_balance);

        let mut fail = |shortfall: f64| {
            failures.push(GoalFailure {
                goal_id: goal.id.clone(),
                label: goal.kind.tag().to_string(),
                is_floor: goal.kind == GoalKind::MaintainFloor,
                shortfall,
            });
        };

        match goal.kind {
            GoalKind::ReachBalanceByDate => {
                let Some(target) = goal.target_amount else { continue };
                if end_bal + TOLERANCE < target {
                    fail(target - end_bal);
                }
            }
            GoalKind::PayDownByDate => {
                // Success means ending on (or past) the target from
                // whichever side the balance started.
                let target = goal.target_amount.unwrap_or(0.0);
                if start_bal < target {
                    if end_bal + TOLERANCE < target {
                        fail(target - end_bal);
                    }
                } else if end_bal - TOLERANCE > target {
                    fail(end_bal - target);
                }
            }
            GoalKind::IncreaseByDelta => {
                let Some(delta) = goal.delta_amount else { continue };
                if end_bal - start_bal + TOLERANCE < delta {
                    fail(delta - (end_bal - start_bal));
                }
            }
            GoalKind::MaintainFloor => {
                let Some(floor) = goal.floor_amount else { continue };
                let min_bal = minimum_balance(records, starting_balance);
                if min_bal + TOLERANCE < floor {
                    fail(floor - min_bal);
                }
            }
        }
    }

    // Explicit floors, stable order for reproducible explanations.
    let mut floor_entries: Vec<(&i64, &f64)> = floors.iter().collect();
    floor_entries.sort_by_key(|(id, _)| **id);
    for (&account_id, &floor) in floor_entries {
        let starting_balance = scenario
            .account(account_id)
            .map(|a| a.starting_balance)
            .unwrap_or(0.0);
        let records = by_account.get(&account_id).unwrap_or(&empty);
        let min_bal = minimum_balance(records, starting_balance);
        if min_bal + TOLERANCE < floor {
            failures.push(GoalFailure {
                goal_id: format!("floor:{account_id}"),
                label: "floor".to_string(),
                is_floor: true,
                shortfall: floor - min_bal,
            });
        }
    }

    failures
}

fn scale_amounts(amounts: &HashMap<String, f64>, scale: f64) -> HashMap<String, f64> {
    amounts.iter().map(|(k, v)| (k.clone(), v * scale)).collect()
}

/// Refinement driver over an injected projector and LP backend.
pub(crate) struct Refiner<'a, P, S> {
    pub projector: &'a P,
    pub lp: &'a S,
    pub scenario: &'a Scenario,
    pub goals: &'a [Goal],
    pub requirements: &'a [GoalRequirement],
    pub constraints: &'a SolverConstraints,
    pub floors: &'a HashMap<i64, f64>,
    pub window: DateRange,
    pub max_outflow: Option<f64>,
}

impl<P: Projector, S: LpSolver> Refiner<'_, P, S> {
    /// Project the scenario with the candidate transactions spliced in.
    fn project_candidate(
        &self,
        amounts: &HashMap<String, f64>,
    ) -> Result<HashMap<i64, Vec<ProjectionRecord>>, SolveError> {
        let candidate =
            build_suggested_transactions(self.scenario, self.requirements, amounts, self.constraints);
        let mut spliced = self.scenario.clone();
        spliced.transactions.extend(candidate);
        let records = self
            .projector
            .project(&spliced, &solver_projection_options(self.window))?;
        Ok(index_projections(records))
    }

    /// Largest scale in [0, 1] for the contribution amounts under which
    /// every explicit floor holds, found by bisection.
    fn find_floor_safe_scale(&self, amounts: &HashMap<String, f64>) -> Result<f64, SolveError> {
        let (mut lo, mut hi, mut best) = (0.0_f64, 1.0_f64, 0.0_f64);
        for _ in 0..FLOOR_SCALE_STEPS {
            let mid = (lo + hi) / 2.0;
            let by_account = self.project_candidate(&scale_amounts(amounts, mid))?;
            let floor_failures =
                evaluate_goals(self.scenario, &[], self.floors, &by_account, self.window);
            if floor_failures.is_empty() {
                best = mid;
                lo = mid;
            } else {
                hi = mid;
            }
        }
        Ok(best)
    }

    /// Run the machine to completion.
    pub fn run(&self) -> Result<RefineOutcome, SolveError> {
        let mut required: HashMap<String, f64> = self
            .requirements
            .iter()
            .map(|r| (r.goal.id.clone(), r.required_monthly))
            .collect();
        let mut amounts: HashMap<String, f64> = HashMap::new();
        let mut failures: Vec<GoalFailure> = Vec::new();
        let mut warnings: Vec<String> = Vec::new();
        let mut iterations = 0u32;
        let mut state = RefineState::Solve;

        let final_state = loop {
            state = match state {
                RefineState::Solve => {
                    match solve_contributions(
                        self.lp,
                        self.requirements,
                        &required,
                        self.constraints,
                        self.max_outflow,
                    )? {
                        Some(solution) => {
                            amounts = solution;
                            RefineState::Validate
                        }
                        None => break RefineState::GaveUp,
                    }
                }

                RefineState::Validate => {
                    if iterations >= MAX_ITERATIONS {
                        break if failures.is_empty() { RefineState::Done } else { RefineState::GaveUp };
                    }
                    iterations += 1;
                    let by_account = self.project_candidate(&amounts)?;
                    failures = evaluate_goals(
                        self.scenario,
                        self.goals,
                        self.floors,
                        &by_account,
                        self.window,
                    );
                    debug!("refine iteration {iterations}: {} failure(s)", failures.len());
                    if failures.is_empty() {
                        break RefineState::Done;
                    } else if failures.iter().any(|f| f.is_floor) {
                        RefineState::ScaleForFloors
                    } else {
                        RefineState::BumpAndResolve
                    }
                }

                RefineState::ScaleForFloors => {
                    let scale = self.find_floor_safe_scale(&amounts)?;
                    amounts = scale_amounts(&amounts, scale);
                    warnings.push(
                        "Min-balance floors required scaling down suggested contributions."
                            .to_string(),
                    );
                    RefineState::Validate
                }

                RefineState::BumpAndResolve => {
                    for failure in &failures {
                        let Some(req) =
                            self.requirements.iter().find(|r| r.goal.id == failure.goal_id)
                        else {
                            continue;
                        };
                        let bump = failure.shortfall.max(0.0) / (req.months.max(1) as f64);
                        let current = amounts.get(&failure.goal_id).copied().unwrap_or(0.0);
                        let entry = required.entry(failure.goal_id.clone()).or_insert(0.0);
                        *entry = entry.max(current + bump);
                    }
                    match solve_contributions(
                        self.lp,
                        self.requirements,
                        &required,
                        self.constraints,
                        self.max_outflow,
                    )? {
                        Some(solution) => {
                            amounts = solution;
                            RefineState::Validate
                        }
                        None => {
                            warnings.push(
                                "Solver became infeasible after projection-based refinement."
                                    .to_string(),
                            );
                            break RefineState::GaveUp;
                        }
                    }
                }

                RefineState::Done | RefineState::GaveUp => unreachable!("terminal states break"),
            };
        };

        Ok(RefineOutcome { amounts, failures, warnings, final_state })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Account;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn record(account_id: i64, date: NaiveDate, balance: f64) -> ProjectionRecord {
        ProjectionRecord {
            account_id,
            account: "a".to_string(),
            date,
            balance,
            income: 0.0,
            expenses: 0.0,
            net_change: 0.0,
            interest: 0.0,
            period: 1,
        }
    }

    #[test]
    fn test_balance_at_or_before() {
        let records = vec![
            record(1, date(2026, 1, 1), 10.0),
            record(1, date(2026, 2, 1), 20.0),
            record(1, date(2026, 3, 1), 30.0),
        ];
        assert_eq!(balance_at_or_before(&records, date(2026, 2, 15), 0.0), 20.0);
        assert_eq!(balance_at_or_before(&records, date(2026, 3, 1), 0.0), 30.0);
        assert_eq!(balance_at_or_before(&records, date(2025, 12, 1), -5.0), -5.0);
    }

    #[test]
    fn test_floor_failure_uses_window_minimum() {
        let scenario = Scenario {
            accounts: vec![Account::new(1, "Buffer", 400.0)],
            ..Default::default()
        };
        let by_account = index_projections(vec![
            record(1, date(2026, 1, 1), 350.0),
            record(1, date(2026, 2, 1), 180.0),
            record(1, date(2026, 3, 1), 500.0),
        ]);
        let floors = HashMap::from([(1, 250.0)]);
        let window = DateRange::new(date(2026, 1, 1), date(2026, 3, 31));
        let failures = evaluate_goals(&scenario, &[], &floors, &by_account, window);
        assert_eq!(failures.len(), 1);
        assert!(failures[0].is_floor);
        assert!((failures[0].shortfall - 70.0).abs() < 1e-9);
    }

    #[test]
    fn test_pay_down_direction_aware() {
        let scenario = Scenario {
            accounts: vec![Account::new(1, "Loan", -5000.0)],
            ..Default::default()
        };
        let window = DateRange::new(date(2026, 1, 1), date(2026, 12, 31));
        let mut goal = Goal::new("g", GoalKind::PayDownByDate, 1);
        goal.target_amount = Some(0.0);

        // Climbed to -100: still short of 0 from below.
        let by_account = index_projections(vec![record(1, date(2026, 12, 1), -100.0)]);
        let failures =
            evaluate_goals(&scenario, &[goal.clone()], &HashMap::new(), &by_account, window);
        assert_eq!(failures.len(), 1);
        assert!((failures[0].shortfall - 100.0).abs() < 1e-9);

        // Reached 0 exactly: satisfied.
        let by_account = index_projections(vec![record(1, date(2026, 12, 1), 0.0)]);
        let failures = evaluate_goals(&scenario, &[goal], &HashMap::new(), &by_account, window);
        assert!(failures.is_empty());
    }

    #[test]
    fn test_increase_by_delta_measures_window_growth() {
        let scenario = Scenario {
            accounts: vec![Account::new(1, "Savings", 100.0)],
            ..Default::default()
        };
        let window = DateRange::new(date(2026, 1, 1), date(2026, 12, 31));
        let mut goal = Goal::new("g", GoalKind::IncreaseByDelta, 1);
        goal.delta_amount = Some(500.0);
        let by_account = index_projections(vec![
            record(1, date(2026, 1, 1), 120.0),
            record(1, date(2026, 12, 1), 450.0),
        ]);
        let failures = evaluate_goals(&scenario, &[goal], &HashMap::new(), &by_account, window);
        assert_eq!(failures.len(), 1);
        assert!((failures[0].shortfall - 170.0).abs() < 1e-9);
    }

    #[test]
    fn test_missing_records_fall_back_to_starting_balance() {
        let scenario = Scenario {
            accounts: vec![Account::new(1, "Savings", 900.0)],
            ..Default::default()
        };
        let window = DateRange::new(date(2026, 1, 1), date(2026, 12, 31));
        let mut goal = Goal::new("g", GoalKind::ReachBalanceByDate, 1);
        goal.target_amount = Some(800.0);
        let failures =
            evaluate_goals(&scenario, &[goal], &HashMap::new(), &HashMap::new(), window);
        assert!(failures.is_empty());
    }
}
