//! Typed linear-program model and solver backend
//!
//! The goal solver builds its models through typed `VariableId` /
//! `ConstraintId` handles instead of name strings, and consumes any backend
//! through the narrow `LpSolver` trait: minimize a linear objective over
//! non-negative variables subject to linear inequality constraints,
//! reporting feasibility and variable values.
//!
//! `SimplexSolver` is the default in-process backend: a dense two-phase
//! primal simplex with Bland's rule. The models this crate emits are tiny
//! (one variable per goal, a couple of rows per variable), so a
//! no-dependency dense tableau is comfortably sufficient.

use thiserror::Error;

/// Handle to a decision variable (always constrained to `x >= 0`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct VariableId(usize);

/// Handle to a linear constraint row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConstraintId(usize);

/// One-sided bound on a constraint's linear expression.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Bound {
    AtLeast(f64),
    AtMost(f64),
}

/// A minimization LP over non-negative variables.
#[derive(Debug, Clone, Default)]
pub struct LpModel {
    costs: Vec<f64>,
    bounds: Vec<Bound>,
    /// Sparse rows: (variable index, coefficient) pairs.
    rows: Vec<Vec<(usize, f64)>>,
}

impl LpModel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a variable with the given objective cost; returns its handle.
    pub fn add_variable(&mut self, cost: f64) -> VariableId {
        self.costs.push(cost);
        VariableId(self.costs.len() - 1)
    }

    /// Add an empty constraint with the given bound; returns its handle.
    pub fn add_constraint(&mut self, bound: Bound) -> ConstraintId {
        self.bounds.push(bound);
        self.rows.push(Vec::new());
        ConstraintId(self.bounds.len() - 1)
    }

    /// Set the coefficient of `variable` in `constraint`.
    pub fn set_coefficient(&mut self, constraint: ConstraintId, variable: VariableId, coefficient: f64) {
        let row = &mut self.rows[constraint.0];
        match row.iter_mut().find(|(v, _)| *v == variable.0) {
            Some(entry) => entry.1 = coefficient,
            None => row.push((variable.0, coefficient)),
        }
    }

    pub fn num_variables(&self) -> usize {
        self.costs.len()
    }

    pub fn num_constraints(&self) -> usize {
        self.bounds.len()
    }
}

/// Result of an LP solve. `values` is indexed by `VariableId`; it is all
/// zeros when infeasible.
#[derive(Debug, Clone, PartialEq)]
pub struct LpOutcome {
    pub feasible: bool,
    values: Vec<f64>,
}

impl LpOutcome {
    fn infeasible(num_variables: usize) -> Self {
        Self { feasible: false, values: vec![0.0; num_variables] }
    }

    pub fn value(&self, variable: VariableId) -> f64 {
        self.values.get(variable.0).copied().unwrap_or(0.0)
    }
}

/// Backend failure distinct from infeasibility: the model itself could not
/// be solved. Callers normalize this into a structured solve result.
#[derive(Debug, Error)]
pub enum LpError {
    #[error("simplex exceeded its pivot iteration limit")]
    IterationLimit,
    #[error("objective is unbounded below")]
    Unbounded,
}

/// Narrow backend contract; swap in any LP solver.
pub trait LpSolver {
    fn solve(&self, model: &LpModel) -> Result<LpOutcome, LpError>;
}

/// Default backend: dense two-phase primal simplex, Bland's rule.
#[derive(Debug, Clone, Copy, Default)]
pub struct SimplexSolver;

impl SimplexSolver {
    pub fn new() -> Self {
        Self
    }
}

const EPS: f64 = 1e-9;

struct Tableau {
    /// m x (total_cols + 1) rows; last column is the RHS.
    rows: Vec<Vec<f64>>,
    /// Reduced-cost row, same width; last entry is minus the objective.
    objective: Vec<f64>,
    /// Basic variable (column index) per row.
    basis: Vec<usize>,
    num_structural: usize,
    artificial_start: usize,
    total_cols: usize,
}

impl Tableau {
    /// Run simplex pivots until optimal. `allow_artificial` permits
    /// artificial columns to enter (phase 1 only).
    fn pivot_to_optimal(&mut self, allow_artificial: bool) -> Result<(), LpError> {
        let max_iterations = 200 * (self.total_cols + self.rows.len() + 1);
        for _ in 0..max_iterations {
            let limit = if allow_artificial { self.total_cols } else { self.artificial_start };
            // Bland's rule: lowest-index column with negative reduced cost.
            let entering = (0..limit).find(|&j| self.objective[j] < -EPS);
            let entering = match entering {
                Some(j) => j,
                None => return Ok(()),
            };

            // Ratio test, ties broken by lowest basis index.
            let mut leaving: Option<usize> = None;
            let mut best_ratio = f64::INFINITY;
            for (i, row) in self.rows.iter().enumerate() {
                let coef = row[entering];
                if coef > EPS {
                    let ratio = row[self.total_cols] / coef;
                    if ratio < best_ratio - EPS
                        || (ratio < best_ratio + EPS
                            && leaving.map_or(true, |l| self.basis[i] < self.basis[l]))
                    {
                        best_ratio = ratio;
                        leaving = Some(i);
                    }
                }
            }
            let leaving = leaving.ok_or(LpError::Unbounded)?;

            self.pivot(leaving, entering);
        }
        Err(LpError::IterationLimit)
    }

    fn pivot(&mut self, row: usize, col: usize) {
        let pivot = self.rows[row][col];
        for value in self.rows[row].iter_mut() {
            *value /= pivot;
        }
        let pivot_row = self.rows[row].clone();
        for (i, other) in self.rows.iter_mut().enumerate() {
            if i == row {
                continue;
            }
            let factor = other[col];
            if factor.abs() > 0.0 {
                for (j, value) in other.iter_mut().enumerate() {
                    *value -= factor * pivot_row[j];
                }
            }
        }
        let factor = self.objective[col];
        if factor.abs() > 0.0 {
            for (j, value) in self.objective.iter_mut().enumerate() {
                *value -= factor * pivot_row[j];
            }
        }
        self.basis[row] = col;
    }

    /// Rebuild the reduced-cost row for the given per-column costs.
    fn set_objective(&mut self, costs: &[f64]) {
        self.objective = costs.to_vec();
        self.objective.push(0.0);
        for (i, &basic) in self.basis.iter().enumerate() {
            let cost = self.objective[basic];
            if cost.abs() > 0.0 {
                let row = self.rows[i].clone();
                for (j, value) in self.objective.iter_mut().enumerate() {
                    *value -= cost * row[j];
                }
            }
        }
    }

    /// Current objective value (the RHS entry holds its negation).
    fn objective_value(&self) -> f64 {
        -self.objective[self.total_cols]
    }
}

impl LpSolver for SimplexSolver {
    fn solve(&self, model: &LpModel) -> Result<LpOutcome, LpError> {
        let n = model.num_variables();
        let m = model.num_constraints();
        if n == 0 {
            return Ok(LpOutcome { feasible: true, values: Vec::new() });
        }

        // Normalize every row to `a.x {<=,>=} b` with b >= 0, then add a
        // slack per <= row and a surplus + artificial per >= row.
        let mut normalized: Vec<(Vec<f64>, f64, bool)> = Vec::with_capacity(m); // (dense row, rhs, is_ge)
        for (row, bound) in model.rows.iter().zip(&model.bounds) {
            let mut dense = vec![0.0; n];
            for &(var, coef) in row {
                dense[var] = coef;
            }
            let (mut rhs, mut is_ge) = match bound {
                Bound::AtLeast(b) => (*b, true),
                Bound::AtMost(b) => (*b, false),
            };
            if rhs < 0.0 {
                for value in dense.iter_mut() {
                    *value = -*value;
                }
                rhs = -rhs;
                is_ge = !is_ge;
            }
            normalized.push((dense, rhs, is_ge));
        }

        let num_ge = normalized.iter().filter(|(_, _, ge)| *ge).count();
        let slack_start = n;
        let artificial_start = n + m; // one slack/surplus column per row
        let total_cols = artificial_start + num_ge;

        let mut rows = Vec::with_capacity(m);
        let mut basis = Vec::with_capacity(m);
        let mut artificial_idx = artificial_start;
        for (i, (dense, rhs, is_ge)) in normalized.iter().enumerate() {
            let mut row = vec![0.0; total_cols + 1];
            row[..n].copy_from_slice(dense);
            row[total_cols] = *rhs;
            if *is_ge {
                row[slack_start + i] = -1.0;
                row[artificial_idx] = 1.0;
                basis.push(artificial_idx);
                artificial_idx += 1;
            } else {
                row[slack_start + i] = 1.0;
                basis.push(slack_start + i);
            }
            rows.push(row);
        }

        let mut tableau = Tableau {
            rows,
            objective: Vec::new(),
            basis,
            num_structural: n,
            artificial_start,
            total_cols,
        };

        // Phase 1: minimize the sum of artificials.
        let mut phase1_costs = vec![0.0; total_cols];
        for cost in phase1_costs.iter_mut().skip(artificial_start) {
            *cost = 1.0;
        }
        tableau.set_objective(&phase1_costs);
        tableau.pivot_to_optimal(true)?;
        if tableau.objective_value() > 1e-6 {
            return Ok(LpOutcome::infeasible(n));
        }

        // Phase 2: minimize the real objective, artificials barred from
        // re-entering.
        let mut phase2_costs = vec![0.0; total_cols];
        phase2_costs[..n].copy_from_slice(&model.costs);
        tableau.set_objective(&phase2_costs);
        tableau.pivot_to_optimal(false)?;

        let mut values = vec![0.0; n];
        for (i, &basic) in tableau.basis.iter().enumerate() {
            if basic < tableau.num_structural {
                values[basic] = tableau.rows[i][tableau.total_cols].max(0.0);
            }
        }
        Ok(LpOutcome { feasible: true, values })
    }
}
