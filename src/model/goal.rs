//! Goal and constraint declarations for the advanced goal solver

use std::collections::{HashMap, HashSet};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// What the goal asks of its account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GoalKind {
    /// Balance reaches `target_amount` by the end date.
    ReachBalanceByDate,
    /// Balance moves to (or past) `target_amount` from the other side,
    /// e.g. a loan at -8,000 paid down to 0.
    PayDownByDate,
    /// Balance grows by `delta_amount` between the start and end dates.
    IncreaseByDelta,
    /// Balance never drops below `floor_amount` across the window.
    MaintainFloor,
}

impl GoalKind {
    /// Stable name used in generated transaction tags.
    pub fn tag(&self) -> &'static str {
        match self {
            GoalKind::ReachBalanceByDate => "reach_balance_by_date",
            GoalKind::PayDownByDate => "pay_down_by_date",
            GoalKind::IncreaseByDelta => "increase_by_delta",
            GoalKind::MaintainFloor => "maintain_floor",
        }
    }
}

/// A single prioritized goal. Which amount field applies depends on `kind`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Goal {
    pub id: String,

    /// Lower numbers are more important; clamped to >= 1 on normalization.
    #[serde(default = "default_priority")]
    pub priority: u32,

    pub account_id: i64,

    pub kind: GoalKind,

    #[serde(default)]
    pub target_amount: Option<f64>,

    #[serde(default)]
    pub delta_amount: Option<f64>,

    #[serde(default)]
    pub floor_amount: Option<f64>,

    #[serde(default)]
    pub start_date: Option<NaiveDate>,

    #[serde(default)]
    pub end_date: Option<NaiveDate>,
}

fn default_priority() -> u32 {
    1
}

impl Goal {
    pub fn new(id: impl Into<String>, kind: GoalKind, account_id: i64) -> Self {
        Self {
            id: id.into(),
            priority: 1,
            account_id,
            kind,
            target_amount: None,
            delta_amount: None,
            floor_amount: None,
            start_date: None,
            end_date: None,
        }
    }

    /// Copy with priority clamped to at least 1.
    pub fn normalized(mut self) -> Self {
        self.priority = self.priority.max(1);
        self
    }
}

/// Global constraints on the solver's suggested contributions.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SolverConstraints {
    /// The unconstrained source/sink all contributions move through.
    #[serde(default)]
    pub funding_account_id: Option<i64>,

    /// Cap on the summed monthly contributions across all goals.
    #[serde(default)]
    pub max_outflow_per_month: Option<f64>,

    /// Accounts whose goal contributions are forced to zero.
    #[serde(default)]
    pub locked_account_ids: HashSet<i64>,

    /// Per-account cap on monthly goal contributions.
    #[serde(default)]
    pub max_movement_by_account_id: HashMap<i64, f64>,

    /// Minimum balances that must hold across the whole solving window.
    #[serde(default)]
    pub min_balance_floors_by_account_id: HashMap<i64, f64>,
}

/// Full solver input: what to achieve and under which constraints.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SolverSettings {
    #[serde(default)]
    pub goals: Vec<Goal>,

    #[serde(default)]
    pub constraints: SolverConstraints,
}

impl SolverSettings {
    pub fn from_json_path(path: impl AsRef<std::path::Path>) -> crate::error::Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_priority_clamps_to_one() {
        let mut goal = Goal::new("g1", GoalKind::ReachBalanceByDate, 1);
        goal.priority = 0;
        assert_eq!(goal.normalized().priority, 1);
    }

    #[test]
    fn test_kind_tags_are_stable() {
        assert_eq!(GoalKind::PayDownByDate.tag(), "pay_down_by_date");
        assert_eq!(GoalKind::MaintainFloor.tag(), "maintain_floor");
    }
}
