//! Scenario container and JSON loading

use std::path::Path;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::model::{Account, Transaction};
use crate::schedule::Periodicity;

/// An inclusive date range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

impl DateRange {
    pub fn new(start_date: NaiveDate, end_date: NaiveDate) -> Self {
        Self { start_date, end_date }
    }

    /// Normalized copy with start <= end.
    pub fn ordered(self) -> Self {
        if self.start_date > self.end_date {
            Self { start_date: self.end_date, end_date: self.start_date }
        } else {
            self
        }
    }
}

/// The scenario's default projection window and reporting cadence.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ProjectionWindow {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,

    #[serde(default)]
    pub periodicity: Periodicity,
}

/// Planning configuration; the goal solver may run over a narrower window
/// than the projection itself.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Planning {
    #[serde(default)]
    pub goal_solver_window: Option<DateRange>,
}

/// A complete forecasting scenario. Engines treat it as immutable input and
/// return fresh result data.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Scenario {
    #[serde(default)]
    pub id: i64,

    #[serde(default)]
    pub name: String,

    #[serde(default)]
    pub accounts: Vec<Account>,

    #[serde(default)]
    pub transactions: Vec<Transaction>,

    #[serde(default)]
    pub projection: Option<ProjectionWindow>,

    #[serde(default)]
    pub planning: Option<Planning>,
}

impl Scenario {
    /// Load a scenario from a JSON file.
    pub fn from_json_path(path: impl AsRef<Path>) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        let scenario: Scenario = serde_json::from_str(&raw)?;
        Ok(scenario)
    }

    pub fn account(&self, account_id: i64) -> Option<&Account> {
        self.accounts.iter().find(|a| a.id == account_id)
    }

    /// The window the goal solver plans over: the explicit planning window
    /// when present, else the projection window. Reversed ranges are
    /// normalized rather than rejected.
    pub fn solver_window(&self) -> Result<DateRange> {
        if let Some(range) = self.planning.as_ref().and_then(|p| p.goal_solver_window) {
            return Ok(range.ordered());
        }
        let projection = self.projection.ok_or(Error::MissingProjectionWindow)?;
        Ok(DateRange::new(projection.start_date, projection.end_date).ordered())
    }
}
