//! Account definitions

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::growth::PeriodicChange;

/// Ledger classification of an account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccountKind {
    Asset,
    Liability,
    Equity,
    Income,
    Expense,
}

impl Default for AccountKind {
    fn default() -> Self {
        Self::Asset
    }
}

/// A dated growth rule. While an entry is in effect it overrides the
/// account's base `periodic_change`; outside all entries the base rule
/// applies again.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScheduledChange {
    pub start_date: NaiveDate,

    /// Inclusive; `None` means the entry stays in effect indefinitely.
    #[serde(default)]
    pub end_date: Option<NaiveDate>,

    pub change: PeriodicChange,
}

/// An account whose balance the projection engine recomputes on every run.
/// The stored `starting_balance` is the only balance ever persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Account {
    pub id: i64,
    pub name: String,

    #[serde(default)]
    pub kind: AccountKind,

    #[serde(default)]
    pub starting_balance: f64,

    /// Balances are tracked from this date; before it the account is flat.
    #[serde(default)]
    pub open_date: Option<NaiveDate>,

    /// Interest (or decay) applied to the running balance.
    #[serde(default)]
    pub periodic_change: Option<PeriodicChange>,

    /// Time-segmented overrides of `periodic_change`, so a rate change
    /// added to an existing account affects only growth after its
    /// effective date.
    #[serde(default)]
    pub periodic_change_schedule: Vec<ScheduledChange>,

    /// Simple per-account target, displayed by reporting surfaces. The
    /// multi-goal solver uses its own `Goal` declarations instead.
    #[serde(default)]
    pub goal_amount: Option<f64>,
    #[serde(default)]
    pub goal_date: Option<NaiveDate>,
}

impl Account {
    pub fn new(id: i64, name: impl Into<String>, starting_balance: f64) -> Self {
        Self {
            id,
            name: name.into(),
            kind: AccountKind::Asset,
            starting_balance,
            open_date: None,
            periodic_change: None,
            periodic_change_schedule: Vec::new(),
            goal_amount: None,
            goal_date: None,
        }
    }

    pub fn with_periodic_change(mut self, change: PeriodicChange) -> Self {
        self.periodic_change = Some(change);
        self
    }

    pub fn with_scheduled_change(mut self, entry: ScheduledChange) -> Self {
        self.periodic_change_schedule.push(entry);
        self
    }

    /// The growth rule in effect on `date`: the earliest-starting schedule
    /// entry covering the date wins, else the base `periodic_change`.
    pub fn change_for(&self, date: NaiveDate) -> Option<PeriodicChange> {
        let mut active: Option<&ScheduledChange> = None;
        for entry in &self.periodic_change_schedule {
            if entry.start_date <= date && entry.end_date.map_or(true, |end| date <= end) {
                if active.map_or(true, |a| entry.start_date < a.start_date) {
                    active = Some(entry);
                }
            }
        }
        active.map(|entry| entry.change).or(self.periodic_change)
    }

    /// Nominal annual growth rate as a decimal, for closed-form goal math.
    pub fn annual_rate(&self) -> f64 {
        self.periodic_change.map(|pc| pc.annual_rate()).unwrap_or(0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::growth::Compounding;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_change_for_prefers_schedule_over_base() {
        let account = Account::new(1, "Savings", 1000.0)
            .with_periodic_change(PeriodicChange::percentage(2.0, Compounding::Annual))
            .with_scheduled_change(ScheduledChange {
                start_date: date(2026, 7, 1),
                end_date: Some(date(2026, 9, 30)),
                change: PeriodicChange::percentage(8.0, Compounding::Annual),
            });

        assert_eq!(account.change_for(date(2026, 6, 30)).unwrap().value, 2.0);
        assert_eq!(account.change_for(date(2026, 7, 1)).unwrap().value, 8.0);
        assert_eq!(account.change_for(date(2026, 9, 30)).unwrap().value, 8.0);
        // After the entry ends the base rule applies again.
        assert_eq!(account.change_for(date(2026, 10, 1)).unwrap().value, 2.0);
    }

    #[test]
    fn test_change_for_gap_without_base_is_none() {
        let account = Account::new(1, "Savings", 1000.0).with_scheduled_change(ScheduledChange {
            start_date: date(2026, 7, 1),
            end_date: None,
            change: PeriodicChange::percentage(8.0, Compounding::Annual),
        });
        assert!(account.change_for(date(2026, 6, 30)).is_none());
        assert!(account.change_for(date(2026, 7, 1)).is_some());
    }

    #[test]
    fn test_change_for_overlap_earliest_start_wins() {
        let account = Account::new(1, "Savings", 1000.0)
            .with_scheduled_change(ScheduledChange {
                start_date: date(2026, 3, 1),
                end_date: None,
                change: PeriodicChange::percentage(6.0, Compounding::Annual),
            })
            .with_scheduled_change(ScheduledChange {
                start_date: date(2026, 1, 1),
                end_date: None,
                change: PeriodicChange::percentage(3.0, Compounding::Annual),
            });
        assert_eq!(account.change_for(date(2026, 5, 1)).unwrap().value, 3.0);
    }
}
