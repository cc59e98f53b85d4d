//! Projection output rows and summary helpers

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Round a money amount to cents. Applied on emission only; running
/// balances stay unrounded between periods.
pub fn round_cents(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// One account's state at one reporting-period boundary. Money fields are
/// rounded to cents.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectionRecord {
    pub account_id: i64,
    pub account: String,

    /// The period's start boundary.
    pub date: NaiveDate,

    /// Closing balance after all postings and settled growth.
    pub balance: f64,

    /// Unsigned inflows for the period, including positive interest.
    pub income: f64,

    /// Unsigned outflows for the period, including negative interest.
    pub expenses: f64,

    /// `income - expenses`.
    pub net_change: f64,

    /// Signed growth settled during the period (positive = earned).
    pub interest: f64,

    /// 1-based period index within the account's series.
    pub period: u32,
}

/// Per-account rollup of a projection run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AccountSummary {
    pub account_id: i64,
    pub account: String,
    pub opening_balance: f64,
    pub closing_balance: f64,
    pub total_income: f64,
    pub total_expenses: f64,
    pub total_interest: f64,
}

/// A full projection result with summary accessors, ordered by account
/// then period.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ProjectionTable {
    pub records: Vec<ProjectionRecord>,
}

impl ProjectionTable {
    pub fn new(records: Vec<ProjectionRecord>) -> Self {
        Self { records }
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Records for one account, in period order.
    pub fn for_account(&self, account_id: i64) -> Vec<&ProjectionRecord> {
        self.records.iter().filter(|r| r.account_id == account_id).collect()
    }

    /// Final balance of an account, if it was projected.
    pub fn closing_balance(&self, account_id: i64) -> Option<f64> {
        self.for_account(account_id).last().map(|r| r.balance)
    }

    /// One summary row per account, in first-appearance order.
    pub fn summaries(&self) -> Vec<AccountSummary> {
        let mut out: Vec<AccountSummary> = Vec::new();
        for record in &self.records {
            match out.iter_mut().find(|s| s.account_id == record.account_id) {
                Some(summary) => {
                    summary.closing_balance = record.balance;
                    summary.total_income += record.income;
                    summary.total_expenses += record.expenses;
                    summary.total_interest += record.interest;
                }
                None => out.push(AccountSummary {
                    account_id: record.account_id,
                    account: record.account.clone(),
                    opening_balance: record.balance - record.net_change,
                    closing_balance: record.balance,
                    total_income: record.income,
                    total_expenses: record.expenses,
                    total_interest: record.interest,
                }),
            }
        }
        for summary in &mut out {
            summary.total_income = round_cents(summary.total_income);
            summary.total_expenses = round_cents(summary.total_expenses);
            summary.total_interest = round_cents(summary.total_interest);
        }
        out
    }
}
