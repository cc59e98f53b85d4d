//! Transaction definitions
//!
//! A transaction moves money between exactly two accounts. Amounts are
//! stored unsigned; the sign an account sees is derived from the
//! transaction kind and which side of the transfer the account sits on.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::growth::PeriodicChange;
use crate::schedule::Recurrence;

/// Direction of the transfer, from the primary account's perspective.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionKind {
    /// Money flows into the primary account (out of the secondary).
    MoneyIn,
    /// Money flows out of the primary account (into the secondary).
    MoneyOut,
}

/// Whether the transaction is a plan or a realized event. Actual
/// transactions are never recurrence-expanded; their optional overrides
/// replace the planned date/amount.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum TransactionStatus {
    Planned,
    Actual {
        #[serde(default)]
        actual_date: Option<NaiveDate>,
        #[serde(default)]
        actual_amount: Option<f64>,
    },
}

impl Default for TransactionStatus {
    fn default() -> Self {
        Self::Planned
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: i64,

    #[serde(default)]
    pub description: String,

    /// Always unsigned; direction comes from `kind`.
    pub amount: f64,

    pub kind: TransactionKind,

    pub primary_account_id: i64,

    #[serde(default)]
    pub secondary_account_id: Option<i64>,

    /// Date a non-recurring planned transaction posts.
    #[serde(default)]
    pub effective_date: Option<NaiveDate>,

    #[serde(default)]
    pub recurrence: Option<Recurrence>,

    /// Escalates the per-occurrence amount over time (e.g. a rent payment
    /// growing 3% a year).
    #[serde(default)]
    pub periodic_change: Option<PeriodicChange>,

    #[serde(default)]
    pub status: TransactionStatus,

    #[serde(default)]
    pub tags: Vec<String>,
}

impl Transaction {
    /// A planned transfer between two accounts.
    pub fn planned(
        id: i64,
        kind: TransactionKind,
        amount: f64,
        primary_account_id: i64,
        secondary_account_id: Option<i64>,
    ) -> Self {
        Self {
            id,
            description: String::new(),
            amount,
            kind,
            primary_account_id,
            secondary_account_id,
            effective_date: None,
            recurrence: None,
            periodic_change: None,
            status: TransactionStatus::Planned,
            tags: Vec::new(),
        }
    }

    pub fn with_recurrence(mut self, recurrence: Recurrence) -> Self {
        self.recurrence = Some(recurrence);
        self
    }

    pub fn on(mut self, date: NaiveDate) -> Self {
        self.effective_date = Some(date);
        self
    }

    /// True when the transaction touches `account_id` on either side.
    pub fn touches(&self, account_id: i64) -> bool {
        self.primary_account_id == account_id || self.secondary_account_id == Some(account_id)
    }

    /// Signed effect of one unsigned `amount` on `account_id`: money-in
    /// credits the primary and debits the secondary, money-out reverses.
    /// Zero for uninvolved accounts.
    pub fn signed_amount_for(&self, account_id: i64, amount: f64) -> f64 {
        let unsigned = amount.abs();
        let direction = match self.kind {
            TransactionKind::MoneyIn => 1.0,
            TransactionKind::MoneyOut => -1.0,
        };
        if self.primary_account_id == account_id {
            direction * unsigned
        } else if self.secondary_account_id == Some(account_id) {
            -direction * unsigned
        } else {
            0.0
        }
    }
}
