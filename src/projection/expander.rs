//! Transaction expansion: recurrence rules to dated occurrences
//!
//! An `Occurrence` is one concrete posting of a transaction. Expansion does
//! not merge same-date occurrences (the engine sums them when posting) and
//! does not apply amount escalation (the engine does, using each
//! occurrence's anchor date).

use chrono::NaiveDate;

use crate::growth::PeriodicChange;
use crate::model::{Transaction, TransactionKind, TransactionStatus};
use crate::schedule::generate_dates;

/// A dated instance of a transaction within the projection window.
#[derive(Debug, Clone, PartialEq)]
pub struct Occurrence {
    pub date: NaiveDate,
    pub transaction_id: i64,
    pub kind: TransactionKind,
    pub primary_account_id: i64,
    pub secondary_account_id: Option<i64>,

    /// Base unsigned amount before escalation.
    pub amount: f64,

    /// Escalation rule inherited from the transaction, if any.
    pub periodic_change: Option<PeriodicChange>,

    /// Date escalation elapsed time is measured from.
    pub anchor: NaiveDate,
}

fn occurrence_from(tx: &Transaction, date: NaiveDate, amount: f64, anchor: NaiveDate) -> Occurrence {
    Occurrence {
        date,
        transaction_id: tx.id,
        kind: tx.kind,
        primary_account_id: tx.primary_account_id,
        secondary_account_id: tx.secondary_account_id,
        amount,
        periodic_change: tx.periodic_change,
        anchor,
    }
}

/// Expand transactions into dated occurrences inside
/// `[window_start, window_end]`, sorted by date.
///
/// Actual transactions post exactly once at their actual date (falling back
/// to the planned date) with the actual amount override applied; planned
/// recurring transactions expand through their recurrence; planned one-offs
/// post at their effective date.
pub fn expand_transactions(
    transactions: &[Transaction],
    window_start: NaiveDate,
    window_end: NaiveDate,
) -> Vec<Occurrence> {
    let mut occurrences = Vec::new();

    for tx in transactions {
        match &tx.status {
            TransactionStatus::Actual { actual_date, actual_amount } => {
                let date = actual_date
                    .or(tx.effective_date)
                    .or_else(|| tx.recurrence.as_ref().and_then(|r| r.start_date));
                if let Some(date) = date {
                    if date >= window_start && date <= window_end {
                        let amount = actual_amount.unwrap_or(tx.amount);
                        occurrences.push(occurrence_from(tx, date, amount, date));
                    }
                }
            }
            TransactionStatus::Planned => {
                if let Some(recurrence) = &tx.recurrence {
                    let anchor = recurrence
                        .start_date
                        .or(tx.effective_date)
                        .unwrap_or(window_start);
                    for date in generate_dates(recurrence, window_start, window_end) {
                        occurrences.push(occurrence_from(tx, date, tx.amount, anchor));
                    }
                } else if let Some(date) = tx.effective_date {
                    if date >= window_start && date <= window_end {
                        occurrences.push(occurrence_from(tx, date, tx.amount, date));
                    }
                }
            }
        }
    }

    occurrences.sort_by_key(|o| (o.date, o.transaction_id));
    occurrences
}
