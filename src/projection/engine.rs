//! Per-account balance simulator with checkpointed growth
//!
//! Each account is simulated independently over the reporting periods of
//! the projection window. Growth is settled at **checkpoints**: before any
//! day's postings are applied and again at every period end. An account's
//! virtual origin checkpoint sits one calendar day before its tracked
//! start, so the first tracked day accrues a full day of growth.

use std::collections::{BTreeMap, HashMap};

use chrono::{Days, NaiveDate};
use log::{debug, warn};
use rayon::prelude::*;

use crate::error::{Error, Result};
use crate::growth::{apply_periodic_change, ChangeMode, Compounding, PeriodicChange};
use crate::model::{Account, Scenario};
use crate::projection::expander::expand_transactions;
use crate::projection::record::{round_cents, ProjectionRecord};
use crate::schedule::{generate_periods, Period, Periodicity};

const DAYS_PER_YEAR: f64 = 365.25;

/// Overrides for a projection run. Fields left `None` fall back to the
/// scenario's own projection configuration.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProjectionOptions {
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub periodicity: Option<Periodicity>,
}

impl ProjectionOptions {
    pub fn window(start_date: NaiveDate, end_date: NaiveDate) -> Self {
        Self { start_date: Some(start_date), end_date: Some(end_date), periodicity: None }
    }
}

/// Net signed postings for one account on one day, with the unsigned
/// income/expense split preserved per occurrence.
#[derive(Debug, Clone, Copy, Default)]
struct DayPostings {
    signed_total: f64,
    income: f64,
    expenses: f64,
}

/// The main projection engine. Stateless; every call operates on its own
/// scenario input and returns fresh records.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProjectionEngine;

impl ProjectionEngine {
    pub fn new() -> Self {
        Self
    }

    /// Project every account in the scenario across the window, one record
    /// per account per reporting period, accounts in scenario order.
    pub fn generate(
        &self,
        scenario: &Scenario,
        options: &ProjectionOptions,
    ) -> Result<Vec<ProjectionRecord>> {
        let (start, end, periodicity) = resolve_window(scenario, options)?;
        let periods = generate_periods(start, end, periodicity);
        if periods.is_empty() {
            return Ok(Vec::new());
        }

        let occurrences = expand_transactions(&scenario.transactions, start, end);
        debug!(
            "projecting scenario '{}': {} accounts, {} occurrences, {} periods",
            scenario.name,
            scenario.accounts.len(),
            occurrences.len(),
            periods.len()
        );

        // Escalate occurrence amounts, then bucket signed postings per
        // account per day.
        let mut postings: HashMap<i64, BTreeMap<NaiveDate, DayPostings>> = HashMap::new();
        for occ in &occurrences {
            let amount = if occ.periodic_change.is_some() {
                let elapsed = (occ.date - occ.anchor).num_days() as f64 / DAYS_PER_YEAR;
                apply_periodic_change(occ.amount, occ.periodic_change.as_ref(), elapsed)
            } else {
                occ.amount
            };
            if !amount.is_finite() {
                warn!(
                    "skipping occurrence of transaction {} on {}: escalated amount is not finite",
                    occ.transaction_id, occ.date
                );
                continue;
            }
            let direction = match occ.kind {
                crate::model::TransactionKind::MoneyIn => 1.0,
                crate::model::TransactionKind::MoneyOut => -1.0,
            };
            let mut add = |account_id: i64, signed: f64| {
                let day = postings
                    .entry(account_id)
                    .or_default()
                    .entry(occ.date)
                    .or_default();
                day.signed_total += signed;
                if signed >= 0.0 {
                    day.income += signed;
                } else {
                    day.expenses += -signed;
                }
            };
            add(occ.primary_account_id, direction * amount.abs());
            if let Some(secondary) = occ.secondary_account_id {
                add(secondary, -direction * amount.abs());
            }
        }

        let empty = BTreeMap::new();
        let records: Vec<Vec<ProjectionRecord>> = scenario
            .accounts
            .par_iter()
            .map(|account| {
                let account_postings = postings.get(&account.id).unwrap_or(&empty);
                simulate_account(account, &periods, account_postings, start)
            })
            .collect();

        Ok(records.into_iter().flatten().collect())
    }
}

fn resolve_window(
    scenario: &Scenario,
    options: &ProjectionOptions,
) -> Result<(NaiveDate, NaiveDate, Periodicity)> {
    let config = scenario.projection;
    let start = options
        .start_date
        .or(config.map(|c| c.start_date))
        .ok_or(Error::MissingProjectionWindow)?;
    let end = options
        .end_date
        .or(config.map(|c| c.end_date))
        .ok_or(Error::MissingProjectionWindow)?;
    let periodicity = options
        .periodicity
        .or(config.map(|c| c.periodicity))
        .unwrap_or_default();
    Ok((start, end, periodicity))
}

/// Growth accrual state for one account between checkpoints.
struct GrowthState {
    /// Last date (inclusive) through which growth has been settled.
    checkpoint: NaiveDate,
    /// Principal base for simple-interest accrual; simple interest grows
    /// linearly on the starting balance and never self-compounds.
    simple_principal: f64,
}

fn is_simple_percentage(change: &PeriodicChange) -> bool {
    matches!(change.mode, ChangeMode::Percentage { compounding: Compounding::Simple })
}

/// Settle a single growth rule from the state's checkpoint through `until`
/// (inclusive) and advance the checkpoint. Returns the signed growth delta.
fn settle_span(
    account: &Account,
    change: Option<PeriodicChange>,
    balance: f64,
    state: &mut GrowthState,
    until: NaiveDate,
) -> f64 {
    let days = (until - state.checkpoint).num_days();
    if days <= 0 {
        return 0.0;
    }
    state.checkpoint = until;
    let change = match change {
        Some(pc) if !pc.is_inert() => pc,
        _ => return 0.0,
    };
    let elapsed_years = days as f64 / DAYS_PER_YEAR;
    let delta = if is_simple_percentage(&change) {
        state.simple_principal * (change.value / 100.0) * elapsed_years
    } else {
        apply_periodic_change(balance, Some(&change), elapsed_years) - balance
    };
    if !delta.is_finite() {
        warn!("skipping non-finite growth on account {} through {}", account.id, until);
        return 0.0;
    }
    delta
}

/// Settle growth from the state's checkpoint through `until` (inclusive).
/// When the account carries a periodic-change schedule the span is split at
/// every entry boundary, with the rule in effect on each segment's first
/// day applied to the whole segment.
fn settle_growth(
    account: &Account,
    balance: f64,
    state: &mut GrowthState,
    until: NaiveDate,
) -> f64 {
    if until <= state.checkpoint {
        return 0.0;
    }
    if account.periodic_change_schedule.is_empty() {
        return settle_span(account, account.periodic_change, balance, state, until);
    }

    let mut cuts = vec![until];
    for entry in &account.periodic_change_schedule {
        // Segments end the day before an entry takes effect and on the
        // entry's last day in effect.
        if let Some(eve) = entry.start_date.pred_opt() {
            if eve > state.checkpoint && eve < until {
                cuts.push(eve);
            }
        }
        if let Some(end) = entry.end_date {
            if end > state.checkpoint && end < until {
                cuts.push(end);
            }
        }
    }
    cuts.sort_unstable();
    cuts.dedup();

    let mut balance = balance;
    let mut total = 0.0;
    for cut in cuts {
        let first_day = state.checkpoint.succ_opt().unwrap_or(cut);
        let change = account.change_for(first_day);
        let delta = settle_span(account, change, balance, state, cut);
        balance += delta;
        total += delta;
    }
    total
}

fn simulate_account(
    account: &Account,
    periods: &[Period],
    postings: &BTreeMap<NaiveDate, DayPostings>,
    window_start: NaiveDate,
) -> Vec<ProjectionRecord> {
    let tracked_start = account.open_date.map_or(window_start, |d| d.max(window_start));
    let virtual_origin = tracked_start
        .checked_sub_days(Days::new(1))
        .unwrap_or(tracked_start);

    let mut balance = account.starting_balance;
    let mut growth = GrowthState {
        checkpoint: virtual_origin,
        simple_principal: account.starting_balance,
    };

    let mut records = Vec::with_capacity(periods.len());
    for (index, period) in periods.iter().enumerate() {
        let mut income = 0.0;
        let mut expenses = 0.0;
        let mut interest = 0.0;

        if period.end >= tracked_start {
            let active_from = period.start.max(tracked_start);

            for (&date, day) in postings.range(active_from..=period.end) {
                // Settle growth up to the posting day, then post.
                let delta = settle_growth(account, balance, &mut growth, date);
                balance += delta;
                interest += delta;
                if delta >= 0.0 {
                    income += delta;
                } else {
                    expenses += delta.abs();
                }

                balance += day.signed_total;
                income += day.income;
                expenses += day.expenses;
            }

            // Remaining growth through the period's last day.
            let delta = settle_growth(account, balance, &mut growth, period.end);
            balance += delta;
            interest += delta;
            if delta >= 0.0 {
                income += delta;
            } else {
                expenses += delta.abs();
            }
        }

        records.push(ProjectionRecord {
            account_id: account.id,
            account: account.name.clone(),
            date: period.start,
            balance: round_cents(balance),
            income: round_cents(income),
            expenses: round_cents(expenses),
            net_change: round_cents(income - expenses),
            interest: round_cents(interest),
            period: (index + 1) as u32,
        });
    }
    records
}
