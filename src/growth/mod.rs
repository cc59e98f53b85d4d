//! Periodic-change engine: interest, growth, and escalation math
//!
//! A `PeriodicChange` describes how a principal (an account balance, or a
//! recurring transaction's amount) drifts over time, either as a fixed
//! linear delta per period or as a compounding percentage rate.
//! `apply_periodic_change` evaluates the closed form over a fractional-year
//! interval; fractional periods are exponentiated, never truncated, so
//! growth is continuous between checkpoints.

pub mod tvm;

use serde::{Deserialize, Serialize};

/// How often a fixed delta or a nominal rate's base period recurs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Frequency {
    Daily,
    Weekly,
    Monthly,
    Quarterly,
    Yearly,
}

impl Frequency {
    pub fn periods_per_year(self) -> f64 {
        match self {
            Frequency::Daily => 365.0,
            Frequency::Weekly => 52.0,
            Frequency::Monthly => 12.0,
            Frequency::Quarterly => 4.0,
            Frequency::Yearly => 1.0,
        }
    }
}

/// Compounding scheme for a percentage-rate change. The rate `value` is a
/// nominal annual percentage except under `Custom`, where it is nominal per
/// the custom period.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Compounding {
    /// Linear accrual on the principal: `P * (1 + r * t)`.
    Simple,
    /// Nominal annual, compounded monthly.
    Monthly,
    /// Nominal annual, compounded daily.
    Daily,
    /// Nominal annual, compounded quarterly.
    Quarterly,
    /// Compounded once per year.
    Annual,
    /// Continuous compounding: `P * e^(r t)`.
    Continuous,
    /// Rate is nominal per `period`, compounded `frequency` times within
    /// that period (e.g. 3% per year compounded 12 times = monthly).
    Custom { period: Frequency, frequency: f64 },
}

/// How the change is expressed: a compounding percentage or a flat amount
/// accruing once per cadence period.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum ChangeMode {
    Percentage { compounding: Compounding },
    FixedAmount { cadence: Frequency },
}

/// Interest or escalation applied to a principal over time.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PeriodicChange {
    /// Percentage (e.g. 5.0 for 5%) or flat per-period amount.
    pub value: f64,
    #[serde(flatten)]
    pub mode: ChangeMode,
}

impl PeriodicChange {
    pub fn percentage(value: f64, compounding: Compounding) -> Self {
        Self { value, mode: ChangeMode::Percentage { compounding } }
    }

    pub fn fixed(value: f64, cadence: Frequency) -> Self {
        Self { value, mode: ChangeMode::FixedAmount { cadence } }
    }

    /// The nominal annual rate this change implies, as a decimal. Used by
    /// the goal solver's annuity math; fixed-amount changes contribute 0.
    pub fn annual_rate(&self) -> f64 {
        match self.mode {
            ChangeMode::Percentage { .. } => self.value / 100.0,
            ChangeMode::FixedAmount { .. } => 0.0,
        }
    }

    /// True when applying this change is the identity for any elapsed time.
    pub fn is_inert(&self) -> bool {
        self.value == 0.0 || !self.value.is_finite()
    }
}

/// Value of `principal` after `elapsed_years` under the given change.
/// `None`, a zero or non-finite value, and non-positive elapsed time are
/// all identity.
pub fn apply_periodic_change(
    principal: f64,
    change: Option<&PeriodicChange>,
    elapsed_years: f64,
) -> f64 {
    let change = match change {
        Some(c) if !c.is_inert() => c,
        _ => return principal,
    };
    if elapsed_years <= 0.0 || !elapsed_years.is_finite() {
        return principal;
    }

    match change.mode {
        ChangeMode::FixedAmount { cadence } => {
            principal + change.value * elapsed_years * cadence.periods_per_year()
        }
        ChangeMode::Percentage { compounding } => {
            let rate = change.value / 100.0;
            match compounding {
                Compounding::Simple => principal * (1.0 + rate * elapsed_years),
                Compounding::Monthly => {
                    principal * (1.0 + rate / 12.0).powf(12.0 * elapsed_years)
                }
                Compounding::Daily => {
                    principal * (1.0 + rate / 365.0).powf(365.0 * elapsed_years)
                }
                Compounding::Quarterly => {
                    principal * (1.0 + rate / 4.0).powf(4.0 * elapsed_years)
                }
                Compounding::Annual => principal * (1.0 + rate).powf(elapsed_years),
                Compounding::Continuous => principal * (rate * elapsed_years).exp(),
                Compounding::Custom { period, frequency } => {
                    if !frequency.is_finite() || frequency <= 0.0 {
                        return principal;
                    }
                    let base_per_year = period.periods_per_year();
                    let annual_rate = rate * base_per_year;
                    let compounding_per_year = frequency * base_per_year;
                    principal
                        * (1.0 + annual_rate / compounding_per_year)
                            .powf(compounding_per_year * elapsed_years)
                }
            }
        }
    }
}
