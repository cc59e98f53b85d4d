//! Reporting-period boundary generation
//!
//! Projections report one record per account per period. The first period
//! starts at the window start, unaligned, and ends at the natural boundary
//! of its enclosing calendar period; subsequent periods are calendar-aligned
//! (weeks start on Monday). Period ends always clip to the window end.

use chrono::{Datelike, Days, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};

use super::recurrence::last_day_of_month;

/// Reporting cadence for projection records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Periodicity {
    Day,
    Week,
    Month,
    Quarter,
    Year,
}

impl Periodicity {
    /// Parse either a name ("month") or the legacy numeric period-type id.
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "day" | "daily" | "1" => Some(Self::Day),
            "week" | "weekly" | "2" => Some(Self::Week),
            "month" | "monthly" | "3" => Some(Self::Month),
            "quarter" | "quarterly" | "4" => Some(Self::Quarter),
            "year" | "yearly" | "annual" | "5" => Some(Self::Year),
            _ => None,
        }
    }
}

impl Default for Periodicity {
    fn default() -> Self {
        Self::Month
    }
}

/// A single reporting period, inclusive on both ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Period {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

/// The first calendar boundary strictly after `date` for the cadence: the
/// next day, the next Monday, or the first day of the next month, quarter,
/// or year.
fn next_boundary(date: NaiveDate, periodicity: Periodicity) -> NaiveDate {
    match periodicity {
        Periodicity::Day => date.succ_opt().unwrap_or(date),
        Periodicity::Week => {
            let days_ahead = match date.weekday() {
                Weekday::Mon => 7,
                w => 7 - w.num_days_from_monday() as u64,
            };
            date.checked_add_days(Days::new(days_ahead)).unwrap_or(date)
        }
        Periodicity::Month => {
            let (y, m) = if date.month() == 12 {
                (date.year() + 1, 1)
            } else {
                (date.year(), date.month() + 1)
            };
            NaiveDate::from_ymd_opt(y, m, 1).unwrap_or(date)
        }
        Periodicity::Quarter => {
            let quarter_start_month = ((date.month() - 1) / 3) * 3 + 1;
            let (y, m) = if quarter_start_month >= 10 {
                (date.year() + 1, 1)
            } else {
                (date.year(), quarter_start_month + 3)
            };
            NaiveDate::from_ymd_opt(y, m, 1).unwrap_or(date)
        }
        Periodicity::Year => NaiveDate::from_ymd_opt(date.year() + 1, 1, 1).unwrap_or(date),
    }
}

/// Split `[start, end]` into reporting periods at the given cadence.
/// Returns an empty vec when the window is reversed.
pub fn generate_periods(start: NaiveDate, end: NaiveDate, periodicity: Periodicity) -> Vec<Period> {
    let mut periods = Vec::new();
    if start > end {
        return periods;
    }
    let mut current = start;
    loop {
        let boundary = next_boundary(current, periodicity);
        if boundary <= current {
            break; // date arithmetic hit the calendar's edge
        }
        let period_end = boundary.pred_opt().unwrap_or(boundary).min(end);
        periods.push(Period { start: current, end: period_end });
        if boundary > end {
            break;
        }
        current = boundary;
    }
    periods
}

impl Period {
    /// Days in the period, inclusive of both ends.
    pub fn len_days(&self) -> i64 {
        (self.end - self.start).num_days() + 1
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.start && date <= self.end
    }
}

/// Last day of the calendar month containing `date`.
pub fn month_end(date: NaiveDate) -> NaiveDate {
    NaiveDate::from_ymd_opt(date.year(), date.month(), last_day_of_month(date.year(), date.month()))
        .unwrap_or(date)
}
