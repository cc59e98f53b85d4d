//! Recurrence-date generation for planned transactions
//!
//! A `Recurrence` describes when a transaction repeats; `generate_dates`
//! expands it into the concrete calendar dates that fall inside a projection
//! window. Generation is a pure function of its inputs (no "today"
//! dependency) and malformed rules degrade to an empty result rather than
//! failing the caller.

use chrono::{Datelike, Days, NaiveDate};
use log::warn;
use serde::{Deserialize, Serialize};

/// The shape of a recurrence pattern.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RecurrenceRule {
    /// A single occurrence at the recurrence start date.
    OneTime,
    /// Every `interval` days (interval lives on the parent `Recurrence`).
    Daily,
    /// Every `interval` weeks on a weekday (0 = Sunday .. 6 = Saturday).
    /// When `day_of_week` is absent the anchor date's weekday is used.
    Weekly { day_of_week: Option<u32> },
    /// A given day of every month; `-1` selects the last day, and oversized
    /// days clamp to the month's length (Jan 31 anchor posts Feb 28/29).
    MonthlyDayOfMonth { day_of_month: i32 },
    /// The Nth weekday of every month; `week_of_month` 5 or -1 means last.
    MonthlyWeekOfMonth { week_of_month: i32, day_of_week: u32 },
    /// A 1-based day offset from each quarter's first day.
    Quarterly { day_of_quarter: u32 },
    /// A fixed (month, day) each year.
    Yearly { month: u32, day: u32 },
    /// An explicit comma-separated list of ISO dates.
    CustomDates { dates: String },
}

/// A recurrence pattern anchored to a date range.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recurrence {
    pub rule: RecurrenceRule,

    /// Anchor date; when absent the projection window start is used.
    #[serde(default)]
    pub start_date: Option<NaiveDate>,

    /// Last date occurrences may fall on; open-ended when absent.
    #[serde(default)]
    pub end_date: Option<NaiveDate>,

    /// Repeat every N periods of the rule's unit.
    #[serde(default = "default_interval")]
    pub interval: u32,
}

fn default_interval() -> u32 {
    1
}

impl Recurrence {
    /// Monthly on a given day of month, the shape the goal solver emits.
    pub fn monthly(day_of_month: i32, start: NaiveDate, end: NaiveDate) -> Self {
        Self {
            rule: RecurrenceRule::MonthlyDayOfMonth { day_of_month },
            start_date: Some(start),
            end_date: Some(end),
            interval: 1,
        }
    }

    pub fn one_time(date: NaiveDate) -> Self {
        Self {
            rule: RecurrenceRule::OneTime,
            start_date: Some(date),
            end_date: None,
            interval: 1,
        }
    }
}

/// Last calendar day of the month containing `date`.
pub fn last_day_of_month(year: i32, month: u32) -> u32 {
    let (ny, nm) = if month == 12 { (year + 1, 1) } else { (year, month + 1) };
    NaiveDate::from_ymd_opt(ny, nm, 1)
        .and_then(|d| d.pred_opt())
        .map(|d| d.day())
        .unwrap_or(28)
}

/// Weekday as 0 = Sunday .. 6 = Saturday.
fn weekday_index(date: NaiveDate) -> u32 {
    date.weekday().num_days_from_sunday()
}

/// The Nth occurrence (1-4, or -1 for last) of `weekday` in a month.
fn nth_weekday_of_month(year: i32, month: u32, weekday: u32, n: i32) -> Option<NaiveDate> {
    let last = last_day_of_month(year, month);
    if n == -1 {
        for day in (1..=last).rev() {
            let d = NaiveDate::from_ymd_opt(year, month, day)?;
            if weekday_index(d) == weekday {
                return Some(d);
            }
        }
        return None;
    }
    let mut count = 0;
    for day in 1..=last {
        let d = NaiveDate::from_ymd_opt(year, month, day)?;
        if weekday_index(d) == weekday {
            count += 1;
            if count == n {
                return Some(d);
            }
        }
    }
    None
}

/// First day of the month `months` months after (year, month, 1).
fn add_months(year: i32, month: u32, months: u32) -> (i32, u32) {
    let total = (year as i64) * 12 + (month as i64 - 1) + months as i64;
    ((total.div_euclid(12)) as i32, (total.rem_euclid(12) + 1) as u32)
}

/// Expand a recurrence into the concrete dates inside
/// `[window_start, window_end]`, ascending and unique.
pub fn generate_dates(
    recurrence: &Recurrence,
    window_start: NaiveDate,
    window_end: NaiveDate,
) -> Vec<NaiveDate> {
    let anchor = recurrence.start_date.unwrap_or(window_start);
    let rule_end = recurrence.end_date.unwrap_or(window_end);

    // Effective range: the rule's own range intersected with the window.
    let effective_start = anchor.max(window_start);
    let effective_end = rule_end.min(window_end);
    let interval = recurrence.interval.max(1);

    let mut dates: Vec<NaiveDate> = Vec::new();

    match &recurrence.rule {
        RecurrenceRule::OneTime => {
            // One-time is tested against the full window, not the
            // rule-intersected range.
            if anchor >= window_start && anchor <= window_end {
                dates.push(anchor);
            }
        }

        RecurrenceRule::Daily => {
            let mut current = effective_start;
            while current <= effective_end {
                dates.push(current);
                current = match current.checked_add_days(Days::new(interval as u64)) {
                    Some(d) => d,
                    None => break,
                };
            }
        }

        RecurrenceRule::Weekly { day_of_week } => {
            let target = day_of_week.map(|d| d % 7).unwrap_or_else(|| weekday_index(anchor));
            // Advance the anchor to the target weekday.
            let shift = (target + 7 - weekday_index(anchor)) % 7;
            let mut current = match anchor.checked_add_days(Days::new(shift as u64)) {
                Some(d) => d,
                None => return dates,
            };
            // Skip whole interval-week strides to reach the effective range.
            if current < effective_start {
                let days_behind = (effective_start - current).num_days();
                let weeks_behind = days_behind / 7;
                let strides = (weeks_behind + interval as i64 - 1) / interval as i64;
                current = match current.checked_add_days(Days::new((strides * 7 * interval as i64) as u64)) {
                    Some(d) => d,
                    None => return dates,
                };
            }
            while current <= effective_end {
                if current >= effective_start {
                    dates.push(current);
                }
                current = match current.checked_add_days(Days::new(7 * interval as u64)) {
                    Some(d) => d,
                    None => break,
                };
            }
        }

        RecurrenceRule::MonthlyDayOfMonth { day_of_month } => {
            let day_of_month = *day_of_month;
            let (mut year, mut month) = (effective_start.year(), effective_start.month());
            loop {
                let month_start = match NaiveDate::from_ymd_opt(year, month, 1) {
                    Some(d) => d,
                    None => break,
                };
                if month_start > effective_end {
                    break;
                }
                let last = last_day_of_month(year, month);
                let target = if day_of_month == -1 {
                    last
                } else {
                    (day_of_month.max(1) as u32).min(last)
                };
                if let Some(occurrence) = NaiveDate::from_ymd_opt(year, month, target) {
                    if occurrence >= effective_start && occurrence <= effective_end {
                        dates.push(occurrence);
                    }
                }
                let (y, m) = add_months(year, month, interval);
                year = y;
                month = m;
            }
        }

        RecurrenceRule::MonthlyWeekOfMonth { week_of_month, day_of_week } => {
            // Week 5 is an alias for "last"; weekday 7 wraps to Sunday.
            let week = if *week_of_month == -1 || *week_of_month == 5 {
                -1
            } else {
                (*week_of_month).clamp(1, 4)
            };
            let weekday = if *day_of_week == 7 { 0 } else { *day_of_week % 7 };
            let (mut year, mut month) = (effective_start.year(), effective_start.month());
            loop {
                let month_start = match NaiveDate::from_ymd_opt(year, month, 1) {
                    Some(d) => d,
                    None => break,
                };
                if month_start > effective_end {
                    break;
                }
                if let Some(occurrence) = nth_weekday_of_month(year, month, weekday, week) {
                    if occurrence >= effective_start && occurrence <= effective_end {
                        dates.push(occurrence);
                    }
                }
                let (y, m) = add_months(year, month, interval);
                year = y;
                month = m;
            }
        }

        RecurrenceRule::Quarterly { day_of_quarter } => {
            let offset = (*day_of_quarter).max(1) - 1;
            let start_quarter_month = ((effective_start.month() - 1) / 3) * 3 + 1;
            let (mut year, mut month) = (effective_start.year(), start_quarter_month);
            loop {
                let quarter_start = match NaiveDate::from_ymd_opt(year, month, 1) {
                    Some(d) => d,
                    None => break,
                };
                if quarter_start > effective_end {
                    break;
                }
                if let Some(occurrence) = quarter_start.checked_add_days(Days::new(offset as u64)) {
                    if occurrence >= effective_start && occurrence <= effective_end {
                        dates.push(occurrence);
                    }
                }
                let (y, m) = add_months(year, month, 3 * interval);
                year = y;
                month = m;
            }
        }

        RecurrenceRule::Yearly { month, day } => {
            let month = (*month).clamp(1, 12);
            let mut year = effective_start.year();
            let make = |year: i32| {
                let day = (*day).max(1).min(last_day_of_month(year, month));
                NaiveDate::from_ymd_opt(year, month, day)
            };
            if let Some(first) = make(year) {
                if first < effective_start {
                    year += 1;
                }
            }
            loop {
                let occurrence = match make(year) {
                    Some(d) => d,
                    None => break,
                };
                if occurrence > effective_end {
                    break;
                }
                if occurrence >= effective_start {
                    dates.push(occurrence);
                }
                year += interval.max(1) as i32;
            }
        }

        RecurrenceRule::CustomDates { dates: list } => {
            for entry in list.split(',').map(str::trim).filter(|s| !s.is_empty()) {
                match NaiveDate::parse_from_str(entry, "%Y-%m-%d") {
                    Ok(d) if d >= effective_start && d <= effective_end => dates.push(d),
                    Ok(_) => {}
                    Err(_) => warn!("skipping unparseable custom recurrence date '{}'", entry),
                }
            }
        }
    }

    dates.sort_unstable();
    dates.dedup();
    dates
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn monthly_on(day: i32, start: NaiveDate) -> Recurrence {
        Recurrence {
            rule: RecurrenceRule::MonthlyDayOfMonth { day_of_month: day },
            start_date: Some(start),
            end_date: None,
            interval: 1,
        }
    }

    #[test]
    fn test_one_time_inside_window() {
        let rec = Recurrence::one_time(date(2026, 3, 15));
        let dates = generate_dates(&rec, date(2026, 1, 1), date(2026, 12, 31));
        assert_eq!(dates, vec![date(2026, 3, 15)]);
    }

    #[test]
    fn test_one_time_outside_window_is_empty() {
        let rec = Recurrence::one_time(date(2027, 1, 1));
        let dates = generate_dates(&rec, date(2026, 1, 1), date(2026, 12, 31));
        assert!(dates.is_empty());
    }

    #[test]
    fn test_daily_with_interval() {
        let rec = Recurrence {
            rule: RecurrenceRule::Daily,
            start_date: Some(date(2026, 1, 1)),
            end_date: None,
            interval: 3,
        };
        let dates = generate_dates(&rec, date(2026, 1, 1), date(2026, 1, 10));
        assert_eq!(
            dates,
            vec![date(2026, 1, 1), date(2026, 1, 4), date(2026, 1, 7), date(2026, 1, 10)]
        );
    }

    #[test]
    fn test_weekly_defaults_to_anchor_weekday() {
        // 2026-01-07 is a Wednesday.
        let rec = Recurrence {
            rule: RecurrenceRule::Weekly { day_of_week: None },
            start_date: Some(date(2026, 1, 7)),
            end_date: None,
            interval: 1,
        };
        let dates = generate_dates(&rec, date(2026, 1, 1), date(2026, 1, 31));
        assert_eq!(
            dates,
            vec![date(2026, 1, 7), date(2026, 1, 14), date(2026, 1, 21), date(2026, 1, 28)]
        );
    }

    #[test]
    fn test_weekly_skips_strides_before_window() {
        // Anchor a biweekly Friday rule well before the window; occurrences
        // must stay on the anchor's stride, not restart at the window edge.
        let rec = Recurrence {
            rule: RecurrenceRule::Weekly { day_of_week: Some(5) },
            start_date: Some(date(2025, 1, 3)), // a Friday
            end_date: None,
            interval: 2,
        };
        let dates = generate_dates(&rec, date(2026, 1, 1), date(2026, 1, 31));
        for d in &dates {
            assert_eq!(weekday_index(*d), 5);
            let days_from_anchor = (*d - date(2025, 1, 3)).num_days();
            assert_eq!(days_from_anchor % 14, 0);
        }
        assert!(!dates.is_empty());
    }

    #[test]
    fn test_monthly_day_clamps_to_short_months() {
        let rec = monthly_on(31, date(2026, 1, 31));
        let dates = generate_dates(&rec, date(2026, 1, 1), date(2026, 4, 30));
        assert_eq!(
            dates,
            vec![date(2026, 1, 31), date(2026, 2, 28), date(2026, 3, 31), date(2026, 4, 30)]
        );
    }

    #[test]
    fn test_monthly_last_day() {
        let rec = monthly_on(-1, date(2026, 1, 1));
        let dates = generate_dates(&rec, date(2026, 1, 1), date(2026, 3, 31));
        assert_eq!(dates, vec![date(2026, 1, 31), date(2026, 2, 28), date(2026, 3, 31)]);
    }

    #[test]
    fn test_monthly_leap_february() {
        let rec = monthly_on(30, date(2028, 1, 30));
        let dates = generate_dates(&rec, date(2028, 2, 1), date(2028, 2, 29));
        assert_eq!(dates, vec![date(2028, 2, 29)]);
    }

    #[test]
    fn test_monthly_week_of_month_last_friday() {
        let rec = Recurrence {
            rule: RecurrenceRule::MonthlyWeekOfMonth { week_of_month: -1, day_of_week: 5 },
            start_date: Some(date(2026, 1, 1)),
            end_date: None,
            interval: 1,
        };
        let dates = generate_dates(&rec, date(2026, 1, 1), date(2026, 2, 28));
        assert_eq!(dates, vec![date(2026, 1, 30), date(2026, 2, 27)]);
    }

    #[test]
    fn test_monthly_second_tuesday() {
        let rec = Recurrence {
            rule: RecurrenceRule::MonthlyWeekOfMonth { week_of_month: 2, day_of_week: 2 },
            start_date: Some(date(2026, 1, 1)),
            end_date: None,
            interval: 1,
        };
        let dates = generate_dates(&rec, date(2026, 1, 1), date(2026, 2, 28));
        assert_eq!(dates, vec![date(2026, 1, 13), date(2026, 2, 10)]);
    }

    #[test]
    fn test_quarterly_day_offset() {
        let rec = Recurrence {
            rule: RecurrenceRule::Quarterly { day_of_quarter: 15 },
            start_date: Some(date(2026, 1, 1)),
            end_date: None,
            interval: 1,
        };
        let dates = generate_dates(&rec, date(2026, 1, 1), date(2026, 12, 31));
        assert_eq!(
            dates,
            vec![date(2026, 1, 15), date(2026, 4, 15), date(2026, 7, 15), date(2026, 10, 15)]
        );
    }

    #[test]
    fn test_yearly_advances_past_effective_start() {
        let rec = Recurrence {
            rule: RecurrenceRule::Yearly { month: 3, day: 10 },
            start_date: Some(date(2025, 1, 1)),
            end_date: None,
            interval: 1,
        };
        let dates = generate_dates(&rec, date(2026, 6, 1), date(2028, 12, 31));
        assert_eq!(dates, vec![date(2027, 3, 10), date(2028, 3, 10)]);
    }

    #[test]
    fn test_custom_dates_filters_and_skips_malformed() {
        let rec = Recurrence {
            rule: RecurrenceRule::CustomDates {
                dates: "2026-02-01, nonsense, 2026-05-09,2027-01-01".to_string(),
            },
            start_date: None,
            end_date: None,
            interval: 1,
        };
        let dates = generate_dates(&rec, date(2026, 1, 1), date(2026, 12, 31));
        assert_eq!(dates, vec![date(2026, 2, 1), date(2026, 5, 9)]);
    }

    #[test]
    fn test_all_dates_within_window_ascending_unique() {
        let rules = vec![
            RecurrenceRule::Daily,
            RecurrenceRule::Weekly { day_of_week: Some(1) },
            RecurrenceRule::MonthlyDayOfMonth { day_of_month: 31 },
            RecurrenceRule::MonthlyWeekOfMonth { week_of_month: 5, day_of_week: 7 },
            RecurrenceRule::Quarterly { day_of_quarter: 1 },
            RecurrenceRule::Yearly { month: 7, day: 4 },
        ];
        let (ws, we) = (date(2026, 2, 10), date(2027, 8, 20));
        for rule in rules {
            let rec = Recurrence {
                rule,
                start_date: Some(date(2025, 12, 25)),
                end_date: None,
                interval: 1,
            };
            let dates = generate_dates(&rec, ws, we);
            for pair in dates.windows(2) {
                assert!(pair[0] < pair[1]);
            }
            for d in dates {
                assert!(d >= ws && d <= we);
            }
        }
    }

    #[test]
    fn test_rule_end_date_clips_window() {
        let rec = Recurrence {
            rule: RecurrenceRule::MonthlyDayOfMonth { day_of_month: 1 },
            start_date: Some(date(2026, 1, 1)),
            end_date: Some(date(2026, 3, 15)),
            interval: 1,
        };
        let dates = generate_dates(&rec, date(2026, 1, 1), date(2026, 12, 31));
        assert_eq!(dates, vec![date(2026, 1, 1), date(2026, 2, 1), date(2026, 3, 1)]);
    }

    #[test]
    fn test_empty_window_yields_nothing() {
        let rec = monthly_on(1, date(2026, 1, 1));
        let dates = generate_dates(&rec, date(2026, 6, 1), date(2026, 5, 1));
        assert!(dates.is_empty());
    }
}
