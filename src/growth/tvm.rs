//! Time-value-of-money closed forms used by goal planning
//!
//! All rates are nominal annual decimals (0.05 for 5%); the monthly rate is
//! `annual / 12`. The linear (rate = 0) branches avoid the 0/0 annuity
//! factor.

use chrono::{Datelike, NaiveDate};

/// Monthly contribution needed to move `present_value` to `future_value`
/// over `months`, solving `FV = PV(1+r)^n + PMT ((1+r)^n - 1)/r` for PMT.
pub fn contribution_amount(
    present_value: f64,
    future_value: f64,
    months: f64,
    annual_rate: f64,
) -> f64 {
    if months <= 0.0 {
        return 0.0;
    }
    let r = annual_rate / 12.0;
    if r == 0.0 {
        return (future_value - present_value) / months;
    }
    let factor = (1.0 + r).powf(months);
    let denominator = (factor - 1.0) / r;
    if denominator == 0.0 {
        return 0.0;
    }
    (future_value - present_value * factor) / denominator
}

/// Balance after `months` of compounding plus a level monthly contribution.
pub fn future_value(
    present_value: f64,
    monthly_contribution: f64,
    months: f64,
    annual_rate: f64,
) -> f64 {
    if months <= 0.0 {
        return present_value;
    }
    let r = annual_rate / 12.0;
    if r == 0.0 {
        return present_value + monthly_contribution * months;
    }
    let factor = (1.0 + r).powf(months);
    present_value * factor + monthly_contribution * (factor - 1.0) / r
}

/// Months until `future_value` is reached at a level contribution, or
/// `None` when the goal is unreachable within `max_months`. Uses a binary
/// search on `future_value` when compounding is in play.
pub fn months_to_goal(
    present_value: f64,
    target: f64,
    monthly_contribution: f64,
    annual_rate: f64,
    max_months: u32,
) -> Option<f64> {
    if present_value >= target {
        return Some(0.0);
    }
    if monthly_contribution <= 0.0 {
        return None;
    }
    if annual_rate == 0.0 {
        let months = (target - present_value) / monthly_contribution;
        return (months >= 0.0).then_some(months);
    }

    if future_value(present_value, monthly_contribution, max_months as f64, annual_rate) < target {
        return None;
    }
    let (mut low, mut high) = (1u32, max_months);
    let mut result = None;
    while low <= high {
        let mid = (low + high) / 2;
        let fv = future_value(present_value, monthly_contribution, mid as f64, annual_rate);
        if (fv - target).abs() < 0.01 {
            return Some(mid as f64);
        } else if fv < target {
            low = mid + 1;
        } else {
            result = Some(mid as f64);
            if mid == 0 {
                break;
            }
            high = mid - 1;
        }
    }
    result
}

/// Whole calendar months between two dates, ignoring days of month.
pub fn whole_months_between(start: NaiveDate, end: NaiveDate) -> i32 {
    (end.year() - start.year()) * 12 + (end.month() as i32 - start.month() as i32)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_contribution_linear_when_no_rate() {
        assert_relative_eq!(contribution_amount(0.0, 1200.0, 12.0, 0.0), 100.0);
        assert_relative_eq!(contribution_amount(500.0, 1700.0, 6.0, 0.0), 200.0);
    }

    #[test]
    fn test_contribution_round_trips_through_future_value() {
        let pmt = contribution_amount(1000.0, 10_000.0, 36.0, 0.05);
        let fv = future_value(1000.0, pmt, 36.0, 0.05);
        assert_relative_eq!(fv, 10_000.0, epsilon = 1e-6);
    }

    #[test]
    fn test_contribution_zero_months() {
        assert_eq!(contribution_amount(0.0, 5000.0, 0.0, 0.05), 0.0);
    }

    #[test]
    fn test_future_value_linear() {
        assert_relative_eq!(future_value(100.0, 50.0, 10.0, 0.0), 600.0);
    }

    #[test]
    fn test_future_value_compounds() {
        let fv = future_value(1000.0, 0.0, 12.0, 0.12);
        assert_relative_eq!(fv, 1000.0 * (1.01_f64).powi(12));
    }

    #[test]
    fn test_months_to_goal_already_there() {
        assert_eq!(months_to_goal(5000.0, 4000.0, 0.0, 0.05, 600), Some(0.0));
    }

    #[test]
    fn test_months_to_goal_unreachable() {
        assert_eq!(months_to_goal(0.0, 1000.0, 0.0, 0.0, 600), None);
        assert_eq!(months_to_goal(0.0, 1e12, 1.0, 0.01, 600), None);
    }

    #[test]
    fn test_months_to_goal_linear() {
        assert_eq!(months_to_goal(0.0, 1200.0, 100.0, 0.0, 600), Some(12.0));
    }

    #[test]
    fn test_months_to_goal_with_interest_is_sooner() {
        let without = months_to_goal(0.0, 12_000.0, 100.0, 0.0, 600).unwrap();
        let with = months_to_goal(0.0, 12_000.0, 100.0, 0.08, 600).unwrap();
        assert!(with < without);
    }

    #[test]
    fn test_whole_months_between() {
        assert_eq!(whole_months_between(date(2026, 1, 15), date(2026, 7, 2)), 6);
        assert_eq!(whole_months_between(date(2026, 11, 1), date(2027, 2, 28)), 3);
        assert_eq!(whole_months_between(date(2026, 5, 1), date(2026, 5, 31)), 0);
    }
}
