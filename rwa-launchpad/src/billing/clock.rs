//! Billing clock: plan intervals and period-end arithmetic.
//!
//! A pure mapping from a billing interval and a point in time to the end of
//! the period that starts there. Renewals always bill from the current
//! time, so this is the only date arithmetic the billing domain needs.

use serde::{Deserialize, Serialize};

use crate::error::{LaunchpadError, Result};

const DAY_SECS: i64 = 86_400;

/// Supported billing intervals.
///
/// The wire representation matches the data service's `plans.interval`
/// column (`"weekly"` / `"monthly"` / `"yearly"`). Anything else in a plan
/// row is rejected with [`LaunchpadError::UnknownInterval`] at parse time
/// rather than producing a zero-length billing period.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BillingInterval {
    /// 7-day billing period.
    Weekly,
    /// 30-day billing period.
    Monthly,
    /// 365-day billing period.
    Yearly,
}

impl BillingInterval {
    /// Parses an interval string from a plan row.
    ///
    /// # Errors
    ///
    /// Returns [`LaunchpadError::UnknownInterval`] for anything outside
    /// {weekly, monthly, yearly}.
    pub fn parse(raw: &str) -> Result<Self> {
        match raw {
            "weekly" => Ok(Self::Weekly),
            "monthly" => Ok(Self::Monthly),
            "yearly" => Ok(Self::Yearly),
            other => Err(LaunchpadError::UnknownInterval(other.to_owned())),
        }
    }

    /// Returns the period length in seconds.
    #[must_use]
    pub fn period_secs(self) -> i64 {
        match self {
            Self::Weekly => 7 * DAY_SECS,
            Self::Monthly => 30 * DAY_SECS,
            Self::Yearly => 365 * DAY_SECS,
        }
    }

    /// Returns the wire string for this interval.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Weekly => "weekly",
            Self::Monthly => "monthly",
            Self::Yearly => "yearly",
        }
    }
}

/// Computes the end of the billing period starting at `now` (Unix seconds).
#[must_use]
pub fn next_period_end(interval: BillingInterval, now: i64) -> i64 {
    now + interval.period_secs()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_weekly_period_delta() {
        assert_eq!(next_period_end(BillingInterval::Weekly, 1_700_000_000) - 1_700_000_000, 604_800);
    }

    #[test]
    fn test_monthly_period_delta() {
        assert_eq!(
            next_period_end(BillingInterval::Monthly, 1_700_000_000) - 1_700_000_000,
            2_592_000
        );
    }

    #[test]
    fn test_yearly_period_delta() {
        assert_eq!(
            next_period_end(BillingInterval::Yearly, 1_700_000_000) - 1_700_000_000,
            31_536_000
        );
    }

    #[test]
    fn test_deltas_hold_for_any_now() {
        for now in [0, 1, 1_234_567_890, i64::from(u32::MAX)] {
            assert_eq!(next_period_end(BillingInterval::Weekly, now) - now, 7 * DAY_SECS);
            assert_eq!(next_period_end(BillingInterval::Monthly, now) - now, 30 * DAY_SECS);
            assert_eq!(next_period_end(BillingInterval::Yearly, now) - now, 365 * DAY_SECS);
        }
    }

    #[test]
    fn test_parse_known_intervals() {
        assert_eq!(BillingInterval::parse("weekly").unwrap(), BillingInterval::Weekly);
        assert_eq!(BillingInterval::parse("monthly").unwrap(), BillingInterval::Monthly);
        assert_eq!(BillingInterval::parse("yearly").unwrap(), BillingInterval::Yearly);
    }

    #[test]
    fn test_parse_unknown_interval_fails_loudly() {
        let result = BillingInterval::parse("fortnightly");
        assert!(matches!(result, Err(LaunchpadError::UnknownInterval(ref s)) if s == "fortnightly"));
    }

    #[test]
    fn test_parse_is_case_sensitive() {
        assert!(BillingInterval::parse("Monthly").is_err());
    }

    #[test]
    fn test_serde_wire_format() {
        let json = serde_json::to_string(&BillingInterval::Monthly).unwrap();
        assert_eq!(json, "\"monthly\"");
        let parsed: BillingInterval = serde_json::from_str("\"yearly\"").unwrap();
        assert_eq!(parsed, BillingInterval::Yearly);
    }
}
