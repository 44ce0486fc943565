//! Duration extraction for `remind`.
//!
//! Hours, minutes and seconds are searched for independently, anywhere in the
//! text and in any order. Every match of a unit counts, so "1 hour 1 hour"
//! is two hours.

use std::sync::LazyLock;
use std::time::Duration;

use regex::Regex;

static HOURS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d+)\s*(?:hours|hour|h)").expect("hours pattern"));
static MINUTES: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d+)\s*(?:minutes|minute|m)").expect("minutes pattern"));
static SECONDS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d+)\s*(?:seconds|second|s)").expect("seconds pattern"));

/// A parsed reminder delay, kept in the units the user wrote.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeSpan {
    pub hours: u64,
    pub minutes: u64,
    pub seconds: u64,
}

impl TimeSpan {
    /// Total length in seconds, `None` on overflow.
    pub fn total_seconds(&self) -> Option<u64> {
        self.hours
            .checked_mul(3600)?
            .checked_add(self.minutes.checked_mul(60)?)?
            .checked_add(self.seconds)
    }

    pub fn as_duration(&self) -> Duration {
        Duration::from_secs(self.total_seconds().unwrap_or(u64::MAX))
    }

    /// Human-readable breakdown, e.g. "1 hour 30 minutes". Zero units are left out.
    pub fn describe(&self) -> String {
        [(self.hours, "hour"), (self.minutes, "minute"), (self.seconds, "second")]
            .into_iter()
            .filter(|(n, _)| *n > 0)
            .map(|(n, unit)| {
                if n == 1 {
                    format!("{n} {unit}")
                } else {
                    format!("{n} {unit}s")
                }
            })
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Parse a delay out of lower-cased command text.
///
/// Returns `None` when nothing adds up to a positive, representable duration.
pub fn parse(text: &str) -> Option<TimeSpan> {
    let span = TimeSpan {
        hours: sum_matches(&HOURS, text)?,
        minutes: sum_matches(&MINUTES, text)?,
        seconds: sum_matches(&SECONDS, text)?,
    };
    match span.total_seconds() {
        Some(total) if total > 0 => Some(span),
        _ => None,
    }
}

/// Sum of every number written with this unit. `Some(0)` when the unit is
/// absent, `None` when a number or the sum does not fit.
fn sum_matches(pattern: &Regex, text: &str) -> Option<u64> {
    pattern
        .captures_iter(text)
        .try_fold(0u64, |total, caps| total.checked_add(caps[1].parse().ok()?))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seconds(text: &str) -> Option<u64> {
        parse(text).and_then(|s| s.total_seconds())
    }

    #[test]
    fn test_hours_and_minutes() {
        assert_eq!(seconds("remind in 1 hour 30 minutes"), Some(5400));
    }

    #[test]
    fn test_compact_seconds() {
        assert_eq!(seconds("remind in 45s"), Some(45));
    }

    #[test]
    fn test_units_in_any_order() {
        assert_eq!(seconds("!remind 10 seconds 2h 5m"), Some(2 * 3600 + 5 * 60 + 10));
    }

    #[test]
    fn test_all_spellings() {
        assert_eq!(seconds("3h"), Some(3 * 3600));
        assert_eq!(seconds("3 hours"), Some(3 * 3600));
        assert_eq!(seconds("1 minute"), Some(60));
        assert_eq!(seconds("2m"), Some(120));
        assert_eq!(seconds("1 second"), Some(1));
        assert_eq!(seconds("20 seconds"), Some(20));
    }

    #[test]
    fn test_repeated_unit_adds_up() {
        assert_eq!(seconds("remind in 1 hour 1 hour"), Some(7200));
        assert_eq!(seconds("remind in 1 hour 2 hours"), Some(10800));
        assert_eq!(seconds("5m then 10 minutes 30s"), Some(15 * 60 + 30));
    }

    #[test]
    fn test_repeated_unit_is_described_as_sum() {
        let span = parse("remind in 1 hour 1 hour").unwrap();
        assert_eq!(span, TimeSpan { hours: 2, minutes: 0, seconds: 0 });
        assert_eq!(span.describe(), "2 hours");
    }

    #[test]
    fn test_overflowing_sum_fails() {
        assert_eq!(parse("18446744073709551615s 1s"), None);
    }

    #[test]
    fn test_no_unit_fails() {
        assert_eq!(parse("remind me later"), None);
        assert_eq!(parse("remind in 10"), None);
    }

    #[test]
    fn test_zero_total_fails() {
        assert_eq!(parse("remind in 0 minutes"), None);
    }

    #[test]
    fn test_overflowing_number_fails() {
        assert_eq!(parse("remind in 99999999999999999999999 hours"), None);
        assert_eq!(parse("remind in 18446744073709551615 hours"), None);
    }

    #[test]
    fn test_describe_skips_zero_units() {
        let span = TimeSpan { hours: 1, minutes: 0, seconds: 30 };
        assert_eq!(span.describe(), "1 hour 30 seconds");
        let span = TimeSpan { hours: 0, minutes: 2, seconds: 1 };
        assert_eq!(span.describe(), "2 minutes 1 second");
    }

    #[test]
    fn test_describe_keeps_user_units() {
        let span = parse("remind in 90 minutes").unwrap();
        assert_eq!(span.describe(), "90 minutes");
        assert_eq!(span.as_duration(), Duration::from_secs(5400));
    }
}
