//! Staleness gate.
//!
//! Signal precedence:
//! 1. `NeverRenewed` (no cached record)
//! 2. `Stale` (`now - last_renewed_at >= update_interval`)
//! 3. `Current`
//!
//! A `last_renewed_at` in the future counts as age zero.

use std::time::Duration;

use chrono::{DateTime, Utc};

/// Staleness classification of one cached network.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StalenessSignal {
    NeverRenewed,
    Stale { age: Duration },
    Current { age: Duration, due_in: Duration },
}

impl StalenessSignal {
    /// Whether the network must be recomputed this pass.
    pub fn is_due(&self) -> bool {
        !matches!(self, StalenessSignal::Current { .. })
    }

    pub fn label(&self) -> &'static str {
        match self {
            StalenessSignal::NeverRenewed => "never renewed",
            StalenessSignal::Stale { .. } => "stale",
            StalenessSignal::Current { .. } => "current",
        }
    }
}

pub fn check(
    last_renewed_at: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
    update_interval: Duration,
) -> StalenessSignal {
    let Some(last) = last_renewed_at else {
        return StalenessSignal::NeverRenewed;
    };
    let age = age_between(last, now);
    if age >= update_interval {
        StalenessSignal::Stale { age }
    } else {
        StalenessSignal::Current {
            age,
            due_in: update_interval - age,
        }
    }
}

/// Elapsed time from `earlier` to `now`, clamped at zero.
pub fn age_between(earlier: DateTime<Utc>, now: DateTime<Utc>) -> Duration {
    now.signed_duration_since(earlier)
        .to_std()
        .unwrap_or_default()
}

/// Compact age of a timestamp relative to `now` (`"42s"`, `"5m"`, `"3h"`, `"2d"`).
pub fn format_age(timestamp: DateTime<Utc>, now: DateTime<Utc>) -> String {
    format_duration(age_between(timestamp, now))
}

pub fn format_duration(duration: Duration) -> String {
    format_seconds(duration.as_secs())
}

fn format_seconds(seconds: u64) -> String {
    if seconds < 60 {
        return format!("{seconds}s");
    }
    if seconds < 60 * 60 {
        return format!("{}m", seconds / 60);
    }
    if seconds < 60 * 60 * 24 {
        return format!("{}h", seconds / (60 * 60));
    }
    format!("{}d", seconds / (60 * 60 * 24))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration as ChronoDuration;
    use rstest::rstest;

    const TTL: Duration = Duration::from_secs(300);

    #[test]
    fn never_renewed_without_record() {
        let signal = check(None, Utc::now(), TTL);
        assert_eq!(signal, StalenessSignal::NeverRenewed);
        assert!(signal.is_due());
    }

    #[rstest]
    #[case(0, false)]
    #[case(299, false)]
    #[case(300, true)]
    #[case(301, true)]
    fn gate_boundary(#[case] age_secs: i64, #[case] due: bool) {
        let now = Utc::now();
        let signal = check(Some(now - ChronoDuration::seconds(age_secs)), now, TTL);
        assert_eq!(signal.is_due(), due, "age {age_secs}s gave {signal:?}");
    }

    #[test]
    fn current_reports_remaining_time() {
        let now = Utc::now();
        let signal = check(Some(now - ChronoDuration::seconds(100)), now, TTL);
        assert_eq!(
            signal,
            StalenessSignal::Current {
                age: Duration::from_secs(100),
                due_in: Duration::from_secs(200),
            }
        );
    }

    #[test]
    fn future_timestamp_is_current() {
        let now = Utc::now();
        let signal = check(Some(now + ChronoDuration::hours(1)), now, TTL);
        assert_eq!(
            signal,
            StalenessSignal::Current {
                age: Duration::ZERO,
                due_in: TTL,
            }
        );
    }

    #[test]
    fn ages_are_compact() {
        let now = Utc::now();
        assert_eq!(format_age(now, now), "0s");
        assert_eq!(format_age(now - ChronoDuration::seconds(65), now), "1m");
        assert_eq!(format_duration(Duration::from_secs(3 * 3600)), "3h");
        assert_eq!(format_duration(Duration::from_secs(2 * 86400 + 5)), "2d");
    }
}
