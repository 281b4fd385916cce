//! Expiry-threshold classification.
//!
//! The scan job makes a single pass over expiring records and looks up
//! which notification threshold applies from the remaining time, instead of
//! running one hand-maintained time-window query per threshold. The windows
//! are mutually exclusive by construction, which removes the off-by-one
//! risk at the 1-day/7-day seam.

use chrono::Duration;

/// How far ahead the scan job looks for expiring records.
pub const SCAN_HORIZON_DAYS: i64 = 7;

/// A notification threshold crossed by an expiring subscription.
///
/// Ordered from most to least urgent; each maps to exactly one
/// `notified_*` flag on the record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationThreshold {
    /// Expiry already passed.
    Expired,
    /// Expires within the next 24 hours.
    OneDay,
    /// Expires within the next 7 days (but more than 1 day away).
    SevenDays,
}

impl NotificationThreshold {
    /// Classify remaining time until expiry into a threshold.
    ///
    /// Returns `None` when the expiry is beyond the scan horizon.
    pub fn classify(remaining: Duration) -> Option<Self> {
        if remaining <= Duration::zero() {
            Some(NotificationThreshold::Expired)
        } else if remaining <= Duration::days(1) {
            Some(NotificationThreshold::OneDay)
        } else if remaining <= Duration::days(SCAN_HORIZON_DAYS) {
            Some(NotificationThreshold::SevenDays)
        } else {
            None
        }
    }

    /// Whole days remaining, rounded up, for customer-facing copy.
    ///
    /// "Expires in 3 days" for anything between 2 and 3 days out.
    pub fn days_remaining(remaining: Duration) -> i64 {
        let secs = remaining.num_seconds();
        if secs <= 0 {
            return 0;
        }
        const DAY_SECS: i64 = 24 * 60 * 60;
        // `i64::div_ceil` is still unstable (int_roundings); `secs > 0` is
        // guaranteed above, so this equivalent idiom rounds up identically.
        (secs + DAY_SECS - 1) / DAY_SECS
    }
}

/// Alias kept for readability at call sites that talk about buckets
/// rather than thresholds.
pub type ExpiryBucket = NotificationThreshold;

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn past_expiry_classifies_expired() {
        let t = NotificationThreshold::classify(Duration::hours(-5));
        assert_eq!(t, Some(NotificationThreshold::Expired));
    }

    #[test]
    fn exactly_now_classifies_expired() {
        let t = NotificationThreshold::classify(Duration::zero());
        assert_eq!(t, Some(NotificationThreshold::Expired));
    }

    #[test]
    fn twelve_hours_out_classifies_one_day() {
        let t = NotificationThreshold::classify(Duration::hours(12));
        assert_eq!(t, Some(NotificationThreshold::OneDay));
    }

    #[test]
    fn exactly_one_day_classifies_one_day() {
        let t = NotificationThreshold::classify(Duration::days(1));
        assert_eq!(t, Some(NotificationThreshold::OneDay));
    }

    #[test]
    fn just_past_one_day_classifies_seven_days() {
        let t = NotificationThreshold::classify(Duration::days(1) + Duration::seconds(1));
        assert_eq!(t, Some(NotificationThreshold::SevenDays));
    }

    #[test]
    fn exactly_seven_days_classifies_seven_days() {
        let t = NotificationThreshold::classify(Duration::days(7));
        assert_eq!(t, Some(NotificationThreshold::SevenDays));
    }

    #[test]
    fn beyond_horizon_classifies_nothing() {
        let t = NotificationThreshold::classify(Duration::days(7) + Duration::seconds(1));
        assert_eq!(t, None);
    }

    #[test]
    fn days_remaining_rounds_up() {
        assert_eq!(
            NotificationThreshold::days_remaining(Duration::hours(49)),
            3
        );
        assert_eq!(
            NotificationThreshold::days_remaining(Duration::hours(48)),
            2
        );
        assert_eq!(NotificationThreshold::days_remaining(Duration::hours(-1)), 0);
    }

    proptest! {
        // Every remaining time maps to at most one threshold, and less
        // remaining time never maps to a less urgent threshold.
        #[test]
        fn classification_is_monotone(a in -1_000_000i64..1_000_000, b in -1_000_000i64..1_000_000) {
            let (less, more) = if a <= b { (a, b) } else { (b, a) };
            let urgency = |t: Option<NotificationThreshold>| match t {
                Some(NotificationThreshold::Expired) => 3,
                Some(NotificationThreshold::OneDay) => 2,
                Some(NotificationThreshold::SevenDays) => 1,
                None => 0,
            };
            let less_urgency = urgency(NotificationThreshold::classify(Duration::seconds(less)));
            let more_urgency = urgency(NotificationThreshold::classify(Duration::seconds(more)));
            prop_assert!(less_urgency >= more_urgency);
        }
    }
}
