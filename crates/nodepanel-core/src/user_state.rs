//! Effective user status.
//!
//! The stored status is a sticky override for `disabled`, `expired` and
//! `traffic_exceeded`; an `active` row can still evaluate to `expired` or
//! `traffic_exceeded` from its expiry and traffic counters.

use crate::model::{User, UserStatus};

/// Compute the status a user effectively has at `now` (unix seconds, UTC).
///
/// First match wins: sticky stored status, then expiry, then quota.
pub fn effective_status(user: &User, now: i64) -> UserStatus {
    match user.status {
        UserStatus::Disabled | UserStatus::Expired | UserStatus::TrafficExceeded => user.status,
        UserStatus::Active => {
            if user.expire_at.is_some_and(|at| at <= now) {
                UserStatus::Expired
            } else if user.traffic_limit > 0 && user.traffic_used >= user.traffic_limit {
                UserStatus::TrafficExceeded
            } else {
                UserStatus::Active
            }
        }
    }
}

/// Whether the user should be pushed to nodes and served subscriptions.
pub fn is_subscription_eligible(user: &User, now: i64) -> bool {
    effective_status(user, now) == UserStatus::Active
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn now() -> i64 {
        Utc.with_ymd_and_hms(2026, 2, 8, 12, 0, 0).unwrap().timestamp()
    }

    fn user(status: UserStatus) -> User {
        User {
            id: 1,
            uuid: "8c1c6f4e-0d7a-4d43-9c39-4f0e0e3f9a10".into(),
            username: "alice".into(),
            traffic_limit: 0,
            traffic_used: 0,
            traffic_reset_day: 0,
            status,
            expire_at: None,
            created_at: 0,
            updated_at: 0,
        }
    }

    #[test]
    fn expiry_at_now_is_expired() {
        let mut u = user(UserStatus::Active);
        u.expire_at = Some(now());
        assert_eq!(effective_status(&u, now()), UserStatus::Expired);
    }

    #[test]
    fn future_expiry_stays_active() {
        let mut u = user(UserStatus::Active);
        u.expire_at = Some(now() + 1);
        assert_eq!(effective_status(&u, now()), UserStatus::Active);
        assert!(is_subscription_eligible(&u, now()));
    }

    #[test]
    fn sticky_status_wins_over_counters() {
        let mut u = user(UserStatus::Disabled);
        u.expire_at = Some(now() - 10);
        u.traffic_limit = 10;
        u.traffic_used = 20;
        assert_eq!(effective_status(&u, now()), UserStatus::Disabled);

        u.status = UserStatus::TrafficExceeded;
        u.traffic_used = 0;
        assert_eq!(effective_status(&u, now()), UserStatus::TrafficExceeded);
    }

    #[test]
    fn expiry_precedes_quota() {
        let mut u = user(UserStatus::Active);
        u.expire_at = Some(now() - 1);
        u.traffic_limit = 10;
        u.traffic_used = 10;
        assert_eq!(effective_status(&u, now()), UserStatus::Expired);
    }

    #[test]
    fn quota_reached_is_traffic_exceeded() {
        let mut u = user(UserStatus::Active);
        u.traffic_limit = 1024;
        u.traffic_used = 1024;
        assert_eq!(effective_status(&u, now()), UserStatus::TrafficExceeded);
        assert!(!is_subscription_eligible(&u, now()));
    }

    #[test]
    fn zero_limit_is_unlimited() {
        let mut u = user(UserStatus::Active);
        u.traffic_used = i64::MAX;
        assert_eq!(effective_status(&u, now()), UserStatus::Active);
    }

    #[test]
    fn only_stored_disabled_evaluates_to_disabled() {
        for stored in [
            UserStatus::Active,
            UserStatus::Expired,
            UserStatus::TrafficExceeded,
        ] {
            let mut u = user(stored);
            u.expire_at = Some(now() - 1);
            u.traffic_limit = 1;
            u.traffic_used = 5;
            assert_ne!(effective_status(&u, now()), UserStatus::Disabled);
        }
    }
}
