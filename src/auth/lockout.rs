use chrono::{DateTime, Duration, Utc};

use crate::{config::AuthConfig, domain::User};

/// Decides lock/unlock transitions from login outcomes. Pure; persistence
/// happens through the user repository's conditional updates.
#[derive(Debug, Clone)]
pub struct LockoutPolicy {
    pub max_attempts: i64,
    pub lock_duration: Duration,
}

impl LockoutPolicy {
    pub fn new(max_attempts: i64, lock_duration: Duration) -> Self {
        Self {
            max_attempts,
            lock_duration,
        }
    }

    pub fn from_config(config: &AuthConfig) -> Self {
        Self::new(
            config.max_login_attempts,
            Duration::seconds(config.lock_duration_secs),
        )
    }

    pub fn is_locked(&self, user: &User, now: DateTime<Utc>) -> bool {
        user.is_locked(now)
    }

    /// Increments the attempt counter, locking the account once the cap is
    /// reached. Already-locked accounts are left untouched: repeated
    /// failures while locked never extend the window.
    pub fn record_failed_attempt(&self, user: &mut User, now: DateTime<Utc>) {
        if self.is_locked(user, now) {
            return;
        }

        user.login_attempts += 1;
        if user.login_attempts >= self.max_attempts {
            user.lock_until = Some(now + self.lock_duration);
        }
    }

    /// A successful login always clears the counter and any lock.
    pub fn record_success(&self, user: &mut User, now: DateTime<Utc>) {
        user.login_attempts = 0;
        user.lock_until = None;
        user.last_login = Some(now);
    }

    /// The `lock_until` value a conditional UPDATE should apply when the
    /// incremented counter crosses the cap.
    pub fn lock_until(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        now + self.lock_duration
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Role;
    use uuid::Uuid;

    fn policy() -> LockoutPolicy {
        LockoutPolicy::new(5, Duration::minutes(5))
    }

    fn user() -> User {
        let now = Utc::now();
        User {
            id: Uuid::new_v4(),
            email: "someone@example.com".to_string(),
            password_hash: String::new(),
            role: Role::Member,
            member_id: None,
            is_verified: true,
            login_attempts: 0,
            lock_until: None,
            last_login: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn locks_at_exactly_max_attempts() {
        let policy = policy();
        let now = Utc::now();
        let mut u = user();

        for _ in 0..4 {
            policy.record_failed_attempt(&mut u, now);
        }
        assert!(!policy.is_locked(&u, now), "4 of 5 attempts must not lock");

        policy.record_failed_attempt(&mut u, now);
        assert!(policy.is_locked(&u, now), "5th attempt must lock");
    }

    #[test]
    fn failures_while_locked_do_not_extend_the_window() {
        let policy = policy();
        let now = Utc::now();
        let mut u = user();

        for _ in 0..5 {
            policy.record_failed_attempt(&mut u, now);
        }
        let locked_until = u.lock_until;

        let later = now + Duration::minutes(2);
        policy.record_failed_attempt(&mut u, later);
        assert_eq!(u.lock_until, locked_until);
        assert_eq!(u.login_attempts, 5);
    }

    #[test]
    fn lock_expires_after_the_window() {
        let policy = policy();
        let now = Utc::now();
        let mut u = user();

        for _ in 0..5 {
            policy.record_failed_attempt(&mut u, now);
        }
        assert!(policy.is_locked(&u, now));
        assert!(!policy.is_locked(&u, now + Duration::minutes(6)));
    }

    #[test]
    fn success_resets_regardless_of_prior_state() {
        let policy = policy();
        let now = Utc::now();
        let mut u = user();

        for _ in 0..5 {
            policy.record_failed_attempt(&mut u, now);
        }

        policy.record_success(&mut u, now);
        assert_eq!(u.login_attempts, 0);
        assert!(!policy.is_locked(&u, now));
        assert_eq!(u.last_login, Some(now));
    }
}
