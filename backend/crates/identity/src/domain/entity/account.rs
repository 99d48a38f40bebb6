//! Account Entity
//!
//! Identity root: credentials, role, and the lock/active/deleted flags that
//! decide whether the account may authenticate.
//!
//! Every transition takes `now` explicitly so lock expiry is a pure function
//! of the record and the clock.

use chrono::{DateTime, Duration, Utc};

use crate::domain::value_object::{
    AccountId, AccountRole, Email, ProfileStatus, UserName, UserPassword,
};

// ============================================================================
// Lockout policy
// ============================================================================

/// How many consecutive failures lock an account, and for how long
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LockoutPolicy {
    pub max_failed_attempts: u32,
    pub lock_duration: Duration,
}

impl Default for LockoutPolicy {
    fn default() -> Self {
        Self {
            max_failed_attempts: 5,
            lock_duration: Duration::minutes(30),
        }
    }
}

// ============================================================================
// Derived state
// ============================================================================

/// Account state as seen at a given instant
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccountState {
    Active,
    /// `until: None` is an administrative lock with no expiry
    Locked { until: Option<DateTime<Utc>> },
    Disabled,
    /// Terminal
    SoftDeleted,
}

// ============================================================================
// Account
// ============================================================================

#[derive(Debug, Clone)]
pub struct Account {
    pub account_id: AccountId,
    pub user_name: UserName,
    pub email: Email,
    pub password_hash: UserPassword,
    pub role: AccountRole,
    pub full_name: String,
    pub phone_number: Option<String>,
    pub is_active: bool,
    pub is_locked: bool,
    pub locked_until: Option<DateTime<Utc>>,
    pub failed_login_attempts: u32,
    pub last_login_at: Option<DateTime<Utc>>,
    pub is_deleted: bool,
    pub deleted_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Optimistic lock; bumped by the repository on every write
    pub version: i64,
}

impl Account {
    /// New, active, unlocked account. `full_name` falls back to the username.
    pub fn new(
        user_name: UserName,
        email: Email,
        password_hash: UserPassword,
        role: AccountRole,
        full_name: Option<String>,
        phone_number: Option<String>,
        now: DateTime<Utc>,
    ) -> Self {
        let full_name = full_name
            .map(|n| n.trim().to_string())
            .filter(|n| !n.is_empty())
            .unwrap_or_else(|| user_name.original().to_string());

        Self {
            account_id: AccountId::new(),
            user_name,
            email,
            password_hash,
            role,
            full_name,
            phone_number: phone_number
                .map(|p| p.trim().to_string())
                .filter(|p| !p.is_empty()),
            is_active: true,
            is_locked: false,
            locked_until: None,
            failed_login_attempts: 0,
            last_login_at: None,
            is_deleted: false,
            deleted_at: None,
            created_at: now,
            updated_at: now,
            version: 0,
        }
    }

    // ========================================================================
    // Queries
    // ========================================================================

    /// Locked and the lock has not run out
    pub fn is_locked_at(&self, now: DateTime<Utc>) -> bool {
        self.is_locked && self.locked_until.is_none_or(|until| now < until)
    }

    pub fn state_at(&self, now: DateTime<Utc>) -> AccountState {
        if self.is_deleted {
            AccountState::SoftDeleted
        } else if !self.is_active {
            AccountState::Disabled
        } else if self.is_locked_at(now) {
            AccountState::Locked {
                until: self.locked_until,
            }
        } else {
            AccountState::Active
        }
    }

    /// Active, not locked (or lock expired), not deleted, and the profile
    /// (if any) is not suspended.
    pub fn is_usable_at(&self, now: DateTime<Utc>, profile_status: Option<ProfileStatus>) -> bool {
        self.state_at(now) == AccountState::Active
            && !profile_status.is_some_and(|s| s.blocks_authentication())
    }

    // ========================================================================
    // Transitions
    // ========================================================================

    /// Count a failed password check. Returns `true` when this failure
    /// tripped the lock.
    ///
    /// A lock that has already expired is cleared first, so the caller gets
    /// a fresh budget instead of being re-locked on the first miss.
    pub fn record_failed_login(&mut self, policy: &LockoutPolicy, now: DateTime<Utc>) -> bool {
        if self.is_locked && !self.is_locked_at(now) {
            self.is_locked = false;
            self.locked_until = None;
            self.failed_login_attempts = 0;
        }

        self.failed_login_attempts = self.failed_login_attempts.saturating_add(1);
        self.updated_at = now;

        if !self.is_locked && self.failed_login_attempts >= policy.max_failed_attempts {
            self.is_locked = true;
            // Past the calendar's end the lock simply never expires
            self.locked_until = now.checked_add_signed(policy.lock_duration);
            return true;
        }
        false
    }

    pub fn record_successful_login(&mut self, now: DateTime<Utc>) {
        self.failed_login_attempts = 0;
        self.is_locked = false;
        self.locked_until = None;
        self.last_login_at = Some(now);
        self.updated_at = now;
    }

    /// Administrative lock; holds until [`unlock`](Self::unlock)
    pub fn lock(&mut self, now: DateTime<Utc>) {
        self.is_locked = true;
        self.locked_until = None;
        self.updated_at = now;
    }

    pub fn unlock(&mut self, now: DateTime<Utc>) {
        self.is_locked = false;
        self.locked_until = None;
        self.failed_login_attempts = 0;
        self.updated_at = now;
    }

    pub fn activate(&mut self, now: DateTime<Utc>) {
        self.is_active = true;
        self.updated_at = now;
    }

    pub fn deactivate(&mut self, now: DateTime<Utc>) {
        self.is_active = false;
        self.updated_at = now;
    }

    /// Terminal. The first deletion timestamp wins.
    pub fn soft_delete(&mut self, now: DateTime<Utc>) {
        if !self.is_deleted {
            self.is_deleted = true;
            self.deleted_at = Some(now);
            self.updated_at = now;
        }
    }

    pub fn change_password(&mut self, password_hash: UserPassword, now: DateTime<Utc>) {
        self.password_hash = password_hash;
        self.updated_at = now;
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::domain::value_object::RawPassword;
    use std::sync::OnceLock;

    /// One real hash shared by every fixture; hashing per test is slow
    fn shared_hash() -> UserPassword {
        static HASH: OnceLock<UserPassword> = OnceLock::new();
        HASH.get_or_init(|| {
            UserPassword::from_raw(&RawPassword::new("Str0ng!Pass".into()).unwrap(), None).unwrap()
        })
        .clone()
    }

    pub(crate) fn account_fixture(now: DateTime<Utc>) -> Account {
        Account::new(
            UserName::new("alice").unwrap(),
            Email::new("alice@x.com").unwrap(),
            shared_hash(),
            AccountRole::Patient,
            None,
            None,
            now,
        )
    }

    mod creation {
        use super::*;

        #[test]
        fn test_new_account_is_active_and_clean() {
            let now = Utc::now();
            let account = account_fixture(now);
            assert_eq!(account.state_at(now), AccountState::Active);
            assert_eq!(account.failed_login_attempts, 0);
            assert_eq!(account.full_name, "alice");
            assert_eq!(account.version, 0);
        }

        #[test]
        fn test_blank_full_name_falls_back_to_user_name() {
            let now = Utc::now();
            let account = Account::new(
                UserName::new("Bob_1").unwrap(),
                Email::new("bob@x.com").unwrap(),
                shared_hash(),
                AccountRole::Doctor,
                Some("   ".into()),
                Some("".into()),
                now,
            );
            assert_eq!(account.full_name, "Bob_1");
            assert_eq!(account.phone_number, None);
        }
    }

    mod lockout {
        use super::*;

        #[test]
        fn test_locks_on_threshold() {
            let now = Utc::now();
            let policy = LockoutPolicy::default();
            let mut account = account_fixture(now);

            for _ in 0..4 {
                assert!(!account.record_failed_login(&policy, now));
            }
            assert_eq!(account.state_at(now), AccountState::Active);

            assert!(account.record_failed_login(&policy, now));
            assert_eq!(account.failed_login_attempts, 5);
            assert_eq!(
                account.state_at(now),
                AccountState::Locked {
                    until: Some(now + Duration::minutes(30))
                }
            );
        }

        #[test]
        fn test_lock_expires() {
            let now = Utc::now();
            let policy = LockoutPolicy::default();
            let mut account = account_fixture(now);
            for _ in 0..5 {
                account.record_failed_login(&policy, now);
            }

            let just_before = now + Duration::minutes(30) - Duration::seconds(1);
            let after = now + Duration::minutes(30);
            assert!(account.is_locked_at(just_before));
            assert!(!account.is_locked_at(after));
            assert!(account.is_usable_at(after, None));
        }

        #[test]
        fn test_failure_after_expiry_starts_fresh_budget() {
            let now = Utc::now();
            let policy = LockoutPolicy::default();
            let mut account = account_fixture(now);
            for _ in 0..5 {
                account.record_failed_login(&policy, now);
            }

            let later = now + Duration::hours(1);
            assert!(!account.record_failed_login(&policy, later));
            assert_eq!(account.failed_login_attempts, 1);
            assert!(!account.is_locked);
        }

        #[test]
        fn test_success_resets_counter() {
            let now = Utc::now();
            let policy = LockoutPolicy::default();
            let mut account = account_fixture(now);
            for _ in 0..3 {
                account.record_failed_login(&policy, now);
            }
            account.record_successful_login(now);
            assert_eq!(account.failed_login_attempts, 0);
            assert_eq!(account.last_login_at, Some(now));
        }

        #[test]
        fn test_lock_past_the_calendar_never_expires() {
            let now = Utc::now();
            let policy = LockoutPolicy {
                lock_duration: Duration::days(365 * 1_000_000),
                ..LockoutPolicy::default()
            };
            let mut account = account_fixture(now);
            for _ in 0..5 {
                account.record_failed_login(&policy, now);
            }
            assert_eq!(account.state_at(now), AccountState::Locked { until: None });
        }

        #[test]
        fn test_admin_lock_has_no_expiry() {
            let now = Utc::now();
            let mut account = account_fixture(now);
            account.lock(now);
            assert!(account.is_locked_at(now + Duration::days(365)));

            account.failed_login_attempts = 4;
            account.unlock(now);
            assert_eq!(account.state_at(now), AccountState::Active);
            assert_eq!(account.failed_login_attempts, 0);
        }
    }

    mod usability {
        use super::*;

        #[test]
        fn test_deactivate_and_activate() {
            let now = Utc::now();
            let mut account = account_fixture(now);
            account.deactivate(now);
            assert_eq!(account.state_at(now), AccountState::Disabled);
            account.activate(now);
            assert!(account.is_usable_at(now, Some(ProfileStatus::PendingVerification)));
        }

        #[test]
        fn test_activate_does_not_clear_lock() {
            let now = Utc::now();
            let mut account = account_fixture(now);
            account.lock(now);
            account.activate(now);
            assert!(matches!(account.state_at(now), AccountState::Locked { .. }));
        }

        #[test]
        fn test_soft_delete_wins_over_everything() {
            let now = Utc::now();
            let mut account = account_fixture(now);
            account.soft_delete(now);
            account.activate(now);
            account.unlock(now);
            assert_eq!(account.state_at(now), AccountState::SoftDeleted);
            assert!(!account.is_usable_at(now, None));

            let first = account.deleted_at;
            account.soft_delete(now + Duration::minutes(5));
            assert_eq!(account.deleted_at, first);
        }

        #[test]
        fn test_suspended_profile_blocks() {
            let now = Utc::now();
            let account = account_fixture(now);
            assert!(!account.is_usable_at(now, Some(ProfileStatus::Suspended)));
            assert!(account.is_usable_at(now, Some(ProfileStatus::Inactive)));
        }
    }
}
