//! In-Memory Repository Implementation
//!
//! `DashMap`-backed store for development without a database and for tests.
//! Single-record writes rely on the map's per-entry locks; multi-record
//! units of work additionally hold `write_lock` so they appear atomic.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use tokio::sync::Mutex;

use crate::domain::entity::{Account, LockoutPolicy, Profile, RefreshToken};
use crate::domain::repository::{
    AccountRepository, IdentityUnitOfWork, ProfileRepository, RefreshTokenRepository,
};
use crate::domain::value_object::{AccountId, AccountRole, Email, ProfileId, UserName};
use crate::error::{IdentityError, IdentityResult};

#[derive(Default)]
struct Tables {
    accounts: DashMap<AccountId, Account>,
    profiles: DashMap<ProfileId, Profile>,
    /// Keyed by owner: one token per account
    refresh_tokens: DashMap<AccountId, RefreshToken>,
    write_lock: Mutex<()>,
}

/// In-memory identity repository
#[derive(Clone, Default)]
pub struct InMemoryIdentityRepository {
    tables: Arc<Tables>,
}

impl InMemoryIdentityRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rows stored, deleted ones included
    pub fn account_count(&self) -> usize {
        self.tables.accounts.len()
    }

    pub fn profile_count(&self) -> usize {
        self.tables.profiles.len()
    }

    fn is_live(&self, account_id: &AccountId) -> bool {
        self.tables
            .accounts
            .get(account_id)
            .is_some_and(|a| !a.is_deleted)
    }

    fn check_unique(&self, account: &Account) -> IdentityResult<()> {
        for existing in self.tables.accounts.iter().filter(|a| !a.is_deleted) {
            if existing.user_name.canonical() == account.user_name.canonical() {
                return Err(IdentityError::DuplicateResource(
                    "Username is already taken".to_string(),
                ));
            }
            if existing.email == account.email {
                return Err(IdentityError::DuplicateResource(
                    "Email is already registered".to_string(),
                ));
            }
        }
        Ok(())
    }

    /// Compare-and-swap on `version`
    fn replace_account(&self, account: &Account) -> IdentityResult<i64> {
        let mut stored = self
            .tables
            .accounts
            .get_mut(&account.account_id)
            .filter(|a| !a.is_deleted)
            .ok_or_else(|| IdentityError::not_found("Account"))?;

        if stored.version != account.version {
            return Err(IdentityError::ConcurrentModification);
        }

        let mut next = account.clone();
        next.version += 1;
        *stored = next;
        Ok(stored.version)
    }
}

// ============================================================================
// Account Repository Implementation
// ============================================================================

impl AccountRepository for InMemoryIdentityRepository {
    async fn find_account(&self, account_id: &AccountId) -> IdentityResult<Option<Account>> {
        Ok(self
            .tables
            .accounts
            .get(account_id)
            .filter(|a| !a.is_deleted)
            .map(|a| a.value().clone()))
    }

    async fn find_account_by_user_name(
        &self,
        user_name: &UserName,
    ) -> IdentityResult<Option<Account>> {
        Ok(self
            .tables
            .accounts
            .iter()
            .find(|a| !a.is_deleted && a.user_name.canonical() == user_name.canonical())
            .map(|a| a.value().clone()))
    }

    async fn find_account_by_email(&self, email: &Email) -> IdentityResult<Option<Account>> {
        Ok(self
            .tables
            .accounts
            .iter()
            .find(|a| !a.is_deleted && &a.email == email)
            .map(|a| a.value().clone()))
    }

    async fn user_name_exists(&self, user_name: &UserName) -> IdentityResult<bool> {
        Ok(self
            .tables
            .accounts
            .iter()
            .any(|a| !a.is_deleted && a.user_name.canonical() == user_name.canonical()))
    }

    async fn email_exists(&self, email: &Email) -> IdentityResult<bool> {
        Ok(self
            .tables
            .accounts
            .iter()
            .any(|a| !a.is_deleted && &a.email == email))
    }

    async fn update_account(&self, account: &Account) -> IdentityResult<i64> {
        self.replace_account(account)
    }

    async fn record_failed_login(
        &self,
        account_id: &AccountId,
        policy: &LockoutPolicy,
        now: DateTime<Utc>,
    ) -> IdentityResult<Option<Account>> {
        let Some(mut stored) = self
            .tables
            .accounts
            .get_mut(account_id)
            .filter(|a| !a.is_deleted)
        else {
            return Ok(None);
        };

        stored.record_failed_login(policy, now);
        stored.version += 1;
        Ok(Some(stored.value().clone()))
    }
}

// ============================================================================
// Profile Repository Implementation
// ============================================================================

impl ProfileRepository for InMemoryIdentityRepository {
    async fn find_profile(&self, profile_id: &ProfileId) -> IdentityResult<Option<Profile>> {
        let profile = self.tables.profiles.get(profile_id).map(|p| p.value().clone());
        Ok(profile.filter(|p| self.is_live(&p.account_id)))
    }

    async fn find_profile_by_account(
        &self,
        account_id: &AccountId,
    ) -> IdentityResult<Option<Profile>> {
        if !self.is_live(account_id) {
            return Ok(None);
        }
        Ok(self
            .tables
            .profiles
            .iter()
            .find(|p| &p.account_id == account_id)
            .map(|p| p.value().clone()))
    }

    async fn list_profiles_by_role(&self, role: AccountRole) -> IdentityResult<Vec<Profile>> {
        let mut profiles: Vec<Profile> = self
            .tables
            .profiles
            .iter()
            .filter(|p| p.role() == role && self.is_live(&p.account_id))
            .map(|p| p.value().clone())
            .collect();
        profiles.sort_by_key(|p| p.created_at);
        Ok(profiles)
    }

    async fn update_profile(&self, profile: &Profile) -> IdentityResult<i64> {
        if !self.is_live(&profile.account_id) {
            return Err(IdentityError::not_found("Profile"));
        }

        let mut stored = self
            .tables
            .profiles
            .get_mut(&profile.profile_id)
            .ok_or_else(|| IdentityError::not_found("Profile"))?;

        if stored.version != profile.version {
            return Err(IdentityError::ConcurrentModification);
        }

        let mut next = profile.clone();
        next.version += 1;
        *stored = next;
        Ok(stored.version)
    }
}

// ============================================================================
// Refresh Token Repository Implementation
// ============================================================================

impl RefreshTokenRepository for InMemoryIdentityRepository {
    async fn upsert_refresh_token(&self, token: &RefreshToken) -> IdentityResult<()> {
        self.tables
            .refresh_tokens
            .insert(token.account_id, token.clone());
        Ok(())
    }

    async fn find_refresh_token(&self, token_hash: &[u8]) -> IdentityResult<Option<RefreshToken>> {
        Ok(self
            .tables
            .refresh_tokens
            .iter()
            .find(|t| t.token_hash == token_hash)
            .map(|t| t.value().clone()))
    }

    async fn rotate_refresh_token(
        &self,
        previous_hash: &[u8],
        next: &RefreshToken,
    ) -> IdentityResult<bool> {
        // The entry guard holds the shard lock across compare and replace
        Ok(match self.tables.refresh_tokens.get_mut(&next.account_id) {
            Some(mut stored) if stored.token_hash == previous_hash => {
                *stored = next.clone();
                true
            }
            _ => false,
        })
    }

    async fn delete_refresh_token(&self, token_hash: &[u8]) -> IdentityResult<bool> {
        let owner = self
            .tables
            .refresh_tokens
            .iter()
            .find(|t| t.token_hash == token_hash)
            .map(|t| *t.key());

        Ok(match owner {
            Some(account_id) => self
                .tables
                .refresh_tokens
                .remove_if(&account_id, |_, t| t.token_hash == token_hash)
                .is_some(),
            None => false,
        })
    }

    async fn delete_refresh_tokens_for_account(
        &self,
        account_id: &AccountId,
    ) -> IdentityResult<bool> {
        Ok(self.tables.refresh_tokens.remove(account_id).is_some())
    }
}

// ============================================================================
// Unit of Work Implementation
// ============================================================================

impl IdentityUnitOfWork for InMemoryIdentityRepository {
    async fn create_registration(
        &self,
        account: &Account,
        profile: &Profile,
        token: &RefreshToken,
    ) -> IdentityResult<()> {
        let _guard = self.tables.write_lock.lock().await;

        self.check_unique(account)?;

        self.tables
            .accounts
            .insert(account.account_id, account.clone());
        self.tables
            .profiles
            .insert(profile.profile_id, profile.clone());
        self.tables
            .refresh_tokens
            .insert(token.account_id, token.clone());
        Ok(())
    }

    async fn complete_login(&self, account: &Account, token: &RefreshToken) -> IdentityResult<i64> {
        let _guard = self.tables.write_lock.lock().await;

        let version = self.replace_account(account)?;
        self.tables
            .refresh_tokens
            .insert(token.account_id, token.clone());
        Ok(version)
    }

    async fn soft_delete_account(&self, account: &Account) -> IdentityResult<()> {
        let _guard = self.tables.write_lock.lock().await;

        let mut stored = self
            .tables
            .accounts
            .get_mut(&account.account_id)
            .filter(|a| !a.is_deleted)
            .ok_or_else(|| IdentityError::not_found("Account"))?;

        if stored.version != account.version {
            return Err(IdentityError::ConcurrentModification);
        }

        let mut next = account.clone();
        next.version += 1;
        *stored = next;
        drop(stored);

        self.tables.refresh_tokens.remove(&account.account_id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entity::account::tests::account_fixture;
    use crate::domain::entity::ProfileDetails;
    use chrono::Duration;

    async fn seeded(now: DateTime<Utc>) -> (InMemoryIdentityRepository, Account) {
        let repo = InMemoryIdentityRepository::new();
        let account = account_fixture(now);
        let profile = Profile::new(
            account.account_id,
            ProfileDetails::for_role(AccountRole::Patient, None).unwrap(),
            now,
        );
        let token = RefreshToken::new(account.account_id, "t", now + Duration::days(1), now);
        repo.create_registration(&account, &profile, &token)
            .await
            .unwrap();
        (repo, account)
    }

    #[tokio::test]
    async fn test_registration_rejects_duplicates() {
        let now = Utc::now();
        let (repo, account) = seeded(now).await;

        let mut twin = account_fixture(now);
        twin.email = Email::new("other@x.com").unwrap();
        let profile = Profile::new(
            twin.account_id,
            ProfileDetails::for_role(AccountRole::Patient, None).unwrap(),
            now,
        );
        let token = RefreshToken::new(twin.account_id, "u", now, now);

        let result = repo.create_registration(&twin, &profile, &token).await;
        assert!(matches!(result, Err(IdentityError::DuplicateResource(_))));
        assert_eq!(repo.account_count(), 1);
        assert!(repo.find_account(&account.account_id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_stale_version_is_rejected() {
        let now = Utc::now();
        let (repo, account) = seeded(now).await;

        let mut first = account.clone();
        first.deactivate(now);
        assert_eq!(repo.update_account(&first).await.unwrap(), 1);

        let mut second = account.clone();
        second.lock(now);
        assert!(matches!(
            repo.update_account(&second).await,
            Err(IdentityError::ConcurrentModification)
        ));
    }

    #[tokio::test]
    async fn test_concurrent_failures_all_count() {
        let now = Utc::now();
        let (repo, account) = seeded(now).await;
        let policy = LockoutPolicy::default();

        let tasks: Vec<_> = (0..5)
            .map(|_| {
                let repo = repo.clone();
                let id = account.account_id;
                tokio::spawn(async move { repo.record_failed_login(&id, &policy, now).await })
            })
            .collect();
        for task in tasks {
            task.await.unwrap().unwrap();
        }

        let stored = repo.find_account(&account.account_id).await.unwrap().unwrap();
        assert_eq!(stored.failed_login_attempts, 5);
        assert!(stored.is_locked_at(now));
    }

    #[tokio::test]
    async fn test_soft_delete_hides_everything() {
        let now = Utc::now();
        let (repo, account) = seeded(now).await;

        let mut deleted = account.clone();
        deleted.soft_delete(now);
        repo.soft_delete_account(&deleted).await.unwrap();

        assert!(repo.find_account(&account.account_id).await.unwrap().is_none());
        assert!(
            repo.find_profile_by_account(&account.account_id)
                .await
                .unwrap()
                .is_none()
        );
        assert!(!repo.user_name_exists(&account.user_name).await.unwrap());
        assert!(
            repo.find_refresh_token(&RefreshToken::digest("t"))
                .await
                .unwrap()
                .is_none()
        );
    }

    #[tokio::test]
    async fn test_rotate_compares_the_stored_digest() {
        let now = Utc::now();
        let (repo, account) = seeded(now).await;
        let next = RefreshToken::new(account.account_id, "t2", now + Duration::days(1), now);

        assert!(!repo.rotate_refresh_token(&RefreshToken::digest("x"), &next).await.unwrap());
        assert!(repo.rotate_refresh_token(&RefreshToken::digest("t"), &next).await.unwrap());
        assert!(
            repo.find_refresh_token(&RefreshToken::digest("t2"))
                .await
                .unwrap()
                .is_some()
        );

        repo.delete_refresh_tokens_for_account(&account.account_id)
            .await
            .unwrap();
        let after = RefreshToken::new(account.account_id, "t3", now + Duration::days(1), now);
        assert!(!repo.rotate_refresh_token(&RefreshToken::digest("t2"), &after).await.unwrap());
        assert!(
            repo.find_refresh_token(&RefreshToken::digest("t3"))
                .await
                .unwrap()
                .is_none()
        );
    }

    #[tokio::test]
    async fn test_profile_of_deleted_account_is_frozen() {
        let now = Utc::now();
        let (repo, account) = seeded(now).await;
        let mut profile = repo
            .find_profile_by_account(&account.account_id)
            .await
            .unwrap()
            .unwrap();

        let mut deleted = account.clone();
        deleted.soft_delete(now);
        repo.soft_delete_account(&deleted).await.unwrap();

        profile.suspend(now);
        assert!(matches!(
            repo.update_profile(&profile).await,
            Err(IdentityError::ResourceNotFound(_))
        ));
        assert!(
            repo.list_profiles_by_role(AccountRole::Patient)
                .await
                .unwrap()
                .is_empty()
        );
    }

    #[tokio::test]
    async fn test_delete_refresh_token_is_idempotent() {
        let now = Utc::now();
        let (repo, _) = seeded(now).await;
        let digest = RefreshToken::digest("t");

        assert!(repo.delete_refresh_token(&digest).await.unwrap());
        assert!(!repo.delete_refresh_token(&digest).await.unwrap());
    }
}
