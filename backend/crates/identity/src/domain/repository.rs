//! Repository Traits
//!
//! Persistence contracts. Reads exclude soft-deleted accounts; every write
//! that touches an account or profile is version-checked.

use chrono::{DateTime, Utc};

use crate::domain::entity::{Account, LockoutPolicy, Profile, RefreshToken};
use crate::domain::value_object::{AccountId, AccountRole, Email, ProfileId, UserName};
use crate::error::IdentityResult;

/// Account repository trait
#[trait_variant::make(AccountRepository: Send)]
pub trait LocalAccountRepository {
    /// Find a live account by ID
    async fn find_account(&self, account_id: &AccountId) -> IdentityResult<Option<Account>>;

    /// Find a live account by canonical user name
    async fn find_account_by_user_name(&self, user_name: &UserName)
    -> IdentityResult<Option<Account>>;

    /// Find a live account by normalized email
    async fn find_account_by_email(&self, email: &Email) -> IdentityResult<Option<Account>>;

    async fn user_name_exists(&self, user_name: &UserName) -> IdentityResult<bool>;

    async fn email_exists(&self, email: &Email) -> IdentityResult<bool>;

    /// Persist account state.
    ///
    /// Fails with `ConcurrentModification` when the stored version differs
    /// from `account.version`. Returns the new version.
    async fn update_account(&self, account: &Account) -> IdentityResult<i64>;

    /// Apply one failed attempt under the account's write lock.
    ///
    /// Read, transition and write happen atomically so concurrent failures
    /// cannot skip the threshold. Returns the account as stored afterwards.
    async fn record_failed_login(
        &self,
        account_id: &AccountId,
        policy: &LockoutPolicy,
        now: DateTime<Utc>,
    ) -> IdentityResult<Option<Account>>;
}

/// Profile repository trait
#[trait_variant::make(ProfileRepository: Send)]
pub trait LocalProfileRepository {
    /// Find a profile whose account is live
    async fn find_profile(&self, profile_id: &ProfileId) -> IdentityResult<Option<Profile>>;

    async fn find_profile_by_account(&self, account_id: &AccountId)
    -> IdentityResult<Option<Profile>>;

    /// Live profiles of one role, oldest first
    async fn list_profiles_by_role(&self, role: AccountRole) -> IdentityResult<Vec<Profile>>;

    /// Version-checked like `update_account`; a soft-deleted owner makes the
    /// profile unwritable. Returns the new version.
    async fn update_profile(&self, profile: &Profile) -> IdentityResult<i64>;
}

/// Refresh token repository trait
///
/// One row per account; writes replace rather than append.
#[trait_variant::make(RefreshTokenRepository: Send)]
pub trait LocalRefreshTokenRepository {
    async fn upsert_refresh_token(&self, token: &RefreshToken) -> IdentityResult<()>;

    async fn find_refresh_token(&self, token_hash: &[u8]) -> IdentityResult<Option<RefreshToken>>;

    /// Replace the owner's record with `next` only while it still holds
    /// `previous_hash`. Returns `false` when the record was revoked or
    /// rotated in the meantime; nothing is written then.
    async fn rotate_refresh_token(
        &self,
        previous_hash: &[u8],
        next: &RefreshToken,
    ) -> IdentityResult<bool>;

    /// Delete by digest. Deleting a missing record is not an error.
    async fn delete_refresh_token(&self, token_hash: &[u8]) -> IdentityResult<bool>;

    async fn delete_refresh_tokens_for_account(&self, account_id: &AccountId)
    -> IdentityResult<bool>;
}

/// Multi-record writes that must commit or fail together
#[trait_variant::make(IdentityUnitOfWork: Send)]
pub trait LocalIdentityUnitOfWork {
    /// Insert account, profile and first refresh token.
    ///
    /// A unique-key collision surfaces as `DuplicateResource`.
    async fn create_registration(
        &self,
        account: &Account,
        profile: &Profile,
        token: &RefreshToken,
    ) -> IdentityResult<()>;

    /// Persist the successful-login transition and the rotated refresh token.
    ///
    /// Version-checked like `update_account`. Returns the new version.
    async fn complete_login(&self, account: &Account, token: &RefreshToken)
    -> IdentityResult<i64>;

    /// Persist the soft-deleted account and drop its refresh token
    async fn soft_delete_account(&self, account: &Account) -> IdentityResult<()>;
}

/// Everything the identity use cases need from storage
pub trait IdentityStore:
    AccountRepository
    + ProfileRepository
    + RefreshTokenRepository
    + IdentityUnitOfWork
    + Send
    + Sync
    + 'static
{
}

impl<T> IdentityStore for T where
    T: AccountRepository
        + ProfileRepository
        + RefreshTokenRepository
        + IdentityUnitOfWork
        + Send
        + Sync
        + 'static
{
}
