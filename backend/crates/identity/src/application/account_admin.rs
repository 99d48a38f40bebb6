//! Account Administration Use Case
//!
//! Admin-only lookups and state transitions on other accounts.

use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::application::authorization::{Principal, authorize};
use crate::application::config::IdentityConfig;
use crate::application::password_hasher::hash_password;
use crate::domain::entity::{Account, Profile};
use crate::domain::repository::IdentityStore;
use crate::domain::value_object::{AccountId, AccountRole, Email, RawPassword, UserName};
use crate::error::{IdentityError, IdentityResult};

/// Account administration use case
pub struct AccountAdminUseCase<R>
where
    R: IdentityStore,
{
    repo: Arc<R>,
    config: Arc<IdentityConfig>,
}

impl<R> AccountAdminUseCase<R>
where
    R: IdentityStore,
{
    pub fn new(repo: Arc<R>, config: Arc<IdentityConfig>) -> Self {
        Self { repo, config }
    }

    /// The account with its profile
    pub async fn get(
        &self,
        admin: &Principal,
        account_id: &AccountId,
    ) -> IdentityResult<(Account, Option<Profile>)> {
        authorize(admin, &[AccountRole::Admin])?;
        let account = self.load(account_id).await?;
        self.with_profile(account).await
    }

    /// Look a live account up by exactly one of user name or email
    pub async fn lookup(
        &self,
        admin: &Principal,
        user_name: Option<String>,
        email: Option<String>,
    ) -> IdentityResult<(Account, Option<Profile>)> {
        authorize(admin, &[AccountRole::Admin])?;

        let found = match (user_name, email) {
            (Some(user_name), None) => {
                self.repo
                    .find_account_by_user_name(&UserName::new(user_name)?)
                    .await?
            }
            (None, Some(email)) => self.repo.find_account_by_email(&Email::new(email)?).await?,
            _ => {
                return Err(IdentityError::policy(
                    "Exactly one of username or email is required",
                ));
            }
        };

        let account = found.ok_or_else(|| IdentityError::not_found("Account"))?;
        self.with_profile(account).await
    }

    pub async fn activate(&self, admin: &Principal, account_id: &AccountId) -> IdentityResult<Account> {
        self.transition(admin, account_id, "activated", Account::activate)
            .await
    }

    pub async fn deactivate(
        &self,
        admin: &Principal,
        account_id: &AccountId,
    ) -> IdentityResult<Account> {
        self.transition(admin, account_id, "deactivated", Account::deactivate)
            .await
    }

    /// Indefinite until unlocked
    pub async fn lock(&self, admin: &Principal, account_id: &AccountId) -> IdentityResult<Account> {
        self.transition(admin, account_id, "locked", Account::lock)
            .await
    }

    pub async fn unlock(&self, admin: &Principal, account_id: &AccountId) -> IdentityResult<Account> {
        self.transition(admin, account_id, "unlocked", Account::unlock)
            .await
    }

    /// Set a new policy-checked password and end the account's session
    pub async fn reset_password(
        &self,
        admin: &Principal,
        account_id: &AccountId,
        new_password: String,
    ) -> IdentityResult<Account> {
        authorize(admin, &[AccountRole::Admin])?;
        let raw_password = RawPassword::new(new_password)?;

        let mut account = self.load(account_id).await?;
        let password_hash =
            hash_password(raw_password, self.config.password_pepper.clone()).await?;

        account.change_password(password_hash, Utc::now());
        account.version = self.repo.update_account(&account).await?;
        self.repo
            .delete_refresh_tokens_for_account(account_id)
            .await?;

        tracing::info!(
            account_id = %account_id,
            admin_id = %admin.account_id,
            "Password reset by administrator"
        );
        Ok(account)
    }

    /// Terminal. The account disappears from every lookup.
    pub async fn soft_delete(&self, admin: &Principal, account_id: &AccountId) -> IdentityResult<()> {
        authorize(admin, &[AccountRole::Admin])?;

        let mut account = self.load(account_id).await?;
        account.soft_delete(Utc::now());
        self.repo.soft_delete_account(&account).await?;

        tracing::info!(
            account_id = %account_id,
            admin_id = %admin.account_id,
            "Account soft-deleted"
        );
        Ok(())
    }

    async fn transition(
        &self,
        admin: &Principal,
        account_id: &AccountId,
        action: &'static str,
        apply: fn(&mut Account, DateTime<Utc>),
    ) -> IdentityResult<Account> {
        authorize(admin, &[AccountRole::Admin])?;

        let mut account = self.load(account_id).await?;
        apply(&mut account, Utc::now());
        account.version = self.repo.update_account(&account).await?;

        tracing::info!(
            account_id = %account_id,
            admin_id = %admin.account_id,
            action,
            "Account state changed"
        );
        Ok(account)
    }

    async fn with_profile(&self, account: Account) -> IdentityResult<(Account, Option<Profile>)> {
        let profile = self
            .repo
            .find_profile_by_account(&account.account_id)
            .await?;
        Ok((account, profile))
    }

    async fn load(&self, account_id: &AccountId) -> IdentityResult<Account> {
        self.repo
            .find_account(account_id)
            .await?
            .ok_or_else(|| IdentityError::not_found("Account"))
    }
}
