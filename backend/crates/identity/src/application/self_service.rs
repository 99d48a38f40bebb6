//! Self-Service Use Case
//!
//! What an authenticated caller may do to their own account.

use std::sync::Arc;

use chrono::Utc;

use crate::application::authorization::Principal;
use crate::application::config::IdentityConfig;
use crate::application::password_hasher::{hash_password, verify_password};
use crate::domain::entity::{Account, Profile, ProfilePatch};
use crate::domain::repository::IdentityStore;
use crate::domain::value_object::RawPassword;
use crate::error::{IdentityError, IdentityResult};

/// Self-service use case
pub struct SelfServiceUseCase<R>
where
    R: IdentityStore,
{
    repo: Arc<R>,
    config: Arc<IdentityConfig>,
}

impl<R> SelfServiceUseCase<R>
where
    R: IdentityStore,
{
    pub fn new(repo: Arc<R>, config: Arc<IdentityConfig>) -> Self {
        Self { repo, config }
    }

    /// The caller's account and profile
    pub async fn me(&self, principal: &Principal) -> IdentityResult<(Account, Option<Profile>)> {
        let account = self.load_account(principal).await?;
        let profile = self
            .repo
            .find_profile_by_account(&account.account_id)
            .await?;
        Ok((account, profile))
    }

    /// Partial update; the patch must be for the caller's own role
    pub async fn update_profile(
        &self,
        principal: &Principal,
        patch: ProfilePatch,
    ) -> IdentityResult<Profile> {
        let mut profile = self
            .repo
            .find_profile_by_account(&principal.account_id)
            .await?
            .ok_or_else(|| IdentityError::not_found("Profile"))?;

        profile.update_details(patch, Utc::now())?;
        profile.version = self.repo.update_profile(&profile).await?;

        tracing::info!(
            account_id = %principal.account_id,
            profile_id = %profile.profile_id,
            "Profile updated"
        );
        Ok(profile)
    }

    /// Requires the current password; ends the refresh session on success.
    ///
    /// A wrong current password counts toward the lockout exactly like a
    /// failed login.
    pub async fn change_password(
        &self,
        principal: &Principal,
        current_password: String,
        new_password: String,
    ) -> IdentityResult<()> {
        let new_password = RawPassword::new(new_password)?;
        let mut account = self.load_account(principal).await?;
        let now = Utc::now();

        if account.is_locked_at(now) {
            return Err(IdentityError::AccountLocked);
        }

        let current_valid = verify_password(
            account.password_hash.clone(),
            RawPassword::for_login(current_password),
            self.config.password_pepper.clone(),
        )
        .await?;
        if !current_valid {
            let policy = self.config.lockout_policy();
            let updated = self
                .repo
                .record_failed_login(&account.account_id, &policy, now)
                .await?;
            tracing::warn!(
                account_id = %account.account_id,
                failed_attempts = updated.as_ref().map(|a| a.failed_login_attempts),
                locked = updated.as_ref().is_some_and(|a| a.is_locked_at(now)),
                "Password change with wrong current password"
            );
            return Err(IdentityError::InvalidCredentials);
        }

        let password_hash = hash_password(new_password, self.config.password_pepper.clone()).await?;
        account.change_password(password_hash, now);
        self.repo.update_account(&account).await?;
        self.repo
            .delete_refresh_tokens_for_account(&account.account_id)
            .await?;

        tracing::info!(account_id = %account.account_id, "Password changed");
        Ok(())
    }

    async fn load_account(&self, principal: &Principal) -> IdentityResult<Account> {
        self.repo
            .find_account(&principal.account_id)
            .await?
            .ok_or_else(|| IdentityError::not_found("Account"))
    }
}
