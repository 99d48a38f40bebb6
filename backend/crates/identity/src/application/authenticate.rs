//! Authenticate Use Case
//!
//! Username + password login with lockout accounting.

use std::sync::Arc;

use chrono::Utc;

use crate::application::config::IdentityConfig;
use crate::application::password_hasher::verify_password;
use crate::application::refresh_token_store::RefreshTokenStore;
use crate::application::session::SessionOutput;
use crate::application::token_issuer::TokenIssuer;
use crate::domain::entity::AccountState;
use crate::domain::repository::IdentityStore;
use crate::domain::value_object::{RawPassword, UserName};
use crate::error::{IdentityError, IdentityResult};

/// Authenticate input
#[derive(Debug)]
pub struct AuthenticateInput {
    pub user_name: String,
    pub password: String,
}

/// Authenticate use case
pub struct AuthenticateUseCase<R>
where
    R: IdentityStore,
{
    repo: Arc<R>,
    config: Arc<IdentityConfig>,
    tokens: Arc<TokenIssuer>,
    refresh_tokens: RefreshTokenStore<R>,
}

impl<R> AuthenticateUseCase<R>
where
    R: IdentityStore,
{
    pub fn new(repo: Arc<R>, config: Arc<IdentityConfig>, tokens: Arc<TokenIssuer>) -> Self {
        let refresh_tokens = RefreshTokenStore::new(repo.clone(), config.refresh_token_ttl());
        Self {
            repo,
            config,
            tokens,
            refresh_tokens,
        }
    }

    pub async fn execute(&self, input: AuthenticateInput) -> IdentityResult<SessionOutput> {
        // A name that could never have registered cannot match anything
        let user_name =
            UserName::new(&input.user_name).map_err(|_| IdentityError::InvalidCredentials)?;

        let mut account = self
            .repo
            .find_account_by_user_name(&user_name)
            .await?
            .ok_or(IdentityError::InvalidCredentials)?;

        let now = Utc::now();

        // Locked accounts are refused before the password is looked at, so a
        // lock cannot be probed for the right password.
        if account.is_locked_at(now) {
            return Err(IdentityError::AccountLocked);
        }

        let raw_password = RawPassword::for_login(input.password);
        let password_valid = verify_password(
            account.password_hash.clone(),
            raw_password,
            self.config.password_pepper.clone(),
        )
        .await?;

        if !password_valid {
            let policy = self.config.lockout_policy();
            if let Some(updated) = self
                .repo
                .record_failed_login(&account.account_id, &policy, now)
                .await?
            {
                if updated.is_locked_at(now) {
                    tracing::warn!(
                        account_id = %updated.account_id,
                        failed_attempts = updated.failed_login_attempts,
                        locked_until = ?updated.locked_until,
                        "Account locked after repeated failures"
                    );
                } else {
                    tracing::warn!(
                        account_id = %updated.account_id,
                        failed_attempts = updated.failed_login_attempts,
                        "Failed login attempt"
                    );
                }
            }
            return Err(IdentityError::InvalidCredentials);
        }

        let profile = self
            .repo
            .find_profile_by_account(&account.account_id)
            .await?;

        if !account.is_usable_at(now, profile.as_ref().map(|p| p.status)) {
            return Err(match account.state_at(now) {
                AccountState::Locked { .. } => IdentityError::AccountLocked,
                _ => IdentityError::AccountDisabled,
            });
        }

        account.record_successful_login(now);
        let access_token = self.tokens.issue_access_token_at(&account, now)?;
        let (refresh_token, refresh_record) = self.refresh_tokens.mint(account.account_id, now);

        account.version = self.repo.complete_login(&account, &refresh_record).await?;

        tracing::info!(account_id = %account.account_id, "User signed in");

        Ok(SessionOutput {
            account,
            profile,
            access_token,
            refresh_token,
            refresh_expires_at: refresh_record.expires_at,
        })
    }
}
