//! Refresh Session Use Case
//!
//! Exchanges a refresh token for a new access token and rotates the refresh
//! token itself.

use std::sync::Arc;

use chrono::Utc;

use crate::application::config::IdentityConfig;
use crate::application::refresh_token_store::RefreshTokenStore;
use crate::application::session::SessionOutput;
use crate::application::token_issuer::TokenIssuer;
use crate::domain::entity::AccountState;
use crate::domain::repository::IdentityStore;
use crate::error::{IdentityError, IdentityResult};

/// Refresh session use case
pub struct RefreshSessionUseCase<R>
where
    R: IdentityStore,
{
    repo: Arc<R>,
    tokens: Arc<TokenIssuer>,
    refresh_tokens: RefreshTokenStore<R>,
}

impl<R> RefreshSessionUseCase<R>
where
    R: IdentityStore,
{
    pub fn new(repo: Arc<R>, config: Arc<IdentityConfig>, tokens: Arc<TokenIssuer>) -> Self {
        let refresh_tokens = RefreshTokenStore::new(repo.clone(), config.refresh_token_ttl());
        Self {
            repo,
            tokens,
            refresh_tokens,
        }
    }

    pub async fn execute(&self, refresh_token: &str) -> IdentityResult<SessionOutput> {
        let now = Utc::now();

        let record = self.refresh_tokens.find_by_token(refresh_token).await?;
        let record = self.refresh_tokens.verify_expiration(record, now).await?;

        let Some(account) = self.repo.find_account(&record.account_id).await? else {
            self.refresh_tokens.revoke(refresh_token).await?;
            return Err(IdentityError::TokenInvalid);
        };

        let profile = self
            .repo
            .find_profile_by_account(&account.account_id)
            .await?;

        // The account may have been locked or disabled since the token was minted
        if !account.is_usable_at(now, profile.as_ref().map(|p| p.status)) {
            self.refresh_tokens
                .revoke_for_account(&account.account_id)
                .await?;
            tracing::warn!(
                account_id = %account.account_id,
                "Refresh refused for unusable account"
            );
            return Err(match account.state_at(now) {
                AccountState::Locked { .. } => IdentityError::AccountLocked,
                _ => IdentityError::AccountDisabled,
            });
        }

        // Loses to a concurrent logout or password change rather than undoing it
        let (refresh_token, refresh_record) = self.refresh_tokens.rotate(&record, now).await?;
        let access_token = self.tokens.issue_access_token_at(&account, now)?;

        tracing::info!(account_id = %account.account_id, "Session refreshed");

        Ok(SessionOutput {
            account,
            profile,
            access_token,
            refresh_token,
            refresh_expires_at: refresh_record.expires_at,
        })
    }
}
