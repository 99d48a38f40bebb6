//! Sign Out Use Case
//!
//! Drops the caller's refresh token. Access tokens simply run out.

use std::sync::Arc;

use crate::application::authorization::Principal;
use crate::domain::repository::RefreshTokenRepository;
use crate::error::IdentityResult;

/// Sign out use case
pub struct SignOutUseCase<R>
where
    R: RefreshTokenRepository,
{
    repo: Arc<R>,
}

impl<R> SignOutUseCase<R>
where
    R: RefreshTokenRepository,
{
    pub fn new(repo: Arc<R>) -> Self {
        Self { repo }
    }

    /// Idempotent; signing out twice is not an error
    pub async fn execute(&self, principal: &Principal) -> IdentityResult<()> {
        let revoked = self
            .repo
            .delete_refresh_tokens_for_account(&principal.account_id)
            .await?;

        tracing::info!(
            account_id = %principal.account_id,
            revoked = revoked,
            "User signed out"
        );
        Ok(())
    }
}
