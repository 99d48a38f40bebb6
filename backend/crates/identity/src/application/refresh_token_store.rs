//! Refresh Token Store
//!
//! Mints opaque refresh tokens and enforces their lifetime. The store keeps
//! one record per account; expired records are deleted when presented.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};

use crate::domain::entity::RefreshToken;
use crate::domain::repository::RefreshTokenRepository;
use crate::domain::value_object::AccountId;
use crate::error::{IdentityError, IdentityResult};

/// Random bytes behind each refresh token
const REFRESH_TOKEN_BYTES: usize = 32;

pub struct RefreshTokenStore<R>
where
    R: RefreshTokenRepository,
{
    repo: Arc<R>,
    ttl: Duration,
}

impl<R> RefreshTokenStore<R>
where
    R: RefreshTokenRepository,
{
    pub fn new(repo: Arc<R>, ttl: Duration) -> Self {
        Self { repo, ttl }
    }

    /// New token value and the record that would store it. Nothing is written.
    pub fn mint(&self, account_id: AccountId, now: DateTime<Utc>) -> (String, RefreshToken) {
        let token = platform::crypto::random_token(REFRESH_TOKEN_BYTES);
        let record = RefreshToken::new(account_id, &token, now + self.ttl, now);
        (token, record)
    }

    /// Swap `previous` for a fresh token.
    ///
    /// Fails with `TokenInvalid` when `previous` is no longer the stored
    /// record, so a concurrent revocation cannot be undone.
    pub async fn rotate(
        &self,
        previous: &RefreshToken,
        now: DateTime<Utc>,
    ) -> IdentityResult<(String, RefreshToken)> {
        let (token, record) = self.mint(previous.account_id, now);
        if !self
            .repo
            .rotate_refresh_token(&previous.token_hash, &record)
            .await?
        {
            tracing::warn!(
                account_id = %previous.account_id,
                "Refresh token revoked or rotated during refresh"
            );
            return Err(IdentityError::TokenInvalid);
        }
        Ok((token, record))
    }

    /// Fails with `TokenInvalid` when no record matches
    pub async fn find_by_token(&self, token: &str) -> IdentityResult<RefreshToken> {
        self.repo
            .find_refresh_token(&RefreshToken::digest(token))
            .await?
            .ok_or(IdentityError::TokenInvalid)
    }

    /// Delete-then-fail on expiry; otherwise hand the record back
    pub async fn verify_expiration(
        &self,
        record: RefreshToken,
        now: DateTime<Utc>,
    ) -> IdentityResult<RefreshToken> {
        if record.is_expired_at(now) {
            self.repo.delete_refresh_token(&record.token_hash).await?;
            tracing::warn!(
                account_id = %record.account_id,
                expired_at = %record.expires_at,
                "Expired refresh token presented"
            );
            return Err(IdentityError::TokenExpired);
        }
        Ok(record)
    }

    pub async fn revoke(&self, token: &str) -> IdentityResult<bool> {
        self.repo
            .delete_refresh_token(&RefreshToken::digest(token))
            .await
    }

    pub async fn revoke_for_account(&self, account_id: &AccountId) -> IdentityResult<bool> {
        self.repo.delete_refresh_tokens_for_account(account_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infra::memory::InMemoryIdentityRepository;

    fn store() -> RefreshTokenStore<InMemoryIdentityRepository> {
        RefreshTokenStore::new(
            Arc::new(InMemoryIdentityRepository::new()),
            Duration::days(7),
        )
    }

    async fn issued(
        store: &RefreshTokenStore<InMemoryIdentityRepository>,
        account_id: AccountId,
        now: DateTime<Utc>,
    ) -> String {
        let (token, record) = store.mint(account_id, now);
        store.repo.upsert_refresh_token(&record).await.unwrap();
        token
    }

    #[test]
    fn test_mint_is_unique_and_hashed() {
        let store = store();
        let now = Utc::now();
        let (a, record) = store.mint(AccountId::new(), now);
        let (b, _) = store.mint(AccountId::new(), now);

        assert_ne!(a, b);
        assert_eq!(record.token_hash, RefreshToken::digest(&a));
        assert_eq!(record.expires_at, now + Duration::days(7));
    }

    #[tokio::test]
    async fn test_upsert_replaces_previous_token() {
        let store = store();
        let account_id = AccountId::new();
        let now = Utc::now();

        let first = issued(&store, account_id, now).await;
        let second = issued(&store, account_id, now).await;

        assert!(matches!(
            store.find_by_token(&first).await,
            Err(IdentityError::TokenInvalid)
        ));
        let record = store.find_by_token(&second).await.unwrap();
        assert_eq!(record.account_id, account_id);
    }

    #[tokio::test]
    async fn test_expired_record_is_deleted() {
        let store = store();
        let now = Utc::now();
        let token = issued(&store, AccountId::new(), now).await;
        let record = store.find_by_token(&token).await.unwrap();

        let later = now + Duration::days(8);
        assert!(matches!(
            store.verify_expiration(record.clone(), later).await,
            Err(IdentityError::TokenExpired)
        ));
        assert!(matches!(
            store.find_by_token(&token).await,
            Err(IdentityError::TokenInvalid)
        ));

        // Retrying the expiry path on a gone record still reports expiry
        assert!(matches!(
            store.verify_expiration(record, later).await,
            Err(IdentityError::TokenExpired)
        ));
    }

    #[tokio::test]
    async fn test_valid_record_passes() {
        let store = store();
        let now = Utc::now();
        let token = issued(&store, AccountId::new(), now).await;
        let record = store.find_by_token(&token).await.unwrap();
        assert!(store.verify_expiration(record, now).await.is_ok());
    }

    #[tokio::test]
    async fn test_rotate_replaces_only_the_presented_record() {
        let store = store();
        let account_id = AccountId::new();
        let now = Utc::now();
        let first = issued(&store, account_id, now).await;
        let previous = store.find_by_token(&first).await.unwrap();

        let (second, _) = store.rotate(&previous, now).await.unwrap();
        assert!(store.find_by_token(&second).await.is_ok());

        // The old record is gone, so a second rotation from it loses
        assert!(matches!(
            store.rotate(&previous, now).await,
            Err(IdentityError::TokenInvalid)
        ));
        assert!(store.find_by_token(&second).await.is_ok());
    }

    #[tokio::test]
    async fn test_rotate_after_revoke_writes_nothing() {
        let store = store();
        let account_id = AccountId::new();
        let now = Utc::now();
        let token = issued(&store, account_id, now).await;
        let previous = store.find_by_token(&token).await.unwrap();

        store.revoke_for_account(&account_id).await.unwrap();

        assert!(matches!(
            store.rotate(&previous, now).await,
            Err(IdentityError::TokenInvalid)
        ));
        assert!(!store.revoke_for_account(&account_id).await.unwrap());
    }

    #[tokio::test]
    async fn test_revoke_is_idempotent() {
        let store = store();
        let account_id = AccountId::new();
        issued(&store, account_id, Utc::now()).await;

        assert!(store.revoke_for_account(&account_id).await.unwrap());
        assert!(!store.revoke_for_account(&account_id).await.unwrap());
    }
}
