//! Refresh Token Entity
//!
//! At most one live record per account. Only the SHA-256 digest of the
//! opaque token is kept; the clear value exists only in the client's hands
//! and in the response that minted it.

use chrono::{DateTime, Utc};

use crate::domain::value_object::AccountId;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefreshToken {
    pub account_id: AccountId,
    pub token_hash: Vec<u8>,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl RefreshToken {
    pub fn digest(token: &str) -> Vec<u8> {
        platform::crypto::sha256(token.as_bytes()).to_vec()
    }

    pub fn new(
        account_id: AccountId,
        token: &str,
        expires_at: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            account_id,
            token_hash: Self::digest(token),
            expires_at,
            created_at: now,
        }
    }

    /// Strictly after expiry; a token is still good at its exact expiry instant
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_stores_digest_not_token() {
        let now = Utc::now();
        let record = RefreshToken::new(AccountId::new(), "opaque", now, now);
        assert_eq!(record.token_hash.len(), 32);
        assert_ne!(record.token_hash, b"opaque".to_vec());
        assert_eq!(record.token_hash, RefreshToken::digest("opaque"));
    }

    #[test]
    fn test_expiry_boundary() {
        let now = Utc::now();
        let record = RefreshToken::new(AccountId::new(), "t", now, now - Duration::days(1));
        assert!(!record.is_expired_at(now));
        assert!(record.is_expired_at(now + Duration::milliseconds(1)));
    }
}
