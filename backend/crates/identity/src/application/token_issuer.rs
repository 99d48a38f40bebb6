//! Token Issuer
//!
//! Stateless HS256 access tokens. Verification needs only the signing key,
//! never the store.

use chrono::{DateTime, Duration, Utc};
use platform::jwt::{JwtCodec, JwtError};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::application::authorization::Principal;
use crate::application::config::IdentityConfig;
use crate::domain::entity::Account;
use crate::domain::value_object::{AccountId, AccountRole};
use crate::error::{IdentityError, IdentityResult};

const ACCESS_TOKEN_TYPE: &str = "access";

/// Access token claims
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessClaims {
    /// Account ID
    pub sub: String,
    /// User name (display spelling)
    pub usr: String,
    pub role: AccountRole,
    pub iat: i64,
    pub exp: i64,
    pub jti: String,
    pub iss: String,
    pub typ: String,
}

/// A freshly signed access token
#[derive(Debug, Clone)]
pub struct IssuedAccessToken {
    pub token: String,
    pub expires_at: DateTime<Utc>,
    pub expires_in: i64,
}

#[derive(Debug, Clone)]
pub struct TokenIssuer {
    codec: JwtCodec,
    access_ttl: Duration,
}

impl TokenIssuer {
    pub fn new(config: &IdentityConfig) -> Self {
        Self {
            codec: JwtCodec::new(&config.jwt_secret, config.jwt_issuer.clone()),
            access_ttl: config.access_token_ttl(),
        }
    }

    pub fn issue_access_token(&self, account: &Account) -> IdentityResult<IssuedAccessToken> {
        self.issue_access_token_at(account, Utc::now())
    }

    /// Sign a token as if issued at `now`
    pub fn issue_access_token_at(
        &self,
        account: &Account,
        now: DateTime<Utc>,
    ) -> IdentityResult<IssuedAccessToken> {
        let expires_at = now + self.access_ttl;
        let claims = AccessClaims {
            sub: account.account_id.to_string(),
            usr: account.user_name.original().to_string(),
            role: account.role,
            iat: now.timestamp(),
            exp: expires_at.timestamp(),
            jti: Uuid::new_v4().to_string(),
            iss: self.codec.issuer().to_string(),
            typ: ACCESS_TOKEN_TYPE.to_string(),
        };

        let token = self
            .codec
            .encode(&claims)
            .map_err(|e| IdentityError::Internal(e.to_string()))?;

        Ok(IssuedAccessToken {
            token,
            expires_at,
            expires_in: self.access_ttl.num_seconds(),
        })
    }

    /// Check signature, issuer and expiry; recover the caller
    pub fn verify_access_token(&self, token: &str) -> IdentityResult<Principal> {
        let claims: AccessClaims = self.codec.decode(token).map_err(|e| match e {
            JwtError::Expired => IdentityError::TokenExpired,
            JwtError::Invalid | JwtError::Signing(_) => IdentityError::TokenInvalid,
        })?;

        if claims.typ != ACCESS_TOKEN_TYPE {
            return Err(IdentityError::TokenInvalid);
        }

        let account_id: AccountId = claims
            .sub
            .parse()
            .map_err(|_| IdentityError::TokenInvalid)?;

        Ok(Principal {
            account_id,
            user_name: claims.usr,
            role: claims.role,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entity::account::tests::account_fixture;

    fn issuer() -> TokenIssuer {
        TokenIssuer::new(&IdentityConfig::with_random_secret())
    }

    #[test]
    fn test_round_trip() {
        let issuer = issuer();
        let account = account_fixture(Utc::now());

        let issued = issuer.issue_access_token(&account).unwrap();
        assert_eq!(issued.expires_in, 15 * 60);

        let principal = issuer.verify_access_token(&issued.token).unwrap();
        assert_eq!(principal.account_id, account.account_id);
        assert_eq!(principal.role, account.role);
        assert_eq!(principal.user_name, "alice");
    }

    #[test]
    fn test_expired_token() {
        let issuer = issuer();
        let account = account_fixture(Utc::now());
        let issued = issuer
            .issue_access_token_at(&account, Utc::now() - Duration::hours(1))
            .unwrap();

        assert!(matches!(
            issuer.verify_access_token(&issued.token),
            Err(IdentityError::TokenExpired)
        ));
    }

    #[test]
    fn test_foreign_key_is_invalid() {
        let account = account_fixture(Utc::now());
        let issued = issuer().issue_access_token(&account).unwrap();

        assert!(matches!(
            issuer().verify_access_token(&issued.token),
            Err(IdentityError::TokenInvalid)
        ));
    }

    #[test]
    fn test_garbage_is_invalid() {
        assert!(matches!(
            issuer().verify_access_token("not-a-jwt"),
            Err(IdentityError::TokenInvalid)
        ));
    }
}
