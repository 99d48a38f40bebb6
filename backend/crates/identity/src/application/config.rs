//! Application Configuration
//!
//! Configuration for the identity application layer.

use std::time::Duration;

use chrono::Utc;

use crate::domain::entity::LockoutPolicy;
use crate::error::{IdentityError, IdentityResult};

/// Identity application configuration
#[derive(Clone)]
pub struct IdentityConfig {
    /// Consecutive failures before the account locks
    pub max_failed_attempts: u32,
    /// How long an automatic lock lasts (30 minutes)
    pub lock_duration: Duration,
    /// Access token lifetime (15 minutes)
    pub access_token_ttl: Duration,
    /// Refresh token lifetime (1 week)
    pub refresh_token_ttl: Duration,
    /// HS256 signing key for access tokens
    pub jwt_secret: [u8; 32],
    /// `iss` claim written and required on access tokens
    pub jwt_issuer: String,
    /// Password pepper (optional, application-wide secret)
    pub password_pepper: Option<Vec<u8>>,
}

/// Defaults sign with a fresh random key, so tokens do not survive a restart
impl Default for IdentityConfig {
    fn default() -> Self {
        Self {
            max_failed_attempts: 5,
            lock_duration: Duration::from_secs(30 * 60),
            access_token_ttl: Duration::from_secs(15 * 60),
            refresh_token_ttl: Duration::from_secs(7 * 24 * 3600), // 1 week
            jwt_secret: random_secret(),
            jwt_issuer: "identity".to_string(),
            password_pepper: None,
        }
    }
}

impl IdentityConfig {
    /// Create config with a random signing secret
    pub fn with_random_secret() -> Self {
        Self::default()
    }

    /// Create config for development
    pub fn development() -> Self {
        Self::with_random_secret()
    }

    /// Reject durations that cannot be added to a timestamp.
    ///
    /// Run once at startup; every `now + ttl` in the crate relies on it.
    pub fn validate(&self) -> IdentityResult<()> {
        for (name, duration) in [
            ("lock_duration", self.lock_duration),
            ("access_token_ttl", self.access_token_ttl),
            ("refresh_token_ttl", self.refresh_token_ttl),
        ] {
            let representable = chrono::Duration::from_std(duration)
                .ok()
                .and_then(|d| Utc::now().checked_add_signed(d))
                .is_some();
            if !representable || duration.is_zero() {
                return Err(IdentityError::policy(format!(
                    "{name} must be positive and within the calendar range"
                )));
            }
        }
        if self.max_failed_attempts == 0 {
            return Err(IdentityError::policy("max_failed_attempts must be at least 1"));
        }
        Ok(())
    }

    pub fn lockout_policy(&self) -> LockoutPolicy {
        LockoutPolicy {
            max_failed_attempts: self.max_failed_attempts,
            lock_duration: to_chrono(self.lock_duration),
        }
    }

    pub fn access_token_ttl(&self) -> chrono::Duration {
        to_chrono(self.access_token_ttl)
    }

    pub fn refresh_token_ttl(&self) -> chrono::Duration {
        to_chrono(self.refresh_token_ttl)
    }
}

impl std::fmt::Debug for IdentityConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IdentityConfig")
            .field("max_failed_attempts", &self.max_failed_attempts)
            .field("lock_duration", &self.lock_duration)
            .field("access_token_ttl", &self.access_token_ttl)
            .field("refresh_token_ttl", &self.refresh_token_ttl)
            .field("jwt_secret", &"[REDACTED]")
            .field("jwt_issuer", &self.jwt_issuer)
            .field("password_pepper", &self.password_pepper.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

fn to_chrono(duration: Duration) -> chrono::Duration {
    chrono::Duration::from_std(duration).unwrap_or(chrono::Duration::MAX)
}

fn random_secret() -> [u8; 32] {
    let mut secret = [0u8; 32];
    secret.copy_from_slice(&platform::crypto::random_bytes(32));
    secret
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = IdentityConfig::default();
        let policy = config.lockout_policy();
        assert_eq!(policy.max_failed_attempts, 5);
        assert_eq!(policy.lock_duration, chrono::Duration::minutes(30));
        assert_eq!(config.access_token_ttl(), chrono::Duration::minutes(15));
        assert_eq!(config.refresh_token_ttl(), chrono::Duration::days(7));
        assert!(config.password_pepper.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_default_secret_is_random() {
        let a = IdentityConfig::default();
        let b = IdentityConfig::default();
        assert_ne!(a.jwt_secret, [0u8; 32]);
        assert_ne!(a.jwt_secret, b.jwt_secret);
    }

    #[test]
    fn test_validate_rejects_unrepresentable_durations() {
        let huge = IdentityConfig {
            lock_duration: Duration::from_secs(u64::MAX),
            ..IdentityConfig::default()
        };
        assert!(matches!(huge.validate(), Err(IdentityError::PolicyViolation(_))));

        // Fits chrono::Duration but overflows the calendar
        let far = IdentityConfig {
            refresh_token_ttl: Duration::from_secs(400_000 * 365 * 24 * 3600),
            ..IdentityConfig::default()
        };
        assert!(far.validate().is_err());

        let zero = IdentityConfig {
            access_token_ttl: Duration::ZERO,
            ..IdentityConfig::default()
        };
        assert!(zero.validate().is_err());
    }

    #[test]
    fn test_debug_hides_secrets() {
        let config = IdentityConfig {
            password_pepper: Some(b"pepper".to_vec()),
            ..IdentityConfig::development()
        };
        let debug = format!("{config:?}");
        assert!(!debug.contains("112, 101"));
        assert!(debug.contains("[REDACTED]"));
    }
}
