//! User Password Value Objects
//!
//! Domain wrappers over `platform::password`. Policy failures become
//! `PolicyViolation`; hashing failures become `Internal` and never reach
//! the client verbatim.

use platform::password::{self, ClearTextPassword, HashedPassword};
use std::fmt;

use crate::error::{IdentityError, IdentityResult};

// ============================================================================
// Raw Password (User Input)
// ============================================================================

/// Password as typed by the user. Zeroized on drop.
pub struct RawPassword(ClearTextPassword);

impl RawPassword {
    /// Policy-checked: for registration and password changes.
    ///
    /// The error lists every broken rule, not just the first.
    pub fn new(raw: String) -> IdentityResult<Self> {
        let violations = password::policy_violations(&raw);
        if !violations.is_empty() {
            let messages: Vec<String> = violations.iter().map(|v| v.to_string()).collect();
            return Err(IdentityError::PolicyViolation(messages.join("; ")));
        }
        ClearTextPassword::new(raw)
            .map(Self)
            .map_err(|e| IdentityError::PolicyViolation(e.to_string()))
    }

    /// Unchecked: for comparing a login attempt against a stored hash
    pub fn for_login(raw: String) -> Self {
        Self(ClearTextPassword::unvalidated(raw))
    }
}

impl fmt::Debug for RawPassword {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("RawPassword").field(&"[REDACTED]").finish()
    }
}

// ============================================================================
// User Password (Hashed, for storage)
// ============================================================================

/// Argon2id PHC string. Safe to store; still never logged.
#[derive(Clone, PartialEq, Eq)]
pub struct UserPassword(HashedPassword);

impl UserPassword {
    pub fn from_raw(raw: &RawPassword, pepper: Option<&[u8]>) -> IdentityResult<Self> {
        raw.0
            .hash(pepper)
            .map(Self)
            .map_err(|e| IdentityError::Internal(e.to_string()))
    }

    pub fn from_phc_string(phc_string: impl Into<String>) -> IdentityResult<Self> {
        HashedPassword::from_phc_string(phc_string)
            .map(Self)
            .map_err(|_| IdentityError::Internal("Invalid password hash in database".to_string()))
    }

    pub fn as_phc_string(&self) -> &str {
        self.0.as_phc_string()
    }

    pub fn verify(&self, raw: &RawPassword, pepper: Option<&[u8]>) -> bool {
        self.0.verify(&raw.0, pepper)
    }
}

impl fmt::Debug for UserPassword {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UserPassword")
            .field("hash", &"[HASH]")
            .finish()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_policy_is_enforced_on_new() {
        assert!(RawPassword::new("Str0ng!Pass".to_string()).is_ok());
        assert!(matches!(
            RawPassword::new("weakpass".to_string()),
            Err(IdentityError::PolicyViolation(_))
        ));
    }

    #[test]
    fn test_for_login_skips_policy() {
        let stored = UserPassword::from_raw(&RawPassword::new("Str0ng!Pass".into()).unwrap(), None)
            .unwrap();
        // A policy-breaking attempt is just a wrong password
        assert!(!stored.verify(&RawPassword::for_login("weak".into()), None));
        assert!(stored.verify(&RawPassword::for_login("Str0ng!Pass".into()), None));
    }

    #[test]
    fn test_every_violation_is_reported() {
        let Err(IdentityError::PolicyViolation(message)) = RawPassword::new("short".to_string())
        else {
            panic!("expected a policy violation");
        };
        assert!(message.contains("at least 8"));
        assert!(message.contains("uppercase"));
        assert!(message.contains("digit"));
        assert!(message.contains("special character"));
    }

    #[test]
    fn test_bad_phc_is_internal() {
        assert!(matches!(
            UserPassword::from_phc_string("plaintext"),
            Err(IdentityError::Internal(_))
        ));
    }

    #[test]
    fn test_debug_redaction() {
        let raw = RawPassword::new("SecretPassw0rd!".to_string()).unwrap();
        let debug = format!("{:?}", raw);
        assert!(debug.contains("REDACTED"));
        assert!(!debug.contains("Secret"));

        let hashed = UserPassword::from_raw(&raw, None).unwrap();
        let debug = format!("{:?}", hashed);
        assert!(debug.contains("HASH"));
        assert!(!debug.contains("argon2"));
    }
}
