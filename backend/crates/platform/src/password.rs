//! Password Policy and Hashing
//!
//! - Composition policy: length in [8, 128] plus upper, lower, digit, and a
//!   symbol from [`SPECIAL_CHARACTERS`]
//! - Argon2id hashing with optional application pepper
//! - Clear text is NFKC-normalized and zeroized on drop
//!
//! Policy failures can be collected in full ([`policy_violations`]) for form
//! feedback, or short-circuited ([`check_policy`]) when only a yes/no matters.

use std::fmt;

use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier, password_hash::SaltString};
use rand::rngs::OsRng;
use thiserror::Error;
use unicode_normalization::UnicodeNormalization;
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

// ============================================================================
// Constants
// ============================================================================

pub const MIN_PASSWORD_LENGTH: usize = 8;

pub const MAX_PASSWORD_LENGTH: usize = 128;

/// Symbols that satisfy the "special character" class
pub const SPECIAL_CHARACTERS: &str = "!@#$%^&*()_+-=[]{};':\"\\|,.<>/?";

// ============================================================================
// Error Types
// ============================================================================

/// Password policy violation errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PasswordPolicyError {
    #[error("Password cannot be empty or contain only whitespace")]
    EmptyOrWhitespace,

    #[error("Password must be at least {min} characters (got {actual})")]
    TooShort { min: usize, actual: usize },

    #[error("Password must be at most {max} characters (got {actual})")]
    TooLong { max: usize, actual: usize },

    #[error("Password must contain an uppercase letter")]
    MissingUppercase,

    #[error("Password must contain a lowercase letter")]
    MissingLowercase,

    #[error("Password must contain a digit")]
    MissingDigit,

    #[error("Password must contain a special character")]
    MissingSpecial,
}

/// Password hashing/verification errors
#[derive(Debug, Error)]
pub enum PasswordHashError {
    #[error("Password hashing failed: {0}")]
    HashingFailed(String),

    #[error("Invalid password hash format")]
    InvalidHashFormat,
}

// ============================================================================
// Policy
// ============================================================================

/// Every rule `raw` breaks, in a stable order. Empty means acceptable.
///
/// An empty or blank password reports only [`PasswordPolicyError::EmptyOrWhitespace`].
pub fn policy_violations(raw: &str) -> Vec<PasswordPolicyError> {
    let normalized: String = raw.nfkc().collect();
    violations_of_normalized(&normalized)
}

/// First rule `raw` breaks, if any
pub fn check_policy(raw: &str) -> Result<(), PasswordPolicyError> {
    match policy_violations(raw).into_iter().next() {
        Some(violation) => Err(violation),
        None => Ok(()),
    }
}

fn violations_of_normalized(password: &str) -> Vec<PasswordPolicyError> {
    if password.trim().is_empty() {
        return vec![PasswordPolicyError::EmptyOrWhitespace];
    }

    let mut violations = Vec::new();

    // Count code points, not bytes
    let char_count = password.chars().count();
    if char_count < MIN_PASSWORD_LENGTH {
        violations.push(PasswordPolicyError::TooShort {
            min: MIN_PASSWORD_LENGTH,
            actual: char_count,
        });
    }
    if char_count > MAX_PASSWORD_LENGTH {
        violations.push(PasswordPolicyError::TooLong {
            max: MAX_PASSWORD_LENGTH,
            actual: char_count,
        });
    }

    if !password.chars().any(char::is_uppercase) {
        violations.push(PasswordPolicyError::MissingUppercase);
    }
    if !password.chars().any(char::is_lowercase) {
        violations.push(PasswordPolicyError::MissingLowercase);
    }
    if !password.chars().any(|c| c.is_ascii_digit()) {
        violations.push(PasswordPolicyError::MissingDigit);
    }
    if !password.chars().any(|c| SPECIAL_CHARACTERS.contains(c)) {
        violations.push(PasswordPolicyError::MissingSpecial);
    }

    violations
}

// ============================================================================
// Clear Text Password (Zeroized on drop)
// ============================================================================

/// Clear text password with automatic memory zeroization
///
/// Not `Clone`, and `Debug` is redacted.
///
/// ```rust
/// use platform::password::ClearTextPassword;
///
/// let password = ClearTextPassword::new("Str0ng!Pass".to_string()).unwrap();
/// let hashed = password.hash(None).unwrap();
/// assert!(hashed.verify(&password, None));
/// ```
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct ClearTextPassword(String);

impl ClearTextPassword {
    /// Normalize (NFKC) and enforce the composition policy, first failure wins.
    pub fn new(raw: String) -> Result<Self, PasswordPolicyError> {
        let candidate = Self::unvalidated(raw);
        if let Some(violation) = violations_of_normalized(&candidate.0).into_iter().next() {
            return Err(violation);
        }
        Ok(candidate)
    }

    /// Normalize without enforcing the policy.
    ///
    /// For verifying a login attempt: the stored hash decides, and a password
    /// that would fail today's policy is simply a wrong password.
    pub fn unvalidated(mut raw: String) -> Self {
        let normalized: String = raw.nfkc().collect();
        raw.zeroize();
        Self(normalized)
    }

    fn peppered(&self, pepper: Option<&[u8]>) -> Zeroizing<Vec<u8>> {
        let mut bytes = Zeroizing::new(self.0.as_bytes().to_vec());
        if let Some(p) = pepper {
            bytes.extend_from_slice(p);
        }
        bytes
    }

    /// Hash with Argon2id (OWASP defaults: m=19 MiB, t=2, p=1) and a fresh
    /// 128-bit salt.
    pub fn hash(&self, pepper: Option<&[u8]>) -> Result<HashedPassword, PasswordHashError> {
        let salt = SaltString::generate(OsRng);

        let hash = Argon2::default()
            .hash_password(&self.peppered(pepper), &salt)
            .map_err(|e| PasswordHashError::HashingFailed(e.to_string()))?;

        Ok(HashedPassword {
            hash: hash.to_string(),
        })
    }
}

impl fmt::Debug for ClearTextPassword {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ClearTextPassword")
            .field(&"[REDACTED]")
            .finish()
    }
}

// ============================================================================
// Hashed Password (Safe to store)
// ============================================================================

/// Argon2id hash in PHC string format (algorithm, params, salt, digest)
#[derive(Clone, PartialEq, Eq)]
pub struct HashedPassword {
    hash: String,
}

impl HashedPassword {
    /// Parse a stored PHC string
    pub fn from_phc_string(s: impl Into<String>) -> Result<Self, PasswordHashError> {
        let hash = s.into();
        PasswordHash::new(&hash).map_err(|_| PasswordHashError::InvalidHashFormat)?;
        Ok(Self { hash })
    }

    pub fn as_phc_string(&self) -> &str {
        &self.hash
    }

    /// Recompute and compare (constant time inside argon2).
    ///
    /// `pepper` must match the one used when hashing.
    pub fn verify(&self, password: &ClearTextPassword, pepper: Option<&[u8]>) -> bool {
        let Ok(parsed_hash) = PasswordHash::new(&self.hash) else {
            return false;
        };

        Argon2::default()
            .verify_password(&password.peppered(pepper), &parsed_hash)
            .is_ok()
    }
}

impl fmt::Debug for HashedPassword {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HashedPassword")
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

    mod policy {
        use super::*;

        #[test]
        fn test_accepts_all_four_classes() {
            assert!(check_policy("Str0ng!Pass").is_ok());
            assert!(check_policy("aA1!aA1!").is_ok());
            assert!(check_policy(&format!("Aa1?{}", "x".repeat(124))).is_ok());
        }

        #[test]
        fn test_every_listed_symbol_counts_as_special() {
            for symbol in SPECIAL_CHARACTERS.chars() {
                let password = format!("Abcdef1{symbol}");
                assert!(check_policy(&password).is_ok(), "rejected {password:?}");
            }
        }

        #[test]
        fn test_each_missing_class_is_reported() {
            assert_eq!(
                check_policy("str0ng!pass"),
                Err(PasswordPolicyError::MissingUppercase)
            );
            assert_eq!(
                check_policy("STR0NG!PASS"),
                Err(PasswordPolicyError::MissingLowercase)
            );
            assert_eq!(
                check_policy("Strong!Pass"),
                Err(PasswordPolicyError::MissingDigit)
            );
            assert_eq!(
                check_policy("Str0ngPass"),
                Err(PasswordPolicyError::MissingSpecial)
            );
        }

        #[test]
        fn test_length_bounds() {
            assert!(matches!(
                check_policy("Aa1!aa1"),
                Err(PasswordPolicyError::TooShort { min: 8, actual: 7 })
            ));
            let long = format!("Aa1!{}", "a".repeat(MAX_PASSWORD_LENGTH));
            assert!(matches!(
                check_policy(&long),
                Err(PasswordPolicyError::TooLong { .. })
            ));
        }

        #[test]
        fn test_collects_all_violations() {
            assert_eq!(
                policy_violations("abc"),
                vec![
                    PasswordPolicyError::TooShort { min: 8, actual: 3 },
                    PasswordPolicyError::MissingUppercase,
                    PasswordPolicyError::MissingDigit,
                    PasswordPolicyError::MissingSpecial,
                ]
            );
        }

        #[test]
        fn test_empty_and_blank() {
            assert_eq!(
                policy_violations(""),
                vec![PasswordPolicyError::EmptyOrWhitespace]
            );
            assert_eq!(
                check_policy("          "),
                Err(PasswordPolicyError::EmptyOrWhitespace)
            );
        }

        #[test]
        fn test_fullwidth_digits_normalize() {
            // U+FF11 FULLWIDTH DIGIT ONE becomes '1' under NFKC
            assert!(check_policy("Strong!Pass\u{FF11}").is_ok());
        }
    }

    mod hashing {
        use super::*;

        #[test]
        fn test_hash_and_verify() {
            let password = ClearTextPassword::new("TestPassword123!".to_string()).unwrap();
            let hashed = password.hash(None).unwrap();
            assert!(hashed.verify(&password, None));

            let wrong = ClearTextPassword::unvalidated("WrongPassword123!".to_string());
            assert!(!hashed.verify(&wrong, None));
        }

        #[test]
        fn test_hash_with_pepper() {
            let password = ClearTextPassword::new("TestPassword123!".to_string()).unwrap();
            let pepper = b"my_secret_pepper";
            let hashed = password.hash(Some(pepper)).unwrap();

            assert!(hashed.verify(&password, Some(pepper)));
            assert!(!hashed.verify(&password, None));
            assert!(!hashed.verify(&password, Some(b"wrong_pepper")));
        }

        #[test]
        fn test_salts_differ() {
            let password = ClearTextPassword::new("TestPassword123!".to_string()).unwrap();
            let a = password.hash(None).unwrap();
            let b = password.hash(None).unwrap();
            assert_ne!(a.as_phc_string(), b.as_phc_string());
        }

        #[test]
        fn test_phc_string_roundtrip() {
            let password = ClearTextPassword::new("TestPassword123!".to_string()).unwrap();
            let hashed = password.hash(None).unwrap();
            let restored = HashedPassword::from_phc_string(hashed.as_phc_string()).unwrap();
            assert!(restored.verify(&password, None));
            assert!(restored.as_phc_string().starts_with("$argon2id$"));
        }

        #[test]
        fn test_invalid_phc_string() {
            assert!(HashedPassword::from_phc_string("not_a_valid_hash").is_err());
        }

        #[test]
        fn test_debug_redaction() {
            let password = ClearTextPassword::unvalidated("secret".to_string());
            let debug_output = format!("{:?}", password);
            assert!(debug_output.contains("REDACTED"));
            assert!(!debug_output.contains("secret"));
        }
    }
}
