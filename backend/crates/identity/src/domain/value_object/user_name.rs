//! User Name Value Object
//!
//! Login handle. ASCII letters, digits, `.`, `_`, and `-`, 3 to 50 characters.
//! Uniqueness and login lookup use the lowercase canonical form; the original
//! spelling is kept for display.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{IdentityError, IdentityResult};

// ============================================================================
// Constants
// ============================================================================

pub const USER_NAME_MIN_LENGTH: usize = 3;

pub const USER_NAME_MAX_LENGTH: usize = 50;

const ALLOWED_SPECIAL_CHARS: &[char] = &['.', '_', '-'];

// ============================================================================
// UserName
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UserName {
    original: String,
    canonical: String,
}

impl UserName {
    pub fn new(raw: impl AsRef<str>) -> IdentityResult<Self> {
        let raw = raw.as_ref();

        if raw.trim().is_empty() {
            return Err(IdentityError::policy("Username cannot be empty"));
        }

        let length = raw.chars().count();
        if !(USER_NAME_MIN_LENGTH..=USER_NAME_MAX_LENGTH).contains(&length) {
            return Err(IdentityError::policy(format!(
                "Username must be between {USER_NAME_MIN_LENGTH} and {USER_NAME_MAX_LENGTH} characters"
            )));
        }

        if let Some(bad) = raw.chars().find(|c| !Self::is_allowed_char(*c)) {
            return Err(IdentityError::policy(format!(
                "Username contains an invalid character: {bad:?}"
            )));
        }

        Ok(Self {
            original: raw.to_string(),
            canonical: raw.to_ascii_lowercase(),
        })
    }

    /// Rebuild from stored columns (already validated on the way in)
    pub fn from_db(original: impl Into<String>, canonical: impl Into<String>) -> Self {
        Self {
            original: original.into(),
            canonical: canonical.into(),
        }
    }

    #[inline]
    fn is_allowed_char(c: char) -> bool {
        c.is_ascii_alphanumeric() || ALLOWED_SPECIAL_CHARS.contains(&c)
    }

    pub fn original(&self) -> &str {
        &self.original
    }

    pub fn canonical(&self) -> &str {
        &self.canonical
    }
}

impl fmt::Display for UserName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.original)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_user_names() {
        for name in ["alice", "Bob.Smith", "dr_who-42", "abc", &"a".repeat(50)] {
            assert!(UserName::new(name).is_ok(), "rejected {name:?}");
        }
    }

    #[test]
    fn test_length_bounds() {
        assert!(UserName::new("ab").is_err());
        assert!(UserName::new("a".repeat(51)).is_err());
    }

    #[test]
    fn test_blank() {
        assert!(matches!(
            UserName::new(""),
            Err(IdentityError::PolicyViolation(_))
        ));
        assert!(UserName::new("     ").is_err());
    }

    #[test]
    fn test_invalid_characters() {
        for name in ["al ice", "alice@home", "ålice", "alice!", "tab\tname"] {
            assert!(
                matches!(UserName::new(name), Err(IdentityError::PolicyViolation(_))),
                "accepted {name:?}"
            );
        }
    }

    #[test]
    fn test_canonical_is_lowercase() {
        let name = UserName::new("Alice.Smith").unwrap();
        assert_eq!(name.original(), "Alice.Smith");
        assert_eq!(name.canonical(), "alice.smith");
        assert_eq!(name.to_string(), "Alice.Smith");
    }
}
