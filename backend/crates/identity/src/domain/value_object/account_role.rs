use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::IdentityError;

/// The three actor kinds. Closed set: every role has exactly one profile
/// variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[repr(i16)]
pub enum AccountRole {
    Patient = 0,
    Doctor = 1,
    Admin = 2,
}

impl AccountRole {
    pub const ALL: [AccountRole; 3] = [AccountRole::Patient, AccountRole::Doctor, AccountRole::Admin];

    #[inline]
    pub const fn id(&self) -> i16 {
        *self as i16
    }

    #[inline]
    pub const fn code(&self) -> &'static str {
        use AccountRole::*;
        match self {
            Patient => "PATIENT",
            Doctor => "DOCTOR",
            Admin => "ADMIN",
        }
    }

    #[inline]
    pub fn from_id(id: i16) -> Option<Self> {
        Self::ALL.into_iter().find(|role| role.id() == id)
    }

    /// Case-insensitive, so `"doctor"` and `"DOCTOR"` both resolve
    pub fn from_code(code: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|role| role.code().eq_ignore_ascii_case(code.trim()))
    }

    /// Like [`from_code`](Self::from_code), failing with `UnsupportedRole`
    pub fn parse(code: &str) -> Result<Self, IdentityError> {
        Self::from_code(code).ok_or_else(|| IdentityError::UnsupportedRole(code.to_string()))
    }
}

impl fmt::Display for AccountRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_id() {
        assert_eq!(AccountRole::from_id(0), Some(AccountRole::Patient));
        assert_eq!(AccountRole::from_id(1), Some(AccountRole::Doctor));
        assert_eq!(AccountRole::from_id(2), Some(AccountRole::Admin));
        assert_eq!(AccountRole::from_id(3), None);
    }

    #[test]
    fn test_from_code() {
        assert_eq!(AccountRole::from_code("PATIENT"), Some(AccountRole::Patient));
        assert_eq!(AccountRole::from_code("doctor"), Some(AccountRole::Doctor));
        assert_eq!(AccountRole::from_code(" Admin "), Some(AccountRole::Admin));
        assert_eq!(AccountRole::from_code("nurse"), None);
    }

    #[test]
    fn test_parse_unknown_role() {
        assert!(matches!(
            AccountRole::parse("nurse"),
            Err(IdentityError::UnsupportedRole(code)) if code == "nurse"
        ));
    }

    #[test]
    fn test_display_and_serde_agree() {
        for role in AccountRole::ALL {
            let json = serde_json::to_string(&role).unwrap();
            assert_eq!(json, format!("\"{role}\""));
        }
    }
}
