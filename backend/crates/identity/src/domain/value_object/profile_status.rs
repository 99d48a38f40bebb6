//! Profile Status Value Object
//!
//! Lifecycle of a role profile, independent of the account's own
//! active/locked flags.
//!
//! - **PendingVerification**: every profile starts here
//! - **Active**: verified (doctors) or reinstated
//! - **Inactive**: verification rejected
//! - **Suspended**: blocks authentication until reinstated

use derive_more::Display;
use serde::{Deserialize, Serialize};

// ============================================================================
// ProfileStatus
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Display, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[repr(i16)]
pub enum ProfileStatus {
    #[default]
    #[display("PENDING_VERIFICATION")]
    PendingVerification = 0,

    #[display("ACTIVE")]
    Active = 1,

    #[display("INACTIVE")]
    Inactive = 2,

    #[display("SUSPENDED")]
    Suspended = 3,
}

impl ProfileStatus {
    /// Numeric ID for database storage
    #[inline]
    pub const fn id(&self) -> i16 {
        *self as i16
    }

    #[inline]
    pub fn from_id(id: i16) -> Option<Self> {
        match id {
            0 => Some(Self::PendingVerification),
            1 => Some(Self::Active),
            2 => Some(Self::Inactive),
            3 => Some(Self::Suspended),
            _ => None,
        }
    }

    /// Only a suspension blocks sign-in; pending and rejected profiles can
    /// still reach their own account.
    #[inline]
    pub const fn blocks_authentication(&self) -> bool {
        matches!(self, Self::Suspended)
    }
}

// ============================================================================
// Tests
// ============================================================================
