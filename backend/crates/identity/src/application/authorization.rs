//! Authorization
//!
//! Explicit role gate called at the top of each protected handler.

use crate::domain::value_object::{AccountId, AccountRole};
use crate::error::{IdentityError, IdentityResult};

/// Caller identity decoded from a verified access token
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    pub account_id: AccountId,
    pub user_name: String,
    pub role: AccountRole,
}

/// Fail with `AccessDenied` unless the principal holds one of `allowed`
pub fn authorize(principal: &Principal, allowed: &[AccountRole]) -> IdentityResult<()> {
    if allowed.contains(&principal.role) {
        Ok(())
    } else {
        tracing::warn!(
            account_id = %principal.account_id,
            role = %principal.role,
            "Role not permitted for operation"
        );
        Err(IdentityError::AccessDenied)
    }
}
