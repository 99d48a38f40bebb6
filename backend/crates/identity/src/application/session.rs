//! Session output shared by register, authenticate and refresh.

use chrono::{DateTime, Utc};

use crate::application::token_issuer::IssuedAccessToken;
use crate::domain::entity::{Account, Profile};

/// Tokens plus the state they were issued for
#[derive(Debug, Clone)]
pub struct SessionOutput {
    pub account: Account,
    pub profile: Option<Profile>,
    pub access_token: IssuedAccessToken,
    /// Clear refresh token; only its digest is stored
    pub refresh_token: String,
    pub refresh_expires_at: DateTime<Utc>,
}
