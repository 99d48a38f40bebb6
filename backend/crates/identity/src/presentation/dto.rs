//! API DTOs (Data Transfer Objects)

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::application::{RegisterInput, SessionOutput};
use crate::domain::entity::{Account, Profile, ProfileDetails, ProfilePatch};
use crate::domain::value_object::{AccountId, AccountRole, ProfileId, ProfileStatus};
use crate::error::{IdentityError, IdentityResult};

pub const TOKEN_TYPE: &str = "Bearer";

// ============================================================================
// Register
// ============================================================================

/// Register request
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    #[serde(alias = "username")]
    pub user_name: String,
    pub email: String,
    pub password: String,
    pub full_name: Option<String>,
    pub phone_number: Option<String>,
    pub role: String,
    /// Role-specific fields; the `role` tag is filled in from the top level
    pub profile: Option<Value>,
}

impl RegisterRequest {
    pub fn into_input(self) -> IdentityResult<RegisterInput> {
        let profile = match self.profile {
            None | Some(Value::Null) => None,
            Some(payload) => {
                let role = AccountRole::parse(&self.role)?;
                Some(tagged_patch(payload, role)?)
            }
        };

        Ok(RegisterInput {
            user_name: self.user_name,
            email: self.email,
            password: self.password,
            full_name: self.full_name,
            phone_number: self.phone_number,
            role: self.role,
            profile,
        })
    }
}

fn tagged_patch(payload: Value, role: AccountRole) -> IdentityResult<ProfilePatch> {
    let Value::Object(mut fields) = payload else {
        return Err(IdentityError::policy("Profile must be a JSON object"));
    };
    fields
        .entry("role")
        .or_insert_with(|| Value::String(role.code().to_string()));

    serde_json::from_value(Value::Object(fields))
        .map_err(|e| IdentityError::policy(format!("Invalid profile: {e}")))
}

// ============================================================================
// Login / Refresh
// ============================================================================

/// Login request
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    #[serde(alias = "username")]
    pub user_name: String,
    pub password: String,
}

/// Refresh request
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshRequest {
    pub refresh_token: String,
}

/// Session response for register, login and refresh
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: &'static str,
    /// Access token lifetime in seconds
    pub expires_in: i64,
    pub expires_at: DateTime<Utc>,
    pub refresh_expires_at: DateTime<Utc>,
    pub account: AccountSummary,
    pub profile: Option<ProfileView>,
}

impl From<SessionOutput> for SessionResponse {
    fn from(output: SessionOutput) -> Self {
        Self {
            access_token: output.access_token.token,
            refresh_token: output.refresh_token,
            token_type: TOKEN_TYPE,
            expires_in: output.access_token.expires_in,
            expires_at: output.access_token.expires_at,
            refresh_expires_at: output.refresh_expires_at,
            account: AccountSummary::from(&output.account),
            profile: output.profile.as_ref().map(ProfileView::from),
        }
    }
}

// ============================================================================
// Account / Profile views
// ============================================================================

/// Account fields safe to show; never the password hash
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountSummary {
    pub account_id: AccountId,
    pub user_name: String,
    pub email: String,
    pub full_name: String,
    pub phone_number: Option<String>,
    pub role: AccountRole,
    pub is_active: bool,
    pub is_locked: bool,
    pub locked_until: Option<DateTime<Utc>>,
    pub last_login_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl From<&Account> for AccountSummary {
    fn from(account: &Account) -> Self {
        Self {
            account_id: account.account_id,
            user_name: account.user_name.original().to_string(),
            email: account.email.as_str().to_string(),
            full_name: account.full_name.clone(),
            phone_number: account.phone_number.clone(),
            role: account.role,
            is_active: account.is_active,
            is_locked: account.is_locked_at(Utc::now()),
            locked_until: account.locked_until,
            last_login_at: account.last_login_at,
            created_at: account.created_at,
        }
    }
}

/// Profile with its role-specific fields inlined next to the `role` tag
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileView {
    pub profile_id: ProfileId,
    pub status: ProfileStatus,
    #[serde(flatten)]
    pub details: ProfileDetails,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&Profile> for ProfileView {
    fn from(profile: &Profile) -> Self {
        Self {
            profile_id: profile.profile_id,
            status: profile.status,
            details: profile.details.clone(),
            created_at: profile.created_at,
            updated_at: profile.updated_at,
        }
    }
}

/// An account with its profile: GET /me and the admin lookups
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountView {
    pub account: AccountSummary,
    pub profile: Option<ProfileView>,
}

impl AccountView {
    pub fn new(account: &Account, profile: Option<&Profile>) -> Self {
        Self {
            account: AccountSummary::from(account),
            profile: profile.map(ProfileView::from),
        }
    }
}

/// GET /accounts query; exactly one field must be set
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountLookupQuery {
    #[serde(alias = "username")]
    pub user_name: Option<String>,
    pub email: Option<String>,
}

// ============================================================================
// Passwords
// ============================================================================

/// Change password request
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangePasswordRequest {
    pub current_password: String,
    pub new_password: String,
}

/// Administrative password reset request
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResetPasswordRequest {
    pub new_password: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn request(role: &str, profile: Option<Value>) -> RegisterRequest {
        RegisterRequest {
            user_name: "dr_bob".into(),
            email: "bob@clinic.org".into(),
            password: "Str0ng!Pass".into(),
            full_name: None,
            phone_number: None,
            role: role.into(),
            profile,
        }
    }

    #[test]
    fn test_profile_tag_comes_from_role() {
        let input = request("doctor", Some(json!({ "licenseNumber": "MED-7" })))
            .into_input()
            .unwrap();
        let Some(ProfilePatch::Doctor(patch)) = input.profile else {
            panic!("expected a doctor patch");
        };
        assert_eq!(patch.license_number.as_deref(), Some("MED-7"));
    }

    #[test]
    fn test_unknown_role_with_profile() {
        let result = request("nurse", Some(json!({}))).into_input();
        assert!(matches!(result, Err(IdentityError::UnsupportedRole(_))));
    }

    #[test]
    fn test_non_object_profile() {
        let result = request("PATIENT", Some(json!([1, 2]))).into_input();
        assert!(matches!(result, Err(IdentityError::PolicyViolation(_))));
    }

    #[test]
    fn test_profile_view_inlines_details() {
        let details = ProfileDetails::for_role(AccountRole::Admin, None).unwrap();
        let profile = Profile::new(AccountId::new(), details, Utc::now());
        let value = serde_json::to_value(ProfileView::from(&profile)).unwrap();

        assert_eq!(value["role"], "ADMIN");
        assert_eq!(value["status"], "PENDING_VERIFICATION");
        assert_eq!(value["accessLevel"], 1);
    }
}
