//! Register Use Case
//!
//! Creates an account with its role-matched profile and first session in one
//! unit of work.

use std::sync::Arc;

use chrono::Utc;

use crate::application::config::IdentityConfig;
use crate::application::password_hasher::hash_password;
use crate::application::refresh_token_store::RefreshTokenStore;
use crate::application::session::SessionOutput;
use crate::application::token_issuer::TokenIssuer;
use crate::domain::entity::{Account, Profile, ProfileDetails, ProfilePatch};
use crate::domain::repository::IdentityStore;
use crate::domain::value_object::{AccountRole, Email, RawPassword, UserName};
use crate::error::{IdentityError, IdentityResult};

/// Register input
#[derive(Debug)]
pub struct RegisterInput {
    pub user_name: String,
    pub email: String,
    pub password: String,
    pub full_name: Option<String>,
    pub phone_number: Option<String>,
    /// Role code: PATIENT, DOCTOR or ADMIN
    pub role: String,
    /// Role-specific profile fields
    pub profile: Option<ProfilePatch>,
}

/// Register use case
pub struct RegisterUseCase<R>
where
    R: IdentityStore,
{
    repo: Arc<R>,
    config: Arc<IdentityConfig>,
    tokens: Arc<TokenIssuer>,
    refresh_tokens: RefreshTokenStore<R>,
}

impl<R> RegisterUseCase<R>
where
    R: IdentityStore,
{
    pub fn new(repo: Arc<R>, config: Arc<IdentityConfig>, tokens: Arc<TokenIssuer>) -> Self {
        let refresh_tokens = RefreshTokenStore::new(repo.clone(), config.refresh_token_ttl());
        Self {
            repo,
            config,
            tokens,
            refresh_tokens,
        }
    }

    pub async fn execute(&self, input: RegisterInput) -> IdentityResult<SessionOutput> {
        // Validate everything before touching the store
        let user_name = UserName::new(&input.user_name)?;
        let email = Email::new(&input.email)?;
        let raw_password = RawPassword::new(input.password)?;
        let role = AccountRole::parse(&input.role)?;
        let details = ProfileDetails::for_role(role, input.profile)?;

        if self.repo.user_name_exists(&user_name).await? {
            return Err(IdentityError::DuplicateResource(
                "Username is already taken".to_string(),
            ));
        }
        if self.repo.email_exists(&email).await? {
            return Err(IdentityError::DuplicateResource(
                "Email is already registered".to_string(),
            ));
        }

        let password_hash = hash_password(raw_password, self.config.password_pepper.clone()).await?;

        let now = Utc::now();
        let account = Account::new(
            user_name,
            email,
            password_hash,
            role,
            input.full_name,
            input.phone_number,
            now,
        );
        let profile = Profile::new(account.account_id, details, now);

        let access_token = self.tokens.issue_access_token_at(&account, now)?;
        let (refresh_token, refresh_record) = self.refresh_tokens.mint(account.account_id, now);

        self.repo
            .create_registration(&account, &profile, &refresh_record)
            .await?;

        tracing::info!(
            account_id = %account.account_id,
            profile_id = %profile.profile_id,
            role = %role,
            "Account registered"
        );

        Ok(SessionOutput {
            account,
            profile: Some(profile),
            access_token,
            refresh_token,
            refresh_expires_at: refresh_record.expires_at,
        })
    }
}
