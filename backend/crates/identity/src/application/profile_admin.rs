//! Profile Administration Use Case
//!
//! Doctor verification and profile suspension. Each change is a single
//! version-checked profile write.

use std::sync::Arc;

use chrono::Utc;

use crate::application::authorization::{Principal, authorize};
use crate::domain::entity::Profile;
use crate::domain::repository::ProfileRepository;
use crate::domain::value_object::{AccountRole, ProfileId};
use crate::error::{IdentityError, IdentityResult};

/// Profile administration use case
pub struct ProfileAdminUseCase<R>
where
    R: ProfileRepository,
{
    repo: Arc<R>,
}

impl<R> ProfileAdminUseCase<R>
where
    R: ProfileRepository,
{
    pub fn new(repo: Arc<R>) -> Self {
        Self { repo }
    }

    /// Every live doctor profile, oldest first, verified or not
    pub async fn list_doctors(&self, admin: &Principal) -> IdentityResult<Vec<Profile>> {
        authorize(admin, &[AccountRole::Admin])?;
        self.repo.list_profiles_by_role(AccountRole::Doctor).await
    }

    /// Re-verifying an already verified doctor changes nothing
    pub async fn verify_doctor(
        &self,
        admin: &Principal,
        profile_id: &ProfileId,
    ) -> IdentityResult<Profile> {
        authorize(admin, &[AccountRole::Admin])?;
        let mut profile = self.load(profile_id).await?;

        if profile.verify_doctor(admin.account_id, Utc::now())? {
            profile.version = self.repo.update_profile(&profile).await?;
            tracing::info!(
                profile_id = %profile_id,
                verified_by = %admin.account_id,
                "Doctor verified"
            );
        }
        Ok(profile)
    }

    pub async fn reject_doctor(
        &self,
        admin: &Principal,
        profile_id: &ProfileId,
    ) -> IdentityResult<Profile> {
        authorize(admin, &[AccountRole::Admin])?;
        let mut profile = self.load(profile_id).await?;

        if profile.reject_doctor(Utc::now())? {
            profile.version = self.repo.update_profile(&profile).await?;
            tracing::info!(
                profile_id = %profile_id,
                rejected_by = %admin.account_id,
                "Doctor verification rejected"
            );
        }
        Ok(profile)
    }

    /// A suspended profile blocks its account from authenticating
    pub async fn suspend(&self, admin: &Principal, profile_id: &ProfileId) -> IdentityResult<Profile> {
        authorize(admin, &[AccountRole::Admin])?;
        let mut profile = self.load(profile_id).await?;

        if profile.suspend(Utc::now()) {
            profile.version = self.repo.update_profile(&profile).await?;
            tracing::info!(profile_id = %profile_id, admin_id = %admin.account_id, "Profile suspended");
        }
        Ok(profile)
    }

    pub async fn reinstate(
        &self,
        admin: &Principal,
        profile_id: &ProfileId,
    ) -> IdentityResult<Profile> {
        authorize(admin, &[AccountRole::Admin])?;
        let mut profile = self.load(profile_id).await?;

        if profile.reinstate(Utc::now()) {
            profile.version = self.repo.update_profile(&profile).await?;
            tracing::info!(profile_id = %profile_id, admin_id = %admin.account_id, "Profile reinstated");
        }
        Ok(profile)
    }

    async fn load(&self, profile_id: &ProfileId) -> IdentityResult<Profile> {
        self.repo
            .find_profile(profile_id)
            .await?
            .ok_or_else(|| IdentityError::not_found("Profile"))
    }
}
