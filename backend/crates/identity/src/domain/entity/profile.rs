//! Profile Entity
//!
//! One-to-one extension of an account. The variant always matches the
//! account's role; the status is the profile's own lifecycle (verification,
//! suspension) and feeds the account usability check.

use chrono::{DateTime, Utc};

use crate::domain::entity::profile_details::{ProfileDetails, ProfilePatch};
use crate::domain::value_object::{AccountId, AccountRole, ProfileId, ProfileStatus};
use crate::error::{IdentityError, IdentityResult};

#[derive(Debug, Clone, PartialEq)]
pub struct Profile {
    pub profile_id: ProfileId,
    pub account_id: AccountId,
    pub status: ProfileStatus,
    pub details: ProfileDetails,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub version: i64,
}

impl Profile {
    /// Every profile starts pending verification
    pub fn new(account_id: AccountId, details: ProfileDetails, now: DateTime<Utc>) -> Self {
        Self {
            profile_id: ProfileId::new(),
            account_id,
            status: ProfileStatus::PendingVerification,
            details,
            created_at: now,
            updated_at: now,
            version: 0,
        }
    }

    pub fn role(&self) -> AccountRole {
        self.details.role()
    }

    /// Role-specific partial update; the result must still validate.
    pub fn update_details(&mut self, patch: ProfilePatch, now: DateTime<Utc>) -> IdentityResult<()> {
        if patch.role() != self.role() {
            return Err(IdentityError::UnsupportedRole(format!(
                "{} details for a {} profile",
                patch.role(),
                self.role()
            )));
        }
        let mut details = self.details.clone();
        details.apply(patch)?;
        details.validate()?;
        self.details = details;
        self.updated_at = now;
        Ok(())
    }

    // ========================================================================
    // Doctor verification
    // ========================================================================

    /// Mark a doctor verified by `verifier` and activate the profile.
    ///
    /// Returns `false` (and changes nothing) when already verified.
    pub fn verify_doctor(&mut self, verifier: AccountId, now: DateTime<Utc>) -> IdentityResult<bool> {
        let doctor = self
            .details
            .as_doctor_mut()
            .ok_or_else(|| IdentityError::not_found("Doctor profile"))?;

        if doctor.verification.verified {
            return Ok(false);
        }

        doctor.verification.verified = true;
        doctor.verification.verified_at = Some(now);
        doctor.verification.verified_by = Some(verifier);
        self.status = ProfileStatus::Active;
        self.updated_at = now;
        Ok(true)
    }

    /// Mark a doctor unverified and inactive. Returns `false` when already rejected.
    pub fn reject_doctor(&mut self, now: DateTime<Utc>) -> IdentityResult<bool> {
        let doctor = self
            .details
            .as_doctor_mut()
            .ok_or_else(|| IdentityError::not_found("Doctor profile"))?;

        if !doctor.verification.verified && self.status == ProfileStatus::Inactive {
            return Ok(false);
        }

        doctor.verification.verified = false;
        doctor.verification.verified_at = None;
        doctor.verification.verified_by = None;
        self.status = ProfileStatus::Inactive;
        self.updated_at = now;
        Ok(true)
    }

    // ========================================================================
    // Suspension
    // ========================================================================

    /// Returns `false` when already suspended
    pub fn suspend(&mut self, now: DateTime<Utc>) -> bool {
        if self.status == ProfileStatus::Suspended {
            return false;
        }
        self.status = ProfileStatus::Suspended;
        self.updated_at = now;
        true
    }

    /// Returns `false` when already active
    pub fn reinstate(&mut self, now: DateTime<Utc>) -> bool {
        if self.status == ProfileStatus::Active {
            return false;
        }
        self.status = ProfileStatus::Active;
        self.updated_at = now;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entity::profile_details::{DoctorPatch, PatientPatch};

    fn doctor(now: DateTime<Utc>) -> Profile {
        let details = ProfileDetails::for_role(
            AccountRole::Doctor,
            Some(ProfilePatch::Doctor(DoctorPatch {
                license_number: Some("MED-1".into()),
                ..Default::default()
            })),
        )
        .unwrap();
        Profile::new(AccountId::new(), details, now)
    }

    fn patient(now: DateTime<Utc>) -> Profile {
        let details = ProfileDetails::for_role(AccountRole::Patient, None).unwrap();
        Profile::new(AccountId::new(), details, now)
    }

    #[test]
    fn test_new_profile_is_pending() {
        let now = Utc::now();
        assert_eq!(patient(now).status, ProfileStatus::PendingVerification);
        assert_eq!(doctor(now).role(), AccountRole::Doctor);
    }

    #[test]
    fn test_verify_is_idempotent() {
        let now = Utc::now();
        let admin = AccountId::new();
        let mut profile = doctor(now);

        assert!(profile.verify_doctor(admin, now).unwrap());
        assert_eq!(profile.status, ProfileStatus::Active);

        let later = now + chrono::Duration::hours(1);
        assert!(!profile.verify_doctor(AccountId::new(), later).unwrap());

        let ProfileDetails::Doctor(d) = &profile.details else {
            panic!("expected doctor");
        };
        assert_eq!(d.verification.verified_at, Some(now));
        assert_eq!(d.verification.verified_by, Some(admin));
    }

    #[test]
    fn test_reject() {
        let now = Utc::now();
        let mut profile = doctor(now);
        profile.verify_doctor(AccountId::new(), now).unwrap();

        assert!(profile.reject_doctor(now).unwrap());
        assert_eq!(profile.status, ProfileStatus::Inactive);
        assert!(!profile.reject_doctor(now).unwrap());
    }

    #[test]
    fn test_verification_only_for_doctors() {
        let now = Utc::now();
        let mut profile = patient(now);
        assert!(matches!(
            profile.verify_doctor(AccountId::new(), now),
            Err(IdentityError::ResourceNotFound(_))
        ));
    }

    #[test]
    fn test_update_details_rejects_other_role() {
        let now = Utc::now();
        let mut profile = doctor(now);
        let result = profile.update_details(ProfilePatch::Patient(PatientPatch::default()), now);
        assert!(matches!(result, Err(IdentityError::UnsupportedRole(_))));
    }

    #[test]
    fn test_update_details_keeps_old_state_when_invalid() {
        let now = Utc::now();
        let mut profile = doctor(now);
        let before = profile.clone();
        let result = profile.update_details(
            ProfilePatch::Doctor(DoctorPatch {
                license_number: Some("".into()),
                ..Default::default()
            }),
            now + chrono::Duration::minutes(1),
        );
        assert!(matches!(result, Err(IdentityError::PolicyViolation(_))));
        assert_eq!(profile, before);
    }

    #[test]
    fn test_suspend_and_reinstate() {
        let now = Utc::now();
        let mut profile = patient(now);
        assert!(profile.suspend(now));
        assert!(!profile.suspend(now));
        assert!(profile.reinstate(now));
        assert_eq!(profile.status, ProfileStatus::Active);
    }
}
