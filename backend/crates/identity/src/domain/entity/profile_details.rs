//! Role-specific profile data
//!
//! `ProfileDetails` is a closed sum over the three roles; each variant owns
//! its own field set. Patches carry only the fields a caller wants to set and
//! are used both for the initial registration payload and for later updates.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::value_object::{AccountId, AccountRole};
use crate::error::{IdentityError, IdentityResult};

pub const DEFAULT_CONSULTATION_MINUTES: u32 = 30;
pub const ADMIN_ACCESS_LEVELS: std::ops::RangeInclusive<u8> = 1..=5;

/// Copy every `Some` field of a patch onto the target, converting
/// `T` into `Option<T>` where the target field is optional.
macro_rules! merge_fields {
    ($target:expr, $patch:expr; $($field:ident),+ $(,)?) => {
        $(
            if let Some(value) = $patch.$field {
                $target.$field = value.into();
            }
        )+
    };
}

// ============================================================================
// Patient
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PatientDetails {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub date_of_birth: Option<NaiveDate>,
    pub gender: Option<String>,
    pub address: Option<String>,
    pub insurance_provider: Option<String>,
    pub insurance_policy_number: Option<String>,
    pub insurance_group_number: Option<String>,
    pub blood_group: Option<String>,
    pub allergies: Option<String>,
    pub medical_conditions: Option<String>,
    pub emergency_contact_name: Option<String>,
    pub emergency_contact_phone: Option<String>,
    pub emergency_contact_relation: Option<String>,
    pub preferred_language: String,
    pub communication_preference: String,
    pub gdpr_consent: bool,
    pub terms_accepted: bool,
    pub privacy_policy_accepted: bool,
    pub medical_history_access_granted: bool,
    pub notifications_enabled: bool,
}

impl Default for PatientDetails {
    fn default() -> Self {
        Self {
            first_name: None,
            last_name: None,
            date_of_birth: None,
            gender: None,
            address: None,
            insurance_provider: None,
            insurance_policy_number: None,
            insurance_group_number: None,
            blood_group: None,
            allergies: None,
            medical_conditions: None,
            emergency_contact_name: None,
            emergency_contact_phone: None,
            emergency_contact_relation: None,
            preferred_language: "en".to_string(),
            communication_preference: "EMAIL".to_string(),
            gdpr_consent: false,
            terms_accepted: false,
            privacy_policy_accepted: false,
            medical_history_access_granted: false,
            notifications_enabled: true,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PatientPatch {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub date_of_birth: Option<NaiveDate>,
    pub gender: Option<String>,
    pub address: Option<String>,
    pub insurance_provider: Option<String>,
    pub insurance_policy_number: Option<String>,
    pub insurance_group_number: Option<String>,
    pub blood_group: Option<String>,
    pub allergies: Option<String>,
    pub medical_conditions: Option<String>,
    pub emergency_contact_name: Option<String>,
    pub emergency_contact_phone: Option<String>,
    pub emergency_contact_relation: Option<String>,
    pub preferred_language: Option<String>,
    pub communication_preference: Option<String>,
    pub gdpr_consent: Option<bool>,
    pub terms_accepted: Option<bool>,
    pub privacy_policy_accepted: Option<bool>,
    pub medical_history_access_granted: Option<bool>,
    pub notifications_enabled: Option<bool>,
}

impl PatientDetails {
    fn apply(&mut self, patch: PatientPatch) {
        merge_fields!(self, patch;
            first_name, last_name, date_of_birth, gender, address,
            insurance_provider, insurance_policy_number, insurance_group_number,
            blood_group, allergies, medical_conditions,
            emergency_contact_name, emergency_contact_phone, emergency_contact_relation,
            preferred_language, communication_preference,
            gdpr_consent, terms_accepted, privacy_policy_accepted,
            medical_history_access_granted, notifications_enabled,
        );
    }

    fn validate(&self) -> IdentityResult<()> {
        if self.preferred_language.trim().is_empty() {
            return Err(IdentityError::policy("Preferred language cannot be blank"));
        }
        Ok(())
    }
}

// ============================================================================
// Doctor
// ============================================================================

/// Outcome of the admin verification workflow
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DoctorVerification {
    pub verified: bool,
    pub verified_at: Option<DateTime<Utc>>,
    pub verified_by: Option<AccountId>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DoctorDetails {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub license_number: String,
    pub license_issuing_body: Option<String>,
    pub specialization: Option<String>,
    pub department: Option<String>,
    pub qualifications: Option<String>,
    pub clinic_address: Option<String>,
    pub consultation_fee: Option<f64>,
    pub consultation_duration_minutes: u32,
    pub max_patients_per_day: Option<u32>,
    pub years_of_experience: Option<u32>,
    pub languages: Vec<String>,
    pub accepting_new_patients: bool,
    pub verification: DoctorVerification,
}

impl Default for DoctorDetails {
    fn default() -> Self {
        Self {
            first_name: None,
            last_name: None,
            license_number: String::new(),
            license_issuing_body: None,
            specialization: None,
            department: None,
            qualifications: None,
            clinic_address: None,
            consultation_fee: None,
            consultation_duration_minutes: DEFAULT_CONSULTATION_MINUTES,
            max_patients_per_day: None,
            years_of_experience: None,
            languages: Vec::new(),
            accepting_new_patients: true,
            verification: DoctorVerification::default(),
        }
    }
}

/// Verification is deliberately absent: only the admin workflow sets it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DoctorPatch {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub license_number: Option<String>,
    pub license_issuing_body: Option<String>,
    pub specialization: Option<String>,
    pub department: Option<String>,
    pub qualifications: Option<String>,
    pub clinic_address: Option<String>,
    pub consultation_fee: Option<f64>,
    pub consultation_duration_minutes: Option<u32>,
    pub max_patients_per_day: Option<u32>,
    pub years_of_experience: Option<u32>,
    pub languages: Option<Vec<String>>,
    pub accepting_new_patients: Option<bool>,
}

impl DoctorDetails {
    fn apply(&mut self, patch: DoctorPatch) {
        merge_fields!(self, patch;
            first_name, last_name, license_issuing_body, specialization,
            department, qualifications, clinic_address, consultation_fee,
            consultation_duration_minutes, max_patients_per_day, years_of_experience,
            languages, accepting_new_patients,
        );
        if let Some(license_number) = patch.license_number {
            self.license_number = license_number.trim().to_string();
        }
    }

    fn validate(&self) -> IdentityResult<()> {
        if self.license_number.trim().is_empty() {
            return Err(IdentityError::policy("License number is required for doctors"));
        }
        if self.consultation_fee.is_some_and(|fee| !fee.is_finite() || fee < 0.0) {
            return Err(IdentityError::policy("Consultation fee must be a non-negative amount"));
        }
        if self.consultation_duration_minutes == 0 {
            return Err(IdentityError::policy("Consultation duration must be positive"));
        }
        Ok(())
    }
}

// ============================================================================
// Admin
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AdminDetails {
    pub department: Option<String>,
    pub access_level: u8,
    pub organization_code: Option<String>,
    pub location: Option<String>,
    pub cost_center: Option<String>,
    pub mfa_enabled: bool,
    pub audit_access_enabled: bool,
}

impl Default for AdminDetails {
    fn default() -> Self {
        Self {
            department: None,
            access_level: *ADMIN_ACCESS_LEVELS.start(),
            organization_code: None,
            location: None,
            cost_center: None,
            mfa_enabled: false,
            audit_access_enabled: false,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AdminPatch {
    pub department: Option<String>,
    pub access_level: Option<u8>,
    pub organization_code: Option<String>,
    pub location: Option<String>,
    pub cost_center: Option<String>,
    pub mfa_enabled: Option<bool>,
    pub audit_access_enabled: Option<bool>,
}

impl AdminDetails {
    fn apply(&mut self, patch: AdminPatch) {
        merge_fields!(self, patch;
            department, access_level, organization_code, location, cost_center,
            mfa_enabled, audit_access_enabled,
        );
    }

    fn validate(&self) -> IdentityResult<()> {
        if !ADMIN_ACCESS_LEVELS.contains(&self.access_level) {
            return Err(IdentityError::policy(format!(
                "Access level must be between {} and {}",
                ADMIN_ACCESS_LEVELS.start(),
                ADMIN_ACCESS_LEVELS.end()
            )));
        }
        Ok(())
    }
}

// ============================================================================
// Sum types
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "role", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProfileDetails {
    Patient(PatientDetails),
    Doctor(DoctorDetails),
    Admin(AdminDetails),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "role", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProfilePatch {
    Patient(PatientPatch),
    Doctor(DoctorPatch),
    Admin(AdminPatch),
}

impl ProfilePatch {
    pub fn role(&self) -> AccountRole {
        match self {
            ProfilePatch::Patient(_) => AccountRole::Patient,
            ProfilePatch::Doctor(_) => AccountRole::Doctor,
            ProfilePatch::Admin(_) => AccountRole::Admin,
        }
    }
}

impl ProfileDetails {
    /// Defaults for `role` with the optional registration payload applied,
    /// validated. A payload for a different role is rejected.
    pub fn for_role(role: AccountRole, patch: Option<ProfilePatch>) -> IdentityResult<Self> {
        let mut details = match role {
            AccountRole::Patient => ProfileDetails::Patient(PatientDetails::default()),
            AccountRole::Doctor => ProfileDetails::Doctor(DoctorDetails::default()),
            AccountRole::Admin => ProfileDetails::Admin(AdminDetails::default()),
        };
        if let Some(patch) = patch {
            details.apply(patch)?;
        }
        details.validate()?;
        Ok(details)
    }

    pub fn role(&self) -> AccountRole {
        match self {
            ProfileDetails::Patient(_) => AccountRole::Patient,
            ProfileDetails::Doctor(_) => AccountRole::Doctor,
            ProfileDetails::Admin(_) => AccountRole::Admin,
        }
    }

    /// Merge `patch` in place. Does not validate; see [`validate`](Self::validate).
    pub fn apply(&mut self, patch: ProfilePatch) -> IdentityResult<()> {
        match (self, patch) {
            (ProfileDetails::Patient(d), ProfilePatch::Patient(p)) => d.apply(p),
            (ProfileDetails::Doctor(d), ProfilePatch::Doctor(p)) => d.apply(p),
            (ProfileDetails::Admin(d), ProfilePatch::Admin(p)) => d.apply(p),
            (details, patch) => {
                return Err(IdentityError::policy(format!(
                    "{} profile details cannot be applied to a {} profile",
                    patch.role(),
                    details.role()
                )));
            }
        }
        Ok(())
    }

    pub fn validate(&self) -> IdentityResult<()> {
        match self {
            ProfileDetails::Patient(d) => d.validate(),
            ProfileDetails::Doctor(d) => d.validate(),
            ProfileDetails::Admin(d) => d.validate(),
        }
    }

    pub fn as_doctor_mut(&mut self) -> Option<&mut DoctorDetails> {
        match self {
            ProfileDetails::Doctor(d) => Some(d),
            _ => None,
        }
    }
}
