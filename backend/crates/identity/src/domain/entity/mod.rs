//! Entity Module

pub mod account;
pub mod profile;
pub mod profile_details;
pub mod refresh_token;

pub use account::{Account, AccountState, LockoutPolicy};
pub use profile::Profile;
pub use profile_details::{
    AdminDetails, AdminPatch, DoctorDetails, DoctorPatch, DoctorVerification, PatientDetails,
    PatientPatch, ProfileDetails, ProfilePatch,
};
pub use refresh_token::RefreshToken;
