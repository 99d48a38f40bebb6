//! Value Object Module

pub mod account_role;
pub mod email;
pub mod ids;
pub mod profile_status;
pub mod user_name;
pub mod user_password;

pub use account_role::AccountRole;
pub use email::Email;
pub use ids::{AccountId, ProfileId};
pub use profile_status::ProfileStatus;
pub use user_name::UserName;
pub use user_password::{RawPassword, UserPassword};
