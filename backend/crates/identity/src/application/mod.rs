//! Application Layer
//!
//! Use cases and application services.

pub mod account_admin;
pub mod authenticate;
pub mod authorization;
pub mod config;
mod password_hasher;
pub mod profile_admin;
pub mod refresh_session;
pub mod refresh_token_store;
pub mod register;
pub mod self_service;
pub mod session;
pub mod sign_out;
pub mod token_issuer;

// Re-exports
pub use account_admin::AccountAdminUseCase;
pub use authenticate::{AuthenticateInput, AuthenticateUseCase};
pub use authorization::{Principal, authorize};
pub use config::IdentityConfig;
pub use profile_admin::ProfileAdminUseCase;
pub use refresh_session::RefreshSessionUseCase;
pub use refresh_token_store::RefreshTokenStore;
pub use register::{RegisterInput, RegisterUseCase};
pub use self_service::SelfServiceUseCase;
pub use session::SessionOutput;
pub use sign_out::SignOutUseCase;
pub use token_issuer::{AccessClaims, IssuedAccessToken, TokenIssuer};
