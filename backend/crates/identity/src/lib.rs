//! Identity (Account & Authentication) Backend Module
//!
//! Clean Architecture structure:
//! - `domain/` - Entities, value objects, repository traits
//! - `application/` - Use cases, token issuing, authorization
//! - `infra/` - PostgreSQL and in-memory repositories
//! - `presentation/` - HTTP handlers, DTOs, router, bearer middleware
//!
//! ## Features
//! - Registration of patients, doctors and admins with a role-matched profile
//! - Username + password login with automatic lockout after repeated failures
//! - Short-lived HS256 access tokens, rotating opaque refresh tokens
//! - Admin account lifecycle (activate, lock, soft delete) and doctor verification
//!
//! ## Security Model
//! - Passwords hashed with Argon2id (NIST SP 800-63B policy, optional pepper)
//! - Only the SHA-256 digest of a refresh token is stored
//! - Account and profile writes are optimistic-version checked
//! - Unknown user and wrong password are indistinguishable to the caller

pub mod application;
pub mod domain;
pub mod error;
pub mod infra;
pub mod presentation;


// Re-exports for convenience
pub use application::config::IdentityConfig;
pub use error::{IdentityError, IdentityResult};
pub use infra::{InMemoryIdentityRepository, PgIdentityRepository};
pub use presentation::router::{identity_router, identity_router_generic};

// Re-export kernel error types for unified error handling
pub use kernel::error::{app_error::AppError, kind::ErrorKind};

pub mod models {
    pub use crate::domain::entity::*;
    pub use crate::domain::value_object::*;
    pub use crate::presentation::dto::*;
}
