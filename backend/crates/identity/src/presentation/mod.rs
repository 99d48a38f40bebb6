//! Presentation Layer
//!
//! HTTP handlers, DTOs, router, and middleware.

pub mod dto;
pub mod extract;
pub mod handlers;
pub mod middleware;
pub mod router;

pub use extract::JsonBody;
pub use handlers::IdentityAppState;
pub use middleware::{bearer_token, require_bearer};
pub use router::{identity_router, identity_router_generic};
