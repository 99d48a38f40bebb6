//! Identifier Value Objects
//!
//! Backed by the kernel's typed UUID so other services agree on the wire form.

pub use kernel::id::{AccountId, ProfileId};
