//! Password hashing off the async runtime
//!
//! Argon2 is CPU-bound; both directions run on the blocking pool.

use crate::domain::value_object::{RawPassword, UserPassword};
use crate::error::IdentityResult;

pub(crate) async fn hash_password(
    raw: RawPassword,
    pepper: Option<Vec<u8>>,
) -> IdentityResult<UserPassword> {
    tokio::task::spawn_blocking(move || UserPassword::from_raw(&raw, pepper.as_deref())).await?
}

pub(crate) async fn verify_password(
    hash: UserPassword,
    raw: RawPassword,
    pepper: Option<Vec<u8>>,
) -> IdentityResult<bool> {
    let valid =
        tokio::task::spawn_blocking(move || hash.verify(&raw, pepper.as_deref())).await?;
    Ok(valid)
}
