//! Platform Crate - Technical Infrastructure
//!
//! Shared technical foundations with no knowledge of accounts or roles:
//! - Cryptographic utilities (random tokens, SHA-256, Base64)
//! - Password policy and hashing (Argon2id, zeroized clear text)
//! - HS256 JWT signing and verification

pub mod crypto;
pub mod jwt;
pub mod password;
