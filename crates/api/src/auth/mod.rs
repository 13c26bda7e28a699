//! Authentication primitives.
//!
//! - [`password`]: Argon2id hashing and verification.
//! - [`jwt`]: access-token generation and validation.
//! - [`bootstrap`]: seeding the first super-admin.

pub mod bootstrap;
pub mod jwt;
pub mod password;
