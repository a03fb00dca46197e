//! Credential and token services: argon2id password hashing, single-purpose
//! signed tokens, and the request extractors built on them.

pub mod extract;
pub mod password;
pub mod tokens;

pub use extract::{AuthUser, ConfirmedUser};
pub use tokens::{TokenPurpose, TokenService};
