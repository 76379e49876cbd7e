//! Admin authentication.
//!
//! Provides JWT token management and PBKDF2 password hashing.

pub mod claims;
pub mod jwt;
pub mod password;

pub use claims::{ADMIN_SUBJECT, Claims};
pub use jwt::JwtManager;
