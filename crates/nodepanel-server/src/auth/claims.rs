//! JWT claims structure for admin tokens.

use serde::{Deserialize, Serialize};

/// The only subject the panel issues tokens for.
pub const ADMIN_SUBJECT: &str = "admin";

/// JWT claims embedded in admin tokens.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject, always [`ADMIN_SUBJECT`].
    pub sub: String,
    /// Issued at (unix timestamp).
    pub iat: i64,
    /// Expiration (unix timestamp).
    pub exp: i64,
}

impl Claims {
    pub fn is_admin(&self) -> bool {
        self.sub == ADMIN_SUBJECT
    }
}
