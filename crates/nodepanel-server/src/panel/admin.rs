//! Admin bootstrap, login and token checks.

use serde::Serialize;
use tracing::{info, instrument, warn};

use super::Panel;
use super::error::{PanelError, PanelResult};
use crate::auth::password::{hash_password, verify_password};
use crate::auth::{Claims, JwtManager};
use crate::storage::{KEY_ADMIN_PASSWORD_HASH, KEY_ADMIN_USERNAME};

const MIN_PASSWORD_LEN: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BootstrapStatus {
    pub needs_setup: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct IssuedToken {
    pub token: String,
    pub expires_at: i64,
}

impl Panel {
    pub async fn bootstrap_status(&self) -> PanelResult<BootstrapStatus> {
        let username = self.db.get_setting(KEY_ADMIN_USERNAME).await?;
        Ok(BootstrapStatus {
            needs_setup: username.is_none(),
        })
    }

    /// Create the single admin account and log it in.
    #[instrument(skip(self, password))]
    pub async fn bootstrap(&self, username: &str, password: &str) -> PanelResult<IssuedToken> {
        let username = username.trim();
        if username.is_empty() {
            return Err(PanelError::validation("username required"));
        }
        if password.chars().count() < MIN_PASSWORD_LEN {
            return Err(PanelError::validation(format!(
                "password must be at least {MIN_PASSWORD_LEN} characters"
            )));
        }

        let hash = hash_password(password);
        if !self.db.create_admin(username, &hash).await? {
            return Err(PanelError::Conflict("admin already configured".into()));
        }
        info!(username, "Admin account created");
        issue(&self.jwt)
    }

    #[instrument(skip(self, password))]
    pub async fn login(&self, username: &str, password: &str) -> PanelResult<IssuedToken> {
        let Some(stored_user) = self.db.get_setting(KEY_ADMIN_USERNAME).await? else {
            return Err(PanelError::NeedsSetup("admin not configured".into()));
        };
        let stored_hash = self
            .db
            .get_setting(KEY_ADMIN_PASSWORD_HASH)
            .await?
            .unwrap_or_default();

        let user_ok = stored_user == username.trim();
        let pass_ok = verify_password(password, &stored_hash);
        if !(user_ok && pass_ok) {
            warn!("Rejected admin login");
            return Err(PanelError::Unauthenticated("invalid credentials".into()));
        }
        issue(&self.jwt)
    }

    /// Validate a bearer token.
    pub fn authenticate(&self, token: &str) -> PanelResult<Claims> {
        self.jwt
            .validate(token)
            .map_err(|_| PanelError::Unauthenticated("invalid token".into()))
    }
}

fn issue(jwt: &JwtManager) -> PanelResult<IssuedToken> {
    let (token, expires_at) = jwt
        .issue()
        .map_err(|e| PanelError::Internal(format!("issue token: {e}")))?;
    Ok(IssuedToken { token, expires_at })
}
