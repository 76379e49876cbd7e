//! System settings, the display timezone and the panel summary.

use std::sync::{Arc, PoisonError, RwLock};

use chrono::Utc;
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};

use nodepanel_core::system_settings::{
    KEY_SUBSCRIPTION_BASE_URL, KEY_TIMEZONE, validate_subscription_base_url, validate_timezone,
};

use super::Panel;
use super::error::PanelResult;
use crate::storage::PanelDatabase;

/// Process-wide display timezone.
///
/// Loaded from the store at startup and replaced whenever the setting
/// changes, so readers never touch the database.
#[derive(Debug, Clone)]
pub struct TimezoneCell {
    inner: Arc<RwLock<Tz>>,
}

impl Default for TimezoneCell {
    fn default() -> Self {
        Self::new(Tz::UTC)
    }
}

impl TimezoneCell {
    pub fn new(tz: Tz) -> Self {
        Self {
            inner: Arc::new(RwLock::new(tz)),
        }
    }

    /// Build the cell from the persisted setting. A stored value that no
    /// longer resolves falls back to UTC.
    pub async fn load(db: &PanelDatabase) -> PanelResult<Self> {
        let raw = db.get_setting(KEY_TIMEZONE).await?.unwrap_or_default();
        let tz = validate_timezone(&raw).unwrap_or_else(|e| {
            warn!(timezone = %raw, error = %e, "Stored timezone is invalid, using UTC");
            Tz::UTC
        });
        Ok(Self::new(tz))
    }

    pub fn get(&self) -> Tz {
        *self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn set(&self, tz: Tz) {
        *self.inner.write().unwrap_or_else(PoisonError::into_inner) = tz;
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SystemSettings {
    pub subscription_base_url: String,
    pub timezone: String,
}

/// Settings update; absent fields are left unchanged.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SettingsPatch {
    pub subscription_base_url: Option<String>,
    pub timezone: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SystemInfo {
    pub version: String,
    pub server_time: String,
    pub timezone: String,
    pub users: i64,
    pub groups: i64,
    pub nodes: i64,
    pub inbounds: i64,
}

impl Panel {
    pub async fn get_settings(&self) -> PanelResult<SystemSettings> {
        let subscription_base_url = self
            .db
            .get_setting(KEY_SUBSCRIPTION_BASE_URL)
            .await?
            .unwrap_or_default();
        Ok(SystemSettings {
            subscription_base_url,
            timezone: self.timezone.get().name().to_string(),
        })
    }

    /// Validate every field first, then persist. A rejected field leaves
    /// all settings untouched.
    #[instrument(skip(self, patch))]
    pub async fn update_settings(&self, patch: SettingsPatch) -> PanelResult<SystemSettings> {
        let base_url = patch
            .subscription_base_url
            .as_deref()
            .map(validate_subscription_base_url)
            .transpose()?;
        let tz = patch.timezone.as_deref().map(validate_timezone).transpose()?;

        if let Some(url) = &base_url {
            self.db.set_setting(KEY_SUBSCRIPTION_BASE_URL, url).await?;
        }
        if let Some(tz) = tz {
            self.db.set_setting(KEY_TIMEZONE, tz.name()).await?;
            self.timezone.set(tz);
        }
        info!("System settings updated");
        self.get_settings().await
    }

    pub async fn system_info(&self) -> PanelResult<SystemInfo> {
        let tz = self.timezone.get();
        Ok(SystemInfo {
            version: env!("CARGO_PKG_VERSION").to_string(),
            server_time: Utc::now().with_timezone(&tz).to_rfc3339(),
            timezone: tz.name().to_string(),
            users: self.db.count_users().await?,
            groups: self.db.count_groups().await?,
            nodes: self.db.count_nodes().await?,
            inbounds: self.db.count_inbounds().await?,
        })
    }
}
