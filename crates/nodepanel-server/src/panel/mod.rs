//! Panel operations: the write paths that persist catalog changes and then
//! bring the affected nodes up to date, plus the read views behind the
//! procedure surface.

mod admin;
mod error;
mod groups;
mod inbounds;
mod nodes;
mod sync_jobs;
mod system;
mod traffic;
mod users;


use std::sync::Arc;

use serde::Serialize;

use nodepanel_core::SettingsValidators;

use crate::auth::JwtManager;
use crate::storage::PanelDatabase;
use crate::sync::SyncEngine;

pub use admin::{BootstrapStatus, IssuedToken};
pub use error::{PanelError, PanelResult};
pub use groups::{GroupInput, GroupList};
pub use inbounds::{InboundInput, InboundList, InboundPatch};
pub use nodes::{NodeHealth, NodeInput, NodeList, NodePatch};
pub use sync_jobs::{SyncJobDetail, SyncJobList};
pub use system::{SettingsPatch, SystemInfo, SystemSettings, TimezoneCell};
pub use traffic::{NodesTraffic, TrafficSeries};
pub use users::{UserInput, UserList, UserPatch, UserView};

/// A stored entity together with the outcome of the syncs it triggered.
#[derive(Debug, Clone, Serialize)]
pub struct Synced<T, S> {
    pub entity: T,
    pub sync: S,
}

/// Shared handle to every panel operation.
#[derive(Clone)]
pub struct Panel {
    db: PanelDatabase,
    engine: SyncEngine,
    validators: Arc<SettingsValidators>,
    jwt: JwtManager,
    timezone: TimezoneCell,
}

impl Panel {
    pub fn new(
        db: PanelDatabase,
        engine: SyncEngine,
        validators: Arc<SettingsValidators>,
        jwt: JwtManager,
        timezone: TimezoneCell,
    ) -> Self {
        Self {
            db,
            engine,
            validators,
            jwt,
            timezone,
        }
    }

    pub const fn db(&self) -> &PanelDatabase {
        &self.db
    }

    pub const fn engine(&self) -> &SyncEngine {
        &self.engine
    }

    pub fn validators(&self) -> &SettingsValidators {
        &self.validators
    }

    pub const fn timezone(&self) -> &TimezoneCell {
        &self.timezone
    }
}

/// Clamp a requested page to sane bounds.
pub(crate) fn page_bounds(limit: Option<i64>, offset: Option<i64>) -> (i64, i64) {
    let limit = limit.filter(|l| *l > 0).unwrap_or(50).min(500);
    let offset = offset.filter(|o| *o > 0).unwrap_or(0);
    (limit, offset)
}

/// Distinguishes an absent field from an explicit `null`.
pub(crate) mod double_option {
    use serde::{Deserialize, Deserializer};

    pub fn deserialize<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
    where
        D: Deserializer<'de>,
        T: Deserialize<'de>,
    {
        Option::<T>::deserialize(deserializer).map(Some)
    }
}
