//! Inbound write path: validate, persist, then resync the owning node.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{info, instrument};

use super::error::{PanelError, PanelResult};
use super::{Panel, Synced, page_bounds};
use crate::storage::{Inbound, InboundParams, TriggerSource};
use crate::sync::SyncResult;

#[derive(Debug, Clone, Deserialize)]
pub struct InboundInput {
    pub node_id: i64,
    pub tag: String,
    pub protocol: String,
    pub listen_port: i64,
    #[serde(default)]
    pub public_port: i64,
    #[serde(default)]
    pub settings: Map<String, Value>,
    #[serde(default)]
    pub tls_settings: Map<String, Value>,
    #[serde(default)]
    pub transport_settings: Map<String, Value>,
}

/// Partial inbound update; absent fields keep their stored values.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct InboundPatch {
    pub tag: Option<String>,
    pub protocol: Option<String>,
    pub listen_port: Option<i64>,
    pub public_port: Option<i64>,
    pub settings: Option<Map<String, Value>>,
    pub tls_settings: Option<Map<String, Value>>,
    pub transport_settings: Option<Map<String, Value>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct InboundList {
    pub inbounds: Vec<Inbound>,
    pub total: i64,
}

impl Panel {
    #[instrument(skip(self, input), fields(node_id = input.node_id, tag = %input.tag))]
    pub async fn create_inbound(
        &self,
        input: InboundInput,
    ) -> PanelResult<Synced<Inbound, SyncResult>> {
        let node = self.db.get_node(input.node_id).await?;
        let params = self.inbound_params(
            node.id,
            &input.tag,
            &input.protocol,
            input.listen_port,
            input.public_port,
            &input.settings,
            &input.tls_settings,
            &input.transport_settings,
        )?;

        let inbound = self.db.create_inbound(&params).await?;
        info!(inbound_id = inbound.id, "Inbound created");

        let sync = self
            .engine
            .sync_and_track(&node, Some(TriggerSource::AutoInboundChange), None)
            .await;
        Ok(Synced {
            entity: inbound,
            sync,
        })
    }

    pub async fn get_inbound(&self, id: i64) -> PanelResult<Inbound> {
        Ok(self.db.get_inbound(id).await?)
    }

    pub async fn list_inbounds(
        &self,
        node_id: i64,
        limit: Option<i64>,
        offset: Option<i64>,
    ) -> PanelResult<InboundList> {
        self.db.get_node(node_id).await?;
        let (limit, offset) = page_bounds(limit, offset);
        Ok(InboundList {
            inbounds: self
                .db
                .list_inbounds_for_node(node_id, limit, offset)
                .await?,
            total: self.db.count_node_inbounds(node_id).await?,
        })
    }

    #[instrument(skip(self, patch))]
    pub async fn update_inbound(
        &self,
        id: i64,
        patch: InboundPatch,
    ) -> PanelResult<Synced<Inbound, SyncResult>> {
        let current = self.db.get_inbound(id).await?;

        let settings = match patch.settings {
            Some(settings) => settings,
            None => decode_stored(&current.settings)?,
        };
        let tls = match patch.tls_settings {
            Some(tls) => tls,
            None => decode_stored(&current.tls_settings)?,
        };
        let transport = match patch.transport_settings {
            Some(transport) => transport,
            None => decode_stored(&current.transport_settings)?,
        };
        let params = self.inbound_params(
            current.node_id,
            patch.tag.as_deref().unwrap_or(&current.tag),
            patch.protocol.as_deref().unwrap_or(&current.protocol),
            patch.listen_port.unwrap_or(current.listen_port),
            patch.public_port.unwrap_or(current.public_port),
            &settings,
            &tls,
            &transport,
        )?;

        let inbound = self.db.update_inbound(id, &params).await?;
        info!(inbound_id = id, "Inbound updated");

        let node = self.db.get_node(inbound.node_id).await?;
        let sync = self
            .engine
            .sync_and_track(&node, Some(TriggerSource::AutoInboundChange), None)
            .await;
        Ok(Synced {
            entity: inbound,
            sync,
        })
    }

    #[instrument(skip(self))]
    pub async fn delete_inbound(&self, id: i64) -> PanelResult<Synced<Inbound, SyncResult>> {
        let inbound = self.db.get_inbound(id).await?;
        if !self.db.delete_inbound(id).await? {
            return Err(PanelError::NotFound(format!("Inbound {id} not found")));
        }
        info!(inbound_id = id, node_id = inbound.node_id, "Inbound deleted");

        let node = self.db.get_node(inbound.node_id).await?;
        let sync = self
            .engine
            .sync_and_track(&node, Some(TriggerSource::AutoInboundChange), None)
            .await;
        Ok(Synced {
            entity: inbound,
            sync,
        })
    }

    /// Validate a final inbound shape and encode it for storage.
    #[allow(clippy::too_many_arguments)]
    fn inbound_params(
        &self,
        node_id: i64,
        tag: &str,
        protocol: &str,
        listen_port: i64,
        public_port: i64,
        settings: &Map<String, Value>,
        tls_settings: &Map<String, Value>,
        transport_settings: &Map<String, Value>,
    ) -> PanelResult<InboundParams> {
        let tag = tag.trim();
        if tag.is_empty() {
            return Err(PanelError::validation("tag required"));
        }
        let protocol = protocol.trim().to_ascii_lowercase();
        if protocol.is_empty() {
            return Err(PanelError::validation("protocol required"));
        }
        if !(1..=65_535).contains(&listen_port) {
            return Err(PanelError::validation(format!(
                "listen_port {listen_port} out of range"
            )));
        }
        if !(0..=65_535).contains(&public_port) {
            return Err(PanelError::validation(format!(
                "public_port {public_port} out of range"
            )));
        }
        if settings.is_empty() {
            return Err(PanelError::validation("settings required"));
        }
        self.validators.validate(&protocol, settings)?;

        Ok(InboundParams {
            node_id,
            tag: tag.to_string(),
            protocol,
            listen_port,
            public_port,
            settings: canonical_json(settings)?,
            tls_settings: canonical_json(tls_settings)?,
            transport_settings: canonical_json(transport_settings)?,
        })
    }
}

/// Key-sorted JSON text for a settings object.
fn canonical_json(map: &Map<String, Value>) -> PanelResult<String> {
    serde_json::to_string(map).map_err(|e| PanelError::Internal(e.to_string()))
}

fn decode_stored(raw: &str) -> PanelResult<Map<String, Value>> {
    if raw.trim().is_empty() {
        return Ok(Map::new());
    }
    match serde_json::from_str::<Value>(raw) {
        Ok(Value::Object(map)) => Ok(map),
        _ => Err(PanelError::Internal("stored settings are not a json object".into())),
    }
}
