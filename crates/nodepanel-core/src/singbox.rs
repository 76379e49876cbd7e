//! Shaping helpers for the sing-box editor.
//!
//! The editor accepts either a full sing-box config or a single inbound; both
//! come out as a full config ready for `sing-box check`/`format`.

use serde_json::{Map, Value, json};

use crate::error::{Error, Result};

/// Top-level keys whose presence marks a document as a full config.
const FULL_CONFIG_KEYS: &[&str] = &["inbounds", "outbounds", "route", "dns", "log"];

/// How the editor input should be interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WrapMode {
    /// Full config, passed through.
    Config,
    /// A lone inbound to wrap into a minimal config.
    Inbound,
    /// Decide from the document's top-level keys.
    Auto,
}

impl WrapMode {
    pub fn parse(mode: &str) -> Result<Self> {
        match mode.trim().to_ascii_lowercase().as_str() {
            "config" => Ok(Self::Config),
            "inbound" => Ok(Self::Inbound),
            "" | "auto" => Ok(Self::Auto),
            other => Err(Error::validation(format!("invalid mode {other:?}"))),
        }
    }
}

/// Shape editor input into a full sing-box config.
pub fn wrap_config(raw: &str, mode: WrapMode) -> Result<Value> {
    if raw.trim().is_empty() {
        return Err(Error::validation("config required"));
    }
    let doc: Value = serde_json::from_str(raw).map_err(|_| Error::validation("invalid json"))?;
    let Value::Object(obj) = doc else {
        return Err(Error::validation("invalid json"));
    };

    let full = match mode {
        WrapMode::Config => true,
        WrapMode::Inbound => false,
        WrapMode::Auto => is_full_config(&obj),
    };

    if full {
        Ok(Value::Object(strip_public_ports(obj)))
    } else {
        Ok(json!({
            "log": {"level": "info"},
            "inbounds": [Value::Object(obj)],
            "outbounds": [{"type": "direct", "tag": "direct"}],
        }))
    }
}

fn is_full_config(obj: &Map<String, Value>) -> bool {
    FULL_CONFIG_KEYS.iter().any(|k| obj.contains_key(*k))
}

/// `public_port` is a panel-only field and never reaches sing-box.
fn strip_public_ports(mut obj: Map<String, Value>) -> Map<String, Value> {
    if let Some(Value::Array(inbounds)) = obj.get_mut("inbounds") {
        for inbound in inbounds.iter_mut().filter_map(Value::as_object_mut) {
            inbound.remove("public_port");
        }
    }
    obj
}
