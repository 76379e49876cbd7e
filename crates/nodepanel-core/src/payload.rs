//! Sync payload construction.
//!
//! Turns a node's inbound rows plus the active users of its group into the
//! sing-box inbound list pushed to the node agent. Output is deterministic for
//! a given input: inbounds are ordered by id, users by id, and JSON objects are
//! key-sorted, so the SHA-256 of the encoding identifies a configuration.

use std::collections::HashSet;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use sha2::{Digest, Sha256};

use crate::error::{Error, Result};
use crate::model::{Inbound, Node, User};

/// Keys the builder owns; values from stored settings are dropped.
const RESERVED_KEYS: &[&str] = &[
    "type",
    "tag",
    "listen_port",
    "users",
    "tls",
    "transport",
    "public_port",
];

/// The configuration snapshot a node should run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SyncPayload {
    pub inbounds: Vec<Value>,
}

impl SyncPayload {
    /// A payload that drains every inbound from the node.
    pub const fn empty() -> Self {
        Self {
            inbounds: Vec::new(),
        }
    }

    pub fn to_canonical_json(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }

    /// Lowercase hex SHA-256 of the canonical encoding.
    pub fn hash(&self) -> Result<String> {
        let digest = Sha256::digest(self.to_canonical_json()?);
        Ok(format!("{digest:x}"))
    }
}

/// Build the payload for `node` from its inbounds and the active users of its group.
pub fn build_payload(node: &Node, inbounds: &[Inbound], users: &[User]) -> Result<SyncPayload> {
    let mut inbounds: Vec<&Inbound> = inbounds.iter().collect();
    inbounds.sort_by_key(|i| i.id);
    let mut users: Vec<&User> = users.iter().collect();
    users.sort_by_key(|u| u.id);

    let mut tags = HashSet::new();
    let mut rendered = Vec::with_capacity(inbounds.len());
    for inbound in inbounds {
        if inbound.node_id != node.id {
            return Err(Error::validation(format!(
                "inbound {} belongs to node {}, not node {}",
                inbound.tag, inbound.node_id, node.id
            )));
        }
        if !tags.insert(inbound.tag.as_str()) {
            return Err(Error::validation(format!(
                "duplicate inbound tag {}",
                inbound.tag
            )));
        }
        rendered.push(render_inbound(inbound, &users)?);
    }

    Ok(SyncPayload { inbounds: rendered })
}

fn render_inbound(inbound: &Inbound, users: &[&User]) -> Result<Value> {
    let protocol = inbound.protocol.trim().to_ascii_lowercase();
    if protocol.is_empty() {
        return Err(Error::validation(format!(
            "inbound {} protocol required",
            inbound.tag
        )));
    }
    let port = u16::try_from(inbound.listen_port)
        .ok()
        .filter(|p| *p != 0)
        .ok_or_else(|| {
            Error::validation(format!(
                "inbound {} listen_port {} out of range",
                inbound.tag, inbound.listen_port
            ))
        })?;

    let mut settings = decode_object(&inbound.tag, "settings", &inbound.settings)?;
    let tls = decode_object(&inbound.tag, "tls_settings", &inbound.tls_settings)?;
    let transport = decode_object(&inbound.tag, "transport_settings", &inbound.transport_settings)?;

    // vless flow is a per-user field in sing-box.
    let flow = if protocol == "vless" {
        settings.remove("flow").and_then(|v| v.as_str().map(str::to_string))
    } else {
        None
    };
    let ss_method = settings
        .get("method")
        .and_then(Value::as_str)
        .map(str::to_string);

    let mut out = Map::new();
    for (key, value) in settings {
        if !RESERVED_KEYS.contains(&key.as_str()) {
            out.insert(key, value);
        }
    }
    out.insert("type".into(), Value::String(protocol.clone()));
    out.insert("tag".into(), Value::String(inbound.tag.clone()));
    out.entry("listen").or_insert_with(|| Value::String("::".into()));
    out.insert("listen_port".into(), Value::from(port));

    let user_list: Option<Vec<Value>> = match protocol.as_str() {
        "vless" => Some(
            users
                .iter()
                .map(|u| {
                    let mut entry = json!({"name": u.username, "uuid": u.uuid});
                    if let Some(flow) = flow.as_deref().filter(|f| !f.is_empty()) {
                        entry["flow"] = Value::String(flow.to_string());
                    }
                    entry
                })
                .collect(),
        ),
        "vmess" => Some(
            users
                .iter()
                .map(|u| json!({"name": u.username, "uuid": u.uuid, "alterId": 0}))
                .collect(),
        ),
        "tuic" => Some(
            users
                .iter()
                .map(|u| json!({"name": u.username, "uuid": u.uuid, "password": u.uuid}))
                .collect(),
        ),
        "trojan" | "hysteria2" | "anytls" => Some(
            users
                .iter()
                .map(|u| json!({"name": u.username, "password": u.uuid}))
                .collect(),
        ),
        "hysteria" => Some(
            users
                .iter()
                .map(|u| json!({"name": u.username, "auth_str": u.uuid}))
                .collect(),
        ),
        "naive" | "socks" | "http" | "mixed" => Some(
            users
                .iter()
                .map(|u| json!({"username": u.username, "password": u.uuid}))
                .collect(),
        ),
        "shadowsocks" => match ss_method.as_deref() {
            Some(method) if method.starts_with("2022-") => Some(
                users
                    .iter()
                    .map(|u| {
                        json!({"name": u.username, "password": shadowsocks_2022_key(method, &u.uuid)})
                    })
                    .collect(),
            ),
            // Legacy ciphers are single-user; the inbound password is used as-is.
            _ => None,
        },
        _ => None,
    };
    if let Some(list) = user_list {
        out.insert("users".into(), Value::Array(list));
    }
    if !tls.is_empty() {
        out.insert("tls".into(), Value::Object(tls));
    }
    if !transport.is_empty() {
        out.insert("transport".into(), Value::Object(transport));
    }

    Ok(Value::Object(out))
}

fn decode_object(tag: &str, field: &str, raw: &str) -> Result<Map<String, Value>> {
    if raw.trim().is_empty() {
        return Ok(Map::new());
    }
    match serde_json::from_str::<Value>(raw) {
        Ok(Value::Object(map)) => Ok(map),
        _ => Err(Error::validation(format!(
            "inbound {tag} {field}: invalid json object"
        ))),
    }
}

/// Derive a per-user shadowsocks 2022 key from the user's uuid.
///
/// The key length follows the cipher: 16 bytes for aes-128, 32 otherwise.
pub fn shadowsocks_2022_key(method: &str, user_uuid: &str) -> String {
    let digest = Sha256::digest(user_uuid.as_bytes());
    let len = if method.contains("aes-128") { 16 } else { 32 };
    STANDARD.encode(&digest[..len])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{NodeStatus, UserStatus};

    fn node(id: i64) -> Node {
        Node {
            id,
            uuid: format!("node-{id}"),
            name: format!("node-{id}"),
            api_address: "127.0.0.1".into(),
            api_port: 9090,
            secret_key: "secret".into(),
            public_address: "203.0.113.10".into(),
            status: NodeStatus::Unknown,
            group_id: Some(1),
            last_seen_at: None,
            created_at: 0,
            updated_at: 0,
        }
    }

    fn inbound(id: i64, node_id: i64, tag: &str, protocol: &str, settings: &str) -> Inbound {
        Inbound {
            id,
            uuid: format!("inbound-{id}"),
            node_id,
            tag: tag.into(),
            protocol: protocol.into(),
            listen_port: 10_000 + id,
            public_port: 443,
            settings: settings.into(),
            tls_settings: "{}".into(),
            transport_settings: "{}".into(),
            created_at: 0,
            updated_at: 0,
        }
    }

    fn user(id: i64, name: &str) -> User {
        User {
            id,
            uuid: format!("00000000-0000-4000-8000-00000000000{id}"),
            username: name.into(),
            traffic_limit: 0,
            traffic_used: 0,
            traffic_reset_day: 0,
            status: UserStatus::Active,
            expire_at: None,
            created_at: 0,
            updated_at: 0,
        }
    }

    #[test]
    fn vless_inbound_carries_users_and_flow() {
        let payload = build_payload(
            &node(1),
            &[inbound(1, 1, "vless-in", "VLESS", r#"{"flow":"xtls-rprx-vision"}"#)],
            &[user(2, "bob"), user(1, "alice")],
        )
        .unwrap();

        let ib = &payload.inbounds[0];
        assert_eq!(ib["type"], "vless");
        assert_eq!(ib["tag"], "vless-in");
        assert_eq!(ib["listen"], "::");
        assert_eq!(ib["listen_port"], 10_001);
        assert!(ib.get("flow").is_none());
        let users = ib["users"].as_array().unwrap();
        assert_eq!(users[0]["name"], "alice");
        assert_eq!(users[1]["name"], "bob");
        assert_eq!(users[0]["flow"], "xtls-rprx-vision");
    }

    #[test]
    fn output_is_deterministic_and_hash_stable() {
        let inbounds = [
            inbound(2, 1, "b", "trojan", r#"{"z":1,"a":2}"#),
            inbound(1, 1, "a", "vmess", "{}"),
        ];
        let users = [user(1, "alice"), user(2, "bob")];
        let first = build_payload(&node(1), &inbounds, &users).unwrap();

        let mut reversed = inbounds.to_vec();
        reversed.reverse();
        let mut users_rev = users.to_vec();
        users_rev.reverse();
        let second = build_payload(&node(1), &reversed, &users_rev).unwrap();

        assert_eq!(first, second);
        assert_eq!(first.hash().unwrap(), second.hash().unwrap());
        assert_eq!(first.inbounds[0]["tag"], "a");
        assert_eq!(first.hash().unwrap().len(), 64);
    }

    #[test]
    fn shadowsocks_2022_users_get_sized_keys() {
        let payload = build_payload(
            &node(1),
            &[inbound(
                1,
                1,
                "ss",
                "shadowsocks",
                r#"{"method":"2022-blake3-aes-128-gcm","password":"c2VydmVyLWtleS0xNmJ5dA=="}"#,
            )],
            &[user(1, "alice")],
        )
        .unwrap();
        let key = payload.inbounds[0]["users"][0]["password"].as_str().unwrap();
        assert_eq!(STANDARD.decode(key).unwrap().len(), 16);
        assert_eq!(payload.inbounds[0]["password"], "c2VydmVyLWtleS0xNmJ5dA==");
    }

    #[test]
    fn legacy_shadowsocks_has_no_user_list() {
        let payload = build_payload(
            &node(1),
            &[inbound(1, 1, "ss", "shadowsocks", r#"{"method":"aes-256-gcm","password":"p"}"#)],
            &[user(1, "alice")],
        )
        .unwrap();
        assert!(payload.inbounds[0].get("users").is_none());
    }

    #[test]
    fn panel_only_and_reserved_keys_are_dropped() {
        let payload = build_payload(
            &node(1),
            &[inbound(1, 1, "t", "trojan", r#"{"public_port":8443,"tag":"spoof","type":"x"}"#)],
            &[],
        )
        .unwrap();
        let ib = &payload.inbounds[0];
        assert!(ib.get("public_port").is_none());
        assert_eq!(ib["tag"], "t");
        assert_eq!(ib["type"], "trojan");
        assert_eq!(ib["users"].as_array().unwrap().len(), 0);
    }

    #[test]
    fn tls_and_transport_are_nested_when_present() {
        let mut ib = inbound(1, 1, "t", "trojan", "{}");
        ib.tls_settings = r#"{"enabled":true,"server_name":"example.com"}"#.into();
        ib.transport_settings = r#"{"type":"ws","path":"/ws"}"#.into();
        let payload = build_payload(&node(1), &[ib], &[]).unwrap();
        assert_eq!(payload.inbounds[0]["tls"]["server_name"], "example.com");
        assert_eq!(payload.inbounds[0]["transport"]["type"], "ws");
    }

    #[test]
    fn foreign_inbound_is_rejected() {
        let err = build_payload(&node(1), &[inbound(1, 2, "x", "vless", "{}")], &[]).unwrap_err();
        assert!(err.to_string().contains("belongs to node 2"));
    }

    #[test]
    fn duplicate_tag_is_rejected() {
        let err = build_payload(
            &node(1),
            &[
                inbound(1, 1, "dup", "vless", "{}"),
                inbound(2, 1, "dup", "vmess", "{}"),
            ],
            &[],
        )
        .unwrap_err();
        assert!(err.to_string().contains("duplicate inbound tag dup"));
    }

    #[test]
    fn bad_port_and_bad_settings_are_rejected() {
        let mut ib = inbound(1, 1, "p", "vless", "{}");
        ib.listen_port = 70_000;
        assert!(build_payload(&node(1), &[ib], &[]).is_err());

        let ib = inbound(1, 1, "s", "vless", "[1,2]");
        let err = build_payload(&node(1), &[ib], &[]).unwrap_err();
        assert!(err.to_string().contains("invalid json object"));
    }

    #[test]
    fn empty_payload_serializes_to_empty_list() {
        let json = String::from_utf8(SyncPayload::empty().to_canonical_json().unwrap()).unwrap();
        assert_eq!(json, r#"{"inbounds":[]}"#);
    }
}
