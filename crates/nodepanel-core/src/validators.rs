//! Per-protocol validation hooks for inbound settings.
//!
//! The registry is created once at startup (`SettingsValidators::with_builtins`)
//! and shared behind an `Arc`. Lookups take a read lock; registration takes the
//! write lock and is expected to be rare.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use serde_json::{Map, Value};

use crate::error::{Error, Result};

/// A settings validator: inspects a decoded settings object.
pub type SettingsValidator = Arc<dyn Fn(&Map<String, Value>) -> Result<()> + Send + Sync>;

/// Shadowsocks 2022 ciphers that support multiple users on one inbound.
pub const SHADOWSOCKS_2022_MULTI_USER_METHODS: &[&str] =
    &["2022-blake3-aes-128-gcm", "2022-blake3-aes-256-gcm"];

/// Process-wide mapping from lowercased protocol name to validator.
pub struct SettingsValidators {
    validators: RwLock<HashMap<String, SettingsValidator>>,
}

impl SettingsValidators {
    /// An empty registry: every protocol validates.
    pub fn new() -> Self {
        Self {
            validators: RwLock::new(HashMap::new()),
        }
    }

    /// A registry with the built-in validators installed.
    pub fn with_builtins() -> Self {
        let registry = Self::new();
        registry.register("shadowsocks", Arc::new(validate_shadowsocks));
        registry
    }

    /// Install or replace the validator for `protocol`. Blank names are ignored.
    pub fn register(&self, protocol: &str, validator: SettingsValidator) {
        let key = normalize(protocol);
        if key.is_empty() {
            return;
        }
        self.validators
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key, validator);
    }

    /// Validate `settings` for `protocol`. Unknown protocols pass.
    pub fn validate(&self, protocol: &str, settings: &Map<String, Value>) -> Result<()> {
        let validator = self
            .validators
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&normalize(protocol))
            .cloned();
        match validator {
            Some(validate) => validate(settings),
            None => Ok(()),
        }
    }

    pub fn is_registered(&self, protocol: &str) -> bool {
        self.validators
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(&normalize(protocol))
    }
}

impl Default for SettingsValidators {
    fn default() -> Self {
        Self::with_builtins()
    }
}

fn normalize(protocol: &str) -> String {
    protocol.trim().to_ascii_lowercase()
}

fn validate_shadowsocks(settings: &Map<String, Value>) -> Result<()> {
    let method = settings
        .get("method")
        .and_then(Value::as_str)
        .map(str::trim)
        .unwrap_or_default();
    if method.is_empty() {
        return Err(Error::validation("settings.method required"));
    }
    if method.starts_with("2022-") && !SHADOWSOCKS_2022_MULTI_USER_METHODS.contains(&method) {
        return Err(Error::validation(format!(
            "shadowsocks method {method} does not support multi-user mode"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn map(v: Value) -> Map<String, Value> {
        v.as_object().cloned().unwrap()
    }

    #[test]
    fn shadowsocks_requires_method() {
        let registry = SettingsValidators::with_builtins();
        let err = registry.validate("shadowsocks", &Map::new()).unwrap_err();
        assert!(err.to_string().contains("settings.method required"));
    }

    #[test]
    fn shadowsocks_rejects_single_user_2022_method() {
        let registry = SettingsValidators::with_builtins();
        let err = registry
            .validate(
                "shadowsocks",
                &map(json!({"method": "2022-blake3-chacha20-poly1305"})),
            )
            .unwrap_err();
        assert!(err.to_string().contains("does not support multi-user mode"));
    }

    #[test]
    fn shadowsocks_accepts_multi_user_2022_method() {
        let registry = SettingsValidators::with_builtins();
        registry
            .validate("shadowsocks", &map(json!({"method": "2022-blake3-aes-128-gcm"})))
            .unwrap();
        registry
            .validate("shadowsocks", &map(json!({"method": "chacha20-ietf-poly1305"})))
            .unwrap();
    }

    #[test]
    fn lookup_trims_and_lowercases() {
        let registry = SettingsValidators::with_builtins();
        assert!(registry.is_registered("  ShadowSocks "));
        assert!(registry.validate(" SHADOWSOCKS", &Map::new()).is_err());
    }

    #[test]
    fn unknown_protocol_is_permissive() {
        let registry = SettingsValidators::with_builtins();
        registry.validate("vless", &Map::new()).unwrap();
    }

    #[test]
    fn blank_registration_is_ignored() {
        let registry = SettingsValidators::new();
        registry.register("   ", Arc::new(|_| Err(Error::validation("never"))));
        registry.validate("", &Map::new()).unwrap();
        assert!(!registry.is_registered(""));
    }

    #[test]
    fn custom_validator_replaces_builtin() {
        let registry = SettingsValidators::with_builtins();
        registry.register("Shadowsocks", Arc::new(|_| Ok(())));
        registry.validate("shadowsocks", &Map::new()).unwrap();
    }
}
