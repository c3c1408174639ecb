//! Authentication configuration and its persistence.
//!
//! Exactly one [`AuthConfig`] is active at a time. The [`AuthStore`] restores
//! it from a [`KvStore`] at startup and writes it back on every change.
//! Storage failures never reach the caller: they are logged and the
//! configuration falls back to [`AuthConfig::None`].

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde::{Deserialize, Serialize};

use crate::store::{self, KvStore};

/// Storage key holding the serialized auth configuration.
pub const AUTH_CONFIG_KEY: &str = "openapi-auth-config";

/// Where an API key is sent.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ApiKeyLocation {
    #[default]
    Header,
    Query,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiKeyAuth {
    pub key: String,
    pub value: String,
    #[serde(default)]
    pub location: ApiKeyLocation,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BasicAuth {
    pub username: String,
    pub password: String,
}

/// The active authentication scheme.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum AuthConfig {
    #[default]
    #[serde(rename = "none")]
    None,
    #[serde(rename = "bearer")]
    Bearer {
        #[serde(rename = "bearerToken", default)]
        token: String,
    },
    #[serde(rename = "apikey")]
    ApiKey {
        #[serde(rename = "apiKey")]
        api_key: ApiKeyAuth,
    },
    #[serde(rename = "basic")]
    Basic {
        #[serde(rename = "basicAuth")]
        basic: BasicAuth,
    },
}

impl AuthConfig {
    pub fn bearer(token: impl Into<String>) -> Self {
        Self::Bearer {
            token: token.into(),
        }
    }

    pub fn api_key(
        key: impl Into<String>,
        value: impl Into<String>,
        location: ApiKeyLocation,
    ) -> Self {
        Self::ApiKey {
            api_key: ApiKeyAuth {
                key: key.into(),
                value: value.into(),
                location,
            },
        }
    }

    pub fn basic(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self::Basic {
            basic: BasicAuth {
                username: username.into(),
                password: password.into(),
            },
        }
    }

    /// Short scheme name, as stored in the `type` tag.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Bearer { .. } => "bearer",
            Self::ApiKey { .. } => "apikey",
            Self::Basic { .. } => "basic",
        }
    }

    /// Concrete headers and query parameters for this configuration.
    pub fn materialize(&self) -> AuthMaterialization {
        let mut out = AuthMaterialization::default();
        match self {
            Self::None => {}
            Self::Bearer { token } => {
                if !token.is_empty() {
                    out.headers
                        .push(("Authorization".to_string(), format!("Bearer {token}")));
                }
            }
            Self::ApiKey { api_key } => {
                let pair = (api_key.key.clone(), api_key.value.clone());
                match api_key.location {
                    ApiKeyLocation::Header => out.headers.push(pair),
                    ApiKeyLocation::Query => out.query.push(pair),
                }
            }
            Self::Basic { basic } => {
                let encoded = BASE64.encode(format!("{}:{}", basic.username, basic.password));
                out.headers
                    .push(("Authorization".to_string(), format!("Basic {encoded}")));
            }
        }
        out
    }
}

/// Headers and query parameters produced from an [`AuthConfig`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuthMaterialization {
    pub headers: Vec<(String, String)>,
    pub query: Vec<(String, String)>,
}

/// Holds the active [`AuthConfig`] and mirrors it into a key-value store.
pub struct AuthStore<S: KvStore> {
    store: S,
    config: AuthConfig,
}

impl<S: KvStore> AuthStore<S> {
    /// Restore the persisted configuration; missing or corrupt data yields `None`.
    pub fn load(store: S) -> Self {
        let config = match store::get_json::<_, AuthConfig>(&store, AUTH_CONFIG_KEY) {
            Ok(Some(config)) => config,
            Ok(None) => AuthConfig::None,
            Err(err) => {
                tracing::warn!(error = %err, "failed to load auth config; using none");
                AuthConfig::None
            }
        };
        tracing::debug!(kind = config.kind(), "auth config loaded");
        Self { store, config }
    }

    pub fn config(&self) -> &AuthConfig {
        &self.config
    }

    /// Replace the active configuration and persist it (best effort).
    pub fn set(&mut self, config: AuthConfig) {
        self.config = config;
        if let Err(err) = store::put_json(&mut self.store, AUTH_CONFIG_KEY, &self.config) {
            tracing::warn!(error = %err, "failed to save auth config");
        }
    }

    pub fn clear(&mut self) {
        self.set(AuthConfig::None);
    }

    pub fn materialize(&self) -> AuthMaterialization {
        self.config.materialize()
    }

    pub fn into_inner(self) -> S {
        self.store
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StoreError;
    use crate::store::MemoryKv;
    use serde_json::json;

    /// Store whose writes always fail.
    struct ReadOnlyKv(MemoryKv);

    impl KvStore for ReadOnlyKv {
        fn put(&mut self, key: &str, _value: Vec<u8>) -> Result<(), StoreError> {
            Err(StoreError::InvalidKey {
                key: key.to_string(),
                reason: "read-only",
            })
        }

        fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
            self.0.get(key)
        }

        fn delete(&mut self, key: &str) -> Result<(), StoreError> {
            self.0.delete(key)
        }
    }

    #[test]
    fn materialize_bearer_sets_authorization_header() {
        let m = AuthConfig::bearer("tok").materialize();
        assert_eq!(
            m.headers,
            vec![("Authorization".to_string(), "Bearer tok".to_string())]
        );
        assert!(m.query.is_empty());
    }

    #[test]
    fn materialize_bearer_with_empty_token_is_empty() {
        assert_eq!(
            AuthConfig::bearer("").materialize(),
            AuthMaterialization::default()
        );
    }

    #[test]
    fn materialize_api_key_respects_location() {
        let header = AuthConfig::api_key("X-Key", "v", ApiKeyLocation::Header).materialize();
        assert_eq!(header.headers, vec![("X-Key".to_string(), "v".to_string())]);
        assert!(header.query.is_empty());

        let query = AuthConfig::api_key("X-Key", "v", ApiKeyLocation::Query).materialize();
        assert!(query.headers.is_empty());
        assert_eq!(query.query, vec![("X-Key".to_string(), "v".to_string())]);
    }

    #[test]
    fn materialize_basic_encodes_credentials() {
        let m = AuthConfig::basic("user", "pass").materialize();
        assert_eq!(
            m.headers,
            vec![("Authorization".to_string(), "Basic dXNlcjpwYXNz".to_string())]
        );
    }

    #[test]
    fn materialize_none_is_empty() {
        assert_eq!(AuthConfig::None.materialize(), AuthMaterialization::default());
    }

    #[test]
    fn serde_uses_browser_storage_layout() {
        let cfg = AuthConfig::api_key("X-Key", "v", ApiKeyLocation::Query);
        assert_eq!(
            serde_json::to_value(&cfg).unwrap(),
            json!({"type": "apikey", "apiKey": {"key": "X-Key", "value": "v", "location": "query"}})
        );
        assert_eq!(
            serde_json::to_value(AuthConfig::bearer("t")).unwrap(),
            json!({"type": "bearer", "bearerToken": "t"})
        );
        let basic: AuthConfig = serde_json::from_value(
            json!({"type": "basic", "basicAuth": {"username": "u", "password": "p"}}),
        )
        .unwrap();
        assert_eq!(basic, AuthConfig::basic("u", "p"));
    }

    #[test]
    fn load_defaults_to_none_when_missing() {
        let store = AuthStore::load(MemoryKv::default());
        assert_eq!(store.config(), &AuthConfig::None);
    }

    #[test]
    fn load_falls_back_to_none_on_corrupt_data() {
        let mut kv = MemoryKv::default();
        kv.put(AUTH_CONFIG_KEY, b"{\"type\":\"mystery\"}".to_vec())
            .unwrap();
        let store = AuthStore::load(kv);
        assert_eq!(store.config(), &AuthConfig::None);
    }

    #[test]
    fn set_persists_and_reloads() {
        let mut store = AuthStore::load(MemoryKv::default());
        store.set(AuthConfig::bearer("abc"));
        let reloaded = AuthStore::load(store.into_inner());
        assert_eq!(reloaded.config(), &AuthConfig::bearer("abc"));
    }

    #[test]
    fn clear_resets_to_none_and_persists() {
        let mut store = AuthStore::load(MemoryKv::default());
        store.set(AuthConfig::basic("u", "p"));
        store.clear();
        assert_eq!(store.config(), &AuthConfig::None);
        let reloaded = AuthStore::load(store.into_inner());
        assert_eq!(reloaded.config(), &AuthConfig::None);
    }

    #[test]
    fn set_keeps_config_when_persistence_fails() {
        let mut store = AuthStore::load(ReadOnlyKv(MemoryKv::default()));
        store.set(AuthConfig::bearer("kept"));
        assert_eq!(store.config(), &AuthConfig::bearer("kept"));
        assert_eq!(
            store.materialize().headers,
            vec![("Authorization".to_string(), "Bearer kept".to_string())]
        );
    }
}
