//! Configuration loading and management
//!
//! `AppConfig` is read from a YAML file and then overridden by environment
//! variables (a `.env` file is loaded first when present). Every section
//! has defaults, so an empty file is a valid in-memory development setup.

use crate::core::auth::{AuthProvider, Identity, StaticTokenProvider};
use crate::core::error::ConfigError;
use crate::reports::{ProductCategory, ReportLimits, default_categories};
use crate::storage::Collections;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Deserializer};
use std::net::{IpAddr, SocketAddr};
use std::path::Path;
use std::sync::Arc;

/// Complete service configuration
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub backend: BackendConfig,
    pub auth: AuthConfig,
    /// Admin profile ensured at start-up
    pub bootstrap_admin: Option<BootstrapAdmin>,
    pub inventory: InventoryConfig,
    pub reports: ReportLimits,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: IpAddr,
    pub port: u16,
    /// Buffered events per subscriber before it starts lagging
    pub event_capacity: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: IpAddr::from([127, 0, 0, 1]),
            port: 3000,
            event_capacity: 1024,
        }
    }
}

impl ServerConfig {
    pub fn addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

/// Where documents are stored
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BackendConfig {
    #[default]
    Memory,
    Firestore(FirestoreConfig),
}

#[derive(Clone, Deserialize)]
pub struct FirestoreConfig {
    pub project_id: String,
    #[serde(default = "default_database")]
    pub database: String,
    #[serde(default, deserialize_with = "optional_secret")]
    pub api_key: Option<SecretString>,
    #[serde(default, deserialize_with = "optional_secret")]
    pub access_token: Option<SecretString>,
    /// Emulator or proxy endpoint instead of the hosted API
    #[serde(default)]
    pub base_url: Option<String>,
}

impl std::fmt::Debug for FirestoreConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FirestoreConfig")
            .field("project_id", &self.project_id)
            .field("database", &self.database)
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .field("access_token", &self.access_token.as_ref().map(|_| "[REDACTED]"))
            .field("base_url", &self.base_url)
            .finish()
    }
}

fn default_database() -> String {
    "(default)".to_string()
}

/// How bearer tokens are verified
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "provider", rename_all = "snake_case")]
pub enum AuthConfig {
    Static {
        #[serde(default)]
        tokens: Vec<StaticToken>,
    },
    IdentityToolkit {
        #[serde(deserialize_with = "secret")]
        api_key: SecretString,
        #[serde(default)]
        base_url: Option<String>,
    },
}

impl Default for AuthConfig {
    fn default() -> Self {
        AuthConfig::Static { tokens: Vec::new() }
    }
}

/// A fixed token and the identity it stands for
#[derive(Clone, Deserialize)]
pub struct StaticToken {
    #[serde(deserialize_with = "secret")]
    pub token: SecretString,
    pub uid: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub display_name: Option<String>,
}

impl std::fmt::Debug for StaticToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StaticToken")
            .field("token", &"[REDACTED]")
            .field("uid", &self.uid)
            .finish()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct BootstrapAdmin {
    pub uid: String,
    #[serde(default = "default_admin_name")]
    pub name: String,
    #[serde(default)]
    pub email: String,
}

fn default_admin_name() -> String {
    "Administrator".to_string()
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct InventoryConfig {
    /// Products with `stock <= low_stock_threshold` are flagged
    pub low_stock_threshold: i64,
    pub categories: Vec<ProductCategory>,
}

impl Default for InventoryConfig {
    fn default() -> Self {
        Self {
            low_stock_threshold: 5,
            categories: default_categories(),
        }
    }
}

fn secret<'de, D: Deserializer<'de>>(deserializer: D) -> Result<SecretString, D::Error> {
    String::deserialize(deserializer).map(SecretString::from)
}

fn optional_secret<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<SecretString>, D::Error> {
    Ok(Option::<String>::deserialize(deserializer)?
        .filter(|s| !s.is_empty())
        .map(SecretString::from))
}

impl AppConfig {
    /// Load configuration from a YAML file
    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => ConfigError::FileNotFound {
                path: path.display().to_string(),
            },
            _ => ConfigError::IoError {
                message: e.to_string(),
            },
        })?;
        serde_yaml::from_str(&content).map_err(|e| ConfigError::ParseError {
            file: Some(path.display().to_string()),
            message: e.to_string(),
        })
    }

    /// Load configuration from a YAML string
    pub fn from_yaml_str(yaml: &str) -> Result<Self, ConfigError> {
        if yaml.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(yaml).map_err(|e| ConfigError::ParseError {
            file: None,
            message: e.to_string(),
        })
    }

    /// File (if any) + `.env` + process environment
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        if let Ok(dotenv) = dotenvy::dotenv() {
            tracing::debug!(path = %dotenv.display(), "loaded .env");
        }
        let mut config = match path {
            Some(path) => Self::from_yaml_file(path)?,
            None => Self::default(),
        };
        config.apply_overrides(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Apply `SHOPDESK_*` / `FIRESTORE_*` overrides from `lookup`
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(host) = get("SHOPDESK_HOST") {
            self.server.host = parse_value("SHOPDESK_HOST", &host)?;
        }
        if let Some(port) = get("SHOPDESK_PORT") {
            self.server.port = parse_value("SHOPDESK_PORT", &port)?;
        }
        if let Some(threshold) = get("SHOPDESK_LOW_STOCK_THRESHOLD") {
            self.inventory.low_stock_threshold = parse_value("SHOPDESK_LOW_STOCK_THRESHOLD", &threshold)?;
        }

        match get("SHOPDESK_BACKEND").as_deref() {
            None => {}
            Some("memory") => self.backend = BackendConfig::Memory,
            Some("firestore") => {
                if !matches!(self.backend, BackendConfig::Firestore(_)) {
                    self.backend = BackendConfig::Firestore(FirestoreConfig {
                        project_id: String::new(),
                        database: default_database(),
                        api_key: None,
                        access_token: None,
                        base_url: None,
                    });
                }
            }
            Some(other) => {
                return Err(ConfigError::InvalidValue {
                    field: "SHOPDESK_BACKEND".to_string(),
                    value: other.to_string(),
                    message: "expected 'memory' or 'firestore'".to_string(),
                });
            }
        }
        if let BackendConfig::Firestore(firestore) = &mut self.backend {
            if let Some(project) = get("FIRESTORE_PROJECT_ID") {
                firestore.project_id = project;
            }
            if let Some(database) = get("FIRESTORE_DATABASE") {
                firestore.database = database;
            }
            if let Some(key) = get("FIRESTORE_API_KEY") {
                firestore.api_key = Some(SecretString::from(key));
            }
            if let Some(token) = get("FIRESTORE_ACCESS_TOKEN") {
                firestore.access_token = Some(SecretString::from(token));
            }
            if let Some(url) = get("FIRESTORE_BASE_URL") {
                firestore.base_url = Some(url);
            }
        }

        if let Some(key) = get("SHOPDESK_IDENTITY_API_KEY") {
            let base_url = match &self.auth {
                AuthConfig::IdentityToolkit { base_url, .. } => base_url.clone(),
                AuthConfig::Static { .. } => None,
            };
            self.auth = AuthConfig::IdentityToolkit {
                api_key: SecretString::from(key),
                base_url,
            };
        }

        if let Some(uid) = get("SHOPDESK_ADMIN_UID") {
            self.bootstrap_admin = Some(BootstrapAdmin {
                uid,
                name: get("SHOPDESK_ADMIN_NAME").unwrap_or_else(default_admin_name),
                email: get("SHOPDESK_ADMIN_EMAIL").unwrap_or_default(),
            });
        }
        Ok(())
    }

    /// Reject settings that cannot work
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let BackendConfig::Firestore(firestore) = &self.backend {
            if firestore.project_id.trim().is_empty() {
                return Err(ConfigError::MissingField {
                    field: "backend.project_id".to_string(),
                });
            }
        }
        if let AuthConfig::IdentityToolkit { api_key, .. } = &self.auth {
            if api_key.expose_secret().trim().is_empty() {
                return Err(ConfigError::MissingField {
                    field: "auth.api_key".to_string(),
                });
            }
        }
        if self.inventory.low_stock_threshold < 0 {
            return Err(ConfigError::InvalidValue {
                field: "inventory.low_stock_threshold".to_string(),
                value: self.inventory.low_stock_threshold.to_string(),
                message: "must not be negative".to_string(),
            });
        }
        Ok(())
    }

    /// Collections for the configured backend
    pub fn build_collections(&self) -> Result<Collections, ConfigError> {
        match &self.backend {
            BackendConfig::Memory => Ok(Collections::in_memory()),
            #[cfg(feature = "firebase")]
            BackendConfig::Firestore(firestore) => {
                let mut client =
                    crate::storage::FirestoreClient::new(&firestore.project_id, &firestore.database);
                if let Some(key) = &firestore.api_key {
                    client = client.with_api_key(key.clone());
                }
                if let Some(token) = &firestore.access_token {
                    client = client.with_access_token(token.clone());
                }
                if let Some(url) = &firestore.base_url {
                    client = client.with_base_url(url);
                }
                Ok(Collections::firestore(client))
            }
            #[cfg(not(feature = "firebase"))]
            BackendConfig::Firestore(_) => Err(feature_missing("backend.type", "firestore")),
        }
    }

    /// Token verifier for the configured provider
    pub fn build_auth_provider(&self) -> Result<Arc<dyn AuthProvider>, ConfigError> {
        match &self.auth {
            AuthConfig::Static { tokens } => {
                let provider = tokens.iter().fold(StaticTokenProvider::new(), |provider, t| {
                    provider.with_token(
                        t.token.expose_secret(),
                        Identity {
                            uid: t.uid.clone(),
                            email: t.email.clone(),
                            display_name: t.display_name.clone(),
                        },
                    )
                });
                if provider.is_empty() {
                    tracing::warn!("static auth has no tokens; every protected route will answer 401");
                }
                Ok(Arc::new(provider))
            }
            #[cfg(feature = "firebase")]
            AuthConfig::IdentityToolkit { api_key, base_url } => {
                let mut provider = crate::core::auth::IdentityToolkitProvider::new(api_key.clone());
                if let Some(url) = base_url {
                    provider = provider.with_base_url(url);
                }
                Ok(Arc::new(provider))
            }
            #[cfg(not(feature = "firebase"))]
            AuthConfig::IdentityToolkit { .. } => Err(feature_missing("auth.provider", "identity_toolkit")),
        }
    }
}

#[cfg(not(feature = "firebase"))]
fn feature_missing(field: &str, value: &str) -> ConfigError {
    ConfigError::InvalidValue {
        field: field.to_string(),
        value: value.to_string(),
        message: "this build was compiled without the 'firebase' feature".to_string(),
    }
}

fn parse_value<T>(key: &str, raw: &str) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    raw.trim().parse().map_err(|e: T::Err| ConfigError::InvalidValue {
        field: key.to_string(),
        value: raw.to_string(),
        message: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = AppConfig::from_yaml_str("").unwrap();
        assert_eq!(config.server.port, 3000);
        assert!(matches!(config.backend, BackendConfig::Memory));
        assert!(matches!(config.auth, AuthConfig::Static { .. }));
        assert_eq!(config.inventory.low_stock_threshold, 5);
        assert_eq!(config.inventory.categories.len(), 10);
        assert_eq!(config.reports, ReportLimits::default());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_yaml_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"
server:
  port: 8088
auth:
  provider: static
  tokens:
    - token: dev-admin
      uid: admin-1
      email: admin@shop.test
bootstrap_admin:
  uid: admin-1
  email: admin@shop.test
inventory:
  low_stock_threshold: 3
  categories:
    - name: Oil
      query: oil
reports:
  top_products: 3
"#
        )
        .unwrap();

        let config = AppConfig::from_yaml_file(file.path()).unwrap();
        assert_eq!(config.server.port, 8088);
        assert_eq!(config.server.addr().to_string(), "127.0.0.1:8088");
        assert_eq!(config.inventory.low_stock_threshold, 3);
        assert_eq!(config.inventory.categories.len(), 1);
        assert_eq!(config.reports.top_products, 3);
        assert_eq!(config.reports.top_customers, 5);
        let admin = config.bootstrap_admin.as_ref().unwrap();
        assert_eq!(admin.name, "Administrator");

        let AuthConfig::Static { tokens } = &config.auth else {
            panic!("expected static auth");
        };
        assert_eq!(tokens[0].token.expose_secret(), "dev-admin");
        assert!(!format!("{:?}", tokens[0]).contains("dev-admin"));
    }

    #[test]
    fn test_missing_file() {
        let err = AppConfig::from_yaml_file("/definitely/not/here.yaml").unwrap_err();
        assert!(matches!(err, ConfigError::FileNotFound { .. }));
    }

    #[test]
    fn test_invalid_yaml() {
        let err = AppConfig::from_yaml_str("server: [1, 2").unwrap_err();
        assert!(matches!(err, ConfigError::ParseError { .. }));
    }

    #[test]
    fn test_firestore_backend_yaml() {
        let config = AppConfig::from_yaml_str(
            "backend:\n  type: firestore\n  project_id: shop\n  api_key: abc\n",
        )
        .unwrap();
        let BackendConfig::Firestore(firestore) = &config.backend else {
            panic!("expected firestore backend");
        };
        assert_eq!(firestore.database, "(default)");
        assert!(!format!("{firestore:?}").contains("abc"));
    }

    #[test]
    fn test_env_overrides() {
        let mut config = AppConfig::default();
        config
            .apply_overrides(env(&[
                ("SHOPDESK_PORT", "9000"),
                ("SHOPDESK_BACKEND", "firestore"),
                ("FIRESTORE_PROJECT_ID", "shop-prod"),
                ("SHOPDESK_ADMIN_UID", "root"),
                ("SHOPDESK_LOW_STOCK_THRESHOLD", "2"),
            ]))
            .unwrap();
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.inventory.low_stock_threshold, 2);
        assert_eq!(config.bootstrap_admin.as_ref().map(|a| a.uid.as_str()), Some("root"));
        let BackendConfig::Firestore(firestore) = &config.backend else {
            panic!("expected firestore backend");
        };
        assert_eq!(firestore.project_id, "shop-prod");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_env_override_rejects_garbage() {
        let mut config = AppConfig::default();
        let err = config.apply_overrides(env(&[("SHOPDESK_PORT", "lots")])).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { .. }));

        let err = config.apply_overrides(env(&[("SHOPDESK_BACKEND", "mongo")])).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { .. }));
    }

    #[test]
    fn test_validate_requires_project_id() {
        let mut config = AppConfig::default();
        config.apply_overrides(env(&[("SHOPDESK_BACKEND", "firestore")])).unwrap();
        assert!(matches!(config.validate(), Err(ConfigError::MissingField { .. })));
    }

    #[test]
    fn test_build_static_auth_provider() {
        let config = AppConfig::from_yaml_str(
            "auth:\n  provider: static\n  tokens:\n    - token: t1\n      uid: u1\n",
        )
        .unwrap();
        let provider = config.build_auth_provider().unwrap();
        assert_eq!(provider.name(), "static");
        assert!(config.build_collections().is_ok());
    }
}
