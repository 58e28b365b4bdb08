// Configuration management for the Keystone framework

pub mod app;
pub mod env;
pub mod error;
pub mod loader;
pub mod validation;

pub use app::{params_to_args, AppConfig, ComponentEntry, ComponentTable, LoggingSection};
pub use env::EnvLoader;
pub use error::{ConfigError, Result};
pub use loader::{ConfigLoader, FileFormat};
pub use validation::{ConfigValidator, Validate};

use keystone_core::Component;
use loader::deep_merge;
use parking_lot::RwLock;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

/// Layered configuration store.
///
/// Sources are merged in load order; tables merge key by key and later
/// scalars win. Keys may be dotted paths into nested tables, e.g.
/// `logging.level`.
#[derive(Clone)]
pub struct ConfigManager {
    config: Arc<RwLock<Value>>,
    env_prefix: Option<String>,
}

impl ConfigManager {
    pub fn new() -> Self {
        Self {
            config: Arc::new(RwLock::new(Value::Object(Map::new()))),
            env_prefix: None,
        }
    }

    /// Create with an environment variable prefix, e.g. `KEYSTONE`
    pub fn with_prefix(prefix: impl Into<String>) -> Self {
        Self {
            env_prefix: Some(prefix.into()),
            ..Self::new()
        }
    }

    fn merge_value(&self, value: Value) {
        let mut config = self.config.write();
        if !config.is_object() {
            *config = Value::Object(Map::new());
        }
        deep_merge(&mut *config, value);
    }

    /// Merge environment variables matching the prefix
    pub fn load_env(&self) -> Result<()> {
        let loader = EnvLoader::new(self.env_prefix.clone());
        self.merge_value(loader.load()?);
        debug!(prefix = ?self.env_prefix, "Loaded environment configuration");
        Ok(())
    }

    /// Export a `.env` file into the process environment, then merge the
    /// environment. Without a path a missing `.env` is ignored; a malformed
    /// one is always an error.
    pub fn load_dotenv(&self, path: Option<&Path>) -> Result<()> {
        let loaded = match path {
            Some(path) => dotenvy::from_path(path),
            None => dotenvy::dotenv().map(|_| ()),
        };
        check_dotenv(path, loaded)?;
        self.load_env()
    }

    /// Merge a file; the format follows its extension
    pub fn load_file(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let value = ConfigLoader::auto(path)?.load_file(path)?;
        self.merge_value(value);
        debug!(path = %path.display(), "Loaded configuration file");
        Ok(())
    }

    /// Merge configuration text of a known format
    pub fn load_str(&self, content: &str, format: FileFormat) -> Result<()> {
        let value = ConfigLoader::new(format).parse(content)?;
        self.merge_value(value);
        Ok(())
    }

    pub fn set<T: serde::Serialize>(&self, key: &str, value: T) -> Result<()> {
        let value = serde_json::to_value(value).map_err(|e| ConfigError::Shape {
            key: key.to_string(),
            reason: e.to_string(),
        })?;

        let path: Vec<String> = key.split('.').map(str::to_string).collect();
        let mut config = self.config.write();
        if let Value::Object(map) = &mut *config {
            loader::insert_path(map, &path, value);
        }
        Ok(())
    }

    fn lookup(&self, key: &str) -> Option<Value> {
        let config = self.config.read();
        key.split('.')
            .try_fold(&*config, |value, part| value.get(part))
            .cloned()
    }

    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Result<T> {
        let value = self
            .lookup(key)
            .ok_or_else(|| ConfigError::KeyNotFound(key.to_string()))?;

        serde_json::from_value(value).map_err(|e| ConfigError::Shape {
            key: key.to_string(),
            reason: e.to_string(),
        })
    }

    pub fn get_or<T: DeserializeOwned>(&self, key: &str, default: T) -> T {
        self.get(key).unwrap_or(default)
    }

    pub fn get_string(&self, key: &str) -> Result<String> {
        self.get(key)
    }

    pub fn get_bool(&self, key: &str) -> Result<bool> {
        self.get(key)
    }

    pub fn has(&self, key: &str) -> bool {
        self.lookup(key).is_some()
    }

    /// Top-level keys, sorted
    pub fn keys(&self) -> Vec<String> {
        let config = self.config.read();
        let mut keys: Vec<String> = config
            .as_object()
            .map(|map| map.keys().cloned().collect())
            .unwrap_or_default();
        keys.sort();
        keys
    }

    /// Merge another manager's configuration over this one
    pub fn merge(&self, other: &ConfigManager) {
        let value = other.snapshot();
        self.merge_value(value);
    }

    /// Copy of the whole configuration tree
    pub fn snapshot(&self) -> Value {
        self.config.read().clone()
    }

    /// Deserialize the whole tree and validate it
    pub fn load_validated<T: DeserializeOwned + Validate>(&self) -> Result<T> {
        let validated: T = serde_json::from_value(self.snapshot()).map_err(|e| ConfigError::Shape {
            key: "<root>".to_string(),
            reason: e.to_string(),
        })?;

        validated.validate()?;
        Ok(validated)
    }

    /// Application configuration from the merged tree
    pub fn app_config(&self) -> Result<AppConfig> {
        self.load_validated()
    }
}

fn check_dotenv(path: Option<&Path>, loaded: dotenvy::Result<()>) -> Result<()> {
    match loaded {
        Ok(()) => Ok(()),
        Err(e) if path.is_none() && e.not_found() => {
            debug!("No .env file found");
            Ok(())
        }
        Err(e) => Err(ConfigError::Load {
            source_name: path.map_or_else(|| ".env".to_string(), |p| p.display().to_string()),
            reason: e.to_string(),
        }),
    }
}

impl Default for ConfigManager {
    fn default() -> Self {
        Self::new()
    }
}

/// The manager can be registered in a container, e.g. under `config`
impl Component for ConfigManager {}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_set_and_get_dotted() {
        let manager = ConfigManager::new();
        manager.set("logging.level", "debug").unwrap();
        manager.set("name", "shop").unwrap();

        assert_eq!(manager.get_string("logging.level").unwrap(), "debug");
        assert_eq!(manager.get::<Value>("logging").unwrap(), json!({"level": "debug"}));
        assert_eq!(manager.keys(), vec!["logging", "name"]);
    }

    #[test]
    fn test_get_or_default() {
        let manager = ConfigManager::new();
        assert_eq!(manager.get_or("missing", 5u32), 5);
        assert!(matches!(
            manager.get::<String>("missing").unwrap_err(),
            ConfigError::KeyNotFound(_)
        ));
    }

    #[test]
    fn test_wrong_shape() {
        let manager = ConfigManager::new();
        manager.set("port", "eighty").unwrap();
        assert!(manager.get::<u16>("port").unwrap_err().is_invalid());
    }

    #[test]
    fn test_layers_merge() {
        let manager = ConfigManager::new();
        manager
            .load_str(r#"{"logging": {"level": "info", "format": "json"}}"#, FileFormat::Json)
            .unwrap();
        manager
            .load_str("[logging]\nlevel = \"debug\"\n", FileFormat::Toml)
            .unwrap();

        assert_eq!(manager.get_string("logging.level").unwrap(), "debug");
        assert_eq!(manager.get_string("logging.format").unwrap(), "json");
        assert!(manager.has("logging.format"));
        assert!(!manager.has("logging.filter"));
    }

    #[test]
    fn test_missing_dotenv_only_ignored_without_path() {
        let missing = || dotenvy::Error::Io(std::io::ErrorKind::NotFound.into());
        assert!(check_dotenv(None, Err(missing())).is_ok());

        let err = check_dotenv(Some(Path::new("conf/.env")), Err(missing())).unwrap_err();
        assert!(matches!(err, ConfigError::Load { ref source_name, .. } if source_name == "conf/.env"));
    }

    #[test]
    fn test_malformed_dotenv_is_an_error() {
        let malformed = dotenvy::Error::LineParse("KSBAD_X=\"unterminated".into(), 8);
        let err = check_dotenv(None, Err(malformed)).unwrap_err();
        assert!(matches!(err, ConfigError::Load { ref source_name, .. } if source_name == ".env"));
    }

    #[test]
    fn test_merge_managers() {
        let base = ConfigManager::new();
        base.set("a", 1).unwrap();
        let other = ConfigManager::new();
        other.set("b", 2).unwrap();

        base.merge(&other);
        assert_eq!(base.snapshot(), json!({"a": 1, "b": 2}));
    }
}
