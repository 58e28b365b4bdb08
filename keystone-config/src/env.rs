// Environment variable loading

use crate::loader::{env_key_path, insert_path};
use crate::{ConfigError, Result};
use serde_json::{Map, Value};
use std::env;
use tracing::warn;

/// Reads process environment variables into configuration.
///
/// With prefix `KEYSTONE`, `KEYSTONE_LOGGING__LEVEL=debug` becomes
/// `{"logging": {"level": "debug"}}`. Without a prefix every variable is read.
#[derive(Debug, Clone, Default)]
pub struct EnvLoader {
    prefix: Option<String>,
}

impl EnvLoader {
    pub fn new(prefix: Option<String>) -> Self {
        Self { prefix }
    }

    pub fn with_prefix(prefix: impl Into<String>) -> Self {
        Self::new(Some(prefix.into()))
    }

    pub fn prefix(&self) -> Option<&str> {
        self.prefix.as_deref()
    }

    /// Load matching variables as a nested table.
    ///
    /// Variables whose name or value is not valid UTF-8 are skipped.
    pub fn load(&self) -> Result<Value> {
        let vars = env::vars_os().filter_map(|(key, value)| {
            match (key.into_string(), value.into_string()) {
                (Ok(key), Ok(value)) => Some((key, value)),
                (key, _) => {
                    warn!(variable = ?key, "Skipping environment variable that is not UTF-8");
                    None
                }
            }
        });
        Ok(self.collect(vars))
    }

    fn collect(&self, vars: impl IntoIterator<Item = (String, String)>) -> Value {
        let mut map = Map::new();
        for (key, value) in vars {
            let Some(key) = self.strip(&key) else {
                continue;
            };
            insert_path(&mut map, &env_key_path(key), scalar(value));
        }
        Value::Object(map)
    }

    fn strip<'a>(&self, key: &'a str) -> Option<&'a str> {
        match &self.prefix {
            Some(prefix) => key
                .strip_prefix(prefix.as_str())
                .and_then(|rest| rest.strip_prefix('_'))
                .filter(|rest| !rest.is_empty()),
            None => Some(key),
        }
    }

    /// Load one variable, e.g. `load_var("log_level")` reads `KEYSTONE_LOG_LEVEL`
    pub fn load_var(&self, key: &str) -> Result<String> {
        let full_key = match &self.prefix {
            Some(prefix) => format!("{}_{}", prefix, key.to_uppercase()),
            None => key.to_uppercase(),
        };

        env::var(&full_key).map_err(ConfigError::Env)
    }

    pub fn load_var_or(&self, key: &str, default: &str) -> String {
        self.load_var(key).unwrap_or_else(|_| default.to_string())
    }
}

/// `true`, `false` and numbers become typed values; anything else stays a string
fn scalar(raw: String) -> Value {
    match serde_json::from_str::<Value>(raw.trim()) {
        Ok(value @ (Value::Bool(_) | Value::Number(_))) => value,
        _ => Value::String(raw),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn vars(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_prefix_is_stripped() {
        let loader = EnvLoader::with_prefix("KEYSTONE");
        let value = loader.collect(vars(&[
            ("KEYSTONE_LOGGING__LEVEL", "debug"),
            ("KEYSTONE_NAME", "shop"),
            ("KEYSTONEX_OTHER", "x"),
            ("KEYSTONE_", "empty"),
            ("PATH", "/bin"),
        ]));

        assert_eq!(value, json!({"logging": {"level": "debug"}, "name": "shop"}));
    }

    #[test]
    fn test_no_prefix_reads_everything() {
        let loader = EnvLoader::default();
        let value = loader.collect(vars(&[("HOME", "/root"), ("APP__PORT", "80")]));
        assert_eq!(value, json!({"home": "/root", "app": {"port": 80}}));
    }

    #[test]
    fn test_scalars_are_typed() {
        let loader = EnvLoader::with_prefix("KEYSTONE");
        let value = loader.collect(vars(&[
            ("KEYSTONE_COMPONENTS__DB__SHARED", "false"),
            ("KEYSTONE_POOL", "8"),
            ("KEYSTONE_RATIO", "0.5"),
            ("KEYSTONE_NAME", "shop"),
            ("KEYSTONE_QUOTED", "\"true\""),
            ("KEYSTONE_LIST", "[1, 2]"),
        ]));

        assert_eq!(
            value,
            json!({
                "components": {"db": {"shared": false}},
                "pool": 8,
                "ratio": 0.5,
                "name": "shop",
                "quoted": "\"true\"",
                "list": "[1, 2]"
            })
        );
    }

    #[cfg(unix)]
    #[test]
    fn test_non_utf8_variable_is_skipped() {
        use std::ffi::OsStr;
        use std::os::unix::ffi::OsStrExt;

        unsafe {
            env::set_var("KSRAW_GOOD", "ok");
            env::set_var("KSRAW_BAD", OsStr::from_bytes(b"caf\xe9"));
        }

        let value = EnvLoader::with_prefix("KSRAW").load().unwrap();
        assert_eq!(value, json!({"good": "ok"}));

        unsafe {
            env::remove_var("KSRAW_GOOD");
            env::remove_var("KSRAW_BAD");
        }
    }

    #[test]
    fn test_load_var_or_default() {
        let loader = EnvLoader::with_prefix("KEYSTONE_TEST_NOPE");
        assert!(loader.load_var("missing_var").is_err());
        assert_eq!(loader.load_var_or("missing_var", "fallback"), "fallback");
    }
}
