// Application configuration: logging, dispatcher and component wiring

use crate::validation::{ConfigValidator, Validate};
use crate::{ConfigError, Result};
use keystone_core::logging::{LogConfig, LogFormat, LogLevel};
use keystone_core::{Container, Definition, DefinitionSpec, Dispatcher, DispatcherConfig, Lifetime};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use tracing::debug;

/// Top-level application configuration
///
/// ```toml
/// [logging]
/// level = "debug"
/// format = "pretty"
///
/// [dispatcher]
/// controller_namespace = "{module}::Controllers"
///
/// [components]
/// mailer = "app::Mailer"
///
/// [components.db]
/// type = "app::Db"
/// params = ["mysql://localhost", 5]
/// aliases = ["database"]
///
/// [aliases]
/// storage = "db"
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub logging: LoggingSection,
    pub dispatcher: DispatcherConfig,
    pub components: BTreeMap<String, ComponentEntry>,
    /// alias -> canonical component name
    pub aliases: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSection {
    pub level: Option<String>,
    pub format: Option<String>,
    pub filter: Option<String>,
}

/// A configured component: a bare type name or a table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ComponentEntry {
    Type(String),
    Table(ComponentTable),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ComponentTable {
    /// Omitted to reuse the type of an existing registration
    #[serde(rename = "type")]
    pub type_name: Option<String>,
    pub shared: Option<bool>,
    /// A list is positional; any other value is a single argument
    pub params: Value,
    pub aliases: Vec<String>,
}

/// Constructor arguments from a configured `params` value
pub fn params_to_args(params: &Value) -> Vec<Value> {
    match params {
        Value::Null => Vec::new(),
        Value::Array(items) => items.clone(),
        other => vec![other.clone()],
    }
}

impl ComponentEntry {
    /// Definition registered through [`Container::set_shared`]
    pub fn definition(&self) -> Definition {
        match self {
            ComponentEntry::Type(type_name) => Definition::of_type(type_name.as_str()),
            ComponentEntry::Table(table) => {
                let mut spec = DefinitionSpec::new().args(params_to_args(&table.params));
                if let Some(type_name) = &table.type_name {
                    spec = spec.type_name(type_name.as_str());
                }
                if let Some(shared) = table.shared {
                    spec = spec.lifetime(if shared {
                        Lifetime::Shared
                    } else {
                        Lifetime::Transient
                    });
                }
                Definition::Spec(spec)
            }
        }
    }

    pub fn aliases(&self) -> &[String] {
        match self {
            ComponentEntry::Type(_) => &[],
            ComponentEntry::Table(table) => &table.aliases,
        }
    }
}

impl LoggingSection {
    pub fn log_config(&self) -> Result<LogConfig> {
        let mut config = LogConfig::from_env();
        if let Some(level) = &self.level {
            config = config.level(LogLevel::parse(level).ok_or_else(|| {
                ConfigError::invalid(format!("logging.level `{}` is not a log level", level))
            })?);
        }
        if let Some(format) = &self.format {
            config = config.format(LogFormat::parse(format).ok_or_else(|| {
                ConfigError::invalid(format!("logging.format `{}` is not a log format", format))
            })?);
        }
        if let Some(filter) = &self.filter {
            config = config.with_env_filter(filter.as_str());
        }
        Ok(config)
    }
}

impl Validate for AppConfig {
    fn validate(&self) -> Result<()> {
        self.logging.log_config()?;

        for (name, entry) in &self.components {
            ConfigValidator::is_component_name(name, "component name")?;
            match entry {
                ComponentEntry::Type(type_name) => {
                    ConfigValidator::is_type_path(type_name, &format!("components.{}", name))?
                }
                ComponentEntry::Table(table) => {
                    if let Some(type_name) = &table.type_name {
                        ConfigValidator::is_type_path(type_name, &format!("components.{}.type", name))?;
                    }
                }
            }
            for alias in entry.aliases() {
                ConfigValidator::is_component_name(alias, &format!("components.{}.aliases", name))?;
            }
        }

        for (alias, target) in &self.aliases {
            ConfigValidator::is_component_name(alias, "alias")?;
            ConfigValidator::is_component_name(target, &format!("aliases.{}", alias))?;
        }

        Ok(())
    }
}

impl AppConfig {
    /// Register the configured components and aliases.
    ///
    /// Components are applied in name order; a table without a type may
    /// therefore only refer to a component registered before this call or to
    /// a type path name.
    pub fn apply(&self, container: &Container) -> Result<()> {
        self.validate()?;

        for (name, entry) in &self.components {
            container.set_shared(name, entry.definition())?;
            container.set_aliases(name, entry.aliases(), false);
        }
        for (alias, target) in &self.aliases {
            container.set_alias(target, alias);
        }

        debug!(
            components = self.components.len(),
            aliases = self.aliases.len(),
            "Applied component configuration"
        );
        Ok(())
    }

    /// Dispatcher resolving through `container` with the configured namespace
    pub fn dispatcher(&self, container: &Container) -> Dispatcher {
        Dispatcher::new(container).with_config(self.dispatcher.clone())
    }
}
