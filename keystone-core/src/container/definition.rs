//! Component definitions: what to build and how long it lives.

use crate::container::Container;
use crate::error::Result;
use crate::traits::{Component, Instance};
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

/// A callable that builds an instance from the resolving container and the
/// positional constructor arguments.
pub type Factory = Arc<dyn Fn(&Container, &[Value]) -> Result<Instance> + Send + Sync>;

/// Separator of fully-qualified type paths, e.g. `app::services::Mailer`
pub const TYPE_PATH_SEPARATOR: &str = "::";

/// Check whether a component name looks like a fully-qualified type path
pub fn is_type_path(name: &str) -> bool {
    name.contains(TYPE_PATH_SEPARATOR)
}

/// How a component is built
#[derive(Clone)]
pub enum Identity {
    /// Built by the type catalog from a fully-qualified type name
    Type(String),
    /// Built by invoking a factory
    Factory(Factory),
    /// Already built; handed out as is
    Instance(Instance),
}

impl Identity {
    pub fn kind(&self) -> &'static str {
        match self {
            Identity::Type(_) => "type",
            Identity::Factory(_) => "factory",
            Identity::Instance(_) => "instance",
        }
    }
}

impl fmt::Debug for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Identity::Type(name) => f.debug_tuple("Type").field(name).finish(),
            Identity::Factory(_) => f.write_str("Factory(..)"),
            Identity::Instance(_) => f.write_str("Instance(..)"),
        }
    }
}

/// Lifetime policy of a component
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Lifetime {
    /// One instance per canonical name, memoized after first construction
    #[default]
    Shared,
    /// A fresh instance on every resolution
    Transient,
}

impl Lifetime {
    pub fn is_shared(&self) -> bool {
        matches!(self, Lifetime::Shared)
    }
}

/// A registry entry
#[derive(Debug, Clone)]
pub struct ComponentDefinition {
    pub identity: Identity,
    pub lifetime: Lifetime,
    pub args: Vec<Value>,
}

impl ComponentDefinition {
    pub fn new(identity: Identity, lifetime: Lifetime) -> Self {
        Self {
            identity,
            lifetime,
            args: Vec::new(),
        }
    }

    pub fn with_args(mut self, args: Vec<Value>) -> Self {
        self.args = args;
        self
    }
}

/// A definition whose identity may be left out.
///
/// A missing identity is filled in at registration time from an existing
/// registry entry, then from an alias, then from the name itself when it is a
/// type path.
#[derive(Debug, Clone, Default)]
pub struct DefinitionSpec {
    pub identity: Option<Identity>,
    pub lifetime: Option<Lifetime>,
    pub args: Vec<Value>,
}

impl DefinitionSpec {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn type_name(mut self, name: impl Into<String>) -> Self {
        self.identity = Some(Identity::Type(name.into()));
        self
    }

    pub fn identity(mut self, identity: Identity) -> Self {
        self.identity = Some(identity);
        self
    }

    pub fn lifetime(mut self, lifetime: Lifetime) -> Self {
        self.lifetime = Some(lifetime);
        self
    }

    pub fn args(mut self, args: Vec<Value>) -> Self {
        self.args = args;
        self
    }
}

/// Input accepted by [`Container::set`] and [`Container::set_shared`]
#[derive(Clone)]
pub enum Definition {
    /// A bare type name
    Type(String),
    /// A partial or complete mapping
    Spec(DefinitionSpec),
    /// A pre-built instance
    Instance(Instance),
    /// A deferred factory
    Factory(Factory),
}

impl Definition {
    pub fn of_type(name: impl Into<String>) -> Self {
        Definition::Type(name.into())
    }

    pub fn instance<T: Component>(value: T) -> Self {
        Definition::Instance(Arc::new(value))
    }

    /// Wrap a typed factory closure
    pub fn factory<T, F>(factory: F) -> Self
    where
        T: Component,
        F: Fn(&Container, &[Value]) -> Result<T> + Send + Sync + 'static,
    {
        Definition::Factory(Arc::new(move |container, args| {
            let instance: Instance = Arc::new(factory(container, args)?);
            Ok(instance)
        }))
    }

    /// A spec carrying only constructor arguments
    pub fn args(args: Vec<Value>) -> Self {
        Definition::Spec(DefinitionSpec::new().args(args))
    }
}

impl fmt::Debug for Definition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Definition::Type(name) => f.debug_tuple("Type").field(name).finish(),
            Definition::Spec(spec) => f.debug_tuple("Spec").field(spec).finish(),
            Definition::Instance(_) => f.write_str("Instance(..)"),
            Definition::Factory(_) => f.write_str("Factory(..)"),
        }
    }
}

impl From<&str> for Definition {
    fn from(name: &str) -> Self {
        Definition::Type(name.to_string())
    }
}

impl From<String> for Definition {
    fn from(name: String) -> Self {
        Definition::Type(name)
    }
}

impl From<DefinitionSpec> for Definition {
    fn from(spec: DefinitionSpec) -> Self {
        Definition::Spec(spec)
    }
}

impl From<Instance> for Definition {
    fn from(instance: Instance) -> Self {
        Definition::Instance(instance)
    }
}
