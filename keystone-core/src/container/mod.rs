// Component container
//
// Resolves component names into live instances. Definitions live in the
// registry, alternate names in the alias table and shared instances in the
// instance cache. Locks on these tables are released before any constructor,
// factory or container-aware hook runs, so user code may resolve other
// components re-entrantly.

mod alias;
mod cache;
mod default;
mod definition;
mod registry;
mod resolver;

pub use alias::AliasTable;
pub use cache::InstanceCache;
pub use definition::{
    is_type_path, ComponentDefinition, Definition, DefinitionSpec, Factory, Identity, Lifetime,
    TYPE_PATH_SEPARATOR,
};
pub use registry::ComponentRegistry;
pub use resolver::{arg, TypeCatalog, TypeConstructor};

use crate::error::{Error, Result};
use crate::logging::{debug, trace};
use crate::traits::{Component, Instance};
use parking_lot::RwLock;
use serde_json::Value;
use std::fmt;
use std::str::FromStr;
use std::sync::{Arc, Weak};

struct Tables {
    aliases: RwLock<AliasTable>,
    components: RwLock<ComponentRegistry>,
    instances: RwLock<InstanceCache>,
    types: RwLock<TypeCatalog>,
}

/// The component container
///
/// Cloning is cheap and yields a handle to the same container.
#[derive(Clone)]
pub struct Container {
    tables: Arc<Tables>,
}

/// Non-owning handle to a [`Container`]
#[derive(Clone, Default)]
pub struct WeakContainer {
    tables: Weak<Tables>,
}

impl WeakContainer {
    /// An empty handle that never upgrades
    pub fn new() -> Self {
        Self::default()
    }

    pub fn upgrade(&self) -> Option<Container> {
        self.tables.upgrade().map(|tables| Container { tables })
    }
}

impl fmt::Debug for WeakContainer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WeakContainer")
            .field("alive", &(self.tables.strong_count() > 0))
            .finish()
    }
}

/// Operations reachable through [`Container::call`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Get,
    GetShared,
    Has,
    Remove,
    Reconstruct,
}

impl FromStr for Operation {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "get" => Ok(Operation::Get),
            "getShared" | "get_shared" => Ok(Operation::GetShared),
            "has" => Ok(Operation::Has),
            "remove" => Ok(Operation::Remove),
            "reconstruct" => Ok(Operation::Reconstruct),
            other => Err(Error::UnknownOperation(format!(
                "`{}` is not a container operation",
                other
            ))),
        }
    }
}

/// Result of [`Container::call`]
pub enum CallOutput {
    Instance(Instance),
    Flag(bool),
    Done,
}

impl CallOutput {
    pub fn into_instance(self) -> Option<Instance> {
        match self {
            CallOutput::Instance(instance) => Some(instance),
            _ => None,
        }
    }

    pub fn as_flag(&self) -> Option<bool> {
        match self {
            CallOutput::Flag(flag) => Some(*flag),
            _ => None,
        }
    }
}

impl Container {
    /// Create a new container. The first container created in the process
    /// becomes the default one.
    ///
    /// The default slot holds a strong handle: that container and every
    /// instance it has cached live until the process exits, unless
    /// [`reset_default`](Self::reset_default) is called.
    pub fn new() -> Self {
        let container = Self {
            tables: Arc::new(Tables {
                aliases: RwLock::new(AliasTable::new()),
                components: RwLock::new(ComponentRegistry::new()),
                instances: RwLock::new(InstanceCache::new()),
                types: RwLock::new(TypeCatalog::new()),
            }),
        };

        if default::register_first(&container) {
            debug!("Created default container");
        } else {
            debug!("Created container");
        }

        container
    }

    /// The first container constructed in this process
    pub fn get_default() -> Option<Container> {
        default::current()
    }

    /// Forget the default container, so the next one constructed takes its place
    pub fn reset_default() {
        if default::clear().is_some() {
            debug!("Default container reset");
        }
    }

    pub fn downgrade(&self) -> WeakContainer {
        WeakContainer {
            tables: Arc::downgrade(&self.tables),
        }
    }

    /// Check whether two handles point at the same container
    pub fn ptr_eq(&self, other: &Container) -> bool {
        Arc::ptr_eq(&self.tables, &other.tables)
    }

    /// Declare a constructible type under its fully-qualified name
    pub fn declare(&self, type_name: &str, constructor: TypeConstructor) -> &Self {
        self.tables.types.write().declare(type_name, constructor);
        trace!(type_name = type_name, "Type declared");
        self
    }

    pub fn has_type(&self, type_name: &str) -> bool {
        self.tables.types.read().contains(type_name)
    }

    fn type_constructor(&self, type_name: &str) -> Option<TypeConstructor> {
        self.tables.types.read().get(type_name)
    }

    /// Register a component.
    ///
    /// A bare type name and a spec are always transient. An instance is
    /// shared, a factory transient.
    pub fn set(&self, name: &str, definition: impl Into<Definition>) -> Result<&Self> {
        let definition = match definition.into() {
            Definition::Type(type_name) => {
                ComponentDefinition::new(Identity::Type(type_name), Lifetime::Transient)
            }
            Definition::Spec(spec) => {
                let identity = self.complete_identity(name, spec.identity)?;
                ComponentDefinition::new(identity, Lifetime::Transient).with_args(spec.args)
            }
            Definition::Instance(instance) => {
                ComponentDefinition::new(Identity::Instance(instance), Lifetime::Shared)
            }
            Definition::Factory(factory) => {
                ComponentDefinition::new(Identity::Factory(factory), Lifetime::Transient)
            }
        };

        self.insert_definition(name, definition);
        Ok(self)
    }

    /// Register a component that defaults to shared.
    ///
    /// A spec keeps an explicit lifetime; every other form is shared.
    pub fn set_shared(&self, name: &str, definition: impl Into<Definition>) -> Result<&Self> {
        let definition = match definition.into() {
            Definition::Type(type_name) => {
                ComponentDefinition::new(Identity::Type(type_name), Lifetime::Shared)
            }
            Definition::Spec(spec) => {
                let identity = self.complete_identity(name, spec.identity)?;
                ComponentDefinition::new(identity, spec.lifetime.unwrap_or_default())
                    .with_args(spec.args)
            }
            Definition::Instance(instance) => {
                ComponentDefinition::new(Identity::Instance(instance), Lifetime::Shared)
            }
            Definition::Factory(factory) => {
                ComponentDefinition::new(Identity::Factory(factory), Lifetime::Shared)
            }
        };

        self.insert_definition(name, definition);
        Ok(self)
    }

    fn insert_definition(&self, name: &str, definition: ComponentDefinition) {
        debug!(
            component = name,
            kind = definition.identity.kind(),
            lifetime = ?definition.lifetime,
            "Component registered"
        );
        self.tables.components.write().insert(name, definition);
    }

    /// Fill a missing identity from the registry, then an alias, then the
    /// name itself when it is a type path
    fn complete_identity(&self, name: &str, identity: Option<Identity>) -> Result<Identity> {
        if let Some(identity) = identity {
            return Ok(identity);
        }

        if let Some((_, existing)) = self.lookup(name)? {
            return Ok(existing.identity);
        }

        if is_type_path(name) {
            return Ok(Identity::Type(name.to_string()));
        }

        Err(Error::Definition(format!(
            "`{}` component definition is invalid: missing identity",
            name
        )))
    }

    /// Point `alias` at `canonical` unless the alias already exists
    pub fn set_alias(&self, canonical: &str, alias: &str) -> &Self {
        self.set_aliases(canonical, [alias], false)
    }

    /// Point every alias at `canonical`. Existing aliases are only replaced
    /// when `force` is set.
    pub fn set_aliases<I>(&self, canonical: &str, aliases: I, force: bool) -> &Self
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
    {
        let mut table = self.tables.aliases.write();
        for alias in aliases {
            let alias = alias.as_ref();
            if table.insert(alias, canonical, force) {
                debug!(alias = alias, component = canonical, "Alias set");
            } else {
                trace!(alias = alias, "Alias already set, keeping it");
            }
        }
        self
    }

    /// Remove a component, or an alias when `name` is one.
    ///
    /// Fails while any alias still points at `name`.
    pub fn remove(&self, name: &str) -> Result<&Self> {
        {
            let mut aliases = self.tables.aliases.write();
            if aliases.is_target(name) {
                return Err(Error::Dependency(format!(
                    "`{}` component is being used by alias {:?}, remove the alias first",
                    name,
                    aliases.dependents(name)
                )));
            }
            if aliases.remove(name).is_some() {
                debug!(alias = name, "Alias removed");
                return Ok(self);
            }
        }

        let definition = self.tables.components.write().remove(name);
        let instance = self.tables.instances.write().remove(name);
        debug!(
            component = name,
            had_definition = definition.is_some(),
            had_instance = instance.is_some(),
            "Component removed"
        );
        Ok(self)
    }

    /// Remove an alias. Returns whether it existed.
    pub fn remove_alias(&self, alias: &str) -> bool {
        let removed = self.tables.aliases.write().remove(alias).is_some();
        if removed {
            debug!(alias = alias, "Alias removed");
        }
        removed
    }

    /// Check whether a component or an alias is registered under `name`
    pub fn has(&self, name: &str) -> bool {
        self.tables.components.read().contains(name) || self.tables.aliases.read().contains(name)
    }

    /// Resolve `name`, caching the result when its lifetime is shared
    pub fn get(&self, name: &str) -> Result<Instance> {
        self.get_with(name, None)
    }

    /// Resolve `name`, replacing the stored constructor arguments with `args`
    /// when given.
    ///
    /// A name that is neither registered nor aliased is constructed as a type
    /// and not cached.
    pub fn get_with(&self, name: &str, args: Option<&[Value]>) -> Result<Instance> {
        if let Some(instance) = self.cached(name) {
            return Ok(instance);
        }

        match self.lookup(name)? {
            Some((canonical, definition)) => {
                let args = args.unwrap_or(&definition.args);
                let instance = resolver::resolve(self, &definition.identity, args, name)?;
                if definition.lifetime.is_shared() {
                    Ok(self.cache(&canonical, instance))
                } else {
                    trace!(component = name, "Transient instance built");
                    Ok(instance)
                }
            }
            None => {
                let identity = Identity::Type(name.to_string());
                resolver::resolve(self, &identity, args.unwrap_or(&[]), name)
            }
        }
    }

    /// Resolve `name` and always cache the result
    pub fn get_shared(&self, name: &str) -> Result<Instance> {
        if let Some(instance) = self.cached(name) {
            return Ok(instance);
        }

        match self.lookup(name)? {
            Some((canonical, definition)) => {
                let instance =
                    resolver::resolve(self, &definition.identity, &definition.args, name)?;
                Ok(self.cache(&canonical, instance))
            }
            None => {
                let instance = resolver::resolve(self, &Identity::Type(name.to_string()), &[], name)?;
                Ok(self.cache(name, instance))
            }
        }
    }

    /// Resolve `name` and downcast it to `T`
    pub fn get_as<T: Component>(&self, name: &str) -> Result<Arc<T>> {
        downcast(name, self.get(name)?)
    }

    /// Resolve `name` as shared and downcast it to `T`
    pub fn get_shared_as<T: Component>(&self, name: &str) -> Result<Arc<T>> {
        downcast(name, self.get_shared(name)?)
    }

    /// Build an instance from a definition without registering it
    pub fn get_instance(
        &self,
        definition: impl Into<Definition>,
        args: Option<&[Value]>,
        name: &str,
    ) -> Result<Instance> {
        let (identity, stored) = match definition.into() {
            Definition::Type(type_name) => (Identity::Type(type_name), Vec::new()),
            Definition::Spec(spec) => {
                let identity = spec.identity.ok_or_else(|| {
                    Error::Definition(format!(
                        "`{}` component definition is invalid: missing identity",
                        name
                    ))
                })?;
                (identity, spec.args)
            }
            Definition::Instance(instance) => (Identity::Instance(instance), Vec::new()),
            Definition::Factory(factory) => (Identity::Factory(factory), Vec::new()),
        };

        resolver::resolve(self, &identity, args.unwrap_or(&stored), name)
    }

    /// Property-style read, same as [`get_shared`](Self::get_shared)
    pub fn property(&self, name: &str) -> Result<Instance> {
        self.get_shared(name)
    }

    /// Property-style write: `None` removes the component, anything else
    /// registers it as shared
    pub fn set_property(&self, name: &str, definition: Option<Definition>) -> Result<&Self> {
        match definition {
            Some(definition) => self.set_shared(name, definition),
            None => self.remove(name),
        }
    }

    /// Re-initialise every cached instance that supports it. Returns how many
    /// were reconstructed.
    pub fn reconstruct_all(&self) -> usize {
        let snapshot = self.tables.instances.read().snapshot();

        let mut count = 0;
        for (name, instance) in snapshot {
            if let Some(target) = instance.reconstructible() {
                trace!(component = %name, "Reconstructing");
                target.reconstruct();
                count += 1;
            }
        }

        debug!(reconstructed = count, "Reconstructed cached instances");
        count
    }

    /// Re-initialise one cached instance. Returns false when nothing was done.
    pub fn reconstruct(&self, name: &str) -> bool {
        match self.cached(name) {
            Some(instance) => match instance.reconstructible() {
                Some(target) => {
                    target.reconstruct();
                    true
                }
                None => false,
            },
            None => false,
        }
    }

    /// Run a container operation named at runtime
    pub fn call(&self, operation: &str, name: &str) -> Result<CallOutput> {
        match operation.parse::<Operation>()? {
            Operation::Get => self.get(name).map(CallOutput::Instance),
            Operation::GetShared => self.get_shared(name).map(CallOutput::Instance),
            Operation::Has => Ok(CallOutput::Flag(self.has(name))),
            Operation::Remove => self.remove(name).map(|_| CallOutput::Done),
            Operation::Reconstruct => Ok(CallOutput::Flag(self.reconstruct(name))),
        }
    }

    /// Registered component names, sorted
    pub fn component_names(&self) -> Vec<String> {
        self.tables.components.read().names()
    }

    /// Alias names, sorted
    pub fn alias_names(&self) -> Vec<String> {
        self.tables.aliases.read().names()
    }

    /// Names of cached instances, sorted
    pub fn instance_names(&self) -> Vec<String> {
        self.tables.instances.read().names()
    }

    /// Canonical name `alias` points at
    pub fn alias_target(&self, alias: &str) -> Option<String> {
        self.tables.aliases.read().target(alias).map(str::to_string)
    }

    /// Check whether an instance is cached under `name` or its alias target
    pub fn is_cached(&self, name: &str) -> bool {
        self.cached(name).is_some()
    }

    fn cached(&self, name: &str) -> Option<Instance> {
        if let Some(instance) = self.tables.instances.read().get(name) {
            trace!(component = name, "Cache hit");
            return Some(instance);
        }

        let target = self.alias_target(name)?;
        let instance = self.tables.instances.read().get(&target);
        if instance.is_some() {
            trace!(component = name, canonical = %target, "Cache hit through alias");
        }
        instance
    }

    /// Find the definition for `name`, directly or through its alias
    fn lookup(&self, name: &str) -> Result<Option<(String, ComponentDefinition)>> {
        if let Some(definition) = self.tables.components.read().get(name) {
            return Ok(Some((name.to_string(), definition.clone())));
        }

        let Some(target) = self.alias_target(name) else {
            return Ok(None);
        };

        match self.tables.components.read().get(&target) {
            Some(definition) => Ok(Some((target.clone(), definition.clone()))),
            None => Err(Error::Definition(format!(
                "`{}` is an alias of `{}` which is not registered",
                name, target
            ))),
        }
    }

    /// Cache `instance` under `canonical`. If another instance got there
    /// first that one is kept and returned.
    fn cache(&self, canonical: &str, instance: Instance) -> Instance {
        let mut instances = self.tables.instances.write();
        if let Some(existing) = instances.get(canonical) {
            return existing;
        }
        instances.insert(canonical, instance.clone());
        debug!(component = canonical, "Instance cached");
        instance
    }
}

fn downcast<T: Component>(name: &str, instance: Instance) -> Result<Arc<T>> {
    instance.into_any().downcast::<T>().map_err(|_| {
        Error::Definition(format!(
            "`{}` component is not a `{}`",
            name,
            std::any::type_name::<T>()
        ))
    })
}

impl Default for Container {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Container {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Container")
            .field("components", &self.component_names())
            .field("aliases", &self.alias_names())
            .field("instances", &self.instance_names())
            .field("types", &self.tables.types.read().names())
            .finish()
    }
}
