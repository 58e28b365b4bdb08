//! Instance construction.
//!
//! Types are looked up by fully-qualified name in a [`TypeCatalog`]. Each
//! [`TypeConstructor`] carries optional fixed-arity fast paths for zero to
//! three arguments and a variadic constructor used for every other arity.
//! Both routes must build equivalent instances.

use super::definition::Identity;
use super::Container;
use crate::error::{Error, Result};
use crate::logging::trace;
use crate::traits::{Component, Instance};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

type Nullary = Arc<dyn Fn() -> Result<Instance> + Send + Sync>;
type Unary = Arc<dyn Fn(&Value) -> Result<Instance> + Send + Sync>;
type Binary = Arc<dyn Fn(&Value, &Value) -> Result<Instance> + Send + Sync>;
type Ternary = Arc<dyn Fn(&Value, &Value, &Value) -> Result<Instance> + Send + Sync>;
type Variadic = Arc<dyn Fn(&[Value]) -> Result<Instance> + Send + Sync>;

/// How to build one declared type from positional arguments
#[derive(Clone)]
pub struct TypeConstructor {
    nullary: Option<Nullary>,
    unary: Option<Unary>,
    binary: Option<Binary>,
    ternary: Option<Ternary>,
    variadic: Variadic,
}

impl TypeConstructor {
    /// Create a constructor from the variadic form, which handles any arity
    pub fn new<T, F>(variadic: F) -> Self
    where
        T: Component,
        F: Fn(&[Value]) -> Result<T> + Send + Sync + 'static,
    {
        Self {
            nullary: None,
            unary: None,
            binary: None,
            ternary: None,
            variadic: Arc::new(move |args| Ok(Arc::new(variadic(args)?) as Instance)),
        }
    }

    /// Construct with `T::default()`, ignoring any arguments
    pub fn from_default<T>() -> Self
    where
        T: Component + Default,
    {
        Self::new(|_args| Ok(T::default())).with_nullary(|| Ok(T::default()))
    }

    /// Construct by deserializing the arguments.
    ///
    /// No arguments deserialize from `null`, a single argument from itself,
    /// and several arguments from the array of all of them.
    pub fn from_deserialize<T>() -> Self
    where
        T: Component + DeserializeOwned,
    {
        Self::new(|args: &[Value]| {
            let value = match args {
                [] => Value::Null,
                [single] => single.clone(),
                many => Value::Array(many.to_vec()),
            };
            serde_json::from_value::<T>(value).map_err(|e| {
                Error::Definition(format!(
                    "`{}` cannot be built from arguments: {}",
                    std::any::type_name::<T>(),
                    e
                ))
            })
        })
    }

    pub fn with_nullary<T, F>(mut self, f: F) -> Self
    where
        T: Component,
        F: Fn() -> Result<T> + Send + Sync + 'static,
    {
        self.nullary = Some(Arc::new(move || Ok(Arc::new(f()?) as Instance)));
        self
    }

    pub fn with_unary<T, F>(mut self, f: F) -> Self
    where
        T: Component,
        F: Fn(&Value) -> Result<T> + Send + Sync + 'static,
    {
        self.unary = Some(Arc::new(move |a| Ok(Arc::new(f(a)?) as Instance)));
        self
    }

    pub fn with_binary<T, F>(mut self, f: F) -> Self
    where
        T: Component,
        F: Fn(&Value, &Value) -> Result<T> + Send + Sync + 'static,
    {
        self.binary = Some(Arc::new(move |a, b| Ok(Arc::new(f(a, b)?) as Instance)));
        self
    }

    pub fn with_ternary<T, F>(mut self, f: F) -> Self
    where
        T: Component,
        F: Fn(&Value, &Value, &Value) -> Result<T> + Send + Sync + 'static,
    {
        self.ternary = Some(Arc::new(move |a, b, c| Ok(Arc::new(f(a, b, c)?) as Instance)));
        self
    }

    /// Build an instance, taking a fast path when one matches the arity
    pub fn construct(&self, args: &[Value]) -> Result<Instance> {
        match (args, &self.nullary, &self.unary, &self.binary, &self.ternary) {
            ([], Some(f), _, _, _) => f(),
            ([a], _, Some(f), _, _) => f(a),
            ([a, b], _, _, Some(f), _) => f(a, b),
            ([a, b, c], _, _, _, Some(f)) => f(a, b, c),
            _ => {
                trace!(arity = args.len(), "Using variadic constructor");
                (self.variadic)(args)
            }
        }
    }
}

/// Deserialize the positional argument at `index`
pub fn arg<T: DeserializeOwned>(args: &[Value], index: usize) -> Result<T> {
    let value = args
        .get(index)
        .ok_or_else(|| Error::Definition(format!("missing constructor argument #{}", index)))?;
    serde_json::from_value(value.clone())
        .map_err(|e| Error::Definition(format!("invalid constructor argument #{}: {}", index, e)))
}

/// Declared types, keyed by fully-qualified name
#[derive(Default, Clone)]
pub struct TypeCatalog {
    types: HashMap<String, TypeConstructor>,
}

impl TypeCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn declare(&mut self, type_name: &str, constructor: TypeConstructor) {
        self.types.insert(type_name.to_string(), constructor);
    }

    pub fn get(&self, type_name: &str) -> Option<TypeConstructor> {
        self.types.get(type_name).cloned()
    }

    pub fn contains(&self, type_name: &str) -> bool {
        self.types.contains_key(type_name)
    }

    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.types.keys().cloned().collect();
        names.sort();
        names
    }
}

/// Build an instance for `identity` and hand it the container when it asks
/// for one. No container lock is held while user code runs.
pub(super) fn resolve(
    container: &Container,
    identity: &Identity,
    args: &[Value],
    name: &str,
) -> Result<Instance> {
    let instance = match identity {
        Identity::Type(type_name) => {
            let constructor = container.type_constructor(type_name).ok_or_else(|| {
                Error::Definition(format!(
                    "`{}` component cannot be resolved: `{}` type does not exist",
                    name, type_name
                ))
            })?;
            constructor.construct(args)?
        }
        Identity::Factory(factory) => factory(container, args)?,
        Identity::Instance(instance) => instance.clone(),
    };

    if let Some(aware) = instance.container_aware() {
        trace!(component = name, "Injecting container");
        aware.set_container(container);
    }

    Ok(instance)
}
