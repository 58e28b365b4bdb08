// Test container for component wiring

use keystone_core::{
    Component, Container, Definition, Dispatcher, DispatcherConfig, Result, TypeConstructor,
};
use std::sync::Arc;

/// Container wrapper with helpers for registering mocks and controllers
pub struct TestContainer {
    container: Container,
    config: DispatcherConfig,
}

impl TestContainer {
    /// Create a new test container using the default controller namespace
    pub fn new() -> Self {
        Self::with_config(DispatcherConfig::default())
    }

    /// Create a test container whose controllers follow `config`
    pub fn with_config(config: DispatcherConfig) -> Self {
        Self {
            container: Container::new(),
            config,
        }
    }

    /// Declare a controller type built from `Default`.
    ///
    /// `module` and `controller` are the normalized names, e.g. `Admin` and
    /// `BlogPost`.
    pub fn controller<T: Component + Default>(&self, module: &str, controller: &str) -> &Self {
        let type_name = self.config.controller_type(module, controller);
        self.container
            .declare(&type_name, TypeConstructor::from_default::<T>());
        self
    }

    /// Register a ready-made controller instance
    pub fn controller_instance<T: Component>(
        &self,
        module: &str,
        controller: &str,
        instance: T,
    ) -> Result<&Self> {
        let type_name = self.config.controller_type(module, controller);
        self.container
            .set_shared(&type_name, Definition::instance(instance))?;
        Ok(self)
    }

    /// Register a shared mock and hand back the instance the container caches
    pub fn register_mock<T: Component>(&self, name: &str, mock: T) -> Result<Arc<T>> {
        self.container.set_shared(name, Definition::instance(mock))?;
        self.container.get_shared_as::<T>(name)
    }

    /// A dispatcher resolving through this container
    pub fn dispatcher(&self) -> Dispatcher {
        Dispatcher::new(&self.container).with_config(self.config.clone())
    }

    /// Drop every registration by starting over with a fresh container
    pub fn clear(&mut self) {
        self.container = Container::new();
    }

    /// Get the underlying container
    pub fn inner(&self) -> &Container {
        &self.container
    }
}

impl Default for TestContainer {
    fn default() -> Self {
        Self::new()
    }
}

impl std::ops::Deref for TestContainer {
    type Target = Container;

    fn deref(&self) -> &Container {
        &self.container
    }
}
