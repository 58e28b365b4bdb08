// Keystone - a component container and MVC dispatch state machine for Rust
//
// Components are registered by name and resolved through the container; the
// dispatcher resolves controllers from the same container and runs actions
// inside a forward-aware lifecycle.

// Re-export core functionality
pub use keystone_core::*;

// Serialization crates used in component arguments and action results
pub use serde;
pub use serde_json;

// Re-export optional crates
#[cfg(feature = "config")]
pub use keystone_config;

#[cfg(feature = "testing")]
pub use keystone_testing;

// Prelude for common imports
pub mod prelude {
    pub use crate::{
        arg, Actions, Component, Container, ContainerAware, ControllerHooks, Definition,
        DefinitionSpec, DispatchEvent, Dispatcher, DispatcherConfig, Error, EventManager, Flow,
        Instance, Lifetime, Params, Reconstruct, Result, TypeConstructor,
    };

    #[cfg(feature = "config")]
    pub use keystone_config::{AppConfig, ConfigManager};
}
