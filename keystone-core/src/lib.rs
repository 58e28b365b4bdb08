// Core library for the Keystone framework
// Component container, dispatch state machine and dispatch events

pub mod container;
pub mod dispatcher;
pub mod error;
pub mod events;
pub mod logging;
pub mod traits;

// Re-export commonly used types
pub use container::{
    arg, CallOutput, ComponentDefinition, Container, Definition, DefinitionSpec, Factory,
    Identity, Lifetime, Operation, TypeConstructor, WeakContainer,
};
pub use dispatcher::{
    DefaultActionInvoker, DispatchContext, Dispatcher, DispatcherConfig, Params,
    MAX_DISPATCH_HOPS,
};
pub use error::*;
pub use events::{DispatchEvent, EventManager, Listener};
pub use traits::*;
