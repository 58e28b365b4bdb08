// Core traits for the Keystone framework
//
// Every value the container hands out is a `Component`. Optional behaviour
// (container back-reference, re-initialisation, controller hooks, actions)
// is discovered through capability queries that default to `None`.

use crate::container::Container;
use crate::dispatcher::{Dispatcher, Params};
use crate::error::Result;
use serde_json::Value;
use std::any::Any;
use std::sync::Arc;

/// A live component instance as stored in the instance cache
pub type Instance = Arc<dyn Component>;

/// Conversion to `Any` for downcasting shared instances
pub trait AsAny: Any + Send + Sync {
    fn into_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync>;
    fn as_any(&self) -> &dyn Any;
}

impl<T: Any + Send + Sync> AsAny for T {
    fn into_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync> {
        self
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Trait for types that can be resolved through the container
pub trait Component: AsAny {
    /// Capability: receives the resolving container after construction
    fn container_aware(&self) -> Option<&dyn ContainerAware> {
        None
    }

    /// Capability: can refresh its internal state without being rebuilt
    fn reconstructible(&self) -> Option<&dyn Reconstruct> {
        None
    }

    /// Capability: controller lifecycle hooks run around each action
    fn hooks(&self) -> Option<&dyn ControllerHooks> {
        None
    }

    /// Capability: named actions callable by [`DefaultActionInvoker`](crate::DefaultActionInvoker)
    fn actions(&self) -> Option<&dyn Actions> {
        None
    }
}

/// Plain values may be registered directly, e.g. from configuration
impl Component for Value {}

/// Receives a back-reference to the container that built the instance.
///
/// Implementors usually keep a [`WeakContainer`](crate::WeakContainer) so
/// that a shared instance cached by the container does not keep it alive.
pub trait ContainerAware: Send + Sync {
    fn set_container(&self, container: &Container);
}

/// Re-initialisation hook invoked by [`Container::reconstruct_all`]
pub trait Reconstruct: Send + Sync {
    fn reconstruct(&self);
}

/// Result of an event listener or controller hook
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    /// Carry on with the current phase
    Proceed,
    /// Stop the current phase
    Halt,
}

impl Flow {
    pub fn is_halt(&self) -> bool {
        matches!(self, Flow::Halt)
    }
}

impl From<bool> for Flow {
    fn from(proceed: bool) -> Self {
        if proceed { Flow::Proceed } else { Flow::Halt }
    }
}

/// Optional hooks a controller may expose
pub trait ControllerHooks: Send + Sync {
    /// Runs before the action; `Halt` skips the action for this hop
    fn before_execute_route(&self, _dispatcher: &Dispatcher) -> Result<Flow> {
        Ok(Flow::Proceed)
    }

    /// Runs after the action and the `afterExecuteRoute` event
    fn after_execute_route(&self, _dispatcher: &Dispatcher) -> Result<Flow> {
        Ok(Flow::Proceed)
    }
}

/// Named actions exposed by a controller
pub trait Actions: Send + Sync {
    fn has_action(&self, action: &str) -> bool;

    fn call_action(&self, action: &str, params: &Params, dispatcher: &Dispatcher) -> Result<Value>;
}

/// Invokes an action on a resolved controller
pub trait ActionInvoker: Send + Sync {
    /// Must fail with [`Error::NotFoundAction`](crate::Error::NotFoundAction)
    /// when the controller has no such action.
    fn invoke_action(
        &self,
        dispatcher: &Dispatcher,
        controller: &Instance,
        action: &str,
        params: &Params,
    ) -> Result<Value>;
}

/// Filters a raw parameter value according to a named rule
pub trait Sanitizer: Send + Sync {
    fn sanitize(&self, param: &str, rule: &str, value: &Value) -> Result<Value>;
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Plain;
    impl Component for Plain {}

    #[test]
    fn test_capabilities_default_to_none() {
        let instance: Instance = Arc::new(Plain);
        assert!(instance.container_aware().is_none());
        assert!(instance.reconstructible().is_none());
        assert!(instance.hooks().is_none());
        assert!(instance.actions().is_none());
    }

    #[test]
    fn test_into_any_downcast() {
        let instance: Instance = Arc::new(Plain);
        assert!(instance.clone().into_any().downcast::<Plain>().is_ok());

        let value: Instance = Arc::new(Value::from(7));
        let value = value.into_any().downcast::<Value>().unwrap();
        assert_eq!(*value, Value::from(7));
    }

    #[test]
    fn test_flow_from_bool() {
        assert_eq!(Flow::from(true), Flow::Proceed);
        assert!(Flow::from(false).is_halt());
    }
}
