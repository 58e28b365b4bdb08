// Dispatch state machine
//
// Resolves the controller for the current context through the container,
// runs the lifecycle events and hooks around the action and restarts when a
// forward clears the `finished` flag. The context lock is never held while
// listeners, hooks or actions run, so they may call back into the dispatcher.

mod context;
pub mod naming;

pub use context::{DispatchContext, Params};

use crate::container::{Container, WeakContainer};
use crate::error::{Error, Result};
use crate::events::{DispatchEvent, EventManager};
use crate::logging::{debug, debug_span, trace, warn};
use crate::traits::{
    ActionInvoker, Component, ContainerAware, Flow, Instance, Reconstruct, Sanitizer,
};
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

/// Hard cap on loop iterations of one dispatch
pub const MAX_DISPATCH_HOPS: usize = 32;

/// Placeholder replaced by the module name in the controller namespace
const MODULE_PLACEHOLDER: &str = "{module}";

/// Dispatcher configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DispatcherConfig {
    /// Namespace of controller types; `{module}` is replaced by the module name
    pub controller_namespace: String,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            controller_namespace: format!("{}::Controllers", MODULE_PLACEHOLDER),
        }
    }
}

impl DispatcherConfig {
    pub fn new(controller_namespace: impl Into<String>) -> Self {
        Self {
            controller_namespace: controller_namespace.into(),
        }
    }

    /// Fully-qualified type name of a controller
    pub fn controller_type(&self, module: &str, controller: &str) -> String {
        let namespace = self.controller_namespace.replace(MODULE_PLACEHOLDER, module);
        if namespace.is_empty() {
            format!("{}Controller", controller)
        } else {
            format!("{}::{}Controller", namespace, controller)
        }
    }
}

/// Invokes actions through the controller's [`Actions`](crate::Actions) capability
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultActionInvoker;

impl ActionInvoker for DefaultActionInvoker {
    fn invoke_action(
        &self,
        dispatcher: &Dispatcher,
        controller: &Instance,
        action: &str,
        params: &Params,
    ) -> Result<Value> {
        let not_found = || {
            Error::NotFoundAction(format!(
                "`{}::{}` action does not exist",
                dispatcher.controller_type_name(),
                action
            ))
        };

        let actions = controller.actions().ok_or_else(not_found)?;
        if !actions.has_action(action) {
            return Err(not_found());
        }

        actions.call_action(action, params, dispatcher)
    }
}

/// Request dispatcher
pub struct Dispatcher {
    container: RwLock<WeakContainer>,
    invoker: Arc<dyn ActionInvoker>,
    events: Option<Arc<EventManager>>,
    sanitizer: Option<Arc<dyn Sanitizer>>,
    config: DispatcherConfig,
    state: Mutex<DispatchContext>,
}

impl Dispatcher {
    /// Create a dispatcher resolving controllers through `container`.
    ///
    /// Only a weak handle is kept, so the dispatcher may itself be cached by
    /// the container.
    pub fn new(container: &Container) -> Self {
        Self {
            container: RwLock::new(container.downgrade()),
            invoker: Arc::new(DefaultActionInvoker),
            events: None,
            sanitizer: None,
            config: DispatcherConfig::default(),
            state: Mutex::new(DispatchContext::default()),
        }
    }

    pub fn with_invoker(mut self, invoker: Arc<dyn ActionInvoker>) -> Self {
        self.invoker = invoker;
        self
    }

    pub fn with_events(mut self, events: Arc<EventManager>) -> Self {
        self.events = Some(events);
        self
    }

    pub fn with_sanitizer(mut self, sanitizer: Arc<dyn Sanitizer>) -> Self {
        self.sanitizer = Some(sanitizer);
        self
    }

    pub fn with_config(mut self, config: DispatcherConfig) -> Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> &DispatcherConfig {
        &self.config
    }

    pub fn events(&self) -> Option<&Arc<EventManager>> {
        self.events.as_ref()
    }

    fn container(&self) -> Result<Container> {
        self.container
            .read()
            .upgrade()
            .ok_or_else(|| Error::Dispatcher("container has been dropped".into()))
    }

    /// Dispatch to `module`/`controller`/`action`.
    ///
    /// Returns `Ok(false)` when a `beforeDispatch` or route event listener
    /// halts, `Ok(true)` when the cycle completes.
    pub fn dispatch(
        &self,
        module: &str,
        controller: &str,
        action: &str,
        params: Params,
    ) -> Result<bool> {
        {
            let mut state = self.state.lock();
            *state = DispatchContext::new(module, controller, action, params);
            state.active = true;
        }

        let span = debug_span!("dispatch", module, controller, action);
        let _entered = span.enter();

        let result = self.run();
        self.state.lock().active = false;

        match &result {
            Ok(true) => debug!(mca = %self.get_mca("/"), "Dispatch finished"),
            Ok(false) => debug!("Dispatch aborted"),
            Err(e) => debug!(error = %e, "Dispatch failed"),
        }
        result
    }

    fn run(&self) -> Result<bool> {
        if self.fire(DispatchEvent::BeforeDispatch)?.is_halt() {
            return Ok(false);
        }

        let container = self.container()?;
        let mut hops = 0;

        self.state.lock().finished = false;
        while !self.state.lock().finished {
            self.state.lock().finished = true;

            if hops == MAX_DISPATCH_HOPS {
                warn!(hops, "Cyclic routing detected");
                return Err(Error::CyclicForward(format!(
                    "dispatcher has detected a cyclic routing after {} hops",
                    hops
                )));
            }
            hops += 1;

            if self.run_hop(&container)?.is_halt() {
                return Ok(false);
            }
        }

        self.fire(DispatchEvent::AfterDispatch)?;
        Ok(true)
    }

    /// One loop iteration. `Halt` aborts the whole dispatch; `Proceed` lets
    /// the loop check whether a forward happened.
    fn run_hop(&self, container: &Container) -> Result<Flow> {
        let type_name = self.controller_type_name();
        trace!(controller = %type_name, "Resolving controller");

        if !container.has_type(&type_name) && !container.has(&type_name) {
            return Err(Error::NotFoundController(format!(
                "`{}` controller cannot be loaded",
                type_name
            )));
        }

        let controller = container.get_shared(&type_name)?;
        self.state.lock().instance = Some(controller.clone());

        if self.fire(DispatchEvent::BeforeExecuteRoute)?.is_halt() {
            return Ok(Flow::Halt);
        }
        if self.is_forwarding() {
            return Ok(Flow::Proceed);
        }

        if let Some(hooks) = controller.hooks() {
            if hooks.before_execute_route(self)?.is_halt() || self.is_forwarding() {
                return Ok(Flow::Proceed);
            }
        }

        let (action, params) = {
            let state = self.state.lock();
            (state.action.clone(), state.params.clone())
        };
        let value = self
            .invoker
            .invoke_action(self, &controller, &action, &params)?;
        self.state.lock().returned_value = value;
        if self.is_forwarding() {
            return Ok(Flow::Proceed);
        }

        if self.fire(DispatchEvent::AfterExecuteRoute)?.is_halt() {
            return Ok(Flow::Halt);
        }
        if self.is_forwarding() {
            return Ok(Flow::Proceed);
        }

        if let Some(hooks) = controller.hooks() {
            hooks.after_execute_route(self)?;
        }

        Ok(Flow::Proceed)
    }

    fn fire(&self, event: DispatchEvent) -> Result<Flow> {
        match &self.events {
            Some(events) => events.fire(event, self),
            None => Ok(Flow::Proceed),
        }
    }

    fn is_forwarding(&self) -> bool {
        !self.state.lock().finished
    }

    /// Continue the current dispatch with `action` or `controller/action`.
    ///
    /// `params` are merged into the current params. Only valid while a
    /// dispatch is running.
    pub fn forward(&self, target: &str, params: Params) -> Result<()> {
        let mut state = self.state.lock();
        if !state.active {
            return Err(Error::Dispatcher(format!(
                "cannot forward to `{}` outside a dispatch cycle",
                target
            )));
        }
        state.forward(target, params)?;
        debug!(
            forward_to = target,
            controller = %state.controller,
            action = %state.action,
            "Forwarded"
        );
        Ok(())
    }

    pub fn was_forwarded(&self) -> bool {
        self.state.lock().forwarded
    }

    pub fn module_name(&self) -> String {
        self.state.lock().module.clone()
    }

    pub fn controller_name(&self) -> String {
        self.state.lock().controller.clone()
    }

    /// Set the controller name, camelizing it
    pub fn set_controller_name(&self, controller: &str) -> &Self {
        self.state.lock().controller = naming::camelize(controller);
        self
    }

    pub fn action_name(&self) -> String {
        self.state.lock().action.clone()
    }

    /// Set the action name in lower camel case
    pub fn set_action_name(&self, action: &str) -> &Self {
        self.state.lock().action = naming::lcfirst(&naming::camelize(action));
        self
    }

    /// Fully-qualified type name of the current controller
    pub fn controller_type_name(&self) -> String {
        let state = self.state.lock();
        self.config.controller_type(&state.module, &state.controller)
    }

    pub fn previous_controller_name(&self) -> String {
        self.state.lock().previous_controller.clone()
    }

    pub fn previous_action_name(&self) -> String {
        self.state.lock().previous_action.clone()
    }

    pub fn params(&self) -> Params {
        self.state.lock().params.clone()
    }

    /// Replace the params, or merge into them when `merge` is set
    pub fn set_params(&self, params: Params, merge: bool) -> &Self {
        let mut state = self.state.lock();
        if merge {
            state.params.extend(params);
        } else {
            state.params = params;
        }
        self
    }

    pub fn has_param(&self, key: &str) -> bool {
        self.state.lock().param(key).is_some()
    }

    /// Read a param, optionally filtered through the sanitizer by `rule`
    pub fn get_param(&self, key: &str, rule: Option<&str>) -> Result<Value> {
        let value = self
            .state
            .lock()
            .param(key)
            .cloned()
            .ok_or_else(|| Error::Dispatcher(format!("`{}` param does not exist", key)))?;

        match rule {
            None => Ok(value),
            Some(rule) => {
                let sanitizer = self.sanitizer.as_ref().ok_or_else(|| {
                    Error::Dispatcher(format!(
                        "cannot apply rule `{}` to `{}`: no sanitizer configured",
                        rule, key
                    ))
                })?;
                sanitizer.sanitize(key, rule, &value)
            }
        }
    }

    pub fn returned_value(&self) -> Value {
        self.state.lock().returned_value.clone()
    }

    pub fn set_returned_value(&self, value: Value) -> &Self {
        self.state.lock().returned_value = value;
        self
    }

    /// Controller resolved by the latest hop
    pub fn controller(&self) -> Option<Instance> {
        self.state.lock().instance.clone()
    }

    /// Lower snake case `module/controller/action` joined by `glue`
    pub fn get_mca(&self, glue: &str) -> String {
        self.state.lock().mca(glue)
    }

    /// Copy of the current context
    pub fn context(&self) -> DispatchContext {
        self.state.lock().clone()
    }
}

impl fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dispatcher")
            .field("config", &self.config)
            .field("context", &*self.state.lock())
            .field("events", &self.events)
            .finish_non_exhaustive()
    }
}

impl Component for Dispatcher {
    fn container_aware(&self) -> Option<&dyn ContainerAware> {
        Some(self)
    }

    fn reconstructible(&self) -> Option<&dyn Reconstruct> {
        Some(self)
    }
}

impl ContainerAware for Dispatcher {
    fn set_container(&self, container: &Container) {
        *self.container.write() = container.downgrade();
    }
}

impl Reconstruct for Dispatcher {
    /// Drop the state of the previous request
    fn reconstruct(&self) {
        *self.state.lock() = DispatchContext::default();
    }
}
