// Recording action invoker

use keystone_core::{ActionInvoker, Dispatcher, Error, Instance, Params, Result};
use parking_lot::Mutex;
use serde_json::Value;
use std::collections::HashMap;
use tracing::trace;

/// One recorded action call
#[derive(Debug, Clone, PartialEq)]
pub struct Invocation {
    /// Fully-qualified controller type, e.g. `App::Controllers::PostsController`
    pub controller_type: String,
    pub action: String,
    pub params: Params,
}

#[derive(Clone)]
enum Behaviour {
    Respond(Value),
    Forward(String, Params),
    Fail(String),
}

/// Action invoker that records every call instead of running controller code.
///
/// Actions return `null` unless a response, forward or failure is configured
/// for them with [`respond`](Self::respond), [`forward_on`](Self::forward_on)
/// or [`fail_on`](Self::fail_on).
#[derive(Default)]
pub struct RecordingInvoker {
    calls: Mutex<Vec<Invocation>>,
    behaviours: Mutex<HashMap<String, Behaviour>>,
}

impl RecordingInvoker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return `value` from `action`
    pub fn respond(self, action: &str, value: Value) -> Self {
        self.behaviours
            .lock()
            .insert(action.to_string(), Behaviour::Respond(value));
        self
    }

    /// Forward to `target` (`action` or `controller/action`) whenever `action` runs
    pub fn forward_on(self, action: &str, target: &str, params: Params) -> Self {
        self.behaviours.lock().insert(
            action.to_string(),
            Behaviour::Forward(target.to_string(), params),
        );
        self
    }

    /// Fail `action` with an [`Error::Action`]
    pub fn fail_on(self, action: &str, message: &str) -> Self {
        self.behaviours
            .lock()
            .insert(action.to_string(), Behaviour::Fail(message.to_string()));
        self
    }

    pub fn calls(&self) -> Vec<Invocation> {
        self.calls.lock().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().len()
    }

    pub fn last_call(&self) -> Option<Invocation> {
        self.calls.lock().last().cloned()
    }

    /// Check if an action was called on any controller
    pub fn was_called(&self, action: &str) -> bool {
        self.calls.lock().iter().any(|call| call.action == action)
    }

    /// Number of calls that reached a controller whose type ends with `suffix`
    pub fn controller_call_count(&self, suffix: &str) -> usize {
        self.calls
            .lock()
            .iter()
            .filter(|call| call.controller_type.ends_with(suffix))
            .count()
    }

    pub fn clear(&self) {
        self.calls.lock().clear();
    }
}

impl ActionInvoker for RecordingInvoker {
    fn invoke_action(
        &self,
        dispatcher: &Dispatcher,
        _controller: &Instance,
        action: &str,
        params: &Params,
    ) -> Result<Value> {
        let invocation = Invocation {
            controller_type: dispatcher.controller_type_name(),
            action: action.to_string(),
            params: params.clone(),
        };
        trace!(controller = %invocation.controller_type, action, "Recorded action call");
        self.calls.lock().push(invocation);

        // cloned so the lock is released before a forward calls back in
        let behaviour = self.behaviours.lock().get(action).cloned();
        match behaviour {
            None => Ok(Value::Null),
            Some(Behaviour::Respond(value)) => Ok(value),
            Some(Behaviour::Fail(message)) => Err(Error::Action(message)),
            Some(Behaviour::Forward(target, params)) => {
                dispatcher.forward(&target, params)?;
                Ok(Value::Null)
            }
        }
    }
}
