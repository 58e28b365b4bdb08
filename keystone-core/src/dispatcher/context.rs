//! Per-dispatch state.

use super::naming::{normalize_action, normalize_controller, underscore};
use crate::error::{Error, Result};
use crate::traits::Instance;
use serde_json::{Map, Value};
use std::fmt;

/// Action parameters
pub type Params = Map<String, Value>;

/// State of one dispatch cycle
#[derive(Clone, Default)]
pub struct DispatchContext {
    pub module: String,
    pub controller: String,
    pub action: String,
    pub params: Params,
    /// Cleared by a forward; the loop runs again while it is false
    pub finished: bool,
    pub forwarded: bool,
    /// True between the start and the end of `dispatch`
    pub active: bool,
    pub instance: Option<Instance>,
    pub returned_value: Value,
    pub previous_controller: String,
    pub previous_action: String,
}

impl DispatchContext {
    /// Fresh context with normalized names
    pub fn new(module: &str, controller: &str, action: &str, params: Params) -> Self {
        Self {
            module: normalize_controller(module),
            controller: normalize_controller(controller),
            action: normalize_action(action),
            params,
            ..Self::default()
        }
    }

    /// Redirect to `action` or `controller/action`
    pub fn forward(&mut self, target: &str, params: Params) -> Result<()> {
        let parts: Vec<&str> = target.split('/').collect();
        match parts.as_slice() {
            [action] => {
                self.previous_action = std::mem::replace(&mut self.action, normalize_action(action));
            }
            [controller, action] => {
                self.previous_controller =
                    std::mem::replace(&mut self.controller, normalize_controller(controller));
                self.previous_action = std::mem::replace(&mut self.action, normalize_action(action));
            }
            _ => {
                return Err(Error::Dispatcher(format!(
                    "`{}` forward format is invalid",
                    target
                )));
            }
        }

        self.params.extend(params);
        self.finished = false;
        self.forwarded = true;
        Ok(())
    }

    /// Lookup a param; `null` counts as absent
    pub fn param(&self, key: &str) -> Option<&Value> {
        self.params.get(key).filter(|value| !value.is_null())
    }

    /// Lower snake case `module{glue}controller{glue}action`
    pub fn mca(&self, glue: &str) -> String {
        format!(
            "{}{glue}{}{glue}{}",
            underscore(&self.module),
            underscore(&self.controller),
            underscore(&self.action),
        )
    }
}

impl fmt::Debug for DispatchContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DispatchContext")
            .field("module", &self.module)
            .field("controller", &self.controller)
            .field("action", &self.action)
            .field("params", &self.params)
            .field("finished", &self.finished)
            .field("forwarded", &self.forwarded)
            .field("returned_value", &self.returned_value)
            .field("previous_controller", &self.previous_controller)
            .field("previous_action", &self.previous_action)
            .finish_non_exhaustive()
    }
}
