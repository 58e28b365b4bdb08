// Fluent assertions for dispatch outcomes

use keystone_core::{Dispatcher, Error, Params, Result};
use serde_json::Value;

/// Run a dispatch and wrap the outcome for assertions
pub fn dispatch<'a>(
    dispatcher: &'a Dispatcher,
    module: &str,
    controller: &str,
    action: &str,
    params: Params,
) -> DispatchAssertions<'a> {
    let outcome = dispatcher.dispatch(module, controller, action, params);
    DispatchAssertions::new(dispatcher, outcome)
}

/// Assertions over a finished [`Dispatcher::dispatch`] call.
///
/// Every method panics with a descriptive message on mismatch and returns
/// `self` so checks can be chained:
///
/// ```ignore
/// dispatch(&dispatcher, "app", "posts", "index", Params::new())
///     .finished()
///     .controller("Posts")
///     .action("index")
///     .returned(&json!({"ok": true}));
/// ```
pub struct DispatchAssertions<'a> {
    dispatcher: &'a Dispatcher,
    outcome: Result<bool>,
}

impl<'a> DispatchAssertions<'a> {
    pub fn new(dispatcher: &'a Dispatcher, outcome: Result<bool>) -> Self {
        Self {
            dispatcher,
            outcome,
        }
    }

    /// The cycle ran to the end
    pub fn finished(self) -> Self {
        match &self.outcome {
            Ok(true) => {}
            Ok(false) => panic!("Expected dispatch to finish, but a listener aborted it"),
            Err(e) => panic!("Expected dispatch to finish, but it failed: {}", e),
        }
        self
    }

    /// A listener halted the cycle
    pub fn aborted(self) -> Self {
        match &self.outcome {
            Ok(false) => {}
            Ok(true) => panic!("Expected dispatch to be aborted, but it finished"),
            Err(e) => panic!("Expected dispatch to be aborted, but it failed: {}", e),
        }
        self
    }

    /// The cycle failed with an error matching `predicate`
    pub fn failed_with(self, predicate: impl FnOnce(&Error) -> bool) -> Self {
        match &self.outcome {
            Err(e) => assert!(predicate(e), "Dispatch failed with unexpected error: {}", e),
            Ok(finished) => panic!("Expected dispatch to fail, got Ok({})", finished),
        }
        self
    }

    pub fn not_found(self) -> Self {
        self.failed_with(Error::is_not_found)
    }

    pub fn cyclic(self) -> Self {
        self.failed_with(|e| matches!(e, Error::CyclicForward(_)))
    }

    pub fn controller(self, expected: &str) -> Self {
        let actual = self.dispatcher.controller_name();
        assert_eq!(
            actual, expected,
            "Expected controller '{}', got '{}'",
            expected, actual
        );
        self
    }

    pub fn action(self, expected: &str) -> Self {
        let actual = self.dispatcher.action_name();
        assert_eq!(
            actual, expected,
            "Expected action '{}', got '{}'",
            expected, actual
        );
        self
    }

    /// The final route was reached through a forward from `controller`/`action`
    pub fn forwarded_from(self, controller: &str, action: &str) -> Self {
        assert!(
            self.dispatcher.was_forwarded(),
            "Expected dispatch to be forwarded from {}/{}",
            controller,
            action
        );
        let previous = (
            self.dispatcher.previous_controller_name(),
            self.dispatcher.previous_action_name(),
        );
        assert_eq!(
            (previous.0.as_str(), previous.1.as_str()),
            (controller, action),
            "Expected forward from {}/{}, got {}/{}",
            controller,
            action,
            previous.0,
            previous.1
        );
        self
    }

    pub fn not_forwarded(self) -> Self {
        assert!(
            !self.dispatcher.was_forwarded(),
            "Expected no forward, but dispatch was forwarded from {}/{}",
            self.dispatcher.previous_controller_name(),
            self.dispatcher.previous_action_name()
        );
        self
    }

    pub fn returned(self, expected: &Value) -> Self {
        let actual = self.dispatcher.returned_value();
        assert_eq!(&actual, expected, "Returned values do not match");
        self
    }

    pub fn param(self, key: &str, expected: &Value) -> Self {
        let params = self.dispatcher.params();
        assert_eq!(
            params.get(key),
            Some(expected),
            "Expected param '{}' to be {}, got {:?}",
            key,
            expected,
            params.get(key)
        );
        self
    }

    /// Hand back the raw outcome
    pub fn into_outcome(self) -> Result<bool> {
        self.outcome
    }
}
