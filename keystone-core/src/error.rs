// Error types for the Keystone framework

use thiserror::Error;

/// Result alias used across the core crate.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    /// Bad or missing component identity, unresolvable type, unsupported identity kind
    #[error("Component definition error: {0}")]
    Definition(String),

    /// A component is still referenced by an alias
    #[error("Component dependency error: {0}")]
    Dependency(String),

    #[error("Controller not found: {0}")]
    NotFoundController(String),

    #[error("Action not found: {0}")]
    NotFoundAction(String),

    /// Invalid forward target, missing param, misuse of the dispatcher
    #[error("Dispatcher error: {0}")]
    Dispatcher(String),

    #[error("Cyclic forward detected: {0}")]
    CyclicForward(String),

    #[error("Unknown operation: {0}")]
    UnknownOperation(String),

    /// Failure raised from inside an action body
    #[error("Action failed: {0}")]
    Action(String),
}

impl Error {
    /// Check if this error means the requested controller or action does not exist
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFoundController(_) | Error::NotFoundAction(_))
    }

    /// Check if this error came from a bad component definition
    pub fn is_definition_error(&self) -> bool {
        matches!(self, Error::Definition(_))
    }

    /// Check if this error aborted a dispatch cycle because of routing
    pub fn is_dispatch_error(&self) -> bool {
        matches!(
            self,
            Error::Dispatcher(_) | Error::CyclicForward(_) | Error::NotFoundController(_)
        )
    }
}
