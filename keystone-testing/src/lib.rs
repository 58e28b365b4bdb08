//! Testing utilities for Keystone applications.
//!
//! ## Features
//!
//! - **TestContainer** - Isolated container with controller and mock helpers
//! - **RecordingInvoker** - Records action calls, with scripted responses and forwards
//! - **RecordingListener** - Records fired dispatch events, optionally halting
//! - **DispatchAssertions** - Fluent checks on a dispatch outcome
//!
//! ## Quick Start
//!
//! ```
//! use keystone_core::{Component, EventManager, Params};
//! use keystone_testing::*;
//! use serde_json::json;
//! use std::sync::Arc;
//!
//! #[derive(Default)]
//! struct PostsController;
//! impl Component for PostsController {}
//!
//! let container = TestContainer::new();
//! container.controller::<PostsController>("App", "Posts");
//!
//! let invoker = Arc::new(RecordingInvoker::new().respond("index", json!(["hello"])));
//! let events = Arc::new(EventManager::new());
//! let listener = RecordingListener::new();
//! listener.attach(&events);
//!
//! let dispatcher = container
//!     .dispatcher()
//!     .with_invoker(invoker.clone())
//!     .with_events(events);
//!
//! dispatch(&dispatcher, "app", "posts", "index", Params::new())
//!     .finished()
//!     .controller("Posts")
//!     .returned(&json!(["hello"]));
//!
//! assert_eq!(invoker.call_count(), 1);
//! assert_eq!(listener.names().len(), 4);
//! ```

mod assertions;
mod invoker;
mod listener;
mod test_container;

pub use assertions::{dispatch, DispatchAssertions};
pub use invoker::{Invocation, RecordingInvoker};
pub use listener::{FiredEvent, RecordingListener};
pub use test_container::TestContainer;
