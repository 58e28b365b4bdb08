//! Dispatch lifecycle events
//!
//! Listeners are attached per [`DispatchEvent`] and run in attachment order.
//! The first listener returning [`Flow::Halt`] stops the chain and the
//! dispatcher treats the phase as aborted.

use crate::dispatcher::Dispatcher;
use crate::error::Result;
use crate::logging::{debug, trace};
use crate::traits::Flow;
use dashmap::DashMap;
use std::fmt;
use std::sync::Arc;

/// Events fired by the dispatcher
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DispatchEvent {
    BeforeDispatch,
    BeforeExecuteRoute,
    AfterExecuteRoute,
    AfterDispatch,
}

impl DispatchEvent {
    pub const ALL: [DispatchEvent; 4] = [
        DispatchEvent::BeforeDispatch,
        DispatchEvent::BeforeExecuteRoute,
        DispatchEvent::AfterExecuteRoute,
        DispatchEvent::AfterDispatch,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            DispatchEvent::BeforeDispatch => "dispatcher:beforeDispatch",
            DispatchEvent::BeforeExecuteRoute => "dispatcher:beforeExecuteRoute",
            DispatchEvent::AfterExecuteRoute => "dispatcher:afterExecuteRoute",
            DispatchEvent::AfterDispatch => "dispatcher:afterDispatch",
        }
    }

    /// Parse a full event name such as `dispatcher:beforeDispatch`
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|event| event.name() == name)
    }
}

impl fmt::Display for DispatchEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Event listener
pub type Listener = Arc<dyn Fn(DispatchEvent, &Dispatcher) -> Result<Flow> + Send + Sync>;

/// Registry of dispatch event listeners
#[derive(Default)]
pub struct EventManager {
    listeners: DashMap<DispatchEvent, Vec<Listener>>,
}

impl EventManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach a listener to one event
    pub fn attach<F>(&self, event: DispatchEvent, listener: F) -> &Self
    where
        F: Fn(DispatchEvent, &Dispatcher) -> Result<Flow> + Send + Sync + 'static,
    {
        self.attach_listener(event, Arc::new(listener))
    }

    /// Attach one listener to every dispatch event
    pub fn attach_all<F>(&self, listener: F) -> &Self
    where
        F: Fn(DispatchEvent, &Dispatcher) -> Result<Flow> + Send + Sync + 'static,
    {
        let listener: Listener = Arc::new(listener);
        for event in DispatchEvent::ALL {
            self.attach_listener(event, listener.clone());
        }
        self
    }

    pub fn attach_listener(&self, event: DispatchEvent, listener: Listener) -> &Self {
        self.listeners.entry(event).or_default().push(listener);
        debug!(event = %event, "Listener attached");
        self
    }

    /// Run the listeners of `event` until one halts
    pub fn fire(&self, event: DispatchEvent, dispatcher: &Dispatcher) -> Result<Flow> {
        // listeners may attach more listeners; don't hold the shard lock
        let listeners = match self.listeners.get(&event) {
            Some(listeners) => listeners.clone(),
            None => return Ok(Flow::Proceed),
        };

        trace!(event = %event, listeners = listeners.len(), "Firing event");
        for listener in listeners {
            if listener(event, dispatcher)?.is_halt() {
                debug!(event = %event, "Event halted by listener");
                return Ok(Flow::Halt);
            }
        }

        Ok(Flow::Proceed)
    }

    pub fn listener_count(&self, event: DispatchEvent) -> usize {
        self.listeners.get(&event).map(|l| l.len()).unwrap_or(0)
    }

    /// Remove every listener of one event
    pub fn detach_all(&self, event: DispatchEvent) -> usize {
        self.listeners
            .remove(&event)
            .map(|(_, listeners)| listeners.len())
            .unwrap_or(0)
    }

    pub fn clear(&self) {
        self.listeners.clear();
    }
}

impl fmt::Debug for EventManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut map = f.debug_map();
        for event in DispatchEvent::ALL {
            map.entry(&event.name(), &self.listener_count(event));
        }
        map.finish()
    }
}
