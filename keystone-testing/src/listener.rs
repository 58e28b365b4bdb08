// Recording event listener

use keystone_core::{DispatchEvent, EventManager, Flow};
use parking_lot::Mutex;
use std::collections::HashSet;
use std::sync::Arc;

/// One fired event together with the route that was current at the time
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FiredEvent {
    pub event: DispatchEvent,
    pub controller: String,
    pub action: String,
}

/// Listener attached to every dispatch event that records what fired.
///
/// ```
/// use keystone_core::{DispatchEvent, EventManager};
/// use keystone_testing::RecordingListener;
///
/// let events = EventManager::new();
/// let listener = RecordingListener::new().halt_on(DispatchEvent::BeforeDispatch);
/// listener.attach(&events);
/// assert_eq!(events.listener_count(DispatchEvent::AfterDispatch), 1);
/// ```
#[derive(Debug, Default)]
pub struct RecordingListener {
    fired: Mutex<Vec<FiredEvent>>,
    halt_on: Mutex<HashSet<DispatchEvent>>,
}

impl RecordingListener {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Return [`Flow::Halt`] whenever `event` fires
    pub fn halt_on(self: Arc<Self>, event: DispatchEvent) -> Arc<Self> {
        self.halt_on.lock().insert(event);
        self
    }

    /// Attach to every event of `events`
    pub fn attach(self: &Arc<Self>, events: &EventManager) {
        let listener = Arc::clone(self);
        events.attach_all(move |event, dispatcher| {
            listener.fired.lock().push(FiredEvent {
                event,
                controller: dispatcher.controller_name(),
                action: dispatcher.action_name(),
            });
            let halt = listener.halt_on.lock().contains(&event);
            Ok(Flow::from(!halt))
        });
    }

    pub fn fired(&self) -> Vec<FiredEvent> {
        self.fired.lock().clone()
    }

    /// Fired event names in order, e.g. `dispatcher:beforeDispatch`
    pub fn names(&self) -> Vec<&'static str> {
        self.fired.lock().iter().map(|f| f.event.name()).collect()
    }

    pub fn count(&self, event: DispatchEvent) -> usize {
        self.fired.lock().iter().filter(|f| f.event == event).count()
    }

    pub fn was_fired(&self, event: DispatchEvent) -> bool {
        self.count(event) > 0
    }

    pub fn clear(&self) {
        self.fired.lock().clear();
    }
}
