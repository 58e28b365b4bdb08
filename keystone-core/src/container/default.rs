//! Process-wide default container.
//!
//! The first container constructed in the process is recorded here and
//! stays the default until [`reset_default`](super::Container::reset_default)
//! is called. The slot holds a strong handle, so the default container is
//! never dropped before that.

use super::Container;
use parking_lot::RwLock;

static DEFAULT_CONTAINER: RwLock<Option<Container>> = RwLock::new(None);

/// Record `container` unless a default is already set
pub(super) fn register_first(container: &Container) -> bool {
    let mut slot = DEFAULT_CONTAINER.write();
    if slot.is_some() {
        return false;
    }
    *slot = Some(container.clone());
    true
}

pub(super) fn current() -> Option<Container> {
    DEFAULT_CONTAINER.read().clone()
}

pub(super) fn clear() -> Option<Container> {
    DEFAULT_CONTAINER.write().take()
}
