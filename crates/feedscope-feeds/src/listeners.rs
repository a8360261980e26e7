//! Event listener sets.
//!
//! Collaborators expose their lifecycle events through [`ListenerSet`]s.
//! Registering a listener returns an [`Unsubscribe`] callback that removes
//! it again; the callback is safe to run after the set itself is gone.

use std::sync::{Arc, Weak};

use parking_lot::Mutex;

/// Removes a previously registered listener when invoked.
pub type Unsubscribe = Box<dyn FnOnce() + Send>;

/// A registered event callback.
pub type Listener<E> = Arc<dyn Fn(&E) + Send + Sync>;

struct Inner<E> {
    next_id: u64,
    listeners: Vec<(u64, Listener<E>)>,
}

/// Ordered set of listeners for events of type `E`.
pub struct ListenerSet<E> {
    inner: Arc<Mutex<Inner<E>>>,
}

impl<E: 'static> ListenerSet<E> {
    /// Create an empty set.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner {
                next_id: 0,
                listeners: Vec::new(),
            })),
        }
    }

    /// Register `listener` and return its removal callback.
    pub fn add(&self, listener: Listener<E>) -> Unsubscribe {
        let id = {
            let mut inner = self.inner.lock();
            let id = inner.next_id;
            inner.next_id += 1;
            inner.listeners.push((id, listener));
            id
        };
        let weak: Weak<Mutex<Inner<E>>> = Arc::downgrade(&self.inner);
        Box::new(move || {
            if let Some(inner) = weak.upgrade() {
                inner.lock().listeners.retain(|(i, _)| *i != id);
            }
        })
    }

    /// Invoke every listener with `event`.
    ///
    /// Listeners are snapshotted first, so a listener may add or remove
    /// listeners (including itself) while being called.
    pub fn emit(&self, event: &E) {
        let snapshot: Vec<Listener<E>> = self
            .inner
            .lock()
            .listeners
            .iter()
            .map(|(_, l)| Arc::clone(l))
            .collect();
        for listener in snapshot {
            listener(event);
        }
    }

    /// Number of registered listeners.
    pub fn len(&self) -> usize {
        self.inner.lock().listeners.len()
    }

    /// Whether no listeners are registered.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<E: 'static> Default for ListenerSet<E> {
    fn default() -> Self {
        Self::new()
    }
}
