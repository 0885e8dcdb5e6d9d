//! Listener registry for broadcasting typed events.
//!
//! An [`EventManager`] stores listeners keyed by an event type and invokes
//! every listener registered for the type carried by the fired arguments.
//! Managers are handed around by reference: a long-lived owner can copy its
//! listeners onto a short-lived emitter with
//! [`copy_event_listeners`](EventManager::copy_event_listeners) instead of
//! sharing one list through inheritance.
//!
//! # Example
//!
//! ```
//! use courier_event::{EventArguments, EventManager};
//!
//! #[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
//! enum Tick { Started, Stopped }
//!
//! struct TickArgs(Tick);
//!
//! impl EventArguments for TickArgs {
//!     type Event = Tick;
//!     fn event_type(&self) -> Tick { self.0 }
//! }
//!
//! let manager = EventManager::<TickArgs>::new();
//! manager.add_event_listener(Tick::Started, |_| println!("started"));
//! manager.fire_event_listeners(&TickArgs(Tick::Started));
//! ```

use std::fmt;
use std::hash::Hash;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::RwLock;

/// Arguments that know which event they belong to.
pub trait EventArguments {
    type Event: Copy + Eq + Hash + fmt::Debug + Send + Sync + 'static;

    fn event_type(&self) -> Self::Event;
}

/// Anything that can deliver event arguments to interested parties.
pub trait EventDispatcher<A: EventArguments> {
    fn dispatch(&self, args: &A);
}

/// Identifies a registered listener so it can be removed later.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListenerId(u64);

impl ListenerId {
    fn next() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(1);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }
}

pub type Listener<A> = Arc<dyn Fn(&A) + Send + Sync>;

struct Registration<A: EventArguments> {
    id: ListenerId,
    event: A::Event,
    listener: Listener<A>,
}

impl<A: EventArguments> Clone for Registration<A> {
    fn clone(&self) -> Self {
        Self {
            id: self.id,
            event: self.event,
            listener: Arc::clone(&self.listener),
        }
    }
}

/// Thread-safe registry of listeners keyed by event type.
pub struct EventManager<A: EventArguments> {
    registrations: RwLock<Vec<Registration<A>>>,
}

impl<A: EventArguments> Default for EventManager<A> {
    fn default() -> Self {
        Self::new()
    }
}

impl<A: EventArguments> fmt::Debug for EventManager<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let registrations = self.registrations.read();
        f.debug_struct("EventManager")
            .field(
                "listeners",
                &registrations.iter().map(|r| (r.id, r.event)).collect::<Vec<_>>(),
            )
            .finish()
    }
}

impl<A: EventArguments> EventManager<A> {
    pub fn new() -> Self {
        Self {
            registrations: RwLock::new(Vec::new()),
        }
    }

    /// Register `listener` for `event`. Listeners fire in registration order.
    pub fn add_event_listener<F>(&self, event: A::Event, listener: F) -> ListenerId
    where
        F: Fn(&A) + Send + Sync + 'static,
    {
        self.add_shared_listener(event, Arc::new(listener))
    }

    /// Register an already shared listener, e.g. one that is also attached
    /// to other managers.
    pub fn add_shared_listener(&self, event: A::Event, listener: Listener<A>) -> ListenerId {
        let id = ListenerId::next();
        self.registrations.write().push(Registration {
            id,
            event,
            listener,
        });
        id
    }

    /// Returns `true` if the listener was registered.
    pub fn remove_event_listener(&self, id: ListenerId) -> bool {
        let mut registrations = self.registrations.write();
        let before = registrations.len();
        registrations.retain(|r| r.id != id);
        registrations.len() != before
    }

    /// Invoke every listener registered for the event type of `args`.
    ///
    /// The registry is snapshotted first, so listeners may add or remove
    /// listeners on this manager while being invoked.
    pub fn fire_event_listeners(&self, args: &A) {
        let event = args.event_type();
        let listeners: Vec<Listener<A>> = self
            .registrations
            .read()
            .iter()
            .filter(|r| r.event == event)
            .map(|r| Arc::clone(&r.listener))
            .collect();

        tracing::trace!(?event, listeners = listeners.len(), "firing event listeners");

        for listener in listeners {
            listener(args);
        }
    }

    /// Append every listener of `source` to this manager.
    ///
    /// Copied listeners receive fresh ids; removing one from either manager
    /// leaves the other untouched.
    pub fn copy_event_listeners(&self, source: &EventManager<A>) {
        if std::ptr::eq(self, source) {
            return;
        }

        let copied: Vec<Registration<A>> = source
            .registrations
            .read()
            .iter()
            .map(|r| Registration {
                id: ListenerId::next(),
                ..r.clone()
            })
            .collect();

        self.registrations.write().extend(copied);
    }

    pub fn listener_count(&self, event: A::Event) -> usize {
        self.registrations
            .read()
            .iter()
            .filter(|r| r.event == event)
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.registrations.read().is_empty()
    }

    pub fn clear(&self) {
        self.registrations.write().clear();
    }
}

impl<A: EventArguments> EventDispatcher<A> for EventManager<A> {
    fn dispatch(&self, args: &A) {
        self.fire_event_listeners(args);
    }
}

impl<A: EventArguments, D: EventDispatcher<A> + ?Sized> EventDispatcher<A> for Arc<D> {
    fn dispatch(&self, args: &A) {
        (**self).dispatch(args);
    }
}
