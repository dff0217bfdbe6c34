//! Synchronous notification primitive
//!
//! A [`Signal`] is a cheap, cloneable handle to a list of handlers. Handlers
//! receive the graph mutably, so a signal is cloned out of the graph before
//! it is dispatched. Dispatch snapshots the handler list first: handlers may
//! subscribe or unsubscribe while the signal is running.

use crate::error::Result;
use crate::graph::Graph;
use crate::identity::{EntityId, PropertyId};
use log::trace;
use std::any::TypeId;
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Identity a handler is registered under
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Subscriber {
    Property(PropertyId),
    Component(EntityId, TypeId),
    Entity(EntityId),
    /// Caller-chosen token for external observers
    Token(u64),
}

/// Signal handler
pub type Handler<A> = Arc<dyn Fn(&mut Graph, &A) -> Result<()> + Send + Sync>;

struct Inner<A> {
    handlers: Mutex<Vec<(Subscriber, Handler<A>)>>,
    depth: AtomicUsize,
}

/// Pub-sub signal carrying `A`
pub struct Signal<A> {
    inner: Arc<Inner<A>>,
}

impl<A: 'static> Signal<A> {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Inner {
                handlers: Mutex::new(Vec::new()),
                depth: AtomicUsize::new(0),
            }),
        }
    }

    /// Register `handler` under `subscriber`
    ///
    /// A subscriber may hold several handlers; [`Signal::unsubscribe`]
    /// removes all of them.
    pub fn subscribe<F>(&self, subscriber: Subscriber, handler: F)
    where
        F: Fn(&mut Graph, &A) -> Result<()> + Send + Sync + 'static,
    {
        self.lock().push((subscriber, Arc::new(handler)));
    }

    /// Remove every handler registered under `subscriber`
    pub fn unsubscribe(&self, subscriber: &Subscriber) -> bool {
        let mut handlers = self.lock();
        let before = handlers.len();
        handlers.retain(|(s, _)| s != subscriber);
        handlers.len() != before
    }

    pub fn is_subscribed(&self, subscriber: &Subscriber) -> bool {
        self.lock().iter().any(|(s, _)| s == subscriber)
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// True while a dispatch of this signal is on the stack
    pub fn is_dispatching(&self) -> bool {
        self.inner.depth.load(Ordering::Acquire) > 0
    }

    /// Invoke every handler in registration order
    ///
    /// Stops at the first handler that fails and returns its error.
    pub fn dispatch(&self, graph: &mut Graph, args: &A) -> Result<()> {
        let handlers: Vec<Handler<A>> = self.lock().iter().map(|(_, h)| h.clone()).collect();
        if handlers.is_empty() {
            return Ok(());
        }
        trace!("dispatching {} to {} handler(s)", std::any::type_name::<A>(), handlers.len());
        let _guard = DispatchGuard::enter(&self.inner.depth);
        for handler in handlers {
            handler(graph, args)?;
        }
        Ok(())
    }

    fn lock(&self) -> MutexGuard<'_, Vec<(Subscriber, Handler<A>)>> {
        self.inner
            .handlers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

impl<A: 'static> Default for Signal<A> {
    fn default() -> Self {
        Self::new()
    }
}

impl<A> Clone for Signal<A> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<A: 'static> fmt::Debug for Signal<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Signal")
            .field("handlers", &self.len())
            .field("dispatching", &self.is_dispatching())
            .finish()
    }
}

struct DispatchGuard<'a>(&'a AtomicUsize);

impl<'a> DispatchGuard<'a> {
    fn enter(depth: &'a AtomicUsize) -> Self {
        depth.fetch_add(1, Ordering::AcqRel);
        Self(depth)
    }
}

impl Drop for DispatchGuard<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::AcqRel);
    }
}

/// Type-erased unsubscription, used to tear down links over signals of
/// different argument types
pub trait Unsubscribe: Send + Sync {
    fn unsubscribe(&self, subscriber: &Subscriber) -> bool;
}

impl<A: 'static> Unsubscribe for Signal<A> {
    fn unsubscribe(&self, subscriber: &Subscriber) -> bool {
        Signal::unsubscribe(self, subscriber)
    }
}
