//! Arena handles for entities and properties

use serde::{Deserialize, Serialize};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::marker::PhantomData;

/// Handle of an entity inside a [`Graph`](crate::Graph)
///
/// Handles are never reused, so a handle to a disposed entity stays invalid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntityId(pub u64);

impl EntityId {
    /// Create a new entity handle
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    /// Get the raw handle value
    pub fn raw(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "entity:{}", self.0)
    }
}

/// Handle of a property inside a [`Graph`](crate::Graph)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PropertyId(pub u64);

impl PropertyId {
    /// Create a new property handle
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    /// Get the raw handle value
    pub fn raw(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for PropertyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "property:{}", self.0)
    }
}

/// Typed property handle
///
/// Carries the property kind `P` so reads and writes need no runtime type
/// argument. Obtained from the graph's property table or from a component's
/// wiring.
pub struct PropertyHandle<P> {
    id: PropertyId,
    _kind: PhantomData<fn() -> P>,
}

impl<P> PropertyHandle<P> {
    pub(crate) fn new(id: PropertyId) -> Self {
        Self {
            id,
            _kind: PhantomData,
        }
    }

    /// The untyped property handle
    pub fn id(&self) -> PropertyId {
        self.id
    }
}

impl<P> Clone for PropertyHandle<P> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<P> Copy for PropertyHandle<P> {}

impl<P> PartialEq for PropertyHandle<P> {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl<P> Eq for PropertyHandle<P> {}

impl<P> Hash for PropertyHandle<P> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl<P> fmt::Debug for PropertyHandle<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PropertyHandle({})", self.id.0)
    }
}
