//! Identity-compared shared handles
//!
//! `Shared<T>` lets list and map properties hold objects whose identity
//! matters. Linking a `ListProperty<Shared<Frigate>>` into a
//! `ListProperty<Shared<dyn Ship>>` exposes the very same instances through
//! the wider element type.

use crate::convert::Converter;
use crate::value::{Opaque, PropertyValue, Value, ValueKind};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::ops::Deref;
use std::sync::Arc;

/// Shared reference with pointer equality
pub struct Shared<T: ?Sized>(Arc<T>);

impl<T> Shared<T> {
    pub fn new(value: T) -> Self {
        Self(Arc::new(value))
    }
}

impl<T: ?Sized> Shared<T> {
    pub fn from_arc(arc: Arc<T>) -> Self {
        Self(arc)
    }

    pub fn to_arc(&self) -> Arc<T> {
        Arc::clone(&self.0)
    }

    /// Check if both handles point at the same allocation
    pub fn same_instance<U: ?Sized>(&self, other: &Shared<U>) -> bool {
        Arc::as_ptr(&self.0) as *const () == Arc::as_ptr(&other.0) as *const ()
    }
}

impl<T: ?Sized> Clone for Shared<T> {
    fn clone(&self) -> Self {
        Self(Arc::clone(&self.0))
    }
}

impl<T: ?Sized> PartialEq for Shared<T> {
    fn eq(&self, other: &Self) -> bool {
        self.same_instance(other)
    }
}

impl<T: ?Sized> Eq for Shared<T> {}

impl<T: ?Sized> Hash for Shared<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        (Arc::as_ptr(&self.0) as *const ()).hash(state);
    }
}

impl<T: ?Sized> Deref for Shared<T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.0
    }
}

impl<T: ?Sized + fmt::Debug> fmt::Debug for Shared<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Shared").field(&&*self.0).finish()
    }
}

impl<T: ?Sized + Send + Sync + 'static> PropertyValue for Shared<T> {
    fn kind() -> ValueKind {
        ValueKind::Opaque
    }

    fn to_value(&self) -> Value {
        Value::Opaque(Opaque::new(self.clone()))
    }

    fn from_value(value: &Value) -> Option<Self> {
        value.as_opaque()?.downcast_ref::<Shared<T>>().cloned()
    }

    fn converters() -> Vec<Arc<dyn Converter<Self>>> {
        Vec::new()
    }
}
