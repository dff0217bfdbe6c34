//! Reactive properties
//!
//! A property is a named, typed value cell owned by an entity. Every write
//! runs the same pipeline:
//!
//! 1. equal to the current value: nothing happens
//! 2. `begin_value_set` fires; any handler may reject the write
//! 3. an active link is dropped (the write overrides the source)
//! 4. the kind stores the value
//! 5. `end_value_set` fires
//!
//! Raw [`Value`] data enters through the conversion pipeline: the exact
//! kind first, then the first registered converter that accepts it.
//!
//! A property may be linked to a source property. The target pulls the
//! source's value immediately and after every source write, until it is
//! written explicitly, unlinked, or the source is disposed.

mod enumeration;
mod json;
mod list;
mod map;
mod reference;
mod scalar;

pub use enumeration::{EnumProperty, PropertyEnum};
pub use json::{JsonModel, JsonProperty, JsonValue};
pub use list::{EntryEvent, ListProperty};
pub use map::{ElementEvent, KeyEvent, MapProperty};
pub use reference::ReferenceProperty;
pub use scalar::{
    AddressProperty, BoolProperty, ByteProperty, BytesProperty, DateTimeProperty, DoubleProperty,
    FloatProperty, IdProperty, IntProperty, LongProperty, Numeric, Property, StringProperty,
};

use crate::component::AsAny;
use crate::convert::Converter;
use crate::error::{Error, Result};
use crate::graph::Graph;
use crate::identity::{EntityId, PropertyHandle, PropertyId};
use crate::signal::{Signal, Subscriber, Unsubscribe};
use crate::value::{Value, ValueKind};
use log::debug;
use std::any::{type_name, Any, TypeId};
use std::fmt;
use std::sync::Arc;

/// Payload of `begin_value_set`
#[derive(Debug, Clone, PartialEq)]
pub struct ValueChange<T> {
    pub property: PropertyId,
    pub previous: T,
    pub value: T,
}

/// Count payload shared by collection signals
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CountChange {
    pub property: PropertyId,
    pub count: usize,
}

/// Active link of a target property to its source
pub struct LinkState {
    source: PropertyId,
    subscriber: Subscriber,
    signals: Vec<Box<dyn Unsubscribe>>,
}

impl LinkState {
    pub(crate) fn new(
        source: PropertyId,
        subscriber: Subscriber,
        signals: Vec<Box<dyn Unsubscribe>>,
    ) -> Self {
        Self {
            source,
            subscriber,
            signals,
        }
    }

    pub fn source(&self) -> PropertyId {
        self.source
    }

    pub(crate) fn release(self) {
        for signal in &self.signals {
            signal.unsubscribe(&self.subscriber);
        }
    }
}

impl fmt::Debug for LinkState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LinkState")
            .field("source", &self.source)
            .field("signals", &self.signals.len())
            .finish()
    }
}

/// State shared by every property kind
pub struct PropertyCore<T> {
    id: PropertyId,
    name: String,
    owner: EntityId,
    pub(crate) value: T,
    pub(crate) default: T,
    pub(crate) converters: Vec<Arc<dyn Converter<T>>>,
    pub(crate) link: Option<LinkState>,
    value_get: Signal<PropertyId>,
    begin_value_set: Signal<ValueChange<T>>,
    end_value_set: Signal<PropertyId>,
    disposed: Signal<PropertyId>,
}

impl<T: Clone + Send + Sync + 'static> PropertyCore<T> {
    pub fn new(id: PropertyId, name: &str, owner: EntityId, default: T) -> Self {
        Self {
            id,
            name: name.to_string(),
            owner,
            value: default.clone(),
            default,
            converters: Vec::new(),
            link: None,
            value_get: Signal::new(),
            begin_value_set: Signal::new(),
            end_value_set: Signal::new(),
            disposed: Signal::new(),
        }
    }

    pub fn with_converters(mut self, converters: Vec<Arc<dyn Converter<T>>>) -> Self {
        self.converters = converters;
        self
    }

    pub fn id(&self) -> PropertyId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Entity whose property table holds this property
    pub fn owner(&self) -> EntityId {
        self.owner
    }

    /// Current value, without firing `value_get`
    pub fn value(&self) -> &T {
        &self.value
    }

    pub fn default_value(&self) -> &T {
        &self.default
    }

    pub fn is_linked(&self) -> bool {
        self.link.is_some()
    }

    pub fn link_source(&self) -> Option<PropertyId> {
        self.link.as_ref().map(LinkState::source)
    }

    pub fn value_get(&self) -> &Signal<PropertyId> {
        &self.value_get
    }

    pub fn begin_value_set(&self) -> &Signal<ValueChange<T>> {
        &self.begin_value_set
    }

    pub fn end_value_set(&self) -> &Signal<PropertyId> {
        &self.end_value_set
    }

    pub fn disposed(&self) -> &Signal<PropertyId> {
        &self.disposed
    }
}

/// A concrete property type
///
/// Implementors hold a [`PropertyCore`] and describe how their value type
/// maps to and from [`Value`] data. Storage and linking can be overridden
/// for kinds that need more than a plain assignment.
pub trait PropertyKind: Send + Sync + Sized + 'static {
    type Value: Clone + PartialEq + Send + Sync + 'static;

    /// Factory used by the property table and by component wiring
    fn create(id: PropertyId, name: &str, owner: EntityId) -> Self;

    fn core(&self) -> &PropertyCore<Self::Value>;

    fn core_mut(&mut self) -> &mut PropertyCore<Self::Value>;

    /// Kind checked against a link target's converters
    fn value_kind() -> ValueKind;

    /// Exact-kind data conversion
    fn from_data(data: &Value) -> Option<Self::Value>;

    fn to_data(graph: &Graph, value: &Self::Value) -> Result<Value>;

    fn values_equal(a: &Self::Value, b: &Self::Value) -> bool {
        a == b
    }

    /// Step 4 of the write pipeline
    fn store(graph: &mut Graph, id: PropertyId, value: Self::Value) -> Result<()> {
        graph.prop_mut::<Self>(id)?.core_mut().value = value;
        Ok(())
    }

    /// Make `target` follow `source`
    fn link_from<S: PropertyKind>(
        graph: &mut Graph,
        target: PropertyHandle<Self>,
        source: PropertyHandle<S>,
    ) -> Result<()> {
        graph.link_value(target, source)
    }

    /// Called before the property leaves the graph
    fn on_dispose(_graph: &mut Graph, _id: PropertyId) -> Result<()> {
        Ok(())
    }
}

type SetDataFn = fn(&mut Graph, PropertyId, &Value) -> Result<()>;
type DataFn = fn(&Graph, PropertyId) -> Result<Value>;
type ResetFn = fn(&mut Graph, PropertyId) -> Result<()>;
type UnlinkFn = fn(&mut Graph, PropertyId, bool) -> Result<()>;
type IsDefaultFn = fn(&Graph, PropertyId) -> Result<bool>;

/// Monomorphized entry points for a property known only by id
#[derive(Clone, Copy)]
pub struct PropertyOps {
    pub(crate) set_data: SetDataFn,
    pub(crate) data: DataFn,
    pub(crate) reset: ResetFn,
    pub(crate) unlink: UnlinkFn,
    pub(crate) init_default: SetDataFn,
    pub(crate) is_default: IsDefaultFn,
    pub(crate) dispose: ResetFn,
}

impl PropertyOps {
    fn of<P: PropertyKind>() -> Self {
        Self {
            set_data: set_data_erased::<P>,
            data: data_erased::<P>,
            reset: reset_erased::<P>,
            unlink: unlink_erased::<P>,
            init_default: init_default_erased::<P>,
            is_default: is_default_erased::<P>,
            dispose: P::on_dispose,
        }
    }
}

fn set_data_erased<P: PropertyKind>(graph: &mut Graph, id: PropertyId, data: &Value) -> Result<()> {
    graph.set_data(PropertyHandle::<P>::new(id), data)
}

fn data_erased<P: PropertyKind>(graph: &Graph, id: PropertyId) -> Result<Value> {
    graph.data(PropertyHandle::<P>::new(id))
}

fn reset_erased<P: PropertyKind>(graph: &mut Graph, id: PropertyId) -> Result<()> {
    graph.reset_to_default(PropertyHandle::<P>::new(id))
}

fn unlink_erased<P: PropertyKind>(graph: &mut Graph, id: PropertyId, reset: bool) -> Result<()> {
    graph.unlink_property::<P>(id, reset)
}

fn init_default_erased<P: PropertyKind>(graph: &mut Graph, id: PropertyId, data: &Value) -> Result<()> {
    let value = graph.convert_data::<P>(id, data)?;
    graph.prop_mut::<P>(id)?.core_mut().default = value.clone();
    P::store(graph, id, value)
}

fn is_default_erased<P: PropertyKind>(graph: &Graph, id: PropertyId) -> Result<bool> {
    graph.is_default(PropertyHandle::<P>::new(id))
}

pub(crate) fn new_boxed<P: PropertyKind>(
    id: PropertyId,
    name: &str,
    owner: EntityId,
) -> Box<dyn AnyProperty> {
    Box::new(P::create(id, name, owner))
}

/// Property factory as stored in component wiring
pub(crate) type PropertyFactory = fn(PropertyId, &str, EntityId) -> Box<dyn AnyProperty>;

/// Object-safe view of any property kind
pub trait AnyProperty: AsAny + Send + Sync {
    fn id(&self) -> PropertyId;
    fn name(&self) -> &str;
    fn owner(&self) -> EntityId;
    fn kind_name(&self) -> &'static str;
    fn value_kind(&self) -> ValueKind;
    fn is_linked(&self) -> bool;
    fn link_source(&self) -> Option<PropertyId>;
    fn end_value_set_signal(&self) -> Signal<PropertyId>;
    fn disposed_signal(&self) -> Signal<PropertyId>;
    #[doc(hidden)]
    fn ops(&self) -> PropertyOps;
}

impl<P: PropertyKind> AnyProperty for P {
    fn id(&self) -> PropertyId {
        self.core().id()
    }

    fn name(&self) -> &str {
        self.core().name()
    }

    fn owner(&self) -> EntityId {
        self.core().owner()
    }

    fn kind_name(&self) -> &'static str {
        type_name::<P>()
    }

    fn value_kind(&self) -> ValueKind {
        <P as PropertyKind>::value_kind()
    }

    fn is_linked(&self) -> bool {
        self.core().is_linked()
    }

    fn link_source(&self) -> Option<PropertyId> {
        self.core().link_source()
    }

    fn end_value_set_signal(&self) -> Signal<PropertyId> {
        self.core().end_value_set().clone()
    }

    fn disposed_signal(&self) -> Signal<PropertyId> {
        self.core().disposed().clone()
    }

    fn ops(&self) -> PropertyOps {
        PropertyOps::of::<P>()
    }
}

fn type_mismatch(property: &dyn AnyProperty, expected: &'static str) -> Error {
    Error::PropertyTypeMismatch {
        property: property.name().to_string(),
        expected,
        found: property.kind_name(),
    }
}

impl Graph {
    // Arena access

    /// Untyped view of a property
    pub fn any_property(&self, id: PropertyId) -> Result<&dyn AnyProperty> {
        self.properties
            .get(&id)
            .map(|p| &**p)
            .ok_or_else(|| Error::PropertyNotFound(id.to_string()))
    }

    /// Typed view of a property
    pub fn property_ref<P: PropertyKind>(&self, handle: PropertyHandle<P>) -> Result<&P> {
        self.prop_ref::<P>(handle.id())
    }

    /// Type-check an untyped handle
    pub fn typed<P: PropertyKind>(&self, id: PropertyId) -> Result<PropertyHandle<P>> {
        self.prop_ref::<P>(id)?;
        Ok(PropertyHandle::new(id))
    }

    pub(crate) fn prop_ref<P: PropertyKind>(&self, id: PropertyId) -> Result<&P> {
        let property = self.any_property(id)?;
        property
            .as_any()
            .downcast_ref::<P>()
            .ok_or_else(|| type_mismatch(property, type_name::<P>()))
    }

    pub(crate) fn prop_mut<P: PropertyKind>(&mut self, id: PropertyId) -> Result<&mut P> {
        let property = self
            .properties
            .get_mut(&id)
            .ok_or_else(|| Error::PropertyNotFound(id.to_string()))?;
        if !(**property).as_any().is::<P>() {
            return Err(type_mismatch(&**property, type_name::<P>()));
        }
        (**property)
            .as_any_mut()
            .downcast_mut::<P>()
            .ok_or_else(|| Error::PropertyNotFound(id.to_string()))
    }

    // Reads

    /// Read the value, firing `value_get` unless it is already dispatching
    pub fn get<P: PropertyKind>(&mut self, handle: PropertyHandle<P>) -> Result<P::Value> {
        let signal = self.prop_ref::<P>(handle.id())?.core().value_get().clone();
        if !signal.is_dispatching() {
            signal.dispatch(self, &handle.id())?;
        }
        self.value(handle)
    }

    /// Read the value without notifications
    pub fn value<P: PropertyKind>(&self, handle: PropertyHandle<P>) -> Result<P::Value> {
        Ok(self.prop_ref::<P>(handle.id())?.core().value.clone())
    }

    /// Borrow the value without cloning it
    pub fn with_value<P: PropertyKind, R>(
        &self,
        handle: PropertyHandle<P>,
        f: impl FnOnce(&P::Value) -> R,
    ) -> Result<R> {
        Ok(f(&self.prop_ref::<P>(handle.id())?.core().value))
    }

    pub fn is_default<P: PropertyKind>(&self, handle: PropertyHandle<P>) -> Result<bool> {
        let core = self.prop_ref::<P>(handle.id())?.core();
        Ok(P::values_equal(&core.value, &core.default))
    }

    /// Raw data form of the value
    pub fn data<P: PropertyKind>(&self, handle: PropertyHandle<P>) -> Result<Value> {
        let property = self.prop_ref::<P>(handle.id())?;
        P::to_data(self, &property.core().value)
    }

    /// Raw data of a property known only by id
    pub fn data_of(&self, id: PropertyId) -> Result<Value> {
        let data = self.any_property(id)?.ops().data;
        data(self, id)
    }

    /// Text form of the value's data
    pub fn value_to_string(&self, id: PropertyId) -> Result<String> {
        Ok(self.data_of(id)?.to_string())
    }

    /// Compare the value against raw data, converting the data first
    pub fn value_equals<P: PropertyKind>(
        &self,
        handle: PropertyHandle<P>,
        data: &Value,
    ) -> Result<bool> {
        let other = self.convert_data::<P>(handle.id(), data)?;
        let core = self.prop_ref::<P>(handle.id())?.core();
        Ok(P::values_equal(&core.value, &other))
    }

    // Writes

    /// Explicit write; drops an active link
    pub fn set<P: PropertyKind>(&mut self, handle: PropertyHandle<P>, value: P::Value) -> Result<()> {
        self.set_value::<P>(handle.id(), value, true)
    }

    /// Convert raw data and write it explicitly
    pub fn set_data<P: PropertyKind>(&mut self, handle: PropertyHandle<P>, data: &Value) -> Result<()> {
        let value = self.convert_data::<P>(handle.id(), data)?;
        self.set_value::<P>(handle.id(), value, true)
    }

    /// Write raw data to a property known only by id
    pub fn set_data_of(&mut self, id: PropertyId, data: &Value) -> Result<()> {
        let set_data = self.any_property(id)?.ops().set_data;
        set_data(self, id, data)
    }

    /// Write a clone of the default value
    pub fn reset_to_default<P: PropertyKind>(&mut self, handle: PropertyHandle<P>) -> Result<()> {
        let default = self.prop_ref::<P>(handle.id())?.core().default.clone();
        self.set_value::<P>(handle.id(), default, true)
    }

    pub fn reset_of(&mut self, id: PropertyId) -> Result<()> {
        let reset = self.any_property(id)?.ops().reset;
        reset(self, id)
    }

    pub fn is_default_of(&self, id: PropertyId) -> Result<bool> {
        let is_default = self.any_property(id)?.ops().is_default;
        is_default(self, id)
    }

    /// Replace the default without touching the current value
    pub fn set_default<P: PropertyKind>(&mut self, handle: PropertyHandle<P>, value: P::Value) -> Result<()> {
        self.prop_mut::<P>(handle.id())?.core_mut().default = value;
        Ok(())
    }

    /// Edit a copy of the value and write it back
    pub fn modify<P: PropertyKind>(
        &mut self,
        handle: PropertyHandle<P>,
        f: impl FnOnce(&mut P::Value),
    ) -> Result<()> {
        let mut value = self.value(handle)?;
        f(&mut value);
        self.set(handle, value)
    }

    /// Re-announce the current value as an explicit write
    ///
    /// Used after state reachable from the value changed behind the
    /// property's back (for example the contents of a `Shared`).
    pub fn update_value<P: PropertyKind>(&mut self, handle: PropertyHandle<P>) -> Result<()> {
        let id = handle.id();
        if self.prop_ref::<P>(id)?.core().is_linked() {
            self.unlink_property::<P>(id, false)?;
        }
        let property = self.prop_ref::<P>(id)?;
        let value = property.core().value.clone();
        let end = property.core().end_value_set().clone();
        P::store(self, id, value)?;
        end.dispatch(self, &id)
    }

    pub fn add_converter<P: PropertyKind>(
        &mut self,
        handle: PropertyHandle<P>,
        converter: impl Converter<P::Value> + 'static,
    ) -> Result<()> {
        self.prop_mut::<P>(handle.id())?
            .core_mut()
            .converters
            .push(Arc::new(converter));
        Ok(())
    }

    pub(crate) fn set_value<P: PropertyKind>(
        &mut self,
        id: PropertyId,
        value: P::Value,
        explicit: bool,
    ) -> Result<()> {
        let core = self.prop_ref::<P>(id)?.core();
        if P::values_equal(&core.value, &value) {
            return Ok(());
        }
        let begin = core.begin_value_set().clone();
        let end = core.end_value_set().clone();
        let change = ValueChange {
            property: id,
            previous: core.value.clone(),
            value: value.clone(),
        };

        begin.dispatch(self, &change)?;
        if explicit && self.prop_ref::<P>(id)?.core().is_linked() {
            self.unlink_property::<P>(id, false)?;
        }
        P::store(self, id, value)?;
        end.dispatch(self, &id)
    }

    pub(crate) fn convert_data<P: PropertyKind>(&self, id: PropertyId, data: &Value) -> Result<P::Value> {
        if let Some(value) = P::from_data(data) {
            return Ok(value);
        }
        let core = self.prop_ref::<P>(id)?.core();
        let kind = data.kind();
        match core.converters.iter().find(|c| c.can_convert(kind)) {
            Some(converter) => converter.convert(self, data),
            None => Err(Error::NoConverter {
                property: core.name().to_string(),
                from: kind,
                to: type_name::<P::Value>(),
            }),
        }
    }

    // Links

    /// Make `target` follow `source`
    ///
    /// Fails unless both value types are identical or a converter of the
    /// target accepts the source's value kind.
    pub fn link<P: PropertyKind, S: PropertyKind>(
        &mut self,
        target: PropertyHandle<P>,
        source: PropertyHandle<S>,
    ) -> Result<()> {
        P::link_from(self, target, source)
    }

    /// Drop the link of `handle`; with `reset` the default is restored
    pub fn unlink<P: PropertyKind>(&mut self, handle: PropertyHandle<P>, reset: bool) -> Result<()> {
        self.unlink_property::<P>(handle.id(), reset)
    }

    pub fn is_linked<P: PropertyKind>(&self, handle: PropertyHandle<P>) -> Result<bool> {
        Ok(self.prop_ref::<P>(handle.id())?.core().is_linked())
    }

    pub fn link_source<P: PropertyKind>(&self, handle: PropertyHandle<P>) -> Result<Option<PropertyId>> {
        Ok(self.prop_ref::<P>(handle.id())?.core().link_source())
    }

    pub(crate) fn unlink_property<P: PropertyKind>(&mut self, id: PropertyId, reset: bool) -> Result<()> {
        let Some(link) = self.prop_mut::<P>(id)?.core_mut().link.take() else {
            return Ok(());
        };
        debug!("unlinked {} from {}", id, link.source());
        link.release();
        if reset {
            let default = self.prop_ref::<P>(id)?.core().default.clone();
            self.set_value::<P>(id, default, false)?;
        }
        Ok(())
    }

    /// Check that `target` and `source` may be linked, dropping an older link
    pub(crate) fn prepare_link<P: PropertyKind>(&mut self, target: PropertyId, source: PropertyId) -> Result<()> {
        let origin = self.any_property(source)?.name().to_string();
        if target == source {
            return Err(Error::UnsupportedLink {
                target: origin.clone(),
                origin,
                from: type_name::<P::Value>(),
                to: type_name::<P::Value>(),
            });
        }
        self.unlink_property::<P>(target, false)
    }

    /// Install `link` and pull once; undo the subscriptions if the pull fails
    pub(crate) fn install_link<P: PropertyKind>(
        &mut self,
        target: PropertyId,
        link: LinkState,
        pull: impl FnOnce(&mut Graph) -> Result<()>,
    ) -> Result<()> {
        let source = link.source();
        self.prop_mut::<P>(target)?.core_mut().link = Some(link);
        if let Err(e) = pull(self) {
            if let Ok(property) = self.prop_mut::<P>(target) {
                if let Some(link) = property.core_mut().link.take() {
                    link.release();
                }
            }
            return Err(e);
        }
        debug!("linked {} to {}", target, source);
        Ok(())
    }

    /// Whole-value link, used by every kind without element-level links
    pub(crate) fn link_value<P: PropertyKind, S: PropertyKind>(
        &mut self,
        target: PropertyHandle<P>,
        source: PropertyHandle<S>,
    ) -> Result<()> {
        let (t, s) = (target.id(), source.id());
        let same_type = TypeId::of::<P::Value>() == TypeId::of::<S::Value>();
        if !same_type {
            let kind = <S as PropertyKind>::value_kind();
            let convertible = self
                .prop_ref::<P>(t)?
                .core()
                .converters
                .iter()
                .any(|c| c.can_convert(kind));
            if !convertible {
                return Err(Error::UnsupportedLink {
                    target: self.any_property(t)?.name().to_string(),
                    origin: self.any_property(s)?.name().to_string(),
                    from: type_name::<S::Value>(),
                    to: type_name::<P::Value>(),
                });
            }
        }
        self.prop_ref::<S>(s)?;
        self.prepare_link::<P>(t, s)?;

        let core = self.prop_ref::<S>(s)?.core();
        let end_set = core.end_value_set().clone();
        let disposed = core.disposed().clone();
        let subscriber = Subscriber::Property(t);
        end_set.subscribe(subscriber, move |g, _| g.pull_linked::<P, S>(t, s));
        disposed.subscribe(subscriber, move |g, _| g.unlink_property::<P>(t, true));

        let signals: Vec<Box<dyn Unsubscribe>> = vec![Box::new(end_set), Box::new(disposed)];
        let link = LinkState::new(s, subscriber, signals);
        self.install_link::<P>(t, link, |g| g.pull_linked::<P, S>(t, s))
    }

    fn pull_linked<P: PropertyKind, S: PropertyKind>(&mut self, target: PropertyId, source: PropertyId) -> Result<()> {
        let value = self.prop_ref::<S>(source)?.core().value.clone();
        let converted = match (&value as &dyn Any).downcast_ref::<P::Value>() {
            Some(same) => same.clone(),
            None => {
                let data = S::to_data(self, &value)?;
                self.convert_data::<P>(target, &data)?
            }
        };
        self.set_value::<P>(target, converted, false)
    }

    // Entity property table

    /// Add a property to `entity`, or return the existing one of kind `P`
    pub fn add_property<P: PropertyKind>(&mut self, entity: EntityId, name: &str) -> Result<PropertyHandle<P>> {
        if let Some(&id) = self.node(entity)?.properties.get(name) {
            return self.typed::<P>(id);
        }
        let id = self.insert_property(entity, name, new_boxed::<P>)?;
        Ok(PropertyHandle::new(id))
    }

    /// Look up a property of `entity` by name
    pub fn property<P: PropertyKind>(&self, entity: EntityId, name: &str) -> Result<PropertyHandle<P>> {
        let id = self.property_id(entity, name)?;
        self.typed::<P>(id)
    }

    pub fn property_id(&self, entity: EntityId, name: &str) -> Result<PropertyId> {
        let node = self.node(entity)?;
        node.properties
            .get(name)
            .copied()
            .ok_or_else(|| Error::MissingProperty {
                property: name.to_string(),
                entity: node.name.clone(),
            })
    }

    pub fn has_property(&self, entity: EntityId, name: &str) -> bool {
        self.node(entity)
            .map(|node| node.properties.contains_key(name))
            .unwrap_or(false)
    }

    pub fn property_names(&self, entity: EntityId) -> Result<Vec<String>> {
        Ok(self.node(entity)?.properties.keys().cloned().collect())
    }

    /// Dispose a property of `entity`, unlinking everything that follows it
    pub fn remove_property(&mut self, entity: EntityId, name: &str) -> Result<()> {
        let id = self.property_id(entity, name)?;
        self.dispose_property(id)
    }

    /// Write raw data to a named property, creating it as a `P` if missing
    pub fn set_property_data<P: PropertyKind>(
        &mut self,
        entity: EntityId,
        name: &str,
        data: &Value,
    ) -> Result<PropertyHandle<P>> {
        let handle = self.add_property::<P>(entity, name)?;
        self.set_data(handle, data)?;
        Ok(handle)
    }

    pub fn property_data(&self, entity: EntityId, name: &str) -> Result<Value> {
        self.data_of(self.property_id(entity, name)?)
    }

    /// Check that every named property exists and holds the given data
    pub fn matches_property_values(&self, entity: EntityId, expected: &[(&str, Value)]) -> Result<bool> {
        for (name, value) in expected {
            if !self.has_property(entity, name) {
                return Ok(false);
            }
            if self.property_data(entity, name)? != *value {
                return Ok(false);
            }
        }
        Ok(true)
    }

    pub(crate) fn insert_property(
        &mut self,
        entity: EntityId,
        name: &str,
        factory: PropertyFactory,
    ) -> Result<PropertyId> {
        self.node(entity)?;
        let id = PropertyId::new(self.next_property);
        self.next_property += 1;
        self.properties.insert(id, factory(id, name, entity));
        self.node_mut(entity)?.properties.insert(name.to_string(), id);
        debug!("created property '{}' ({}) on {}", name, id, entity);
        Ok(id)
    }

    pub(crate) fn dispose_property(&mut self, id: PropertyId) -> Result<()> {
        let property = self.any_property(id)?;
        let ops = property.ops();
        let disposed = property.disposed_signal();
        let linked = property.is_linked();
        let owner = property.owner();
        let name = property.name().to_string();

        (ops.dispose)(self, id)?;
        if linked {
            (ops.unlink)(self, id, true)?;
        }
        disposed.dispatch(self, &id)?;

        if let Some(node) = self.entities.get_mut(&owner) {
            node.properties.shift_remove(&name);
        }
        self.properties.shift_remove(&id);
        debug!("disposed property '{}' ({})", name, id);
        Ok(())
    }
}
