//! Map properties
//!
//! Keys keep insertion order. The data form is a list of `[key, value]`
//! pairs; a `Value::Map` is also accepted when keys are strings.

use super::{CountChange, LinkState, PropertyCore, PropertyKind};
use crate::error::{Error, Result};
use crate::graph::Graph;
use crate::identity::{EntityId, PropertyHandle, PropertyId};
use crate::signal::{Signal, Subscriber, Unsubscribe};
use crate::value::{PropertyValue, Value, ValueKind};
use indexmap::IndexMap;
use std::any::TypeId;
use std::hash::Hash;
use std::sync::Arc;

/// Payload of `element_get` and `end_element_set`
#[derive(Debug, Clone, PartialEq)]
pub struct KeyEvent<K> {
    pub property: PropertyId,
    pub key: K,
}

/// Payload of `begin_element_set`, `element_added` and `element_removed`
#[derive(Debug, Clone, PartialEq)]
pub struct ElementEvent<K, V> {
    pub property: PropertyId,
    pub key: K,
    pub value: V,
}

/// Property holding an ordered key/value map
pub struct MapProperty<K, V>
where
    K: PropertyValue + Eq + Hash,
    V: PropertyValue,
{
    core: PropertyCore<IndexMap<K, V>>,
    element_get: Signal<KeyEvent<K>>,
    begin_element_set: Signal<ElementEvent<K, V>>,
    end_element_set: Signal<KeyEvent<K>>,
    element_added: Signal<ElementEvent<K, V>>,
    element_removed: Signal<ElementEvent<K, V>>,
    element_count_changed: Signal<CountChange>,
}

impl<K, V> MapProperty<K, V>
where
    K: PropertyValue + Eq + Hash,
    V: PropertyValue,
{
    pub fn elements(&self) -> &IndexMap<K, V> {
        &self.core.value
    }

    pub fn len(&self) -> usize {
        self.core.value.len()
    }

    pub fn is_empty(&self) -> bool {
        self.core.value.is_empty()
    }

    pub fn element_get(&self) -> &Signal<KeyEvent<K>> {
        &self.element_get
    }

    /// Fires before an existing key gets a new value
    pub fn begin_element_set(&self) -> &Signal<ElementEvent<K, V>> {
        &self.begin_element_set
    }

    pub fn end_element_set(&self) -> &Signal<KeyEvent<K>> {
        &self.end_element_set
    }

    pub fn element_added(&self) -> &Signal<ElementEvent<K, V>> {
        &self.element_added
    }

    pub fn element_removed(&self) -> &Signal<ElementEvent<K, V>> {
        &self.element_removed
    }

    pub fn element_count_changed(&self) -> &Signal<CountChange> {
        &self.element_count_changed
    }
}

type Cast<S, V> = Arc<dyn Fn(&S) -> V + Send + Sync>;

impl<K, V> PropertyKind for MapProperty<K, V>
where
    K: PropertyValue + Eq + Hash,
    V: PropertyValue,
{
    type Value = IndexMap<K, V>;

    fn create(id: PropertyId, name: &str, owner: EntityId) -> Self {
        Self {
            core: PropertyCore::new(id, name, owner, IndexMap::new()),
            element_get: Signal::new(),
            begin_element_set: Signal::new(),
            end_element_set: Signal::new(),
            element_added: Signal::new(),
            element_removed: Signal::new(),
            element_count_changed: Signal::new(),
        }
    }

    fn core(&self) -> &PropertyCore<IndexMap<K, V>> {
        &self.core
    }

    fn core_mut(&mut self) -> &mut PropertyCore<IndexMap<K, V>> {
        &mut self.core
    }

    fn value_kind() -> ValueKind {
        ValueKind::Map
    }

    fn from_data(data: &Value) -> Option<IndexMap<K, V>> {
        match data {
            Value::List(pairs) => pairs
                .iter()
                .map(|pair| match pair.as_list()? {
                    [key, value] => Some((K::from_value(key)?, V::from_value(value)?)),
                    _ => None,
                })
                .collect(),
            Value::Map(map) => map
                .iter()
                .map(|(key, value)| {
                    let key = K::from_value(&Value::String(key.clone()))?;
                    Some((key, V::from_value(value)?))
                })
                .collect(),
            _ => None,
        }
    }

    fn to_data(_graph: &Graph, value: &IndexMap<K, V>) -> Result<Value> {
        Ok(Value::List(
            value
                .iter()
                .map(|(k, v)| Value::List(vec![k.to_value(), v.to_value()]))
                .collect(),
        ))
    }

    fn store(graph: &mut Graph, id: PropertyId, value: IndexMap<K, V>) -> Result<()> {
        let map = graph.prop_mut::<Self>(id)?;
        let before = map.core.value.len();
        map.core.value = value;
        let count = map.core.value.len();
        if count == before {
            return Ok(());
        }
        let counted = map.element_count_changed.clone();
        counted.dispatch(graph, &CountChange { property: id, count })
    }

    fn link_from<S: PropertyKind>(
        graph: &mut Graph,
        target: PropertyHandle<Self>,
        source: PropertyHandle<S>,
    ) -> Result<()> {
        if TypeId::of::<S>() == TypeId::of::<Self>() {
            let source = PropertyHandle::<Self>::new(source.id());
            return graph.link_elements(target, source, Arc::new(V::clone));
        }
        graph.link_value(target, source)
    }
}

fn key_text<K: PropertyValue>(key: &K) -> String {
    key.to_value().to_string()
}

impl Graph {
    /// Add `key` or replace its value
    pub fn insert_element<K, V>(
        &mut self,
        handle: PropertyHandle<MapProperty<K, V>>,
        key: K,
        value: V,
    ) -> Result<()>
    where
        K: PropertyValue + Eq + Hash,
        V: PropertyValue,
    {
        self.put_element::<K, V>(handle.id(), key, value, true)
    }

    /// Add `key`; fails if it is already present
    pub fn add_element<K, V>(
        &mut self,
        handle: PropertyHandle<MapProperty<K, V>>,
        key: K,
        value: V,
    ) -> Result<()>
    where
        K: PropertyValue + Eq + Hash,
        V: PropertyValue,
    {
        let map = self.prop_ref::<MapProperty<K, V>>(handle.id())?;
        if map.core.value.contains_key(&key) {
            return Err(Error::DuplicateEntry {
                property: map.core.name().to_string(),
                entry: key_text(&key),
            });
        }
        self.put_element::<K, V>(handle.id(), key, value, true)
    }

    pub fn remove_element<K, V>(&mut self, handle: PropertyHandle<MapProperty<K, V>>, key: &K) -> Result<V>
    where
        K: PropertyValue + Eq + Hash,
        V: PropertyValue,
    {
        self.take_element::<K, V>(handle.id(), key, true)
    }

    pub fn has_element<K, V>(&self, handle: PropertyHandle<MapProperty<K, V>>, key: &K) -> Result<bool>
    where
        K: PropertyValue + Eq + Hash,
        V: PropertyValue,
    {
        Ok(self
            .prop_ref::<MapProperty<K, V>>(handle.id())?
            .core
            .value
            .contains_key(key))
    }

    /// Value under `key`, without notifications
    pub fn element<K, V>(&self, handle: PropertyHandle<MapProperty<K, V>>, key: &K) -> Result<Option<V>>
    where
        K: PropertyValue + Eq + Hash,
        V: PropertyValue,
    {
        Ok(self
            .prop_ref::<MapProperty<K, V>>(handle.id())?
            .core
            .value
            .get(key)
            .cloned())
    }

    /// Value under `key`, firing `element_get` unless it is already dispatching
    pub fn get_element<K, V>(
        &mut self,
        handle: PropertyHandle<MapProperty<K, V>>,
        key: &K,
    ) -> Result<Option<V>>
    where
        K: PropertyValue + Eq + Hash,
        V: PropertyValue,
    {
        let signal = self
            .prop_ref::<MapProperty<K, V>>(handle.id())?
            .element_get
            .clone();
        if !signal.is_dispatching() {
            let event = KeyEvent {
                property: handle.id(),
                key: key.clone(),
            };
            signal.dispatch(self, &event)?;
        }
        self.element(handle, key)
    }

    pub fn element_count<K, V>(&self, handle: PropertyHandle<MapProperty<K, V>>) -> Result<usize>
    where
        K: PropertyValue + Eq + Hash,
        V: PropertyValue,
    {
        Ok(self.prop_ref::<MapProperty<K, V>>(handle.id())?.core.value.len())
    }

    /// Link a map with `S` values into a map with `V` values through `cast`
    pub fn link_covariant_map<K, V, S>(
        &mut self,
        target: PropertyHandle<MapProperty<K, V>>,
        source: PropertyHandle<MapProperty<K, S>>,
        cast: impl Fn(&S) -> V + Send + Sync + 'static,
    ) -> Result<()>
    where
        K: PropertyValue + Eq + Hash,
        V: PropertyValue,
        S: PropertyValue,
    {
        self.link_elements(target, source, Arc::new(cast))
    }

    fn link_elements<K, V, S>(
        &mut self,
        target: PropertyHandle<MapProperty<K, V>>,
        source: PropertyHandle<MapProperty<K, S>>,
        cast: Cast<S, V>,
    ) -> Result<()>
    where
        K: PropertyValue + Eq + Hash,
        V: PropertyValue,
        S: PropertyValue,
    {
        let (t, s) = (target.id(), source.id());
        self.prop_ref::<MapProperty<K, V>>(t)?;
        self.prop_ref::<MapProperty<K, S>>(s)?;
        self.prepare_link::<MapProperty<K, V>>(t, s)?;

        let src = self.prop_ref::<MapProperty<K, S>>(s)?;
        let added = src.element_added.clone();
        let removed = src.element_removed.clone();
        let element_set = src.end_element_set.clone();
        let end_set = src.core.end_value_set().clone();
        let disposed = src.core.disposed().clone();
        let subscriber = Subscriber::Property(t);

        let c = cast.clone();
        added.subscribe(subscriber, move |g, ev| {
            g.put_element::<K, V>(t, ev.key.clone(), c(&ev.value), false)
        });
        removed.subscribe(subscriber, move |g, ev| {
            g.take_element::<K, V>(t, &ev.key, false).map(|_| ())
        });
        let c = cast.clone();
        element_set.subscribe(subscriber, move |g, ev| {
            let value = g
                .prop_ref::<MapProperty<K, S>>(s)?
                .core
                .value
                .get(&ev.key)
                .map(|v| c(v));
            match value {
                Some(value) => g.put_element::<K, V>(t, ev.key.clone(), value, false),
                None => Ok(()),
            }
        });
        let c = cast.clone();
        end_set.subscribe(subscriber, move |g, _| g.pull_elements::<K, V, S>(t, s, &c));
        disposed.subscribe(subscriber, move |g, _| {
            g.unlink_property::<MapProperty<K, V>>(t, true)
        });

        let signals: Vec<Box<dyn Unsubscribe>> = vec![
            Box::new(added),
            Box::new(removed),
            Box::new(element_set),
            Box::new(end_set),
            Box::new(disposed),
        ];
        let link = LinkState::new(s, subscriber, signals);
        self.install_link::<MapProperty<K, V>>(t, link, move |g| {
            g.pull_elements::<K, V, S>(t, s, &cast)
        })
    }

    fn pull_elements<K, V, S>(&mut self, target: PropertyId, source: PropertyId, cast: &Cast<S, V>) -> Result<()>
    where
        K: PropertyValue + Eq + Hash,
        V: PropertyValue,
        S: PropertyValue,
    {
        let elements: IndexMap<K, V> = self
            .prop_ref::<MapProperty<K, S>>(source)?
            .core
            .value
            .iter()
            .map(|(k, v)| (k.clone(), cast(v)))
            .collect();
        self.set_value::<MapProperty<K, V>>(target, elements, false)
    }

    fn put_element<K, V>(&mut self, id: PropertyId, key: K, value: V, explicit: bool) -> Result<()>
    where
        K: PropertyValue + Eq + Hash,
        V: PropertyValue,
    {
        let map = self.prop_ref::<MapProperty<K, V>>(id)?;
        let previous = map.core.value.get(&key);
        if previous == Some(&value) {
            return Ok(());
        }
        let replacing = previous.is_some();
        let begin = map.begin_element_set.clone();
        let end = map.end_element_set.clone();
        let added = map.element_added.clone();
        let counted = map.element_count_changed.clone();
        let event = ElementEvent {
            property: id,
            key,
            value,
        };

        if replacing {
            begin.dispatch(self, &event)?;
        }
        if explicit && self.prop_ref::<MapProperty<K, V>>(id)?.core.is_linked() {
            self.unlink_property::<MapProperty<K, V>>(id, false)?;
        }
        let map = self.prop_mut::<MapProperty<K, V>>(id)?;
        map.core.value.insert(event.key.clone(), event.value.clone());
        let count = map.core.value.len();

        if replacing {
            let changed = KeyEvent {
                property: id,
                key: event.key,
            };
            return end.dispatch(self, &changed);
        }
        added.dispatch(self, &event)?;
        counted.dispatch(self, &CountChange { property: id, count })
    }

    fn take_element<K, V>(&mut self, id: PropertyId, key: &K, explicit: bool) -> Result<V>
    where
        K: PropertyValue + Eq + Hash,
        V: PropertyValue,
    {
        if explicit && self.prop_ref::<MapProperty<K, V>>(id)?.core.is_linked() {
            self.unlink_property::<MapProperty<K, V>>(id, false)?;
        }
        let map = self.prop_mut::<MapProperty<K, V>>(id)?;
        let Some(value) = map.core.value.shift_remove(key) else {
            return Err(Error::MissingEntry {
                property: map.core.name().to_string(),
                entry: key_text(key),
            });
        };
        let count = map.core.value.len();
        let removed = map.element_removed.clone();
        let counted = map.element_count_changed.clone();

        let event = ElementEvent {
            property: id,
            key: key.clone(),
            value,
        };
        removed.dispatch(self, &event)?;
        counted.dispatch(self, &CountChange { property: id, count })?;
        Ok(event.value)
    }
}
