//! List properties
//!
//! A list link works per entry: after the initial copy, only entry
//! additions and removals travel from source to target, so entries keep
//! their identity. A covariant link maps entries through a cast, which for
//! `Shared` entries exposes the same instances under a wider type.

use super::{CountChange, LinkState, PropertyCore, PropertyKind};
use crate::error::{Error, Result};
use crate::graph::Graph;
use crate::identity::{EntityId, PropertyHandle, PropertyId};
use crate::signal::{Signal, Subscriber, Unsubscribe};
use crate::value::{PropertyValue, Value, ValueKind};
use std::any::TypeId;
use std::sync::Arc;

/// Payload of `entry_added` and `entry_removed`
#[derive(Debug, Clone, PartialEq)]
pub struct EntryEvent<E> {
    pub property: PropertyId,
    pub index: usize,
    pub entry: E,
}

/// Property holding an ordered list of distinct entries
pub struct ListProperty<E: PropertyValue> {
    core: PropertyCore<Vec<E>>,
    entry_added: Signal<EntryEvent<E>>,
    entry_removed: Signal<EntryEvent<E>>,
    entry_count_changed: Signal<CountChange>,
}

impl<E: PropertyValue> ListProperty<E> {
    pub fn entries(&self) -> &[E] {
        &self.core.value
    }

    pub fn len(&self) -> usize {
        self.core.value.len()
    }

    pub fn is_empty(&self) -> bool {
        self.core.value.is_empty()
    }

    pub fn entry_added(&self) -> &Signal<EntryEvent<E>> {
        &self.entry_added
    }

    pub fn entry_removed(&self) -> &Signal<EntryEvent<E>> {
        &self.entry_removed
    }

    pub fn entry_count_changed(&self) -> &Signal<CountChange> {
        &self.entry_count_changed
    }
}

type Cast<S, E> = Arc<dyn Fn(&S) -> E + Send + Sync>;

impl<E: PropertyValue> PropertyKind for ListProperty<E> {
    type Value = Vec<E>;

    fn create(id: PropertyId, name: &str, owner: EntityId) -> Self {
        Self {
            core: PropertyCore::new(id, name, owner, Vec::new()),
            entry_added: Signal::new(),
            entry_removed: Signal::new(),
            entry_count_changed: Signal::new(),
        }
    }

    fn core(&self) -> &PropertyCore<Vec<E>> {
        &self.core
    }

    fn core_mut(&mut self) -> &mut PropertyCore<Vec<E>> {
        &mut self.core
    }

    fn value_kind() -> ValueKind {
        ValueKind::List
    }

    fn from_data(data: &Value) -> Option<Vec<E>> {
        data.as_list()?.iter().map(E::from_value).collect()
    }

    fn to_data(_graph: &Graph, value: &Vec<E>) -> Result<Value> {
        Ok(Value::List(value.iter().map(PropertyValue::to_value).collect()))
    }

    fn store(graph: &mut Graph, id: PropertyId, value: Vec<E>) -> Result<()> {
        let list = graph.prop_mut::<Self>(id)?;
        let before = list.core.value.len();
        list.core.value = value;
        let count = list.core.value.len();
        if count == before {
            return Ok(());
        }
        let counted = list.entry_count_changed.clone();
        counted.dispatch(graph, &CountChange { property: id, count })
    }

    fn link_from<S: PropertyKind>(
        graph: &mut Graph,
        target: PropertyHandle<Self>,
        source: PropertyHandle<S>,
    ) -> Result<()> {
        if TypeId::of::<S>() == TypeId::of::<Self>() {
            let source = PropertyHandle::<Self>::new(source.id());
            return graph.link_entries(target, source, Arc::new(E::clone));
        }
        graph.link_value(target, source)
    }
}

fn entry_text<E: PropertyValue>(entry: &E) -> String {
    entry.to_value().to_string()
}

impl Graph {
    /// Append `entry`; fails if an equal entry is present
    pub fn add_entry<E: PropertyValue>(
        &mut self,
        handle: PropertyHandle<ListProperty<E>>,
        entry: E,
    ) -> Result<()> {
        let list = self.prop_ref::<ListProperty<E>>(handle.id())?;
        if list.core.value.contains(&entry) {
            return Err(Error::DuplicateEntry {
                property: list.core.name().to_string(),
                entry: entry_text(&entry),
            });
        }
        let index = list.core.value.len();
        self.insert_entry::<E>(handle.id(), index, entry, true)
    }

    pub fn remove_entry<E: PropertyValue>(
        &mut self,
        handle: PropertyHandle<ListProperty<E>>,
        entry: &E,
    ) -> Result<()> {
        let list = self.prop_ref::<ListProperty<E>>(handle.id())?;
        let index = list
            .core
            .value
            .iter()
            .position(|e| e == entry)
            .ok_or_else(|| Error::MissingEntry {
                property: list.core.name().to_string(),
                entry: entry_text(entry),
            })?;
        self.remove_entry_at::<E>(handle.id(), index, true)
    }

    pub fn has_entry<E: PropertyValue>(
        &self,
        handle: PropertyHandle<ListProperty<E>>,
        entry: &E,
    ) -> Result<bool> {
        Ok(self.prop_ref::<ListProperty<E>>(handle.id())?.core.value.contains(entry))
    }

    pub fn entry<E: PropertyValue>(
        &self,
        handle: PropertyHandle<ListProperty<E>>,
        index: usize,
    ) -> Result<Option<E>> {
        Ok(self
            .prop_ref::<ListProperty<E>>(handle.id())?
            .core
            .value
            .get(index)
            .cloned())
    }

    pub fn entry_count<E: PropertyValue>(&self, handle: PropertyHandle<ListProperty<E>>) -> Result<usize> {
        Ok(self.prop_ref::<ListProperty<E>>(handle.id())?.core.value.len())
    }

    /// Link a list of `S` entries into a list of `E` entries through `cast`
    pub fn link_covariant<E, S>(
        &mut self,
        target: PropertyHandle<ListProperty<E>>,
        source: PropertyHandle<ListProperty<S>>,
        cast: impl Fn(&S) -> E + Send + Sync + 'static,
    ) -> Result<()>
    where
        E: PropertyValue,
        S: PropertyValue,
    {
        self.link_entries(target, source, Arc::new(cast))
    }

    fn link_entries<E: PropertyValue, S: PropertyValue>(
        &mut self,
        target: PropertyHandle<ListProperty<E>>,
        source: PropertyHandle<ListProperty<S>>,
        cast: Cast<S, E>,
    ) -> Result<()> {
        let (t, s) = (target.id(), source.id());
        self.prop_ref::<ListProperty<E>>(t)?;
        self.prop_ref::<ListProperty<S>>(s)?;
        self.prepare_link::<ListProperty<E>>(t, s)?;

        let src = self.prop_ref::<ListProperty<S>>(s)?;
        let added = src.entry_added.clone();
        let removed = src.entry_removed.clone();
        let end_set = src.core.end_value_set().clone();
        let disposed = src.core.disposed().clone();
        let subscriber = Subscriber::Property(t);

        let c = cast.clone();
        added.subscribe(subscriber, move |g, ev| {
            g.insert_entry::<E>(t, ev.index, c(&ev.entry), false)
        });
        removed.subscribe(subscriber, move |g, ev| g.remove_entry_at::<E>(t, ev.index, false));
        let c = cast.clone();
        end_set.subscribe(subscriber, move |g, _| g.pull_entries::<E, S>(t, s, &c));
        disposed.subscribe(subscriber, move |g, _| {
            g.unlink_property::<ListProperty<E>>(t, true)
        });

        let signals: Vec<Box<dyn Unsubscribe>> = vec![
            Box::new(added),
            Box::new(removed),
            Box::new(end_set),
            Box::new(disposed),
        ];
        let link = LinkState::new(s, subscriber, signals);
        self.install_link::<ListProperty<E>>(t, link, move |g| g.pull_entries::<E, S>(t, s, &cast))
    }

    fn pull_entries<E: PropertyValue, S: PropertyValue>(
        &mut self,
        target: PropertyId,
        source: PropertyId,
        cast: &Cast<S, E>,
    ) -> Result<()> {
        let entries: Vec<E> = self
            .prop_ref::<ListProperty<S>>(source)?
            .core
            .value
            .iter()
            .map(|entry| cast(entry))
            .collect();
        self.set_value::<ListProperty<E>>(target, entries, false)
    }

    fn insert_entry<E: PropertyValue>(
        &mut self,
        id: PropertyId,
        index: usize,
        entry: E,
        explicit: bool,
    ) -> Result<()> {
        if explicit && self.prop_ref::<ListProperty<E>>(id)?.core.is_linked() {
            self.unlink_property::<ListProperty<E>>(id, false)?;
        }
        let list = self.prop_mut::<ListProperty<E>>(id)?;
        let index = index.min(list.core.value.len());
        list.core.value.insert(index, entry.clone());
        let count = list.core.value.len();
        let added = list.entry_added.clone();
        let counted = list.entry_count_changed.clone();

        added.dispatch(
            self,
            &EntryEvent {
                property: id,
                index,
                entry,
            },
        )?;
        counted.dispatch(self, &CountChange { property: id, count })
    }

    fn remove_entry_at<E: PropertyValue>(
        &mut self,
        id: PropertyId,
        index: usize,
        explicit: bool,
    ) -> Result<()> {
        if explicit && self.prop_ref::<ListProperty<E>>(id)?.core.is_linked() {
            self.unlink_property::<ListProperty<E>>(id, false)?;
        }
        let list = self.prop_mut::<ListProperty<E>>(id)?;
        if index >= list.core.value.len() {
            return Err(Error::MissingEntry {
                property: list.core.name().to_string(),
                entry: format!("index {}", index),
            });
        }
        let entry = list.core.value.remove(index);
        let count = list.core.value.len();
        let removed = list.entry_removed.clone();
        let counted = list.entry_count_changed.clone();

        removed.dispatch(
            self,
            &EntryEvent {
                property: id,
                index,
                entry,
            },
        )?;
        counted.dispatch(self, &CountChange { property: id, count })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::address::Id;
    use std::sync::Mutex;

    fn setup() -> (Graph, PropertyHandle<ListProperty<i32>>, PropertyHandle<ListProperty<i32>>) {
        let mut graph = Graph::new();
        let a = graph.create_entity(Id::from_u64(1), "a");
        let b = graph.create_entity(Id::from_u64(2), "b");
        let la = graph.add_property::<ListProperty<i32>>(a, "items").unwrap();
        let lb = graph.add_property::<ListProperty<i32>>(b, "items").unwrap();
        (graph, la, lb)
    }

    #[test]
    fn test_entries_and_signals() {
        let (mut graph, list, _) = setup();
        let events = Arc::new(Mutex::new(Vec::new()));
        let ev = events.clone();
        graph
            .property_ref(list)
            .unwrap()
            .entry_added()
            .subscribe(Subscriber::Token(1), move |_, e| {
                ev.lock().unwrap().push(format!("+{}@{}", e.entry, e.index));
                Ok(())
            });
        let ev = events.clone();
        graph
            .property_ref(list)
            .unwrap()
            .entry_count_changed()
            .subscribe(Subscriber::Token(1), move |_, c| {
                ev.lock().unwrap().push(format!("#{}", c.count));
                Ok(())
            });

        graph.add_entry(list, 4).unwrap();
        graph.add_entry(list, 5).unwrap();
        assert!(matches!(graph.add_entry(list, 4), Err(Error::DuplicateEntry { .. })));
        assert!(graph.has_entry(list, &5).unwrap());
        assert_eq!(graph.entry(list, 1).unwrap(), Some(5));

        graph.remove_entry(list, &4).unwrap();
        assert!(matches!(graph.remove_entry(list, &4), Err(Error::MissingEntry { .. })));
        assert_eq!(graph.entry_count(list).unwrap(), 1);
        assert_eq!(*events.lock().unwrap(), vec!["+4@0", "#1", "+5@1", "#2", "#1"]);
    }

    #[test]
    fn test_linked_add_and_remove() {
        let (mut graph, source, target) = setup();
        graph.add_entry(source, 1).unwrap();
        graph.link(target, source).unwrap();
        assert_eq!(graph.value(target).unwrap(), vec![1]);

        graph.add_entry(source, 2).unwrap();
        graph.add_entry(source, 3).unwrap();
        graph.remove_entry(source, &1).unwrap();
        assert_eq!(graph.value(target).unwrap(), vec![2, 3]);
        assert!(graph.is_linked(target).unwrap());

        graph.unlink(target, true).unwrap();
        assert!(graph.value(target).unwrap().is_empty());
        graph.add_entry(source, 9).unwrap();
        assert!(graph.value(target).unwrap().is_empty());
    }

    #[test]
    fn test_explicit_add_unlinks() {
        let (mut graph, source, target) = setup();
        graph.link(target, source).unwrap();
        graph.add_entry(source, 1).unwrap();
        graph.add_entry(target, 7).unwrap();
        assert!(!graph.is_linked(target).unwrap());
        graph.add_entry(source, 2).unwrap();
        assert_eq!(graph.value(target).unwrap(), vec![1, 7]);
    }

    #[test]
    fn test_list_data() {
        let (mut graph, list, _) = setup();
        graph
            .set_data(list, &Value::List(vec![Value::Int(1), Value::Int(2)]))
            .unwrap();
        assert_eq!(graph.value(list).unwrap(), vec![1, 2]);
        assert_eq!(
            graph.data(list).unwrap(),
            Value::List(vec![Value::Int(1), Value::Int(2)])
        );
        assert!(graph
            .set_data(list, &Value::List(vec![Value::from("x")]))
            .is_err());
    }

    #[test]
    fn test_list_of_other_element_type_cannot_link() {
        let mut graph = Graph::new();
        let e = graph.create_entity(Id::from_u64(1), "e");
        let ints = graph.add_property::<ListProperty<i32>>(e, "ints").unwrap();
        let texts = graph.add_property::<ListProperty<String>>(e, "texts").unwrap();
        assert!(matches!(
            graph.link(texts, ints),
            Err(Error::UnsupportedLink { .. })
        ));
    }
}
