//! Value links between properties

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use strand_core::{
    converter, BoolProperty, EntityId, Error, FloatProperty, Graph, Id, IntProperty, JsonProperty, ListProperty,
    PropertyHandle, PropertyValue, Shared, StringProperty, Subscriber, Value, ValueKind,
};

fn two_entities(graph: &mut Graph) -> (EntityId, EntityId) {
    let a = graph.create_entity(Id::from_u64(1), "a");
    let b = graph.create_entity(Id::from_u64(2), "b");
    (a, b)
}

#[test]
fn test_add_then_subtract_on_linked_target() {
    let mut graph = Graph::new();
    let (a, b) = two_entities(&mut graph);
    let pa = graph.add_property::<FloatProperty>(a, "value").unwrap();
    let pb = graph.add_property::<FloatProperty>(b, "value").unwrap();

    graph.link(pb, pa).unwrap();
    graph.add(pa, 1.0).unwrap();
    assert_eq!(graph.value(pa).unwrap(), 1.0);
    assert_eq!(graph.value(pb).unwrap(), 1.0);
    assert!(graph.is_linked(pb).unwrap());

    graph.subtract(pb, 1.0).unwrap();
    assert_eq!(graph.value(pa).unwrap(), 1.0);
    assert_eq!(graph.value(pb).unwrap(), 0.0);
    assert!(!graph.is_linked(pb).unwrap());

    graph.set(pa, 4.0).unwrap();
    assert_eq!(graph.value(pb).unwrap(), 0.0);
}

#[test]
fn test_disposed_source_resets_target() {
    let mut graph = Graph::new();
    let (a, b) = two_entities(&mut graph);
    let pa = graph.add_property::<IntProperty>(a, "hull").unwrap();
    let pb = graph.add_property::<IntProperty>(b, "hull").unwrap();
    graph.set_default(pb, 10).unwrap();

    graph.set(pa, 3).unwrap();
    graph.link(pb, pa).unwrap();
    assert_eq!(graph.value(pb).unwrap(), 3);
    assert_eq!(graph.link_source(pb).unwrap(), Some(pa.id()));

    graph.dispose(a).unwrap();
    assert!(!graph.is_linked(pb).unwrap());
    assert_eq!(graph.value(pb).unwrap(), 10);
}

#[test]
fn test_relink_replaces_source() {
    let mut graph = Graph::new();
    let (a, b) = two_entities(&mut graph);
    let first = graph.add_property::<IntProperty>(a, "x").unwrap();
    let second = graph.add_property::<IntProperty>(a, "y").unwrap();
    let target = graph.add_property::<IntProperty>(b, "x").unwrap();

    graph.link(target, first).unwrap();
    graph.link(target, second).unwrap();
    graph.set(first, 5).unwrap();
    assert_eq!(graph.value(target).unwrap(), 0);
    graph.set(second, 6).unwrap();
    assert_eq!(graph.value(target).unwrap(), 6);

    assert!(matches!(graph.link(target, target), Err(Error::UnsupportedLink { .. })));
}

#[test]
fn test_bool_to_string_needs_converter() {
    let mut graph = Graph::new();
    let (a, b) = two_entities(&mut graph);
    let flag = graph.add_property::<BoolProperty>(a, "flag").unwrap();
    let text = graph.add_property::<StringProperty>(b, "text").unwrap();

    assert!(matches!(graph.link(text, flag), Err(Error::UnsupportedLink { .. })));
    assert!(!graph.is_linked(text).unwrap());

    graph
        .add_converter(text, converter(ValueKind::Bool, |v: &Value| v.as_bool().map(|b| b.to_string())))
        .unwrap();
    graph.link(text, flag).unwrap();
    assert_eq!(graph.value(text).unwrap(), "false");
    graph.set(flag, true).unwrap();
    assert_eq!(graph.value(text).unwrap(), "true");
}

#[test]
fn test_int_list_does_not_link_to_string_list() {
    let mut graph = Graph::new();
    let (a, b) = two_entities(&mut graph);
    let numbers = graph.add_property::<ListProperty<i32>>(a, "items").unwrap();
    let words = graph.add_property::<ListProperty<String>>(b, "items").unwrap();
    assert!(matches!(graph.link(words, numbers), Err(Error::UnsupportedLink { .. })));
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
struct Manifest {
    crates: u32,
    port: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
struct Roster {
    names: Vec<String>,
}

#[test]
fn test_json_links() {
    let mut graph = Graph::new();
    let (a, b) = two_entities(&mut graph);
    let source = graph.add_property::<JsonProperty<Manifest>>(a, "manifest").unwrap();
    let target = graph.add_property::<JsonProperty<Manifest>>(b, "manifest").unwrap();
    let roster = graph.add_property::<JsonProperty<Roster>>(b, "roster").unwrap();

    assert!(matches!(graph.link(roster, source), Err(Error::UnsupportedLink { .. })));

    graph.link(target, source).unwrap();
    graph.modify_model(source, |m| m.crates = 3).unwrap();
    assert_eq!(graph.model(target).unwrap().crates, 3);
    assert!(graph.is_linked(target).unwrap());

    graph.modify_model(target, |m| m.port = "Lisbon".into()).unwrap();
    assert!(!graph.is_linked(target).unwrap());
    assert_eq!(graph.model(source).unwrap().port, "");
    assert_eq!(graph.model(target).unwrap().crates, 3);
}

trait Ship: Send + Sync {
    fn class(&self) -> &str;
}

struct Frigate;

impl Ship for Frigate {
    fn class(&self) -> &str {
        "frigate"
    }
}

fn count_events<E: PropertyValue>(
    graph: &Graph,
    list: PropertyHandle<ListProperty<E>>,
    added: &Arc<AtomicUsize>,
    removed: &Arc<AtomicUsize>,
) {
    let token = Subscriber::Token(list.id().raw());
    let property = graph.property_ref(list).unwrap();
    let counter = added.clone();
    property.entry_added().subscribe(token, move |_, _| {
        counter.fetch_add(1, Ordering::SeqCst);
        Ok(())
    });
    let counter = removed.clone();
    property.entry_removed().subscribe(token, move |_, _| {
        counter.fetch_add(1, Ordering::SeqCst);
        Ok(())
    });
}

#[test]
fn test_covariant_list_shares_instances() {
    let mut graph = Graph::new();
    let (a, b) = two_entities(&mut graph);
    let frigates = graph.add_property::<ListProperty<Shared<Frigate>>>(a, "frigates").unwrap();
    let fleet = graph.add_property::<ListProperty<Shared<dyn Ship>>>(b, "ships").unwrap();

    let added = Arc::new(AtomicUsize::new(0));
    let removed = Arc::new(AtomicUsize::new(0));
    count_events(&graph, frigates, &added, &removed);
    count_events(&graph, fleet, &added, &removed);

    let first = Shared::new(Frigate);
    graph.add_entry(frigates, first.clone()).unwrap();
    graph
        .link_covariant(fleet, frigates, |f: &Shared<Frigate>| {
            let ship: Arc<dyn Ship> = f.to_arc();
            Shared::from_arc(ship)
        })
        .unwrap();
    assert_eq!(graph.entry_count(fleet).unwrap(), 1);

    let second = Shared::new(Frigate);
    graph.add_entry(frigates, second.clone()).unwrap();
    assert_eq!(added.load(Ordering::SeqCst), 3);

    let seen = graph.entry(fleet, 1).unwrap().unwrap();
    assert!(seen.same_instance(&second));
    assert!(!seen.same_instance(&first));
    assert_eq!(seen.class(), "frigate");

    graph.remove_entry(frigates, &first).unwrap();
    assert_eq!(removed.load(Ordering::SeqCst), 2);
    assert_eq!(graph.entry_count(fleet).unwrap(), 1);
    assert!(graph.entry(fleet, 0).unwrap().unwrap().same_instance(&second));

    graph.unlink(fleet, true).unwrap();
    assert_eq!(graph.entry_count(fleet).unwrap(), 0);
    assert_eq!(graph.entry_count(frigates).unwrap(), 1);
}
