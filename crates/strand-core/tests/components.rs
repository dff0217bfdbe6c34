//! Component wiring and the entity tree

use strand_core::{
    Component, ComponentContext, ComponentDep, ComponentKind, EntityId, EntityManager, Error, Graph, Id, IntProperty,
    Named, PropertyHandle, PropertySlot, ReferenceProperty, Result, StringProperty, Value, Wiring,
};

#[derive(Default)]
struct Hull {
    integrity: Option<PropertyHandle<IntProperty>>,
}

impl Component for Hull {
    fn wiring(&self) -> Wiring {
        Wiring::new().property(PropertySlot::create::<IntProperty>("integrity").with_default(Value::Int(100)))
    }

    fn on_connect(&mut self, cx: &mut ComponentContext<'_>) -> Result<()> {
        self.integrity = Some(cx.property::<IntProperty>("integrity")?);
        Ok(())
    }
}

#[derive(Default)]
struct Shield;

impl Component for Shield {
    fn wiring(&self) -> Wiring {
        Wiring::new()
            .component(ComponentDep::of::<Hull>())
            .property(PropertySlot::existing::<IntProperty>("integrity"))
    }
}

#[test]
fn test_still_required_guard() {
    let mut graph = Graph::new();
    let ship = graph.create_entity(Id::from_u64(1), "ship");
    graph.add_component(ship, Hull::default()).unwrap();
    graph.add_component(ship, Shield).unwrap();

    assert!(matches!(
        graph.remove_component::<Hull>(ship),
        Err(Error::StillRequired { .. })
    ));
    assert!(graph.has_component::<Hull>(ship));

    graph.remove_component::<Shield>(ship).unwrap();
    graph.remove_component::<Hull>(ship).unwrap();
    assert!(!graph.has_component::<Hull>(ship));
}

#[test]
fn test_components_share_property() {
    let mut graph = Graph::new();
    let ship = graph.create_entity(Id::from_u64(1), "ship");
    graph.add_component(ship, Hull::default()).unwrap();
    graph.add_component(ship, Shield).unwrap();

    let hull = graph.component_properties(ship, ComponentKind::of::<Hull>().id).unwrap();
    let shield = graph.component_properties(ship, ComponentKind::of::<Shield>().id).unwrap();
    assert_eq!(hull["integrity"], shield["integrity"]);

    let integrity = graph.component::<Hull>(ship).unwrap().integrity.unwrap();
    assert_eq!(graph.value(integrity).unwrap(), 100);
}

#[test]
fn test_readd_removed_component() {
    let mut graph = Graph::new();
    let ship = graph.create_entity(Id::from_u64(1), "ship");
    graph.add_component(ship, Hull::default()).unwrap();
    let first = graph.component::<Hull>(ship).unwrap().integrity.unwrap();
    graph.set(first, 40).unwrap();

    let removed = graph.remove_component::<Hull>(ship).unwrap();
    assert_eq!(removed.integrity, Some(first));
    assert!(matches!(
        graph.remove_component::<Hull>(ship),
        Err(Error::NotConnected { .. })
    ));

    graph.add_component(ship, Hull::default()).unwrap();
    let second = graph.component::<Hull>(ship).unwrap().integrity.unwrap();
    assert_eq!(first, second);
    assert_eq!(graph.value(second).unwrap(), 40);
    assert!(matches!(
        graph.add_component(ship, Hull::default()),
        Err(Error::ComponentExists { .. })
    ));
}

trait Propulsion {}

#[derive(Default)]
struct Sail;

impl Component for Sail {
    fn wiring(&self) -> Wiring {
        Wiring::new().provides::<dyn Propulsion>()
    }
}

#[derive(Default)]
struct Helm {
    drive: Option<EntityId>,
}

impl Component for Helm {
    fn wiring(&self) -> Wiring {
        Wiring::new().component(ComponentDep::role::<dyn Propulsion>())
    }

    fn on_connect(&mut self, cx: &mut ComponentContext<'_>) -> Result<()> {
        self.drive = cx.required_entity::<dyn Propulsion>();
        Ok(())
    }
}

#[test]
fn test_role_dependency() {
    let mut graph = Graph::new();
    let ship = graph.create_entity(Id::from_u64(1), "ship");
    assert!(matches!(
        graph.add_component(ship, Helm::default()),
        Err(Error::MissingComponent { .. })
    ));
    assert!(!graph.has_component::<Helm>(ship));

    graph.add_component(ship, Sail).unwrap();
    graph.add_component(ship, Helm::default()).unwrap();
    assert_eq!(graph.component::<Helm>(ship).unwrap().drive, Some(ship));
    assert!(matches!(
        graph.remove_component::<Sail>(ship),
        Err(Error::StillRequired { .. })
    ));
}

#[derive(Default)]
struct Harbor;

impl Component for Harbor {}

#[derive(Default)]
struct Berth {
    harbor: Option<EntityId>,
}

impl Component for Berth {
    fn wiring(&self) -> Wiring {
        Wiring::new().component(ComponentDep::of::<Harbor>().search_parent())
    }

    fn on_connect(&mut self, cx: &mut ComponentContext<'_>) -> Result<()> {
        self.harbor = cx.required_entity::<Harbor>();
        Ok(())
    }
}

#[test]
fn test_search_parent() {
    let mut graph = Graph::new();
    let port = graph.create_entity(Id::from_u64(1), "port");
    let quay = graph.add_child(port, Id::from_u64(2), "quay").unwrap();
    let slot = graph.add_child(quay, Id::from_u64(3), "slot").unwrap();

    assert!(matches!(
        graph.add_component(slot, Berth::default()),
        Err(Error::MissingComponent { .. })
    ));

    graph.add_component(port, Harbor).unwrap();
    graph.add_component(slot, Berth::default()).unwrap();
    assert_eq!(graph.component::<Berth>(slot).unwrap().harbor, Some(port));
    assert_eq!(
        graph.required_by(port, ComponentKind::of::<Harbor>().id).unwrap(),
        vec![(slot, ComponentKind::of::<Berth>())]
    );
    assert!(matches!(
        graph.remove_component::<Harbor>(port),
        Err(Error::StillRequired { .. })
    ));

    graph.dispose(slot).unwrap();
    graph.remove_component::<Harbor>(port).unwrap();
}

#[derive(Default)]
struct Anchorage;

impl Component for Anchorage {}

#[test]
fn test_reference_teardown_on_dispose() {
    let mut graph = Graph::new();
    let world = graph.create_entity(Id::from_u64(1), "world");
    let bay = graph.add_child(world, Id::from_u64(2), "bay").unwrap();
    let ship = graph.add_child(world, Id::from_u64(3), "ship").unwrap();
    let tender = graph.add_child(world, Id::from_u64(4), "tender").unwrap();
    graph.add_component(bay, Anchorage).unwrap();

    let moored = graph.add_property::<ReferenceProperty<Anchorage>>(ship, "moored").unwrap();
    let escort = graph.add_property::<ReferenceProperty<Anchorage>>(tender, "escort").unwrap();
    graph.set_data(moored, &Value::from("01/02")).unwrap();
    graph.set_target(escort, bay).unwrap();
    assert_eq!(graph.target(moored).unwrap(), Some(bay));

    graph.dispose(bay).unwrap();
    assert!(!graph.contains(bay));
    assert!(graph.is_default(moored).unwrap());
    assert!(graph.is_default(escort).unwrap());
    assert_eq!(graph.data(moored).unwrap(), Value::Null);
    assert_eq!(graph.children(world).unwrap(), vec![ship, tender]);
}

#[test]
fn test_named_and_manager() {
    let mut graph = Graph::new();
    let fleet = graph.create_entity(Id::from_u64(1), "fleet");
    graph
        .add_component(fleet, EntityManager::new().with_template::<Named>().with_template::<Hull>())
        .unwrap();

    let address = graph
        .component::<EntityManager>(fleet)
        .unwrap()
        .create_address(&graph, Id::from_u64(9))
        .unwrap();
    assert_eq!(address.to_string(), "01/09");

    let cutter = graph.add_child(fleet, Id::from_u64(9), "cutter").unwrap();
    assert_eq!(graph.address(cutter).unwrap(), address);
    assert!(graph.has_component::<Hull>(cutter));

    let name = graph.property::<StringProperty>(cutter, Named::PROPERTY).unwrap();
    assert_eq!(graph.value(name).unwrap(), "cutter");
    graph.set(name, "sloop".to_string()).unwrap();
    assert_eq!(graph.child_by_name(fleet, "sloop").unwrap(), Some(cutter));
}

#[test]
fn test_reparent_moves_addresses() {
    let mut graph = Graph::new();
    let a = graph.create_entity(Id::from_u64(1), "a");
    let b = graph.create_entity(Id::from_u64(2), "b");
    let child = graph.add_child(a, Id::from_u64(5), "child").unwrap();
    let leaf = graph.add_child(child, Id::from_u64(6), "leaf").unwrap();
    assert_eq!(graph.address(leaf).unwrap().to_string(), "01/05/06");

    graph.set_parent(child, Some(b)).unwrap();
    assert_eq!(graph.address(leaf).unwrap().to_string(), "02/05/06");
    assert_eq!(graph.child_count(a).unwrap(), 0);
    assert_eq!(graph.root(leaf).unwrap(), b);

    assert!(matches!(
        graph.set_parent(b, Some(leaf)),
        Err(Error::InvalidParent { .. })
    ));
    assert!(matches!(
        graph.add_child(b, Id::from_u64(5), "twin"),
        Err(Error::DuplicateChild { .. })
    ));
}
