//! Reference properties
//!
//! A reference points at the component `C` of another entity. Data is the
//! target's address. While a target is set, the property is registered in
//! the target entity's [`DependencyContainer`] and watches the target
//! component, so it resets before the target finishes disconnecting.

use super::{PropertyCore, PropertyKind};
use crate::address::Address;
use crate::component::{Component, ComponentKind, ComponentRef};
use crate::convert::Converter;
use crate::dependency::DependencyContainer;
use crate::error::{Error, Result};
use crate::graph::Graph;
use crate::identity::{EntityId, PropertyHandle, PropertyId};
use crate::signal::Subscriber;
use crate::value::{Value, ValueKind};
use log::debug;
use std::any::type_name;
use std::marker::PhantomData;
use std::sync::Arc;

/// Property holding an optional reference to a `C`
pub struct ReferenceProperty<C: Component> {
    core: PropertyCore<Option<ComponentRef<C>>>,
}

struct AddressConverter<C> {
    _target: PhantomData<fn() -> C>,
}

impl<C: Component> Converter<Option<ComponentRef<C>>> for AddressConverter<C> {
    fn can_convert(&self, kind: ValueKind) -> bool {
        matches!(kind, ValueKind::Address | ValueKind::String | ValueKind::Bytes)
    }

    fn convert(&self, graph: &Graph, data: &Value) -> Result<Option<ComponentRef<C>>> {
        let address = match data {
            Value::Address(address) => address.clone(),
            Value::String(text) => Address::parse(text)?,
            Value::Bytes(bytes) => Address::from_bytes(bytes)?,
            other => {
                return Err(Error::Conversion {
                    from: other.kind(),
                    to: type_name::<C>(),
                })
            }
        };
        if !address.is_valid() {
            return Ok(None);
        }
        let entity = graph.resolve(&address)?;
        if !graph.has_component::<C>(entity) {
            return Err(Error::UnresolvedAddress(format!(
                "{} (no {})",
                address,
                ComponentKind::of::<C>()
            )));
        }
        Ok(Some(ComponentRef::new(entity)))
    }
}

impl<C: Component> PropertyKind for ReferenceProperty<C> {
    type Value = Option<ComponentRef<C>>;

    fn create(id: PropertyId, name: &str, owner: EntityId) -> Self {
        let converter: Arc<dyn Converter<Option<ComponentRef<C>>>> = Arc::new(AddressConverter::<C> {
            _target: PhantomData,
        });
        Self {
            core: PropertyCore::new(id, name, owner, None).with_converters(vec![converter]),
        }
    }

    fn core(&self) -> &PropertyCore<Option<ComponentRef<C>>> {
        &self.core
    }

    fn core_mut(&mut self) -> &mut PropertyCore<Option<ComponentRef<C>>> {
        &mut self.core
    }

    fn value_kind() -> ValueKind {
        ValueKind::Reference
    }

    fn from_data(data: &Value) -> Option<Option<ComponentRef<C>>> {
        match data {
            Value::Null => Some(None),
            Value::Address(address) if !address.is_valid() => Some(None),
            _ => None,
        }
    }

    fn to_data(graph: &Graph, value: &Option<ComponentRef<C>>) -> Result<Value> {
        match value {
            Some(target) => Ok(Value::Address(graph.address_of(target.entity())?)),
            None => Ok(Value::Null),
        }
    }

    fn store(graph: &mut Graph, id: PropertyId, value: Option<ComponentRef<C>>) -> Result<()> {
        let previous = graph.prop_ref::<Self>(id)?.core.value;
        if let Some(previous) = previous {
            graph.release_target::<C>(id, previous.entity());
        }
        graph.prop_mut::<Self>(id)?.core.value = value;
        if let Some(target) = value {
            graph.attach_target::<C>(id, target.entity())?;
        }
        Ok(())
    }

    fn on_dispose(graph: &mut Graph, id: PropertyId) -> Result<()> {
        let target = graph.prop_mut::<Self>(id)?.core.value.take();
        if let Some(target) = target {
            graph.release_target::<C>(id, target.entity());
        }
        Ok(())
    }
}

impl Graph {
    /// Point `handle` at the `C` of `entity`
    pub fn set_target<C: Component>(
        &mut self,
        handle: PropertyHandle<ReferenceProperty<C>>,
        entity: EntityId,
    ) -> Result<()> {
        if !self.has_component::<C>(entity) {
            return Err(Error::MissingComponent {
                component: type_name::<ReferenceProperty<C>>(),
                required: type_name::<C>(),
                entity: self.name(entity)?.to_string(),
            });
        }
        self.set(handle, Some(ComponentRef::new(entity)))
    }

    pub fn has_target<C: Component>(&self, handle: PropertyHandle<ReferenceProperty<C>>) -> Result<bool> {
        Ok(self.prop_ref::<ReferenceProperty<C>>(handle.id())?.core.value.is_some())
    }

    /// Entity of the current target
    pub fn target<C: Component>(&self, handle: PropertyHandle<ReferenceProperty<C>>) -> Result<Option<EntityId>> {
        Ok(self
            .prop_ref::<ReferenceProperty<C>>(handle.id())?
            .core
            .value
            .map(|target| target.entity()))
    }

    /// Another component on the target's entity
    pub fn other_component<C: Component, O: Component>(
        &self,
        handle: PropertyHandle<ReferenceProperty<C>>,
    ) -> Result<Option<&O>> {
        match self.target(handle)? {
            Some(entity) => self.component::<O>(entity).map(Some),
            None => Ok(None),
        }
    }

    fn attach_target<C: Component>(&mut self, id: PropertyId, target: EntityId) -> Result<()> {
        let signals = self.component_signals(target, ComponentKind::of::<C>().id)?;
        signals
            .begin_disconnect
            .subscribe(Subscriber::Property(id), move |g, _| g.reset_of(id));

        let owner = self.any_property(id)?.owner();
        if !self.has_component::<DependencyContainer>(target) {
            self.add_component(target, DependencyContainer::default())?;
        }
        self.add_dependency(target, owner, id)?;
        debug!("{} now references {}", id, target);
        Ok(())
    }

    fn release_target<C: Component>(&mut self, id: PropertyId, target: EntityId) {
        if let Ok(signals) = self.component_signals(target, ComponentKind::of::<C>().id) {
            signals.begin_disconnect.unsubscribe(&Subscriber::Property(id));
        }
        let Ok(owner) = self.any_property(id).map(|p| p.owner()) else {
            return;
        };
        if let Err(e) = self.remove_dependency(target, owner, id) {
            debug!("{} left {} without unregistering: {}", id, target, e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::address::Id;

    #[derive(Default)]
    struct Dock;
    impl Component for Dock {}

    #[derive(Default)]
    struct Crane {
        lift: u32,
    }
    impl Component for Crane {}

    fn setup() -> (Graph, EntityId, EntityId, PropertyHandle<ReferenceProperty<Dock>>) {
        let mut graph = Graph::new();
        let world = graph.create_entity(Id::from_u64(1), "world");
        let dock = graph.add_child(world, Id::from_u64(2), "dock").unwrap();
        let ship = graph.add_child(world, Id::from_u64(3), "ship").unwrap();
        graph.add_component(dock, Dock).unwrap();
        let home = graph.add_property::<ReferenceProperty<Dock>>(ship, "home").unwrap();
        (graph, dock, ship, home)
    }

    #[test]
    fn test_resolve_from_data() {
        let (mut graph, dock, _, home) = setup();
        graph.set_data(home, &Value::from("01/02")).unwrap();
        assert_eq!(graph.target(home).unwrap(), Some(dock));
        assert_eq!(graph.data(home).unwrap(), Value::Address(Address::parse("01/02").unwrap()));

        graph.set_data(home, &Value::Null).unwrap();
        assert!(!graph.has_target(home).unwrap());

        let bytes = Address::parse("01/02").unwrap().to_bytes();
        graph.set_data(home, &Value::Bytes(bytes)).unwrap();
        assert!(graph.has_target(home).unwrap());

        graph.set_data(home, &Value::from("")).unwrap();
        assert!(graph.is_default(home).unwrap());

        assert!(matches!(
            graph.set_data(home, &Value::from("01/09")),
            Err(Error::UnresolvedAddress(_))
        ));
        assert!(matches!(
            graph.set_data(home, &Value::from("01/03")),
            Err(Error::UnresolvedAddress(_))
        ));
    }

    #[test]
    fn test_registers_in_container() {
        let (mut graph, dock, ship, home) = setup();
        graph.set_target(home, dock).unwrap();
        let registry = graph.component::<DependencyContainer>(dock).unwrap();
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.dependency_by_name("ship").unwrap().entity, ship);

        graph.set(home, None).unwrap();
        assert!(graph.component::<DependencyContainer>(dock).unwrap().is_empty());
    }

    #[test]
    fn test_moved_referrer_keeps_its_registration() {
        let (mut graph, dock, ship, home) = setup();
        let world = graph.parent(ship).unwrap().unwrap();
        graph.set_target(home, dock).unwrap();

        let harbor = graph.create_entity(Id::from_u64(5), "harbor");
        graph.set_parent(ship, Some(harbor)).unwrap();
        let barge = graph.add_child(world, Id::from_u64(3), "barge").unwrap();
        let berth = graph.add_property::<ReferenceProperty<Dock>>(barge, "berth").unwrap();
        graph.set_target(berth, dock).unwrap();

        let registry = graph.component::<DependencyContainer>(dock).unwrap();
        assert_eq!(registry.len(), 2);
        assert_eq!(registry.dependency_of(ship).unwrap().address.to_string(), "05/03");
        assert_eq!(registry.dependency_by_address(&Address::parse("01/03").unwrap()).unwrap().entity, barge);

        graph.remove_component::<DependencyContainer>(dock).unwrap();
        assert!(!graph.has_target(home).unwrap());
        assert!(!graph.has_target(berth).unwrap());
    }

    #[test]
    fn test_resets_when_target_disconnects() {
        let (mut graph, dock, _, home) = setup();
        graph.set_target(home, dock).unwrap();
        graph.remove_component::<DependencyContainer>(dock).unwrap();
        assert!(!graph.has_target(home).unwrap());

        graph.set_target(home, dock).unwrap();
        graph.remove_component::<Dock>(dock).unwrap();
        assert!(graph.is_default(home).unwrap());
    }

    #[test]
    fn test_other_component() {
        let (mut graph, dock, _, home) = setup();
        graph.add_component(dock, Crane { lift: 40 }).unwrap();
        assert!(graph.other_component::<Dock, Crane>(home).unwrap().is_none());
        graph.set_target(home, dock).unwrap();
        assert_eq!(graph.other_component::<Dock, Crane>(home).unwrap().unwrap().lift, 40);
    }
}
