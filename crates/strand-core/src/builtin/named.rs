//! Entity naming through a property

use crate::component::{Component, ComponentContext};
use crate::error::Result;
use crate::identity::PropertyHandle;
use crate::property::{AnyProperty, StringProperty};
use crate::wiring::{PropertySlot, Wiring};
use log::debug;

/// Exposes the entity name as a `name` property
///
/// On connect an unset property takes the entity's current name, while a
/// property that already holds a value renames the entity. Afterwards every
/// change of the property renames the entity.
#[derive(Debug, Default)]
pub struct Named {
    name: Option<PropertyHandle<StringProperty>>,
}

impl Named {
    pub const PROPERTY: &'static str = "name";

    /// Handle of the bound property, once connected
    pub fn property(&self) -> Option<PropertyHandle<StringProperty>> {
        self.name
    }
}

impl Component for Named {
    fn wiring(&self) -> Wiring {
        Wiring::new().property(PropertySlot::create::<StringProperty>(Self::PROPERTY))
    }

    fn on_connect(&mut self, cx: &mut ComponentContext<'_>) -> Result<()> {
        let handle = cx.property::<StringProperty>(Self::PROPERTY)?;
        let entity = cx.entity();
        let subscriber = cx.subscriber();
        let graph = cx.graph();

        if graph.is_default(handle)? {
            let current = graph.name(entity)?.to_string();
            graph.set(handle, current)?;
        } else {
            let wanted = graph.value(handle)?;
            graph.set_name(entity, &wanted)?;
        }

        graph
            .any_property(handle.id())?
            .end_value_set_signal()
            .subscribe(subscriber, move |g, _| {
                let name = g.value(handle)?;
                g.set_name(entity, &name)
            });
        self.name = Some(handle);
        debug!("{} named '{}'", entity, graph.name(entity)?);
        Ok(())
    }

    fn on_disconnect(&mut self, cx: &mut ComponentContext<'_>) -> Result<()> {
        let subscriber = cx.subscriber();
        if let Some(handle) = self.name.take() {
            if let Ok(property) = cx.graph_ref().any_property(handle.id()) {
                property.end_value_set_signal().unsubscribe(&subscriber);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::address::Id;
    use crate::graph::Graph;

    #[test]
    fn test_seeds_property_from_entity() {
        let mut graph = Graph::new();
        let e = graph.create_entity(Id::from_u64(1), "harbor");
        graph.add_component(e, Named::default()).unwrap();

        let handle = graph.property::<StringProperty>(e, Named::PROPERTY).unwrap();
        assert_eq!(graph.value(handle).unwrap(), "harbor");

        graph.set(handle, "port".to_string()).unwrap();
        assert_eq!(graph.name(e).unwrap(), "port");
    }

    #[test]
    fn test_existing_value_renames_entity() {
        let mut graph = Graph::new();
        let e = graph.create_entity(Id::from_u64(1), "unnamed");
        let handle = graph.add_property::<StringProperty>(e, Named::PROPERTY).unwrap();
        graph.set(handle, "lighthouse".to_string()).unwrap();

        graph.add_component(e, Named::default()).unwrap();
        assert_eq!(graph.name(e).unwrap(), "lighthouse");
    }

    #[test]
    fn test_stops_following_after_disconnect() {
        let mut graph = Graph::new();
        let e = graph.create_entity(Id::from_u64(1), "a");
        graph.add_component(e, Named::default()).unwrap();
        let handle = graph.property::<StringProperty>(e, Named::PROPERTY).unwrap();

        graph.remove_component::<Named>(e).unwrap();
        graph.set(handle, "b".to_string()).unwrap();
        assert_eq!(graph.name(e).unwrap(), "a");
    }
}
