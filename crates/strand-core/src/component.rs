//! Components and their connect context
//!
//! A component is a behavior or data slice attached to one entity. The
//! graph owns every attached component; callers reach them through
//! [`ComponentRef`] handles or the typed accessors on [`Graph`].

use crate::error::{Error, Result};
use crate::graph::Graph;
use crate::identity::{EntityId, PropertyHandle, PropertyId};
use crate::property::PropertyKind;
use crate::signal::{Signal, Subscriber};
use crate::wiring::Wiring;
use indexmap::IndexMap;
use std::any::{type_name, Any, TypeId};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::marker::PhantomData;

/// Downcasting support for trait objects
pub trait AsAny: Any {
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
    fn into_any(self: Box<Self>) -> Box<dyn Any>;
}

impl<T: Any + Send + Sync> AsAny for T {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn into_any(self: Box<Self>) -> Box<dyn Any> {
        self
    }
}

/// A unit of behavior attached to an entity
///
/// [`Component::wiring`] declares what the component needs; the graph
/// resolves it before [`Component::on_connect`] runs. A component that
/// failed to connect, or was removed, is handed back detached and can be
/// added again.
pub trait Component: AsAny + Send + Sync {
    /// Required components and properties
    fn wiring(&self) -> Wiring {
        Wiring::new()
    }

    /// Setup, run after every declared dependency is bound
    fn on_connect(&mut self, _cx: &mut ComponentContext<'_>) -> Result<()> {
        Ok(())
    }

    /// Teardown; failing keeps the component attached
    fn on_disconnect(&mut self, _cx: &mut ComponentContext<'_>) -> Result<()> {
        Ok(())
    }

    fn type_name(&self) -> &'static str {
        type_name::<Self>()
    }
}

/// Runtime identity of a component type or role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ComponentKind {
    pub id: TypeId,
    pub name: &'static str,
}

impl ComponentKind {
    pub fn of<C: ?Sized + 'static>() -> Self {
        Self {
            id: TypeId::of::<C>(),
            name: type_name::<C>(),
        }
    }
}

impl fmt::Display for ComponentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let short = self.name.rsplit("::").next().unwrap_or(self.name);
        write!(f, "{}", short)
    }
}

pub(crate) fn kind_of(component: &dyn Component) -> ComponentKind {
    ComponentKind {
        id: component.as_any().type_id(),
        name: component.type_name(),
    }
}

/// Handle to the component of type `C` on an entity
pub struct ComponentRef<C> {
    entity: EntityId,
    _kind: PhantomData<fn() -> C>,
}

impl<C> ComponentRef<C> {
    pub(crate) fn new(entity: EntityId) -> Self {
        Self {
            entity,
            _kind: PhantomData,
        }
    }

    pub fn entity(&self) -> EntityId {
        self.entity
    }
}

impl<C: Component> ComponentRef<C> {
    pub fn get<'g>(&self, graph: &'g Graph) -> Result<&'g C> {
        graph.component::<C>(self.entity)
    }

    pub fn get_mut<'g>(&self, graph: &'g mut Graph) -> Result<&'g mut C> {
        graph.component_mut::<C>(self.entity)
    }
}

impl<C> Clone for ComponentRef<C> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<C> Copy for ComponentRef<C> {}

impl<C> PartialEq for ComponentRef<C> {
    fn eq(&self, other: &Self) -> bool {
        self.entity == other.entity
    }
}

impl<C> Eq for ComponentRef<C> {}

impl<C> Hash for ComponentRef<C> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.entity.hash(state);
    }
}

impl<C> fmt::Debug for ComponentRef<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ComponentRef<{}>({})", type_name::<C>(), self.entity)
    }
}

/// Payload of the component lifecycle signals
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ComponentEvent {
    pub entity: EntityId,
    pub kind: ComponentKind,
}

/// Lifecycle signals of one attached component
#[derive(Debug, Clone, Default)]
pub struct ComponentSignals {
    pub connected: Signal<ComponentEvent>,
    /// Fires before teardown; a failing handler vetoes the disconnect
    pub begin_disconnect: Signal<ComponentEvent>,
    pub disconnected: Signal<ComponentEvent>,
}

/// A component dependency bound during connect
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Requirement {
    /// Kind or role named in the wiring
    pub(crate) requested: TypeId,
    pub(crate) entity: EntityId,
    /// Concrete kind that satisfied it
    pub(crate) kind: TypeId,
}

/// What a component sees while it connects or disconnects
pub struct ComponentContext<'g> {
    graph: &'g mut Graph,
    entity: EntityId,
    kind: ComponentKind,
    properties: IndexMap<String, PropertyId>,
    requires: Vec<Requirement>,
}

impl<'g> ComponentContext<'g> {
    pub(crate) fn new(
        graph: &'g mut Graph,
        entity: EntityId,
        kind: ComponentKind,
        properties: IndexMap<String, PropertyId>,
        requires: Vec<Requirement>,
    ) -> Self {
        Self {
            graph,
            entity,
            kind,
            properties,
            requires,
        }
    }

    pub fn graph(&mut self) -> &mut Graph {
        self.graph
    }

    pub fn graph_ref(&self) -> &Graph {
        self.graph
    }

    pub fn entity(&self) -> EntityId {
        self.entity
    }

    pub fn kind(&self) -> ComponentKind {
        self.kind
    }

    /// Identity for subscriptions the component makes
    pub fn subscriber(&self) -> Subscriber {
        Subscriber::Component(self.entity, self.kind.id)
    }

    /// A property bound from the wiring
    pub fn property<P: PropertyKind>(&self, name: &str) -> Result<PropertyHandle<P>> {
        let id = self
            .properties
            .get(name)
            .copied()
            .ok_or_else(|| Error::MissingProperty {
                property: name.to_string(),
                entity: self.entity_name(),
            })?;
        self.graph.typed::<P>(id)
    }

    /// A component bound from the wiring, by kind or role
    pub fn component<C: Component>(&self) -> Result<ComponentRef<C>> {
        let wanted = TypeId::of::<C>();
        self.requires
            .iter()
            .find(|r| r.kind == wanted || r.requested == wanted)
            .map(|r| ComponentRef::new(r.entity))
            .ok_or_else(|| Error::MissingComponent {
                component: self.kind.name,
                required: type_name::<C>(),
                entity: self.entity_name(),
            })
    }

    /// Entity that satisfied the dependency on `R`
    pub fn required_entity<R: ?Sized + 'static>(&self) -> Option<EntityId> {
        let wanted = TypeId::of::<R>();
        self.requires
            .iter()
            .find(|r| r.kind == wanted || r.requested == wanted)
            .map(|r| r.entity)
    }

    fn entity_name(&self) -> String {
        self.graph
            .name(self.entity)
            .map(str::to_string)
            .unwrap_or_else(|_| self.entity.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Hull;

    impl Component for Hull {}

    #[test]
    fn test_kind_of_boxed_component() {
        let boxed: Box<dyn Component> = Box::new(Hull);
        let kind = kind_of(&*boxed);
        assert_eq!(kind, ComponentKind::of::<Hull>());
        assert_eq!(kind.to_string(), "Hull");
        assert!(boxed.into_any().downcast::<Hull>().is_ok());
    }

    #[test]
    fn test_component_ref_is_copy_and_compares_entities() {
        let a = ComponentRef::<Hull>::new(EntityId::new(1));
        let b = a;
        assert_eq!(a, b);
        assert_ne!(a, ComponentRef::<Hull>::new(EntityId::new(2)));
        assert_eq!(a.entity(), EntityId::new(1));
    }
}
