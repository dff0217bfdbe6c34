//! Components that populate their entity's children

use crate::address::{Address, Id};
use crate::component::{kind_of, Component, ComponentContext};
use crate::entity::ChildEvent;
use crate::error::{Error, Result};
use crate::graph::Graph;
use crate::identity::EntityId;
use log::debug;
use std::fmt;
use std::sync::Arc;

/// Factory producing a fresh component for each new child
pub type ComponentTemplate = Arc<dyn Fn() -> Box<dyn Component> + Send + Sync>;

/// Attaches a component from every template to each child added to its
/// entity
///
/// Children that already carry a component of the produced kind keep
/// their own.
#[derive(Default)]
pub struct EntityManager {
    templates: Vec<ComponentTemplate>,
    entity: Option<EntityId>,
}

impl EntityManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_template<C: Component + Default>(self) -> Self {
        self.with_factory(Arc::new(|| Box::new(C::default()) as Box<dyn Component>))
    }

    pub fn with_factory(mut self, template: ComponentTemplate) -> Self {
        self.templates.push(template);
        self
    }

    pub fn template_count(&self) -> usize {
        self.templates.len()
    }

    /// Entity the manager is connected to
    pub fn entity(&self) -> Option<EntityId> {
        self.entity
    }

    /// Address a child with `id` would get under the managed entity
    pub fn create_address(&self, graph: &Graph, id: Id) -> Result<Address> {
        let entity = self.entity.ok_or_else(|| Error::NotConnected {
            component: "EntityManager".into(),
            entity: "<none>".into(),
        })?;
        graph.child_address(entity, id)
    }

    /// Create a child under the managed entity with a generated id
    pub fn create_child(&self, graph: &mut Graph, name: &str) -> Result<EntityId> {
        let entity = self.entity.ok_or_else(|| Error::NotConnected {
            component: "EntityManager".into(),
            entity: "<none>".into(),
        })?;
        graph.add_generated_child(entity, name)
    }
}

fn populate(graph: &mut Graph, templates: &[ComponentTemplate], child: EntityId) -> Result<()> {
    for template in templates {
        let component = template();
        let kind = kind_of(component.as_ref());
        if graph.has_component_kind(child, kind.id) {
            debug!("{} already has {}", child, kind);
            continue;
        }
        graph.add_boxed_component(child, component)?;
    }
    Ok(())
}

impl Component for EntityManager {
    fn on_connect(&mut self, cx: &mut ComponentContext<'_>) -> Result<()> {
        let entity = cx.entity();
        let subscriber = cx.subscriber();
        let templates = self.templates.clone();
        cx.graph_ref()
            .entity_signals(entity)?
            .child_added
            .subscribe(subscriber, move |g, ev: &ChildEvent| populate(g, &templates, ev.child));
        self.entity = Some(entity);
        Ok(())
    }

    fn on_disconnect(&mut self, cx: &mut ComponentContext<'_>) -> Result<()> {
        let subscriber = cx.subscriber();
        if let Ok(signals) = cx.graph_ref().entity_signals(cx.entity()) {
            signals.child_added.unsubscribe(&subscriber);
        }
        self.entity = None;
        Ok(())
    }
}

impl fmt::Debug for EntityManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EntityManager")
            .field("templates", &self.templates.len())
            .field("entity", &self.entity)
            .finish()
    }
}
