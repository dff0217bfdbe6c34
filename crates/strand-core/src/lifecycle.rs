//! Component connect and disconnect
//!
//! Connecting binds declared dependencies in a fixed order: required
//! components, then properties (by slot order), then the component's own
//! setup, then the `connected` signal. Every component auto-added and every
//! property created along the way is recorded so a failed connect can be
//! undone.

use crate::component::{
    kind_of, Component, ComponentContext, ComponentEvent, ComponentKind, ComponentRef, ComponentSignals, Requirement,
};
use crate::error::{Error, Result};
use crate::graph::Graph;
use crate::identity::{EntityId, PropertyId};
use crate::wiring::{ComponentDep, PropertySlot};
use indexmap::IndexMap;
use log::{debug, warn};
use std::any::TypeId;

/// A component attached to an entity
pub(crate) struct ComponentSlot {
    pub(crate) kind: ComponentKind,
    pub(crate) provides: Vec<TypeId>,
    /// `None` while a hook of the component is running
    pub(crate) instance: Option<Box<dyn Component>>,
    pub(crate) connected: bool,
    /// Attachment order, assigned once connected
    pub(crate) seq: u64,
    pub(crate) requires: Vec<Requirement>,
    pub(crate) required_by: Vec<(EntityId, TypeId)>,
    pub(crate) properties: IndexMap<String, PropertyId>,
    pub(crate) signals: ComponentSignals,
}

impl ComponentSlot {
    fn satisfies(&self, requested: TypeId) -> bool {
        self.connected && (self.kind.id == requested || self.provides.contains(&requested))
    }
}

/// Everything one top-level connect has attached or created so far
#[derive(Debug, Default)]
struct ConnectTx {
    attached: Vec<(EntityId, TypeId)>,
    created: Vec<PropertyId>,
}

impl Graph {
    /// Attach `component` to `entity` and connect it
    pub fn add_component<C: Component>(&mut self, entity: EntityId, component: C) -> Result<ComponentRef<C>> {
        self.add_boxed_component(entity, Box::new(component))?;
        Ok(ComponentRef::new(entity))
    }

    pub fn add_boxed_component(&mut self, entity: EntityId, component: Box<dyn Component>) -> Result<ComponentKind> {
        let mut tx = ConnectTx::default();
        match self.connect(entity, component, &mut tx) {
            Ok(kind) => Ok(kind),
            Err(e) => {
                let full = self.config().rollback_on_connect_failure;
                warn!(
                    "connect on {} failed ({}), {} {} component(s)",
                    entity,
                    e,
                    if full { "rolling back" } else { "discarding pending" },
                    tx.attached.len()
                );
                self.rollback(tx, full);
                Err(e)
            }
        }
    }

    /// Disconnect the `C` of `entity` and hand it back detached
    pub fn remove_component<C: Component>(&mut self, entity: EntityId) -> Result<C> {
        let kind = ComponentKind::of::<C>();
        let boxed = self.remove_component_kind(entity, kind)?;
        boxed
            .into_any()
            .downcast::<C>()
            .map(|c| *c)
            .map_err(|_| Error::NotConnected {
                component: kind.name.to_string(),
                entity: entity.to_string(),
            })
    }

    /// Disconnect the component of `kind` on `entity`
    pub fn remove_component_kind(&mut self, entity: EntityId, kind: ComponentKind) -> Result<Box<dyn Component>> {
        let node = self.node(entity)?;
        let not_connected = || Error::NotConnected {
            component: kind.name.to_string(),
            entity: node.name.clone(),
        };
        let slot = node
            .components
            .iter()
            .find(|slot| slot.kind.id == kind.id)
            .ok_or_else(not_connected)?;
        if !slot.connected || slot.instance.is_none() {
            return Err(Error::Busy {
                component: slot.kind.name,
                entity: node.name.clone(),
            });
        }
        if let Some(&(by_entity, by_kind)) = slot.required_by.first() {
            return Err(Error::StillRequired {
                component: slot.kind.name,
                entity: node.name.clone(),
                required_by: self.describe_component(by_entity, by_kind),
            });
        }
        let kind = slot.kind;
        let signals = slot.signals.clone();
        let event = ComponentEvent { entity, kind };

        if let Err(e) = signals.begin_disconnect.dispatch(self, &event) {
            warn!("disconnect of {} from {} vetoed: {}", kind, entity, e);
            return Err(e);
        }

        let slot = self.slot_mut(entity, kind.id)?;
        let mut instance = slot.instance.take().ok_or(Error::Busy {
            component: kind.name,
            entity: entity.to_string(),
        })?;
        let properties = slot.properties.clone();
        let requires = slot.requires.clone();

        let mut cx = ComponentContext::new(self, entity, kind, properties, requires.clone());
        if let Err(e) = instance.on_disconnect(&mut cx) {
            if let Ok(slot) = self.slot_mut(entity, kind.id) {
                slot.instance = Some(instance);
            }
            return Err(e);
        }

        self.release_requirements(entity, kind.id, &requires);
        self.node_mut(entity)?.components.retain(|slot| slot.kind.id != kind.id);
        debug!("disconnected {} from {}", kind, entity);
        signals.disconnected.dispatch(self, &event)?;
        Ok(instance)
    }

    pub fn component<C: Component>(&self, entity: EntityId) -> Result<&C> {
        let kind = ComponentKind::of::<C>();
        let instance = self.instance(entity, kind)?;
        instance.as_any().downcast_ref::<C>().ok_or_else(|| Error::NotConnected {
            component: kind.name.to_string(),
            entity: entity.to_string(),
        })
    }

    pub fn component_mut<C: Component>(&mut self, entity: EntityId) -> Result<&mut C> {
        let kind = ComponentKind::of::<C>();
        let name = self.node(entity)?.name.clone();
        let slot = self.slot_mut(entity, kind.id)?;
        if !slot.connected {
            return Err(Error::Busy {
                component: kind.name,
                entity: name,
            });
        }
        slot.instance
            .as_deref_mut()
            .ok_or(Error::Busy {
                component: kind.name,
                entity: name,
            })?
            .as_any_mut()
            .downcast_mut::<C>()
            .ok_or_else(|| Error::NotConnected {
                component: kind.name.to_string(),
                entity: entity.to_string(),
            })
    }

    /// The connected component of `kind`, by trait object
    pub fn component_dyn(&self, entity: EntityId, kind: TypeId) -> Result<&dyn Component> {
        let slot = self.slot(entity, kind)?;
        self.instance(entity, slot.kind)
    }

    pub fn has_component<C: Component>(&self, entity: EntityId) -> bool {
        self.has_component_kind(entity, TypeId::of::<C>())
    }

    /// True if a connected component is of `kind` or provides it as a role
    pub fn has_component_kind(&self, entity: EntityId, kind: TypeId) -> bool {
        self.node(entity)
            .map(|node| node.components.iter().any(|slot| slot.satisfies(kind)))
            .unwrap_or(false)
    }

    /// Connected components of `entity` in attachment order
    pub fn components(&self, entity: EntityId) -> Result<Vec<ComponentKind>> {
        let mut slots: Vec<_> = self
            .node(entity)?
            .components
            .iter()
            .filter(|slot| slot.connected)
            .collect();
        slots.sort_by_key(|slot| slot.seq);
        Ok(slots.into_iter().map(|slot| slot.kind).collect())
    }

    pub fn component_signals(&self, entity: EntityId, kind: TypeId) -> Result<ComponentSignals> {
        Ok(self.slot(entity, kind)?.signals.clone())
    }

    /// Properties bound to the component of `kind` by its wiring
    pub fn component_properties(&self, entity: EntityId, kind: TypeId) -> Result<IndexMap<String, PropertyId>> {
        Ok(self.slot(entity, kind)?.properties.clone())
    }

    /// Components that bound the component of `kind` as a requirement
    pub fn required_by(&self, entity: EntityId, kind: TypeId) -> Result<Vec<(EntityId, ComponentKind)>> {
        let slot = self.slot(entity, kind)?;
        Ok(slot
            .required_by
            .iter()
            .filter_map(|&(e, k)| self.slot(e, k).ok().map(|s| (e, s.kind)))
            .collect())
    }

    // Internals

    pub(crate) fn slot(&self, entity: EntityId, kind: TypeId) -> Result<&ComponentSlot> {
        let node = self.node(entity)?;
        node.components
            .iter()
            .find(|slot| slot.kind.id == kind)
            .ok_or_else(|| Error::NotConnected {
                component: format!("{:?}", kind),
                entity: node.name.clone(),
            })
    }

    pub(crate) fn slot_mut(&mut self, entity: EntityId, kind: TypeId) -> Result<&mut ComponentSlot> {
        let node = self.node_mut(entity)?;
        let name = node.name.clone();
        node.components
            .iter_mut()
            .find(|slot| slot.kind.id == kind)
            .ok_or(Error::NotConnected {
                component: format!("{:?}", kind),
                entity: name,
            })
    }

    fn instance(&self, entity: EntityId, kind: ComponentKind) -> Result<&dyn Component> {
        let node = self.node(entity)?;
        let slot = node
            .components
            .iter()
            .find(|slot| slot.kind.id == kind.id)
            .ok_or_else(|| Error::NotConnected {
                component: kind.name.to_string(),
                entity: node.name.clone(),
            })?;
        match (&slot.instance, slot.connected) {
            (Some(instance), true) => Ok(&**instance),
            _ => Err(Error::Busy {
                component: kind.name,
                entity: node.name.clone(),
            }),
        }
    }

    fn describe_component(&self, entity: EntityId, kind: TypeId) -> String {
        let component = self
            .slot(entity, kind)
            .map(|slot| slot.kind.to_string())
            .unwrap_or_else(|_| format!("{:?}", kind));
        match self.name(entity) {
            Ok(name) => format!("{} on '{}'", component, name),
            Err(_) => component,
        }
    }

    fn connect(&mut self, entity: EntityId, mut component: Box<dyn Component>, tx: &mut ConnectTx) -> Result<ComponentKind> {
        let kind = kind_of(&*component);
        let node = self.node(entity)?;
        if let Some(slot) = node.components.iter().find(|slot| slot.kind.id == kind.id) {
            return Err(if slot.connected {
                Error::ComponentExists {
                    component: kind.name,
                    entity: node.name.clone(),
                }
            } else {
                Error::AlreadyConnected {
                    component: kind.name,
                    entity: node.name.clone(),
                }
            });
        }

        let wiring = component.wiring();
        let provides: Vec<TypeId> = wiring.provides.iter().map(|role| role.id).collect();
        if wiring
            .components
            .iter()
            .any(|dep| dep.kind.id == kind.id || provides.contains(&dep.kind.id))
        {
            return Err(Error::SelfReference { component: kind.name });
        }

        let signals = ComponentSignals::default();
        self.node_mut(entity)?.components.push(ComponentSlot {
            kind,
            provides,
            instance: None,
            connected: false,
            seq: 0,
            requires: Vec::new(),
            required_by: Vec::new(),
            properties: IndexMap::new(),
            signals: signals.clone(),
        });
        tx.attached.push((entity, kind.id));

        for dep in &wiring.components {
            let (target, concrete) = self.resolve_dependency(entity, kind, dep, tx)?;
            self.slot_mut(target, concrete)?.required_by.push((entity, kind.id));
            self.slot_mut(entity, kind.id)?.requires.push(Requirement {
                requested: dep.kind.id,
                entity: target,
                kind: concrete,
            });
        }

        let mut slots: Vec<&PropertySlot> = wiring.properties.iter().collect();
        slots.sort_by_key(|slot| slot.order);
        let mut properties = IndexMap::new();
        for slot in slots {
            let id = self.resolve_property(entity, slot, tx)?;
            properties.insert(slot.name.clone(), id);
        }
        let slot = self.slot_mut(entity, kind.id)?;
        slot.properties = properties.clone();
        let requires = slot.requires.clone();

        let mut cx = ComponentContext::new(self, entity, kind, properties, requires);
        component.on_connect(&mut cx)?;

        let seq = self.next_seq;
        self.next_seq += 1;
        let slot = self.slot_mut(entity, kind.id)?;
        slot.instance = Some(component);
        slot.connected = true;
        slot.seq = seq;
        debug!("connected {} to {}", kind, entity);

        signals.connected.dispatch(self, &ComponentEvent { entity, kind })?;
        Ok(kind)
    }

    fn resolve_dependency(
        &mut self,
        entity: EntityId,
        declaring: ComponentKind,
        dep: &ComponentDep,
        tx: &mut ConnectTx,
    ) -> Result<(EntityId, TypeId)> {
        let requested = dep.kind.id;
        if let Some(found) = self.provider(entity, requested)? {
            return Ok((entity, found));
        }
        if let Some(factory) = dep.factory {
            let added = self.connect(entity, factory(), tx)?;
            return Ok((entity, added.id));
        }
        if dep.search_parent {
            let mut current = self.node(entity)?.parent;
            while let Some(parent) = current {
                if let Some(found) = self.provider(parent, requested)? {
                    return Ok((parent, found));
                }
                current = self.node(parent)?.parent;
            }
        }
        Err(Error::MissingComponent {
            component: declaring.name,
            required: dep.kind.name,
            entity: self.node(entity)?.name.clone(),
        })
    }

    fn provider(&self, entity: EntityId, requested: TypeId) -> Result<Option<TypeId>> {
        Ok(self
            .node(entity)?
            .components
            .iter()
            .find(|slot| slot.satisfies(requested))
            .map(|slot| slot.kind.id))
    }

    fn resolve_property(&mut self, entity: EntityId, slot: &PropertySlot, tx: &mut ConnectTx) -> Result<PropertyId> {
        let node = self.node(entity)?;
        if let Some(&id) = node.properties.get(&slot.name) {
            let property = self.any_property(id)?;
            if property.as_any().type_id() != slot.kind {
                return Err(Error::PropertyTypeMismatch {
                    property: slot.name.clone(),
                    expected: slot.kind_name,
                    found: property.kind_name(),
                });
            }
            return Ok(id);
        }
        if !slot.create {
            return Err(Error::MissingProperty {
                property: slot.name.clone(),
                entity: node.name.clone(),
            });
        }
        let id = self.insert_property(entity, &slot.name, slot.factory)?;
        tx.created.push(id);
        if let Some(default) = &slot.default {
            let init = self.any_property(id)?.ops().init_default;
            init(self, id, default)?;
        }
        Ok(id)
    }

    fn release_requirements(&mut self, entity: EntityId, kind: TypeId, requires: &[Requirement]) {
        for requirement in requires {
            if let Ok(target) = self.slot_mut(requirement.entity, requirement.kind) {
                target.required_by.retain(|&(e, k)| !(e == entity && k == kind));
            }
        }
    }

    /// Undo a failed connect; with `full` unset only unfinished slots go
    fn rollback(&mut self, tx: ConnectTx, full: bool) {
        for (entity, kind) in tx.attached.into_iter().rev() {
            let Ok(slot) = self.slot(entity, kind) else {
                continue;
            };
            if slot.connected && !full {
                continue;
            }
            self.drop_slot(entity, kind);
        }
        if !full {
            return;
        }
        for id in tx.created.into_iter().rev() {
            if !self.properties.contains_key(&id) {
                continue;
            }
            if let Err(e) = self.dispose_property(id) {
                warn!("rollback could not dispose {}: {}", id, e);
            }
        }
    }

    /// Remove a slot without the still-required check or a veto
    fn drop_slot(&mut self, entity: EntityId, kind: TypeId) {
        let Ok(slot) = self.slot_mut(entity, kind) else {
            return;
        };
        let component = slot.kind;
        let instance = slot.instance.take();
        let connected = slot.connected;
        let requires = std::mem::take(&mut slot.requires);
        let properties = slot.properties.clone();
        let signals = slot.signals.clone();

        self.release_requirements(entity, kind, &requires);
        if let (true, Some(mut instance)) = (connected, instance) {
            let mut cx = ComponentContext::new(self, entity, component, properties, requires);
            if let Err(e) = instance.on_disconnect(&mut cx) {
                warn!("rollback of {} on {}: {}", component, entity, e);
            }
        }
        if let Ok(node) = self.node_mut(entity) {
            node.components.retain(|slot| slot.kind.id != kind);
        }
        debug!("rolled back {} on {}", component, entity);
        if connected {
            let event = ComponentEvent { entity, kind: component };
            if let Err(e) = signals.disconnected.dispatch(self, &event) {
                warn!("rollback of {} on {}: {}", component, entity, e);
            }
        }
    }
}
