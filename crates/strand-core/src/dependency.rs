//! Inbound reference registry
//!
//! A [`DependencyContainer`] sits on an entity that other entities reference.
//! It records who points at it, one entry per referencing entity with that
//! entity's current address, and resets every registered reference when it
//! is disconnected.

use crate::address::Address;
use crate::component::{Component, ComponentContext};
use crate::error::{Error, Result};
use crate::graph::Graph;
use crate::identity::{EntityId, PropertyId};
use crate::signal::Signal;
use indexmap::IndexMap;
use log::debug;

/// One referencing entity and the properties through which it refers
#[derive(Debug, Clone, PartialEq)]
pub struct Dependency {
    pub entity: EntityId,
    pub address: Address,
    pub name: String,
    pub properties: Vec<PropertyId>,
}

/// Payload of `dependency_added` and `dependency_removed`
#[derive(Debug, Clone, PartialEq)]
pub struct DependencyEvent {
    pub container: EntityId,
    pub entity: EntityId,
    pub address: Address,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DependencyCountChanged {
    pub container: EntityId,
    pub count: usize,
}

/// Registry of the references pointing at its entity
#[derive(Debug, Default)]
pub struct DependencyContainer {
    dependencies: IndexMap<EntityId, Dependency>,
    dependency_added: Signal<DependencyEvent>,
    dependency_removed: Signal<DependencyEvent>,
    dependency_count_changed: Signal<DependencyCountChanged>,
}

impl DependencyContainer {
    pub fn contains(&self, address: &Address) -> bool {
        self.dependency_by_address(address).is_some()
    }

    pub fn dependency_by_address(&self, address: &Address) -> Option<&Dependency> {
        self.dependencies.values().find(|d| &d.address == address)
    }

    pub fn dependency_of(&self, entity: EntityId) -> Option<&Dependency> {
        self.dependencies.get(&entity)
    }

    pub fn dependency_by_name(&self, name: &str) -> Option<&Dependency> {
        self.dependencies.values().find(|d| d.name == name)
    }

    pub fn dependencies(&self) -> impl Iterator<Item = &Dependency> {
        self.dependencies.values()
    }

    pub fn len(&self) -> usize {
        self.dependencies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dependencies.is_empty()
    }

    pub fn dependency_added(&self) -> &Signal<DependencyEvent> {
        &self.dependency_added
    }

    pub fn dependency_removed(&self) -> &Signal<DependencyEvent> {
        &self.dependency_removed
    }

    pub fn dependency_count_changed(&self) -> &Signal<DependencyCountChanged> {
        &self.dependency_count_changed
    }
}

impl Component for DependencyContainer {
    fn on_disconnect(&mut self, cx: &mut ComponentContext<'_>) -> Result<()> {
        let entries: Vec<Dependency> = self.dependencies.drain(..).map(|(_, d)| d).collect();
        for dependency in entries {
            for property in dependency.properties {
                if cx.graph_ref().any_property(property).is_err() {
                    continue;
                }
                debug!("resetting {} held by '{}'", property, dependency.name);
                cx.graph().reset_of(property)?;
            }
        }
        Ok(())
    }
}

impl Graph {
    /// Register `property` of `entity` as pointing at `container`
    pub fn add_dependency(&mut self, container: EntityId, entity: EntityId, property: PropertyId) -> Result<()> {
        let address = self.address(entity)?;
        let name = self.name(entity)?.to_string();
        let registry = self.component_mut::<DependencyContainer>(container)?;
        if let Some(existing) = registry.dependencies.get_mut(&entity) {
            if !existing.properties.contains(&property) {
                existing.properties.push(property);
            }
            return Ok(());
        }
        registry.dependencies.insert(
            entity,
            Dependency {
                entity,
                address: address.clone(),
                name,
                properties: vec![property],
            },
        );
        let count = registry.dependencies.len();
        let added = registry.dependency_added.clone();
        let counted = registry.dependency_count_changed.clone();

        added.dispatch(
            self,
            &DependencyEvent {
                container,
                entity,
                address,
            },
        )?;
        counted.dispatch(self, &DependencyCountChanged { container, count })
    }

    /// Drop `property` of `entity` from `container`; the entry goes with
    /// its last property
    pub fn remove_dependency(&mut self, container: EntityId, entity: EntityId, property: PropertyId) -> Result<()> {
        let registry = self.component_mut::<DependencyContainer>(container)?;
        let Some(index) = registry.dependencies.get_index_of(&entity) else {
            return Err(Error::MissingEntry {
                property: "dependencies".into(),
                entry: entity.to_string(),
            });
        };
        if let Some((_, dependency)) = registry.dependencies.get_index_mut(index) {
            dependency.properties.retain(|p| *p != property);
            if !dependency.properties.is_empty() {
                return Ok(());
            }
        }
        let Some((_, Dependency { address, .. })) = registry.dependencies.shift_remove_index(index) else {
            return Ok(());
        };
        let count = registry.dependencies.len();
        let removed = registry.dependency_removed.clone();
        let counted = registry.dependency_count_changed.clone();

        removed.dispatch(
            self,
            &DependencyEvent {
                container,
                entity,
                address,
            },
        )?;
        counted.dispatch(self, &DependencyCountChanged { container, count })
    }

    /// Rewrite the registered addresses of `entity` and its descendants
    /// after they moved
    pub(crate) fn refresh_dependency_addresses(&mut self, entity: EntityId) -> Result<()> {
        let mut moved = Vec::new();
        let mut pending = vec![entity];
        while let Some(current) = pending.pop() {
            // only entities with properties can hold references
            if self.has_properties(current)? {
                moved.push((current, self.address(current)?));
            }
            pending.extend(self.children(current)?);
        }
        if moved.is_empty() {
            return Ok(());
        }
        let holders: Vec<EntityId> = self
            .entities()
            .filter(|holder| self.has_component::<DependencyContainer>(*holder))
            .collect();
        for holder in holders {
            // detached while disconnecting
            let Ok(registry) = self.component_mut::<DependencyContainer>(holder) else {
                continue;
            };
            for dependency in registry.dependencies.values_mut() {
                if let Some((_, address)) = moved.iter().find(|(e, _)| *e == dependency.entity) {
                    dependency.address = address.clone();
                }
            }
        }
        Ok(())
    }
}
