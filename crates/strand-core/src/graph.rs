//! The entity graph
//!
//! The [`Graph`] owns every entity, component and property. Everything else
//! holds copyable handles into it, and every mutation goes through `&mut
//! Graph`, so one exclusive borrow orders all changes to a graph.

use crate::address::{Address, Id};
use crate::config::GraphConfig;
use crate::entity::{ChildCountChanged, ChildEvent, EntityNode, EntitySignals, ParentChanged};
use crate::error::{Error, Result};
use crate::id_gen::IdGenerator;
use crate::identity::{EntityId, PropertyId};
use crate::property::AnyProperty;
use crate::resolver::{ReferenceResolver, TreeResolver};
use indexmap::IndexMap;
use log::{debug, warn};
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};

/// Arena of entities, components and properties
pub struct Graph {
    pub(crate) entities: IndexMap<EntityId, EntityNode>,
    pub(crate) properties: IndexMap<PropertyId, Box<dyn AnyProperty>>,
    pub(crate) next_entity: u64,
    pub(crate) next_property: u64,
    pub(crate) next_seq: u64,
    config: GraphConfig,
    resolver: Arc<dyn ReferenceResolver>,
    ids: IdGenerator,
}

impl Graph {
    /// Create an empty graph with the default configuration
    pub fn new() -> Self {
        Self::with_config(GraphConfig::default())
    }

    pub fn with_config(config: GraphConfig) -> Self {
        Self {
            entities: IndexMap::new(),
            properties: IndexMap::new(),
            next_entity: 1,
            next_property: 1,
            next_seq: 1,
            ids: IdGenerator::from_config(&config),
            resolver: Arc::new(TreeResolver),
            config,
        }
    }

    pub fn config(&self) -> &GraphConfig {
        &self.config
    }

    /// Replace the resolver used by reference properties
    pub fn set_resolver(&mut self, resolver: impl ReferenceResolver + 'static) {
        self.resolver = Arc::new(resolver);
    }

    pub fn resolver(&self) -> Arc<dyn ReferenceResolver> {
        Arc::clone(&self.resolver)
    }

    /// Entity at `address`, as seen by the resolver
    pub fn resolve(&self, address: &Address) -> Result<EntityId> {
        self.resolver.resolve(self, address)
    }

    /// Canonical address of `entity`, as seen by the resolver
    pub fn address_of(&self, entity: EntityId) -> Result<Address> {
        self.resolver.address_of(self, entity)
    }

    // Nodes

    pub(crate) fn node(&self, entity: EntityId) -> Result<&EntityNode> {
        self.entities
            .get(&entity)
            .ok_or_else(|| Error::EntityNotFound(entity.to_string()))
    }

    pub(crate) fn node_mut(&mut self, entity: EntityId) -> Result<&mut EntityNode> {
        self.entities
            .get_mut(&entity)
            .ok_or_else(|| Error::EntityNotFound(entity.to_string()))
    }

    pub fn entity(&self, entity: EntityId) -> Result<&EntityNode> {
        self.node(entity)
    }

    pub fn contains(&self, entity: EntityId) -> bool {
        self.entities.contains_key(&entity)
    }

    pub fn entity_count(&self) -> usize {
        self.entities.len()
    }

    pub fn property_count(&self) -> usize {
        self.properties.len()
    }

    // Tree

    /// Create a detached root entity
    pub fn create_entity(&mut self, id: Id, name: &str) -> EntityId {
        let handle = EntityId::new(self.next_entity);
        self.next_entity += 1;
        self.entities.insert(handle, EntityNode::new(handle, id, name));
        debug!("created entity '{}' ({}) at {}", name, handle, id);
        handle
    }

    /// Create an entity under `parent`
    pub fn add_child(&mut self, parent: EntityId, id: Id, name: &str) -> Result<EntityId> {
        let node = self.node(parent)?;
        if node.children.contains_key(&id) {
            return Err(Error::DuplicateChild {
                parent: node.name.clone(),
                id: id.to_string(),
            });
        }
        let child = self.create_entity(id, name);
        if let Err(e) = self.set_parent(child, Some(parent)) {
            // a refused attach leaves no entity behind
            if let Err(cleanup) = self.dispose(child) {
                warn!("could not dispose rejected child '{}' ({}): {}", name, child, cleanup);
            }
            return Err(e);
        }
        Ok(child)
    }

    /// Create an entity under `parent` with a generated id
    pub fn add_generated_child(&mut self, parent: EntityId, name: &str) -> Result<EntityId> {
        let id = self.generate_id(Some(parent))?;
        self.add_child(parent, id, name)
    }

    /// An id unused among the children of `parent`, or among roots
    pub fn generate_id(&mut self, parent: Option<EntityId>) -> Result<Id> {
        let used: Vec<Id> = match parent {
            Some(parent) => self.node(parent)?.children.keys().copied().collect(),
            None => self
                .entities
                .values()
                .filter(|node| node.parent.is_none())
                .map(|node| node.id)
                .collect(),
        };
        self.ids.next_unused(|id| used.contains(id))
    }

    /// Address a child of `entity` with `id` would have
    pub fn child_address(&self, entity: EntityId, id: Id) -> Result<Address> {
        Ok(self.node(entity)?.address.append(id))
    }

    /// Move `entity` under `parent`, or make it a root with `None`
    pub fn set_parent(&mut self, entity: EntityId, parent: Option<EntityId>) -> Result<()> {
        let node = self.node(entity)?;
        let previous = node.parent;
        let id = node.id;
        if previous == parent {
            return Ok(());
        }
        if let Some(target) = parent {
            if target == entity {
                return Err(Error::InvalidParent {
                    entity: node.name.clone(),
                    reason: "an entity cannot be its own parent".into(),
                });
            }
            if self.is_ancestor(entity, target)? {
                return Err(Error::InvalidParent {
                    entity: node.name.clone(),
                    reason: format!("'{}' is one of its descendants", self.node(target)?.name),
                });
            }
            let target_node = self.node(target)?;
            if target_node.children.contains_key(&id) {
                return Err(Error::DuplicateChild {
                    parent: target_node.name.clone(),
                    id: id.to_string(),
                });
            }
        }

        let old_signals = match previous {
            Some(old) => {
                let old_node = self.node_mut(old)?;
                old_node.children.shift_remove(&id);
                Some((old, old_node.children.len(), old_node.signals.clone()))
            }
            None => None,
        };
        let new_signals = match parent {
            Some(target) => {
                let target_node = self.node_mut(target)?;
                target_node.children.insert(id, entity);
                Some((target, target_node.children.len(), target_node.signals.clone()))
            }
            None => None,
        };
        self.node_mut(entity)?.parent = parent;
        self.rehome(entity)?;
        self.refresh_dependency_addresses(entity)?;
        debug!("reparented {} from {:?} to {:?}", entity, previous, parent);

        if let Some((old, count, signals)) = old_signals {
            signals.child_removed.dispatch(self, &ChildEvent { parent: old, child: entity })?;
            signals
                .child_count_changed
                .dispatch(self, &ChildCountChanged { entity: old, count })?;
        }
        if let Some((target, count, signals)) = new_signals {
            signals.child_added.dispatch(self, &ChildEvent { parent: target, child: entity })?;
            signals
                .child_count_changed
                .dispatch(self, &ChildCountChanged { entity: target, count })?;
        }
        let signals = self.node(entity)?.signals.clone();
        signals.parent_changed.dispatch(
            self,
            &ParentChanged {
                entity,
                previous,
                parent,
            },
        )
    }

    /// Detach the child `id` of `parent`; it becomes a root
    pub fn remove_child(&mut self, parent: EntityId, id: Id) -> Result<EntityId> {
        let node = self.node(parent)?;
        let child = node
            .children
            .get(&id)
            .copied()
            .ok_or_else(|| Error::EntityNotFound(node.address.append(id).to_string()))?;
        self.set_parent(child, None)?;
        Ok(child)
    }

    fn is_ancestor(&self, ancestor: EntityId, entity: EntityId) -> Result<bool> {
        let mut current = self.node(entity)?.parent;
        while let Some(parent) = current {
            if parent == ancestor {
                return Ok(true);
            }
            current = self.node(parent)?.parent;
        }
        Ok(false)
    }

    /// Recompute address and root for `entity` and its subtree
    fn rehome(&mut self, entity: EntityId) -> Result<()> {
        let mut pending = vec![entity];
        while let Some(current) = pending.pop() {
            let node = self.node(current)?;
            let (address, root) = match node.parent {
                Some(parent) => {
                    let parent_node = self.node(parent)?;
                    (parent_node.address.append(node.id), parent_node.root)
                }
                None => (Address::from(node.id), current),
            };
            let node = self.node_mut(current)?;
            node.address = address;
            node.root = root;
            pending.extend(node.children.values().copied());
        }
        Ok(())
    }

    /// Walk down from `entity` to the descendant at `address`
    ///
    /// `address` is absolute and must start with the address of `entity`.
    pub fn child_by_address(&self, entity: EntityId, address: &Address) -> Result<EntityId> {
        let unresolved = || Error::UnresolvedAddress(address.to_string());
        let node = self.node(entity)?;
        if !address.is_valid() || !address.starts_with(&node.address) {
            return Err(unresolved());
        }
        let mut current = entity;
        for id in &address.ids()[node.address.id_count()..] {
            current = self
                .node(current)?
                .children
                .get(id)
                .copied()
                .ok_or_else(unresolved)?;
        }
        Ok(current)
    }

    /// First child of `parent` named `name`
    pub fn child_by_name(&self, parent: EntityId, name: &str) -> Result<Option<EntityId>> {
        let node = self.node(parent)?;
        Ok(node
            .children
            .values()
            .copied()
            .find(|child| self.entities.get(child).is_some_and(|c| c.name == name)))
    }

    pub fn children(&self, entity: EntityId) -> Result<Vec<EntityId>> {
        Ok(self.node(entity)?.children.values().copied().collect())
    }

    pub fn child_count(&self, entity: EntityId) -> Result<usize> {
        Ok(self.node(entity)?.children.len())
    }

    pub fn parent(&self, entity: EntityId) -> Result<Option<EntityId>> {
        Ok(self.node(entity)?.parent)
    }

    pub fn root(&self, entity: EntityId) -> Result<EntityId> {
        Ok(self.node(entity)?.root)
    }

    /// Entities without a parent
    pub(crate) fn has_properties(&self, entity: EntityId) -> Result<bool> {
        Ok(!self.node(entity)?.properties.is_empty())
    }

    pub fn entities(&self) -> impl Iterator<Item = EntityId> + '_ {
        self.entities.keys().copied()
    }

    pub fn roots(&self) -> impl Iterator<Item = EntityId> + '_ {
        self.entities
            .values()
            .filter(|node| node.parent.is_none())
            .map(|node| node.handle)
    }

    pub fn address(&self, entity: EntityId) -> Result<Address> {
        Ok(self.node(entity)?.address.clone())
    }

    pub fn name(&self, entity: EntityId) -> Result<&str> {
        Ok(&self.node(entity)?.name)
    }

    pub fn set_name(&mut self, entity: EntityId, name: &str) -> Result<()> {
        let node = self.node_mut(entity)?;
        if node.name != name {
            debug!("renamed {} from '{}' to '{}'", entity, node.name, name);
            node.name = name.to_string();
        }
        Ok(())
    }

    pub fn entity_id(&self, entity: EntityId) -> Result<Id> {
        Ok(self.node(entity)?.id)
    }

    pub fn entity_signals(&self, entity: EntityId) -> Result<EntitySignals> {
        Ok(self.node(entity)?.signals.clone())
    }

    // Disposal

    /// Tear down `entity` and its subtree
    ///
    /// Components disconnect latest first, then properties are disposed,
    /// then children, and finally the entity leaves its parent and the
    /// arena. A component that refuses to disconnect aborts the dispose
    /// with its error; whatever was already torn down stays torn down.
    pub fn dispose(&mut self, entity: EntityId) -> Result<()> {
        loop {
            let latest = self
                .node(entity)?
                .components
                .iter()
                .filter(|slot| slot.connected)
                .max_by_key(|slot| slot.seq)
                .map(|slot| slot.kind);
            let Some(kind) = latest else {
                break;
            };
            self.remove_component_kind(entity, kind)?;
        }

        let properties: Vec<PropertyId> = self.node(entity)?.properties.values().copied().collect();
        for id in properties {
            if self.properties.contains_key(&id) {
                self.dispose_property(id)?;
            }
        }

        for child in self.children(entity)? {
            self.dispose(child)?;
        }

        self.set_parent(entity, None)?;
        if let Some(node) = self.entities.shift_remove(&entity) {
            debug!("disposed entity '{}' ({})", node.name, entity);
        }
        Ok(())
    }
}

impl Default for Graph {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Graph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Graph")
            .field("entities", &self.entities.len())
            .field("properties", &self.properties.len())
            .field("config", &self.config)
            .finish()
    }
}

/// A graph shared between threads behind one lock
#[derive(Debug, Clone, Default)]
pub struct SharedGraph(Arc<Mutex<Graph>>);

impl SharedGraph {
    pub fn new(graph: Graph) -> Self {
        Self(Arc::new(Mutex::new(graph)))
    }

    /// Run `f` with exclusive access to the graph
    pub fn with<R>(&self, f: impl FnOnce(&mut Graph) -> R) -> R {
        let mut graph = self.0.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut graph)
    }
}
