//! Entity nodes of the graph tree

use crate::address::{Address, Id};
use crate::identity::{EntityId, PropertyId};
use crate::lifecycle::ComponentSlot;
use crate::signal::Signal;
use indexmap::IndexMap;

/// Payload of `child_added` and `child_removed`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChildEvent {
    pub parent: EntityId,
    pub child: EntityId,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChildCountChanged {
    pub entity: EntityId,
    pub count: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParentChanged {
    pub entity: EntityId,
    pub previous: Option<EntityId>,
    pub parent: Option<EntityId>,
}

/// Structural signals of one entity
#[derive(Debug, Clone, Default)]
pub struct EntitySignals {
    pub child_added: Signal<ChildEvent>,
    pub child_removed: Signal<ChildEvent>,
    pub child_count_changed: Signal<ChildCountChanged>,
    pub parent_changed: Signal<ParentChanged>,
}

/// A node in the entity tree
///
/// Nodes live inside the [`Graph`](crate::Graph); `address` and `root` are
/// kept current by every structural change.
pub struct EntityNode {
    pub(crate) handle: EntityId,
    pub(crate) id: Id,
    pub(crate) name: String,
    pub(crate) parent: Option<EntityId>,
    pub(crate) root: EntityId,
    pub(crate) address: Address,
    pub(crate) children: IndexMap<Id, EntityId>,
    pub(crate) components: Vec<ComponentSlot>,
    pub(crate) properties: IndexMap<String, PropertyId>,
    pub(crate) signals: EntitySignals,
}

impl EntityNode {
    pub(crate) fn new(handle: EntityId, id: Id, name: &str) -> Self {
        Self {
            handle,
            id,
            name: name.to_string(),
            parent: None,
            root: handle,
            address: Address::from(id),
            children: IndexMap::new(),
            components: Vec::new(),
            properties: IndexMap::new(),
            signals: EntitySignals::default(),
        }
    }

    pub fn handle(&self) -> EntityId {
        self.handle
    }

    pub fn id(&self) -> Id {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn parent(&self) -> Option<EntityId> {
        self.parent
    }

    pub fn root(&self) -> EntityId {
        self.root
    }

    pub fn address(&self) -> &Address {
        &self.address
    }

    /// Children in insertion order
    pub fn children(&self) -> impl Iterator<Item = EntityId> + '_ {
        self.children.values().copied()
    }

    pub fn child_count(&self) -> usize {
        self.children.len()
    }

    pub fn signals(&self) -> &EntitySignals {
        &self.signals
    }
}

impl std::fmt::Debug for EntityNode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EntityNode")
            .field("handle", &self.handle)
            .field("name", &self.name)
            .field("address", &self.address.to_string())
            .field("children", &self.children.len())
            .field("components", &self.components.len())
            .field("properties", &self.properties.len())
            .finish()
    }
}
