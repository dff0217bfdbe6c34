//! Address resolution for reference properties

use crate::address::Address;
use crate::error::{Error, Result};
use crate::graph::Graph;
use crate::identity::EntityId;

/// Maps addresses to live entities and back
pub trait ReferenceResolver: Send + Sync {
    fn resolve(&self, graph: &Graph, address: &Address) -> Result<EntityId>;

    fn address_of(&self, graph: &Graph, entity: EntityId) -> Result<Address>;
}

/// Resolves by walking down from the root whose id matches the first
/// address segment
#[derive(Debug, Clone, Copy, Default)]
pub struct TreeResolver;

impl ReferenceResolver for TreeResolver {
    fn resolve(&self, graph: &Graph, address: &Address) -> Result<EntityId> {
        let first = address
            .get_id(0)
            .ok_or_else(|| Error::UnresolvedAddress(address.to_string()))?;
        let root = graph
            .roots()
            .find(|root| graph.entity_id(*root).is_ok_and(|id| id == first))
            .ok_or_else(|| Error::UnresolvedAddress(address.to_string()))?;
        graph.child_by_address(root, address)
    }

    fn address_of(&self, graph: &Graph, entity: EntityId) -> Result<Address> {
        graph.address(entity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::address::Id;

    #[test]
    fn test_tree_resolver() {
        let mut graph = Graph::new();
        let world = graph.create_entity(Id::from_u64(1), "world");
        graph.create_entity(Id::from_u64(2), "other");
        let port = graph.add_child(world, Id::from_u64(5), "port").unwrap();

        let address = Address::parse("01/05").unwrap();
        assert_eq!(graph.resolve(&address).unwrap(), port);
        assert_eq!(graph.address_of(port).unwrap(), address);
        assert!(matches!(
            graph.resolve(&Address::parse("03/05").unwrap()),
            Err(Error::UnresolvedAddress(_))
        ));
        assert!(graph.resolve(&Address::INVALID).is_err());
    }

    struct Fixed(EntityId);

    impl ReferenceResolver for Fixed {
        fn resolve(&self, _graph: &Graph, _address: &Address) -> Result<EntityId> {
            Ok(self.0)
        }

        fn address_of(&self, _graph: &Graph, _entity: EntityId) -> Result<Address> {
            Ok(Address::from(Id::from_u64(0xFF)))
        }
    }

    #[test]
    fn test_custom_resolver() {
        let mut graph = Graph::new();
        let e = graph.create_entity(Id::from_u64(1), "e");
        graph.set_resolver(Fixed(e));
        assert_eq!(graph.resolve(&Address::parse("77").unwrap()).unwrap(), e);
        assert_eq!(graph.address_of(e).unwrap().to_string(), "FF");
    }
}
