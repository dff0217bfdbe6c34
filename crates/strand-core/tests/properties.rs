//! Quantified properties of values, links and addresses

use proptest::prelude::*;
use strand_core::{Address, Graph, Id, IntProperty, LongProperty, StringProperty};

fn arb_id() -> impl Strategy<Value = Id> {
    prop_oneof![
        any::<u64>().prop_map(Id::from_u64),
        prop::collection::vec(any::<u8>(), 1..=16).prop_map(|bytes| Id::from_bytes(&bytes).unwrap()),
    ]
}

proptest! {
    #[test]
    fn reset_restores_default(default in any::<i64>(), value in any::<i64>()) {
        let mut graph = Graph::new();
        let e = graph.create_entity(Id::from_u64(1), "e");
        let p = graph.add_property::<LongProperty>(e, "p").unwrap();
        graph.set_default(p, default).unwrap();
        graph.set(p, value).unwrap();

        graph.reset_to_default(p).unwrap();
        prop_assert_eq!(graph.value(p).unwrap(), default);
        prop_assert!(graph.is_default(p).unwrap());
    }

    #[test]
    fn reset_restores_text_default(default in "[a-z]{0,12}", value in ".{0,12}") {
        let mut graph = Graph::new();
        let e = graph.create_entity(Id::from_u64(1), "e");
        let p = graph.add_property::<StringProperty>(e, "p").unwrap();
        graph.set_default(p, default.clone()).unwrap();
        graph.set(p, value).unwrap();

        graph.reset_to_default(p).unwrap();
        prop_assert_eq!(graph.value(p).unwrap(), default);
    }

    #[test]
    fn linked_target_follows_until_written(values in prop::collection::vec(any::<i32>(), 1..16), own in any::<i32>()) {
        let mut graph = Graph::new();
        let a = graph.create_entity(Id::from_u64(1), "a");
        let b = graph.create_entity(Id::from_u64(2), "b");
        let source = graph.add_property::<IntProperty>(a, "v").unwrap();
        let target = graph.add_property::<IntProperty>(b, "v").unwrap();
        graph.link(target, source).unwrap();

        for v in &values {
            graph.set(source, *v).unwrap();
            prop_assert_eq!(graph.value(target).unwrap(), *v);
        }

        let last = *values.last().unwrap();
        if own != last {
            graph.set(target, own).unwrap();
            prop_assert!(!graph.is_linked(target).unwrap());
            graph.set(source, last.wrapping_add(1)).unwrap();
            prop_assert_eq!(graph.value(target).unwrap(), own);
        }
    }

    #[test]
    fn address_text_and_bytes(ids in prop::collection::vec(arb_id(), 1..8)) {
        let address = Address::new(ids);
        let text = address.to_string();
        prop_assert_eq!(Address::parse(&text).unwrap(), address.clone());
        prop_assert_eq!(Address::from_bytes(&address.to_bytes()).unwrap(), address);
    }

    #[test]
    fn address_follows_the_chain(ids in prop::collection::vec(arb_id(), 1..8)) {
        let mut graph = Graph::new();
        let root = graph.create_entity(ids[0], "root");
        let mut expected = Address::from(ids[0]);
        let mut last = root;
        for (depth, id) in ids.iter().enumerate().skip(1) {
            last = graph.add_child(last, *id, &format!("level{}", depth)).unwrap();
            expected = expected.append(*id);
        }

        prop_assert_eq!(graph.address(last).unwrap(), expected.clone());
        prop_assert_eq!(graph.child_by_address(root, &expected).unwrap(), last);
        prop_assert_eq!(graph.resolve(&expected).unwrap(), last);
    }
}
