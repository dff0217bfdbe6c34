//! Strand Core - Reactive entity/component/property graph
//!
//! This crate provides the building blocks of a strand graph:
//! - Hierarchical entities addressed by id paths (`Id`, `Address`)
//! - Components that declare their dependencies through `Wiring`
//! - Typed, observable properties with defaults, converters and links
//! - Reference properties that reset when their target goes away
//! - Synchronous signals for every structural and value change
//!
//! ## Ownership
//!
//! A [`Graph`] owns everything. Entities, components and properties are
//! reached through copyable handles (`EntityId`, `ComponentRef`,
//! `PropertyHandle`), and every mutation takes `&mut Graph`. Use
//! [`SharedGraph`] to share a graph across threads.
//!
//! ```
//! use strand_core::{FloatProperty, Graph, Id};
//!
//! let mut graph = Graph::new();
//! let world = graph.create_entity(Id::from_u64(1), "world");
//! let a = graph.add_property::<FloatProperty>(world, "a").unwrap();
//! let b = graph.add_property::<FloatProperty>(world, "b").unwrap();
//!
//! graph.link(b, a).unwrap();
//! graph.set(a, 2.5).unwrap();
//! assert_eq!(graph.value(b).unwrap(), 2.5);
//! ```

mod address;
pub mod builtin;
mod component;
mod config;
mod convert;
mod dependency;
mod entity;
mod error;
mod graph;
mod id_gen;
mod identity;
mod lifecycle;
pub mod property;
mod resolver;
mod rng;
mod shared;
mod signal;
mod value;
mod wiring;

pub use address::{Address, Id, MAX_ID_LEN};
pub use builtin::{ComponentTemplate, EntityManager, Named};
pub use component::{AsAny, Component, ComponentContext, ComponentEvent, ComponentKind, ComponentRef, ComponentSignals};
pub use config::GraphConfig;
pub use convert::{converter, Converter, FnConverter};
pub use dependency::{Dependency, DependencyContainer, DependencyCountChanged, DependencyEvent};
pub use entity::{ChildCountChanged, ChildEvent, EntityNode, EntitySignals, ParentChanged};
pub use error::{Error, Result};
pub use graph::{Graph, SharedGraph};
pub use id_gen::IdGenerator;
pub use identity::{EntityId, PropertyHandle, PropertyId};
pub use property::{
    AddressProperty, AnyProperty, BoolProperty, ByteProperty, BytesProperty, CountChange, DateTimeProperty,
    DoubleProperty, ElementEvent, EntryEvent, EnumProperty, FloatProperty, IdProperty, IntProperty, JsonModel,
    JsonProperty, JsonValue, KeyEvent, LinkState, ListProperty, LongProperty, MapProperty, Numeric, Property, PropertyCore,
    PropertyEnum, PropertyKind, ReferenceProperty, StringProperty, ValueChange,
};
pub use resolver::{ReferenceResolver, TreeResolver};
pub use rng::XorShift;
pub use shared::Shared;
pub use signal::{Handler, Signal, Subscriber, Unsubscribe};
pub use value::{Opaque, PropertyValue, Value, ValueKind, ValueMap};
pub use wiring::{ComponentDep, PropertySlot, Wiring};
