//! Declarative dependency tables
//!
//! Each component describes what it needs with a [`Wiring`]: the roles it
//! can stand in for, the components it requires and the properties it
//! binds. The graph consumes the table when the component connects.
//!
//! ```
//! use strand_core::{Component, ComponentDep, PropertySlot, FloatProperty, Value, Wiring};
//!
//! #[derive(Default)]
//! struct Engine;
//! impl Component for Engine {}
//!
//! struct Thruster;
//! impl Component for Thruster {
//!     fn wiring(&self) -> Wiring {
//!         Wiring::new()
//!             .component(ComponentDep::or_add::<Engine>())
//!             .property(PropertySlot::create::<FloatProperty>("thrust").with_default(Value::Float(1.0)))
//!     }
//! }
//! ```

use crate::component::{Component, ComponentKind};
use crate::property::{new_boxed, PropertyFactory, PropertyKind};
use crate::value::Value;
use std::any::{type_name, TypeId};
use std::fmt;

/// Dependency table of a component type
#[derive(Debug, Default)]
pub struct Wiring {
    pub(crate) provides: Vec<ComponentKind>,
    pub(crate) components: Vec<ComponentDep>,
    pub(crate) properties: Vec<PropertySlot>,
}

impl Wiring {
    pub fn new() -> Self {
        Self::default()
    }

    /// Let dependencies on the role `R` bind to this component
    pub fn provides<R: ?Sized + 'static>(mut self) -> Self {
        self.provides.push(ComponentKind::of::<R>());
        self
    }

    pub fn component(mut self, dep: ComponentDep) -> Self {
        self.components.push(dep);
        self
    }

    pub fn property(mut self, slot: PropertySlot) -> Self {
        self.properties.push(slot);
        self
    }
}

type ComponentFactory = fn() -> Box<dyn Component>;

fn new_component<C: Component + Default>() -> Box<dyn Component> {
    Box::new(C::default())
}

/// A required component
#[derive(Clone)]
pub struct ComponentDep {
    pub(crate) kind: ComponentKind,
    pub(crate) factory: Option<ComponentFactory>,
    pub(crate) search_parent: bool,
}

impl ComponentDep {
    /// Require an existing component of type `C`
    pub fn of<C: Component>() -> Self {
        Self::role::<C>()
    }

    /// Require a component providing the role `R`
    pub fn role<R: ?Sized + 'static>() -> Self {
        Self {
            kind: ComponentKind::of::<R>(),
            factory: None,
            search_parent: false,
        }
    }

    /// Require `C`, adding a default one when it is missing
    pub fn or_add<C: Component + Default>() -> Self {
        Self {
            factory: Some(new_component::<C>),
            ..Self::of::<C>()
        }
    }

    /// Fall back to the ancestors of the entity
    pub fn search_parent(mut self) -> Self {
        self.search_parent = true;
        self
    }

    pub fn kind(&self) -> ComponentKind {
        self.kind
    }
}

impl fmt::Debug for ComponentDep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComponentDep")
            .field("kind", &self.kind.name)
            .field("add_if_missing", &self.factory.is_some())
            .field("search_parent", &self.search_parent)
            .finish()
    }
}

/// A property bound by name
#[derive(Clone)]
pub struct PropertySlot {
    pub(crate) name: String,
    pub(crate) kind: TypeId,
    pub(crate) kind_name: &'static str,
    pub(crate) factory: PropertyFactory,
    pub(crate) create: bool,
    pub(crate) default: Option<Value>,
    pub(crate) order: i32,
}

impl PropertySlot {
    /// Bind `name`, creating it when the entity lacks it
    pub fn create<P: PropertyKind>(name: &str) -> Self {
        Self {
            name: name.to_string(),
            kind: TypeId::of::<P>(),
            kind_name: type_name::<P>(),
            factory: new_boxed::<P>,
            create: true,
            default: None,
            order: 0,
        }
    }

    /// Bind `name`; connect fails when the entity lacks it
    pub fn existing<P: PropertyKind>(name: &str) -> Self {
        Self {
            create: false,
            ..Self::create::<P>(name)
        }
    }

    /// Default value given to a newly created property
    pub fn with_default(mut self, value: Value) -> Self {
        self.default = Some(value);
        self
    }

    /// Slots resolve in ascending order; ties keep declaration order
    pub fn order(mut self, order: i32) -> Self {
        self.order = order;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Debug for PropertySlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PropertySlot")
            .field("name", &self.name)
            .field("kind", &self.kind_name)
            .field("create", &self.create)
            .field("default", &self.default)
            .field("order", &self.order)
            .finish()
    }
}
