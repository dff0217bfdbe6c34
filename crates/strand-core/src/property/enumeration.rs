//! Enum properties

use super::{PropertyCore, PropertyKind};
use crate::convert::Converter;
use crate::error::{Error, Result};
use crate::graph::Graph;
use crate::identity::{EntityId, PropertyId};
use crate::value::{Value, ValueKind};
use std::any::type_name;
use std::marker::PhantomData;
use std::sync::Arc;

/// A fieldless enum usable as a property value
///
/// The data form of a variant is its name; integer data selects a variant
/// by position in [`PropertyEnum::variants`].
pub trait PropertyEnum: Copy + PartialEq + Default + Send + Sync + 'static {
    fn variants() -> &'static [Self];

    fn name(&self) -> &'static str;

    fn from_name(name: &str) -> Option<Self> {
        Self::variants().iter().copied().find(|v| v.name() == name)
    }

    fn index(&self) -> usize {
        Self::variants()
            .iter()
            .position(|v| v == self)
            .unwrap_or_default()
    }

    fn from_index(index: usize) -> Option<Self> {
        Self::variants().get(index).copied()
    }
}

/// Property holding a [`PropertyEnum`]
pub struct EnumProperty<E: PropertyEnum> {
    core: PropertyCore<E>,
}

struct EnumConverter<E> {
    _enum: PhantomData<fn() -> E>,
}

impl<E: PropertyEnum> Converter<E> for EnumConverter<E> {
    fn can_convert(&self, kind: ValueKind) -> bool {
        matches!(kind, ValueKind::String | ValueKind::Int | ValueKind::Long)
    }

    fn convert(&self, _graph: &Graph, data: &Value) -> Result<E> {
        let found = match data {
            Value::String(name) => E::from_name(name),
            Value::Int(i) => usize::try_from(*i).ok().and_then(E::from_index),
            Value::Long(l) => usize::try_from(*l).ok().and_then(E::from_index),
            _ => None,
        };
        found.ok_or(Error::Conversion {
            from: data.kind(),
            to: type_name::<E>(),
        })
    }
}

impl<E: PropertyEnum> PropertyKind for EnumProperty<E> {
    type Value = E;

    fn create(id: PropertyId, name: &str, owner: EntityId) -> Self {
        let converter: Arc<dyn Converter<E>> = Arc::new(EnumConverter::<E> {
            _enum: PhantomData,
        });
        Self {
            core: PropertyCore::new(id, name, owner, E::default()).with_converters(vec![converter]),
        }
    }

    fn core(&self) -> &PropertyCore<E> {
        &self.core
    }

    fn core_mut(&mut self) -> &mut PropertyCore<E> {
        &mut self.core
    }

    fn value_kind() -> ValueKind {
        ValueKind::Enum
    }

    fn from_data(_data: &Value) -> Option<E> {
        None
    }

    fn to_data(_graph: &Graph, value: &E) -> Result<Value> {
        Ok(Value::String(value.name().to_string()))
    }
}
