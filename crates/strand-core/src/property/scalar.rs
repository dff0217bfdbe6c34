//! Scalar properties

use super::{PropertyCore, PropertyKind};
use crate::address::{Address, Id};
use crate::error::{Error, Result};
use crate::graph::Graph;
use crate::identity::{EntityId, PropertyHandle, PropertyId};
use crate::value::{PropertyValue, Value, ValueKind};
use chrono::NaiveDateTime;

/// Property holding a single [`PropertyValue`]
pub struct Property<T: PropertyValue> {
    core: PropertyCore<T>,
}

pub type BoolProperty = Property<bool>;
pub type ByteProperty = Property<u8>;
pub type IntProperty = Property<i32>;
pub type LongProperty = Property<i64>;
pub type FloatProperty = Property<f32>;
pub type DoubleProperty = Property<f64>;
pub type StringProperty = Property<String>;
pub type BytesProperty = Property<Vec<u8>>;
pub type IdProperty = Property<Id>;
pub type AddressProperty = Property<Address>;
pub type DateTimeProperty = Property<NaiveDateTime>;

impl<T: PropertyValue + Default> PropertyKind for Property<T> {
    type Value = T;

    fn create(id: PropertyId, name: &str, owner: EntityId) -> Self {
        Self {
            core: PropertyCore::new(id, name, owner, T::default()).with_converters(T::converters()),
        }
    }

    fn core(&self) -> &PropertyCore<T> {
        &self.core
    }

    fn core_mut(&mut self) -> &mut PropertyCore<T> {
        &mut self.core
    }

    fn value_kind() -> ValueKind {
        T::kind()
    }

    fn from_data(data: &Value) -> Option<T> {
        T::from_value(data)
    }

    fn to_data(_graph: &Graph, value: &T) -> Result<Value> {
        Ok(value.to_value())
    }
}

/// Values the numeric helpers can add to and subtract from
///
/// Integers fail on wrap-around. Floats fail when finite operands give a
/// non-finite result.
pub trait Numeric: PropertyValue + Default + Copy {
    fn checked_add(self, amount: Self) -> Option<Self>;
    fn checked_sub(self, amount: Self) -> Option<Self>;
}

macro_rules! integer_numeric {
    ($($ty:ty),*) => {
        $(
            impl Numeric for $ty {
                fn checked_add(self, amount: Self) -> Option<Self> {
                    <$ty>::checked_add(self, amount)
                }

                fn checked_sub(self, amount: Self) -> Option<Self> {
                    <$ty>::checked_sub(self, amount)
                }
            }
        )*
    };
}

macro_rules! float_numeric {
    ($($ty:ty),*) => {
        $(
            impl Numeric for $ty {
                fn checked_add(self, amount: Self) -> Option<Self> {
                    finite_or_none(self, amount, self + amount)
                }

                fn checked_sub(self, amount: Self) -> Option<Self> {
                    finite_or_none(self, amount, self - amount)
                }
            }
        )*
    };
}

integer_numeric!(u8, i32, i64);
float_numeric!(f32, f64);

fn finite_or_none<F: Into<f64> + Copy>(lhs: F, rhs: F, result: F) -> Option<F> {
    let operands_finite = lhs.into().is_finite() && rhs.into().is_finite();
    (result.into().is_finite() || !operands_finite).then_some(result)
}

impl Graph {
    /// Write `value + amount`
    pub fn add<T: Numeric>(&mut self, handle: PropertyHandle<Property<T>>, amount: T) -> Result<()> {
        let current = self.value(handle)?;
        match current.checked_add(amount) {
            Some(sum) => self.set(handle, sum),
            None => Err(self.overflow(handle.id())),
        }
    }

    /// Write `value - amount`
    pub fn subtract<T: Numeric>(&mut self, handle: PropertyHandle<Property<T>>, amount: T) -> Result<()> {
        let current = self.value(handle)?;
        match current.checked_sub(amount) {
            Some(difference) => self.set(handle, difference),
            None => Err(self.overflow(handle.id())),
        }
    }

    fn overflow(&self, id: PropertyId) -> Error {
        let property = match self.any_property(id) {
            Ok(property) => property.name().to_string(),
            Err(_) => id.to_string(),
        };
        Error::Overflow { property }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    #[test]
    fn test_add_and_subtract() {
        let mut graph = Graph::new();
        let e = graph.create_entity(Id::from_u64(1), "e");
        let p = graph.add_property::<FloatProperty>(e, "f").unwrap();
        graph.add(p, 1.5).unwrap();
        graph.add(p, 1.0).unwrap();
        graph.subtract(p, 0.5).unwrap();
        assert_eq!(graph.value(p).unwrap(), 2.0);
    }

    #[test]
    fn test_arithmetic_overflow_is_an_error() {
        let mut graph = Graph::new();
        let e = graph.create_entity(Id::from_u64(1), "e");
        let hp = graph.add_property::<IntProperty>(e, "hp").unwrap();
        graph.set(hp, i32::MAX).unwrap();
        assert_eq!(
            graph.add(hp, 1),
            Err(Error::Overflow {
                property: "hp".into()
            })
        );
        assert_eq!(graph.value(hp).unwrap(), i32::MAX);
        graph.subtract(hp, 2).unwrap();
        assert_eq!(graph.value(hp).unwrap(), i32::MAX - 2);

        let ticks = graph.add_property::<LongProperty>(e, "ticks").unwrap();
        graph.set(ticks, i64::MIN).unwrap();
        assert!(matches!(graph.subtract(ticks, 1), Err(Error::Overflow { .. })));

        let level = graph.add_property::<ByteProperty>(e, "level").unwrap();
        assert!(matches!(graph.subtract(level, 1), Err(Error::Overflow { .. })));

        let mass = graph.add_property::<DoubleProperty>(e, "mass").unwrap();
        graph.set(mass, f64::MAX).unwrap();
        assert!(matches!(graph.add(mass, f64::MAX), Err(Error::Overflow { .. })));
        assert_eq!(graph.value(mass).unwrap(), f64::MAX);
    }

    #[test]
    fn test_defaults_per_type() {
        let mut graph = Graph::new();
        let e = graph.create_entity(Id::from_u64(1), "e");
        let id = graph.add_property::<IdProperty>(e, "id").unwrap();
        assert_eq!(graph.value(id).unwrap(), Id::INVALID);
        let address = graph.add_property::<AddressProperty>(e, "a").unwrap();
        assert_eq!(graph.value(address).unwrap(), Address::INVALID);
        let when = graph.add_property::<DateTimeProperty>(e, "when").unwrap();
        assert_eq!(graph.value(when).unwrap(), NaiveDateTime::default());
    }

    #[test]
    fn test_address_and_bytes_data() {
        let mut graph = Graph::new();
        let e = graph.create_entity(Id::from_u64(1), "e");
        let a = graph.add_property::<AddressProperty>(e, "a").unwrap();
        graph.set_data(a, &Value::from("01/02")).unwrap();
        assert_eq!(graph.value(a).unwrap().id_count(), 2);
        assert_eq!(graph.data(a).unwrap().kind(), ValueKind::Address);

        let b = graph.add_property::<BytesProperty>(e, "b").unwrap();
        graph.set_data(b, &Value::from("hi")).unwrap();
        assert_eq!(graph.value(b).unwrap(), b"hi".to_vec());
        assert!(matches!(graph.set_data(b, &Value::Int(1)), Err(Error::NoConverter { .. })));
    }
}
