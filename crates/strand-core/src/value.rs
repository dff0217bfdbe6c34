//! Tagged values used for property data and conversion

use crate::address::{Address, Id};
use crate::convert::{self, Converter};
use chrono::NaiveDateTime;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::any::Any;
use std::fmt;
use std::sync::Arc;

/// A tagged value, the raw form that property data travels in
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub enum Value {
    /// No value / null
    #[default]
    Null,
    Bool(bool),
    Byte(u8),
    Int(i32),
    Long(i64),
    Float(f32),
    Double(f64),
    String(String),
    Bytes(Vec<u8>),
    Id(Id),
    Address(Address),
    DateTime(NaiveDateTime),
    List(Vec<Value>),
    Map(ValueMap),
    /// Shared in-memory object; only meaningful within one process
    #[serde(skip)]
    Opaque(Opaque),
}

/// A map of string keys to values
///
/// Uses IndexMap to preserve insertion order
pub type ValueMap = IndexMap<String, Value>;

/// Type tag of a [`Value`], and of the value types properties hold
///
/// `Model`, `Enum` and `Reference` never tag a [`Value`]; they describe
/// property value types whose data form is some other kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ValueKind {
    Null,
    Bool,
    Byte,
    Int,
    Long,
    Float,
    Double,
    String,
    Bytes,
    Id,
    Address,
    DateTime,
    List,
    Map,
    Opaque,
    Model,
    Enum,
    Reference,
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ValueKind::Null => "null",
            ValueKind::Bool => "bool",
            ValueKind::Byte => "byte",
            ValueKind::Int => "int",
            ValueKind::Long => "long",
            ValueKind::Float => "float",
            ValueKind::Double => "double",
            ValueKind::String => "string",
            ValueKind::Bytes => "bytes",
            ValueKind::Id => "id",
            ValueKind::Address => "address",
            ValueKind::DateTime => "datetime",
            ValueKind::List => "list",
            ValueKind::Map => "map",
            ValueKind::Opaque => "opaque",
            ValueKind::Model => "model",
            ValueKind::Enum => "enum",
            ValueKind::Reference => "reference",
        };
        f.write_str(name)
    }
}

impl Value {
    pub fn kind(&self) -> ValueKind {
        match self {
            Value::Null => ValueKind::Null,
            Value::Bool(_) => ValueKind::Bool,
            Value::Byte(_) => ValueKind::Byte,
            Value::Int(_) => ValueKind::Int,
            Value::Long(_) => ValueKind::Long,
            Value::Float(_) => ValueKind::Float,
            Value::Double(_) => ValueKind::Double,
            Value::String(_) => ValueKind::String,
            Value::Bytes(_) => ValueKind::Bytes,
            Value::Id(_) => ValueKind::Id,
            Value::Address(_) => ValueKind::Address,
            Value::DateTime(_) => ValueKind::DateTime,
            Value::List(_) => ValueKind::List,
            Value::Map(_) => ValueKind::Map,
            Value::Opaque(_) => ValueKind::Opaque,
        }
    }

    /// Check if this value is null
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_byte(&self) -> Option<u8> {
        match self {
            Value::Byte(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i32> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_long(&self) -> Option<i64> {
        match self {
            Value::Long(l) => Some(*l),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f32> {
        match self {
            Value::Float(f) => Some(*f),
            _ => None,
        }
    }

    pub fn as_double(&self) -> Option<f64> {
        match self {
            Value::Double(d) => Some(*d),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Value::Bytes(b) => Some(b),
            _ => None,
        }
    }

    pub fn as_id(&self) -> Option<Id> {
        match self {
            Value::Id(id) => Some(*id),
            _ => None,
        }
    }

    pub fn as_address(&self) -> Option<&Address> {
        match self {
            Value::Address(a) => Some(a),
            _ => None,
        }
    }

    pub fn as_datetime(&self) -> Option<NaiveDateTime> {
        match self {
            Value::DateTime(dt) => Some(*dt),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(list) => Some(list),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&ValueMap> {
        match self {
            Value::Map(map) => Some(map),
            _ => None,
        }
    }

    pub fn as_opaque(&self) -> Option<&Opaque> {
        match self {
            Value::Opaque(o) => Some(o),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Byte(b) => write!(f, "{}", b),
            Value::Int(i) => write!(f, "{}", i),
            Value::Long(l) => write!(f, "{}", l),
            Value::Float(fl) => write!(f, "{}", fl),
            Value::Double(d) => write!(f, "{}", d),
            Value::String(s) => write!(f, "\"{}\"", s),
            Value::Bytes(b) => {
                for byte in b {
                    write!(f, "{:02X}", byte)?;
                }
                Ok(())
            }
            Value::Id(id) => write!(f, "{}", id),
            Value::Address(a) => write!(f, "{}", a),
            Value::DateTime(dt) => write!(f, "{}", dt),
            Value::List(list) => {
                write!(f, "[")?;
                for (i, v) in list.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", v)?;
                }
                write!(f, "]")
            }
            Value::Map(map) => {
                write!(f, "{{")?;
                for (i, (k, v)) in map.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}: {}", k, v)?;
                }
                write!(f, "}}")
            }
            Value::Opaque(o) => write!(f, "{:?}", o),
        }
    }
}

/// Shared object carried inside a [`Value`]
///
/// Two opaque values are equal when they point at the same allocation.
#[derive(Clone)]
pub struct Opaque(Arc<dyn Any + Send + Sync>);

impl Opaque {
    pub fn new<T: Any + Send + Sync>(value: T) -> Self {
        Self(Arc::new(value))
    }

    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.0.downcast_ref::<T>()
    }
}

impl PartialEq for Opaque {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for Opaque {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Opaque({:p})", Arc::as_ptr(&self.0))
    }
}

/// A Rust type that a scalar, list or map property can hold
pub trait PropertyValue: Clone + PartialEq + Send + Sync + 'static {
    /// Kind used to decide link compatibility
    fn kind() -> ValueKind;

    fn to_value(&self) -> Value;

    /// Exact-kind conversion; other kinds go through converters
    fn from_value(value: &Value) -> Option<Self>;

    /// Converters registered on every new property of this type
    fn converters() -> Vec<Arc<dyn Converter<Self>>> {
        Vec::new()
    }
}

macro_rules! scalar_value {
    ($ty:ty, $kind:ident, $extract:expr, $converters:path) => {
        impl PropertyValue for $ty {
            fn kind() -> ValueKind {
                ValueKind::$kind
            }

            fn to_value(&self) -> Value {
                Value::$kind(self.clone())
            }

            fn from_value(value: &Value) -> Option<Self> {
                let extract: fn(&Value) -> Option<$ty> = $extract;
                extract(value)
            }

            fn converters() -> Vec<Arc<dyn Converter<Self>>> {
                $converters()
            }
        }
    };
}

scalar_value!(bool, Bool, Value::as_bool, convert::bool_converters);
scalar_value!(u8, Byte, Value::as_byte, convert::no_converters);
scalar_value!(i32, Int, Value::as_int, convert::int_converters);
scalar_value!(i64, Long, Value::as_long, convert::long_converters);
scalar_value!(f32, Float, Value::as_float, convert::float_converters);
scalar_value!(f64, Double, Value::as_double, convert::double_converters);
scalar_value!(
    String,
    String,
    |v| v.as_str().map(str::to_string),
    convert::no_converters
);
scalar_value!(
    Vec<u8>,
    Bytes,
    |v| v.as_bytes().map(<[u8]>::to_vec),
    convert::bytes_converters
);
scalar_value!(Id, Id, Value::as_id, convert::id_converters);
scalar_value!(
    Address,
    Address,
    |v| v.as_address().cloned(),
    convert::address_converters
);
scalar_value!(
    NaiveDateTime,
    DateTime,
    Value::as_datetime,
    convert::datetime_converters
);

// Convenient From implementations
impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Value::Int(i)
    }
}

impl From<i64> for Value {
    fn from(l: i64) -> Self {
        Value::Long(l)
    }
}

impl From<f32> for Value {
    fn from(f: f32) -> Self {
        Value::Float(f)
    }
}

impl From<f64> for Value {
    fn from(d: f64) -> Self {
        Value::Double(d)
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<Id> for Value {
    fn from(id: Id) -> Self {
        Value::Id(id)
    }
}

impl From<Address> for Value {
    fn from(address: Address) -> Self {
        Value::Address(address)
    }
}
