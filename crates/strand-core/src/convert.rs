//! Pluggable value converters
//!
//! A property tries the exact value kind first, then asks each registered
//! converter in order; the first one that accepts the incoming kind decides
//! the result. The same check decides whether two properties of different
//! value types may be linked.

use crate::address::{Address, Id};
use crate::error::{Error, Result};
use crate::graph::Graph;
use crate::value::{Value, ValueKind};
use chrono::{DateTime, NaiveDateTime};
use std::any::type_name;
use std::marker::PhantomData;
use std::sync::Arc;

/// Converts tagged values of some kinds into `T`
pub trait Converter<T>: Send + Sync {
    fn can_convert(&self, kind: ValueKind) -> bool;

    fn convert(&self, graph: &Graph, data: &Value) -> Result<T>;
}

/// Converter from one value kind backed by a plain function
pub struct FnConverter<T, F> {
    from: ValueKind,
    f: F,
    _target: PhantomData<fn() -> T>,
}

/// Build a converter accepting `from` values
///
/// ```
/// use strand_core::{converter, Converter, Value, ValueKind};
///
/// let to_text = converter(ValueKind::Bool, |v: &Value| v.as_bool().map(|b| b.to_string()));
/// assert!(to_text.can_convert(ValueKind::Bool));
/// ```
pub fn converter<T, F>(from: ValueKind, f: F) -> FnConverter<T, F>
where
    F: Fn(&Value) -> Option<T> + Send + Sync,
{
    FnConverter {
        from,
        f,
        _target: PhantomData,
    }
}

impl<T, F> Converter<T> for FnConverter<T, F>
where
    F: Fn(&Value) -> Option<T> + Send + Sync,
{
    fn can_convert(&self, kind: ValueKind) -> bool {
        kind == self.from
    }

    fn convert(&self, _graph: &Graph, data: &Value) -> Result<T> {
        (self.f)(data).ok_or(Error::Conversion {
            from: data.kind(),
            to: type_name::<T>(),
        })
    }
}

fn boxed<T, F>(from: ValueKind, f: F) -> Arc<dyn Converter<T>>
where
    T: 'static,
    F: Fn(&Value) -> Option<T> + Send + Sync + 'static,
{
    Arc::new(converter(from, f))
}

pub(crate) fn no_converters<T>() -> Vec<Arc<dyn Converter<T>>> {
    Vec::new()
}

pub(crate) fn bool_converters() -> Vec<Arc<dyn Converter<bool>>> {
    vec![
        boxed(ValueKind::Byte, |v| v.as_byte().map(|b| b != 0)),
        boxed(ValueKind::Int, |v| v.as_int().map(|i| i != 0)),
        boxed(ValueKind::Long, |v| v.as_long().map(|l| l != 0)),
    ]
}

pub(crate) fn int_converters() -> Vec<Arc<dyn Converter<i32>>> {
    vec![
        boxed(ValueKind::Long, |v| v.as_long().and_then(|l| i32::try_from(l).ok())),
        boxed(ValueKind::Byte, |v| v.as_byte().map(i32::from)),
    ]
}

pub(crate) fn long_converters() -> Vec<Arc<dyn Converter<i64>>> {
    vec![
        boxed(ValueKind::Int, |v| v.as_int().map(i64::from)),
        boxed(ValueKind::Byte, |v| v.as_byte().map(i64::from)),
    ]
}

pub(crate) fn float_converters() -> Vec<Arc<dyn Converter<f32>>> {
    vec![
        boxed(ValueKind::Int, |v| v.as_int().map(|i| i as f32)),
        boxed(ValueKind::Long, |v| v.as_long().map(|l| l as f32)),
        boxed(ValueKind::Double, |v| v.as_double().map(|d| d as f32)),
    ]
}

pub(crate) fn double_converters() -> Vec<Arc<dyn Converter<f64>>> {
    vec![
        boxed(ValueKind::Int, |v| v.as_int().map(f64::from)),
        boxed(ValueKind::Long, |v| v.as_long().map(|l| l as f64)),
        boxed(ValueKind::Float, |v| v.as_float().map(f64::from)),
    ]
}

pub(crate) fn bytes_converters() -> Vec<Arc<dyn Converter<Vec<u8>>>> {
    vec![boxed(ValueKind::String, |v| {
        v.as_str().map(|s| s.as_bytes().to_vec())
    })]
}

pub(crate) fn id_converters() -> Vec<Arc<dyn Converter<Id>>> {
    vec![
        boxed(ValueKind::String, |v| v.as_str().and_then(|s| Id::parse(s).ok())),
        boxed(ValueKind::Long, |v| {
            v.as_long()
                .and_then(|l| u64::try_from(l).ok())
                .map(Id::from_u64)
        }),
        boxed(ValueKind::Bytes, |v| v.as_bytes().and_then(|b| Id::from_bytes(b).ok())),
    ]
}

pub(crate) fn address_converters() -> Vec<Arc<dyn Converter<Address>>> {
    vec![
        boxed(ValueKind::String, |v| {
            v.as_str().and_then(|s| Address::parse(s).ok())
        }),
        boxed(ValueKind::Bytes, |v| {
            v.as_bytes().and_then(|b| Address::from_bytes(b).ok())
        }),
        boxed(ValueKind::Id, |v| v.as_id().map(Address::from)),
    ]
}

pub(crate) fn datetime_converters() -> Vec<Arc<dyn Converter<NaiveDateTime>>> {
    vec![
        boxed(ValueKind::String, |v| v.as_str().and_then(parse_datetime)),
        boxed(ValueKind::Long, |v| {
            v.as_long()
                .and_then(|secs| DateTime::from_timestamp(secs, 0))
                .map(|dt| dt.naive_utc())
        }),
    ]
}

fn parse_datetime(text: &str) -> Option<NaiveDateTime> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt.naive_utc());
    }
    NaiveDateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S%.f")
        .or_else(|_| NaiveDateTime::parse_from_str(text, "%Y-%m-%d %H:%M:%S%.f"))
        .ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn first<T>(converters: &[Arc<dyn Converter<T>>], data: &Value) -> Option<T> {
        let graph = Graph::new();
        converters
            .iter()
            .find(|c| c.can_convert(data.kind()))
            .and_then(|c| c.convert(&graph, data).ok())
    }

    #[test]
    fn test_numeric_widening() {
        assert_eq!(first(&float_converters(), &Value::Int(3)), Some(3.0));
        assert_eq!(first(&float_converters(), &Value::Long(4)), Some(4.0));
        assert_eq!(first(&double_converters(), &Value::Float(0.5)), Some(0.5));
        assert_eq!(first(&long_converters(), &Value::Int(-2)), Some(-2));
    }

    #[test]
    fn test_long_to_int_checks_range() {
        assert_eq!(first(&int_converters(), &Value::Long(42)), Some(42));
        assert_eq!(first(&int_converters(), &Value::Long(i64::MAX)), None);
    }

    #[test]
    fn test_string_to_id_and_address() {
        assert_eq!(first(&id_converters(), &Value::from("7B")), Some(Id::from_u64(123)));
        assert_eq!(
            first(&address_converters(), &Value::from("01/02")),
            Some(Address::new(vec![Id::from_u64(1), Id::from_u64(2)]))
        );
    }

    #[test]
    fn test_string_to_datetime() {
        let parsed = first(&datetime_converters(), &Value::from("2024-03-01T12:30:00Z"));
        assert_eq!(parsed.map(|dt| dt.to_string()), Some("2024-03-01 12:30:00".to_string()));
        let parsed = first(&datetime_converters(), &Value::from("2024-03-01 12:30:00"));
        assert!(parsed.is_some());
    }

    #[test]
    fn test_no_string_to_bool() {
        assert!(bool_converters()
            .iter()
            .all(|c| !c.can_convert(ValueKind::String)));
    }

    #[test]
    fn test_fn_converter_reports_failure() {
        let graph = Graph::new();
        let c = converter(ValueKind::String, |v: &Value| {
            v.as_str().and_then(|s| s.parse::<i32>().ok())
        });
        assert_eq!(c.convert(&graph, &Value::from("12")).unwrap(), 12);
        assert!(matches!(
            c.convert(&graph, &Value::from("x")),
            Err(Error::Conversion { from: ValueKind::String, .. })
        ));
    }
}
