//! Model properties stored with their JSON text
//!
//! The text is kept next to the model and refreshed on every write, so
//! comparing two values compares their serialized form.

use super::{PropertyCore, PropertyKind};
use crate::convert::Converter;
use crate::error::{Error, Result};
use crate::graph::Graph;
use crate::identity::{EntityId, PropertyHandle, PropertyId};
use crate::value::{Value, ValueKind};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

/// Types a [`JsonProperty`] can hold
pub trait JsonValue: Serialize + DeserializeOwned + Clone + Default + Send + Sync + 'static {}

impl<T> JsonValue for T where T: Serialize + DeserializeOwned + Clone + Default + Send + Sync + 'static {}

/// A model together with its JSON text
#[derive(Clone)]
pub struct JsonModel<M> {
    model: M,
    json: String,
}

impl<M: JsonValue> JsonModel<M> {
    pub fn new(model: M) -> Result<Self> {
        let json = serde_json::to_string(&model).map_err(|e| Error::Codec(e.to_string()))?;
        Ok(Self { model, json })
    }

    /// Parse JSON text; blank input yields the default model
    pub fn from_json(text: &str) -> Result<Self> {
        if text.trim().is_empty() {
            return Self::new(M::default());
        }
        let model: M = serde_json::from_str(text).map_err(|e| Error::Codec(e.to_string()))?;
        Self::new(model)
    }

    pub fn model(&self) -> &M {
        &self.model
    }

    pub fn json(&self) -> &str {
        &self.json
    }

    pub fn into_model(self) -> M {
        self.model
    }

    /// Deep copy of the model through its JSON text
    pub fn clone_model(&self) -> Result<M> {
        serde_json::from_str(&self.json).map_err(|e| Error::Codec(e.to_string()))
    }
}

impl<M: JsonValue> Default for JsonModel<M> {
    fn default() -> Self {
        let model = M::default();
        let json = serde_json::to_string(&model).unwrap_or_default();
        Self { model, json }
    }
}

impl<M> PartialEq for JsonModel<M> {
    fn eq(&self, other: &Self) -> bool {
        self.json == other.json
    }
}

impl<M> fmt::Debug for JsonModel<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "JsonModel({})", self.json)
    }
}

/// Property holding a serde model
pub struct JsonProperty<M: JsonValue> {
    core: PropertyCore<JsonModel<M>>,
}

struct JsonConverter<M> {
    _model: PhantomData<fn() -> M>,
}

impl<M: JsonValue> Converter<JsonModel<M>> for JsonConverter<M> {
    fn can_convert(&self, kind: ValueKind) -> bool {
        matches!(kind, ValueKind::String | ValueKind::Bytes)
    }

    fn convert(&self, _graph: &Graph, data: &Value) -> Result<JsonModel<M>> {
        match data {
            Value::String(text) => JsonModel::from_json(text),
            Value::Bytes(bytes) => {
                let text = std::str::from_utf8(bytes).map_err(|e| Error::Codec(e.to_string()))?;
                JsonModel::from_json(text)
            }
            other => Err(Error::Conversion {
                from: other.kind(),
                to: std::any::type_name::<M>(),
            }),
        }
    }
}

impl<M: JsonValue> PropertyKind for JsonProperty<M> {
    type Value = JsonModel<M>;

    fn create(id: PropertyId, name: &str, owner: EntityId) -> Self {
        let converter: Arc<dyn Converter<JsonModel<M>>> = Arc::new(JsonConverter::<M> {
            _model: PhantomData,
        });
        Self {
            core: PropertyCore::new(id, name, owner, JsonModel::default()).with_converters(vec![converter]),
        }
    }

    fn core(&self) -> &PropertyCore<JsonModel<M>> {
        &self.core
    }

    fn core_mut(&mut self) -> &mut PropertyCore<JsonModel<M>> {
        &mut self.core
    }

    fn value_kind() -> ValueKind {
        ValueKind::Model
    }

    fn from_data(_data: &Value) -> Option<JsonModel<M>> {
        None
    }

    fn to_data(_graph: &Graph, value: &JsonModel<M>) -> Result<Value> {
        Ok(Value::String(value.json.clone()))
    }
}

impl Graph {
    /// Current model of a JSON property
    pub fn model<M: JsonValue>(&self, handle: PropertyHandle<JsonProperty<M>>) -> Result<M> {
        self.with_value(handle, |value| value.model.clone())
    }

    pub fn set_model<M: JsonValue>(&mut self, handle: PropertyHandle<JsonProperty<M>>, model: M) -> Result<()> {
        let value = JsonModel::new(model)?;
        self.set(handle, value)
    }

    /// Edit a copy of the model and write it back explicitly
    pub fn modify_model<M: JsonValue>(
        &mut self,
        handle: PropertyHandle<JsonProperty<M>>,
        f: impl FnOnce(&mut M),
    ) -> Result<()> {
        let mut model = self.model(handle)?;
        f(&mut model);
        self.set_model(handle, model)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::address::Id;
    use serde::Deserialize;

    #[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
    struct Cargo {
        crates: u32,
        label: String,
    }

    #[test]
    fn test_model_json_cache() {
        let model = JsonModel::new(Cargo {
            crates: 2,
            label: "ore".into(),
        })
        .unwrap();
        assert_eq!(model.json(), r#"{"crates":2,"label":"ore"}"#);
        assert_eq!(model.clone_model().unwrap(), *model.model());
        assert_eq!(JsonModel::<Cargo>::from_json("  ").unwrap(), JsonModel::default());
        assert!(matches!(JsonModel::<Cargo>::from_json("{"), Err(Error::Codec(_))));
    }

    #[test]
    fn test_json_property_data() {
        let mut graph = Graph::new();
        let e = graph.create_entity(Id::from_u64(1), "e");
        let p = graph.add_property::<JsonProperty<Cargo>>(e, "cargo").unwrap();
        graph
            .set_data(p, &Value::from(r#"{"crates":5,"label":"tin"}"#))
            .unwrap();
        assert_eq!(graph.model(p).unwrap().crates, 5);

        graph.modify_model(p, |cargo| cargo.crates += 1).unwrap();
        assert_eq!(graph.data(p).unwrap(), Value::from(r#"{"crates":6,"label":"tin"}"#));

        graph.set_data(p, &Value::Bytes(Vec::new())).unwrap();
        assert!(graph.is_default(p).unwrap());
        assert!(graph.set_data(p, &Value::Int(1)).is_err());
    }
}
