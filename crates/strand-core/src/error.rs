//! Error types for strand-core

use crate::value::ValueKind;
use thiserror::Error;

/// Core error type
///
/// Every fallible graph operation returns this; variants carry the names of
/// the entity, component or property that failed so callers can report them
/// without holding on to handles.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    // Structural
    #[error("Entity '{parent}' already has a child with id {id}")]
    DuplicateChild { parent: String, id: String },

    #[error("Cannot parent '{entity}': {reason}")]
    InvalidParent { entity: String, reason: String },

    #[error("Component {component} cannot require itself")]
    SelfReference { component: &'static str },

    #[error("Component {component} already exists on '{entity}'")]
    ComponentExists {
        component: &'static str,
        entity: String,
    },

    // State
    #[error("Component {component} is already connecting to '{entity}'")]
    AlreadyConnected {
        component: &'static str,
        entity: String,
    },

    #[error("Component {component} is not connected to '{entity}'")]
    NotConnected { component: String, entity: String },

    #[error("Component {component} on '{entity}' is still required by {required_by}")]
    StillRequired {
        component: &'static str,
        entity: String,
        required_by: String,
    },

    #[error("Component {component} on '{entity}' is busy")]
    Busy {
        component: &'static str,
        entity: String,
    },

    // Resolution
    #[error("Component {component} requires {required} which is missing on '{entity}'")]
    MissingComponent {
        component: &'static str,
        required: &'static str,
        entity: String,
    },

    #[error("Property '{property}' is missing on '{entity}'")]
    MissingProperty { property: String, entity: String },

    #[error("Property '{property}' is a {found}, expected {expected}")]
    PropertyTypeMismatch {
        property: String,
        expected: &'static str,
        found: &'static str,
    },

    #[error("Entity not found: {0}")]
    EntityNotFound(String),

    #[error("Property not found: {0}")]
    PropertyNotFound(String),

    // Conversion
    #[error("Cannot convert {from} to {to}")]
    Conversion { from: ValueKind, to: &'static str },

    #[error("Property '{property}' has no converter from {from} to {to}")]
    NoConverter {
        property: String,
        from: ValueKind,
        to: &'static str,
    },

    #[error("Unsupported link between properties of different types: '{target}' ({to}) <- '{origin}' ({from})")]
    UnsupportedLink {
        target: String,
        origin: String,
        from: &'static str,
        to: &'static str,
    },

    #[error("Arithmetic on '{property}' is out of range")]
    Overflow { property: String },

    #[error("Codec error: {0}")]
    Codec(String),

    #[error("Invalid id: {0}")]
    InvalidId(String),

    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    // Reference
    #[error("Address {0} does not resolve to a live entity")]
    UnresolvedAddress(String),

    // Collections
    #[error("'{property}' already contains {entry}")]
    DuplicateEntry { property: String, entry: String },

    #[error("'{property}' does not contain {entry}")]
    MissingEntry { property: String, entry: String },

    #[error("Rejected: {0}")]
    Rejected(String),

    #[error("No unused id found after {0} attempts")]
    IdSpaceExhausted(usize),

    #[error("Configuration error: {0}")]
    Config(String),
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_name_the_parts() {
        let err = Error::StillRequired {
            component: "Engine",
            entity: "ship".into(),
            required_by: "Thruster".into(),
        };
        assert_eq!(
            err.to_string(),
            "Component Engine on 'ship' is still required by Thruster"
        );

        let err = Error::NoConverter {
            property: "speed".into(),
            from: ValueKind::Bool,
            to: "f32",
        };
        assert_eq!(err.to_string(), "Property 'speed' has no converter from bool to f32");
    }

    #[test]
    fn test_error_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Error>();
    }
}
