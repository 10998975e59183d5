//! Resource Context
//!
//! Defines the trait that bridges the property engine (which owns
//! resolution policy) and the resource instances it operates on (which own
//! state and identity). The engine never constructs resources; the
//! surrounding resource DSL hands them in.

use std::fmt;

use crate::error::{PropertyError, PropertyResult};
use crate::state::PropertyState;
use crate::values::Value;

/// The contract between the property engine and a resource instance.
///
/// Most properties live in the engine-managed [`PropertyState`]. Opaque
/// properties (those declared without a storage slot) delegate entirely to
/// `custom_get`/`custom_set`; the defaults reject such calls so only
/// resources that opt in carry custom accessors.
pub trait Resource: fmt::Debug {
    /// The resource type name, e.g. `"file"` (diagnostics and snapshots).
    fn type_name(&self) -> &str;

    /// The instance name, e.g. `"/etc/motd"`. Backs name-property defaults.
    fn resource_name(&self) -> &str;

    /// The engine-managed presence/value storage for this instance.
    fn state(&self) -> &PropertyState;

    /// Reader for opaque properties.
    fn custom_get(&self, property: &str) -> PropertyResult<Value> {
        Err(PropertyError::Config(format!(
            "resource {} has no custom reader for property {}",
            self.type_name(),
            property
        )))
    }

    /// Writer for opaque properties. Returns the stored value.
    fn custom_set(&self, property: &str, _value: Value) -> PropertyResult<Value> {
        Err(PropertyError::Config(format!(
            "resource {} has no custom writer for property {}",
            self.type_name(),
            property
        )))
    }
}

/// A plain resource instance: a type name, an instance name, and empty
/// property state. Sufficient for hosts without custom accessors.
#[derive(Debug)]
pub struct SimpleResource {
    type_name: String,
    name: String,
    state: PropertyState,
}

impl SimpleResource {
    pub fn new(type_name: impl Into<String>, name: impl Into<String>) -> Self {
        SimpleResource {
            type_name: type_name.into(),
            name: name.into(),
            state: PropertyState::new(),
        }
    }
}

impl Resource for SimpleResource {
    fn type_name(&self) -> &str {
        &self.type_name
    }

    fn resource_name(&self) -> &str {
        &self.name
    }

    fn state(&self) -> &PropertyState {
        &self.state
    }
}
