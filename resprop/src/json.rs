//! JSON bridge.
//!
//! IaC front-ends feed attribute data as JSON-shaped documents and expect
//! state snapshots back in the same shape. Deferred values and non-finite
//! floats have no JSON form and are rejected.

use crate::context::Resource;
use crate::engine::PropertyEngine;
use crate::error::{PropertyError, PropertyResult};
use crate::property_set::PropertySet;
use crate::values::Value;

pub fn json_to_value(json: &serde_json::Value) -> Value {
    match json {
        serde_json::Value::Null => Value::Nil,
        serde_json::Value::Bool(b) => Value::Boolean(*b),
        serde_json::Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Value::Integer(i)
            } else if let Some(f) = n.as_f64() {
                Value::Float(f)
            } else {
                Value::Nil
            }
        }
        serde_json::Value::String(s) => Value::String(s.clone()),
        serde_json::Value::Array(arr) => Value::Vector(arr.iter().map(json_to_value).collect()),
        serde_json::Value::Object(map) => {
            let mut out = std::collections::HashMap::new();
            for (k, v) in map.iter() {
                out.insert(k.clone(), json_to_value(v));
            }
            Value::Map(out)
        }
    }
}

pub fn value_to_json(value: &Value) -> PropertyResult<serde_json::Value> {
    match value {
        Value::Nil => Ok(serde_json::Value::Null),
        Value::Boolean(b) => Ok(serde_json::Value::Bool(*b)),
        Value::Integer(i) => Ok(serde_json::Value::Number((*i).into())),
        Value::Float(f) => serde_json::Number::from_f64(*f)
            .map(serde_json::Value::Number)
            .ok_or_else(|| PropertyError::Config("cannot serialize non-finite float".to_string())),
        Value::String(s) => Ok(serde_json::Value::String(s.clone())),
        Value::Vector(vec) => {
            let mut out = Vec::with_capacity(vec.len());
            for item in vec {
                out.push(value_to_json(item)?);
            }
            Ok(serde_json::Value::Array(out))
        }
        Value::Map(map) => {
            let mut obj = serde_json::Map::new();
            for (key, val) in map.iter() {
                obj.insert(key.clone(), value_to_json(val)?);
            }
            Ok(serde_json::Value::Object(obj))
        }
        Value::Deferred(d) => Err(PropertyError::Config(format!(
            "cannot serialize unresolved deferred value {}",
            d
        ))),
    }
}

impl PropertyEngine {
    /// Bulk-sets declared properties from a JSON object. Unknown keys are
    /// a configuration error; values go through the normal set path
    /// (coercion and validation included).
    pub fn apply_json(
        &self,
        set: &PropertySet,
        resource: &dyn Resource,
        json: &serde_json::Value,
    ) -> PropertyResult<()> {
        let object = json.as_object().ok_or_else(|| {
            PropertyError::Config(format!(
                "expected a JSON object of properties for resource {}, got {}",
                set.type_name(),
                json
            ))
        })?;
        for (key, raw) in object {
            let definition = set.get(key).ok_or_else(|| {
                PropertyError::Config(format!(
                    "unknown property {} for resource {}",
                    key,
                    set.type_name()
                ))
            })?;
            self.set(definition, resource, json_to_value(raw))?;
        }
        Ok(())
    }

    /// Snapshot of the resolved desired-state properties as a JSON object.
    /// Opaque properties without a readable value are skipped.
    pub fn desired_state_json(
        &self,
        set: &PropertySet,
        resource: &dyn Resource,
    ) -> PropertyResult<serde_json::Value> {
        self.snapshot(resource, set.desired_state_properties())
    }

    /// Snapshot of the identity (natural key) properties as a JSON object.
    pub fn identity_json(
        &self,
        set: &PropertySet,
        resource: &dyn Resource,
    ) -> PropertyResult<serde_json::Value> {
        self.snapshot(resource, set.identity_properties())
    }

    fn snapshot<'a>(
        &self,
        resource: &dyn Resource,
        definitions: impl Iterator<Item = &'a std::rc::Rc<crate::definition::PropertyDefinition>>,
    ) -> PropertyResult<serde_json::Value> {
        let mut obj = serde_json::Map::new();
        for definition in definitions {
            match self.get(definition, resource) {
                Ok(value) => {
                    obj.insert(definition.name().to_string(), value_to_json(&value)?);
                }
                Err(PropertyError::Config(_)) if definition.storage_slot().is_none() => continue,
                Err(e) => return Err(e),
            }
        }
        Ok(serde_json::Value::Object(obj))
    }
}
