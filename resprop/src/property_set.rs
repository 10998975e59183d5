// Ordered property registry for one resource type.

use std::rc::Rc;

use indexmap::IndexMap;
use itertools::Itertools;

use crate::definition::PropertyDefinition;

/// The properties declared on a resource type, in declaration order.
///
/// Order matters twice: identity enumeration must be deterministic, and
/// the default-override precedence of derivation follows declaration
/// order. Definitions are `Rc`-shared: one set serves every instance of
/// the type.
#[derive(Debug, Clone)]
pub struct PropertySet {
    type_name: String,
    properties: IndexMap<String, Rc<PropertyDefinition>>,
}

impl PropertySet {
    pub fn new(type_name: impl Into<String>) -> Self {
        PropertySet {
            type_name: type_name.into(),
            properties: IndexMap::new(),
        }
    }

    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    /// Registers a definition under its own name. Redeclaring replaces the
    /// previous definition, keeping its original position.
    pub fn declare(&mut self, definition: PropertyDefinition) -> Rc<PropertyDefinition> {
        let shared = Rc::new(definition);
        self.properties
            .insert(shared.name().to_string(), shared.clone());
        shared
    }

    pub fn get(&self, name: &str) -> Option<&Rc<PropertyDefinition>> {
        self.properties.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.properties.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.properties.len()
    }

    pub fn is_empty(&self) -> bool {
        self.properties.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Rc<PropertyDefinition>> {
        self.properties.values()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.properties.keys().map(|k| k.as_str())
    }

    /// Natural-key properties, in declaration order.
    pub fn identity_properties(&self) -> impl Iterator<Item = &Rc<PropertyDefinition>> {
        self.iter().filter(|d| d.is_identity())
    }

    /// Target-state properties, in declaration order.
    pub fn desired_state_properties(&self) -> impl Iterator<Item = &Rc<PropertyDefinition>> {
        self.iter().filter(|d| d.is_desired_state())
    }

    /// `"file(path, mode, owner)"` style summary for diagnostics.
    pub fn describe(&self) -> String {
        format!("{}({})", self.type_name, self.names().join(", "))
    }
}
