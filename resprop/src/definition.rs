//! Property definitions.
//!
//! A [`PropertyDefinition`] is the immutable specification of one named,
//! typed attribute on a resource type: defaulting strategy, coercion rule,
//! validation rule-set, classification flags and storage slot.
//! Construction and derivation live on [`crate::engine::PropertyEngine`],
//! which owns the validator and signal sink the construction rules need.

use std::fmt;
use std::rc::Rc;

use crate::context::Resource;
use crate::error::{PropertyError, PropertyResult};
use crate::validation::RuleSet;
use crate::values::{DeferredValue, Value};

/// The defaulting strategy of a property. Exactly one is active at a time.
#[derive(Debug, Clone, PartialEq)]
pub enum DefaultKind {
    /// No default; an unset read yields nil (or fails when required).
    None,
    /// A fixed value, resolvable at declaration time.
    Static(Value),
    /// A thunk evaluated in resource context on every fresh read.
    Thunk(DeferredValue),
    /// The resource's instance name.
    NameProperty,
}

impl DefaultKind {
    pub fn is_none(&self) -> bool {
        matches!(self, DefaultKind::None)
    }
}

/// A coercion rule: transforms raw input into canonical form before
/// validation.
#[derive(Clone)]
pub struct Coercion {
    description: Option<String>,
    rule: Rc<dyn Fn(Option<&dyn Resource>, &str, Value) -> PropertyResult<Value>>,
}

impl Coercion {
    /// A context-free coercion, usable during static default resolution.
    pub fn new(rule: impl Fn(Value) -> PropertyResult<Value> + 'static) -> Self {
        Coercion {
            description: None,
            rule: Rc::new(move |_ctx, _property, value| rule(value)),
        }
    }

    /// A coercion that needs the resource. Without a context it raises
    /// `CannotValidateStatically`, which signals "resolve later", not
    /// "broken".
    pub fn in_context(rule: impl Fn(&dyn Resource, Value) -> PropertyResult<Value> + 'static) -> Self {
        Coercion {
            description: None,
            rule: Rc::new(move |ctx, property, value| match ctx {
                Some(resource) => rule(resource, value),
                None => Err(PropertyError::cannot_validate_statically(
                    property,
                    format!("coercion of {} requires resource context", property),
                )),
            }),
        }
    }

    pub fn described(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn apply(
        &self,
        ctx: Option<&dyn Resource>,
        property: &str,
        value: Value,
    ) -> PropertyResult<Value> {
        (self.rule)(ctx, property, value)
    }
}

impl fmt::Debug for Coercion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.description {
            Some(d) => write!(f, "Coercion({})", d),
            None => write!(f, "Coercion(..)"),
        }
    }
}

/// Which default mechanism an options call declared. Declaration order is
/// the tie-break when a static default and a name-property flag conflict.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum DefaultMechanism {
    Static,
    Thunk,
    NameProperty,
}

/// Builder-style option bag for declaring (and deriving) properties.
///
/// Records the order in which default mechanisms were declared; the engine
/// resolves conflicts by that order, not by value.
#[derive(Debug, Clone)]
pub struct PropertyOptions {
    pub(crate) declaring_type: Option<String>,
    pub(crate) storage_slot: Option<String>,
    pub(crate) opaque: bool,
    pub(crate) default_value: Option<Value>,
    pub(crate) default_thunk: Option<DeferredValue>,
    pub(crate) name_property: Option<bool>,
    pub(crate) name_attribute: Option<bool>,
    pub(crate) identity: Option<bool>,
    pub(crate) desired_state: Option<bool>,
    pub(crate) required: Option<bool>,
    pub(crate) coerce: Option<Coercion>,
    pub(crate) rules: Option<RuleSet>,
    pub(crate) mechanism_order: Vec<DefaultMechanism>,
}

impl PropertyOptions {
    pub fn new() -> Self {
        PropertyOptions {
            declaring_type: None,
            storage_slot: None,
            opaque: false,
            default_value: None,
            default_thunk: None,
            name_property: None,
            name_attribute: None,
            identity: None,
            desired_state: None,
            required: None,
            coerce: None,
            rules: None,
            mechanism_order: Vec::new(),
        }
    }

    /// Resource type this property is declared on (diagnostics only).
    pub fn declaring_type(mut self, type_name: impl Into<String>) -> Self {
        self.declaring_type = Some(type_name.into());
        self
    }

    /// Overrides the storage slot (defaults to the property name).
    pub fn storage_slot(mut self, slot: impl Into<String>) -> Self {
        self.storage_slot = Some(slot.into());
        self.opaque = false;
        self
    }

    /// Declares the property storage-less: reads and writes go through the
    /// resource's custom accessors instead of engine-managed storage.
    pub fn opaque(mut self) -> Self {
        self.opaque = true;
        self.storage_slot = None;
        self
    }

    /// A static default value.
    pub fn default(mut self, value: impl Into<Value>) -> Self {
        self.default_value = Some(value.into());
        self.record_mechanism(DefaultMechanism::Static);
        self
    }

    /// A lazy default, computed in resource context on first read.
    pub fn default_lazy(mut self, thunk: DeferredValue) -> Self {
        self.default_thunk = Some(thunk);
        self.record_mechanism(DefaultMechanism::Thunk);
        self
    }

    /// Defaults the property to the resource's instance name.
    pub fn name_property(mut self, enabled: bool) -> Self {
        self.name_property = Some(enabled);
        if enabled {
            self.record_mechanism(DefaultMechanism::NameProperty);
        }
        self
    }

    /// Legacy alias for `name_property`. Kept for declarations written
    /// against the old option name; disagreement with the modern flag is a
    /// construction error.
    pub fn name_attribute(mut self, enabled: bool) -> Self {
        self.name_attribute = Some(enabled);
        if enabled {
            self.record_mechanism(DefaultMechanism::NameProperty);
        }
        self
    }

    /// Marks the property as part of the resource's natural key.
    pub fn identity(mut self, enabled: bool) -> Self {
        self.identity = Some(enabled);
        self
    }

    /// Marks the property as part of target-state comparison (default true).
    pub fn desired_state(mut self, enabled: bool) -> Self {
        self.desired_state = Some(enabled);
        self
    }

    pub fn required(mut self, enabled: bool) -> Self {
        self.required = Some(enabled);
        self
    }

    pub fn coerce(mut self, coercion: Coercion) -> Self {
        self.coerce = Some(coercion);
        self
    }

    pub fn rules(mut self, rules: RuleSet) -> Self {
        self.rules = Some(rules);
        self
    }

    fn record_mechanism(&mut self, mechanism: DefaultMechanism) {
        if !self.mechanism_order.contains(&mechanism) {
            self.mechanism_order.push(mechanism);
        }
    }

    pub(crate) fn has_default_mechanism(&self) -> bool {
        self.default_value.is_some()
            || self.default_thunk.is_some()
            || self.name_property == Some(true)
            || self.name_attribute == Some(true)
    }

    /// Merges overrides for derivation. If the overrides declare any
    /// default mechanism, all three mechanisms of the base are stripped
    /// first so the override fully replaces default behavior.
    pub(crate) fn merge(mut self, overrides: PropertyOptions) -> PropertyOptions {
        if overrides.has_default_mechanism() {
            self.default_value = None;
            self.default_thunk = None;
            self.name_property = None;
            self.name_attribute = None;
            self.mechanism_order.clear();
        }

        if overrides.default_value.is_some() {
            self.default_value = overrides.default_value;
        }
        if overrides.default_thunk.is_some() {
            self.default_thunk = overrides.default_thunk;
        }
        if overrides.name_property.is_some() {
            self.name_property = overrides.name_property;
        }
        if overrides.name_attribute.is_some() {
            self.name_attribute = overrides.name_attribute;
        }
        for mechanism in overrides.mechanism_order {
            if !self.mechanism_order.contains(&mechanism) {
                self.mechanism_order.push(mechanism);
            }
        }

        if overrides.declaring_type.is_some() {
            self.declaring_type = overrides.declaring_type;
        }
        if overrides.storage_slot.is_some() {
            self.storage_slot = overrides.storage_slot;
        }
        if overrides.opaque {
            self.opaque = true;
            self.storage_slot = None;
        }
        if overrides.identity.is_some() {
            self.identity = overrides.identity;
        }
        if overrides.desired_state.is_some() {
            self.desired_state = overrides.desired_state;
        }
        if overrides.required.is_some() {
            self.required = overrides.required;
        }
        if overrides.coerce.is_some() {
            self.coerce = overrides.coerce;
        }
        if overrides.rules.is_some() {
            self.rules = overrides.rules;
        }
        self
    }
}

/// The immutable specification of one property.
///
/// Created once at resource-type declaration time. The only mutation after
/// construction is the engine caching the statically-resolved default
/// before the definition is shared.
#[derive(Debug, Clone)]
pub struct PropertyDefinition {
    name: String,
    declaring_type: Option<String>,
    storage_slot: Option<String>,
    default: DefaultKind,
    identity: bool,
    desired_state: bool,
    required: bool,
    name_property: bool,
    coerce: Option<Coercion>,
    rules: RuleSet,
    cached_static_default: Option<Value>,
    options: PropertyOptions,
}

impl PropertyDefinition {
    pub(crate) fn from_options(
        name: String,
        options: PropertyOptions,
        default: DefaultKind,
        name_property: bool,
    ) -> Self {
        let storage_slot = if options.opaque {
            None
        } else {
            Some(options.storage_slot.clone().unwrap_or_else(|| name.clone()))
        };
        PropertyDefinition {
            declaring_type: options.declaring_type.clone(),
            identity: options.identity.unwrap_or(false),
            desired_state: options.desired_state.unwrap_or(true),
            required: options.required.unwrap_or(false),
            coerce: options.coerce.clone(),
            rules: options.rules.clone().unwrap_or_default(),
            cached_static_default: None,
            name,
            storage_slot,
            default,
            name_property,
            options,
        }
    }

    pub(crate) fn set_cached_static_default(&mut self, value: Value) {
        self.cached_static_default = Some(value);
    }

    pub(crate) fn options(&self) -> &PropertyOptions {
        &self.options
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn declaring_type(&self) -> Option<&str> {
        self.declaring_type.as_deref()
    }

    /// The storage slot, or `None` for opaque properties.
    pub fn storage_slot(&self) -> Option<&str> {
        self.storage_slot.as_deref()
    }

    pub fn default(&self) -> &DefaultKind {
        &self.default
    }

    pub fn has_default(&self) -> bool {
        !self.default.is_none()
    }

    pub fn is_identity(&self) -> bool {
        self.identity
    }

    pub fn is_desired_state(&self) -> bool {
        self.desired_state
    }

    pub fn is_required(&self) -> bool {
        self.required
    }

    pub fn is_name_property(&self) -> bool {
        self.name_property
    }

    pub fn coercion(&self) -> Option<&Coercion> {
        self.coerce.as_ref()
    }

    pub fn rules(&self) -> &RuleSet {
        &self.rules
    }

    /// The construction-time resolved default, when resolution needed no
    /// resource context.
    pub fn cached_static_default(&self) -> Option<&Value> {
        self.cached_static_default.as_ref()
    }

    /// Human-readable identification for diagnostics.
    pub fn describe(&self) -> String {
        format!(
            "{} of resource {}",
            self.name,
            self.declaring_type.as_deref().unwrap_or("<standalone>")
        )
    }
}
