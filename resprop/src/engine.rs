//! The resolution engine.
//!
//! Orchestrates the whole property contract: construction and derivation
//! of definitions, coercion/validation composition, the get state machine
//! (explicit value, lazy default, static default, required-error, unset),
//! set, presence, reset and the dual-mode get-or-set surface.
//!
//! The engine owns no resource state; it reads and writes the
//! [`PropertyState`](crate::state::PropertyState) of whichever resource it
//! is handed, and calls into two injected capabilities: the value
//! validator and the deprecation sink.

use std::rc::Rc;

use crate::context::Resource;
use crate::definition::{DefaultKind, DefaultMechanism, PropertyDefinition, PropertyOptions};
use crate::error::{PropertyError, PropertyResult};
use crate::signals::{Deprecation, DeprecationSink, LogSink};
use crate::validation::{RuleValidator, ValueValidator};
use crate::values::Value;

#[derive(Debug, Clone)]
pub struct PropertyEngine {
    validator: Rc<dyn ValueValidator>,
    signals: Rc<dyn DeprecationSink>,
}

impl Default for PropertyEngine {
    fn default() -> Self {
        PropertyEngine::new()
    }
}

impl PropertyEngine {
    /// An engine with the bundled rule validator and log-based signal sink.
    pub fn new() -> Self {
        PropertyEngine {
            validator: Rc::new(RuleValidator::new()),
            signals: Rc::new(LogSink::new()),
        }
    }

    pub fn with_parts(validator: Rc<dyn ValueValidator>, signals: Rc<dyn DeprecationSink>) -> Self {
        PropertyEngine { validator, signals }
    }

    // ---- construction & derivation ----

    /// Builds a [`PropertyDefinition`] from options.
    ///
    /// Enforces the mutual exclusion of the three default mechanisms, with
    /// one tolerated conflict: a static default plus a name-property flag
    /// resolves by declaration order (first declared wins) and emits a
    /// deprecation signal for the dropped one. Attempts static resolution
    /// of the default; a `CannotValidateStatically` outcome skips caching
    /// silently, because such defaults are resolved per instance.
    pub fn define(&self, name: &str, options: PropertyOptions) -> PropertyResult<PropertyDefinition> {
        let mut options = options;

        let mut name_property = match (options.name_property, options.name_attribute) {
            (Some(modern), Some(legacy)) if modern != legacy => {
                return Err(PropertyError::Construction(format!(
                    "property {} declares name_property ({}) and name_attribute ({}) with different values",
                    name, modern, legacy
                )))
            }
            (Some(modern), _) => modern,
            (None, Some(legacy)) => legacy,
            (None, None) => false,
        };

        let has_static = options.default_value.is_some();
        let has_thunk = options.default_thunk.is_some();

        if has_static && has_thunk {
            return Err(PropertyError::Construction(format!(
                "property {} declares both a static and a lazy default",
                name
            )));
        }
        if has_thunk && name_property {
            return Err(PropertyError::Construction(format!(
                "property {} declares both a lazy default and name_property",
                name
            )));
        }

        let default = if has_static && name_property {
            // Tie-break by declaration order, not by value.
            let first = options
                .mechanism_order
                .iter()
                .copied()
                .find(|m| matches!(m, DefaultMechanism::Static | DefaultMechanism::NameProperty));
            if matches!(first, Some(DefaultMechanism::Static) | None) {
                self.signals.emit(Deprecation::ConflictingDefault {
                    property: name.to_string(),
                    kept: "default",
                    dropped: "name_property",
                });
                name_property = false;
                options.name_property = Some(false);
                options.name_attribute = None;
                DefaultKind::Static(options.default_value.clone().unwrap_or(Value::Nil))
            } else {
                self.signals.emit(Deprecation::ConflictingDefault {
                    property: name.to_string(),
                    kept: "name_property",
                    dropped: "default",
                });
                options.default_value = None;
                DefaultKind::NameProperty
            }
        } else if has_static {
            DefaultKind::Static(options.default_value.clone().unwrap_or(Value::Nil))
        } else if has_thunk {
            match options.default_thunk.clone() {
                Some(thunk) => DefaultKind::Thunk(thunk),
                None => DefaultKind::None,
            }
        } else if name_property {
            DefaultKind::NameProperty
        } else {
            DefaultKind::None
        };

        let mut definition =
            PropertyDefinition::from_options(name.to_string(), options, default, name_property);

        if let DefaultKind::Static(value) = definition.default().clone() {
            match self.coerce_and_validate(&definition, None, value, true) {
                Ok(resolved) => definition.set_cached_static_default(resolved),
                // The default needs resource context; resolve per instance.
                Err(PropertyError::CannotValidateStatically { .. }) => {}
                Err(e) => return Err(e),
            }
        }

        Ok(definition)
    }

    /// Produces a modified clone of `base`. Overriding any default
    /// mechanism strips all three prior mechanisms first, so the derived
    /// property's default is exactly the override, never a composition.
    pub fn derive(
        &self,
        base: &PropertyDefinition,
        overrides: PropertyOptions,
    ) -> PropertyResult<PropertyDefinition> {
        let merged = base.options().clone().merge(overrides);
        self.define(base.name(), merged)
    }

    // ---- coercion & validation ----

    /// Applies the property's coercion rule, if any. Nil input on a
    /// property without a default mechanism is never coerced.
    pub fn coerce(
        &self,
        definition: &PropertyDefinition,
        ctx: Option<&dyn Resource>,
        value: Value,
    ) -> PropertyResult<Value> {
        let rule = match definition.coercion() {
            Some(rule) => rule,
            None => return Ok(value),
        };
        if value.is_nil() && !definition.has_default() {
            return Ok(value);
        }
        rule.apply(ctx, definition.name(), value)
    }

    /// Checks the value against the property's rule-set. Mirrors the
    /// coercion skip rule: nil on a no-default property passes untouched.
    pub fn validate(
        &self,
        definition: &PropertyDefinition,
        ctx: Option<&dyn Resource>,
        value: &Value,
    ) -> PropertyResult<()> {
        if value.is_nil() && !definition.has_default() {
            return Ok(());
        }
        self.validator
            .validate(ctx, definition.name(), definition.rules(), value)
    }

    /// Coerce, then validate. With `is_default` the validation failure is
    /// downgraded to a deprecation signal and the coerced value is kept:
    /// defaults may be theoretically invalid but practically overridden.
    /// `CannotValidateStatically` is never downgraded.
    pub fn coerce_and_validate(
        &self,
        definition: &PropertyDefinition,
        ctx: Option<&dyn Resource>,
        value: Value,
        is_default: bool,
    ) -> PropertyResult<Value> {
        let coerced = self.coerce(definition, ctx, value)?;
        match self.validate(definition, ctx, &coerced) {
            Ok(()) => Ok(coerced),
            Err(e @ PropertyError::CannotValidateStatically { .. }) => Err(e),
            Err(PropertyError::ValidationFailed { message, .. }) if is_default => {
                if coerced.is_nil() {
                    self.signals.emit(Deprecation::InvalidNilDefault {
                        property: definition.name().to_string(),
                        message,
                    });
                } else {
                    self.signals.emit(Deprecation::InvalidDefault {
                        property: definition.name().to_string(),
                        message,
                    });
                }
                Ok(coerced)
            }
            Err(e) => Err(e),
        }
    }

    // ---- resolution ----

    /// Resolves the property's effective value for a resource instance.
    ///
    /// Explicit value wins; a stored deferred value is re-evaluated and
    /// revalidated on every read without write-back. Otherwise the default
    /// is materialized: a non-nil resolved default is written back into
    /// storage so repeated reads are stable and presence flips true.
    pub fn get(&self, definition: &PropertyDefinition, resource: &dyn Resource) -> PropertyResult<Value> {
        if self.is_set(definition, resource) {
            let raw = self.read_raw(definition, resource)?;
            return match raw {
                Value::Deferred(thunk) => {
                    let value = thunk.evaluate(resource)?;
                    self.coerce_and_validate(definition, Some(resource), value, false)
                }
                stored => Ok(stored),
            };
        }

        if definition.has_default() {
            let value = match definition.cached_static_default() {
                Some(cached) => cached.clone(),
                None => {
                    let base = match definition.default() {
                        DefaultKind::Static(v) => v.clone(),
                        DefaultKind::Thunk(thunk) => match thunk.evaluate(resource) {
                            Ok(v) => v,
                            Err(PropertyError::ValidationFailed { message, .. }) => {
                                // Recoverable: a lazy default that fails
                                // validation while computing degrades to nil.
                                self.signals.emit(Deprecation::InvalidDefault {
                                    property: definition.name().to_string(),
                                    message,
                                });
                                return Ok(Value::Nil);
                            }
                            Err(e) => return Err(e),
                        },
                        DefaultKind::NameProperty => {
                            Value::String(resource.resource_name().to_string())
                        }
                        DefaultKind::None => Value::Nil,
                    };
                    self.coerce_and_validate(definition, Some(resource), base, true)?
                }
            };

            if !value.is_nil() {
                if let Some(slot) = definition.storage_slot() {
                    resource.state().set(slot, value.clone());
                }
            }
            return Ok(value);
        }

        if definition.is_required() {
            return Err(PropertyError::required(definition.name()));
        }
        Ok(Value::Nil)
    }

    /// Stores a value. Deferred input bypasses coercion and validation
    /// entirely; it is checked on every later read, which lets a lazy
    /// expression reference properties not yet available at declaration
    /// time. Returns the stored value.
    pub fn set(
        &self,
        definition: &PropertyDefinition,
        resource: &dyn Resource,
        value: Value,
    ) -> PropertyResult<Value> {
        let stored = match value {
            deferred @ Value::Deferred(_) => deferred,
            value => self.coerce_and_validate(definition, Some(resource), value, false)?,
        };
        match definition.storage_slot() {
            Some(slot) => {
                resource.state().set(slot, stored.clone());
                Ok(stored)
            }
            None => resource.custom_set(definition.name(), stored),
        }
    }

    /// Presence. Opaque properties have no engine-managed presence and
    /// degrade to "always considered set".
    pub fn is_set(&self, definition: &PropertyDefinition, resource: &dyn Resource) -> bool {
        match definition.storage_slot() {
            Some(slot) => resource.state().has_value(slot),
            None => true,
        }
    }

    /// Clears presence so the next read re-runs default resolution.
    pub fn reset(&self, definition: &PropertyDefinition, resource: &dyn Resource) -> PropertyResult<()> {
        match definition.storage_slot() {
            Some(slot) => {
                resource.state().clear(slot);
                Ok(())
            }
            None => Err(PropertyError::Config(format!(
                "cannot reset property {}: it has no storage slot",
                definition.name()
            ))),
        }
    }

    /// Dual-mode dispatcher: no value reads, a value writes.
    ///
    /// An explicit nil reads, preserving legacy behavior — with a trial
    /// coercion/validation (no side effects on stored state) to detect
    /// whether a future treat-as-set would change the observed value; when
    /// it would, a deprecation signal fires.
    pub fn invoke(
        &self,
        definition: &PropertyDefinition,
        resource: &dyn Resource,
        value: Option<Value>,
    ) -> PropertyResult<Value> {
        match value {
            None => self.get(definition, resource),
            Some(Value::Nil) => {
                let trial = self.coerce_and_validate(definition, Some(resource), Value::Nil, false);
                let current = self.get(definition, resource)?;
                if let Ok(candidate) = trial {
                    if candidate != current {
                        self.signals.emit(Deprecation::NilGetWouldBecomeSet {
                            property: definition.name().to_string(),
                        });
                    }
                }
                Ok(current)
            }
            Some(value) => self.set(definition, resource, value),
        }
    }

    fn read_raw(
        &self,
        definition: &PropertyDefinition,
        resource: &dyn Resource,
    ) -> PropertyResult<Value> {
        match definition.storage_slot() {
            Some(slot) => resource.state().get(slot).ok_or_else(|| {
                PropertyError::Config(format!(
                    "property {} reported presence but holds no value",
                    definition.name()
                ))
            }),
            None => resource.custom_get(definition.name()),
        }
    }
}
