#[cfg(test)]
mod construction_tests {
    use std::rc::Rc;

    use crate::definition::{DefaultKind, PropertyOptions};
    use crate::engine::PropertyEngine;
    use crate::error::PropertyError;
    use crate::signals::{Deprecation, RecordingSink};
    use crate::validation::{RuleSet, RuleValidator};
    use crate::values::{DeferredValue, Value};

    fn engine_with_recorder() -> (PropertyEngine, Rc<RecordingSink>) {
        let sink = Rc::new(RecordingSink::new());
        let engine = PropertyEngine::with_parts(Rc::new(RuleValidator::new()), sink.clone());
        (engine, sink)
    }

    #[test]
    fn static_and_lazy_default_conflict() {
        let engine = PropertyEngine::new();
        let err = engine
            .define(
                "mode",
                PropertyOptions::new()
                    .default("0644")
                    .default_lazy(DeferredValue::new(|_| Ok(Value::from("0600")))),
            )
            .unwrap_err();
        assert!(matches!(err, PropertyError::Construction(_)));
    }

    #[test]
    fn lazy_default_and_name_property_conflict() {
        let engine = PropertyEngine::new();
        let err = engine
            .define(
                "path",
                PropertyOptions::new()
                    .name_property(true)
                    .default_lazy(DeferredValue::new(|_| Ok(Value::Nil))),
            )
            .unwrap_err();
        assert!(matches!(err, PropertyError::Construction(_)));
    }

    #[test]
    fn disagreeing_legacy_alias_fails() {
        let engine = PropertyEngine::new();
        let err = engine
            .define(
                "path",
                PropertyOptions::new().name_property(true).name_attribute(false),
            )
            .unwrap_err();
        assert!(matches!(err, PropertyError::Construction(_)));
    }

    #[test]
    fn agreeing_legacy_alias_is_accepted() {
        let engine = PropertyEngine::new();
        let def = engine
            .define(
                "path",
                PropertyOptions::new().name_property(true).name_attribute(true),
            )
            .unwrap();
        assert!(def.is_name_property());
        assert_eq!(def.default(), &DefaultKind::NameProperty);
    }

    #[test]
    fn legacy_alias_alone_enables_name_property() {
        let engine = PropertyEngine::new();
        let def = engine
            .define("path", PropertyOptions::new().name_attribute(true))
            .unwrap();
        assert!(def.is_name_property());
    }

    #[test]
    fn default_declared_before_name_property_wins() {
        let (engine, sink) = engine_with_recorder();
        let def = engine
            .define(
                "path",
                PropertyOptions::new().default("/tmp/f").name_property(true),
            )
            .unwrap();

        assert_eq!(def.default(), &DefaultKind::Static(Value::from("/tmp/f")));
        assert!(!def.is_name_property());
        assert_eq!(
            sink.drain(),
            vec![Deprecation::ConflictingDefault {
                property: "path".to_string(),
                kept: "default",
                dropped: "name_property",
            }]
        );
    }

    #[test]
    fn name_property_declared_before_default_wins() {
        let (engine, sink) = engine_with_recorder();
        let def = engine
            .define(
                "path",
                PropertyOptions::new().name_property(true).default("/tmp/f"),
            )
            .unwrap();

        assert_eq!(def.default(), &DefaultKind::NameProperty);
        assert!(def.is_name_property());
        assert_eq!(
            sink.drain(),
            vec![Deprecation::ConflictingDefault {
                property: "path".to_string(),
                kept: "name_property",
                dropped: "default",
            }]
        );
    }

    #[test]
    fn static_default_is_cached_at_construction() {
        let engine = PropertyEngine::new();
        let def = engine
            .define("mode", PropertyOptions::new().default("0644"))
            .unwrap();
        assert_eq!(def.cached_static_default(), Some(&Value::from("0644")));
    }

    #[test]
    fn context_requiring_rule_skips_caching_silently() {
        let (engine, sink) = engine_with_recorder();
        let def = engine
            .define(
                "unit",
                PropertyOptions::new().default("web.service").rules(
                    RuleSet::new().in_context("name-prefixed", |r, v| {
                        matches!(v, Value::String(s) if s.starts_with(r.resource_name()))
                    }),
                ),
            )
            .unwrap();
        // CannotValidateStatically is the one failure construction forgives
        // without a warning: the default resolves per instance.
        assert_eq!(def.cached_static_default(), None);
        assert!(sink.is_empty());
    }

    #[test]
    fn invalid_static_default_is_kept_with_a_signal() {
        let (engine, sink) = engine_with_recorder();
        let def = engine
            .define(
                "port",
                PropertyOptions::new()
                    .default(Value::Integer(0))
                    .rules(RuleSet::new().builtin("is-port")),
            )
            .unwrap();

        assert_eq!(def.cached_static_default(), Some(&Value::Integer(0)));
        let signals = sink.drain();
        assert_eq!(signals.len(), 1);
        assert!(matches!(
            signals[0],
            Deprecation::InvalidDefault { ref property, .. } if property == "port"
        ));
    }
}

#[cfg(test)]
mod coercion_validation_tests {
    use std::rc::Rc;

    use crate::context::SimpleResource;
    use crate::definition::{Coercion, PropertyOptions};
    use crate::engine::PropertyEngine;
    use crate::error::PropertyError;
    use crate::signals::RecordingSink;
    use crate::validation::{RuleSet, RuleValidator};
    use crate::values::Value;

    fn engine_with_recorder() -> (PropertyEngine, Rc<RecordingSink>) {
        let sink = Rc::new(RecordingSink::new());
        let engine = PropertyEngine::with_parts(Rc::new(RuleValidator::new()), sink.clone());
        (engine, sink)
    }

    fn stringify() -> Coercion {
        Coercion::new(|v| {
            Ok(match v {
                Value::String(s) => Value::String(s),
                other => Value::String(format!("{}", other)),
            })
        })
    }

    #[test]
    fn nil_on_a_no_default_property_is_never_coerced() {
        let engine = PropertyEngine::new();
        let def = engine
            .define("mode", PropertyOptions::new().coerce(stringify()))
            .unwrap();
        let out = engine.coerce(&def, None, Value::Nil).unwrap();
        assert_eq!(out, Value::Nil);
    }

    #[test]
    fn nil_on_a_defaulted_property_is_coerced() {
        let engine = PropertyEngine::new();
        let def = engine
            .define(
                "mode",
                PropertyOptions::new().default("0644").coerce(stringify()),
            )
            .unwrap();
        let out = engine.coerce(&def, None, Value::Nil).unwrap();
        assert_eq!(out, Value::from("nil"));
    }

    #[test]
    fn nil_on_a_no_default_property_skips_validation() {
        let engine = PropertyEngine::new();
        let def = engine
            .define(
                "mode",
                PropertyOptions::new().rules(RuleSet::new().kind_of(&["string"])),
            )
            .unwrap();
        assert!(engine.validate(&def, None, &Value::Nil).is_ok());
        assert!(engine.validate(&def, None, &Value::Integer(1)).is_err());
    }

    #[test]
    fn non_default_validation_failure_propagates() {
        let (engine, sink) = engine_with_recorder();
        let def = engine
            .define(
                "port",
                PropertyOptions::new().rules(RuleSet::new().builtin("is-port")),
            )
            .unwrap();
        let resource = SimpleResource::new("service", "web");
        let err = engine
            .coerce_and_validate(&def, Some(&resource), Value::Integer(0), false)
            .unwrap_err();
        assert!(matches!(err, PropertyError::ValidationFailed { .. }));
        assert!(sink.is_empty());
    }

    #[test]
    fn cannot_validate_statically_is_never_downgraded() {
        let engine = PropertyEngine::new();
        let def = engine
            .define(
                "unit",
                PropertyOptions::new().default("x").rules(
                    RuleSet::new().in_context("ctx", |_r, _v| true),
                ),
            )
            .unwrap();
        // even in an is_default context, the missing-context error surfaces
        let err = engine
            .coerce_and_validate(&def, None, Value::from("x"), true)
            .unwrap_err();
        assert!(matches!(err, PropertyError::CannotValidateStatically { .. }));
    }
}

#[cfg(test)]
mod opaque_tests {
    use std::cell::RefCell;
    use std::collections::HashMap;

    use crate::context::Resource;
    use crate::definition::PropertyOptions;
    use crate::engine::PropertyEngine;
    use crate::error::{PropertyError, PropertyResult};
    use crate::state::PropertyState;
    use crate::values::Value;

    /// A resource carrying its own backing store for opaque properties.
    #[derive(Debug, Default)]
    struct OpaqueResource {
        state: PropertyState,
        backing: RefCell<HashMap<String, Value>>,
    }

    impl Resource for OpaqueResource {
        fn type_name(&self) -> &str {
            "custom"
        }

        fn resource_name(&self) -> &str {
            "custom-1"
        }

        fn state(&self) -> &PropertyState {
            &self.state
        }

        fn custom_get(&self, property: &str) -> PropertyResult<Value> {
            self.backing
                .borrow()
                .get(property)
                .cloned()
                .ok_or_else(|| PropertyError::Config(format!("no value for {}", property)))
        }

        fn custom_set(&self, property: &str, value: Value) -> PropertyResult<Value> {
            self.backing
                .borrow_mut()
                .insert(property.to_string(), value.clone());
            Ok(value)
        }
    }

    #[test]
    fn opaque_round_trip_uses_custom_accessors() {
        let engine = PropertyEngine::new();
        let def = engine
            .define("session", PropertyOptions::new().opaque())
            .unwrap();
        let resource = OpaqueResource::default();

        engine
            .set(&def, &resource, Value::from("abc123"))
            .unwrap();
        assert_eq!(engine.get(&def, &resource).unwrap(), Value::from("abc123"));
        // engine-managed storage stays untouched
        assert!(resource.state.is_empty());
    }

    #[test]
    fn opaque_is_always_considered_set() {
        let engine = PropertyEngine::new();
        let def = engine
            .define("session", PropertyOptions::new().opaque())
            .unwrap();
        let resource = OpaqueResource::default();
        assert!(engine.is_set(&def, &resource));
    }

    #[test]
    fn opaque_reset_is_a_config_error() {
        let engine = PropertyEngine::new();
        let def = engine
            .define("session", PropertyOptions::new().opaque())
            .unwrap();
        let resource = OpaqueResource::default();
        assert!(matches!(
            engine.reset(&def, &resource),
            Err(PropertyError::Config(_))
        ));
    }

    #[test]
    fn plain_resource_rejects_opaque_access() {
        let engine = PropertyEngine::new();
        let def = engine
            .define("session", PropertyOptions::new().opaque())
            .unwrap();
        let resource = crate::context::SimpleResource::new("custom", "custom-1");
        assert!(matches!(
            engine.get(&def, &resource),
            Err(PropertyError::Config(_))
        ));
    }
}

#[cfg(test)]
mod invoke_tests {
    use std::rc::Rc;

    use crate::context::SimpleResource;
    use crate::definition::PropertyOptions;
    use crate::engine::PropertyEngine;
    use crate::signals::{Deprecation, RecordingSink};
    use crate::validation::{RuleSet, RuleValidator};
    use crate::values::Value;

    fn engine_with_recorder() -> (PropertyEngine, Rc<RecordingSink>) {
        let sink = Rc::new(RecordingSink::new());
        let engine = PropertyEngine::with_parts(Rc::new(RuleValidator::new()), sink.clone());
        (engine, sink)
    }

    #[test]
    fn invoke_without_value_reads() {
        let engine = PropertyEngine::new();
        let def = engine
            .define("mode", PropertyOptions::new().default("0644"))
            .unwrap();
        let resource = SimpleResource::new("file", "/etc/motd");
        assert_eq!(
            engine.invoke(&def, &resource, None).unwrap(),
            Value::from("0644")
        );
    }

    #[test]
    fn invoke_with_value_writes() {
        let engine = PropertyEngine::new();
        let def = engine.define("mode", PropertyOptions::new()).unwrap();
        let resource = SimpleResource::new("file", "/etc/motd");
        engine
            .invoke(&def, &resource, Some(Value::from("0600")))
            .unwrap();
        assert!(engine.is_set(&def, &resource));
        assert_eq!(engine.get(&def, &resource).unwrap(), Value::from("0600"));
    }

    #[test]
    fn invoke_with_nil_reads_and_warns_when_set_semantics_would_differ() {
        let (engine, sink) = engine_with_recorder();
        let def = engine
            .define("mode", PropertyOptions::new().default("0644"))
            .unwrap();
        let resource = SimpleResource::new("file", "/etc/motd");

        // current get -> "0644"; a future set(nil) would store nil
        let out = engine.invoke(&def, &resource, Some(Value::Nil)).unwrap();
        assert_eq!(out, Value::from("0644"));
        assert_eq!(
            sink.drain(),
            vec![Deprecation::NilGetWouldBecomeSet {
                property: "mode".to_string(),
            }]
        );
    }

    #[test]
    fn invoke_with_nil_is_silent_when_nothing_would_change() {
        let (engine, sink) = engine_with_recorder();
        let def = engine.define("mode", PropertyOptions::new()).unwrap();
        let resource = SimpleResource::new("file", "/etc/motd");

        let out = engine.invoke(&def, &resource, Some(Value::Nil)).unwrap();
        assert_eq!(out, Value::Nil);
        assert!(sink.is_empty());
        // the trial must leave no trace in stored state
        assert!(!engine.is_set(&def, &resource));
    }

    #[test]
    fn invoke_with_nil_stays_a_get_when_the_trial_fails_validation() {
        let (engine, sink) = engine_with_recorder();
        let def = engine
            .define(
                "mode",
                PropertyOptions::new()
                    .default("0644")
                    .rules(RuleSet::new().kind_of(&["string"])),
            )
            .unwrap();
        let resource = SimpleResource::new("file", "/etc/motd");

        // set(nil) would fail validation rather than change the value, so
        // no behavior change is announced
        let out = engine.invoke(&def, &resource, Some(Value::Nil)).unwrap();
        assert_eq!(out, Value::from("0644"));
        assert!(sink.is_empty());
    }
}
