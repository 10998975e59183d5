//! Validation rules and the pluggable validator adapter.
//!
//! The engine treats validation as an injected capability: it hands the
//! property's [`RuleSet`] plus the candidate value to a [`ValueValidator`]
//! and acts on pass/fail. [`RuleValidator`] is the bundled interpreter;
//! hosts with their own predicate DSL can replace it wholesale.

use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use lazy_static::lazy_static;

use crate::context::Resource;
use crate::error::{PropertyError, PropertyResult};
use crate::values::Value;

/// A single validation rule.
#[derive(Clone)]
pub enum Rule {
    /// Value's type name must be one of the listed names.
    KindOf(Vec<&'static str>),
    /// Value must equal one of the listed values.
    EqualTo(Vec<Value>),
    /// String value must match the pattern.
    #[cfg(feature = "regex")]
    Matches(String),
    /// Named predicate from the built-in registry.
    Builtin(String),
    /// Custom check on the value alone.
    Callback {
        description: String,
        check: Rc<dyn Fn(&Value) -> bool>,
    },
    /// Custom check that needs the resource. Without a resource context
    /// this rule cannot run and raises `CannotValidateStatically`.
    ContextCallback {
        description: String,
        check: Rc<dyn Fn(&dyn Resource, &Value) -> bool>,
    },
}

impl Rule {
    pub fn describe(&self) -> String {
        match self {
            Rule::KindOf(names) => format!("kind-of({})", names.join(", ")),
            Rule::EqualTo(values) => {
                let items: Vec<String> = values.iter().map(|v| format!("{}", v)).collect();
                format!("equal-to({})", items.join(", "))
            }
            #[cfg(feature = "regex")]
            Rule::Matches(pattern) => format!("matches({})", pattern),
            Rule::Builtin(name) => format!("predicate({})", name),
            Rule::Callback { description, .. } => description.clone(),
            Rule::ContextCallback { description, .. } => description.clone(),
        }
    }
}

impl fmt::Debug for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Rule({})", self.describe())
    }
}

/// An ordered collection of rules attached to one property. Opaque to the
/// engine; only the validator adapter interprets it.
#[derive(Debug, Clone, Default)]
pub struct RuleSet {
    rules: Vec<Rule>,
}

impl RuleSet {
    pub fn new() -> Self {
        RuleSet { rules: Vec::new() }
    }

    pub fn kind_of(mut self, names: &[&'static str]) -> Self {
        self.rules.push(Rule::KindOf(names.to_vec()));
        self
    }

    pub fn equal_to(mut self, values: Vec<Value>) -> Self {
        self.rules.push(Rule::EqualTo(values));
        self
    }

    #[cfg(feature = "regex")]
    pub fn matches(mut self, pattern: impl Into<String>) -> Self {
        self.rules.push(Rule::Matches(pattern.into()));
        self
    }

    pub fn builtin(mut self, name: impl Into<String>) -> Self {
        self.rules.push(Rule::Builtin(name.into()));
        self
    }

    pub fn callback(
        mut self,
        description: impl Into<String>,
        check: impl Fn(&Value) -> bool + 'static,
    ) -> Self {
        self.rules.push(Rule::Callback {
            description: description.into(),
            check: Rc::new(check),
        });
        self
    }

    pub fn in_context(
        mut self,
        description: impl Into<String>,
        check: impl Fn(&dyn Resource, &Value) -> bool + 'static,
    ) -> Self {
        self.rules.push(Rule::ContextCallback {
            description: description.into(),
            check: Rc::new(check),
        });
        self
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Rule> {
        self.rules.iter()
    }
}

/// The injected validator capability.
pub trait ValueValidator: fmt::Debug {
    /// Checks `value` against `rules`. `ctx` is `None` during static
    /// (construction-time) resolution; rules that need a resource must
    /// raise `CannotValidateStatically` in that case rather than fail.
    fn validate(
        &self,
        ctx: Option<&dyn Resource>,
        property: &str,
        rules: &RuleSet,
        value: &Value,
    ) -> PropertyResult<()>;
}

lazy_static! {
    static ref BUILTIN_PREDICATES: HashMap<&'static str, fn(&Value) -> bool> = {
        let mut m: HashMap<&'static str, fn(&Value) -> bool> = HashMap::new();
        m.insert("non-empty", |value| match value {
            Value::String(s) => !s.is_empty(),
            Value::Vector(v) => !v.is_empty(),
            Value::Map(map) => !map.is_empty(),
            _ => false,
        });
        m.insert("is-port", |value| {
            matches!(value, Value::Integer(p) if (1..=65535).contains(p))
        });
        m.insert("is-absolute-path", |value| {
            matches!(value, Value::String(s) if s.starts_with('/'))
        });
        m.insert("is-url", |value| {
            matches!(value, Value::String(s)
                if s.starts_with("http://") || s.starts_with("https://"))
        });
        m
    };
}

/// Rule interpreter backed by the built-in predicate registry.
#[derive(Debug, Default)]
pub struct RuleValidator;

impl RuleValidator {
    pub fn new() -> Self {
        RuleValidator
    }

    fn check_rule(
        ctx: Option<&dyn Resource>,
        property: &str,
        rule: &Rule,
        value: &Value,
    ) -> PropertyResult<bool> {
        match rule {
            Rule::KindOf(names) => Ok(names.contains(&value.type_name())),
            Rule::EqualTo(values) => Ok(values.contains(value)),
            #[cfg(feature = "regex")]
            Rule::Matches(pattern) => {
                let re = regex::Regex::new(pattern).map_err(|e| {
                    PropertyError::ValidationFailed {
                        property: property.to_string(),
                        message: format!("invalid pattern for {}: {}", property, e),
                    }
                })?;
                Ok(matches!(value, Value::String(s) if re.is_match(s)))
            }
            Rule::Builtin(name) => {
                let predicate = BUILTIN_PREDICATES.get(name.as_str()).ok_or_else(|| {
                    PropertyError::ValidationFailed {
                        property: property.to_string(),
                        message: format!("unknown predicate {} on {}", name, property),
                    }
                })?;
                Ok(predicate(value))
            }
            Rule::Callback { check, .. } => Ok(check(value)),
            Rule::ContextCallback { description, check } => match ctx {
                Some(resource) => Ok(check(resource, value)),
                None => Err(PropertyError::cannot_validate_statically(
                    property,
                    format!("rule {} on {} requires resource context", description, property),
                )),
            },
        }
    }
}

impl ValueValidator for RuleValidator {
    fn validate(
        &self,
        ctx: Option<&dyn Resource>,
        property: &str,
        rules: &RuleSet,
        value: &Value,
    ) -> PropertyResult<()> {
        for rule in rules.iter() {
            if !Self::check_rule(ctx, property, rule, value)? {
                return Err(PropertyError::ValidationFailed {
                    property: property.to_string(),
                    message: format!(
                        "{} must satisfy {}, got {}",
                        property,
                        rule.describe(),
                        value
                    ),
                });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::SimpleResource;

    fn validate(rules: &RuleSet, value: &Value) -> PropertyResult<()> {
        RuleValidator::new().validate(None, "mode", rules, value)
    }

    #[test]
    fn kind_of_accepts_listed_types() {
        let rules = RuleSet::new().kind_of(&["string", "integer"]);
        assert!(validate(&rules, &Value::Integer(644)).is_ok());
        assert!(validate(&rules, &Value::Boolean(true)).is_err());
    }

    #[test]
    fn equal_to_compares_values() {
        let rules = RuleSet::new().equal_to(vec![Value::from("present"), Value::from("absent")]);
        assert!(validate(&rules, &Value::from("present")).is_ok());
        let err = validate(&rules, &Value::from("latest")).unwrap_err();
        assert!(matches!(err, PropertyError::ValidationFailed { .. }));
        assert!(err.to_string().contains("equal-to"));
    }

    #[cfg(feature = "regex")]
    #[test]
    fn matches_requires_string_match() {
        let rules = RuleSet::new().matches(r"^[0-7]{3,4}$");
        assert!(validate(&rules, &Value::from("0644")).is_ok());
        assert!(validate(&rules, &Value::from("rw-r--r--")).is_err());
        assert!(validate(&rules, &Value::Integer(644)).is_err());
    }

    #[test]
    fn builtin_predicates() {
        let rules = RuleSet::new().builtin("is-port");
        assert!(validate(&rules, &Value::Integer(8080)).is_ok());
        assert!(validate(&rules, &Value::Integer(0)).is_err());

        let unknown = RuleSet::new().builtin("is-chunky");
        assert!(validate(&unknown, &Value::Integer(1)).is_err());
    }

    #[test]
    fn context_callback_needs_resource() {
        let rules = RuleSet::new().in_context("name-prefixed", |r, v| {
            matches!(v, Value::String(s) if s.starts_with(r.resource_name()))
        });

        let err = validate(&rules, &Value::from("web-1")).unwrap_err();
        assert!(matches!(err, PropertyError::CannotValidateStatically { .. }));

        let resource = SimpleResource::new("service", "web");
        let ok = RuleValidator::new().validate(Some(&resource), "mode", &rules, &Value::from("web-1"));
        assert!(ok.is_ok());
    }
}
