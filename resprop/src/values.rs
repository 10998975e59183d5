// Runtime value system for resource properties.
// Represents attribute values during resolution (distinct from whatever
// syntax the surrounding resource DSL uses to declare them).

use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use crate::context::Resource;
use crate::error::PropertyResult;

/// A dynamically-typed property value.
///
/// `Nil` is the absent-equivalent sentinel: "no meaningful value", which is
/// distinct from "never set" (presence is tracked separately by
/// [`crate::state::PropertyState`]).
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Nil,
    Boolean(bool),
    Integer(i64),
    Float(f64),
    String(String),
    Vector(Vec<Value>),
    Map(HashMap<String, Value>),
    /// An unresolved lazy thunk. Any stored value of this variant is *not
    /// yet resolved*; value-read APIs evaluate it before returning.
    Deferred(DeferredValue),
}

impl Value {
    pub fn is_nil(&self) -> bool {
        matches!(self, Value::Nil)
    }

    pub fn is_deferred(&self) -> bool {
        matches!(self, Value::Deferred(_))
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Nil => "nil",
            Value::Boolean(_) => "boolean",
            Value::Integer(_) => "integer",
            Value::Float(_) => "float",
            Value::String(_) => "string",
            Value::Vector(_) => "vector",
            Value::Map(_) => "map",
            Value::Deferred(_) => "deferred",
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Nil => write!(f, "nil"),
            Value::Boolean(b) => write!(f, "{}", b),
            Value::Integer(i) => write!(f, "{}", i),
            Value::Float(fl) => write!(f, "{}", fl),
            Value::String(s) => write!(f, "\"{}\"", s),
            Value::Vector(v) => {
                let items: Vec<String> = v.iter().map(|item| format!("{}", item)).collect();
                write!(f, "[{}]", items.join(" "))
            }
            Value::Map(m) => {
                let items: Vec<String> = m.iter().map(|(k, v)| format!("{} {}", k, v)).collect();
                write!(f, "{{{}}}", items.join(", "))
            }
            Value::Deferred(d) => write!(f, "{}", d),
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Boolean(b)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Integer(i)
    }
}

impl From<f64> for Value {
    fn from(fl: f64) -> Self {
        Value::Float(fl)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

/// A lazily-evaluated computation bound to resource context.
///
/// The thunk may read other properties of the same resource (re-entrant,
/// single stack). It carries no state besides the wrapped computation; a
/// resolved value replaces it in storage when a lazy *default* is
/// materialized. Lazy *set* values stay deferred in storage and are
/// re-evaluated on every read.
#[derive(Clone)]
pub struct DeferredValue {
    description: Option<String>,
    thunk: Rc<dyn Fn(&dyn Resource) -> PropertyResult<Value>>,
}

impl DeferredValue {
    pub fn new(thunk: impl Fn(&dyn Resource) -> PropertyResult<Value> + 'static) -> Self {
        DeferredValue {
            description: None,
            thunk: Rc::new(thunk),
        }
    }

    pub fn named(
        description: impl Into<String>,
        thunk: impl Fn(&dyn Resource) -> PropertyResult<Value> + 'static,
    ) -> Self {
        DeferredValue {
            description: Some(description.into()),
            thunk: Rc::new(thunk),
        }
    }

    /// Runs the wrapped computation in resource context.
    pub fn evaluate(&self, resource: &dyn Resource) -> PropertyResult<Value> {
        (self.thunk)(resource)
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }
}

impl fmt::Debug for DeferredValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeferredValue")
            .field("description", &self.description)
            .finish()
    }
}

impl fmt::Display for DeferredValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.description {
            Some(d) => write!(f, "#<deferred: {}>", d),
            None => write!(f, "#<deferred>"),
        }
    }
}

impl PartialEq for DeferredValue {
    fn eq(&self, other: &Self) -> bool {
        // Compare thunks by identity, not by behavior
        std::ptr::eq(
            Rc::as_ptr(&self.thunk) as *const u8,
            Rc::as_ptr(&other.thunk) as *const u8,
        )
    }
}
