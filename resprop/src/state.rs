// Per-resource presence/value storage.

use std::cell::RefCell;
use std::collections::HashMap;

use crate::values::Value;

/// Presence/value storage for one resource instance, addressed by storage
/// slot.
///
/// Presence is key-existence: an entry holding `Nil` means "explicitly set
/// to nil", which is distinguishable from "never touched" (no entry).
/// Interior mutability is deliberate: evaluating a deferred value re-enters
/// the engine on the same resource within a single call stack, so the
/// storage cannot be behind `&mut`.
#[derive(Debug, Clone, Default)]
pub struct PropertyState {
    slots: RefCell<HashMap<String, Value>>,
}

impl PropertyState {
    pub fn new() -> Self {
        PropertyState {
            slots: RefCell::new(HashMap::new()),
        }
    }

    /// Returns the stored value for a slot, if one was ever set.
    pub fn get(&self, slot: &str) -> Option<Value> {
        self.slots.borrow().get(slot).cloned()
    }

    /// Stores a value, marking the slot as present.
    pub fn set(&self, slot: &str, value: Value) {
        self.slots.borrow_mut().insert(slot.to_string(), value);
    }

    /// True iff the slot has ever been set (even to `Nil`).
    pub fn has_value(&self, slot: &str) -> bool {
        self.slots.borrow().contains_key(slot)
    }

    /// Clears presence for the slot, returning the previous value.
    pub fn clear(&self, slot: &str) -> Option<Value> {
        self.slots.borrow_mut().remove(slot)
    }

    pub fn len(&self) -> usize {
        self.slots.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.borrow().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn presence_is_independent_of_value() {
        let state = PropertyState::new();
        assert!(!state.has_value("mode"));

        state.set("mode", Value::Nil);
        assert!(state.has_value("mode"));
        assert_eq!(state.get("mode"), Some(Value::Nil));
    }

    #[test]
    fn clear_removes_presence() {
        let state = PropertyState::new();
        state.set("owner", Value::String("root".to_string()));
        assert_eq!(state.clear("owner"), Some(Value::String("root".to_string())));
        assert!(!state.has_value("owner"));
        assert_eq!(state.clear("owner"), None);
    }

    #[test]
    fn set_overwrites() {
        let state = PropertyState::new();
        state.set("port", Value::Integer(80));
        state.set("port", Value::Integer(8080));
        assert_eq!(state.get("port"), Some(Value::Integer(8080)));
        assert_eq!(state.len(), 1);
    }
}
