//! resprop: a declarative property engine for resource attributes.
//!
//! Resource types in an infrastructure-as-code system declare named,
//! typed, validated, optionally-lazy properties; this crate resolves a
//! property's effective value for a resource instance while keeping a
//! precise contract between *presence* (was a value ever set or
//! materialized) and *value* (what it currently is, possibly nil).
//!
//! The moving parts, leaf first:
//! - [`values::Value`] / [`values::DeferredValue`]: dynamic values and
//!   lazy thunks bound to resource context.
//! - [`state::PropertyState`]: per-instance presence/value storage.
//! - [`validation`]: the injected validator capability and the bundled
//!   rule interpreter.
//! - [`definition::PropertyDefinition`]: the immutable per-property
//!   specification, built from [`definition::PropertyOptions`].
//! - [`engine::PropertyEngine`]: get/set/is_set/reset/invoke resolution,
//!   default materialization, derivation.
//! - [`property_set::PropertySet`]: ordered per-type property registry.
//!
//! Resolution on `get` walks: explicit value → lazy default → static
//! default → required-error → nil. Defaults that resolve to non-nil are
//! written back (materialized) so later reads observe a stable value and
//! presence. Invalid *defaults* are forgiven with a deprecation signal;
//! everything else fails loudly.

pub mod context;
pub mod definition;
pub mod engine;
pub mod error;
pub mod json;
pub mod property_set;
pub mod signals;
pub mod state;
pub mod validation;
pub mod values;

#[cfg(test)]
mod engine_tests;

pub use context::{Resource, SimpleResource};
pub use definition::{Coercion, DefaultKind, PropertyDefinition, PropertyOptions};
pub use engine::PropertyEngine;
pub use error::{PropertyError, PropertyResult};
pub use json::{json_to_value, value_to_json};
pub use property_set::PropertySet;
pub use signals::{Deprecation, DeprecationSink, LogSink, RecordingSink};
pub use state::PropertyState;
pub use validation::{Rule, RuleSet, RuleValidator, ValueValidator};
pub use values::{DeferredValue, Value};
