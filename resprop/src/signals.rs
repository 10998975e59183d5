//! Deprecation signals.
//!
//! The engine emits advisory signals but does not own their handling: the
//! host decides whether to log, collect, or escalate. A signal never stops
//! execution.

use std::cell::RefCell;
use std::fmt;

use serde::Serialize;

/// A non-fatal advisory emitted during property construction or resolution.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Deprecation {
    /// A static default and a name-property flag were both declared; the
    /// one declared first was kept.
    ConflictingDefault {
        property: String,
        kept: &'static str,
        dropped: &'static str,
    },
    /// A nil argument was treated as a get; a future treat-as-set would
    /// change the observed value.
    NilGetWouldBecomeSet { property: String },
    /// A non-nil default value failed validation and was kept anyway.
    InvalidDefault { property: String, message: String },
    /// A nil default value failed validation and was kept anyway.
    InvalidNilDefault { property: String, message: String },
}

impl fmt::Display for Deprecation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Deprecation::ConflictingDefault {
                property,
                kept,
                dropped,
            } => write!(
                f,
                "property {} declares both {} and {}; {} was dropped",
                property, kept, dropped, dropped
            ),
            Deprecation::NilGetWouldBecomeSet { property } => write!(
                f,
                "passing nil to property {} currently reads it; a future release will treat this as a set and change the returned value",
                property
            ),
            Deprecation::InvalidDefault { property, message } => write!(
                f,
                "default value for property {} is invalid and will be kept for compatibility: {}",
                property, message
            ),
            Deprecation::InvalidNilDefault { property, message } => write!(
                f,
                "nil default for property {} is invalid and will be kept for compatibility: {}",
                property, message
            ),
        }
    }
}

/// The side channel the engine emits signals into.
pub trait DeprecationSink: fmt::Debug {
    fn emit(&self, signal: Deprecation);
}

/// Routes signals to the `log` facade at warn level.
#[derive(Debug, Default)]
pub struct LogSink;

impl LogSink {
    pub fn new() -> Self {
        LogSink
    }
}

impl DeprecationSink for LogSink {
    fn emit(&self, signal: Deprecation) {
        log::warn!(target: "resprop", "{}", signal);
    }
}

/// Captures signals for later inspection. Hosts that escalate deprecations
/// to errors collect here and apply their own policy after the operation.
#[derive(Debug, Default)]
pub struct RecordingSink {
    signals: RefCell<Vec<Deprecation>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        RecordingSink::default()
    }

    /// Returns and clears everything recorded so far.
    pub fn drain(&self) -> Vec<Deprecation> {
        self.signals.borrow_mut().drain(..).collect()
    }

    pub fn signals(&self) -> Vec<Deprecation> {
        self.signals.borrow().clone()
    }

    pub fn is_empty(&self) -> bool {
        self.signals.borrow().is_empty()
    }
}

impl DeprecationSink for RecordingSink {
    fn emit(&self, signal: Deprecation) {
        self.signals.borrow_mut().push(signal);
    }
}
