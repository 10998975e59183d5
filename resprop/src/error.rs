// Error handling for property resolution

use thiserror::Error;

pub type PropertyResult<T> = Result<T, PropertyError>;

/// Errors raised by property construction and resolution.
///
/// `ValidationFailed`, `Config` and `Construction` are fatal to the calling
/// operation. `CannotValidateStatically` is the one error the
/// forgive-invalid-defaults policy never forgives: it distinguishes "truly
/// broken" from "needs resource context, resolve later".
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PropertyError {
    /// Conflicting options supplied to property construction.
    #[error("invalid property declaration: {0}")]
    Construction(String),

    /// Coercion or validation needs a resource context that is not available.
    #[error("{message}")]
    CannotValidateStatically { property: String, message: String },

    /// A value failed the property's validation rules, or a required
    /// property had no value at read time.
    #[error("{message}")]
    ValidationFailed { property: String, message: String },

    /// Structural misuse, e.g. resetting a storage-less property.
    #[error("configuration error: {0}")]
    Config(String),
}

impl PropertyError {
    pub fn required(property: &str) -> PropertyError {
        PropertyError::ValidationFailed {
            property: property.to_string(),
            message: format!("{} is required", property),
        }
    }

    pub fn cannot_validate_statically(property: &str, message: impl Into<String>) -> PropertyError {
        PropertyError::CannotValidateStatically {
            property: property.to_string(),
            message: message.into(),
        }
    }

    /// The property name the error refers to, when it refers to one.
    pub fn property(&self) -> Option<&str> {
        match self {
            PropertyError::CannotValidateStatically { property, .. }
            | PropertyError::ValidationFailed { property, .. } => Some(property),
            _ => None,
        }
    }
}
