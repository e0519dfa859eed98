//! Error types for instance construction and configuration.
//!
//! The per-tick state machine never fails; errors only surface while building
//! instances, parsing easings/values or loading JSON configuration.

use crate::ids::InstanceId;

/// Error type for animation construction and lookup.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
#[non_exhaustive]
pub enum AnimationError {
    /// No instance with this id is owned by the engine
    #[error("Instance not found: {id}")]
    InstanceNotFound { id: InstanceId },

    /// The operation needs a timeline (composite) instance
    #[error("Instance {id} is not a timeline")]
    NotATimeline { id: InstanceId },

    /// Easing name is not part of the preset table
    #[error("Unknown easing: {name}")]
    UnknownEasing { name: String },

    /// Easing parameters could not be parsed
    #[error("Invalid easing parameters for {name}: {reason}")]
    InvalidEasingParameters { name: String, reason: String },

    /// Value could not be interpreted
    #[error("Invalid value: {reason}")]
    InvalidValue { reason: String },

    /// Relative value expression (`+=`, `-=`, `*=`) could not be evaluated
    #[error("Invalid relative value: {value}")]
    InvalidRelativeValue { value: String },

    /// Serialization error
    #[error("Serialization error: {reason}")]
    SerializationError { reason: String },
}

impl AnimationError {
    /// Get error category for logging
    #[inline]
    pub fn category(&self) -> &'static str {
        match self {
            Self::InstanceNotFound { .. } | Self::NotATimeline { .. } => "instance",
            Self::UnknownEasing { .. } | Self::InvalidEasingParameters { .. } => "easing",
            Self::InvalidValue { .. } | Self::InvalidRelativeValue { .. } => "value",
            Self::SerializationError { .. } => "serialization",
        }
    }
}

impl From<serde_json::Error> for AnimationError {
    fn from(err: serde_json::Error) -> Self {
        Self::SerializationError {
            reason: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_categories() {
        let missing = AnimationError::InstanceNotFound { id: InstanceId(3) };
        assert_eq!(missing.category(), "instance");
        assert_eq!(missing.to_string(), "Instance not found: #3");

        let easing = AnimationError::UnknownEasing {
            name: "wobble".to_string(),
        };
        assert_eq!(easing.category(), "easing");
    }

    #[test]
    fn test_from_serde_error() {
        let err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let converted: AnimationError = err.into();
        assert!(matches!(converted, AnimationError::SerializationError { .. }));
        assert_eq!(converted.category(), "serialization");
    }
}
