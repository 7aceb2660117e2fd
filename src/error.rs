//! Unified error handling for the manifest-map library.
//!
//! Rendering paths never surface these errors to the host screen; they are
//! logged and degrade to "render nothing extra". Parsing, configuration and
//! runtime construction return them so callers can decide.

use thiserror::Error;

/// Unified error type for manifest-map operations.
#[derive(Debug, Clone, PartialEq, Error)]
#[cfg_attr(feature = "ffi", derive(uniffi::Error))]
pub enum MapError {
    /// Point has coordinates outside the WGS84 range or non-finite values
    #[error("Point '{marker_id}' has invalid coordinates: {message}")]
    InvalidCoordinates { marker_id: String, message: String },

    /// Theme colour is not a valid hex string
    #[error("Invalid colour '{value}'")]
    InvalidColour { value: String },

    /// Host payload could not be deserialized
    #[error("Failed to deserialize {what}: {message}")]
    Deserialize { what: String, message: String },

    /// Configuration error
    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    /// The map runtime refused to construct a drawable
    #[error("Overlay unavailable: {message}")]
    OverlayUnavailable { message: String },

    /// An operation needed a map instance but none is bound
    #[error("No map instance bound for {operation}")]
    NoMapInstance { operation: String },

    /// Generic internal error
    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl MapError {
    pub(crate) fn deserialize(what: &str, err: serde_json::Error) -> Self {
        MapError::Deserialize {
            what: what.to_string(),
            message: err.to_string(),
        }
    }
}

/// Result type alias for manifest-map operations.
pub type Result<T> = std::result::Result<T, MapError>;

/// Extension trait for converting Option to MapError.
pub trait OptionExt<T> {
    /// Convert Option to Result with a missing map instance error.
    fn ok_or_no_map(self, operation: &str) -> Result<T>;
}

impl<T> OptionExt<T> for Option<T> {
    fn ok_or_no_map(self, operation: &str) -> Result<T> {
        self.ok_or_else(|| MapError::NoMapInstance {
            operation: operation.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = MapError::InvalidCoordinates {
            marker_id: "point-3".to_string(),
            message: "latitude 91 out of range".to_string(),
        };
        assert!(err.to_string().contains("point-3"));
        assert!(err.to_string().contains("latitude 91"));
    }

    #[test]
    fn test_option_ext() {
        let none: Option<i32> = None;
        let result = none.ok_or_no_map("zoom_to_fit");
        assert!(matches!(result, Err(MapError::NoMapInstance { .. })));
        assert_eq!(Some(3).ok_or_no_map("zoom_to_fit"), Ok(3));
    }
}
