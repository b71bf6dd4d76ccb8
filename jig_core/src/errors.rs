//! # Error Types
//!
//! Structured error types for jig_core's workflow layer (state editing,
//! calibration runs, file I/O). The pure geometry functions never return
//! these: they report degenerate inputs as non-finite numbers or `None`.
//!
//! ## Example
//!
//! ```rust
//! use jig_core::errors::{CalcError, CalcResult};
//!
//! fn validate_diameter(diameter_mm: f64) -> CalcResult<()> {
//!     if !(diameter_mm > 0.0) {
//!         return Err(CalcError::invalid_input(
//!             "diameter_mm",
//!             diameter_mm.to_string(),
//!             "Diameter must be positive",
//!         ));
//!     }
//!     Ok(())
//! }
//! ```

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type alias for jig_core operations
pub type CalcResult<T> = Result<T, CalcError>;

/// Structured error type for workflow operations.
#[derive(Error, Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", content = "details")]
pub enum CalcError {
    /// An input value is invalid (out of range, not finite, etc.)
    #[error("Invalid input for '{field}': {value} - {reason}")]
    InvalidInput {
        field: String,
        value: String,
        reason: String,
    },

    /// A required field is missing
    #[error("Missing required field: {field}")]
    MissingField { field: String },

    /// No wheel with this id exists
    #[error("Wheel not found: {wheel_id}")]
    WheelNotFound { wheel_id: String },

    /// No progression step with this id exists
    #[error("Progression step not found: {step_id}")]
    StepNotFound { step_id: String },

    /// No preset with this id exists
    #[error("Preset not found: {preset_id}")]
    PresetNotFound { preset_id: String },

    /// A preset with the same name (case-insensitive) already exists
    #[error("A preset named '{name}' already exists")]
    DuplicatePreset { name: String },

    /// Calibration inputs are incomplete
    #[error("Missing or invalid: {}", missing.join(", "))]
    InvalidCalibration { missing: Vec<String> },

    /// The calibration solver could not produce constants
    #[error("Calibration failed: {reason}")]
    CalibrationFailed { reason: String },

    /// No calibration snapshot with this id exists
    #[error("Calibration snapshot not found: {snapshot_id}")]
    SnapshotNotFound { snapshot_id: String },

    /// File I/O error
    #[error("File error: {operation} on '{path}' - {reason}")]
    FileError {
        operation: String,
        path: String,
        reason: String,
    },

    /// JSON serialization/deserialization error
    #[error("Serialization error: {reason}")]
    SerializationError { reason: String },

    /// State file carries an unusable version number
    #[error("Version mismatch: file version {file_version}, expected {expected_version}")]
    VersionMismatch {
        file_version: String,
        expected_version: String,
    },
}

impl CalcError {
    /// Create an InvalidInput error
    pub fn invalid_input(field: impl Into<String>, value: impl Into<String>, reason: impl Into<String>) -> Self {
        CalcError::InvalidInput {
            field: field.into(),
            value: value.into(),
            reason: reason.into(),
        }
    }

    /// Create a MissingField error
    pub fn missing_field(field: impl Into<String>) -> Self {
        CalcError::MissingField {
            field: field.into(),
        }
    }

    pub fn wheel_not_found(wheel_id: impl Into<String>) -> Self {
        CalcError::WheelNotFound {
            wheel_id: wheel_id.into(),
        }
    }

    pub fn calibration_failed(reason: impl Into<String>) -> Self {
        CalcError::CalibrationFailed {
            reason: reason.into(),
        }
    }

    /// Create a FileError
    pub fn file_error(operation: impl Into<String>, path: impl Into<String>, reason: impl Into<String>) -> Self {
        CalcError::FileError {
            operation: operation.into(),
            path: path.into(),
            reason: reason.into(),
        }
    }

    pub fn serialization(reason: impl Into<String>) -> Self {
        CalcError::SerializationError {
            reason: reason.into(),
        }
    }

    /// Get a short error code for programmatic handling
    pub fn error_code(&self) -> &'static str {
        match self {
            CalcError::InvalidInput { .. } => "INVALID_INPUT",
            CalcError::MissingField { .. } => "MISSING_FIELD",
            CalcError::WheelNotFound { .. } => "WHEEL_NOT_FOUND",
            CalcError::StepNotFound { .. } => "STEP_NOT_FOUND",
            CalcError::PresetNotFound { .. } => "PRESET_NOT_FOUND",
            CalcError::DuplicatePreset { .. } => "DUPLICATE_PRESET",
            CalcError::InvalidCalibration { .. } => "INVALID_CALIBRATION",
            CalcError::CalibrationFailed { .. } => "CALIBRATION_FAILED",
            CalcError::SnapshotNotFound { .. } => "SNAPSHOT_NOT_FOUND",
            CalcError::FileError { .. } => "FILE_ERROR",
            CalcError::SerializationError { .. } => "SERIALIZATION_ERROR",
            CalcError::VersionMismatch { .. } => "VERSION_MISMATCH",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_serialization() {
        let error = CalcError::invalid_input("diameter_mm", "-250", "Diameter must be positive");
        let json = serde_json::to_string(&error).unwrap();
        let roundtrip: CalcError = serde_json::from_str(&json).unwrap();
        assert_eq!(error, roundtrip);
    }

    #[test]
    fn test_error_codes() {
        assert_eq!(CalcError::missing_field("name").error_code(), "MISSING_FIELD");
        assert_eq!(CalcError::wheel_not_found("w-1").error_code(), "WHEEL_NOT_FOUND");
    }

    #[test]
    fn test_invalid_calibration_message_lists_fields() {
        let error = CalcError::InvalidCalibration {
            missing: vec!["Axle diameter".to_string(), "Row 2 CAo".to_string()],
        };
        assert_eq!(error.to_string(), "Missing or invalid: Axle diameter, Row 2 CAo");
    }
}
