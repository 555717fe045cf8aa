//! Error type for branch-mapping validation
//!
//! Every structural or semantic violation in the branch-mapping and rollout
//! layers surfaces as a [`BranchMappingValidationError`]:
//! - Parse failures (malformed JSON, tokens outside the node grammar)
//! - Version mismatches
//! - Node shape assertions
//! - Percent range violations
//! - Rollout classification and id cross-reference failures
//!
//! None of these are retryable: every producer is a pure function of its input.

use serde::Serialize;

/// Validation failure for a branch mapping or a value derived from one
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BranchMappingValidationError {
    /// Raw string is not a well-formed branch mapping
    #[error("failed to parse branch mapping: {message}")]
    Parse {
        /// Decoder message, with the raw input
        message: String,
    },

    /// Branch mapping could not be written back to its wire form
    #[error("failed to serialize branch mapping: {message}")]
    Serialize {
        /// Encoder message
        message: String,
    },

    /// Mapping declares a version other than the one the caller understands
    #[error("branch mapping version mismatch: expected {expected}, got {actual}")]
    VersionMismatch {
        /// Version the caller understands
        expected: u32,
        /// Version the mapping declares
        actual: u32,
    },

    /// A node or operand did not have the shape the caller required
    #[error("expected {expected}, got {value}")]
    UnexpectedShape {
        /// Description of the required shape
        expected: &'static str,
        /// Offending value as JSON
        value: String,
    },

    /// Percent is not an integer in `[0, 100]`
    #[error("percent must be an integer between 0 and 100 inclusive, got {value}")]
    InvalidPercent {
        /// Rejected input as written
        value: String,
    },

    /// Mapping does not match either rollout dialect
    #[error("branch mapping is not a rollout: {mapping}")]
    NotARollout {
        /// Mapping as JSON
        mapping: String,
    },

    /// No constrained rollout entry targets the runtime version
    #[error("no rollout found for runtime version '{runtime_version}'")]
    NoMatchingRollout {
        /// Runtime version searched for
        runtime_version: String,
    },

    /// A freshly constructed mapping failed its own classifier
    #[error(
        "constructed branch mapping is not a rollout for runtime version '{runtime_version}'"
    )]
    PostconditionFailed {
        /// Runtime version of the inserted rollout
        runtime_version: String,
    },

    /// Branch entity does not match the id recorded in the rollout info
    #[error("{role} branch id mismatch: rollout expects '{expected}', got '{actual}'")]
    BranchIdMismatch {
        /// Which branch of the rollout, `default` or `rolled out`
        role: &'static str,
        /// Id recorded in the rollout info
        expected: String,
        /// Id of the branch entity supplied
        actual: String,
    },

    /// Branch id is not present in the channel's branch list
    #[error("branch '{branch_id}' not found in channel '{channel}'")]
    BranchNotFound {
        /// Channel name
        channel: String,
        /// Missing branch id
        branch_id: String,
    },

    /// Channel mapping is not a single always-true entry
    #[error("channel '{channel}' does not have a standard branch mapping: {mapping}")]
    NotStandardMapping {
        /// Channel name
        channel: String,
        /// Channel's mapping as JSON
        mapping: String,
    },
}

impl BranchMappingValidationError {
    /// Create shape error carrying the offending value as JSON
    pub fn unexpected_shape(expected: &'static str, value: &impl Serialize) -> Self {
        Self::UnexpectedShape {
            expected,
            value: to_diagnostic_json(value),
        }
    }

    /// Create not-a-rollout error carrying the mapping as JSON
    pub fn not_a_rollout(mapping: &impl Serialize) -> Self {
        Self::NotARollout {
            mapping: to_diagnostic_json(mapping),
        }
    }

    /// Create invalid percent error
    pub fn invalid_percent(value: impl ToString) -> Self {
        Self::InvalidPercent {
            value: value.to_string(),
        }
    }

    /// Create branch id mismatch error
    pub fn branch_id_mismatch(
        role: &'static str,
        expected: impl Into<String>,
        actual: impl Into<String>,
    ) -> Self {
        Self::BranchIdMismatch {
            role,
            expected: expected.into(),
            actual: actual.into(),
        }
    }
}

/// Serialize a value for inclusion in an error message
pub(crate) fn to_diagnostic_json(value: &impl Serialize) -> String {
    serde_json::to_string(value).unwrap_or_else(|e| format!("<unserializable: {e}>"))
}

/// Result type alias for branch-mapping operations
pub type BranchMappingResult<T> = Result<T, BranchMappingValidationError>;
