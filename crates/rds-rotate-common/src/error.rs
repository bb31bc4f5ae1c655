//! Rotation document validation errors

use thiserror::Error;

/// Errors raised while parsing or validating a rotation document
#[derive(Debug, Error)]
pub enum DocumentError {
    /// Neither the instance pair nor the cluster pair is populated
    #[error(
        "no source configured: set sourceIdentifier/targetBaseIdentifier or \
         sourceClusterIdentifier/targetClusterBaseIdentifier"
    )]
    MissingSource,

    /// Both the instance pair and the cluster pair are populated
    #[error("instance and cluster sources are mutually exclusive")]
    AmbiguousSource,

    /// One half of an identifier pair is set without the other
    #[error("{field} is required when {other} is set")]
    IncompletePair {
        field: &'static str,
        other: &'static str,
    },

    /// Rollback requested without a previous replica on record
    #[error("rollbackFlag is set but previous.instanceIdentifier is empty")]
    NoPreviousSlot,

    /// YAML (de)serialization failed
    #[error("failed to parse rotation document: {0}")]
    Parse(#[from] serde_yaml::Error),
}
