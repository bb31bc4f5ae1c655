//! Rotation error taxonomy
//!
//! Every failure that callers or tests need to tell apart is a variant here.
//! Steps wrap these in `anyhow` context naming the step and resource, so use
//! [`RotateError::find`] to recover the variant from a chain.

use rds_rotate_common::DocumentError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RotateError {
    /// The rotation document is missing or contradicts itself
    #[error("invalid rotation document: {0}")]
    Configuration(#[from] DocumentError),

    /// No rotation document under this name
    #[error("rotation document '{key}' not found")]
    StateNotFound { key: String },

    /// The waiter ran out of attempts
    #[error("{resource} not available after {attempts} attempts ({elapsed_secs}s)")]
    WaitTimeout {
        resource: String,
        attempts: u32,
        elapsed_secs: u64,
    },

    /// The resource is in a status that will never become available
    #[error("{resource} entered status '{status}' and will not become available")]
    UnexpectedStatus { resource: String, status: String },

    /// A resource the run depends on vanished
    #[error("{resource} does not exist")]
    Missing { resource: String },

    /// The previous replica is gone or on its way out
    #[error("cannot roll back to {resource}: {reason}")]
    RollbackUnavailable { resource: String, reason: String },

    /// A migration statement failed; the transaction was rolled back
    #[error("migration statement {index} failed: {message}")]
    Migration { index: usize, message: String },
}

impl RotateError {
    /// First `RotateError` in an anyhow chain
    pub fn find(error: &anyhow::Error) -> Option<&RotateError> {
        error.chain().find_map(|cause| cause.downcast_ref::<RotateError>())
    }
}
