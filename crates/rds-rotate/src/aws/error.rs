//! AWS error classification and handling
//!
//! Provides typed errors for AWS SDK operations using the `.code()` method
//! instead of string matching on Debug format.

use aws_sdk_rds::error::ProvideErrorMetadata;
use thiserror::Error;

/// AWS error categories for retry and teardown logic
#[derive(Debug, Error)]
pub enum AwsError {
    /// Resource was not found (safe to skip in teardown)
    #[error("Resource not found: {message}")]
    NotFound { message: String },

    /// Resource already exists
    #[error("Resource already exists: {message}")]
    AlreadyExists { message: String },

    /// Resource is mid-transition and cannot serve the request yet (retryable)
    #[error("Resource not ready: {message}")]
    NotReady { message: String },

    /// Rate limit exceeded
    #[error("Rate limit exceeded")]
    Throttled,

    /// Generic AWS SDK error with code and message
    #[error("AWS error{}: {message}", code.as_deref().map(|c| format!(" ({c})")).unwrap_or_default())]
    Sdk {
        code: Option<String>,
        message: String,
    },
}

impl AwsError {
    /// Classify any SDK error that exposes error metadata.
    pub fn from_sdk<E: ProvideErrorMetadata>(error: &E) -> Self {
        classify_aws_error(error.code(), error.message())
    }

    /// Check if this is a "not found" error
    pub fn is_not_found(&self) -> bool {
        matches!(self, AwsError::NotFound { .. })
    }

    /// Check if this is the "resource not ready" class the waiter retries on
    pub fn is_not_ready(&self) -> bool {
        matches!(self, AwsError::NotReady { .. })
    }

    /// Check if this error is transient and the request should be retried
    pub fn is_retryable(&self) -> bool {
        matches!(self, AwsError::Throttled)
    }

    /// Check if this is an "already exists" error
    pub fn is_already_exists(&self) -> bool {
        matches!(self, AwsError::AlreadyExists { .. })
    }

    /// Get a user-friendly suggestion for resolving this error, if available.
    pub fn suggestion(&self) -> Option<String> {
        match self {
            AwsError::Sdk { code: Some(c), .. } => suggestion_for_code(c),
            _ => None,
        }
    }
}

/// Known AWS error codes for "not found" conditions
const NOT_FOUND_CODES: &[&str] = &[
    "DBInstanceNotFound",
    "DBInstanceNotFoundFault",
    "DBClusterNotFoundFault",
    "DBSnapshotNotFound",
    "NoSuchBucket",
    "NoSuchKey",
];

/// Known AWS error codes for "already exists" conditions
const ALREADY_EXISTS_CODES: &[&str] = &[
    "DBInstanceAlreadyExists",
    "DBInstanceAlreadyExistsFault",
    "DBClusterAlreadyExistsFault",
];

/// Known AWS error codes reported while a resource is mid-transition
const NOT_READY_CODES: &[&str] = &[
    "InvalidDBInstanceState",
    "InvalidDBInstanceStateFault",
    "InvalidDBClusterStateFault",
];

/// Known AWS error codes for throttling/rate limiting
const THROTTLING_CODES: &[&str] = &["Throttling", "ThrottlingException", "RequestLimitExceeded"];

/// Classify an AWS SDK error using the error code.
pub fn classify_aws_error(code: Option<&str>, message: Option<&str>) -> AwsError {
    let message = message.unwrap_or("Unknown error").to_string();

    match code {
        Some(c) if NOT_FOUND_CODES.contains(&c) => AwsError::NotFound { message },
        Some(c) if ALREADY_EXISTS_CODES.contains(&c) => AwsError::AlreadyExists { message },
        Some(c) if NOT_READY_CODES.contains(&c) => AwsError::NotReady { message },
        Some(c) if THROTTLING_CODES.contains(&c) => AwsError::Throttled,
        _ => AwsError::Sdk {
            code: code.map(|s| s.to_string()),
            message,
        },
    }
}

/// Find the classified AWS error in an anyhow error chain.
///
/// Errors that never went through [`AwsError::from_sdk`] classify as a
/// generic SDK error carrying the top-level message.
pub fn classify_anyhow_error(error: &anyhow::Error) -> AwsError {
    for cause in error.chain() {
        if let Some(aws) = cause.downcast_ref::<AwsError>() {
            return match aws {
                AwsError::NotFound { message } => AwsError::NotFound {
                    message: message.clone(),
                },
                AwsError::AlreadyExists { message } => AwsError::AlreadyExists {
                    message: message.clone(),
                },
                AwsError::NotReady { message } => AwsError::NotReady {
                    message: message.clone(),
                },
                AwsError::Throttled => AwsError::Throttled,
                AwsError::Sdk { code, message } => AwsError::Sdk {
                    code: code.clone(),
                    message: message.clone(),
                },
            };
        }
    }

    AwsError::Sdk {
        code: None,
        message: error.to_string(),
    }
}

/// Treat "not found" as success, for idempotent deletes.
pub fn ignore_not_found(result: Result<(), AwsError>) -> Result<(), AwsError> {
    match result {
        Err(e) if e.is_not_found() => Ok(()),
        other => other,
    }
}

/// Error code to user-friendly suggestion mapping
const SUGGESTIONS: &[(&str, &str)] = &[
    (
        "InsufficientDBInstanceCapacity",
        "Try a different availability zone or instance class.",
    ),
    (
        "InstanceQuotaExceeded",
        "Request a service limit increase via AWS Service Quotas console.",
    ),
    (
        "StorageQuotaExceeded",
        "Request a service limit increase via AWS Service Quotas console.",
    ),
    (
        "PointInTimeRestoreNotEnabled",
        "Enable automated backups on the source so it has a restorable time.",
    ),
    (
        "InvalidRestoreFault",
        "Check the source's backup retention and the restore parameters.",
    ),
    (
        "DBSubnetGroupNotFoundFault",
        "Check subnetGroup in the rotation document.",
    ),
];

/// Get a user-friendly suggestion for a known error code.
fn suggestion_for_code(code: &str) -> Option<String> {
    SUGGESTIONS
        .iter()
        .find(|(c, _)| *c == code)
        .map(|(_, s)| (*s).to_string())
}
