//! rds-rotate-common - Shared types and utilities
//!
//! This crate provides the rotation document and the pure helpers used by the
//! orchestrator, without any AWS SDK dependencies to keep it lightweight.
//!
//! ## Modules
//!
//! - [`defaults`]: Default configuration values
//! - [`document`]: The persisted rotation document
//! - [`error`]: Document validation errors
//! - [`identifiers`]: Date-derived replica identifiers and clocks
//! - [`resource_kind`]: Instance vs cluster resource shapes
//! - [`slots`]: Current/previous slot transitions
//! - [`status`]: RDS status classification
//! - [`tags`]: Tag constants for clones and the deletion safety gate

pub mod defaults;
pub mod document;
pub mod error;
pub mod identifiers;
pub mod resource_kind;
pub mod slots;
pub mod status;
pub mod tags;

// Re-export commonly used types
pub use document::{DnsConfig, RotationState, Slot, Slots, SourceSpec};
pub use error::DocumentError;
pub use identifiers::{Clock, FixedClock, RotationIdentifiers, SystemClock};
pub use resource_kind::ResourceKind;
pub use slots::next_slots;
pub use status::ResourceStatus;
