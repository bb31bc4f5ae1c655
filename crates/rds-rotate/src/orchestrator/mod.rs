//! Rotation orchestration
//!
//! The [`Rotator`] drives one rotation run over a [`CloneTarget`], reporting
//! each step through a [`RotationProgressReporter`].

pub mod bootstrap;
pub mod pipeline;
pub mod progress;
pub mod safety;
pub mod target;
pub mod types;

pub use bootstrap::{NewDeployment, create_deployment, initial_document};
pub use pipeline::Rotator;
pub use progress::{LogReporter, RotationProgressReporter};
pub use safety::is_protected_resource;
pub use target::{CloneConfig, CloneTarget, LiveResource};
pub use types::{RetireOutcome, RotateOptions, RotationOutcome, RotationStep};
