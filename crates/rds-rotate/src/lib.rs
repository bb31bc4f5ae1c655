//! rds-rotate - blue-green rotation of RDS databases
//!
//! This crate provides the orchestrator that clones a source RDS instance or
//! Aurora cluster into a dated replica, configures and migrates it, points DNS
//! at it and retires the previous replica. Rotation state lives in a YAML
//! document (S3 or a local directory) so runs are resumable.

pub mod aws;
pub mod config;
pub mod dns;
pub mod error;
pub mod migrate;
pub mod orchestrator;
pub mod state;
pub mod wait;

pub use error::RotateError;
