//! Creating a deployment's first rotation document

use crate::error::RotateError;
use crate::state::StateStore;
use anyhow::Result;
use rds_rotate_common::{DnsConfig, RotationState, Slot, SourceSpec};
use std::collections::BTreeMap;
use tracing::info;

/// Suffixes of the placeholder slots a new deployment starts with
pub const BLUE_SUFFIX: &str = "-blue";
pub const GREEN_SUFFIX: &str = "-green";

/// Settings for a new deployment
#[derive(Debug, Clone, Default)]
pub struct NewDeployment {
    pub source_identifier: String,
    pub target_base_identifier: String,
    pub source_cluster_identifier: String,
    pub target_cluster_base_identifier: String,
    pub instance_class: String,
    pub availability_zone: String,
    pub subnet_group: String,
    pub publicly_accessible: bool,
    pub security_group_ids: Vec<String>,
    pub tags: BTreeMap<String, String>,
    pub master_password: String,
    pub dns_config: DnsConfig,
    pub migration_queries: Vec<String>,
}

/// Validated initial document with `<base>-blue` current and `<base>-green`
/// previous placeholder slots.
pub fn initial_document(new: NewDeployment) -> Result<(RotationState, SourceSpec), RotateError> {
    let mut state = RotationState {
        source_identifier: new.source_identifier,
        target_base_identifier: new.target_base_identifier,
        source_cluster_identifier: new.source_cluster_identifier,
        target_cluster_base_identifier: new.target_cluster_base_identifier,
        instance_class: new.instance_class,
        availability_zone: new.availability_zone,
        subnet_group: new.subnet_group,
        publicly_accessible: new.publicly_accessible,
        security_group_ids: new.security_group_ids,
        tags: new.tags,
        master_password: new.master_password,
        dns_config: new.dns_config,
        migration_queries: new.migration_queries,
        ..Default::default()
    };
    let source = state.source()?;
    state.current = Slot::new(format!("{}{BLUE_SUFFIX}", source.base_identifier), "");
    state.previous = Slot::new(format!("{}{GREEN_SUFFIX}", source.base_identifier), "");
    Ok((state, source))
}

/// Store a new document, refusing to replace an existing one unless `force`.
pub async fn create_deployment<S: StateStore>(
    store: &S,
    name: &str,
    state: &RotationState,
    force: bool,
) -> Result<()> {
    match store.load(name).await {
        Ok(_) if !force => {
            anyhow::bail!("deployment '{name}' already exists (pass --force to overwrite)")
        }
        Ok(_) => info!(deployment = %name, "Overwriting existing deployment"),
        Err(e) if matches!(RotateError::find(&e), Some(RotateError::StateNotFound { .. })) => {}
        Err(e) if matches!(RotateError::find(&e), Some(RotateError::Configuration(_))) && force => {
            info!(deployment = %name, "Replacing unreadable deployment document");
        }
        Err(e) => return Err(e),
    }

    store.save(name, state).await?;
    info!(deployment = %name, current = %state.current.instance_identifier, "Deployment created");
    Ok(())
}
