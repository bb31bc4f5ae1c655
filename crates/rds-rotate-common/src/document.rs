//! The persisted rotation document
//!
//! One YAML document per named deployment. It describes what to clone, how to
//! configure the clone, and which physical replica is currently live. It is
//! read at the start of every rotation run and rewritten as a whole at the end
//! of a successful one.

use crate::defaults::default_dns_ttl;
use crate::error::DocumentError;
use crate::resource_kind::ResourceKind;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

const REDACTED: &str = "********";

/// DNSimple settings for the cutover record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DnsConfig {
    pub auth_token: String,
    pub account_id: String,
    pub domain: String,
    pub record_name: String,
    #[serde(default = "default_dns_ttl")]
    pub ttl: u32,
}

impl Default for DnsConfig {
    fn default() -> Self {
        Self {
            auth_token: String::new(),
            account_id: String::new(),
            domain: String::new(),
            record_name: String::new(),
            ttl: default_dns_ttl(),
        }
    }
}

impl DnsConfig {
    /// All fields needed for a cutover are populated
    pub fn is_complete(&self) -> bool {
        !self.auth_token.is_empty()
            && !self.account_id.is_empty()
            && !self.domain.is_empty()
            && !self.record_name.is_empty()
    }

    /// TTL to publish, falling back to the default for zero
    pub fn effective_ttl(&self) -> u32 {
        if self.ttl == 0 {
            default_dns_ttl()
        } else {
            self.ttl
        }
    }
}

/// One entry of the current/previous pointer
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Slot {
    pub instance_identifier: String,
    pub endpoint: String,
}

impl Slot {
    pub fn new(instance_identifier: impl Into<String>, endpoint: impl Into<String>) -> Self {
        Self {
            instance_identifier: instance_identifier.into(),
            endpoint: endpoint.into(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.instance_identifier.is_empty()
    }
}

/// The two-slot pointer
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Slots {
    pub current: Slot,
    pub previous: Slot,
}

/// Which resource to clone from, and the stem for clone identifiers
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceSpec {
    pub kind: ResourceKind,
    pub source_identifier: String,
    pub base_identifier: String,
}

/// Rotation document for one deployment
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RotationState {
    /// Source DB instance (instance-shaped deployments)
    pub source_identifier: String,
    /// Stem for dated DB instance identifiers
    pub target_base_identifier: String,
    /// Source Aurora cluster (cluster-shaped deployments)
    pub source_cluster_identifier: String,
    /// Stem for dated cluster identifiers
    pub target_cluster_base_identifier: String,

    pub instance_class: String,
    pub availability_zone: String,
    pub subnet_group: String,
    pub publicly_accessible: bool,
    pub security_group_ids: Vec<String>,
    pub tags: BTreeMap<String, String>,
    /// Empty leaves the master password unchanged
    pub master_password: String,

    pub dns_config: DnsConfig,
    pub migration_queries: Vec<String>,
    pub rollback_flag: bool,

    pub current: Slot,
    pub previous: Slot,
}

impl RotationState {
    /// Parse a document from YAML bytes
    pub fn from_yaml(bytes: &[u8]) -> Result<Self, DocumentError> {
        Ok(serde_yaml::from_slice(bytes)?)
    }

    /// Serialize the whole document to YAML
    pub fn to_yaml(&self) -> Result<String, DocumentError> {
        Ok(serde_yaml::to_string(self)?)
    }

    /// Resolve the source/target pair, rejecting ambiguous documents.
    pub fn source(&self) -> Result<SourceSpec, DocumentError> {
        let instance = pair(
            &self.source_identifier,
            "sourceIdentifier",
            &self.target_base_identifier,
            "targetBaseIdentifier",
        )?;
        let cluster = pair(
            &self.source_cluster_identifier,
            "sourceClusterIdentifier",
            &self.target_cluster_base_identifier,
            "targetClusterBaseIdentifier",
        )?;

        match (instance, cluster) {
            (Some(_), Some(_)) => Err(DocumentError::AmbiguousSource),
            (None, None) => Err(DocumentError::MissingSource),
            (Some((source, base)), None) => Ok(SourceSpec {
                kind: ResourceKind::DbInstance,
                source_identifier: source.to_string(),
                base_identifier: base.to_string(),
            }),
            (None, Some((source, base))) => Ok(SourceSpec {
                kind: ResourceKind::DbCluster,
                source_identifier: source.to_string(),
                base_identifier: base.to_string(),
            }),
        }
    }

    /// Validate everything a run needs before touching any resource.
    pub fn validate(&self, rollback: bool) -> Result<SourceSpec, DocumentError> {
        let source = self.source()?;
        if rollback && self.previous.is_empty() {
            return Err(DocumentError::NoPreviousSlot);
        }
        Ok(source)
    }

    pub fn slots(&self) -> Slots {
        Slots {
            current: self.current.clone(),
            previous: self.previous.clone(),
        }
    }

    pub fn set_slots(&mut self, slots: Slots) {
        self.current = slots.current;
        self.previous = slots.previous;
    }

    /// Copy of the document with secrets masked, for display
    pub fn redacted(&self) -> Self {
        let mut doc = self.clone();
        if !doc.master_password.is_empty() {
            doc.master_password = REDACTED.to_string();
        }
        if !doc.dns_config.auth_token.is_empty() {
            doc.dns_config.auth_token = REDACTED.to_string();
        }
        doc
    }
}

/// Both halves of an identifier pair, `None` when neither is set
fn pair<'a>(
    source: &'a str,
    source_field: &'static str,
    base: &'a str,
    base_field: &'static str,
) -> Result<Option<(&'a str, &'a str)>, DocumentError> {
    match (source.is_empty(), base.is_empty()) {
        (true, true) => Ok(None),
        (false, false) => Ok(Some((source, base))),
        (false, true) => Err(DocumentError::IncompletePair {
            field: base_field,
            other: source_field,
        }),
        (true, false) => Err(DocumentError::IncompletePair {
            field: source_field,
            other: base_field,
        }),
    }
}
