//! Shared test utilities for integration tests
//!
//! In-memory stand-ins for every collaborator the rotator talks to. Generic
//! helpers (regions, sample documents) are in rds-rotate-test-utils.

#![allow(dead_code)]

use anyhow::{Result, anyhow};
use rds_rotate::RotateError;
use rds_rotate::aws::{
    AwsError, CreateClusterMemberRequest, DbClusterInfo, DbInstanceInfo, ModifyClusterRequest,
    ModifyInstanceRequest, RdsOperations, RestoreClusterRequest, RestoreInstanceRequest,
};
use rds_rotate::dns::DnsUpdater;
use rds_rotate::migrate::MigrationRunner;
use rds_rotate::orchestrator::{RotationOutcome, RotationProgressReporter, RotationStep};
use rds_rotate::state::{StateStore, decode_document};
use rds_rotate::wait::{WaitConfig, WaitSettings};
use rds_rotate_common::{DnsConfig, ResourceStatus, RotationState};
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub use rds_rotate_test_utils::fixtures::{cluster_document, instance_document, test_date};

pub const ENGINE: &str = "aurora-postgresql";

/// Waits that poll once a second with no ceiling, for paused-time tests
pub fn fast_waits() -> WaitSettings {
    let config = WaitConfig::instance()
        .with_interval(Duration::from_secs(1))
        .with_max_attempts(None);
    WaitSettings {
        instance: config.clone(),
        cluster: config,
    }
}

fn arn(kind: &str, identifier: &str) -> String {
    format!("arn:aws:rds:ap-northeast-1:123456789012:{kind}:{identifier}")
}

fn not_found(identifier: &str) -> anyhow::Error {
    AwsError::NotFound {
        message: format!("{identifier} not found"),
    }
    .into()
}

#[derive(Debug)]
struct FakeResource<T> {
    info: T,
    /// Statuses reported by successive describes before settling
    pending: VecDeque<ResourceStatus>,
}

#[derive(Debug, Default)]
struct FakeRdsInner {
    instances: HashMap<String, FakeResource<DbInstanceInfo>>,
    clusters: HashMap<String, FakeResource<DbClusterInfo>>,
    tags: HashMap<String, BTreeMap<String, String>>,
    fail_tags: bool,
    creating_polls: usize,
    deleting_polls: usize,
    calls: Vec<String>,
    instance_restores: Vec<RestoreInstanceRequest>,
    cluster_restores: Vec<RestoreClusterRequest>,
    member_creates: Vec<CreateClusterMemberRequest>,
    instance_modifies: Vec<ModifyInstanceRequest>,
    cluster_modifies: Vec<ModifyClusterRequest>,
}

impl FakeRdsInner {
    fn pending(&self, settle: ResourceStatus) -> VecDeque<ResourceStatus> {
        let mut pending: VecDeque<_> = (0..self.creating_polls)
            .map(|_| ResourceStatus::parse("creating"))
            .collect();
        pending.push_back(settle);
        pending
    }

    fn deleting(&self) -> VecDeque<ResourceStatus> {
        (0..self.deleting_polls)
            .map(|_| ResourceStatus::Deleting)
            .collect()
    }
}

/// In-memory RDS with scripted status progressions.
///
/// New resources report `creating` for `creating_polls` describes before
/// becoming available. Deleted resources report `deleting` for
/// `deleting_polls` describes and then disappear.
#[derive(Debug, Clone, Default)]
pub struct FakeRds {
    inner: Arc<Mutex<FakeRdsInner>>,
}

impl FakeRds {
    pub fn new() -> Self {
        let rds = Self::default();
        rds.inner.lock().unwrap().deleting_polls = 1;
        rds
    }

    pub fn with_creating_polls(self, polls: usize) -> Self {
        self.inner.lock().unwrap().creating_polls = polls;
        self
    }

    pub fn with_deleting_polls(self, polls: usize) -> Self {
        self.inner.lock().unwrap().deleting_polls = polls;
        self
    }

    /// Seed an existing instance in the given status
    pub fn with_instance(self, identifier: &str, status: &str) -> Self {
        {
            let mut inner = self.inner.lock().unwrap();
            let info = instance_info(identifier, ResourceStatus::parse(status), None);
            let pending = if info.status.is_deleting() {
                inner.deleting()
            } else {
                VecDeque::new()
            };
            inner.tags.entry(info.arn.clone()).or_default();
            inner
                .instances
                .insert(identifier.to_string(), FakeResource { info, pending });
        }
        self
    }

    /// Seed an existing cluster with its `-001` member, both available
    pub fn with_cluster(self, identifier: &str, status: &str) -> Self {
        {
            let mut inner = self.inner.lock().unwrap();
            let member = format!("{identifier}-001");
            let info = cluster_info(identifier, ResourceStatus::parse(status), Some(ENGINE));
            inner.tags.entry(info.arn.clone()).or_default();
            inner.clusters.insert(
                identifier.to_string(),
                FakeResource {
                    info: DbClusterInfo {
                        members: vec![member.clone()],
                        ..info
                    },
                    pending: VecDeque::new(),
                },
            );
            inner.instances.insert(
                member.clone(),
                FakeResource {
                    info: instance_info(&member, ResourceStatus::Available, Some(identifier)),
                    pending: VecDeque::new(),
                },
            );
        }
        self
    }

    /// Mark an existing instance as already being deleted
    pub fn with_instance_deleting(self, identifier: &str) -> Self {
        {
            let mut inner = self.inner.lock().unwrap();
            let deleting = inner.deleting();
            let resource = inner
                .instances
                .get_mut(identifier)
                .expect("deleting instance must exist");
            resource.info.status = ResourceStatus::Deleting;
            resource.pending = deleting;
        }
        self
    }

    pub fn with_tag(self, identifier: &str, key: &str, value: &str) -> Self {
        {
            let mut inner = self.inner.lock().unwrap();
            let arn = inner
                .instances
                .get(identifier)
                .map(|r| r.info.arn.clone())
                .or_else(|| inner.clusters.get(identifier).map(|r| r.info.arn.clone()))
                .expect("tagged resource must exist");
            inner
                .tags
                .entry(arn)
                .or_default()
                .insert(key.to_string(), value.to_string());
        }
        self
    }

    pub fn with_failing_tags(self) -> Self {
        self.inner.lock().unwrap().fail_tags = true;
        self
    }

    /// Script the statuses the next describes of an instance report
    pub fn script_instance(&self, identifier: &str, statuses: &[&str]) {
        let mut inner = self.inner.lock().unwrap();
        let resource = inner
            .instances
            .get_mut(identifier)
            .expect("scripted instance must exist");
        resource.pending = statuses.iter().map(|s| ResourceStatus::parse(s)).collect();
    }

    pub fn instance_exists(&self, identifier: &str) -> bool {
        self.inner.lock().unwrap().instances.contains_key(identifier)
    }

    pub fn cluster_exists(&self, identifier: &str) -> bool {
        self.inner.lock().unwrap().clusters.contains_key(identifier)
    }

    pub fn instance_status(&self, identifier: &str) -> Option<ResourceStatus> {
        self.inner
            .lock()
            .unwrap()
            .instances
            .get(identifier)
            .map(|r| r.info.status.clone())
    }

    pub fn cluster_status(&self, identifier: &str) -> Option<ResourceStatus> {
        self.inner
            .lock()
            .unwrap()
            .clusters
            .get(identifier)
            .map(|r| r.info.status.clone())
    }

    /// Mutating calls, in order, as `operation:identifier`
    pub fn calls(&self) -> Vec<String> {
        self.inner.lock().unwrap().calls.clone()
    }

    pub fn count(&self, operation: &str) -> usize {
        let prefix = format!("{operation}:");
        self.calls().iter().filter(|c| c.starts_with(&prefix)).count()
    }

    pub fn instance_restores(&self) -> Vec<RestoreInstanceRequest> {
        self.inner.lock().unwrap().instance_restores.clone()
    }

    pub fn cluster_restores(&self) -> Vec<RestoreClusterRequest> {
        self.inner.lock().unwrap().cluster_restores.clone()
    }

    pub fn member_creates(&self) -> Vec<CreateClusterMemberRequest> {
        self.inner.lock().unwrap().member_creates.clone()
    }

    pub fn instance_modifies(&self) -> Vec<ModifyInstanceRequest> {
        self.inner.lock().unwrap().instance_modifies.clone()
    }

    pub fn cluster_modifies(&self) -> Vec<ModifyClusterRequest> {
        self.inner.lock().unwrap().cluster_modifies.clone()
    }

    fn record(&self, operation: &str, identifier: &str) {
        self.inner
            .lock()
            .unwrap()
            .calls
            .push(format!("{operation}:{identifier}"));
    }
}

fn instance_info(identifier: &str, status: ResourceStatus, cluster: Option<&str>) -> DbInstanceInfo {
    DbInstanceInfo {
        identifier: identifier.to_string(),
        arn: arn("db", identifier),
        status,
        endpoint: Some(format!("{identifier}.fake.rds.example")),
        port: Some(5432),
        db_name: Some("app".to_string()),
        master_username: Some("admin".to_string()),
        cluster_identifier: cluster.map(str::to_string),
    }
}

fn cluster_info(identifier: &str, status: ResourceStatus, engine: Option<&str>) -> DbClusterInfo {
    DbClusterInfo {
        identifier: identifier.to_string(),
        arn: arn("cluster", identifier),
        status,
        endpoint: Some(format!("{identifier}.cluster-fake.rds.example")),
        port: Some(5432),
        database_name: None,
        master_username: Some("admin".to_string()),
        engine: engine.map(str::to_string),
        members: Vec::new(),
    }
}

/// Advance a resource one describe; `None` once a deletion has finished
fn advance<T: Clone>(
    resource: &mut FakeResource<T>,
    status: impl Fn(&mut T) -> &mut ResourceStatus,
) -> Option<T> {
    match resource.pending.pop_front() {
        Some(next) => *status(&mut resource.info) = next,
        None if status(&mut resource.info).is_deleting() => return None,
        None => {}
    }
    Some(resource.info.clone())
}

impl RdsOperations for FakeRds {
    async fn describe_instance(&self, identifier: &str) -> Result<Option<DbInstanceInfo>> {
        let mut inner = self.inner.lock().unwrap();
        let Some(resource) = inner.instances.get_mut(identifier) else {
            return Ok(None);
        };
        match advance(resource, |i| &mut i.status) {
            Some(info) => Ok(Some(info)),
            None => {
                inner.instances.remove(identifier);
                for cluster in inner.clusters.values_mut() {
                    cluster.info.members.retain(|m| m != identifier);
                }
                Ok(None)
            }
        }
    }

    async fn describe_cluster(&self, identifier: &str) -> Result<Option<DbClusterInfo>> {
        let mut inner = self.inner.lock().unwrap();
        let Some(resource) = inner.clusters.get_mut(identifier) else {
            return Ok(None);
        };
        match advance(resource, |c| &mut c.status) {
            Some(info) => Ok(Some(info)),
            None => {
                inner.clusters.remove(identifier);
                Ok(None)
            }
        }
    }

    async fn restore_instance(&self, request: &RestoreInstanceRequest) -> Result<()> {
        self.record("restore_instance", &request.target_identifier);
        let mut inner = self.inner.lock().unwrap();
        if !inner.instances.contains_key(&request.source_identifier) {
            return Err(not_found(&request.source_identifier));
        }
        if inner.instances.contains_key(&request.target_identifier) {
            return Err(AwsError::AlreadyExists {
                message: request.target_identifier.clone(),
            }
            .into());
        }
        let info = instance_info(
            &request.target_identifier,
            ResourceStatus::parse("creating"),
            None,
        );
        let pending = inner.pending(ResourceStatus::Available);
        inner.tags.insert(info.arn.clone(), request.tags.clone());
        inner
            .instances
            .insert(request.target_identifier.clone(), FakeResource { info, pending });
        inner.instance_restores.push(request.clone());
        Ok(())
    }

    async fn restore_cluster(&self, request: &RestoreClusterRequest) -> Result<()> {
        self.record("restore_cluster", &request.target_identifier);
        let mut inner = self.inner.lock().unwrap();
        if !inner.clusters.contains_key(&request.source_identifier) {
            return Err(not_found(&request.source_identifier));
        }
        if inner.clusters.contains_key(&request.target_identifier) {
            return Err(AwsError::AlreadyExists {
                message: request.target_identifier.clone(),
            }
            .into());
        }
        // No engine, so members fall back to the source cluster's
        let info = cluster_info(
            &request.target_identifier,
            ResourceStatus::parse("creating"),
            None,
        );
        let pending = inner.pending(ResourceStatus::Available);
        inner.tags.insert(info.arn.clone(), request.tags.clone());
        inner
            .clusters
            .insert(request.target_identifier.clone(), FakeResource { info, pending });
        inner.cluster_restores.push(request.clone());
        Ok(())
    }

    async fn create_cluster_member(&self, request: &CreateClusterMemberRequest) -> Result<()> {
        self.record("create_cluster_member", &request.instance_identifier);
        let mut inner = self.inner.lock().unwrap();
        let pending = inner.pending(ResourceStatus::Available);
        let Some(cluster) = inner.clusters.get_mut(&request.cluster_identifier) else {
            return Err(not_found(&request.cluster_identifier));
        };
        if !cluster.info.status.is_available() {
            return Err(AwsError::NotReady {
                message: format!("{} is {}", request.cluster_identifier, cluster.info.status),
            }
            .into());
        }
        cluster.info.members.push(request.instance_identifier.clone());
        let info = instance_info(
            &request.instance_identifier,
            ResourceStatus::parse("creating"),
            Some(&request.cluster_identifier),
        );
        inner.tags.insert(info.arn.clone(), request.tags.clone());
        inner.instances.insert(
            request.instance_identifier.clone(),
            FakeResource { info, pending },
        );
        inner.member_creates.push(request.clone());
        Ok(())
    }

    async fn modify_instance(&self, request: &ModifyInstanceRequest) -> Result<()> {
        self.record("modify_instance", &request.identifier);
        let mut inner = self.inner.lock().unwrap();
        if !inner.instances.contains_key(&request.identifier) {
            return Err(not_found(&request.identifier));
        }
        inner.instance_modifies.push(request.clone());
        Ok(())
    }

    async fn modify_cluster(&self, request: &ModifyClusterRequest) -> Result<()> {
        self.record("modify_cluster", &request.identifier);
        let mut inner = self.inner.lock().unwrap();
        if !inner.clusters.contains_key(&request.identifier) {
            return Err(not_found(&request.identifier));
        }
        inner.cluster_modifies.push(request.clone());
        Ok(())
    }

    async fn delete_instance(&self, identifier: &str) -> Result<()> {
        self.record("delete_instance", identifier);
        let mut inner = self.inner.lock().unwrap();
        let deleting = inner.deleting();
        if let Some(resource) = inner.instances.get_mut(identifier) {
            // RDS rejects a second delete with InvalidDBInstanceStateFault
            if resource.info.status.is_deleting() {
                return Err(AwsError::NotReady {
                    message: format!("{identifier} is already being deleted"),
                }
                .into());
            }
            resource.info.status = ResourceStatus::Deleting;
            resource.pending = deleting;
        }
        Ok(())
    }

    async fn delete_cluster(&self, identifier: &str) -> Result<()> {
        self.record("delete_cluster", identifier);
        let mut inner = self.inner.lock().unwrap();
        let deleting = inner.deleting();
        let Some(cluster) = inner.clusters.get(identifier) else {
            return Ok(());
        };
        let live_members = cluster.info.members.iter().any(|m| {
            inner
                .instances
                .get(m)
                .is_some_and(|i| !i.info.status.is_deleting())
        });
        if live_members {
            return Err(AwsError::NotReady {
                message: format!("{identifier} still has live members"),
            }
            .into());
        }
        if let Some(cluster) = inner.clusters.get_mut(identifier) {
            cluster.info.status = ResourceStatus::Deleting;
            cluster.pending = deleting;
        }
        Ok(())
    }

    async fn list_tags(&self, arn: &str) -> Result<BTreeMap<String, String>> {
        let inner = self.inner.lock().unwrap();
        if inner.fail_tags {
            return Err(anyhow!("AccessDenied: rds:ListTagsForResource"));
        }
        Ok(inner.tags.get(arn).cloned().unwrap_or_default())
    }
}

/// Rotation documents held as YAML, keyed by deployment name
#[derive(Debug, Clone, Default)]
pub struct MemoryStateStore {
    documents: Arc<Mutex<HashMap<String, Vec<u8>>>>,
    saves: Arc<Mutex<usize>>,
}

impl MemoryStateStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_document(self, name: &str, state: &RotationState) -> Self {
        self.insert_raw(name, state.to_yaml().unwrap().as_bytes());
        self
    }

    pub fn insert_raw(&self, name: &str, bytes: &[u8]) {
        self.documents
            .lock()
            .unwrap()
            .insert(name.to_string(), bytes.to_vec());
    }

    pub fn document(&self, name: &str) -> Option<RotationState> {
        self.documents
            .lock()
            .unwrap()
            .get(name)
            .map(|bytes| RotationState::from_yaml(bytes).unwrap())
    }

    pub fn saves(&self) -> usize {
        *self.saves.lock().unwrap()
    }
}

impl StateStore for MemoryStateStore {
    async fn load(&self, name: &str) -> Result<RotationState> {
        let bytes = self.documents.lock().unwrap().get(name).cloned();
        match bytes {
            Some(bytes) => decode_document(&bytes),
            None => Err(RotateError::StateNotFound {
                key: name.to_string(),
            }
            .into()),
        }
    }

    async fn save(&self, name: &str, state: &RotationState) -> Result<()> {
        self.insert_raw(name, state.to_yaml()?.as_bytes());
        *self.saves.lock().unwrap() += 1;
        Ok(())
    }
}

/// Records every upsert as `(record_name, target)`
#[derive(Debug, Clone, Default)]
pub struct RecordingDns {
    upserts: Arc<Mutex<Vec<(String, String)>>>,
}

impl RecordingDns {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn upserts(&self) -> Vec<(String, String)> {
        self.upserts.lock().unwrap().clone()
    }
}

impl DnsUpdater for RecordingDns {
    async fn upsert_cname(&self, config: &DnsConfig, target: &str) -> Result<()> {
        self.upserts
            .lock()
            .unwrap()
            .push((config.record_name.clone(), target.to_string()));
        Ok(())
    }
}

/// Migration runner that can fail at a 1-based statement index
#[derive(Debug, Clone, Default)]
pub struct FakeMigrator {
    fail_at: Option<usize>,
    connections: Arc<Mutex<Vec<String>>>,
    committed: Arc<Mutex<Vec<String>>>,
}

impl FakeMigrator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_at(index: usize) -> Self {
        Self {
            fail_at: Some(index),
            ..Self::default()
        }
    }

    pub fn connections(&self) -> Vec<String> {
        self.connections.lock().unwrap().clone()
    }

    /// Statements from committed transactions only
    pub fn committed(&self) -> Vec<String> {
        self.committed.lock().unwrap().clone()
    }
}

impl MigrationRunner for FakeMigrator {
    async fn run_in_transaction(&self, connection_string: &str, statements: &[String]) -> Result<()> {
        self.connections
            .lock()
            .unwrap()
            .push(connection_string.to_string());
        if let Some(index) = self.fail_at.filter(|i| *i <= statements.len()) {
            return Err(RotateError::Migration {
                index,
                message: format!("syntax error in '{}'", statements[index - 1]),
            }
            .into());
        }
        self.committed
            .lock()
            .unwrap()
            .extend(statements.iter().cloned());
        Ok(())
    }
}

/// Reporter that keeps every event as a string
#[derive(Debug, Clone, Default)]
pub struct RecordingReporter {
    events: Arc<Mutex<Vec<String>>>,
}

impl RecordingReporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<String> {
        self.events.lock().unwrap().clone()
    }

    pub fn steps(&self) -> Vec<RotationStep> {
        use strum::IntoEnumIterator;
        self.events()
            .iter()
            .filter_map(|e| e.strip_prefix("step:"))
            .filter_map(|e| {
                RotationStep::iter().find(|s| e.split(':').next() == Some(s.as_ref()))
            })
            .collect()
    }
}

impl RotationProgressReporter for RecordingReporter {
    fn report_step(&self, step: RotationStep, resource: &str) {
        self.events
            .lock()
            .unwrap()
            .push(format!("step:{step}:{resource}"));
    }

    fn report_skip(&self, step: RotationStep, _reason: &str) {
        self.events.lock().unwrap().push(format!("skip:{step}"));
    }

    fn report_failure(&self, step: RotationStep, _error: &anyhow::Error) {
        self.events.lock().unwrap().push(format!("failure:{step}"));
    }

    fn report_outcome(&self, outcome: &RotationOutcome) {
        self.events
            .lock()
            .unwrap()
            .push(format!("outcome:{}", outcome.target));
    }
}
