//! In-memory fakes for capability clients (testing only)
//!
//! Every fake counts calls per method and supports fault injection, so tests
//! can assert both "what was delivered" and "how many collaborator calls were
//! made".

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{Duration as ChronoDuration, Utc};
use futures::FutureExt;

use crate::error::{ClientError, ClientResult};
use crate::model::*;
use crate::traits::*;

// ---------------------------------------------------------------------------
// Shared call recorder
// ---------------------------------------------------------------------------

/// Per-method call counts plus scripted failures.
#[derive(Debug, Default)]
pub struct Recorder {
    calls: Mutex<HashMap<&'static str, usize>>,
    faults: Mutex<HashMap<&'static str, (u32, ClientError)>>,
}

impl Recorder {
    /// Fail the next `times` calls of `method` with `err`. `u32::MAX` fails forever.
    pub fn inject(&self, method: &'static str, times: u32, err: ClientError) {
        self.faults.lock().unwrap().insert(method, (times, err));
    }

    /// Number of times `method` was invoked, failed calls included.
    pub fn count(&self, method: &'static str) -> usize {
        self.calls.lock().unwrap().get(method).copied().unwrap_or(0)
    }

    fn hit(&self, method: &'static str) -> ClientResult<()> {
        *self.calls.lock().unwrap().entry(method).or_default() += 1;

        let mut faults = self.faults.lock().unwrap();
        if let Some((remaining, err)) = faults.get_mut(method) {
            if *remaining > 0 {
                if *remaining != u32::MAX {
                    *remaining -= 1;
                }
                return Err(err.clone());
            }
        }
        Ok(())
    }
}

/// A ready, classic AWS cluster with `id` as both internal and external id.
pub fn cluster(id: &str) -> Cluster {
    Cluster {
        id: id.to_string(),
        external_id: id.to_string(),
        name: format!("{id}-name"),
        cloud_provider: CloudProvider::Aws,
        state: ClusterState::Ready,
        hosted_control_plane: false,
        access_protected: false,
    }
}

// ---------------------------------------------------------------------------
// FakeAlerting
// ---------------------------------------------------------------------------

/// A note-bearing call delivered to the alerting system.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AlertCall {
    Escalate(String),
    Silence(String),
    Note(String),
}

impl AlertCall {
    pub fn text(&self) -> &str {
        match self {
            AlertCall::Escalate(t) | AlertCall::Silence(t) | AlertCall::Note(t) => t,
        }
    }
}

/// Alerting client that records successful deliveries in order.
#[derive(Debug)]
pub struct FakeAlerting {
    title: String,
    cluster_reference: String,
    delay: Duration,
    delivered: Mutex<Vec<AlertCall>>,
    pub recorder: Recorder,
}

impl FakeAlerting {
    pub const ESCALATE: &'static str = "escalate_with_note";
    pub const SILENCE: &'static str = "silence_with_note";
    pub const NOTE: &'static str = "add_note";

    pub fn new(title: &str, cluster_reference: &str) -> Self {
        Self {
            title: title.to_string(),
            cluster_reference: cluster_reference.to_string(),
            delay: Duration::ZERO,
            delivered: Mutex::new(Vec::new()),
            recorder: Recorder::default(),
        }
    }

    /// Sleep this long inside every call (use with a paused tokio clock).
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn delivered(&self) -> Vec<AlertCall> {
        self.delivered.lock().unwrap().clone()
    }

    async fn deliver(&self, method: &'static str, call: AlertCall) -> ClientResult<()> {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.recorder.hit(method)?;
        self.delivered.lock().unwrap().push(call);
        Ok(())
    }
}

#[async_trait]
impl AlertingClient for FakeAlerting {
    async fn escalate_with_note(&self, note: &str) -> ClientResult<()> {
        self.deliver(Self::ESCALATE, AlertCall::Escalate(note.to_string()))
            .await
    }

    async fn silence_with_note(&self, note: &str) -> ClientResult<()> {
        self.deliver(Self::SILENCE, AlertCall::Silence(note.to_string()))
            .await
    }

    async fn add_note(&self, note: &str) -> ClientResult<()> {
        self.deliver(Self::NOTE, AlertCall::Note(note.to_string()))
            .await
    }

    fn cluster_reference(&self) -> String {
        self.cluster_reference.clone()
    }

    fn alert_title(&self) -> String {
        self.title.clone()
    }
}

// ---------------------------------------------------------------------------
// FakeInventory
// ---------------------------------------------------------------------------

/// Inventory backed by `HashMap`s keyed by cluster id.
#[derive(Debug, Default)]
pub struct FakeInventory {
    clusters: Mutex<HashMap<String, Cluster>>,
    deployments: Mutex<HashMap<String, ClusterDeployment>>,
    topologies: Mutex<HashMap<String, ManagementInfo>>,
    service_logs: Mutex<Vec<(String, ServiceLog)>>,
    limited_support: Mutex<Vec<(String, LimitedSupportReason)>>,
    pub recorder: Recorder,
}

impl FakeInventory {
    pub const DESCRIPTOR: &'static str = "cluster_descriptor";
    pub const DEPLOYMENT: &'static str = "cluster_deployment";
    pub const TOPOLOGY: &'static str = "management_topology";
    pub const SERVICE_LOG: &'static str = "post_service_log";
    pub const LIMITED_SUPPORT: &'static str = "post_limited_support_reason";

    pub fn new() -> Self {
        Self::default()
    }

    /// Register a cluster under both its internal and external id.
    pub fn insert_cluster(&self, cluster: Cluster) {
        let mut clusters = self.clusters.lock().unwrap();
        clusters.insert(cluster.external_id.clone(), cluster.clone());
        clusters.insert(cluster.id.clone(), cluster);
    }

    pub fn insert_deployment(&self, cluster_id: &str, deployment: ClusterDeployment) {
        self.deployments
            .lock()
            .unwrap()
            .insert(cluster_id.to_string(), deployment);
    }

    pub fn insert_topology(&self, cluster_id: &str, info: ManagementInfo) {
        self.topologies
            .lock()
            .unwrap()
            .insert(cluster_id.to_string(), info);
    }

    pub fn service_logs(&self) -> Vec<(String, ServiceLog)> {
        self.service_logs.lock().unwrap().clone()
    }

    pub fn limited_support_reasons(&self) -> Vec<(String, LimitedSupportReason)> {
        self.limited_support.lock().unwrap().clone()
    }
}

#[async_trait]
impl ClusterInventory for FakeInventory {
    async fn cluster_descriptor(&self, cluster_id: &str) -> ClientResult<Cluster> {
        self.recorder.hit(Self::DESCRIPTOR)?;
        self.clusters
            .lock()
            .unwrap()
            .get(cluster_id)
            .cloned()
            .ok_or_else(|| ClientError::NotFound(format!("cluster {cluster_id}")))
    }

    async fn cluster_deployment(&self, cluster_id: &str) -> ClientResult<ClusterDeployment> {
        self.recorder.hit(Self::DEPLOYMENT)?;
        self.deployments
            .lock()
            .unwrap()
            .get(cluster_id)
            .cloned()
            .ok_or_else(|| ClientError::NotFound(format!("deployment for {cluster_id}")))
    }

    async fn management_topology(&self, cluster: &Cluster) -> ClientResult<ManagementInfo> {
        self.recorder.hit(Self::TOPOLOGY)?;
        self.topologies
            .lock()
            .unwrap()
            .get(&cluster.id)
            .cloned()
            .ok_or_else(|| ClientError::NotFound(format!("management topology for {}", cluster.id)))
    }

    async fn post_service_log(&self, cluster_id: &str, log: &ServiceLog) -> ClientResult<()> {
        self.recorder.hit(Self::SERVICE_LOG)?;
        self.service_logs
            .lock()
            .unwrap()
            .push((cluster_id.to_string(), log.clone()));
        Ok(())
    }

    async fn post_limited_support_reason(
        &self,
        cluster_id: &str,
        reason: &LimitedSupportReason,
    ) -> ClientResult<()> {
        self.recorder.hit(Self::LIMITED_SUPPORT)?;
        self.limited_support
            .lock()
            .unwrap()
            .push((cluster_id.to_string(), reason.clone()));
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// FakeBroker
// ---------------------------------------------------------------------------

/// Credential broker that hands out a fixed short-lived credential.
#[derive(Debug, Default)]
pub struct FakeBroker {
    pub recorder: Recorder,
}

impl FakeBroker {
    pub const ACQUIRE: &'static str = "acquire_tenant_credentials";

    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CredentialBroker for FakeBroker {
    async fn acquire_tenant_credentials(&self, cluster: &Cluster) -> ClientResult<CloudAccess> {
        self.recorder.hit(Self::ACQUIRE)?;
        Ok(CloudAccess {
            account_id: format!("acct-{}", cluster.id),
            region: "us-east-1".to_string(),
            role: format!("role/cad-{}", cluster.id),
            expires_at: Utc::now() + ChronoDuration::hours(1),
        })
    }
}

// ---------------------------------------------------------------------------
// FakeProvisioner
// ---------------------------------------------------------------------------

/// Provisioner whose release functions record which grants were torn down.
#[derive(Debug, Default)]
pub struct FakeProvisioner {
    released: Arc<Mutex<Vec<String>>>,
    release_error: Mutex<Option<ClientError>>,
    pub recorder: Recorder,
}

impl FakeProvisioner {
    pub const PROVISION: &'static str = "provision";
    pub const PROVISION_CLI: &'static str = "provision_cli";

    pub fn new() -> Self {
        Self::default()
    }

    /// Make every release function fail with `err` (after recording the call).
    pub fn fail_releases(&self, err: ClientError) {
        *self.release_error.lock().unwrap() = Some(err);
    }

    /// Grant labels in the order they were released, e.g. `api:c1:cad`.
    pub fn released(&self) -> Vec<String> {
        self.released.lock().unwrap().clone()
    }

    fn release_fn(&self, label: String) -> ReleaseFn {
        let released = Arc::clone(&self.released);
        let failure = self.release_error.lock().unwrap().clone();
        Box::new(move || {
            async move {
                released.lock().unwrap().push(label);
                match failure {
                    Some(err) => Err(err),
                    None => Ok(()),
                }
            }
            .boxed()
        })
    }
}

#[async_trait]
impl AccessProvisioner for FakeProvisioner {
    async fn provision(
        &self,
        cluster_id: &str,
        scope: &str,
    ) -> ClientResult<Provisioned<ApiAccessHandle>> {
        self.recorder.hit(Self::PROVISION)?;
        let handle = ApiAccessHandle {
            cluster_id: cluster_id.to_string(),
            scope: scope.to_string(),
            endpoint: format!("https://api.{cluster_id}.example:6443"),
            expires_at: Utc::now() + ChronoDuration::minutes(30),
        };
        let release = self.release_fn(format!("api:{cluster_id}:{scope}"));
        Ok(Provisioned::new(handle, release))
    }

    async fn provision_cli(&self, cluster_id: &str) -> ClientResult<Provisioned<CliHandle>> {
        self.recorder.hit(Self::PROVISION_CLI)?;
        let handle = CliHandle {
            cluster_id: cluster_id.to_string(),
            kubeconfig_path: std::env::temp_dir().join(format!("cad-{cluster_id}.kubeconfig")),
        };
        let release = self.release_fn(format!("cli:{cluster_id}"));
        Ok(Provisioned::new(handle, release))
    }
}

// ---------------------------------------------------------------------------
// FakeReports
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
pub struct FakeReports {
    reports: Mutex<Vec<(String, Report)>>,
    pub recorder: Recorder,
}

impl FakeReports {
    pub const CREATE: &'static str = "create_report";

    pub fn new() -> Self {
        Self::default()
    }

    pub fn reports(&self) -> Vec<(String, Report)> {
        self.reports.lock().unwrap().clone()
    }
}

#[async_trait]
impl ReportClient for FakeReports {
    async fn create_report(&self, cluster_id: &str, report: &Report) -> ClientResult<()> {
        self.recorder.hit(Self::CREATE)?;
        self.reports
            .lock()
            .unwrap()
            .push((cluster_id.to_string(), report.clone()));
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// FakeClients
// ---------------------------------------------------------------------------

/// All fakes wired together, with typed access for assertions.
#[derive(Debug, Clone)]
pub struct FakeClients {
    pub alerting: Arc<FakeAlerting>,
    pub inventory: Arc<FakeInventory>,
    pub broker: Arc<FakeBroker>,
    pub provisioner: Arc<FakeProvisioner>,
    pub reports: Arc<FakeReports>,
}

impl FakeClients {
    /// Fakes for an alert titled `title` raised against `cluster`, which is
    /// registered in the inventory.
    pub fn new(title: &str, cluster: Cluster) -> Self {
        Self::with_alerting(FakeAlerting::new(title, &cluster.external_id), cluster)
    }

    pub fn with_alerting(alerting: FakeAlerting, cluster: Cluster) -> Self {
        let inventory = FakeInventory::new();
        inventory.insert_cluster(cluster);
        Self {
            alerting: Arc::new(alerting),
            inventory: Arc::new(inventory),
            broker: Arc::new(FakeBroker::new()),
            provisioner: Arc::new(FakeProvisioner::new()),
            reports: Arc::new(FakeReports::new()),
        }
    }

    pub fn clients(&self) -> Clients {
        Clients {
            alerting: self.alerting.clone(),
            inventory: self.inventory.clone(),
            broker: self.broker.clone(),
            provisioner: self.provisioner.clone(),
            reports: self.reports.clone(),
        }
    }
}
