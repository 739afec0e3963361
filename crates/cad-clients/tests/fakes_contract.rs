//! Contract tests for the in-memory capability clients.
//!
//! Everything in cad-core's test suite relies on these fakes recording calls
//! and failing exactly as scripted, so the behaviour is pinned down here.

use std::time::Duration;

use cad_clients::fakes::{
    cluster, AlertCall, FakeAlerting, FakeBroker, FakeClients, FakeInventory, FakeProvisioner,
    FakeReports,
};
use cad_clients::{ClientError, ClusterDeployment, ManagementInfo, Report, ServiceLog, ServiceLogSeverity};

#[tokio::test]
async fn test_alerting_records_only_successful_deliveries() {
    let fakes = FakeClients::new("ClusterHasGoneMissing", cluster("c1"));
    let alerting = fakes.clients().alerting;
    fakes.alerting.recorder.inject(
        FakeAlerting::SILENCE,
        1,
        ClientError::Unavailable("503".into()),
    );

    alerting.add_note("first").await.unwrap();
    assert!(alerting.silence_with_note("quiet").await.is_err());
    alerting.escalate_with_note("page").await.unwrap();

    assert_eq!(
        fakes.alerting.delivered(),
        vec![
            AlertCall::Note("first".into()),
            AlertCall::Escalate("page".into())
        ]
    );
    assert_eq!(fakes.alerting.recorder.count(FakeAlerting::SILENCE), 1);
    assert_eq!(alerting.alert_title(), "ClusterHasGoneMissing");
    assert_eq!(alerting.cluster_reference(), "c1");
}

#[tokio::test(start_paused = true)]
async fn test_alerting_delay_uses_tokio_time() {
    let alerting = FakeAlerting::new("t", "c1").with_delay(Duration::from_secs(5));
    let fakes = FakeClients::with_alerting(alerting, cluster("c1"));

    let started = tokio::time::Instant::now();
    fakes.clients().alerting.add_note("slow").await.unwrap();
    assert_eq!(started.elapsed(), Duration::from_secs(5));
}

#[tokio::test]
async fn test_inventory_lookups_by_either_id() {
    let mut c = cluster("internal-1");
    c.external_id = "external-1".to_string();
    let fakes = FakeClients::new("t", c);
    let inventory = fakes.clients().inventory;

    assert_eq!(inventory.cluster_descriptor("internal-1").await.unwrap().id, "internal-1");
    assert_eq!(inventory.cluster_descriptor("external-1").await.unwrap().id, "internal-1");
    assert!(matches!(
        inventory.cluster_descriptor("nope").await,
        Err(ClientError::NotFound(_))
    ));
    assert_eq!(fakes.inventory.recorder.count(FakeInventory::DESCRIPTOR), 3);
}

#[tokio::test]
async fn test_inventory_deployment_and_topology() {
    let fakes = FakeClients::new("t", cluster("c1"));
    let inventory = fakes.clients().inventory;

    assert!(inventory.cluster_deployment("c1").await.is_err());
    fakes.inventory.insert_deployment(
        "c1",
        ClusterDeployment {
            name: "c1".into(),
            namespace: "uhc-production-c1".into(),
            installed: true,
        },
    );
    assert!(inventory.cluster_deployment("c1").await.unwrap().installed);

    fakes.inventory.insert_topology(
        "c1",
        ManagementInfo {
            management_cluster_id: "mc-1".into(),
            service_cluster_id: None,
            control_plane_namespace: "ocm-c1".into(),
        },
    );
    let info = inventory.management_topology(&cluster("c1")).await.unwrap();
    assert_eq!(info.management_cluster_id, "mc-1");
}

#[tokio::test]
async fn test_inventory_records_outbound_posts() {
    let fakes = FakeClients::new("t", cluster("c1"));
    let inventory = fakes.clients().inventory;
    let log = ServiceLog {
        severity: ServiceLogSeverity::Warning,
        summary: "Egress blocked".into(),
        description: "The cluster cannot reach quay.io".into(),
        internal_only: false,
    };

    inventory.post_service_log("c1", &log).await.unwrap();

    assert_eq!(fakes.inventory.service_logs(), vec![("c1".to_string(), log)]);
    assert_eq!(fakes.inventory.recorder.count(FakeInventory::SERVICE_LOG), 1);
}

#[tokio::test]
async fn test_broker_fault_injection() {
    let fakes = FakeClients::new("t", cluster("c1"));
    fakes.broker.recorder.inject(
        FakeBroker::ACQUIRE,
        1,
        ClientError::CredentialsMissing("role gone".into()),
    );
    let broker = fakes.clients().broker;

    let err = broker.acquire_tenant_credentials(&cluster("c1")).await.unwrap_err();
    assert!(err.is_credentials_missing());
    let access = broker.acquire_tenant_credentials(&cluster("c1")).await.unwrap();
    assert_eq!(access.account_id, "acct-c1");
    assert!(!format!("{access:?}").contains("role/cad-c1"));
}

#[tokio::test]
async fn test_provisioner_release_is_recorded() {
    let fakes = FakeClients::new("t", cluster("c1"));
    let provisioner = fakes.clients().provisioner;

    let api = provisioner.provision("c1", "cad").await.unwrap();
    let cli = provisioner.provision_cli("c1").await.unwrap();
    assert_eq!(api.handle.scope, "cad");
    assert_eq!(cli.handle.cluster_id, "c1");
    assert!(fakes.provisioner.released().is_empty());

    (cli.release)().await.unwrap();
    (api.release)().await.unwrap();
    assert_eq!(
        fakes.provisioner.released(),
        vec!["cli:c1".to_string(), "api:c1:cad".to_string()]
    );
    assert_eq!(fakes.provisioner.recorder.count(FakeProvisioner::PROVISION), 1);
    assert_eq!(fakes.provisioner.recorder.count(FakeProvisioner::PROVISION_CLI), 1);
}

#[tokio::test]
async fn test_failing_release_still_records() {
    let fakes = FakeClients::new("t", cluster("c1"));
    fakes
        .provisioner
        .fail_releases(ClientError::Unavailable("revoke timed out".into()));

    let api = fakes.clients().provisioner.provision("c1", "cad").await.unwrap();
    assert!((api.release)().await.is_err());
    assert_eq!(fakes.provisioner.released(), vec!["api:c1:cad".to_string()]);
}

#[tokio::test]
async fn test_reports_are_recorded() {
    let fakes = FakeClients::new("t", cluster("c1"));
    let report = Report {
        summary: "network verifier".into(),
        data: serde_json::json!({"egress": "blocked"}),
    };

    fakes.clients().reports.create_report("c1", &report).await.unwrap();

    assert_eq!(fakes.reports.reports(), vec![("c1".to_string(), report)]);
    assert_eq!(fakes.reports.recorder.count(FakeReports::CREATE), 1);
}
