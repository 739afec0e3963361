//! Investigation runner end to end: matching, checks, retry, action
//! execution, cleanup and the fallback escalation.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use cad_clients::fakes::{cluster, AlertCall, FakeAlerting, FakeBroker, FakeClients, FakeProvisioner};
use cad_clients::{ClientError, ClusterState};
use cad_core::{
    Action, BuildRequest, CadConfig, Investigation, InvestigationError, InvestigationRegistry,
    InvestigationResult, InvestigationRunner, ResourceBuilder, RetryPolicy, RunOutcome, Stage,
    StepMarker, StopReason,
};
use tokio_util::sync::CancellationToken;

const TITLE: &str = "ClusterHasGoneMissing CRITICAL (1)";

#[derive(Clone, Copy)]
enum Behaviour {
    Escalate,
    AlwaysInfrastructure,
    InfrastructureTimes(u32),
    Finding,
    DocumentationMismatch,
    ApiAccessThenFail,
    ApiAccessThenEscalate,
}

struct Scripted {
    name: &'static str,
    title: &'static str,
    experimental: bool,
    requires_cloud_access: bool,
    behaviour: Behaviour,
    calls: Arc<AtomicU32>,
}

impl Scripted {
    fn new(behaviour: Behaviour) -> Self {
        Self {
            name: "chgm",
            title: "ClusterHasGoneMissing",
            experimental: false,
            requires_cloud_access: false,
            behaviour,
            calls: Arc::new(AtomicU32::new(0)),
        }
    }

    fn requiring_cloud_access(mut self) -> Self {
        self.requires_cloud_access = true;
        self
    }
}

#[async_trait]
impl Investigation for Scripted {
    fn name(&self) -> &str {
        self.name
    }

    fn alert_title(&self) -> &str {
        self.title
    }

    fn is_experimental(&self) -> bool {
        self.experimental
    }

    fn requires_cloud_access(&self) -> bool {
        self.requires_cloud_access
    }

    async fn run(
        &self,
        builder: &mut ResourceBuilder,
    ) -> Result<InvestigationResult, InvestigationError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        match self.behaviour {
            Behaviour::Escalate => Ok(InvestigationResult::new()
                .with_action(Action::escalate("cluster is gone"))
                .with_step(StepMarker::performed("instances_checked"))),
            Behaviour::AlwaysInfrastructure => Err(InvestigationError::infrastructure(
                ClientError::Unavailable("cloud api throttled".into()),
            )),
            Behaviour::InfrastructureTimes(n) if call <= n => Err(
                InvestigationError::infrastructure(ClientError::Unavailable("flaky".into())),
            ),
            Behaviour::InfrastructureTimes(_) => {
                Ok(InvestigationResult::new().with_action(Action::note("recovered")))
            }
            Behaviour::Finding => Err(InvestigationError::finding("egress is blocked")),
            Behaviour::DocumentationMismatch => Err(InvestigationError::DocumentationMismatch(
                "alert is for classic clusters only".into(),
            )),
            Behaviour::ApiAccessThenFail => {
                builder.build(BuildRequest::new().with_api_access()).await?;
                Err(anyhow::anyhow!("unexpected node state").into())
            }
            Behaviour::ApiAccessThenEscalate => {
                builder.build(BuildRequest::new().with_api_access()).await?;
                Ok(InvestigationResult::new().with_action(Action::escalate("manual check")))
            }
        }
    }
}

fn config() -> CadConfig {
    let mut config = CadConfig::default();
    config.executor.max_retries = 0;
    config
}

fn runner(fakes: &FakeClients, investigation: Scripted, config: CadConfig) -> InvestigationRunner {
    let registry = InvestigationRegistry::new().register(Arc::new(investigation));
    InvestigationRunner::new(fakes.clients(), registry, config)
}

fn calls(investigation: &Scripted) -> Arc<AtomicU32> {
    Arc::clone(&investigation.calls)
}

#[tokio::test]
async fn test_single_escalation_without_retry_or_grants() {
    let fakes = FakeClients::new(TITLE, cluster("c1"));
    let investigation = Scripted::new(Behaviour::Escalate);
    let calls = calls(&investigation);

    let report = runner(&fakes, investigation, config())
        .run(&CancellationToken::new())
        .await;

    assert_eq!(report.outcome, RunOutcome::Completed);
    assert_eq!(report.investigation.as_deref(), Some("chgm"));
    assert_eq!(report.attempts, 1);
    assert_eq!(report.released_grants, 0);
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(
        fakes.alerting.delivered(),
        vec![AlertCall::Escalate("cluster is gone".into())]
    );
    assert!(fakes.provisioner.released().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_infrastructure_errors_retry_up_to_the_bound() {
    let fakes = FakeClients::new(TITLE, cluster("c1"));
    let investigation = Scripted::new(Behaviour::AlwaysInfrastructure);
    let calls = calls(&investigation);
    let mut config = config();
    config.retry = RetryPolicy {
        max_attempts: 3,
        initial_delay_ms: 1_000,
        max_delay_ms: 10_000,
    };

    let started = tokio::time::Instant::now();
    let report = runner(&fakes, investigation, config)
        .run(&CancellationToken::new())
        .await;

    assert_eq!(calls.load(Ordering::SeqCst), 3);
    assert_eq!(report.attempts, 3);
    assert_eq!(started.elapsed(), Duration::from_millis(3_000));
    match &report.outcome {
        RunOutcome::Failed {
            error,
            fallback_delivered,
        } => {
            assert!(*fallback_delivered);
            // The last attempt's own error surfaces, not a cancellation.
            assert!(error.contains("cloud api throttled"), "{error}");
            assert!(!error.contains("cancelled"), "{error}");
        }
        other => panic!("unexpected outcome: {other:?}"),
    }

    let delivered = fakes.alerting.delivered();
    assert_eq!(delivered.len(), 1);
    assert!(matches!(&delivered[0], AlertCall::Escalate(text)
        if text.starts_with("Automated investigation 'chgm' failed")));
}

#[tokio::test(start_paused = true)]
async fn test_backoff_is_capped_by_max_delay() {
    let fakes = FakeClients::new(TITLE, cluster("c1"));
    let mut config = config();
    config.retry = RetryPolicy {
        max_attempts: 4,
        initial_delay_ms: 1_000,
        max_delay_ms: 1_500,
    };

    let started = tokio::time::Instant::now();
    runner(&fakes, Scripted::new(Behaviour::AlwaysInfrastructure), config)
        .run(&CancellationToken::new())
        .await;

    // 1000 + min(2000, 1500) + min(4000, 1500)
    assert_eq!(started.elapsed(), Duration::from_millis(4_000));
}

#[tokio::test(start_paused = true)]
async fn test_recovers_after_transient_failures() {
    let fakes = FakeClients::new(TITLE, cluster("c1"));
    let investigation = Scripted::new(Behaviour::InfrastructureTimes(2));
    let calls = calls(&investigation);

    let report = runner(&fakes, investigation, config())
        .run(&CancellationToken::new())
        .await;

    assert_eq!(report.outcome, RunOutcome::Completed);
    assert_eq!(report.attempts, 3);
    assert_eq!(calls.load(Ordering::SeqCst), 3);
    assert_eq!(
        fakes.alerting.delivered(),
        vec![AlertCall::Note("recovered".into())]
    );
}

#[tokio::test]
async fn test_findings_are_never_retried() {
    let fakes = FakeClients::new(TITLE, cluster("c1"));
    let investigation = Scripted::new(Behaviour::Finding);
    let calls = calls(&investigation);

    let report = runner(&fakes, investigation, config())
        .run(&CancellationToken::new())
        .await;

    assert_eq!(calls.load(Ordering::SeqCst), 1);
    match report.outcome {
        RunOutcome::Failed { error, .. } => assert!(error.contains("egress is blocked")),
        other => panic!("unexpected outcome: {other:?}"),
    }
}

#[tokio::test]
async fn test_documentation_mismatch_gets_tailored_escalation() {
    let fakes = FakeClients::new(TITLE, cluster("c1"));

    runner(&fakes, Scripted::new(Behaviour::DocumentationMismatch), config())
        .run(&CancellationToken::new())
        .await;

    let delivered = fakes.alerting.delivered();
    assert_eq!(delivered.len(), 1);
    assert!(delivered[0].text().contains("classic clusters only"));
    assert!(!delivered[0].text().starts_with("Automated investigation"));
}

#[tokio::test]
async fn test_grants_are_released_when_the_investigation_fails() {
    let fakes = FakeClients::new(TITLE, cluster("c1"));

    let report = runner(&fakes, Scripted::new(Behaviour::ApiAccessThenFail), config())
        .run(&CancellationToken::new())
        .await;

    assert!(matches!(report.outcome, RunOutcome::Failed { .. }));
    assert_eq!(report.released_grants, 1);
    assert_eq!(
        fakes.provisioner.released(),
        vec!["api:c1:cad-investigation".to_string()]
    );
}

#[tokio::test]
async fn test_grants_are_released_when_the_investigation_succeeds() {
    let fakes = FakeClients::new(TITLE, cluster("c1"));

    let report = runner(&fakes, Scripted::new(Behaviour::ApiAccessThenEscalate), config())
        .run(&CancellationToken::new())
        .await;

    assert_eq!(report.outcome, RunOutcome::Completed);
    assert_eq!(report.released_grants, 1);
    assert_eq!(fakes.provisioner.released().len(), 1);
}

#[tokio::test]
async fn test_grants_are_released_when_actions_fail() {
    let fakes = FakeClients::new(TITLE, cluster("c1"));
    // The investigation's escalation fails once; the fallback gets through.
    fakes.alerting.recorder.inject(
        FakeAlerting::ESCALATE,
        1,
        ClientError::Unavailable("pagerduty 503".into()),
    );

    let report = runner(&fakes, Scripted::new(Behaviour::ApiAccessThenEscalate), config())
        .run(&CancellationToken::new())
        .await;

    assert!(matches!(
        report.outcome,
        RunOutcome::Failed {
            fallback_delivered: true,
            ..
        }
    ));
    assert_eq!(report.released_grants, 1);
    assert_eq!(fakes.provisioner.released().len(), 1);
}

#[tokio::test]
async fn test_release_failure_does_not_fail_the_run() {
    let fakes = FakeClients::new(TITLE, cluster("c1"));
    fakes
        .provisioner
        .fail_releases(ClientError::Unavailable("revoke failed".into()));

    let report = runner(&fakes, Scripted::new(Behaviour::ApiAccessThenEscalate), config())
        .run(&CancellationToken::new())
        .await;

    assert_eq!(report.outcome, RunOutcome::Completed);
    assert_eq!(report.released_grants, 1);
    assert_eq!(fakes.alerting.delivered().len(), 1);
}

#[tokio::test]
async fn test_uninstalling_cluster_is_silenced_without_investigating() {
    let mut c = cluster("c1");
    c.state = ClusterState::Uninstalling;
    let fakes = FakeClients::new(TITLE, c);
    let investigation = Scripted::new(Behaviour::ApiAccessThenEscalate);
    let calls = calls(&investigation);

    let report = runner(&fakes, investigation, config())
        .run(&CancellationToken::new())
        .await;

    assert_eq!(
        report.outcome,
        RunOutcome::Stopped {
            stage: Stage::Precheck,
            reason: StopReason::ClusterUninstalling,
        }
    );
    assert_eq!(report.attempts, 0);
    assert_eq!(report.released_grants, 0);
    assert_eq!(calls.load(Ordering::SeqCst), 0);
    assert!(matches!(fakes.alerting.delivered()[0], AlertCall::Silence(_)));
}

#[tokio::test]
async fn test_missing_credentials_stop_investigations_that_need_them() {
    let fakes = FakeClients::new(TITLE, cluster("c1"));
    fakes.broker.recorder.inject(
        FakeBroker::ACQUIRE,
        u32::MAX,
        ClientError::CredentialsMissing("installer role deleted".into()),
    );
    let investigation = Scripted::new(Behaviour::Escalate).requiring_cloud_access();
    let calls = calls(&investigation);

    let report = runner(&fakes, investigation, config())
        .run(&CancellationToken::new())
        .await;

    assert_eq!(
        report.outcome,
        RunOutcome::Stopped {
            stage: Stage::AccessCheck,
            reason: StopReason::CloudCredentialsMissing,
        }
    );
    assert_eq!(calls.load(Ordering::SeqCst), 0);
    assert_eq!(fakes.inventory.limited_support_reasons().len(), 1);
    assert!(matches!(fakes.alerting.delivered()[0], AlertCall::Silence(_)));
}

#[tokio::test]
async fn test_access_failure_is_noted_when_not_required() {
    let fakes = FakeClients::new(TITLE, cluster("c1"));
    fakes.broker.recorder.inject(
        FakeBroker::ACQUIRE,
        u32::MAX,
        ClientError::Unavailable("sts throttled".into()),
    );
    let investigation = Scripted::new(Behaviour::ApiAccessThenEscalate);
    let calls = calls(&investigation);

    let report = runner(&fakes, investigation, config())
        .run(&CancellationToken::new())
        .await;

    assert_eq!(report.outcome, RunOutcome::Completed);
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(fakes.provisioner.recorder.count(FakeProvisioner::PROVISION), 1);
    assert_eq!(report.released_grants, 1);
    assert_eq!(fakes.provisioner.released().len(), 1);
    assert!(fakes.inventory.limited_support_reasons().is_empty());

    let delivered = fakes.alerting.delivered();
    assert_eq!(delivered.len(), 1);
    assert!(delivered[0].text().starts_with("manual check"));
    assert!(delivered[0].text().contains("continuing without cloud access"));
}

#[tokio::test]
async fn test_missing_credentials_are_recorded_when_not_required() {
    let fakes = FakeClients::new(TITLE, cluster("c1"));
    fakes.broker.recorder.inject(
        FakeBroker::ACQUIRE,
        u32::MAX,
        ClientError::CredentialsMissing("installer role deleted".into()),
    );
    let investigation = Scripted::new(Behaviour::Escalate);
    let calls = calls(&investigation);

    let report = runner(&fakes, investigation, config())
        .run(&CancellationToken::new())
        .await;

    assert_eq!(report.outcome, RunOutcome::Completed);
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(fakes.inventory.limited_support_reasons().len(), 1);

    // The silence that would stop the run is not sent; the investigation's
    // own escalation is.
    let delivered = fakes.alerting.delivered();
    assert_eq!(delivered.len(), 1);
    assert!(matches!(delivered[0], AlertCall::Escalate(_)));
    assert!(delivered[0].text().starts_with("cluster is gone"));
}

#[tokio::test]
async fn test_unmatched_alert_is_escalated() {
    let fakes = FakeClients::new("SomethingNobodyHandles", cluster("c1"));
    let investigation = Scripted::new(Behaviour::Escalate);
    let calls = calls(&investigation);

    let report = runner(&fakes, investigation, config())
        .run(&CancellationToken::new())
        .await;

    assert_eq!(report.outcome, RunOutcome::NoMatchingInvestigation);
    assert_eq!(report.investigation, None);
    assert_eq!(report.attempts, 0);
    assert_eq!(calls.load(Ordering::SeqCst), 0);
    assert_eq!(fakes.inventory.recorder.count(cad_clients::fakes::FakeInventory::DESCRIPTOR), 0);

    let delivered = fakes.alerting.delivered();
    assert_eq!(delivered.len(), 1);
    assert!(matches!(&delivered[0], AlertCall::Escalate(text)
        if text.contains("No automated investigation available")));
}

#[tokio::test]
async fn test_experimental_investigation_requires_opt_in() {
    let make = || {
        let mut investigation = Scripted::new(Behaviour::Escalate);
        investigation.experimental = true;
        investigation
    };

    let fakes = FakeClients::new(TITLE, cluster("c1"));
    let report = runner(&fakes, make(), config())
        .run(&CancellationToken::new())
        .await;
    assert_eq!(report.outcome, RunOutcome::NoMatchingInvestigation);

    let fakes = FakeClients::new(TITLE, cluster("c1"));
    let mut enabled = config();
    enabled.investigations.experimental_enabled = true;
    let report = runner(&fakes, make(), enabled)
        .run(&CancellationToken::new())
        .await;
    assert_eq!(report.outcome, RunOutcome::Completed);
}

#[tokio::test]
async fn test_undeliverable_fallback_is_reported_not_raised() {
    let fakes = FakeClients::new(TITLE, cluster("c1"));
    fakes.alerting.recorder.inject(
        FakeAlerting::ESCALATE,
        u32::MAX,
        ClientError::Unavailable("pagerduty down".into()),
    );

    let report = runner(&fakes, Scripted::new(Behaviour::Finding), config())
        .run(&CancellationToken::new())
        .await;

    assert!(matches!(
        report.outcome,
        RunOutcome::Failed {
            fallback_delivered: false,
            ..
        }
    ));
    assert!(fakes.alerting.delivered().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_cancellation_during_backoff_ends_the_run() {
    let fakes = FakeClients::new(TITLE, cluster("c1"));
    let investigation = Scripted::new(Behaviour::AlwaysInfrastructure);
    let calls = calls(&investigation);
    let cancel = CancellationToken::new();

    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(500)).await;
        trigger.cancel();
    });

    let report = runner(&fakes, investigation, config()).run(&cancel).await;

    assert_eq!(calls.load(Ordering::SeqCst), 1);
    match report.outcome {
        RunOutcome::Failed { error, .. } => assert!(error.contains("cancelled")),
        other => panic!("unexpected outcome: {other:?}"),
    }
}

#[tokio::test]
async fn test_report_serializes_outcome() {
    let fakes = FakeClients::new(TITLE, cluster("c1"));
    let report = runner(&fakes, Scripted::new(Behaviour::Escalate), config())
        .run(&CancellationToken::new())
        .await;

    let json = serde_json::to_value(&report).unwrap();
    assert_eq!(json["outcome"]["outcome"], "completed");
    assert_eq!(json["cluster_id"], "c1");
    assert_eq!(json["alert_title"], TITLE);
}
