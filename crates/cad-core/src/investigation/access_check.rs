//! Tenant cloud credential probe.

use cad_clients::LimitedSupportReason;
use tracing::{info, warn};

use super::{InvestigationError, InvestigationResult, StopReason};
use crate::actions::Action;
use crate::resources::{BuildRequest, ResourceBuilder, ResourceError};

const MISSING_CREDENTIALS_SUMMARY: &str = "Cloud credentials are missing";
const MISSING_CREDENTIALS_DETAILS: &str = "The credentials that allow the cluster to be managed \
    in its cloud account are missing or were removed. Restore the installer role and its trust \
    policy to remove this limited-support reason.";

/// Build tenant cloud access and classify a failure.
///
/// Credentials that are structurally missing put the cluster into limited
/// support and silence the alert. Any other broker fault escalates. Both set
/// a stop; whether the stop halts the run is the caller's decision, since the
/// builder is left holding the cached failure.
pub async fn access_check(
    builder: &mut ResourceBuilder,
) -> Result<InvestigationResult, InvestigationError> {
    let err = match builder
        .build(BuildRequest::new().with_cloud_access())
        .await
    {
        Ok(_) => return Ok(InvestigationResult::new()),
        Err(err) => err,
    };

    let source = match err {
        ResourceError::CloudAccess { source, .. } => source,
        other => return Err(other.into()),
    };

    if source.is_credentials_missing() {
        info!(error = %source, "cloud credentials missing; placing cluster in limited support");
        return Ok(InvestigationResult::stop(
            StopReason::CloudCredentialsMissing,
            vec![
                Action::LimitedSupport {
                    reason: LimitedSupportReason {
                        summary: MISSING_CREDENTIALS_SUMMARY.to_string(),
                        details: MISSING_CREDENTIALS_DETAILS.to_string(),
                    },
                },
                Action::silence(
                    "Cluster cloud credentials are missing. Limited support was set; silencing the alert.",
                ),
            ],
        ));
    }

    warn!(error = %source, "cloud access unavailable");
    Ok(InvestigationResult::stop(
        StopReason::CloudAccessUnavailable(source.to_string()),
        vec![Action::escalate(format!(
            "Could not acquire cloud credentials for the cluster: {source}. Manual investigation required."
        ))],
    ))
}
