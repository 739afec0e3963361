//! cad-clients: capability-client interfaces for CAD
//!
//! The investigation core never talks to a backing system directly. This
//! crate defines the narrow async interfaces it consumes, the data those
//! interfaces exchange, and the error taxonomy they report.
//!
//! ## Key Components
//!
//! - `AlertingClient`, `ClusterInventory`, `CredentialBroker`,
//!   `AccessProvisioner`, `ReportClient`: collaborator traits
//! - `Clients`: the bundle one investigation run works with
//! - `Provisioned` / `ReleaseFn`: ephemeral grants and their teardown
//! - `fakes`: recording in-memory implementations for tests

mod error;
pub mod fakes;
pub mod model;
pub mod traits;

pub use error::{ClientError, ClientResult};
pub use model::{
    ApiAccessHandle, CliHandle, CloudAccess, CloudProvider, Cluster, ClusterDeployment,
    ClusterState, LimitedSupportReason, ManagementInfo, Provisioned, ReleaseFn, Report,
    ServiceLog, ServiceLogSeverity,
};
pub use traits::{
    AccessProvisioner, AlertingClient, Clients, ClusterInventory, CredentialBroker, ReportClient,
};
