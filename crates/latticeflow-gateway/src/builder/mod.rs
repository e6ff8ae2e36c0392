//! Model builders
//!
//! Each builder turns one cluster object into a [`Stack`]. Builders only
//! read: the cluster through [`ClusterReader`](latticeflow_core::ClusterReader)
//! and remote identity through the [`Ledger`](latticeflow_core::Ledger).

mod access_log;
mod export;
mod gateway;
mod route;
mod targets;

pub use access_log::{AccessLogPolicyBuilder, AccessLogPolicyModel};
pub use export::{ExportModel, ServiceExportBuilder};
pub use gateway::GatewayBuilder;
pub use route::{RouteBuilder, RouteModel};
pub use targets::{TargetsBuilder, TargetsModel};

use latticeflow_core::{Error, Stack};

/// A successfully built stack plus what the caller needs to know about it
#[derive(Debug)]
pub struct Built<T> {
    pub stack: Stack,
    pub model: T,
}

/// A failed build. `stack` holds whatever was built before the failure
/// when that is still worth deploying.
#[derive(Debug, thiserror::Error)]
#[error("{error}")]
pub struct BuildError {
    #[source]
    pub error: Error,
    pub stack: Option<Stack>,
}

impl BuildError {
    pub fn partial(error: Error, stack: Stack) -> Self {
        Self {
            error,
            stack: Some(stack),
        }
    }
}

impl From<Error> for BuildError {
    fn from(error: Error) -> Self {
        Self { error, stack: None }
    }
}

pub type BuildResult<T> = std::result::Result<Built<T>, BuildError>;
