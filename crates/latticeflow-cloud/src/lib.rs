//! Remote control-plane capability for latticeflow
//!
//! This crate defines what the reconciler needs from the service-mesh
//! control plane, without binding to any particular SDK.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────┐
//! │        latticeflow-deploy (managers)             │
//! └─────────────────┬───────────────────────────────┘
//!                   │
//! ┌─────────────────▼───────────────────────────────┐
//! │               latticeflow-cloud                  │
//! │  ┌──────────────────────────────────────────┐   │
//! │  │  Cloud: tag provider + Arc<dyn LatticeApi>│   │
//! │  └──────────────────────────────────────────┘   │
//! │  ┌──────────────┐  ┌──────────────┐            │
//! │  │  Wire types  │  │ LatticeError │            │
//! │  └──────────────┘  └──────────────┘            │
//! └─────────────────┬───────────────────────────────┘
//!                   │
//!           ┌───────▼───────┐
//!           │  SDK adapter  │
//!           └───────────────┘
//! ```

pub mod api;
pub mod cloud;
pub mod error;
pub mod types;

// Re-exports
pub use api::LatticeApi;
#[cfg(any(test, feature = "test-utils"))]
pub use api::MockLatticeApi;
pub use cloud::{Cloud, CloudConfig};
pub use error::{LatticeError, Result};
pub use types::*;
