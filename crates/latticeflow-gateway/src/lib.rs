//! latticeflow gateway
//!
//! Turns cluster objects into stacks and drives them through the
//! deployers in `latticeflow-deploy`.
//!
//! ```text
//! HTTPRoute / GRPCRoute ─► RouteBuilder ──────────► service pipeline
//! ServiceExport ─────────► ServiceExportBuilder ──► target-group pipeline
//! Service / Endpoints ───► TargetsBuilder ────────► targets pipeline
//! Gateway ───────────────► GatewayBuilder ────────► service-network pipeline
//! AccessLogPolicy ───────► AccessLogPolicyBuilder ► access-log pipeline
//! ```
//!
//! [`Controller`] wires the pairs together and reports outcomes through an
//! [`EventRecorder`]; [`handle_reconcile_error`] maps the result onto a
//! requeue decision.

pub mod builder;
pub mod controller;
pub mod events;
pub mod reconcile;

pub use builder::{BuildError, BuildResult, Built};
pub use controller::Controller;
#[cfg(any(test, feature = "test-utils"))]
pub use events::MockEventRecorder;
pub use events::{EventRecorder, EventType, TracingEventRecorder};
pub use reconcile::{ReconcileAction, handle_reconcile_error};
