//! # tenant-runtime
//!
//! Runs many bot accounts ("tenants") in one process.
//!
//! - [`TenantRegistry`]: validates, starts, stops and lists tenants
//! - [`WebhookRouter`]: routes `/bot_{id}` deliveries to the tenant's channel
//! - [`Pipeline`]: per-tenant pump with panic isolation; direct messages run off the pump
//! - [`handlers`]: archive, edit diff, deletion summary, connection and `/start` handlers
//! - [`ControlPlane`] and [`http::app`]: management calls and the HTTP surface

pub mod control_plane;
pub mod credentials;
pub mod handlers;
pub mod http;
pub mod metrics;
pub mod notify;
pub mod pipeline;
pub mod registry;
pub mod router;

pub use control_plane::{ControlError, ControlPlane, StatusCode, TenantReply};
pub use credentials::{CredentialProvider, StaticCredentialProvider};
pub use handlers::{BusinessChainFactory, ChainFactory, DirectLane, TenantChains};
pub use http::{app, AppState};
pub use metrics::{HandlerSnapshot, MetricsSnapshot, RuntimeMetrics, METER_NAME};
pub use notify::{Notification, Notifier, PlatformNotifier, MAX_MESSAGE_LEN};
pub use pipeline::Pipeline;
pub use registry::{RegistryDeps, TenantHandle, TenantRegistry, REQUIRED_CAPABILITIES};
pub use router::{DispatchOutcome, WebhookRouter, CHANNEL_CAPACITY, SECRET_HEADER};
