pub mod authz;
pub mod client;
pub mod config;
pub mod error;
pub mod guard;
pub mod jobs;
pub mod metrics;
pub mod middleware;
pub mod router;
pub mod state;
pub mod tracing;

pub use config::{ClientAgentConfig, Environment, ResourceGuardConfig};
pub use state::{ClientState, GuardState};
