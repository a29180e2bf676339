//! Sidecar agent probing infrastructure services and reporting failures to an alert collector.

pub mod actors;
pub mod agent;
pub mod alert;
pub mod config;
pub mod liveness;
pub mod probes;
pub mod transport;

pub use actors::sender::AlertSender;
pub use agent::Agent;
pub use alert::Alert;
