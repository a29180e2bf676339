//! Long-running tasks of the agent
//!
//! Each actor runs as an independent async task and is driven through a cloneable handle
//! that talks to it over a Tokio channel.
//!
//! ## Actor Types
//!
//! - **AlertSenderActor**: Drains the bounded alert queue and delivers each alert to the collector

pub mod sender;
