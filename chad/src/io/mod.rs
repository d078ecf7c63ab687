//! Side-effecting layer: filesystem, subprocesses, SMTP, and artifacts.

pub mod artifacts;
pub mod config;
pub mod executor;
pub mod jail;
pub mod mail;
pub mod plan_store;
pub mod process;
pub mod sequence;
pub mod store;
pub mod tools;
