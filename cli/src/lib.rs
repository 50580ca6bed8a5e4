//! taskmgmt CLI library
//!
//! Configuration, telemetry, and command handling for the `taskmgmt`
//! binary. Commands run against any [`taskmgmt_core::TaskManagementApi`],
//! which is how the tests drive them with the in-memory fake.

pub mod commands;
pub mod config;
pub mod setup;
pub mod telemetry;

pub use commands::{run, Command, Output};
pub use config::Config;
pub use setup::{create_client, initialize_app, App};
pub use telemetry::init_telemetry;
