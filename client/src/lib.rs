//! HTTP client for the Genesys Cloud task management API
//!
//! [`GenesysClient`] implements every capability trait from
//! `taskmgmt-core`, so it can back the proxies and resources directly.
//!
//! # Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use taskmgmt_client::{GenesysClient, DEFAULT_TIMEOUT};
//! use taskmgmt_core::TaskManagementProxies;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let client = GenesysClient::for_region("us-east-1", "client-id", "client-secret", DEFAULT_TIMEOUT)?;
//! let proxies = TaskManagementProxies::new(Arc::new(client));
//! # let _ = proxies;
//! # Ok(())
//! # }
//! ```

mod auth;
mod common;
mod genesys;
mod task_management;

pub use auth::{ClientAuth, Credentials};
pub use common::{region_base_url, region_domain, region_token_url};
pub use genesys::{GenesysClient, DEFAULT_TIMEOUT};

pub use taskmgmt_core::{
    error::{Result, TaskMgmtError},
    TaskManagementApi,
};
