//! Task Management Core Library
//!
//! This crate provides the domain models, capability traits, and resource
//! logic for Genesys Cloud task management: workbins, worktypes with their
//! status graphs, and worktype flow rules. The HTTP client and the in-memory
//! fake both implement the traits defined here.
//!
//! # Architecture
//!
//! - [`models`] - API entities and request bodies
//! - [`rules`] - The three flow rule kinds
//! - [`error`] - Error types and retry classification
//! - [`api`] - Capability traits implemented by API backends
//! - [`proxy`] - Cached, injectable access to an API backend
//! - [`status_graph`] - Two-phase status creation and linking
//! - [`resources`] - Create/read/update/delete per resource type
//! - [`retry`] / [`paging`] - Poll loop and cursor pagination
//!
//! # Example
//!
//! ```rust
//! use taskmgmt_core::{
//!     models::StatusCategory,
//!     resources::{StatusConfig, WorktypeConfig},
//!     validation::ConfigValidator,
//! };
//!
//! let mut approved = StatusConfig::new("Approved", StatusCategory::Closed);
//! approved.default_destination_status_name = Some("Rejected".to_string());
//! let mut rejected = StatusConfig::new("Rejected", StatusCategory::Closed);
//! rejected.default_destination_status_name = Some("Approved".to_string());
//!
//! let config = WorktypeConfig {
//!     name: "Approvals".to_string(),
//!     description: None,
//!     division_id: None,
//!     default_workbin_id: "wb-1".to_string(),
//!     default_status_name: Some("Approved".to_string()),
//!     statuses: vec![approved, rejected],
//!     default_duration_seconds: None,
//!     default_expiration_seconds: None,
//!     default_due_duration_seconds: None,
//!     default_priority: None,
//!     default_ttl_seconds: None,
//!     default_language_id: None,
//!     default_queue_id: None,
//!     default_skill_ids: vec![],
//!     assignment_enabled: None,
//!     schema_id: None,
//!     schema_version: None,
//! };
//!
//! // Forward references are fine; the reconciler links them after creation
//! ConfigValidator::validate_worktype(&config).unwrap();
//! ```

pub mod api;
pub mod cache;
pub mod composite_id;
pub mod diagnostics;
pub mod error;
pub mod models;
pub mod paging;
pub mod proxy;
pub mod resources;
pub mod retry;
pub mod rules;
pub mod status_graph;
pub mod validation;

// Re-export commonly used types at the crate root for convenience
pub use api::{FlowRuleApi, StatusApi, TaskManagementApi, WorkbinApi, WorktypeApi};
pub use diagnostics::{DiagResult, Diagnostic, Diagnostics, Severity};
pub use error::{Result, TaskMgmtError};
pub use models::{
    EntityRef, Named, Page, QueryRequest, StatusCategory, StatusCreate, StatusUpdate, Workbin,
    WorkbinCreate, WorkbinUpdate, WorkitemStatus, Worktype, WorktypeCreate, WorktypeUpdate,
};
pub use proxy::{TaskManagementProxies, WorkbinProxy, WorktypeProxy};
pub use resources::{
    FlowRuleConfig, FlowRuleState, StatusConfig, StatusTransitionConfig, WorkbinConfig, WorkbinState,
    WorktypeConfig, WorktypeState, WorktypeStatusConfig,
};
pub use retry::RetryPolicy;
pub use rules::{DateBased, FlowRuleKind, OnAttributeChange, OnCreate};
pub use status_graph::{reconcile_statuses, ReconcileMode, ReconcileReport, StatusGraphReconciler, StatusPhase};
pub use validation::ConfigValidator;

/// Current version of the core crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Current crate name
pub const CRATE_NAME: &str = env!("CARGO_PKG_NAME");
