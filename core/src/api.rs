use async_trait::async_trait;

use crate::{
    error::Result,
    models::{
        Page, QueryRequest, StatusCreate, StatusUpdate, Workbin, WorkbinCreate, WorkbinUpdate,
        WorkitemStatus, Worktype, WorktypeCreate, WorktypeUpdate,
    },
    rules::{DateBased, FlowRuleKind, OnAttributeChange, OnCreate},
};

/// Workbin operations of the task management API
///
/// Implementations must be thread-safe; the proxies share one instance
/// across concurrent resource operations.
#[async_trait]
pub trait WorkbinApi: Send + Sync {
    /// Create a new workbin
    ///
    /// # Returns
    /// * `Ok(Workbin)` - The created workbin with its server-assigned id
    /// * `Err(TaskMgmtError::Api)` - If the API rejects the request
    async fn create_workbin(&self, workbin: WorkbinCreate) -> Result<Workbin>;

    /// Fetch one page of workbins
    async fn query_workbins(&self, query: QueryRequest) -> Result<Page<Workbin>>;

    /// Get a workbin by id
    ///
    /// # Returns
    /// * `Ok(Workbin)` - The workbin
    /// * `Err(TaskMgmtError::NotFound)` - If no workbin has that id (yet)
    async fn get_workbin(&self, id: &str) -> Result<Workbin>;

    async fn update_workbin(&self, id: &str, update: WorkbinUpdate) -> Result<Workbin>;

    async fn delete_workbin(&self, id: &str) -> Result<()>;
}

/// Worktype operations of the task management API
#[async_trait]
pub trait WorktypeApi: Send + Sync {
    async fn create_worktype(&self, worktype: WorktypeCreate) -> Result<Worktype>;

    async fn query_worktypes(&self, query: QueryRequest) -> Result<Page<Worktype>>;

    /// Get a worktype by id
    ///
    /// The embedded status list is not guaranteed to be complete; callers
    /// that need the statuses list them through [`StatusApi`].
    async fn get_worktype(&self, id: &str) -> Result<Worktype>;

    async fn update_worktype(&self, id: &str, update: WorktypeUpdate) -> Result<Worktype>;

    async fn delete_worktype(&self, id: &str) -> Result<()>;
}

/// Status operations, always scoped to one worktype
#[async_trait]
pub trait StatusApi: Send + Sync {
    /// Create a status in a worktype
    ///
    /// # Arguments
    /// * `worktype_id` - The owning worktype
    /// * `status` - The status to create; references must name existing ids
    async fn create_status(&self, worktype_id: &str, status: StatusCreate) -> Result<WorkitemStatus>;

    /// List every status of a worktype
    async fn list_statuses(&self, worktype_id: &str) -> Result<Vec<WorkitemStatus>>;

    async fn get_status(&self, worktype_id: &str, status_id: &str) -> Result<WorkitemStatus>;

    /// Partially update a status
    ///
    /// # Returns
    /// * `Ok(WorkitemStatus)` - The status after the update
    /// * `Err(TaskMgmtError::Api)` - 400 with a cancelled transaction message
    ///   when a concurrent status write collided; safe to replay
    async fn update_status(
        &self,
        worktype_id: &str,
        status_id: &str,
        update: StatusUpdate,
    ) -> Result<WorkitemStatus>;

    async fn delete_status(&self, worktype_id: &str, status_id: &str) -> Result<()>;
}

/// Flow rule operations for one rule kind
#[async_trait]
pub trait FlowRuleApi<K: FlowRuleKind>: Send + Sync {
    async fn create_rule(&self, worktype_id: &str, rule: K::Create) -> Result<K::Rule>;

    /// Fetch one page of the rules of a worktype
    async fn list_rules(
        &self,
        worktype_id: &str,
        after: Option<String>,
        page_size: u32,
    ) -> Result<Page<K::Rule>>;

    async fn get_rule(&self, worktype_id: &str, rule_id: &str) -> Result<K::Rule>;

    async fn update_rule(&self, worktype_id: &str, rule_id: &str, update: K::Update) -> Result<K::Rule>;

    async fn delete_rule(&self, worktype_id: &str, rule_id: &str) -> Result<()>;
}

/// Everything the task management resources need from the API.
///
/// Implemented automatically for any type that provides all capabilities;
/// the HTTP client and the in-memory fake both qualify.
pub trait TaskManagementApi:
    WorkbinApi
    + WorktypeApi
    + StatusApi
    + FlowRuleApi<DateBased>
    + FlowRuleApi<OnAttributeChange>
    + FlowRuleApi<OnCreate>
{
}

impl<T> TaskManagementApi for T where
    T: WorkbinApi
        + WorktypeApi
        + StatusApi
        + FlowRuleApi<DateBased>
        + FlowRuleApi<OnAttributeChange>
        + FlowRuleApi<OnCreate>
{
}
