use std::sync::Arc;

use tracing::{debug, info};

use crate::{
    api::{StatusApi, WorktypeApi},
    cache::ResourceCache,
    error::{Result, TaskMgmtError},
    models::{
        QueryRequest, StatusCreate, StatusUpdate, WorkitemStatus, Worktype, WorktypeCreate,
        WorktypeUpdate,
    },
    paging::{collect_all, find_id_by_name, MAX_PAGE_SIZE},
};

/// Worktype and status access.
///
/// Worktypes are cached together with their full status list; any status
/// write drops the owning worktype from the cache.
#[derive(Clone)]
pub struct WorktypeProxy {
    worktypes: Arc<dyn WorktypeApi>,
    statuses: Arc<dyn StatusApi>,
    cache: ResourceCache<Worktype>,
}

impl WorktypeProxy {
    pub fn new(worktypes: Arc<dyn WorktypeApi>, statuses: Arc<dyn StatusApi>) -> Self {
        Self {
            worktypes,
            statuses,
            cache: ResourceCache::new(),
        }
    }

    pub async fn create(&self, worktype: WorktypeCreate) -> Result<Worktype> {
        let created = self.worktypes.create_worktype(worktype).await?;
        info!(worktype_id = %created.id, name = %created.name, "Created worktype");
        Ok(created)
    }

    /// Get a worktype with every one of its statuses
    pub async fn get_by_id(&self, id: &str) -> Result<Worktype> {
        if let Some(cached) = self.cache.get(id) {
            debug!(worktype_id = id, "Worktype served from cache");
            return Ok(cached);
        }
        let worktype = self.fetch(id).await?;
        self.cache.insert(id, worktype.clone());
        Ok(worktype)
    }

    /// Read straight from the API without touching the cache
    pub async fn fetch(&self, id: &str) -> Result<Worktype> {
        let mut worktype = self.worktypes.get_worktype(id).await?;
        worktype.statuses = self.statuses.list_statuses(id).await?;
        Ok(worktype)
    }

    pub async fn get_id_by_name(&self, name: &str) -> Result<String> {
        let api = &self.worktypes;
        find_id_by_name("worktype", name, |after| async move {
            api.query_worktypes(QueryRequest::page(MAX_PAGE_SIZE, after)).await
        })
        .await
    }

    /// Every worktype, without statuses
    pub async fn get_all(&self) -> Result<Vec<Worktype>> {
        let api = &self.worktypes;
        collect_all(|after| async move {
            api.query_worktypes(QueryRequest::page(MAX_PAGE_SIZE, after)).await
        })
        .await
    }

    pub async fn update(&self, id: &str, update: WorktypeUpdate) -> Result<Worktype> {
        self.cache.remove(id);
        let updated = self.worktypes.update_worktype(id, update).await?;
        info!(worktype_id = id, "Updated worktype");
        Ok(updated)
    }

    pub async fn delete(&self, id: &str) -> Result<()> {
        self.cache.remove(id);
        self.worktypes.delete_worktype(id).await?;
        info!(worktype_id = id, "Deleted worktype");
        Ok(())
    }

    // ------------------------------------------------------------------
    // Statuses
    // ------------------------------------------------------------------

    pub fn status_api(&self) -> &dyn StatusApi {
        self.statuses.as_ref()
    }

    pub async fn list_statuses(&self, worktype_id: &str) -> Result<Vec<WorkitemStatus>> {
        self.statuses.list_statuses(worktype_id).await
    }

    pub async fn get_status(&self, worktype_id: &str, status_id: &str) -> Result<WorkitemStatus> {
        self.statuses.get_status(worktype_id, status_id).await
    }

    pub async fn get_status_id_by_name(&self, worktype_id: &str, name: &str) -> Result<String> {
        self.list_statuses(worktype_id)
            .await?
            .into_iter()
            .find(|status| status.name == name)
            .map(|status| status.id)
            .ok_or_else(|| TaskMgmtError::name_not_found("status", name))
    }

    pub async fn create_status(&self, worktype_id: &str, status: StatusCreate) -> Result<WorkitemStatus> {
        self.cache.remove(worktype_id);
        self.statuses.create_status(worktype_id, status).await
    }

    pub async fn update_status(
        &self,
        worktype_id: &str,
        status_id: &str,
        update: StatusUpdate,
    ) -> Result<WorkitemStatus> {
        self.cache.remove(worktype_id);
        self.statuses.update_status(worktype_id, status_id, update).await
    }

    pub async fn delete_status(&self, worktype_id: &str, status_id: &str) -> Result<()> {
        self.cache.remove(worktype_id);
        self.statuses.delete_status(worktype_id, status_id).await?;
        info!(worktype_id, status_id, "Deleted worktype status");
        Ok(())
    }

    /// Drop a worktype from the cache after writes made elsewhere
    pub fn invalidate(&self, worktype_id: &str) {
        self.cache.remove(worktype_id);
    }

    pub fn cache(&self) -> &ResourceCache<Worktype> {
        &self.cache
    }
}
