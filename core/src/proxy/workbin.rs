use std::sync::Arc;

use tracing::{debug, info};

use crate::{
    api::WorkbinApi,
    cache::ResourceCache,
    error::Result,
    models::{QueryRequest, Workbin, WorkbinCreate, WorkbinUpdate},
    paging::{collect_all, find_id_by_name, MAX_PAGE_SIZE},
};

/// Workbin access with a read-through identity cache
#[derive(Clone)]
pub struct WorkbinProxy {
    api: Arc<dyn WorkbinApi>,
    cache: ResourceCache<Workbin>,
}

impl WorkbinProxy {
    pub fn new(api: Arc<dyn WorkbinApi>) -> Self {
        Self {
            api,
            cache: ResourceCache::new(),
        }
    }

    pub async fn create(&self, workbin: WorkbinCreate) -> Result<Workbin> {
        let created = self.api.create_workbin(workbin).await?;
        info!(workbin_id = %created.id, name = %created.name, "Created workbin");
        self.cache.insert(created.id.clone(), created.clone());
        Ok(created)
    }

    pub async fn get_by_id(&self, id: &str) -> Result<Workbin> {
        if let Some(cached) = self.cache.get(id) {
            debug!(workbin_id = id, "Workbin served from cache");
            return Ok(cached);
        }
        let workbin = self.api.get_workbin(id).await?;
        self.cache.insert(id, workbin.clone());
        Ok(workbin)
    }

    /// Read straight from the API without touching the cache
    pub async fn fetch(&self, id: &str) -> Result<Workbin> {
        self.api.get_workbin(id).await
    }

    pub async fn get_id_by_name(&self, name: &str) -> Result<String> {
        let api = &self.api;
        find_id_by_name("workbin", name, |after| async move {
            api.query_workbins(QueryRequest::page(MAX_PAGE_SIZE, after)).await
        })
        .await
    }

    pub async fn get_all(&self) -> Result<Vec<Workbin>> {
        let api = &self.api;
        collect_all(|after| async move {
            api.query_workbins(QueryRequest::page(MAX_PAGE_SIZE, after)).await
        })
        .await
    }

    pub async fn update(&self, id: &str, update: WorkbinUpdate) -> Result<Workbin> {
        self.cache.remove(id);
        let updated = self.api.update_workbin(id, update).await?;
        info!(workbin_id = id, "Updated workbin");
        self.cache.insert(id, updated.clone());
        Ok(updated)
    }

    pub async fn delete(&self, id: &str) -> Result<()> {
        self.cache.remove(id);
        self.api.delete_workbin(id).await?;
        info!(workbin_id = id, "Deleted workbin");
        Ok(())
    }

    pub fn cache(&self) -> &ResourceCache<Workbin> {
        &self.cache
    }
}
