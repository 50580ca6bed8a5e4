//! Capability trait implementations over `/api/v2/taskmanagement`.

use async_trait::async_trait;

use taskmgmt_core::{
    api::{FlowRuleApi, StatusApi, WorkbinApi, WorktypeApi},
    error::Result,
    models::{
        Page, QueryRequest, StatusCreate, StatusUpdate, Workbin, WorkbinCreate, WorkbinUpdate,
        WorkitemStatus, Worktype, WorktypeCreate, WorktypeUpdate,
    },
    rules::FlowRuleKind,
};

use crate::genesys::GenesysClient;

const ROOT: &str = "/api/v2/taskmanagement";

fn workbin_path(id: &str) -> String {
    format!("{ROOT}/workbins/{id}")
}

fn worktype_path(id: &str) -> String {
    format!("{ROOT}/worktypes/{id}")
}

fn statuses_path(worktype_id: &str) -> String {
    format!("{ROOT}/worktypes/{worktype_id}/statuses")
}

fn rules_path<K: FlowRuleKind>(worktype_id: &str) -> String {
    format!("{ROOT}/worktypes/{worktype_id}/flows/{}/rules", K::PATH_SEGMENT)
}

#[async_trait]
impl WorkbinApi for GenesysClient {
    async fn create_workbin(&self, workbin: WorkbinCreate) -> Result<Workbin> {
        self.post_json(&format!("{ROOT}/workbins"), &workbin).await
    }

    async fn query_workbins(&self, query: QueryRequest) -> Result<Page<Workbin>> {
        self.post_json(&format!("{ROOT}/workbins/query"), &query).await
    }

    async fn get_workbin(&self, id: &str) -> Result<Workbin> {
        self.get_json(&workbin_path(id), &[]).await
    }

    async fn update_workbin(&self, id: &str, update: WorkbinUpdate) -> Result<Workbin> {
        self.patch_json(&workbin_path(id), &update).await
    }

    async fn delete_workbin(&self, id: &str) -> Result<()> {
        self.delete(&workbin_path(id)).await
    }
}

#[async_trait]
impl WorktypeApi for GenesysClient {
    async fn create_worktype(&self, worktype: WorktypeCreate) -> Result<Worktype> {
        self.post_json(&format!("{ROOT}/worktypes"), &worktype).await
    }

    async fn query_worktypes(&self, query: QueryRequest) -> Result<Page<Worktype>> {
        self.post_json(&format!("{ROOT}/worktypes/query"), &query).await
    }

    async fn get_worktype(&self, id: &str) -> Result<Worktype> {
        self.get_json(&worktype_path(id), &[]).await
    }

    async fn update_worktype(&self, id: &str, update: WorktypeUpdate) -> Result<Worktype> {
        self.patch_json(&worktype_path(id), &update).await
    }

    async fn delete_worktype(&self, id: &str) -> Result<()> {
        self.delete(&worktype_path(id)).await
    }
}

#[async_trait]
impl StatusApi for GenesysClient {
    async fn create_status(&self, worktype_id: &str, status: StatusCreate) -> Result<WorkitemStatus> {
        self.post_json(&statuses_path(worktype_id), &status).await
    }

    async fn list_statuses(&self, worktype_id: &str) -> Result<Vec<WorkitemStatus>> {
        // Unpaginated listing wrapped in an entity envelope
        let listing: Page<WorkitemStatus> = self.get_json(&statuses_path(worktype_id), &[]).await?;
        Ok(listing.entities)
    }

    async fn get_status(&self, worktype_id: &str, status_id: &str) -> Result<WorkitemStatus> {
        self.get_json(&format!("{}/{status_id}", statuses_path(worktype_id)), &[])
            .await
    }

    async fn update_status(
        &self,
        worktype_id: &str,
        status_id: &str,
        update: StatusUpdate,
    ) -> Result<WorkitemStatus> {
        self.patch_json(&format!("{}/{status_id}", statuses_path(worktype_id)), &update)
            .await
    }

    async fn delete_status(&self, worktype_id: &str, status_id: &str) -> Result<()> {
        self.delete(&format!("{}/{status_id}", statuses_path(worktype_id)))
            .await
    }
}

#[async_trait]
impl<K: FlowRuleKind> FlowRuleApi<K> for GenesysClient {
    async fn create_rule(&self, worktype_id: &str, rule: K::Create) -> Result<K::Rule> {
        self.post_json(&rules_path::<K>(worktype_id), &rule).await
    }

    async fn list_rules(
        &self,
        worktype_id: &str,
        after: Option<String>,
        page_size: u32,
    ) -> Result<Page<K::Rule>> {
        let mut query = vec![("pageSize", page_size.to_string())];
        if let Some(after) = after {
            query.push(("after", after));
        }
        self.get_json(&rules_path::<K>(worktype_id), &query).await
    }

    async fn get_rule(&self, worktype_id: &str, rule_id: &str) -> Result<K::Rule> {
        self.get_json(&format!("{}/{rule_id}", rules_path::<K>(worktype_id)), &[])
            .await
    }

    async fn update_rule(&self, worktype_id: &str, rule_id: &str, update: K::Update) -> Result<K::Rule> {
        self.patch_json(&format!("{}/{rule_id}", rules_path::<K>(worktype_id)), &update)
            .await
    }

    async fn delete_rule(&self, worktype_id: &str, rule_id: &str) -> Result<()> {
        self.delete(&format!("{}/{rule_id}", rules_path::<K>(worktype_id)))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use taskmgmt_core::rules::{DateBased, OnAttributeChange, OnCreate};

    #[test]
    fn test_paths() {
        assert_eq!(workbin_path("wb-1"), "/api/v2/taskmanagement/workbins/wb-1");
        assert_eq!(statuses_path("wt-1"), "/api/v2/taskmanagement/worktypes/wt-1/statuses");
        assert_eq!(
            rules_path::<DateBased>("wt-1"),
            "/api/v2/taskmanagement/worktypes/wt-1/flows/datebased/rules"
        );
        assert_eq!(
            rules_path::<OnAttributeChange>("wt-1"),
            "/api/v2/taskmanagement/worktypes/wt-1/flows/onattributechange/rules"
        );
        assert_eq!(
            rules_path::<OnCreate>("wt-1"),
            "/api/v2/taskmanagement/worktypes/wt-1/flows/oncreate/rules"
        );
    }
}
