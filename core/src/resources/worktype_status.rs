//! A single worktype status managed on its own.
//!
//! Ids at this surface are composite (`<worktypeId>/<statusId>`). Unlike the
//! worktype resource, references are given as ids, so they must already
//! exist when the status is created.

use serde::Serialize;
use tracing::info;

use super::{
    confirm_deleted, lookup_with_retries, patch_with_retries, read_with_retries, StatusConfig,
    WorktypeStatusConfig,
};
use crate::{
    composite_id,
    diagnostics::{api_error, DiagResult, Diagnostics},
    error::TaskMgmtError,
    proxy::WorktypeProxy,
    retry::RetryPolicy,
    validation::ConfigValidator,
};

pub const RESOURCE_TYPE: &str = "genesyscloud_task_management_worktype_status";

/// A single status as read back, keyed by composite id
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusState {
    pub id: String,
    pub worktype_id: String,
    #[serde(flatten)]
    pub config: StatusConfig,
    pub destination_status_ids: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_destination_status_id: Option<String>,
}

fn split(id: &str) -> DiagResult<(&str, &str)> {
    let (worktype_id, status_ref) =
        composite_id::split(id).map_err(|err| api_error(RESOURCE_TYPE, "invalid status id", &err))?;
    Ok((worktype_id, composite_id::child_id(status_ref)))
}

pub async fn create(proxy: &WorktypeProxy, policy: &RetryPolicy, config: &WorktypeStatusConfig) -> DiagResult<StatusState> {
    ConfigValidator::validate_status_resource(config)
        .map_err(|err| api_error(RESOURCE_TYPE, "invalid status configuration", &err))?;

    let created = proxy
        .create_status(&config.worktype_id, config.to_create())
        .await
        .map_err(|err| {
            api_error(
                RESOURCE_TYPE,
                format!("failed to create status {} in worktype {}", config.name, config.worktype_id),
                &err,
            )
        })?;

    info!(worktype_id = %config.worktype_id, status_id = %created.id, name = %created.name, "Created worktype status");
    read_after_write(proxy, policy, &composite_id::compose(&config.worktype_id, &created.id)).await
}

pub async fn read(proxy: &WorktypeProxy, policy: &RetryPolicy, id: &str) -> DiagResult<Option<StatusState>> {
    let (worktype_id, status_id) = split(id)?;

    let statuses = read_with_retries(policy, move || async move {
        let statuses = proxy.list_statuses(worktype_id).await?;
        if statuses.iter().any(|s| s.id == status_id) {
            Ok::<_, TaskMgmtError>(statuses)
        } else {
            Err(TaskMgmtError::not_found("status", status_id))
        }
    })
    .await
    .map_err(|err| api_error(RESOURCE_TYPE, format!("failed to read status {id}"), &err))?;

    Ok(statuses.and_then(|statuses| {
        statuses.iter().find(|s| s.id == status_id).map(|status| StatusState {
            id: composite_id::compose(worktype_id, status_id),
            worktype_id: worktype_id.to_string(),
            config: StatusConfig::from_status(status, &statuses),
            destination_status_ids: status.destination_statuses.iter().map(|r| r.id.clone()).collect(),
            default_destination_status_id: status.default_destination_id().map(str::to_string),
        })
    }))
}

/// Patch whatever differs from the configuration.
///
/// Fields dropped from the configuration are cleared. The category cannot
/// change and a status cannot move to another worktype.
pub async fn update(
    proxy: &WorktypeProxy,
    policy: &RetryPolicy,
    id: &str,
    config: &WorktypeStatusConfig,
) -> DiagResult<StatusState> {
    let (worktype_id, status_id) = split(id)?;

    if config.worktype_id != worktype_id {
        let err = TaskMgmtError::Validation(format!(
            "status belongs to worktype {worktype_id}, cannot move it to {}",
            config.worktype_id
        ));
        return Err(api_error(RESOURCE_TYPE, format!("failed to update status {id}"), &err));
    }
    ConfigValidator::validate_status_resource(config)
        .map_err(|err| api_error(RESOURCE_TYPE, "invalid status configuration", &err))?;

    let current = proxy
        .get_status(worktype_id, status_id)
        .await
        .map_err(|err| api_error(RESOURCE_TYPE, format!("failed to read status {id}"), &err))?;
    let update = config
        .to_update(&current)
        .map_err(|err| api_error(RESOURCE_TYPE, format!("failed to update status {id}"), &err))?;

    if !update.is_empty() {
        patch_with_retries(policy, move || proxy.update_status(worktype_id, status_id, update.clone()))
            .await
            .map_err(|err| api_error(RESOURCE_TYPE, format!("failed to update status {id}"), &err))?;
        info!(worktype_id, status_id, "Updated worktype status");
    }

    read_after_write(proxy, policy, id).await
}

pub async fn delete(proxy: &WorktypeProxy, policy: &RetryPolicy, id: &str) -> DiagResult<()> {
    let (worktype_id, status_id) = split(id)?;

    proxy
        .delete_status(worktype_id, status_id)
        .await
        .map_err(|err| api_error(RESOURCE_TYPE, format!("failed to delete status {id}"), &err))?;

    confirm_deleted(policy, "status", id, move || proxy.get_status(worktype_id, status_id))
        .await
        .map_err(|err| api_error(RESOURCE_TYPE, format!("status {id} was not deleted"), &err))
}

/// Resolve a status name within a worktype to `<worktypeId>/<statusId>`
pub async fn lookup(
    proxy: &WorktypeProxy,
    policy: &RetryPolicy,
    worktype_id: &str,
    name: &str,
) -> DiagResult<String> {
    let status_id = lookup_with_retries(policy, move || proxy.get_status_id_by_name(worktype_id, name))
        .await
        .map_err(|err| {
            api_error(
                RESOURCE_TYPE,
                format!("failed to find status {name} in worktype {worktype_id}"),
                &err,
            )
        })?;
    Ok(composite_id::compose(worktype_id, &status_id))
}

async fn read_after_write(proxy: &WorktypeProxy, policy: &RetryPolicy, id: &str) -> DiagResult<StatusState> {
    read(proxy, policy, id).await?.ok_or_else(|| {
        Diagnostics::error(
            RESOURCE_TYPE,
            format!("failed to read status {id}"),
            "status disappeared right after it was written",
        )
    })
}
