use tracing::info;

use super::{confirm_deleted, lookup_with_retries, read_with_retries, WorkbinConfig, WorkbinState};
use crate::{
    diagnostics::{api_error, DiagResult, Diagnostics},
    proxy::WorkbinProxy,
    retry::RetryPolicy,
    validation::ConfigValidator,
};

pub const RESOURCE_TYPE: &str = "genesyscloud_task_management_workbin";

pub async fn create(proxy: &WorkbinProxy, policy: &RetryPolicy, config: &WorkbinConfig) -> DiagResult<WorkbinState> {
    ConfigValidator::validate_workbin(config)
        .map_err(|err| api_error(RESOURCE_TYPE, "invalid workbin configuration", &err))?;

    let created = proxy
        .create(config.to_create())
        .await
        .map_err(|err| api_error(RESOURCE_TYPE, format!("failed to create workbin {}", config.name), &err))?;

    read(proxy, policy, &created.id).await?.ok_or_else(|| {
        Diagnostics::error(
            RESOURCE_TYPE,
            format!("failed to read workbin {}", created.id),
            "workbin disappeared right after it was created",
        )
    })
}

pub async fn read(proxy: &WorkbinProxy, policy: &RetryPolicy, id: &str) -> DiagResult<Option<WorkbinState>> {
    let workbin = read_with_retries(policy, move || proxy.get_by_id(id))
        .await
        .map_err(|err| api_error(RESOURCE_TYPE, format!("failed to read workbin {id}"), &err))?;

    if workbin.is_none() {
        info!(workbin_id = id, "Workbin no longer exists");
    }

    Ok(workbin.map(|workbin| WorkbinState {
        id: workbin.id.clone(),
        config: WorkbinConfig::from_workbin(&workbin),
    }))
}

pub async fn update(
    proxy: &WorkbinProxy,
    policy: &RetryPolicy,
    id: &str,
    config: &WorkbinConfig,
) -> DiagResult<WorkbinState> {
    ConfigValidator::validate_workbin(config)
        .map_err(|err| api_error(RESOURCE_TYPE, "invalid workbin configuration", &err))?;

    let current = proxy
        .fetch(id)
        .await
        .map_err(|err| api_error(RESOURCE_TYPE, format!("failed to read workbin {id}"), &err))?;

    let update = config.diff_update(&current);
    if !update.is_empty() {
        proxy
            .update(id, update)
            .await
            .map_err(|err| api_error(RESOURCE_TYPE, format!("failed to update workbin {id}"), &err))?;
    }

    read(proxy, policy, id).await?.ok_or_else(|| {
        Diagnostics::error(
            RESOURCE_TYPE,
            format!("failed to read workbin {id}"),
            "workbin disappeared during update",
        )
    })
}

pub async fn delete(proxy: &WorkbinProxy, policy: &RetryPolicy, id: &str) -> DiagResult<()> {
    proxy
        .delete(id)
        .await
        .map_err(|err| api_error(RESOURCE_TYPE, format!("failed to delete workbin {id}"), &err))?;

    confirm_deleted(policy, "workbin", id, move || proxy.fetch(id))
        .await
        .map_err(|err| api_error(RESOURCE_TYPE, format!("workbin {id} was not deleted"), &err))
}

/// Resolve a workbin name to its id
pub async fn lookup(proxy: &WorkbinProxy, policy: &RetryPolicy, name: &str) -> DiagResult<String> {
    lookup_with_retries(policy, move || proxy.get_id_by_name(name))
        .await
        .map_err(|err| api_error(RESOURCE_TYPE, format!("failed to find workbin {name}"), &err))
}
