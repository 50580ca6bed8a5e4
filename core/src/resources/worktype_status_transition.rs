//! Transitions of an existing status, managed apart from the status.
//!
//! The status itself belongs to a worktype or status resource; this one only
//! owns its destination statuses, default destination and transition timing.
//! Its id is the status's composite id.

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::{patch_with_retries, read_with_retries, StatusTransitionConfig};
use crate::{
    composite_id,
    diagnostics::{api_error, DiagResult, Diagnostics},
    models::WorkitemStatus,
    proxy::WorktypeProxy,
    retry::RetryPolicy,
    validation::ConfigValidator,
};

pub const RESOURCE_TYPE: &str = "genesyscloud_task_management_worktype_status_transition";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusTransitionState {
    pub id: String,
    pub worktype_id: String,
    /// Composite id of the status
    pub status_id: String,
    pub destination_status_ids: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_destination_status_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status_transition_delay_seconds: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status_transition_time: Option<String>,
}

impl StatusTransitionState {
    fn from_status(worktype_id: &str, status: &WorkitemStatus) -> Self {
        let id = composite_id::compose(worktype_id, &status.id);
        Self {
            id: id.clone(),
            worktype_id: worktype_id.to_string(),
            status_id: id,
            destination_status_ids: status.destination_statuses.iter().map(|r| r.id.clone()).collect(),
            default_destination_status_id: status.default_destination_id().map(str::to_string),
            status_transition_delay_seconds: status.status_transition_delay_seconds,
            status_transition_time: status.status_transition_time.clone(),
        }
    }
}

/// Set the transitions of a status.
///
/// Waits for the status to become readable first, since it is usually
/// created right before its transitions.
pub async fn create(
    proxy: &WorktypeProxy,
    policy: &RetryPolicy,
    config: &StatusTransitionConfig,
) -> DiagResult<StatusTransitionState> {
    apply(proxy, policy, config, "create").await
}

pub async fn read(
    proxy: &WorktypeProxy,
    policy: &RetryPolicy,
    id: &str,
) -> DiagResult<Option<StatusTransitionState>> {
    let (worktype_id, status_id) = split(id)?;

    let status = read_with_retries(policy, move || proxy.get_status(worktype_id, status_id))
        .await
        .map_err(|err| api_error(RESOURCE_TYPE, format!("failed to read status transition {id}"), &err))?;

    if status.is_none() {
        info!(transition = id, "Status of transition no longer exists");
    }
    Ok(status.map(|status| StatusTransitionState::from_status(worktype_id, &status)))
}

/// Replace the transitions; a status cannot be swapped for another one.
pub async fn update(
    proxy: &WorktypeProxy,
    policy: &RetryPolicy,
    id: &str,
    config: &StatusTransitionConfig,
) -> DiagResult<StatusTransitionState> {
    let (worktype_id, status_id) = split(id)?;
    if config.worktype_id != worktype_id || config.bare_status_id() != status_id {
        return Err(Diagnostics::error(
            RESOURCE_TYPE,
            format!("failed to update status transition {id}"),
            format!("configuration targets status {}, not {id}", config.id()),
        ));
    }
    apply(proxy, policy, config, "update").await
}

/// Give back what the configuration set.
///
/// Destinations added by anything else stay in place. A status that is
/// already gone needs nothing.
pub async fn delete(
    proxy: &WorktypeProxy,
    policy: &RetryPolicy,
    id: &str,
    config: &StatusTransitionConfig,
) -> DiagResult<()> {
    let (worktype_id, status_id) = split(id)?;

    let Some(current) = read_with_retries(policy, move || proxy.get_status(worktype_id, status_id))
        .await
        .map_err(|err| api_error(RESOURCE_TYPE, format!("failed to read status transition {id}"), &err))?
    else {
        info!(transition = id, "Status already deleted");
        return Ok(());
    };

    let release = config.to_release(&current);
    debug!(transition = id, remaining = ?release.destination_status_ids, "Releasing status transitions");
    patch_with_retries(policy, move || proxy.update_status(worktype_id, status_id, release.clone()))
        .await
        .map_err(|err| api_error(RESOURCE_TYPE, format!("failed to delete status transition {id}"), &err))?;

    info!(transition = id, "Released status transitions");
    Ok(())
}

async fn apply(
    proxy: &WorktypeProxy,
    policy: &RetryPolicy,
    config: &StatusTransitionConfig,
    operation: &str,
) -> DiagResult<StatusTransitionState> {
    ConfigValidator::validate_status_transition(config)
        .map_err(|err| api_error(RESOURCE_TYPE, format!("failed to {operation} status transition"), &err))?;

    let id = config.id();
    let worktype_id = config.worktype_id.as_str();
    let status_id = config.bare_status_id();

    let exists = read_with_retries(policy, move || proxy.get_status(worktype_id, status_id))
        .await
        .map_err(|err| api_error(RESOURCE_TYPE, format!("failed to read status {id}"), &err))?;
    if exists.is_none() {
        return Err(Diagnostics::error(
            RESOURCE_TYPE,
            format!("failed to {operation} status transition {id}"),
            format!("status {status_id} does not exist in worktype {worktype_id}"),
        ));
    }

    let update = config.to_update();
    let updated = patch_with_retries(policy, move || proxy.update_status(worktype_id, status_id, update.clone()))
        .await
        .map_err(|err| api_error(RESOURCE_TYPE, format!("failed to {operation} status transition {id}"), &err))?;

    info!(transition = %id, name = %updated.name, operation, "Status transitions applied");
    read(proxy, policy, &id).await?.ok_or_else(|| {
        Diagnostics::error(
            RESOURCE_TYPE,
            format!("failed to read status transition {id}"),
            "status disappeared right after its transitions were written",
        )
    })
}

fn split(id: &str) -> DiagResult<(&str, &str)> {
    composite_id::split(id).map_err(|err| api_error(RESOURCE_TYPE, "invalid status transition id", &err))
}
