//! Worktype resource: base object plus its status graph.

use tracing::{debug, info};

use super::{
    confirm_deleted, lookup_with_retries, patch_with_retries, read_with_retries, Applied,
    WorktypeConfig, WorktypeState,
};
use crate::{
    diagnostics::{api_error, DiagResult, Diagnostics},
    error::{Result, TaskMgmtError},
    models::{WorkitemStatus, Worktype, WorktypeUpdate},
    proxy::WorktypeProxy,
    retry::RetryPolicy,
    status_graph::{ReconcileMode, ReconcileReport, StatusGraphReconciler, WorktypeRef},
    validation::ConfigValidator,
};

pub const RESOURCE_TYPE: &str = "genesyscloud_task_management_worktype";

/// Create the worktype, then its statuses, then link them.
///
/// Statuses are created by the reconciler rather than the server, and the
/// default status is set by name once the graph is linked. A failure part
/// way leaves what was created in place.
pub async fn create(
    proxy: &WorktypeProxy,
    policy: &RetryPolicy,
    config: &WorktypeConfig,
) -> DiagResult<Applied<WorktypeState>> {
    ConfigValidator::validate_worktype(config)
        .map_err(|err| api_error(RESOURCE_TYPE, "invalid worktype configuration", &err))?;

    let created = proxy
        .create(config.to_create())
        .await
        .map_err(|err| api_error(RESOURCE_TYPE, format!("failed to create worktype {}", config.name), &err))?;

    let report = reconcile(proxy, policy, &created, config, &[], ReconcileMode::Create)
        .await
        .map_err(|err| {
            api_error(
                RESOURCE_TYPE,
                format!("failed to create statuses of worktype {}", config.name),
                &err,
            )
        })?;

    set_default_status(proxy, &created, config, &report, None)
        .await
        .map_err(|err| api_error(RESOURCE_TYPE, format!("failed to set default status of worktype {}", created.id), &err))?;

    info!(worktype_id = %created.id, statuses = report.statuses.len(), "Worktype materialized");
    let state = read_after_write(proxy, policy, &created.id).await?;
    Ok(Applied {
        state,
        warnings: drift_warnings(&report),
    })
}

pub async fn read(proxy: &WorktypeProxy, policy: &RetryPolicy, id: &str) -> DiagResult<Option<WorktypeState>> {
    let worktype = read_with_retries(policy, move || proxy.get_by_id(id))
        .await
        .map_err(|err| api_error(RESOURCE_TYPE, format!("failed to read worktype {id}"), &err))?;

    if worktype.is_none() {
        info!(worktype_id = id, "Worktype no longer exists");
    }
    Ok(worktype.as_ref().map(WorktypeState::from_worktype))
}

/// Update the base fields and statuses of an existing worktype.
///
/// Plain status fields are patched in place. New statuses are created and
/// linked. References of statuses that already existed are left as they
/// are and reported as warnings. Statuses no longer configured are deleted
/// after the default status has moved away from them.
pub async fn update(
    proxy: &WorktypeProxy,
    policy: &RetryPolicy,
    id: &str,
    config: &WorktypeConfig,
) -> DiagResult<Applied<WorktypeState>> {
    ConfigValidator::validate_worktype(config)
        .map_err(|err| api_error(RESOURCE_TYPE, "invalid worktype configuration", &err))?;

    let current = proxy
        .fetch(id)
        .await
        .map_err(|err| api_error(RESOURCE_TYPE, format!("failed to read worktype {id}"), &err))?;

    let base = config.diff_update(&current);
    if !base.is_empty() {
        debug!(worktype_id = id, "Updating worktype base fields");
        proxy
            .update(id, base)
            .await
            .map_err(|err| api_error(RESOURCE_TYPE, format!("failed to update worktype {id}"), &err))?;
    }

    update_status_fields(proxy, policy, &current, config)
        .await
        .map_err(|err| api_error(RESOURCE_TYPE, format!("failed to update statuses of worktype {id}"), &err))?;

    let report = reconcile(proxy, policy, &current, config, &current.statuses, ReconcileMode::Update)
        .await
        .map_err(|err| api_error(RESOURCE_TYPE, format!("failed to update statuses of worktype {id}"), &err))?;

    set_default_status(proxy, &current, config, &report, current.default_status.as_ref().map(|r| r.id.as_str()))
        .await
        .map_err(|err| api_error(RESOURCE_TYPE, format!("failed to set default status of worktype {id}"), &err))?;

    for status in current.statuses.iter().filter(|s| config.status(&s.name).is_none()) {
        proxy
            .delete_status(id, &status.id)
            .await
            .map_err(|err| api_error(RESOURCE_TYPE, format!("failed to delete status {} of worktype {id}", status.name), &err))?;
    }

    proxy.invalidate(id);
    let state = read_after_write(proxy, policy, id).await?;
    Ok(Applied {
        state,
        warnings: drift_warnings(&report),
    })
}

pub async fn delete(proxy: &WorktypeProxy, policy: &RetryPolicy, id: &str) -> DiagResult<()> {
    proxy
        .delete(id)
        .await
        .map_err(|err| api_error(RESOURCE_TYPE, format!("failed to delete worktype {id}"), &err))?;

    confirm_deleted(policy, "worktype", id, move || proxy.fetch(id))
        .await
        .map_err(|err| api_error(RESOURCE_TYPE, format!("worktype {id} was not deleted"), &err))
}

/// Resolve a worktype name to its id
pub async fn lookup(proxy: &WorktypeProxy, policy: &RetryPolicy, name: &str) -> DiagResult<String> {
    lookup_with_retries(policy, move || proxy.get_id_by_name(name))
        .await
        .map_err(|err| api_error(RESOURCE_TYPE, format!("failed to find worktype {name}"), &err))
}

async fn reconcile(
    proxy: &WorktypeProxy,
    policy: &RetryPolicy,
    worktype: &Worktype,
    config: &WorktypeConfig,
    existing: &[WorkitemStatus],
    mode: ReconcileMode,
) -> Result<ReconcileReport> {
    let report = StatusGraphReconciler::new(proxy.status_api(), WorktypeRef::new(&worktype.id, &config.name))
        .with_policy(policy.clone())
        .reconcile(&config.statuses, existing, mode)
        .await;
    proxy.invalidate(&worktype.id);
    report
}

/// Patch non-relational fields of statuses that already exist
async fn update_status_fields(
    proxy: &WorktypeProxy,
    policy: &RetryPolicy,
    current: &Worktype,
    config: &WorktypeConfig,
) -> Result<()> {
    for desired in &config.statuses {
        let Some(existing) = current.status_by_name(&desired.name) else {
            continue;
        };
        let update = desired.field_update(existing)?;
        if update.is_empty() {
            continue;
        }

        debug!(worktype_id = %current.id, status = %desired.name, "Updating status fields");
        patch_with_retries(policy, move || proxy.update_status(&current.id, &existing.id, update.clone()))
            .await
            .map_err(|err| err.context(&format!("failed to update status '{}'", desired.name)))?;
    }
    Ok(())
}

async fn set_default_status(
    proxy: &WorktypeProxy,
    worktype: &Worktype,
    config: &WorktypeConfig,
    report: &ReconcileReport,
    current_default: Option<&str>,
) -> Result<()> {
    let Some(name) = config.default_status_name.as_deref() else {
        return Ok(());
    };
    let status_id = report
        .status_id(name)
        .ok_or_else(|| TaskMgmtError::unresolved_status(name, &config.name))?;

    if current_default == Some(status_id) {
        return Ok(());
    }

    proxy
        .update(
            &worktype.id,
            WorktypeUpdate {
                default_status_id: Some(status_id.to_string()),
                ..Default::default()
            },
        )
        .await?;
    Ok(())
}

async fn read_after_write(proxy: &WorktypeProxy, policy: &RetryPolicy, id: &str) -> DiagResult<WorktypeState> {
    read(proxy, policy, id).await?.ok_or_else(|| {
        Diagnostics::error(
            RESOURCE_TYPE,
            format!("failed to read worktype {id}"),
            "worktype disappeared right after it was written",
        )
    })
}

fn drift_warnings(report: &ReconcileReport) -> Diagnostics {
    let mut warnings = Diagnostics::default();
    for drift in &report.drift {
        warnings.push_warning(
            RESOURCE_TYPE,
            format!("references of status {} were not updated", drift.status),
            format!(
                "configured destinations {:?} (default {:?}), current destinations {:?} (default {:?}); \
                 references are only linked when a status is created",
                drift.desired_destinations, drift.desired_default, drift.current_destinations, drift.current_default
            ),
        );
    }
    warnings
}
