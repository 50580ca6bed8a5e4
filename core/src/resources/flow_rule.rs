//! Flow rule resources, generic over the rule kind.
//!
//! Rule ids at this surface are composite (`<worktypeId>/<ruleId>`).

use tracing::info;

use super::{confirm_deleted, lookup_with_retries, read_with_retries, FlowRuleConfig, FlowRuleState};
use crate::{
    composite_id,
    diagnostics::{api_error, DiagResult, Diagnostics},
    error::TaskMgmtError,
    models::Named,
    proxy::FlowRuleProxy,
    retry::RetryPolicy,
    rules::FlowRuleKind,
};

fn split<K: FlowRuleKind>(id: &str) -> DiagResult<(&str, &str)> {
    composite_id::split(id).map_err(|err| api_error(K::RESOURCE_TYPE, format!("invalid {} id", K::DISPLAY), &err))
}

pub async fn create<K: FlowRuleKind>(
    proxy: &FlowRuleProxy<K>,
    policy: &RetryPolicy,
    config: &FlowRuleConfig<K>,
) -> DiagResult<FlowRuleState<K>> {
    K::validate(&config.rule)
        .map_err(|err| api_error(K::RESOURCE_TYPE, format!("invalid {} configuration", K::DISPLAY), &err))?;

    let created = proxy
        .create(&config.worktype_id, config.rule.clone())
        .await
        .map_err(|err| {
            api_error(
                K::RESOURCE_TYPE,
                format!("failed to create {} {}", K::DISPLAY, config.name()),
                &err,
            )
        })?;

    let id = composite_id::compose(&config.worktype_id, created.id());
    read_after_write(proxy, policy, &id).await
}

pub async fn read<K: FlowRuleKind>(
    proxy: &FlowRuleProxy<K>,
    policy: &RetryPolicy,
    id: &str,
) -> DiagResult<Option<FlowRuleState<K>>> {
    let (worktype_id, rule_id) = split::<K>(id)?;

    let rule = read_with_retries(policy, move || proxy.get_by_id(worktype_id, rule_id))
        .await
        .map_err(|err| api_error(K::RESOURCE_TYPE, format!("failed to read {} {id}", K::DISPLAY), &err))?;

    if rule.is_none() {
        info!(rule = id, kind = K::DISPLAY, "Flow rule no longer exists");
    }
    Ok(rule.map(|rule| FlowRuleState::from_rule(worktype_id, &rule)))
}

/// Replace the rule's name and condition.
///
/// Moving a rule to another worktype is not an update; it has to be
/// deleted and created again.
pub async fn update<K: FlowRuleKind>(
    proxy: &FlowRuleProxy<K>,
    policy: &RetryPolicy,
    id: &str,
    config: &FlowRuleConfig<K>,
) -> DiagResult<FlowRuleState<K>> {
    let (worktype_id, rule_id) = split::<K>(id)?;

    if config.worktype_id != worktype_id {
        let err = TaskMgmtError::Validation(format!(
            "rule belongs to worktype {worktype_id}, cannot move it to {}",
            config.worktype_id
        ));
        return Err(api_error(K::RESOURCE_TYPE, format!("failed to update {} {id}", K::DISPLAY), &err));
    }
    K::validate(&config.rule)
        .map_err(|err| api_error(K::RESOURCE_TYPE, format!("invalid {} configuration", K::DISPLAY), &err))?;

    proxy
        .update(worktype_id, rule_id, K::update_from(&config.rule))
        .await
        .map_err(|err| api_error(K::RESOURCE_TYPE, format!("failed to update {} {id}", K::DISPLAY), &err))?;

    read_after_write(proxy, policy, id).await
}

pub async fn delete<K: FlowRuleKind>(proxy: &FlowRuleProxy<K>, policy: &RetryPolicy, id: &str) -> DiagResult<()> {
    let (worktype_id, rule_id) = split::<K>(id)?;

    proxy
        .delete(worktype_id, rule_id)
        .await
        .map_err(|err| api_error(K::RESOURCE_TYPE, format!("failed to delete {} {id}", K::DISPLAY), &err))?;

    confirm_deleted(policy, K::DISPLAY, id, move || proxy.fetch(worktype_id, rule_id))
        .await
        .map_err(|err| api_error(K::RESOURCE_TYPE, format!("{} {id} was not deleted", K::DISPLAY), &err))
}

/// Resolve a rule name within a worktype to its composite id
pub async fn lookup<K: FlowRuleKind>(
    proxy: &FlowRuleProxy<K>,
    policy: &RetryPolicy,
    worktype_id: &str,
    name: &str,
) -> DiagResult<String> {
    let rule_id = lookup_with_retries(policy, move || proxy.get_id_by_name(worktype_id, name))
        .await
        .map_err(|err| api_error(K::RESOURCE_TYPE, format!("failed to find {} {name}", K::DISPLAY), &err))?;
    Ok(composite_id::compose(worktype_id, &rule_id))
}

async fn read_after_write<K: FlowRuleKind>(
    proxy: &FlowRuleProxy<K>,
    policy: &RetryPolicy,
    id: &str,
) -> DiagResult<FlowRuleState<K>> {
    read(proxy, policy, id).await?.ok_or_else(|| {
        Diagnostics::error(
            K::RESOURCE_TYPE,
            format!("failed to read {} {id}", K::DISPLAY),
            "rule disappeared right after it was written",
        )
    })
}
