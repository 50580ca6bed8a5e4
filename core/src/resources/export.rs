//! Enumeration of every task management resource for export.

use std::collections::BTreeMap;

use serde::Serialize;
use tracing::info;

use crate::{
    composite_id,
    diagnostics::{api_error, DiagResult},
    models::Named,
    proxy::{FlowRuleProxy, TaskManagementProxies},
    rules::FlowRuleKind,
};

use super::{workbin, worktype, worktype_status};

/// Exported label of a resource
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResourceMeta {
    pub label: String,
}

impl ResourceMeta {
    fn new(label: impl Into<String>) -> Self {
        Self { label: label.into() }
    }
}

/// Resource id → metadata; child resources use composite ids
pub type ResourceIdMetaMap = BTreeMap<String, ResourceMeta>;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ExportInventory {
    pub workbins: ResourceIdMetaMap,
    pub worktypes: ResourceIdMetaMap,
    pub statuses: ResourceIdMetaMap,
    /// Keyed like `statuses`; every status can carry transitions
    pub status_transitions: ResourceIdMetaMap,
    pub date_based_rules: ResourceIdMetaMap,
    pub attribute_change_rules: ResourceIdMetaMap,
    pub on_create_rules: ResourceIdMetaMap,
}

impl ExportInventory {
    pub fn total(&self) -> usize {
        self.workbins.len()
            + self.worktypes.len()
            + self.statuses.len()
            + self.status_transitions.len()
            + self.date_based_rules.len()
            + self.attribute_change_rules.len()
            + self.on_create_rules.len()
    }
}

/// Walk every workbin and worktype, and every status and rule under each worktype
pub async fn export_all(proxies: &TaskManagementProxies) -> DiagResult<ExportInventory> {
    let mut inventory = ExportInventory::default();

    let workbins = proxies
        .workbins
        .get_all()
        .await
        .map_err(|err| api_error(workbin::RESOURCE_TYPE, "failed to list workbins", &err))?;
    for bin in workbins {
        inventory.workbins.insert(bin.id, ResourceMeta::new(bin.name));
    }

    let worktypes = proxies
        .worktypes
        .get_all()
        .await
        .map_err(|err| api_error(worktype::RESOURCE_TYPE, "failed to list worktypes", &err))?;

    for wt in &worktypes {
        inventory.worktypes.insert(wt.id.clone(), ResourceMeta::new(wt.name.clone()));

        let statuses = proxies.worktypes.list_statuses(&wt.id).await.map_err(|err| {
            api_error(
                worktype_status::RESOURCE_TYPE,
                format!("failed to list statuses of worktype {}", wt.id),
                &err,
            )
        })?;
        for status in statuses {
            let id = composite_id::compose(&wt.id, &status.id);
            let label = format!("{}_{}", wt.name, status.name);
            inventory.status_transitions.insert(id.clone(), ResourceMeta::new(label.clone()));
            inventory.statuses.insert(id, ResourceMeta::new(label));
        }

        export_rules(&proxies.date_based_rules, &wt.id, &wt.name, &mut inventory.date_based_rules).await?;
        export_rules(
            &proxies.attribute_change_rules,
            &wt.id,
            &wt.name,
            &mut inventory.attribute_change_rules,
        )
        .await?;
        export_rules(&proxies.on_create_rules, &wt.id, &wt.name, &mut inventory.on_create_rules).await?;
    }

    info!(resources = inventory.total(), "Exported task management resources");
    Ok(inventory)
}

async fn export_rules<K: FlowRuleKind>(
    proxy: &FlowRuleProxy<K>,
    worktype_id: &str,
    worktype_name: &str,
    into: &mut ResourceIdMetaMap,
) -> DiagResult<()> {
    let rules = proxy.get_all(worktype_id).await.map_err(|err| {
        api_error(
            K::RESOURCE_TYPE,
            format!("failed to list {}s of worktype {worktype_id}", K::DISPLAY),
            &err,
        )
    })?;

    for rule in rules {
        into.insert(
            composite_id::compose(worktype_id, rule.id()),
            ResourceMeta::new(format!("{worktype_name}_{}", rule.name())),
        );
    }
    Ok(())
}
