//! Two-phase materialization of a worktype's status graph.
//!
//! Statuses reference each other by name, and a reference may point at a
//! status declared later (or at itself through a cycle). The API only takes
//! ids, so the graph is built in two passes:
//!
//! 1. every missing status is created with its plain fields only;
//! 2. once every name has an id, the transition references are patched in.
//!
//! A second run against a fully linked worktype issues no calls, and a run
//! after an interrupted create links whatever the first run left unlinked.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

use tracing::{debug, info, warn};

use crate::{
    api::StatusApi,
    error::{Result, TaskMgmtError},
    models::{StatusUpdate, WorkitemStatus},
    resources::config::StatusConfig,
    retry::{poll_until, Poll, RetryPolicy},
    validation::ConfigValidator,
};

/// Worktype whose statuses are being reconciled
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorktypeRef {
    pub id: String,
    pub name: String,
}

impl WorktypeRef {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcileMode {
    /// Fresh worktype: link every status that declares references
    Create,
    /// Existing worktype: link statuses created in this pass and statuses
    /// that hold no references yet; report the rest as drift
    Update,
}

/// Where a status ended up after a reconcile pass
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusPhase {
    Absent,
    /// Exists, references not (yet) what the configuration asks for
    Created,
    /// Exists with the desired references
    Linked,
}

/// References of a pre-existing status that differ from the configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReferenceDrift {
    pub status: String,
    pub desired_destinations: Vec<String>,
    pub current_destinations: Vec<String>,
    pub desired_default: Option<String>,
    pub current_default: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct ReconcileReport {
    /// Final server view of every desired status, in declaration order
    pub statuses: Vec<WorkitemStatus>,
    pub created: Vec<String>,
    pub patched: Vec<String>,
    pub phases: BTreeMap<String, StatusPhase>,
    pub drift: Vec<ReferenceDrift>,
}

impl ReconcileReport {
    pub fn phase(&self, name: &str) -> StatusPhase {
        self.phases.get(name).copied().unwrap_or(StatusPhase::Absent)
    }

    pub fn status_id(&self, name: &str) -> Option<&str> {
        self.statuses
            .iter()
            .find(|s| s.name == name)
            .map(|s| s.id.as_str())
    }

    pub fn is_noop(&self) -> bool {
        self.created.is_empty() && self.patched.is_empty()
    }
}

/// Materializes desired statuses against one worktype.
pub struct StatusGraphReconciler<'a> {
    api: &'a dyn StatusApi,
    worktype: WorktypeRef,
    policy: RetryPolicy,
}

impl<'a> StatusGraphReconciler<'a> {
    pub fn new(api: &'a dyn StatusApi, worktype: WorktypeRef) -> Self {
        Self {
            api,
            worktype,
            policy: RetryPolicy::default(),
        }
    }

    pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Bring the worktype's statuses in line with `desired`.
    ///
    /// `existing` is the server's current status list. Statuses present
    /// there are matched by name; statuses that are not desired are left
    /// alone. Nothing is created when a reference cannot be resolved.
    pub async fn reconcile(
        &self,
        desired: &[StatusConfig],
        existing: &[WorkitemStatus],
        mode: ReconcileMode,
    ) -> Result<ReconcileReport> {
        ConfigValidator::validate_unique_status_names(desired)?;
        self.check_references(desired)?;

        let mut report = ReconcileReport::default();
        let mut by_name: HashMap<String, WorkitemStatus> = existing
            .iter()
            .map(|status| (status.name.clone(), status.clone()))
            .collect();
        let mut created_now: HashSet<String> = HashSet::new();

        // Phase 1: create what is missing, without references
        for status in desired {
            if let Some(current) = by_name.get(&status.name) {
                if current.category != status.category {
                    return Err(TaskMgmtError::Validation(format!(
                        "Category of status '{}' cannot change from {} to {}",
                        status.name, current.category, status.category
                    )));
                }
                report.phases.insert(status.name.clone(), StatusPhase::Created);
                continue;
            }

            debug!(worktype_id = %self.worktype.id, status = %status.name, "Creating status");
            let created = self
                .api
                .create_status(&self.worktype.id, status.to_create())
                .await
                .map_err(|err| err.context(&format!("failed to create status '{}'", status.name)))?;

            report.created.push(status.name.clone());
            report.phases.insert(status.name.clone(), StatusPhase::Created);
            created_now.insert(status.name.clone());
            by_name.insert(status.name.clone(), created);
        }

        let ids: HashMap<&str, String> = by_name
            .iter()
            .map(|(name, status)| (name.as_str(), status.id.clone()))
            .collect();

        // Phase 2: link references now that every id is known
        let mut linked: Vec<(String, WorkitemStatus)> = Vec::new();
        for status in desired {
            let Some(current) = by_name.get(&status.name) else {
                continue;
            };

            let destination_ids = status
                .destination_status_names
                .iter()
                .map(|name| self.resolve(&ids, name))
                .collect::<Result<Vec<_>>>()?;
            let default_id = status
                .default_destination()
                .map(|name| self.resolve(&ids, name))
                .transpose()?;

            let desired_set: BTreeSet<&str> = destination_ids.iter().map(String::as_str).collect();
            let in_sync = desired_set == current.destination_ids()
                && default_id.as_deref() == current.default_destination_id();

            if in_sync {
                report.phases.insert(status.name.clone(), StatusPhase::Linked);
                continue;
            }

            let pre_existing = !created_now.contains(&status.name);
            let nothing_to_link = destination_ids.is_empty() && default_id.is_none();
            // Left behind by an interrupted create
            let never_linked = current.destination_statuses.is_empty() && current.default_destination_id().is_none();

            if pre_existing && (nothing_to_link || (mode == ReconcileMode::Update && !never_linked)) {
                let drift = self.drift(status, current, &by_name);
                warn!(
                    worktype_id = %self.worktype.id,
                    status = %status.name,
                    desired = ?drift.desired_destinations,
                    current = ?drift.current_destinations,
                    "Status references differ from configuration; references are only linked at creation"
                );
                report.drift.push(drift);
                continue;
            }

            if nothing_to_link {
                report.phases.insert(status.name.clone(), StatusPhase::Linked);
                continue;
            }

            let update = StatusUpdate {
                destination_status_ids: Some(destination_ids),
                default_destination_status_id: default_id.map(Some),
                ..Default::default()
            };
            let patched = self.patch(current, update).await?;
            report.patched.push(status.name.clone());
            report.phases.insert(status.name.clone(), StatusPhase::Linked);
            linked.push((status.name.clone(), patched));
        }

        for (name, status) in linked {
            by_name.insert(name, status);
        }

        report.statuses = desired
            .iter()
            .filter_map(|status| by_name.get(&status.name).cloned())
            .collect();

        info!(
            worktype_id = %self.worktype.id,
            created = report.created.len(),
            patched = report.patched.len(),
            drift = report.drift.len(),
            "Reconciled worktype statuses"
        );
        Ok(report)
    }

    fn check_references(&self, desired: &[StatusConfig]) -> Result<()> {
        let names: HashSet<&str> = desired.iter().map(|s| s.name.as_str()).collect();
        for status in desired {
            if let Some(missing) = status.referenced_names().find(|name| !names.contains(name)) {
                return Err(TaskMgmtError::unresolved_status(missing, &self.worktype.name));
            }
        }
        Ok(())
    }

    fn resolve(&self, ids: &HashMap<&str, String>, name: &str) -> Result<String> {
        ids.get(name)
            .cloned()
            .ok_or_else(|| TaskMgmtError::unresolved_status(name, &self.worktype.name))
    }

    /// Patch with replay while concurrent status writes collide
    async fn patch(&self, current: &WorkitemStatus, update: StatusUpdate) -> Result<WorkitemStatus> {
        debug!(
            worktype_id = %self.worktype.id,
            status = %current.name,
            destinations = ?update.destination_status_ids,
            "Linking status references"
        );

        let api = self.api;
        let worktype_id = self.worktype.id.as_str();
        let status_id = current.id.as_str();

        poll_until(self.policy.patch_timeout, self.policy.interval, || {
            let update = update.clone();
            async move { Poll::from_result(api.update_status(worktype_id, status_id, update).await) }
        })
        .await
        .map_err(|err| err.context(&format!("failed to link status '{}'", current.name)))
    }

    fn drift(
        &self,
        status: &StatusConfig,
        current: &WorkitemStatus,
        by_name: &HashMap<String, WorkitemStatus>,
    ) -> ReferenceDrift {
        let name_of = |id: &str| -> String {
            by_name
                .values()
                .find(|s| s.id == id)
                .map(|s| s.name.clone())
                .unwrap_or_else(|| id.to_string())
        };

        let mut current_destinations: Vec<String> =
            current.destination_ids().into_iter().map(name_of).collect();
        current_destinations.sort();
        let mut desired_destinations = status.destination_status_names.clone();
        desired_destinations.sort();

        ReferenceDrift {
            status: status.name.clone(),
            desired_destinations,
            current_destinations,
            desired_default: status.default_destination().map(str::to_string),
            current_default: current.default_destination_id().map(name_of),
        }
    }
}

/// Reconcile with the default retry policy
pub async fn reconcile_statuses(
    api: &dyn StatusApi,
    worktype: &WorktypeRef,
    desired: &[StatusConfig],
    existing: &[WorkitemStatus],
    mode: ReconcileMode,
) -> Result<ReconcileReport> {
    StatusGraphReconciler::new(api, worktype.clone())
        .reconcile(desired, existing, mode)
        .await
}
