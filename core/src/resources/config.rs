//! Declarative desired state and its translation to and from API shapes.
//!
//! Statuses reference each other by name here. Ids only appear once the
//! reconciler has materialized the status graph.

use std::collections::BTreeMap;
use std::fmt;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::composite_id;
use crate::error::{Result, TaskMgmtError};
use crate::models::{
    StatusCategory, StatusCreate, StatusUpdate, Workbin, WorkbinCreate, WorkbinUpdate,
    WorkitemStatus, Worktype, WorktypeCreate, WorktypeUpdate,
};
use crate::rules::FlowRuleKind;

/// Include `desired` in a patch only when it differs from `current`
fn changed<T: PartialEq + Clone>(desired: &Option<T>, current: &Option<T>) -> Option<T> {
    match desired {
        Some(value) if Some(value) != current.as_ref() => Some(value.clone()),
        _ => None,
    }
}

/// Like [`changed`], but a desired `None` clears a value that is set
fn changed_or_cleared<T: PartialEq + Clone>(desired: &Option<T>, current: &Option<T>) -> Option<Option<T>> {
    (desired != current).then(|| desired.clone())
}

fn ref_id(reference: &Option<crate::models::EntityRef>) -> Option<String> {
    reference.as_ref().map(|r| r.id.clone())
}

// ----------------------------------------------------------------------------
// Workbin
// ----------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct WorkbinConfig {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub division_id: Option<String>,
}

impl WorkbinConfig {
    pub fn to_create(&self) -> WorkbinCreate {
        WorkbinCreate {
            name: self.name.clone(),
            description: self.description.clone(),
            division_id: self.division_id.clone(),
        }
    }

    pub fn diff_update(&self, current: &Workbin) -> WorkbinUpdate {
        WorkbinUpdate {
            name: (self.name != current.name).then(|| self.name.clone()),
            description: changed(&self.description, &current.description),
        }
    }

    pub fn from_workbin(workbin: &Workbin) -> Self {
        Self {
            name: workbin.name.clone(),
            description: workbin.description.clone(),
            division_id: ref_id(&workbin.division),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct WorkbinState {
    pub id: String,
    #[serde(flatten)]
    pub config: WorkbinConfig,
}

// ----------------------------------------------------------------------------
// Statuses
// ----------------------------------------------------------------------------

/// A desired worktype status.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StatusConfig {
    pub name: String,
    pub category: StatusCategory,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub destination_status_names: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_destination_status_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status_transition_delay_seconds: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status_transition_time: Option<String>,
}

impl StatusConfig {
    pub fn new(name: impl Into<String>, category: StatusCategory) -> Self {
        Self {
            name: name.into(),
            category,
            description: None,
            destination_status_names: Vec::new(),
            default_destination_status_name: None,
            status_transition_delay_seconds: None,
            status_transition_time: None,
        }
    }

    pub fn default_destination(&self) -> Option<&str> {
        self.default_destination_status_name
            .as_deref()
            .filter(|name| !name.is_empty())
    }

    /// Whether this status points at other statuses
    pub fn has_references(&self) -> bool {
        !self.destination_status_names.is_empty() || self.default_destination().is_some()
    }

    /// Every status name this status references
    pub fn referenced_names(&self) -> impl Iterator<Item = &str> {
        self.destination_status_names
            .iter()
            .map(String::as_str)
            .chain(self.default_destination())
    }

    /// Create body without any references; those are linked afterwards
    pub fn to_create(&self) -> StatusCreate {
        StatusCreate {
            name: self.name.clone(),
            category: self.category,
            description: self.description.clone(),
            destination_status_ids: Vec::new(),
            default_destination_status_id: None,
            status_transition_delay_seconds: self.status_transition_delay_seconds.filter(|d| *d > 0),
            status_transition_time: self.status_transition_time.clone(),
        }
    }

    /// Patch for the non-relational fields that differ from `current`.
    ///
    /// A field dropped from the configuration is cleared on the server. The
    /// category of an existing status is immutable, so a mismatch is a
    /// validation error rather than a patch.
    pub fn field_update(&self, current: &WorkitemStatus) -> Result<StatusUpdate> {
        if self.category != current.category {
            return Err(TaskMgmtError::Validation(format!(
                "Category of status '{}' cannot change from {} to {}",
                self.name, current.category, self.category
            )));
        }

        Ok(StatusUpdate {
            description: changed_or_cleared(&self.description, &current.description),
            status_transition_delay_seconds: changed_or_cleared(
                &self.status_transition_delay_seconds.filter(|d| *d > 0),
                &current.status_transition_delay_seconds.filter(|d| *d > 0),
            ),
            status_transition_time: changed_or_cleared(
                &self.status_transition_time,
                &current.status_transition_time,
            ),
            ..Default::default()
        })
    }

    /// Flatten an API status back to names using the full status list
    pub fn from_status(status: &WorkitemStatus, all: &[WorkitemStatus]) -> Self {
        let name_of = |id: &str| {
            all.iter()
                .find(|s| s.id == id)
                .map(|s| s.name.clone())
                .unwrap_or_else(|| id.to_string())
        };

        Self {
            name: status.name.clone(),
            category: status.category,
            description: status.description.clone(),
            destination_status_names: status
                .destination_statuses
                .iter()
                .map(|r| name_of(&r.id))
                .collect(),
            default_destination_status_name: status.default_destination_id().map(name_of),
            status_transition_delay_seconds: status.status_transition_delay_seconds,
            status_transition_time: status.status_transition_time.clone(),
        }
    }
}

// ----------------------------------------------------------------------------
// Standalone statuses and transitions
// ----------------------------------------------------------------------------

/// A single status managed on its own, with references given as ids.
///
/// References may be bare status ids or the composite ids other status
/// resources expose; only the status part is sent.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct WorktypeStatusConfig {
    pub worktype_id: String,
    pub name: String,
    pub category: StatusCategory,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub destination_status_ids: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_destination_status_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status_transition_delay_seconds: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status_transition_time: Option<String>,
}

impl WorktypeStatusConfig {
    pub fn new(worktype_id: impl Into<String>, name: impl Into<String>, category: StatusCategory) -> Self {
        Self {
            worktype_id: worktype_id.into(),
            name: name.into(),
            category,
            description: None,
            destination_status_ids: Vec::new(),
            default_destination_status_id: None,
            status_transition_delay_seconds: None,
            status_transition_time: None,
        }
    }

    pub fn to_create(&self) -> StatusCreate {
        StatusCreate {
            name: self.name.clone(),
            category: self.category,
            description: self.description.clone(),
            destination_status_ids: bare_ids(&self.destination_status_ids),
            default_destination_status_id: bare_id(&self.default_destination_status_id),
            status_transition_delay_seconds: self.status_transition_delay_seconds.filter(|d| *d > 0),
            status_transition_time: self.status_transition_time.clone(),
        }
    }

    /// Patch for everything that differs from `current`, clearing dropped fields
    pub fn to_update(&self, current: &WorkitemStatus) -> Result<StatusUpdate> {
        if self.category != current.category {
            return Err(TaskMgmtError::Validation(format!(
                "Category of status '{}' cannot change from {} to {}",
                current.name, current.category, self.category
            )));
        }

        let destinations = bare_ids(&self.destination_status_ids);
        let desired_set: std::collections::BTreeSet<&str> = destinations.iter().map(String::as_str).collect();

        Ok(StatusUpdate {
            name: (self.name != current.name).then(|| self.name.clone()),
            description: changed_or_cleared(&self.description, &current.description),
            destination_status_ids: (desired_set != current.destination_ids()).then_some(destinations),
            default_destination_status_id: changed_or_cleared(
                &bare_id(&self.default_destination_status_id),
                &current.default_destination_id().map(str::to_string),
            ),
            status_transition_delay_seconds: changed_or_cleared(
                &self.status_transition_delay_seconds.filter(|d| *d > 0),
                &current.status_transition_delay_seconds.filter(|d| *d > 0),
            ),
            status_transition_time: changed_or_cleared(
                &self.status_transition_time,
                &current.status_transition_time,
            ),
        })
    }
}

/// Transitions of one existing status, managed apart from the status itself.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StatusTransitionConfig {
    pub worktype_id: String,
    /// Bare or composite id of the status whose transitions are set
    pub status_id: String,
    #[serde(default)]
    pub destination_status_ids: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_destination_status_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status_transition_delay_seconds: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status_transition_time: Option<String>,
}

impl StatusTransitionConfig {
    pub fn new(worktype_id: impl Into<String>, status_id: impl Into<String>) -> Self {
        Self {
            worktype_id: worktype_id.into(),
            status_id: status_id.into(),
            destination_status_ids: Vec::new(),
            default_destination_status_id: None,
            status_transition_delay_seconds: None,
            status_transition_time: None,
        }
    }

    pub fn bare_status_id(&self) -> &str {
        composite_id::child_id(&self.status_id)
    }

    /// Id of the transition resource, `<worktypeId>/<statusId>`
    pub fn id(&self) -> String {
        composite_id::compose(&self.worktype_id, self.bare_status_id())
    }

    /// Full replacement of the transition fields
    pub fn to_update(&self) -> StatusUpdate {
        StatusUpdate {
            destination_status_ids: Some(bare_ids(&self.destination_status_ids)),
            default_destination_status_id: Some(bare_id(&self.default_destination_status_id)),
            status_transition_delay_seconds: Some(self.status_transition_delay_seconds.filter(|d| *d > 0)),
            status_transition_time: Some(self.status_transition_time.clone()),
            ..Default::default()
        }
    }

    /// Patch that gives back what this configuration set on `current`.
    ///
    /// Destinations added outside this configuration stay; the default is
    /// cleared only when this configuration set one.
    pub fn to_release(&self, current: &WorkitemStatus) -> StatusUpdate {
        let managed = bare_ids(&self.destination_status_ids);
        let remaining = current
            .destination_statuses
            .iter()
            .map(|status| status.id.clone())
            .filter(|id| !managed.contains(id))
            .collect();

        StatusUpdate {
            destination_status_ids: Some(remaining),
            default_destination_status_id: self.default_destination_status_id.as_ref().map(|_| None),
            ..Default::default()
        }
    }
}

fn bare_ids(references: &[String]) -> Vec<String> {
    references
        .iter()
        .map(|reference| composite_id::child_id(reference).to_string())
        .collect()
}

fn bare_id(reference: &Option<String>) -> Option<String> {
    reference
        .as_deref()
        .filter(|reference| !reference.is_empty())
        .map(|reference| composite_id::child_id(reference).to_string())
}

// ----------------------------------------------------------------------------
// Worktype
// ----------------------------------------------------------------------------

/// A desired worktype including its status graph.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct WorktypeConfig {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub division_id: Option<String>,
    pub default_workbin_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_status_name: Option<String>,
    #[serde(default)]
    pub statuses: Vec<StatusConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_duration_seconds: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_expiration_seconds: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_due_duration_seconds: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_priority: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_ttl_seconds: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_language_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_queue_id: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub default_skill_ids: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assignment_enabled: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema_version: Option<i32>,
}

impl WorktypeConfig {
    pub fn status(&self, name: &str) -> Option<&StatusConfig> {
        self.statuses.iter().find(|s| s.name == name)
    }

    /// Base create body; statuses are created by the reconciler
    pub fn to_create(&self) -> WorktypeCreate {
        WorktypeCreate {
            name: self.name.clone(),
            division_id: self.division_id.clone(),
            description: self.description.clone(),
            disable_default_status_creation: true,
            default_workbin_id: self.default_workbin_id.clone(),
            schema_id: self.schema_id.clone(),
            schema_version: self.schema_version,
            default_priority: self.default_priority,
            default_language_id: self.default_language_id.clone(),
            default_queue_id: self.default_queue_id.clone(),
            default_skill_ids: self.default_skill_ids.clone(),
            assignment_enabled: self.assignment_enabled,
            default_duration_seconds: self.default_duration_seconds,
            default_expiration_seconds: self.default_expiration_seconds,
            default_due_duration_seconds: self.default_due_duration_seconds,
            default_ttl_seconds: self.default_ttl_seconds,
        }
    }

    /// Patch of the base fields that differ from `current`.
    ///
    /// The default status is left out; it can only be set once the status
    /// graph is linked.
    pub fn diff_update(&self, current: &Worktype) -> WorktypeUpdate {
        let current_skills: Vec<String> = current.default_skills.iter().map(|s| s.id.clone()).collect();

        WorktypeUpdate {
            name: (self.name != current.name).then(|| self.name.clone()),
            description: changed(&self.description, &current.description),
            default_workbin_id: changed(
                &Some(self.default_workbin_id.clone()),
                &ref_id(&current.default_workbin),
            ),
            default_status_id: None,
            schema_id: changed(
                &self.schema_id,
                &current.schema.as_ref().map(|s| s.id.clone()),
            ),
            schema_version: changed(
                &self.schema_version,
                &current.schema.as_ref().and_then(|s| s.version),
            ),
            default_priority: changed(&self.default_priority, &current.default_priority),
            default_language_id: changed(&self.default_language_id, &ref_id(&current.default_language)),
            default_queue_id: changed(&self.default_queue_id, &ref_id(&current.default_queue)),
            default_skill_ids: (self.default_skill_ids != current_skills)
                .then(|| self.default_skill_ids.clone()),
            assignment_enabled: changed(&self.assignment_enabled, &current.assignment_enabled),
            default_duration_seconds: changed(
                &self.default_duration_seconds,
                &current.default_duration_seconds,
            ),
            default_expiration_seconds: changed(
                &self.default_expiration_seconds,
                &current.default_expiration_seconds,
            ),
            default_due_duration_seconds: changed(
                &self.default_due_duration_seconds,
                &current.default_due_duration_seconds,
            ),
            default_ttl_seconds: changed(&self.default_ttl_seconds, &current.default_ttl_seconds),
        }
    }

    /// Flatten an API worktype (with its full status list) into config
    pub fn from_worktype(worktype: &Worktype) -> Self {
        Self {
            name: worktype.name.clone(),
            description: worktype.description.clone(),
            division_id: ref_id(&worktype.division),
            default_workbin_id: ref_id(&worktype.default_workbin).unwrap_or_default(),
            default_status_name: worktype
                .default_status
                .as_ref()
                .and_then(|r| worktype.status_name_by_id(&r.id))
                .map(str::to_string),
            statuses: worktype
                .statuses
                .iter()
                .map(|s| StatusConfig::from_status(s, &worktype.statuses))
                .collect(),
            default_duration_seconds: worktype.default_duration_seconds,
            default_expiration_seconds: worktype.default_expiration_seconds,
            default_due_duration_seconds: worktype.default_due_duration_seconds,
            default_priority: worktype.default_priority,
            default_ttl_seconds: worktype.default_ttl_seconds,
            default_language_id: ref_id(&worktype.default_language),
            default_queue_id: ref_id(&worktype.default_queue),
            default_skill_ids: worktype.default_skills.iter().map(|s| s.id.clone()).collect(),
            assignment_enabled: worktype.assignment_enabled,
            schema_id: worktype.schema.as_ref().map(|s| s.id.clone()),
            schema_version: worktype.schema.as_ref().and_then(|s| s.version),
        }
    }
}

/// A worktype as read back: config plus the ids assigned to its statuses.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct WorktypeState {
    pub id: String,
    #[serde(flatten)]
    pub config: WorktypeConfig,
    #[serde(default)]
    pub status_ids: BTreeMap<String, String>,
}

impl WorktypeState {
    pub fn from_worktype(worktype: &Worktype) -> Self {
        Self {
            id: worktype.id.clone(),
            config: WorktypeConfig::from_worktype(worktype),
            status_ids: worktype
                .statuses
                .iter()
                .map(|s| (s.name.clone(), s.id.clone()))
                .collect(),
        }
    }

    /// Composite id of one of this worktype's statuses
    pub fn status_composite_id(&self, name: &str) -> Option<String> {
        self.status_ids
            .get(name)
            .map(|status_id| composite_id::compose(&self.id, status_id))
    }
}

// ----------------------------------------------------------------------------
// Flow rules
// ----------------------------------------------------------------------------

/// A desired flow rule of kind `K` attached to a worktype.
#[derive(Serialize, Deserialize)]
#[serde(bound(serialize = "K::Create: Serialize", deserialize = "K::Create: DeserializeOwned"))]
pub struct FlowRuleConfig<K: FlowRuleKind> {
    pub worktype_id: String,
    #[serde(flatten)]
    pub rule: K::Create,
}

impl<K: FlowRuleKind> FlowRuleConfig<K> {
    pub fn new(worktype_id: impl Into<String>, rule: K::Create) -> Self {
        Self {
            worktype_id: worktype_id.into(),
            rule,
        }
    }

    pub fn name(&self) -> &str {
        K::create_name(&self.rule)
    }
}

impl<K: FlowRuleKind> Clone for FlowRuleConfig<K> {
    fn clone(&self) -> Self {
        Self::new(self.worktype_id.clone(), self.rule.clone())
    }
}

impl<K: FlowRuleKind> PartialEq for FlowRuleConfig<K> {
    fn eq(&self, other: &Self) -> bool {
        self.worktype_id == other.worktype_id && self.rule == other.rule
    }
}

impl<K: FlowRuleKind> fmt::Debug for FlowRuleConfig<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FlowRuleConfig")
            .field("kind", &K::DISPLAY)
            .field("worktype_id", &self.worktype_id)
            .field("rule", &self.rule)
            .finish()
    }
}

/// A flow rule as read back, keyed by its composite id.
#[derive(Serialize)]
#[serde(bound(serialize = "K::Create: Serialize"))]
pub struct FlowRuleState<K: FlowRuleKind> {
    pub id: String,
    #[serde(flatten)]
    pub config: FlowRuleConfig<K>,
}

impl<K: FlowRuleKind> FlowRuleState<K> {
    pub fn from_rule(worktype_id: &str, rule: &K::Rule) -> Self {
        use crate::models::Named;

        Self {
            id: composite_id::compose(worktype_id, rule.id()),
            config: FlowRuleConfig::new(worktype_id, K::create_from(rule)),
        }
    }
}

impl<K: FlowRuleKind> Clone for FlowRuleState<K> {
    fn clone(&self) -> Self {
        Self {
            id: self.id.clone(),
            config: self.config.clone(),
        }
    }
}

impl<K: FlowRuleKind> fmt::Debug for FlowRuleState<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FlowRuleState")
            .field("id", &self.id)
            .field("config", &self.config)
            .finish()
    }
}
