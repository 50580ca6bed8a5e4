use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::TaskMgmtError;

/// Anything the API lists that can be found by name.
pub trait Named {
    fn id(&self) -> &str;
    fn name(&self) -> &str;
}

/// Reference to another entity as the API embeds it (`{"id": ..., "name": ...}`).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct EntityRef {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl EntityRef {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: None,
        }
    }
}

/// Reference to a workitem schema, pinned to a version when one is given.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SchemaRef {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<i32>,
}

/// One page of a cursor-paginated listing.
///
/// The API returns an `after` cursor while more pages remain; a missing or
/// empty cursor marks the last page.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
#[serde(bound(deserialize = "T: Deserialize<'de>"))]
pub struct Page<T> {
    #[serde(default)]
    pub entities: Vec<T>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub after: Option<String>,
}

impl<T> Page<T> {
    /// The cursor for the next page, if there is one
    pub fn next_cursor(&self) -> Option<&str> {
        self.after.as_deref().filter(|after| !after.is_empty())
    }
}

/// Body for the `POST .../query` listing endpoints.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct QueryRequest {
    pub page_size: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub after: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub filters: Vec<QueryFilter>,
}

impl QueryRequest {
    pub fn page(page_size: u32, after: Option<String>) -> Self {
        Self {
            page_size,
            after,
            filters: Vec::new(),
        }
    }
}

/// A single filter clause of a [`QueryRequest`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct QueryFilter {
    pub name: String,
    #[serde(rename = "type")]
    pub filter_type: String,
    pub operator: String,
    pub values: Vec<String>,
}

impl QueryFilter {
    /// `name EQ value` string filter
    pub fn name_equals(value: &str) -> Self {
        Self {
            name: "name".to_string(),
            filter_type: "String".to_string(),
            operator: "EQ".to_string(),
            values: vec![value.to_string()],
        }
    }
}

// ----------------------------------------------------------------------------
// Workbins
// ----------------------------------------------------------------------------

/// A container workitems are routed into.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Workbin {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub division: Option<EntityRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_created: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_modified: Option<DateTime<Utc>>,
}

impl Named for Workbin {
    fn id(&self) -> &str {
        &self.id
    }
    fn name(&self) -> &str {
        &self.name
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct WorkbinCreate {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub division_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct WorkbinUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl WorkbinUpdate {
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.description.is_none()
    }
}

// ----------------------------------------------------------------------------
// Statuses
// ----------------------------------------------------------------------------

/// Category a worktype status belongs to.
///
/// Every workitem status falls into exactly one category; the category of a
/// status cannot be changed once it exists.
#[derive(Debug, Clone, Copy, Hash, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
pub enum StatusCategory {
    Open,
    InProgress,
    Waiting,
    Closed,
}

impl fmt::Display for StatusCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            StatusCategory::Open => "Open",
            StatusCategory::InProgress => "InProgress",
            StatusCategory::Waiting => "Waiting",
            StatusCategory::Closed => "Closed",
        };
        f.write_str(label)
    }
}

impl FromStr for StatusCategory {
    type Err = TaskMgmtError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Open" => Ok(StatusCategory::Open),
            "InProgress" => Ok(StatusCategory::InProgress),
            "Waiting" => Ok(StatusCategory::Waiting),
            "Closed" => Ok(StatusCategory::Closed),
            other => Err(TaskMgmtError::Validation(format!(
                "Invalid status category '{other}'. Must be one of: Open, InProgress, Waiting, Closed"
            ))),
        }
    }
}

/// A status of a worktype as the API returns it.
///
/// Transition targets are id references; they only become names again when
/// flattened against the full status list of the owning worktype.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct WorkitemStatus {
    pub id: String,
    pub name: String,
    pub category: StatusCategory,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub destination_statuses: Vec<EntityRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_destination_status: Option<EntityRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status_transition_delay_seconds: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status_transition_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub worktype: Option<EntityRef>,
}

impl WorkitemStatus {
    /// Ids of the allowed transition targets
    pub fn destination_ids(&self) -> BTreeSet<&str> {
        self.destination_statuses
            .iter()
            .map(|status| status.id.as_str())
            .collect()
    }

    /// Id of the preferred transition target
    pub fn default_destination_id(&self) -> Option<&str> {
        self.default_destination_status
            .as_ref()
            .map(|status| status.id.as_str())
            .filter(|id| !id.is_empty())
    }
}

impl Named for WorkitemStatus {
    fn id(&self) -> &str {
        &self.id
    }
    fn name(&self) -> &str {
        &self.name
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct StatusCreate {
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

/// Partial status update; absent fields are left untouched by the API.
///
/// Clearable fields are doubly optional: `None` leaves the field alone and
/// `Some(None)` is sent as an explicit `null`, which clears it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct StatusUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "nullable")]
    pub description: Option<Option<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub destination_status_ids: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "nullable")]
    pub default_destination_status_id: Option<Option<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "nullable")]
    pub status_transition_delay_seconds: Option<Option<i32>>,
    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "nullable")]
    pub status_transition_time: Option<Option<String>>,
}

/// Keep a present `null` apart from a missing field
fn nullable<'de, D, T>(deserializer: D) -> std::result::Result<Option<Option<T>>, D::Error>
where
    D: serde::Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

impl StatusUpdate {
    /// The API rejects updates that change nothing
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.description.is_none()
            && self.destination_status_ids.is_none()
            && self.default_destination_status_id.is_none()
            && self.status_transition_delay_seconds.is_none()
            && self.status_transition_time.is_none()
    }

    /// Whether this update points the status at other statuses
    pub fn has_references(&self) -> bool {
        self.destination_status_ids
            .as_ref()
            .is_some_and(|ids| !ids.is_empty())
            || self
                .default_destination_status_id
                .as_ref()
                .is_some_and(|id| id.as_deref().is_some_and(|id| !id.is_empty()))
    }
}

// ----------------------------------------------------------------------------
// Worktypes
// ----------------------------------------------------------------------------

/// A worktype with the statuses it owns.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Worktype {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub division: Option<EntityRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_workbin: Option<EntityRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_status: Option<EntityRef>,
    #[serde(default)]
    pub statuses: Vec<WorkitemStatus>,
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
    pub default_language: Option<EntityRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_queue: Option<EntityRef>,
    #[serde(default)]
    pub default_skills: Vec<EntityRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assignment_enabled: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema: Option<SchemaRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_created: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_modified: Option<DateTime<Utc>>,
}

impl Worktype {
    /// Find a status of this worktype by name
    pub fn status_by_name(&self, name: &str) -> Option<&WorkitemStatus> {
        self.statuses.iter().find(|status| status.name == name)
    }

    /// Resolve a status name to its id
    pub fn status_id_by_name(&self, name: &str) -> Option<&str> {
        self.status_by_name(name).map(|status| status.id.as_str())
    }

    /// Resolve a status id back to its name
    pub fn status_name_by_id(&self, id: &str) -> Option<&str> {
        self.statuses
            .iter()
            .find(|status| status.id == id)
            .map(|status| status.name.as_str())
    }
}

impl Named for Worktype {
    fn id(&self) -> &str {
        &self.id
    }
    fn name(&self) -> &str {
        &self.name
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct WorktypeCreate {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub division_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Always true here: statuses are materialized by the reconciler
    pub disable_default_status_creation: bool,
    pub default_workbin_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema_version: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_priority: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_language_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_queue_id: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub default_skill_ids: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assignment_enabled: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_duration_seconds: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_expiration_seconds: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_due_duration_seconds: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_ttl_seconds: Option<i32>,
}

/// Partial worktype update; only the fields that changed are sent.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct WorktypeUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_workbin_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_status_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema_version: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_priority: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_language_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_queue_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_skill_ids: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assignment_enabled: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_duration_seconds: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_expiration_seconds: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_due_duration_seconds: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_ttl_seconds: Option<i32>,
}

impl WorktypeUpdate {
    pub fn is_empty(&self) -> bool {
        *self == WorktypeUpdate::default()
    }
}
