//! Builder pattern implementations for easy test data construction
//!
//! Provides fluent builders for:
//! - Desired worktype, status and workbin configurations
//! - Server-side status and worktype entities for seeding the mock API

use taskmgmt_core::{
    models::{EntityRef, StatusCategory, WorkitemStatus, Worktype},
    resources::{StatusConfig, WorkbinConfig, WorktypeConfig},
};

/// Builder for constructing desired status configurations
pub struct StatusConfigBuilder {
    status: StatusConfig,
}

impl StatusConfigBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            status: StatusConfig::new(name, StatusCategory::Open),
        }
    }

    pub fn with_category(mut self, category: StatusCategory) -> Self {
        self.status.category = category;
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.status.description = Some(description.into());
        self
    }

    /// Add an allowed transition target by name
    pub fn to(mut self, destination: impl Into<String>) -> Self {
        self.status.destination_status_names.push(destination.into());
        self
    }

    /// Set the default transition target, adding it as a destination too
    pub fn defaulting_to(mut self, destination: impl Into<String>) -> Self {
        let destination = destination.into();
        if !self.status.destination_status_names.contains(&destination) {
            self.status.destination_status_names.push(destination.clone());
        }
        self.status.default_destination_status_name = Some(destination);
        self
    }

    pub fn with_transition_delay(mut self, seconds: i32) -> Self {
        self.status.status_transition_delay_seconds = Some(seconds);
        self
    }

    pub fn with_transition_time(mut self, time: impl Into<String>) -> Self {
        self.status.status_transition_time = Some(time.into());
        self
    }

    pub fn build(self) -> StatusConfig {
        self.status
    }
}

/// Builder for constructing desired worktype configurations
pub struct WorktypeConfigBuilder {
    config: WorktypeConfig,
}

impl WorktypeConfigBuilder {
    /// Create new builder with no statuses
    pub fn new(name: impl Into<String>, workbin_id: impl Into<String>) -> Self {
        Self {
            config: WorktypeConfig {
                name: name.into(),
                description: None,
                division_id: None,
                default_workbin_id: workbin_id.into(),
                default_status_name: None,
                statuses: Vec::new(),
                default_duration_seconds: None,
                default_expiration_seconds: None,
                default_due_duration_seconds: None,
                default_priority: None,
                default_ttl_seconds: None,
                default_language_id: None,
                default_queue_id: None,
                default_skill_ids: Vec::new(),
                assignment_enabled: None,
                schema_id: None,
                schema_version: None,
            },
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.config.description = Some(description.into());
        self
    }

    pub fn with_status(mut self, status: StatusConfig) -> Self {
        self.config.statuses.push(status);
        self
    }

    pub fn with_statuses(mut self, statuses: impl IntoIterator<Item = StatusConfig>) -> Self {
        self.config.statuses.extend(statuses);
        self
    }

    pub fn with_default_status(mut self, name: impl Into<String>) -> Self {
        self.config.default_status_name = Some(name.into());
        self
    }

    pub fn with_priority(mut self, priority: i32) -> Self {
        self.config.default_priority = Some(priority);
        self
    }

    pub fn with_schema(mut self, schema_id: impl Into<String>, version: Option<i32>) -> Self {
        self.config.schema_id = Some(schema_id.into());
        self.config.schema_version = version;
        self
    }

    pub fn with_skills(mut self, skill_ids: &[&str]) -> Self {
        self.config.default_skill_ids = skill_ids.iter().map(|s| s.to_string()).collect();
        self
    }

    pub fn build(self) -> WorktypeConfig {
        self.config
    }
}

/// Builder for constructing desired workbin configurations
pub struct WorkbinConfigBuilder {
    config: WorkbinConfig,
}

impl WorkbinConfigBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            config: WorkbinConfig {
                name: name.into(),
                description: None,
                division_id: None,
            },
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.config.description = Some(description.into());
        self
    }

    pub fn with_division(mut self, division_id: impl Into<String>) -> Self {
        self.config.division_id = Some(division_id.into());
        self
    }

    pub fn build(self) -> WorkbinConfig {
        self.config
    }
}

/// Builder for server-side statuses, referencing targets by id
pub struct WorkitemStatusBuilder {
    status: WorkitemStatus,
}

impl WorkitemStatusBuilder {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            status: WorkitemStatus {
                id: id.into(),
                name: name.into(),
                category: StatusCategory::Open,
                description: None,
                destination_statuses: Vec::new(),
                default_destination_status: None,
                status_transition_delay_seconds: None,
                status_transition_time: None,
                worktype: None,
            },
        }
    }

    pub fn with_category(mut self, category: StatusCategory) -> Self {
        self.status.category = category;
        self
    }

    pub fn to(mut self, destination_id: impl Into<String>) -> Self {
        self.status
            .destination_statuses
            .push(EntityRef::new(destination_id));
        self
    }

    pub fn defaulting_to(mut self, destination_id: impl Into<String>) -> Self {
        self.status.default_destination_status = Some(EntityRef::new(destination_id));
        self
    }

    pub fn build(self) -> WorkitemStatus {
        self.status
    }
}

/// Builder for server-side worktypes used to seed the mock API
pub struct WorktypeBuilder {
    worktype: Worktype,
}

impl WorktypeBuilder {
    pub fn new(id: impl Into<String>, name: impl Into<String>, workbin_id: impl Into<String>) -> Self {
        Self {
            worktype: Worktype {
                id: id.into(),
                name: name.into(),
                description: None,
                division: None,
                default_workbin: Some(EntityRef::new(workbin_id)),
                default_status: None,
                statuses: Vec::new(),
                default_duration_seconds: None,
                default_expiration_seconds: None,
                default_due_duration_seconds: None,
                default_priority: None,
                default_ttl_seconds: None,
                default_language: None,
                default_queue: None,
                default_skills: Vec::new(),
                assignment_enabled: None,
                schema: None,
                date_created: None,
                date_modified: None,
            },
        }
    }

    pub fn with_status(mut self, mut status: WorkitemStatus) -> Self {
        status.worktype = Some(EntityRef::new(self.worktype.id.clone()));
        self.worktype.statuses.push(status);
        self
    }

    pub fn with_default_status(mut self, status_id: impl Into<String>) -> Self {
        self.worktype.default_status = Some(EntityRef::new(status_id));
        self
    }

    pub fn build(self) -> Worktype {
        self.worktype
    }
}
