use std::collections::HashSet;
use std::sync::OnceLock;

use regex::Regex;

use crate::{
    error::{Result, TaskMgmtError},
    resources::config::{
        StatusConfig, StatusTransitionConfig, WorkbinConfig, WorktypeConfig, WorktypeStatusConfig,
    },
};

const MAX_NAME_LENGTH: usize = 256;
const MAX_DESCRIPTION_LENGTH: usize = 512;
const PRIORITY_RANGE: std::ops::RangeInclusive<i32> = -25_000_000..=25_000_000;

fn transition_time_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^([01]\d|2[0-3]):[0-5]\d:[0-5]\d$").expect("transition time pattern is valid")
    })
}

/// Validation of desired configuration before anything is sent to the API
pub struct ConfigValidator;

impl ConfigValidator {
    /// Validate an entity name
    ///
    /// Names must:
    /// - Not be empty or whitespace only
    /// - Not have leading or trailing whitespace
    /// - Be at most 256 characters long
    ///
    /// # Arguments
    /// * `field` - The field name used in the error message
    /// * `name` - The name to validate
    ///
    /// # Returns
    /// * `Ok(())` - If the name is valid
    /// * `Err(TaskMgmtError::Validation)` - If the name is invalid
    pub fn validate_name(field: &str, name: &str) -> Result<()> {
        if name.trim().is_empty() {
            return Err(TaskMgmtError::empty_field(field));
        }

        if name.trim() != name {
            return Err(TaskMgmtError::Validation(format!(
                "Field '{field}' must not have leading or trailing whitespace"
            )));
        }

        if name.chars().count() > MAX_NAME_LENGTH {
            return Err(TaskMgmtError::Validation(format!(
                "Field '{field}' must be at most {MAX_NAME_LENGTH} characters long"
            )));
        }

        Ok(())
    }

    pub fn validate_description(description: Option<&str>) -> Result<()> {
        match description {
            Some(text) if text.chars().count() > MAX_DESCRIPTION_LENGTH => Err(TaskMgmtError::Validation(
                format!("Description must be at most {MAX_DESCRIPTION_LENGTH} characters long"),
            )),
            _ => Ok(()),
        }
    }

    /// Validate a status transition time of the form `HH:MM:SS`
    pub fn validate_transition_time(time: &str) -> Result<()> {
        if !transition_time_pattern().is_match(time) {
            return Err(TaskMgmtError::Validation(format!(
                "Status transition time '{time}' must be in HH:MM:SS format"
            )));
        }
        Ok(())
    }

    pub fn validate_transition_delay(seconds: i32) -> Result<()> {
        if seconds < 0 {
            return Err(TaskMgmtError::Validation(
                "Status transition delay cannot be negative".to_string(),
            ));
        }
        Ok(())
    }

    pub fn validate_status(status: &StatusConfig) -> Result<()> {
        Self::validate_name("status.name", &status.name)?;
        Self::validate_description(status.description.as_deref())?;
        Self::validate_transition_fields(status.status_transition_time.as_deref(), status.status_transition_delay_seconds)?;

        if status.referenced_names().any(str::is_empty) {
            return Err(TaskMgmtError::Validation(format!(
                "Status '{}' references a status with an empty name",
                status.name
            )));
        }

        Ok(())
    }

    /// Validate a status managed on its own
    pub fn validate_status_resource(status: &WorktypeStatusConfig) -> Result<()> {
        if status.worktype_id.trim().is_empty() {
            return Err(TaskMgmtError::empty_field("worktype_id"));
        }
        Self::validate_name("name", &status.name)?;
        Self::validate_description(status.description.as_deref())?;
        Self::validate_transition_fields(status.status_transition_time.as_deref(), status.status_transition_delay_seconds)?;

        if status.destination_status_ids.iter().any(|id| id.trim().is_empty()) {
            return Err(TaskMgmtError::Validation(format!(
                "Status '{}' has an empty destination status id",
                status.name
            )));
        }
        Ok(())
    }

    /// Validate the transitions set on one status
    pub fn validate_status_transition(transition: &StatusTransitionConfig) -> Result<()> {
        if transition.worktype_id.trim().is_empty() {
            return Err(TaskMgmtError::empty_field("worktype_id"));
        }
        if transition.status_id.trim().is_empty() {
            return Err(TaskMgmtError::empty_field("status_id"));
        }
        // A composite status id has to point into the same worktype
        if let Ok((worktype_id, _)) = crate::composite_id::split(&transition.status_id) {
            if worktype_id != transition.worktype_id {
                return Err(TaskMgmtError::Validation(format!(
                    "Status {} does not belong to worktype {}",
                    transition.status_id, transition.worktype_id
                )));
            }
        }
        if transition.destination_status_ids.iter().any(|id| id.trim().is_empty()) {
            return Err(TaskMgmtError::Validation(
                "Destination status ids must not be empty".to_string(),
            ));
        }
        Self::validate_transition_fields(
            transition.status_transition_time.as_deref(),
            transition.status_transition_delay_seconds,
        )
    }

    fn validate_transition_fields(time: Option<&str>, delay: Option<i32>) -> Result<()> {
        if let Some(time) = time {
            Self::validate_transition_time(time)?;
        }
        if let Some(delay) = delay {
            Self::validate_transition_delay(delay)?;
        }
        Ok(())
    }

    /// Status names must be unique within a worktype
    pub fn validate_unique_status_names(statuses: &[StatusConfig]) -> Result<()> {
        let mut seen = HashSet::new();
        for status in statuses {
            if !seen.insert(status.name.as_str()) {
                return Err(TaskMgmtError::Validation(format!(
                    "Duplicate status name '{}'",
                    status.name
                )));
            }
        }
        Ok(())
    }

    pub fn validate_workbin(workbin: &WorkbinConfig) -> Result<()> {
        Self::validate_name("name", &workbin.name)?;
        Self::validate_description(workbin.description.as_deref())
    }

    /// Validate a desired worktype
    ///
    /// Reference names inside the status graph are not checked here; the
    /// reconciler resolves them and reports the first one that is missing.
    pub fn validate_worktype(worktype: &WorktypeConfig) -> Result<()> {
        Self::validate_name("name", &worktype.name)?;
        Self::validate_description(worktype.description.as_deref())?;

        if worktype.default_workbin_id.trim().is_empty() {
            return Err(TaskMgmtError::empty_field("default_workbin_id"));
        }

        if let Some(priority) = worktype.default_priority {
            if !PRIORITY_RANGE.contains(&priority) {
                return Err(TaskMgmtError::Validation(format!(
                    "Default priority {priority} is outside {}..={}",
                    PRIORITY_RANGE.start(),
                    PRIORITY_RANGE.end()
                )));
            }
        }

        for status in &worktype.statuses {
            Self::validate_status(status)?;
        }
        Self::validate_unique_status_names(&worktype.statuses)?;

        if let Some(default_status) = &worktype.default_status_name {
            if worktype.status(default_status).is_none() {
                return Err(TaskMgmtError::unresolved_status(default_status, &worktype.name));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::StatusCategory;

    fn worktype() -> WorktypeConfig {
        WorktypeConfig {
            name: "Claims".to_string(),
            description: None,
            division_id: None,
            default_workbin_id: "wb-1".to_string(),
            default_status_name: Some("Open".to_string()),
            statuses: vec![
                StatusConfig::new("Open", StatusCategory::Open),
                StatusConfig::new("Closed", StatusCategory::Closed),
            ],
            default_duration_seconds: None,
            default_expiration_seconds: None,
            default_due_duration_seconds: None,
            default_priority: Some(5),
            default_ttl_seconds: None,
            default_language_id: None,
            default_queue_id: None,
            default_skill_ids: vec![],
            assignment_enabled: None,
            schema_id: None,
            schema_version: None,
        }
    }

    #[test]
    fn test_status_resource_validation() {
        let mut status = WorktypeStatusConfig::new("wt-1", "Review", StatusCategory::Waiting);
        assert!(ConfigValidator::validate_status_resource(&status).is_ok());

        status.status_transition_time = Some("25:00:00".to_string());
        assert!(ConfigValidator::validate_status_resource(&status).is_err());

        status.status_transition_time = None;
        status.worktype_id = " ".to_string();
        assert!(ConfigValidator::validate_status_resource(&status).is_err());
    }

    #[test]
    fn test_status_transition_validation() {
        let mut transition = StatusTransitionConfig::new("wt-1", "wt-1/st-1");
        assert!(ConfigValidator::validate_status_transition(&transition).is_ok());

        transition.status_id = "wt-2/st-1".to_string();
        let err = ConfigValidator::validate_status_transition(&transition).unwrap_err();
        assert!(err.to_string().contains("does not belong"));

        transition.status_id = "st-1".to_string();
        transition.destination_status_ids = vec![String::new()];
        assert!(ConfigValidator::validate_status_transition(&transition).is_err());

        transition.destination_status_ids.clear();
        transition.status_transition_delay_seconds = Some(-1);
        assert!(ConfigValidator::validate_status_transition(&transition).is_err());
    }

    #[test]
    fn test_valid_names() {
        assert!(ConfigValidator::validate_name("name", "Claims").is_ok());
        assert!(ConfigValidator::validate_name("name", "Claims Intake (EU)").is_ok());
    }

    #[test]
    fn test_invalid_names() {
        assert!(ConfigValidator::validate_name("name", "").is_err());
        assert!(ConfigValidator::validate_name("name", "   ").is_err());
        assert!(ConfigValidator::validate_name("name", " padded").is_err());
        assert!(ConfigValidator::validate_name("name", &"x".repeat(257)).is_err());
    }

    #[test]
    fn test_transition_time() {
        assert!(ConfigValidator::validate_transition_time("00:00:00").is_ok());
        assert!(ConfigValidator::validate_transition_time("23:59:59").is_ok());
        assert!(ConfigValidator::validate_transition_time("24:00:00").is_err());
        assert!(ConfigValidator::validate_transition_time("9:00:00").is_err());
        assert!(ConfigValidator::validate_transition_time("10:60:00").is_err());
    }

    #[test]
    fn test_transition_delay() {
        assert!(ConfigValidator::validate_transition_delay(0).is_ok());
        assert!(ConfigValidator::validate_transition_delay(86_400).is_ok());
        assert!(ConfigValidator::validate_transition_delay(-1).is_err());
    }

    #[test]
    fn test_validate_worktype() {
        assert!(ConfigValidator::validate_worktype(&worktype()).is_ok());

        let mut config = worktype();
        config.default_workbin_id = String::new();
        assert!(ConfigValidator::validate_worktype(&config).is_err());

        let mut config = worktype();
        config.statuses.push(StatusConfig::new("Open", StatusCategory::Waiting));
        let err = ConfigValidator::validate_worktype(&config).unwrap_err();
        assert!(err.to_string().contains("Duplicate status name 'Open'"));

        let mut config = worktype();
        config.default_status_name = Some("Archived".to_string());
        let err = ConfigValidator::validate_worktype(&config).unwrap_err();
        assert_eq!(err, TaskMgmtError::unresolved_status("Archived", "Claims"));
    }

    #[test]
    fn test_forward_references_are_not_checked_here() {
        let mut config = worktype();
        config.statuses[0].destination_status_names = vec!["Escalated".to_string()];
        assert!(ConfigValidator::validate_worktype(&config).is_ok());
    }
}
