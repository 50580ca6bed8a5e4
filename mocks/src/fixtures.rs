//! Standard test fixtures for consistent testing
//!
//! Provides pre-built configurations including:
//! - Status graphs with cycles, self references and chains
//! - One rule of every flow rule kind
//! - A mock API with a workbin already in place

use taskmgmt_core::{
    api::WorkbinApi,
    models::StatusCategory,
    resources::{StatusConfig, WorkbinConfig, WorktypeConfig},
    rules::{
        AttributeChangeCondition, DateBasedCondition, DateBasedRuleCreate, OnAttributeChangeRuleCreate,
        OnCreateRuleCreate,
    },
};

use crate::{MockTaskManagementApi, StatusConfigBuilder, WorkbinConfigBuilder, WorktypeConfigBuilder};

/// Two closed statuses that default to each other
pub fn approval_statuses() -> Vec<StatusConfig> {
    vec![
        StatusConfigBuilder::new("Approved")
            .with_category(StatusCategory::Closed)
            .defaulting_to("Rejected")
            .build(),
        StatusConfigBuilder::new("Rejected")
            .with_category(StatusCategory::Closed)
            .defaulting_to("Approved")
            .build(),
    ]
}

/// Statuses without any transition references
pub fn unlinked_statuses() -> Vec<StatusConfig> {
    vec![
        StatusConfig::new("Open", StatusCategory::Open),
        StatusConfig::new("Working", StatusCategory::InProgress),
        StatusConfig::new("Done", StatusCategory::Closed),
    ]
}

/// A chain `Step 1 -> Step 2 -> ... -> Step n` where the last step loops to the first
pub fn status_ring(n: usize) -> Vec<StatusConfig> {
    (1..=n)
        .map(|i| {
            let next = if i == n { 1 } else { i + 1 };
            StatusConfigBuilder::new(format!("Step {i}"))
                .with_category(StatusCategory::InProgress)
                .defaulting_to(format!("Step {next}"))
                .build()
        })
        .collect()
}

/// A status that may transition to itself after a delay
pub fn self_referencing_status() -> StatusConfig {
    StatusConfigBuilder::new("Waiting")
        .with_category(StatusCategory::Waiting)
        .defaulting_to("Waiting")
        .with_transition_delay(3600)
        .with_transition_time("08:30:00")
        .build()
}

pub fn create_test_workbin_config() -> WorkbinConfig {
    WorkbinConfigBuilder::new("Test Workbin")
        .with_description("Workbin created by tests")
        .build()
}

/// The approval worktype: Approved and Rejected point at each other
pub fn approval_worktype_config(workbin_id: &str) -> WorktypeConfig {
    WorktypeConfigBuilder::new("Approvals", workbin_id)
        .with_description("Approve or reject requests")
        .with_statuses(approval_statuses())
        .with_default_status("Approved")
        .build()
}

pub fn create_test_date_based_rule() -> DateBasedRuleCreate {
    DateBasedRuleCreate {
        name: "Due soon".to_string(),
        condition: DateBasedCondition {
            attribute: "dateDue".to_string(),
            relative_minutes_to_invocation: -60,
        },
    }
}

pub fn create_test_attribute_change_rule() -> OnAttributeChangeRuleCreate {
    OnAttributeChangeRuleCreate {
        name: "Escalate on status change".to_string(),
        condition: AttributeChangeCondition {
            attribute: "statusId".to_string(),
            new_value: "escalated".to_string(),
            old_value: None,
        },
    }
}

pub fn create_test_on_create_rule() -> OnCreateRuleCreate {
    OnCreateRuleCreate {
        name: "Route new items".to_string(),
    }
}

/// Mock API with one workbin; returns the workbin id
pub async fn mock_api_with_workbin() -> (MockTaskManagementApi, String) {
    let api = MockTaskManagementApi::new();
    let workbin = api
        .create_workbin(create_test_workbin_config().to_create())
        .await
        .expect("seeding a workbin into the mock API cannot fail");
    api.clear_history();
    (api, workbin.id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use taskmgmt_core::validation::ConfigValidator;

    #[test]
    fn test_fixtures_are_valid() {
        ConfigValidator::validate_worktype(&approval_worktype_config("wb-1")).unwrap();
        ConfigValidator::validate_status(&self_referencing_status()).unwrap();
        ConfigValidator::validate_unique_status_names(&status_ring(5)).unwrap();
        ConfigValidator::validate_unique_status_names(&unlinked_statuses()).unwrap();
    }

    #[test]
    fn test_status_ring_closes() {
        let ring = status_ring(3);
        assert_eq!(ring[2].default_destination(), Some("Step 1"));
        assert_eq!(ring[0].default_destination(), Some("Step 2"));
    }
}
