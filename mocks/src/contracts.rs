//! Contract test helpers for validating trait implementations
//!
//! Provides standardized tests that any implementation of the capability
//! traits should pass, so the mock API and real backends stay interchangeable.

use taskmgmt_core::{
    api::{FlowRuleApi, StatusApi, TaskManagementApi, WorkbinApi, WorktypeApi},
    models::{QueryRequest, StatusCategory, StatusCreate, StatusUpdate, WorkbinUpdate, WorktypeUpdate},
    rules::{DateBased, DateBasedRuleUpdate, OnAttributeChange, OnCreate},
};

use crate::{
    approval_worktype_config, create_test_attribute_change_rule, create_test_date_based_rule,
    create_test_on_create_rule, create_test_workbin_config,
};

/// Run every contract against one implementation
pub async fn test_api_contract<A: TaskManagementApi>(api: &A) {
    let workbin_id = test_workbin_contract(api).await;
    let worktype_id = test_worktype_contract(api, &workbin_id).await;
    test_status_contract(api, &worktype_id).await;
    test_rule_contract(api, &worktype_id).await;
}

/// Workbin create/get/query/update; returns a workbin that stays in place
pub async fn test_workbin_contract<A: WorkbinApi>(api: &A) -> String {
    let config = create_test_workbin_config();
    let created = api
        .create_workbin(config.to_create())
        .await
        .expect("Create should succeed");
    assert!(!created.id.is_empty(), "Created workbin should have an id");
    assert_eq!(created.name, config.name, "Created workbin should preserve name");

    let fetched = api.get_workbin(&created.id).await.expect("Get should succeed");
    assert_eq!(fetched.id, created.id);

    let page = api
        .query_workbins(QueryRequest::page(200, None))
        .await
        .expect("Query should succeed");
    assert!(
        page.entities.iter().any(|wb| wb.id == created.id),
        "Query should list the created workbin"
    );

    let updated = api
        .update_workbin(
            &created.id,
            WorkbinUpdate {
                description: Some("Updated by contract".to_string()),
                ..Default::default()
            },
        )
        .await
        .expect("Update should succeed");
    assert_eq!(updated.description.as_deref(), Some("Updated by contract"));
    assert_eq!(updated.name, config.name, "Update should leave other fields alone");

    let missing = api.get_workbin("does-not-exist").await;
    assert!(
        missing.as_ref().is_err_and(|e| e.is_not_found()),
        "Unknown workbin should be not found, got {missing:?}"
    );

    created.id
}

/// Worktype create/get/update; returns a worktype without statuses
pub async fn test_worktype_contract<A: WorktypeApi>(api: &A, workbin_id: &str) -> String {
    let config = approval_worktype_config(workbin_id);
    let created = api
        .create_worktype(config.to_create())
        .await
        .expect("Create should succeed");
    assert_eq!(created.name, config.name);
    assert_eq!(
        created.default_workbin.as_ref().map(|wb| wb.id.as_str()),
        Some(workbin_id),
        "Worktype should keep its default workbin"
    );
    assert!(
        created.statuses.is_empty(),
        "No statuses should be created when default status creation is disabled"
    );

    let updated = api
        .update_worktype(
            &created.id,
            WorktypeUpdate {
                default_priority: Some(7),
                ..Default::default()
            },
        )
        .await
        .expect("Update should succeed");
    assert_eq!(updated.default_priority, Some(7));

    let fetched = api.get_worktype(&created.id).await.expect("Get should succeed");
    assert_eq!(fetched.default_priority, Some(7));

    let bad_default = api
        .update_worktype(
            &created.id,
            WorktypeUpdate {
                default_status_id: Some("not-a-status".to_string()),
                ..Default::default()
            },
        )
        .await;
    assert!(bad_default.is_err(), "Default status must belong to the worktype");

    created.id
}

/// Status create/link/delete inside one worktype
pub async fn test_status_contract<A: StatusApi>(api: &A, worktype_id: &str) {
    let plain = |name: &str| StatusCreate {
        name: name.to_string(),
        category: StatusCategory::Closed,
        description: None,
        destination_status_ids: vec![],
        default_destination_status_id: None,
        status_transition_delay_seconds: None,
        status_transition_time: None,
    };

    let approved = api
        .create_status(worktype_id, plain("Approved"))
        .await
        .expect("Create should succeed");
    let rejected = api
        .create_status(worktype_id, plain("Rejected"))
        .await
        .expect("Create should succeed");

    let duplicate = api.create_status(worktype_id, plain("Approved")).await;
    assert!(duplicate.is_err(), "Status names must be unique within a worktype");

    let linked = api
        .update_status(
            worktype_id,
            &approved.id,
            StatusUpdate {
                destination_status_ids: Some(vec![rejected.id.clone()]),
                default_destination_status_id: Some(Some(rejected.id.clone())),
                ..Default::default()
            },
        )
        .await
        .expect("Linking should succeed");
    assert_eq!(linked.default_destination_id(), Some(rejected.id.as_str()));

    let listed = api.list_statuses(worktype_id).await.expect("List should succeed");
    assert_eq!(listed.len(), 2);

    api.delete_status(worktype_id, &rejected.id)
        .await
        .expect("Delete should succeed");
    let gone = api.get_status(worktype_id, &rejected.id).await;
    assert!(gone.is_err_and(|e| e.is_not_found()), "Deleted status should be not found");
}

/// Create/list/update/delete for every rule kind
pub async fn test_rule_contract<A: TaskManagementApi>(api: &A, worktype_id: &str) {
    let date_based = FlowRuleApi::<DateBased>::create_rule(api, worktype_id, create_test_date_based_rule())
        .await
        .expect("Create should succeed");
    let attribute_change =
        FlowRuleApi::<OnAttributeChange>::create_rule(api, worktype_id, create_test_attribute_change_rule())
            .await
            .expect("Create should succeed");
    let on_create = FlowRuleApi::<OnCreate>::create_rule(api, worktype_id, create_test_on_create_rule())
        .await
        .expect("Create should succeed");

    let page = FlowRuleApi::<DateBased>::list_rules(api, worktype_id, None, 200)
        .await
        .expect("List should succeed");
    assert_eq!(page.entities.len(), 1, "Rule kinds are listed separately");
    assert_eq!(page.entities[0].id, date_based.id);

    let updated = FlowRuleApi::<DateBased>::update_rule(
        api,
        worktype_id,
        &date_based.id,
        DateBasedRuleUpdate {
            name: Some("Due very soon".to_string()),
            condition: None,
        },
    )
    .await
    .expect("Update should succeed");
    assert_eq!(updated.name, "Due very soon");
    assert_eq!(updated.condition, date_based.condition, "Condition should be untouched");

    let fetched = FlowRuleApi::<OnAttributeChange>::get_rule(api, worktype_id, &attribute_change.id)
        .await
        .expect("Get should succeed");
    assert_eq!(fetched.condition.new_value, "escalated");

    FlowRuleApi::<OnCreate>::delete_rule(api, worktype_id, &on_create.id)
        .await
        .expect("Delete should succeed");
    let gone = FlowRuleApi::<OnCreate>::get_rule(api, worktype_id, &on_create.id).await;
    assert!(gone.is_err_and(|e| e.is_not_found()), "Deleted rule should be not found");
}
