use std::io::Write;
use std::sync::Arc;

use mocks::*;
use taskmgmt_cli::commands::{
    LookupTarget, RuleAction, RuleKind, StatusAction, TransitionAction, WorkbinAction, WorktypeAction,
};
use taskmgmt_cli::{run, App, Command};
use taskmgmt_core::{diagnostics::Severity, RetryPolicy, WorktypeState};
use tempfile::{Builder, NamedTempFile};

fn app(api: &MockTaskManagementApi) -> App {
    App::with_api(Arc::new(api.clone()), RetryPolicy::immediate())
}

fn config_file(suffix: &str, contents: &str) -> NamedTempFile {
    let mut file = Builder::new().suffix(suffix).tempfile().unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    file
}

fn approvals_toml(workbin_id: &str, rejected_default: &str) -> String {
    format!(
        r#"
name = "Approvals"
default_workbin_id = "{workbin_id}"
default_status_name = "Approved"

[[statuses]]
name = "Approved"
category = "Closed"
destination_status_names = ["Rejected"]
default_destination_status_name = "Rejected"

[[statuses]]
name = "Rejected"
category = "Closed"
destination_status_names = ["{rejected_default}"]
default_destination_status_name = "{rejected_default}"
"#
    )
}

#[tokio::test]
async fn test_worktype_apply_creates_then_updates() {
    let (api, workbin_id) = mock_api_with_workbin().await;
    let app = app(&api);
    let file = config_file(".toml", &approvals_toml(&workbin_id, "Approved"));

    let output = run(
        &app,
        Command::Worktype {
            action: WorktypeAction::Apply {
                file: file.path().to_path_buf(),
            },
        },
    )
    .await
    .unwrap();

    let state: WorktypeState = serde_json::from_str(&output.body).unwrap();
    assert_eq!(state.config.name, "Approvals");
    assert_eq!(state.status_ids.len(), 2);
    assert!(output.warnings.is_empty());
    assert_eq!(api.worktype_count(), 1);

    api.clear_history();
    let again = run(
        &app,
        Command::Worktype {
            action: WorktypeAction::Apply {
                file: file.path().to_path_buf(),
            },
        },
    )
    .await
    .unwrap();

    api.assert_not_called("create_worktype");
    api.assert_not_called("create_status");
    api.assert_not_called("update_status");
    assert_eq!(api.worktype_count(), 1);
    assert!(again.warnings.is_empty());
}

#[tokio::test]
async fn test_worktype_apply_reports_reference_drift() {
    let (api, workbin_id) = mock_api_with_workbin().await;
    let app = app(&api);
    let first = config_file(".toml", &approvals_toml(&workbin_id, "Approved"));
    run(
        &app,
        Command::Worktype {
            action: WorktypeAction::Apply {
                file: first.path().to_path_buf(),
            },
        },
    )
    .await
    .unwrap();

    let changed = config_file(".toml", &approvals_toml(&workbin_id, "Rejected"));
    let output = run(
        &app,
        Command::Worktype {
            action: WorktypeAction::Apply {
                file: changed.path().to_path_buf(),
            },
        },
    )
    .await
    .unwrap();

    assert_diagnostic_contains(&output.warnings, Severity::Warning, "Rejected");
}

#[tokio::test]
async fn test_worktype_with_unknown_status_fails() {
    let (api, workbin_id) = mock_api_with_workbin().await;
    let file = config_file(
        ".json",
        &format!(
            r#"{{"name": "Broken", "default_workbin_id": "{workbin_id}",
                "statuses": [{{"name": "Open", "category": "Open",
                               "destination_status_names": ["Missing"]}}]}}"#
        ),
    );

    let err = run(
        &app(&api),
        Command::Worktype {
            action: WorktypeAction::Apply {
                file: file.path().to_path_buf(),
            },
        },
    )
    .await
    .unwrap_err();

    assert!(err.to_string().contains("Missing"), "unexpected error: {err:#}");
    api.assert_not_called("create_status");
}

#[tokio::test]
async fn test_workbin_commands() {
    let api = MockTaskManagementApi::new();
    let app = app(&api);
    let file = config_file(".toml", "name = \"Returns\"\ndescription = \"Returned goods\"\n");

    run(
        &app,
        Command::Workbin {
            action: WorkbinAction::Apply {
                file: file.path().to_path_buf(),
            },
        },
    )
    .await
    .unwrap();

    let id = run(
        &app,
        Command::Lookup {
            target: LookupTarget::Workbin {
                name: "Returns".to_string(),
            },
        },
    )
    .await
    .unwrap()
    .body;

    let shown = run(&app, Command::Workbin { action: WorkbinAction::Show { id: id.clone() } })
        .await
        .unwrap();
    assert!(shown.body.contains("Returned goods"));

    let deleted = run(&app, Command::Workbin { action: WorkbinAction::Delete { id: id.clone() } })
        .await
        .unwrap();
    assert_eq!(deleted.body, format!("Deleted workbin {id}"));
    assert_eq!(api.workbin_count(), 0);

    let missing = run(&app, Command::Workbin { action: WorkbinAction::Show { id } }).await;
    assert!(missing.unwrap_err().to_string().contains("not found"));
}

#[tokio::test]
async fn test_rule_commands() {
    let (api, workbin_id) = mock_api_with_workbin().await;
    let app = app(&api);
    let worktype = run(
        &app,
        Command::Worktype {
            action: WorktypeAction::Apply {
                file: config_file(".toml", &approvals_toml(&workbin_id, "Approved")).path().to_path_buf(),
            },
        },
    )
    .await
    .unwrap();
    let worktype: WorktypeState = serde_json::from_str(&worktype.body).unwrap();

    let rule = config_file(
        ".json",
        &format!(
            r#"{{"worktype_id": "{}", "name": "Escalate",
                "condition": {{"attribute": "statusId", "newValue": "escalated"}}}}"#,
            worktype.id
        ),
    );
    let apply = || Command::Rule {
        action: RuleAction::Apply {
            kind: RuleKind::AttributeChange,
            file: rule.path().to_path_buf(),
        },
    };
    run(&app, apply()).await.unwrap();
    run(&app, apply()).await.unwrap();
    assert_eq!(api.call_count("create_rule"), 1, "second apply updates in place");

    let id = run(
        &app,
        Command::Lookup {
            target: LookupTarget::Rule {
                kind: RuleKind::AttributeChange,
                worktype_id: worktype.id.clone(),
                name: "Escalate".to_string(),
            },
        },
    )
    .await
    .unwrap()
    .body;
    assert!(id.starts_with(&format!("{}/", worktype.id)));

    let shown = run(
        &app,
        Command::Rule {
            action: RuleAction::Show {
                kind: RuleKind::AttributeChange,
                id: id.clone(),
            },
        },
    )
    .await
    .unwrap();
    assert!(shown.body.contains("escalated"));

    run(
        &app,
        Command::Rule {
            action: RuleAction::Delete {
                kind: RuleKind::AttributeChange,
                id,
            },
        },
    )
    .await
    .unwrap();
    assert_eq!(api.rule_count::<taskmgmt_core::OnAttributeChange>(), 0);
}

#[tokio::test]
async fn test_status_lookup_and_export() {
    let (api, workbin_id) = mock_api_with_workbin().await;
    let app = app(&api);
    let output = run(
        &app,
        Command::Worktype {
            action: WorktypeAction::Apply {
                file: config_file(".toml", &approvals_toml(&workbin_id, "Approved")).path().to_path_buf(),
            },
        },
    )
    .await
    .unwrap();
    let worktype: WorktypeState = serde_json::from_str(&output.body).unwrap();

    let status_id = run(
        &app,
        Command::Lookup {
            target: LookupTarget::Status {
                worktype_id: worktype.id.clone(),
                name: "Rejected".to_string(),
            },
        },
    )
    .await
    .unwrap()
    .body;
    assert_eq!(Some(status_id), worktype.status_composite_id("Rejected"));

    let export = run(&app, Command::Export).await.unwrap();
    let inventory: serde_json::Value = serde_json::from_str(&export.body).unwrap();
    assert_eq!(inventory["workbins"].as_object().unwrap().len(), 1);
    assert_eq!(inventory["statuses"].as_object().unwrap().len(), 2);
    assert_eq!(inventory["status_transitions"].as_object().unwrap().len(), 2);
    assert!(export.body.contains("Approvals_Approved"));
}

#[tokio::test]
async fn test_status_and_transition_commands() {
    let (api, workbin_id) = mock_api_with_workbin().await;
    let app = app(&api);
    let output = run(
        &app,
        Command::Worktype {
            action: WorktypeAction::Apply {
                file: config_file(".toml", &approvals_toml(&workbin_id, "Approved")).path().to_path_buf(),
            },
        },
    )
    .await
    .unwrap();
    let worktype: WorktypeState = serde_json::from_str(&output.body).unwrap();
    let approved = worktype.status_composite_id("Approved").unwrap();

    let status = config_file(
        ".toml",
        &format!(
            "worktype_id = \"{}\"\nname = \"Escalated\"\ncategory = \"InProgress\"\ndescription = \"Needs review\"\n",
            worktype.id
        ),
    );
    let apply = || Command::Status {
        action: StatusAction::Apply {
            file: status.path().to_path_buf(),
        },
    };
    let created: serde_json::Value = serde_json::from_str(&run(&app, apply()).await.unwrap().body).unwrap();
    run(&app, apply()).await.unwrap();
    assert_eq!(api.call_count("create_status"), 3, "second apply matches the status by name");
    let escalated = created["id"].as_str().unwrap().to_string();

    let transition = config_file(
        ".json",
        &format!(
            r#"{{"worktype_id": "{}", "status_id": "{escalated}",
                "destination_status_ids": ["{approved}"], "default_destination_status_id": "{approved}"}}"#,
            worktype.id
        ),
    );
    run(
        &app,
        Command::Transition {
            action: TransitionAction::Apply {
                file: transition.path().to_path_buf(),
            },
        },
    )
    .await
    .unwrap();
    let server = api.worktype_snapshot(&worktype.id).unwrap();
    assert_status_links(&server.statuses, "Escalated", &["Approved"], Some("Approved"));

    let shown = run(
        &app,
        Command::Transition {
            action: TransitionAction::Show { id: escalated.clone() },
        },
    )
    .await
    .unwrap();
    assert!(shown.body.contains("destination_status_ids"));

    run(
        &app,
        Command::Transition {
            action: TransitionAction::Delete {
                file: transition.path().to_path_buf(),
            },
        },
    )
    .await
    .unwrap();
    let server = api.worktype_snapshot(&worktype.id).unwrap();
    assert_status_links(&server.statuses, "Escalated", &[], None);

    let deleted = run(&app, Command::Status { action: StatusAction::Delete { id: escalated.clone() } })
        .await
        .unwrap();
    assert_eq!(deleted.body, format!("Deleted status {escalated}"));
    assert_status_names(&api.worktype_snapshot(&worktype.id).unwrap().statuses, &["Approved", "Rejected"]);
}
