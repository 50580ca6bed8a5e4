use std::sync::Arc;

use serde_json::json;
use wiremock::matchers::{body_partial_json, body_string_contains, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use taskmgmt_client::{Credentials, GenesysClient, TaskMgmtError, DEFAULT_TIMEOUT};
use taskmgmt_core::{
    api::{FlowRuleApi, StatusApi, WorkbinApi, WorktypeApi},
    models::{QueryRequest, StatusCategory, StatusUpdate, WorkbinCreate},
    rules::{DateBased, OnCreate, OnCreateRuleCreate},
    TaskManagementProxies,
};

fn token_client(server: &MockServer) -> GenesysClient {
    GenesysClient::new(
        &server.uri(),
        Credentials::AccessToken("test-token".to_string()),
        DEFAULT_TIMEOUT,
    )
    .unwrap()
}

fn oauth_client(server: &MockServer) -> GenesysClient {
    GenesysClient::new(
        &server.uri(),
        Credentials::ClientCredentials {
            client_id: "client".to_string(),
            client_secret: "secret".to_string(),
            token_url: format!("{}/oauth/token", server.uri()),
        },
        DEFAULT_TIMEOUT,
    )
    .unwrap()
}

#[tokio::test]
async fn test_create_workbin_sends_bearer_token() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/v2/taskmanagement/workbins"))
        .and(header("Authorization", "Bearer test-token"))
        .and(body_partial_json(json!({"name": "Claims"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "wb-1",
            "name": "Claims",
            "description": "Claims intake"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = token_client(&server);
    let workbin = client
        .create_workbin(WorkbinCreate {
            name: "Claims".to_string(),
            description: Some("Claims intake".to_string()),
            division_id: None,
        })
        .await
        .unwrap();

    assert_eq!(workbin.id, "wb-1");
    assert_eq!(workbin.description.as_deref(), Some("Claims intake"));
}

#[tokio::test]
async fn test_oauth_token_is_cached() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/oauth/token"))
        .and(body_string_contains("grant_type=client_credentials"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "oauth-token",
            "token_type": "bearer",
            "expires_in": 86399
        })))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/api/v2/taskmanagement/workbins/wb-1"))
        .and(header("Authorization", "Bearer oauth-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "wb-1", "name": "Claims"})))
        .expect(2)
        .mount(&server)
        .await;

    let client = oauth_client(&server);
    client.get_workbin("wb-1").await.unwrap();
    client.get_workbin("wb-1").await.unwrap();
}

#[tokio::test]
async fn test_unauthorized_refreshes_token_once() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/oauth/token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "oauth-token",
            "expires_in": 86399
        })))
        .expect(2)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/api/v2/taskmanagement/worktypes/wt-1"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({"message": "expired"})))
        .up_to_n_times(1)
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/api/v2/taskmanagement/worktypes/wt-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "wt-1", "name": "Approvals"})))
        .expect(1)
        .mount(&server)
        .await;

    let client = oauth_client(&server);
    let worktype = client.get_worktype("wt-1").await.unwrap();
    assert_eq!(worktype.name, "Approvals");
}

#[tokio::test]
async fn test_token_endpoint_failure_is_configuration_error() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/oauth/token"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({"error": "invalid_client"})))
        .mount(&server)
        .await;

    let client = oauth_client(&server);
    let err = client.get_workbin("wb-1").await.unwrap_err();
    assert!(matches!(err, TaskMgmtError::Configuration(_)), "got {err:?}");
}

#[tokio::test]
async fn test_error_mapping() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/v2/taskmanagement/workbins/missing"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({
            "message": "Workbin not found",
            "code": "not.found"
        })))
        .mount(&server)
        .await;

    Mock::given(method("PATCH"))
        .and(path("/api/v2/taskmanagement/worktypes/wt-1/statuses/st-1"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "message": "Database transaction was cancelled",
            "status": 400
        })))
        .mount(&server)
        .await;

    let client = token_client(&server);

    let err = client.get_workbin("missing").await.unwrap_err();
    assert!(err.is_not_found());

    let err = client
        .update_status(
            "wt-1",
            "st-1",
            StatusUpdate {
                default_destination_status_id: Some(Some("st-2".to_string())),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
    assert_eq!(err.status_code(), 400);
    assert!(err.is_retryable());
}

#[tokio::test]
async fn test_list_statuses_unwraps_entities() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/v2/taskmanagement/worktypes/wt-1/statuses"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "entities": [
                {
                    "id": "st-1",
                    "name": "Approved",
                    "category": "Closed",
                    "destinationStatuses": [{"id": "st-2"}],
                    "defaultDestinationStatus": {"id": "st-2"}
                },
                {
                    "id": "st-2",
                    "name": "Rejected",
                    "category": "Closed",
                    "defaultDestinationStatus": {"id": "st-1"}
                }
            ]
        })))
        .mount(&server)
        .await;

    let client = token_client(&server);
    let statuses = client.list_statuses("wt-1").await.unwrap();

    assert_eq!(statuses.len(), 2);
    assert_eq!(statuses[0].category, StatusCategory::Closed);
    assert_eq!(statuses[0].default_destination_id(), Some("st-2"));
    assert_eq!(statuses[1].default_destination_id(), Some("st-1"));
}

#[tokio::test]
async fn test_list_rules_passes_cursor() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/v2/taskmanagement/worktypes/wt-1/flows/datebased/rules"))
        .and(query_param("pageSize", "200"))
        .and(query_param("after", "cursor-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "entities": [{
                "id": "rule-2",
                "name": "Reminder",
                "condition": {"attribute": "dateDue", "relativeMinutesToInvocation": -30}
            }]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = token_client(&server);
    let page = FlowRuleApi::<DateBased>::list_rules(&client, "wt-1", Some("cursor-1".to_string()), 200)
        .await
        .unwrap();

    assert_eq!(page.entities.len(), 1);
    assert_eq!(page.entities[0].condition.relative_minutes_to_invocation, -30);
    assert_eq!(page.next_cursor(), None);
}

#[tokio::test]
async fn test_delete_rule_accepts_empty_body() {
    let server = MockServer::start().await;

    Mock::given(method("DELETE"))
        .and(path("/api/v2/taskmanagement/worktypes/wt-1/flows/oncreate/rules/rule-1"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/api/v2/taskmanagement/worktypes/wt-1/flows/oncreate/rules"))
        .and(body_partial_json(json!({"name": "Auto assign"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "rule-1",
            "name": "Auto assign",
            "worktype": {"id": "wt-1"}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = token_client(&server);
    let rule = FlowRuleApi::<OnCreate>::create_rule(
        &client,
        "wt-1",
        OnCreateRuleCreate {
            name: "Auto assign".to_string(),
        },
    )
    .await
    .unwrap();
    assert_eq!(rule.id, "rule-1");

    FlowRuleApi::<OnCreate>::delete_rule(&client, "wt-1", "rule-1")
        .await
        .unwrap();
}

#[tokio::test]
async fn test_proxy_name_lookup_follows_query_pages() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/v2/taskmanagement/worktypes/query"))
        .and(body_partial_json(json!({"pageSize": 200, "after": "page-2"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "entities": [{"id": "wt-201", "name": "Escalations"}]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let first_page: Vec<_> = (0..200)
        .map(|i| json!({"id": format!("wt-{i}"), "name": format!("Worktype {i}")}))
        .collect();
    Mock::given(method("POST"))
        .and(path("/api/v2/taskmanagement/worktypes/query"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "entities": first_page,
            "after": "page-2"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let proxies = TaskManagementProxies::new(Arc::new(token_client(&server)));
    let id = proxies.worktypes.get_id_by_name("Escalations").await.unwrap();
    assert_eq!(id, "wt-201");
}

#[tokio::test]
async fn test_query_workbins_sends_page_size() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/v2/taskmanagement/workbins/query"))
        .and(body_partial_json(json!({"pageSize": 50})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"entities": []})))
        .expect(1)
        .mount(&server)
        .await;

    let client = token_client(&server);
    let page = client.query_workbins(QueryRequest::page(50, None)).await.unwrap();
    assert!(page.entities.is_empty());
}
