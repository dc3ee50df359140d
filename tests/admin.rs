use esgscore::error::AdminError;
use esgscore::identity::{handle_webhook, Admin, IdentityClient, WebhookEvent, WebhookOutcome};
use esgscore::models::{Role, UserSummary};
use serde_json::{json, Value};
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const SECRET: &str = "sk_test_123";

fn user(id: &str, metadata: Value) -> Value {
    json!({
        "id": id,
        "first_name": "Test",
        "last_name": id,
        "email_addresses": [{"id": "idn_1", "email_address": format!("{}@example.com", id)}],
        "primary_email_address_id": "idn_1",
        "created_at": 1_700_000_000_000i64,
        "public_metadata": metadata
    })
}

async fn mount_user(server: &MockServer, id: &str, metadata: Value) {
    Mock::given(method("GET"))
        .and(path(format!("/users/{}", id)))
        .and(header("authorization", format!("Bearer {}", SECRET).as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_json(user(id, metadata)))
        .mount(server)
        .await;
}

fn identity(server: &MockServer) -> IdentityClient {
    IdentityClient::new(&server.uri(), SECRET, None).unwrap()
}

#[tokio::test]
async fn non_admin_is_forbidden() {
    let server = MockServer::start().await;
    mount_user(&server, "user_member", json!({"role": "member", "isApproved": true})).await;

    let admin = Admin::new(identity(&server), Some("user_member".to_string()));
    let err = admin.set_role("user_x", Role::Admin).await.unwrap_err();

    assert!(matches!(err, AdminError::Forbidden(ref id) if id == "user_member"));
    let patches = server
        .received_requests()
        .await
        .unwrap_or_default()
        .iter()
        .filter(|r| r.method.as_str() == "PATCH")
        .count();
    assert_eq!(patches, 0);
}

#[tokio::test]
async fn set_role_merges_role_into_metadata() {
    let server = MockServer::start().await;
    mount_user(&server, "user_admin", json!({"role": "admin"})).await;
    Mock::given(method("PATCH"))
        .and(path("/users/user_x/metadata"))
        .and(body_json(json!({"public_metadata": {"role": "prompt_admin"}})))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(user("user_x", json!({"role": "prompt_admin"}))),
        )
        .expect(1)
        .mount(&server)
        .await;

    let admin = Admin::new(identity(&server), Some("user_admin".to_string()));
    let updated = admin.set_role("user_x", Role::PromptAdmin).await.unwrap();

    assert_eq!(updated.public_metadata.role, Some(Role::PromptAdmin));
}

#[tokio::test]
async fn removing_own_role_is_reported() {
    let server = MockServer::start().await;
    mount_user(&server, "user_admin", json!({"role": "admin", "isApproved": true})).await;
    Mock::given(method("PATCH"))
        .and(path("/users/user_admin/metadata"))
        .and(body_json(json!({"public_metadata": {"role": null}})))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(user("user_admin", json!({"isApproved": true}))),
        )
        .mount(&server)
        .await;

    let admin = Admin::new(identity(&server), Some("user_admin".to_string()));
    let removal = admin.remove_role("user_admin").await.unwrap();

    assert!(removal.self_demotion);
    assert_eq!(removal.user.public_metadata.role, None);
}

#[tokio::test]
async fn approve_keeps_existing_metadata() {
    let server = MockServer::start().await;
    mount_user(&server, "user_admin", json!({"role": "admin"})).await;
    mount_user(&server, "user_new", json!({"role": "member", "isApproved": false, "team": "esg"})).await;
    Mock::given(method("PATCH"))
        .and(path("/users/user_new"))
        .and(body_json(json!({
            "public_metadata": {"role": "member", "isApproved": true, "team": "esg"}
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(user(
            "user_new",
            json!({"role": "member", "isApproved": true, "team": "esg"}),
        )))
        .expect(1)
        .mount(&server)
        .await;

    let admin = Admin::new(identity(&server), Some("user_admin".to_string()));
    let approved = admin.approve_user("user_new").await.unwrap();

    assert!(approved.public_metadata.is_approved());
    assert_eq!(approved.public_metadata.extra["team"], "esg");
}

#[tokio::test]
async fn search_without_query_lists_most_recent() {
    let server = MockServer::start().await;
    mount_user(&server, "user_admin", json!({"role": "admin"})).await;
    Mock::given(method("GET"))
        .and(path("/users"))
        .and(query_param("limit", "10"))
        .and(query_param("order_by", "-created_at"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            user("user_b", json!({})),
            user("user_a", json!({"role": "admin", "isApproved": true}))
        ])))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/users"))
        .and(query_param("query", "ada"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([user("user_ada", json!({}))])))
        .mount(&server)
        .await;

    let admin = Admin::new(identity(&server), Some("user_admin".to_string()));

    let recent = admin.search_users(None).await.unwrap();
    assert_eq!(recent.len(), 2);
    let summaries: Vec<UserSummary> = recent.iter().map(UserSummary::from).collect();
    assert_eq!(summaries[0].role, None);
    assert_eq!(summaries[1].role, Some(Role::Admin));
    assert!(summaries[1].is_approved);
    let blank = admin.search_users(Some("   ")).await.unwrap();
    assert_eq!(blank.len(), 2);

    let found = admin.search_users(Some("ada")).await.unwrap();
    assert_eq!(found[0].id, "user_ada");
}

#[tokio::test]
async fn list_users_maps_summaries() {
    let server = MockServer::start().await;
    mount_user(&server, "user_admin", json!({"role": "admin"})).await;
    Mock::given(method("GET"))
        .and(path("/users"))
        .and(query_param("limit", "100"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            user("user_a", json!({"isApproved": true})),
            user("user_b", json!({}))
        ])))
        .mount(&server)
        .await;

    let admin = Admin::new(identity(&server), Some("user_admin".to_string()));
    let users = admin.list_users().await.unwrap();

    assert_eq!(users.len(), 2);
    assert!(users[0].is_approved);
    assert!(!users[1].is_approved);
    assert_eq!(users[1].email_address, "user_b@example.com");
}

#[tokio::test]
async fn user_created_webhook_marks_account_pending() {
    let server = MockServer::start().await;
    Mock::given(method("PATCH"))
        .and(path("/users/user_new"))
        .and(body_json(json!({"public_metadata": {"isApproved": false}})))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(user("user_new", json!({"isApproved": false}))),
        )
        .expect(1)
        .mount(&server)
        .await;

    let event: WebhookEvent = serde_json::from_value(json!({
        "type": "user.created",
        "data": {"id": "user_new", "email_addresses": []}
    }))
    .unwrap();

    let outcome = handle_webhook(&identity(&server), &event).await.unwrap();
    assert_eq!(outcome, WebhookOutcome::MarkedPending("user_new".to_string()));
}

#[tokio::test]
async fn provider_errors_propagate() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/users/user_admin"))
        .respond_with(ResponseTemplate::new(401).set_body_string("invalid secret key"))
        .mount(&server)
        .await;

    let admin = Admin::new(identity(&server), Some("user_admin".to_string()));
    let err = admin.approve_user("user_x").await.unwrap_err();

    match err {
        AdminError::Request(request) => assert_eq!(request.status(), Some(401)),
        other => panic!("expected request error, got {:?}", other),
    }
}
