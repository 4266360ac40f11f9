//! Integration tests for the Hetzner Cloud client
//!
//! Most tests run against a local wiremock server. The live test at the
//! bottom requires a real project: set HCLOUD_TOKEN to run it.

use hcloud_client::{ActionStatus, HcloudClient, HcloudError};
use std::time::Duration;
use wiremock::matchers::{bearer_token, body_json, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client_for(server: &MockServer) -> HcloudClient {
    HcloudClient::new(server.uri(), "test-token".to_string(), Duration::from_secs(5))
        .expect("Failed to create client")
}

fn server_json(id: u64, name: &str, ipv4: &str) -> serde_json::Value {
    serde_json::json!({
        "id": id,
        "name": name,
        "status": "running",
        "public_net": {
            "ipv4": { "id": id * 10, "ip": ipv4, "blocked": false, "dns_ptr": null },
            "ipv6": null,
            "floating_ips": []
        },
        "private_net": [],
        "labels": {}
    })
}

fn pagination(page: u64, next_page: Option<u64>) -> serde_json::Value {
    let previous_page = page.checked_sub(1).filter(|p| *p > 0);
    serde_json::json!({
        "pagination": {
            "page": page,
            "per_page": 50,
            "previous_page": previous_page,
            "next_page": next_page,
            "last_page": 2,
            "total_entries": 2
        }
    })
}

#[tokio::test]
async fn test_list_servers_follows_pagination() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/servers"))
        .and(query_param("page", "1"))
        .and(bearer_token("test-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "servers": [server_json(3, "srv-3", "10.0.0.3")],
            "meta": pagination(1, Some(2)),
        })))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/servers"))
        .and(query_param("page", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "servers": [server_json(7, "srv-7", "10.0.0.5")],
            "meta": pagination(2, None),
        })))
        .expect(1)
        .mount(&server)
        .await;

    let servers = client_for(&server).list_servers(None).await.expect("list succeeds");

    let names: Vec<&str> = servers.iter().map(|s| s.name.as_str()).collect();
    assert_eq!(names, vec!["srv-3", "srv-7"]);
}

#[tokio::test]
async fn test_list_servers_passes_label_selector() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/servers"))
        .and(query_param("label_selector", "k8s-node=true"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "servers": [server_json(7, "srv-7", "10.0.0.5")],
            "meta": pagination(1, None),
        })))
        .expect(1)
        .mount(&server)
        .await;

    let servers = client_for(&server)
        .list_servers(Some("k8s-node=true"))
        .await
        .expect("list succeeds");
    assert_eq!(servers.len(), 1);
}

#[tokio::test]
async fn test_list_floating_ips() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/floating_ips"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "floating_ips": [{
                "id": 4711,
                "name": "ingress",
                "description": "ingress vip",
                "ip": "203.0.113.9",
                "type": "ipv4",
                "server": 3,
                "blocked": false,
                "home_location": { "id": 1, "name": "fsn1", "network_zone": "eu-central" },
                "labels": {}
            }],
            "meta": pagination(1, None),
        })))
        .mount(&server)
        .await;

    let fips = client_for(&server).list_floating_ips().await.expect("list succeeds");

    assert_eq!(fips.len(), 1);
    assert_eq!(fips[0].server, Some(3));
    assert_eq!(fips[0].address(), "203.0.113.9".parse().ok());
}

#[tokio::test]
async fn test_assign_floating_ip_posts_server_id() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/floating_ips/4711/actions/assign"))
        .and(body_json(serde_json::json!({ "server": 7 })))
        .respond_with(ResponseTemplate::new(201).set_body_json(serde_json::json!({
            "action": {
                "id": 13,
                "command": "assign_floating_ip",
                "status": "running",
                "progress": 0,
                "started": "2024-01-30T23:55:00+00:00",
                "finished": null,
                "resources": [{ "id": 4711, "type": "floating_ip" }, { "id": 7, "type": "server" }],
                "error": null
            }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let action = client_for(&server).assign_floating_ip(4711, 7).await.expect("assign succeeds");

    assert_eq!(action.id, 13);
    assert_eq!(action.status, ActionStatus::Running);
}

#[tokio::test]
async fn test_assign_action_in_error_state_is_an_error() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/floating_ips/4711/actions/assign"))
        .respond_with(ResponseTemplate::new(201).set_body_json(serde_json::json!({
            "action": {
                "id": 14,
                "command": "assign_floating_ip",
                "status": "error",
                "progress": 100,
                "resources": [],
                "error": { "code": "action_failed", "message": "Action failed" }
            }
        })))
        .mount(&server)
        .await;

    let result = client_for(&server).assign_floating_ip(4711, 7).await;

    match result {
        Err(HcloudError::Api { code, .. }) => assert_eq!(code, "action_failed"),
        other => panic!("expected Api error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_unauthorized_maps_to_authentication_error() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/floating_ips"))
        .respond_with(ResponseTemplate::new(401).set_body_json(serde_json::json!({
            "error": { "code": "unauthorized", "message": "unable to authenticate" }
        })))
        .mount(&server)
        .await;

    let result = client_for(&server).validate_token().await;

    assert!(matches!(result, Err(HcloudError::Authentication(_))), "got {:?}", result);
}

#[tokio::test]
async fn test_missing_floating_ip_maps_to_not_found() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/floating_ips/99"))
        .respond_with(ResponseTemplate::new(404).set_body_json(serde_json::json!({
            "error": { "code": "not_found", "message": "floating_ip with ID '99' not found" }
        })))
        .mount(&server)
        .await;

    let result = client_for(&server).get_floating_ip(99).await;

    assert!(matches!(result, Err(HcloudError::NotFound(_))), "got {:?}", result);
}

#[tokio::test]
async fn test_rate_limit_error_envelope_is_decoded() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/servers"))
        .respond_with(ResponseTemplate::new(429).set_body_json(serde_json::json!({
            "error": { "code": "rate_limit_exceeded", "message": "limit of 3600 requests per hour reached" }
        })))
        .mount(&server)
        .await;

    let err = client_for(&server).list_servers(None).await.expect_err("429 must fail");

    assert!(err.is_transient());
    match err {
        HcloudError::Api { code, .. } => assert_eq!(code, "rate_limit_exceeded"),
        other => panic!("expected Api error, got {:?}", other),
    }
}

#[tokio::test]
#[ignore] // Requires a Hetzner Cloud project
async fn test_live_list_floating_ips() {
    let token = std::env::var("HCLOUD_TOKEN")
        .expect("HCLOUD_TOKEN environment variable must be set");

    let client = HcloudClient::new(
        hcloud_client::DEFAULT_ENDPOINT.to_string(),
        token,
        Duration::from_secs(30),
    )
    .expect("Failed to create client");

    client.validate_token().await.expect("token is valid");
    let fips = client.list_floating_ips().await.expect("Failed to list floating IPs");

    println!("Found {} floating IPs", fips.len());
}
