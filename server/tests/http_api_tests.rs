mod common;

use common::{machine, mint_body, spawn_open_server, spawn_server};
use licgrid_server::{AdminAuth, LicenseRecord};
use licgrid_types::{now_ms, ApiResponse, NodeInfo};
use serde_json::json;

async fn mint_code(server: &common::TestServer, expiry_ms: i64, max_machines: u32) -> String {
    let resp: ApiResponse<LicenseRecord> = reqwest::Client::new()
        .post(format!("{}/api/license/generate", server.base))
        .json(&mint_body("Acme Corp", expiry_ms, max_machines))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert!(resp.is_ok(), "mint failed: {}", resp.message);
    resp.data.unwrap().license_code
}

async fn register(
    server: &common::TestServer,
    code: &str,
    machine_id: &str,
) -> ApiResponse<String> {
    reqwest::Client::new()
        .post(format!("{}/api/node/register", server.base))
        .json(&json!({ "licenseCode": code, "machineInfo": machine(machine_id) }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap()
}

async fn heartbeat(server: &common::TestServer, node_id: &str) -> ApiResponse<bool> {
    reqwest::Client::new()
        .post(format!("{}/api/node/heartbeat", server.base))
        .json(&json!({ "nodeId": node_id }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap()
}

#[tokio::test]
async fn mint_then_register_up_to_the_cap() {
    let server = spawn_open_server().await;
    let code = mint_code(&server, now_ms() + 3_600_000, 2).await;

    assert!(register(&server, &code, "01").await.is_ok());
    assert!(register(&server, &code, "02").await.is_ok());

    let third = register(&server, &code, "03").await;
    assert_eq!(third.code, 403);
    assert!(third.message.contains("max 2"), "{}", third.message);
    assert!(third.message.contains("online 2"), "{}", third.message);

    assert_eq!(server.registry.online_count(&code).await, 2);
}

#[tokio::test]
async fn same_machine_gets_the_same_node_id_back() {
    let server = spawn_open_server().await;
    let code = mint_code(&server, now_ms() + 3_600_000, 1).await;

    let first = register(&server, &code, "01").await.data.unwrap();
    let second = register(&server, &code, "01").await.data.unwrap();
    assert_eq!(first, second);
    assert_eq!(server.registry.online_count(&code).await, 1);
}

#[tokio::test]
async fn heartbeat_of_unknown_node_is_404() {
    let server = spawn_open_server().await;
    let code = mint_code(&server, now_ms() + 3_600_000, 1).await;

    let node_id = register(&server, &code, "01").await.data.unwrap();
    assert_eq!(heartbeat(&server, &node_id).await.data, Some(true));

    let missing = heartbeat(&server, "0000deadbeef0000deadbeef0000dead").await;
    assert_eq!(missing.code, 404);
}

#[tokio::test]
async fn swept_node_gets_404_and_can_reregister() {
    let server = spawn_server(AdminAuth::new(None, true), 0).await;
    let code = mint_code(&server, now_ms() + 3_600_000, 1).await;

    let node_id = register(&server, &code, "01").await.data.unwrap();
    tokio::time::sleep(std::time::Duration::from_millis(50)).await;
    assert_eq!(server.registry.sweep().await, 1);

    assert_eq!(heartbeat(&server, &node_id).await.code, 404);

    let again = register(&server, &code, "01").await;
    assert!(again.is_ok());
}

#[tokio::test]
async fn unregister_always_succeeds() {
    let server = spawn_open_server().await;
    let code = mint_code(&server, now_ms() + 3_600_000, 1).await;
    let node_id = register(&server, &code, "01").await.data.unwrap();

    let client = reqwest::Client::new();
    for id in [node_id.as_str(), "never-registered"] {
        let resp: ApiResponse<String> = client
            .post(format!("{}/api/node/unregister", server.base))
            .json(&json!({ "nodeId": id }))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert!(resp.is_ok());
    }
    assert_eq!(server.registry.online_count(&code).await, 0);
}

#[tokio::test]
async fn expired_code_is_refused_at_register() {
    let server = spawn_open_server().await;
    let code = mint_code(&server, now_ms() - 1_000, 2).await;

    let resp = register(&server, &code, "01").await;
    assert_eq!(resp.code, 403);
    assert!(resp.message.contains("expired"), "{}", resp.message);
}

#[tokio::test]
async fn register_without_a_code_is_400() {
    let server = spawn_open_server().await;
    let resp: ApiResponse<String> = reqwest::Client::new()
        .post(format!("{}/api/node/register", server.base))
        .json(&json!({ "machineInfo": machine("01") }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(resp.code, 400);
}

#[tokio::test]
async fn mint_validates_the_payload() {
    let server = spawn_open_server().await;
    let client = reqwest::Client::new();

    for body in [
        json!({ "subject": "", "expiryTime": now_ms() + 1000, "maxMachineCount": 1 }),
        json!({ "subject": "Acme", "maxMachineCount": 1 }),
        json!({ "subject": "Acme", "expiryTime": now_ms() + 1000, "maxMachineCount": 0 }),
    ] {
        let resp: ApiResponse<LicenseRecord> = client
            .post(format!("{}/api/license/generate", server.base))
            .json(&body)
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(resp.code, 400, "body {body} should fail validation");
    }
}

#[tokio::test]
async fn minted_records_can_be_listed_and_deleted() {
    let server = spawn_open_server().await;
    mint_code(&server, now_ms() + 3_600_000, 1).await;

    let client = reqwest::Client::new();
    let listed: ApiResponse<Vec<LicenseRecord>> = client
        .get(format!("{}/api/license/list", server.base))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let records = listed.data.unwrap();
    assert_eq!(records.len(), 1);
    let id = records[0].id.clone();

    let deleted: ApiResponse<String> = client
        .delete(format!("{}/api/license/{id}", server.base))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert!(deleted.is_ok());

    let again: ApiResponse<String> = client
        .delete(format!("{}/api/license/{id}", server.base))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(again.code, 404);
}

#[tokio::test]
async fn public_key_endpoint_is_public() {
    let server = spawn_server(AdminAuth::new(Some("secret".to_string()), false), 300).await;

    let resp: ApiResponse<String> = reqwest::Client::new()
        .get(format!("{}/api/license/publicKey", server.base))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert!(resp.is_ok());
    assert!(resp.data.unwrap().starts_with("-----BEGIN PUBLIC KEY-----"));
}

#[tokio::test]
async fn admin_routes_require_the_bearer_token() {
    let server = spawn_server(AdminAuth::new(Some("secret".to_string()), false), 300).await;
    let client = reqwest::Client::new();

    let unauthorized = client
        .get(format!("{}/api/license/list", server.base))
        .send()
        .await
        .unwrap();
    assert_eq!(unauthorized.status(), 401);

    let wrong = client
        .get(format!("{}/api/license/list", server.base))
        .bearer_auth("wrong")
        .send()
        .await
        .unwrap();
    assert_eq!(wrong.status(), 401);

    let authorized = client
        .get(format!("{}/api/license/list", server.base))
        .bearer_auth("secret")
        .send()
        .await
        .unwrap();
    assert_eq!(authorized.status(), 200);
}

#[tokio::test]
async fn admin_surface_is_closed_when_no_token_is_configured() {
    let server = spawn_server(AdminAuth::new(None, false), 300).await;

    let resp = reqwest::Client::new()
        .get(format!("{}/api/node/stats", server.base))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 401);

    // Client-facing routes stay open.
    let public = reqwest::Client::new()
        .get(format!("{}/api/license/publicKey", server.base))
        .send()
        .await
        .unwrap();
    assert_eq!(public.status(), 200);
}

#[tokio::test]
async fn node_listings_and_stats_reflect_registrations() {
    let server = spawn_open_server().await;
    let code = mint_code(&server, now_ms() + 3_600_000, 3).await;

    register(&server, &code, "01").await;
    register(&server, &code, "02").await;

    let client = reqwest::Client::new();
    for path in ["/api/license/nodes", "/api/node/online"] {
        let listed: ApiResponse<Vec<NodeInfo>> = client
            .get(format!("{}{path}", server.base))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(listed.data.unwrap().len(), 2);
    }

    let stats: ApiResponse<serde_json::Value> = client
        .get(format!("{}/api/node/stats", server.base))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let stats = stats.data.unwrap();
    assert_eq!(stats["onlineNodeCount"], 2);
    assert_eq!(stats["registerCount"], 2);
    assert_eq!(stats["licenseCount"], 1);
}

#[tokio::test]
async fn tampered_code_is_rejected_with_403() {
    let server = spawn_open_server().await;
    let code = mint_code(&server, now_ms() + 3_600_000, 1).await;

    // Graft the signature onto a different payload half.
    let other = mint_code(&server, now_ms() + 7_200_000, 5).await;
    let forged = format!(
        "{}.{}",
        other.split_once('.').unwrap().0,
        code.split_once('.').unwrap().1
    );

    let resp = register(&server, &forged, "01").await;
    assert_eq!(resp.code, 403);
}
