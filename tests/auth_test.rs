//! Integration tests for identity resolution and ownership checks.

mod common;

use std::net::SocketAddr;

use common::{auth_config, TestHarness};

#[tokio::test]
async fn requests_without_identity_are_rejected() {
    let (h, addr) = TestHarness::with_server_config(auth_config()).await;

    let resp = reqwest::get(format!("http://{addr}/files")).await.unwrap();
    assert_eq!(resp.status(), 401);
    let body: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(body["code"], "unauthorized");

    let resp = h
        .client
        .get(format!("http://{addr}/files"))
        .bearer_auth("wrong-token")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 401);

    let resp = h.upload_raw(addr, None, "a.txt", vec![1; 4], false).await;
    assert_eq!(resp.status(), 401);
    assert_eq!(h.ctx.catalog.list(1, 20).unwrap().total_items, 0);
}

#[tokio::test]
async fn health_needs_no_identity() {
    let (_h, addr) = TestHarness::with_server_config(auth_config()).await;
    let resp = reqwest::get(format!("http://{addr}/health")).await.unwrap();
    assert_eq!(resp.status(), 200);
    let body: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn uploader_comes_from_token() {
    let (h, addr) = TestHarness::with_server_config(auth_config()).await;
    let resp = h
        .upload_raw(addr, Some("ben-token"), "ben.txt", vec![1; 4], false)
        .await;
    assert_eq!(resp.status(), 201);
    let rec: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(rec["uploader"], "ben");
}

#[tokio::test]
async fn trusted_header_supplies_identity() {
    let mut config = auth_config();
    config.auth.trusted_header = Some("x-forwarded-user".into());
    let (h, addr) = TestHarness::with_server_config(config).await;

    let resp = h
        .client
        .get(format!("http://{addr}/files"))
        .header("x-forwarded-user", "dora")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
}

async fn upload_as(h: &TestHarness, addr: SocketAddr, token: &str, name: &str) -> (i64, String) {
    let resp = h.upload_raw(addr, Some(token), name, vec![9; 32], false).await;
    assert_eq!(resp.status(), 201);
    let rec: serde_json::Value = resp.json().await.unwrap();
    (
        rec["id"].as_i64().unwrap(),
        rec["storedName"].as_str().unwrap().to_string(),
    )
}

#[tokio::test]
async fn only_owner_or_admin_may_delete() {
    let (h, addr) = TestHarness::with_server_config(auth_config()).await;
    let (bens, bens_stored) = upload_as(&h, addr, "ben-token", "ben.txt").await;
    let (other, _) = upload_as(&h, addr, "ben-token", "other.txt").await;

    // Another regular user may not remove ben's file
    let resp = h
        .client
        .delete(format!("http://{addr}/files/{bens}"))
        .bearer_auth("cy-token")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 403);
    assert!(h.content_dir.path().join(&bens_stored).exists());

    // The owner may
    let resp = h
        .client
        .delete(format!("http://{addr}/files/{bens}"))
        .bearer_auth("ben-token")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let removed: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(removed["id"], bens);
    assert!(!h.content_dir.path().join(&bens_stored).exists());

    let resp = h
        .client
        .get(format!("http://{addr}/files/{bens}/meta"))
        .bearer_auth("ben-token")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 404);

    // So may an admin
    let resp = h
        .client
        .delete(format!("http://{addr}/files/{other}"))
        .bearer_auth("ana-token")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);

    // Deleting again is a 404
    let resp = h
        .client
        .delete(format!("http://{addr}/files/{other}"))
        .bearer_auth("ana-token")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 404);
    assert_eq!(h.ctx.catalog.list(1, 20).unwrap().total_items, 0);
}
