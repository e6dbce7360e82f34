//! Integration tests for the SSE event stream.

mod common;

use std::time::Duration;

use common::TestHarness;
use futures::StreamExt;

#[tokio::test]
async fn late_subscriber_sees_replayed_upload_events() {
    let (h, addr) = TestHarness::with_server().await;
    h.upload(addr, "hello.txt", b"hello world".to_vec(), false).await;

    let resp = reqwest::get(format!("http://{addr}/events")).await.unwrap();
    assert_eq!(resp.status(), 200);
    assert!(resp.headers()["content-type"]
        .to_str()
        .unwrap()
        .starts_with("text/event-stream"));

    let mut stream = resp.bytes_stream();
    let mut text = String::new();
    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    while !text.contains("upload_completed") {
        let chunk = tokio::time::timeout_at(deadline, stream.next())
            .await
            .expect("no completion event replayed")
            .unwrap()
            .unwrap();
        text.push_str(&String::from_utf8_lossy(&chunk));
    }

    assert!(text.contains("upload_started"));
    assert!(text.contains("hello.txt"));
}

#[tokio::test]
async fn delete_is_broadcast() {
    let (h, addr) = TestHarness::with_server().await;
    let rec = h.upload(addr, "bye.txt", vec![1; 16], false).await;
    let id = rec["id"].as_i64().unwrap();
    let mut rx = h.ctx.event_bus.subscribe();

    let resp = h
        .client
        .delete(format!("http://{addr}/files/{id}"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);

    loop {
        let event = tokio::time::timeout(Duration::from_secs(5), rx.recv())
            .await
            .expect("timed out waiting for delete event")
            .unwrap();
        if let fc_core::events::EventPayload::FileDeleted { file_id, deleted_by } = event.payload {
            assert_eq!(file_id.get(), id);
            assert_eq!(deleted_by, "anonymous");
            break;
        }
    }
}
