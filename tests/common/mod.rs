//! Shared test harness for integration tests.
//!
//! Provides [`TestHarness`] which creates an in-memory catalog, a temporary
//! content root and a full [`AppContext`]. The `with_server*` constructors
//! start Axum on a random port for HTTP-level testing.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::time::Duration;

use fc_core::config::{ApiToken, Config};
use fc_db::{Catalog, NewFileRecord};
use fc_server::context::AppContext;
use fc_server::router::build_router;
use fc_server::store::ArtifactStore;
use reqwest::multipart::{Form, Part};

/// Test harness wrapping a fully-constructed [`AppContext`] backed by an
/// in-memory catalog and a temporary content root.
pub struct TestHarness {
    pub ctx: AppContext,
    pub content_dir: tempfile::TempDir,
    pub client: reqwest::Client,
}

impl TestHarness {
    /// Create a new harness with default configuration.
    pub fn new() -> Self {
        Self::with_config(Config::default())
    }

    /// Create a new harness with a custom configuration.
    pub fn with_config(config: Config) -> Self {
        let content_dir = tempfile::tempdir().expect("failed to create content dir");
        let catalog = Catalog::in_memory().expect("failed to create in-memory catalog");
        let store = ArtifactStore::new(content_dir.path());
        let ctx = AppContext::new(catalog, store, config);

        Self {
            ctx,
            content_dir,
            client: reqwest::Client::new(),
        }
    }

    /// Start an Axum server on a random port and return the harness together
    /// with the bound socket address.
    pub async fn with_server() -> (Self, SocketAddr) {
        Self::with_server_config(Config::default()).await
    }

    /// Start an Axum server with custom config on a random port.
    pub async fn with_server_config(config: Config) -> (Self, SocketAddr) {
        let harness = Self::with_config(config);
        let app = build_router(harness.ctx.clone(), None);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind random port");
        let addr = listener.local_addr().expect("failed to get local addr");

        tokio::spawn(async move {
            axum::serve(listener, app).await.ok();
        });

        (harness, addr)
    }

    /// Upload `data` as `name` and return the raw response.
    pub async fn upload_raw(
        &self,
        addr: SocketAddr,
        token: Option<&str>,
        name: &str,
        data: Vec<u8>,
        streamable: bool,
    ) -> reqwest::Response {
        let part = Part::bytes(data).file_name(name.to_string());
        let form = Form::new()
            .text("isStreamable", streamable.to_string())
            .part("file", part);

        let mut request = self
            .client
            .post(format!("http://{addr}/upload"))
            .multipart(form);
        if let Some(token) = token {
            request = request.bearer_auth(token);
        }
        request.send().await.expect("upload request failed")
    }

    /// Upload `data` and return the created record as JSON.
    pub async fn upload(
        &self,
        addr: SocketAddr,
        name: &str,
        data: Vec<u8>,
        streamable: bool,
    ) -> serde_json::Value {
        let resp = self.upload_raw(addr, None, name, data, streamable).await;
        assert_eq!(resp.status(), 201, "upload of {name} was rejected");
        resp.json().await.expect("upload response was not JSON")
    }

    /// Place `data` in the content root and catalog it directly, skipping
    /// the HTTP upload path. Returns the new file id.
    pub fn insert_artifact(&self, stored_name: &str, data: &[u8], streamable: bool) -> i64 {
        let path = self.content_dir.path().join(stored_name);
        std::fs::write(&path, data).expect("failed to write artifact");
        let rec = self
            .ctx
            .catalog
            .create(&NewFileRecord {
                stored_name: stored_name.to_string(),
                original_name: stored_name.to_string(),
                title: None,
                uploader: "anonymous".into(),
                storage_path: path.to_string_lossy().into_owned(),
                is_streamable: streamable,
                size_bytes: data.len() as u64,
                mime_type: "application/octet-stream".into(),
            })
            .expect("failed to catalog artifact");
        rec.id.get()
    }

    /// Poll until exactly `target` artifact handles are open, or give up
    /// after `limit`. Returns the last observed count.
    pub async fn wait_for_open_handles(&self, target: usize, limit: Duration) -> usize {
        let deadline = tokio::time::Instant::now() + limit;
        loop {
            let open = self.ctx.store.open_handles();
            if open == target || tokio::time::Instant::now() >= deadline {
                return open;
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
    }

    /// Poll until no artifact handles are open, or give up after `limit`.
    pub async fn wait_for_handles_closed(&self, limit: Duration) -> usize {
        self.wait_for_open_handles(0, limit).await
    }
}

/// Config with auth enabled for `ana` (admin), `ben` and `cy`.
pub fn auth_config() -> Config {
    let mut config = Config::default();
    config.auth.enabled = true;
    config.auth.tokens = vec![
        ApiToken {
            token: "ana-token".into(),
            username: "ana".into(),
            is_admin: true,
        },
        ApiToken {
            token: "ben-token".into(),
            username: "ben".into(),
            is_admin: false,
        },
        ApiToken {
            token: "cy-token".into(),
            username: "cy".into(),
            is_admin: false,
        },
    ];
    config
}

/// Deterministic, non-repeating-per-block test payload.
pub fn patterned_bytes(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i % 251) as u8).collect()
}
