//! Upload progress coordination.
//!
//! An [`UploadCoordinator`] stands for one client session. It allows a single
//! upload in flight at a time, rejecting (not queueing) a second attempt, and
//! publishes progress on a `watch` channel as the file is handed to the
//! transport. Callers about to leave the session ask
//! [`UploadCoordinator::confirm_navigation`] first.

use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use futures::TryStreamExt;
use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use tokio::sync::watch;
use tokio_util::io::ReaderStream;

use crate::error::{ClientError, Result};

/// Prompt shown when the user tries to leave while an upload is running.
pub const NAVIGATION_PROMPT: &str = "Upload in progress, are you sure?";

/// Byte-level progress of the current upload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct UploadProgress {
    pub bytes_sent: u64,
    pub total_bytes: u64,
    /// 0 to 100, rounded down. Only [`UploadProgress::complete`] reports 100.
    pub percent: u8,
}

impl UploadProgress {
    pub fn new(bytes_sent: u64, total_bytes: u64) -> Self {
        let percent = if total_bytes == 0 {
            0
        } else {
            ((bytes_sent as f64 / total_bytes as f64) * 100.0)
                .floor()
                .min(99.0) as u8
        };
        Self {
            bytes_sent,
            total_bytes,
            percent,
        }
    }

    /// Progress after the server has accepted the upload.
    pub fn complete(total_bytes: u64) -> Self {
        Self {
            bytes_sent: total_bytes,
            total_bytes,
            percent: 100,
        }
    }
}

/// Optional form fields sent with an upload.
#[derive(Debug, Clone, Default)]
pub struct UploadOptions {
    pub title: Option<String>,
    pub is_streamable: bool,
    /// Declared content type of the file part.
    pub mime_type: Option<String>,
}

/// What the session should do when asked to navigate away.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavigationDecision {
    Proceed,
    /// Ask the user first, showing this prompt.
    Confirm(&'static str),
}

/// The record the server created for an upload.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct UploadedFile {
    pub id: i64,
    pub original_name: String,
    #[serde(default)]
    pub title: Option<String>,
    pub size_bytes: u64,
    pub is_streamable: bool,
    pub created_at: String,
    #[serde(default)]
    pub mime_type: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: String,
    code: Option<String>,
}

/// Coordinates uploads for one client session.
pub struct UploadCoordinator {
    http: reqwest::Client,
    base_url: String,
    token: Option<String>,
    in_flight: Arc<AtomicBool>,
    progress: Arc<watch::Sender<UploadProgress>>,
}

impl UploadCoordinator {
    pub fn new(base_url: impl Into<String>) -> Self {
        let (tx, _rx) = watch::channel(UploadProgress::default());
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: None,
            in_flight: Arc::new(AtomicBool::new(false)),
            progress: Arc::new(tx),
        }
    }

    /// Send `Authorization: Bearer <token>` with every request.
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    /// Subscribe to progress updates.
    pub fn progress(&self) -> watch::Receiver<UploadProgress> {
        self.progress.subscribe()
    }

    pub fn is_upload_in_progress(&self) -> bool {
        self.in_flight.load(Ordering::SeqCst)
    }

    /// Check before closing or leaving the session.
    pub fn confirm_navigation(&self) -> NavigationDecision {
        if self.is_upload_in_progress() {
            NavigationDecision::Confirm(NAVIGATION_PROMPT)
        } else {
            NavigationDecision::Proceed
        }
    }

    fn try_begin(&self) -> Result<UploadSlot> {
        self.in_flight
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .map_err(|_| ClientError::UploadInProgress)?;
        Ok(UploadSlot {
            flag: Arc::clone(&self.in_flight),
        })
    }

    /// Upload the file at `path` as a single multipart request.
    ///
    /// Fails immediately with [`ClientError::UploadInProgress`] if another
    /// upload from this coordinator is still running.
    pub async fn upload(&self, path: &Path, options: UploadOptions) -> Result<UploadedFile> {
        let _slot = self.try_begin()?;

        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .map(str::to_owned)
            .ok_or_else(|| ClientError::InvalidPath(path.display().to_string()))?;

        let file = tokio::fs::File::open(path).await?;
        let total = file.metadata().await?.len();
        self.progress.send_replace(UploadProgress::new(0, total));
        tracing::debug!(file = %file_name, bytes = total, "Starting upload");

        let progress = Arc::clone(&self.progress);
        let mut sent: u64 = 0;
        let counted = ReaderStream::new(file).map_ok(move |chunk| {
            sent += chunk.len() as u64;
            progress.send_replace(UploadProgress::new(sent, total));
            chunk
        });

        let mut part = Part::stream_with_length(reqwest::Body::wrap_stream(counted), total)
            .file_name(file_name);
        if let Some(mime) = options.mime_type.as_deref() {
            part = part.mime_str(mime)?;
        }

        let mut form = Form::new()
            .text("isStreamable", options.is_streamable.to_string())
            .part("file", part);
        if let Some(title) = options.title {
            form = form.text("title", title);
        }

        let mut request = self
            .http
            .post(format!("{}/upload", self.base_url))
            .multipart(form);
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            let (message, code) = match serde_json::from_str::<ErrorBody>(&text) {
                Ok(body) => (body.error, body.code),
                Err(_) => (text, None),
            };
            return Err(ClientError::Server {
                status: status.as_u16(),
                code,
                message,
            });
        }

        let uploaded: UploadedFile = response.json().await?;
        self.progress.send_replace(UploadProgress::complete(total));
        tracing::debug!(file_id = uploaded.id, "Upload finished");
        Ok(uploaded)
    }
}

/// Marks the coordinator busy until dropped.
struct UploadSlot {
    flag: Arc<AtomicBool>,
}

impl Drop for UploadSlot {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::SeqCst);
    }
}
