//! Multipart upload handler.
//!
//! Form fields: `file` (required, binary), `title` (optional) and
//! `isStreamable` (optional boolean-ish, default false). Fields may arrive in
//! any order; the file part is streamed to a part file as soon as it is seen
//! and committed only after the whole form has been read.

use std::sync::Arc;
use std::time::Duration;

use axum::extract::multipart::{Field, MultipartError};
use axum::extract::{Multipart, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::{Extension, Json};
use fc_core::events::{EventBus, EventPayload};
use fc_core::{Error, Identity, UploadId};
use fc_db::FileRecord;
use futures::TryStreamExt;
use tokio::sync::watch;

use crate::context::AppContext;
use crate::error::{tagged, AppError};
use crate::ingest::{parse_flag, sanitize_file_name, CommitRequest, PendingArtifact};
use crate::middleware::request_id::RequestId;
use crate::routes::files::FileResponse;

/// Minimum spacing between progress events for one upload.
const PROGRESS_INTERVAL: Duration = Duration::from_millis(250);

/// Multipart form accepted by `POST /upload`.
#[derive(serde::Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
#[allow(dead_code)]
pub struct UploadForm {
    #[schema(value_type = String, format = Binary)]
    file: Vec<u8>,
    title: Option<String>,
    is_streamable: Option<bool>,
}

/// POST /upload
#[utoipa::path(
    post,
    path = "/upload",
    request_body(content = UploadForm, content_type = "multipart/form-data"),
    responses(
        (status = 201, description = "File stored", body = FileResponse),
        (status = 400, description = "Missing file part or malformed field"),
        (status = 401, description = "No caller identity"),
        (status = 408, description = "Upload went idle"),
        (status = 413, description = "Upload or storage limit exceeded"),
        (status = 500, description = "Storage failure")
    )
)]
pub async fn upload_file(
    State(ctx): State<AppContext>,
    Extension(identity): Extension<Identity>,
    Extension(request_id): Extension<RequestId>,
    headers: HeaderMap,
    multipart: Multipart,
) -> Result<impl IntoResponse, AppError> {
    let upload_id = UploadId::new();
    let declared_bytes = headers
        .get(header::CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<u64>().ok());

    match receive_upload(&ctx, &identity, upload_id, declared_bytes, multipart).await {
        Ok(record) => {
            ctx.event_bus.broadcast(EventPayload::UploadCompleted {
                upload_id,
                file_id: record.id,
                size_bytes: record.size_bytes,
            });
            Ok((StatusCode::CREATED, Json(FileResponse::from_record(&record))))
        }
        Err(e) => {
            tracing::warn!(%upload_id, uploader = %identity.username, "Upload failed: {e}");
            ctx.event_bus.broadcast(EventPayload::UploadFailed {
                upload_id,
                error: e.to_string(),
            });
            Err(tagged(&request_id)(e))
        }
    }
}

async fn receive_upload(
    ctx: &AppContext,
    identity: &Identity,
    upload_id: UploadId,
    declared_bytes: Option<u64>,
    mut multipart: Multipart,
) -> fc_core::Result<FileRecord> {
    let ingestor = ctx.ingestor();
    let idle = ingestor.idle_timeout();

    let mut pending: Option<PendingArtifact> = None;
    let mut title: Option<String> = None;
    let mut streamable: Option<String> = None;

    while let Some(field) = next_field(&mut multipart, idle).await? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "file" => {
                if pending.is_some() {
                    return Err(Error::Validation("only one file part is allowed".into()));
                }
                let original_name = field
                    .file_name()
                    .and_then(sanitize_file_name)
                    .ok_or_else(|| Error::Validation("file part has no file name".into()))?;
                let declared_type = field.content_type().map(str::to_owned);

                ctx.event_bus.broadcast(EventPayload::UploadStarted {
                    upload_id,
                    uploader: identity.username.clone(),
                    original_name: original_name.clone(),
                    declared_bytes,
                });

                let (tx, rx) = watch::channel(0u64);
                tokio::spawn(forward_progress(
                    Arc::clone(&ctx.event_bus),
                    upload_id,
                    declared_bytes,
                    rx,
                ));

                let body = field.map_err(multipart_error);
                let received = ingestor
                    .receive(&original_name, declared_type.as_deref(), body, &tx)
                    .await?;
                pending = Some(received);
            }
            "title" => title = Some(read_text(field, idle).await?),
            "isStreamable" | "is_streamable" => streamable = Some(read_text(field, idle).await?),
            other => tracing::debug!(field = other, "Ignoring unknown form field"),
        }
    }

    let pending = pending.ok_or_else(|| Error::Validation("missing file part".into()))?;
    let is_streamable = match streamable {
        Some(raw) => parse_flag(&raw)?,
        None => false,
    };
    let title = title
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty());

    ingestor.commit(
        pending,
        CommitRequest {
            title,
            is_streamable,
            uploader: identity.username.clone(),
        },
    )
}

async fn next_field(multipart: &mut Multipart, idle: Duration) -> fc_core::Result<Option<Field<'_>>> {
    tokio::time::timeout(idle, multipart.next_field())
        .await
        .map_err(|_| idle_error(idle))?
        .map_err(multipart_error)
}

async fn read_text(field: Field<'_>, idle: Duration) -> fc_core::Result<String> {
    tokio::time::timeout(idle, field.text())
        .await
        .map_err(|_| idle_error(idle))?
        .map_err(multipart_error)
}

fn idle_error(idle: Duration) -> Error {
    Error::Timeout(format!("no upload data received for {}s", idle.as_secs()))
}

fn multipart_error(e: MultipartError) -> Error {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        Error::PayloadTooLarge(e.body_text())
    } else {
        Error::Validation(format!("malformed multipart body: {}", e.body_text()))
    }
}

/// Relay bytes-written updates to the event bus until the sender is dropped.
async fn forward_progress(
    bus: Arc<EventBus>,
    upload_id: UploadId,
    declared_bytes: Option<u64>,
    mut rx: watch::Receiver<u64>,
) {
    while rx.changed().await.is_ok() {
        let bytes_written = *rx.borrow_and_update();
        bus.broadcast(EventPayload::UploadProgress {
            upload_id,
            bytes_written,
            declared_bytes,
        });
        tokio::time::sleep(PROGRESS_INTERVAL).await;
    }
}
