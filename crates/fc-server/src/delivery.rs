//! Range-request delivery engine.
//!
//! Each request walks `RECEIVED -> VALIDATED -> FULL | PARTIAL` here; the
//! terminal `COMPLETE` or `ABORTED` state is reported by the
//! [`TrackedReader`](crate::store::TrackedReader) when the response body is
//! dropped.
//!
//! The body is a `ReaderStream` over a bounded file reader. hyper only polls
//! it when the connection can take more bytes, so a slow client holds at
//! most one chunk in memory, and a disconnect drops the stream together with
//! its file handle.

use axum::body::Body;
use axum::http::{header, HeaderValue, StatusCode};
use axum::response::Response;
use fc_core::{Error, FileId, Result};
use fc_db::{Catalog, FileRecord};
use std::path::Path;
use tokio_util::io::ReaderStream;

use crate::range::{resolve_range, ByteRange};
use crate::store::ArtifactStore;

/// What a validated request will be answered with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryPlan {
    Full { size: u64 },
    Partial { size: u64, range: ByteRange },
}

impl DeliveryPlan {
    fn state(&self) -> &'static str {
        match self {
            DeliveryPlan::Full { .. } => "FULL_DELIVERY",
            DeliveryPlan::Partial { .. } => "PARTIAL_DELIVERY",
        }
    }

    fn offset_and_len(&self) -> (u64, u64) {
        match self {
            DeliveryPlan::Full { size } => (0, *size),
            DeliveryPlan::Partial { range, .. } => (range.start, range.len()),
        }
    }
}

/// Serves artifact bytes for catalog records.
#[derive(Clone)]
pub struct DeliveryEngine {
    catalog: Catalog,
    store: ArtifactStore,
    chunk_size: usize,
}

impl DeliveryEngine {
    pub fn new(catalog: Catalog, store: ArtifactStore, chunk_size: usize) -> Self {
        Self {
            catalog,
            store,
            chunk_size,
        }
    }

    /// Resolve the record and artifact and decide how to answer.
    ///
    /// Nothing is opened here, so every error is side-effect free.
    pub async fn plan(&self, id: FileId, range: Option<&str>) -> Result<(FileRecord, DeliveryPlan)> {
        tracing::debug!(file_id = %id, range = ?range, state = "RECEIVED", "Delivery requested");

        let record = self
            .catalog
            .get_by_id(id)?
            .ok_or_else(|| Error::not_found("file", id))?;

        let size = self
            .store
            .stat(Path::new(&record.storage_path))
            .await
            .map_err(|e| {
                tracing::debug!(file_id = %id, path = %record.storage_path, "Artifact stat failed: {e}");
                Error::artifact_missing(id, &record.storage_path)
            })?;

        if size != record.size_bytes {
            tracing::error!(
                file_id = %id,
                recorded = record.size_bytes,
                actual = size,
                "Artifact size differs from catalog record"
            );
        }

        let plan = match range {
            Some(value) if record.is_streamable => DeliveryPlan::Partial {
                size,
                range: resolve_range(value, size)?,
            },
            _ => DeliveryPlan::Full { size },
        };

        tracing::debug!(file_id = %id, state = "VALIDATED", plan = plan.state(), "Delivery validated");
        Ok((record, plan))
    }

    /// Answer a `GET /files/{id}` request.
    pub async fn deliver(&self, id: FileId, range: Option<&str>) -> Result<Response> {
        let (record, plan) = self.plan(id, range).await?;
        let (offset, len) = plan.offset_and_len();

        let reader = self
            .store
            .open_range(id, Path::new(&record.storage_path), offset, len)
            .await
            .map_err(|e| match e.kind() {
                std::io::ErrorKind::NotFound => Error::artifact_missing(id, &record.storage_path),
                _ => Error::from(e),
            })?;

        tracing::debug!(file_id = %id, state = plan.state(), offset, bytes = len, "Streaming artifact");

        let body = Body::from_stream(ReaderStream::with_capacity(reader, self.chunk_size));
        build_response(&record, &plan, body)
    }
}

fn build_response(record: &FileRecord, plan: &DeliveryPlan, body: Body) -> Result<Response> {
    let accept_ranges = if record.is_streamable { "bytes" } else { "none" };
    let disposition = if record.is_streamable {
        content_disposition("inline", &record.original_name)
    } else {
        content_disposition("attachment", &record.original_name)
    };

    let mut builder = Response::builder()
        .header(header::CONTENT_TYPE, header_value(&record.mime_type)?)
        .header(header::ACCEPT_RANGES, accept_ranges)
        .header(header::CONTENT_DISPOSITION, header_value(&disposition)?);

    builder = match plan {
        DeliveryPlan::Full { size } => builder
            .status(StatusCode::OK)
            .header(header::CONTENT_LENGTH, *size),
        DeliveryPlan::Partial { size, range } => builder
            .status(StatusCode::PARTIAL_CONTENT)
            .header(header::CONTENT_LENGTH, range.len())
            .header(header::CONTENT_RANGE, range.content_range(*size)),
    };

    builder
        .body(body)
        .map_err(|e| Error::Internal(format!("failed to build response: {e}")))
}

fn header_value(value: &str) -> Result<HeaderValue> {
    HeaderValue::from_str(value)
        .map_err(|e| Error::Internal(format!("invalid header value {value:?}: {e}")))
}

/// `Content-Disposition` value with an ASCII fallback and an RFC 5987
/// `filename*` carrying the exact original name.
pub fn content_disposition(kind: &str, file_name: &str) -> String {
    let fallback: String = file_name
        .chars()
        .map(|c| {
            if (c.is_ascii_graphic() && c != '"' && c != '\\') || c == ' ' {
                c
            } else {
                '_'
            }
        })
        .collect();
    format!(
        "{kind}; filename=\"{fallback}\"; filename*=UTF-8''{}",
        urlencoding::encode(file_name)
    )
}
