//! Upload ingestion.
//!
//! An upload goes through two steps:
//!
//! 1. [`Ingestor::receive`] streams the incoming bytes into
//!    `<content_root>/<stored>.part`, enforcing the idle timeout and size
//!    limits, and publishes a bytes-written counter on a `watch` channel.
//! 2. [`Ingestor::commit`] renames the part file to its final name and only
//!    then inserts the catalog record.
//!
//! The part file is owned by a guard that removes it on drop, so a failed,
//! rejected or cancelled upload never leaves bytes behind. If the catalog
//! insert fails after the rename, the committed artifact is removed before
//! the error is returned.

use std::path::{Path, PathBuf};
use std::time::Duration;

use bytes::Bytes;
use fc_core::config::UploadConfig;
use fc_core::{content_type, Error, Result};
use fc_db::{Catalog, FileRecord, NewFileRecord};
use futures::{Stream, StreamExt};
use tokio::io::AsyncWriteExt;
use tokio::sync::watch;
use uuid::Uuid;

use crate::store::ArtifactStore;

/// Writes uploads to the artifact store and records them in the catalog.
#[derive(Clone)]
pub struct Ingestor {
    catalog: Catalog,
    store: ArtifactStore,
    idle_timeout: Duration,
    max_upload_bytes: u64,
    max_storage_bytes: Option<u64>,
}

/// Attributes of an upload that are only known once the whole form is read.
#[derive(Debug, Clone)]
pub struct CommitRequest {
    pub title: Option<String>,
    pub is_streamable: bool,
    pub uploader: String,
}

/// A fully received artifact that has not been committed yet.
pub struct PendingArtifact {
    part: PartFile,
    stored_name: String,
    original_name: String,
    mime_type: String,
    size_bytes: u64,
}

impl Ingestor {
    pub fn new(catalog: Catalog, store: ArtifactStore, config: &UploadConfig) -> Self {
        Self {
            catalog,
            store,
            idle_timeout: Duration::from_secs(config.idle_timeout_secs),
            max_upload_bytes: config.max_upload_bytes,
            max_storage_bytes: config.max_storage_bytes,
        }
    }

    pub fn idle_timeout(&self) -> Duration {
        self.idle_timeout
    }

    /// Stream `body` into a new part file.
    ///
    /// `progress` receives the running byte count after every chunk.
    pub async fn receive<S>(
        &self,
        original_name: &str,
        declared_type: Option<&str>,
        body: S,
        progress: &watch::Sender<u64>,
    ) -> Result<PendingArtifact>
    where
        S: Stream<Item = Result<Bytes>>,
    {
        let stored_name = stored_name_for(original_name);
        let mime_type = content_type::resolve(declared_type, original_name);
        let already_stored = match self.max_storage_bytes {
            Some(_) => self.catalog.total_bytes()?,
            None => 0,
        };

        let part = PartFile::create(self.store.part_path_for(&stored_name)).await?;
        let size_bytes = self.write_body(&part, body, already_stored, progress).await?;

        tracing::debug!(
            stored_name = %stored_name,
            bytes = size_bytes,
            mime_type = %mime_type,
            "Upload received"
        );

        Ok(PendingArtifact {
            part,
            stored_name,
            original_name: original_name.to_string(),
            mime_type,
            size_bytes,
        })
    }

    async fn write_body<S>(
        &self,
        part: &PartFile,
        body: S,
        already_stored: u64,
        progress: &watch::Sender<u64>,
    ) -> Result<u64>
    where
        S: Stream<Item = Result<Bytes>>,
    {
        let mut body = std::pin::pin!(body);
        let mut file = tokio::fs::OpenOptions::new()
            .write(true)
            .open(part.path())
            .await?;
        let mut written: u64 = 0;

        loop {
            let next = tokio::time::timeout(self.idle_timeout, body.next())
                .await
                .map_err(|_| {
                    Error::Timeout(format!(
                        "no upload data received for {}s",
                        self.idle_timeout.as_secs()
                    ))
                })?;

            let Some(chunk) = next else {
                break;
            };
            let chunk = chunk?;

            written += chunk.len() as u64;
            if written > self.max_upload_bytes {
                return Err(Error::PayloadTooLarge(format!(
                    "upload exceeds the {} byte limit",
                    self.max_upload_bytes
                )));
            }
            if let Some(quota) = self.max_storage_bytes {
                if already_stored.saturating_add(written) > quota {
                    return Err(Error::PayloadTooLarge(format!(
                        "storage quota of {quota} bytes exceeded"
                    )));
                }
            }

            file.write_all(&chunk).await?;
            progress.send_replace(written);
        }

        file.flush().await?;
        file.sync_all().await?;
        Ok(written)
    }

    /// Move the artifact into place and insert its catalog record.
    pub fn commit(&self, pending: PendingArtifact, request: CommitRequest) -> Result<FileRecord> {
        let PendingArtifact {
            mut part,
            stored_name,
            original_name,
            mime_type,
            size_bytes,
        } = pending;

        let final_path = self.store.path_for(&stored_name);
        self.store.commit_part(part.path(), &final_path)?;
        part.disarm();

        let new = NewFileRecord {
            stored_name,
            original_name,
            title: request.title,
            uploader: request.uploader,
            storage_path: final_path.to_string_lossy().into_owned(),
            is_streamable: request.is_streamable,
            size_bytes,
            mime_type,
        };

        match self.catalog.create(&new) {
            Ok(record) => {
                tracing::info!(
                    file_id = %record.id,
                    uploader = %record.uploader,
                    bytes = record.size_bytes,
                    "Upload committed"
                );
                Ok(record)
            }
            Err(e) => {
                if let Err(rm) = std::fs::remove_file(&final_path) {
                    tracing::error!(path = %final_path.display(), "Failed to remove uncommitted artifact: {rm}");
                }
                Err(e)
            }
        }
    }
}

/// A part file that is deleted on drop unless disarmed.
struct PartFile {
    path: PathBuf,
    armed: bool,
}

impl PartFile {
    async fn create(path: PathBuf) -> Result<Self> {
        let part = Self { path, armed: true };
        tokio::fs::File::create(&part.path).await?;
        Ok(part)
    }

    fn path(&self) -> &Path {
        &self.path
    }

    fn disarm(&mut self) {
        self.armed = false;
    }
}

impl Drop for PartFile {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        match std::fs::remove_file(&self.path) {
            Ok(()) => tracing::debug!(path = %self.path.display(), "Discarded partial upload"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => {
                tracing::warn!(path = %self.path.display(), "Failed to discard partial upload: {e}")
            }
        }
    }
}

/// Collision-free storage name keeping a sanitized extension.
pub fn stored_name_for(original_name: &str) -> String {
    let id = Uuid::new_v4();
    match content_type::extension_of(original_name) {
        Some(ext) => format!("{id}.{ext}"),
        None => id.to_string(),
    }
}

/// Reduce a client-supplied file name to its final path component.
pub fn sanitize_file_name(raw: &str) -> Option<String> {
    let name = raw
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or_default()
        .trim()
        .chars()
        .filter(|c| !c.is_control())
        .collect::<String>();

    if name.is_empty() || name == "." || name == ".." {
        None
    } else {
        Some(name)
    }
}

/// Parse a boolean-ish form value such as `isStreamable`.
pub fn parse_flag(raw: &str) -> Result<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Ok(true),
        "false" | "0" | "no" | "off" | "" => Ok(false),
        other => Err(Error::Validation(format!(
            "invalid boolean value {other:?}"
        ))),
    }
}
