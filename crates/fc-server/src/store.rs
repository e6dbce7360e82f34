//! Artifact storage on the local filesystem.
//!
//! [`ArtifactStore`] owns the content root and hands out [`TrackedReader`]s
//! for delivery. Every reader is counted in a shared open-handle gauge that
//! drops back when the reader is dropped, whether the stream finished or the
//! client went away mid-transfer.

use std::io::{self, SeekFrom};
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::task::{Context, Poll};

use fc_core::FileId;
use tokio::fs::File;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncSeekExt, ReadBuf, Take};

/// Suffix for artifacts that are still being written.
pub const PART_SUFFIX: &str = "part";

/// Handle to the directory holding artifact bytes.
#[derive(Clone)]
pub struct ArtifactStore {
    root: Arc<PathBuf>,
    open_handles: Arc<AtomicUsize>,
}

impl ArtifactStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: Arc::new(root.into()),
            open_handles: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Create the content root if it does not exist yet.
    pub async fn ensure_root(&self) -> io::Result<()> {
        tokio::fs::create_dir_all(self.root.as_path()).await
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Final location of a committed artifact.
    pub fn path_for(&self, stored_name: &str) -> PathBuf {
        self.root.join(stored_name)
    }

    /// Temporary location used while the artifact is being received.
    pub fn part_path_for(&self, stored_name: &str) -> PathBuf {
        self.root.join(format!("{stored_name}.{PART_SUFFIX}"))
    }

    /// Number of delivery readers currently alive.
    pub fn open_handles(&self) -> usize {
        self.open_handles.load(Ordering::SeqCst)
    }

    /// Length of the artifact at `path`, failing if it is not a regular file.
    pub async fn stat(&self, path: &Path) -> io::Result<u64> {
        let meta = tokio::fs::metadata(path).await?;
        if !meta.is_file() {
            return Err(io::Error::new(
                io::ErrorKind::NotFound,
                format!("{} is not a regular file", path.display()),
            ));
        }
        Ok(meta.len())
    }

    /// Open `len` bytes of the artifact at `path` starting at `start`.
    ///
    /// Each call gets its own file handle and cursor.
    pub async fn open_range(
        &self,
        file_id: FileId,
        path: &Path,
        start: u64,
        len: u64,
    ) -> io::Result<TrackedReader> {
        let mut file = File::open(path).await?;
        if start > 0 {
            file.seek(SeekFrom::Start(start)).await?;
        }

        self.open_handles.fetch_add(1, Ordering::SeqCst);
        tracing::trace!(%file_id, start, len, handles = self.open_handles(), "Artifact handle opened");

        Ok(TrackedReader {
            inner: file.take(len),
            file_id,
            expected: len,
            delivered: 0,
            counter: Arc::clone(&self.open_handles),
        })
    }

    /// Move a fully written part file to its final name.
    ///
    /// Uses a blocking rename so the move cannot be torn by a cancelled task.
    pub fn commit_part(&self, part: &Path, final_path: &Path) -> io::Result<()> {
        std::fs::rename(part, final_path)
    }

    /// Remove an artifact. A missing file is reported as `Ok(false)`.
    pub async fn remove(&self, path: &Path) -> io::Result<bool> {
        match tokio::fs::remove_file(path).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e),
        }
    }
}

/// A bounded artifact reader that releases its slot in the open-handle
/// gauge on drop.
pub struct TrackedReader {
    inner: Take<File>,
    file_id: FileId,
    expected: u64,
    delivered: u64,
    counter: Arc<AtomicUsize>,
}

impl TrackedReader {
    /// Bytes handed out so far.
    pub fn delivered(&self) -> u64 {
        self.delivered
    }
}

impl AsyncRead for TrackedReader {
    fn poll_read(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        let before = buf.filled().len();
        let this = &mut *self;
        match Pin::new(&mut this.inner).poll_read(cx, buf) {
            Poll::Ready(Ok(())) => {
                this.delivered += (buf.filled().len() - before) as u64;
                Poll::Ready(Ok(()))
            }
            Poll::Ready(Err(e)) => {
                // Headers are already out; the connection will be torn down.
                tracing::warn!(file_id = %this.file_id, delivered = this.delivered, "Artifact read failed mid-stream: {e}");
                Poll::Ready(Err(e))
            }
            Poll::Pending => Poll::Pending,
        }
    }
}

impl Drop for TrackedReader {
    fn drop(&mut self) {
        let remaining = self.counter.fetch_sub(1, Ordering::SeqCst) - 1;
        if self.delivered >= self.expected {
            tracing::debug!(file_id = %self.file_id, bytes = self.delivered, handles = remaining, state = "COMPLETE", "Delivery finished");
        } else {
            tracing::debug!(
                file_id = %self.file_id,
                bytes = self.delivered,
                expected = self.expected,
                handles = remaining,
                state = "ABORTED",
                "Delivery aborted"
            );
        }
    }
}
