//! Size-bounded upload receiver.
//!
//! The whole payload is measured against its ceiling before a single byte
//! reaches the destination. Rewindable sources are read twice (measure, then
//! copy); plain streams are buffered in memory, never beyond the ceiling.
//! The destination is replaced atomically, so a rejected or failed upload
//! leaves any previous file untouched.

use std::io::SeekFrom;
use std::path::{Path, PathBuf};
use std::pin::pin;

use futures::{Stream, StreamExt};
use tokio::fs::{self, File};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncSeek, AsyncSeekExt, AsyncWriteExt};
use tracing::{debug, warn};
use uuid::Uuid;

/// Read/write granularity.
pub const CHUNK_SIZE: usize = 8192;

/// Running byte count for one upload. `bytes_seen` never exceeds `max_bytes`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UploadBudget {
    max_bytes: u64,
    bytes_seen: u64,
}

impl UploadBudget {
    pub fn new(max_bytes: u64) -> Self {
        Self {
            max_bytes,
            bytes_seen: 0,
        }
    }

    /// Account for `len` more bytes, failing as soon as the ceiling is crossed.
    pub fn consume(&mut self, len: usize) -> Result<(), UploadError> {
        let seen = self.bytes_seen.saturating_add(len as u64);
        if seen > self.max_bytes {
            return Err(UploadError::PayloadTooLarge {
                max_bytes: self.max_bytes,
            });
        }
        self.bytes_seen = seen;
        Ok(())
    }

    pub fn bytes_seen(&self) -> u64 {
        self.bytes_seen
    }

    pub fn max_bytes(&self) -> u64 {
        self.max_bytes
    }
}

/// A successfully stored upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Committed {
    pub path: PathBuf,
    pub bytes: u64,
}

#[derive(Debug)]
pub enum UploadError {
    /// The payload is larger than the allowed ceiling
    PayloadTooLarge { max_bytes: u64 },
    /// The producer failed while sending
    Stream(String),
    /// Reading the source or writing the destination failed
    Io(std::io::Error),
}

impl std::fmt::Display for UploadError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            UploadError::PayloadTooLarge { max_bytes } => {
                write!(f, "Upload exceeds the maximum size of {} bytes", max_bytes)
            }
            UploadError::Stream(e) => write!(f, "Upload stream failed: {}", e),
            UploadError::Io(e) => write!(f, "Upload I/O error: {}", e),
        }
    }
}

impl std::error::Error for UploadError {}

impl From<std::io::Error> for UploadError {
    fn from(e: std::io::Error) -> Self {
        UploadError::Io(e)
    }
}

/// Receive a non-rewindable stream of chunks.
///
/// Chunks are buffered while counting; the first chunk that would push the
/// total past `max_bytes` aborts without draining the rest of the stream.
pub async fn receive_stream<S, B, E>(
    stream: S,
    max_bytes: u64,
    destination: &Path,
) -> Result<Committed, UploadError>
where
    S: Stream<Item = Result<B, E>>,
    B: AsRef<[u8]>,
    E: std::fmt::Display,
{
    let mut stream = pin!(stream);
    let mut budget = UploadBudget::new(max_bytes);
    let mut buffer = Vec::new();

    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(|e| UploadError::Stream(e.to_string()))?;
        let chunk = chunk.as_ref();
        if let Err(e) = budget.consume(chunk.len()) {
            debug!(
                destination = %destination.display(),
                max_bytes,
                "Rejected oversized upload"
            );
            return Err(e);
        }
        buffer.extend_from_slice(chunk);
    }

    let mut pending = PendingFile::create(destination).await?;
    for chunk in buffer.chunks(CHUNK_SIZE) {
        if let Err(e) = pending.write(chunk).await {
            pending.discard().await;
            return Err(e);
        }
    }
    pending.persist().await
}

/// Receive from a rewindable source in two passes.
///
/// The first pass only counts bytes. The second pass starts again from the
/// position the source had on entry and copies it to the destination,
/// enforcing the ceiling again in case the source grew in between.
pub async fn receive_seekable<R>(
    source: &mut R,
    max_bytes: u64,
    destination: &Path,
) -> Result<Committed, UploadError>
where
    R: AsyncRead + AsyncSeek + Unpin,
{
    let start = source.stream_position().await?;
    let mut chunk = vec![0u8; CHUNK_SIZE];

    let mut budget = UploadBudget::new(max_bytes);
    loop {
        let n = source.read(&mut chunk).await?;
        if n == 0 {
            break;
        }
        if let Err(e) = budget.consume(n) {
            debug!(
                destination = %destination.display(),
                max_bytes,
                "Rejected oversized upload"
            );
            return Err(e);
        }
    }

    source.seek(SeekFrom::Start(start)).await?;

    let mut pending = PendingFile::create(destination).await?;
    let mut budget = UploadBudget::new(max_bytes);
    let copied = async {
        loop {
            let n = source.read(&mut chunk).await?;
            if n == 0 {
                return Ok::<(), UploadError>(());
            }
            budget.consume(n)?;
            pending.write(&chunk[..n]).await?;
        }
    }
    .await;

    match copied {
        Ok(()) => pending.persist().await,
        Err(e) => {
            pending.discard().await;
            Err(e)
        }
    }
}

/// Temporary sibling of the destination, renamed over it on success.
struct PendingFile {
    file: File,
    temp_path: PathBuf,
    destination: PathBuf,
    written: u64,
}

impl PendingFile {
    async fn create(destination: &Path) -> Result<Self, UploadError> {
        let file_name = destination.file_name().ok_or_else(|| {
            UploadError::Io(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                "destination has no file name",
            ))
        })?;

        if let Some(parent) = destination.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).await?;
            }
        }

        let temp_name = format!(
            ".{}.{}.part",
            file_name.to_string_lossy(),
            Uuid::new_v4().simple()
        );
        let temp_path = destination.with_file_name(temp_name);
        let file = File::create(&temp_path).await?;

        Ok(Self {
            file,
            temp_path,
            destination: destination.to_path_buf(),
            written: 0,
        })
    }

    async fn write(&mut self, data: &[u8]) -> Result<(), UploadError> {
        self.file.write_all(data).await?;
        self.written += data.len() as u64;
        Ok(())
    }

    async fn persist(mut self) -> Result<Committed, UploadError> {
        let finished = async {
            self.file.flush().await?;
            self.file.sync_all().await?;
            fs::rename(&self.temp_path, &self.destination).await?;
            Ok::<(), std::io::Error>(())
        }
        .await;

        if let Err(e) = finished {
            self.discard().await;
            return Err(e.into());
        }

        Ok(Committed {
            path: self.destination,
            bytes: self.written,
        })
    }

    async fn discard(self) {
        drop(self.file);
        if let Err(e) = fs::remove_file(&self.temp_path).await {
            warn!(path = %self.temp_path.display(), error = %e, "Failed to remove partial upload");
        }
    }
}
