//! Disk sink for serialized recordings

use crate::error::{MediaError, MediaResult};
use parking_lot::Mutex;
use recmux_core::{CoreError, CoreResult, Element, Sample, SamplePayload};
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Buffer capacity used when none is configured
pub const DEFAULT_BUFFER_SIZE: usize = 1024 * 1024;

/// Element that appends binary samples to a file
pub struct FileWriter {
    id: String,
    path: PathBuf,
    file: Mutex<Option<BufWriter<File>>>,
    bytes_written: AtomicU64,
}

impl FileWriter {
    /// Create the file, and any missing parent directories.
    ///
    /// `buffer_size` of 0 selects [`DEFAULT_BUFFER_SIZE`].
    pub fn create(path: impl AsRef<Path>, buffer_size: usize) -> MediaResult<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }

        let capacity = if buffer_size == 0 {
            DEFAULT_BUFFER_SIZE
        } else {
            buffer_size
        };
        let file = File::create(&path)?;

        tracing::debug!(
            "Recording file created: {} (buffer {} bytes)",
            path.display(),
            capacity
        );

        Ok(Self {
            id: format!("file:{}", path.display()),
            path,
            file: Mutex::new(Some(BufWriter::with_capacity(capacity, file))),
            bytes_written: AtomicU64::new(0),
        })
    }

    /// Destination path
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Bytes accepted so far, buffered or not
    pub fn bytes_written(&self) -> u64 {
        self.bytes_written.load(Ordering::Relaxed)
    }

    /// Whether the file has been closed
    pub fn is_closed(&self) -> bool {
        self.file.lock().is_none()
    }

    /// Append raw bytes
    pub fn write_bytes(&self, data: &[u8]) -> MediaResult<()> {
        let mut file = self.file.lock();
        let Some(writer) = file.as_mut() else {
            return Err(MediaError::InvalidState {
                message: format!("{} is closed", self.path.display()),
            });
        };

        writer.write_all(data)?;
        self.bytes_written
            .fetch_add(data.len() as u64, Ordering::Relaxed);
        Ok(())
    }

    /// Flush buffered data and sync it to disk. Later calls do nothing.
    pub fn finish(&self) -> MediaResult<()> {
        let Some(mut writer) = self.file.lock().take() else {
            return Ok(());
        };

        writer.flush()?;
        writer.get_ref().sync_all()?;

        tracing::info!(
            "Recording file closed: {} ({} bytes)",
            self.path.display(),
            self.bytes_written()
        );
        Ok(())
    }
}

impl Element for FileWriter {
    fn id(&self) -> &str {
        &self.id
    }

    fn write(&self, sample: &Sample) -> CoreResult<()> {
        match &sample.payload {
            SamplePayload::Binary(data) => self.write_bytes(data).map_err(CoreError::from),
            _ => Ok(()),
        }
    }

    fn attach(&self, _child: Arc<dyn Element>) {
        tracing::warn!("{}: file sink does not forward samples", self.id);
    }

    fn close(&self) {
        if let Err(e) = self.finish() {
            tracing::error!("{}: close failed: {}", self.id, e);
        }
    }
}

impl Drop for FileWriter {
    fn drop(&mut self) {
        Element::close(&*self);
    }
}

impl std::fmt::Debug for FileWriter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileWriter")
            .field("path", &self.path)
            .field("bytes_written", &self.bytes_written())
            .finish()
    }
}
