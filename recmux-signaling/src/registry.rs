//! Active recordings and pipeline elements started by control requests
//!
//! Each recording is an independent `WebmMuxer -> FileWriter` chain keyed by
//! `(sfu_id, session_id, track_id)`. The upstream pipeline looks the muxer up
//! with [`RecordingRegistry::recording`] and writes samples into it.

use crate::error::{SignalingError, SignalingResult};
use crate::protocol::{RecordingConfig, RecordingKey};
use crate::server::ControlHandler;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use parking_lot::{Mutex, RwLock};
use recmux_core::Element;
use recmux_media::{FileWriter, MediaError, WebmMuxer, DEFAULT_BUFFER_SIZE};
use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use std::sync::Arc;

/// Builds pipeline elements from opaque configuration bytes
pub trait ElementFactory: Send + Sync {
    /// Create an element for `element_id`
    fn create(&self, element_id: &str, config: &[u8]) -> SignalingResult<Arc<dyn Element>>;
}

impl<F> ElementFactory for F
where
    F: Fn(&str, &[u8]) -> SignalingResult<Arc<dyn Element>> + Send + Sync,
{
    fn create(&self, element_id: &str, config: &[u8]) -> SignalingResult<Arc<dyn Element>> {
        self(element_id, config)
    }
}

/// Identifies an element started with `StartElement`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ElementKey {
    /// Forwarding unit id
    pub sfu_id: String,
    /// Pipeline id
    pub pipeline_id: String,
    /// Session id
    pub session_id: String,
    /// Track id
    pub track_id: String,
    /// Element type
    pub element_id: String,
}

struct ActiveRecording {
    muxer: Arc<WebmMuxer>,
    file: Arc<FileWriter>,
    started_at: DateTime<Utc>,
}

/// Outcome of a stopped recording
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordingSummary {
    /// Recording key
    pub key: RecordingKey,
    /// Output file
    pub path: PathBuf,
    /// Bytes written to the file
    pub bytes_written: u64,
    /// Time between start and stop
    pub duration: chrono::Duration,
}

/// Owns every recording and element started through the control plane
pub struct RecordingRegistry {
    recordings: DashMap<RecordingKey, ActiveRecording>,
    /// Keys whose output file is being created
    starting: Mutex<HashSet<RecordingKey>>,
    elements: DashMap<ElementKey, Arc<dyn Element>>,
    factories: RwLock<HashMap<String, Arc<dyn ElementFactory>>>,
    default_buffer_size: usize,
}

impl RecordingRegistry {
    /// Create an empty registry using the default write buffer size
    pub fn new() -> Self {
        Self::with_default_buffer_size(DEFAULT_BUFFER_SIZE)
    }

    /// Create an empty registry; recordings that ask for a 0-byte buffer get `size`
    pub fn with_default_buffer_size(size: usize) -> Self {
        Self {
            recordings: DashMap::new(),
            starting: Mutex::new(HashSet::new()),
            elements: DashMap::new(),
            factories: RwLock::new(HashMap::new()),
            default_buffer_size: size,
        }
    }

    /// Register the factory used for `StartElement` requests with this element id
    pub fn register_factory(
        &self,
        element_id: impl Into<String>,
        factory: Arc<dyn ElementFactory>,
    ) {
        let element_id = element_id.into();
        tracing::debug!("Element factory registered: {}", element_id);
        self.factories.write().insert(element_id, factory);
    }

    /// Start recording a track into `config.destination_path`
    pub fn start_recording(
        &self,
        key: RecordingKey,
        config: RecordingConfig,
    ) -> SignalingResult<Arc<WebmMuxer>> {
        if config.destination_path.is_empty() {
            return Err(MediaError::InvalidConfiguration {
                message: "destination_path is empty".to_string(),
            }
            .into());
        }

        {
            let mut starting = self.starting.lock();
            if self.recordings.contains_key(&key) || !starting.insert(key.clone()) {
                return Err(SignalingError::RecordingAlreadyActive {
                    key: key.to_string(),
                });
            }
        }

        // Disk work runs without any map lock held
        let opened = self.open_recording(&key, &config);
        let muxer = match opened {
            Ok(recording) => {
                let muxer = Arc::clone(&recording.muxer);
                self.recordings.insert(key.clone(), recording);
                self.starting.lock().remove(&key);
                muxer
            }
            Err(e) => {
                self.starting.lock().remove(&key);
                return Err(e);
            }
        };

        tracing::info!(
            "Recording {} started: {} (audio {:?}, video {:?})",
            key,
            config.destination_path,
            config.audio_mode,
            config.video_mode
        );
        Ok(muxer)
    }

    fn open_recording(
        &self,
        key: &RecordingKey,
        config: &RecordingConfig,
    ) -> SignalingResult<ActiveRecording> {
        let buffer_size = match config.buffer_size_bytes {
            0 => self.default_buffer_size,
            size => usize::try_from(size).unwrap_or(usize::MAX),
        };
        let file = Arc::new(FileWriter::create(&config.destination_path, buffer_size)?);
        let muxer = Arc::new(WebmMuxer::with_id(
            format!("webm:{key}"),
            Some(config.muxer_config()),
        ));
        muxer.attach(file.clone());

        Ok(ActiveRecording {
            muxer,
            file,
            started_at: Utc::now(),
        })
    }

    /// Stop a recording, finalizing its file
    pub fn stop_recording(&self, key: &RecordingKey) -> SignalingResult<RecordingSummary> {
        let Some((key, recording)) = self.recordings.remove(key) else {
            return Err(SignalingError::RecordingNotFound {
                key: key.to_string(),
            });
        };

        recording.muxer.close();

        let summary = RecordingSummary {
            path: recording.file.path().to_path_buf(),
            bytes_written: recording.file.bytes_written(),
            duration: Utc::now() - recording.started_at,
            key,
        };
        tracing::info!(
            "Recording {} stopped: {} bytes in {}s",
            summary.key,
            summary.bytes_written,
            summary.duration.num_seconds()
        );
        Ok(summary)
    }

    /// Muxer of an active recording
    pub fn recording(&self, key: &RecordingKey) -> Option<Arc<WebmMuxer>> {
        self.recordings
            .get(key)
            .map(|recording| Arc::clone(&recording.muxer))
    }

    /// Keys of all active recordings
    pub fn active_recordings(&self) -> Vec<RecordingKey> {
        self.recordings.iter().map(|entry| entry.key().clone()).collect()
    }

    /// Number of active recordings
    pub fn recording_count(&self) -> usize {
        self.recordings.len()
    }

    /// Build and store an element through its registered factory
    pub fn start_element(
        &self,
        key: ElementKey,
        config: &[u8],
    ) -> SignalingResult<Arc<dyn Element>> {
        let factory = self
            .factories
            .read()
            .get(&key.element_id)
            .cloned()
            .ok_or_else(|| SignalingError::UnknownElement {
                element_id: key.element_id.clone(),
            })?;

        let element = factory.create(&key.element_id, config)?;
        tracing::info!(
            "Element {} started for {}/{}/{} in pipeline {}",
            key.element_id,
            key.sfu_id,
            key.session_id,
            key.track_id,
            key.pipeline_id
        );

        if let Some(previous) = self.elements.insert(key, Arc::clone(&element)) {
            tracing::warn!("Element {} replaced, closing previous instance", previous.id());
            previous.close();
        }
        Ok(element)
    }

    /// Element started with `key`
    pub fn element(&self, key: &ElementKey) -> Option<Arc<dyn Element>> {
        self.elements.get(key).map(|element| Arc::clone(element.value()))
    }

    /// Close every recording and element
    pub fn shutdown(&self) {
        for key in self.active_recordings() {
            if let Err(e) = self.stop_recording(&key) {
                tracing::debug!("Recording {} already gone at shutdown: {}", key, e);
            }
        }

        let keys: Vec<ElementKey> = self.elements.iter().map(|e| e.key().clone()).collect();
        for key in keys {
            if let Some((_, element)) = self.elements.remove(&key) {
                element.close();
            }
        }
        tracing::info!("Recording registry shut down");
    }
}

impl Default for RecordingRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for RecordingRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecordingRegistry")
            .field("recordings", &self.recordings.len())
            .field("elements", &self.elements.len())
            .field("default_buffer_size", &self.default_buffer_size)
            .finish()
    }
}

#[async_trait]
impl ControlHandler for RecordingRegistry {
    async fn start_element(&self, key: ElementKey, config: Vec<u8>) -> SignalingResult<()> {
        RecordingRegistry::start_element(self, key, &config).map(|_| ())
    }

    async fn start_recording(
        &self,
        key: RecordingKey,
        config: RecordingConfig,
    ) -> SignalingResult<()> {
        RecordingRegistry::start_recording(self, key, config).map(|_| ())
    }

    async fn stop_recording(&self, key: RecordingKey) -> SignalingResult<()> {
        RecordingRegistry::stop_recording(self, &key).map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use recmux_core::Node;

    fn temp_destination() -> String {
        std::env::temp_dir()
            .join(format!("recmux-registry-{}", uuid::Uuid::new_v4()))
            .join("out.webm")
            .to_string_lossy()
            .into_owned()
    }

    fn element_key(element_id: &str) -> ElementKey {
        ElementKey {
            sfu_id: "sfu".to_string(),
            pipeline_id: "pipe".to_string(),
            session_id: "s1".to_string(),
            track_id: "t1".to_string(),
            element_id: element_id.to_string(),
        }
    }

    #[test]
    fn test_duplicate_start_is_rejected() {
        let registry = RecordingRegistry::new();
        let key = RecordingKey::new("sfu", "s1", "t1");
        let config = RecordingConfig {
            destination_path: temp_destination(),
            ..Default::default()
        };

        registry.start_recording(key.clone(), config.clone()).unwrap();
        let err = registry.start_recording(key.clone(), config).unwrap_err();
        assert_eq!(err.error_code(), "RECORDING_ALREADY_ACTIVE");
        assert_eq!(registry.recording_count(), 1);

        registry.stop_recording(&key).unwrap();
        assert!(registry.recording(&key).is_none());
    }

    #[test]
    fn test_unknown_stop_is_rejected() {
        let registry = RecordingRegistry::new();
        let err = registry
            .stop_recording(&RecordingKey::new("sfu", "missing", "t1"))
            .unwrap_err();
        assert!(matches!(err, SignalingError::RecordingNotFound { .. }));
    }

    #[test]
    fn test_empty_destination_is_rejected() {
        let registry = RecordingRegistry::new();
        let config = RecordingConfig {
            destination_path: String::new(),
            ..Default::default()
        };
        let err = registry
            .start_recording(RecordingKey::new("sfu", "s1", "t1"), config)
            .unwrap_err();
        assert!(matches!(
            err,
            SignalingError::Media(MediaError::InvalidConfiguration { .. })
        ));
    }

    #[test]
    fn test_start_element_uses_registered_factory() {
        let registry = RecordingRegistry::new();
        let factory = |element_id: &str, config: &[u8]| -> SignalingResult<Arc<dyn Element>> {
            assert_eq!(config, b"{}");
            Ok(Arc::new(Node::new(element_id)))
        };
        registry.register_factory("tee", Arc::new(factory));

        let element = registry.start_element(element_key("tee"), b"{}").unwrap();
        assert_eq!(element.id(), "tee");
        assert!(registry.element(&element_key("tee")).is_some());

        let err = registry.start_element(element_key("mixer"), b"").err().unwrap();
        assert_eq!(err.error_code(), "UNKNOWN_ELEMENT");
    }

    #[test]
    fn test_shutdown_closes_everything() {
        let registry = RecordingRegistry::new();
        for track in ["audio", "video"] {
            let config = RecordingConfig {
                destination_path: temp_destination(),
                ..Default::default()
            };
            registry
                .start_recording(RecordingKey::new("sfu", "s1", track), config)
                .unwrap();
        }
        let muxer = registry
            .recording(&RecordingKey::new("sfu", "s1", "audio"))
            .unwrap();

        registry.shutdown();
        assert_eq!(registry.recording_count(), 0);
        assert!(muxer.is_closed());
    }

    #[test]
    fn test_duplicate_start_leaves_live_file_untouched() {
        let registry = RecordingRegistry::new();
        let key = RecordingKey::new("sfu", "s1", "t1");
        let config = RecordingConfig {
            destination_path: temp_destination(),
            buffer_size_bytes: 1,
            ..Default::default()
        };

        let muxer = registry.start_recording(key.clone(), config.clone()).unwrap();
        muxer
            .write_sample(&recmux_core::Sample::audio(0, vec![0xFC, 0xFF, 0xFE]))
            .unwrap();
        let before = std::fs::metadata(&config.destination_path).unwrap().len();
        assert!(before > 0);

        assert!(registry.start_recording(key.clone(), config.clone()).is_err());
        let after = std::fs::metadata(&config.destination_path).unwrap().len();
        assert_eq!(after, before);

        registry.stop_recording(&key).unwrap();
    }

    #[test]
    fn test_concurrent_starts_admit_one_recording() {
        let registry = Arc::new(RecordingRegistry::new());
        let key = RecordingKey::new("sfu", "s1", "race");
        let barrier = Arc::new(std::sync::Barrier::new(8));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let registry = Arc::clone(&registry);
                let barrier = Arc::clone(&barrier);
                let key = key.clone();
                std::thread::spawn(move || {
                    let config = RecordingConfig {
                        destination_path: temp_destination(),
                        ..Default::default()
                    };
                    barrier.wait();
                    registry.start_recording(key, config).is_ok()
                })
            })
            .collect();

        let started = handles
            .into_iter()
            .map(|handle| handle.join().unwrap())
            .filter(|ok| *ok)
            .count();
        assert_eq!(started, 1);
        assert_eq!(registry.recording_count(), 1);
        assert!(registry.starting.lock().is_empty());
        registry.shutdown();
    }

    #[test]
    fn test_failed_create_releases_key() {
        let registry = RecordingRegistry::new();
        let key = RecordingKey::new("sfu", "s1", "t1");

        // A directory cannot be opened as the output file
        let dir = std::env::temp_dir().join(format!("recmux-registry-{}", uuid::Uuid::new_v4()));
        std::fs::create_dir_all(&dir).unwrap();
        let config = RecordingConfig {
            destination_path: dir.to_string_lossy().into_owned(),
            ..Default::default()
        };
        assert!(registry.start_recording(key.clone(), config).is_err());
        assert_eq!(registry.recording_count(), 0);

        let config = RecordingConfig {
            destination_path: temp_destination(),
            ..Default::default()
        };
        registry.start_recording(key.clone(), config).unwrap();
        registry.stop_recording(&key).unwrap();
    }

    #[test]
    fn test_handler_dispatch_reaches_registry() {
        let registry = RecordingRegistry::new();
        let key = RecordingKey::new("sfu", "s1", "handler");
        let config = RecordingConfig {
            destination_path: temp_destination(),
            ..Default::default()
        };

        tokio_test::block_on(ControlHandler::start_recording(
            &registry,
            key.clone(),
            config,
        ))
        .unwrap();
        assert!(registry.recording(&key).is_some());

        tokio_test::block_on(ControlHandler::stop_recording(&registry, key.clone())).unwrap();
        assert!(registry.recording(&key).is_none());

        let err = tokio_test::block_on(ControlHandler::stop_recording(&registry, key)).unwrap_err();
        assert_eq!(err.error_code(), "RECORDING_NOT_FOUND");
    }
}
