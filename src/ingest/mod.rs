//! Admission of new items into the queue.
//!
//! The gate filters a raw batch down to images, enforces the per-file size
//! limit and the total count limit, and mints a source handle for every
//! admitted item.

use crate::config::{IngestConfig, LimitsConfig};
use crate::notifications::Notifier;
use crate::preferences::PreferenceStore;
use crate::state::{ConversionItem, QueueStore};
use bytes::Bytes;
use parking_lot::Mutex;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use webpforge_common::paths::{image_mime_for_path, is_image_mime};
use webpforge_common::ItemId;

/// One entry of a raw batch, before validation.
#[derive(Debug, Clone)]
pub struct Candidate {
    pub name: String,
    /// Declared content type, if the source provided one.
    pub mime: Option<String>,
    pub bytes: Bytes,
}

impl Candidate {
    pub fn new(name: impl Into<String>, mime: Option<String>, bytes: impl Into<Bytes>) -> Self {
        Self {
            name: name.into(),
            mime,
            bytes: bytes.into(),
        }
    }

    /// Read a file from disk, declaring its type from the extension.
    pub fn from_path(path: &Path) -> std::io::Result<Self> {
        let bytes = std::fs::read(path)?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.to_string_lossy().into_owned());
        let mime = image_mime_for_path(path).map(str::to_string);
        Ok(Self::new(name, mime, bytes))
    }

    /// An image pasted from the clipboard, which carries a type but no name.
    pub fn pasted(mime: impl Into<String>, bytes: impl Into<Bytes>) -> Self {
        let mime = mime.into();
        let ext = mime
            .split_once('/')
            .map(|(_, subtype)| subtype.split(['+', ';']).next().unwrap_or(subtype))
            .filter(|s| !s.is_empty())
            .unwrap_or("png")
            .to_string();
        Self::new(format!("pasted-image.{ext}"), Some(mime), bytes)
    }

    /// Image type of this entry, or `None` if it is not an image.
    ///
    /// A declared type wins. Without one the bytes are sniffed.
    pub fn image_mime(&self) -> Option<String> {
        match &self.mime {
            Some(mime) if is_image_mime(mime) => Some(mime.trim().to_ascii_lowercase()),
            Some(_) => None,
            None => image::guess_format(&self.bytes)
                .ok()
                .map(|format| format.to_mime_type().to_string()),
        }
    }
}

/// Outcome of one admission.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AdmissionReport {
    /// Ids of admitted items, in batch order.
    pub admitted: Vec<ItemId>,
    /// Names of entries over the per-file size limit.
    pub oversized: Vec<String>,
    /// Valid entries that did not fit under the count limit.
    pub dropped_for_count: usize,
    /// Non-image entries dropped without a message.
    pub ignored: usize,
    /// Nothing fit because the queue was already full.
    pub batch_rejected: bool,
}

impl AdmissionReport {
    pub fn admitted_count(&self) -> usize {
        self.admitted.len()
    }
}

/// A file selection widget the gate clears once a batch has been read.
pub trait SelectionInput: Send + Sync {
    fn clear(&self);
}

pub struct IngestionGate {
    queue: Arc<QueueStore>,
    preferences: Arc<PreferenceStore>,
    notifier: Notifier,
    limits: LimitsConfig,
    reset_delay: Duration,
    /// Serializes the count check with the append.
    admission: Mutex<()>,
}

impl IngestionGate {
    pub fn new(
        queue: Arc<QueueStore>,
        preferences: Arc<PreferenceStore>,
        notifier: Notifier,
        limits: LimitsConfig,
        ingest: &IngestConfig,
    ) -> Self {
        Self {
            queue,
            preferences,
            notifier,
            limits,
            reset_delay: Duration::from_millis(ingest.input_reset_delay_ms),
            admission: Mutex::new(()),
        }
    }

    /// Validate a batch and append what passes to the queue.
    pub fn admit(&self, batch: Vec<Candidate>) -> AdmissionReport {
        let mut report = AdmissionReport::default();
        let max_bytes = self.limits.max_file_size_bytes();

        let mut valid = Vec::with_capacity(batch.len());
        for candidate in batch {
            let Some(mime) = candidate.image_mime() else {
                tracing::debug!("Ignoring non-image entry {}", candidate.name);
                report.ignored += 1;
                continue;
            };
            if candidate.bytes.len() as u64 > max_bytes {
                tracing::warn!(
                    "Rejecting {} ({} bytes > {} bytes)",
                    candidate.name,
                    candidate.bytes.len(),
                    max_bytes
                );
                report.oversized.push(candidate.name);
                continue;
            }
            valid.push((candidate, mime));
        }

        if !report.oversized.is_empty() {
            self.notifier.error(format!(
                "Files exceed the {} MB limit: {}",
                self.limits.max_file_size_mb,
                report.oversized.join(", ")
            ));
        }

        if valid.is_empty() {
            return report;
        }

        let _guard = self.admission.lock();
        let room = self.limits.max_files.saturating_sub(self.queue.len());

        if room == 0 {
            report.dropped_for_count = valid.len();
            report.batch_rejected = true;
            self.notifier.error(format!(
                "Queue is full: at most {} files can be added",
                self.limits.max_files
            ));
            return report;
        }

        if valid.len() > room {
            report.dropped_for_count = valid.len() - room;
            valid.truncate(room);
            self.notifier.error(format!(
                "Only {} of the selected files fit under the {} file limit; {} dropped",
                room, self.limits.max_files, report.dropped_for_count
            ));
        }

        let quality = self.preferences.get();
        let items: Vec<ConversionItem> = valid
            .into_iter()
            .map(|(candidate, mime)| {
                let size = candidate.bytes.len() as u64;
                let handle = self.queue.handles().create(candidate.bytes);
                ConversionItem::new(candidate.name, mime, size, handle, quality)
            })
            .collect();

        report.admitted = items.iter().map(|item| item.id).collect();
        let count = self.queue.append(items);

        tracing::info!("Admitted {} files at quality {}", count, quality);
        self.notifier.success(format!(
            "Added {} {}",
            count,
            if count == 1 { "file" } else { "files" }
        ));

        report
    }

    /// Admit a batch read from a selection widget and clear the widget
    /// after the configured delay.
    ///
    /// The widget still references the files until the delay elapses, so it
    /// is never cleared synchronously. The timer runs on the current Tokio
    /// runtime when there is one and on a plain thread otherwise.
    pub fn admit_from_selection(
        &self,
        input: Arc<dyn SelectionInput>,
        batch: Vec<Candidate>,
    ) -> AdmissionReport {
        let report = self.admit(batch);

        let delay = self.reset_delay;
        match tokio::runtime::Handle::try_current() {
            Ok(runtime) => {
                runtime.spawn(async move {
                    tokio::time::sleep(delay).await;
                    input.clear();
                });
            }
            Err(_) => {
                tracing::debug!("No runtime; clearing selection from a timer thread");
                std::thread::spawn(move || {
                    std::thread::sleep(delay);
                    input.clear();
                });
            }
        }

        report
    }
}
