//! One conversion session: the queue plus everything that acts on it.
//!
//! A [`Session`] wires the store, gate, scheduler, exporter and retriever to
//! one configuration and exposes the user actions a front end calls.

use crate::config::Config;
use crate::conversion::{ConversionScheduler, DrainReport, EncoderSurface, ImageSurface, SchedulerHandle};
use crate::export::{Bundle, BundleExporter};
use crate::ingest::{AdmissionReport, Candidate, IngestionGate, SelectionInput};
use crate::notifications::Notifier;
use crate::preferences::PreferenceStore;
use crate::retrieval::{ArtifactRetriever, Clipboard, Download};
use crate::state::{ConversionItem, QueueStore};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use webpforge_common::{ItemId, NamingMode, Quality, Result};

pub struct Session {
    config: Config,
    queue: Arc<QueueStore>,
    preferences: Arc<PreferenceStore>,
    notifier: Notifier,
    gate: IngestionGate,
    scheduler: Arc<ConversionScheduler>,
    exporter: BundleExporter,
    retriever: ArtifactRetriever,
}

impl Session {
    /// Build a session with the libwebp/`image` surface and the on-disk
    /// preference file named by the config.
    pub fn from_config(config: Config) -> Self {
        let surface: Arc<dyn EncoderSurface> = Arc::new(ImageSurface::new(config.conversion.format));
        let preferences = Arc::new(PreferenceStore::open(config.preferences.resolved_path()));
        Self::new(config, surface, preferences)
    }

    pub fn new(
        config: Config,
        surface: Arc<dyn EncoderSurface>,
        preferences: Arc<PreferenceStore>,
    ) -> Self {
        let queue = QueueStore::new();
        let notifier = Notifier::from_config(&config.notifications);

        let gate = IngestionGate::new(
            queue.clone(),
            preferences.clone(),
            notifier.clone(),
            config.limits.clone(),
            &config.ingest,
        );
        let scheduler = Arc::new(
            ConversionScheduler::new(queue.clone(), surface, notifier.clone())
                .with_encode_timeout(config.conversion.encode_timeout_secs.map(Duration::from_secs)),
        );
        let exporter = BundleExporter::new(queue.clone(), notifier.clone());
        let retriever = ArtifactRetriever::new(queue.clone(), notifier.clone());

        Self {
            config,
            queue,
            preferences,
            notifier,
            gate,
            scheduler,
            exporter,
            retriever,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn queue(&self) -> &Arc<QueueStore> {
        &self.queue
    }

    pub fn notifier(&self) -> &Notifier {
        &self.notifier
    }

    pub fn preferences(&self) -> &Arc<PreferenceStore> {
        &self.preferences
    }

    pub fn scheduler(&self) -> &Arc<ConversionScheduler> {
        &self.scheduler
    }

    /// Start the background drain loop.
    pub fn start(&self) -> SchedulerHandle {
        self.scheduler.clone().spawn()
    }

    /// Drain the queue on the caller's task.
    pub async fn convert_all(&self) -> DrainReport {
        self.scheduler.drain().await
    }

    pub fn add_files(&self, batch: Vec<Candidate>) -> AdmissionReport {
        self.gate.admit(batch)
    }

    pub fn add_from_selection(
        &self,
        input: Arc<dyn SelectionInput>,
        batch: Vec<Candidate>,
    ) -> AdmissionReport {
        self.gate.admit_from_selection(input, batch)
    }

    pub fn remove(&self, id: ItemId) -> bool {
        let name = self.queue.get(id).map(|item| item.source_name);
        let removed = self.queue.remove(id);
        if let (true, Some(name)) = (removed, name) {
            self.notifier.info(format!("Removed {}", name));
        }
        removed
    }

    pub fn clear(&self) -> usize {
        let count = self.queue.clear();
        if count > 0 {
            tracing::info!("Cleared {} items", count);
        }
        count
    }

    /// Put a failed item back in the queue.
    pub fn retry(&self, id: ItemId) -> Result<ConversionItem> {
        let item = self.queue.retry(id)?;
        self.notifier.info(format!("Retrying {}...", item.source_name));
        Ok(item)
    }

    /// Regenerate a done item at its current quality.
    pub fn reconvert(&self, id: ItemId) -> Result<ConversionItem> {
        self.queue.reconvert(id)
    }

    pub fn set_quality(&self, id: ItemId, value: f32) -> Result<ConversionItem> {
        self.queue.set_quality(id, value)
    }

    pub fn set_quality_all(&self, value: f32) -> usize {
        self.queue.set_quality_all(value)
    }

    /// Quality applied to newly admitted items.
    pub fn default_quality(&self) -> Quality {
        self.preferences.get()
    }

    pub fn set_default_quality(&self, value: f32) -> Result<Quality> {
        self.preferences.set(value)
    }

    /// Export every done item to a ZIP at `path`, using the configured
    /// naming mode unless one is given.
    pub fn export_zip(&self, path: &Path, naming: Option<NamingMode>) -> Result<Option<Bundle>> {
        self.exporter
            .export_to(path, naming.unwrap_or(self.config.export.naming))
    }

    pub fn download(&self, id: ItemId, naming: Option<NamingMode>) -> Result<Download> {
        self.retriever
            .download(id, naming.unwrap_or(self.config.export.naming))
    }

    pub fn save_download(
        &self,
        id: ItemId,
        dir: &Path,
        naming: Option<NamingMode>,
    ) -> Result<std::path::PathBuf> {
        self.retriever
            .save_download(id, dir, naming.unwrap_or(self.config.export.naming))
    }

    pub fn copy_to_clipboard(&self, id: ItemId, clipboard: &dyn Clipboard) -> Result<()> {
        self.retriever.copy_to_clipboard(id, clipboard)
    }
}
