//! Per-item retrieval: download and clipboard copy.

use crate::notifications::Notifier;
use crate::state::QueueStore;
use bytes::Bytes;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use webpforge_common::paths::output_file_name;
use webpforge_common::{Error, ItemId, NamingMode, Result};

/// One artifact ready to hand to the user.
#[derive(Debug, Clone)]
pub struct Download {
    pub file_name: String,
    pub mime_type: &'static str,
    pub bytes: Bytes,
}

/// Destination for clipboard copies.
pub trait Clipboard: Send + Sync {
    fn write_image(&self, mime_type: &str, bytes: Bytes) -> Result<()>;
}

pub struct ArtifactRetriever {
    queue: Arc<QueueStore>,
    notifier: Notifier,
}

impl ArtifactRetriever {
    pub fn new(queue: Arc<QueueStore>, notifier: Notifier) -> Self {
        Self { queue, notifier }
    }

    /// The artifact of a `done` item with its derived file name.
    pub fn download(&self, id: ItemId, naming: NamingMode) -> Result<Download> {
        let (item, bytes) = self.queue.fetch_result(id)?;
        let result = item
            .result
            .ok_or_else(|| Error::internal(format!("{} has no result", item.source_name)))?;

        Ok(Download {
            file_name: output_file_name(&item.source_name, result.quality, result.format, naming),
            mime_type: result.format.mime_type(),
            bytes,
        })
    }

    /// Write the artifact into `dir` and return the path written.
    pub fn save_download(&self, id: ItemId, dir: &Path, naming: NamingMode) -> Result<PathBuf> {
        let download = self.download(id, naming)?;
        std::fs::create_dir_all(dir)?;
        let path = dir.join(&download.file_name);
        std::fs::write(&path, &download.bytes)?;
        tracing::debug!("Saved {} ({} bytes)", path.display(), download.bytes.len());
        Ok(path)
    }

    /// Copy one artifact to the clipboard. Failure is reported and leaves
    /// the item untouched.
    pub fn copy_to_clipboard(&self, id: ItemId, clipboard: &dyn Clipboard) -> Result<()> {
        let outcome = self
            .download(id, NamingMode::Original)
            .and_then(|download| {
                clipboard.write_image(download.mime_type, download.bytes)?;
                Ok(download.file_name)
            });

        match outcome {
            Ok(name) => {
                self.notifier.success(format!("Copied {} to clipboard", name));
                Ok(())
            }
            Err(e) => {
                tracing::error!("Clipboard copy of {} failed: {}", id, e);
                self.notifier.error("Failed to copy image to clipboard");
                Err(e)
            }
        }
    }
}
