//! ZIP bundle of every converted item.

use crate::notifications::Notifier;
use crate::state::QueueStore;
use bytes::Bytes;
use std::collections::HashSet;
use std::io::{Cursor, Write};
use std::path::Path;
use std::sync::Arc;
use webpforge_common::paths::output_file_name;
use webpforge_common::{Error, ItemStatus, NamingMode, Result};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

/// File name used when the caller does not pick one.
pub const DEFAULT_ARCHIVE_NAME: &str = "webp-images.zip";

/// An assembled archive, held in memory.
#[derive(Debug, Clone)]
pub struct Bundle {
    pub bytes: Bytes,
    /// Entry names in archive order.
    pub entries: Vec<String>,
}

pub struct BundleExporter {
    queue: Arc<QueueStore>,
    notifier: Notifier,
}

impl BundleExporter {
    pub fn new(queue: Arc<QueueStore>, notifier: Notifier) -> Self {
        Self { queue, notifier }
    }

    /// Pack every `done` item into an in-memory archive.
    ///
    /// Returns `None` when nothing is done. Any fetch or pack error aborts
    /// the whole bundle.
    pub fn build(&self, naming: NamingMode) -> Result<Option<Bundle>> {
        let done = self.queue.done_items();
        if done.is_empty() {
            return Ok(None);
        }

        // Artifacts are already compressed.
        let options = SimpleFileOptions::default().compression_method(CompressionMethod::Stored);
        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
        let mut names = EntryNames::default();
        let mut entries = Vec::with_capacity(done.len());

        for item in done {
            let result = item.result.ok_or_else(|| {
                Error::internal(format!("{} is done without a result", item.source_name))
            })?;
            let bytes = self.queue.handles().fetch(result.handle)?;
            let name = names.claim(output_file_name(
                &item.source_name,
                result.quality,
                result.format,
                naming,
            ));

            writer
                .start_file(name.as_str(), options)
                .map_err(|e| Error::archive(e.to_string()))?;
            writer.write_all(&bytes)?;
            entries.push(name);
        }

        let cursor = writer
            .finish()
            .map_err(|e| Error::archive(e.to_string()))?;

        Ok(Some(Bundle {
            bytes: Bytes::from(cursor.into_inner()),
            entries,
        }))
    }

    /// Build the bundle and write it to `path`.
    ///
    /// A no-op when nothing is done. The archive goes through a temporary
    /// file in the same directory that is only persisted once complete.
    pub fn export_to(&self, path: &Path, naming: NamingMode) -> Result<Option<Bundle>> {
        if self.queue.count_with_status(ItemStatus::Done) == 0 {
            tracing::debug!("Nothing converted yet, skipping export");
            return Ok(None);
        }

        self.notifier.info("Creating ZIP file...");

        let outcome = self.build(naming).and_then(|bundle| match bundle {
            Some(bundle) => {
                write_atomic(path, &bundle.bytes)?;
                Ok(Some(bundle))
            }
            None => Ok(None),
        });

        match outcome {
            Ok(Some(bundle)) => {
                tracing::info!(
                    "Exported {} images to {:?} ({} bytes)",
                    bundle.entries.len(),
                    path,
                    bundle.bytes.len()
                );
                self.notifier.success(format!(
                    "Downloaded {} images as ZIP",
                    bundle.entries.len()
                ));
                Ok(Some(bundle))
            }
            Ok(None) => Ok(None),
            Err(e) => {
                tracing::error!("Export to {:?} failed: {}", path, e);
                self.notifier.error("Failed to create ZIP file");
                Err(e)
            }
        }
    }
}

fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
    tmp.write_all(bytes)?;
    tmp.flush()?;
    tmp.persist(path).map_err(|e| Error::Io(e.error))?;
    Ok(())
}

/// Hands out unique entry names, numbering repeats before the extension.
#[derive(Default)]
struct EntryNames {
    taken: HashSet<String>,
}

impl EntryNames {
    fn claim(&mut self, name: String) -> String {
        if self.taken.insert(name.clone()) {
            return name;
        }

        let (stem, ext) = match name.rfind('.') {
            Some(dot) if dot > 0 => (&name[..dot], &name[dot..]),
            _ => (name.as_str(), ""),
        };

        let mut n = 1;
        loop {
            let candidate = format!("{stem}-{n}{ext}");
            if self.taken.insert(candidate.clone()) {
                return candidate;
            }
            n += 1;
        }
    }
}
