//! The queue store: the single source of truth for conversion items.
//!
//! Items live in insertion order behind one `RwLock`; every operation takes
//! the write guard once, so observers never see a half-applied change. Every
//! mutation is broadcast as a [`QueueEvent`], and a `Notify` wakes the
//! scheduler whenever a pending item becomes available.

mod types;

pub use types::*;

use crate::handles::HandleRegistry;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::{broadcast, Notify};
use webpforge_common::{Error, ItemId, ItemStatus, Quality, Result};

/// Change notification emitted by the [`QueueStore`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event_type", rename_all = "snake_case")]
pub enum QueueEvent {
    /// New items were appended in the given order.
    ItemsAdmitted { ids: Vec<ItemId> },
    /// An item moved to a new status.
    StatusChanged { id: ItemId, status: ItemStatus },
    /// An item's target quality changed.
    QualityChanged { id: ItemId, quality: Quality },
    /// An item was removed and its handles released.
    ItemRemoved { id: ItemId },
    /// All items were removed.
    Cleared { count: usize },
}

/// Extra data accompanying a status change.
#[derive(Debug, Default)]
pub struct StatusPatch {
    /// Required when moving to `done`.
    pub artifact: Option<EncodedArtifact>,
    /// Failure reason when moving to `failed`.
    pub error: Option<String>,
}

pub struct QueueStore {
    items: RwLock<Vec<ConversionItem>>,
    handles: Arc<HandleRegistry>,
    event_tx: broadcast::Sender<QueueEvent>,
    pending: Notify,
}

impl QueueStore {
    pub fn new() -> Arc<Self> {
        Self::with_handles(Arc::new(HandleRegistry::new()))
    }

    pub fn with_handles(handles: Arc<HandleRegistry>) -> Arc<Self> {
        let (event_tx, _) = broadcast::channel(256);

        Arc::new(Self {
            items: RwLock::new(Vec::new()),
            handles,
            event_tx,
            pending: Notify::new(),
        })
    }

    pub fn subscribe(&self) -> broadcast::Receiver<QueueEvent> {
        self.event_tx.subscribe()
    }

    /// The registry that owns every source and result handle of this store.
    pub fn handles(&self) -> &Arc<HandleRegistry> {
        &self.handles
    }

    fn broadcast(&self, event: QueueEvent) {
        if self.event_tx.send(event).is_err() {
            tracing::debug!("No subscribers for queue event");
        }
    }

    fn signal_pending(&self) {
        self.pending.notify_one();
    }

    /// Resolves once a pending item may be available.
    ///
    /// The signal is latched, so a wake-up raised before the caller starts
    /// waiting is not lost.
    pub async fn pending_available(&self) {
        self.pending.notified().await;
    }

    /// Append admitted items, preserving their order.
    pub fn append(&self, new_items: Vec<ConversionItem>) -> usize {
        if new_items.is_empty() {
            return 0;
        }

        let ids: Vec<ItemId> = new_items.iter().map(|i| i.id).collect();
        let any_pending = new_items.iter().any(|i| i.status == ItemStatus::Pending);
        {
            let mut items = self.items.write();
            items.extend(new_items);
        }

        tracing::debug!("Appended {} items to the queue", ids.len());
        let count = ids.len();
        self.broadcast(QueueEvent::ItemsAdmitted { ids });
        if any_pending {
            self.signal_pending();
        }
        count
    }

    /// Apply a status transition.
    ///
    /// Allowed transitions: `pending -> converting` (only while nothing else
    /// is converting), `converting -> done` (requires a non-empty artifact),
    /// `converting -> failed`, and `done | failed -> pending`.
    pub fn update_status(
        &self,
        id: ItemId,
        status: ItemStatus,
        patch: StatusPatch,
    ) -> Result<ConversionItem> {
        self.transition(id, None, status, patch)
    }

    fn transition(
        &self,
        id: ItemId,
        expected: Option<ItemStatus>,
        status: ItemStatus,
        patch: StatusPatch,
    ) -> Result<ConversionItem> {
        let snapshot = {
            let mut items = self.items.write();
            let converting_elsewhere = items
                .iter()
                .any(|i| i.status == ItemStatus::Converting && i.id != id);
            let item = items
                .iter_mut()
                .find(|i| i.id == id)
                .ok_or_else(|| Error::not_found(id.to_string()))?;

            if let Some(expected) = expected {
                if item.status != expected {
                    return Err(Error::invalid_transition(format!(
                        "item {} is {}, expected {}",
                        id, item.status, expected
                    )));
                }
            }

            match (item.status, status) {
                (ItemStatus::Pending, ItemStatus::Converting) => {
                    if converting_elsewhere {
                        return Err(Error::invalid_transition(
                            "another item is already converting",
                        ));
                    }
                    item.start();
                }
                (ItemStatus::Converting, ItemStatus::Done) => {
                    let artifact = patch
                        .artifact
                        .ok_or_else(|| Error::invalid_input("done requires an artifact"))?;
                    if artifact.bytes.is_empty() {
                        return Err(Error::EmptyOutput);
                    }
                    let byte_size = artifact.bytes.len() as u64;
                    let handle = self.handles.create(artifact.bytes);
                    item.complete(ResultArtifact {
                        handle,
                        byte_size,
                        quality: artifact.quality,
                        format: artifact.format,
                    });
                }
                (ItemStatus::Converting, ItemStatus::Failed) => {
                    let reason = patch.error.as_deref().unwrap_or("conversion failed");
                    item.fail(reason);
                }
                (ItemStatus::Done, ItemStatus::Pending)
                | (ItemStatus::Failed, ItemStatus::Pending) => {
                    if let Some(result) = item.requeue() {
                        self.handles.revoke(result.handle);
                    }
                }
                (from, to) => {
                    return Err(Error::invalid_transition(format!("{from} -> {to}")));
                }
            }

            item.clone()
        };

        self.broadcast(QueueEvent::StatusChanged {
            id,
            status: snapshot.status,
        });
        if snapshot.status == ItemStatus::Pending {
            self.signal_pending();
        }
        Ok(snapshot)
    }

    /// Select the first pending item in insertion order and mark it
    /// converting. Returns `None` if nothing is pending or another item is
    /// already converting.
    ///
    /// A pending item whose source can no longer be fetched is failed on the
    /// spot and selection moves on to the next one.
    pub fn begin_next(&self) -> Option<PendingJob> {
        let mut unreadable = Vec::new();
        let job = {
            let mut items = self.items.write();
            if items.iter().any(|i| i.status == ItemStatus::Converting) {
                tracing::debug!("An item is already converting; not selecting another");
                return None;
            }

            let mut job = None;
            for item in items.iter_mut().filter(|i| i.status == ItemStatus::Pending) {
                match self.handles.fetch(item.source_handle) {
                    Ok(source) => {
                        item.start();
                        job = Some(PendingJob {
                            id: item.id,
                            source_name: item.source_name.clone(),
                            source,
                            quality: item.quality,
                        });
                        break;
                    }
                    Err(e) => {
                        tracing::warn!("Source of {} is unavailable: {}", item.id, e);
                        item.fail(&e.to_string());
                        unreadable.push(item.id);
                    }
                }
            }
            job
        };

        for id in unreadable {
            self.broadcast(QueueEvent::StatusChanged {
                id,
                status: ItemStatus::Failed,
            });
        }

        let job = job?;
        self.broadcast(QueueEvent::StatusChanged {
            id: job.id,
            status: ItemStatus::Converting,
        });
        Some(job)
    }

    /// Record a successful encode.
    ///
    /// Fails with `NotFound` if the item was removed while converting; the
    /// artifact is then dropped without ever being registered.
    pub fn complete(&self, id: ItemId, artifact: EncodedArtifact) -> Result<ConversionItem> {
        self.update_status(
            id,
            ItemStatus::Done,
            StatusPatch {
                artifact: Some(artifact),
                error: None,
            },
        )
    }

    /// Record a failed encode.
    pub fn fail(&self, id: ItemId, reason: &str) -> Result<ConversionItem> {
        self.update_status(
            id,
            ItemStatus::Failed,
            StatusPatch {
                artifact: None,
                error: Some(reason.to_string()),
            },
        )
    }

    /// Re-queue a failed item. This is the only way out of `failed`.
    pub fn retry(&self, id: ItemId) -> Result<ConversionItem> {
        self.transition(
            id,
            Some(ItemStatus::Failed),
            ItemStatus::Pending,
            StatusPatch::default(),
        )
    }

    /// Discard a done item's artifact and queue it again at its current
    /// quality.
    pub fn reconvert(&self, id: ItemId) -> Result<ConversionItem> {
        self.transition(
            id,
            Some(ItemStatus::Done),
            ItemStatus::Pending,
            StatusPatch::default(),
        )
    }

    /// Change an item's target quality.
    ///
    /// A `done` item whose quality actually changes goes back to `pending`
    /// and loses its artifact. A `converting` item keeps converting under the
    /// old value; it lands in `done` with an artifact that reports itself
    /// stale until it is re-converted.
    pub fn set_quality(&self, id: ItemId, value: f32) -> Result<ConversionItem> {
        let quality = Quality::new(value);

        let (snapshot, changed, requeued) = {
            let mut items = self.items.write();
            let item = items
                .iter_mut()
                .find(|i| i.id == id)
                .ok_or_else(|| Error::not_found(id.to_string()))?;

            let changed = item.quality != quality;
            item.quality = quality;

            let mut requeued = false;
            if changed && item.status == ItemStatus::Done {
                if let Some(result) = item.requeue() {
                    self.handles.revoke(result.handle);
                }
                requeued = true;
            } else if changed && item.status == ItemStatus::Converting {
                tracing::debug!(
                    "Quality of {} changed to {} while converting; artifact will be stale",
                    id,
                    quality
                );
            }

            (item.clone(), changed, requeued)
        };

        if changed {
            self.broadcast(QueueEvent::QualityChanged { id, quality });
        }
        if requeued {
            self.broadcast(QueueEvent::StatusChanged {
                id,
                status: ItemStatus::Pending,
            });
            self.signal_pending();
        }
        Ok(snapshot)
    }

    /// Apply one quality to every item. Returns how many items changed.
    pub fn set_quality_all(&self, value: f32) -> usize {
        let ids: Vec<ItemId> = self.items.read().iter().map(|i| i.id).collect();
        let quality = Quality::new(value);

        let mut changed = 0;
        for id in ids {
            let before = self.get(id).map(|i| i.quality);
            if self.set_quality(id, value).is_ok() && before != Some(quality) {
                changed += 1;
            }
        }
        changed
    }

    /// Remove an item and release its handles.
    ///
    /// Returns `false` if the item is unknown, so repeated removal never
    /// releases anything twice.
    pub fn remove(&self, id: ItemId) -> bool {
        let removed = {
            let mut items = self.items.write();
            match items.iter().position(|i| i.id == id) {
                Some(pos) => items.remove(pos),
                None => return false,
            }
        };

        self.release(&removed);
        self.broadcast(QueueEvent::ItemRemoved { id });
        true
    }

    /// Remove every item. Returns the number removed.
    pub fn clear(&self) -> usize {
        let removed: Vec<ConversionItem> = {
            let mut items = self.items.write();
            std::mem::take(&mut *items)
        };

        for item in &removed {
            self.release(item);
        }

        let count = removed.len();
        self.broadcast(QueueEvent::Cleared { count });
        count
    }

    fn release(&self, item: &ConversionItem) {
        self.handles.revoke(item.source_handle);
        if let Some(result) = item.result {
            self.handles.revoke(result.handle);
        }
    }

    /// Snapshot of one item.
    pub fn get(&self, id: ItemId) -> Option<ConversionItem> {
        self.items.read().iter().find(|i| i.id == id).cloned()
    }

    /// Snapshot of all items in insertion order.
    pub fn items(&self) -> Vec<ConversionItem> {
        self.items.read().clone()
    }

    /// Snapshot of all `done` items in insertion order.
    pub fn done_items(&self) -> Vec<ConversionItem> {
        self.items
            .read()
            .iter()
            .filter(|i| i.status == ItemStatus::Done)
            .cloned()
            .collect()
    }

    /// Read the artifact bytes of a `done` item through its result handle.
    pub fn fetch_result(&self, id: ItemId) -> Result<(ConversionItem, bytes::Bytes)> {
        let item = self.get(id).ok_or_else(|| Error::not_found(id.to_string()))?;
        let result = item.result.ok_or_else(|| {
            Error::invalid_transition(format!("item {} is {}, not done", id, item.status))
        })?;
        let bytes = self.handles.fetch(result.handle)?;
        Ok((item, bytes))
    }

    pub fn len(&self) -> usize {
        self.items.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.read().is_empty()
    }

    pub fn count_with_status(&self, status: ItemStatus) -> usize {
        self.items.read().iter().filter(|i| i.status == status).count()
    }

    pub fn summary(&self) -> QueueSummary {
        let items = self.items.read();
        let mut summary = QueueSummary {
            total: items.len(),
            ..Default::default()
        };

        for item in items.iter() {
            match item.status {
                ItemStatus::Pending => summary.pending += 1,
                ItemStatus::Converting => summary.converting += 1,
                ItemStatus::Failed => summary.failed += 1,
                ItemStatus::Done => {
                    summary.done += 1;
                    summary.source_bytes += item.source_byte_size;
                    if let Some(result) = item.result {
                        summary.result_bytes += result.byte_size;
                    }
                }
            }
        }

        summary
    }
}
