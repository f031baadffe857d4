use crate::handles::BlobHandle;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use webpforge_common::{ItemId, ItemStatus, Quality, TargetFormat};

/// One user-supplied image and its derived artifact.
#[derive(Debug, Clone, Serialize)]
pub struct ConversionItem {
    pub id: ItemId,
    pub source_name: String,
    pub source_mime: String,
    pub source_byte_size: u64,
    pub source_handle: BlobHandle,
    pub quality: Quality,
    pub status: ItemStatus,
    pub result: Option<ResultArtifact>,
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
}

/// Reference to an encoded output. Only present while the item is `done`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ResultArtifact {
    pub handle: BlobHandle,
    pub byte_size: u64,
    /// Quality the artifact was actually encoded at.
    pub quality: Quality,
    pub format: TargetFormat,
}

/// Output of one successful encode, before it is registered in the store.
#[derive(Debug, Clone)]
pub struct EncodedArtifact {
    pub bytes: Bytes,
    pub quality: Quality,
    pub format: TargetFormat,
}

/// Work handed to the encoder surface when an item starts converting.
#[derive(Debug, Clone)]
pub struct PendingJob {
    pub id: ItemId,
    pub source_name: String,
    pub source: Bytes,
    pub quality: Quality,
}

impl ConversionItem {
    pub fn new(
        source_name: String,
        source_mime: String,
        source_byte_size: u64,
        source_handle: BlobHandle,
        quality: Quality,
    ) -> Self {
        Self {
            id: ItemId::new(),
            source_name,
            source_mime,
            source_byte_size,
            source_handle,
            quality,
            status: ItemStatus::Pending,
            result: None,
            error: None,
            created_at: Utc::now(),
            started_at: None,
            completed_at: None,
        }
    }

    pub fn start(&mut self) {
        self.status = ItemStatus::Converting;
        self.error = None;
        self.started_at = Some(Utc::now());
        self.completed_at = None;
    }

    pub fn complete(&mut self, result: ResultArtifact) {
        self.status = ItemStatus::Done;
        self.result = Some(result);
        self.completed_at = Some(Utc::now());
    }

    pub fn fail(&mut self, error: &str) {
        self.status = ItemStatus::Failed;
        self.result = None;
        self.error = Some(error.to_string());
        self.completed_at = Some(Utc::now());
    }

    /// Put the item back to `pending`, handing back any artifact it held so
    /// the caller can release it.
    pub fn requeue(&mut self) -> Option<ResultArtifact> {
        self.status = ItemStatus::Pending;
        self.error = None;
        self.started_at = None;
        self.completed_at = None;
        self.result.take()
    }

    /// `done`, but the target quality was edited while the encode was in
    /// flight, so the artifact reflects an older value.
    pub fn is_stale(&self) -> bool {
        match (self.status, &self.result) {
            (ItemStatus::Done, Some(result)) => result.quality != self.quality,
            _ => false,
        }
    }

    /// Bytes saved by the artifact; negative when the output is larger.
    pub fn saved_bytes(&self) -> Option<i64> {
        self.result
            .as_ref()
            .map(|r| self.source_byte_size as i64 - r.byte_size as i64)
    }
}

/// Counts and the savings summary over the whole queue.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueueSummary {
    pub total: usize,
    pub pending: usize,
    pub converting: usize,
    pub done: usize,
    pub failed: usize,
    /// Source bytes of `done` items only.
    pub source_bytes: u64,
    pub result_bytes: u64,
}

impl QueueSummary {
    pub fn saved_bytes(&self) -> i64 {
        self.source_bytes as i64 - self.result_bytes as i64
    }

    pub fn saved_percent(&self) -> f64 {
        if self.source_bytes == 0 {
            return 0.0;
        }
        (self.saved_bytes() as f64 / self.source_bytes as f64) * 100.0
    }

    /// Fraction of items that have reached a terminal status.
    pub fn progress(&self) -> f32 {
        if self.total == 0 {
            return 0.0;
        }
        (self.done + self.failed) as f32 / self.total as f32
    }
}
