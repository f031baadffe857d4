//! Revocable references to in-memory blobs.
//!
//! A [`BlobHandle`] plays the role of an object URL: it is minted for a blob,
//! used to read the blob back, and revoked when the owner goes away. Revoking
//! is idempotent; only the first call releases anything.

use bytes::Bytes;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use webpforge_common::{Error, Result};

/// Opaque reference to a blob held by a [`HandleRegistry`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BlobHandle(u64);

impl std::fmt::Display for BlobHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "blob:{}", self.0)
    }
}

/// Table of live blob handles.
#[derive(Default)]
pub struct HandleRegistry {
    next_id: AtomicU64,
    blobs: RwLock<HashMap<BlobHandle, Bytes>>,
    created: AtomicU64,
    released: AtomicU64,
}

impl HandleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mint a new handle for `bytes`. Handles are never reused.
    pub fn create(&self, bytes: Bytes) -> BlobHandle {
        let handle = BlobHandle(self.next_id.fetch_add(1, Ordering::Relaxed) + 1);
        self.blobs.write().insert(handle, bytes);
        self.created.fetch_add(1, Ordering::Relaxed);
        handle
    }

    /// Read the blob behind a handle.
    pub fn fetch(&self, handle: BlobHandle) -> Result<Bytes> {
        self.blobs
            .read()
            .get(&handle)
            .cloned()
            .ok_or_else(|| Error::HandleRevoked(handle.to_string()))
    }

    /// Release a handle. Returns `false` if it was already released.
    pub fn revoke(&self, handle: BlobHandle) -> bool {
        let removed = self.blobs.write().remove(&handle).is_some();
        if removed {
            self.released.fetch_add(1, Ordering::Relaxed);
        } else {
            tracing::debug!("Handle {} already released", handle);
        }
        removed
    }

    pub fn is_live(&self, handle: BlobHandle) -> bool {
        self.blobs.read().contains_key(&handle)
    }

    /// Number of handles currently live.
    pub fn live_count(&self) -> usize {
        self.blobs.read().len()
    }

    /// Total handles minted over the registry's lifetime.
    pub fn created_count(&self) -> u64 {
        self.created.load(Ordering::Relaxed)
    }

    /// Total successful releases over the registry's lifetime.
    pub fn released_count(&self) -> u64 {
        self.released.load(Ordering::Relaxed)
    }
}
