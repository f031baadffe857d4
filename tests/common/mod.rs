//! Shared test harness for integration tests.
//!
//! Provides [`FakeSurface`], an encoder surface that records how it is used,
//! and [`TestHarness`], a [`Session`] wired to it with in-memory preferences.

#![allow(dead_code)]

use std::io::Cursor;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::Mutex;
use tokio::sync::{broadcast, Notify};

use webpforge::config::Config;
use webpforge::conversion::EncoderSurface;
use webpforge::ingest::Candidate;
use webpforge::notifications::Notification;
use webpforge::preferences::PreferenceStore;
use webpforge::session::Session;
use webpforge::state::EncodedArtifact;
use webpforge_common::{Error, ItemId, ItemStatus, Quality, Result, TargetFormat};

/// Sources starting with this prefix fail to "decode".
pub const CORRUPT_PREFIX: &[u8] = b"BAD";

/// Encoder surface double.
///
/// Output size is `percent * 10` bytes so tests can tell which quality an
/// artifact was encoded at.
#[derive(Default)]
pub struct FakeSurface {
    active: AtomicUsize,
    max_active: AtomicUsize,
    seen: Mutex<Vec<Bytes>>,
    delay: Duration,
    empty_output: bool,
    mislabeled: bool,
    hold: Option<Arc<Notify>>,
}

impl FakeSurface {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_delay(delay: Duration) -> Self {
        Self {
            delay,
            ..Self::default()
        }
    }

    pub fn empty_output() -> Self {
        Self {
            empty_output: true,
            ..Self::default()
        }
    }

    /// Claims WebP but labels every artifact as JPEG.
    pub fn mislabeled() -> Self {
        Self {
            mislabeled: true,
            ..Self::default()
        }
    }

    /// Every encode waits until `release` is notified once.
    pub fn held(release: Arc<Notify>) -> Self {
        Self {
            hold: Some(release),
            ..Self::default()
        }
    }

    /// Highest number of encodes that were ever running at once.
    pub fn max_active(&self) -> usize {
        self.max_active.load(Ordering::SeqCst)
    }

    /// Sources in the order they were submitted.
    pub fn seen(&self) -> Vec<Bytes> {
        self.seen.lock().clone()
    }
}

#[async_trait]
impl EncoderSurface for FakeSurface {
    fn format(&self) -> TargetFormat {
        TargetFormat::WebP
    }

    async fn encode(&self, source: Bytes, quality: Quality) -> Result<EncodedArtifact> {
        let active = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_active.fetch_max(active, Ordering::SeqCst);
        self.seen.lock().push(source.clone());

        if let Some(release) = &self.hold {
            release.notified().await;
        }
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.active.fetch_sub(1, Ordering::SeqCst);

        if source.starts_with(CORRUPT_PREFIX) {
            return Err(Error::decode("unrecognized image data"));
        }

        let bytes = if self.empty_output {
            Bytes::new()
        } else {
            Bytes::from(vec![0u8; usize::from(quality.percent()) * 10])
        };

        let format = if self.mislabeled {
            TargetFormat::Jpeg
        } else {
            TargetFormat::WebP
        };

        Ok(EncodedArtifact {
            bytes,
            quality,
            format,
        })
    }
}

/// A [`Session`] on top of a [`FakeSurface`].
pub struct TestHarness {
    pub session: Session,
    pub surface: Arc<FakeSurface>,
    pub notifications: broadcast::Receiver<Notification>,
}

impl TestHarness {
    pub fn new() -> Self {
        Self::with_surface(Config::default(), FakeSurface::new())
    }

    pub fn with_config(config: Config) -> Self {
        Self::with_surface(config, FakeSurface::new())
    }

    pub fn with_surface(config: Config, surface: FakeSurface) -> Self {
        let surface = Arc::new(surface);
        let session = Session::new(
            config,
            surface.clone(),
            Arc::new(PreferenceStore::in_memory()),
        );
        let notifications = session.notifier().subscribe();
        Self {
            session,
            surface,
            notifications,
        }
    }

    /// Admit `names` as tiny declared PNGs and return their ids in order.
    pub fn admit(&self, names: &[&str]) -> Vec<ItemId> {
        let batch = names.iter().map(|name| fake_png(name)).collect();
        self.session.add_files(batch).admitted
    }

    /// Everything notified since the last call.
    pub fn drain_notifications(&mut self) -> Vec<Notification> {
        let mut out = Vec::new();
        while let Ok(n) = self.notifications.try_recv() {
            out.push(n);
        }
        out
    }

    pub fn status(&self, id: ItemId) -> ItemStatus {
        self.session
            .queue()
            .get(id)
            .map(|item| item.status)
            .expect("item exists")
    }

    /// Poll until `id` reaches `status`, failing after a few seconds.
    pub async fn wait_for(&self, id: ItemId, status: ItemStatus) {
        tokio::time::timeout(Duration::from_secs(5), async {
            while self.status(id) != status {
                tokio::time::sleep(Duration::from_millis(2)).await;
            }
        })
        .await
        .unwrap_or_else(|_| panic!("item {id} never reached {status}"));
    }

    /// Poll until no item is pending or converting.
    pub async fn wait_idle(&self) {
        tokio::time::timeout(Duration::from_secs(5), async {
            loop {
                let summary = self.session.queue().summary();
                if summary.pending == 0 && summary.converting == 0 {
                    break;
                }
                tokio::time::sleep(Duration::from_millis(2)).await;
            }
        })
        .await
        .expect("queue never became idle");
    }
}

/// A candidate that declares `image/png` but carries placeholder bytes.
pub fn fake_png(name: &str) -> Candidate {
    Candidate::new(name, Some("image/png".to_string()), name.as_bytes().to_vec())
}

/// A candidate whose bytes the fake surface rejects.
pub fn corrupt_png(name: &str) -> Candidate {
    let mut bytes = CORRUPT_PREFIX.to_vec();
    bytes.extend_from_slice(name.as_bytes());
    Candidate::new(name, Some("image/png".to_string()), bytes)
}

/// A declared image of exactly `len` bytes.
pub fn sized_png(name: &str, len: usize) -> Candidate {
    Candidate::new(name, Some("image/png".to_string()), vec![0u8; len])
}

/// Encode a real gradient PNG.
pub fn png_bytes(width: u32, height: u32) -> Vec<u8> {
    let img = image::RgbaImage::from_fn(width, height, |x, y| {
        image::Rgba([(x * 7 % 256) as u8, (y * 5 % 256) as u8, ((x + y) % 256) as u8, 255])
    });
    let mut out = Cursor::new(Vec::new());
    img.write_to(&mut out, image::ImageFormat::Png)
        .expect("encode png fixture");
    out.into_inner()
}
