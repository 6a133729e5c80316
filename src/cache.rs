//! Single-slot cache for the rendered feed document.

use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use tokio::sync::RwLock;
use tracing::debug;

/// Source of the current time, swappable so tests can move it forward.
pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// A clock that only moves when told to.
#[derive(Debug)]
pub struct ManualClock {
    base: Instant,
    offset: Mutex<Duration>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self {
            base: Instant::now(),
            offset: Mutex::new(Duration::ZERO),
        }
    }

    pub fn advance(&self, by: Duration) {
        let mut offset = self.offset.lock().unwrap_or_else(|e| e.into_inner());
        *offset += by;
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        let offset = *self.offset.lock().unwrap_or_else(|e| e.into_inner());
        self.base + offset
    }
}

#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub document: String,
    pub written_at: Instant,
}

pub struct FeedCache {
    ttl: Duration,
    clock: Arc<dyn Clock>,
    slot: RwLock<Option<CacheEntry>>,
}

impl FeedCache {
    pub fn new(ttl: Duration) -> Self {
        Self::with_clock(ttl, Arc::new(SystemClock))
    }

    pub fn with_clock(ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            ttl,
            clock,
            slot: RwLock::new(None),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// The cached document, if one was written less than `ttl` ago
    pub async fn get(&self) -> Option<String> {
        let slot = self.slot.read().await;
        let entry = slot.as_ref()?;
        let age = self.clock.now().saturating_duration_since(entry.written_at);

        if age < self.ttl {
            debug!("Feed cache hit, age {:?}", age);
            Some(entry.document.clone())
        } else {
            debug!("Feed cache expired, age {:?}", age);
            None
        }
    }

    /// Replace the slot with a freshly rendered document
    pub async fn store(&self, document: String) {
        let entry = CacheEntry {
            document,
            written_at: self.clock.now(),
        };
        *self.slot.write().await = Some(entry);
    }

    /// Time since the slot was last written, expired or not
    pub async fn age(&self) -> Option<Duration> {
        let slot = self.slot.read().await;
        slot.as_ref()
            .map(|entry| self.clock.now().saturating_duration_since(entry.written_at))
    }

    pub async fn entry(&self) -> Option<CacheEntry> {
        self.slot.read().await.clone()
    }
}
