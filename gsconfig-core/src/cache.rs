//! Short-lived cache of GET responses.
//!
//! A burst of catalog reads (resolving a resource across every workspace, for
//! example) tends to request the same listings again and again. Responses are kept
//! for a few seconds and dropped wholesale whenever the catalog writes anything.

use std::cell::Cell;
use std::collections::HashMap;
use std::fmt::Debug;
use std::rc::Rc;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::trace;

/// How long a cached response stays valid by default.
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(5);

/// Source of the current time for cache expiry.
pub trait Clock: Debug {
    fn now(&self) -> Instant;
}

/// Production clock reading [`Instant::now`].
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// Test clock that only moves when told to. Clones share the same time.
#[derive(Debug, Clone)]
pub struct ManualClock(Rc<Cell<Instant>>);

impl Default for ManualClock {
    fn default() -> Self {
        Self(Rc::new(Cell::new(Instant::now())))
    }
}

impl ManualClock {
    pub fn advance(&self, by: Duration) {
        self.0.set(self.0.get() + by);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        self.0.get()
    }
}

/// Cached body of a GET response.
pub type CachedBody = Arc<[u8]>;

/// URL-keyed response cache with a fixed time-to-live.
#[derive(Debug)]
pub struct ResponseCache {
    entries: HashMap<String, (Instant, CachedBody)>,
    ttl: Duration,
    clock: Box<dyn Clock>,
}

impl Default for ResponseCache {
    fn default() -> Self {
        Self::new(DEFAULT_CACHE_TTL, Box::new(SystemClock))
    }
}

impl ResponseCache {
    #[must_use]
    pub fn new(ttl: Duration, clock: Box<dyn Clock>) -> Self {
        Self {
            entries: HashMap::new(),
            ttl,
            clock,
        }
    }

    #[must_use]
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Returns the body stored for `url` if it is younger than the TTL.
    #[must_use]
    pub fn get(&self, url: &str) -> Option<CachedBody> {
        let hit = self
            .entries
            .get(url)
            .filter(|(stored, _)| self.clock.now().saturating_duration_since(*stored) < self.ttl)
            .map(|(_, body)| body.clone());
        trace!(
            "Cache {typ} for {url} with {count} entries",
            typ = if hit.is_some() { "HIT" } else { "MISS" },
            count = self.entries.len()
        );
        hit
    }

    pub fn put(&mut self, url: impl Into<String>, body: CachedBody) {
        self.entries.insert(url.into(), (self.clock.now(), body));
    }

    /// Drop every entry. Called after each write to the server.
    pub fn invalidate_all(&mut self) {
        if !self.entries.is_empty() {
            trace!("Invalidating {} cached responses", self.entries.len());
        }
        self.entries.clear();
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
