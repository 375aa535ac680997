//! Rendered-page cache with stale-while-revalidate semantics.
//!
//! Each route key maps to the last rendered artifact, when it was produced
//! and how long it stays fresh. Reads never wait on a regeneration when an
//! artifact exists; at most one generation per key is in flight.

use std::{
    collections::HashMap,
    future::Future,
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
    time::Duration,
};

use chrono::{DateTime, Utc};
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use tokio::{sync::watch, time::Instant};
use tracing::{debug, info, warn};

use crate::pages::GenerateError;

/// Most not-found pages and unreported failures kept at once
pub const DEFAULT_NEGATIVE_CAPACITY: usize = 1024;

/// What a rendered artifact represents
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactKind {
    Ready,
    NotFound,
}

/// A rendered page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    pub kind: ArtifactKind,
    pub html: Arc<str>,
}

impl Artifact {
    pub fn ready(html: impl Into<Arc<str>>) -> Self {
        Self {
            kind: ArtifactKind::Ready,
            html: html.into(),
        }
    }

    pub fn not_found(html: impl Into<Arc<str>>) -> Self {
        Self {
            kind: ArtifactKind::NotFound,
            html: html.into(),
        }
    }
}

/// Behaviour on a request for a key that was never generated
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FallbackMode {
    /// Serve a loading shell and generate in the background
    #[default]
    Shell,
    /// Wait for the generation to finish
    Blocking,
}

/// How a response was obtained from the cache
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheStatus {
    Hit,
    Stale,
    Miss,
    Fallback,
}

impl CacheStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CacheStatus::Hit => "HIT",
            CacheStatus::Stale => "STALE",
            CacheStatus::Miss => "MISS",
            CacheStatus::Fallback => "FALLBACK",
        }
    }
}

/// Result of a cache read
#[derive(Debug, Clone)]
pub enum Served {
    Page {
        artifact: Artifact,
        status: CacheStatus,
        generated_at: DateTime<Utc>,
        revalidate: Duration,
    },
    /// Nothing generated yet; a generation is running
    Fallback,
}

impl Served {
    pub fn status(&self) -> CacheStatus {
        match self {
            Served::Page { status, .. } => *status,
            Served::Fallback => CacheStatus::Fallback,
        }
    }
}

#[derive(Debug, Clone)]
struct Generated {
    artifact: Artifact,
    generated_at: DateTime<Utc>,
}

type Outcome = Option<Result<Generated, Arc<GenerateError>>>;

struct Entry {
    artifact: Artifact,
    generated_at: DateTime<Utc>,
    refreshed_at: Instant,
    revalidate: Duration,
    /// Store order, used to evict the oldest not-found pages first
    stored: u64,
}

impl Entry {
    fn is_fresh(&self, now: Instant) -> bool {
        now.saturating_duration_since(self.refreshed_at) < self.revalidate
    }
}

struct Failure {
    error: Arc<GenerateError>,
    expires_at: Instant,
}

#[derive(Default)]
struct Flights {
    running: HashMap<String, watch::Receiver<Outcome>>,
    /// First-generation failures nobody waited for, not yet reported
    failed: HashMap<String, Failure>,
}

impl Flights {
    /// Record a failure, dropping expired ones and the oldest past `capacity`
    fn record_failure(&mut self, key: String, failure: Failure, capacity: usize) {
        let now = Instant::now();
        self.failed.retain(|_, f| f.expires_at > now);
        while self.failed.len() >= capacity.max(1) {
            let Some(oldest) = self
                .failed
                .iter()
                .min_by_key(|(_, f)| f.expires_at)
                .map(|(k, _)| k.clone())
            else {
                break;
            };
            self.failed.remove(&oldest);
        }
        self.failed.insert(key, failure);
    }

    fn take_failure(&mut self, key: &str) -> Option<Arc<GenerateError>> {
        let failure = self.failed.remove(key)?;
        (failure.expires_at > Instant::now()).then_some(failure.error)
    }
}

struct Inner {
    entries: RwLock<HashMap<String, Entry>>,
    flights: Mutex<Flights>,
    negative_capacity: usize,
    stored: AtomicU64,
}

impl Inner {
    /// Drop expired not-found pages, then the oldest ones past the capacity
    fn evict_not_found(&self, entries: &mut HashMap<String, Entry>) {
        let now = Instant::now();
        entries.retain(|_, entry| {
            entry.artifact.kind != ArtifactKind::NotFound || entry.is_fresh(now)
        });

        let mut negatives: Vec<(u64, String)> = entries
            .iter()
            .filter(|(_, entry)| entry.artifact.kind == ArtifactKind::NotFound)
            .map(|(key, entry)| (entry.stored, key.clone()))
            .collect();
        if negatives.len() <= self.negative_capacity {
            return;
        }
        negatives.sort_unstable();
        let excess = negatives.len() - self.negative_capacity;
        for (_, key) in negatives.into_iter().take(excess) {
            entries.remove(&key);
        }
        debug!(evicted = excess, "Evicted not-found pages");
    }
}

/// Shared page cache; clones share the same store
#[derive(Clone)]
pub struct PageCache {
    inner: Arc<Inner>,
}

impl Default for PageCache {
    fn default() -> Self {
        Self::with_negative_capacity(DEFAULT_NEGATIVE_CAPACITY)
    }
}

impl PageCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// A cache keeping at most `capacity` not-found pages and at most
    /// `capacity` unreported failures
    pub fn with_negative_capacity(capacity: usize) -> Self {
        Self {
            inner: Arc::new(Inner {
                entries: RwLock::default(),
                flights: Mutex::default(),
                negative_capacity: capacity,
                stored: AtomicU64::new(0),
            }),
        }
    }

    pub fn len(&self) -> usize {
        self.inner.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The cached artifact for `key`, fresh or not
    pub fn peek(&self, key: &str) -> Option<Artifact> {
        self.inner
            .entries
            .read()
            .get(key)
            .map(|entry| entry.artifact.clone())
    }

    /// Number of cached not-found pages
    pub fn not_found_len(&self) -> usize {
        self.inner
            .entries
            .read()
            .values()
            .filter(|entry| entry.artifact.kind == ArtifactKind::NotFound)
            .count()
    }

    /// Whether a generation for `key` is running
    pub fn is_generating(&self, key: &str) -> bool {
        self.inner.flights.lock().running.contains_key(key)
    }

    /// Generate `key` now and wait for the result, joining a running
    /// generation if there is one.
    pub async fn prerender<F, Fut>(
        &self,
        key: &str,
        revalidate: Duration,
        generate: F,
    ) -> Result<Artifact, Arc<GenerateError>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Artifact, GenerateError>> + Send + 'static,
    {
        let rx = self.start_generation(key, revalidate, generate, true);
        match rx {
            Some(rx) => Self::wait(rx).await.map(|generated| generated.artifact),
            None => self.peek(key).ok_or(Arc::new(GenerateError::Interrupted)),
        }
    }

    /// Read `key`, regenerating in the background when stale.
    ///
    /// - fresh artifact: served as `Hit`
    /// - stale artifact: served as `Stale`, one regeneration is started
    /// - nothing cached: `Fallback` in shell mode, or wait and serve as `Miss`
    ///
    /// A first generation that failed while nobody waited for it is returned
    /// as an error once, within the revalidate interval, after which the next
    /// read tries again.
    pub async fn serve<F, Fut>(
        &self,
        key: &str,
        revalidate: Duration,
        fallback: FallbackMode,
        generate: F,
    ) -> Result<Served, Arc<GenerateError>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Artifact, GenerateError>> + Send + 'static,
    {
        if let Some(served) = self.lookup(key) {
            if served.status() == CacheStatus::Stale {
                debug!(key, "Serving stale page");
                self.start_generation(key, revalidate, generate, false);
            } else {
                debug!(key, "Cache hit");
            }
            return Ok(served);
        }

        if let Some(error) = self.inner.flights.lock().take_failure(key) {
            return Err(error);
        }

        let Some(rx) = self.start_generation(key, revalidate, generate, false) else {
            // Another generation stored a fresh artifact in the meantime
            return Ok(self.lookup(key).unwrap_or(Served::Fallback));
        };

        match fallback {
            FallbackMode::Shell => Ok(Served::Fallback),
            FallbackMode::Blocking => {
                let generated = Self::wait(rx).await?;
                Ok(Served::Page {
                    artifact: generated.artifact,
                    status: CacheStatus::Miss,
                    generated_at: generated.generated_at,
                    revalidate,
                })
            }
        }
    }

    #[cfg(test)]
    fn failed_len(&self) -> usize {
        self.inner.flights.lock().failed.len()
    }

    fn lookup(&self, key: &str) -> Option<Served> {
        let now = Instant::now();
        let entries = self.inner.entries.read();
        entries.get(key).map(|entry| Served::Page {
            artifact: entry.artifact.clone(),
            status: if entry.is_fresh(now) {
                CacheStatus::Hit
            } else {
                CacheStatus::Stale
            },
            generated_at: entry.generated_at,
            revalidate: entry.revalidate,
        })
    }

    /// Spawn a generation for `key` unless one is running (then join it) or a
    /// fresh artifact exists (then `None`). `force` ignores freshness.
    fn start_generation<F, Fut>(
        &self,
        key: &str,
        revalidate: Duration,
        generate: F,
        force: bool,
    ) -> Option<watch::Receiver<Outcome>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Artifact, GenerateError>> + Send + 'static,
    {
        let mut flights = self.inner.flights.lock();
        if let Some(rx) = flights.running.get(key) {
            return Some(rx.clone());
        }
        if !force {
            let now = Instant::now();
            if let Some(entry) = self.inner.entries.read().get(key) {
                if entry.is_fresh(now) {
                    return None;
                }
            }
        }

        let (tx, rx) = watch::channel(None);
        flights.running.insert(key.to_string(), rx.clone());
        drop(flights);

        let inner = self.inner.clone();
        let key = key.to_string();
        let generation = generate();

        tokio::spawn(async move {
            let outcome = match generation.await {
                Ok(artifact) => {
                    let generated_at = Utc::now();
                    let mut entries = inner.entries.write();
                    entries.insert(
                        key.clone(),
                        Entry {
                            artifact: artifact.clone(),
                            generated_at,
                            refreshed_at: Instant::now(),
                            revalidate,
                            stored: inner.stored.fetch_add(1, Ordering::Relaxed),
                        },
                    );
                    if artifact.kind == ArtifactKind::NotFound {
                        inner.evict_not_found(&mut entries);
                    }
                    drop(entries);
                    info!(key = %key, kind = ?artifact.kind, "Stored generated page");
                    Ok(Generated {
                        artifact,
                        generated_at,
                    })
                }
                Err(error) => {
                    warn!(key = %key, error = %error, "Page generation failed");
                    Err(Arc::new(error))
                }
            };

            {
                let mut flights = inner.flights.lock();
                flights.running.remove(&key);
                match &outcome {
                    Ok(_) => {
                        flights.failed.remove(&key);
                    }
                    Err(error) => {
                        // Waiting readers get the error directly. With a previous
                        // artifact the stale copy keeps being served.
                        if tx.receiver_count() == 0 && !inner.entries.read().contains_key(&key) {
                            flights.record_failure(
                                key.clone(),
                                Failure {
                                    error: error.clone(),
                                    expires_at: Instant::now() + revalidate,
                                },
                                inner.negative_capacity,
                            );
                        }
                    }
                }
            }

            let _ = tx.send(Some(outcome));
        });

        Some(rx)
    }

    async fn wait(mut rx: watch::Receiver<Outcome>) -> Result<Generated, Arc<GenerateError>> {
        let outcome = match rx.wait_for(|outcome| outcome.is_some()).await {
            Ok(outcome) => outcome.clone(),
            Err(_) => None,
        };
        outcome.unwrap_or(Err(Arc::new(GenerateError::Interrupted)))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use tokio::sync::Notify;

    use super::*;

    const INTERVAL: Duration = Duration::from_secs(3600);

    /// Generator that counts calls and optionally waits on a gate
    #[derive(Clone, Default)]
    struct Counter {
        calls: Arc<AtomicUsize>,
        gate: Option<Arc<Notify>>,
    }

    impl Counter {
        fn gated() -> (Self, Arc<Notify>) {
            let gate = Arc::new(Notify::new());
            (
                Self {
                    calls: Arc::default(),
                    gate: Some(gate.clone()),
                },
                gate,
            )
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }

        fn generate(
            &self,
        ) -> impl FnOnce() -> std::pin::Pin<
            Box<dyn Future<Output = Result<Artifact, GenerateError>> + Send>,
        > + use<> {
            let calls = self.calls.clone();
            let gate = self.gate.clone();
            move || {
                Box::pin(async move {
                    let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
                    if let Some(gate) = gate {
                        gate.notified().await;
                    }
                    Ok(Artifact::ready(format!("v{n}")))
                })
            }
        }
    }

    async fn settle() {
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_prerendered_page_is_a_hit() {
        let cache = PageCache::new();
        let counter = Counter::default();

        cache
            .prerender("/product/a", INTERVAL, counter.generate())
            .await
            .unwrap();
        let served = cache
            .serve("/product/a", INTERVAL, FallbackMode::Shell, counter.generate())
            .await
            .unwrap();

        assert_eq!(served.status(), CacheStatus::Hit);
        assert_eq!(counter.calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stale_read_serves_old_and_regenerates_once() {
        let cache = PageCache::new();
        let (counter, gate) = Counter::gated();

        let first = tokio::spawn({
            let cache = cache.clone();
            let generate = counter.generate();
            async move { cache.prerender("/", INTERVAL, generate).await }
        });
        settle().await;
        gate.notify_one();
        first.await.unwrap().unwrap();

        tokio::time::advance(INTERVAL + Duration::from_secs(1)).await;

        // Many concurrent stale readers: all get v1 immediately
        for _ in 0..5 {
            let served = cache
                .serve("/", INTERVAL, FallbackMode::Shell, counter.generate())
                .await
                .unwrap();
            match served {
                Served::Page {
                    artifact, status, ..
                } => {
                    assert_eq!(status, CacheStatus::Stale);
                    assert_eq!(&*artifact.html, "v1");
                }
                Served::Fallback => panic!("stale page expected"),
            }
        }
        settle().await;
        assert_eq!(counter.calls(), 2);
        assert!(cache.is_generating("/"));

        gate.notify_one();
        settle().await;
        assert!(!cache.is_generating("/"));

        let served = cache
            .serve("/", INTERVAL, FallbackMode::Shell, counter.generate())
            .await
            .unwrap();
        match served {
            Served::Page {
                artifact, status, ..
            } => {
                assert_eq!(status, CacheStatus::Hit);
                assert_eq!(&*artifact.html, "v2");
            }
            Served::Fallback => panic!("fresh page expected"),
        }
        assert_eq!(counter.calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_shell_miss_serves_fallback_then_page() {
        let cache = PageCache::new();
        let (counter, gate) = Counter::gated();

        for _ in 0..3 {
            let served = cache
                .serve("/product/b", INTERVAL, FallbackMode::Shell, counter.generate())
                .await
                .unwrap();
            assert_eq!(served.status(), CacheStatus::Fallback);
        }
        settle().await;
        assert_eq!(counter.calls(), 1);

        gate.notify_one();
        settle().await;

        let served = cache
            .serve("/product/b", INTERVAL, FallbackMode::Shell, counter.generate())
            .await
            .unwrap();
        assert_eq!(served.status(), CacheStatus::Hit);
        assert_eq!(counter.calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_blocking_misses_share_one_generation() {
        let cache = PageCache::new();
        let (counter, gate) = Counter::gated();

        let readers: Vec<_> = (0..4)
            .map(|_| {
                let cache = cache.clone();
                let generate = counter.generate();
                tokio::spawn(async move {
                    cache
                        .serve("/product/c", INTERVAL, FallbackMode::Blocking, generate)
                        .await
                })
            })
            .collect();
        settle().await;
        gate.notify_one();

        for reader in readers {
            let served = reader.await.unwrap().unwrap();
            assert_eq!(served.status(), CacheStatus::Miss);
        }
        assert_eq!(counter.calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_regeneration_keeps_stale_page() {
        let cache = PageCache::new();
        cache
            .prerender("/", INTERVAL, || async { Ok(Artifact::ready("v1")) })
            .await
            .unwrap();
        tokio::time::advance(INTERVAL * 2).await;

        let served = cache
            .serve("/", INTERVAL, FallbackMode::Shell, || async {
                Err::<Artifact, _>(GenerateError::Interrupted)
            })
            .await
            .unwrap();
        assert_eq!(served.status(), CacheStatus::Stale);
        settle().await;

        assert_eq!(cache.peek("/").unwrap().html.as_ref(), "v1");
        let served = cache
            .serve("/", INTERVAL, FallbackMode::Shell, || async {
                Ok(Artifact::ready("v2"))
            })
            .await
            .unwrap();
        assert_eq!(served.status(), CacheStatus::Stale);
        settle().await;
        assert_eq!(cache.peek("/").unwrap().html.as_ref(), "v2");
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_first_generation_is_reported_once() {
        let cache = PageCache::new();

        let served = cache
            .serve("/product/d", INTERVAL, FallbackMode::Shell, || async {
                Err::<Artifact, _>(GenerateError::Interrupted)
            })
            .await
            .unwrap();
        assert_eq!(served.status(), CacheStatus::Fallback);
        settle().await;

        let error = cache
            .serve("/product/d", INTERVAL, FallbackMode::Shell, || async {
                Ok(Artifact::ready("never"))
            })
            .await
            .unwrap_err();
        assert!(matches!(*error, GenerateError::Interrupted));

        let served = cache
            .serve("/product/d", INTERVAL, FallbackMode::Shell, || async {
                Ok(Artifact::ready("v1"))
            })
            .await
            .unwrap();
        assert_eq!(served.status(), CacheStatus::Fallback);
        settle().await;
        assert_eq!(cache.peek("/product/d").unwrap().html.as_ref(), "v1");
    }

    #[tokio::test(start_paused = true)]
    async fn test_not_found_artifacts_are_cached() {
        let cache = PageCache::new();
        let served = cache
            .serve("/product/x", INTERVAL, FallbackMode::Blocking, || async {
                Ok(Artifact::not_found("missing"))
            })
            .await
            .unwrap();
        match served {
            Served::Page { artifact, .. } => assert_eq!(artifact.kind, ArtifactKind::NotFound),
            Served::Fallback => panic!("blocking mode never falls back"),
        }
        assert_eq!(cache.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_blocking_failure_is_not_replayed_to_next_reader() {
        let cache = PageCache::new();

        let error = cache
            .serve("/", INTERVAL, FallbackMode::Blocking, || async {
                Err::<Artifact, _>(GenerateError::Interrupted)
            })
            .await
            .unwrap_err();
        assert!(matches!(*error, GenerateError::Interrupted));
        settle().await;
        assert_eq!(cache.failed_len(), 0);

        let served = cache
            .serve("/", INTERVAL, FallbackMode::Blocking, || async {
                Ok(Artifact::ready("v1"))
            })
            .await
            .unwrap();
        assert_eq!(served.status(), CacheStatus::Miss);
        assert_eq!(cache.peek("/").unwrap().html.as_ref(), "v1");
    }

    #[tokio::test(start_paused = true)]
    async fn test_not_found_pages_are_capped() {
        let cache = PageCache::with_negative_capacity(3);
        cache
            .prerender("/", INTERVAL, || async { Ok(Artifact::ready("home")) })
            .await
            .unwrap();

        for n in 0..5 {
            let key = format!("/product/junk{n}");
            cache
                .serve(&key, INTERVAL, FallbackMode::Blocking, || async {
                    Ok(Artifact::not_found("missing"))
                })
                .await
                .unwrap();
        }
        assert_eq!(cache.not_found_len(), 3);
        assert!(cache.peek("/product/junk0").is_none());
        assert!(cache.peek("/product/junk4").is_some());
        assert!(cache.peek("/").is_some());

        // Expired not-found pages are swept on the next store
        tokio::time::advance(INTERVAL + Duration::from_secs(1)).await;
        cache
            .serve("/product/junk5", INTERVAL, FallbackMode::Blocking, || async {
                Ok(Artifact::not_found("missing"))
            })
            .await
            .unwrap();
        assert_eq!(cache.not_found_len(), 1);
        assert_eq!(cache.len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_unreported_failures_expire_and_are_capped() {
        let cache = PageCache::with_negative_capacity(2);

        for n in 0..4 {
            let key = format!("/product/f{n}");
            cache
                .serve(&key, INTERVAL, FallbackMode::Shell, || async {
                    Err::<Artifact, _>(GenerateError::Interrupted)
                })
                .await
                .unwrap();
            settle().await;
        }
        assert_eq!(cache.failed_len(), 2);

        tokio::time::advance(INTERVAL + Duration::from_secs(1)).await;

        // An expired failure is not reported; the read starts a new generation
        let served = cache
            .serve("/product/f3", INTERVAL, FallbackMode::Shell, || async {
                Ok(Artifact::ready("v1"))
            })
            .await
            .unwrap();
        assert_eq!(served.status(), CacheStatus::Fallback);
        settle().await;

        cache
            .serve("/product/f9", INTERVAL, FallbackMode::Shell, || async {
                Err::<Artifact, _>(GenerateError::Interrupted)
            })
            .await
            .unwrap();
        settle().await;
        assert_eq!(cache.failed_len(), 1);
    }
}
