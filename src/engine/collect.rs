//! Result Collection
//!
//! Streaming delivery of freshly validated INDs. A pass delivers each IND
//! at most once, unordered, from whatever worker surfaced it, so
//! collectors must be thread-safe.
//!
//! Collectors are published through a process-wide registry so that
//! workers can reach them by run token. The registry entry is owned by a
//! scoped RAII guard held by `run()`: registered on entry, released on
//! every exit path including panic, with the collector's `shutdown` hook
//! invoked on release.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, LazyLock};

use parking_lot::{Mutex, RwLock};

use crate::model::ind::Ind;

/// Receives each discovered IND exactly once per pass.
pub trait IndCollector: Send + Sync {
    /// Called from worker context; unordered across INDs.
    fn collect(&self, ind: &Ind);

    /// Unbind any resources the collector exposes to remote workers.
    /// Called exactly once, when the run releases the collector.
    fn shutdown(&self) {}
}

/// Collects INDs into a vector.
#[derive(Debug, Default)]
pub struct SinkCollector {
    inds: Mutex<Vec<Ind>>,
}

impl SinkCollector {
    pub fn new() -> SinkCollector {
        SinkCollector::default()
    }

    /// Drain everything collected so far.
    pub fn take(&self) -> Vec<Ind> {
        std::mem::take(&mut *self.inds.lock())
    }
}

impl IndCollector for SinkCollector {
    fn collect(&self, ind: &Ind) {
        self.inds.lock().push(ind.clone());
    }
}

/// Counts INDs without materialising them.
#[derive(Debug, Default)]
pub struct CountingCollector {
    seen: AtomicU64,
}

impl CountingCollector {
    pub fn new() -> CountingCollector {
        CountingCollector::default()
    }

    pub fn count(&self) -> u64 {
        self.seen.load(Ordering::Relaxed)
    }
}

impl IndCollector for CountingCollector {
    fn collect(&self, _ind: &Ind) {
        self.seen.fetch_add(1, Ordering::Relaxed);
    }
}

/// Identifies one run's registry slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunToken(u64);

static NEXT_TOKEN: AtomicU64 = AtomicU64::new(1);

static REGISTRY: LazyLock<RwLock<HashMap<u64, Arc<dyn IndCollector>>>> =
    LazyLock::new(|| RwLock::new(HashMap::new()));

/// Publish a collector and get the scoped handle that owns the slot.
pub fn register(collector: Arc<dyn IndCollector>) -> RegistryGuard {
    let token = RunToken(NEXT_TOKEN.fetch_add(1, Ordering::Relaxed));
    REGISTRY.write().insert(token.0, collector);
    RegistryGuard { token }
}

/// Deliver one IND to the collector registered under `token`.
///
/// Delivery after the owning run has torn down is a no-op.
pub fn deliver(token: RunToken, ind: &Ind) {
    let registry = REGISTRY.read();
    if let Some(collector) = registry.get(&token.0) {
        collector.collect(ind);
    }
}

/// Scoped ownership of one registry slot.
pub struct RegistryGuard {
    token: RunToken,
}

impl RegistryGuard {
    pub fn token(&self) -> RunToken {
        self.token
    }
}

impl Drop for RegistryGuard {
    fn drop(&mut self) {
        let collector = REGISTRY.write().remove(&self.token.0);
        if let Some(collector) = collector {
            collector.shutdown();
        }
    }
}
