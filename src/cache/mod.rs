//! # Keyed Resource Cache
//!
//! Bounded cache of lazily built, disposable values keyed by configuration
//! section name.
//!
//! ## Overview
//!
//! `ResourceCache` hands out shared `Arc<V>` values and owns them until they are
//! evicted, flushed or the cache is disposed; at that point the value is
//! disposed exactly once. Callers may keep their `Arc` afterwards, but the
//! value reports itself as disposed.
//!
//! ## Key Features
//!
//! - **Single-flight construction**: concurrent lookups of a missing key run the
//!   builder once and all receive the same value or the same error
//! - **Independent keys**: builders run outside the cache lock, so a slow build
//!   never blocks lookups of other keys
//! - **LRU eviction**: admitting a value into a full cache evicts the least
//!   recently used ready entry; the new value is published only after the
//!   evicted one has been disposed
//! - **No negative caching**: a failed or panicking build leaves nothing behind
//!   and the next lookup builds again
//!
//! ## Architecture
//!
//! ```text
//! ResourceCache
//! ├── Mutex<CacheState>
//! │   ├── slots:     key → Ready { value, tick } | Pending(Flight) | Retiring(Flight)
//! │   ├── recency:   tick → key   (ready entries only, oldest first)
//! │   └── admitting: admissions waiting for their victim's disposal
//! └── builder: Fn(&str) -> SetupResult<V>   (runs unlocked)
//! ```

mod flight;
pub mod stats;

pub use stats::CacheStats;

use crate::constants::targets;
use crate::error::{ensure_section_name, SetupError, SetupResult};
use crate::lifecycle::Dispose;
use crate::logging::{log_cache_operation, log_error};
use flight::Flight;
use parking_lot::Mutex;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::num::NonZeroUsize;
use std::sync::Arc;
use tracing::{debug, trace, warn};

type BuildFn<V> = dyn Fn(&str) -> SetupResult<V> + Send + Sync;

enum Slot<V> {
    Ready { value: Arc<V>, tick: u64 },
    Pending(Arc<Flight<V>>),
    /// Evicted value still being disposed; completes once disposal returns
    Retiring(Arc<Flight<V>>),
}

struct CacheState<V> {
    slots: HashMap<String, Slot<V>>,
    recency: BTreeMap<u64, String>,
    clock: u64,
    admitting: usize,
    closed: bool,
    hits: u64,
    misses: u64,
    evictions: u64,
    failed_builds: u64,
}

impl<V> CacheState<V> {
    fn new() -> Self {
        Self {
            slots: HashMap::new(),
            recency: BTreeMap::new(),
            clock: 0,
            admitting: 0,
            closed: false,
            hits: 0,
            misses: 0,
            evictions: 0,
            failed_builds: 0,
        }
    }

    fn next_tick(&mut self) -> u64 {
        self.clock += 1;
        self.clock
    }

    /// Ready entries plus admissions that already claimed a place
    fn occupied(&self) -> usize {
        self.recency.len() + self.admitting
    }

    fn insert_ready(&mut self, key: &str, value: Arc<V>) {
        let tick = self.next_tick();
        self.recency.insert(tick, key.to_owned());
        self.slots.insert(key.to_owned(), Slot::Ready { value, tick });
    }

    fn remove_pending(&mut self, key: &str, flight: &Arc<Flight<V>>) {
        if matches!(self.slots.get(key), Some(Slot::Pending(f)) if Arc::ptr_eq(f, flight)) {
            self.slots.remove(key);
        }
    }

    fn remove_retiring(&mut self, key: &str, flight: &Arc<Flight<V>>) {
        if matches!(self.slots.get(key), Some(Slot::Retiring(f)) if Arc::ptr_eq(f, flight)) {
            self.slots.remove(key);
        }
    }

    fn take_ready(&mut self, key: &str) -> Option<Arc<V>> {
        match self.slots.remove(key)? {
            Slot::Ready { value, tick } => {
                self.recency.remove(&tick);
                Some(value)
            }
            other => {
                self.slots.insert(key.to_owned(), other);
                None
            }
        }
    }

    /// Move the least recently used ready entry into the retiring state
    fn evict_lru(&mut self) -> Option<Retirement<V>> {
        let (_, key) = self.recency.pop_first()?;
        match self.slots.remove(&key) {
            Some(Slot::Ready { value, .. }) => {
                self.evictions += 1;
                let done = Flight::new();
                self.slots
                    .insert(key.clone(), Slot::Retiring(Arc::clone(&done)));
                Some(Retirement { key, value, done })
            }
            Some(other) => {
                self.slots.insert(key, other);
                None
            }
            None => None,
        }
    }

    fn any_retiring(&self) -> Option<Arc<Flight<V>>> {
        self.slots.values().find_map(|slot| match slot {
            Slot::Retiring(flight) => Some(Arc::clone(flight)),
            _ => None,
        })
    }

    /// Remove every ready entry, least recently used first
    fn drain_ready(&mut self) -> Vec<(String, Arc<V>)> {
        let keys: Vec<String> = std::mem::take(&mut self.recency).into_values().collect();
        keys.into_iter()
            .filter_map(|key| match self.slots.remove(&key) {
                Some(Slot::Ready { value, .. }) => Some((key, value)),
                Some(other) => {
                    self.slots.insert(key, other);
                    None
                }
                None => None,
            })
            .collect()
    }

    /// Builds and disposals still in progress
    fn pending_flights(&self) -> Vec<Arc<Flight<V>>> {
        self.slots
            .values()
            .filter_map(|slot| match slot {
                Slot::Pending(flight) | Slot::Retiring(flight) => Some(Arc::clone(flight)),
                Slot::Ready { .. } => None,
            })
            .collect()
    }

    fn pending_builds(&self) -> usize {
        self.slots
            .values()
            .filter(|slot| matches!(slot, Slot::Pending(_)))
            .count()
    }
}

/// An evicted value on its way out of the cache
struct Retirement<V> {
    key: String,
    value: Arc<V>,
    done: Arc<Flight<V>>,
}

enum Lookup<V> {
    Hit(Arc<V>),
    Wait(Arc<Flight<V>>),
    Build(Arc<Flight<V>>),
    Retiring(Arc<Flight<V>>),
}

enum Admission<V> {
    Done(SetupResult<Arc<V>>),
    Evicting(Retirement<V>),
    Blocked(Arc<Flight<V>>),
}

/// Bounded, single-flight cache of disposable values
pub struct ResourceCache<V: Dispose + 'static> {
    capacity: NonZeroUsize,
    build: Box<BuildFn<V>>,
    state: Mutex<CacheState<V>>,
}

impl<V: Dispose + 'static> ResourceCache<V> {
    /// Create a cache holding at most `capacity` values built by `build`
    pub fn new<F>(capacity: NonZeroUsize, build: F) -> Self
    where
        F: Fn(&str) -> SetupResult<V> + Send + Sync + 'static,
    {
        debug!(capacity = capacity.get(), "Resource cache created");
        Self {
            capacity,
            build: Box::new(build),
            state: Mutex::new(CacheState::new()),
        }
    }

    /// Like [`ResourceCache::new`], rejecting a zero capacity
    pub fn with_capacity<F>(capacity: usize, build: F) -> SetupResult<Self>
    where
        F: Fn(&str) -> SetupResult<V> + Send + Sync + 'static,
    {
        let capacity = NonZeroUsize::new(capacity)
            .ok_or_else(|| SetupError::invalid_argument("cache capacity must be greater than 0"))?;
        Ok(Self::new(capacity, build))
    }

    /// Return the value for `key`, building it on first use
    pub fn get(&self, key: &str) -> SetupResult<Arc<V>> {
        ensure_section_name(key)?;

        loop {
            match self.lookup(key)? {
                Lookup::Hit(value) => {
                    trace!(key = %key, "Cache hit");
                    return Ok(value);
                }
                Lookup::Wait(flight) => {
                    trace!(key = %key, "Waiting for in-flight build");
                    return flight.wait();
                }
                Lookup::Build(flight) => return self.build_and_admit(key, &flight),
                Lookup::Retiring(done) => {
                    trace!(key = %key, "Waiting for evicted value to be disposed");
                    let _ = done.wait();
                }
            }
        }
    }

    fn lookup(&self, key: &str) -> SetupResult<Lookup<V>> {
        let mut guard = self.state.lock();
        let state = &mut *guard;
        if state.closed {
            return Err(SetupError::use_after_dispose(targets::SETTINGS_CACHE));
        }

        let lookup = match state.slots.get_mut(key) {
            Some(Slot::Ready { value, tick }) => {
                state.clock += 1;
                state.recency.remove(&*tick);
                *tick = state.clock;
                state.recency.insert(state.clock, key.to_owned());
                state.hits += 1;
                Lookup::Hit(Arc::clone(value))
            }
            Some(Slot::Pending(flight)) => {
                state.hits += 1;
                Lookup::Wait(Arc::clone(flight))
            }
            Some(Slot::Retiring(done)) => Lookup::Retiring(Arc::clone(done)),
            None => {
                state.misses += 1;
                let flight = Flight::new();
                state
                    .slots
                    .insert(key.to_owned(), Slot::Pending(Arc::clone(&flight)));
                Lookup::Build(flight)
            }
        };
        Ok(lookup)
    }

    /// Remove and dispose the entry for `key`. Returns whether one existed.
    pub fn flush(&self, key: &str) -> SetupResult<bool> {
        ensure_section_name(key)?;

        loop {
            let mut state = self.state.lock();
            let flight = match state.slots.get(key) {
                None => return Ok(false),
                Some(Slot::Pending(flight) | Slot::Retiring(flight)) => Arc::clone(flight),
                Some(Slot::Ready { .. }) => {
                    let removed = state.take_ready(key);
                    drop(state);
                    return match removed {
                        Some(value) => {
                            log_cache_operation("flush", key, "disposing", None);
                            value.dispose().map(|()| true)
                        }
                        None => Ok(false),
                    };
                }
            };
            drop(state);

            // Only completion matters here, the outcome belongs to the builder
            let _ = flight.wait();
        }
    }

    /// Dispose every cached value and empty the cache
    pub fn flush_all(&self) -> SetupResult<()> {
        let flights = self.state.lock().pending_flights();
        for flight in flights {
            let _ = flight.wait();
        }

        let drained = self.state.lock().drain_ready();
        log_cache_operation(
            "flush_all",
            "*",
            "disposing",
            Some(&format!("{} entries", drained.len())),
        );
        Self::dispose_entries(drained)
    }

    /// Close the cache and dispose everything in it. Later lookups fail fast.
    pub fn dispose(&self) -> SetupResult<()> {
        let flights = {
            let mut state = self.state.lock();
            if state.closed {
                return Ok(());
            }
            state.closed = true;
            state.pending_flights()
        };
        for flight in flights {
            let _ = flight.wait();
        }

        let drained = self.state.lock().drain_ready();
        log_cache_operation(
            "dispose",
            "*",
            "disposing",
            Some(&format!("{} entries", drained.len())),
        );
        Self::dispose_entries(drained)
    }

    pub fn is_disposed(&self) -> bool {
        self.state.lock().closed
    }

    pub fn capacity(&self) -> usize {
        self.capacity.get()
    }

    /// Number of ready entries
    pub fn len(&self) -> usize {
        self.state.lock().recency.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether a ready entry exists for `key`, without touching its recency
    pub fn contains(&self, key: &str) -> bool {
        matches!(self.state.lock().slots.get(key), Some(Slot::Ready { .. }))
    }

    pub fn stats(&self) -> CacheStats {
        let state = self.state.lock();
        CacheStats {
            capacity: self.capacity.get(),
            entries: state.recency.len(),
            pending: state.pending_builds(),
            hits: state.hits,
            misses: state.misses,
            evictions: state.evictions,
            failed_builds: state.failed_builds,
            keys: state.recency.values().cloned().collect(),
        }
    }

    fn build_and_admit(&self, key: &str, flight: &Arc<Flight<V>>) -> SetupResult<Arc<V>> {
        debug!(key = %key, "Cache miss, building value");
        let mut guard = PendingGuard {
            cache: self,
            key,
            flight,
            armed: true,
        };
        let built = (self.build)(key);
        guard.armed = false;

        let outcome = match built {
            Ok(value) => self.admit(key, flight, Arc::new(value)),
            Err(e) => {
                {
                    let mut state = self.state.lock();
                    state.remove_pending(key, flight);
                    state.failed_builds += 1;
                }
                debug!(key = %key, error = %e, "Build failed, nothing cached");
                Err(e)
            }
        };

        flight.complete(outcome.clone());
        outcome
    }

    /// Make room for `value` and publish it. The key stays pending until any
    /// evicted value has been disposed.
    fn admit(&self, key: &str, flight: &Arc<Flight<V>>, value: Arc<V>) -> SetupResult<Arc<V>> {
        loop {
            let admission = {
                let mut state = self.state.lock();
                if state.closed {
                    state.remove_pending(key, flight);
                    Admission::Done(Err(SetupError::use_after_dispose(
                        targets::SETTINGS_CACHE,
                    )))
                } else if state.occupied() < self.capacity.get() {
                    state.remove_pending(key, flight);
                    state.insert_ready(key, Arc::clone(&value));
                    Admission::Done(Ok(Arc::clone(&value)))
                } else if let Some(retirement) = state.evict_lru() {
                    state.admitting += 1;
                    Admission::Evicting(retirement)
                } else {
                    match state.any_retiring() {
                        Some(done) => Admission::Blocked(done),
                        None => {
                            state.remove_pending(key, flight);
                            state.insert_ready(key, Arc::clone(&value));
                            Admission::Done(Ok(Arc::clone(&value)))
                        }
                    }
                }
            };

            match admission {
                Admission::Done(Ok(value)) => return Ok(value),
                Admission::Done(Err(e)) => {
                    Self::discard(key, &value);
                    return Err(e);
                }
                Admission::Blocked(done) => {
                    trace!(key = %key, "Cache full of pending admissions, waiting");
                    let _ = done.wait();
                }
                Admission::Evicting(retirement) => {
                    return self.retire_then_publish(key, flight, &value, &retirement);
                }
            }
        }
    }

    fn retire_then_publish(
        &self,
        key: &str,
        flight: &Arc<Flight<V>>,
        value: &Arc<V>,
        retirement: &Retirement<V>,
    ) -> SetupResult<Arc<V>> {
        let mut guard = RetireGuard {
            cache: self,
            key,
            flight,
            value,
            retirement,
            armed: true,
        };

        let details = format!("admitting '{key}'");
        log_cache_operation("evict", &retirement.key, "disposing", Some(&details));
        if let Err(e) = retirement.value.dispose() {
            warn!(key = %retirement.key, error = %e, "Failed to dispose evicted value");
        }

        guard.armed = false;
        self.publish_after_retirement(key, flight, value, retirement)
    }

    fn publish_after_retirement(
        &self,
        key: &str,
        flight: &Arc<Flight<V>>,
        value: &Arc<V>,
        retirement: &Retirement<V>,
    ) -> SetupResult<Arc<V>> {
        let outcome = {
            let mut state = self.state.lock();
            state.admitting -= 1;
            state.remove_retiring(&retirement.key, &retirement.done);
            state.remove_pending(key, flight);
            if state.closed {
                Err(SetupError::use_after_dispose(targets::SETTINGS_CACHE))
            } else {
                state.insert_ready(key, Arc::clone(value));
                Ok(Arc::clone(value))
            }
        };
        retirement
            .done
            .complete(Err(SetupError::use_after_dispose(retirement.key.clone())));

        if outcome.is_err() {
            Self::discard(key, value);
        }
        outcome
    }

    fn discard(key: &str, value: &Arc<V>) {
        if let Err(e) = value.dispose() {
            warn!(key = %key, error = %e, "Failed to dispose value built after close");
        }
    }

    fn abandon(&self, key: &str, flight: &Arc<Flight<V>>) {
        log_error("resource_cache", "build", "builder panicked", Some(key));
        {
            let mut state = self.state.lock();
            state.remove_pending(key, flight);
            state.failed_builds += 1;
        }
        flight.complete(Err(SetupError::Construction {
            section: key.to_owned(),
            reason: "builder panicked".to_string(),
        }));
    }

    fn dispose_entries(entries: Vec<(String, Arc<V>)>) -> SetupResult<()> {
        let mut first_error = None;
        for (key, value) in entries {
            if let Err(e) = value.dispose() {
                warn!(key = %key, error = %e, "Failed to dispose cached value");
                first_error.get_or_insert(e);
            }
        }
        first_error.map_or(Ok(()), Err)
    }
}

impl<V: Dispose + 'static> Drop for ResourceCache<V> {
    fn drop(&mut self) {
        if let Err(e) = self.dispose() {
            warn!(error = %e, "Failed to dispose resource cache on drop");
        }
    }
}

impl<V: Dispose + 'static> fmt::Debug for ResourceCache<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.lock();
        f.debug_struct("ResourceCache")
            .field("capacity", &self.capacity)
            .field("entries", &state.recency.len())
            .field("closed", &state.closed)
            .finish()
    }
}

/// Fails the pending build if the builder unwinds
struct PendingGuard<'a, V: Dispose + 'static> {
    cache: &'a ResourceCache<V>,
    key: &'a str,
    flight: &'a Arc<Flight<V>>,
    armed: bool,
}

impl<V: Dispose + 'static> Drop for PendingGuard<'_, V> {
    fn drop(&mut self) {
        if self.armed {
            self.cache.abandon(self.key, self.flight);
        }
    }
}

/// Releases the admission slot if disposing the evicted value unwinds
struct RetireGuard<'a, V: Dispose + 'static> {
    cache: &'a ResourceCache<V>,
    key: &'a str,
    flight: &'a Arc<Flight<V>>,
    value: &'a Arc<V>,
    retirement: &'a Retirement<V>,
    armed: bool,
}

impl<V: Dispose + 'static> Drop for RetireGuard<'_, V> {
    fn drop(&mut self) {
        if self.armed {
            log_error(
                "resource_cache",
                "evict",
                "disposal panicked",
                Some(&self.retirement.key),
            );
            let cache = self.cache;
            let outcome =
                cache.publish_after_retirement(self.key, self.flight, self.value, self.retirement);
            self.flight.complete(outcome);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Debug)]
    struct Probe {
        key: String,
        disposed: Arc<Mutex<Vec<String>>>,
        fail_dispose: bool,
    }

    impl Dispose for Probe {
        fn dispose(&self) -> SetupResult<()> {
            self.disposed.lock().push(self.key.clone());
            if self.fail_dispose {
                return Err(SetupError::disposal(&self.key, "refused"));
            }
            Ok(())
        }
    }

    fn probe_cache(
        capacity: usize,
    ) -> (ResourceCache<Probe>, Arc<AtomicUsize>, Arc<Mutex<Vec<String>>>) {
        let builds = Arc::new(AtomicUsize::new(0));
        let disposed = Arc::new(Mutex::new(Vec::new()));
        let (counter, log) = (Arc::clone(&builds), Arc::clone(&disposed));
        let cache = ResourceCache::with_capacity(capacity, move |key: &str| {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(Probe {
                key: key.to_string(),
                disposed: Arc::clone(&log),
                fail_dispose: key.starts_with("stubborn"),
            })
        })
        .unwrap();
        (cache, builds, disposed)
    }

    #[test]
    fn test_zero_capacity_rejected() {
        let result = ResourceCache::<Probe>::with_capacity(0, |_: &str| {
            Err(SetupError::section_not_found("never"))
        });
        assert!(matches!(result, Err(SetupError::InvalidArgument(_))));
    }

    #[test]
    fn test_hit_reuses_value() {
        let (cache, builds, _) = probe_cache(4);
        let first = cache.get("A").unwrap();
        let second = cache.get("A").unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(builds.load(Ordering::SeqCst), 1);

        let stats = cache.stats();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.entries, 1);
    }

    #[test]
    fn test_keys_are_case_sensitive() {
        let (cache, builds, _) = probe_cache(4);
        cache.get("mail").unwrap();
        cache.get("Mail").unwrap();
        assert_eq!(builds.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_lru_eviction_order() {
        let (cache, _, disposed) = probe_cache(2);
        cache.get("A").unwrap();
        cache.get("B").unwrap();
        cache.get("A").unwrap();
        cache.get("C").unwrap();

        assert_eq!(*disposed.lock(), vec!["B".to_string()]);
        assert!(cache.contains("A"));
        assert!(!cache.contains("B"));
        assert_eq!(cache.stats().keys, vec!["A".to_string(), "C".to_string()]);
        assert_eq!(cache.stats().evictions, 1);
    }

    #[test]
    fn test_flush_present_and_absent() {
        let (cache, builds, disposed) = probe_cache(4);
        cache.get("A").unwrap();

        assert!(cache.flush("A").unwrap());
        assert!(!cache.flush("A").unwrap());
        assert_eq!(*disposed.lock(), vec!["A".to_string()]);

        cache.get("A").unwrap();
        assert_eq!(builds.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_flush_propagates_disposal_error_but_removes_entry() {
        let (cache, _, _) = probe_cache(4);
        cache.get("stubborn").unwrap();

        assert!(matches!(cache.flush("stubborn"), Err(SetupError::Disposal { .. })));
        assert!(!cache.contains("stubborn"));
        assert!(cache.is_empty());
    }

    #[test]
    fn test_flush_all_reports_first_error_and_disposes_rest() {
        let (cache, _, disposed) = probe_cache(4);
        cache.get("stubborn-1").unwrap();
        cache.get("B").unwrap();

        assert!(cache.flush_all().is_err());
        assert!(cache.is_empty());
        assert_eq!(disposed.lock().len(), 2);
    }

    #[test]
    fn test_dispose_is_idempotent_and_final() {
        let (cache, _, disposed) = probe_cache(4);
        cache.get("A").unwrap();

        cache.dispose().unwrap();
        cache.dispose().unwrap();
        cache.flush_all().unwrap();

        assert_eq!(disposed.lock().len(), 1);
        assert!(cache.is_disposed());
        assert!(cache.get("A").unwrap_err().is_use_after_dispose());
    }

    #[test]
    fn test_drop_disposes_entries() {
        let (cache, _, disposed) = probe_cache(4);
        cache.get("A").unwrap();
        cache.get("B").unwrap();
        drop(cache);
        assert_eq!(disposed.lock().len(), 2);
    }

    #[test]
    fn test_empty_key_rejected() {
        let (cache, builds, _) = probe_cache(4);
        assert!(matches!(cache.get(""), Err(SetupError::InvalidArgument(_))));
        assert!(matches!(cache.flush(""), Err(SetupError::InvalidArgument(_))));
        assert_eq!(builds.load(Ordering::SeqCst), 0);
    }
}
