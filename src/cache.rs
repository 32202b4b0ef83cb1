//! Explicit memoization for the load step
//!
//! Loading and aggregating the datasets is recomputed in full on every
//! render; [`LoadCache`] avoids that when nothing changed. It is a plain
//! handle the caller owns and passes around - there is no process-global
//! state - and invalidation is manual. The cache is keyed by a
//! caller-chosen string (typically data directory + seed) so a changed
//! configuration naturally misses.
//!
//! This is recompute avoidance, not a concurrency mechanism: there are no
//! competing writers, and a poisoned lock is reported as an internal error.

use std::sync::RwLock;

use crate::reader::LoadOutcome;
use crate::{FlowmapError, Result};

struct Entry {
    key: String,
    outcome: LoadOutcome,
}

/// Single-slot memoization of a load outcome.
pub struct LoadCache {
    slot: RwLock<Option<Entry>>,
}

impl LoadCache {
    pub fn new() -> Self {
        Self {
            slot: RwLock::new(None),
        }
    }

    /// Return the cached outcome for `key`, or run `load` and cache its
    /// result. A different key replaces the previous entry.
    pub fn get_or_load<F>(&self, key: &str, load: F) -> Result<LoadOutcome>
    where
        F: FnOnce() -> Result<LoadOutcome>,
    {
        {
            let slot = self.slot.read().map_err(poisoned)?;
            if let Some(entry) = slot.as_ref() {
                if entry.key == key {
                    return Ok(entry.outcome.clone());
                }
            }
        }

        let outcome = load()?;
        let mut slot = self.slot.write().map_err(poisoned)?;
        *slot = Some(Entry {
            key: key.to_string(),
            outcome: outcome.clone(),
        });
        Ok(outcome)
    }

    /// Drop the cached entry; the next `get_or_load` recomputes.
    pub fn invalidate(&self) -> Result<()> {
        let mut slot = self.slot.write().map_err(poisoned)?;
        *slot = None;
        Ok(())
    }

    /// The key of the currently cached entry, if any.
    pub fn cached_key(&self) -> Option<String> {
        self.slot
            .read()
            .ok()
            .and_then(|slot| slot.as_ref().map(|entry| entry.key.clone()))
    }
}

impl Default for LoadCache {
    fn default() -> Self {
        Self::new()
    }
}

fn poisoned<T>(_: std::sync::PoisonError<T>) -> FlowmapError {
    FlowmapError::InternalError("load cache lock poisoned".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reader::{DemoReader, LoadSource};
    use std::cell::Cell;

    fn demo_outcome() -> Result<LoadOutcome> {
        Ok(LoadOutcome {
            data: DemoReader::new().load()?,
            source: LoadSource::Demo {
                reason: "test".to_string(),
            },
        })
    }

    #[test]
    fn second_lookup_with_the_same_key_hits_the_cache() {
        let cache = LoadCache::new();
        let calls = Cell::new(0);
        let load = || {
            calls.set(calls.get() + 1);
            demo_outcome()
        };

        cache.get_or_load("data#42", load).unwrap();
        cache
            .get_or_load("data#42", || {
                calls.set(calls.get() + 1);
                demo_outcome()
            })
            .unwrap();

        assert_eq!(calls.get(), 1);
        assert_eq!(cache.cached_key().as_deref(), Some("data#42"));
    }

    #[test]
    fn a_new_key_recomputes_and_replaces_the_entry() {
        let cache = LoadCache::new();
        let calls = Cell::new(0);
        let mut load = || {
            calls.set(calls.get() + 1);
            demo_outcome()
        };

        cache.get_or_load("data#42", &mut load).unwrap();
        cache.get_or_load("data#7", &mut load).unwrap();

        assert_eq!(calls.get(), 2);
        assert_eq!(cache.cached_key().as_deref(), Some("data#7"));
    }

    #[test]
    fn invalidate_forces_a_reload() {
        let cache = LoadCache::new();
        let calls = Cell::new(0);
        let mut load = || {
            calls.set(calls.get() + 1);
            demo_outcome()
        };

        cache.get_or_load("data#42", &mut load).unwrap();
        cache.invalidate().unwrap();
        assert_eq!(cache.cached_key(), None);

        cache.get_or_load("data#42", &mut load).unwrap();
        assert_eq!(calls.get(), 2);
    }

    #[test]
    fn load_failures_are_not_cached() {
        let cache = LoadCache::new();
        let err = cache.get_or_load("data#42", || {
            Err(crate::FlowmapError::DataUnavailable("nope".to_string()))
        });
        assert!(err.is_err());
        assert_eq!(cache.cached_key(), None);

        let ok = cache.get_or_load("data#42", demo_outcome);
        assert!(ok.is_ok());
    }
}
