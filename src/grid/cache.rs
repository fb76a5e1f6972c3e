//! Region handle cache
//!
//! Opening a region handle against a hosted medium costs a metadata lookup,
//! so handles are cached process-wide, keyed by medium identity plus region
//! name. The cache is an explicit object injected at store construction
//! rather than a global registry, so tests can run with isolated caches.
//!
//! Entries are populated at most once per key and never auto-invalidated:
//! a caller that expects a renamed or recreated region to be picked up must
//! use a distinct key.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use super::{GridRegion, MediumResult};

/// Cache key: `(medium_id, region_name)`
pub type RegionKey = (String, String);

/// Read-many, write-rarely cache of opened region handles.
#[derive(Default)]
pub struct RegionCache {
    entries: Mutex<HashMap<RegionKey, Arc<dyn GridRegion>>>,
}

impl RegionCache {
    /// Create an empty cache
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the cached handle for `(medium_id, region_name)`, opening and
    /// caching it via `open` on first use.
    ///
    /// The lock is held across `open` so a key is opened at most once; the
    /// engine assumes a single logical writer, so contention here is not a
    /// concern.
    pub fn get_or_open<F>(
        &self,
        medium_id: &str,
        region_name: &str,
        open: F,
    ) -> MediumResult<Arc<dyn GridRegion>>
    where
        F: FnOnce() -> MediumResult<Arc<dyn GridRegion>>,
    {
        let key = (medium_id.to_string(), region_name.to_string());
        let mut entries = self.entries.lock().expect("region cache poisoned");
        if let Some(region) = entries.get(&key) {
            return Ok(Arc::clone(region));
        }
        let region = open()?;
        entries.insert(key, Arc::clone(&region));
        Ok(region)
    }

    /// Number of cached handles
    pub fn len(&self) -> usize {
        self.entries.lock().expect("region cache poisoned").len()
    }

    /// True iff no handle has been cached yet
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::InMemoryGrid;

    #[test]
    fn test_cache_populates_once_per_key() {
        let cache = RegionCache::new();
        let mut opens = 0;

        for _ in 0..3 {
            cache
                .get_or_open("medium", "stock", || {
                    opens += 1;
                    Ok(Arc::new(InMemoryGrid::new(5, 3)))
                })
                .unwrap();
        }

        assert_eq!(opens, 1, "same key must open the region exactly once");
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_distinct_keys_get_distinct_handles() {
        let cache = RegionCache::new();
        let a = cache
            .get_or_open("medium", "stock", || Ok(Arc::new(InMemoryGrid::new(5, 3))))
            .unwrap();
        let b = cache
            .get_or_open("medium", "plan", || Ok(Arc::new(InMemoryGrid::new(5, 3))))
            .unwrap();

        assert!(!Arc::ptr_eq(&a, &b));
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn test_open_failure_is_not_cached() {
        let cache = RegionCache::new();
        let result = cache.get_or_open("medium", "missing", || {
            Err(crate::grid::MediumError::RegionNotFound("missing".into()))
        });
        assert!(result.is_err());
        assert!(cache.is_empty(), "failed opens must not leave an entry behind");
    }
}
