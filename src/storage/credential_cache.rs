// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! LRU cache for credential id → contract address lookups.
//!
//! Mappings never change once bound, so entries carry no TTL. The whole
//! cache is dropped on disconnect.

use std::num::NonZeroUsize;
use std::sync::Mutex;

use lru::LruCache;

/// In-process LRU cache, the fastest resolver tier.
pub struct CredentialCache {
    cache: Mutex<LruCache<String, String>>,
}

impl CredentialCache {
    /// Create a new cache holding at most `capacity` mappings.
    pub fn new(capacity: usize) -> Self {
        Self {
            cache: Mutex::new(LruCache::new(
                NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN),
            )),
        }
    }

    pub fn get(&self, credential_id: &str) -> Option<String> {
        let mut cache = self.cache.lock().ok()?;
        cache.get(credential_id).cloned()
    }

    pub fn put(&self, credential_id: &str, contract_address: &str) {
        if let Ok(mut cache) = self.cache.lock() {
            cache.put(credential_id.to_string(), contract_address.to_string());
        }
    }

    pub fn invalidate(&self, credential_id: &str) {
        if let Ok(mut cache) = self.cache.lock() {
            cache.pop(credential_id);
        }
    }

    /// Drop every cached mapping.
    pub fn clear(&self) {
        if let Ok(mut cache) = self.cache.lock() {
            cache.clear();
        }
    }

    pub fn len(&self) -> usize {
        self.cache.lock().map(|c| c.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cache_put_and_get() {
        let cache = CredentialCache::new(10);
        assert!(cache.get("cred-1").is_none());

        cache.put("cred-1", "CADDR1");
        assert_eq!(cache.get("cred-1").as_deref(), Some("CADDR1"));
    }

    #[test]
    fn cache_invalidate_and_clear() {
        let cache = CredentialCache::new(10);
        cache.put("cred-1", "CADDR1");
        cache.put("cred-2", "CADDR2");

        cache.invalidate("cred-1");
        assert!(cache.get("cred-1").is_none());
        assert_eq!(cache.len(), 1);

        cache.clear();
        assert!(cache.is_empty());
    }

    #[test]
    fn cache_evicts_least_recently_used() {
        let cache = CredentialCache::new(2);
        cache.put("a", "CA");
        cache.put("b", "CB");
        assert!(cache.get("a").is_some());
        cache.put("c", "CC");

        assert!(cache.get("b").is_none());
        assert!(cache.get("a").is_some());
        assert!(cache.get("c").is_some());
    }

    #[test]
    fn zero_capacity_still_holds_one_entry() {
        let cache = CredentialCache::new(0);
        cache.put("a", "CA");
        assert_eq!(cache.len(), 1);
    }
}
