use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;

/// Read-through identity cache shared by the proxies.
///
/// Entries never expire on their own; writers drop the entry they touched.
/// Racing writers are harmless, the worst case is one extra API read.
#[derive(Debug)]
pub struct ResourceCache<T> {
    entries: Arc<RwLock<HashMap<String, T>>>,
}

impl<T> Clone for ResourceCache<T> {
    fn clone(&self) -> Self {
        Self {
            entries: Arc::clone(&self.entries),
        }
    }
}

impl<T> Default for ResourceCache<T> {
    fn default() -> Self {
        Self {
            entries: Arc::new(RwLock::new(HashMap::new())),
        }
    }
}

impl<T: Clone> ResourceCache<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: &str) -> Option<T> {
        self.entries.read().get(id).cloned()
    }

    pub fn insert(&self, id: impl Into<String>, value: T) {
        self.entries.write().insert(id.into(), value);
    }

    pub fn remove(&self, id: &str) -> Option<T> {
        self.entries.write().remove(id)
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    pub fn clear(&self) {
        self.entries.write().clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cache_operations() {
        let cache = ResourceCache::new();
        assert!(cache.is_empty());

        cache.insert("wb-1", "Inbox".to_string());
        assert_eq!(cache.get("wb-1").as_deref(), Some("Inbox"));
        assert_eq!(cache.len(), 1);

        let shared = cache.clone();
        shared.insert("wb-2", "Archive".to_string());
        assert_eq!(cache.len(), 2);

        assert_eq!(cache.remove("wb-1").as_deref(), Some("Inbox"));
        assert_eq!(cache.get("wb-1"), None);

        cache.clear();
        assert!(shared.is_empty());
    }
}
