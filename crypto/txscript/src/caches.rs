use indexmap::IndexMap;
use parking_lot::RwLock;
use rand::Rng;
use std::{collections::hash_map::RandomState, hash::BuildHasher, hash::Hash, sync::Arc};

/// A bounded map shared between engines. Once full, each insert evicts a random entry.
#[derive(Clone)]
pub struct Cache<TKey: Clone + Hash + Eq + Send + Sync, TData: Clone + Send + Sync, S = RandomState> {
    // IndexMap makes picking a random victim an O(1) swap removal
    map: Arc<RwLock<IndexMap<TKey, TData, S>>>,
    capacity: usize,
}

impl<TKey: Clone + Hash + Eq + Send + Sync, TData: Clone + Send + Sync, S: BuildHasher + Default> Cache<TKey, TData, S> {
    pub fn new(capacity: u64) -> Self {
        let capacity = capacity as usize;
        Self { map: Arc::new(RwLock::new(IndexMap::with_capacity_and_hasher(capacity, S::default()))), capacity }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.map.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.read().is_empty()
    }

    pub(crate) fn get(&self, key: &TKey) -> Option<TData> {
        self.map.read().get(key).cloned()
    }

    pub(crate) fn insert(&self, key: TKey, data: TData) {
        if self.capacity == 0 {
            return;
        }
        let mut write_guard = self.map.write();
        if write_guard.len() >= self.capacity && !write_guard.contains_key(&key) {
            let victim = rand::thread_rng().gen_range(0..write_guard.len());
            write_guard.swap_remove_index(victim);
        }
        write_guard.insert(key, data);
    }
}

#[cfg(test)]
mod tests {
    use super::Cache;

    #[test]
    fn test_bounded_insert() {
        let cache: Cache<u32, bool> = Cache::new(4);
        assert!(cache.is_empty());
        for key in 0..4 {
            cache.insert(key, key % 2 == 0);
        }
        assert_eq!(cache.len(), 4);
        assert_eq!(cache.get(&2), Some(true));
        assert_eq!(cache.get(&3), Some(false));

        // Overwriting an existing key evicts nothing
        cache.insert(3, true);
        assert_eq!(cache.len(), 4);
        assert_eq!(cache.get(&3), Some(true));

        for key in 4..100 {
            cache.insert(key, true);
            assert_eq!(cache.len(), 4);
            assert_eq!(cache.get(&key), Some(true));
        }
    }

    #[test]
    fn test_zero_capacity() {
        let cache: Cache<u32, bool> = Cache::new(0);
        cache.insert(1, true);
        assert!(cache.is_empty());
        assert_eq!(cache.get(&1), None);
    }

    #[test]
    fn test_clones_share_entries() {
        let cache: Cache<u32, u32> = Cache::new(8);
        let clone = cache.clone();
        clone.insert(7, 49);
        assert_eq!(cache.get(&7), Some(49));
        assert_eq!(cache.capacity(), 8);
    }
}
