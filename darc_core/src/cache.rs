//! Memoized user and group name lookups.
//!
//! Listings resolve the same few uids and gids over and over. The cache is an
//! explicit value owned by the caller and may be shared across threads.

use dashmap::DashMap;
use std::hash::Hash;

/// Concurrency-safe insert-if-absent memo.
#[derive(Debug)]
pub struct NameCache<K, V>
where
    K: Eq + Hash,
{
    entries: DashMap<K, V>,
}

impl<K, V> NameCache<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    /// Create an empty cache.
    pub fn new() -> Self {
        Self {
            entries: DashMap::new(),
        }
    }

    /// Return the cached value for `key`, computing and storing it if absent.
    ///
    /// `compute` runs at most once per key, even under concurrent callers.
    pub fn get_or_insert_with(&self, key: K, compute: impl FnOnce(&K) -> V) -> V {
        if let Some(value) = self.entries.get(&key) {
            return value.value().clone();
        }
        self.entries
            .entry(key.clone())
            .or_insert_with(|| compute(&key))
            .value()
            .clone()
    }

    /// Cached value for `key`, without computing it.
    pub fn get(&self, key: &K) -> Option<V> {
        self.entries.get(key).map(|value| value.value().clone())
    }

    /// Number of cached keys.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when nothing is cached yet.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<K, V> Default for NameCache<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    fn default() -> Self {
        Self::new()
    }
}

/// Source of user and group names, usually the operating system.
pub trait OwnerLookup {
    /// Name of the user with `uid`.
    fn user_name(&self, uid: u32) -> Option<String>;
    /// Id of the user called `name`.
    fn user_id(&self, name: &str) -> Option<u32>;
    /// Name of the group with `gid`.
    fn group_name(&self, gid: u32) -> Option<String>;
    /// Id of the group called `name`.
    fn group_id(&self, name: &str) -> Option<u32>;
}

/// Caches the four owner lookups in front of an [`OwnerLookup`].
///
/// Misses are cached too, so an unknown id is only looked up once.
pub struct OwnerNames<L> {
    lookup: L,
    uid_to_user: NameCache<u32, Option<String>>,
    user_to_uid: NameCache<String, Option<u32>>,
    gid_to_group: NameCache<u32, Option<String>>,
    group_to_gid: NameCache<String, Option<u32>>,
}

impl<L: OwnerLookup> OwnerNames<L> {
    /// Wrap `lookup` with empty caches.
    pub fn new(lookup: L) -> Self {
        Self {
            lookup,
            uid_to_user: NameCache::new(),
            user_to_uid: NameCache::new(),
            gid_to_group: NameCache::new(),
            group_to_gid: NameCache::new(),
        }
    }

    /// uid to user name.
    pub fn uid_to_user(&self, uid: u32) -> Option<String> {
        self.uid_to_user
            .get_or_insert_with(uid, |uid| self.lookup.user_name(*uid))
    }

    /// User name to uid.
    pub fn user_to_uid(&self, name: &str) -> Option<u32> {
        self.user_to_uid
            .get_or_insert_with(name.to_string(), |name| self.lookup.user_id(name))
    }

    /// gid to group name.
    pub fn gid_to_group(&self, gid: u32) -> Option<String> {
        self.gid_to_group
            .get_or_insert_with(gid, |gid| self.lookup.group_name(*gid))
    }

    /// Group name to gid.
    pub fn group_to_gid(&self, name: &str) -> Option<u32> {
        self.group_to_gid
            .get_or_insert_with(name.to_string(), |name| self.lookup.group_id(name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::thread;

    #[derive(Default)]
    struct FakeLookup {
        calls: AtomicUsize,
    }

    impl OwnerLookup for FakeLookup {
        fn user_name(&self, uid: u32) -> Option<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            (uid == 0).then(|| "root".to_string())
        }

        fn user_id(&self, name: &str) -> Option<u32> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            (name == "root").then_some(0)
        }

        fn group_name(&self, gid: u32) -> Option<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            (gid == 100).then(|| "users".to_string())
        }

        fn group_id(&self, name: &str) -> Option<u32> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            (name == "users").then_some(100)
        }
    }

    #[test]
    fn test_get_or_insert_computes_once() {
        let cache: NameCache<u32, String> = NameCache::new();
        let mut calls = 0;

        assert_eq!(
            cache.get_or_insert_with(1, |k| {
                calls += 1;
                format!("id{}", k)
            }),
            "id1"
        );
        assert_eq!(cache.get_or_insert_with(1, |_| unreachable!()), "id1");
        assert_eq!(calls, 1);
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get(&1), Some("id1".to_string()));
        assert_eq!(cache.get(&2), None);
    }

    #[test]
    fn test_owner_names_cache_hits_and_misses() {
        let names = OwnerNames::new(FakeLookup::default());

        assert_eq!(names.uid_to_user(0), Some("root".to_string()));
        assert_eq!(names.uid_to_user(0), Some("root".to_string()));
        assert_eq!(names.uid_to_user(42), None);
        assert_eq!(names.uid_to_user(42), None);
        assert_eq!(names.user_to_uid("root"), Some(0));
        assert_eq!(names.gid_to_group(100), Some("users".to_string()));
        assert_eq!(names.group_to_gid("users"), Some(100));
        assert_eq!(names.group_to_gid("nobody-here"), None);

        // Six distinct keys, six lookups.
        assert_eq!(names.lookup.calls.load(Ordering::SeqCst), 6);
    }

    #[test]
    fn test_concurrent_inserts() {
        let cache = Arc::new(NameCache::<u32, u32>::new());
        let computed = Arc::new(AtomicUsize::new(0));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let cache = Arc::clone(&cache);
                let computed = Arc::clone(&computed);
                thread::spawn(move || {
                    for key in 0..64 {
                        let value = cache.get_or_insert_with(key, |k| {
                            computed.fetch_add(1, Ordering::SeqCst);
                            k * 2
                        });
                        assert_eq!(value, key * 2);
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(cache.len(), 64);
        assert_eq!(computed.load(Ordering::SeqCst), 64);
    }
}
