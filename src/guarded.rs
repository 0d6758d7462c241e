//! Append-only collections shared between concurrent callers.
//!
//! Middleware lists and webhook handler registries are read on every call
//! and written rarely. [`GuardedList`] and [`GuardedMap`] keep their contents
//! in an [`ArcSwap`] and expose only two operations: append and snapshot.
//! A snapshot is an `Arc` of the contents at that moment, so readers never
//! block and never observe a later append.

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::Arc;

use arc_swap::ArcSwap;

/// An append-only list with copy-on-write snapshots.
#[derive(Debug)]
pub struct GuardedList<T> {
    items: ArcSwap<Vec<T>>,
}

impl<T> Default for GuardedList<T> {
    fn default() -> Self {
        Self {
            items: ArcSwap::from_pointee(Vec::new()),
        }
    }
}

impl<T: Clone> GuardedList<T> {
    /// Creates an empty list.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an item to the end of the list.
    ///
    /// Snapshots taken before the call are unaffected. Concurrent appends are
    /// all kept.
    pub fn push(&self, item: T) {
        self.items.rcu(|current| {
            let mut next = Vec::with_capacity(current.len() + 1);
            next.extend(current.iter().cloned());
            next.push(item.clone());
            next
        });
    }

    /// Returns the current contents.
    #[must_use]
    pub fn snapshot(&self) -> Arc<Vec<T>> {
        self.items.load_full()
    }

    /// Returns the number of items.
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.load().len()
    }

    /// Returns `true` if nothing has been appended.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// An append-only multimap: each key holds a list of values in insertion order.
#[derive(Debug)]
pub struct GuardedMap<K, V> {
    entries: ArcSwap<HashMap<K, Arc<Vec<V>>>>,
}

impl<K, V> Default for GuardedMap<K, V> {
    fn default() -> Self {
        Self {
            entries: ArcSwap::from_pointee(HashMap::new()),
        }
    }
}

impl<K: Clone + Eq + Hash, V: Clone> GuardedMap<K, V> {
    /// Creates an empty map.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a value to the list stored under `key`.
    pub fn push(&self, key: K, value: V) {
        self.entries.rcu(|current| {
            let mut next = HashMap::clone(current);
            let list = next.entry(key.clone()).or_default();
            let mut values = Vec::with_capacity(list.len() + 1);
            values.extend(list.iter().cloned());
            values.push(value.clone());
            *list = Arc::new(values);
            next
        });
    }

    /// Returns the values stored under `key`, or an empty list.
    #[must_use]
    pub fn snapshot<Q>(&self, key: &Q) -> Arc<Vec<V>>
    where
        K: std::borrow::Borrow<Q>,
        Q: Eq + Hash + ?Sized,
    {
        self.entries
            .load()
            .get(key)
            .map_or_else(|| Arc::new(Vec::new()), Arc::clone)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_list_snapshot_is_isolated_from_later_pushes() {
        let list = GuardedList::new();
        list.push(1);
        let before = list.snapshot();
        list.push(2);

        assert_eq!(*before, vec![1]);
        assert_eq!(*list.snapshot(), vec![1, 2]);
        assert_eq!(list.len(), 2);
    }

    #[test]
    fn test_map_keeps_insertion_order_per_key() {
        let map = GuardedMap::new();
        map.push("a".to_string(), 1);
        map.push("b".to_string(), 9);
        map.push("a".to_string(), 2);

        assert_eq!(*map.snapshot("a"), vec![1, 2]);
        assert_eq!(*map.snapshot("b"), vec![9]);
        assert!(map.snapshot("missing").is_empty());
    }

    #[test]
    fn test_concurrent_pushes_are_all_kept() {
        let list = Arc::new(GuardedList::new());
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let list = Arc::clone(&list);
                std::thread::spawn(move || list.push(i))
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let mut items = (*list.snapshot()).clone();
        items.sort_unstable();
        assert_eq!(items, (0..8).collect::<Vec<_>>());
    }

    #[test]
    fn test_concurrent_map_pushes_are_all_kept() {
        let map = Arc::new(GuardedMap::new());
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let map = Arc::clone(&map);
                std::thread::spawn(move || map.push(format!("k{}", i % 2), i))
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(map.snapshot("k0").len(), 4);
        assert_eq!(map.snapshot("k1").len(), 4);
    }
}
