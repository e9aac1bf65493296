//! Ordered subscriber sets
//!
//! [`Subscribers`] is the edge list used between graph nodes that notify
//! each other by key rather than by closure. Insertion is idempotent and
//! iteration follows insertion order.

use smallvec::SmallVec;

/// Ordered set of keys with idempotent insertion
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Subscribers<K: Copy + PartialEq> {
    keys: SmallVec<[K; 4]>,
}

impl<K: Copy + PartialEq> Subscribers<K> {
    pub fn new() -> Self {
        Self {
            keys: SmallVec::new(),
        }
    }

    /// Add a key, returning `false` if it was already present
    pub fn insert(&mut self, key: K) -> bool {
        if self.keys.contains(&key) {
            return false;
        }
        self.keys.push(key);
        true
    }

    /// Remove a key, preserving the order of the rest
    pub fn remove(&mut self, key: K) -> bool {
        match self.keys.iter().position(|k| *k == key) {
            Some(index) => {
                self.keys.remove(index);
                true
            }
            None => false,
        }
    }

    pub fn contains(&self, key: K) -> bool {
        self.keys.contains(&key)
    }

    /// Copy of the current keys, safe to iterate while the set is mutated
    pub fn snapshot(&self) -> SmallVec<[K; 4]> {
        self.keys.clone()
    }

    /// Remove and return every key
    pub fn take(&mut self) -> SmallVec<[K; 4]> {
        std::mem::take(&mut self.keys)
    }

    pub fn iter(&self) -> impl Iterator<Item = K> + '_ {
        self.keys.iter().copied()
    }

    pub fn as_slice(&self) -> &[K] {
        &self.keys
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

impl<K: Copy + PartialEq> Default for Subscribers<K> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: Copy + PartialEq> FromIterator<K> for Subscribers<K> {
    fn from_iter<I: IntoIterator<Item = K>>(iter: I) -> Self {
        let mut set = Self::new();
        for key in iter {
            set.insert(key);
        }
        set
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_is_idempotent() {
        let mut set = Subscribers::new();
        assert!(set.insert(3));
        assert!(!set.insert(3));
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn test_remove_keeps_order() {
        let mut set: Subscribers<u32> = [1, 2, 3, 4].into_iter().collect();
        assert!(set.remove(2));
        assert!(!set.remove(2));
        assert_eq!(set.as_slice(), &[1, 3, 4]);
    }

    #[test]
    fn test_take_empties_the_set() {
        let mut set: Subscribers<u32> = [5, 6].into_iter().collect();
        let taken = set.take();
        assert_eq!(taken.as_slice(), &[5, 6]);
        assert!(set.is_empty());
    }
}
