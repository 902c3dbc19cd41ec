//! The public map facade.

use crate::comparator::{Comparator, Natural};
use crate::raw::RawBPlusMap;
use crate::store::{MemStore, Store};

/// The branching factor used by [`BPlusMap::default`].
pub const DEFAULT_BRANCH: usize = 16;

/// An ordered map based on a B+ tree over a pluggable backing store.
///
/// Entries live in leaf nodes; internal nodes carry separator keys only, and
/// the leaves are threaded into a chain in key order. The branching factor —
/// the upper bound on a node's child count — is chosen at construction and
/// must be at least 4. Keys are ordered solely by the map's [`Comparator`]:
/// two keys are the same entry exactly when the comparator says so, and the
/// key type needs no `Eq` or `Hash`.
///
/// Every node and value is placed through the map's [`Store`], so each
/// fallible operation returns `Result` with the store's error type. The
/// default store, [`MemStore`], keeps everything in memory and cannot fail.
/// A store error aborts the edit in progress and surfaces unchanged; the map
/// does not roll back writes the edit already issued.
///
/// Inserting an existing key replaces its value and returns the old one;
/// looking up or removing a missing key is not an error and reports `None`.
///
/// # Examples
///
/// ```
/// use berth_tree::BPlusMap;
///
/// let mut reviews: BPlusMap<&str, &str> = BPlusMap::new(4);
///
/// reviews.insert("Office Space", "Deals with real issues in the workplace.").unwrap();
/// reviews.insert("Pulp Fiction", "Masterpiece.").unwrap();
/// reviews.insert("The Godfather", "Very enjoyable.").unwrap();
///
/// assert!(reviews.contains_key(&"Office Space").unwrap());
/// assert_eq!(reviews.remove(&"Pulp Fiction").unwrap(), Some("Masterpiece."));
/// assert_eq!(reviews.get(&"Pulp Fiction").unwrap(), None);
/// assert_eq!(reviews.len(), 2);
/// ```
pub struct BPlusMap<K, V, C = Natural, S = MemStore<K, V>>
where
    S: Store<K, V>,
{
    raw: RawBPlusMap<K, V, C, S>,
}

impl<K, V> BPlusMap<K, V>
where
    K: Clone,
    V: Clone,
{
    /// Creates an empty map with the given branching factor, ordered by the
    /// key type's [`Ord`] and stored in memory.
    ///
    /// # Panics
    ///
    /// Panics if `branch < 4`.
    ///
    /// # Examples
    ///
    /// ```
    /// use berth_tree::BPlusMap;
    ///
    /// let mut map: BPlusMap<u32, &str> = BPlusMap::new(4);
    /// map.insert(1, "a").unwrap();
    /// assert_eq!(map.len(), 1);
    /// ```
    #[must_use]
    pub fn new(branch: usize) -> Self
    where
        K: Ord,
    {
        Self::with_store(branch, Natural, MemStore::new())
    }
}

impl<K, V, C> BPlusMap<K, V, C>
where
    K: Clone,
    V: Clone,
    C: Comparator<K>,
{
    /// Creates an empty in-memory map ordered by `cmp`.
    ///
    /// # Panics
    ///
    /// Panics if `branch < 4`.
    ///
    /// # Examples
    ///
    /// ```
    /// use berth_tree::BPlusMap;
    ///
    /// let mut map = BPlusMap::with_comparator(4, |x: &i32, y: &i32| y.cmp(x));
    /// map.insert(3, "three").unwrap();
    /// assert_eq!(map.get(&3).unwrap(), Some("three"));
    /// ```
    pub fn with_comparator(branch: usize, cmp: C) -> Self {
        Self::with_store(branch, cmp, MemStore::new())
    }
}

impl<K, V, C, S> BPlusMap<K, V, C, S>
where
    K: Clone,
    C: Comparator<K>,
    S: Store<K, V>,
{
    /// Creates an empty map ordered by `cmp` over the given store.
    ///
    /// # Panics
    ///
    /// Panics if `branch < 4`.
    pub fn with_store(branch: usize, cmp: C, store: S) -> Self {
        Self {
            raw: RawBPlusMap::new(branch, cmp, store),
        }
    }

    /// Returns the number of entries in the map.
    pub const fn len(&self) -> usize {
        self.raw.len()
    }

    /// Returns true if the map contains no entries.
    pub const fn is_empty(&self) -> bool {
        self.raw.len() == 0
    }

    /// Returns the branching factor.
    pub const fn branch(&self) -> usize {
        self.raw.branch()
    }

    /// Returns the height of the tree: 0 when empty, otherwise the number
    /// of levels from the root to the leaves inclusive.
    pub const fn height(&self) -> usize {
        self.raw.height()
    }

    /// Returns a reference to the backing store.
    pub const fn store(&self) -> &S {
        self.raw.store()
    }

    /// Returns a reference to the comparator.
    pub const fn comparator(&self) -> &C {
        self.raw.comparator()
    }

    /// Returns the value for `key`, if present.
    ///
    /// # Errors
    ///
    /// Surfaces any store failure unchanged.
    ///
    /// # Examples
    ///
    /// ```
    /// use berth_tree::BPlusMap;
    ///
    /// let mut map: BPlusMap<u32, &str> = BPlusMap::new(4);
    /// map.insert(1, "a").unwrap();
    /// assert_eq!(map.get(&1).unwrap(), Some("a"));
    /// assert_eq!(map.get(&2).unwrap(), None);
    /// ```
    pub fn get(&self, key: &K) -> Result<Option<V>, S::Error> {
        self.raw.get(key)
    }

    /// Returns true if the map contains `key`.
    ///
    /// # Errors
    ///
    /// Surfaces any store failure unchanged.
    pub fn contains_key(&self, key: &K) -> Result<bool, S::Error> {
        self.raw.contains(key)
    }

    /// Inserts a key-value pair, returning the old value if the key was
    /// already present (the stored key is kept).
    ///
    /// # Errors
    ///
    /// Surfaces any store failure unchanged; the edit is abandoned where it
    /// stood.
    ///
    /// # Examples
    ///
    /// ```
    /// use berth_tree::BPlusMap;
    ///
    /// let mut map: BPlusMap<u32, &str> = BPlusMap::new(4);
    /// assert_eq!(map.insert(37, "a").unwrap(), None);
    /// assert_eq!(map.insert(37, "b").unwrap(), Some("a"));
    /// assert_eq!(map.get(&37).unwrap(), Some("b"));
    /// ```
    pub fn insert(&mut self, key: K, value: V) -> Result<Option<V>, S::Error> {
        self.raw.insert(key, value)
    }

    /// Removes `key` from the map, returning its value if it was present.
    ///
    /// # Errors
    ///
    /// Surfaces any store failure unchanged; the edit is abandoned where it
    /// stood.
    ///
    /// # Examples
    ///
    /// ```
    /// use berth_tree::BPlusMap;
    ///
    /// let mut map: BPlusMap<u32, &str> = BPlusMap::new(4);
    /// map.insert(1, "a").unwrap();
    /// assert_eq!(map.remove(&1).unwrap(), Some("a"));
    /// assert_eq!(map.remove(&1).unwrap(), None);
    /// ```
    pub fn remove(&mut self, key: &K) -> Result<Option<V>, S::Error> {
        self.raw.remove(key)
    }
}

impl<K, V> Default for BPlusMap<K, V>
where
    K: Clone + Ord,
    V: Clone,
{
    /// An empty in-memory map with branching factor [`DEFAULT_BRANCH`].
    fn default() -> Self {
        Self::new(DEFAULT_BRANCH)
    }
}
