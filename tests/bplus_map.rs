use std::cell::Cell;
use std::collections::BTreeMap;

use proptest::prelude::*;
use thiserror::Error;

use berth_tree::{BPlusMap, Handle, MemStore, Node, Store};

/// The number of operations to perform in each proptest case.
const TEST_SIZE: usize = 10_000;

/// Deterministic pseudo-random sequence; keeps the tests free of a
/// random-number dependency.
fn lcg(seed: u64) -> impl FnMut() -> u64 {
    let mut x = seed;
    move || {
        x = x.wrapping_mul(6364136223846793005).wrapping_add(1);
        x >> 33
    }
}

// ─── End-to-end scenarios ────────────────────────────────────────────────────

#[test]
fn ordered_fill_and_reverse_drain() {
    for branch in [4, 5, 10, 50] {
        let mut map: BPlusMap<i64, i64> = BPlusMap::new(branch);
        for i in 0..1024 {
            assert_eq!(map.insert(i, i).unwrap(), None);
        }
        assert_eq!(map.len(), 1024);
        for i in 0..1024 {
            assert_eq!(map.get(&i).unwrap(), Some(i), "branch {branch}, key {i}");
        }
        for i in (0..1024).rev() {
            assert_eq!(map.remove(&i).unwrap(), Some(i), "branch {branch}, key {i}");
        }
        assert!(map.is_empty());
        assert_eq!(map.height(), 0);
    }
}

#[test]
fn large_fill_and_two_sided_drain() {
    let mut map: BPlusMap<i64, i64> = BPlusMap::new(4);
    for i in 0..65536 {
        map.insert(i, i).unwrap();
    }
    for i in (32768..65536).rev() {
        assert_eq!(map.remove(&i).unwrap(), Some(i));
    }
    for i in 0..32768 {
        assert_eq!(map.remove(&i).unwrap(), Some(i));
    }
    assert!(map.is_empty());
    assert_eq!(map.height(), 0);
}

#[test]
fn random_fill_tracks_reference_map() {
    const N: usize = 1 << 20;

    let mut map: BPlusMap<i64, i64> = BPlusMap::new(4);
    let mut reference: BTreeMap<i64, i64> = BTreeMap::new();
    let mut rand = lcg(42);

    for i in 0..N {
        let key = (rand() % (1 << 20)) as i64;
        let value = i as i64;
        assert_eq!(map.insert(key, value).unwrap(), reference.insert(key, value));
    }
    assert_eq!(map.len(), reference.len());

    for (&key, &value) in &reference {
        assert_eq!(map.get(&key).unwrap(), Some(value));
    }
    for (key, value) in reference {
        assert_eq!(map.remove(&key).unwrap(), Some(value));
    }
    assert!(map.is_empty());
    assert_eq!(map.height(), 0);
}

#[test]
fn replacing_insert_returns_old_value() {
    let mut map: BPlusMap<i64, i64> = BPlusMap::new(4);
    for i in 0..10 {
        map.insert(i, i).unwrap();
    }
    assert_eq!(map.insert(3, 300).unwrap(), Some(3));
    assert_eq!(map.get(&3).unwrap(), Some(300));
    assert_eq!(map.len(), 10);
}

#[test]
fn remove_is_idempotent() {
    let mut map: BPlusMap<i64, i64> = BPlusMap::new(4);
    assert_eq!(map.remove(&1).unwrap(), None);

    map.insert(1, 10).unwrap();
    assert_eq!(map.remove(&1).unwrap(), Some(10));
    assert_eq!(map.get(&1).unwrap(), None);
    assert_eq!(map.remove(&1).unwrap(), None);
    assert!(map.is_empty());
}

// ─── Store failure propagation ───────────────────────────────────────────────

/// Error produced by [`FlakyStore`] once its operation budget runs out.
#[derive(Clone, Copy, Debug, Error, Eq, PartialEq)]
#[error("backing store failed")]
struct StoreFault;

/// A store that forwards to [`MemStore`] until a fixed number of operations
/// have run, then fails every operation.
struct FlakyStore<K, V> {
    inner: MemStore<K, V>,
    remaining: Cell<usize>,
}

impl<K, V> FlakyStore<K, V> {
    fn new(budget: usize) -> Self {
        Self {
            inner: MemStore::new(),
            remaining: Cell::new(budget),
        }
    }

    fn set_remaining(&self, budget: usize) {
        self.remaining.set(budget);
    }

    fn tick(&self) -> Result<(), StoreFault> {
        let remaining = self.remaining.get();
        if remaining == 0 {
            return Err(StoreFault);
        }
        self.remaining.set(remaining - 1);
        Ok(())
    }
}

impl<K: Clone, V: Clone> Store<K, V> for FlakyStore<K, V> {
    type Ref = Handle;
    type Error = StoreFault;

    fn alloc_node(&mut self) -> Result<Handle, StoreFault> {
        self.tick()?;
        Ok(self.inner.alloc_node().unwrap())
    }

    fn read_node(&self, r: Handle) -> Result<Node<K, Handle>, StoreFault> {
        self.tick()?;
        Ok(self.inner.read_node(r).unwrap())
    }

    fn write_node(&mut self, r: Handle, n: Node<K, Handle>) -> Result<(), StoreFault> {
        self.tick()?;
        Ok(self.inner.write_node(r, n).unwrap())
    }

    fn dealloc_node(&mut self, r: Handle) -> Result<(), StoreFault> {
        self.tick()?;
        Ok(self.inner.dealloc_node(r).unwrap())
    }

    fn alloc_value(&mut self) -> Result<Handle, StoreFault> {
        self.tick()?;
        Ok(self.inner.alloc_value().unwrap())
    }

    fn read_value(&self, r: Handle) -> Result<V, StoreFault> {
        self.tick()?;
        Ok(self.inner.read_value(r).unwrap())
    }

    fn write_value(&mut self, r: Handle, v: V) -> Result<(), StoreFault> {
        self.tick()?;
        Ok(self.inner.write_value(r, v).unwrap())
    }

    fn dealloc_value(&mut self, r: Handle) -> Result<(), StoreFault> {
        self.tick()?;
        Ok(self.inner.dealloc_value(r).unwrap())
    }
}

#[test]
fn store_errors_surface_unchanged() {
    let store: FlakyStore<i64, i64> = FlakyStore::new(usize::MAX);
    let mut map = BPlusMap::with_store(4, berth_tree::Natural, store);
    for i in 0..100 {
        map.insert(i, i).unwrap();
    }

    map.store().set_remaining(0);
    assert_eq!(map.get(&5), Err(StoreFault));
    assert_eq!(map.insert(200, 200), Err(StoreFault));
    assert_eq!(map.remove(&5), Err(StoreFault));
    assert_eq!(map.len(), 100, "failed edits must not change the length");

    // With the budget restored the map picks up where it left off.
    map.store().set_remaining(usize::MAX);
    for i in 0..100 {
        assert_eq!(map.get(&i).unwrap(), Some(i));
    }
    assert_eq!(map.insert(200, 200).unwrap(), None);
    assert_eq!(map.remove(&200).unwrap(), Some(200));
}

#[test]
fn store_error_aborts_a_deep_edit() {
    let store: FlakyStore<i64, i64> = FlakyStore::new(usize::MAX);
    let mut map = BPlusMap::with_store(4, berth_tree::Natural, store);
    for i in 0..1000 {
        map.insert(i, i).unwrap();
    }

    // Enough budget to start descending, not enough to finish the edit.
    map.store().set_remaining(2);
    assert_eq!(map.remove(&500), Err(StoreFault));
    assert_eq!(map.len(), 1000);

    map.store().set_remaining(usize::MAX);
    assert_eq!(map.remove(&500).unwrap(), Some(500));
    assert_eq!(map.len(), 999);
}

// ─── Randomized model test ──────────────────────────────────────────────────

#[derive(Clone, Debug)]
enum MapOp {
    Insert(i64, i64),
    Remove(i64),
    Get(i64),
    ContainsKey(i64),
}

/// Keys drawn from a range smaller than `TEST_SIZE` to force collisions.
fn key_strategy() -> impl Strategy<Value = i64> {
    -2_000i64..2_000i64
}

fn map_op_strategy() -> impl Strategy<Value = MapOp> {
    prop_oneof![
        5 => (key_strategy(), any::<i64>()).prop_map(|(k, v)| MapOp::Insert(k, v)),
        3 => key_strategy().prop_map(MapOp::Remove),
        2 => key_strategy().prop_map(MapOp::Get),
        1 => key_strategy().prop_map(MapOp::ContainsKey),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(20))]

    /// Replays a random sequence of insert/remove/get operations on both
    /// BPlusMap and BTreeMap and asserts identical results at every step.
    #[test]
    fn map_ops_match_btreemap(ops in proptest::collection::vec(map_op_strategy(), TEST_SIZE)) {
        let mut map: BPlusMap<i64, i64> = BPlusMap::new(5);
        let mut model: BTreeMap<i64, i64> = BTreeMap::new();

        for op in &ops {
            match op {
                MapOp::Insert(k, v) => {
                    prop_assert_eq!(map.insert(*k, *v).unwrap(), model.insert(*k, *v), "insert({}, {})", k, v);
                }
                MapOp::Remove(k) => {
                    prop_assert_eq!(map.remove(k).unwrap(), model.remove(k), "remove({})", k);
                }
                MapOp::Get(k) => {
                    prop_assert_eq!(map.get(k).unwrap(), model.get(k).copied(), "get({})", k);
                }
                MapOp::ContainsKey(k) => {
                    prop_assert_eq!(map.contains_key(k).unwrap(), model.contains_key(k), "contains_key({})", k);
                }
            }
            prop_assert_eq!(map.len(), model.len(), "len mismatch after {:?}", op);
            prop_assert_eq!(map.is_empty(), model.is_empty(), "is_empty mismatch after {:?}", op);
        }
    }
}
