use alloc::vec::Vec;
use core::convert::Infallible;

use super::Store;
use super::handle::Handle;
use crate::node::Node;

/// Slot arena with a free list.
///
/// `alloc` reserves an empty slot; the slot holds nothing until `set` fills
/// it. Freed slots are recycled before the backing vector grows, so churny
/// workloads reuse records instead of growing the arena.
#[derive(Clone)]
struct Arena<T> {
    slots: Vec<Option<T>>,
    free: Vec<Handle>,
}

impl<T> Arena<T> {
    const fn new() -> Self {
        Self {
            slots: Vec::new(),
            free: Vec::new(),
        }
    }

    /// Number of live slots: reserved or filled, not yet freed.
    const fn len(&self) -> usize {
        self.slots.len().saturating_sub(self.free.len())
    }

    fn alloc(&mut self) -> Handle {
        if let Some(h) = self.free.pop() {
            // Reuse a free slot/handle.
            h
        } else {
            // Strict less-than keeps every minted handle within Handle::MAX.
            assert!(
                self.slots.len() < Handle::MAX,
                "`Arena::alloc()` - arena is at maximum capacity ({})",
                Handle::MAX
            );
            self.slots.push(None);
            Handle::from_index(self.slots.len() - 1)
        }
    }

    #[inline]
    fn get(&self, handle: Handle) -> &T {
        self.slots[handle.to_index()].as_ref().expect("`Arena::get()` - `handle` is invalid!")
    }

    #[inline]
    fn set(&mut self, handle: Handle, element: T) {
        self.slots[handle.to_index()] = Some(element);
    }

    fn take(&mut self, handle: Handle) -> T {
        let element = self.slots[handle.to_index()].take().expect("`Arena::take()` - `handle` is invalid!");
        self.free.push(handle);
        element
    }

    fn free(&mut self, handle: Handle) {
        drop(self.take(handle));
    }
}

/// An in-memory [`Store`] backed by two slot arenas, one for nodes and one
/// for leaf values.
///
/// References are [`Handle`]s; reads clone the materialized record; no
/// operation can fail (`Error` is [`Infallible`]). Reading a reference that
/// was never written, or was freed, is a caller bug and panics.
#[derive(Clone)]
pub struct MemStore<K, V> {
    nodes: Arena<Node<K, Handle>>,
    values: Arena<V>,
}

impl<K, V> MemStore<K, V> {
    /// Creates an empty store.
    pub const fn new() -> Self {
        Self {
            nodes: Arena::new(),
            values: Arena::new(),
        }
    }

    /// Number of live node slots.
    pub const fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Number of live value slots.
    pub const fn value_count(&self) -> usize {
        self.values.len()
    }
}

impl<K, V> Default for MemStore<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: Clone, V: Clone> Store<K, V> for MemStore<K, V> {
    type Ref = Handle;
    type Error = Infallible;

    fn alloc_node(&mut self) -> Result<Handle, Infallible> {
        Ok(self.nodes.alloc())
    }

    fn read_node(&self, r: Handle) -> Result<Node<K, Handle>, Infallible> {
        Ok(self.nodes.get(r).clone())
    }

    fn write_node(&mut self, r: Handle, n: Node<K, Handle>) -> Result<(), Infallible> {
        self.nodes.set(r, n);
        Ok(())
    }

    fn dealloc_node(&mut self, r: Handle) -> Result<(), Infallible> {
        self.nodes.free(r);
        Ok(())
    }

    fn alloc_value(&mut self) -> Result<Handle, Infallible> {
        Ok(self.values.alloc())
    }

    fn read_value(&self, r: Handle) -> Result<V, Infallible> {
        Ok(self.values.get(r).clone())
    }

    fn write_value(&mut self, r: Handle, v: V) -> Result<(), Infallible> {
        self.values.set(r, v);
        Ok(())
    }

    fn dealloc_value(&mut self, r: Handle) -> Result<(), Infallible> {
        self.values.free(r);
        Ok(())
    }
}
