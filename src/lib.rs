//! B+ tree ordered map over a pluggable backing store.
//!
//! This crate provides [`BPlusMap`], an ordered key→value container built as
//! a B+ tree with a branching factor chosen at construction time and a
//! caller-supplied total order:
//!
//! - All entries live in leaves; internal nodes hold separator keys only.
//! - Leaves are threaded into a chain, so the entries of the tree are
//!   reachable in comparator order without re-descending from the root.
//! - Node and value placement goes through the [`Store`] trait: the same
//!   tree logic runs against the bundled in-memory [`MemStore`] or against
//!   an external paged store that allocates, reads, writes, and frees slots
//!   by opaque reference and may fail on any of those operations.
//!
//! # Example
//!
//! ```
//! use berth_tree::BPlusMap;
//!
//! let mut ages: BPlusMap<&str, u32> = BPlusMap::new(16);
//!
//! ages.insert("alice", 34).unwrap();
//! ages.insert("bob", 27).unwrap();
//!
//! assert_eq!(ages.get(&"alice").unwrap(), Some(34));
//! assert_eq!(ages.insert("bob", 28).unwrap(), Some(27));
//! assert_eq!(ages.remove(&"carol").unwrap(), None);
//! assert_eq!(ages.len(), 2);
//! ```
//!
//! # Features
//!
//! - **`no_std` compatible** - Only requires `alloc`, no standard library dependency
//! - **Runtime branching factor** - Node fan-out is a constructor argument, not a type parameter
//! - **Injected ordering** - Keys are compared only through a [`Comparator`]; `Ord` is one choice
//! - **Pluggable storage** - Every node and value lives behind a [`Store`] reference; store
//!   failures surface unchanged from every fallible operation

#![no_std]
// These forbid rules and lint groups are meant to be very restrictive.
#![forbid(unsafe_code)]
#![forbid(keyword_idents)]
#![forbid(non_ascii_idents)]
#![forbid(unreachable_pub)]
#![warn(clippy::all)]
#![warn(clippy::cargo)]
#![warn(clippy::pedantic)]
// Enable coverage attributes for nightly builds.
#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

extern crate alloc;

mod comparator;
mod raw;

pub mod bplus_map;
pub mod node;
pub mod store;

pub use bplus_map::BPlusMap;
pub use comparator::{Comparator, Natural};
pub use node::{InternalNode, LeafNode, Node, SearchResult};
pub use store::{Handle, MemStore, Store};
