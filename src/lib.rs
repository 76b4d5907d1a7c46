//! # An ordered map traversed with detached cursors
//!
//! `cursor-collections` provides [`AvlMap`], a sorted map built on a
//! height-balanced binary search tree whose nodes live in an index arena and
//! carry no parent links.  Iteration and cursor stepping re-descend from the
//! root instead, paying a few comparator calls per step for one pointer less
//! per node.  The ordering comes from a caller-supplied comparator (the
//! [`compare`] crate's `Compare` trait), defaulting to the keys' natural
//! order.  `cursor-collections` covers a subset of the functionality of
//! `std::collections::BTreeMap`, which is way more mature; unless you need
//! detached, copyable cursors, you probably should use `BTreeMap` instead of
//! this crate.

mod arena;
mod error;

mod avl;
pub use avl::{AvlMap, Cursor, Entry, Iter, OccupiedEntry, VacantEntry};
pub use error::Error;
