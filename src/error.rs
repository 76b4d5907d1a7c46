//! Error types reported by map accessors and cursor operations.
//!
//! Both variants signal a usage error at the call site, not a transient
//! condition: nothing is retried internally, and an `Err` never leaves the
//! map in a partially-updated state. Inserting a key that is already present
//! is *not* an error; see [`AvlMap::insert`](crate::AvlMap::insert).

use thiserror::Error;

/// The error type for fallible [`AvlMap`](crate::AvlMap) operations.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// A bounds-checked access did not find the requested key.
    ///
    /// Returned by [`AvlMap::at`](crate::AvlMap::at) and
    /// [`AvlMap::at_mut`](crate::AvlMap::at_mut).
    #[error("key not found")]
    NotFound,

    /// A cursor was used where a dereferenceable cursor of this map was
    /// required.
    ///
    /// Covers the end sentinel where an element cursor is needed, cursors
    /// minted by a different map instance, cursors whose node has since been
    /// erased, and stepping past either end of the map.
    #[error("cursor is not valid for this map")]
    InvalidCursor,
}
