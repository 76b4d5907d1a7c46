//! Cursors and in-order traversal.
//!
//! Nodes carry no parent links, so stepping to a neighbor re-descends from
//! the root: O(height) per step, the same order as parent-pointer walking
//! but with extra comparator calls. The structure spends comparisons per
//! step instead of a pointer per node; keep it that way when touching this
//! module.

use std::iter::FusedIterator;

use super::*;

/// A detached position in an [`AvlMap`]: either one entry or the
/// past-the-end sentinel.
///
/// Cursors are plain copyable values. They hold no borrow of the map, so
/// the map stays usable while cursors are outstanding; every cursor
/// operation goes back through the owning map
/// ([`next_cursor`](AvlMap::next_cursor), [`value_at`](AvlMap::value_at),
/// [`remove_at`](AvlMap::remove_at), ...), which rejects cursors of other
/// maps with [`Error::InvalidCursor`]. Two cursors are equal when they sit
/// at the same node of the same map instance; cursors of different maps are
/// never equal, even if the maps have equal contents.
///
/// A cursor stays valid exactly as long as its entry is in the map.
/// Rebalancing never moves an entry, so inserting and erasing *other* keys
/// leaves a cursor watching the same entry. Erasing the cursor's own entry
/// invalidates it: the map will then reject it, unless enough later
/// insertions have recycled its slot, in which case the cursor silently
/// watches the recycled entry. Holding cursors across the erase of their
/// entry is a usage error; the map only promises memory safety for it.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct Cursor {
    pub(crate) map: u64,
    pub(crate) node: Link,
}

impl Cursor {
    /// True if this is a past-the-end sentinel (of any map).
    pub fn is_end(&self) -> bool {
        self.node.is_none()
    }
}

pub(crate) fn leftmost<K, V>(nodes: &Slab<K, V>, mut idx: u32) -> u32 {
    while let Some(lf) = nodes[idx].left {
        idx = lf;
    }
    idx
}

pub(crate) fn rightmost<K, V>(nodes: &Slab<K, V>, mut idx: u32) -> u32 {
    while let Some(rt) = nodes[idx].right {
        idx = rt;
    }
    idx
}

impl<K, V, C> AvlMap<K, V, C>
where
    C: Compare<K>,
{
    // A cursor is usable iff it was minted by this map and its slot still
    // holds a node. A stale index whose slot was recycled is
    // indistinguishable from a live cursor; see the Cursor docs.
    fn resolve(&self, at: Cursor) -> Result<u32, Error> {
        if at.map != self.id {
            return Err(Error::InvalidCursor);
        }
        let idx = at.node.ok_or(Error::InvalidCursor)?;
        if self.nodes.get(idx).is_none() {
            return Err(Error::InvalidCursor);
        }
        Ok(idx)
    }

    // In-order successor: the leftmost node of the right subtree, or a
    // fresh descent from the root remembering the last node we stepped
    // left from. No candidate means idx holds the greatest key.
    pub(crate) fn succ(&self, idx: u32) -> Link {
        if let Some(rt) = self.nodes[idx].right {
            return Some(leftmost(&self.nodes, rt)); // *** EARLY RETURN ***
        }

        let key = &self.nodes[idx].key;
        let mut candidate = None;
        let mut curr = self.root;
        while let Some(c) = curr {
            let n = &self.nodes[c];
            match self.cmp.compare(&n.key, key) {
                Greater => {
                    candidate = Some(c);
                    curr = n.left;
                }
                Less => curr = n.right,
                Equal => break,
            }
        }

        candidate
    }

    // In-order predecessor; mirror image of succ.
    pub(crate) fn pred(&self, idx: u32) -> Link {
        if let Some(lf) = self.nodes[idx].left {
            return Some(rightmost(&self.nodes, lf)); // *** EARLY RETURN ***
        }

        let key = &self.nodes[idx].key;
        let mut candidate = None;
        let mut curr = self.root;
        while let Some(c) = curr {
            let n = &self.nodes[c];
            match self.cmp.compare(&n.key, key) {
                Less => {
                    candidate = Some(c);
                    curr = n.right;
                }
                Greater => curr = n.left,
                Equal => break,
            }
        }

        candidate
    }

    /// A cursor at the least entry, or the end sentinel if the map is
    /// empty; `first_cursor() == end_cursor()` exactly when empty.
    pub fn first_cursor(&self) -> Cursor {
        self.cursor(self.root.map(|r| leftmost(&self.nodes, r)))
    }

    /// The past-the-end sentinel cursor of this map.
    pub fn end_cursor(&self) -> Cursor {
        self.cursor(None)
    }

    /// Steps a cursor to the next entry in comparator order.
    ///
    /// The successor of the greatest entry is the end sentinel. Stepping
    /// the end sentinel itself, or a cursor this map does not recognize,
    /// fails with [`Error::InvalidCursor`].
    pub fn next_cursor(&self, at: Cursor) -> Result<Cursor, Error> {
        let idx = self.resolve(at)?;
        Ok(self.cursor(self.succ(idx)))
    }

    /// Steps a cursor to the previous entry in comparator order.
    ///
    /// Stepping back from the end sentinel lands on the greatest entry.
    /// Stepping back from the least entry, or from the end sentinel of an
    /// empty map, fails with [`Error::InvalidCursor`].
    pub fn prev_cursor(&self, at: Cursor) -> Result<Cursor, Error> {
        if at.map != self.id {
            return Err(Error::InvalidCursor);
        }

        match at.node {
            None => {
                let root = self.root.ok_or(Error::InvalidCursor)?;
                Ok(self.cursor(Some(rightmost(&self.nodes, root))))
            }
            Some(_) => {
                let idx = self.resolve(at)?;
                let prev = self.pred(idx).ok_or(Error::InvalidCursor)?;
                Ok(self.cursor(Some(prev)))
            }
        }
    }

    /// The key at the cursor.
    pub fn key_at(&self, at: Cursor) -> Result<&K, Error> {
        let idx = self.resolve(at)?;
        Ok(&self.nodes[idx].key)
    }

    /// The value at the cursor.
    pub fn value_at(&self, at: Cursor) -> Result<&V, Error> {
        let idx = self.resolve(at)?;
        Ok(&self.nodes[idx].val)
    }

    /// A mutable reference to the value at the cursor.
    pub fn value_at_mut(&mut self, at: Cursor) -> Result<&mut V, Error> {
        let idx = self.resolve(at)?;
        Ok(&mut self.nodes[idx].val)
    }

    /// The key-value pair at the cursor.
    ///
    /// # Examples
    /// ```
    /// use cursor_collections::AvlMap;
    ///
    /// let mut m = AvlMap::new();
    /// m.insert(2, "b");
    /// m.insert(1, "a");
    ///
    /// let mut at = m.first_cursor();
    /// assert_eq!(m.entry_at(at), Ok((&1, &"a")));
    /// at = m.next_cursor(at).unwrap();
    /// assert_eq!(m.entry_at(at), Ok((&2, &"b")));
    /// assert_eq!(m.next_cursor(at).unwrap(), m.end_cursor());
    /// ```
    pub fn entry_at(&self, at: Cursor) -> Result<(&K, &V), Error> {
        let idx = self.resolve(at)?;
        let n = &self.nodes[idx];
        Ok((&n.key, &n.val))
    }

    /// Finds an entry with a key equivalent to the given key and returns a
    /// cursor at it, or the end sentinel if there is none.
    pub fn find<Q>(&self, key: &Q) -> Cursor
    where
        C: Compare<Q, K>,
        Q: ?Sized,
    {
        let mut curr = self.root;
        while let Some(idx) = curr {
            let n = &self.nodes[idx];
            match self.cmp.compare(key, &n.key) {
                Less => curr = n.left,
                Equal => return self.cursor(Some(idx)),
                Greater => curr = n.right,
            }
        }

        self.end_cursor()
    }

    /// Erases the entry at the cursor and returns its key and value.
    ///
    /// Fails with [`Error::InvalidCursor`] if the cursor is the end
    /// sentinel, belongs to a different map, or its entry is already gone.
    /// Cursors at other entries stay valid; further copies of this cursor
    /// do not.
    ///
    /// # Examples
    /// ```
    /// use cursor_collections::{AvlMap, Error};
    ///
    /// let mut m = AvlMap::new();
    /// m.insert(1, "a");
    ///
    /// let at = m.find(&1);
    /// assert_eq!(m.remove_at(at), Ok((1, "a")));
    /// assert_eq!(m.remove_at(at), Err(Error::InvalidCursor));
    /// assert!(m.is_empty());
    /// ```
    pub fn remove_at(&mut self, at: Cursor) -> Result<(K, V), Error> {
        let idx = self.resolve(at)?;
        self.root = rm_at(&mut self.nodes, &self.cmp, self.root, idx);
        let node = self.nodes.free(idx);
        self.len -= 1;
        Ok((node.key, node.val))
    }

    /// Creates a double-ended iterator over the map entries in comparator
    /// order.
    ///
    /// Each step re-descends from the root, like cursor stepping; the
    /// iterator keeps no stack of its path.
    ///
    /// # Examples
    /// ```
    /// use cursor_collections::AvlMap;
    ///
    /// let m = AvlMap::from([(0, 1), (1, 2), (2, 3)]);
    /// for (i, (k, v)) in m.iter().enumerate() {
    ///     assert_eq!(&i, k);
    ///     assert_eq!(&(i + 1), v);
    /// }
    /// ```
    pub fn iter(&self) -> Iter<'_, K, V, C> {
        Iter {
            map: self,
            front: self.root.map(|r| leftmost(&self.nodes, r)),
            back: self.root.map(|r| rightmost(&self.nodes, r)),
            len: self.len,
        }
    }

    /// An iterator over the keys of the map, in sorted order.
    pub fn keys(&self) -> impl Iterator<Item = &K> {
        self.iter().map(|p| p.0)
    }

    /// An iterator over the values of the map, ordered by their keys.
    pub fn values(&self) -> impl Iterator<Item = &V> {
        self.iter().map(|p| p.1)
    }
}

/// Iterator over a map's entries; see [`AvlMap::iter`].
pub struct Iter<'a, K, V, C>
where
    C: Compare<K>,
{
    map: &'a AvlMap<K, V, C>,
    // next entries to yield from either direction; both are Some whenever
    // len > 0
    front: Link,
    back: Link,
    len: usize,
}

impl<'a, K, V, C> Iterator for Iter<'a, K, V, C>
where
    C: Compare<K>,
{
    type Item = (&'a K, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        if self.len == 0 {
            return None;
        }
        let idx = self.front.expect("length says an entry remains");
        self.len -= 1;
        self.front = if self.len == 0 {
            None
        } else {
            self.map.succ(idx)
        };
        let n = &self.map.nodes[idx];
        Some((&n.key, &n.val))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.len, Some(self.len))
    }
}

impl<'a, K, V, C> DoubleEndedIterator for Iter<'a, K, V, C>
where
    C: Compare<K>,
{
    fn next_back(&mut self) -> Option<Self::Item> {
        if self.len == 0 {
            return None;
        }
        let idx = self.back.expect("length says an entry remains");
        self.len -= 1;
        self.back = if self.len == 0 {
            None
        } else {
            self.map.pred(idx)
        };
        let n = &self.map.nodes[idx];
        Some((&n.key, &n.val))
    }
}

impl<'a, K, V, C> ExactSizeIterator for Iter<'a, K, V, C>
where
    C: Compare<K>,
{
    fn len(&self) -> usize {
        self.len
    }
}

impl<'a, K, V, C> FusedIterator for Iter<'a, K, V, C> where C: Compare<K> {}
