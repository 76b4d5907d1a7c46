#![warn(missing_docs)]
use std::cmp::Ordering::*;
use std::fmt::{Debug, Formatter};
use std::sync::atomic::AtomicU64;

use compare::{Compare, Natural};

use crate::arena::{Link, Node, Slab};
use crate::error::Error;

pub(crate) mod cursor;
pub use cursor::{Cursor, Iter};

// Container identities for cursors. Every map instance, clones included,
// gets its own id, so cursors of structurally equal maps never mix.
fn next_map_id() -> u64 {
    static NEXT: AtomicU64 = AtomicU64::new(0);
    NEXT.fetch_add(1, std::sync::atomic::Ordering::Relaxed)
}

fn height<K, V>(nodes: &Slab<K, V>, link: Link) -> u8 {
    link.map_or(0, |idx| nodes[idx].height)
}

// Recomputes a node's height from its children. Every structural change
// runs through here on the way back up.
fn update<K, V>(nodes: &mut Slab<K, V>, idx: u32) {
    let lf = height(nodes, nodes[idx].left);
    let rt = height(nodes, nodes[idx].right);
    nodes[idx].height = 1 + lf.max(rt);
}

// Balance factor of the node; positive when the left subtree is taller.
fn bal<K, V>(nodes: &Slab<K, V>, idx: u32) -> i8 {
    height(nodes, nodes[idx].left) as i8 - height(nodes, nodes[idx].right) as i8
}

fn rot_rt<K, V>(nodes: &mut Slab<K, V>, a: u32) -> u32 {
    // We want the following transformation:
    //    a(b(x, y), z)   =>   b(x, a(y, z))
    // x and z retain the same parents.

    let b = nodes[a].left.take().unwrap();

    // move y from b to a
    let y = nodes[b].right.take();
    nodes[a].left = y;

    // a rejoins as b's child, so its height settles first
    update(nodes, a);
    nodes[b].right = Some(a);
    update(nodes, b);

    b
}

fn rot_lf<K, V>(nodes: &mut Slab<K, V>, a: u32) -> u32 {
    // We want the following transformation:
    //    a(x, b(y, z))   =>   b(a(x, y), z)
    // x and z retain the same parents.

    let b = nodes[a].right.take().unwrap();

    // move y from b to a
    let y = nodes[b].left.take();
    nodes[a].right = y;

    update(nodes, a);
    nodes[b].left = Some(a);
    update(nodes, b);

    b
}

fn rot_lf_rt<K, V>(nodes: &mut Slab<K, V>, a: u32) -> u32 {
    // The left child is right-heavy: rotate it left, then rotate a right.
    let lf = nodes[a].left.unwrap();
    let lf = rot_lf(nodes, lf);
    nodes[a].left = Some(lf);
    rot_rt(nodes, a)
}

fn rot_rt_lf<K, V>(nodes: &mut Slab<K, V>, a: u32) -> u32 {
    // The right child is left-heavy: rotate it right, then rotate a left.
    let rt = nodes[a].right.unwrap();
    let rt = rot_rt(nodes, rt);
    nodes[a].right = Some(rt);
    rot_lf(nodes, a)
}

// Restores the balance invariant at idx after a child subtree changed
// shape, and returns the index now rooting this subtree. The height is
// recomputed before the factor is read; consulting a stale height here is
// the classic way this kind of tree goes wrong.
fn rebal<K, V>(nodes: &mut Slab<K, V>, idx: u32) -> u32 {
    update(nodes, idx);
    let factor = bal(nodes, idx);
    if factor > 1 {
        let lf = nodes[idx].left.unwrap();
        if bal(nodes, lf) >= 0 {
            rot_rt(nodes, idx)
        } else {
            rot_lf_rt(nodes, idx)
        }
    } else if factor < -1 {
        let rt = nodes[idx].right.unwrap();
        if bal(nodes, rt) <= 0 {
            rot_lf(nodes, idx)
        } else {
            rot_rt_lf(nodes, idx)
        }
    } else {
        idx
    }
}

struct Ins {
    root: u32,
    node: u32,
    inserted: bool,
}

// Inserts (key, val) into the subtree at link and returns the subtree's new
// root, the node holding the key, and whether a node was created. An
// equivalent key leaves the subtree untouched and drops the arguments.
fn ins<K, V, C>(nodes: &mut Slab<K, V>, cmp: &C, link: Link, key: K, val: V) -> Ins
where
    C: Compare<K>,
{
    let Some(idx) = link else {
        let node = nodes.alloc(Node::new(key, val));
        return Ins {
            root: node,
            node,
            inserted: true,
        }; // *** EARLY RETURN ***
    };

    match cmp.compare(&key, &nodes[idx].key) {
        Equal => Ins {
            root: idx,
            node: idx,
            inserted: false,
        },

        Less => {
            let sub = nodes[idx].left;
            let r = ins(nodes, cmp, sub, key, val);
            nodes[idx].left = Some(r.root);
            Ins {
                root: if r.inserted { rebal(nodes, idx) } else { idx },
                node: r.node,
                inserted: r.inserted,
            }
        }

        Greater => {
            let sub = nodes[idx].right;
            let r = ins(nodes, cmp, sub, key, val);
            nodes[idx].right = Some(r.root);
            Ins {
                root: if r.inserted { rebal(nodes, idx) } else { idx },
                node: r.node,
                inserted: r.inserted,
            }
        }
    }
}

// Detaches the least node of the subtree and hands back its index together
// with the rebalanced remainder. When the minimum sits deeper than the
// subtree root, the parent-in-descent's left slot ends up pointing at the
// detached node's former right child.
fn rm_leftmost<K, V>(nodes: &mut Slab<K, V>, idx: u32) -> (Link, u32) {
    match nodes[idx].left {
        Some(lf) => {
            let (rest, min) = rm_leftmost(nodes, lf);
            nodes[idx].left = rest;
            (Some(rebal(nodes, idx)), min)
        }
        None => {
            let rest = nodes[idx].right.take();
            (rest, idx)
        }
    }
}

// Unlinks the node at idx from the tree, leaving its key and value in the
// slot for the caller to free. Returns the root of the replacement subtree.
fn splice_out<K, V>(nodes: &mut Slab<K, V>, idx: u32) -> Link {
    match (nodes[idx].left.take(), nodes[idx].right.take()) {
        (None, rest) => rest,
        (rest @ Some(_), None) => rest,
        (Some(lf), Some(rt)) => {
            // Two children: the in-order successor node itself takes this
            // node's place, so cursors at the successor stay valid.
            let (rest, succ) = rm_leftmost(nodes, rt);
            nodes[succ].left = Some(lf);
            nodes[succ].right = rest;
            Some(rebal(nodes, succ))
        }
    }
}

// Removal driven by node identity: the descent compares against the target
// node's own key, so no copy of the key is needed. The target must be
// reachable from link.
fn rm_at<K, V, C>(nodes: &mut Slab<K, V>, cmp: &C, link: Link, target: u32) -> Link
where
    C: Compare<K>,
{
    let idx = link.expect("cursor target not reachable from the root");
    match cmp.compare(&nodes[idx].key, &nodes[target].key) {
        Equal => splice_out(nodes, idx),

        Greater => {
            let sub = nodes[idx].left;
            let rest = rm_at(nodes, cmp, sub, target);
            nodes[idx].left = rest;
            Some(rebal(nodes, idx))
        }

        Less => {
            let sub = nodes[idx].right;
            let rest = rm_at(nodes, cmp, sub, target);
            nodes[idx].right = rest;
            Some(rebal(nodes, idx))
        }
    }
}

// Removes the node matching key, if any, and reports the vacated index so
// the caller can free it. A miss leaves every node untouched.
fn rm_key<K, V, C, Q>(
    nodes: &mut Slab<K, V>,
    cmp: &C,
    link: Link,
    key: &Q,
) -> (Link, Option<u32>)
where
    C: Compare<Q, K>,
    Q: ?Sized,
{
    let Some(idx) = link else {
        return (None, None); // *** EARLY RETURN ***
    };

    match cmp.compare(key, &nodes[idx].key) {
        Equal => (splice_out(nodes, idx), Some(idx)),

        Less => {
            let sub = nodes[idx].left;
            let (rest, hit) = rm_key(nodes, cmp, sub, key);
            if hit.is_none() {
                return (Some(idx), None);
            }
            nodes[idx].left = rest;
            (Some(rebal(nodes, idx)), hit)
        }

        Greater => {
            let sub = nodes[idx].right;
            let (rest, hit) = rm_key(nodes, cmp, sub, key);
            if hit.is_none() {
                return (Some(idx), None);
            }
            nodes[idx].right = rest;
            (Some(rebal(nodes, idx)), hit)
        }
    }
}

// Pre-order clone of a subtree into dst: the node is copied first, then its
// children, so a clone never observes a half-built parent.
fn clone_subtree<K: Clone, V: Clone>(
    src: &Slab<K, V>,
    dst: &mut Slab<K, V>,
    link: Link,
) -> Link {
    let idx = link?;
    let n = &src[idx];
    let new = dst.alloc(Node {
        key: n.key.clone(),
        val: n.val.clone(),
        height: n.height,
        left: None,
        right: None,
    });
    let lf = clone_subtree(src, dst, n.left);
    let rt = clone_subtree(src, dst, n.right);
    let m = &mut dst[new];
    m.left = lf;
    m.right = rt;
    Some(new)
}

/// A map from keys to values, sorted by a caller-supplied comparator.
///
/// The map is a height-balanced (AVL) binary search tree over an index
/// arena. Keys are unique up to comparator equivalence: two keys are the
/// same entry when the comparator orders neither before the other. The
/// comparator defaults to the natural order of `K` and can be replaced via
/// [`with_cmp`](AvlMap::with_cmp).
///
/// Nodes store no parent links. Walking to a neighbor re-descends from the
/// root, which costs a few extra comparisons per step but saves a pointer
/// per node; see [`Cursor`] and [`iter`](AvlMap::iter). If you do not need
/// detached cursors, you probably want [`std::collections::BTreeMap`]
/// instead of this map.
pub struct AvlMap<K, V, C = Natural<K>>
where
    C: Compare<K>,
{
    nodes: Slab<K, V>,
    root: Link,
    len: usize,
    cmp: C,
    id: u64,
}

impl<K: Ord, V> AvlMap<K, V> {
    /// Creates an empty map ordered by the natural order of its keys.
    ///
    /// # Examples
    /// ```
    /// use cursor_collections::AvlMap;
    /// let m: AvlMap<usize, usize> = AvlMap::new();
    /// assert!(m.is_empty());
    /// ```
    pub fn new() -> Self {
        AvlMap::with_cmp(compare::natural())
    }
}

impl<K, V, C> AvlMap<K, V, C>
where
    C: Compare<K>,
{
    /// Creates an empty map ordered by the given comparator.
    ///
    /// The comparator must impose a strict weak ordering on the keys and
    /// must order them consistently for as long as they are in the map. If
    /// the comparator panics mid-operation the map stays memory safe, but
    /// its contents are unspecified; there is no pre-call-state guarantee.
    ///
    /// # Examples
    /// ```
    /// use cursor_collections::AvlMap;
    ///
    /// let mut m = AvlMap::with_cmp(|a: &i32, b: &i32| b.cmp(a));
    /// m.insert(1, "a");
    /// m.insert(2, "b");
    /// assert_eq!(m.first_key_value(), Some((&2, &"b")));
    /// ```
    pub fn with_cmp(cmp: C) -> Self {
        AvlMap {
            nodes: Slab::new(),
            root: None,
            len: 0,
            cmp,
            id: next_map_id(),
        }
    }

    /// Returns the number of entries in the map.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Returns true if the map contains no entries.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Height of the tree; 0 for an empty map.
    pub fn height(&self) -> usize {
        height(&self.nodes, self.root) as usize
    }

    /// Drops all entries from the map.
    ///
    /// Existing cursors are left dangling and will be rejected (or, after
    /// enough reinsertions, may alias new entries); see [`Cursor`].
    pub fn clear(&mut self) {
        self.nodes.clear();
        self.root = None;
        self.len = 0;
    }

    /// Returns a reference to the value associated with the key.
    ///
    /// This is the quiet lookup; [`at`](AvlMap::at) is the same descent
    /// with a `NotFound` error on a miss.
    ///
    /// # Examples
    /// ```
    /// use cursor_collections::AvlMap;
    ///
    /// let mut m = AvlMap::new();
    /// m.insert(0, 100);
    /// assert_eq!(m.get(&0), Some(&100));
    /// assert_eq!(m.get(&3), None);
    /// ```
    pub fn get<Q>(&self, key: &Q) -> Option<&V>
    where
        C: Compare<Q, K>,
        Q: ?Sized,
    {
        let mut curr = self.root;
        while let Some(idx) = curr {
            let n = &self.nodes[idx];
            match self.cmp.compare(key, &n.key) {
                Less => curr = n.left,
                Equal => return Some(&n.val),
                Greater => curr = n.right,
            }
        }

        None
    }

    /// Returns a mutable reference to the value associated with the key.
    pub fn get_mut<Q>(&mut self, key: &Q) -> Option<&mut V>
    where
        C: Compare<Q, K>,
        Q: ?Sized,
    {
        let mut curr = self.root;
        while let Some(idx) = curr {
            let n = &self.nodes[idx];
            match self.cmp.compare(key, &n.key) {
                Less => curr = n.left,
                Equal => return Some(&mut self.nodes[idx].val),
                Greater => curr = n.right,
            }
        }

        None
    }

    /// Bounds-checked access: a reference to the value for `key`, or
    /// [`Error::NotFound`] if there is no such entry.
    ///
    /// # Examples
    /// ```
    /// use cursor_collections::{AvlMap, Error};
    ///
    /// let mut m = AvlMap::new();
    /// m.insert(0, 100);
    /// assert_eq!(m.at(&0), Ok(&100));
    /// assert_eq!(m.at(&3), Err(Error::NotFound));
    /// ```
    pub fn at<Q>(&self, key: &Q) -> Result<&V, Error>
    where
        C: Compare<Q, K>,
        Q: ?Sized,
    {
        self.get(key).ok_or(Error::NotFound)
    }

    /// Bounds-checked mutable access; see [`at`](AvlMap::at).
    pub fn at_mut<Q>(&mut self, key: &Q) -> Result<&mut V, Error>
    where
        C: Compare<Q, K>,
        Q: ?Sized,
    {
        self.get_mut(key).ok_or(Error::NotFound)
    }

    /// Tests if the map contains an entry for the given key.
    pub fn contains<Q>(&self, key: &Q) -> bool
    where
        C: Compare<Q, K>,
        Q: ?Sized,
    {
        self.get(key).is_some()
    }

    /// Returns how many entries match the key: 1 if present, 0 if not,
    /// never more, since keys are unique.
    pub fn count<Q>(&self, key: &Q) -> usize
    where
        C: Compare<Q, K>,
        Q: ?Sized,
    {
        self.contains(key) as usize
    }

    /// Inserts a key-value pair.
    ///
    /// Returns a cursor at the entry holding the key and whether a new
    /// entry was created. If an equivalent key is already present the map
    /// is not touched at all: the stored value stays, the arguments are
    /// dropped, and the returned flag is false. A duplicate insertion is a
    /// well-defined no-op rather than an error.
    ///
    /// # Examples
    /// ```
    /// use cursor_collections::AvlMap;
    ///
    /// let mut m = AvlMap::new();
    /// let (first, inserted) = m.insert(1, "a");
    /// assert!(inserted);
    ///
    /// let (again, inserted) = m.insert(1, "b");
    /// assert!(!inserted);
    /// assert_eq!(first, again);
    /// assert_eq!(m.at(&1), Ok(&"a"));
    /// ```
    pub fn insert(&mut self, key: K, val: V) -> (Cursor, bool) {
        let r = ins(&mut self.nodes, &self.cmp, self.root, key, val);
        self.root = Some(r.root);
        self.len += r.inserted as usize;
        (self.cursor(Some(r.node)), r.inserted)
    }

    /// Removes a key from the map and returns the unmapped value.
    ///
    /// # Examples
    /// ```
    /// use cursor_collections::AvlMap;
    ///
    /// let mut m = AvlMap::new();
    /// m.insert(1, 2);
    /// m.insert(2, 3);
    /// assert_eq!(m.remove(&2), Some(3));
    /// assert_eq!(m.remove(&2), None);
    /// ```
    pub fn remove<Q>(&mut self, key: &Q) -> Option<V>
    where
        C: Compare<Q, K>,
        Q: ?Sized,
    {
        let (root, hit) = rm_key(&mut self.nodes, &self.cmp, self.root, key);
        self.root = root;
        let idx = hit?;
        self.len -= 1;
        Some(self.nodes.free(idx).val)
    }

    /// Returns the key-value pair for the least key in the map.
    pub fn first_key_value(&self) -> Option<(&K, &V)> {
        let mut prev = None;
        let mut curr = self.root;
        while let Some(idx) = curr {
            prev = Some(idx);
            curr = self.nodes[idx].left;
        }
        prev.map(|idx| {
            let n = &self.nodes[idx];
            (&n.key, &n.val)
        })
    }

    /// Returns the key-value pair for the greatest key in the map.
    pub fn last_key_value(&self) -> Option<(&K, &V)> {
        let mut prev = None;
        let mut curr = self.root;
        while let Some(idx) = curr {
            prev = Some(idx);
            curr = self.nodes[idx].right;
        }
        prev.map(|idx| {
            let n = &self.nodes[idx];
            (&n.key, &n.val)
        })
    }

    /// Applies f to each entry of the map in comparator order.
    ///
    /// # Examples
    /// ```
    /// use cursor_collections::AvlMap;
    ///
    /// let m = AvlMap::from([(0, -10), (1, 0), (2, 12)]);
    /// let mut cnt_keys_gt_vals = 0;
    /// m.for_each(|(k, v)| if k > v { cnt_keys_gt_vals += 1 });
    /// assert_eq!(cnt_keys_gt_vals, 2);
    /// ```
    pub fn for_each<F: FnMut((&K, &V))>(&self, mut f: F) {
        fn go<K, V, F: FnMut((&K, &V))>(nodes: &Slab<K, V>, link: Link, f: &mut F) {
            let Some(idx) = link else { return };
            let n = &nodes[idx];
            go(nodes, n.left, f);
            f((&n.key, &n.val));
            go(nodes, n.right, f);
        }

        go(&self.nodes, self.root, &mut f);
    }

    /// Applies f to each entry in comparator order, with a mutable
    /// reference to each value.
    ///
    /// # Examples
    /// ```
    /// use cursor_collections::AvlMap;
    ///
    /// let mut m = AvlMap::new();
    /// m.insert(0, "a");
    /// m.for_each_mut(|(_, v)| *v = "b");
    /// assert_eq!(m.get(&0), Some(&"b"));
    /// ```
    pub fn for_each_mut<F: FnMut((&K, &mut V))>(&mut self, mut f: F) {
        fn go<K, V, F: FnMut((&K, &mut V))>(nodes: &mut Slab<K, V>, link: Link, f: &mut F) {
            let Some(idx) = link else { return };
            let lf = nodes[idx].left;
            go(nodes, lf, f);
            let n = &mut nodes[idx];
            f((&n.key, &mut n.val));
            let rt = nodes[idx].right;
            go(nodes, rt, f);
        }

        go(&mut self.nodes, self.root, &mut f);
    }

    /// Returns an Entry that simplifies some update operations.
    ///
    /// The probe runs the ordinary bounds-checked lookup; the vacant arm
    /// inserts through the ordinary [`insert`](AvlMap::insert).
    pub fn entry(&mut self, key: K) -> Entry<'_, K, V, C> {
        if self.contains(&key) {
            let val = self.get_mut(&key).unwrap();
            Entry::Occupied(OccupiedEntry { key, val })
        } else {
            Entry::Vacant(VacantEntry { key, map: self })
        }
    }

    /// Walks the whole tree and panics if any structural invariant is
    /// broken: a stored height out of step with the children, a node whose
    /// subtree heights differ by more than one, keys out of comparator
    /// order, or a cached length that disagrees with the node count.
    ///
    /// Meant for tests; cost is O(n).
    pub fn assert_invariants(&self) {
        fn go<'a, K, V, C: Compare<K>>(
            nodes: &'a Slab<K, V>,
            cmp: &C,
            link: Link,
            greatest: Option<&'a K>,
        ) -> (usize, Option<&'a K>) {
            let Some(idx) = link else {
                return (0, greatest);
            };
            let n = &nodes[idx];

            // in order with the nearest left-side ancestor?
            if let Some(g) = greatest {
                assert!(cmp.compares_lt(g, &n.key), "keys out of order");
            }

            // do we know the heights of our children?
            let lf = height(nodes, n.left);
            let rt = height(nodes, n.right);
            assert_eq!(n.height, 1 + lf.max(rt), "stale height");

            // are we balanced?
            assert!(lf.abs_diff(rt) <= 1, "balance invariant broken");

            let (lf_len, greatest) = go(nodes, cmp, n.left, greatest);
            if let Some(g) = greatest {
                assert!(cmp.compares_lt(g, &n.key), "keys out of order");
            }
            let (rt_len, greatest) = go(nodes, cmp, n.right, Some(&n.key));

            (lf_len + rt_len + 1, greatest)
        }

        let (count, _) = go(&self.nodes, &self.cmp, self.root, None);
        assert_eq!(count, self.len, "cached len disagrees with node count");
    }

    pub(crate) fn cursor(&self, node: Link) -> Cursor {
        Cursor { map: self.id, node }
    }
}

/// A view into a single entry of a map, occupied or vacant.
pub enum Entry<'a, K, V, C>
where
    C: Compare<K>,
{
    /// The key is present; holds a mutable borrow of its value.
    Occupied(OccupiedEntry<'a, K, V>),
    /// The key is absent; holds the key and the map for a later insert.
    Vacant(VacantEntry<'a, K, V, C>),
}

/// A view into an occupied entry; see [`AvlMap::entry`].
pub struct OccupiedEntry<'a, K, V> {
    key: K,
    val: &'a mut V,
}

impl<'a, K, V> OccupiedEntry<'a, K, V> {
    /// A reference to the entry's value.
    pub fn get(&self) -> &V {
        self.val
    }

    /// A mutable reference to the entry's value.
    pub fn get_mut(&mut self) -> &mut V {
        self.val
    }

    /// Replaces the entry's value, returning the old one.
    pub fn insert(&mut self, new_val: V) -> V {
        std::mem::replace(self.val, new_val)
    }

    /// Converts the view into a mutable reference with the map's lifetime.
    pub fn into_mut(self) -> &'a mut V {
        self.val
    }

    /// The key used to probe the map.
    pub fn key(&self) -> &K {
        &self.key
    }
}

/// A view into a vacant entry; see [`AvlMap::entry`].
pub struct VacantEntry<'a, K, V, C>
where
    C: Compare<K>,
{
    key: K,
    map: &'a mut AvlMap<K, V, C>,
}

impl<'a, K, V, C> VacantEntry<'a, K, V, C>
where
    C: Compare<K>,
{
    /// Inserts the value under the held key and returns a mutable
    /// reference into the new entry.
    pub fn insert(self, val: V) -> &'a mut V {
        let (at, _) = self.map.insert(self.key, val);
        let idx = at.node.unwrap();
        &mut self.map.nodes[idx].val
    }

    /// Takes ownership of the key back.
    pub fn into_key(self) -> K {
        self.key
    }

    /// The key that would be inserted.
    pub fn key(&self) -> &K {
        &self.key
    }
}

impl<'a, K, V, C> Entry<'a, K, V, C>
where
    C: Compare<K>,
{
    /// Mutates the value in place if the entry is occupied.
    pub fn and_modify<F>(mut self, f: F) -> Self
    where
        F: FnOnce(&mut V),
    {
        if let Entry::Occupied(occ) = &mut self {
            f(occ.val);
        }

        self
    }

    /// The entry's key.
    pub fn key(&self) -> &K {
        match self {
            Entry::Occupied(x) => &x.key,
            Entry::Vacant(x) => &x.key,
        }
    }

    /// The auto-inserting accessor: returns the present value, or inserts
    /// the default value for a missing key and returns that.
    ///
    /// # Examples
    /// ```
    /// use cursor_collections::AvlMap;
    ///
    /// let mut m: AvlMap<&str, u32> = AvlMap::new();
    /// *m.entry("calls").or_default() += 1;
    /// *m.entry("calls").or_default() += 1;
    /// assert_eq!(m.at(&"calls"), Ok(&2));
    /// ```
    pub fn or_default(self) -> &'a mut V
    where
        V: Default,
    {
        match self {
            Entry::Occupied(x) => x.into_mut(),
            Entry::Vacant(x) => x.insert(V::default()),
        }
    }

    /// Returns the present value, or inserts the given one.
    pub fn or_insert(self, default: V) -> &'a mut V {
        match self {
            Entry::Occupied(x) => x.into_mut(),
            Entry::Vacant(x) => x.insert(default),
        }
    }

    /// Returns the present value, or inserts the one the closure builds.
    pub fn or_insert_with<F: FnOnce() -> V>(self, default: F) -> &'a mut V {
        match self {
            Entry::Occupied(x) => x.into_mut(),
            Entry::Vacant(x) => x.insert(default()),
        }
    }

    /// Like [`or_insert_with`](Entry::or_insert_with), with the key lent to
    /// the closure.
    pub fn or_insert_with_key<F: FnOnce(&K) -> V>(self, default: F) -> &'a mut V {
        match self {
            Entry::Occupied(x) => x.into_mut(),
            Entry::Vacant(x) => {
                let v = default(&x.key);
                x.insert(v)
            }
        }
    }
}

impl<K, V, C> Clone for AvlMap<K, V, C>
where
    K: Clone,
    V: Clone,
    C: Compare<K> + Clone,
{
    fn clone(&self) -> Self {
        let mut nodes = Slab::with_capacity(self.len);
        let root = clone_subtree(&self.nodes, &mut nodes, self.root);
        AvlMap {
            nodes,
            root,
            len: self.len,
            cmp: self.cmp.clone(),
            // a clone is a new container; its cursors are its own
            id: next_map_id(),
        }
    }

    fn clone_from(&mut self, source: &Self) {
        // release everything currently owned before rebuilding
        self.nodes.clear();
        self.root = clone_subtree(&source.nodes, &mut self.nodes, source.root);
        self.len = source.len;
        self.cmp = source.cmp.clone();
        // the id stays: assignment replaces contents, not identity
    }
}

impl<K, V, C> Debug for AvlMap<K, V, C>
where
    K: Debug,
    V: Debug,
    C: Compare<K>,
{
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        fn go<K: Debug, V: Debug>(
            nodes: &Slab<K, V>,
            link: Link,
            f: &mut Formatter<'_>,
        ) -> std::fmt::Result {
            let Some(idx) = link else {
                return f.write_str(".");
            };
            let n = &nodes[idx];
            f.write_fmt(format_args!(
                "(ht: {} {{{:?}: {:?}}} ",
                n.height, n.key, n.val
            ))?;
            go(nodes, n.left, f)?;
            f.write_str(" ")?;
            go(nodes, n.right, f)?;
            f.write_str(")")
        }

        match self.root {
            None => f.write_str("AvlMap(EMPTY)"),
            Some(_) => {
                f.write_fmt(format_args!("AvlMap(#{}, ", self.len))?;
                go(&self.nodes, self.root, f)?;
                f.write_str(")")
            }
        }
    }
}

impl<K, V, C> PartialEq for AvlMap<K, V, C>
where
    K: PartialEq,
    V: PartialEq,
    C: Compare<K>,
{
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len() && self.iter().zip(other.iter()).all(|(x, y)| x == y)
    }
}

impl<K, V, C> Eq for AvlMap<K, V, C>
where
    K: Eq,
    V: Eq,
    C: Compare<K>,
{
}

impl<K, V, C> PartialOrd for AvlMap<K, V, C>
where
    K: PartialOrd,
    V: PartialOrd,
    C: Compare<K>,
{
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        self.iter().partial_cmp(other.iter())
    }
}

impl<K, V, C> Ord for AvlMap<K, V, C>
where
    K: Ord,
    V: Ord,
    C: Compare<K>,
{
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.iter().cmp(other.iter())
    }
}

impl<K, V, C> std::hash::Hash for AvlMap<K, V, C>
where
    K: std::hash::Hash,
    V: std::hash::Hash,
    C: Compare<K>,
{
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.for_each(|(k, v)| {
            k.hash(state);
            v.hash(state);
        });
    }
}

impl<K, Q, V, C> std::ops::Index<&Q> for AvlMap<K, V, C>
where
    C: Compare<K> + Compare<Q, K>,
    Q: ?Sized,
{
    type Output = V;

    fn index(&self, index: &Q) -> &Self::Output {
        match self.get(index) {
            Some(v) => v,
            None => panic!("key not found in AvlMap"),
        }
    }
}

impl<K, V, C> Default for AvlMap<K, V, C>
where
    C: Compare<K> + Default,
{
    fn default() -> Self {
        AvlMap::with_cmp(C::default())
    }
}

impl<K, V, C> Extend<(K, V)> for AvlMap<K, V, C>
where
    C: Compare<K>,
{
    /// Inserts each pair in turn. Since [`insert`](AvlMap::insert) never
    /// overwrites, the first value wins when the iterator repeats a key.
    fn extend<T: IntoIterator<Item = (K, V)>>(&mut self, iter: T) {
        for (k, v) in iter {
            self.insert(k, v);
        }
    }
}

impl<K, V, C> FromIterator<(K, V)> for AvlMap<K, V, C>
where
    C: Compare<K> + Default,
{
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        let mut map = AvlMap::with_cmp(C::default());
        map.extend(iter);
        map
    }
}

impl<K, V, const N: usize> From<[(K, V); N]> for AvlMap<K, V>
where
    K: Ord,
{
    fn from(entries: [(K, V); N]) -> Self {
        AvlMap::from_iter(entries)
    }
}
