extern crate quickcheck;
use cursor_collections::AvlMap;
use quickcheck::quickcheck;

// The AVL height bound: height <= 1.44 * log2(n + 2) - 1.
fn within_avl_bound(map: &AvlMap<i32, i32>) -> bool {
    let n = map.len() as f64;
    (map.height() as f64) <= 1.44 * (n + 2.0).log2() - 1.0
}

#[test]
fn rot_rt_regr() {
    let mut map = AvlMap::new();
    map.insert(2, 0);
    map.insert(0, 0);
    map.insert(1, 0);

    assert_eq!(map.len(), 3);
    let mut iter = map.iter();
    assert_eq!(iter.next(), Some((&0, &0)));
    assert_eq!(iter.next(), Some((&1, &0)));
    assert_eq!(iter.next(), Some((&2, &0)));
    assert_eq!(iter.next(), None);
}

#[test]
fn mixed_insert_order() {
    let mut map = AvlMap::new();
    for k in [5, 3, 8, 1, 4, 7, 9] {
        map.insert(k, k * 10);
        map.assert_invariants();
    }

    let keys: Vec<i32> = map.keys().copied().collect();
    assert_eq!(keys, vec![1, 3, 4, 5, 7, 8, 9]);
    assert!(within_avl_bound(&map));
}

// Ascending insertion is the worst case for an unbalanced tree; a balanced
// one must stay logarithmic.
#[test]
fn ascending_insert_stays_shallow() {
    let mut map = AvlMap::new();
    for k in 1..=1000 {
        map.insert(k, k);
    }
    map.assert_invariants();

    assert_eq!(map.len(), 1000);
    assert!(within_avl_bound(&map));
    assert!(map.height() <= 15);
    assert!(map.iter().map(|(k, _)| *k).eq(1..=1000));
}

#[test]
fn erase_all_ascending() {
    let mut map = AvlMap::new();
    for k in 1..=200 {
        map.insert(k, k);
    }

    for k in 1..=200 {
        assert_eq!(map.remove(&k), Some(k));
        map.assert_invariants();
        assert_eq!(map.len(), (200 - k) as usize);
    }

    assert!(map.is_empty());
    assert_eq!(map.first_cursor(), map.end_cursor());
}

#[test]
fn double_ended_iteration() {
    let map: AvlMap<_, _> = (0..100).map(|x| (x, x)).collect();

    let fwd: Vec<_> = map.iter().map(|(k, _)| *k).collect();
    let mut rev: Vec<_> = map.iter().rev().map(|(k, _)| *k).collect();
    rev.reverse();
    assert_eq!(fwd, rev);

    // meet in the middle
    let mut iter = map.iter();
    assert_eq!(iter.next(), Some((&0, &0)));
    assert_eq!(iter.next_back(), Some((&99, &99)));
    assert_eq!(iter.len(), 98);
    assert_eq!(iter.count(), 98);
}

#[test]
fn iter_len_test() {
    let map: AvlMap<_, _> = (0..10).map(|i| (i, ())).collect();

    let mut iter = map.iter();
    let mut cnt = 10;
    while iter.next().is_some() {
        assert_eq!(iter.len(), cnt - 1);
        cnt -= 1;
    }
}

quickcheck! {
    fn qc_cmp_with_btree(xs: Vec<(u8, u32)>) -> () {
        let mut btree = std::collections::BTreeMap::new();
        let mut map = AvlMap::new();

        for &(k, v) in xs.iter() {
            assert_eq!(btree.len(), map.len());
            let (_, inserted) = map.insert(k, v);
            let was_absent = btree.get(&k).is_none();
            // mirror the no-overwrite insert
            btree.entry(k).or_insert(v);
            assert_eq!(inserted, was_absent);
            assert!(btree.iter().cmp(map.iter()).is_eq());
        }

        for k in 0..=u8::MAX {
            assert_eq!(map.get(&k), btree.get(&k));
            assert_eq!(map.count(&k), btree.contains_key(&k) as usize);
        }
    }

    fn qc_reverse_iteration(xs: Vec<(u16, u16)>) -> () {
        let map: AvlMap<_, _> = xs.iter().copied().collect();
        let btree: std::collections::BTreeMap<_, _> =
            xs.iter().map(|&(k, v)| (k, v)).fold(
                std::collections::BTreeMap::new(),
                |mut acc, (k, v)| {
                    acc.entry(k).or_insert(v);
                    acc
                },
            );

        assert!(map.iter().rev().cmp(btree.iter().rev()).is_eq());
    }
}
