use cursor_collections::AvlMap;
use proptest::prelude::*;
use std::collections::BTreeMap as StdMap;

fn assert_eq_iters<I: Iterator, J: Iterator<Item = I::Item>>(mut i: I, mut j: J)
where
    I::Item: std::fmt::Debug + Eq,
{
    loop {
        match (i.next(), j.next()) {
            (None, None) => return,
            (a, b) => assert_eq!(a, b),
        }
    }
}

// Operations exercised against the std::collections::BTreeMap oracle. The
// oracle mirrors the no-overwrite insert with entry().or_insert().
#[derive(Debug, Clone)]
enum Op {
    Insert(u16, u16),
    Remove(u16),
    RemoveAt(u16),
    Lookup(u16),
    Walk,
}

fn operations(max_ops: usize) -> impl Strategy<Value = Vec<Op>> {
    prop::collection::vec(
        prop_oneof![
            (0u16..512, 0u16..1024).prop_map(|(k, v)| Op::Insert(k, v)),
            (0u16..512).prop_map(Op::Remove),
            (0u16..512).prop_map(Op::RemoveAt),
            (0u16..512).prop_map(Op::Lookup),
            Just(Op::Walk),
        ],
        0..max_ops,
    )
}

fn small_int_pairs() -> impl Strategy<Value = Vec<(u16, u16)>> {
    prop::collection::vec((0u16..1024, 0u16..1024), 0..512)
}

fn chk(map: &AvlMap<u16, u16>, oracle: &StdMap<u16, u16>) {
    map.assert_invariants();
    assert_eq!(map.len(), oracle.len());
    assert_eq_iters(map.iter(), oracle.iter());
    assert_eq_iters(map.iter().rev(), oracle.iter().rev());
}

proptest! {
    #[test]
    fn op_sequences_match_btree(ops in operations(512)) {
        let mut map = AvlMap::new();
        let mut oracle = StdMap::new();

        for op in ops {
            match op {
                Op::Insert(k, v) => {
                    let (at, inserted) = map.insert(k, v);
                    prop_assert_eq!(inserted, !oracle.contains_key(&k));
                    oracle.entry(k).or_insert(v);
                    prop_assert_eq!(map.key_at(at).unwrap(), &k);
                }

                Op::Remove(k) => {
                    prop_assert_eq!(map.remove(&k), oracle.remove(&k));
                }

                Op::RemoveAt(k) => {
                    let at = map.find(&k);
                    if at.is_end() {
                        prop_assert!(!oracle.contains_key(&k));
                    } else {
                        let (rk, rv) = map.remove_at(at).unwrap();
                        prop_assert_eq!(rk, k);
                        prop_assert_eq!(oracle.remove(&k), Some(rv));
                    }
                }

                Op::Lookup(k) => {
                    prop_assert_eq!(map.get(&k), oracle.get(&k));
                    prop_assert_eq!(map.contains(&k), oracle.contains_key(&k));
                    prop_assert_eq!(map.count(&k), oracle.contains_key(&k) as usize);
                }

                Op::Walk => chk(&map, &oracle),
            }
        }

        chk(&map, &oracle);
        assert_eq!(
            map.first_key_value(),
            oracle.first_key_value()
        );
        assert_eq!(map.last_key_value(), oracle.last_key_value());
    }

    #[test]
    fn from_iter_keeps_first_value(pairs in small_int_pairs()) {
        let map: AvlMap<_, _> = pairs.iter().copied().collect();
        let mut oracle = StdMap::new();
        for &(k, v) in pairs.iter() {
            oracle.entry(k).or_insert(v);
        }

        chk(&map, &oracle);
    }

    #[test]
    fn clones_are_independent(
        pairs in small_int_pairs(),
        extra in small_int_pairs(),
    ) {
        let orig: AvlMap<u16, u16> = pairs.iter().copied().collect();
        let snapshot: Vec<_> = orig.iter().map(|(k, v)| (*k, *v)).collect();

        let mut copy = orig.clone();
        for (k, v) in extra {
            if k % 2 == 0 {
                copy.insert(k, v);
            } else {
                copy.remove(&k);
            }
        }
        copy.assert_invariants();

        // the original never moved
        let after: Vec<_> = orig.iter().map(|(k, v)| (*k, *v)).collect();
        prop_assert_eq!(snapshot, after);
    }

    #[test]
    fn cursor_walk_is_total(pairs in small_int_pairs()) {
        let map: AvlMap<_, _> = pairs.iter().copied().collect();

        let mut walked = 0;
        let mut at = map.first_cursor();
        let mut prev_key: Option<u16> = None;
        while !at.is_end() {
            let k = *map.key_at(at).unwrap();
            if let Some(p) = prev_key {
                prop_assert!(p < k);
            }
            prev_key = Some(k);
            walked += 1;
            at = map.next_cursor(at).unwrap();
        }

        prop_assert_eq!(walked, map.len());
    }
}
