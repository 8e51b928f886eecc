use super::*;

use proptest::prelude::*;
use proptest_derive::Arbitrary;
use std::collections::BTreeMap;

const FLAVORS: [Flavor; 3] = [Flavor::Plain, Flavor::Avl, Flavor::RedBlack];

fn validate_tree<V, KD, VD>(t: &Tree<u16, V, KD, VD>)
where
    KD: TypeDescriptor<u16>,
    VD: TypeDescriptor<V>,
{
    let stats = match t.validate() {
        Ok(stats) => stats,
        Err(violation) => panic!("{:?} tree invalid: {violation}", t.flavor()),
    };
    assert_eq!(stats.entries, t.len(), "reachable nodes must match Tree::len");
    assert_eq!(stats.height, t.height());

    match t.flavor() {
        Flavor::Plain => {
            assert_eq!(stats.black_height, None);
            assert_eq!(stats.red_nodes, 0);
        }
        Flavor::Avl => assert!(t.is_avl_balanced(), "AVL shape must be height balanced"),
        Flavor::RedBlack => {
            let black = stats.black_height.unwrap_or(0);
            // Red nodes never stack, so no path is more than twice the black height.
            assert!(stats.height <= 2 * black, "height {} black height {black}", stats.height);
        }
    }
}

#[derive(Clone, Debug, Arbitrary)]
enum Op {
    #[proptest(weight = 50)]
    Insert(#[proptest(strategy = "0u16..512")] u16, u32),
    #[proptest(weight = 30)]
    Remove(#[proptest(strategy = "0u16..512")] u16),
    #[proptest(weight = 18)]
    Get(#[proptest(strategy = "0u16..512")] u16),
    #[proptest(weight = 1)]
    Duplicate,
    #[proptest(weight = 1)]
    Clear,
}

fn ops_strategy() -> impl Strategy<Value = Vec<Op>> {
    prop::collection::vec(any::<Op>(), 0..=400)
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 64,
        max_shrink_iters: 10_000,
        .. ProptestConfig::default()
    })]

    #[test]
    fn prop_equivalence(ops in ops_strategy(), which in 0usize..3) {
        let flavor = FLAVORS[which];
        let mut t: Tree<u16, u32> = Tree::with_values(flavor, Natural, Natural);
        let mut m: BTreeMap<u16, u32> = BTreeMap::new();

        for op in ops {
            match op {
                Op::Insert(key, value) => {
                    let added = m.insert(key, value).is_none();
                    let outcome = t.set(key, value);
                    prop_assert_eq!(outcome.map(|o| o == Insert::Added), Ok(added));
                }
                Op::Remove(key) => {
                    let removed = m.remove(&key).is_some();
                    prop_assert_eq!(t.remove(&key) == Removal::Removed, removed);
                }
                Op::Get(key) => {
                    prop_assert_eq!(t.get(&key).copied(), m.get(&key).copied());
                    prop_assert_eq!(t.has(&key), m.contains_key(&key));
                }
                Op::Duplicate => {
                    let copy = t.clone();
                    validate_tree(&copy);
                    t = copy;
                }
                Op::Clear => {
                    t.clear();
                    m.clear();
                }
            }

            prop_assert_eq!(t.len(), m.len());
        }

        validate_tree(&t);
        let got: Vec<(u16, u32)> = t.iter().map(|e| (*e.key, e.value.copied().unwrap_or_default())).collect();
        let expected: Vec<(u16, u32)> = m.iter().map(|(k, v)| (*k, *v)).collect();
        prop_assert_eq!(got, expected);
        prop_assert_eq!(t.first().copied(), m.keys().next().copied());
        prop_assert_eq!(t.last().copied(), m.keys().next_back().copied());
    }

    #[test]
    fn prop_reverse_walk_mirrors_forward(keys in prop::collection::vec(any::<u16>(), 0..=300), which in 0usize..3) {
        let mut t: Tree<u16> = Tree::new(FLAVORS[which], Natural);
        for k in keys {
            t.insert(k, None).unwrap();
        }
        let mut fwd: Vec<u16> = t.keys().copied().collect();
        let rev: Vec<u16> = t.iter_rev().map(|e| *e.key).collect();
        fwd.reverse();
        prop_assert_eq!(fwd, rev);
    }
}

fn for_each_permutation<T: Clone>(items: &[T], mut f: impl FnMut(Vec<T>)) {
    fn rec<T: Clone>(items: &[T], used: &mut [bool], out: &mut Vec<T>, f: &mut impl FnMut(Vec<T>)) {
        if out.len() == items.len() {
            f(out.clone());
            return;
        }
        for i in 0..items.len() {
            if used[i] {
                continue;
            }
            used[i] = true;
            out.push(items[i].clone());
            rec(items, used, out, f);
            out.pop();
            used[i] = false;
        }
    }

    let mut used = vec![false; items.len()];
    let mut out = Vec::with_capacity(items.len());
    rec(items, &mut used, &mut out, &mut f);
}

const SMALL_SET: [u16; 7] = [40, 10, 60, 20, 50, 30, 70];

#[test]
fn exhaustive_insert_order_small_set() {
    for flavor in FLAVORS {
        for_each_permutation(&SMALL_SET, |perm| {
            let mut t: Tree<u16, u32> = Tree::with_values(flavor, Natural, Natural);
            let mut m: BTreeMap<u16, u32> = BTreeMap::new();

            for (i, k) in perm.into_iter().enumerate() {
                let v = i as u32;
                assert_eq!(t.set(k, v).map(|o| o == Insert::Added), Ok(m.insert(k, v).is_none()));
            }

            validate_tree(&t);
            let got: Vec<(u16, u32)> = t.iter().map(|e| (*e.key, *e.value.unwrap())).collect();
            let expected: Vec<(u16, u32)> = m.iter().map(|(k, v)| (*k, *v)).collect();
            assert_eq!(got, expected);
        });
    }
}

#[test]
fn exhaustive_remove_order_small_set() {
    for flavor in FLAVORS {
        // Insert in a fixed order, then remove in all permutations.
        let mut base_tree: Tree<u16, u32> = Tree::with_values(flavor, Natural, Natural);
        let mut base_map: BTreeMap<u16, u32> = BTreeMap::new();
        for (i, &k) in SMALL_SET.iter().enumerate() {
            let v = i as u32;
            base_tree.set(k, v).unwrap();
            base_map.insert(k, v);
        }

        for_each_permutation(&SMALL_SET, |perm| {
            let mut t = base_tree.clone();
            let mut m = base_map.clone();

            for k in perm {
                assert_eq!(t.remove(&k) == Removal::Removed, m.remove(&k).is_some());
                assert_eq!(t.len(), m.len());
                validate_tree(&t);
                for (k, v) in &m {
                    assert_eq!(t.get(k), Some(v));
                }
            }
            assert_eq!(t.len(), 0);
            assert!(t.is_empty());
            assert_eq!(t.height(), 0);
        });
    }
}
