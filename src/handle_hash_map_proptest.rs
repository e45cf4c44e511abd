#![cfg(test)]

// Property tests for HandleHashMap kept inside the crate since the structural
// layer is not part of the public API.

use crate::handle_hash_map::{Handle, HandleHashMap, InsertError};
use proptest::prelude::*;
use proptest::test_runner::TestCaseError;
use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::hash::{BuildHasher, Hasher};

// Key newtype with Borrow<str> to exercise borrowed lookup.
#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
struct Key(String);
impl fmt::Debug for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}
impl std::borrow::Borrow<str> for Key {
    fn borrow(&self) -> &str {
        &self.0
    }
}

// Pool-indexed operations so shrinking moves toward earlier keys.
#[derive(Clone, Debug)]
enum Op {
    Insert(usize, i32),
    Replace(usize, i32),
    Remove(usize),
    RemoveKey(usize),
    Find(usize),
    Contains(String),
    Drain,
    Iterate,
}

fn arb_scenario() -> impl Strategy<Value = (Vec<String>, Vec<Op>)> {
    proptest::collection::vec("[a-z]{0,5}", 1..=8).prop_flat_map(|pool| {
        let idxs: Vec<usize> = (0..pool.len()).collect();
        let idx = proptest::sample::select(idxs);
        let contains_pool = proptest::sample::select(pool.clone());
        let op = prop_oneof![
            4 => (idx.clone(), any::<i32>()).prop_map(|(i, v)| Op::Insert(i, v)),
            3 => (idx.clone(), any::<i32>()).prop_map(|(i, v)| Op::Replace(i, v)),
            2 => idx.clone().prop_map(Op::Remove),
            2 => idx.clone().prop_map(Op::RemoveKey),
            2 => idx.clone().prop_map(Op::Find),
            2 => prop_oneof![contains_pool, "[a-z]{0,5}"].prop_map(Op::Contains),
            1 => Just(Op::Drain),
            1 => Just(Op::Iterate),
        ];
        proptest::collection::vec(op, 1..60).prop_map(move |ops| (pool.clone(), ops))
    })
}

// State-machine equivalence against std::collections::HashMap:
// - duplicate inserts are rejected; replace returns the displaced value;
// - find/contains_key parity and handle stability for live entries;
// - removed (or drained) handles never resolve again;
// - len/is_empty parity with the model after each op.
fn check_against_model<S: BuildHasher>(
    mut sut: HandleHashMap<Key, i32, S>,
    pool: &[String],
    ops: Vec<Op>,
) -> Result<(), TestCaseError> {
    let mut model: HashMap<Key, i32> = HashMap::new();
    let mut live: HashMap<Key, Handle> = HashMap::new();
    let mut stale: Vec<Handle> = Vec::new();
    let key = |i: usize| Key(pool[i].clone());

    for op in ops {
        match op {
            Op::Insert(i, v) => {
                let k = key(i);
                let already = model.contains_key(&k);
                match sut.insert(k.clone(), v) {
                    Ok(h) => {
                        prop_assert!(!already, "insert must fail on duplicate");
                        live.insert(k.clone(), h);
                        model.insert(k, v);
                    }
                    Err(InsertError::DuplicateKey) => {
                        prop_assert!(already, "duplicate error only when key exists");
                    }
                }
            }
            Op::Replace(i, v) => {
                let k = key(i);
                let displaced = sut.insert_or_replace(k.clone(), v);
                prop_assert_eq!(displaced, model.insert(k.clone(), v));
                if displaced.is_none() {
                    let h = sut.find(&k).expect("just inserted");
                    live.insert(k, h);
                } else {
                    // Replacement keeps the slot, so the handle is unchanged.
                    prop_assert_eq!(sut.find(&k), live.get(&k).copied());
                }
            }
            Op::Remove(i) => {
                let k = key(i);
                if let Some(h) = live.remove(&k) {
                    let (kk, vv) = sut.remove(h).expect("handle valid for removal");
                    prop_assert!(kk == k);
                    prop_assert_eq!(Some(vv), model.remove(&kk));
                    stale.push(h);
                } else {
                    prop_assert!(sut.find(&k).is_none());
                }
            }
            Op::RemoveKey(i) => {
                let k = key(i);
                let removed = sut.remove_key(k.0.as_str()).map(|(_, v)| v);
                prop_assert_eq!(removed, model.remove(&k));
                if let Some(h) = live.remove(&k) {
                    stale.push(h);
                }
            }
            Op::Find(i) => {
                let k = key(i);
                let found = sut.find(&k);
                prop_assert_eq!(found.is_some(), model.contains_key(&k));
                if let Some(h) = found {
                    prop_assert_eq!(Some(&h), live.get(&k));
                    prop_assert_eq!(h.value(&sut), model.get(&k));
                }
            }
            Op::Contains(s) => {
                let has_model = model.keys().any(|k| k.0 == s);
                prop_assert_eq!(sut.contains_key(s.as_str()), has_model);
            }
            Op::Drain => {
                let drained: BTreeSet<Key> = sut.drain().into_iter().map(|(k, _)| k).collect();
                let expected: BTreeSet<Key> = model.drain().map(|(k, _)| k).collect();
                prop_assert_eq!(drained, expected);
                stale.extend(live.drain().map(|(_, h)| h));
            }
            Op::Iterate => {
                let s_keys: BTreeSet<_> = sut.iter().map(|(_, k, _)| k.clone()).collect();
                let m_keys: BTreeSet<_> = model.keys().cloned().collect();
                prop_assert_eq!(s_keys, m_keys);
            }
        }

        for &h in &stale {
            prop_assert!(h.value(&sut).is_none());
        }
        prop_assert_eq!(sut.len(), model.len());
        prop_assert_eq!(sut.is_empty(), model.is_empty());
    }
    Ok(())
}

// Constant hasher to stress equality resolution in the index.
#[derive(Clone, Default)]
struct ConstBuildHasher;
struct ConstHasher;
impl BuildHasher for ConstBuildHasher {
    type Hasher = ConstHasher;
    fn build_hasher(&self) -> Self::Hasher {
        ConstHasher
    }
}
impl Hasher for ConstHasher {
    fn write(&mut self, _bytes: &[u8]) {}
    fn finish(&self) -> u64 {
        0
    }
}

proptest! {
    #![proptest_config(ProptestConfig { cases: 64, .. ProptestConfig::default() })]
    #[test]
    fn prop_state_machine((pool, ops) in arb_scenario()) {
        check_against_model(HandleHashMap::new(), &pool, ops)?;
    }

    #[test]
    fn prop_state_machine_with_collisions((pool, ops) in arb_scenario()) {
        check_against_model(HandleHashMap::with_hasher(ConstBuildHasher), &pool, ops)?;
    }
}
