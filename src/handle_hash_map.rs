//! HandleHashMap: structural layer with stable handles and debug reentrancy guard.
//!
//! Storage lives in a generational `SlotMap`; a `hashbrown::HashTable` indexes
//! slot keys by the entry's precomputed hash. Both the disposal map and the
//! composite member set are built on this type.

use crate::reentrancy::BusyFlag;
use core::borrow::Borrow;
use core::hash::{BuildHasher, Hash};
use hashbrown::hash_table;
use hashbrown::HashTable;
use slotmap::{DefaultKey, SlotMap};
use std::collections::hash_map::RandomState;

#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub(crate) struct Handle(DefaultKey);

impl Handle {
    fn new(k: DefaultKey) -> Self {
        Handle(k)
    }
    fn raw_handle(&self) -> DefaultKey {
        self.0
    }

    pub(crate) fn value<'a, K, V, S>(&self, map: &'a HandleHashMap<K, V, S>) -> Option<&'a V>
    where
        K: Eq + Hash,
        S: BuildHasher,
    {
        map.handle_value(*self)
    }
}

#[derive(Debug)]
struct Entry<K, V> {
    key: K,
    value: V,
    hash: u64,
}

pub(crate) struct HandleHashMap<K, V, S = RandomState> {
    hasher: S,
    index: HashTable<DefaultKey>,
    slots: SlotMap<DefaultKey, Entry<K, V>>,
    busy: BusyFlag,
}

#[derive(Debug, Eq, PartialEq)]
pub(crate) enum InsertError {
    DuplicateKey,
}

impl<K, V> HandleHashMap<K, V>
where
    K: Eq + Hash,
{
    pub(crate) fn new() -> Self {
        Self::with_hasher(Default::default())
    }
}

/// Iterator over immutable entries in `HandleHashMap`.
pub(crate) struct Iter<'a, K, V> {
    it: slotmap::basic::Iter<'a, DefaultKey, Entry<K, V>>,
}

impl<'a, K, V> Iterator for Iter<'a, K, V> {
    type Item = (Handle, &'a K, &'a V);
    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        self.it
            .next()
            .map(|(k, e)| (Handle::new(k), &e.key, &e.value))
    }
}

impl<K, V, S> HandleHashMap<K, V, S>
where
    K: Eq + Hash,
    S: BuildHasher,
{
    pub(crate) fn with_hasher(hasher: S) -> Self {
        Self {
            index: HashTable::new(),
            hasher,
            slots: SlotMap::with_key(),
            busy: BusyFlag::new(),
        }
    }

    fn make_hash<Q>(&self, q: &Q) -> u64
    where
        Q: ?Sized + Hash,
    {
        self.hasher.hash_one(q)
    }

    pub(crate) fn len(&self) -> usize {
        self.slots.len()
    }
    pub(crate) fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub(crate) fn find<Q>(&self, q: &Q) -> Option<Handle>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        let _busy = self.busy.enter();
        let hash = self.make_hash(q);
        self.index
            .find(hash, |&k| {
                self.slots
                    .get(k)
                    .map(|e| e.key.borrow() == q)
                    .unwrap_or(false)
            })
            .map(|&k| Handle::new(k))
    }

    pub(crate) fn contains_key<Q>(&self, q: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        self.find(q).is_some()
    }

    pub(crate) fn insert(&mut self, key: K, value: V) -> Result<Handle, InsertError> {
        let _busy = self.busy.enter();
        let hash = self.make_hash(&key);
        match self.index.entry(
            hash,
            |&kk| self.slots.get(kk).map(|e| e.key == key).unwrap_or(false),
            |&kk| self.slots.get(kk).map(|e| e.hash).unwrap_or(0),
        ) {
            hash_table::Entry::Occupied(_) => Err(InsertError::DuplicateKey),
            hash_table::Entry::Vacant(v) => {
                let k = self.slots.insert(Entry { key, value, hash });
                let _ = v.insert(k);
                Ok(Handle::new(k))
            }
        }
    }

    /// Insert `value` under `key`, handing back whatever value it displaced.
    /// An existing entry keeps its stored key and slot.
    pub(crate) fn insert_or_replace(&mut self, key: K, value: V) -> Option<V> {
        let _busy = self.busy.enter();
        let hash = self.make_hash(&key);
        match self.index.entry(
            hash,
            |&kk| self.slots.get(kk).map(|e| e.key == key).unwrap_or(false),
            |&kk| self.slots.get(kk).map(|e| e.hash).unwrap_or(0),
        ) {
            hash_table::Entry::Occupied(o) => {
                let slot = self.slots.get_mut(*o.get())?;
                Some(core::mem::replace(&mut slot.value, value))
            }
            hash_table::Entry::Vacant(v) => {
                let k = self.slots.insert(Entry { key, value, hash });
                let _ = v.insert(k);
                None
            }
        }
    }

    pub(crate) fn remove(&mut self, handle: Handle) -> Option<(K, V)> {
        let _busy = self.busy.enter();
        let k = handle.raw_handle();

        let entry = self.slots.remove(k)?;

        // Unlink from index; a live slot is always indexed under its hash.
        self.index
            .find_entry(entry.hash, |&kk| kk == k)
            .expect("live slot missing from index")
            .remove();

        Some((entry.key, entry.value))
    }

    pub(crate) fn remove_key<Q>(&mut self, q: &Q) -> Option<(K, V)>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        let handle = self.find(q)?;
        self.remove(handle)
    }

    /// Detach every entry, leaving the map empty before any `K`/`V` is used.
    pub(crate) fn drain(&mut self) -> Vec<(K, V)> {
        let _busy = self.busy.enter();
        self.index.clear();
        self.slots.drain().map(|(_, e)| (e.key, e.value)).collect()
    }

    pub(crate) fn handle_value(&self, h: Handle) -> Option<&V> {
        let _busy = self.busy.enter();
        self.slots.get(h.raw_handle()).map(|e| &e.value)
    }

    pub(crate) fn iter(&self) -> Iter<'_, K, V> {
        Iter {
            it: self.slots.iter(),
        }
    }
}
