//! DisposableMap: keys associated with composite disposables, with cascading
//! disposal per key or for the whole map.

use crate::composite::CompositeDisposable;
use crate::disposable::{Dispose, DisposableRef, DisposeId, IntoDisposable};
use crate::error::InvalidValueError;
use crate::handle_hash_map::HandleHashMap;
use crate::key::DisposableKey;
use core::borrow::Borrow;
use core::cell::{Cell, RefCell};
use core::fmt;
use core::hash::{BuildHasher, Hash, Hasher};
use log::{debug, trace};
use std::collections::hash_map::RandomState;
use std::rc::Rc;

struct Inner<K, S> {
    disposed: Cell<bool>,
    entries: RefCell<HandleHashMap<K, CompositeDisposable, S>>, // single-threaded interior mutability
}

/// A map from keys to [`CompositeDisposable`]s.
///
/// Every stored value is a composite: plain disposables are wrapped on the way
/// in, composites are stored by reference. Clones of the map are handles to the
/// same map, and the map itself implements [`Dispose`], so maps nest inside
/// composites and other maps.
///
/// Removal paths differ in what they dispose:
///
/// | call | entry removed | value disposed | key disposed |
/// |---|---|---|---|
/// | [`delete`](Self::delete) / [`clear`](Self::clear) | yes | no | no |
/// | [`dispose_key`](Self::dispose_key) | yes | yes | no |
/// | [`Dispose::dispose`] | all | yes | yes, if disposable |
/// | [`set`](Self::set) over an existing key | replaced | no | no |
///
/// Reentrancy: entries are detached from the map before any cleanup action
/// runs, so an action calling back into the map sees the post-removal state.
/// Relying on the order of such calls is a caller hazard.
pub struct DisposableMap<K, S = RandomState> {
    inner: Rc<Inner<K, S>>,
}

impl<K> DisposableMap<K>
where
    K: DisposableKey,
{
    /// Creates an empty, live map.
    pub fn new() -> Self {
        Self::with_hasher(Default::default())
    }

    /// Build a map from `(key, value)` pairs, in order.
    ///
    /// A repeated key overwrites the earlier value without disposing it. If any
    /// value fails the capability check no map is built.
    pub fn try_from_entries<I, V>(entries: I) -> Result<Self, InvalidValueError>
    where
        I: IntoIterator<Item = (K, V)>,
        V: IntoDisposable,
    {
        Self::try_from_entries_with_hasher(entries, Default::default())
    }
}

impl<K, S> DisposableMap<K, S>
where
    K: DisposableKey,
    S: BuildHasher,
{
    /// Creates an empty map that hashes keys with `hasher`.
    pub fn with_hasher(hasher: S) -> Self {
        Self {
            inner: Rc::new(Inner {
                disposed: Cell::new(false),
                entries: RefCell::new(HandleHashMap::with_hasher(hasher)),
            }),
        }
    }

    /// Like [`try_from_entries`](Self::try_from_entries), with a custom hasher.
    pub fn try_from_entries_with_hasher<I, V>(entries: I, hasher: S) -> Result<Self, InvalidValueError>
    where
        I: IntoIterator<Item = (K, V)>,
        V: IntoDisposable,
    {
        let normalized = entries
            .into_iter()
            .map(|(k, v)| -> Result<_, InvalidValueError> {
                Ok((k, normalize(v.into_disposable()?)))
            })
            .collect::<Result<Vec<_>, _>>()?;

        let map = Self::with_hasher(hasher);
        {
            let mut entries = map.inner.entries.borrow_mut();
            for (k, c) in normalized {
                let _ = entries.insert_or_replace(k, c);
            }
        }
        Ok(map)
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.inner.entries.borrow().len()
    }

    /// True if the map holds no entries.
    pub fn is_empty(&self) -> bool {
        self.inner.entries.borrow().is_empty()
    }

    /// True once the whole map has been disposed; never reset.
    pub fn is_disposed(&self) -> bool {
        self.inner.disposed.get()
    }

    /// True if `key` has an entry.
    pub fn contains_key<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        self.inner.entries.borrow().contains_key(key)
    }

    /// The composite stored under `key`. This is the map's own composite, not
    /// a copy: adding to it is visible through the map.
    pub fn get<Q>(&self, key: &Q) -> Option<CompositeDisposable>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        let entries = self.inner.entries.borrow();
        let handle = entries.find(key)?;
        handle.value(&entries).cloned()
    }

    /// Associate `value` with `key`, replacing any previous entry.
    ///
    /// The replaced composite is NOT disposed; dispose it first if that is
    /// wanted. On a disposed map the value is disposed immediately and nothing
    /// is stored.
    pub fn set<V>(&self, key: K, value: V) -> Result<(), InvalidValueError>
    where
        V: IntoDisposable,
    {
        let composite = normalize(value.into_disposable()?);
        if self.is_disposed() {
            trace!("map {:?} already disposed; disposing value for set", self.id());
            composite.dispose();
            return Ok(());
        }
        let displaced = self.inner.entries.borrow_mut().insert_or_replace(key, composite);
        // Released outside the borrow, and deliberately not disposed.
        drop(displaced);
        Ok(())
    }

    /// Add disposables to the composite under `key`, creating an empty one
    /// first if the key is absent.
    ///
    /// Every item is checked before anything changes. On a disposed map the
    /// items are disposed immediately and nothing is stored.
    pub fn add<I>(&self, key: K, disposables: I) -> Result<(), InvalidValueError>
    where
        I: IntoIterator,
        I::Item: IntoDisposable,
    {
        let refs = disposables
            .into_iter()
            .map(IntoDisposable::into_disposable)
            .collect::<Result<Vec<DisposableRef>, _>>()?;

        if self.is_disposed() {
            trace!("map {:?} already disposed; disposing {} added values", self.id(), refs.len());
            for r in refs {
                r.dispose();
            }
            return Ok(());
        }

        let composite = match self.get(&key) {
            Some(c) => c,
            None => {
                let c = CompositeDisposable::new();
                let _ = self.inner.entries.borrow_mut().insert(key, c.clone());
                c
            }
        };
        composite.add_refs(refs);
        Ok(())
    }

    /// Take disposables out of the composite under `key` without disposing
    /// them. Absent keys and members are ignored.
    pub fn remove<Q, I>(&self, key: &Q, disposables: I)
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
        I: IntoIterator,
        I::Item: Dispose,
    {
        if let Some(composite) = self.get(key) {
            composite.remove(disposables);
        }
    }

    /// Drop the entry for `key` without disposing anything. Returns whether an
    /// entry was present.
    pub fn delete<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        let removed = self.inner.entries.borrow_mut().remove_key(key);
        removed.is_some()
    }

    /// `delete` every entry. The map stays usable.
    pub fn clear(&self) {
        let removed = self.inner.entries.borrow_mut().drain();
        drop(removed);
    }

    /// Dispose the composite under `key` and remove the entry.
    ///
    /// The key itself is not disposed, even when it is disposable, and the map
    /// does not become disposed.
    pub fn dispose_key<Q>(&self, key: &Q)
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        let removed = self.inner.entries.borrow_mut().remove_key(key);
        if let Some((_key, composite)) = removed {
            trace!("map {:?}: disposing entry {:?}", self.id(), composite.id());
            composite.dispose();
        }
    }

    /// Snapshot of the keys, in no particular order.
    pub fn keys(&self) -> Vec<K>
    where
        K: Clone,
    {
        self.inner
            .entries
            .borrow()
            .iter()
            .map(|(_, k, _)| k.clone())
            .collect()
    }

    /// Snapshot of the stored composites, in no particular order.
    pub fn values(&self) -> Vec<CompositeDisposable> {
        self.inner
            .entries
            .borrow()
            .iter()
            .map(|(_, _, c)| c.clone())
            .collect()
    }

    /// Snapshot of `(key, composite)` pairs, in no particular order.
    pub fn entries(&self) -> Vec<(K, CompositeDisposable)>
    where
        K: Clone,
    {
        self.inner
            .entries
            .borrow()
            .iter()
            .map(|(_, k, c)| (k.clone(), c.clone()))
            .collect()
    }

    /// True if both handles share the same map.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }
}

/// Wrap a plain disposable into a fresh composite; composites pass through.
fn normalize(value: DisposableRef) -> CompositeDisposable {
    match value.as_composite() {
        Some(c) => c,
        None => {
            let c = CompositeDisposable::new();
            c.add_refs(vec![value]);
            c
        }
    }
}

impl<K, S> Dispose for DisposableMap<K, S>
where
    K: DisposableKey,
    S: BuildHasher,
{
    /// Dispose every entry's composite and every disposable key, then leave
    /// the map empty and permanently disposed. Later calls do nothing.
    fn dispose(&self) {
        if self.inner.disposed.replace(true) {
            return;
        }
        let entries = self.inner.entries.borrow_mut().drain();
        debug!("disposing map {:?} ({} entries)", self.id(), entries.len());
        for (key, composite) in entries {
            composite.dispose();
            if let Some(k) = key.as_disposable() {
                k.dispose();
            }
        }
    }

    fn is_disposed(&self) -> bool {
        self.inner.disposed.get()
    }

    fn id(&self) -> DisposeId {
        DisposeId::of_rc(&self.inner)
    }
}

impl<K, S> DisposableKey for DisposableMap<K, S>
where
    K: DisposableKey,
    S: BuildHasher,
{
    fn as_disposable(&self) -> Option<&dyn Dispose> {
        Some(self)
    }
}

impl<K> Default for DisposableMap<K>
where
    K: DisposableKey,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K, S> Clone for DisposableMap<K, S> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<K, S> fmt::Debug for DisposableMap<K, S>
where
    K: DisposableKey,
    S: BuildHasher,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DisposableMap")
            .field("id", &self.id())
            .field("len", &self.len())
            .field("disposed", &self.is_disposed())
            .finish()
    }
}

impl<K, S> PartialEq for DisposableMap<K, S> {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }
}

impl<K, S> Eq for DisposableMap<K, S> {}

impl<K, S> Hash for DisposableMap<K, S> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        DisposeId::of_rc(&self.inner).hash(state);
    }
}
