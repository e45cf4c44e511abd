//! Keys accepted by `DisposableMap`, and whether a key is itself disposable.

use crate::composite::CompositeDisposable;
use crate::disposable::{Dispose, Disposable, DisposableRef};
use core::borrow::Borrow;
use core::cmp::Ordering;
use core::hash::Hash;
use core::num::{
    NonZeroI128, NonZeroI16, NonZeroI32, NonZeroI64, NonZeroI8, NonZeroIsize, NonZeroU128,
    NonZeroU16, NonZeroU32, NonZeroU64, NonZeroU8, NonZeroUsize,
};
use core::ops::Deref;
use std::ffi::{OsStr, OsString};
use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::time::Duration;

/// A map key.
///
/// Keys whose `as_disposable` returns `Some` are disposed together with their
/// entry when the whole map is disposed. Per-key disposal and `delete` never
/// touch the key.
///
/// Std key types, tuples, slices, `Vec`, `Option` and smart pointers are
/// covered. Any other `Eq + Hash` type can be wrapped in [`Plain`], or given an
/// empty impl when it is local:
///
/// ```
/// use disposable_map::DisposableKey;
///
/// #[derive(PartialEq, Eq, Hash)]
/// struct Slot(u32);
/// impl DisposableKey for Slot {}
/// ```
pub trait DisposableKey: Eq + Hash {
    fn as_disposable(&self) -> Option<&dyn Dispose> {
        None
    }
}

macro_rules! plain_keys {
    ($($t:ty),* $(,)?) => {
        $(impl DisposableKey for $t {})*
    };
}

plain_keys!(
    bool, char, u8, u16, u32, u64, u128, usize, i8, i16, i32, i64, i128, isize,
    str, String, OsStr, OsString, Path, PathBuf, Ordering, Duration,
    NonZeroU8, NonZeroU16, NonZeroU32, NonZeroU64, NonZeroU128, NonZeroUsize,
    NonZeroI8, NonZeroI16, NonZeroI32, NonZeroI64, NonZeroI128, NonZeroIsize,
);

macro_rules! tuple_keys {
    ($(($($name:ident),*)),* $(,)?) => {
        $(impl<$($name: Eq + Hash),*> DisposableKey for ($($name,)*) {})*
    };
}

tuple_keys!(
    (),
    (A),
    (A, B),
    (A, B, C),
    (A, B, C, D),
    (A, B, C, D, E),
    (A, B, C, D, E, F),
    (A, B, C, D, E, F, G),
    (A, B, C, D, E, F, G, H),
);

impl<T: Eq + Hash> DisposableKey for [T] {}

impl<T: Eq + Hash, const N: usize> DisposableKey for [T; N] {}

impl<T: Eq + Hash> DisposableKey for Vec<T> {}

// Wrappers forward to what they wrap, so `Option<Disposable>` or
// `Rc<CompositeDisposable>` keys are still disposed with the map.
impl<T: DisposableKey + ?Sized> DisposableKey for &T {
    fn as_disposable(&self) -> Option<&dyn Dispose> {
        (**self).as_disposable()
    }
}

impl<T: DisposableKey + ?Sized> DisposableKey for Box<T> {
    fn as_disposable(&self) -> Option<&dyn Dispose> {
        (**self).as_disposable()
    }
}

impl<T: DisposableKey + ?Sized> DisposableKey for Rc<T> {
    fn as_disposable(&self) -> Option<&dyn Dispose> {
        (**self).as_disposable()
    }
}

impl<T: DisposableKey> DisposableKey for Option<T> {
    fn as_disposable(&self) -> Option<&dyn Dispose> {
        self.as_ref().and_then(DisposableKey::as_disposable)
    }
}

impl DisposableKey for Disposable {
    fn as_disposable(&self) -> Option<&dyn Dispose> {
        Some(self)
    }
}

impl DisposableKey for DisposableRef {
    fn as_disposable(&self) -> Option<&dyn Dispose> {
        Some(self)
    }
}

impl DisposableKey for CompositeDisposable {
    fn as_disposable(&self) -> Option<&dyn Dispose> {
        Some(self)
    }
}

/// Transparent wrapper making any `Eq + Hash` type a key that is never
/// disposed.
///
/// Hashes and compares like the wrapped value and borrows as it, so lookups
/// take the bare value:
///
/// ```
/// use disposable_map::{Disposable, DisposableMap, Plain};
/// use std::net::{IpAddr, Ipv4Addr};
///
/// let m: DisposableMap<Plain<IpAddr>> = DisposableMap::new();
/// let addr = IpAddr::V4(Ipv4Addr::LOCALHOST);
/// m.set(Plain(addr), Disposable::empty()).unwrap();
/// assert!(m.contains_key(&addr));
/// ```
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Plain<K>(pub K);

impl<K> Plain<K> {
    pub fn into_inner(self) -> K {
        self.0
    }
}

impl<K: Eq + Hash> DisposableKey for Plain<K> {}

impl<K> Borrow<K> for Plain<K> {
    fn borrow(&self) -> &K {
        &self.0
    }
}

impl<K> Deref for Plain<K> {
    type Target = K;

    fn deref(&self) -> &K {
        &self.0
    }
}

impl<K> From<K> for Plain<K> {
    fn from(key: K) -> Self {
        Plain(key)
    }
}
