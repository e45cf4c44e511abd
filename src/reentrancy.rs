//! Debug-only reentrancy detection for the structural map.
//!
//! `HandleHashMap` calls into user code (`K: Eq`/`K: Hash`) while probing its
//! index. A key whose `Eq` reaches back into the same map would observe the
//! index half-updated, so debug builds turn that into a panic. Release builds
//! keep only the zero-sized marker.

use core::cell::Cell;
use core::marker::PhantomData;

/// Per-structure busy marker. Each guarded method starts with
/// `let _busy = self.busy.enter();`.
#[derive(Debug)]
pub(crate) struct BusyFlag {
    #[cfg(debug_assertions)]
    busy: Cell<bool>,
    // Rc-based crate; stay !Send + !Sync.
    _local: PhantomData<*mut ()>,
}

impl BusyFlag {
    pub(crate) const fn new() -> Self {
        Self {
            #[cfg(debug_assertions)]
            busy: Cell::new(false),
            _local: PhantomData,
        }
    }

    /// Mark the structure busy until the returned guard drops.
    ///
    /// Panics in debug builds if the structure is already busy.
    #[inline]
    #[track_caller]
    pub(crate) fn enter(&self) -> BusyGuard<'_> {
        #[cfg(debug_assertions)]
        {
            assert!(
                !self.busy.replace(true),
                "reentrant access to HandleHashMap while it is mid-operation"
            );
            return BusyGuard { flag: self };
        }

        #[cfg(not(debug_assertions))]
        {
            return BusyGuard { _flag: PhantomData };
        }
    }
}

/// Clears the busy marker on drop.
pub(crate) struct BusyGuard<'a> {
    #[cfg(debug_assertions)]
    flag: &'a BusyFlag,
    #[cfg(not(debug_assertions))]
    _flag: PhantomData<&'a BusyFlag>,
}

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        #[cfg(debug_assertions)]
        self.flag.busy.set(false);
    }
}
