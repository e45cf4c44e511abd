//! CompositeDisposable: a mutable, identity-keyed set of disposables that is
//! disposed as a unit.

use crate::disposable::{Dispose, DisposableRef, DisposeId, IntoDisposable};
use crate::error::InvalidValueError;
use crate::handle_hash_map::HandleHashMap;
use core::cell::{Cell, RefCell};
use core::fmt;
use core::hash::{Hash, Hasher};
use log::trace;
use std::rc::Rc;

struct CompositeInner {
    disposed: Cell<bool>,
    members: RefCell<HandleHashMap<DisposeId, DisposableRef>>,
}

/// A shared collection of disposables.
///
/// Clones are handles to the same collection. Members are deduplicated by
/// [`DisposeId`]. Disposing the composite disposes each member once and leaves
/// it empty; anything added afterwards is disposed on arrival.
#[derive(Clone)]
pub struct CompositeDisposable {
    inner: Rc<CompositeInner>,
}

impl CompositeDisposable {
    /// Creates an empty, live composite.
    pub fn new() -> Self {
        Self {
            inner: Rc::new(CompositeInner {
                disposed: Cell::new(false),
                members: RefCell::new(HandleHashMap::new()),
            }),
        }
    }

    /// Creates a composite holding `members`, or fails without building one.
    pub fn with_members<I>(members: I) -> Result<Self, InvalidValueError>
    where
        I: IntoIterator,
        I::Item: IntoDisposable,
    {
        let c = Self::new();
        c.add(members)?;
        Ok(c)
    }

    /// Add every item, or none of them if any item fails the capability check.
    pub fn add<I>(&self, members: I) -> Result<(), InvalidValueError>
    where
        I: IntoIterator,
        I::Item: IntoDisposable,
    {
        let refs = members
            .into_iter()
            .map(IntoDisposable::into_disposable)
            .collect::<Result<Vec<_>, _>>()?;
        self.add_refs(refs);
        Ok(())
    }

    pub(crate) fn add_refs(&self, refs: Vec<DisposableRef>) {
        for r in refs {
            if self.is_disposed() {
                trace!("composite {:?} already disposed; disposing {:?}", self.id(), r.id());
                r.dispose();
                continue;
            }
            // Re-adding an existing member is a no-op.
            let _ = self.inner.members.borrow_mut().insert(r.id(), r);
        }
    }

    /// Remove members without disposing them. Absent members are ignored.
    pub fn remove<I>(&self, members: I)
    where
        I: IntoIterator,
        I::Item: Dispose,
    {
        for m in members {
            let removed = self.inner.members.borrow_mut().remove_key(&m.id());
            // Dropped outside the borrow; a member's Drop may touch this composite.
            drop(removed);
        }
    }

    /// True if `member` is held, by identity.
    pub fn contains<T: Dispose + ?Sized>(&self, member: &T) -> bool {
        self.inner.members.borrow().contains_key(&member.id())
    }

    /// Snapshot of the current members, in no particular order.
    pub fn members(&self) -> Vec<DisposableRef> {
        self.inner
            .members
            .borrow()
            .iter()
            .map(|(_, _, r)| r.clone())
            .collect()
    }

    /// Number of distinct members.
    pub fn len(&self) -> usize {
        self.inner.members.borrow().len()
    }

    /// True if there are no members.
    pub fn is_empty(&self) -> bool {
        self.inner.members.borrow().is_empty()
    }

    /// True if both handles share the same composite.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }
}

impl Default for CompositeDisposable {
    fn default() -> Self {
        Self::new()
    }
}

impl Dispose for CompositeDisposable {
    fn dispose(&self) {
        if self.inner.disposed.replace(true) {
            return;
        }
        // Detach first so member cleanup can reach this composite safely.
        let members = self.inner.members.borrow_mut().drain();
        trace!("disposing composite {:?} ({} members)", self.id(), members.len());
        for (_, m) in members {
            m.dispose();
        }
    }

    fn is_disposed(&self) -> bool {
        self.inner.disposed.get()
    }

    fn id(&self) -> DisposeId {
        DisposeId::of_rc(&self.inner)
    }

    fn as_composite(&self) -> Option<CompositeDisposable> {
        Some(self.clone())
    }
}

impl fmt::Debug for CompositeDisposable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompositeDisposable")
            .field("id", &self.id())
            .field("len", &self.len())
            .field("disposed", &self.is_disposed())
            .finish()
    }
}

impl PartialEq for CompositeDisposable {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl Eq for CompositeDisposable {}

impl Hash for CompositeDisposable {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id().hash(state);
    }
}
