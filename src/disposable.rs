//! The disposal capability and its basic carriers.
//!
//! - `Dispose`: anything with an idempotent `dispose()` and an observable
//!   disposed flag. Composites and maps implement it too, which is what lets
//!   them nest.
//! - `Disposable`: shared handle with an optional one-shot cleanup action.
//! - `DisposableRef`: type-erased shared member as stored inside composites.
//! - `IntoDisposable`: the insertion-time capability check.

use crate::composite::CompositeDisposable;
use crate::error::InvalidValueError;
use core::cell::{Cell, RefCell};
use core::fmt;
use core::hash::{Hash, Hasher};
use std::rc::Rc;

/// Identity of a disposable: the address of its shared allocation.
///
/// Two handles to the same underlying resource have the same id, which is how
/// composites deduplicate and remove members.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub struct DisposeId(*const ());

impl DisposeId {
    pub fn of<T: ?Sized>(value: &T) -> Self {
        DisposeId(value as *const T as *const ())
    }

    pub fn of_rc<T: ?Sized>(rc: &Rc<T>) -> Self {
        DisposeId(Rc::as_ptr(rc) as *const ())
    }
}

/// The disposal capability.
///
/// `dispose` must be idempotent: the first call releases the resource, later
/// calls do nothing. Handle types that share an allocation override `id` so
/// every clone reports the same identity.
pub trait Dispose {
    fn dispose(&self);

    fn is_disposed(&self) -> bool;

    fn id(&self) -> DisposeId {
        DisposeId::of(self)
    }

    /// `Some` only for composites, which are stored by reference instead of
    /// being wrapped.
    fn as_composite(&self) -> Option<CompositeDisposable> {
        None
    }

    fn into_ref(self) -> DisposableRef
    where
        Self: Sized + 'static,
    {
        DisposableRef(Rc::new(self))
    }
}

impl<T: Dispose + ?Sized> Dispose for &T {
    fn dispose(&self) {
        (**self).dispose();
    }

    fn is_disposed(&self) -> bool {
        (**self).is_disposed()
    }

    fn id(&self) -> DisposeId {
        (**self).id()
    }

    fn as_composite(&self) -> Option<CompositeDisposable> {
        (**self).as_composite()
    }
}

type Action = Box<dyn FnOnce()>;

struct DisposableInner {
    disposed: Cell<bool>,
    action: RefCell<Option<Action>>,
}

/// A shared disposable with an optional cleanup action.
///
/// Clones share state: disposing any clone disposes all of them, and the
/// action runs at most once.
#[derive(Clone)]
pub struct Disposable {
    inner: Rc<DisposableInner>,
}

impl Disposable {
    pub fn new<F>(action: F) -> Self
    where
        F: FnOnce() + 'static,
    {
        Self::from_action(Some(Box::new(action)))
    }

    /// A disposable with no cleanup action; only its flag changes.
    pub fn empty() -> Self {
        Self::from_action(None)
    }

    fn from_action(action: Option<Action>) -> Self {
        Self {
            inner: Rc::new(DisposableInner {
                disposed: Cell::new(false),
                action: RefCell::new(action),
            }),
        }
    }

    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }
}

impl Default for Disposable {
    fn default() -> Self {
        Self::empty()
    }
}

impl Dispose for Disposable {
    fn dispose(&self) {
        if self.inner.disposed.replace(true) {
            return;
        }
        // Release the RefCell borrow before running user code.
        let action = self.inner.action.borrow_mut().take();
        if let Some(action) = action {
            action();
        }
    }

    fn is_disposed(&self) -> bool {
        self.inner.disposed.get()
    }

    fn id(&self) -> DisposeId {
        DisposeId::of_rc(&self.inner)
    }
}

impl fmt::Debug for Disposable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Disposable")
            .field("id", &self.id())
            .field("disposed", &self.is_disposed())
            .finish()
    }
}

impl PartialEq for Disposable {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl Eq for Disposable {}

impl Hash for Disposable {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id().hash(state);
    }
}

/// A type-erased, shared disposable.
///
/// Equality and hashing follow the wrapped value's [`DisposeId`], so two refs
/// created from clones of the same `Disposable` compare equal.
#[derive(Clone)]
pub struct DisposableRef(Rc<dyn Dispose>);

impl DisposableRef {
    pub fn new<T: Dispose + 'static>(value: T) -> Self {
        value.into_ref()
    }
}

impl Dispose for DisposableRef {
    fn dispose(&self) {
        self.0.dispose();
    }

    fn is_disposed(&self) -> bool {
        self.0.is_disposed()
    }

    fn id(&self) -> DisposeId {
        self.0.id()
    }

    fn as_composite(&self) -> Option<CompositeDisposable> {
        self.0.as_composite()
    }

    fn into_ref(self) -> DisposableRef {
        self
    }
}

impl fmt::Debug for DisposableRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DisposableRef")
            .field("id", &self.id())
            .field("disposed", &self.is_disposed())
            .finish()
    }
}

impl PartialEq for DisposableRef {
    fn eq(&self, other: &Self) -> bool {
        self.id() == other.id()
    }
}

impl Eq for DisposableRef {}

impl Hash for DisposableRef {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id().hash(state);
    }
}

/// Conversion applied to every value offered to a map or composite.
///
/// Any `T: Dispose` passes. `Option<T>` is the runtime-checked form: `None`
/// stands for a value without a `dispose()` and is rejected with
/// [`InvalidValueError`].
pub trait IntoDisposable {
    fn into_disposable(self) -> Result<DisposableRef, InvalidValueError>;
}

impl<T: Dispose + 'static> IntoDisposable for T {
    fn into_disposable(self) -> Result<DisposableRef, InvalidValueError> {
        Ok(self.into_ref())
    }
}

impl<T: Dispose + 'static> IntoDisposable for Option<T> {
    fn into_disposable(self) -> Result<DisposableRef, InvalidValueError> {
        self.map(Dispose::into_ref).ok_or(InvalidValueError)
    }
}
