//! disposable-map: a single-threaded map from keys to composite disposables
//! with cascading, exactly-once disposal.
//!
//! Internal Design:
//!
//! Summary
//! - Goal: a keyed container of cleanup-capable values where disposing the
//!   container, or a single key, disposes everything reachable through it.
//! - Layers:
//!   - HandleHashMap<K, V, S>: structural map with stable generational
//!     handles (slotmap storage, hashbrown index) and a debug-only
//!     reentrancy guard. Internal.
//!   - Dispose / Disposable / DisposableRef: the disposal capability, a
//!     shared disposable with a one-shot cleanup action, and the
//!     type-erased member form.
//!   - CompositeDisposable: identity-keyed set of members disposed as a
//!     unit; built on HandleHashMap<DisposeId, DisposableRef>.
//!   - DisposableMap<K, S>: public container; HandleHashMap<K,
//!     CompositeDisposable, S> plus a terminal `disposed` flag.
//!
//! Constraints
//! - Single-threaded: every handle is `Rc`-backed, so `!Send`/`!Sync`.
//! - Handles are cheap clones sharing state. Identity (`DisposeId`) is the
//!   shared allocation's address; composites deduplicate members by it.
//! - Disposal is idempotent everywhere, which is what makes sharing one
//!   resource between several maps or composites safe.
//! - Values are always stored as composites. Plain disposables get wrapped;
//!   composites are stored by reference.
//!
//! Disposal paths
//! - `DisposableMap::delete`/`clear`/`remove` never dispose what they take out.
//! - `DisposableMap::set` replaces silently; the old composite stays live.
//! - `DisposableMap::dispose_key` disposes one entry's composite, not its key.
//! - `Dispose::dispose` on the map disposes every composite and every
//!   disposable key, then leaves the map empty and terminal. Values offered
//!   to a disposed map or composite are disposed on arrival.
//!
//! Reentrancy policy
//! - HandleHashMap panics in debug builds if `K: Eq`/`K: Hash` re-enters it
//!   mid-probe.
//! - Upper layers detach entries (remove or drain) before running any user
//!   cleanup, so cleanup actions may call back into the same map or
//!   composite without hitting a `RefCell` borrow. The order in which such
//!   reentrant calls observe state is a caller hazard, not a guarantee.
//! - The disposed flag is set before cascading, so cycles (a composite that
//!   contains itself, a map stored in its own entry) terminate.
//!
//! Notes and non-goals
//! - No I/O, scheduling, persistence or thread-safety.
//! - Dropping the last handle does not dispose anything; disposal is always
//!   explicit. `Rc` cycles between containers leak until one is disposed.
//! - Member order inside a composite, and therefore disposal order, is
//!   unspecified.

mod composite;
mod disposable;
mod error;
mod handle_hash_map;
mod handle_hash_map_proptest;
mod key;
mod map;
mod reentrancy;

// Public surface
pub use composite::CompositeDisposable;
pub use disposable::{Dispose, DisposableRef, Disposable, DisposeId, IntoDisposable};
pub use error::InvalidValueError;
pub use key::{DisposableKey, Plain};
pub use map::DisposableMap;
