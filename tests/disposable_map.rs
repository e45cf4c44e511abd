// DisposableMap integration tests.
//
// Each test states the behavior it verifies. Invariants exercised:
// - Normalization: plain disposables are wrapped in a fresh composite;
//   composites are stored by reference.
// - Cascade: disposing the map reaches every nested member exactly once.
// - Key scope: only whole-map disposal disposes disposable keys.
// - Non-destructive paths: set-over, delete, clear and remove never dispose.
// - Atomicity: a rejected value leaves the map as it was.
use disposable_map::{
    CompositeDisposable, Dispose, Disposable, DisposableMap, DisposableRef, InvalidValueError, Plain,
};
use std::cell::Cell;
use std::rc::Rc;

fn counted() -> (Disposable, Rc<Cell<u32>>) {
    let runs = Rc::new(Cell::new(0));
    let r = runs.clone();
    (Disposable::new(move || r.set(r.get() + 1)), runs)
}

// Test: construction wraps a plain disposable and whole-map dispose reaches it.
#[test]
fn constructed_entry_is_wrapped_and_disposed() {
    let a = Disposable::empty();
    let m = DisposableMap::try_from_entries([("k", a.clone())]).unwrap();

    let c = m.get("k").expect("entry present");
    assert_eq!(c.len(), 1);
    assert!(c.contains(&a));
    assert_ne!(c.id(), a.id(), "stored value is a composite, not the disposable");

    m.dispose();
    assert!(a.is_disposed());
    assert_eq!(m.len(), 0);
    assert!(m.is_disposed());
}

// Test: set over an existing key replaces without disposing the old value.
#[test]
fn set_replaces_silently() {
    let (d1, _) = counted();
    let (d2, _) = counted();
    let c1 = CompositeDisposable::with_members([d1.clone()]).unwrap();
    let c2 = CompositeDisposable::with_members([d2.clone()]).unwrap();

    let m: DisposableMap<&str> = DisposableMap::new();
    m.set("k", c1.clone()).unwrap();
    m.set("k", c2.clone()).unwrap();
    assert!(m.get("k").unwrap().ptr_eq(&c2));
    assert_eq!(m.len(), 1);

    m.dispose();
    assert!(c2.is_disposed() && d2.is_disposed());
    assert!(!c1.is_disposed() && !d1.is_disposed());
}

// Test: a composite passed to set is the stored value, so later mutation of
// either side is shared.
#[test]
fn composite_passes_through_by_reference() {
    let c = CompositeDisposable::new();
    let m: DisposableMap<u32> = DisposableMap::new();
    m.set(7, c.clone()).unwrap();
    assert!(m.get(&7).unwrap().ptr_eq(&c));

    let late = Disposable::empty();
    m.add(7, [late.clone()]).unwrap();
    assert!(c.contains(&late));
}

// Test: members removed before disposal survive it.
#[test]
fn removed_member_is_not_disposed() {
    let x = Disposable::empty();
    let y = Disposable::empty();
    let z = Disposable::empty();
    let m: DisposableMap<&str> = DisposableMap::new();
    m.add("k", [x.clone(), y.clone(), z.clone()]).unwrap();
    m.remove("k", [&y]);
    assert_eq!(m.get("k").unwrap().len(), 2);

    m.dispose();
    assert!(x.is_disposed());
    assert!(z.is_disposed());
    assert!(!y.is_disposed());
}

// Test: dispose_key touches one entry only.
#[test]
fn dispose_key_is_scoped_to_one_entry() {
    let a = Disposable::empty();
    let b = Disposable::empty();
    let m: DisposableMap<&str> = DisposableMap::new();
    m.set("a", a.clone()).unwrap();
    m.set("b", b.clone()).unwrap();
    let a_comp = m.get("a").unwrap();

    m.dispose_key("a");
    assert!(a.is_disposed());
    assert!(a_comp.is_disposed());
    assert!(!m.contains_key("a"));

    assert!(!b.is_disposed());
    assert!(m.contains_key("b"));
    assert_eq!(m.len(), 1);
    assert!(!m.is_disposed());

    // Absent key is a no-op.
    m.dispose_key("missing");
    assert_eq!(m.len(), 1);
}

// Test: a resource shared by two maps is cleaned up once.
#[test]
fn shared_disposable_runs_cleanup_once() {
    let (shared, runs) = counted();
    let m1 = DisposableMap::try_from_entries([(1u8, shared.clone())]).unwrap();
    let m2 = DisposableMap::try_from_entries([(2u8, shared.clone())]).unwrap();

    m1.dispose();
    m2.dispose();
    assert!(shared.is_disposed());
    assert_eq!(runs.get(), 1);
}

// Test: whole-map disposal is idempotent.
#[test]
fn dispose_twice_is_noop() {
    let (d, runs) = counted();
    let m = DisposableMap::try_from_entries([("k", d)]).unwrap();
    m.dispose();
    m.dispose();
    assert!(m.is_disposed());
    assert_eq!(m.len(), 0);
    assert_eq!(runs.get(), 1);
}

// Test: disposable keys are disposed by whole-map disposal only.
#[test]
fn disposable_keys_follow_whole_map_disposal() {
    let k1 = Disposable::empty();
    let k2 = Disposable::empty();
    let k3 = Disposable::empty();
    let m: DisposableMap<Disposable> = DisposableMap::new();
    m.set(k1.clone(), Disposable::empty()).unwrap();
    m.set(k2.clone(), Disposable::empty()).unwrap();
    m.set(k3.clone(), Disposable::empty()).unwrap();

    m.dispose_key(&k1);
    assert!(!k1.is_disposed(), "dispose_key leaves the key alone");

    assert!(m.delete(&k2));
    assert!(!k2.is_disposed(), "delete leaves the key alone");

    m.dispose();
    assert!(k3.is_disposed(), "whole-map dispose disposes the key");
}

// Test: a nested map used as a key is disposed with the outer map.
#[test]
fn map_as_key_is_disposed() {
    let inner_leaf = Disposable::empty();
    let inner: DisposableMap<u32> = DisposableMap::new();
    inner.set(1, inner_leaf.clone()).unwrap();

    let outer: DisposableMap<DisposableMap<u32>> = DisposableMap::new();
    outer.set(inner.clone(), Disposable::empty()).unwrap();
    assert!(outer.contains_key(&inner));

    outer.dispose();
    assert!(inner.is_disposed());
    assert!(inner_leaf.is_disposed());
}

// Test: delete removes without disposing and reports presence.
#[test]
fn delete_is_non_destructive() {
    let d = Disposable::empty();
    let m: DisposableMap<&str> = DisposableMap::new();
    m.set("k", d.clone()).unwrap();
    let c = m.get("k").unwrap();

    assert!(m.delete("k"));
    assert!(!m.delete("k"));
    assert!(!m.contains_key("k"));
    assert!(!c.is_disposed());
    assert!(!d.is_disposed());

    m.dispose();
    assert!(!d.is_disposed(), "deleted entries are out of reach");
}

// Test: maps nest inside composites and other maps, cascading all the way.
#[test]
fn nested_maps_cascade() {
    let (leaf, runs) = counted();
    let level2: DisposableMap<&str> = DisposableMap::new();
    level2.add("leaf", [leaf.clone()]).unwrap();

    let level1: DisposableMap<&str> = DisposableMap::new();
    level1.add("child", [level2.clone()]).unwrap();

    let root: DisposableMap<&str> = DisposableMap::new();
    let group = CompositeDisposable::with_members([level1.clone()]).unwrap();
    root.set("group", group).unwrap();

    root.dispose();
    assert!(level1.is_disposed());
    assert!(level2.is_disposed());
    assert_eq!(runs.get(), 1);
}

// Test: heterogeneous members can be added in one call through DisposableRef.
#[test]
fn heterogeneous_add() {
    let d = Disposable::empty();
    let c = CompositeDisposable::new();
    let nested: DisposableMap<u8> = DisposableMap::new();

    let m: DisposableMap<&str> = DisposableMap::new();
    m.add(
        "k",
        [
            DisposableRef::new(d.clone()),
            DisposableRef::new(c.clone()),
            DisposableRef::new(nested.clone()),
        ],
    )
    .unwrap();
    assert_eq!(m.get("k").unwrap().len(), 3);

    m.dispose_key("k");
    assert!(d.is_disposed() && c.is_disposed() && nested.is_disposed());
}

// Test: empty add creates an entry and changes nothing else.
#[test]
fn empty_add_is_legal() {
    let m: DisposableMap<&str> = DisposableMap::new();
    m.add("k", [Disposable::empty()]).unwrap();
    m.add("k", Vec::<Disposable>::new()).unwrap();
    assert_eq!(m.get("k").unwrap().len(), 1);
}

// Test: rejected values leave the map untouched on every insertion path.
#[test]
fn invalid_values_are_rejected_atomically() {
    let keep = Disposable::empty();
    let m: DisposableMap<&str> = DisposableMap::new();
    m.set("k", keep.clone()).unwrap();
    let before = m.get("k").unwrap();

    assert_eq!(m.set("k", None::<Disposable>), Err(InvalidValueError));
    assert_eq!(m.set("new", None::<Disposable>), Err(InvalidValueError));
    assert_eq!(
        m.add("k", [Some(Disposable::empty()), None]),
        Err(InvalidValueError)
    );
    assert_eq!(
        m.add("other", [None::<Disposable>]),
        Err(InvalidValueError)
    );

    assert_eq!(m.len(), 1);
    assert!(m.get("k").unwrap().ptr_eq(&before));
    assert_eq!(before.len(), 1);
    assert!(!m.contains_key("new"));
    assert!(!m.contains_key("other"));

    let built = DisposableMap::try_from_entries([("a", Some(Disposable::empty())), ("b", None)]);
    assert_eq!(built.unwrap_err(), InvalidValueError);
    assert_eq!(InvalidValueError.to_string(), "value must have a dispose() method");
}

// Test: construction with a repeated key keeps the last value, undisposed first.
#[test]
fn construction_with_repeated_key_overwrites() {
    let first = Disposable::empty();
    let second = Disposable::empty();
    let m = DisposableMap::try_from_entries([("k", first.clone()), ("k", second.clone())]).unwrap();
    assert_eq!(m.len(), 1);
    assert!(m.get("k").unwrap().contains(&second));

    m.dispose();
    assert!(second.is_disposed());
    assert!(!first.is_disposed());
}

// Test: a disposed map stays empty; late values are disposed on arrival.
#[test]
fn disposed_map_is_terminal() {
    let m: DisposableMap<&str> = DisposableMap::new();
    m.dispose();

    let late_set = Disposable::empty();
    let late_add = Disposable::empty();
    m.set("k", late_set.clone()).unwrap();
    m.add("k", [late_add.clone()]).unwrap();

    assert!(late_set.is_disposed());
    assert!(late_add.is_disposed());
    assert!(m.is_empty());
    assert!(m.is_disposed());
}

// Test: a cleanup action may call back into the map that is disposing it.
#[test]
fn cleanup_may_reenter_map() {
    let m: DisposableMap<&str> = DisposableMap::new();
    let observed = Rc::new(Cell::new(usize::MAX));

    let handle = m.clone();
    let seen = observed.clone();
    m.add(
        "k",
        [Disposable::new(move || {
            seen.set(handle.len());
            handle.dispose_key("other");
            let _ = handle.delete("k");
        })],
    )
    .unwrap();
    m.set("other", Disposable::empty()).unwrap();

    m.dispose_key("k");
    assert_eq!(observed.get(), 1, "entry is detached before its cleanup runs");
    assert!(m.is_empty());
    assert!(!m.is_disposed());
}

// Test: a map stored inside its own entry does not loop on disposal.
#[test]
fn self_referencing_map_disposes_once() {
    let (d, runs) = counted();
    let m: DisposableMap<u8> = DisposableMap::new();
    m.add(0, [DisposableRef::new(m.clone()), DisposableRef::new(d)])
        .unwrap();

    m.dispose();
    assert!(m.is_disposed());
    assert_eq!(runs.get(), 1);
}

// Test: construction stores a composite by reference, like set.
#[test]
fn constructed_composite_passes_through() {
    let leaf = Disposable::empty();
    let c = CompositeDisposable::with_members([leaf.clone()]).unwrap();
    let m = DisposableMap::try_from_entries([("k", c.clone())]).unwrap();
    assert!(m.get("k").unwrap().ptr_eq(&c));

    m.dispose();
    assert!(c.is_disposed());
    assert!(leaf.is_disposed());
}

// Test: add wraps a plain disposable in a composite instead of storing it.
#[test]
fn add_wraps_plain_disposable() {
    let d = Disposable::empty();
    let m: DisposableMap<&str> = DisposableMap::new();
    m.add("k", [d.clone()]).unwrap();

    let stored = m.get("k").unwrap();
    assert_ne!(stored.id(), d.id());
    assert_eq!(stored.len(), 1);
    assert!(stored.contains(&d));
}

// Test: composite keys such as tuples, vectors and paths work without wrapping.
#[test]
fn std_composite_keys_are_accepted() {
    let a = Disposable::empty();
    let m: DisposableMap<(u32, u32)> = DisposableMap::new();
    m.set((1, 2), a.clone()).unwrap();
    m.add((3, 4), [Disposable::empty()]).unwrap();
    assert!(m.contains_key(&(1, 2)));
    assert!(!m.contains_key(&(2, 1)));
    m.dispose_key(&(1, 2));
    assert!(a.is_disposed());
    assert_eq!(m.len(), 1);

    let by_path: DisposableMap<std::path::PathBuf> = DisposableMap::new();
    by_path.set("/tmp/sock".into(), Disposable::empty()).unwrap();
    assert!(by_path.contains_key(std::path::Path::new("/tmp/sock")));

    let by_bytes: DisposableMap<Vec<u8>> = DisposableMap::new();
    by_bytes.set(b"id".to_vec(), Disposable::empty()).unwrap();
    assert!(by_bytes.contains_key(&b"id"[..]));
}

// Test: Plain admits any Eq + Hash key and is looked up by the bare value.
#[test]
fn plain_wrapper_keys() {
    use std::net::{IpAddr, Ipv6Addr};

    let conn = Disposable::empty();
    let m: DisposableMap<Plain<IpAddr>> = DisposableMap::new();
    let addr = IpAddr::V6(Ipv6Addr::LOCALHOST);
    m.set(Plain(addr), conn.clone()).unwrap();
    assert!(m.contains_key(&addr));
    assert_eq!(m.keys(), vec![Plain(addr)]);

    m.dispose();
    assert!(conn.is_disposed());
}

// Test: an optional disposable key is disposed with the map when present.
#[test]
fn optional_disposable_key_is_disposed() {
    let k = Disposable::empty();
    let m: DisposableMap<Option<Disposable>> = DisposableMap::new();
    m.set(Some(k.clone()), Disposable::empty()).unwrap();
    m.set(None, Disposable::empty()).unwrap();
    assert_eq!(m.len(), 2);

    m.dispose();
    assert!(k.is_disposed());
}
