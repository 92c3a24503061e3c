//! # IDs
//!
//! Process-unique identifiers, namespaced by a marker type. `Id<Layer>` and `Id<Foo>` may share
//! a numeric value, but can never be compared with each other.
//!
//! IDs are handed out from one counter per namespace. They survive cloning (an undo snapshot of a
//! layer has the same ID as the live layer) and are only ever freshly allocated with [`Id::new`].

use std::any::TypeId;
use std::num::NonZeroU64;
use std::sync::atomic::{AtomicU64, Ordering};

// One counter per namespace. Counters are leaked so the read path never has to hold the lock
// while bumping them.
static COUNTERS: parking_lot::RwLock<std::collections::BTreeMap<TypeId, &'static AtomicU64>> =
    parking_lot::const_rwlock(std::collections::BTreeMap::new());

fn counter_for<T: 'static>() -> &'static AtomicU64 {
    let ty = TypeId::of::<T>();
    if let Some(counter) = COUNTERS.read().get(&ty) {
        return *counter;
    }
    // Uncommon path, once per namespace for the life of the program.
    *COUNTERS
        .write()
        .entry(ty)
        .or_insert_with(|| Box::leak(Box::new(AtomicU64::new(1))))
}

pub struct Id<T: 'static> {
    id: NonZeroU64,
    _namespace: std::marker::PhantomData<fn() -> T>,
}

impl<T: 'static> Id<T> {
    /// Allocate a fresh ID.
    ///
    /// # Panics
    /// If every `u64` in this namespace has been handed out.
    #[must_use]
    pub fn new() -> Self {
        let raw = counter_for::<T>().fetch_add(1, Ordering::Relaxed);
        // Wrapped around to zero, every ID from here on would collide.
        let Some(id) = NonZeroU64::new(raw) else {
            panic!("{} id overflow", namespace_name::<T>());
        };
        Self {
            id,
            _namespace: std::marker::PhantomData,
        }
    }
    /// Raw numeric value. Only meaningful for display and logging.
    #[must_use]
    pub fn get(self) -> u64 {
        self.id.get()
    }
}

fn namespace_name<T>() -> &'static str {
    let name = std::any::type_name::<T>();
    name.rsplit("::").next().unwrap_or(name)
}

// Manual impls, derives would put bounds on T.
impl<T: 'static> Default for Id<T> {
    fn default() -> Self {
        Self::new()
    }
}
impl<T: 'static> Clone for Id<T> {
    fn clone(&self) -> Self {
        *self
    }
}
impl<T: 'static> Copy for Id<T> {}
impl<T: 'static> PartialEq for Id<T> {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}
impl<T: 'static> Eq for Id<T> {}
impl<T: 'static> PartialOrd for Id<T> {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}
impl<T: 'static> Ord for Id<T> {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.id.cmp(&other.id)
    }
}
impl<T: 'static> std::hash::Hash for Id<T> {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}
impl<T: 'static> std::fmt::Display for Id<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}#{}", namespace_name::<T>(), self.id)
    }
}
impl<T: 'static> std::fmt::Debug for Id<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        std::fmt::Display::fmt(self, f)
    }
}
