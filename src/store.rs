//! The session store and its addressing handles
//!
//! The store is the single mutable root backing one session: a tree of
//! nested string-keyed mappings. Everything else in the crate addresses
//! regions of it through [`MutableView`] handles; nothing copies it.

use std::sync::Arc;

use parking_lot::RwLock;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};

use crate::error::SessionError;
use crate::lifecycle::{SessionLifecycle, SessionStatus};

/// The single mutable key-value root backing a session's data.
///
/// The root mapping does not exist until the session is established;
/// until then every read observes an empty tree. Cloning a `Store`
/// clones the handle, not the data.
#[derive(Clone, Default)]
pub struct Store {
    root: Arc<RwLock<Option<Map<String, Value>>>>,
}

impl Store {
    /// Create a store with no established root.
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether the root mapping has been established.
    pub fn is_initialized(&self) -> bool {
        self.root.read().is_some()
    }

    /// Establish the root mapping with seed data.
    ///
    /// Fails when a root already exists; use [`Store::materialize`] for
    /// the idempotent variant.
    pub fn initialize(&self, data: Map<String, Value>) -> Result<(), SessionError> {
        let mut root = self.root.write();
        if root.is_some() {
            return Err(SessionError::AlreadyInitialized);
        }
        *root = Some(data);
        Ok(())
    }

    /// Establish an empty root mapping unless one already exists.
    ///
    /// Returns whether a new mapping was created; existing data is never
    /// reset.
    pub fn materialize(&self) -> bool {
        let mut root = self.root.write();
        match *root {
            Some(_) => false,
            None => {
                *root = Some(Map::new());
                true
            }
        }
    }

    /// Replace the root mapping wholesale.
    pub fn replace(&self, data: Map<String, Value>) {
        *self.root.write() = Some(data);
    }

    /// Clone of the current root mapping, empty when not yet established.
    pub fn snapshot(&self) -> Map<String, Value> {
        self.root.read().clone().unwrap_or_default()
    }

    fn with_root<R>(&self, f: impl FnOnce(&Map<String, Value>) -> R) -> R {
        match self.root.read().as_ref() {
            Some(map) => f(map),
            None => f(&Map::new()),
        }
    }

    fn with_root_mut<R>(&self, f: impl FnOnce(&mut Map<String, Value>) -> R) -> R {
        let mut root = self.root.write();
        f(root.get_or_insert_with(Map::new))
    }
}

impl std::fmt::Debug for Store {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Store")
            .field("initialized", &self.is_initialized())
            .finish()
    }
}

/// Shared addressing context: the store plus the lifecycle guarding it.
///
/// Resolving the root through an anchor is the sole point at which the
/// session lifecycle is started; every handle routes through it.
#[derive(Clone)]
pub(crate) struct Anchor {
    pub(crate) store: Store,
    pub(crate) lifecycle: Arc<dyn SessionLifecycle>,
}

impl Anchor {
    pub(crate) fn start_or_reuse(&self) {
        if self.lifecycle.status() != SessionStatus::Active {
            self.lifecycle.start();
        }
    }

    fn with_root<R>(&self, f: impl FnOnce(&Map<String, Value>) -> R) -> R {
        self.start_or_reuse();
        self.store.with_root(f)
    }

    fn with_root_mut<R>(&self, f: impl FnOnce(&mut Map<String, Value>) -> R) -> R {
        self.start_or_reuse();
        self.store.with_root_mut(f)
    }
}

#[derive(Clone)]
enum Region {
    Root,
    Segment(String),
}

/// A cloneable handle addressing one region of the session store: the
/// root, or one named sub-tree of it.
///
/// The handle carries the address, never the data, so every operation
/// observes the store's current state and any write made through one
/// handle is immediately visible to every other handle over the same
/// region. Read operations leave a missing region missing; write
/// operations create it as an empty mapping.
#[derive(Clone)]
pub struct MutableView {
    anchor: Anchor,
    region: Region,
}

impl MutableView {
    pub(crate) fn root(anchor: Anchor) -> Self {
        Self {
            anchor,
            region: Region::Root,
        }
    }

    pub(crate) fn segment(anchor: Anchor, name: String) -> Self {
        Self {
            anchor,
            region: Region::Segment(name),
        }
    }

    fn resolve<'a>(&self, root: &'a Map<String, Value>) -> Option<&'a Map<String, Value>> {
        match &self.region {
            Region::Root => Some(root),
            Region::Segment(name) => root.get(name).and_then(Value::as_object),
        }
    }

    fn resolve_existing_mut<'a>(
        &self,
        root: &'a mut Map<String, Value>,
    ) -> Option<&'a mut Map<String, Value>> {
        match &self.region {
            Region::Root => Some(root),
            Region::Segment(name) => root.get_mut(name).and_then(Value::as_object_mut),
        }
    }

    /// Resolve the region for writing, creating it as an empty mapping if
    /// absent. A non-mapping value occupying the slot is discarded.
    fn resolve_mut<'a>(&self, root: &'a mut Map<String, Value>) -> &'a mut Map<String, Value> {
        match &self.region {
            Region::Root => root,
            Region::Segment(name) => {
                let slot = root
                    .entry(name.clone())
                    .or_insert_with(|| Value::Object(Map::new()));
                if !slot.is_object() {
                    *slot = Value::Object(Map::new());
                }
                match slot {
                    Value::Object(map) => map,
                    _ => unreachable!("segment region is forced to a mapping"),
                }
            }
        }
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.anchor
            .with_root(|root| self.resolve(root).is_some_and(|map| map.contains_key(key)))
    }

    pub fn get(&self, key: &str) -> Option<Value> {
        self.anchor
            .with_root(|root| self.resolve(root).and_then(|map| map.get(key).cloned()))
    }

    pub fn insert(&self, key: &str, value: Value) {
        self.anchor.with_root_mut(|root| {
            self.resolve_mut(root).insert(key.to_owned(), value);
        })
    }

    pub fn remove(&self, key: &str) -> Option<Value> {
        self.anchor.with_root_mut(|root| {
            self.resolve_existing_mut(root)
                .and_then(|map| map.remove(key))
        })
    }

    /// Replace the addressed region with an empty mapping, discarding any
    /// data present under it.
    pub fn clear(&self) {
        self.anchor.with_root_mut(|root| match &self.region {
            Region::Root => root.clear(),
            Region::Segment(name) => {
                root.insert(name.clone(), Value::Object(Map::new()));
            }
        })
    }

    pub fn len(&self) -> usize {
        self.anchor
            .with_root(|root| self.resolve(root).map_or(0, |map| map.len()))
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Clone of the addressed region, empty when the region is absent.
    pub fn snapshot(&self) -> Map<String, Value> {
        self.anchor.with_root(|root| {
            self.resolve(root)
                .cloned()
                .unwrap_or_default()
        })
    }

    /// Whether `region[child]` is a mapping containing `key`.
    pub(crate) fn child_contains(&self, child: &str, key: &str) -> bool {
        self.anchor.with_root(|root| {
            self.resolve(root)
                .and_then(|map| map.get(child))
                .and_then(Value::as_object)
                .is_some_and(|map| map.contains_key(key))
        })
    }

    /// Remove and return `key` from the mapping at `region[child]`.
    /// Neither the region nor the child mapping is created when absent.
    pub(crate) fn child_take(&self, child: &str, key: &str) -> Option<Value> {
        self.anchor.with_root_mut(|root| {
            self.resolve_existing_mut(root)
                .and_then(|map| map.get_mut(child))
                .and_then(Value::as_object_mut)
                .and_then(|map| map.remove(key))
        })
    }

    /// Insert `key` into the mapping at `region[child]`, creating the
    /// region and the child mapping as needed.
    pub(crate) fn child_insert(&self, child: &str, key: &str, value: Value) {
        self.anchor.with_root_mut(|root| {
            let region = self.resolve_mut(root);
            let slot = region
                .entry(child.to_owned())
                .or_insert_with(|| Value::Object(Map::new()));
            if !slot.is_object() {
                *slot = Value::Object(Map::new());
            }
            if let Value::Object(map) = slot {
                map.insert(key.to_owned(), value);
            }
        })
    }

    /// Remove `key` from the mapping at `region[child]`, if either exists.
    pub(crate) fn child_remove(&self, child: &str, key: &str) {
        self.anchor.with_root_mut(|root| {
            if let Some(map) = self
                .resolve_existing_mut(root)
                .and_then(|map| map.get_mut(child))
                .and_then(Value::as_object_mut)
            {
                map.remove(key);
            }
        })
    }
}

/// The keyed-container contract shared by [`Session`](crate::Session) and
/// [`Segment`](crate::Segment).
///
/// Implementors supply their own region-resolution strategy through
/// [`KeyedContainer::reference`]; the four operations apply directly to
/// the resolved region. A missing key is `None`, never an error.
pub trait KeyedContainer {
    /// The view over this container's backing region.
    fn reference(&self) -> MutableView;

    fn exists(&self, key: &str) -> bool {
        self.reference().contains_key(key)
    }

    /// Get a value, deserialized into `T`. Values that do not fit `T`
    /// read as absent.
    fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        self.get_value(key)
            .and_then(|value| serde_json::from_value(value).ok())
    }

    /// Get the raw stored value.
    fn get_value(&self, key: &str) -> Option<Value> {
        self.reference().get(key)
    }

    /// Set a value. Values that cannot be serialized are dropped.
    fn set<T: Serialize>(&self, key: &str, value: T) {
        if let Ok(value) = serde_json::to_value(value) {
            self.reference().insert(key, value);
        }
    }

    fn remove(&self, key: &str) {
        self.reference().remove(key);
    }
}
