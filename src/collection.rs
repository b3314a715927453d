//! The segment collection
//!
//! A registry of segments keyed by name, materializing one handle per
//! distinct name on first access. Existence and removal act on the
//! session's top-level keys, so they reflect the data, not the handles.

use std::sync::Arc;

use parking_lot::RwLock;
use serde_json::Value;

use crate::error::SessionError;
use crate::segment::Segment;
use crate::session::Session;
use crate::store::{Anchor, MutableView};

/// A collection of session segments.
///
/// Cloning the collection clones the handle; clones share the segment
/// cache. Two collections over the same session hand out distinct
/// segment handles that address the same underlying data.
#[derive(Clone)]
pub struct SegmentCollection {
    anchor: Anchor,
    segments: Arc<RwLock<Vec<(String, Segment)>>>,
}

impl SegmentCollection {
    /// Create a collection over `session`.
    pub fn new(session: &Session) -> Self {
        Self::with_anchor(session.anchor().clone())
    }

    pub(crate) fn with_anchor(anchor: Anchor) -> Self {
        Self {
            anchor,
            segments: Arc::new(RwLock::new(Vec::new())),
        }
    }

    fn root(&self) -> MutableView {
        MutableView::root(self.anchor.clone())
    }

    /// Whether segment data exists under `name` at the session's top
    /// level, not merely whether a handle has been materialized.
    pub fn exists(&self, name: &str) -> bool {
        self.root().contains_key(name)
    }

    /// The segment registered under `name`, materializing and caching a
    /// handle on first access. Never fails: a handle can be produced
    /// whether or not backing data exists yet.
    pub fn get(&self, name: &str) -> Segment {
        let mut segments = self.segments.write();
        if let Some((_, segment)) = segments.iter().find(|(cached, _)| cached == name) {
            return segment.clone();
        }

        let segment = Segment::with_anchor(name.to_owned(), self.anchor.clone());
        segments.push((name.to_owned(), segment.clone()));
        segment
    }

    /// Evict the cached handle for `name` and delete its backing data
    /// from the session's top level.
    pub fn remove(&self, name: &str) {
        self.segments.write().retain(|(cached, _)| cached != name);
        self.root().remove(name);
    }

    /// Segment slots cannot be assigned directly; they are only mutated
    /// through the segment's own contract. Always fails with
    /// [`SessionError::NotWritable`].
    pub fn set(&self, name: &str, _value: Value) -> Result<(), SessionError> {
        Err(SessionError::NotWritable(name.to_owned()))
    }

    /// Materialized segments, in first-access order. Store keys written
    /// through other paths are not discovered.
    pub fn iter(&self) -> impl Iterator<Item = (String, Segment)> {
        self.segments.read().clone().into_iter()
    }

    /// Number of materialized segment handles.
    pub fn len(&self) -> usize {
        self.segments.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.read().is_empty()
    }
}

impl std::fmt::Debug for SegmentCollection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let names: Vec<String> = self
            .segments
            .read()
            .iter()
            .map(|(name, _)| name.clone())
            .collect();
        f.debug_struct("SegmentCollection")
            .field("segments", &names)
            .finish()
    }
}
