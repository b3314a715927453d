//! Session segments
//!
//! A segment is a named view restricted to one sub-tree of the session
//! store. Segments hold no data of their own: every access dereferences
//! into `store[name]`, so all handles addressing the same name over the
//! same session observe the same data.

use std::sync::Arc;

use parking_lot::RwLock;

use crate::flash::Flash;
use crate::session::Session;
use crate::store::{Anchor, KeyedContainer, MutableView};

/// A named view over one sub-tree of the session store.
///
/// The backing region is created lazily, on the first write through the
/// segment. Cloning a segment clones the handle; clones share the same
/// flash.
#[derive(Clone)]
pub struct Segment {
    name: String,
    view: MutableView,
    flash: Arc<RwLock<Option<Flash>>>,
}

impl Segment {
    /// Create a segment addressing `store[name]` of `session`.
    pub fn new<S: Into<String>>(name: S, session: &Session) -> Self {
        Self::with_anchor(name.into(), session.anchor().clone())
    }

    pub(crate) fn with_anchor(name: String, anchor: Anchor) -> Self {
        Self {
            view: MutableView::segment(anchor, name.clone()),
            name,
            flash: Arc::new(RwLock::new(None)),
        }
    }

    /// The segment's name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Replace the segment's entire backing region with an empty
    /// mapping, discarding any data present under it.
    pub fn clear(&self) {
        self.view.clear()
    }

    /// One-time values stored under this segment's reserved flash key.
    /// Lazily constructed and identity-stable per segment instance;
    /// accessing it never starts the session.
    pub fn flash(&self) -> Flash {
        self.flash
            .write()
            .get_or_insert_with(|| Flash::new(self.view.clone()))
            .clone()
    }
}

impl KeyedContainer for Segment {
    fn reference(&self) -> MutableView {
        self.view.clone()
    }
}

impl std::fmt::Debug for Segment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Segment").field("name", &self.name).finish()
    }
}
