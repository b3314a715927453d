//! One-time flash values
//!
//! Flash values are written once and meant to be read on the following
//! request, after which they disappear from the session. They are stored
//! in two tiers: a *persistent* tier under a reserved key inside the
//! owning segment's region, and a *volatile* tier private to the flash
//! handle. The first read of a key moves it from the persistent tier to
//! the volatile one, so the value survives exactly one session reload
//! while remaining readable any number of times within the request that
//! consumed it.

use std::sync::Arc;

use parking_lot::RwLock;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};

use crate::store::MutableView;

/// Reserved key holding pending flash values inside a segment's region.
pub const FLASH_NAME: &str = "__FLASH__";

/// Read-once values over a segment (or the session root).
///
/// Cloning a flash clones the handle; clones share the volatile tier.
/// Independently constructed flashes over the same region share the
/// persistent tier only.
#[derive(Clone)]
pub struct Flash {
    view: MutableView,
    volatile: Arc<RwLock<Map<String, Value>>>,
}

impl Flash {
    pub(crate) fn new(view: MutableView) -> Self {
        Self {
            view,
            volatile: Arc::new(RwLock::new(Map::new())),
        }
    }

    /// Whether `key` is readable: pending in the persistent tier or
    /// already consumed into the volatile tier.
    pub fn exists(&self, key: &str) -> bool {
        self.volatile.read().contains_key(key) || self.view.child_contains(FLASH_NAME, key)
    }

    /// Read a flash value, deserialized into `T`. Values that do not fit
    /// `T` read as absent.
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        self.get_value(key)
            .and_then(|value| serde_json::from_value(value).ok())
    }

    /// Read a raw flash value.
    ///
    /// The first read moves the value out of the persistent tier, so it
    /// will not be seen again on a later request; subsequent reads are
    /// served from the volatile tier. A missing key is `None` and
    /// nothing is created.
    pub fn get_value(&self, key: &str) -> Option<Value> {
        if let Some(value) = self.view.child_take(FLASH_NAME, key) {
            self.volatile.write().insert(key.to_owned(), value.clone());
            return Some(value);
        }
        self.volatile.read().get(key).cloned()
    }

    /// Write a flash value to both tiers: readable immediately within
    /// this request, and persisted for exactly one read on a later one.
    pub fn set<T: Serialize>(&self, key: &str, value: T) {
        if let Ok(value) = serde_json::to_value(value) {
            self.view.child_insert(FLASH_NAME, key, value.clone());
            self.volatile.write().insert(key.to_owned(), value);
        }
    }

    /// Delete `key` from both tiers.
    pub fn remove(&self, key: &str) {
        self.volatile.write().remove(key);
        self.view.child_remove(FLASH_NAME, key);
    }
}

impl std::fmt::Debug for Flash {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Flash")
            .field("volatile", &self.volatile.read().len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::Session;
    use crate::store::KeyedContainer;
    use serde_json::json;

    #[test]
    fn test_move_on_first_read() {
        let session = Session::new();
        let segment = session.segments().get("g");
        let flash = segment.flash();

        flash.set("k", "v");

        // The persistent tier holds the pending value.
        assert_eq!(
            session.get_value("g"),
            Some(json!({ FLASH_NAME: { "k": "v" } }))
        );

        // The first read returns it and removes it from the persistent
        // tier.
        assert_eq!(flash.get::<String>("k").as_deref(), Some("v"));
        assert_eq!(session.get_value("g"), Some(json!({ FLASH_NAME: {} })));

        // Later reads on the same flash still see the value.
        assert_eq!(flash.get::<String>("k").as_deref(), Some("v"));
    }

    #[test]
    fn test_absent_read_creates_nothing() {
        let session = Session::new();
        let segment = session.segments().get("g");
        let flash = segment.flash();

        assert_eq!(flash.get_value("missing"), None);
        assert!(!flash.exists("missing"));
        // No region or flash mapping was fabricated by the read.
        assert_eq!(session.get_value("g"), None);
    }

    #[test]
    fn test_exists_spans_both_tiers() {
        let session = Session::new();
        let flash = session.segments().get("g").flash();

        flash.set("k", "v");
        assert!(flash.exists("k"));

        // Consumed into the volatile tier; still readable, still exists.
        let _ = flash.get_value("k");
        assert!(flash.exists("k"));
    }

    #[test]
    fn test_remove_deletes_from_both_tiers() {
        let session = Session::new();
        let flash = session.segments().get("g").flash();

        flash.set("k", "v");
        let _ = flash.get_value("k");
        flash.remove("k");

        assert!(!flash.exists("k"));
        assert_eq!(flash.get_value("k"), None);
        assert_eq!(session.get_value("g"), Some(json!({ FLASH_NAME: {} })));
    }

    #[test]
    fn test_set_overwrites_both_tiers() {
        let session = Session::new();
        let flash = session.segments().get("g").flash();

        flash.set("k", "first");
        let _ = flash.get_value("k");

        flash.set("k", "second");
        assert_eq!(flash.get::<String>("k").as_deref(), Some("second"));
        // The overwrite re-armed the persistent tier before this read
        // consumed it again.
        assert_eq!(session.get_value("g"), Some(json!({ FLASH_NAME: {} })));
    }

    #[test]
    fn test_session_flash_lives_at_the_root() {
        let session = Session::new();
        let flash = session.flash();

        flash.set("notice", "saved");
        assert_eq!(
            session.get_value(FLASH_NAME),
            Some(json!({ "notice": "saved" }))
        );

        assert_eq!(flash.get::<String>("notice").as_deref(), Some("saved"));
        assert_eq!(session.get_value(FLASH_NAME), Some(json!({})));
    }

    #[test]
    fn test_pending_value_survives_commit_and_restart() {
        let session = Session::new();
        session.segments().get("g").flash().set("k", "v");
        session.commit();

        // The next "request": same store, fresh flash handle.
        let reopened = session.segments().get("g");
        let flash = crate::flash::Flash::new(reopened.reference());
        assert_eq!(flash.get::<String>("k").as_deref(), Some("v"));
    }
}
