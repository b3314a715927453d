//! The session facade
//!
//! [`Session`] is the root addressable object: it exposes the session's
//! configuration attributes, array-style access onto the whole store,
//! the segment collection, a root-level flash, and the token used to
//! validate that a request belongs to this session. Lifecycle verbs are
//! forwarded to the bound [`SessionLifecycle`].

use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;
use serde_json::Value;

use crate::collection::SegmentCollection;
use crate::config::{CookieParams, SessionOptions};
use crate::error::SessionError;
use crate::flash::Flash;
use crate::lifecycle::{
    LifecycleOp, LifecycleOutcome, RuntimeLifecycle, SessionLifecycle, SessionStatus,
};
use crate::store::{Anchor, KeyedContainer, MutableView};
use crate::token::{self, TOKEN_NAME};

/// A session: configuration attributes, store access, segments, flash
/// and token management over a host lifecycle.
///
/// `Session` is cheap to clone; clones share the same store, lifecycle,
/// segment collection and flash.
#[derive(Clone)]
pub struct Session {
    anchor: Anchor,
    segments: Arc<RwLock<Option<SegmentCollection>>>,
    flash: Arc<RwLock<Option<Flash>>>,
}

impl Session {
    /// Session bound to a fresh [`RuntimeLifecycle`] with default
    /// options.
    pub fn new() -> Self {
        Self::with_options(SessionOptions::default())
    }

    /// Session bound to a fresh [`RuntimeLifecycle`] with the given
    /// options.
    pub fn with_options(options: SessionOptions) -> Self {
        Self::with_lifecycle(Arc::new(RuntimeLifecycle::new()), options)
    }

    /// Session bound to a host lifecycle. Options are normalized against
    /// the lifecycle's current values and applied.
    pub fn with_lifecycle(lifecycle: Arc<dyn SessionLifecycle>, options: SessionOptions) -> Self {
        let session = Self {
            anchor: Anchor {
                store: lifecycle.store(),
                lifecycle,
            },
            segments: Arc::new(RwLock::new(None)),
            flash: Arc::new(RwLock::new(None)),
        };
        session.configure(options);
        session
    }

    pub(crate) fn anchor(&self) -> &Anchor {
        &self.anchor
    }

    fn lifecycle(&self) -> &dyn SessionLifecycle {
        self.anchor.lifecycle.as_ref()
    }

    /// Apply an options record. Unset keys fall back to the lifecycle's
    /// current values; an empty identifier is not applied, leaving
    /// generation to the lifecycle on start.
    pub fn configure(&self, options: SessionOptions) {
        let normalized = options.normalize(self.lifecycle());

        if let Some(id) = normalized.id {
            self.set_id(&id);
        }
        self.set_name(&normalized.name);
        self.set_cache_limiter(&normalized.cache_limiter);
        self.set_cache_expire(normalized.cache_expire);
        self.set_module_name(&normalized.module_name);
        self.set_save_path(&normalized.save_path);
        self.set_cookie_params(normalized.cookie_params);
    }

    /// Current session identifier; empty before the first start.
    pub fn id(&self) -> String {
        self.lifecycle().id()
    }

    /// Set the session identifier. Setting the current value is a no-op.
    pub fn set_id(&self, id: &str) {
        if self.lifecycle().id() != id {
            self.lifecycle().set_id(id);
        }
    }

    /// Current session (cookie) name.
    pub fn name(&self) -> String {
        self.lifecycle().name()
    }

    /// Set the session name. Setting the current value is a no-op.
    pub fn set_name(&self, name: &str) {
        if self.lifecycle().name() != name {
            self.lifecycle().set_name(name);
        }
    }

    pub fn cache_limiter(&self) -> String {
        self.lifecycle().cache_limiter()
    }

    /// Set the cache limiter. Setting the current value is a no-op.
    pub fn set_cache_limiter(&self, cache_limiter: &str) {
        if self.lifecycle().cache_limiter() != cache_limiter {
            self.lifecycle().set_cache_limiter(cache_limiter);
        }
    }

    pub fn cache_expire(&self) -> u32 {
        self.lifecycle().cache_expire()
    }

    pub fn set_cache_expire(&self, cache_expire: u32) {
        if self.lifecycle().cache_expire() != cache_expire {
            self.lifecycle().set_cache_expire(cache_expire);
        }
    }

    pub fn module_name(&self) -> String {
        self.lifecycle().module_name()
    }

    pub fn set_module_name(&self, module_name: &str) {
        if self.lifecycle().module_name() != module_name {
            self.lifecycle().set_module_name(module_name);
        }
    }

    pub fn save_path(&self) -> String {
        self.lifecycle().save_path()
    }

    pub fn set_save_path(&self, save_path: &str) {
        if self.lifecycle().save_path() != save_path {
            self.lifecycle().set_save_path(save_path);
        }
    }

    pub fn cookie_params(&self) -> CookieParams {
        self.lifecycle().cookie_params()
    }

    pub fn set_cookie_params(&self, params: CookieParams) {
        if self.lifecycle().cookie_params() != params {
            self.lifecycle().set_cookie_params(params);
        }
    }

    /// Current session status.
    pub fn status(&self) -> SessionStatus {
        self.lifecycle().status()
    }

    /// Whether sessions are enabled, and one exists.
    pub fn is_active(&self) -> bool {
        self.status() == SessionStatus::Active
    }

    /// Whether sessions are unavailable.
    pub fn is_disabled(&self) -> bool {
        self.status() == SessionStatus::Disabled
    }

    /// Whether sessions are enabled, but none exists.
    pub fn has_none(&self) -> bool {
        self.status() == SessionStatus::None
    }

    /// Whether the incoming request carries a non-empty cookie under
    /// this session's name. Never starts a session.
    pub fn is_referenced(&self) -> bool {
        self.lifecycle()
            .request_cookie(&self.name())
            .is_some_and(|value| !value.is_empty())
    }

    /// The session token, generated lazily on first access and stored
    /// under [`TOKEN_NAME`]. Stable until [`Session::regenerate`].
    pub fn token(&self) -> String {
        let reference = self.reference();
        let existing = reference.get(TOKEN_NAME).and_then(|value| {
            value
                .as_str()
                .filter(|token| !token.is_empty())
                .map(str::to_owned)
        });
        if let Some(token) = existing {
            return token;
        }

        let fresh = token::generate();
        reference.insert(TOKEN_NAME, Value::String(fresh.clone()));
        fresh
    }

    /// Compare `candidate` against the stored token, in constant time.
    ///
    /// The comparison reads the stored cell only: a session with no
    /// token always fails verification and no token is created.
    pub fn verify_token(&self, candidate: &str) -> bool {
        match self.reference().get(TOKEN_NAME) {
            Some(Value::String(stored)) => token::constant_time_eq(&stored, candidate),
            _ => false,
        }
    }

    /// Replace the token, then regenerate the session identifier.
    ///
    /// The token changes before the identifier so tokens bound to the
    /// old identifier cannot be replayed against the new one. Returns
    /// the result of the identifier regeneration.
    pub fn regenerate(&self) -> bool {
        self.reference()
            .insert(TOKEN_NAME, Value::String(token::generate()));
        self.lifecycle().regenerate_id(true)
    }

    /// The session's segments. Lazily constructed and identity-stable;
    /// accessing it never starts the session.
    pub fn segments(&self) -> SegmentCollection {
        self.segments
            .write()
            .get_or_insert_with(|| SegmentCollection::with_anchor(self.anchor.clone()))
            .clone()
    }

    /// One-time values stored at the root of the session. Lazily
    /// constructed and identity-stable; accessing it never starts the
    /// session.
    pub fn flash(&self) -> Flash {
        self.flash
            .write()
            .get_or_insert_with(|| Flash::new(MutableView::root(self.anchor.clone())))
            .clone()
    }

    /// Clear the session of all data.
    pub fn clear(&self) {
        self.reference().clear()
    }

    /// Establish the session. In non-interactive contexts this
    /// synthesizes the in-memory store exactly once; an existing store
    /// is reused, never reset.
    pub fn start(&self) -> bool {
        self.lifecycle().start()
    }

    /// Start a new session or reuse the active one.
    pub fn start_or_reuse(&self) {
        self.anchor.start_or_reuse()
    }

    /// Forward a lifecycle operation to the host facility.
    pub fn forward(&self, op: LifecycleOp) -> LifecycleOutcome {
        match op {
            LifecycleOp::Abort => {
                self.lifecycle().abort();
                LifecycleOutcome::Done
            }
            LifecycleOp::Commit => {
                self.lifecycle().commit();
                LifecycleOutcome::Done
            }
            LifecycleOp::Decode(data) => LifecycleOutcome::Applied(self.lifecycle().decode(&data)),
            LifecycleOp::Destroy => {
                self.lifecycle().destroy();
                LifecycleOutcome::Done
            }
            LifecycleOp::Encode => LifecycleOutcome::Encoded(self.lifecycle().encode()),
            LifecycleOp::RegenerateId { delete_old } => {
                LifecycleOutcome::Applied(self.lifecycle().regenerate_id(delete_old))
            }
            LifecycleOp::Reset => {
                self.lifecycle().reset();
                LifecycleOutcome::Done
            }
        }
    }

    /// Forward a lifecycle operation by name.
    ///
    /// Names outside the recognized set fail with
    /// [`SessionError::UnknownOperation`]. Operations that carry a
    /// payload (`decode`, `regenerate_id`) are dispatched with empty
    /// defaults; use [`Session::forward`] to pass one.
    pub fn forward_named(&self, name: &str) -> Result<LifecycleOutcome, SessionError> {
        let op = match name {
            "abort" => LifecycleOp::Abort,
            "commit" => LifecycleOp::Commit,
            "decode" => LifecycleOp::Decode(String::new()),
            "destroy" => LifecycleOp::Destroy,
            "encode" => LifecycleOp::Encode,
            "regenerate_id" => LifecycleOp::RegenerateId { delete_old: false },
            "reset" => LifecycleOp::Reset,
            _ => return Err(SessionError::UnknownOperation(name.to_owned())),
        };
        Ok(self.forward(op))
    }

    /// Discard session data changes and finish the session.
    pub fn abort(&self) {
        self.lifecycle().abort()
    }

    /// Write session data and end the session.
    pub fn commit(&self) {
        self.lifecycle().commit()
    }

    /// Destroy all data registered to the session.
    pub fn destroy(&self) {
        self.lifecycle().destroy()
    }

    /// Re-initialize session data with its original values.
    pub fn reset(&self) {
        self.lifecycle().reset()
    }

    /// Replace the session identifier with a freshly generated one.
    pub fn regenerate_id(&self, delete_old: bool) -> bool {
        self.lifecycle().regenerate_id(delete_old)
    }

    /// Encode the current session data; `None` when no session is
    /// active.
    pub fn encode(&self) -> Option<String> {
        self.lifecycle().encode()
    }

    /// Replace session data from an encoded string.
    pub fn decode(&self, data: &str) -> bool {
        self.lifecycle().decode(data)
    }
}

impl KeyedContainer for Session {
    fn reference(&self) -> MutableView {
        MutableView::root(self.anchor.clone())
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("id", &self.id())
            .field("name", &self.name())
            .field("status", &self.status())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CookieOptions;
    use crate::token::TOKEN_NAME;
    use serde_json::json;

    #[test]
    fn test_array_access() {
        let session = Session::new();

        assert!(!session.exists("user"));
        session.set("user", "alice");
        assert!(session.exists("user"));
        assert_eq!(session.get::<String>("user").as_deref(), Some("alice"));

        session.remove("user");
        assert!(!session.exists("user"));
        assert_eq!(session.get::<String>("user"), None);
    }

    #[test]
    fn test_reference_round_trip() {
        let session = Session::new();

        session.set("k", "v1");
        let reference = session.reference();
        assert_eq!(reference.get("k"), Some(json!("v1")));

        reference.insert("k", json!("v2"));
        assert_eq!(session.get::<String>("k").as_deref(), Some("v2"));
    }

    #[test]
    fn test_properties() {
        let session = Session::new();

        assert_eq!(session.name(), "SESSID");
        session.set_name("myapp");
        assert_eq!(session.name(), "myapp");

        assert_eq!(session.id(), "");
        session.set_id("sid-123");
        assert_eq!(session.id(), "sid-123");

        session.set_cache_limiter("public");
        assert_eq!(session.cache_limiter(), "public");

        session.set_cache_expire(300);
        assert_eq!(session.cache_expire(), 300);

        session.set_module_name("files");
        assert_eq!(session.module_name(), "files");

        session.set_save_path("/tmp/sessions");
        assert_eq!(session.save_path(), "/tmp/sessions");

        let params = CookieParams {
            lifetime: 600,
            path: Some("/app".to_string()),
            domain: Some("example.com".to_string()),
            secure: Some(true),
            http_only: Some(false),
        };
        session.set_cookie_params(params.clone());
        assert_eq!(session.cookie_params(), params);
    }

    #[test]
    fn test_options_are_applied() {
        let session = Session::with_options(
            SessionOptions::new()
                .with_name("myapp")
                .with_cache_expire(60)
                .with_cookie_params(CookieOptions::default().with_secure(true)),
        );

        assert_eq!(session.name(), "myapp");
        assert_eq!(session.cache_expire(), 60);

        let cookie = session.cookie_params();
        assert_eq!(cookie.secure, Some(true));
        // Unset cookie fields keep the lifecycle defaults.
        assert_eq!(cookie.path.as_deref(), Some("/"));
    }

    #[test]
    fn test_empty_id_option_is_not_applied() {
        let lifecycle = Arc::new(RuntimeLifecycle::new());
        lifecycle.set_id("preset");

        let session =
            Session::with_lifecycle(lifecycle, SessionOptions::new().with_id(""));
        assert_eq!(session.id(), "preset");
    }

    #[test]
    fn test_status_projections() {
        let session = Session::new();
        assert_eq!(session.status(), SessionStatus::None);
        assert!(session.has_none());
        assert!(!session.is_active());
        assert!(!session.is_disabled());

        session.start();
        assert!(session.is_active());

        let disabled =
            Session::with_lifecycle(Arc::new(RuntimeLifecycle::disabled()), SessionOptions::new());
        assert!(disabled.is_disabled());
    }

    #[test]
    fn test_is_referenced() {
        let lifecycle = Arc::new(RuntimeLifecycle::new());
        let session = Session::with_lifecycle(lifecycle.clone(), SessionOptions::new());

        assert!(!session.is_referenced());

        lifecycle.set_request_cookie(session.name(), "".to_string());
        assert!(!session.is_referenced());

        lifecycle.set_request_cookie(session.name(), "sid-abc".to_string());
        assert!(session.is_referenced());
        // A pure read of request state: the session was never started.
        assert!(session.has_none());
    }

    #[test]
    fn test_token_stability_and_verification() {
        let session = Session::new();

        let t1 = session.token();
        let t2 = session.token();
        assert!(!t1.is_empty());
        assert_eq!(t1, t2);

        assert!(session.verify_token(&t1));
        assert!(!session.verify_token("garbage"));
    }

    #[test]
    fn test_verify_token_never_fabricates() {
        let session = Session::new();

        assert!(!session.verify_token("anything"));
        assert!(!session.exists(TOKEN_NAME));
    }

    #[test]
    fn test_regenerate_replaces_token_and_id() {
        let session = Session::new();

        let old_token = session.token();
        let old_id = {
            session.start_or_reuse();
            session.id()
        };

        assert!(session.regenerate());
        assert_ne!(session.id(), old_id);

        let new_token = session.token();
        assert_ne!(new_token, old_token);
        assert!(!session.verify_token(&old_token));
        assert!(session.verify_token(&new_token));
    }

    #[test]
    fn test_handles_never_start_the_session() {
        let session = Session::new();

        let segments = session.segments();
        let segment = segments.get("cart");
        let _ = segment.flash();
        let _ = session.flash();

        assert!(session.has_none());
    }

    #[test]
    fn test_segments_are_identity_stable() {
        let session = Session::new();

        session.segments().get("cart").set("items", 2);
        assert_eq!(session.segments().get("cart").get::<i32>("items"), Some(2));
        assert_eq!(session.segments().len(), 1);
    }

    #[test]
    fn test_clear() {
        let session = Session::new();

        session.set("a", 1);
        session.set("b", 2);
        session.clear();

        assert!(!session.exists("a"));
        assert!(!session.exists("b"));
        assert!(session.reference().is_empty());
    }

    #[test]
    fn test_start_is_idempotent() {
        let session = Session::new();

        assert!(session.start());
        session.set("k", "v");
        assert!(!session.start());
        assert_eq!(session.get::<String>("k").as_deref(), Some("v"));
    }

    #[test]
    fn test_forward_named() {
        let session = Session::new();
        session.start();
        session.set("k", "v");

        match session.forward_named("encode") {
            Ok(LifecycleOutcome::Encoded(Some(payload))) => {
                assert!(payload.contains("\"k\""));
            }
            other => panic!("unexpected outcome: {:?}", other),
        }

        assert_eq!(session.forward_named("commit"), Ok(LifecycleOutcome::Done));
        assert!(session.has_none());
    }

    #[test]
    fn test_forward_unknown_operation() {
        let session = Session::new();
        assert_eq!(
            session.forward_named("launch"),
            Err(SessionError::UnknownOperation("launch".to_string()))
        );
    }

    #[test]
    fn test_forward_ops_with_payloads() {
        let session = Session::new();
        session.start();

        assert_eq!(
            session.forward(LifecycleOp::Decode(r#"{"k":"v"}"#.to_string())),
            LifecycleOutcome::Applied(true)
        );
        assert_eq!(session.get::<String>("k").as_deref(), Some("v"));

        assert_eq!(
            session.forward(LifecycleOp::RegenerateId { delete_old: false }),
            LifecycleOutcome::Applied(true)
        );
    }

    #[test]
    fn test_commit_then_restart_keeps_data() {
        let session = Session::new();

        session.set("user", "alice");
        session.commit();
        assert!(session.has_none());

        // Data access restarts the session and reuses the store.
        assert_eq!(session.get::<String>("user").as_deref(), Some("alice"));
        assert!(session.is_active());
    }
}
