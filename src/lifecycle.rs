//! Host session lifecycle
//!
//! The facade does not start, persist or destroy sessions itself; it
//! forwards those verbs to a [`SessionLifecycle`] implementation. On a
//! web platform that implementation wraps the platform's native session
//! facility. [`RuntimeLifecycle`] is the non-interactive implementation
//! for command line tools and tests: it keeps everything in memory and
//! persists through a [`StorageBackend`](crate::backend::StorageBackend).

use std::collections::HashMap;

use parking_lot::RwLock;
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::backend::{RuntimeBackend, StorageBackend};
use crate::config::CookieParams;
use crate::store::Store;

/// Current state of the session facility.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStatus {
    /// Sessions are unavailable
    Disabled,
    /// Sessions are enabled, but none exists
    None,
    /// Sessions are enabled, and one exists
    Active,
}

/// The fixed set of operations a session may forward to its lifecycle.
///
/// Anything outside this set is rejected at the type level; the
/// name-based path ([`Session::forward_named`](crate::Session::forward_named))
/// rejects unknown names with
/// [`SessionError::UnknownOperation`](crate::SessionError::UnknownOperation).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LifecycleOp {
    /// Discard session data changes and finish the session
    Abort,
    /// Write session data and end the session
    Commit,
    /// Replace session data from an encoded string
    Decode(String),
    /// Destroy all data registered to the session
    Destroy,
    /// Encode the current session data as a string
    Encode,
    /// Replace the current session identifier with a freshly generated one
    RegenerateId { delete_old: bool },
    /// Re-initialize session data with its original values
    Reset,
}

/// Result of a forwarded lifecycle operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LifecycleOutcome {
    /// The operation completed without producing a value
    Done,
    /// Whether the operation took effect (`Decode`, `RegenerateId`)
    Applied(bool),
    /// The encoded session payload (`Encode`), absent when no session is
    /// active
    Encoded(Option<String>),
}

/// The host platform's session facility, consumed by
/// [`Session`](crate::Session).
///
/// The facility owns the request-scoped [`Store`] and hands it out via
/// [`SessionLifecycle::store`]; the facade only views it. Attribute
/// accessors read and write the facility's current configuration, and are
/// meaningful before the session becomes active. `request_cookie` reads
/// incoming request state and must not start a session.
pub trait SessionLifecycle: Send + Sync {
    /// The store this facility manages.
    fn store(&self) -> Store;

    fn id(&self) -> String;
    fn set_id(&self, id: &str);

    fn name(&self) -> String;
    fn set_name(&self, name: &str);

    fn cache_limiter(&self) -> String;
    fn set_cache_limiter(&self, cache_limiter: &str);

    fn cache_expire(&self) -> u32;
    fn set_cache_expire(&self, cache_expire: u32);

    fn module_name(&self) -> String;
    fn set_module_name(&self, module_name: &str);

    fn save_path(&self) -> String;
    fn set_save_path(&self, save_path: &str);

    fn cookie_params(&self) -> CookieParams;
    fn set_cookie_params(&self, params: CookieParams);

    fn status(&self) -> SessionStatus;

    /// Establish the session. Returns whether a new store was created;
    /// an existing store is reused, never reset.
    fn start(&self) -> bool;

    /// Replace the session identifier with a freshly generated one.
    /// `delete_old` also removes data persisted under the old identifier.
    fn regenerate_id(&self, delete_old: bool) -> bool;

    /// Discard session data changes and finish the session.
    fn abort(&self);

    /// Write session data and end the session.
    fn commit(&self);

    /// Destroy all data registered to the session.
    fn destroy(&self);

    /// Encode the current session data; `None` when no session is active.
    fn encode(&self) -> Option<String>;

    /// Replace session data from an encoded string; `false` when no
    /// session is active or the payload does not parse.
    fn decode(&self, data: &str) -> bool;

    /// Re-initialize session data with its original values.
    fn reset(&self);

    /// Value of the named cookie on the incoming request, if any.
    fn request_cookie(&self, name: &str) -> Option<String>;
}

fn generate_session_id() -> String {
    Uuid::new_v4().to_string()
}

fn parse_payload(payload: &str) -> Option<Map<String, Value>> {
    serde_json::from_str(payload).ok()
}

struct RuntimeState {
    id: String,
    name: String,
    cache_limiter: String,
    cache_expire: u32,
    module_name: String,
    save_path: String,
    cookie_params: CookieParams,
    status: SessionStatus,
    cookies: HashMap<String, String>,
    backend: Box<dyn StorageBackend>,
}

/// Session lifecycle for non-interactive execution contexts.
///
/// Keeps the session attributes, status and request cookies in memory
/// and persists encoded session data through a storage backend, so the
/// full session surface works from command line tools and tests without
/// any platform session facility.
pub struct RuntimeLifecycle {
    store: Store,
    state: RwLock<RuntimeState>,
}

impl RuntimeLifecycle {
    /// Lifecycle persisting through a fresh in-memory backend.
    pub fn new() -> Self {
        Self::with_backend(RuntimeBackend::new())
    }

    /// Lifecycle persisting through the given backend.
    pub fn with_backend(backend: impl StorageBackend) -> Self {
        Self::build(Box::new(backend), SessionStatus::None)
    }

    /// Lifecycle reporting sessions as unavailable.
    pub fn disabled() -> Self {
        Self::build(Box::new(RuntimeBackend::new()), SessionStatus::Disabled)
    }

    fn build(backend: Box<dyn StorageBackend>, status: SessionStatus) -> Self {
        Self {
            store: Store::new(),
            state: RwLock::new(RuntimeState {
                id: String::new(),
                name: "SESSID".to_string(),
                cache_limiter: "nocache".to_string(),
                cache_expire: 180,
                module_name: "files".to_string(),
                save_path: String::new(),
                cookie_params: CookieParams {
                    lifetime: 0,
                    path: Some("/".to_string()),
                    domain: None,
                    secure: Some(false),
                    http_only: Some(true),
                },
                status,
                cookies: HashMap::new(),
                backend,
            }),
        }
    }

    /// Record a cookie as present on the incoming request.
    pub fn set_request_cookie<N: Into<String>, V: Into<String>>(&self, name: N, value: V) {
        self.state
            .write()
            .cookies
            .insert(name.into(), value.into());
    }

    /// Drop a cookie from the incoming request state.
    pub fn remove_request_cookie(&self, name: &str) {
        self.state.write().cookies.remove(name);
    }

    fn restore_from_backend(&self, state: &RuntimeState) {
        let restored = state
            .backend
            .read(&state.id)
            .and_then(|payload| parse_payload(&payload))
            .unwrap_or_default();
        self.store.replace(restored);
    }
}

impl Default for RuntimeLifecycle {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionLifecycle for RuntimeLifecycle {
    fn store(&self) -> Store {
        self.store.clone()
    }

    fn id(&self) -> String {
        self.state.read().id.clone()
    }

    fn set_id(&self, id: &str) {
        self.state.write().id = id.to_owned();
    }

    fn name(&self) -> String {
        self.state.read().name.clone()
    }

    fn set_name(&self, name: &str) {
        self.state.write().name = name.to_owned();
    }

    fn cache_limiter(&self) -> String {
        self.state.read().cache_limiter.clone()
    }

    fn set_cache_limiter(&self, cache_limiter: &str) {
        self.state.write().cache_limiter = cache_limiter.to_owned();
    }

    fn cache_expire(&self) -> u32 {
        self.state.read().cache_expire
    }

    fn set_cache_expire(&self, cache_expire: u32) {
        self.state.write().cache_expire = cache_expire;
    }

    fn module_name(&self) -> String {
        self.state.read().module_name.clone()
    }

    fn set_module_name(&self, module_name: &str) {
        self.state.write().module_name = module_name.to_owned();
    }

    fn save_path(&self) -> String {
        self.state.read().save_path.clone()
    }

    fn set_save_path(&self, save_path: &str) {
        self.state.write().save_path = save_path.to_owned();
    }

    fn cookie_params(&self) -> CookieParams {
        self.state.read().cookie_params.clone()
    }

    fn set_cookie_params(&self, params: CookieParams) {
        self.state.write().cookie_params = params;
    }

    fn status(&self) -> SessionStatus {
        self.state.read().status
    }

    fn start(&self) -> bool {
        let mut state = self.state.write();
        if state.status == SessionStatus::Disabled {
            return false;
        }

        let mut created = false;
        if !self.store.is_initialized() {
            state.backend.open(&state.save_path, &state.name);
            if state.id.is_empty() {
                state.id = generate_session_id();
            }
            let initial = state
                .backend
                .read(&state.id)
                .and_then(|payload| parse_payload(&payload))
                .unwrap_or_default();
            created = self.store.initialize(initial).is_ok();
            tracing::debug!("Started session {}", state.id);
        }
        state.status = SessionStatus::Active;
        created
    }

    fn regenerate_id(&self, delete_old: bool) -> bool {
        let mut state = self.state.write();
        if state.status != SessionStatus::Active {
            return false;
        }

        let old = std::mem::replace(&mut state.id, generate_session_id());
        if delete_old {
            state.backend.destroy(&old);
        }
        tracing::debug!("Regenerated session id {} -> {}", old, state.id);
        true
    }

    fn abort(&self) {
        let mut state = self.state.write();
        if state.status != SessionStatus::Active {
            return;
        }

        self.restore_from_backend(&state);
        state.backend.close();
        state.status = SessionStatus::None;
    }

    fn commit(&self) {
        let mut state = self.state.write();
        if state.status != SessionStatus::Active {
            return;
        }

        match serde_json::to_string(&self.store.snapshot()) {
            Ok(payload) => {
                if !state.backend.write(&state.id, &payload) {
                    tracing::error!("Failed to persist session {}", state.id);
                }
            }
            Err(e) => tracing::error!("Failed to serialize session data: {}", e),
        }
        state.backend.close();
        state.status = SessionStatus::None;
    }

    fn destroy(&self) {
        let mut state = self.state.write();
        if state.status != SessionStatus::Active {
            return;
        }

        self.store.replace(Map::new());
        state.backend.destroy(&state.id);
        state.status = SessionStatus::None;
    }

    fn encode(&self) -> Option<String> {
        let state = self.state.read();
        if state.status != SessionStatus::Active {
            return None;
        }
        serde_json::to_string(&self.store.snapshot()).ok()
    }

    fn decode(&self, data: &str) -> bool {
        let state = self.state.read();
        if state.status != SessionStatus::Active {
            return false;
        }
        match parse_payload(data) {
            Some(map) => {
                self.store.replace(map);
                true
            }
            None => false,
        }
    }

    fn reset(&self) {
        let state = self.state.read();
        if state.status != SessionStatus::Active {
            return;
        }
        self.restore_from_backend(&state);
    }

    fn request_cookie(&self, name: &str) -> Option<String> {
        self.state.read().cookies.get(name).cloned()
    }
}
