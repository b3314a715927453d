//! Session configuration

use serde::{Deserialize, Serialize};

use crate::lifecycle::SessionLifecycle;

/// Session cookie parameters as reported by the host lifecycle.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CookieParams {
    /// Cookie lifetime in seconds; `0` means until the browser closes.
    pub lifetime: i64,

    /// Cookie path
    pub path: Option<String>,

    /// Cookie domain
    pub domain: Option<String>,

    /// Secure flag
    pub secure: Option<bool>,

    /// HttpOnly flag
    pub http_only: Option<bool>,
}

impl Default for CookieParams {
    fn default() -> Self {
        Self {
            lifetime: 0,
            path: None,
            domain: None,
            secure: None,
            http_only: None,
        }
    }
}

/// Partial cookie parameter overrides, merged field-wise over the host
/// lifecycle's current parameters.
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
pub struct CookieOptions {
    #[serde(default)]
    pub lifetime: Option<i64>,

    #[serde(default)]
    pub path: Option<String>,

    #[serde(default)]
    pub domain: Option<String>,

    #[serde(default)]
    pub secure: Option<bool>,

    #[serde(default, alias = "httponly")]
    pub http_only: Option<bool>,
}

impl CookieOptions {
    /// Set the cookie lifetime in seconds
    pub fn with_lifetime(mut self, lifetime: i64) -> Self {
        self.lifetime = Some(lifetime);
        self
    }

    /// Set the cookie path
    pub fn with_path<S: Into<String>>(mut self, path: S) -> Self {
        self.path = Some(path.into());
        self
    }

    /// Set the cookie domain
    pub fn with_domain<S: Into<String>>(mut self, domain: S) -> Self {
        self.domain = Some(domain.into());
        self
    }

    /// Set the Secure flag
    pub fn with_secure(mut self, secure: bool) -> Self {
        self.secure = Some(secure);
        self
    }

    /// Set the HttpOnly flag
    pub fn with_http_only(mut self, http_only: bool) -> Self {
        self.http_only = Some(http_only);
        self
    }

    /// Merge these overrides over `defaults`, field by field.
    pub fn merge_over(self, defaults: CookieParams) -> CookieParams {
        CookieParams {
            lifetime: self.lifetime.unwrap_or(defaults.lifetime),
            path: self.path.or(defaults.path),
            domain: self.domain.or(defaults.domain),
            secure: self.secure.or(defaults.secure),
            http_only: self.http_only.or(defaults.http_only),
        }
    }
}

/// Options accepted when constructing a session.
///
/// Every field is optional; unset fields fall back to the host
/// lifecycle's current values, read once at normalization time. When
/// deserialized from a configuration record, unrecognized keys are
/// silently ignored.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct SessionOptions {
    /// Session identifier. Empty or absent leaves identifier generation
    /// to the lifecycle on start.
    #[serde(default)]
    pub id: Option<String>,

    /// Session (cookie) name
    #[serde(default)]
    pub name: Option<String>,

    /// Cache limiter directive
    #[serde(default)]
    pub cache_limiter: Option<String>,

    /// Cache expiry in minutes
    #[serde(default)]
    pub cache_expire: Option<u32>,

    /// Storage module selection
    #[serde(default)]
    pub module_name: Option<String>,

    /// Save path handed to the storage backend
    #[serde(default)]
    pub save_path: Option<String>,

    /// Cookie parameter overrides
    #[serde(default)]
    pub cookie_params: Option<CookieOptions>,
}

impl SessionOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the session identifier
    pub fn with_id<S: Into<String>>(mut self, id: S) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Set the session name
    pub fn with_name<S: Into<String>>(mut self, name: S) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Set the cache limiter directive
    pub fn with_cache_limiter<S: Into<String>>(mut self, cache_limiter: S) -> Self {
        self.cache_limiter = Some(cache_limiter.into());
        self
    }

    /// Set the cache expiry in minutes
    pub fn with_cache_expire(mut self, cache_expire: u32) -> Self {
        self.cache_expire = Some(cache_expire);
        self
    }

    /// Set the storage module name
    pub fn with_module_name<S: Into<String>>(mut self, module_name: S) -> Self {
        self.module_name = Some(module_name.into());
        self
    }

    /// Set the save path
    pub fn with_save_path<S: Into<String>>(mut self, save_path: S) -> Self {
        self.save_path = Some(save_path.into());
        self
    }

    /// Set cookie parameter overrides
    pub fn with_cookie_params(mut self, cookie_params: CookieOptions) -> Self {
        self.cookie_params = Some(cookie_params);
        self
    }

    /// Fill unset fields from the lifecycle's current values and drop an
    /// empty identifier so it is never forced onto the lifecycle.
    pub(crate) fn normalize(self, lifecycle: &dyn SessionLifecycle) -> NormalizedOptions {
        let cookie_defaults = lifecycle.cookie_params();

        NormalizedOptions {
            id: self.id.filter(|id| !id.is_empty()),
            name: self.name.unwrap_or_else(|| lifecycle.name()),
            cache_limiter: self
                .cache_limiter
                .unwrap_or_else(|| lifecycle.cache_limiter()),
            cache_expire: self.cache_expire.unwrap_or_else(|| lifecycle.cache_expire()),
            module_name: self.module_name.unwrap_or_else(|| lifecycle.module_name()),
            save_path: self.save_path.unwrap_or_else(|| lifecycle.save_path()),
            cookie_params: match self.cookie_params {
                Some(overrides) => overrides.merge_over(cookie_defaults),
                None => cookie_defaults,
            },
        }
    }
}

/// A fully resolved option set, ready to apply through the session's
/// attribute setters.
pub(crate) struct NormalizedOptions {
    pub(crate) id: Option<String>,
    pub(crate) name: String,
    pub(crate) cache_limiter: String,
    pub(crate) cache_expire: u32,
    pub(crate) module_name: String,
    pub(crate) save_path: String,
    pub(crate) cookie_params: CookieParams,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lifecycle::RuntimeLifecycle;
    use serde_json::json;

    #[test]
    fn test_unknown_keys_are_ignored() {
        let options: SessionOptions = serde_json::from_value(json!({
            "name": "myapp",
            "not_an_option": 42,
            "neither_is_this": { "nested": true }
        }))
        .unwrap();

        assert_eq!(options.name.as_deref(), Some("myapp"));
        assert_eq!(options.id, None);
    }

    #[test]
    fn test_cookie_options_accept_httponly_alias() {
        let options: CookieOptions =
            serde_json::from_value(json!({ "httponly": false, "lifetime": 300 })).unwrap();

        assert_eq!(options.http_only, Some(false));
        assert_eq!(options.lifetime, Some(300));
    }

    #[test]
    fn test_cookie_merge_is_field_wise() {
        let defaults = CookieParams {
            lifetime: 0,
            path: Some("/".to_string()),
            domain: None,
            secure: Some(false),
            http_only: Some(true),
        };

        let merged = CookieOptions::default()
            .with_lifetime(600)
            .with_domain("example.com")
            .merge_over(defaults);

        assert_eq!(merged.lifetime, 600);
        assert_eq!(merged.path.as_deref(), Some("/"));
        assert_eq!(merged.domain.as_deref(), Some("example.com"));
        assert_eq!(merged.secure, Some(false));
        assert_eq!(merged.http_only, Some(true));
    }

    #[test]
    fn test_normalize_fills_defaults_from_lifecycle() {
        let lifecycle = RuntimeLifecycle::new();
        let normalized = SessionOptions::new()
            .with_name("myapp")
            .normalize(&lifecycle);

        assert_eq!(normalized.name, "myapp");
        assert_eq!(normalized.cache_limiter, lifecycle.cache_limiter());
        assert_eq!(normalized.cache_expire, lifecycle.cache_expire());
        assert_eq!(normalized.module_name, lifecycle.module_name());
        assert_eq!(normalized.cookie_params, lifecycle.cookie_params());
    }

    #[test]
    fn test_normalize_drops_empty_id() {
        let lifecycle = RuntimeLifecycle::new();

        let normalized = SessionOptions::new().with_id("").normalize(&lifecycle);
        assert_eq!(normalized.id, None);

        let normalized = SessionOptions::new().with_id("abc123").normalize(&lifecycle);
        assert_eq!(normalized.id.as_deref(), Some("abc123"));
    }
}
