//! Storage backend trait

/// Contract for session persistence backends.
///
/// Follows the classic open/read/write/destroy/close/gc handler shape.
/// Payloads are opaque encoded strings keyed by session identifier;
/// serialization is the caller's concern.
pub trait StorageBackend: Send + Sync + 'static {
    /// Prepare the backend for the given save path and session name.
    fn open(&self, save_path: &str, name: &str) -> bool;

    /// Read the payload stored under `id`.
    ///
    /// Returns `None` if nothing is stored
    fn read(&self, id: &str) -> Option<String>;

    /// Persist `data` under `id`.
    fn write(&self, id: &str, data: &str) -> bool;

    /// Delete the payload stored under `id`.
    fn destroy(&self, id: &str) -> bool;

    /// Release any resources held by the backend.
    fn close(&self) -> bool;

    /// Expire entries older than `max_lifetime` seconds.
    fn garbage_collect(&self, max_lifetime: u64) -> bool;
}
