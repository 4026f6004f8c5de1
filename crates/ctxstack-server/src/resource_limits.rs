//! Resource limits for the context store.
//!
//! Entries are opaque to the store, so the only protection against a caller
//! filling memory is a cap on what a single request may carry.

/// Resource limits for the context server.
///
/// # Fields
///
/// - `max_key_bytes` - Longest accepted context key (default: 256 bytes)
/// - `max_entry_bytes` - Largest accepted entry, measured as serialized JSON
///   (default: 1 MiB)
/// - `max_body_bytes` - Largest accepted HTTP request body (default: 2 MiB)
///
/// # Example
///
/// ```
/// use ctxstack_server::ResourceLimits;
///
/// let limits = ResourceLimits::new().with_max_entry_bytes(64 * 1024);
/// assert_eq!(limits.max_entry_bytes, 64 * 1024);
/// assert_eq!(limits.max_key_bytes, 256);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct ResourceLimits {
    pub max_key_bytes: usize,
    pub max_entry_bytes: usize,
    pub max_body_bytes: usize,
}

impl Default for ResourceLimits {
    fn default() -> Self {
        Self {
            max_key_bytes: 256,
            max_entry_bytes: 1024 * 1024,
            max_body_bytes: 2 * 1024 * 1024,
        }
    }
}

impl ResourceLimits {
    /// Creates limits with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the maximum key length in bytes.
    pub fn with_max_key_bytes(mut self, bytes: usize) -> Self {
        self.max_key_bytes = bytes;
        self
    }

    /// Sets the maximum serialized entry size in bytes.
    pub fn with_max_entry_bytes(mut self, bytes: usize) -> Self {
        self.max_entry_bytes = bytes;
        self
    }

    /// Sets the maximum HTTP request body size in bytes.
    ///
    /// See [`effective_body_limit`](Self::effective_body_limit) for the value
    /// the HTTP layer enforces.
    pub fn with_max_body_bytes(mut self, bytes: usize) -> Self {
        self.max_body_bytes = bytes;
        self
    }

    /// Body limit actually enforced by the HTTP layer.
    ///
    /// Never below what a maximal entry needs, otherwise such an entry could
    /// not be pushed at all.
    pub fn effective_body_limit(&self) -> usize {
        // Leave room for the key and the JSON envelope around the entry.
        self.max_body_bytes
            .max(
            self.max_entry_bytes
                .saturating_add(self.max_key_bytes)
                .saturating_add(1024),
        )
    }
}
