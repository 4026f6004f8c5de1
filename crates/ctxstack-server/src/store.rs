//! In-memory context store.
//!
//! The store maps a context key to a LIFO stack of opaque JSON entries. It is
//! the only stateful component of the server: one instance is created at
//! startup and shared by every request handler through an `Arc`.
//!
//! # Concurrency
//!
//! A single `RwLock` guards the whole mapping. Mutations (push, pop, clear)
//! take the write lock, reads (list, get) take the read lock. No operation
//! awaits or performs I/O while holding it, so the lock is never held for
//! longer than one `Vec`/`HashMap` operation plus a clone of the returned data.
//!
//! # Empty stacks
//!
//! A key whose stack becomes empty is removed from the mapping. `list_contexts`
//! therefore reports exactly the keys holding at least one entry, and a key
//! that was emptied is indistinguishable from one that was never used.
//!
//! # Example
//!
//! ```
//! use ctxstack_server::ContextStore;
//! use serde_json::json;
//!
//! let store = ContextStore::new();
//! let pushed = store.push_context("s1", json!({"a": 1})).unwrap();
//! assert_eq!(pushed.index, 1);
//!
//! let entry = store.pop_context("s1").unwrap();
//! assert_eq!(entry.context, json!({"a": 1}));
//! assert!(store.pop_context("s1").is_err());
//! ```

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use ctxstack_common::protocol::error::{CtxError, Result};
use serde::Serialize;
use serde_json::Value;

use crate::resource_limits::ResourceLimits;

/// One value on a context stack.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ContextEntry {
    /// Store-assigned identifier, `ctx_` followed by 8 hex characters
    pub context_id: String,
    /// The caller's value, never inspected by the store
    pub context: Value,
}

/// Result of a successful push.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PushOutcome {
    /// Stack size after the push (1-based position of the new entry)
    pub index: usize,
    pub context_id: String,
}

/// Point-in-time size of the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StoreStats {
    pub keys: usize,
    pub entries: usize,
}

#[derive(Debug)]
struct ContextStack {
    /// Sequence number of the push that created this stack; orders `list`
    first_use: u64,
    entries: Vec<ContextEntry>,
}

#[derive(Debug, Default)]
struct StoreInner {
    stacks: HashMap<String, ContextStack>,
    next_seq: u64,
}

/// Per-key LIFO stacks of opaque JSON entries.
#[derive(Debug)]
pub struct ContextStore {
    inner: RwLock<StoreInner>,
    limits: ResourceLimits,
}

impl Default for ContextStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ContextStore {
    /// Creates an empty store with default limits.
    pub fn new() -> Self {
        Self::with_limits(ResourceLimits::default())
    }

    /// Creates an empty store with the given limits.
    pub fn with_limits(limits: ResourceLimits) -> Self {
        Self {
            inner: RwLock::new(StoreInner::default()),
            limits,
        }
    }

    pub fn limits(&self) -> &ResourceLimits {
        &self.limits
    }

    // Every mutation is a single std collection call, so a panic elsewhere
    // cannot leave the map half-updated; recovering from poison is sound.
    fn read(&self) -> RwLockReadGuard<'_, StoreInner> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, StoreInner> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn validate_key(&self, key: &str) -> Result<()> {
        if key.is_empty() {
            return Err(CtxError::InvalidArgument("key parameter is required".into()));
        }
        if key.len() > self.limits.max_key_bytes {
            return Err(CtxError::InvalidArgument(format!(
                "key exceeds {} bytes",
                self.limits.max_key_bytes
            )));
        }
        Ok(())
    }

    fn validate_entry(&self, entry: &Value) -> Result<()> {
        if entry.is_null() {
            return Err(CtxError::InvalidArgument("context parameter is required".into()));
        }
        let size = serde_json::to_vec(entry)
            .map_err(|e| CtxError::InvalidArgument(format!("context is not serializable: {}", e)))?
            .len();
        if size > self.limits.max_entry_bytes {
            return Err(CtxError::InvalidArgument(format!(
                "context is {} bytes, limit is {} bytes",
                size, self.limits.max_entry_bytes
            )));
        }
        Ok(())
    }

    /// Pushes `entry` onto the stack for `key`, creating the stack if needed.
    ///
    /// # Errors
    ///
    /// `InvalidArgument` for an empty or oversized key, a `null` entry, or an
    /// entry larger than `max_entry_bytes`.
    pub fn push_context(&self, key: &str, entry: Value) -> Result<PushOutcome> {
        self.validate_key(key)?;
        self.validate_entry(&entry)?;

        let mut inner = self.write();
        let seq = inner.next_seq;
        let stack = inner
            .stacks
            .entry(key.to_string())
            .or_insert_with(|| ContextStack {
                first_use: seq,
                entries: Vec::new(),
            });

        let mut context_id = new_context_id();
        while stack.entries.iter().any(|e| e.context_id == context_id) {
            context_id = new_context_id();
        }

        stack.entries.push(ContextEntry {
            context_id: context_id.clone(),
            context: entry,
        });
        let index = stack.entries.len();
        inner.next_seq += 1;

        tracing::debug!(key, index, %context_id, "pushed context");
        Ok(PushOutcome { index, context_id })
    }

    /// Removes and returns the top entry of `key`'s stack.
    ///
    /// # Errors
    ///
    /// `NotFound` when the key holds no entries. The key is never created.
    pub fn pop_context(&self, key: &str) -> Result<ContextEntry> {
        let mut inner = self.write();
        let stack = inner
            .stacks
            .get_mut(key)
            .ok_or_else(|| CtxError::NotFound("No contexts to pop".into()))?;

        let entry = stack
            .entries
            .pop()
            .ok_or_else(|| CtxError::NotFound("No contexts to pop".into()))?;
        if stack.entries.is_empty() {
            inner.stacks.remove(key);
        }

        tracing::debug!(key, context_id = %entry.context_id, "popped context");
        Ok(entry)
    }

    /// Keys holding at least one entry, in order of first use.
    pub fn list_contexts(&self) -> Vec<String> {
        let inner = self.read();
        let mut keys: Vec<(u64, &String)> = inner
            .stacks
            .iter()
            .map(|(key, stack)| (stack.first_use, key))
            .collect();
        keys.sort_unstable_by_key(|(seq, _)| *seq);
        keys.into_iter().map(|(_, key)| key.clone()).collect()
    }

    /// The whole stack for `key`, bottom to top (push order).
    ///
    /// # Errors
    ///
    /// `NotFound` when the key holds no entries.
    pub fn get_context(&self, key: &str) -> Result<Vec<ContextEntry>> {
        self.read()
            .stacks
            .get(key)
            .map(|stack| stack.entries.clone())
            .ok_or_else(|| CtxError::NotFound(format!("No contexts found for key {}", key)))
    }

    /// A single entry of `key`'s stack, by context id.
    ///
    /// # Errors
    ///
    /// `NotFound` when the key or the id is unknown.
    pub fn get_context_entry(&self, key: &str, context_id: &str) -> Result<ContextEntry> {
        self.read()
            .stacks
            .get(key)
            .and_then(|stack| stack.entries.iter().find(|e| e.context_id == context_id))
            .cloned()
            .ok_or_else(|| {
                CtxError::NotFound(format!(
                    "Context with id {} not found for key {}",
                    context_id, key
                ))
            })
    }

    /// Removes the stack for `key`, or every stack when `key` is `None`.
    ///
    /// Idempotent. Returns the number of entries removed.
    pub fn clear_contexts(&self, key: Option<&str>) -> usize {
        let mut inner = self.write();
        let removed = match key {
            Some(key) => inner
                .stacks
                .remove(key)
                .map(|stack| stack.entries.len())
                .unwrap_or(0),
            None => inner
                .stacks
                .drain()
                .map(|(_, stack)| stack.entries.len())
                .sum(),
        };

        tracing::debug!(key = key.unwrap_or("*"), removed, "cleared contexts");
        removed
    }

    /// Number of keys and total number of entries.
    pub fn stats(&self) -> StoreStats {
        let inner = self.read();
        StoreStats {
            keys: inner.stacks.len(),
            entries: inner.stacks.values().map(|s| s.entries.len()).sum(),
        }
    }
}

fn new_context_id() -> String {
    let uuid = uuid::Uuid::new_v4().simple().to_string();
    format!("ctx_{}", &uuid[..8])
}
