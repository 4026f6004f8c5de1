//! Function router for the context server
//!
//! This module maps a function name plus JSON parameters onto one
//! [`ContextStore`] call and encodes the result as a JSON value. Both the
//! per-operation HTTP routes and the `/mcp/{function}` dispatch route end up
//! in [`ContextRouter::handle`], so the two surfaces can never disagree.
//!
//! # Parameters
//!
//! Parameters are decoded with serde. The context key is read from `key`, or
//! from `user_id` for callers written against the older API. A missing key
//! decodes as empty and is rejected as `InvalidArgument`. `list_contexts`
//! and `clear_contexts` read a missing key as "every key", but an empty one
//! is still rejected.
//!
//! # Example
//!
//! ```
//! use ctxstack_server::{ContextRouter, ContextStore};
//! use serde_json::json;
//! use std::sync::Arc;
//!
//! let router = ContextRouter::new(Arc::new(ContextStore::new()));
//! let pushed = router
//!     .handle("push_context", json!({"key": "s1", "context": {"a": 1}}))
//!     .unwrap();
//! assert_eq!(pushed["index"], 1);
//! assert_eq!(pushed["success"], true);
//! ```

use std::sync::Arc;
use std::time::Instant;

use ctxstack_common::protocol::catalog;
use ctxstack_common::protocol::error::{CtxError, Result};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::store::ContextStore;

#[derive(Debug, Deserialize)]
struct PushParams {
    #[serde(default, alias = "user_id")]
    key: String,
    #[serde(default)]
    context: Value,
}

#[derive(Debug, Deserialize)]
struct KeyParams {
    #[serde(default, alias = "user_id")]
    key: String,
}

#[derive(Debug, Deserialize)]
struct OptionalKeyParams {
    #[serde(default, alias = "user_id")]
    key: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GetParams {
    #[serde(default, alias = "user_id")]
    key: String,
    #[serde(default)]
    context_id: Option<String>,
}

/// Routes context functions to the store.
pub struct ContextRouter {
    store: Arc<ContextStore>,
    started_at: Instant,
}

impl ContextRouter {
    /// Creates a router over a shared store.
    ///
    /// # Arguments
    ///
    /// * `store` - The store every request operates on
    pub fn new(store: Arc<ContextStore>) -> Self {
        Self {
            store,
            started_at: Instant::now(),
        }
    }

    pub fn store(&self) -> &Arc<ContextStore> {
        &self.store
    }

    /// Handles one function call.
    ///
    /// # Arguments
    ///
    /// * `function_name` - One of the five catalog functions
    /// * `params` - The call's parameters as a JSON object
    ///
    /// # Returns
    ///
    /// The JSON result body, or a `CtxError` whose
    /// [`status_code`](CtxError::status_code) gives the HTTP status.
    pub fn handle(&self, function_name: &str, params: Value) -> Result<Value> {
        tracing::debug!(function = function_name, "handling context function");

        match function_name {
            "push_context" => {
                let p: PushParams = decode(function_name, params)?;
                let pushed = self.store.push_context(&p.key, p.context)?;
                Ok(json!({
                    "index": pushed.index,
                    "context_id": pushed.context_id,
                    "success": true,
                }))
            }
            "pop_context" => {
                let p: KeyParams = decode(function_name, params)?;
                require_key(&p.key)?;
                let entry = self.store.pop_context(&p.key)?;
                Ok(json!({
                    "context_id": entry.context_id,
                    "context": entry.context,
                    "success": true,
                }))
            }
            "list_contexts" => {
                let p: OptionalKeyParams = decode(function_name, params)?;
                match optional_key(p.key)? {
                    // Per-key listing; an unknown key simply has no contexts.
                    Some(key) => {
                        let contexts = self.store.get_context(&key).unwrap_or_default();
                        Ok(json!({ "contexts": contexts }))
                    }
                    None => Ok(json!(self.store.list_contexts())),
                }
            }
            "get_context" => {
                let p: GetParams = decode(function_name, params)?;
                require_key(&p.key)?;
                match p.context_id.filter(|id| !id.is_empty()) {
                    Some(context_id) => {
                        let entry = self.store.get_context_entry(&p.key, &context_id)?;
                        Ok(json!({
                            "context_id": entry.context_id,
                            "context": entry.context,
                            "success": true,
                        }))
                    }
                    None => {
                        let entries: Vec<Value> = self
                            .store
                            .get_context(&p.key)?
                            .into_iter()
                            .map(|e| e.context)
                            .collect();
                        Ok(Value::Array(entries))
                    }
                }
            }
            "clear_contexts" => {
                let p: OptionalKeyParams = decode(function_name, params)?;
                let key = optional_key(p.key)?;
                let removed = self.store.clear_contexts(key.as_deref());
                Ok(json!({ "ok": true, "removed": removed }))
            }
            other => Err(CtxError::NotFound(format!(
                "Function {} not supported",
                other
            ))),
        }
    }

    /// Server information served at `/`.
    pub fn info(&self) -> Value {
        let stats = self.store.stats();
        json!({
            "name": "ctxstack context server",
            "version": env!("CARGO_PKG_VERSION"),
            "description": "Per-key LIFO context stacks over HTTP",
            "functions": catalog::function_names(),
            "documentation": "/openapi.json",
            "uptime_ms": self.started_at.elapsed().as_millis() as u64,
            "store": stats,
        })
    }
}

fn decode<T: DeserializeOwned>(function_name: &str, params: Value) -> Result<T> {
    // A JSON `null` body carries no parameters at all.
    let params = if params.is_null() { json!({}) } else { params };
    serde_json::from_value(params).map_err(|e| {
        CtxError::InvalidArgument(format!("Invalid parameters for {}: {}", function_name, e))
    })
}

fn require_key(key: &str) -> Result<()> {
    if key.is_empty() {
        return Err(CtxError::InvalidArgument("key parameter is required".into()));
    }
    Ok(())
}

/// An absent key means "every key"; a key that is present must not be empty.
fn optional_key(key: Option<String>) -> Result<Option<String>> {
    if let Some(key) = &key {
        require_key(key)?;
    }
    Ok(key)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn router() -> ContextRouter {
        ContextRouter::new(Arc::new(ContextStore::new()))
    }

    #[test]
    fn test_push_then_pop() {
        let router = router();
        let pushed = router
            .handle("push_context", json!({"key": "s1", "context": {"a": 1}}))
            .unwrap();
        assert_eq!(pushed["index"], 1);
        assert!(pushed["context_id"].as_str().unwrap().starts_with("ctx_"));

        let popped = router.handle("pop_context", json!({"key": "s1"})).unwrap();
        assert_eq!(popped["context"], json!({"a": 1}));
        assert_eq!(popped["context_id"], pushed["context_id"]);
        assert_eq!(popped["success"], true);
    }

    #[test]
    fn test_user_id_alias() {
        let router = router();
        router
            .handle("push_context", json!({"user_id": "u1", "context": "x"}))
            .unwrap();
        let stack = router.handle("get_context", json!({"key": "u1"})).unwrap();
        assert_eq!(stack, json!(["x"]));
    }

    #[test]
    fn test_push_missing_context_is_invalid() {
        let err = router()
            .handle("push_context", json!({"key": "s1"}))
            .unwrap_err();
        assert!(matches!(err, CtxError::InvalidArgument(_)));
    }

    #[test]
    fn test_pop_missing_key_is_invalid() {
        let err = router().handle("pop_context", json!({})).unwrap_err();
        assert_eq!(err.to_string(), "key parameter is required");
    }

    #[test]
    fn test_pop_empty_is_not_found() {
        let err = router().handle("pop_context", json!({"key": "nobody"})).unwrap_err();
        assert!(matches!(err, CtxError::NotFound(_)));
        assert_eq!(err.to_string(), "No contexts to pop");
    }

    #[test]
    fn test_wrong_param_type_is_invalid() {
        let err = router()
            .handle("pop_context", json!({"key": 42}))
            .unwrap_err();
        assert!(matches!(err, CtxError::InvalidArgument(_)));
    }

    #[test]
    fn test_list_keys_and_per_key() {
        let router = router();
        router.handle("push_context", json!({"key": "b", "context": 1})).unwrap();
        router.handle("push_context", json!({"key": "a", "context": 2})).unwrap();

        assert_eq!(router.handle("list_contexts", json!({})).unwrap(), json!(["b", "a"]));

        let per_key = router.handle("list_contexts", json!({"key": "a"})).unwrap();
        let contexts = per_key["contexts"].as_array().unwrap();
        assert_eq!(contexts.len(), 1);
        assert_eq!(contexts[0]["context"], 2);

        let unknown = router.handle("list_contexts", json!({"key": "zzz"})).unwrap();
        assert_eq!(unknown, json!({"contexts": []}));
    }

    #[test]
    fn test_get_by_context_id() {
        let router = router();
        let pushed = router
            .handle("push_context", json!({"key": "k", "context": {"q": 1}}))
            .unwrap();

        let got = router
            .handle(
                "get_context",
                json!({"key": "k", "context_id": pushed["context_id"]}),
            )
            .unwrap();
        assert_eq!(got["context"], json!({"q": 1}));

        let err = router
            .handle("get_context", json!({"key": "k", "context_id": "ctx_missing"}))
            .unwrap_err();
        assert!(matches!(err, CtxError::NotFound(_)));
    }

    #[test]
    fn test_clear_with_and_without_key() {
        let router = router();
        router.handle("push_context", json!({"key": "a", "context": 1})).unwrap();
        router.handle("push_context", json!({"key": "b", "context": 2})).unwrap();

        let cleared = router.handle("clear_contexts", json!({"key": "a"})).unwrap();
        assert_eq!(cleared, json!({"ok": true, "removed": 1}));

        let cleared = router.handle("clear_contexts", Value::Null).unwrap();
        assert_eq!(cleared["removed"], 1);
        assert_eq!(router.handle("list_contexts", json!({})).unwrap(), json!([]));
    }

    #[test]
    fn test_clear_with_empty_key_keeps_every_stack() {
        let router = router();
        router.handle("push_context", json!({"key": "alice", "context": 1})).unwrap();
        router.handle("push_context", json!({"key": "bob", "context": 2})).unwrap();

        for params in [json!({"key": ""}), json!({"user_id": ""})] {
            let err = router.handle("clear_contexts", params).unwrap_err();
            assert!(matches!(err, CtxError::InvalidArgument(_)));
            assert_eq!(err.to_string(), "key parameter is required");
        }

        assert_eq!(
            router.handle("list_contexts", json!({})).unwrap(),
            json!(["alice", "bob"])
        );
        assert_eq!(router.store().stats().entries, 2);
    }

    #[test]
    fn test_list_with_empty_key_is_invalid() {
        let router = router();
        router.handle("push_context", json!({"key": "a", "context": 1})).unwrap();

        let err = router.handle("list_contexts", json!({"key": ""})).unwrap_err();
        assert!(matches!(err, CtxError::InvalidArgument(_)));

        // Absent key still lists every key.
        assert_eq!(router.handle("list_contexts", json!({})).unwrap(), json!(["a"]));
    }

    #[test]
    fn test_unknown_function() {
        let err = router().handle("drop_context", json!({})).unwrap_err();
        assert!(matches!(err, CtxError::NotFound(_)));
        assert_eq!(err.to_string(), "Function drop_context not supported");
    }

    #[test]
    fn test_info() {
        let router = router();
        router.handle("push_context", json!({"key": "a", "context": 1})).unwrap();

        let info = router.info();
        assert_eq!(info["functions"].as_array().unwrap().len(), 5);
        assert_eq!(info["documentation"], "/openapi.json");
        assert_eq!(info["store"]["keys"], 1);
        assert_eq!(info["store"]["entries"], 1);
    }
}
