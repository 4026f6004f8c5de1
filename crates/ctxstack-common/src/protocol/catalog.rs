//! Context Function Catalog
//!
//! Static descriptions of the five context operations. The catalog is the
//! single source for everything that documents the API: the OpenAPI document
//! served by both services, the server's `/` info endpoint and the relay's
//! HTML landing page.
//!
//! # Example
//!
//! ```
//! use ctxstack_common::protocol::catalog::{self, CONTEXT_FUNCTIONS};
//!
//! assert_eq!(CONTEXT_FUNCTIONS.len(), 5);
//! let push = catalog::lookup("push_context").unwrap();
//! assert_eq!(push.example()["function_call"]["name"], "push_context");
//! ```

use serde_json::{json, Map, Value};

/// A single documented parameter of a context function.
#[derive(Debug, Clone, Copy)]
pub struct FunctionParam {
    pub name: &'static str,
    /// JSON schema type (`string`, `object`, ...)
    pub ty: &'static str,
    pub description: &'static str,
    pub required: bool,
}

/// Description of one context function.
#[derive(Debug, Clone, Copy)]
pub struct ContextFunction {
    pub name: &'static str,
    pub description: &'static str,
    /// Method of the dedicated route (`/push_context` etc.) on the server
    pub http_method: &'static str,
    pub params: &'static [FunctionParam],
    example_params: fn() -> Value,
}

const KEY_PARAM: FunctionParam = FunctionParam {
    name: "key",
    ty: "string",
    description: "Context key identifying one stack (alias: user_id)",
    required: true,
};

/// All context functions, in the order they are documented.
pub static CONTEXT_FUNCTIONS: &[ContextFunction] = &[
    ContextFunction {
        name: "push_context",
        description: "Add a new context to the stack",
        http_method: "POST",
        params: &[
            KEY_PARAM,
            FunctionParam {
                name: "context",
                ty: "object",
                description: "Context data to push",
                required: true,
            },
        ],
        example_params: || {
            json!({
                "key": "user_123",
                "context": {
                    "query": "How to implement authentication?",
                    "results": [
                        {"id": "doc_1", "title": "Authentication Guide", "content": "..."}
                    ]
                }
            })
        },
    },
    ContextFunction {
        name: "pop_context",
        description: "Remove the most recent context from the stack",
        http_method: "POST",
        params: &[KEY_PARAM],
        example_params: || json!({"key": "user_123"}),
    },
    ContextFunction {
        name: "list_contexts",
        description: "List all context keys, or all contexts in one key's stack",
        http_method: "GET",
        params: &[FunctionParam {
            required: false,
            ..KEY_PARAM
        }],
        example_params: || json!({"key": "user_123"}),
    },
    ContextFunction {
        name: "get_context",
        description: "Get the whole stack for a key, or a specific context by ID",
        http_method: "GET",
        params: &[
            KEY_PARAM,
            FunctionParam {
                name: "context_id",
                ty: "string",
                description: "ID of the context to retrieve",
                required: false,
            },
        ],
        example_params: || json!({"key": "user_123", "context_id": "ctx_456"}),
    },
    ContextFunction {
        name: "clear_contexts",
        description: "Clear all contexts from the stack, or every stack when no key is given",
        http_method: "POST",
        params: &[FunctionParam {
            required: false,
            ..KEY_PARAM
        }],
        example_params: || json!({"key": "user_123"}),
    },
];

/// Finds a function by name.
pub fn lookup(name: &str) -> Option<&'static ContextFunction> {
    CONTEXT_FUNCTIONS.iter().find(|f| f.name == name)
}

/// Names of all functions, in catalog order.
pub fn function_names() -> Vec<&'static str> {
    CONTEXT_FUNCTIONS.iter().map(|f| f.name).collect()
}

impl ContextFunction {
    /// Example request parameters for this function.
    pub fn example_params(&self) -> Value {
        (self.example_params)()
    }

    /// Example wrapped as a function call, the shape shown in the docs.
    pub fn example(&self) -> Value {
        json!({
            "function_call": {
                "name": self.name,
                "parameters": self.example_params(),
            }
        })
    }

    /// JSON schema `properties` object for the request body.
    pub fn properties(&self) -> Value {
        let mut props = Map::new();
        for param in self.params {
            props.insert(
                param.name.to_string(),
                json!({"type": param.ty, "description": param.description}),
            );
        }
        Value::Object(props)
    }

    /// Names of the required parameters.
    pub fn required(&self) -> Vec<&'static str> {
        self.params
            .iter()
            .filter(|p| p.required)
            .map(|p| p.name)
            .collect()
    }
}
